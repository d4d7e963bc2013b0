//! Interactive prompts with CI/non-interactive fallback
//!
//! cliclack prompts block, so each one runs on a blocking task.
//! Without a terminal every prompt answers with its default.

use super::context::UiContext;
use crate::error::{ScaffoldError, ScaffoldResult};

/// Prompt for confirmation, returns `default` if non-interactive
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> ScaffoldResult<bool> {
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message)
            .initial_value(default)
            .interact()
    })
    .await
    .map_err(|e| ScaffoldError::User(format!("Prompt task failed: {}", e)))?;

    result.map_err(|e| ScaffoldError::User(format!("Prompt failed: {}", e)))
}

/// Prompt for selection from a list of options
/// Returns the selected value or the first option if non-interactive
pub async fn select<T: Clone + Send + Eq + 'static>(
    ctx: &UiContext,
    message: &str,
    options: &[(T, &str, &str)], // (value, label, hint)
) -> ScaffoldResult<T> {
    let first = options
        .first()
        .map(|(value, _, _)| value.clone())
        .ok_or_else(|| ScaffoldError::User(format!("Nothing to choose for: {}", message)))?;

    if !ctx.is_interactive() {
        return Ok(first);
    }

    let message = message.to_string();
    let items: Vec<(T, String, String)> = options
        .iter()
        .map(|(v, l, h)| (v.clone(), l.to_string(), h.to_string()))
        .collect();

    let result: Result<Result<T, std::io::Error>, _> = tokio::task::spawn_blocking(move || {
        let mut select = cliclack::select(&message);
        for (value, label, hint) in items {
            select = select.item(value, label, hint);
        }
        select.interact()
    })
    .await;

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScaffoldError::User(format!("Select failed: {}", e))),
        Err(e) => Err(ScaffoldError::User(format!("Select task failed: {}", e))),
    }
}

/// Prompt for a line of text checked by `validate`.
///
/// Non-interactive contexts take `default`, which must pass the same
/// validation.
pub async fn input<F>(
    ctx: &UiContext,
    message: &str,
    default: &str,
    validate: F,
) -> ScaffoldResult<String>
where
    F: Fn(&str) -> Result<(), String> + Send + 'static,
{
    if !ctx.is_interactive() {
        return validate(default)
            .map(|()| default.to_string())
            .map_err(ScaffoldError::InvalidArguments);
    }

    let message = message.to_string();
    let default = default.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::input(&message)
            .default_input(&default)
            .validate(move |value: &String| validate(value.trim()))
            .interact::<String>()
    })
    .await
    .map_err(|e| ScaffoldError::User(format!("Prompt task failed: {}", e)))?;

    result
        .map(|value| value.trim().to_string())
        .map_err(|e| ScaffoldError::User(format!("Prompt failed: {}", e)))
}
