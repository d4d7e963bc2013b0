//! Project metadata collected before a template is installed

use super::template::TemplateInfo;
use crate::error::{ScaffoldError, ScaffoldResult};
use crate::ui::{self, UiContext};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Letters first, then letters/digits, with `-`, `_` or `|` only before a letter
static PROJECT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]+([-|_][a-zA-Z][a-zA-Z0-9]*|[a-zA-Z0-9])*$")
        .expect("project name regex is valid")
});

const DEFAULT_PROJECT_NAME: &str = "project";
const DEFAULT_PROJECT_VERSION: &str = "1.0.0";

/// What is being created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Project,
    Component,
}

/// Answers that drive template rendering.
///
/// Serialized in camelCase; templates reference the fields as
/// `<%= projectName %>`, `<%= projectVersion %>` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    pub project_name: String,
    pub project_version: String,
    pub project_template: String,
}

impl ProjectInfo {
    /// Placeholder values for rendering
    pub fn context(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// Check a project name
pub fn validate_project_name(name: &str) -> Result<(), String> {
    if PROJECT_NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err("Project name must start with a letter and contain only letters, digits, '-' or '_'"
            .to_string())
    }
}

/// Check a project version
pub fn validate_project_version(version: &str) -> Result<(), String> {
    semver::Version::parse(version)
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a valid version (expected e.g. 1.0.0)", version))
}

/// Ask for project type, name, version and template.
///
/// Returns the answers and the index of the chosen template.
pub async fn prompt_project_info(
    ctx: &UiContext,
    templates: &[TemplateInfo],
    name_hint: Option<&str>,
) -> ScaffoldResult<(ProjectInfo, usize)> {
    let project_type = ui::select(
        ctx,
        "Select what to create",
        &[
            (ProjectType::Project, "Project", ""),
            (ProjectType::Component, "Component", ""),
        ],
    )
    .await?;

    let default_name = name_hint
        .filter(|name| validate_project_name(name).is_ok())
        .unwrap_or(DEFAULT_PROJECT_NAME);
    let label = match project_type {
        ProjectType::Project => "Project name",
        ProjectType::Component => "Component name",
    };
    let project_name = ui::input(ctx, label, default_name, validate_project_name).await?;

    let project_version =
        ui::input(ctx, "Version", DEFAULT_PROJECT_VERSION, validate_project_version).await?;

    let choices: Vec<(usize, &str, &str)> = templates
        .iter()
        .enumerate()
        .map(|(i, t)| (i, t.description.as_str(), t.name.as_str()))
        .collect();
    if choices.is_empty() {
        return Err(ScaffoldError::TemplateNotFound(
            "no project templates available".to_string(),
        ));
    }
    let index = ui::select(ctx, "Select a template", &choices).await?;

    let info = ProjectInfo {
        project_type,
        project_name,
        project_version: normalize_version(&project_version),
        project_template: templates[index].name.clone(),
    };
    Ok((info, index))
}

fn normalize_version(version: &str) -> String {
    semver::Version::parse(version)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| version.to_string())
}

#[cfg(test)]
mod tests {
    use super::super::template::builtin_templates;
    use super::*;
    use serde_json::json;

    #[test]
    fn project_names() {
        for name in ["app", "myApp2", "my-app", "my_app", "a-b1-c2", "App"] {
            assert!(validate_project_name(name).is_ok(), "{name} should be valid");
        }
        for name in ["", "1app", "-app", "app-", "my--app", "my-1app", "my app", "app!"] {
            assert!(validate_project_name(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn project_versions() {
        assert!(validate_project_version("1.0.0").is_ok());
        assert!(validate_project_version("2.3.4-beta.1").is_ok());
        assert!(validate_project_version("1.0").is_err());
        assert!(validate_project_version("latest").is_err());
    }

    #[test]
    fn context_uses_template_field_names() {
        let info = ProjectInfo {
            project_type: ProjectType::Project,
            project_name: "demo".to_string(),
            project_version: "1.0.0".to_string(),
            project_template: "scaffolder-template".to_string(),
        };

        assert_eq!(
            Value::Object(info.context()),
            json!({
                "type": "project",
                "projectName": "demo",
                "projectVersion": "1.0.0",
                "projectTemplate": "scaffolder-template"
            })
        );
    }

    #[tokio::test]
    async fn non_interactive_defaults() {
        let ctx = UiContext::non_interactive();
        let templates = builtin_templates();

        let (info, index) = prompt_project_info(&ctx, &templates, Some("my-app"))
            .await
            .unwrap();
        assert_eq!(index, 0);
        assert_eq!(info.project_type, ProjectType::Project);
        assert_eq!(info.project_name, "my-app");
        assert_eq!(info.project_version, "1.0.0");
        assert_eq!(info.project_template, "scaffolder-template");
    }

    #[tokio::test]
    async fn invalid_name_hint_falls_back() {
        let ctx = UiContext::non_interactive();
        let (info, _) = prompt_project_info(&ctx, &builtin_templates(), Some("1-bad"))
            .await
            .unwrap();
        assert_eq!(info.project_name, "project");
    }
}
