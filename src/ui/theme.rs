//! Prompt theme
//!
//! Bars and state symbols share one palette: the accent while a prompt is
//! active, a dimmed accent once answered, red on validation errors.

use cliclack::ThemeState;
use console::Style;

/// Prompt theme with a configurable accent
#[derive(Debug, Clone)]
pub struct ScaffoldTheme {
    accent: Style,
    answered: Style,
}

impl Default for ScaffoldTheme {
    fn default() -> Self {
        Self::new(Style::new().green(), Style::new().cyan())
    }
}

impl ScaffoldTheme {
    /// `accent` marks active prompts, `answered` the symbol of submitted ones
    pub fn new(accent: Style, answered: Style) -> Self {
        Self { accent, answered }
    }

    fn palette(&self, state: &ThemeState, submitted: Style) -> Style {
        match state {
            ThemeState::Active => self.accent.clone(),
            ThemeState::Submit => submitted,
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
        }
    }
}

impl cliclack::Theme for ScaffoldTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        self.palette(state, self.accent.clone().dim())
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        self.palette(state, self.answered.clone())
    }
}

/// Install the theme for all prompts in this process
pub fn init_theme() {
    cliclack::set_theme(ScaffoldTheme::default());
}
