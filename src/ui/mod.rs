//! Terminal UI for interactive commands
//!
//! Uses `cliclack` for prompts, spinners and step output, with a plain
//! text fallback in CI and other non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use scaffolder::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "Create project");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Downloading template...");
//! // ... do work ...
//! spinner.stop("Template downloaded");
//!
//! let proceed = ui::confirm(&ctx, "Directory is not empty. Continue?", false).await?;
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, remark, step_info, step_ok, step_ok_detail, step_warn,
};
pub use progress::TaskSpinner;
pub use prompts::{confirm, input, select};
pub use theme::{init_theme, ScaffoldTheme};
