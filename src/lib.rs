//! Scaffolder - project scaffolding CLI
//!
//! Resolves commands to versioned registry packages, keeps them in a local
//! cache and runs their entry points in child processes.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod package;
pub mod paths;
pub mod registry;
pub mod runner;
pub mod ui;

pub use error::{ScaffoldError, ScaffoldResult};
