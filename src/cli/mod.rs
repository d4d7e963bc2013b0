//! Command-line interface

mod args;

pub use args::{Cli, Commands, InitArgs, WorkerArgs};
