//! Typed CLI commands and the argument parser for the `cvl` binary.

mod parse;

pub use parse::{parse_args, usage};

use std::path::PathBuf;

/// One operator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Refresh the inventory from the provider/cache and observation.
    Update,
    /// Print the cached inventory summary.
    Status,
    /// Run one reconciliation pass.
    Converge {
        types: Option<Vec<String>>,
        hosts: Option<Vec<String>>,
        dry_run: bool,
    },
    Help,
}

/// Parsed invocation: global options plus the command.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Configuration document path.
    pub config: PathBuf,
    /// Stage override; defaults to the config's stage.
    pub stage: Option<String>,
    pub command: Command,
}
