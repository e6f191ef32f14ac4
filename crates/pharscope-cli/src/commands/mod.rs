//! Command implementations.

pub mod completion;
pub mod diff;
pub mod extract;
pub mod info;
pub mod verify;

use crate::cli::Cli;
use pharscope_core::InspectConfig;
use std::path::PathBuf;

/// Inspection settings with the CLI overrides applied.
pub fn inspect_config(toolchain: Option<&PathBuf>) -> InspectConfig {
    toolchain.map_or_else(InspectConfig::default, InspectConfig::with_toolchain)
}

/// Spinners are shown only for human output on a terminal.
pub const fn wants_progress(cli: &Cli) -> bool {
    !cli.json && !cli.quiet
}
