//! Extract command implementation.
//!
//! With `--internal` this is the extraction subprocess of `info` and
//! `diff`: it also writes the metadata side-channel file, and a failure
//! exits nonzero with the reason on stderr.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use pharscope_core::extraction::ExtractOptions;
use pharscope_core::extraction::extract_to;
use std::env;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter, progress: bool) -> Result<()> {
    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let options = ExtractOptions {
        internal: args.internal,
        max_path_depth: usize::from(args.max_path_depth),
    };

    let message = format!("Extracting {}", args.archive.display());
    let report = CliProgress::run(progress && !args.internal, &message, || {
        add_archive_context(
            extract_to(&args.archive, &output_dir, &options),
            &args.archive,
        )
    })?;

    formatter.format_extraction_result(&report)?;

    Ok(())
}
