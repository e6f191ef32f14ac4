//! Diff command implementation.

use crate::cli::DiffArgs;
use crate::cli::DiffModeArg;
use crate::error::add_comparison_context;
use crate::error::convert_comparison_error;
use crate::output::DiffSummary;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use pharscope_core::ArchiveComparison;
use pharscope_core::PharError;
use pharscope_core::diff::ChecksumDiffer;
use pharscope_core::diff::DiffMode;
use pharscope_core::diff::LineStyle;
use tracing::debug;

pub fn execute(args: &DiffArgs, formatter: &dyn OutputFormatter, progress: bool) -> Result<()> {
    let config = super::inspect_config(args.toolchain.as_ref());
    let mode = diff_mode(args);
    debug!(mode = mode.name(), toolchain = %config.toolchain.display(), "comparing archives");

    let mut comparison = CliProgress::run(progress, "Extracting archives", || {
        add_comparison_context(ArchiveComparison::open(&args.a, &args.b, &config), &args.a, &args.b)
    })?;

    let equal = match comparison.equal() {
        Ok(equal) => Some(equal),
        Err(PharError::IncomparableArchives { path }) => {
            debug!(archive = %path.display(), "equality undecidable, diffing anyway");
            None
        }
        Err(err) => return Err(convert_comparison_error(err, &args.a, &args.b)),
    };

    let mut lines: Vec<(LineStyle, String)> = Vec::new();
    if equal != Some(true) {
        let result = CliProgress::run(progress, "Comparing", || {
            if mode == DiffMode::Checksum && args.with_compression {
                comparison.diff_with(&ChecksumDiffer::new().with_compression(true), &mut lines)
            } else {
                comparison.diff(&mode, &mut lines)
            }
        });
        add_comparison_context(result, &args.a, &args.b)?;
    }

    let summary = DiffSummary {
        a: &args.a,
        b: &args.b,
        mode: mode.name(),
        equal,
        lines,
        tallies: comparison.compression_tallies(),
    };
    formatter.format_diff(&summary)?;

    add_comparison_context(comparison.close(), &args.a, &args.b)
}

fn diff_mode(args: &DiffArgs) -> DiffMode {
    if let Some(template) = &args.command {
        return DiffMode::Command(template.clone());
    }
    match args.mode {
        DiffModeArg::Checksum => DiffMode::Checksum,
        DiffModeArg::List => DiffMode::List,
        DiffModeArg::Gnu => DiffMode::Gnu,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::cli::Commands;
    use clap::Parser;

    fn parse(argv: &[&str]) -> DiffArgs {
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Diff(args) => args,
            _ => panic!("expected diff"),
        }
    }

    #[test]
    fn test_diff_mode_from_flags() {
        let args = parse(&["pharscope", "diff", "a", "b", "--mode", "gnu"]);
        assert_eq!(diff_mode(&args), DiffMode::Gnu);

        let args = parse(&["pharscope", "diff", "a", "b", "--command", "cmp {a} {b}"]);
        assert_eq!(diff_mode(&args), DiffMode::Command("cmp {a} {b}".to_string()));

        let args = parse(&["pharscope", "diff", "a", "b"]);
        assert_eq!(diff_mode(&args), DiffMode::Checksum);
    }
}
