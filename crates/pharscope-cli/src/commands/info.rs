//! Info command implementation

use crate::cli::InfoArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use pharscope_core::ArchiveInfo;
use pharscope_core::extraction::ArchiveExtractor;
use tracing::debug;

pub fn execute(args: &InfoArgs, formatter: &dyn OutputFormatter, progress: bool) -> Result<()> {
    let config = super::inspect_config(args.toolchain.as_ref());
    let extractor = ArchiveExtractor::from_config(&config);
    debug!(toolchain = %extractor.program().display(), "inspecting {}", args.archive.display());

    let message = format!("Extracting {}", args.archive.display());
    let mut info = CliProgress::run(progress, &message, || {
        add_archive_context(ArchiveInfo::open(&args.archive, &extractor), &args.archive)
    })?;

    formatter.format_info(&info)?;

    add_archive_context(info.close(), &args.archive)
}
