//! Verify command implementation

use crate::cli::VerifyArgs;
use crate::error::ReportedFailure;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use pharscope_core::verify_signature;

pub fn execute(args: &VerifyArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let report = add_archive_context(verify_signature(&args.archive), &args.archive)?;

    let failure = if !report.is_signed() {
        args.require_signature
            .then(|| format!("Archive is not signed: {}", args.archive.display()))
    } else if report.verified {
        None
    } else {
        Some(format!("Signature verification failed: {}", args.archive.display()))
    };

    formatter.format_verification(&args.archive, &report, failure.as_deref())?;

    match failure {
        Some(message) => Err(ReportedFailure(message).into()),
        None => Ok(()),
    }
}
