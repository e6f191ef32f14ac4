//! Subprocess-isolated extraction.

use std::ffi::OsString;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use tempfile::TempDir;
use tracing::debug;

use crate::InspectConfig;
use crate::PharError;
use crate::Result;
use crate::error::InvalidArchiveReason;

/// Reads one archive per child process.
///
/// The child runs `<toolchain> [args] extract <archive> <dest> --no-interaction --internal`,
/// plus `--max-path-depth <n>` when a depth is configured. It reports back
/// only through the populated destination directory, the side-channel file
/// inside it, its exit status, and stderr.
#[derive(Debug, Clone)]
pub struct ArchiveExtractor {
    program: PathBuf,
    args: Vec<OsString>,
    temp_prefix: String,
    max_path_depth: Option<u16>,
}

impl ArchiveExtractor {
    /// Extractor running `program` with no extra arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            temp_prefix: crate::config::DEFAULT_TEMP_PREFIX.to_string(),
            max_path_depth: None,
        }
    }

    /// Extractor configured from `config`.
    #[must_use]
    pub fn from_config(config: &InspectConfig) -> Self {
        Self {
            program: config.toolchain.clone(),
            args: config.toolchain_args.iter().map(OsString::from).collect(),
            temp_prefix: config.temp_prefix.clone(),
            max_path_depth: Some(config.max_path_depth),
        }
    }


    /// Adds arguments placed before the `extract` command.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program run for each extraction.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Extracts `archive` into a fresh temporary directory.
    ///
    /// The directory is removed when the returned [`TempDir`] is dropped or
    /// closed; on failure it is removed before this returns.
    ///
    /// # Errors
    ///
    /// - [`InvalidArchiveReason::FileNotFound`] or
    ///   [`InvalidArchiveReason::NotReadable`] before any process is spawned
    /// - [`InvalidArchiveReason::ExtractionFailed`] with the child's stderr
    ///   when it exits unsuccessfully
    /// - [`PharError::ToolInvocationFailure`] when the child cannot be spawned
    pub fn extract(&self, archive: &Path) -> Result<TempDir> {
        check_readable(archive)?;

        let dest = tempfile::Builder::new()
            .prefix(&self.temp_prefix)
            .tempdir()?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("extract")
            .arg(archive)
            .arg(dest.path())
            .arg("--no-interaction")
            .arg("--internal")
            .stdin(Stdio::null());
        if let Some(depth) = self.max_path_depth {
            command.arg("--max-path-depth").arg(depth.to_string());
        }

        debug!(command = ?command, "spawning extraction process");
        let output = command
            .output()
            .map_err(|e| PharError::ToolInvocationFailure {
                tool: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            debug!(
                archive = %archive.display(),
                status = %output.status,
                "extraction process failed"
            );
            return Err(PharError::invalid(
                archive,
                InvalidArchiveReason::ExtractionFailed { stderr },
            ));
        }

        debug!(
            archive = %archive.display(),
            root = %dest.path().display(),
            "extraction process finished"
        );
        Ok(dest)
    }
}

fn check_readable(archive: &Path) -> Result<()> {
    let reason = match File::open(archive) {
        Ok(file) => match file.metadata() {
            Ok(meta) if meta.is_file() => return Ok(()),
            _ => InvalidArchiveReason::NotReadable,
        },
        Err(e) if e.kind() == ErrorKind::NotFound => InvalidArchiveReason::FileNotFound,
        Err(_) => InvalidArchiveReason::NotReadable,
    };
    Err(PharError::invalid(archive, reason))
}
