//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pharscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Never prompt; accepted for toolchain compatibility
    #[arg(long, global = true)]
    pub no_interaction: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract archive contents
    Extract(ExtractArgs),
    /// Show archive metadata and file table
    Info(InfoArgs),
    /// Compare two archives
    Diff(DiffArgs),
    /// Verify the archive signature
    Verify(VerifyArgs),
    /// Generate shell completion script
    Completion(CompletionArgs),
}

impl Commands {
    /// Subcommand name, used as the `operation` of JSON output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Extract(_) => "extract",
            Self::Info(_) => "info",
            Self::Diff(_) => "diff",
            Self::Verify(_) => "verify",
            Self::Completion(_) => "completion",
        }
    }
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory (default: current directory)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Also write the metadata side-channel file
    #[arg(long)]
    pub internal: bool,

    /// Maximum number of components in an entry path
    #[arg(long, default_value = "32", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_path_depth: u16,
}

#[derive(clap::Args)]
pub struct InfoArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Program used to extract the archive (default: this executable)
    #[arg(long, value_name = "PATH")]
    pub toolchain: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DiffModeArg {
    /// Per-file checksums, unified diff
    Checksum,
    /// Paths present in only one archive
    List,
    /// GNU diff over the extracted trees
    Gnu,
}

#[derive(clap::Args)]
pub struct DiffArgs {
    /// First archive
    #[arg(value_name = "ARCHIVE_A")]
    pub a: PathBuf,

    /// Second archive
    #[arg(value_name = "ARCHIVE_B")]
    pub b: PathBuf,

    /// How to show differences
    #[arg(long, value_enum, default_value_t = DiffModeArg::Checksum)]
    pub mode: DiffModeArg,

    /// Custom diff command; {a} and {b} expand to the extracted roots
    #[arg(long, value_name = "TEMPLATE", conflicts_with = "mode")]
    pub command: Option<String>,

    /// In checksum mode, also compare compression and stored size
    #[arg(long)]
    pub with_compression: bool,

    /// Program used to extract the archives (default: this executable)
    #[arg(long, value_name = "PATH")]
    pub toolchain: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct VerifyArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Fail when the archive carries no signature
    #[arg(long)]
    pub require_signature: bool,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
