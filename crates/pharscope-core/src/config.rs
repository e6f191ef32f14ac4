//! Inspection configuration.

use std::path::PathBuf;

/// Command template of the GNU `diff` preset.
///
/// `{a}` and `{b}` expand to the two extracted roots, `{meta}` to the
/// side-channel file name.
pub const GNU_DIFF_TEMPLATE: &str = "diff --exclude={meta} --recursive {a} {b}";

/// Prefix of every temporary extraction directory.
pub const DEFAULT_TEMP_PREFIX: &str = "pharscope-";

/// Settings shared by extraction, comparison, and diffing.
///
/// # Examples
///
/// ```
/// use pharscope_core::InspectConfig;
///
/// let config = InspectConfig {
///     temp_prefix: "ci-".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.max_path_depth, 32);
/// ```
#[derive(Debug, Clone)]
pub struct InspectConfig {
    /// Program whose `extract` command reads one archive in a child process.
    pub toolchain: PathBuf,

    /// Arguments inserted before `extract` on the child command line.
    pub toolchain_args: Vec<String>,

    /// Prefix of temporary extraction directories.
    pub temp_prefix: String,

    /// Template used by the GNU diff mode.
    pub gnu_diff_template: String,

    /// Maximum number of components in an entry path, passed to the
    /// extraction process as `--max-path-depth`.
    pub max_path_depth: u16,
}

impl Default for InspectConfig {
    /// Default values:
    /// - `toolchain`: the running executable
    /// - `toolchain_args`: empty
    /// - `temp_prefix`: `pharscope-`
    /// - `gnu_diff_template`: [`GNU_DIFF_TEMPLATE`]
    /// - `max_path_depth`: 32
    fn default() -> Self {
        Self {
            toolchain: std::env::current_exe().unwrap_or_else(|_| PathBuf::from("pharscope")),
            toolchain_args: Vec::new(),
            temp_prefix: DEFAULT_TEMP_PREFIX.to_string(),
            gnu_diff_template: GNU_DIFF_TEMPLATE.to_string(),
            max_path_depth: 32,
        }
    }
}

impl InspectConfig {
    /// Configuration running `toolchain` as the extraction program.
    #[must_use]
    pub fn with_toolchain(toolchain: impl Into<PathBuf>) -> Self {
        Self {
            toolchain: toolchain.into(),
            ..Default::default()
        }
    }
}
