//! Diffing with an external program.

use std::path::Path;
use std::process::Command;
use std::process::Stdio;

use tracing::debug;
use tracing::warn;

use super::DiffStrategy;
use super::LineStyle;
use super::LineWriter;
use super::NO_DIFFERENCES;
use super::labels;
use crate::ArchiveInfo;
use crate::PharError;
use crate::Result;
use crate::config::GNU_DIFF_TEMPLATE;
use crate::metadata::SIDE_CHANNEL_FILE;

/// Runs a command template against the two extracted roots.
///
/// The template is split into arguments like a shell would split words
/// (single and double quotes group, nothing else is interpreted) and is run
/// without a shell. Placeholders:
///
/// | Placeholder | Expands to                       |
/// |-------------|----------------------------------|
/// | `{a}`       | extracted root of the first archive  |
/// | `{b}`       | extracted root of the second archive |
/// | `{meta}`    | name of the side-channel file    |
///
/// Exit status 0 means no differences and 1 means differences, as with
/// `diff`. Any other status is accepted only if the tool printed something.
/// In the output, both temporary roots are replaced by the archive names.
///
/// # Examples
///
/// ```
/// use pharscope_core::diff::ExternalToolDiffer;
///
/// let differ = ExternalToolDiffer::new("git diff --no-index --stat {a} {b}");
/// assert_eq!(differ.template(), "git diff --no-index --stat {a} {b}");
/// ```
#[derive(Debug, Clone)]
pub struct ExternalToolDiffer {
    template: String,
}

impl ExternalToolDiffer {
    /// Differ running `template`.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// GNU `diff --recursive` preset that skips the side-channel file.
    #[must_use]
    pub fn gnu() -> Self {
        Self::new(GNU_DIFF_TEMPLATE)
    }

    /// Command template as given.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Expanded argument vector for the given roots.
    pub fn argv(&self, a_root: &Path, b_root: &Path) -> Result<Vec<String>> {
        let words = split_words(&self.template).map_err(|reason| self.failure(reason))?;
        if words.is_empty() {
            return Err(self.failure("empty command template".to_string()));
        }
        let a = a_root.display().to_string();
        let b = b_root.display().to_string();
        Ok(words
            .into_iter()
            .map(|word| {
                word.replace("{a}", &a)
                    .replace("{b}", &b)
                    .replace("{meta}", SIDE_CHANNEL_FILE)
            })
            .collect())
    }

    fn failure(&self, reason: String) -> PharError {
        PharError::ToolInvocationFailure {
            tool: self
                .template
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
            reason,
        }
    }
}

impl DiffStrategy for ExternalToolDiffer {
    fn diff(&self, a: &ArchiveInfo, b: &ArchiveInfo, sink: &mut dyn LineWriter) -> Result<()> {
        let a_root = a.root()?;
        let b_root = b.root()?;
        let argv = self.argv(a_root, b_root)?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| self.failure("empty command template".to_string()))?;

        debug!(%program, ?args, "running external diff tool");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| PharError::ToolInvocationFailure {
                tool: program.clone(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match output.status.code() {
            Some(0 | 1) => {}
            Some(code) if !stdout.trim().is_empty() => {
                warn!(%program, code, "diff tool exited with unusual status; using its output");
            }
            Some(code) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(PharError::ToolInvocationFailure {
                    tool: program.clone(),
                    reason: format!("exited with status {code}: {}", stderr.trim()),
                });
            }
            None => {
                return Err(PharError::ToolInvocationFailure {
                    tool: program.clone(),
                    reason: "terminated by signal".to_string(),
                });
            }
        }

        let (a_label, b_label) = labels(a, b);
        let text = stdout
            .replace(&a_root.display().to_string(), &a_label)
            .replace(&b_root.display().to_string(), &b_label);
        if text.trim().is_empty() {
            sink.write_line(NO_DIFFERENCES)?;
            return Ok(());
        }
        for line in text.trim_end().lines() {
            sink.write_styled(classify(line), line)?;
        }
        Ok(())
    }
}

/// Style of one line of `diff`-like output.
fn classify(line: &str) -> LineStyle {
    if line.starts_with("---")
        || line.starts_with("+++")
        || line.starts_with("@@")
        || line.starts_with("diff ")
        || line.starts_with("Only in ")
    {
        LineStyle::Header
    } else if line.starts_with('<') || line.starts_with('-') {
        LineStyle::Removed
    } else if line.starts_with('>') || line.starts_with('+') {
        LineStyle::Added
    } else {
        LineStyle::Plain
    }
}

/// Splits a template into words. Quotes group characters and are removed.
fn split_words(template: &str) -> std::result::Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in template.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {q} quote in command template"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
