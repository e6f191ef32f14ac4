//! Archive extraction.
//!
//! [`extract_to`] is the in-process body of the toolchain's `extract`
//! command. [`ArchiveExtractor`] runs that command in a child process so
//! that inspecting an archive never loads it into the caller.

mod extractor;
mod internal;
mod path;
mod report;

pub use extractor::ArchiveExtractor;
pub use internal::ExtractOptions;
pub use internal::extract_to;
pub use path::EntryPath;
pub use report::ExtractionReport;
