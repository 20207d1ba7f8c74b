//! Error types for ghash
//!
//! This module defines the error hierarchy for the hashing pipeline:
//! - Configuration and CLI errors
//! - Fatal manifest structure errors (bad magic, unknown algorithm)
//! - Per-line manifest errors
//! - Enumeration errors (stat, readlink, symlink loops, skipped entries)
//! - Verification failures (size drift, digest mismatch)
//! - Worker thread errors
//!
//! Fatal errors propagate with `?` as [`GhashError`]. Everything else is
//! flattened into an [`ErrorRecord`] and collected by the error harvester so
//! a run always attempts every remaining file.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level error type for ghash
#[derive(Error, Debug)]
pub enum GhashError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Fatal manifest errors
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Output file errors
    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors (writing the manifest, reading standard streams)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Hash algorithm not in the registry
    #[error("Unknown hash algorithm '{name}'. Try '--list-hashes'")]
    UnknownAlgorithm { name: String },

    /// Hasher factory could not produce an instance
    #[error("Hash algorithm '{name}' could not be initialized")]
    HasherUnavailable { name: String },

    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid parallelism factor
    #[error("Invalid parallelism factor {factor}: must be at least 1")]
    InvalidParallelism { factor: usize },

    /// Nothing to hash
    #[error("Insufficient arguments: expected at least one file or directory")]
    MissingInputs,
}

/// Structural manifest errors; these abort before any worker starts
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest could not be opened
    #[error("{source_name}: can't open: {reason}")]
    Open { source_name: String, reason: String },

    /// First line missing or unreadable
    #[error("{source_name}: possibly corrupt; can't read first line")]
    MissingHeader { source_name: String },

    /// Header has fewer than three fields
    #[error("{source_name}: possibly corrupt; not enough fields in header")]
    ShortHeader { source_name: String },

    /// Magic token mismatch
    #[error("{source_name}: not a ghash file")]
    BadMagic { source_name: String },

    /// Algorithm named in the header is not registered
    #[error("{source_name}: unsupported hash algorithm '{algorithm}'")]
    UnknownAlgorithm {
        source_name: String,
        algorithm: String,
    },
}

/// Errors decoding a single manifest entry line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("malformed line; not enough fields")]
    NotEnoughFields,

    #[error("malformed line; size {0}")]
    BadSize(#[from] std::num::ParseIntError),

    #[error("malformed line; filename {0}")]
    BadFileName(#[from] QuoteError),

    #[error("malformed line; not valid UTF-8")]
    NotUtf8,

    #[error("malformed line; digest has {actual} hex digits, expected {expected}")]
    DigestWidth { expected: usize, actual: usize },
}

/// Errors unquoting a manifest path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuoteError {
    #[error("missing surrounding quotes")]
    MissingQuotes,

    #[error("unescaped quote at offset {0}")]
    UnescapedQuote(usize),

    #[error("raw newline at offset {0}")]
    RawNewline(usize),

    #[error("truncated escape sequence")]
    TruncatedEscape,

    #[error("invalid escape '\\{0}'")]
    InvalidEscape(char),

    #[error("invalid code point U+{0:X}")]
    InvalidCodePoint(u32),
}

/// Errors and skip notices raised while enumerating inputs
///
/// Messages omit the path; [`ErrorRecord`] puts it in front.
#[derive(Error, Debug)]
pub enum EnumerateError {
    #[error("lstat: {source}")]
    Lstat { path: PathBuf, source: io::Error },

    #[error("readlink: {source}")]
    Readlink { path: PathBuf, source: io::Error },

    #[error("too many levels of symbolic links")]
    SymlinkLoop { path: PathBuf },

    #[error("skipping symlink")]
    SkippedSymlink { path: PathBuf },

    #[error("skipping directory")]
    SkippedDir { path: PathBuf },

    #[error("skipping non-file")]
    SkippedNonFile { path: PathBuf },

    #[error("walk: {reason}")]
    Walk { path: PathBuf, reason: String },
}

impl EnumerateError {
    /// Path the error refers to
    pub fn path(&self) -> &Path {
        match self {
            EnumerateError::Lstat { path, .. }
            | EnumerateError::Readlink { path, .. }
            | EnumerateError::SymlinkLoop { path }
            | EnumerateError::SkippedSymlink { path }
            | EnumerateError::SkippedDir { path }
            | EnumerateError::SkippedNonFile { path }
            | EnumerateError::Walk { path, .. } => path,
        }
    }
}

/// Reasons a manifest entry failed verification
#[derive(Error, Debug)]
pub enum VerifyFailure {
    #[error("{}: {}", path.display(), source)]
    Stat { path: PathBuf, source: io::Error },

    #[error("'{}' not a file", path.display())]
    NotAFile { path: PathBuf },

    #[error("'{}' size mismatch: exp {}, saw {}", path.display(), expected, actual)]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("can't hash: {source}")]
    Hash { source: io::Error },

    #[error(
        "'{}' size changed during read: exp {}, saw {}",
        path.display(),
        expected,
        actual
    )]
    SizeChanged {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("file modified '{}'", path.display())]
    Modified { path: PathBuf },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Thread could not be spawned
    #[error("Failed to initialize {role} thread {id}: {reason}")]
    InitFailed {
        role: &'static str,
        id: usize,
        reason: String,
    },

    /// Thread panicked
    #[error("{role} thread {id} panicked")]
    Panicked { role: &'static str, id: usize },

    /// Work queue receivers are gone
    #[error("Work queue closed unexpectedly")]
    QueueClosed,
}

/// Output file errors
#[derive(Error, Debug)]
pub enum OutputError {
    /// Refusing to clobber
    #[error("output file '{}' exists; use --force-overwrite to replace it", path.display())]
    Exists { path: PathBuf },

    /// Temporary file creation failed
    #[error("can't create temporary file next to '{}': {}", path.display(), source)]
    Create { path: PathBuf, source: io::Error },

    /// Rename into place failed
    #[error("can't rename into '{}': {}", path.display(), source)]
    Commit { path: PathBuf, source: io::Error },
}

/// Result type alias for GhashError
pub type Result<T> = std::result::Result<T, GhashError>;

/// One non-fatal failure, tagged with the path or manifest line it concerns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Where the error happened (a path, or `manifest:line`)
    pub context: String,

    /// What went wrong
    pub message: String,
}

impl ErrorRecord {
    pub fn new(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Record for a manifest line (1-based line number)
    pub fn at_line(source_name: &str, line: usize, err: impl fmt::Display) -> Self {
        Self::new(format!("{}: {}", source_name, line), err.to_string())
    }
}

impl From<EnumerateError> for ErrorRecord {
    fn from(err: EnumerateError) -> Self {
        let context = err.path().display().to_string();
        Self::new(context, err.to_string())
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

/// All records collected during one run
#[derive(Debug, Default, Clone)]
pub struct ErrorReport {
    records: Vec<ErrorRecord>,
}

impl ErrorReport {
    pub fn new(records: Vec<ErrorRecord>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.records.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enumerate_error_to_record() {
        let err = EnumerateError::SkippedDir {
            path: PathBuf::from("/data/dir"),
        };
        assert_eq!(err.path(), Path::new("/data/dir"));

        let record: ErrorRecord = err.into();
        assert_eq!(record.context, "/data/dir");
        assert_eq!(record.to_string(), "/data/dir: skipping directory");
    }

    #[test]
    fn test_line_record_display() {
        let record = ErrorRecord::at_line("sums.txt", 7, LineError::NotEnoughFields);
        assert_eq!(
            record.to_string(),
            "sums.txt: 7: malformed line; not enough fields"
        );
    }

    #[test]
    fn test_report_joins_lines() {
        let report = ErrorReport::new(vec![
            ErrorRecord::new("a", "first"),
            ErrorRecord::new("b", "second"),
        ]);
        assert_eq!(report.len(), 2);
        assert_eq!(report.to_string(), "a: first\nb: second");
    }

    #[test]
    fn test_error_conversion() {
        let cfg = ConfigError::UnknownAlgorithm { name: "md4".into() };
        let err: GhashError = cfg.into();
        assert!(matches!(err, GhashError::Config(_)));
    }
}
