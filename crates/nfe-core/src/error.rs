//! Error types for the nfe-core library.
//!
//! Only [`ReportError`] ends a run. The other types are recorded per input
//! or per document and travel alongside the report.

use std::path::PathBuf;

use thiserror::Error;

/// Terminal error for a whole run.
#[derive(Error, Debug)]
pub enum ReportError {
    /// Writing an archive member to disk failed.
    #[error("storage error writing {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be started or a worker died.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// The run was cancelled before every document was processed.
    #[error("run cancelled after {completed} of {total} documents")]
    Cancelled { completed: usize, total: usize },

    /// The report total does not fit in a decimal.
    #[error("report total overflows after {items} line items")]
    TotalOverflow { items: usize },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Problems with a single input path. The batch continues without it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Suffix is neither `.xml` nor `.zip`.
    #[error("unsupported input {}: expected .xml or .zip", path.display())]
    Unsupported { path: PathBuf },

    /// The archive is corrupt or unreadable.
    #[error("cannot open archive {}: {reason}", path.display())]
    ArchiveOpen { path: PathBuf, reason: String },

    /// Archive member whose name would land outside the archive directory.
    #[error("skipped unsafe member {member:?} in archive {}", archive.display())]
    UnsafeMember { archive: PathBuf, member: String },

    /// Archive member that would overwrite a document already in this run.
    #[error(
        "skipped member {member:?} in archive {}: {} is already part of this run",
        archive.display(),
        destination.display()
    )]
    DuplicateMember {
        archive: PathBuf,
        member: String,
        destination: PathBuf,
    },

    /// The same document was given more than once.
    #[error("duplicate input {}", path.display())]
    DuplicateInput { path: PathBuf },
}

/// Errors that fail one document's extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The file could not be read.
    #[error("failed to read document: {0}")]
    Read(String),

    /// The XML structure is broken.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// A line item lacks a required field.
    #[error("line item {item}: missing {field}")]
    MissingField { item: usize, field: &'static str },

    /// A line item amount is not a decimal number.
    #[error("line item {item}: invalid amount {value:?}")]
    InvalidAmount { item: usize, value: String },
}

/// Recoverable issues attached to a successfully extracted document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// The issuer block is missing or lacks required fields.
    #[error("issuer data incomplete, missing: {}", missing.join(", "))]
    IncompleteIssuer { missing: Vec<&'static str> },

    /// Issuer tax id failed its check digits.
    #[error("issuer tax id {0} has invalid check digits")]
    InvalidTaxId(String),

    /// The emission timestamp did not match the expected format.
    #[error("cannot parse emission timestamp {value:?}: {reason}")]
    Timestamp { value: String, reason: String },

    /// No emission timestamp field was present.
    #[error("emission timestamp not found")]
    MissingTimestamp,
}

/// Result type for the nfe-core library.
pub type Result<T> = std::result::Result<T, ReportError>;
