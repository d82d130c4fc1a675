//! Error types for pagewipe.

use std::io;

use lopdf::encryption::DecryptionError;
use serde::Serialize;
use thiserror::Error;

use crate::model::{DimensionField, RegionKind};

/// Result type alias for pagewipe operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error wrapping every subsystem's error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Region or pagination input was rejected.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A render session failed to open or render.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The settings store could not be read or written.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Page processing failed.
    #[error(transparent)]
    Process(#[from] ProcessError),

    /// Input is not a PDF.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Header sniffing failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The data does not start with a PDF header.
    #[error("Unknown file format: not a valid PDF")]
    UnknownFormat,

    /// The header carries a malformed version.
    #[error("Unsupported PDF version: {0}")]
    UnsupportedVersion(String),
}

/// Rejected region geometry, footer text or pagination value.
///
/// Validation failures are always returned, never panicked.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A dimension is not a finite number in the allowed range.
    #[error("{kind} {field} must be between {min} and {max} points (got {value})")]
    OutOfRange {
        kind: RegionKind,
        field: DimensionField,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The field does not exist on this region kind (width on a full-span band).
    #[error("{kind} has no {field}")]
    InapplicableField {
        kind: RegionKind,
        field: DimensionField,
    },

    /// Footer text exceeds the character limit.
    #[error("footer text is {actual} characters long (max {max})")]
    TooLong { max: usize, actual: usize },

    /// A pagination value is outside `[1, total]`.
    #[error("{field} must be between 1 and {total} (got {value})")]
    PageOutOfRange {
        field: &'static str,
        value: u32,
        total: u32,
    },
}

/// Errors raised by a page render session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The source is not a readable document.
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    /// The document is encrypted and no valid credential was supplied.
    #[error("Document is encrypted; a password is required")]
    PasswordRequired,

    /// Another render is in flight for this session.
    #[error("A render is already in progress")]
    Busy,

    /// Page number outside `[1, page_count]`.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(u32, u32),

    /// The backend failed while rasterizing.
    #[error("Rasterization failed: {0}")]
    Rasterization(String),

    /// The session was closed before or during the call.
    #[error("Session is closed")]
    Closed,

    /// The caller-supplied timeout elapsed.
    #[error("Render timed out")]
    TimedOut,
}

/// Errors from the durable settings store.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// I/O error when reading or writing the settings file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The settings file is not valid JSON.
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),

    /// No platform configuration directory is available.
    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}

/// Errors from the document processing service.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The source is not a readable PDF.
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    /// The document is encrypted and no password was supplied.
    #[error("PDF is encrypted, please provide a password")]
    PasswordRequired,

    /// The supplied password does not open the document.
    #[error("Incorrect password")]
    IncorrectPassword,

    /// `processStartPage` lies past the last page.
    #[error("Start page {start} exceeds total page count {total}")]
    StartPageBeyondDocument { start: u32, total: u32 },

    /// The request carried invalid settings.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// lopdf failed to read or rewrite an object.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// I/O error when writing the output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProcessError {
    /// Whether the caller should retry with a password.
    pub fn requires_password(&self) -> bool {
        matches!(self, ProcessError::PasswordRequired)
    }
}

impl From<lopdf::Error> for ProcessError {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => ProcessError::Io(e),
            lopdf::Error::Decryption(DecryptionError::IncorrectPassword) => {
                ProcessError::PasswordRequired
            }
            lopdf::Error::Decryption(_) => ProcessError::UnreadableDocument(err.to_string()),
            _ => ProcessError::Pdf(err.to_string()),
        }
    }
}

/// Structured error body returned by the processing service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_password: bool,
}

impl From<&ProcessError> for ErrorResponse {
    fn from(err: &ProcessError) -> Self {
        Self {
            status: "error",
            message: err.to_string(),
            requires_password: err.requires_password(),
        }
    }
}
