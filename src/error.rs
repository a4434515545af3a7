//! Error types for the giaconvert-client library.
//!
//! Errors follow the lifecycle stages they abort:
//!
//! * [`ValidationError`]: the start guard failed; nothing was sent.
//! * [`UploadError`]: the batched upload failed or produced zero files.
//! * [`SubmissionError`]: the service refused the `/convert` request.
//! * [`PollError`]: **non-fatal**: one status query failed. The poller logs
//!   it and keeps ticking; it is never returned from a lifecycle command.
//!
//! [`GiaconvertError`] wraps the fatal ones so callers can match on a single
//! type. Terminal job outcomes (`failed`, `completed_with_errors`) are not
//! errors of the client; they are reported through
//! [`crate::session::JobOutcome`].

use std::path::PathBuf;
use thiserror::Error;

/// Fallback text when the service sends an error body without a message.
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// All fatal errors returned by lifecycle commands.
#[derive(Debug, Error)]
pub enum GiaconvertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// `cancel` or `restart` ran while `start` was still uploading or
    /// submitting; the attempt was discarded.
    #[error("Conversion was cancelled before polling began")]
    Superseded,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// The service could not be reached or answered unusably.
///
/// Only feeds the health indicator and the mode catalog fallback; it never
/// aborts a conversion.
#[derive(Debug, Error)]
pub enum ConnectivityError {
    #[error("Service unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Service answered HTTP {0}")]
    Status(u16),

    #[error("Service response could not be decoded: {0}")]
    Decode(String),
}

/// The start guard rejected the selection or the settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please select at least one Word document (.docx or .doc)")]
    NoAcceptedFiles,

    #[error("A destination folder is required for the '{option}' output option")]
    MissingDestination { option: String },
}

/// The upload stage failed; the lifecycle stops before submission.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Called with an empty selection.
    #[error("No files to upload")]
    NoFiles,

    /// A selected file could not be read from disk.
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never got a response.
    #[error("Failed to upload files. Please check your connection.\nCause: {0}")]
    Transport(#[source] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Upload failed: {message}")]
    Rejected { message: String },

    /// The service accepted the request but stored none of the files.
    #[error("No files were uploaded successfully ({requested} submitted)")]
    NothingUploaded { requested: usize },

    /// The success body did not match the expected shape.
    #[error("Upload response could not be decoded: {0}")]
    Decode(String),
}

/// The `/convert` request failed; the lifecycle stops before polling.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Precondition violated before anything was sent.
    #[error("Cannot submit conversion: {0}")]
    Invalid(String),

    #[error("Failed to start conversion. Please try again.\nCause: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to start conversion: {message}")]
    Rejected { message: String },

    #[error("Conversion response could not be decoded: {0}")]
    Decode(String),
}

/// A single status query failed. Transient: polling continues.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("Status check error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Failed to get conversion status (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Status response could not be decoded: {0}")]
    Decode(String),
}

/// Persisting or reading user settings failed.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file '{path}' is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No configuration directory available on this platform")]
    NoConfigDir,
}
