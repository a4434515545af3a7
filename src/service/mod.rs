//! The remote conversion service, seen from the client.
//!
//! ```text
//! GET  /health                 reachability indicator
//! GET  /modes                  mode catalog
//! POST /upload   (multipart)   → [UploadedFile]
//! POST /convert  (json)        → conversion_id
//! GET  /status/{id}            → StatusSnapshot
//! ```
//!
//! Everything above the transport talks to [`ConversionService`], so the
//! lifecycle can be driven against [`HttpConversionService`] in production
//! and a scripted fake in tests.

pub mod http;
pub mod types;

use crate::error::{ConnectivityError, PollError, SubmissionError, UploadError};
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use http::HttpConversionService;
pub use types::{
    ConvertRequest, ErrorBody, ErrorEnvelope, FileError, FileResult, JobStatus, ModeInfo,
    SessionId, StatusSnapshot, UploadPart, UploadedFile,
};

/// Client side of the conversion service contract.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// `Ok` iff the service answered `/health` with a success status.
    async fn health(&self) -> Result<(), ConnectivityError>;

    /// Mode catalog keyed by wire name.
    async fn modes(&self) -> Result<BTreeMap<String, ModeInfo>, ConnectivityError>;

    /// Send all parts in one multipart request. Returns exactly what the
    /// service reports as stored, which may be fewer than `parts`.
    async fn upload(&self, parts: Vec<UploadPart>) -> Result<Vec<UploadedFile>, UploadError>;

    /// Submit a conversion job. Called at most once per attempt.
    async fn convert(&self, request: &ConvertRequest) -> Result<SessionId, SubmissionError>;

    /// Query the current state of a job.
    async fn status(&self, id: &SessionId) -> Result<StatusSnapshot, PollError>;
}
