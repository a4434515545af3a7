//! One conversion attempt: submission and the aggregate fed by polling.
//!
//! The session holds whatever the service last reported. Snapshots are
//! applied by overwriting every field; the client never merges a snapshot
//! with what it saw before, so a late or out-of-order snapshot can only
//! make the view stale, never inconsistent.

use crate::config::ConversionSettings;
use crate::error::SubmissionError;
use crate::service::{
    ConversionService, ConvertRequest, FileError, FileResult, JobStatus, SessionId,
    StatusSnapshot, UploadedFile,
};
use serde::Serialize;
use tracing::info;

/// Live state of a submitted conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionSession {
    session_id: SessionId,
    settings: ConversionSettings,
    status: JobStatus,
    progress: f64,
    current_file: Option<String>,
    completed_count: usize,
    total_count: usize,
    results: Vec<FileResult>,
    errors: Vec<FileError>,
}

impl ConversionSession {
    /// Submit a conversion for `uploaded` with `settings`.
    ///
    /// The request is sent once. A transport failure is reported, not
    /// retried: the service may or may not have created the job.
    ///
    /// # Errors
    /// - [`SubmissionError::Invalid`] if `uploaded` is empty or the settings
    ///   are invalid (nothing is sent)
    /// - transport, rejection or decode errors from the service
    pub async fn submit(
        service: &dyn ConversionService,
        uploaded: &[UploadedFile],
        settings: ConversionSettings,
    ) -> Result<Self, SubmissionError> {
        if uploaded.is_empty() {
            return Err(SubmissionError::Invalid("no uploaded files".into()));
        }
        settings
            .validate()
            .map_err(|e| SubmissionError::Invalid(e.to_string()))?;

        let request = ConvertRequest {
            files: uploaded.iter().map(|f| f.path.clone()).collect(),
            mode: settings.mode,
            output_option: settings.output_option,
            destination_path: settings.destination().map(str::to_string),
        };

        let session_id = service.convert(&request).await?;
        info!(
            "Conversion {} started: {} files, mode {}, output {}",
            session_id,
            request.files.len(),
            settings.mode,
            settings.output_option
        );

        Ok(Self::new(session_id, settings, uploaded.len()))
    }

    pub(crate) fn new(session_id: SessionId, settings: ConversionSettings, total: usize) -> Self {
        Self {
            session_id,
            settings,
            status: JobStatus::Queued,
            progress: 0.0,
            current_file: None,
            completed_count: 0,
            total_count: total,
            results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Replace the aggregate with `snapshot`. No field survives from before.
    pub(crate) fn apply_snapshot(&mut self, snapshot: StatusSnapshot) {
        self.status = snapshot.status;
        self.progress = if snapshot.progress.is_finite() {
            snapshot.progress.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.current_file = snapshot.current_file;
        self.completed_count = snapshot.completed_files;
        self.total_count = snapshot.total_files;
        self.results = snapshot.results;
        self.errors = snapshot.errors;
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Fraction done, 0.0–1.0.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_file(&self) -> Option<&str> {
        self.current_file.as_deref()
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn results(&self) -> &[FileResult] {
        &self.results
    }

    pub fn errors(&self) -> &[FileError] {
        &self.errors
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Final outcome, once the service reported a terminal status.
    pub fn outcome(&self) -> Option<JobOutcome> {
        match self.status {
            JobStatus::Completed => Some(JobOutcome::Completed {
                converted: self.results.len(),
            }),
            JobStatus::CompletedWithErrors => Some(JobOutcome::CompletedWithErrors {
                converted: self.results.len(),
                errors: self.errors.clone(),
            }),
            JobStatus::Failed => Some(JobOutcome::Failed {
                errors: self.errors.clone(),
            }),
            JobStatus::Queued | JobStatus::Processing => None,
        }
    }
}

/// How a job ended, as reported by the service.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        converted: usize,
    },
    /// Some files converted; every failure is kept individually.
    CompletedWithErrors {
        converted: usize,
        errors: Vec<FileError>,
    },
    Failed {
        errors: Vec<FileError>,
    },
}

impl JobOutcome {
    /// One-line, user-facing summary.
    pub fn summary(&self) -> String {
        match self {
            JobOutcome::Completed { converted } => {
                format!("Conversion completed: {converted} documents converted")
            }
            JobOutcome::CompletedWithErrors { converted, errors } => format!(
                "Conversion completed with errors: {converted} converted, {} failed",
                errors.len()
            ),
            JobOutcome::Failed { .. } => {
                "Conversion failed. Please check the error messages above.".to_string()
            }
        }
    }

    /// Per-file failure lines, one per error.
    pub fn error_lines(&self) -> Vec<String> {
        match self {
            JobOutcome::Completed { .. } => Vec::new(),
            JobOutcome::CompletedWithErrors { errors, .. } | JobOutcome::Failed { errors } => {
                errors.iter().map(ToString::to_string).collect()
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}
