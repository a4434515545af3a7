//! Request and response shapes of the conversion service.
//!
//! Field names follow the service's JSON. Optional and nullable fields are
//! decoded leniently: the service is authoritative, and a snapshot with a
//! missing list is an empty list, not a protocol error.

use crate::config::{ConversionMode, OutputOption};
use crate::error::UNKNOWN_ERROR;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque conversion identifier issued by `/convert`.
///
/// Never parsed; only compared, displayed and echoed back in `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One file part of a batched upload.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// A file stored by the service, as returned from `/upload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Server-side reference passed back to `/convert`.
    pub path: String,
    /// Original file name.
    #[serde(default, alias = "name")]
    pub filename: String,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Body of `POST /convert`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertRequest {
    pub files: Vec<String>,
    pub mode: ConversionMode,
    pub output_option: OutputOption,
    /// `null` means "beside original".
    pub destination_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ConvertResponse {
    pub conversion_id: SessionId,
}

/// Job state as reported by `/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    #[serde(alias = "pending")]
    Queued,
    Processing,
    Completed,
    CompletedWithErrors,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::CompletedWithErrors => "completed_with_errors",
            Self::Failed => "failed",
        })
    }
}

/// Per-file success entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileResult {
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub images_extracted: u32,
    #[serde(default)]
    pub images_dir: Option<String>,
}

/// Per-file failure entry. `source_file` is absent for job-level failures.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileError {
    #[serde(default)]
    pub source_file: Option<String>,
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_code: Option<String>,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = if self.error.is_empty() {
            UNKNOWN_ERROR
        } else {
            self.error.as_str()
        };
        match (&self.source_file, &self.error_code) {
            (Some(src), Some(code)) => write!(f, "{src}: {message} [{code}]"),
            (Some(src), None) => write!(f, "{src}: {message}"),
            (None, Some(code)) => write!(f, "{message} [{code}]"),
            (None, None) => f.write_str(message),
        }
    }
}

/// One `/status` response. Replaces the session aggregate wholesale.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub completed_files: usize,
    #[serde(default)]
    pub total_files: usize,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub results: Vec<FileResult>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub errors: Vec<FileError>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Description of a conversion mode from `/modes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModesResponse {
    pub modes: BTreeMap<String, ModeInfo>,
}

/// Error body of any non-success response: `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorEnvelope {
    /// Human-readable message; missing or blank becomes [`UNKNOWN_ERROR`].
    pub fn message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(UNKNOWN_ERROR)
            .to_string()
    }

    /// Decode a raw body; anything unparseable yields the fallback envelope.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_read_as_queued() {
        let s: StatusSnapshot = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert_eq!(s.status, JobStatus::Queued);
        assert!(s.results.is_empty());
    }

    #[test]
    fn snapshot_tolerates_null_lists() {
        let s: StatusSnapshot = serde_json::from_str(
            r#"{"status":"completed_with_errors","progress":1.0,"current_file":null,
                "completed_files":1,"total_files":2,"results":null,
                "errors":[{"source_file":"/u/b.docx","error":"bad zip","error_code":"CONVERSION_FAILED"}]}"#,
        )
        .unwrap();
        assert!(s.status.is_terminal());
        assert!(s.results.is_empty());
        assert_eq!(
            s.errors[0].to_string(),
            "/u/b.docx: bad zip [CONVERSION_FAILED]"
        );
    }

    #[test]
    fn uploaded_file_accepts_name_alias() {
        let f: UploadedFile = serde_json::from_str(r#"{"path":"/u/1_a.docx","name":"a.docx"}"#).unwrap();
        assert_eq!(f.filename, "a.docx");
        assert_eq!(f.upload_id, None);
    }

    #[test]
    fn convert_request_sends_null_destination() {
        let req = ConvertRequest {
            files: vec!["/u/1_a.docx".into()],
            mode: ConversionMode::Complete,
            output_option: OutputOption::Beside,
            destination_path: None,
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "files": ["/u/1_a.docx"],
                "mode": "complete",
                "output_option": "beside",
                "destination_path": null
            })
        );
    }

    #[test]
    fn envelope_message_fallback() {
        assert_eq!(ErrorEnvelope::from_body("not json").message(), UNKNOWN_ERROR);
        assert_eq!(ErrorEnvelope::from_body(r#"{"error":{}}"#).message(), UNKNOWN_ERROR);
        assert_eq!(
            ErrorEnvelope::from_body(r#"{"error":{"code":"HTTP_400","message":"Invalid conversion mode: x"}}"#)
                .message(),
            "Invalid conversion mode: x"
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::CompletedWithErrors.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
