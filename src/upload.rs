//! Upload stage: transfer selected documents in a single batched request.

use crate::error::UploadError;
use crate::selection::SelectedFile;
use crate::service::{ConversionService, UploadPart, UploadedFile};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a successful upload. Holds exactly what the service stored.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub uploaded: Vec<UploadedFile>,
    pub requested: usize,
}

impl UploadReport {
    /// Some, but not all, files were stored.
    pub fn is_partial(&self) -> bool {
        self.uploaded.len() < self.requested
    }

    pub fn missing(&self) -> usize {
        self.requested.saturating_sub(self.uploaded.len())
    }
}

/// Reads selected files from disk and hands them to the service.
#[derive(Clone)]
pub struct UploadCoordinator {
    service: Arc<dyn ConversionService>,
}

impl UploadCoordinator {
    pub fn new(service: Arc<dyn ConversionService>) -> Self {
        Self { service }
    }

    /// Upload `files` as one multipart request.
    ///
    /// # Errors
    /// - [`UploadError::NoFiles`] for an empty slice (nothing is sent)
    /// - [`UploadError::Read`] if a file cannot be read
    /// - transport or rejection errors from the service
    /// - [`UploadError::NothingUploaded`] if the service stored zero files
    ///
    /// A partial result is not an error; check [`UploadReport::is_partial`].
    /// Missing files are never retried.
    pub async fn upload(&self, files: &[SelectedFile]) -> Result<UploadReport, UploadError> {
        if files.is_empty() {
            return Err(UploadError::NoFiles);
        }

        let mut parts = Vec::with_capacity(files.len());
        for file in files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| UploadError::Read {
                    path: file.path.clone(),
                    source,
                })?;
            parts.push(UploadPart {
                file_name: file.name.clone(),
                bytes,
            });
        }

        let uploaded = self.service.upload(parts).await?;
        let report = UploadReport {
            uploaded,
            requested: files.len(),
        };

        if report.uploaded.is_empty() {
            return Err(UploadError::NothingUploaded {
                requested: report.requested,
            });
        }
        if report.is_partial() {
            warn!(
                "Service stored {}/{} files; {} will not be converted",
                report.uploaded.len(),
                report.requested,
                report.missing()
            );
        } else {
            info!("Uploaded {} files", report.uploaded.len());
        }
        Ok(report)
    }
}
