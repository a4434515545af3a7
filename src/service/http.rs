//! reqwest implementation of [`ConversionService`].

use super::types::{ConvertResponse, ModesResponse};
use super::{
    ConversionService, ConvertRequest, ErrorEnvelope, ModeInfo, SessionId, StatusSnapshot,
    UploadPart, UploadedFile,
};
use crate::config::ClientConfig;
use crate::error::{
    ConnectivityError, GiaconvertError, PollError, SubmissionError, UploadError,
};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Talks to a GIACONVERT server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: Client,
    config: ClientConfig,
}

impl HttpConversionService {
    pub fn new(config: ClientConfig) -> Result<Self, GiaconvertError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GiaconvertError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// Read the error envelope of a non-success response.
async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    ErrorEnvelope::from_body(&body).message()
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn health(&self) -> Result<(), ConnectivityError> {
        let response = self
            .client
            .get(self.config.endpoint("health"))
            .send()
            .await
            .map_err(ConnectivityError::Transport)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ConnectivityError::Status(response.status().as_u16()))
        }
    }

    async fn modes(&self) -> Result<BTreeMap<String, ModeInfo>, ConnectivityError> {
        let response = self
            .client
            .get(self.config.endpoint("modes"))
            .send()
            .await
            .map_err(ConnectivityError::Transport)?;

        if !response.status().is_success() {
            return Err(ConnectivityError::Status(response.status().as_u16()));
        }

        let body: ModesResponse = response
            .json()
            .await
            .map_err(|e| ConnectivityError::Decode(e.to_string()))?;
        Ok(body.modes)
    }

    async fn upload(&self, parts: Vec<UploadPart>) -> Result<Vec<UploadedFile>, UploadError> {
        let count = parts.len();
        let form = parts.into_iter().fold(Form::new(), |form, part| {
            form.part("files", Part::bytes(part.bytes).file_name(part.file_name))
        });

        info!("Uploading {} files", count);
        let response = self
            .client
            .post(self.config.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Transport)?;

        if !response.status().is_success() {
            return Err(UploadError::Rejected {
                message: error_message(response).await,
            });
        }

        response
            .json()
            .await
            .map_err(|e| UploadError::Decode(e.to_string()))
    }

    async fn convert(&self, request: &ConvertRequest) -> Result<SessionId, SubmissionError> {
        let response = self
            .client
            .post(self.config.endpoint("convert"))
            .json(request)
            .send()
            .await
            .map_err(SubmissionError::Transport)?;

        if !response.status().is_success() {
            return Err(SubmissionError::Rejected {
                message: error_message(response).await,
            });
        }

        let body: ConvertResponse = response
            .json()
            .await
            .map_err(|e| SubmissionError::Decode(e.to_string()))?;
        Ok(body.conversion_id)
    }

    async fn status(&self, id: &SessionId) -> Result<StatusSnapshot, PollError> {
        let url = self.config.endpoint(&format!("status/{id}"));
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(PollError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Rejected {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PollError::Decode(e.to_string()))
    }
}
