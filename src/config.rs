//! Configuration types for driving a conversion service.
//!
//! Two kinds of configuration live here:
//!
//! * [`ClientConfig`]: how to reach the service (base URL, polling cadence,
//!   HTTP timeout, where user settings are stored). Built via
//!   [`ClientConfigBuilder`].
//! * [`ConversionSettings`]: what a single conversion should do (mode and
//!   output placement). This is the value object passed into a session and
//!   never mutated afterwards.

use crate::error::{GiaconvertError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default service root, matching the bundled FastAPI server.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Connection and scheduling configuration for the client.
///
/// # Example
/// ```rust
/// use giaconvert_client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:8000/api/")
///     .poll_interval(Duration::from_millis(500))
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "http://localhost:8000/api");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root; endpoint paths are appended to it. Stored without a
    /// trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Interval between status queries. Default: 1 s.
    ///
    /// Ticks are scheduled from the moment polling begins, independent of
    /// how long each response takes.
    pub poll_interval: Duration,

    /// Per-request HTTP timeout. Default: 30 s.
    pub request_timeout: Duration,

    /// Explicit location of the persisted settings file. If None, the
    /// platform config directory is used (see [`crate::settings`]).
    pub settings_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            settings_path: None,
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval.max(Duration::from_millis(10));
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.settings_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, GiaconvertError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(GiaconvertError::InvalidConfig(format!(
                "base URL must be http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.request_timeout.is_zero() {
            return Err(GiaconvertError::InvalidConfig(
                "request timeout must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Conversion settings ──────────────────────────────────────────────────

/// Conversion depth requested from the service.
///
/// | Mode | Output |
/// |------|--------|
/// | `basic` | text and tables |
/// | `enhanced` | + optimised images (default) |
/// | `complete` | + headers, footers, page layout |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    Basic,
    #[default]
    Enhanced,
    Complete,
}

impl ConversionMode {
    pub const ALL: [ConversionMode; 3] = [Self::Basic, Self::Enhanced, Self::Complete];

    /// Wire key, as used by `/modes` and `/convert`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Enhanced => "enhanced",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ConversionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where converted HTML is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputOption {
    /// Next to each source document. (default)
    #[default]
    Beside,
    /// Under the destination, mirroring the source tree.
    Mirrored,
    /// All outputs flattened into the destination folder.
    SingleFolder,
}

impl OutputOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beside => "beside",
            Self::Mirrored => "mirrored",
            Self::SingleFolder => "single_folder",
        }
    }

    /// Every option except `Beside` writes to an explicit destination.
    pub fn requires_destination(&self) -> bool {
        !matches!(self, Self::Beside)
    }
}

impl fmt::Display for OutputOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode and output placement for one conversion.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversionSettings {
    pub mode: ConversionMode,
    pub output_option: OutputOption,
    pub destination_path: Option<String>,
}

impl ConversionSettings {
    pub fn new(mode: ConversionMode, output_option: OutputOption) -> Self {
        Self {
            mode,
            output_option,
            destination_path: None,
        }
    }

    pub fn with_destination(mut self, path: impl Into<String>) -> Self {
        self.destination_path = Some(path.into());
        self
    }

    /// Trimmed destination, or None when absent or blank.
    pub fn destination(&self) -> Option<&str> {
        self.destination_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Settings are valid unless a destination is required and blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.output_option.requires_destination() && self.destination().is_none() {
            return Err(ValidationError::MissingDestination {
                option: self.output_option.to_string(),
            });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}
