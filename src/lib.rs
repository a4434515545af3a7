//! # giaconvert-client
//!
//! Drive Word-to-HTML conversion jobs on a GIACONVERT service.
//!
//! The service does the conversion; this crate does everything around it:
//! pick the right documents, upload them in one batch, submit the job, poll
//! until it finishes, and expose each step to a user interface.
//!
//! ## Lifecycle
//!
//! ```text
//! selection
//!  │  filter .docx/.doc, drop ~$lock and .hidden files
//!  ├─ 1. Upload   one multipart POST /upload       → UploadedFile[]
//!  ├─ 2. Submit   POST /convert (at most once)     → SessionId
//!  ├─ 3. Poll     GET /status/{id} every interval  → StatusSnapshot
//!  └─ 4. Finish   completed | completed_with_errors | failed
//! ```
//!
//! Upload and submission failures abort the run. A failed status query does
//! not: the poller logs it and tries again on the next tick.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use giaconvert_client::{
//!     ClientConfig, ConversionSettings, FileSelection, HttpConversionService,
//!     LifecycleController,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let service = Arc::new(HttpConversionService::new(config.clone())?);
//!     let controller = LifecycleController::new(service, config);
//!
//!     let mut selection = FileSelection::new();
//!     selection.load_folder("./reports")?;
//!
//!     controller
//!         .start(selection.files(), ConversionSettings::default())
//!         .await?;
//!     let done = controller.wait_for_completion().await;
//!     println!("{:?}", done.phase);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `giaconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod poller;
pub mod progress;
pub mod selection;
pub mod service;
pub mod session;
pub mod settings;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{check_health, load_modes, CatalogSource, ModeCatalog, ServiceHealth};
pub use config::{ClientConfig, ClientConfigBuilder, ConversionMode, ConversionSettings, OutputOption};
pub use controller::{LifecycleController, LifecyclePhase, LifecycleSnapshot, UploadSummary};
pub use error::{
    ConnectivityError, GiaconvertError, PollError, SettingsError, SubmissionError, UploadError,
    ValidationError,
};
pub use poller::{PollerState, SnapshotSink, StatusPoller};
pub use progress::{LifecycleProgressCallback, NoopProgressCallback, ProgressCallback};
pub use selection::{can_start, filter_accepted, is_accepted_name, FileSelection, SelectedFile};
pub use service::{
    ConversionService, ConvertRequest, FileError, FileResult, HttpConversionService, JobStatus,
    ModeInfo, SessionId, StatusSnapshot, UploadPart, UploadedFile,
};
pub use session::{ConversionSession, JobOutcome};
pub use settings::{SettingsStore, UserSettings};
pub use upload::{UploadCoordinator, UploadReport};
