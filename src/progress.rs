//! Progress-callback trait for lifecycle events.
//!
//! Inject an [`Arc<dyn LifecycleProgressCallback>`] via
//! [`crate::controller::LifecycleController::with_progress_callback`] to be
//! told about each stage as it happens. The read-only
//! [`crate::controller::LifecycleSnapshot`] channel carries the same state;
//! callbacks exist for consumers that want discrete events (a terminal
//! progress bar, a log line per poll failure) rather than the latest value.
//!
//! # Example
//!
//! ```rust
//! use giaconvert_client::LifecycleProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     snapshots: AtomicUsize,
//! }
//!
//! impl LifecycleProgressCallback for CountingCallback {
//!     fn on_snapshot(&self, session: &giaconvert_client::ConversionSession) {
//!         self.snapshots.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{:.0}%", session.progress() * 100.0);
//!     }
//! }
//! ```

use crate::service::SessionId;
use crate::session::{ConversionSession, JobOutcome};
use std::sync::Arc;

/// Called by the lifecycle controller and its poller.
///
/// Implementations must be `Send + Sync`: poll events are delivered from the
/// poller's background task. All methods default to no-ops.
pub trait LifecycleProgressCallback: Send + Sync {
    /// Called before the upload request is built.
    fn on_upload_start(&self, file_count: usize) {
        let _ = file_count;
    }

    /// Called after a successful upload. `uploaded < requested` means the
    /// service silently dropped some files.
    fn on_upload_complete(&self, uploaded: usize, requested: usize) {
        let _ = (uploaded, requested);
    }

    /// Called once the service accepted the conversion.
    fn on_submitted(&self, session_id: &SessionId, total_files: usize) {
        let _ = (session_id, total_files);
    }

    /// Called after each applied status snapshot.
    fn on_snapshot(&self, session: &ConversionSession) {
        let _ = session;
    }

    /// Called when a single status query failed. Polling continues.
    fn on_poll_error(&self, error: &str) {
        let _ = error;
    }

    /// Called once when the service reports a terminal status.
    fn on_finished(&self, outcome: &JobOutcome) {
        let _ = outcome;
    }

    /// Called when a live conversion is cancelled by the user.
    fn on_cancelled(&self) {}
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl LifecycleProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type held by the controller.
pub type ProgressCallback = Arc<dyn LifecycleProgressCallback>;
