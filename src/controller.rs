//! The conversion lifecycle: upload → submit → poll → finish.
//!
//! [`LifecycleController`] owns the one live [`ConversionSession`] and
//! publishes it through a `tokio::sync::watch` channel. Observers get
//! read-only [`LifecycleSnapshot`]s; only the controller and the poller it
//! started write to the channel.
//!
//! Every command bumps a generation counter stored next to the session.
//! Work started under an older generation (an upload still in flight, a
//! status response arriving after `cancel`) checks it before writing and
//! drops its result if it no longer matches, so a stale response can never
//! resurrect a cancelled or replaced session.

use crate::catalog::{self, ModeCatalog, ServiceHealth};
use crate::config::{ClientConfig, ConversionSettings};
use crate::error::{GiaconvertError, PollError};
use crate::poller::{SnapshotSink, StatusPoller};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::selection::{self, SelectedFile};
use crate::service::{ConversionService, JobStatus, SessionId, StatusSnapshot};
use crate::session::ConversionSession;
use crate::upload::UploadCoordinator;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{info, warn};

/// Where the lifecycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    #[default]
    Idle,
    Uploading,
    Submitting,
    Polling,
    Completed,
    CompletedWithErrors,
    Failed,
    /// Upload or submission failed; `last_error` says why.
    Aborted,
    /// Stopped by the user; the last observed session is kept.
    Cancelled,
}

impl LifecyclePhase {
    /// Upload, submission or polling is in progress.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Uploading | Self::Submitting | Self::Polling)
    }

    /// Nothing further will happen without a new command.
    pub fn is_settled(&self) -> bool {
        !self.is_active()
    }
}

/// Upload counts of the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub requested: usize,
}

/// Read-only view of the lifecycle, as published to observers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LifecycleSnapshot {
    pub phase: LifecyclePhase,
    pub session: Option<ConversionSession>,
    pub upload: Option<UploadSummary>,
    pub last_error: Option<String>,
    #[serde(skip)]
    generation: u64,
}

impl LifecycleSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Coordinates upload, submission and polling for one session at a time.
pub struct LifecycleController {
    service: Arc<dyn ConversionService>,
    config: ClientConfig,
    uploader: UploadCoordinator,
    state: Arc<watch::Sender<LifecycleSnapshot>>,
    poller: Mutex<Option<StatusPoller>>,
    callback: ProgressCallback,
}

impl LifecycleController {
    pub fn new(service: Arc<dyn ConversionService>, config: ClientConfig) -> Self {
        let (state, _) = watch::channel(LifecycleSnapshot::default());
        Self {
            uploader: UploadCoordinator::new(Arc::clone(&service)),
            service,
            config,
            state: Arc::new(state),
            poller: Mutex::new(None),
            callback: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.callback = callback;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Observe lifecycle changes.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleSnapshot> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> LifecycleSnapshot {
        self.state.borrow().clone()
    }

    pub async fn check_health(&self) -> ServiceHealth {
        catalog::check_health(self.service.as_ref()).await
    }

    pub async fn load_modes(&self) -> ModeCatalog {
        catalog::load_modes(self.service.as_ref()).await
    }

    /// Run upload → submit → poll for `files` with `settings`.
    ///
    /// Returns once polling has begun; follow progress via [`Self::subscribe`]
    /// or [`Self::wait_for_completion`]. A live session is cancelled first.
    ///
    /// # Errors
    /// - [`GiaconvertError::Validation`]: guard failed, nothing was sent
    /// - [`GiaconvertError::Upload`]: upload failed or stored no files
    /// - [`GiaconvertError::Submission`]: `/convert` failed
    /// - [`GiaconvertError::Superseded`]: `cancel`/`restart` ran meanwhile
    pub async fn start(
        &self,
        files: &[SelectedFile],
        settings: ConversionSettings,
    ) -> Result<SessionId, GiaconvertError> {
        let accepted = match selection::check_start(files, &settings) {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Conversion not started: {}", e);
                let message = e.to_string();
                self.state.send_modify(|s| s.last_error = Some(message));
                return Err(e.into());
            }
        };

        let generation = self.begin_generation();
        info!(
            "Starting conversion of {} documents (mode {})",
            accepted.len(),
            settings.mode
        );

        // ── Upload ───────────────────────────────────────────────────────
        self.callback.on_upload_start(accepted.len());
        let report = match self.uploader.upload(&accepted).await {
            Ok(report) => report,
            Err(e) => return Err(self.abort(generation, e.into())),
        };
        let summary = UploadSummary {
            uploaded: report.uploaded.len(),
            requested: report.requested,
        };
        if !self.advance(generation, |s| {
            s.upload = Some(summary);
            s.phase = LifecyclePhase::Submitting;
        }) {
            return Err(GiaconvertError::Superseded);
        }
        self.callback
            .on_upload_complete(summary.uploaded, summary.requested);

        // ── Submit ───────────────────────────────────────────────────────
        let session =
            match ConversionSession::submit(self.service.as_ref(), &report.uploaded, settings)
                .await
            {
                Ok(session) => session,
                Err(e) => return Err(self.abort(generation, e.into())),
            };
        let id = session.session_id().clone();
        let total = session.total_count();
        if !self.advance(generation, |s| {
            s.session = Some(session);
            s.phase = LifecyclePhase::Polling;
        }) {
            warn!("Conversion {} submitted after cancellation; ignoring it", id);
            return Err(GiaconvertError::Superseded);
        }
        self.callback.on_submitted(&id, total);

        // ── Poll ─────────────────────────────────────────────────────────
        let sink = Arc::new(SessionSink {
            state: Arc::clone(&self.state),
            generation,
            callback: Arc::clone(&self.callback),
        });
        let mut poller = StatusPoller::new(Arc::clone(&self.service), self.config.poll_interval);
        poller.begin(id.clone(), sink);

        let mut slot = self.lock_poller();
        if self.state.borrow().generation != generation {
            poller.stop();
            return Err(GiaconvertError::Superseded);
        }
        if let Some(previous) = slot.replace(poller) {
            previous.stop();
        }

        Ok(id)
    }

    /// Stop polling and keep the last observed session. Idempotent.
    pub fn cancel(&self) {
        let mut was_active = false;
        self.invalidate(|s| {
            if s.phase.is_active() {
                was_active = true;
                s.phase = LifecyclePhase::Cancelled;
            }
        });
        if was_active {
            info!("Conversion cancelled");
            self.callback.on_cancelled();
        }
    }

    /// Discard the session entirely and return to idle.
    pub fn restart(&self) {
        self.invalidate(|s| {
            *s = LifecycleSnapshot {
                generation: s.generation,
                ..LifecycleSnapshot::default()
            };
        });
        info!("Lifecycle reset");
    }

    /// Resolve once the lifecycle is settled (terminal, aborted, cancelled
    /// or idle) and return that state.
    pub async fn wait_for_completion(&self) -> LifecycleSnapshot {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|s| s.phase.is_settled()).await;
        match settled {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Option<StatusPoller>> {
        self.poller
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stop_poller(&self) {
        if let Some(poller) = self.lock_poller().take() {
            poller.stop();
        }
    }

    /// Take the poller out and bump the generation in one step, then apply
    /// `f`. Holding the slot keeps `start` from installing a poller for the
    /// generation being retired.
    fn invalidate(&self, f: impl FnOnce(&mut LifecycleSnapshot)) {
        let previous = {
            let mut slot = self.lock_poller();
            self.state.send_modify(|s| {
                s.generation += 1;
                f(s);
            });
            slot.take()
        };
        if let Some(poller) = previous {
            poller.stop();
        }
    }

    /// Invalidate older work and reset to a fresh upload.
    fn begin_generation(&self) -> u64 {
        let mut generation = 0;
        self.invalidate(|s| {
            generation = s.generation;
            *s = LifecycleSnapshot {
                phase: LifecyclePhase::Uploading,
                generation,
                ..LifecycleSnapshot::default()
            };
        });
        generation
    }

    /// Apply `f` only if `generation` is still current.
    fn advance(&self, generation: u64, f: impl FnOnce(&mut LifecycleSnapshot)) -> bool {
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            f(s);
            true
        })
    }

    /// Record a stage failure (if still current) and hand the error back.
    fn abort(&self, generation: u64, error: GiaconvertError) -> GiaconvertError {
        let message = error.to_string();
        if self.advance(generation, |s| {
            s.phase = LifecyclePhase::Aborted;
            s.last_error = Some(message);
        }) {
            warn!("Conversion aborted: {}", error);
            error
        } else {
            GiaconvertError::Superseded
        }
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        self.stop_poller();
    }
}

/// Writes poller snapshots into the controller's state, if still live.
struct SessionSink {
    state: Arc<watch::Sender<LifecycleSnapshot>>,
    generation: u64,
    callback: ProgressCallback,
}

impl SnapshotSink for SessionSink {
    fn apply(&self, id: &SessionId, snapshot: StatusSnapshot) -> bool {
        let mut applied = None;
        self.state.send_if_modified(|s| {
            if s.generation != self.generation || s.phase != LifecyclePhase::Polling {
                return false;
            }
            let Some(session) = s.session.as_mut() else {
                return false;
            };
            if session.session_id() != id {
                return false;
            }

            session.apply_snapshot(snapshot);
            s.phase = match session.status() {
                JobStatus::Completed => LifecyclePhase::Completed,
                JobStatus::CompletedWithErrors => LifecyclePhase::CompletedWithErrors,
                JobStatus::Failed => {
                    s.last_error = session.outcome().map(|o| o.summary());
                    LifecyclePhase::Failed
                }
                JobStatus::Queued | JobStatus::Processing => LifecyclePhase::Polling,
            };
            applied = Some(session.clone());
            true
        });

        let Some(session) = applied else {
            return false;
        };
        self.callback.on_snapshot(&session);
        if let Some(outcome) = session.outcome() {
            self.callback.on_finished(&outcome);
        }
        true
    }

    fn poll_failed(&self, _id: &SessionId, error: &PollError) -> bool {
        let live = {
            let s = self.state.borrow();
            s.generation == self.generation && s.phase == LifecyclePhase::Polling
        };
        if live {
            self.callback.on_poll_error(&error.to_string());
        }
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_classification() {
        assert!(LifecyclePhase::Uploading.is_active());
        assert!(LifecyclePhase::Polling.is_active());
        assert!(LifecyclePhase::Idle.is_settled());
        assert!(LifecyclePhase::Aborted.is_settled());
        assert!(LifecyclePhase::Cancelled.is_settled());
        assert!(LifecyclePhase::CompletedWithErrors.is_settled());
    }

    #[test]
    fn sink_reports_retired_session_as_dead() {
        let (tx, _rx) = watch::channel(LifecycleSnapshot {
            phase: LifecyclePhase::Polling,
            generation: 3,
            ..LifecycleSnapshot::default()
        });
        let state = Arc::new(tx);
        let sink = SessionSink {
            state: Arc::clone(&state),
            generation: 3,
            callback: Arc::new(NoopProgressCallback),
        };
        let id = SessionId::new("s");
        let error = PollError::Decode("truncated".into());
        assert!(sink.poll_failed(&id, &error));

        state.send_modify(|s| {
            s.generation += 1;
            s.phase = LifecyclePhase::Cancelled;
        });
        assert!(!sink.poll_failed(&id, &error));
    }

    #[test]
    fn snapshot_json_omits_generation() {
        let v = serde_json::to_value(LifecycleSnapshot::default()).unwrap();
        assert_eq!(v["phase"], "idle");
        assert!(v.get("generation").is_none());
    }
}
