//! Fixed-interval status polling for one conversion.
//!
//! ```text
//!            begin()                 terminal snapshot
//!   Idle ──────────────▶ Polling ─────────────────────▶ Completed
//!                           │                            CompletedWithErrors
//!                           │ stop()                     Failed
//!                           ▼                               │ stop()
//!                        Stopped ◀──────────────────────────┘
//! ```
//!
//! The timer ticks at fixed intervals measured from `begin`. Each tick sends
//! one status query; if a response takes longer than the interval, the ticks
//! it overlapped are skipped rather than fired in a burst. A failed query
//! leaves the state untouched and the next tick proceeds.
//!
//! Stopping is cooperative. It prevents future ticks but does not abort a
//! request already on the wire; that response is dropped when it arrives.

use crate::error::PollError;
use crate::service::{ConversionService, JobStatus, SessionId, StatusSnapshot};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Poller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Polling,
    Completed,
    CompletedWithErrors,
    Failed,
    Stopped,
}

impl PollerState {
    fn terminal(status: JobStatus) -> Option<Self> {
        match status {
            JobStatus::Completed => Some(Self::Completed),
            JobStatus::CompletedWithErrors => Some(Self::CompletedWithErrors),
            JobStatus::Failed => Some(Self::Failed),
            JobStatus::Queued | JobStatus::Processing => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }
}

/// Receives what the poller observes.
///
/// Both methods return false when the receiver no longer considers `id`
/// live; the poller then stops.
pub trait SnapshotSink: Send + Sync {
    fn apply(&self, id: &SessionId, snapshot: StatusSnapshot) -> bool;

    fn poll_failed(&self, id: &SessionId, error: &PollError) -> bool {
        let _ = (id, error);
        true
    }
}

/// Polls `/status` for a single session.
pub struct StatusPoller {
    service: Arc<dyn ConversionService>,
    interval: Duration,
    state: Arc<Mutex<PollerState>>,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn new(service: Arc<dyn ConversionService>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(Duration::from_millis(1)),
            state: Arc::new(Mutex::new(PollerState::Idle)),
            token: CancellationToken::new(),
            task: None,
        }
    }

    pub fn state(&self) -> PollerState {
        *lock(&self.state)
    }

    /// True while the timer is running.
    pub fn is_active(&self) -> bool {
        self.state() == PollerState::Polling
    }

    /// Start polling `id`. Only valid from `Idle`; returns false otherwise.
    ///
    /// Must be called within a tokio runtime.
    pub fn begin(&mut self, id: SessionId, sink: Arc<dyn SnapshotSink>) -> bool {
        {
            let mut state = lock(&self.state);
            if *state != PollerState::Idle {
                warn!("Poller for {} not started: state is {:?}", id, *state);
                return false;
            }
            *state = PollerState::Polling;
        }

        info!("Polling {} every {:?}", id, self.interval);
        self.task = Some(tokio::spawn(poll_loop(
            Arc::clone(&self.service),
            id,
            self.interval,
            self.token.clone(),
            Arc::clone(&self.state),
            sink,
        )));
        true
    }

    /// Stop polling. Idempotent; a no-op while `Idle`.
    pub fn stop(&self) {
        let mut state = lock(&self.state);
        match *state {
            PollerState::Idle | PollerState::Stopped => {}
            _ => {
                debug!("Poller stopped from {:?}", *state);
                *state = PollerState::Stopped;
            }
        }
        self.token.cancel();
    }

    /// Wait for the background task to exit.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

fn lock(state: &Mutex<PollerState>) -> MutexGuard<'_, PollerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The sink dropped the session: stop without reaching a terminal state.
fn release(id: &SessionId, state: &Mutex<PollerState>, token: &CancellationToken) {
    debug!("Session {} no longer live; poller exiting", id);
    *lock(state) = PollerState::Stopped;
    token.cancel();
}

async fn poll_loop(
    service: Arc<dyn ConversionService>,
    id: SessionId,
    period: Duration,
    token: CancellationToken,
    state: Arc<Mutex<PollerState>>,
    sink: Arc<dyn SnapshotSink>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Queries are serial: at most one in flight. Ticks that elapse while
        // a response is outstanding collapse into one, so a slow service
        // stretches the cadence instead of stacking requests.
        let result = service.status(&id).await;

        if token.is_cancelled() {
            debug!("Discarding status response for {} after stop", id);
            break;
        }

        match result {
            Ok(snapshot) => {
                let status = snapshot.status;
                debug!(
                    "{}: {} {:.0}% ({}/{})",
                    id,
                    status,
                    snapshot.progress * 100.0,
                    snapshot.completed_files,
                    snapshot.total_files
                );

                if let Some(terminal) = PollerState::terminal(status) {
                    // Stop the timer before publishing so no tick can follow.
                    {
                        let mut current = lock(&state);
                        if *current != PollerState::Polling {
                            break;
                        }
                        *current = terminal;
                    }
                    token.cancel();
                    sink.apply(&id, snapshot);
                    info!("Conversion {} finished: {}", id, status);
                    break;
                }

                if !sink.apply(&id, snapshot) {
                    release(&id, &state, &token);
                    break;
                }
            }
            Err(e) => {
                warn!("Status query for {} failed: {}", id, e);
                if !sink.poll_failed(&id, &e) {
                    release(&id, &state, &token);
                    break;
                }
            }
        }
    }
}
