//! End-to-end lifecycle tests against an in-process fake service.
//!
//! Time is paused so polling runs instantly and deterministically.

use async_trait::async_trait;
use giaconvert_client::{
    CatalogSource, ClientConfig, ConnectivityError, ConversionMode, ConversionService,
    ConversionSession, ConversionSettings, ConvertRequest, FileError, GiaconvertError, JobOutcome,
    JobStatus, LifecycleController, LifecyclePhase, LifecycleProgressCallback, ModeInfo,
    OutputOption, PollError, SelectedFile, SessionId, StatusSnapshot, SubmissionError,
    UploadError, UploadPart, UploadSummary, UploadedFile, ValidationError,
};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Fake service ─────────────────────────────────────────────────────────

struct FakeService {
    /// How many of the uploaded parts the service "stores".
    keep: usize,
    modes: Option<BTreeMap<String, ModeInfo>>,
    statuses: Mutex<VecDeque<Result<StatusSnapshot, PollError>>>,
    status_latency: Duration,
    upload_calls: AtomicUsize,
    convert_requests: Mutex<Vec<ConvertRequest>>,
    status_calls: AtomicUsize,
    sessions: AtomicUsize,
}

impl FakeService {
    fn new(keep: usize, statuses: Vec<Result<StatusSnapshot, PollError>>) -> Self {
        Self {
            keep,
            modes: None,
            statuses: Mutex::new(statuses.into()),
            status_latency: Duration::ZERO,
            upload_calls: AtomicUsize::new(0),
            convert_requests: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
            sessions: AtomicUsize::new(0),
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.status_latency = latency;
        self
    }

    fn with_modes(mut self, modes: BTreeMap<String, ModeInfo>) -> Self {
        self.modes = Some(modes);
        self
    }

    fn convert_calls(&self) -> usize {
        self.convert_requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ConversionService for FakeService {
    async fn health(&self) -> Result<(), ConnectivityError> {
        Ok(())
    }

    async fn modes(&self) -> Result<BTreeMap<String, ModeInfo>, ConnectivityError> {
        self.modes.clone().ok_or(ConnectivityError::Status(500))
    }

    async fn upload(&self, parts: Vec<UploadPart>) -> Result<Vec<UploadedFile>, UploadError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(parts
            .into_iter()
            .take(self.keep)
            .map(|p| UploadedFile {
                path: format!("/uploads/{}", p.file_name),
                filename: p.file_name,
                upload_id: None,
                size: Some(p.bytes.len() as u64),
            })
            .collect())
    }

    async fn convert(&self, request: &ConvertRequest) -> Result<SessionId, SubmissionError> {
        self.convert_requests.lock().unwrap().push(request.clone());
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionId::new(format!("conv-{n}")))
    }

    async fn status(&self, _: &SessionId) -> Result<StatusSnapshot, PollError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.status_latency).await;
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(snapshot(JobStatus::Processing, 0.5)))
    }
}

// ── Recording callback ───────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    progress: Mutex<Vec<f64>>,
    finished: AtomicUsize,
    poll_errors: AtomicUsize,
    cancelled: AtomicUsize,
}

impl LifecycleProgressCallback for Recorder {
    fn on_snapshot(&self, session: &ConversionSession) {
        self.progress.lock().unwrap().push(session.progress());
    }
    fn on_poll_error(&self, _: &str) {
        self.poll_errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_finished(&self, _: &JobOutcome) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
    fn on_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn snapshot(status: JobStatus, progress: f64) -> StatusSnapshot {
    StatusSnapshot {
        status,
        progress,
        total_files: 2,
        completed_files: (progress * 2.0) as usize,
        ..Default::default()
    }
}

fn documents(dir: &Path, names: &[&str]) -> Vec<SelectedFile> {
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            std::fs::write(&path, b"PK\x03\x04 fake word document").unwrap();
            SelectedFile::from_path(&path).unwrap()
        })
        .collect()
}

/// Route library logs to the test harness; filter with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn controller(service: Arc<FakeService>, recorder: Arc<Recorder>) -> LifecycleController {
    init_tracing();
    LifecycleController::new(service, ClientConfig::default()).with_progress_callback(recorder)
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_upload_result_never_submits() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx", "b.docx"]);
    let service = Arc::new(FakeService::new(0, Vec::new()));
    let ctl = controller(service.clone(), Arc::default());

    let err = ctl
        .start(&files, ConversionSettings::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GiaconvertError::Upload(UploadError::NothingUploaded { requested: 2 })
    ));
    assert_eq!(service.convert_calls(), 0);
    let snap = ctl.snapshot();
    assert_eq!(snap.phase, LifecyclePhase::Aborted);
    assert!(snap.session.is_none());
    assert!(snap
        .last_error
        .unwrap()
        .contains("No files were uploaded successfully"));
}

#[tokio::test(start_paused = true)]
async fn progress_sequence_runs_to_completion() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx", "b.doc"]);
    let service = Arc::new(FakeService::new(
        2,
        vec![
            Ok(snapshot(JobStatus::Queued, 0.0)),
            Ok(snapshot(JobStatus::Processing, 0.4)),
            Ok(snapshot(JobStatus::Processing, 0.9)),
            Ok(snapshot(JobStatus::Completed, 1.0)),
        ],
    ));
    let recorder = Arc::new(Recorder::default());
    let ctl = controller(service.clone(), recorder.clone());

    let id = ctl.start(&files, ConversionSettings::default()).await.unwrap();
    assert_eq!(id.as_ref(), "conv-1");
    assert_eq!(ctl.snapshot().phase, LifecyclePhase::Polling);

    let done = ctl.wait_for_completion().await;
    assert_eq!(done.phase, LifecyclePhase::Completed);
    let session = done.session.unwrap();
    assert_eq!(session.status(), JobStatus::Completed);
    assert_eq!(session.progress(), 1.0);

    // No further queries once terminal.
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 4);
    assert_eq!(*recorder.progress.lock().unwrap(), vec![0.0, 0.4, 0.9, 1.0]);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 1);

    let sent = &service.convert_requests.lock().unwrap()[0];
    assert_eq!(sent.files, vec!["/uploads/a.docx", "/uploads/b.doc"]);
    assert_eq!(sent.mode, ConversionMode::Enhanced);
}

#[tokio::test(start_paused = true)]
async fn response_after_cancel_does_not_mutate_session() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx"]);
    let service = Arc::new(
        FakeService::new(1, vec![Ok(snapshot(JobStatus::Completed, 1.0))])
            .with_latency(Duration::from_secs(5)),
    );
    let recorder = Arc::new(Recorder::default());
    let ctl = controller(service.clone(), recorder.clone());

    ctl.start(&files, ConversionSettings::default()).await.unwrap();

    // The first query is in flight from t=1s to t=6s.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 1);
    ctl.cancel();
    ctl.cancel();

    tokio::time::sleep(Duration::from_secs(10)).await;
    let snap = ctl.snapshot();
    assert_eq!(snap.phase, LifecyclePhase::Cancelled);
    let session = snap.session.unwrap();
    assert_eq!(session.status(), JobStatus::Queued);
    assert_eq!(session.progress(), 0.0);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 0);
    assert_eq!(recorder.cancelled.load(Ordering::SeqCst), 1);
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn second_start_replaces_live_session() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx"]);
    let service = Arc::new(
        FakeService::new(1, vec![Ok(snapshot(JobStatus::Completed, 1.0))])
            .with_latency(Duration::from_secs(5)),
    );
    let recorder = Arc::new(Recorder::default());
    let ctl = controller(service.clone(), recorder.clone());

    let first = ctl.start(&files, ConversionSettings::default()).await.unwrap();
    assert_eq!(first.as_ref(), "conv-1");

    // The first session's query is in flight from t=1s to t=6s.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(service.status_calls.load(Ordering::SeqCst), 1);
    let second = ctl.start(&files, ConversionSettings::default()).await.unwrap();
    assert_eq!(second.as_ref(), "conv-2");

    // The first session's `completed` arrives at t=6s.
    tokio::time::sleep(Duration::from_millis(4500)).await;
    let snap = ctl.snapshot();
    assert_eq!(snap.phase, LifecyclePhase::Polling);
    let session = snap.session.unwrap();
    assert_eq!(session.session_id().as_ref(), "conv-2");
    assert_eq!(session.status(), JobStatus::Queued);
    assert_eq!(session.progress(), 0.0);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 0);
    assert!(recorder.progress.lock().unwrap().is_empty());

    // The second session's own first answer lands at t=8s.
    tokio::time::sleep(Duration::from_secs(2)).await;
    let session = ctl.snapshot().session.unwrap();
    assert_eq!(session.session_id().as_ref(), "conv-2");
    assert_eq!(session.status(), JobStatus::Processing);
    assert_eq!(ctl.snapshot().phase, LifecyclePhase::Polling);
    assert_eq!(recorder.finished.load(Ordering::SeqCst), 0);
    assert_eq!(service.convert_calls(), 2);

    ctl.cancel();
}

#[tokio::test(start_paused = true)]
async fn restart_discards_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx"]);
    let service = Arc::new(FakeService::new(
        1,
        vec![Ok(snapshot(JobStatus::Completed, 1.0))],
    ));
    let ctl = controller(service, Arc::default());

    ctl.start(&files, ConversionSettings::default()).await.unwrap();
    ctl.wait_for_completion().await;

    ctl.restart();
    let snap = ctl.snapshot();
    assert_eq!(snap.phase, LifecyclePhase::Idle);
    assert!(snap.session.is_none());
    assert!(snap.upload.is_none());
    assert!(snap.last_error.is_none());
}

#[tokio::test]
async fn validation_failures_make_no_network_calls() {
    let service = Arc::new(FakeService::new(1, Vec::new()));
    let ctl = controller(service.clone(), Arc::default());

    let only_text = vec![
        SelectedFile::new("notes.txt", 3, "/nowhere/notes.txt"),
        SelectedFile::new("~$a.docx", 3, "/nowhere/~$a.docx"),
    ];
    let err = ctl
        .start(&only_text, ConversionSettings::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        GiaconvertError::Validation(ValidationError::NoAcceptedFiles)
    ));

    let docs = vec![SelectedFile::new("a.docx", 3, "/nowhere/a.docx")];
    let mirrored = ConversionSettings::new(ConversionMode::Basic, OutputOption::Mirrored);
    let err = ctl.start(&docs, mirrored).await.unwrap_err();
    assert!(matches!(
        err,
        GiaconvertError::Validation(ValidationError::MissingDestination { .. })
    ));

    assert_eq!(service.upload_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.convert_calls(), 0);
    let snap = ctl.snapshot();
    assert_eq!(snap.phase, LifecyclePhase::Idle);
    assert!(snap.last_error.is_some());
}

#[tokio::test(start_paused = true)]
async fn partial_upload_is_reported_and_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx", "b.docx", "c.docx"]);
    let service = Arc::new(FakeService::new(
        2,
        vec![Ok(snapshot(JobStatus::Completed, 1.0))],
    ));
    let ctl = controller(service.clone(), Arc::default());

    ctl.start(&files, ConversionSettings::default()).await.unwrap();
    assert_eq!(
        ctl.snapshot().upload,
        Some(UploadSummary {
            uploaded: 2,
            requested: 3
        })
    );
    assert_eq!(service.convert_requests.lock().unwrap()[0].files.len(), 2);
    assert_eq!(
        ctl.wait_for_completion().await.phase,
        LifecyclePhase::Completed
    );
}

#[tokio::test(start_paused = true)]
async fn failed_job_reports_generic_message() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx"]);
    let failed = StatusSnapshot {
        status: JobStatus::Failed,
        progress: 1.0,
        errors: vec![FileError {
            source_file: Some("a.docx".into()),
            error: "corrupt archive".into(),
            error_code: Some("CONVERSION_FAILED".into()),
        }],
        ..Default::default()
    };
    let service = Arc::new(FakeService::new(1, vec![Ok(failed)]));
    let ctl = controller(service, Arc::default());

    ctl.start(&files, ConversionSettings::default()).await.unwrap();
    let done = ctl.wait_for_completion().await;

    assert_eq!(done.phase, LifecyclePhase::Failed);
    assert_eq!(
        done.last_error.as_deref(),
        Some("Conversion failed. Please check the error messages above.")
    );
    let outcome = done.session.unwrap().outcome().unwrap();
    assert_eq!(outcome.error_lines().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn poll_errors_do_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let files = documents(dir.path(), &["a.docx"]);
    let service = Arc::new(FakeService::new(
        1,
        vec![
            Err(PollError::Rejected {
                status: 503,
                message: "busy".into(),
            }),
            Ok(snapshot(JobStatus::CompletedWithErrors, 1.0)),
        ],
    ));
    let recorder = Arc::new(Recorder::default());
    let ctl = controller(service, recorder.clone());

    ctl.start(&files, ConversionSettings::default()).await.unwrap();
    let done = ctl.wait_for_completion().await;

    assert_eq!(done.phase, LifecyclePhase::CompletedWithErrors);
    assert_eq!(recorder.poll_errors.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn modes_fall_back_to_builtin_catalog() {
    let failing = Arc::new(FakeService::new(0, Vec::new()));
    let catalog = controller(failing, Arc::default()).load_modes().await;
    assert_eq!(catalog.source, CatalogSource::BuiltIn);
    let keys: Vec<_> = catalog.modes.keys().cloned().collect();
    assert_eq!(keys, vec!["basic", "complete", "enhanced"]);
    assert!(catalog.modes.values().all(|m| !m.features.is_empty()));

    let empty = Arc::new(FakeService::new(0, Vec::new()).with_modes(BTreeMap::new()));
    let catalog = controller(empty, Arc::default()).load_modes().await;
    assert_eq!(catalog.source, CatalogSource::BuiltIn);

    let served = BTreeMap::from([(
        "basic".to_string(),
        ModeInfo {
            name: "Basic".into(),
            description: "Text only".into(),
            features: vec!["Text".into()],
        },
    )]);
    let live = Arc::new(FakeService::new(0, Vec::new()).with_modes(served));
    let catalog = controller(live, Arc::default()).load_modes().await;
    assert_eq!(catalog.source, CatalogSource::Service);
    assert_eq!(catalog.modes.len(), 1);
}
