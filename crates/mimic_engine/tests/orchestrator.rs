use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use mimic_core::{ActionStep, CredentialField, JobStage, JobStatus, Stage, WorkflowError};
use mimic_engine::{
    AnalysisResults, ApiError, AutomationApi, HealthReport, PollSettings, ProgressSink,
    SessionProvider, SessionStore, StatusReport, TriggerAck, UploadedVideo, VideoFile, VideoList,
    WorkflowOrchestrator, WorkflowSettings,
};
use pretty_assertions::assert_eq;

static INIT: Once = Once::new();

fn init_logging() {
    INIT.call_once(mimic_logging::initialize_for_tests);
}

struct FakeApi {
    uploads: Mutex<VecDeque<Result<UploadedVideo, ApiError>>>,
    stages: Mutex<VecDeque<JobStage>>,
    steps: Vec<ActionStep>,
    upload_calls: AtomicU32,
    status_calls: AtomicU32,
    trigger_calls: AtomicU32,
}

impl FakeApi {
    fn new(stages: &[JobStage], steps: Vec<ActionStep>) -> Arc<Self> {
        Arc::new(Self {
            uploads: Mutex::new(VecDeque::new()),
            stages: Mutex::new(stages.iter().copied().collect()),
            steps,
            upload_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            trigger_calls: AtomicU32::new(0),
        })
    }

    fn fail_next_upload(&self, err: ApiError) {
        self.uploads.lock().unwrap().push_back(Err(err));
    }

    fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn upload_calls(&self) -> u32 {
        self.upload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AutomationApi for FakeApi {
    async fn upload_video(
        &self,
        token: &str,
        file: &VideoFile,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<UploadedVideo, ApiError> {
        assert_eq!(token, "tok");
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(outcome) = self.uploads.lock().unwrap().pop_front() {
            return outcome;
        }
        for percent in [0, 40, 40, 90, 100] {
            sink.emit(percent);
        }
        Ok(UploadedVideo {
            video_id: "vid-1".into(),
            filename: None,
            original_name: Some(file.file_name.clone()),
            file_size: Some(file.len()),
            upload_timestamp: None,
        })
    }

    async fn trigger_analysis(
        &self,
        _token: &str,
        _video_id: &str,
    ) -> Result<TriggerAck, ApiError> {
        self.trigger_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TriggerAck {
            status: Some("processing".into()),
        })
    }

    async fn analysis_status(
        &self,
        _token: &str,
        video_id: &str,
    ) -> Result<StatusReport, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let stage = {
            let mut stages = self.stages.lock().unwrap();
            if stages.len() > 1 {
                stages.pop_front().unwrap()
            } else {
                *stages.front().unwrap()
            }
        };
        Ok(StatusReport {
            video_id: video_id.into(),
            analysis: stage,
            analysis_steps: None,
            analysis_error: (stage == JobStage::Failed).then(|| "no actions found".to_string()),
            execution_status: None,
            execution_log: Vec::new(),
            execution_error: None,
            last_updated: None,
        })
    }

    async fn analysis_results(
        &self,
        _token: &str,
        video_id: &str,
    ) -> Result<AnalysisResults, ApiError> {
        Ok(AnalysisResults {
            analysis: JobStatus::new(video_id, JobStage::Completed).with_steps(self.steps.clone()),
            execution: None,
        })
    }

    async fn list_videos(&self, _token: &str) -> Result<VideoList, ApiError> {
        Ok(VideoList {
            videos: Vec::new(),
            count: 0,
        })
    }

    async fn health(&self) -> Result<HealthReport, ApiError> {
        Ok(HealthReport {
            automation_service: "healthy".into(),
            mcp_server: "connected".into(),
            timestamp: None,
        })
    }
}

fn steps() -> Vec<ActionStep> {
    let mut open = ActionStep::new(0, "goto");
    open.url = Some("https://shop.example".into());
    let mut buy = ActionStep::new(1, "click");
    buy.selector = Some("#buy".into());
    vec![open, buy]
}

fn orchestrator(api: Arc<FakeApi>, token: Option<&str>) -> WorkflowOrchestrator {
    init_logging();
    let session: Arc<dyn SessionProvider> = match token {
        Some(token) => Arc::new(SessionStore::with_token(token)),
        None => Arc::new(SessionStore::new()),
    };
    WorkflowOrchestrator::new(
        api,
        session,
        WorkflowSettings {
            poll: PollSettings {
                interval: Duration::from_secs(3),
                max_attempts: 5,
            },
            max_upload_bytes: 1024,
        },
    )
}

fn video() -> VideoFile {
    VideoFile::new("checkout.mp4", "video/mp4", vec![1u8; 512])
}

#[tokio::test]
async fn non_video_file_is_rejected_without_upload() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api.clone(), Some("tok"));

    let file = VideoFile::new("notes.pdf", "application/pdf", vec![1u8; 10]);
    let err = orch.submit_upload(&file).await.unwrap_err();

    assert_eq!(err, WorkflowError::UnsupportedMediaType("application/pdf".into()));
    assert_eq!(orch.state().stage(), Stage::Upload);
    assert_eq!(orch.state().last_error(), Some(&err));
    assert!(!orch.state().is_busy());
    assert_eq!(api.upload_calls(), 0);
}

#[tokio::test]
async fn upload_without_session_requires_auth() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api.clone(), None);

    let err = orch.submit_upload(&video()).await.unwrap_err();

    assert_eq!(err, WorkflowError::AuthRequired);
    assert_eq!(orch.state().stage(), Stage::Upload);
    assert_eq!(orch.state().last_error(), Some(&WorkflowError::AuthRequired));
    assert!(!orch.state().is_busy());
    assert_eq!(api.upload_calls(), 0);
}

#[tokio::test]
async fn oversized_upload_is_refused_locally() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api.clone(), Some("tok"));

    let file = VideoFile::new("long.mp4", "video/mp4", vec![0u8; 2048]);
    let err = orch.submit_upload(&file).await.unwrap_err();

    assert_eq!(
        err,
        WorkflowError::TooLarge {
            max_bytes: 1024,
            actual: 2048
        }
    );
    assert_eq!(api.upload_calls(), 0);
    assert!(!orch.state().is_busy());
}

#[tokio::test]
async fn network_failure_is_retryable() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    api.fail_next_upload(ApiError::Network("connection reset".into()));
    let mut orch = orchestrator(api.clone(), Some("tok"));

    let err = orch.submit_upload(&video()).await.unwrap_err();
    assert_eq!(err, WorkflowError::NetworkFailure("connection reset".into()));
    assert_eq!(orch.state().stage(), Stage::Upload);
    assert!(!orch.state().is_busy());

    let artifact = orch.submit_upload(&video()).await.unwrap();
    assert_eq!(artifact, "vid-1");
    assert_eq!(orch.state().stage(), Stage::Analyze);
    assert_eq!(orch.state().last_error(), None);
    assert_eq!(api.upload_calls(), 2);
}

#[tokio::test]
async fn upload_progress_is_monotonic_and_finishes_at_100() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api, Some("tok"));
    let mut progress = orch.upload_progress();

    orch.submit_upload(&video()).await.unwrap();

    assert!(progress.has_changed().unwrap());
    assert_eq!(*progress.borrow_and_update(), 100);
}

#[tokio::test(start_paused = true)]
async fn full_wizard_run_resets_after_generate() {
    let api = FakeApi::new(&[JobStage::Processing, JobStage::Completed], steps());
    let mut orch = orchestrator(api.clone(), Some("tok"));
    let states = orch.subscribe();

    orch.submit_upload(&video()).await.unwrap();
    assert_eq!(orch.state().stage(), Stage::Analyze);
    assert_eq!(orch.state().uploaded_artifact_id(), Some("vid-1"));

    let status = orch.start_analysis().await.unwrap();
    assert_eq!(status.steps.len(), 2);
    assert_eq!(api.trigger_calls.load(Ordering::SeqCst), 1);
    assert_eq!(api.status_calls(), 2);
    assert_eq!(orch.state().stage(), Stage::Credentials);
    assert_eq!(orch.state().analysis_result().unwrap().steps.len(), 2);
    assert!(orch.can_advance());

    let first = orch.add_credential().unwrap();
    let second = orch.add_credential().unwrap();
    assert_ne!(first, second);
    orch.update_credential(&first, CredentialField::Label, "shop");
    assert_eq!(orch.state().credentials().len(), 2);

    assert_eq!(orch.proceed().unwrap(), Stage::Generate);

    let script = orch.generate_and_run().unwrap();
    assert_eq!(script.artifact_id, "vid-1");
    assert_eq!(script.file_name.as_deref(), Some("checkout.mp4"));
    assert_eq!(script.step_count, 2);
    assert!(script.source.contains("page.goto('https://shop.example'"));
    assert!(script.source.contains("MIMIC_SHOP_USERNAME"));

    assert_eq!(orch.state().stage(), Stage::Upload);
    assert!(orch.state().credentials().is_empty());
    assert_eq!(orch.state().uploaded_artifact_id(), None);
    assert_eq!(*states.borrow(), *orch.state());
}

#[tokio::test(start_paused = true)]
async fn going_back_keeps_analysis() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api, Some("tok"));
    orch.submit_upload(&video()).await.unwrap();
    orch.start_analysis().await.unwrap();
    let analysis = orch.state().analysis_result().cloned();

    assert_eq!(orch.go_back().unwrap(), Stage::Analyze);
    assert_eq!(orch.state().analysis_result().cloned(), analysis);
    assert!(orch.can_advance());

    assert_eq!(orch.proceed().unwrap(), Stage::Credentials);
}

#[tokio::test(start_paused = true)]
async fn failed_analysis_stays_on_analyze() {
    let api = FakeApi::new(&[JobStage::Queued, JobStage::Failed], steps());
    let mut orch = orchestrator(api, Some("tok"));
    orch.submit_upload(&video()).await.unwrap();

    let err = orch.start_analysis().await.unwrap_err();

    assert_eq!(err, WorkflowError::Failed("no actions found".into()));
    assert_eq!(orch.state().stage(), Stage::Analyze);
    assert_eq!(orch.state().last_polled(), Some(JobStage::Failed));
    assert!(!orch.state().is_busy());
    assert!(!orch.can_advance());
}

#[tokio::test(start_paused = true)]
async fn poll_timeout_leaves_analysis_retryable() {
    let api = FakeApi::new(&[JobStage::Processing], steps());
    let mut orch = orchestrator(api.clone(), Some("tok"));
    orch.submit_upload(&video()).await.unwrap();

    let err = orch.start_analysis().await.unwrap_err();
    assert_eq!(err, WorkflowError::Timeout { attempts: 5 });
    assert_eq!(api.status_calls(), 5);
    assert_eq!(orch.state().stage(), Stage::Analyze);
    assert_eq!(orch.state().last_error(), Some(&err));
    assert!(!orch.state().is_busy());

    api.stages.lock().unwrap().push_front(JobStage::Completed);
    let status = orch.start_analysis().await.unwrap();
    assert!(status.is_completed());
    assert_eq!(orch.state().stage(), Stage::Credentials);
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_poll_freezes_state() {
    let api = FakeApi::new(&[JobStage::Queued], steps());
    let mut orch = orchestrator(api.clone(), Some("tok"));
    orch.submit_upload(&video()).await.unwrap();

    let handle = orch.cancel_handle();
    let states = orch.subscribe();
    let (result, snapshot) = tokio::join!(orch.start_analysis(), async {
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        let snapshot = states.borrow().clone();
        handle.cancel();
        snapshot
    });

    assert_eq!(result.unwrap_err(), WorkflowError::Cancelled);
    assert_eq!(snapshot.last_polled(), Some(JobStage::Queued));
    let calls = api.status_calls();
    assert_eq!(calls, 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(api.status_calls(), calls);
    assert_eq!(*orch.state(), snapshot);
    assert_eq!(*states.borrow(), snapshot);

    assert!(!orch.is_active());
    assert_eq!(orch.submit_upload(&video()).await, Err(WorkflowError::Cancelled));
    assert_eq!(orch.add_credential(), None);
    orch.reset();
    assert_eq!(*orch.state(), snapshot);
}

#[tokio::test]
async fn proceed_requires_stage_precondition() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api, Some("tok"));

    assert_eq!(
        orch.proceed(),
        Err(WorkflowError::PreconditionUnmet {
            stage: Stage::Upload
        })
    );
    assert_eq!(orch.go_back(), Ok(Stage::Upload));
    assert_eq!(
        orch.start_analysis().await,
        Err(WorkflowError::WrongStage {
            expected: Stage::Analyze,
            actual: Stage::Upload
        })
    );
    assert_eq!(orch.state().last_error(), None);
}

#[tokio::test]
async fn credential_edits_on_unknown_ids_are_ignored() {
    let api = FakeApi::new(&[JobStage::Completed], steps());
    let mut orch = orchestrator(api, Some("tok"));

    let id = orch.add_credential().unwrap();
    let before = orch.state().clone();
    orch.update_credential("missing", CredentialField::Password, "pw");
    orch.remove_credential("missing");
    assert_eq!(*orch.state(), before);

    orch.remove_credential(&id);
    let after_first = orch.state().clone();
    orch.remove_credential(&id);
    assert_eq!(*orch.state(), after_first);
    assert!(orch.state().credentials().is_empty());
}
