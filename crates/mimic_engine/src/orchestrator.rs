//! Effect executor for the wizard.
//!
//! The orchestrator owns the only `WizardState`, feeds it through
//! [`mimic_core::update`] and performs the network work the resulting effects
//! ask for. Every new state is published on a watch channel; upload progress
//! goes out on a second one.
use std::future::Future;
use std::sync::Arc;

use mimic_core::{
    render_script, update, ArtifactId, CredentialField, CredentialId, Effect, JobStage, JobStatus,
    Msg, Stage, WizardState, WizardViewModel, WorkflowError,
};
use mimic_logging::{mimic_debug, mimic_info, mimic_warn};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::api::{AutomationApi, ProgressSink};
use crate::poll::{poll_until_terminal, PollSettings};
use crate::session::SessionProvider;
use crate::{ApiError, VideoFile};

/// Largest upload the backend accepts.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub poll: PollSettings,
    pub max_upload_bytes: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            poll: PollSettings::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Output of the generate stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedScript {
    pub artifact_id: ArtifactId,
    pub file_name: Option<String>,
    pub step_count: usize,
    pub source: String,
}

/// Cancels an orchestrator from outside the task driving it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Publishes upload progress, never moving backwards within one upload.
struct WatchProgress {
    tx: watch::Sender<u8>,
    cancel: CancellationToken,
}

impl WatchProgress {
    fn reset(&self) {
        self.tx.send_replace(0);
    }
}

impl ProgressSink for WatchProgress {
    fn emit(&self, percent: u8) {
        if self.cancel.is_cancelled() {
            return;
        }
        let percent = percent.min(100);
        self.tx.send_if_modified(|current| {
            if percent > *current {
                *current = percent;
                true
            } else {
                false
            }
        });
    }
}

pub struct WorkflowOrchestrator {
    api: Arc<dyn AutomationApi>,
    session: Arc<dyn SessionProvider>,
    settings: WorkflowSettings,
    state: WizardState,
    state_tx: watch::Sender<WizardState>,
    progress: Arc<WatchProgress>,
    cancel: CancellationToken,
}

impl WorkflowOrchestrator {
    pub fn new(
        api: Arc<dyn AutomationApi>,
        session: Arc<dyn SessionProvider>,
        settings: WorkflowSettings,
    ) -> Self {
        let state = WizardState::new();
        let (state_tx, _) = watch::channel(state.clone());
        let (progress_tx, _) = watch::channel(0u8);
        let cancel = CancellationToken::new();
        Self {
            api,
            session,
            settings,
            state,
            state_tx,
            progress: Arc::new(WatchProgress {
                tx: progress_tx,
                cancel: cancel.clone(),
            }),
            cancel,
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn view(&self) -> WizardViewModel {
        self.state.view()
    }

    pub fn can_advance(&self) -> bool {
        self.state.can_advance()
    }

    /// Receives every state the orchestrator publishes, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.state_tx.subscribe()
    }

    /// Upload progress in percent; reset to 0 at the start of each upload.
    pub fn upload_progress(&self) -> watch::Receiver<u8> {
        self.progress.tx.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            token: self.cancel.clone(),
        }
    }

    /// Stops pending work. Nothing is mutated or published afterwards.
    pub fn teardown(&self) {
        if !self.cancel.is_cancelled() {
            mimic_info!("orchestrator torn down");
        }
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Uploads `file` and moves to the analyze stage.
    pub async fn submit_upload(&mut self, file: &VideoFile) -> Result<ArtifactId, WorkflowError> {
        self.ensure_active()?;
        self.state.ensure_ready(Stage::Upload)?;

        let effects = self.dispatch(Msg::UploadRequested {
            file_name: file.file_name.clone(),
            media_type: file.media_type.clone(),
        });
        if !effects
            .iter()
            .any(|effect| matches!(effect, Effect::Upload { .. }))
        {
            return Err(self
                .state
                .last_error()
                .cloned()
                .unwrap_or_else(|| WorkflowError::UnsupportedMediaType(file.media_type.clone())));
        }

        let result = self.run_upload(file).await;
        if matches!(result, Err(WorkflowError::Cancelled)) {
            return result;
        }
        self.dispatch(Msg::UploadFinished {
            file_name: file.file_name.clone(),
            result: result.clone(),
        });
        result
    }

    /// Triggers analysis of the uploaded video and polls it to completion.
    pub async fn start_analysis(&mut self) -> Result<JobStatus, WorkflowError> {
        self.ensure_active()?;
        self.state.ensure_ready(Stage::Analyze)?;

        let effects = self.dispatch(Msg::AnalysisRequested);
        let Some(artifact_id) = effects.into_iter().find_map(|effect| match effect {
            Effect::StartAnalysis { artifact_id } => Some(artifact_id),
            _ => None,
        }) else {
            return Err(WorkflowError::PreconditionUnmet {
                stage: Stage::Analyze,
            });
        };

        let result = self.run_analysis(&artifact_id).await;
        if matches!(result, Err(WorkflowError::Cancelled)) {
            return result;
        }
        self.dispatch(Msg::AnalysisFinished(result.clone()));
        result
    }

    /// Moves forward one stage using data collected earlier.
    pub fn proceed(&mut self) -> Result<Stage, WorkflowError> {
        self.ensure_active()?;
        if self.state.is_busy() {
            return Err(WorkflowError::Busy);
        }
        let stage = self.state.stage();
        if stage.next().is_none() {
            return Err(WorkflowError::WrongStage {
                expected: Stage::Credentials,
                actual: stage,
            });
        }
        if !self.state.can_advance() {
            return Err(WorkflowError::PreconditionUnmet { stage });
        }
        self.dispatch(Msg::NextClicked);
        Ok(self.state.stage())
    }

    /// Steps back one stage. Collected data is kept.
    pub fn go_back(&mut self) -> Result<Stage, WorkflowError> {
        self.ensure_active()?;
        if self.state.is_busy() {
            return Err(WorkflowError::Busy);
        }
        self.dispatch(Msg::BackClicked);
        Ok(self.state.stage())
    }

    /// Renders the automation script and resets the wizard.
    pub fn generate_and_run(&mut self) -> Result<GeneratedScript, WorkflowError> {
        self.ensure_active()?;
        self.state.ensure_ready(Stage::Generate)?;
        let file_name = self.state.uploaded_file_name().map(ToOwned::to_owned);

        let effects = self.dispatch(Msg::GenerateRequested);
        let Some((artifact_id, steps, credentials)) =
            effects.into_iter().find_map(|effect| match effect {
                Effect::GenerateScript {
                    artifact_id,
                    steps,
                    credentials,
                } => Some((artifact_id, steps, credentials)),
                _ => None,
            })
        else {
            return Err(WorkflowError::PreconditionUnmet {
                stage: Stage::Generate,
            });
        };

        let source = render_script(&artifact_id, &steps, &credentials);
        mimic_info!(
            "generated script for {} ({} steps, {} credential sets)",
            artifact_id,
            steps.len(),
            credentials.len()
        );
        self.dispatch(Msg::GenerateFinished(Ok(())));
        Ok(GeneratedScript {
            artifact_id,
            file_name,
            step_count: steps.len(),
            source,
        })
    }

    /// Appends an empty credential entry; `None` once torn down.
    pub fn add_credential(&mut self) -> Option<CredentialId> {
        if !self.is_active() {
            return None;
        }
        self.dispatch(Msg::CredentialAdded);
        self.state.credentials().last().map(|entry| entry.id.clone())
    }

    pub fn update_credential(
        &mut self,
        id: &str,
        field: CredentialField,
        value: impl Into<String>,
    ) {
        self.dispatch(Msg::CredentialEdited {
            id: id.to_string(),
            field,
            value: value.into(),
        });
    }

    pub fn remove_credential(&mut self, id: &str) {
        self.dispatch(Msg::CredentialRemoved { id: id.to_string() });
    }

    pub fn dismiss_error(&mut self) {
        self.dispatch(Msg::ErrorDismissed);
    }

    /// Back to the initial wizard. Ignored while an operation is in flight.
    pub fn reset(&mut self) {
        self.dispatch(Msg::Reset);
    }

    fn ensure_active(&self) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        Ok(())
    }

    fn token(&self) -> Result<String, WorkflowError> {
        self.session
            .token()
            .filter(|token| !token.trim().is_empty())
            .ok_or(WorkflowError::AuthRequired)
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        apply(&mut self.state, &self.state_tx, &self.cancel, msg)
    }

    async fn run_upload(&self, file: &VideoFile) -> Result<ArtifactId, WorkflowError> {
        let max_bytes = self.settings.max_upload_bytes;
        if file.len() > max_bytes {
            return Err(WorkflowError::TooLarge {
                max_bytes,
                actual: file.len(),
            });
        }
        let token = self.token()?;

        self.progress.reset();
        let sink: Arc<dyn ProgressSink> = self.progress.clone();
        let uploaded = guarded(&self.cancel, self.api.upload_video(&token, file, sink)).await?;
        if uploaded.video_id.trim().is_empty() {
            return Err(WorkflowError::ServerRejected {
                status: 201,
                message: "upload response carried no video id".into(),
            });
        }
        mimic_info!("uploaded {} as {}", file.file_name, uploaded.video_id);
        Ok(uploaded.video_id)
    }

    async fn run_analysis(&mut self, artifact_id: &str) -> Result<JobStatus, WorkflowError> {
        let token = self.token()?;
        let ack = guarded(&self.cancel, self.api.trigger_analysis(&token, artifact_id)).await?;
        mimic_debug!("analysis triggered for {}: {:?}", artifact_id, ack.status);

        let api = self.api.clone();
        let state = &mut self.state;
        let state_tx = &self.state_tx;
        let cancel = &self.cancel;
        poll_until_terminal(
            || {
                let api = api.clone();
                let token = token.clone();
                let artifact_id = artifact_id.to_string();
                async move {
                    api.analysis_status(&token, &artifact_id)
                        .await
                        .map(|report| report.to_job_status())
                }
            },
            self.settings.poll,
            cancel,
            JobStatus::is_terminal,
            |status| {
                apply(state, state_tx, cancel, Msg::AnalysisPolled(status.clone()));
            },
        )
        .await?;

        let results = guarded(&self.cancel, self.api.analysis_results(&token, artifact_id)).await?;
        let analysis = results.analysis;
        if analysis.stage != JobStage::Completed {
            let reason = analysis
                .error
                .clone()
                .unwrap_or_else(|| format!("results reported analysis as {}", analysis.stage));
            mimic_warn!("analysis of {} unusable: {}", artifact_id, reason);
            return Err(WorkflowError::Failed(reason));
        }
        mimic_info!(
            "analysis of {} completed with {} steps",
            artifact_id,
            analysis.steps.len()
        );
        Ok(analysis)
    }
}

impl Drop for WorkflowOrchestrator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Runs one message through `update` and publishes the result.
///
/// A no-op once `cancel` has fired.
fn apply(
    state: &mut WizardState,
    state_tx: &watch::Sender<WizardState>,
    cancel: &CancellationToken,
    msg: Msg,
) -> Vec<Effect> {
    if cancel.is_cancelled() {
        return Vec::new();
    }
    let before = state.stage();
    let (next, effects) = update(std::mem::take(state), msg);
    *state = next;
    if before != state.stage() {
        mimic_info!("wizard stage {} -> {}", before, state.stage());
    }
    state_tx.send_replace(state.clone());
    effects
}

async fn guarded<T, F>(cancel: &CancellationToken, call: F) -> Result<T, WorkflowError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WorkflowError::Cancelled),
        result = call => result.map_err(WorkflowError::from),
    }
}
