use std::fmt;

use crate::credential::{CredentialEntry, CredentialField, CredentialId};
use crate::view_model::WizardViewModel;
use crate::{ArtifactId, JobStage, JobStatus, WorkflowError};

/// The four wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Upload,
    Analyze,
    Credentials,
    Generate,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Upload,
        Stage::Analyze,
        Stage::Credentials,
        Stage::Generate,
    ];

    /// 1-based position, as shown to users ("Step 2 of 4").
    pub fn number(self) -> usize {
        match self {
            Stage::Upload => 1,
            Stage::Analyze => 2,
            Stage::Credentials => 3,
            Stage::Generate => 4,
        }
    }

    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Upload => None,
            Stage::Analyze => Some(Stage::Upload),
            Stage::Credentials => Some(Stage::Analyze),
            Stage::Generate => Some(Stage::Credentials),
        }
    }

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Upload => Some(Stage::Analyze),
            Stage::Analyze => Some(Stage::Credentials),
            Stage::Credentials => Some(Stage::Generate),
            Stage::Generate => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Stage::Upload => "Upload Video",
            Stage::Analyze => "Analyze Video",
            Stage::Credentials => "Credentials",
            Stage::Generate => "Generate Script",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Upload => "upload",
            Stage::Analyze => "analyze",
            Stage::Credentials => "credentials",
            Stage::Generate => "generate",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WizardState {
    stage: Stage,
    uploaded_artifact_id: Option<ArtifactId>,
    uploaded_file_name: Option<String>,
    analysis_result: Option<JobStatus>,
    last_polled: Option<JobStage>,
    credentials: Vec<CredentialEntry>,
    busy: bool,
    last_error: Option<WorkflowError>,
    // Survives `reset` so credential ids stay unique for the whole session.
    next_credential_id: u64,
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn uploaded_artifact_id(&self) -> Option<&str> {
        self.uploaded_artifact_id.as_deref()
    }

    pub fn uploaded_file_name(&self) -> Option<&str> {
        self.uploaded_file_name.as_deref()
    }

    pub fn analysis_result(&self) -> Option<&JobStatus> {
        self.analysis_result.as_ref()
    }

    pub fn last_polled(&self) -> Option<JobStage> {
        self.last_polled
    }

    pub fn credentials(&self) -> &[CredentialEntry] {
        &self.credentials
    }

    pub fn credential(&self, id: &str) -> Option<&CredentialEntry> {
        self.credentials.iter().find(|entry| entry.id == id)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.last_error.as_ref()
    }

    /// Whether the current stage's precondition holds and nothing is in flight.
    pub fn can_advance(&self) -> bool {
        if self.busy {
            return false;
        }
        match self.stage {
            Stage::Upload => self.uploaded_artifact_id.is_some(),
            Stage::Analyze | Stage::Generate => self.has_completed_analysis(),
            Stage::Credentials => true,
        }
    }

    /// Checks that a stage operation may start right now.
    pub fn ensure_ready(&self, expected: Stage) -> Result<(), WorkflowError> {
        if self.busy {
            return Err(WorkflowError::Busy);
        }
        if self.stage != expected {
            return Err(WorkflowError::WrongStage {
                expected,
                actual: self.stage,
            });
        }
        Ok(())
    }

    pub fn view(&self) -> WizardViewModel {
        WizardViewModel {
            stage: self.stage,
            step_number: self.stage.number(),
            step_total: Stage::ALL.len(),
            title: self.stage.title(),
            busy: self.busy,
            can_advance: self.can_advance(),
            can_go_back: !self.busy && self.stage.previous().is_some(),
            uploaded_file_name: self.uploaded_file_name.clone(),
            artifact_id: self.uploaded_artifact_id.clone(),
            polled_stage: self.last_polled,
            detected_steps: self
                .analysis_result
                .as_ref()
                .map(|result| result.steps.iter().map(|step| step.summary()).collect())
                .unwrap_or_default(),
            credential_count: self.credentials.len(),
            error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    pub(crate) fn has_completed_analysis(&self) -> bool {
        self.analysis_result
            .as_ref()
            .is_some_and(JobStatus::is_completed)
    }

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    pub(crate) fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    pub(crate) fn record_error(&mut self, error: WorkflowError) {
        if error.is_recorded() {
            self.last_error = Some(error);
        }
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn set_uploaded(&mut self, artifact_id: ArtifactId, file_name: Option<String>) {
        if self.uploaded_artifact_id.as_deref() != Some(artifact_id.as_str()) {
            self.analysis_result = None;
            self.last_polled = None;
        }
        self.uploaded_artifact_id = Some(artifact_id);
        self.uploaded_file_name = file_name;
    }

    pub(crate) fn set_last_polled(&mut self, stage: JobStage) {
        self.last_polled = Some(stage);
    }

    pub(crate) fn set_analysis_result(&mut self, result: JobStatus) {
        self.last_polled = Some(result.stage);
        self.analysis_result = Some(result);
    }

    pub(crate) fn add_credential(&mut self) -> CredentialId {
        self.next_credential_id += 1;
        let id = format!("cred-{}", self.next_credential_id);
        self.credentials.push(CredentialEntry::new(id.clone()));
        id
    }

    pub(crate) fn update_credential(&mut self, id: &str, field: CredentialField, value: String) {
        if let Some(entry) = self.credentials.iter_mut().find(|entry| entry.id == id) {
            entry.set(field, value);
        }
    }

    pub(crate) fn remove_credential(&mut self, id: &str) {
        self.credentials.retain(|entry| entry.id != id);
    }

    /// Back to the initial wizard, keeping only the credential id counter.
    pub(crate) fn reset(&mut self) {
        let next_credential_id = self.next_credential_id;
        *self = Self {
            next_credential_id,
            ..Self::default()
        };
    }
}
