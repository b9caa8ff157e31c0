use crate::{JobStage, Stage};

/// Everything a presentation layer needs to draw the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WizardViewModel {
    pub stage: Stage,
    pub step_number: usize,
    pub step_total: usize,
    pub title: &'static str,
    pub busy: bool,
    pub can_advance: bool,
    pub can_go_back: bool,
    pub uploaded_file_name: Option<String>,
    pub artifact_id: Option<String>,
    pub polled_stage: Option<JobStage>,
    pub detected_steps: Vec<String>,
    pub credential_count: usize,
    pub error: Option<String>,
}
