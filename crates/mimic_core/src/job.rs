use std::fmt;

pub type ArtifactId = String;

/// Lifecycle of a backend analysis job as reported by the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    /// Triggered, but the backend has no analysis record yet.
    NotStarted,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStage::Completed | JobStage::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStage::NotStarted => "not_started",
            JobStage::Queued => "queued",
            JobStage::Processing => "processing",
            JobStage::Completed => "completed",
            JobStage::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One browser action extracted from the recording.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionStep {
    pub index: usize,
    pub action: String,
    pub selector: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub value: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl ActionStep {
    pub fn new(index: usize, action: impl Into<String>) -> Self {
        Self {
            index,
            action: action.into(),
            ..Self::default()
        }
    }

    /// Short human-readable summary used by listings and generated comments.
    pub fn summary(&self) -> String {
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            return description.trim().to_string();
        }
        match (self.selector.as_deref(), self.url.as_deref()) {
            (Some(selector), _) => format!("{} {}", self.action, selector),
            (None, Some(url)) => format!("{} {}", self.action, url),
            (None, None) => self.action.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    pub job_id: ArtifactId,
    pub stage: JobStage,
    pub steps: Vec<ActionStep>,
    pub error: Option<String>,
}

impl JobStatus {
    pub fn new(job_id: impl Into<ArtifactId>, stage: JobStage) -> Self {
        Self {
            job_id: job_id.into(),
            stage,
            steps: Vec::new(),
            error: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<ActionStep>) -> Self {
        self.steps = steps;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn is_completed(&self) -> bool {
        self.stage == JobStage::Completed
    }
}
