//! Response schemas for the backend contract, validated at the boundary.
//!
//! Every endpoint answers `{ "status": ..., "message": ..., "data": ... }`.
//! The `Wire*` types mirror the JSON exactly; the public types are what the
//! rest of the crate works with.
use std::fmt;
use std::io;
use std::path::Path;

use bytes::Bytes;
use mimic_core::{ActionStep, JobStage, JobStatus};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

/// A video file picked by the user, ready to be uploaded.
#[derive(Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl VideoFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Reads a file from disk, declaring its media type from the extension.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let media_type = media_type_for_path(path).to_string();
        Ok(Self::new(file_name, media_type, bytes))
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFile")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Media type for the extensions the backend accepts; anything else is opaque.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedVideo {
    pub video_id: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub upload_timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub upload_timestamp: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoList {
    pub videos: Vec<VideoRecord>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TriggerAck {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    pub automation_service: String,
    pub mcp_server: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum WireJobStage {
    NotStarted,
    Pending,
    Queued,
    Processing,
    Completed,
    Failed,
}

impl From<WireJobStage> for JobStage {
    fn from(stage: WireJobStage) -> Self {
        match stage {
            WireJobStage::NotStarted => JobStage::NotStarted,
            WireJobStage::Pending | WireJobStage::Queued => JobStage::Queued,
            WireJobStage::Processing => JobStage::Processing,
            WireJobStage::Completed => JobStage::Completed,
            WireJobStage::Failed => JobStage::Failed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStatus {
    #[serde(default)]
    pub video_id: Option<String>,
    pub analysis_status: WireJobStage,
    #[serde(default)]
    pub analysis_steps: Option<usize>,
    #[serde(default)]
    pub analysis_error: Option<String>,
    #[serde(default)]
    pub execution_status: Option<String>,
    #[serde(default)]
    pub execution_log: Vec<String>,
    #[serde(default)]
    pub execution_error: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

/// One answer from the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub video_id: String,
    pub analysis: JobStage,
    pub analysis_steps: Option<usize>,
    pub analysis_error: Option<String>,
    pub execution_status: Option<String>,
    pub execution_log: Vec<String>,
    pub execution_error: Option<String>,
    pub last_updated: Option<String>,
}

impl StatusReport {
    pub(crate) fn from_wire(requested_id: &str, wire: WireStatus) -> Self {
        Self {
            video_id: wire.video_id.unwrap_or_else(|| requested_id.to_string()),
            analysis: wire.analysis_status.into(),
            analysis_steps: wire.analysis_steps,
            analysis_error: wire.analysis_error,
            execution_status: wire.execution_status,
            execution_log: wire.execution_log,
            execution_error: wire.execution_error,
            last_updated: wire.last_updated,
        }
    }

    pub fn to_job_status(&self) -> JobStatus {
        let mut status = JobStatus::new(self.video_id.clone(), self.analysis);
        status.error = self.analysis_error.clone();
        status
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireStep {
    pub action: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

impl WireStep {
    fn into_step(self, index: usize) -> ActionStep {
        ActionStep {
            index,
            action: self.action,
            selector: self.selector,
            description: self.description,
            url: self.url,
            value: self.text.or(self.value).or(self.key),
            timeout_ms: self.timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAnalysis {
    pub status: WireJobStage,
    #[serde(default)]
    pub steps: Vec<WireStep>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireExecution {
    pub status: String,
    #[serde(default)]
    pub log: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResults {
    pub analysis: WireAnalysis,
    #[serde(default)]
    pub execution: Option<WireExecution>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub status: String,
    pub log: Vec<String>,
    pub error: Option<String>,
}

/// Full analysis output for one video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResults {
    pub analysis: JobStatus,
    pub execution: Option<ExecutionRecord>,
}

impl AnalysisResults {
    pub(crate) fn from_wire(video_id: &str, wire: WireResults) -> Self {
        let steps = wire
            .analysis
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| step.into_step(index))
            .collect();
        let mut analysis = JobStatus::new(video_id, wire.analysis.status.into()).with_steps(steps);
        analysis.error = wire.analysis.error;
        Self {
            analysis,
            execution: wire.execution.map(|execution| ExecutionRecord {
                status: execution.status,
                log: execution.log,
                error: execution.error,
            }),
        }
    }
}
