//! Mimic engine: backend client, session, polling and effect execution.
mod api;
mod error;
mod filename;
mod orchestrator;
mod persist;
mod poll;
mod session;
mod types;

pub use api::{ApiSettings, AuthApi, AutomationApi, ProgressSink, ReqwestBackend, DEFAULT_BASE_URL};
pub use error::{ApiError, AuthError, PollError};
pub use filename::script_filename;
pub use orchestrator::{
    CancelHandle, GeneratedScript, WorkflowOrchestrator, WorkflowSettings,
    DEFAULT_MAX_UPLOAD_BYTES,
};
pub use persist::{ensure_output_dir, PersistError, ScriptWriter};
pub use poll::{poll_until_terminal, PollSettings};
pub use session::{Session, SessionCallback, SessionProvider, SessionStore};
pub use types::{
    media_type_for_path, AnalysisResults, AuthGrant, ExecutionRecord, HealthReport, StatusReport,
    TriggerAck, UploadedVideo, UserProfile, VideoFile, VideoList, VideoRecord,
};
