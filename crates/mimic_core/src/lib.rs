//! Mimic core: pure wizard state machine and view-model helpers.
mod credential;
mod effect;
mod error;
mod job;
mod msg;
mod script;
mod state;
mod update;
mod view_model;

pub use credential::{CredentialEntry, CredentialField, CredentialId};
pub use effect::Effect;
pub use error::WorkflowError;
pub use job::{ActionStep, ArtifactId, JobStage, JobStatus};
pub use msg::Msg;
pub use script::render_script;
pub use state::{Stage, WizardState};
pub use update::{is_video_media_type, update};
pub use view_model::WizardViewModel;
