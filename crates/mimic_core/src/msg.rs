use crate::{ArtifactId, CredentialField, CredentialId, JobStatus, WorkflowError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a file and asked for it to be uploaded.
    UploadRequested {
        file_name: String,
        media_type: String,
    },
    /// Upload call returned.
    UploadFinished {
        file_name: String,
        result: Result<ArtifactId, WorkflowError>,
    },
    /// User asked for the uploaded video to be analyzed.
    AnalysisRequested,
    /// One status poll came back with a non-final answer.
    AnalysisPolled(JobStatus),
    /// Analysis reached a terminal state, or polling gave up.
    AnalysisFinished(Result<JobStatus, WorkflowError>),
    /// User clicked Next.
    NextClicked,
    /// User clicked Back.
    BackClicked,
    /// User asked for the automation script.
    GenerateRequested,
    /// Script generation returned.
    GenerateFinished(Result<(), WorkflowError>),
    /// User added an empty credential row.
    CredentialAdded,
    /// User edited one field of a credential row.
    CredentialEdited {
        id: CredentialId,
        field: CredentialField,
        value: String,
    },
    /// User removed a credential row.
    CredentialRemoved { id: CredentialId },
    /// User dismissed the error notification.
    ErrorDismissed,
    /// User abandoned the current run.
    Reset,
    /// Fallback for placeholder wiring.
    NoOp,
}
