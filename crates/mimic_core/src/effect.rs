use crate::{ActionStep, ArtifactId, CredentialEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload { file_name: String },
    StartAnalysis { artifact_id: ArtifactId },
    GenerateScript {
        artifact_id: ArtifactId,
        steps: Vec<ActionStep>,
        credentials: Vec<CredentialEntry>,
    },
}
