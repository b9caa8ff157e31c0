use crate::{Effect, JobStage, Msg, Stage, WizardState, WorkflowError};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: WizardState, msg: Msg) -> (WizardState, Vec<Effect>) {
    let effects = match msg {
        Msg::UploadRequested {
            file_name,
            media_type,
        } => {
            if state.ensure_ready(Stage::Upload).is_err() {
                return (state, Vec::new());
            }
            if !is_video_media_type(&media_type) {
                state.record_error(WorkflowError::UnsupportedMediaType(media_type));
                return (state, Vec::new());
            }
            state.clear_error();
            state.set_busy(true);
            vec![Effect::Upload { file_name }]
        }
        Msg::UploadFinished { file_name, result } => {
            // Late answers for an operation that is no longer in flight are dropped.
            if !in_flight(&state, Stage::Upload) {
                return (state, Vec::new());
            }
            state.set_busy(false);
            match result {
                Ok(artifact_id) => {
                    state.set_uploaded(artifact_id, Some(file_name));
                    state.clear_error();
                    state.set_stage(Stage::Analyze);
                }
                Err(err) => state.record_error(err),
            }
            Vec::new()
        }
        Msg::AnalysisRequested => {
            if state.ensure_ready(Stage::Analyze).is_err() {
                return (state, Vec::new());
            }
            let Some(artifact_id) = state.uploaded_artifact_id().map(ToOwned::to_owned) else {
                return (state, Vec::new());
            };
            state.clear_error();
            state.set_busy(true);
            vec![Effect::StartAnalysis { artifact_id }]
        }
        Msg::AnalysisPolled(status) => {
            if in_flight(&state, Stage::Analyze)
                && state.uploaded_artifact_id() == Some(status.job_id.as_str())
            {
                state.set_last_polled(status.stage);
            }
            Vec::new()
        }
        Msg::AnalysisFinished(result) => {
            if !in_flight(&state, Stage::Analyze) {
                return (state, Vec::new());
            }
            state.set_busy(false);
            match result {
                Ok(status) if status.stage == JobStage::Completed => {
                    state.set_analysis_result(status);
                    state.clear_error();
                    state.set_stage(Stage::Credentials);
                }
                Ok(status) => {
                    let reason = status
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("analysis ended as {}", status.stage));
                    state.set_last_polled(status.stage);
                    state.record_error(WorkflowError::Failed(reason));
                }
                Err(err) => state.record_error(err),
            }
            Vec::new()
        }
        Msg::NextClicked => {
            if state.can_advance() {
                if let Some(next) = state.stage().next() {
                    state.set_stage(next);
                }
            }
            Vec::new()
        }
        Msg::BackClicked => {
            if !state.is_busy() {
                if let Some(previous) = state.stage().previous() {
                    state.set_stage(previous);
                }
            }
            Vec::new()
        }
        Msg::GenerateRequested => {
            if state.ensure_ready(Stage::Generate).is_err() || !state.has_completed_analysis() {
                return (state, Vec::new());
            }
            let (Some(artifact_id), Some(result)) = (
                state.uploaded_artifact_id().map(ToOwned::to_owned),
                state.analysis_result(),
            ) else {
                return (state, Vec::new());
            };
            let effect = Effect::GenerateScript {
                artifact_id,
                steps: result.steps.clone(),
                credentials: state.credentials().to_vec(),
            };
            // Rendering is synchronous, so the wizard never reports busy for it.
            state.clear_error();
            vec![effect]
        }
        Msg::GenerateFinished(result) => {
            if state.is_busy() || state.stage() != Stage::Generate {
                return (state, Vec::new());
            }
            match result {
                Ok(()) => state.reset(),
                Err(err) => state.record_error(err),
            }
            Vec::new()
        }
        Msg::CredentialAdded => {
            state.add_credential();
            Vec::new()
        }
        Msg::CredentialEdited { id, field, value } => {
            state.update_credential(&id, field, value);
            Vec::new()
        }
        Msg::CredentialRemoved { id } => {
            state.remove_credential(&id);
            Vec::new()
        }
        Msg::ErrorDismissed => {
            state.clear_error();
            Vec::new()
        }
        Msg::Reset => {
            if !state.is_busy() {
                state.reset();
            }
            Vec::new()
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Accepts `video/*` media types, ignoring case and parameters.
pub fn is_video_media_type(media_type: &str) -> bool {
    let essence = media_type.split(';').next().unwrap_or(media_type).trim();
    match essence.split_once('/') {
        Some((kind, subtype)) => kind.eq_ignore_ascii_case("video") && !subtype.is_empty(),
        None => false,
    }
}

fn in_flight(state: &WizardState, stage: Stage) -> bool {
    state.is_busy() && state.stage() == stage
}
