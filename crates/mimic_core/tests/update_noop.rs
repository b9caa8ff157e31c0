use mimic_core::{update, Msg, WizardState};

#[test]
fn update_is_noop() {
    let state = WizardState::new();
    let (next, effects) = update(state.clone(), Msg::NoOp);

    assert_eq!(state, next);
    assert!(effects.is_empty());
}

#[test]
fn stray_completion_messages_are_ignored_when_idle() {
    let state = WizardState::new();
    let (next, effects) = update(
        state.clone(),
        Msg::AnalysisFinished(Err(mimic_core::WorkflowError::AuthRequired)),
    );
    assert_eq!(state, next);
    assert!(effects.is_empty());

    let (next, effects) = update(
        state.clone(),
        Msg::UploadFinished {
            file_name: "late.mp4".into(),
            result: Ok("vid-late".into()),
        },
    );
    assert_eq!(state, next);
    assert!(effects.is_empty());
}
