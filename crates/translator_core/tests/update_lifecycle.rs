use std::sync::Once;

use pretty_assertions::assert_eq;
use translator_core::{
    update, CachedSettings, ControllerState, Effect, ExtractedSource, Mode, Msg, OperationStatus,
    TranslateError, TranslationRequest, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(translator_logging::initialize_for_tests);
}

fn configured_state() -> ControllerState {
    ControllerState::with_settings(CachedSettings {
        api_key: "sk-test".to_string(),
        ..CachedSettings::default()
    })
}

fn hello_source() -> Option<ExtractedSource> {
    Some(ExtractedSource {
        text: "<p>Hello</p>".to_string(),
        target_language: "French".to_string(),
    })
}

/// Drives a fresh single-mode operation up to the request effect.
fn start_and_extract(state: ControllerState) -> (ControllerState, Vec<Effect>) {
    let (state, _) = update(state, Msg::StartClicked { mode: Mode::Single });
    update(
        state,
        Msg::SourceExtracted {
            operation_id: 1,
            source: hello_source(),
        },
    )
}

fn has_write(effects: &[Effect]) -> bool {
    effects
        .iter()
        .any(|effect| matches!(effect, Effect::WriteTranslation { .. }))
}

#[test]
fn start_moves_idle_to_in_flight_and_extracts() {
    init_logging();
    let (mut state, effects) = update(configured_state(), Msg::StartClicked { mode: Mode::Single });

    assert_eq!(effects, vec![Effect::ExtractSource { operation_id: 1 }]);
    let view = state.view();
    assert_eq!(view.status, Some(OperationStatus::InFlight));
    assert_eq!(view.mode, Some(Mode::Single));
    assert!(!view.trigger_enabled);
    assert!(state.consume_dirty());
}

#[test]
fn start_without_api_key_alerts_and_changes_nothing() {
    init_logging();
    let (state, _) = update(ControllerState::new(), Msg::StopClicked);
    let (state, effects) = update(state, Msg::StartClicked { mode: Mode::Auto });

    assert_eq!(
        effects,
        vec![Effect::AlertUser {
            message: TranslateError::MissingApiKey.to_string()
        }]
    );
    let view = state.view();
    assert_eq!(view.status, None);
    assert!(view.trigger_enabled);
    assert_eq!(view.operations_started, 0);
    // A rejected start does not clear a pending stop.
    assert!(view.stop_requested);
}

#[test]
fn start_while_in_flight_is_rejected() {
    init_logging();
    let (state, _) = update(configured_state(), Msg::StartClicked { mode: Mode::Single });
    let (state, effects) = update(state, Msg::StartClicked { mode: Mode::Auto });

    assert_eq!(
        effects,
        vec![Effect::AlertUser {
            message: TranslateError::AlreadyInFlight.to_string()
        }]
    );
    assert_eq!(state.operation().map(|op| op.id()), Some(1));
    assert_eq!(state.operation().map(|op| op.mode()), Some(Mode::Single));
}

#[test]
fn extracted_source_builds_request_from_cached_settings() {
    init_logging();
    let (_state, effects) = start_and_extract(configured_state());

    assert_eq!(
        effects,
        vec![Effect::RequestTranslation {
            operation_id: 1,
            request: TranslationRequest {
                source_text: "<p>Hello</p>".to_string(),
                target_language: "French".to_string(),
                model: DEFAULT_MODEL.to_string(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                api_key: "sk-test".to_string(),
            },
        }]
    );
}

#[test]
fn missing_source_fails_without_request() {
    init_logging();
    let (state, _) = update(configured_state(), Msg::StartClicked { mode: Mode::Single });
    let (state, effects) = update(
        state,
        Msg::SourceExtracted {
            operation_id: 1,
            source: None,
        },
    );

    assert_eq!(
        effects,
        vec![
            Effect::AlertUser {
                message: TranslateError::Extraction.to_string()
            },
            Effect::OperationFinished {
                operation_id: 1,
                status: OperationStatus::Failed
            },
        ]
    );
    assert!(state.is_idle());
    assert!(state.view().trigger_enabled);
}

#[test]
fn stop_before_request_aborts_without_network_call() {
    init_logging();
    let (state, _) = update(configured_state(), Msg::StartClicked { mode: Mode::Single });
    let (state, effects) = update(state, Msg::StopClicked);
    assert_eq!(effects, vec![Effect::CancelRequest { operation_id: 1 }]);

    let (state, effects) = update(
        state,
        Msg::SourceExtracted {
            operation_id: 1,
            source: hello_source(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::OperationFinished {
            operation_id: 1,
            status: OperationStatus::Aborted
        }]
    );
    let view = state.view();
    assert_eq!(view.last_status, Some(OperationStatus::Aborted));
    assert!(view.trigger_enabled);
    // The flag survives the return to idle and is cleared by the next start.
    assert!(view.stop_requested);
    let (state, _) = update(state, Msg::StartClicked { mode: Mode::Single });
    assert!(!state.stop_requested());
}

#[test]
fn cancelled_request_aborts_silently() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let (state, _) = update(state, Msg::StopClicked);
    let (state, effects) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 1,
            result: Err(TranslateError::Cancelled),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::OperationFinished {
            operation_id: 1,
            status: OperationStatus::Aborted
        }]
    );
    assert_eq!(state.view().last_alert, None);
}

#[test]
fn stop_after_response_wins_over_apply() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let (state, effects) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 1,
            result: Ok(()),
        },
    );
    assert_eq!(effects, vec![Effect::ParseResponse { operation_id: 1 }]);

    let (state, _) = update(state, Msg::StopClicked);
    let (state, effects) = update(
        state,
        Msg::ResponseParsed {
            operation_id: 1,
            result: Ok("<p>Bonjour</p>".to_string()),
        },
    );

    assert!(!has_write(&effects));
    assert_eq!(state.view().last_status, Some(OperationStatus::Aborted));
}

#[test]
fn stop_before_response_arrives_blocks_parse() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let (state, _) = update(state, Msg::StopClicked);
    let (state, effects) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 1,
            result: Ok(()),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::OperationFinished {
            operation_id: 1,
            status: OperationStatus::Aborted
        }]
    );
    assert!(state.is_idle());
}

#[test]
fn parsed_translation_is_written_exactly() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let (state, _) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 1,
            result: Ok(()),
        },
    );
    let (state, effects) = update(
        state,
        Msg::ResponseParsed {
            operation_id: 1,
            result: Ok("<p>Bonjour</p>".to_string()),
        },
    );

    assert_eq!(
        effects,
        vec![
            Effect::WriteTranslation {
                operation_id: 1,
                text: "<p>Bonjour</p>".to_string()
            },
            Effect::OperationFinished {
                operation_id: 1,
                status: OperationStatus::Completed
            },
        ]
    );
    let view = state.view();
    assert_eq!(view.completed_items, 1);
    assert_eq!(view.continuation, None);
    assert!(view.trigger_enabled);
}

#[test]
fn http_error_fails_with_status_in_alert() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let (state, effects) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 1,
            result: Err(TranslateError::Http {
                status: 401,
                message: "Incorrect API key provided".to_string(),
            }),
        },
    );

    assert!(!has_write(&effects));
    assert_eq!(state.view().last_status, Some(OperationStatus::Failed));
    let alert = state.view().last_alert.expect("alert");
    assert!(alert.contains("401"), "alert was {alert}");
    assert!(alert.starts_with("Translation failed:"));
}

#[test]
fn blank_translation_fails_as_empty_response() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let (state, _) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 1,
            result: Ok(()),
        },
    );
    let (state, effects) = update(
        state,
        Msg::ResponseParsed {
            operation_id: 1,
            result: Ok("   ".to_string()),
        },
    );

    assert!(!has_write(&effects));
    assert_eq!(state.view().last_status, Some(OperationStatus::Failed));
    assert_eq!(
        state.view().last_alert,
        TranslateError::EmptyResponse.alert_message()
    );
}

#[test]
fn stale_messages_are_ignored() {
    init_logging();
    let (state, _) = start_and_extract(configured_state());
    let before = state.clone();
    let (state, effects) = update(
        state,
        Msg::ResponseReceived {
            operation_id: 42,
            result: Ok(()),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state, before);
}
