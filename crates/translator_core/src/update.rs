use translator_logging::{translator_debug, translator_info};

use crate::{
    ContinuationStage, ControllerState, Effect, ExtractedSource, Mode, Msg, OperationId,
    OperationStatus, SettingChange, TranslateError, DEFAULT_MODEL,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ControllerState, msg: Msg) -> (ControllerState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartClicked { mode } => start(&mut state, mode),
        Msg::StopClicked => stop(&mut state),
        Msg::SettingsChanged(changes) => {
            apply_settings(&mut state, changes);
            Vec::new()
        }
        Msg::SourceExtracted {
            operation_id,
            source,
        } => source_extracted(&mut state, operation_id, source),
        Msg::ResponseReceived {
            operation_id,
            result,
        } => response_received(&mut state, operation_id, result),
        Msg::ResponseParsed {
            operation_id,
            result,
        } => response_parsed(&mut state, operation_id, result),
        Msg::SaveAttempted { saved } => save_attempted(&mut state, saved),
        Msg::Settled => settled(&mut state),
        Msg::NextItemProbed { available } => next_item_probed(&mut state, available),
    };

    (state, effects)
}

fn start(state: &mut ControllerState, mode: Mode) -> Vec<Effect> {
    if let Some(operation) = state.operation() {
        translator_info!(
            "start {:?} rejected: operation {} is still {:?}",
            mode,
            operation.id(),
            operation.status()
        );
        return reject(state, TranslateError::AlreadyInFlight);
    }
    if state.settings().api_key.trim().is_empty() {
        translator_info!("start {:?} rejected: no API key configured", mode);
        return reject(state, TranslateError::MissingApiKey);
    }

    let mut effects = Vec::with_capacity(2);
    if let Some(stage) = state.continuation() {
        // A manual start replaces whatever the auto chain was waiting on.
        translator_info!("start {:?} supersedes pending continuation at {:?}", mode, stage);
        if stage == ContinuationStage::Settling {
            effects.push(Effect::CancelSettle);
        }
    }

    let operation_id = state.begin_operation(mode);
    translator_info!("operation {} started in {:?} mode", operation_id, mode);
    effects.push(Effect::ExtractSource { operation_id });
    effects
}

fn reject(state: &mut ControllerState, error: TranslateError) -> Vec<Effect> {
    match error.alert_message() {
        Some(message) => {
            state.set_alert(message.clone());
            vec![Effect::AlertUser { message }]
        }
        None => Vec::new(),
    }
}

fn stop(state: &mut ControllerState) -> Vec<Effect> {
    state.request_stop();
    translator_info!("translation stopped by user");

    let mut effects = Vec::new();
    if let Some(operation) = state.operation() {
        if operation.status() == OperationStatus::InFlight {
            effects.push(Effect::CancelRequest {
                operation_id: operation.id(),
            });
        }
    }
    if state.continuation() == Some(ContinuationStage::Settling) {
        effects.push(Effect::CancelSettle);
    }
    effects
}

fn apply_settings(state: &mut ControllerState, changes: Vec<SettingChange>) {
    let settings = state.settings_mut();
    for change in changes {
        match change {
            SettingChange::ApiKey(value) => settings.api_key = value.unwrap_or_default(),
            SettingChange::Model(value) => {
                settings.model = value
                    .filter(|model| !model.is_empty())
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string());
            }
            SettingChange::SystemPrompt(Some(prompt)) if !prompt.is_empty() => {
                settings.system_prompt = prompt;
            }
            SettingChange::SystemPrompt(_) => {}
        }
    }
    translator_debug!(
        "settings refreshed: has_api_key={} model={} prompt_len={}",
        !settings.api_key.is_empty(),
        settings.model,
        settings.system_prompt.len()
    );
}

fn source_extracted(
    state: &mut ControllerState,
    operation_id: OperationId,
    source: Option<ExtractedSource>,
) -> Vec<Effect> {
    if !is_current(state, operation_id, "SourceExtracted") {
        return Vec::new();
    }
    if state.stop_requested() {
        return abort(state, "before the request");
    }

    let source = source.filter(|source| {
        !source.text.trim().is_empty() && !source.target_language.trim().is_empty()
    });
    let Some(source) = source else {
        translator_info!("operation {} found nothing to translate", operation_id);
        return fail(state, TranslateError::Extraction);
    };

    let request = state.build_request(source.text, source.target_language.trim().to_string());
    vec![Effect::RequestTranslation {
        operation_id,
        request,
    }]
}

fn response_received(
    state: &mut ControllerState,
    operation_id: OperationId,
    result: Result<(), TranslateError>,
) -> Vec<Effect> {
    if !is_current(state, operation_id, "ResponseReceived") {
        return Vec::new();
    }
    match result {
        Err(TranslateError::Cancelled) => abort(state, "during the request"),
        Err(error) => fail(state, error),
        Ok(()) if state.stop_requested() => abort(state, "after the response"),
        Ok(()) => vec![Effect::ParseResponse { operation_id }],
    }
}

fn response_parsed(
    state: &mut ControllerState,
    operation_id: OperationId,
    result: Result<String, TranslateError>,
) -> Vec<Effect> {
    let Some(mode) = state
        .in_flight(operation_id)
        .map(|operation| operation.mode())
    else {
        ignore_stale(operation_id, "ResponseParsed");
        return Vec::new();
    };

    let text = match result {
        Err(TranslateError::Cancelled) => return abort(state, "while parsing"),
        Err(error) => return fail(state, error),
        Ok(_) if state.stop_requested() => return abort(state, "after parsing"),
        Ok(text) if text.trim().is_empty() => return fail(state, TranslateError::EmptyResponse),
        Ok(text) => text,
    };

    let mut effects = vec![Effect::WriteTranslation { operation_id, text }];
    effects.extend(finish(state, OperationStatus::Completed, None));
    if mode == Mode::Auto {
        state.set_continuation(Some(ContinuationStage::Saving));
        effects.push(Effect::SaveCurrentItem);
    }
    effects
}

fn save_attempted(state: &mut ControllerState, saved: bool) -> Vec<Effect> {
    if state.continuation() != Some(ContinuationStage::Saving) {
        translator_debug!("SaveAttempted ignored: continuation is {:?}", state.continuation());
        return Vec::new();
    }
    if !saved {
        translator_info!("save affordance not found, auto-translate finished");
        state.set_continuation(None);
        return Vec::new();
    }
    state.set_continuation(Some(ContinuationStage::Settling));
    vec![Effect::Settle {
        delay: state.settle_delay(),
    }]
}

fn settled(state: &mut ControllerState) -> Vec<Effect> {
    if state.continuation() != Some(ContinuationStage::Settling) {
        translator_debug!("Settled ignored: continuation is {:?}", state.continuation());
        return Vec::new();
    }
    if state.stop_requested() {
        translator_info!("auto-translate stopped before the next item");
        state.set_continuation(None);
        return Vec::new();
    }
    state.set_continuation(Some(ContinuationStage::Probing));
    vec![Effect::ProbeNextItem]
}

fn next_item_probed(state: &mut ControllerState, available: bool) -> Vec<Effect> {
    if state.continuation() != Some(ContinuationStage::Probing) {
        translator_debug!("NextItemProbed ignored: continuation is {:?}", state.continuation());
        return Vec::new();
    }
    state.set_continuation(None);
    if !available {
        translator_info!("no more items found, auto-translate completed");
        return Vec::new();
    }
    translator_info!("continuing auto-translate with the next item");
    start(state, Mode::Auto)
}

fn abort(state: &mut ControllerState, checkpoint: &str) -> Vec<Effect> {
    translator_info!("operation aborted {}", checkpoint);
    finish(state, OperationStatus::Aborted, None)
}

fn fail(state: &mut ControllerState, error: TranslateError) -> Vec<Effect> {
    translator_info!("operation failed: {}", error);
    finish(state, OperationStatus::Failed, error.alert_message())
}

fn finish(state: &mut ControllerState, status: OperationStatus, alert: Option<String>) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    if let Some(message) = alert {
        state.set_alert(message.clone());
        effects.push(Effect::AlertUser { message });
    }
    if let Some(operation) = state.finish_operation(status) {
        effects.push(Effect::OperationFinished {
            operation_id: operation.id(),
            status,
        });
    }
    effects
}

fn is_current(state: &ControllerState, operation_id: OperationId, what: &str) -> bool {
    if state.in_flight(operation_id).is_some() {
        true
    } else {
        ignore_stale(operation_id, what);
        false
    }
}

fn ignore_stale(operation_id: OperationId, what: &str) {
    translator_debug!("{} for stale operation {} ignored", what, operation_id);
}
