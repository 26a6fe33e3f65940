use std::collections::VecDeque;
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use translator_core::{
    update, CachedSettings, ControllerState, ControllerView, Effect, ExtractedSource, Mode, Msg,
    OperationId, SettingChange, TranslateError, TranslationRequest, DEFAULT_SETTLE_DELAY,
};
use translator_engine::{
    CancellationToken, FailureKind, ModelClient, ModelError, ModelRequest, ModelResponse,
    PageAdapter, Settings, SettingsChange, SettingsKey, SettingsProvider,
};
use translator_logging::{translator_debug, translator_error, translator_info, translator_warn};

use crate::AlertSink;

/// User actions fed into the controller from outside the run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start(Mode),
    Stop,
}

/// Cloneable sender for [`Command`]s. Safe to call from any task.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl ControllerHandle {
    pub fn start_single(&self) {
        self.send(Command::Start(Mode::Single));
    }

    pub fn start_auto(&self) {
        self.send(Command::Start(Mode::Auto));
    }

    pub fn stop(&self) {
        self.send(Command::Stop);
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            translator_debug!("controller gone; dropped {:?}", command);
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    pub settle_delay: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

enum TaskEvent {
    Response {
        operation_id: OperationId,
        result: Result<ModelResponse, ModelError>,
    },
    Settled {
        generation: u64,
    },
}

enum Wake {
    Command(Command),
    Task(Result<TaskEvent, JoinError>),
}

/// Owns the controller state and performs the effects that `update` asks for.
///
/// Page and alert work happens inline on the run loop. The model call and the
/// settle delay run as tasks so a stop can cut them short.
pub struct Controller<P: PageAdapter> {
    state: ControllerState,
    page: P,
    model: Arc<dyn ModelClient>,
    settings: Arc<dyn SettingsProvider>,
    settings_rx: std_mpsc::Receiver<SettingsChange>,
    alerts: Box<dyn AlertSink>,
    commands: mpsc::UnboundedReceiver<Command>,
    handle: ControllerHandle,
    tasks: JoinSet<TaskEvent>,
    request_cancel: Option<(OperationId, CancellationToken)>,
    settle_cancel: Option<(u64, CancellationToken)>,
    settle_generation: u64,
    pending_response: Option<(OperationId, ModelResponse)>,
    views: watch::Sender<ControllerView>,
}

impl<P: PageAdapter> Controller<P> {
    pub fn new(
        page: P,
        model: Arc<dyn ModelClient>,
        settings: Arc<dyn SettingsProvider>,
        alerts: Box<dyn AlertSink>,
        config: ControllerConfig,
    ) -> Self {
        // Subscribe before the snapshot so no change falls in between.
        let settings_rx = settings.subscribe();
        let state = ControllerState::with_settings(cached_settings(&settings.snapshot()))
            .with_settle_delay(config.settle_delay);
        let (tx, commands) = mpsc::unbounded_channel();
        let (views, _) = watch::channel(state.view());

        Self {
            state,
            page,
            model,
            settings,
            settings_rx,
            alerts,
            commands,
            handle: ControllerHandle { tx },
            tasks: JoinSet::new(),
            request_cancel: None,
            settle_cancel: None,
            settle_generation: 0,
            pending_response: None,
            views,
        }
    }

    pub fn handle(&self) -> ControllerHandle {
        self.handle.clone()
    }

    pub fn view(&self) -> ControllerView {
        self.state.view()
    }

    /// Receives a fresh view each time a dispatch changes something visible.
    pub fn subscribe_view(&self) -> watch::Receiver<ControllerView> {
        self.views.subscribe()
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn into_page(self) -> P {
        self.page
    }

    /// Processes commands and task results until nothing is running and no
    /// operation or continuation is pending.
    pub async fn run_until_idle(&mut self) {
        loop {
            while let Ok(command) = self.commands.try_recv() {
                self.handle_command(command);
            }

            if self.tasks.is_empty() {
                if !self.state.is_idle() {
                    translator_warn!("controller has no running task but is not idle; leaving");
                }
                break;
            }

            // Commands win ties so a stop lands before a result that is
            // already waiting.
            let wake = tokio::select! {
                biased;
                Some(command) = self.commands.recv() => Wake::Command(command),
                Some(joined) = self.tasks.join_next() => Wake::Task(joined),
            };

            match wake {
                Wake::Command(command) => self.handle_command(command),
                Wake::Task(Ok(event)) => self.handle_task_event(event),
                Wake::Task(Err(err)) => self.handle_task_failure(err),
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        translator_debug!("command {:?}", command);
        match command {
            Command::Start(mode) => self.dispatch(Msg::StartClicked { mode }),
            Command::Stop => self.dispatch(Msg::StopClicked),
        }
    }

    fn handle_task_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Response {
                operation_id,
                result,
            } => {
                let result = match result {
                    Ok(response) => {
                        self.pending_response = Some((operation_id, response));
                        Ok(())
                    }
                    Err(err) => {
                        translator_warn!("operation {} model call failed: {}", operation_id, err);
                        Err(map_model_error(err))
                    }
                };
                self.dispatch(Msg::ResponseReceived {
                    operation_id,
                    result,
                });
            }
            TaskEvent::Settled { generation } => {
                // A superseded delay must not advance a newer chain.
                if generation != self.settle_generation {
                    translator_debug!("stale settle {} ignored", generation);
                    return;
                }
                self.settle_cancel = None;
                self.dispatch(Msg::Settled);
            }
        }
    }

    fn handle_task_failure(&mut self, err: JoinError) {
        translator_error!("controller task failed: {}", err);
        if let Some((operation_id, _)) = self.request_cancel.take() {
            self.dispatch(Msg::ResponseReceived {
                operation_id,
                result: Err(TranslateError::Network(err.to_string())),
            });
        } else if self.settle_cancel.take().is_some() {
            self.dispatch(Msg::Settled);
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        self.refresh_settings();

        let mut inbox = VecDeque::from([msg]);
        while let Some(msg) = inbox.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                if let Some(next) = self.run_effect(effect) {
                    inbox.push_back(next);
                }
            }
        }

        if self.state.consume_dirty() {
            let view = self.state.view();
            translator_debug!("view changed: {:?}", view);
            self.views.send_replace(view);
        }
    }

    fn refresh_settings(&mut self) {
        let changes: Vec<SettingChange> = self
            .settings_rx
            .try_iter()
            .filter_map(map_settings_change)
            .collect();
        if changes.is_empty() {
            return;
        }

        let state = std::mem::take(&mut self.state);
        let (state, _) = update(state, Msg::SettingsChanged(changes));
        self.state = state;
    }

    fn run_effect(&mut self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::ExtractSource { operation_id } => {
                let source = self.page.extract_source().map(|source| ExtractedSource {
                    text: source.text,
                    target_language: source.target_language,
                });
                Some(Msg::SourceExtracted {
                    operation_id,
                    source,
                })
            }
            Effect::RequestTranslation {
                operation_id,
                request,
            } => {
                self.spawn_request(operation_id, request);
                None
            }
            Effect::CancelRequest { operation_id } => {
                if let Some((current, token)) = &self.request_cancel {
                    if *current == operation_id {
                        token.cancel();
                    }
                }
                None
            }
            Effect::ParseResponse { operation_id } => {
                let result = match self.pending_response.take() {
                    Some((id, response)) if id == operation_id => {
                        self.model.extract_text(&response).map_err(map_model_error)
                    }
                    _ => Err(TranslateError::MalformedPayload(
                        "no payload held for this operation".to_string(),
                    )),
                };
                Some(Msg::ResponseParsed {
                    operation_id,
                    result,
                })
            }
            Effect::WriteTranslation { operation_id, text } => {
                translator_debug!("operation {} writing {} chars", operation_id, text.len());
                self.page.write_translation(&text);
                None
            }
            Effect::SaveCurrentItem => {
                let saved = self.page.has_save_affordance();
                if saved {
                    self.page.trigger_save();
                }
                Some(Msg::SaveAttempted { saved })
            }
            Effect::Settle { delay } => {
                self.spawn_settle(delay);
                None
            }
            Effect::CancelSettle => {
                if let Some((_, token)) = &self.settle_cancel {
                    token.cancel();
                }
                None
            }
            Effect::ProbeNextItem => {
                let available = self.page.has_more_items();
                if available {
                    self.page.trigger_next();
                }
                Some(Msg::NextItemProbed { available })
            }
            Effect::AlertUser { message } => {
                self.alerts.alert(&message);
                None
            }
            Effect::OperationFinished {
                operation_id,
                status,
            } => {
                translator_info!("operation {} finished: {:?}", operation_id, status);
                if matches!(&self.request_cancel, Some((id, _)) if *id == operation_id) {
                    self.request_cancel = None;
                }
                self.pending_response = None;
                None
            }
        }
    }

    fn spawn_request(&mut self, operation_id: OperationId, request: TranslationRequest) {
        let request = ModelRequest {
            provider: self.settings.snapshot().provider,
            source_text: request.source_text,
            target_language: request.target_language,
            model: request.model,
            system_prompt: request.system_prompt,
            api_key: request.api_key,
        };
        translator_info!("operation {} sending {:?}", operation_id, request);

        let token = CancellationToken::new();
        let cancel = token.clone();
        self.request_cancel = Some((operation_id, token));
        let model = Arc::clone(&self.model);

        self.tasks.spawn(async move {
            let result = model.send_cancellable(&request, &cancel).await;
            TaskEvent::Response {
                operation_id,
                result,
            }
        });
    }

    fn spawn_settle(&mut self, delay: Duration) {
        self.settle_generation += 1;
        let generation = self.settle_generation;
        let token = CancellationToken::new();
        let cancel = token.clone();
        if let Some((_, previous)) = self.settle_cancel.replace((generation, token)) {
            previous.cancel();
        }

        self.tasks.spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {}
            }
            TaskEvent::Settled { generation }
        });
    }
}

fn cached_settings(settings: &Settings) -> CachedSettings {
    let defaults = CachedSettings::default();
    CachedSettings {
        api_key: settings.api_key.clone(),
        model: non_empty_or(&settings.model, defaults.model),
        system_prompt: non_empty_or(&settings.system_prompt, defaults.system_prompt),
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.trim().is_empty() {
        fallback
    } else {
        value.to_string()
    }
}

fn map_settings_change(change: SettingsChange) -> Option<SettingChange> {
    match change.key {
        SettingsKey::ApiKey => Some(SettingChange::ApiKey(change.new_value)),
        SettingsKey::Model => Some(SettingChange::Model(change.new_value)),
        SettingsKey::SystemPrompt => Some(SettingChange::SystemPrompt(change.new_value)),
        // Read from the provider snapshot at request time.
        SettingsKey::Provider => None,
    }
}

/// Converts an engine failure into the error the state machine reasons about.
pub fn map_model_error(err: ModelError) -> TranslateError {
    match err.kind {
        FailureKind::HttpStatus(status) => TranslateError::Http {
            status,
            message: err.message,
        },
        FailureKind::Timeout => TranslateError::Timeout,
        FailureKind::Cancelled => TranslateError::Cancelled,
        FailureKind::EmptyResponse => TranslateError::EmptyResponse,
        FailureKind::MalformedPayload => TranslateError::MalformedPayload(err.message),
        FailureKind::TooLarge { .. } => TranslateError::MalformedPayload(err.kind.to_string()),
        FailureKind::InvalidRequest | FailureKind::Network => TranslateError::Network(err.message),
    }
}
