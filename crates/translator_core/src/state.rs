use std::time::Duration;

use translator_logging::{translator_debug, translator_warn};

use crate::view_model::ControllerView;

pub type OperationId = u64;

pub const DEFAULT_MODEL: &str = "gpt-4o";

pub const DEFAULT_SYSTEM_PROMPT: &str = "Translate the following text into the desired language. \
If the text is already in the desired language or too short, return it exactly as-is, without any \
changes or annotations. Maintain any syntax or HTML tags. Never add language names, comments, or \
suggestions.";

/// Pause between saving an item and probing for the next one.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    Pending,
    InFlight,
    Completed,
    Aborted,
    Failed,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }

    fn can_advance_to(self, next: OperationStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InFlight)
                | (Self::InFlight, Self::Completed)
                | (Self::InFlight, Self::Aborted)
                | (Self::InFlight, Self::Failed)
        )
    }
}

/// One user-triggered translate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    id: OperationId,
    mode: Mode,
    status: OperationStatus,
}

impl Operation {
    pub fn new(id: OperationId, mode: Mode) -> Self {
        Self {
            id,
            mode,
            status: OperationStatus::Pending,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Moves the status forward. Returns `false` (and leaves the status
    /// untouched) for any edge outside `Pending -> InFlight -> terminal`.
    pub fn advance(&mut self, next: OperationStatus) -> bool {
        if !self.status.can_advance_to(next) {
            translator_warn!(
                "operation {} rejected transition {:?} -> {:?}",
                self.id,
                self.status,
                next
            );
            return false;
        }
        translator_debug!("operation {} {:?} -> {:?}", self.id, self.status, next);
        self.status = next;
        true
    }
}

/// Immutable input of one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub source_text: String,
    pub target_language: String,
    pub model: String,
    pub system_prompt: String,
    pub api_key: String,
}

/// The controller's live copy of the user settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSettings {
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
}

impl Default for CachedSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Where the auto-translate chain currently waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationStage {
    Saving,
    Settling,
    Probing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerState {
    settings: CachedSettings,
    stop_requested: bool,
    operation: Option<Operation>,
    continuation: Option<ContinuationStage>,
    next_operation_id: OperationId,
    settle_delay: Duration,
    trigger_enabled: bool,
    last_status: Option<OperationStatus>,
    operations_started: u64,
    completed_items: u64,
    last_alert: Option<String>,
    dirty: bool,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            settings: CachedSettings::default(),
            stop_requested: false,
            operation: None,
            continuation: None,
            next_operation_id: 1,
            settle_delay: DEFAULT_SETTLE_DELAY,
            trigger_enabled: true,
            last_status: None,
            operations_started: 0,
            completed_items: 0,
            last_alert: None,
            dirty: false,
        }
    }
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: CachedSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn view(&self) -> ControllerView {
        ControllerView {
            status: self.operation.as_ref().map(Operation::status),
            mode: self.operation.as_ref().map(Operation::mode),
            continuation: self.continuation,
            stop_requested: self.stop_requested,
            trigger_enabled: self.trigger_enabled,
            last_status: self.last_status,
            operations_started: self.operations_started,
            completed_items: self.completed_items,
            last_alert: self.last_alert.clone(),
        }
    }

    /// No operation in flight and no continuation pending.
    pub fn is_idle(&self) -> bool {
        self.operation.is_none() && self.continuation.is_none()
    }

    pub fn settings(&self) -> &CachedSettings {
        &self.settings
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operation.as_ref()
    }

    pub fn continuation(&self) -> Option<ContinuationStage> {
        self.continuation
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn settings_mut(&mut self) -> &mut CachedSettings {
        &mut self.settings
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop_requested = true;
        self.mark_dirty();
    }

    pub(crate) fn set_alert(&mut self, message: String) {
        self.last_alert = Some(message);
        self.mark_dirty();
    }

    pub(crate) fn set_continuation(&mut self, stage: Option<ContinuationStage>) {
        self.continuation = stage;
        self.mark_dirty();
    }

    /// Creates the next operation and moves it in flight. The caller has
    /// already checked the start preconditions.
    pub(crate) fn begin_operation(&mut self, mode: Mode) -> OperationId {
        let id = self.next_operation_id;
        self.next_operation_id += 1;
        let mut operation = Operation::new(id, mode);
        operation.advance(OperationStatus::InFlight);
        self.operation = Some(operation);
        self.stop_requested = false;
        self.trigger_enabled = false;
        self.continuation = None;
        self.operations_started += 1;
        self.mark_dirty();
        id
    }

    /// The in-flight operation, if `operation_id` still refers to it.
    pub(crate) fn in_flight(&self, operation_id: OperationId) -> Option<&Operation> {
        self.operation
            .as_ref()
            .filter(|op| op.id() == operation_id && op.status() == OperationStatus::InFlight)
    }

    /// Terminal transition plus cleanup: the trigger control comes back and
    /// the operation is dropped. The stop flag is left as-is.
    pub(crate) fn finish_operation(&mut self, status: OperationStatus) -> Option<Operation> {
        let mut operation = self.operation.take()?;
        if !operation.advance(status) {
            self.operation = Some(operation);
            return None;
        }
        if status == OperationStatus::Completed {
            self.completed_items += 1;
        }
        self.last_status = Some(status);
        self.trigger_enabled = true;
        self.mark_dirty();
        Some(operation)
    }

    pub(crate) fn build_request(&self, source_text: String, target_language: String) -> TranslationRequest {
        TranslationRequest {
            source_text,
            target_language,
            model: self.settings.model.clone(),
            system_prompt: self.settings.system_prompt.clone(),
            api_key: self.settings.api_key.clone(),
        }
    }
}
