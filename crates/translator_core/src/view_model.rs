use crate::{ContinuationStage, Mode, OperationStatus};

/// Read-only snapshot for whatever renders the trigger controls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControllerView {
    /// Status of the current operation; `None` while idle.
    pub status: Option<OperationStatus>,
    pub mode: Option<Mode>,
    pub continuation: Option<ContinuationStage>,
    pub stop_requested: bool,
    pub trigger_enabled: bool,
    /// Terminal status of the most recent operation.
    pub last_status: Option<OperationStatus>,
    pub operations_started: u64,
    pub completed_items: u64,
    pub last_alert: Option<String>,
}
