use std::time::Duration;

use crate::{OperationId, OperationStatus, TranslationRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    ExtractSource { operation_id: OperationId },
    RequestTranslation {
        operation_id: OperationId,
        request: TranslationRequest,
    },
    CancelRequest { operation_id: OperationId },
    ParseResponse { operation_id: OperationId },
    WriteTranslation { operation_id: OperationId, text: String },
    SaveCurrentItem,
    Settle { delay: Duration },
    CancelSettle,
    ProbeNextItem,
    AlertUser { message: String },
    OperationFinished {
        operation_id: OperationId,
        status: OperationStatus,
    },
}
