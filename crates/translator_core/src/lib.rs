//! Translator core: pure controller state machine for translate operations.
mod effect;
mod error;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::TranslateError;
pub use msg::{ExtractedSource, Msg, SettingChange};
pub use state::{
    CachedSettings, ContinuationStage, ControllerState, Mode, Operation, OperationId,
    OperationStatus, TranslationRequest, DEFAULT_MODEL, DEFAULT_SETTLE_DELAY,
    DEFAULT_SYSTEM_PROMPT,
};
pub use update::update;
pub use view_model::ControllerView;
