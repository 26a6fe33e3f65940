use crate::{Mode, OperationId, TranslateError};

/// Text and language read from the host page's translation editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSource {
    pub text: String,
    pub target_language: String,
}

/// One changed settings key. `None` means the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    ApiKey(Option<String>),
    Model(Option<String>),
    SystemPrompt(Option<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User clicked "Translate with AI" or "Auto Translate".
    StartClicked { mode: Mode },
    /// User clicked Stop.
    StopClicked,
    /// Settings provider reported changed keys.
    SettingsChanged(Vec<SettingChange>),
    /// Page adapter finished reading the editor; `None` if nothing was found.
    SourceExtracted {
        operation_id: OperationId,
        source: Option<ExtractedSource>,
    },
    /// The model call resolved. The payload stays with the runtime.
    ResponseReceived {
        operation_id: OperationId,
        result: Result<(), TranslateError>,
    },
    /// The model client turned the payload into plain text.
    ResponseParsed {
        operation_id: OperationId,
        result: Result<String, TranslateError>,
    },
    /// Outcome of the save step; `false` when no save affordance exists.
    SaveAttempted { saved: bool },
    /// The settle delay elapsed or was cut short by a stop.
    Settled,
    /// Outcome of the next-item probe; `true` once the next item is open.
    NextItemProbed { available: bool },
}
