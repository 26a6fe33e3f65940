use thiserror::Error;

/// Everything that can end or prevent a translate operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("Please configure your API key in the extension settings first.")]
    MissingApiKey,
    #[error("A translation is already in progress.")]
    AlreadyInFlight,
    #[error("Could not find text to translate. Please make sure a translation editor is open.")]
    Extraction,
    #[error("API responded with status code {status}: {message}")]
    Http { status: u16, message: String },
    #[error("Invalid or unexpected response structure from API: {0}")]
    MalformedPayload(String),
    #[error("No text content found in response")]
    EmptyResponse,
    #[error("Network error: {0}")]
    Network(String),
    #[error("The request timed out")]
    Timeout,
    #[error("cancelled")]
    Cancelled,
}

impl TranslateError {
    /// Text shown to the user, or `None` for silent outcomes.
    pub fn alert_message(&self) -> Option<String> {
        match self {
            Self::Cancelled => None,
            Self::MissingApiKey | Self::AlreadyInFlight | Self::Extraction => Some(self.to_string()),
            other => Some(format!("Translation failed: {other}")),
        }
    }
}
