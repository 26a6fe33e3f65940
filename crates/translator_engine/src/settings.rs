use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use translator_logging::{translator_debug, translator_info};

use crate::{AtomicFileWriter, PersistError, Provider};

const DEFAULT_MODEL: &str = "gpt-4o";

const DEFAULT_SYSTEM_PROMPT: &str = "Translate the following text into the desired language. \
If the text is already in the desired language or too short, return it exactly as-is, without any \
changes or annotations. Maintain any syntax or HTML tags. Never add language names, comments, or \
suggestions.";

/// Persisted user settings. Field names match the extension storage keys.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    #[serde(rename = "selectedModel")]
    pub model: String,
    #[serde(rename = "systemPrompt")]
    pub system_prompt: String,
    pub provider: Provider,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            provider: Provider::default(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("has_api_key", &!self.api_key.is_empty())
            .field("model", &self.model)
            .field("system_prompt_len", &self.system_prompt.len())
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKey {
    ApiKey,
    Model,
    SystemPrompt,
    Provider,
}

/// One changed key; `new_value` is `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChange {
    pub key: SettingsKey,
    pub new_value: Option<String>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Please enter an API key")]
    EmptyApiKey,
    #[error("Invalid API key format")]
    InvalidApiKeyFormat,
    #[error("Please select a model")]
    EmptyModel,
    #[error("Please enter a system prompt")]
    EmptyPrompt,
    #[error("failed to read settings from {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to persist settings: {0}")]
    Persist(#[from] PersistError),
}

/// Read side of the settings surface.
pub trait SettingsProvider: Send + Sync {
    fn snapshot(&self) -> Settings;

    /// Every later change is delivered to the returned receiver.
    fn subscribe(&self) -> mpsc::Receiver<SettingsChange>;
}

/// Settings kept in memory and, when opened from a path, mirrored to a
/// JSON file on every successful change.
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: Mutex<Settings>,
    subscribers: Mutex<Vec<mpsc::Sender<SettingsChange>>>,
}

impl SettingsStore {
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            current: Mutex::new(settings),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Loads `path`; a missing file yields the defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                translator_info!("no settings at {:?}, using defaults", path);
                Settings::default()
            }
            Err(source) => return Err(SettingsError::Read { path, source }),
        };
        Ok(Self {
            path: Some(path),
            current: Mutex::new(settings),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<(), SettingsError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SettingsError::EmptyApiKey);
        }
        if !api_key.starts_with("sk-") {
            return Err(SettingsError::InvalidApiKeyFormat);
        }
        self.apply(|settings| {
            replace(&mut settings.api_key, api_key, SettingsKey::ApiKey)
                .into_iter()
                .collect()
        })
    }

    pub fn remove_api_key(&self) -> Result<(), SettingsError> {
        self.apply(|settings| {
            if settings.api_key.is_empty() {
                return Vec::new();
            }
            settings.api_key.clear();
            vec![SettingsChange {
                key: SettingsKey::ApiKey,
                new_value: None,
            }]
        })
    }

    pub fn set_model_and_prompt(&self, model: &str, system_prompt: &str) -> Result<(), SettingsError> {
        let model = model.trim();
        let system_prompt = system_prompt.trim();
        if model.is_empty() {
            return Err(SettingsError::EmptyModel);
        }
        if system_prompt.is_empty() {
            return Err(SettingsError::EmptyPrompt);
        }
        self.apply(|settings| {
            let mut changes = Vec::with_capacity(2);
            changes.extend(replace(&mut settings.model, model, SettingsKey::Model));
            changes.extend(replace(
                &mut settings.system_prompt,
                system_prompt,
                SettingsKey::SystemPrompt,
            ));
            changes
        })
    }

    /// Changes the model and keeps the stored prompt. A blank stored prompt
    /// is replaced with the default one.
    pub fn set_model(&self, model: &str) -> Result<(), SettingsError> {
        let prompt = self.snapshot().system_prompt;
        let prompt = if prompt.trim().is_empty() {
            DEFAULT_SYSTEM_PROMPT
        } else {
            prompt.as_str()
        };
        self.set_model_and_prompt(model, prompt)
    }

    pub fn set_provider(&self, provider: Provider) -> Result<(), SettingsError> {
        self.apply(|settings| {
            if settings.provider == provider {
                return Vec::new();
            }
            settings.provider = provider;
            vec![SettingsChange {
                key: SettingsKey::Provider,
                new_value: Some(provider.to_string()),
            }]
        })
    }

    fn apply(
        &self,
        mutate: impl FnOnce(&mut Settings) -> Vec<SettingsChange>,
    ) -> Result<(), SettingsError> {
        let changes = {
            let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
            let mut next = current.clone();
            let changes = mutate(&mut next);
            if changes.is_empty() {
                return Ok(());
            }
            if let Some(path) = &self.path {
                let json = serde_json::to_vec_pretty(&next)?;
                AtomicFileWriter::new(path).write(&json)?;
            }
            *current = next;
            changes
        };
        self.notify(changes);
        Ok(())
    }

    fn notify(&self, changes: Vec<SettingsChange>) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        for change in changes {
            subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        }
        if subscribers.is_empty() {
            translator_debug!("settings changed with no live subscribers");
        }
    }
}

impl SettingsProvider for SettingsStore {
    fn snapshot(&self) -> Settings {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self) -> mpsc::Receiver<SettingsChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}

fn replace(slot: &mut String, value: &str, key: SettingsKey) -> Option<SettingsChange> {
    if slot.as_str() == value {
        return None;
    }
    *slot = value.to_string();
    Some(SettingsChange {
        key,
        new_value: Some(value.to_string()),
    })
}
