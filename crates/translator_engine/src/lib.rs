//! Translator engine: model client, page adapter and settings store.
mod client;
mod page;
mod persist;
mod provider;
mod settings;
mod types;

pub use client::{ClientSettings, ModelClient, ReqwestModelClient};
pub use page::{ItemQueuePage, PageAdapter, PageItem, PageSource};
pub use persist::{ensure_parent_dir, AtomicFileWriter, PersistError};
pub use provider::Provider;
pub use settings::{
    Settings, SettingsChange, SettingsError, SettingsKey, SettingsProvider, SettingsStore,
};
pub use types::{FailureKind, ModelError, ModelRequest, ModelResponse};

/// Re-exported so callers share the exact token type the client observes.
pub use tokio_util::sync::CancellationToken;
