#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use serde_json::json;
use translator_app::{AlertSink, Controller, ControllerConfig, ControllerHandle};
use translator_engine::{
    FailureKind, ItemQueuePage, ModelClient, ModelError, ModelRequest, ModelResponse,
    PageAdapter, PageItem, PageSource, Settings, SettingsStore,
};

pub const SETTLE: Duration = Duration::from_millis(5);

/// Model client that answers from a script and records what it was asked.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    /// Raises a stop on the given (1-based) call before answering.
    stop_on_call: OnceLock<(usize, ControllerHandle)>,
    /// Never answers; only a cancellation ends the call.
    hang: bool,
}

impl ScriptedModel {
    pub fn replying(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn stop_on_call(&self, call: usize, handle: ControllerHandle) {
        let _ = self.stop_on_call.set((call, handle));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedModel {
    async fn send(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requests.lock().unwrap().push(request.clone());
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some((stop_at, handle)) = self.stop_on_call.get() {
            if *stop_at == call {
                handle.stop();
            }
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::new(FailureKind::Network, "script exhausted")));
        reply.map(|text| ModelResponse {
            provider: request.provider,
            status: 200,
            body: json!({ "text": text }),
        })
    }

    fn extract_text(&self, response: &ModelResponse) -> Result<String, ModelError> {
        response
            .body
            .get("text")
            .and_then(|text| text.as_str())
            .map(str::to_string)
            .ok_or_else(|| ModelError::new(FailureKind::EmptyResponse, "no text"))
    }
}

#[derive(Clone, Default)]
pub struct Alerts(Arc<Mutex<Vec<String>>>);

impl Alerts {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl AlertSink for Alerts {
    fn alert(&mut self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Item queue that raises a stop right after its n-th save, i.e. while the
/// controller waits out the settle delay.
pub struct StopAfterSaves {
    pub inner: ItemQueuePage,
    saves: usize,
    stop_after: usize,
    handle: Arc<OnceLock<ControllerHandle>>,
}

impl StopAfterSaves {
    pub fn new(items: Vec<PageItem>, stop_after: usize) -> (Self, Arc<OnceLock<ControllerHandle>>) {
        let handle = Arc::new(OnceLock::new());
        let page = Self {
            inner: ItemQueuePage::new(items),
            saves: 0,
            stop_after,
            handle: Arc::clone(&handle),
        };
        (page, handle)
    }
}

impl PageAdapter for StopAfterSaves {
    fn extract_source(&self) -> Option<PageSource> {
        self.inner.extract_source()
    }

    fn write_translation(&mut self, text: &str) {
        self.inner.write_translation(text);
    }

    fn has_save_affordance(&self) -> bool {
        self.inner.has_save_affordance()
    }

    fn trigger_save(&mut self) {
        self.inner.trigger_save();
        self.saves += 1;
        if self.saves == self.stop_after {
            if let Some(handle) = self.handle.get() {
                handle.stop();
            }
        }
    }

    fn has_more_items(&self) -> bool {
        self.inner.has_more_items()
    }

    fn trigger_next(&mut self) {
        self.inner.trigger_next();
    }
}

pub fn items(sources: &[&str]) -> Vec<PageItem> {
    sources
        .iter()
        .map(|source| PageItem::new(*source, "French"))
        .collect()
}

pub fn settings_with_key() -> Arc<SettingsStore> {
    Arc::new(SettingsStore::in_memory(Settings {
        api_key: "sk-test".to_string(),
        ..Settings::default()
    }))
}

pub fn controller<P: PageAdapter>(
    page: P,
    model: Arc<dyn ModelClient>,
    settings: Arc<SettingsStore>,
    alerts: &Alerts,
) -> Controller<P> {
    Controller::new(
        page,
        model,
        settings,
        Box::new(alerts.clone()),
        ControllerConfig {
            settle_delay: SETTLE,
        },
    )
}
