use serde::{Deserialize, Serialize};
use translator_logging::{translator_debug, translator_warn};

/// Source text and target language as shown in the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSource {
    pub text: String,
    pub target_language: String,
}

/// The host page's translation editor, as seen by the controller.
pub trait PageAdapter: Send {
    /// Reads the open item, or `None` if no editor is mounted.
    fn extract_source(&self) -> Option<PageSource>;

    /// Overwrites the editable region and fires one change notification.
    fn write_translation(&mut self, text: &str);

    fn has_save_affordance(&self) -> bool;

    fn trigger_save(&mut self);

    fn has_more_items(&self) -> bool;

    /// Opens the next untranslated item in the editor.
    fn trigger_next(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageItem {
    pub source: String,
    pub target_language: String,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub saved: bool,
}

impl PageItem {
    pub fn new(source: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target_language: target_language.into(),
            translation: None,
            saved: false,
        }
    }
}

/// In-memory editor over a list of items. One item at a time is open;
/// saving commits the draft and closes the editor.
#[derive(Debug, Clone, Default)]
pub struct ItemQueuePage {
    items: Vec<PageItem>,
    open: Option<usize>,
    draft: Option<String>,
    change_notifications: usize,
}

impl ItemQueuePage {
    /// Opens the first unsaved item, like a freshly loaded editor.
    pub fn new(items: Vec<PageItem>) -> Self {
        let mut page = Self {
            items,
            ..Self::default()
        };
        page.open = page.first_unsaved();
        page
    }

    pub fn items(&self) -> &[PageItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<PageItem> {
        self.items
    }

    pub fn open_index(&self) -> Option<usize> {
        self.open
    }

    /// Text currently in the editable region of the open item.
    pub fn draft(&self) -> Option<&str> {
        self.draft.as_deref()
    }

    pub fn change_notifications(&self) -> usize {
        self.change_notifications
    }

    fn first_unsaved(&self) -> Option<usize> {
        self.items.iter().position(|item| !item.saved)
    }
}

impl PageAdapter for ItemQueuePage {
    fn extract_source(&self) -> Option<PageSource> {
        let item = self.items.get(self.open?)?;
        Some(PageSource {
            text: item.source.clone(),
            target_language: item.target_language.clone(),
        })
    }

    fn write_translation(&mut self, text: &str) {
        if self.open.is_none() {
            translator_warn!("no open editor to write the translation into");
            return;
        }
        self.draft = Some(text.to_string());
        self.change_notifications += 1;
    }

    fn has_save_affordance(&self) -> bool {
        self.open.is_some()
    }

    fn trigger_save(&mut self) {
        let Some(index) = self.open.take() else {
            return;
        };
        let draft = self.draft.take();
        if let Some(item) = self.items.get_mut(index) {
            if draft.is_some() {
                item.translation = draft;
            }
            item.saved = true;
            translator_debug!("item {} saved", index);
        }
    }

    fn has_more_items(&self) -> bool {
        self.first_unsaved().is_some()
    }

    fn trigger_next(&mut self) {
        self.draft = None;
        self.open = self.first_unsaved();
    }
}
