use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use translator_engine::{AtomicFileWriter, PageItem, PersistError};
use translator_logging::translator_info;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: ron::error::SpannedError,
    },
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] ron::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PageDocument {
    items: Vec<PageItem>,
}

/// Reads the list of translation items from a RON document.
pub fn load_document(path: &Path) -> Result<Vec<PageItem>, DocumentError> {
    let content = fs::read_to_string(path).map_err(|source| DocumentError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let document: PageDocument =
        ron::from_str(&content).map_err(|source| DocumentError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    translator_info!("Loaded {} item(s) from {:?}", document.items.len(), path);
    Ok(document.items)
}

/// Writes the items back atomically.
pub fn save_document(path: &Path, items: &[PageItem]) -> Result<(), DocumentError> {
    let document = PageDocument {
        items: items.to_vec(),
    };
    let content = ron::ser::to_string_pretty(&document, ron::ser::PrettyConfig::new())?;
    AtomicFileWriter::new(path).write(content.as_bytes())?;

    translator_info!("Saved {} item(s) to {:?}", items.len(), path);
    Ok(())
}
