use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("{path:?} has no usable parent directory: {message}")]
    ParentDir { path: PathBuf, message: String },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Create the directory holding `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> Result<PathBuf, PersistError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dir.exists() {
        if !dir.is_dir() {
            return Err(PersistError::ParentDir {
                path: path.to_path_buf(),
                message: "parent is not a directory".into(),
            });
        }
    } else {
        fs::create_dir_all(&dir).map_err(|e| PersistError::ParentDir {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    }
    Ok(dir)
}

/// Replaces one file atomically: write a sibling temp file, then rename
/// it over the target. Readers see either the old or the new content.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    target: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn write(&self, content: &[u8]) -> Result<(), PersistError> {
        let dir = ensure_parent_dir(&self.target)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(&self.target).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}
