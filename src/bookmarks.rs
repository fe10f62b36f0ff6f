//! Reading positions persisted between sessions.
//!
//! The whole mapping of document → zero-based page is rewritten on every
//! save. A missing or unreadable file reads as "no bookmarks".

use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use log::{info, warn};
use thiserror::Error;

pub type Bookmarks = BTreeMap<String, usize>;

#[derive(Debug, Error)]
pub enum BookmarkError {
    #[error("failed to write bookmarks to {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to serialise bookmarks: {0}")]
    Serialise(#[source] serde_json::Error),
}

pub trait PositionStore: Send + Sync {
    /// Never fails: missing or corrupt storage yields an empty mapping.
    fn load(&self) -> Bookmarks;

    fn save(&self, document: &str, page: usize) -> Result<(), BookmarkError>;

    fn get(&self, document: &str) -> usize {
        self.load().get(document).copied().unwrap_or(0)
    }
}

/// Bookmarks stored as a pretty-printed JSON object.
#[derive(Debug, Clone)]
pub struct JsonBookmarkStore {
    path: PathBuf,
}

impl JsonBookmarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_atomically(&self, json: &str) -> Result<(), BookmarkError> {
        let io_err = |err: std::io::Error| BookmarkError::Io(self.path.clone(), err);
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

impl PositionStore for JsonBookmarkStore {
    fn load(&self) -> Bookmarks {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not read bookmarks {}: {err}", self.path.display());
                }
                return Bookmarks::new();
            }
        };
        serde_json::from_str(&data).unwrap_or_else(|err| {
            warn!(
                "Ignoring corrupt bookmarks file {}: {err}",
                self.path.display()
            );
            Bookmarks::new()
        })
    }

    fn save(&self, document: &str, page: usize) -> Result<(), BookmarkError> {
        let mut bookmarks = self.load();
        bookmarks.insert(document.to_string(), page);
        let json = serde_json::to_string_pretty(&bookmarks).map_err(BookmarkError::Serialise)?;
        self.write_atomically(&json)?;
        info!("Bookmark for {document} saved at page {}", page + 1);
        Ok(())
    }
}
