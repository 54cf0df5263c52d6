//! Content loaders.
//!
//! Resolution never touches the filesystem directly. Every read goes through
//! a [`ContentLoader`], so a host can serve unsaved editor buffers from
//! memory ([`MemoryLoader`]) or read straight from disk ([`FsLoader`]).
//! Loaders never fail: missing or unreadable content is the empty string.

use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

/// Source of file contents and directory listings.
pub trait ContentLoader: Send + Sync {
    /// Text of the file at `path`, or `""` when it does not exist or cannot
    /// be read.
    fn load(&self, path: &Path) -> String;

    /// Entries of the directory at `path`, sorted. Empty when the directory
    /// does not exist or cannot be read.
    fn list_dir(&self, path: &Path) -> Vec<PathBuf>;
}

/// A loader failure. Only ever logged; callers see empty content.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to list {path}: {source}")]
    List { path: PathBuf, source: io::Error },
}

impl LoadError {
    fn is_not_found(&self) -> bool {
        let (LoadError::Read { source, .. } | LoadError::List { source, .. }) = self;
        source.kind() == io::ErrorKind::NotFound
    }
}

/// Downgrade a load error to absence. Missing files are routine during
/// resolution; anything else is worth a warning.
fn downgrade<T: Default>(result: Result<T, LoadError>) -> T {
    match result {
        Ok(value) => value,
        Err(error) if error.is_not_found() => {
            tracing::trace!(%error, "not found");
            T::default()
        }
        Err(error) => {
            tracing::warn!(%error, "treating unreadable content as missing");
            T::default()
        }
    }
}

// ============================================================================
// FILESYSTEM
// ============================================================================

/// Reads from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsLoader;

impl FsLoader {
    pub fn new() -> Self {
        Self
    }

    fn try_load(path: &Path) -> Result<String, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn try_list_dir(path: &Path) -> Result<Vec<PathBuf>, LoadError> {
        let list_error = |source| LoadError::List {
            path: path.to_path_buf(),
            source,
        };
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path).map_err(list_error)? {
            entries.push(entry.map_err(list_error)?.path());
        }
        entries.sort();
        Ok(entries)
    }
}

impl ContentLoader for FsLoader {
    fn load(&self, path: &Path) -> String {
        if !path.is_file() {
            tracing::trace!(path = %path.display(), "no such file");
            return String::new();
        }
        downgrade(Self::try_load(path))
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        downgrade(Self::try_list_dir(path))
    }
}

// ============================================================================
// IN-MEMORY
// ============================================================================

/// Serves file contents from a map, e.g. open editor buffers.
///
/// Directories are implied by the stored paths: listing a directory returns
/// its direct children (files, and directories that contain stored files).
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    files: IndexMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file.
    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn remove(&mut self, path: &Path) -> Option<String> {
        self.files.shift_remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ContentLoader for MemoryLoader {
    fn load(&self, path: &Path) -> String {
        self.files.get(path).cloned().unwrap_or_default()
    }

    fn list_dir(&self, path: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = self
            .files
            .keys()
            .filter_map(|file| {
                let rest = file.strip_prefix(path).ok()?;
                let child = rest.components().next()?;
                Some(path.join(child))
            })
            .collect();
        entries.sort();
        entries.dedup();
        entries
    }
}
