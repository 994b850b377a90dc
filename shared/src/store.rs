//! Whole-document JSON persistence
//!
//! Reads never fail: an absent or unreadable document yields the default.
//! Writes go to a temporary file in the same directory which is then
//! renamed over the target, so readers never observe partial content.

use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::component_warn;
use crate::errors::{SharedError, SharedResult};
use crate::types::Component;

/// A JSON record stored at a fixed path
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    path: PathBuf,
    /// Component the record belongs to, used as the log target
    owner: Component,
    _record: PhantomData<fn() -> T>,
}

impl<T> RecordStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owner: Component::Host,
            _record: PhantomData,
        }
    }

    /// Attribute this record's log messages to `owner` (fluent API)
    pub fn owned_by(mut self, owner: Component) -> Self {
        self.owner = owner;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, falling back to the default
    pub fn load(&self) -> T {
        match self.try_load() {
            Ok(Some(record)) => record,
            Ok(None) => T::default(),
            Err(e) => {
                component_warn!(
                    self.owner,
                    path = %self.path.display(),
                    error = %e,
                    "Unreadable record, using defaults"
                );
                T::default()
            }
        }
    }

    /// Load the record, distinguishing a missing file from a broken one
    pub fn try_load(&self) -> SharedResult<Option<T>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SharedError::ReadFailed {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| SharedError::DeserializationError { message: e.to_string() })
    }

    /// Atomically replace the stored record
    pub fn save(&self, record: &T) -> SharedResult<()> {
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| SharedError::SerializationError { message: e.to_string() })?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let write_err = |source| SharedError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        std::fs::create_dir_all(&parent).map_err(write_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
        tmp.write_all(content.as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&self.path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
