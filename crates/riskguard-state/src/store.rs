//! Atomic file-backed record store.
//!
//! `save` writes the full record to a sibling temp file, fsyncs it and
//! renames it over the target, so a crash leaves either the old file or the
//! new one, never a torn write. `load` treats a missing or unreadable file
//! as the record's default value; the single-owner control loop makes this
//! safe without any cross-process locking.

use std::fs::{self, File};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StateResult;

/// Typed JSON record store over a single file.
#[derive(Debug)]
pub struct FileStore<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T> FileStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// Create a store backed by `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record, falling back to `T::default()` when the file is
    /// missing or corrupt. Corruption is logged, never fatal.
    #[must_use]
    pub fn load(&self) -> T {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "State file absent, using defaults");
                return T::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), ?e, "State file unreadable, using defaults");
                return T::default();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(path = %self.path.display(), ?e, "State file corrupt, using defaults");
                T::default()
            }
        }
    }

    /// Persist the record atomically.
    pub fn save(&self, record: &T) -> StateResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&serde_json::to_vec_pretty(record)?)?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }
}
