//! Durable tracking record.
//!
//! One named record holds the last known coordinates and the tracking
//! flag. It is overwritten wholesale on every fix and every transition
//! and is never deleted, so it survives process restarts. Coordinates
//! are stored at `f32` precision, matching the record layout the mobile
//! shells read.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

const STATE_FILE: &str = "state.toml";

/// The single persisted record.
///
/// `(0.0, 0.0)` coordinates mean "never recorded" -- see
/// [`StateStore::last_location`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    #[serde(default)]
    pub last_latitude: f32,
    #[serde(default)]
    pub last_longitude: f32,
    #[serde(default)]
    pub is_tracking: bool,
}

/// File-backed store for the tracking record.
///
/// Writes land in a temp file in the same directory and are renamed into
/// place, so a concurrent `load` never observes a partially written
/// record. A mutex serializes read-modify-write cycles.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl StateStore {
    /// Open the store at the default data directory.
    pub fn open() -> Result<Self, StoreError> {
        let dir = super::data_dir().map_err(|source| StoreError::OpenFailed {
            path: PathBuf::from(STATE_FILE),
            source,
        })?;
        Ok(Self::at(dir.join(STATE_FILE)))
    }

    /// Open the store at an explicit path. Used by tests and by hosts
    /// that manage their own data directory.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record. A missing file reads as the default
    /// record (sentinel coordinates, not tracking).
    pub fn load(&self) -> Result<PersistedRecord, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| StoreError::ParseFailed(e.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(PersistedRecord::default()),
            Err(source) => Err(StoreError::ReadFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Overwrite the stored coordinates with a new fix. Lossy: only the
    /// latest fix is retained.
    pub fn record_fix(&self, latitude: f64, longitude: f64) -> Result<(), StoreError> {
        self.update(|rec| {
            rec.last_latitude = latitude as f32;
            rec.last_longitude = longitude as f32;
        })
    }

    /// Persist the tracking flag.
    pub fn set_tracking(&self, tracking: bool) -> Result<(), StoreError> {
        self.update(|rec| rec.is_tracking = tracking)
    }

    /// Last stored coordinates, or `None` while the record still holds
    /// the sentinel zeros.
    pub fn last_location(&self) -> Result<Option<(f64, f64)>, StoreError> {
        let rec = self.load()?;
        if rec.last_latitude == 0.0 && rec.last_longitude == 0.0 {
            Ok(None)
        } else {
            Ok(Some((rec.last_latitude as f64, rec.last_longitude as f64)))
        }
    }

    /// Persisted tracking flag.
    pub fn is_tracking(&self) -> Result<bool, StoreError> {
        Ok(self.load()?.is_tracking)
    }

    fn update(&self, mutate: impl FnOnce(&mut PersistedRecord)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut rec = self.load()?;
        mutate(&mut rec);
        self.write(&rec)
    }

    fn write(&self, rec: &PersistedRecord) -> Result<(), StoreError> {
        let content =
            toml::to_string_pretty(rec).map_err(|e| StoreError::EncodeFailed(e.to_string()))?;
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(|source| StoreError::WriteFailed {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}
