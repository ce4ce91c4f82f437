//! Persistence mirror for the supervision map.
//!
//! The tracker owns the live map; a store only ever sees whole snapshots.
//! Every mutation overwrites the persisted copy wholesale.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use crate::error::AppError;

/// `user_id -> expires_at` (unix seconds).
pub type Records = BTreeMap<String, i64>;

/// Load/save backend for [`Records`].
pub trait SupervisionStore: Send {
    /// Read the persisted map. A store that has never been written returns
    /// an empty map.
    fn load(&self) -> Result<Records, AppError>;

    /// Replace the persisted map with `records`.
    fn save(&self, records: &Records) -> Result<(), AppError>;
}

// ── JsonFileStore ─────────────────────────────────────────────────────────────

/// JSON object on disk: `{ "<user_id>": <expires_at>, ... }`.
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// crash mid-write never leaves a truncated state file behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SupervisionStore for JsonFileStore {
    fn load(&self) -> Result<Records, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no supervision state yet");
                return Ok(Records::new());
            }
            Err(e) => {
                return Err(AppError::Store(format!("cannot read {}: {e}", self.path.display())));
            }
        };

        if raw.trim().is_empty() {
            return Ok(Records::new());
        }

        serde_json::from_str(&raw)
            .map_err(|e| AppError::Store(format!("parse error in {}: {e}", self.path.display())))
    }

    fn save(&self, records: &Records) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(records)
            .map_err(|e| AppError::Store(format!("serialize failed: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), records = records.len(), "supervision state saved");
        Ok(())
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// In-process store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated store, as if a previous run had saved `records`.
    pub fn with_records(records: Records) -> Self {
        Self { data: Mutex::new(records) }
    }
}

impl SupervisionStore for MemoryStore {
    fn load(&self) -> Result<Records, AppError> {
        let data = self
            .data
            .lock()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))?;
        Ok(data.clone())
    }

    fn save(&self, records: &Records) -> Result<(), AppError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| AppError::Store("memory store lock poisoned".into()))?;
        *data = records.clone();
        Ok(())
    }
}
