//! Record store for the part snapshot and the command log
//!
//! Each collection is loaded whole and saved whole. A missing or unreadable
//! file loads as an empty collection; saves replace the file contents.
//! Within a readable array, a record that does not decode is skipped with a
//! warning and the rest of the collection still loads.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::model::{Command, Part};

/// Trait for record storage backends
pub trait RecordStore: Send + Sync {
    /// Load the current-quantity snapshot
    fn load_parts(&self) -> Vec<Part>;

    /// Replace the snapshot with the given parts
    fn save_parts(&self, parts: &[Part]) -> Result<(), StoreError>;

    /// Load the command log in append order
    fn load_commands(&self) -> Vec<Command>;

    /// Replace the command log with the given commands
    fn save_commands(&self, commands: &[Command]) -> Result<(), StoreError>;
}

/// Flat-file store writing pretty-printed JSON arrays
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    config: StoreConfig,
}

impl JsonFileStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Store using the default file names inside `data_dir`
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(StoreConfig::in_dir(data_dir))
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }
}

impl RecordStore for JsonFileStore {
    fn load_parts(&self) -> Vec<Part> {
        load_json(&self.config.parts_path())
    }

    fn save_parts(&self, parts: &[Part]) -> Result<(), StoreError> {
        save_json(&self.config.parts_path(), parts)
    }

    fn load_commands(&self) -> Vec<Command> {
        load_json(&self.config.commands_path())
    }

    fn save_commands(&self, commands: &[Command]) -> Result<(), StoreError> {
        save_json(&self.config.commands_path(), commands)
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    if !path.exists() {
        return Vec::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!("Failed to read {:?}: {}, treating as empty", path, e);
            return Vec::new();
        }
    };

    let values: Vec<Value> = match serde_json::from_str(&content) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}, treating as empty", path, e);
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping record #{} in {:?}: {}", idx, path, e);
                None
            }
        })
        .collect()
}

/// Write to a sibling temp file, then rename over the target.
fn save_json<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    let io_err = |e: std::io::Error| StoreError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let data = serde_json::to_vec_pretty(records)?;
    let tmp_path = path.with_extension("json.tmp");

    let mut file = File::create(&tmp_path).map_err(io_err)?;
    file.write_all(&data).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&tmp_path, path).map_err(io_err)?;

    tracing::debug!("Saved {} records to {:?}", records.len(), path);
    Ok(())
}

/// In-memory store implementation
#[derive(Debug, Default)]
pub struct InMemoryStore {
    parts: Mutex<Vec<Part>>,
    commands: Mutex<Vec<Command>>,
    fail_snapshot_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parts(parts: Vec<Part>) -> Self {
        Self {
            parts: Mutex::new(parts),
            ..Self::default()
        }
    }

    /// Make every subsequent `save_parts` fail, simulating a crash between
    /// the log write and the snapshot write.
    pub fn fail_snapshot_writes(&self, fail: bool) {
        self.fail_snapshot_writes.store(fail, Ordering::SeqCst);
    }
}

impl RecordStore for InMemoryStore {
    fn load_parts(&self) -> Vec<Part> {
        self.parts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save_parts(&self, parts: &[Part]) -> Result<(), StoreError> {
        if self.fail_snapshot_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: "memory:parts".to_string(),
                message: "snapshot writes disabled".to_string(),
            });
        }
        *self.parts.lock().unwrap_or_else(|e| e.into_inner()) = parts.to_vec();
        Ok(())
    }

    fn load_commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn save_commands(&self, commands: &[Command]) -> Result<(), StoreError> {
        *self.commands.lock().unwrap_or_else(|e| e.into_inner()) = commands.to_vec();
        Ok(())
    }
}
