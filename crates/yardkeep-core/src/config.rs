//! Configuration for the record store

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the two collections live on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding both collection files
    pub data_dir: PathBuf,
    /// File name of the current-quantity snapshot
    #[serde(default = "default_parts_file")]
    pub parts_file: String,
    /// File name of the command log
    #[serde(default = "default_commands_file")]
    pub commands_file: String,
}

fn default_parts_file() -> String {
    "inventory.json".to_string()
}

fn default_commands_file() -> String {
    "commands.json".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_dir(".")
    }
}

impl StoreConfig {
    /// Default file names inside the given directory
    pub fn in_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            parts_file: default_parts_file(),
            commands_file: default_commands_file(),
        }
    }

    pub fn parts_path(&self) -> PathBuf {
        self.data_dir.join(&self.parts_file)
    }

    pub fn commands_path(&self) -> PathBuf {
        self.data_dir.join(&self.commands_file)
    }
}
