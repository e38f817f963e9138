//! Server configuration

use std::path::PathBuf;

use yardkeep_core::StoreConfig;

/// Bind address and data location
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
            store: StoreConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Read `YARDKEEP_ADDR` and `YARDKEEP_DATA_DIR`, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let addr = lookup("YARDKEEP_ADDR").unwrap_or(defaults.addr);
        let store = lookup("YARDKEEP_DATA_DIR")
            .map(|dir| StoreConfig::in_dir(PathBuf::from(dir)))
            .unwrap_or(defaults.store);
        Self { addr, store }
    }
}
