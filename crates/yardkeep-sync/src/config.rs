//! Configuration for a sync run
//!
//! Loaded once from TOML, with credentials optionally taken from the
//! environment, then passed explicitly to the client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use yardkeep_core::StoreConfig;

use crate::error::{Result, SyncError};

/// Remote site, credentials and local data location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Site URL, e.g. `https://contoso.sharepoint.com/sites/yard`
    pub site_url: String,
    /// Identity provider base URL
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Title of the list mirroring the part snapshot
    #[serde(default = "default_parts_list")]
    pub parts_list: String,
    /// Title of the list mirroring the command log
    #[serde(default = "default_commands_list")]
    pub commands_list: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Refresh the write digest this long before it expires
    #[serde(default = "default_digest_refresh_margin_secs")]
    pub digest_refresh_margin_secs: u64,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_authority_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_parts_list() -> String {
    "Inventory".to_string()
}

fn default_commands_list() -> String {
    "Inventory Commands".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_digest_refresh_margin_secs() -> u64 {
    60
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

impl SyncConfig {
    /// `<config dir>/yardkeep/sync.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("yardkeep").join("sync.toml"))
    }

    /// Load from `path` (or the default location), apply environment
    /// overrides, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()
                .ok_or_else(|| SyncError::Config("no config directory available".to_string()))?,
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| SyncError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config = Self::from_toml(&content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        tracing::debug!("Loaded sync config from {:?}", path);
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| SyncError::Config(e.to_string()))
    }

    /// Credentials from `YARDKEEP_TENANT_ID`, `YARDKEEP_CLIENT_ID` and
    /// `YARDKEEP_CLIENT_SECRET` win over the file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("YARDKEEP_TENANT_ID") {
            self.tenant_id = v;
        }
        if let Some(v) = lookup("YARDKEEP_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = lookup("YARDKEEP_CLIENT_SECRET") {
            self.client_secret = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let site = self.site()?;
        if !matches!(site.scheme(), "http" | "https") || site.host_str().is_none() {
            return Err(SyncError::Config(format!(
                "site_url must be an http(s) URL with a host, got {}",
                self.site_url
            )));
        }

        for (name, value) in [
            ("tenant_id", &self.tenant_id),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
        ] {
            if value.trim().is_empty() {
                return Err(SyncError::Config(format!("{name} is required")));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(SyncError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }

    pub fn site(&self) -> Result<Url> {
        Url::parse(&self.site_url)
            .map_err(|e| SyncError::Config(format!("invalid site_url {}: {}", self.site_url, e)))
    }

    /// Site URL without a trailing slash
    pub fn site_base(&self) -> &str {
        self.site_url.trim_end_matches('/')
    }

    /// Token scope: the site's origin plus `/.default`
    pub fn scope(&self) -> Result<String> {
        let site = self.site()?;
        let host = site
            .host_str()
            .ok_or_else(|| SyncError::Config(format!("site_url has no host: {}", self.site_url)))?;
        Ok(format!("{}://{}/.default", site.scheme(), host))
    }

    pub fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_url.trim_end_matches('/'),
            self.tenant_id
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn digest_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.digest_refresh_margin_secs)
    }

    pub fn store(&self) -> StoreConfig {
        StoreConfig::in_dir(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        site_url = "https://contoso.sharepoint.com/sites/Yard/"
        tenant_id = "tenant"
        client_id = "client"
        client_secret = "secret"
    "#;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::from_toml(MINIMAL).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.parts_list, "Inventory");
        assert_eq!(config.commands_list, "Inventory Commands");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.site_base(), "https://contoso.sharepoint.com/sites/Yard");
    }

    #[test]
    fn test_scope_and_token_endpoint() {
        let config = SyncConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(
            config.scope().unwrap(),
            "https://contoso.sharepoint.com/.default"
        );
        assert_eq!(
            config.token_endpoint(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut config = SyncConfig::from_toml(MINIMAL).unwrap();
        config.apply_overrides(|key| match key {
            "YARDKEEP_CLIENT_SECRET" => Some("from-env".to_string()),
            _ => None,
        });
        assert_eq!(config.client_secret, "from-env");
        assert_eq!(config.client_id, "client");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = SyncConfig::from_toml(MINIMAL).unwrap();
        config.client_secret = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::from_toml(MINIMAL).unwrap();
        config.site_url = "ftp://example.com/site".to_string();
        assert!(config.validate().is_err());

        let mut config = SyncConfig::from_toml(MINIMAL).unwrap();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = SyncConfig::load(Some(&path)).unwrap();
        assert_eq!(config.store().parts_path(), PathBuf::from("./inventory.json"));
        assert!(SyncConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
