//! Typed client for the SharePoint list REST API
//!
//! A session is established once per run: bearer token (client-credentials
//! grant), write digest, and the entity type of each list. Mutating calls
//! carry the digest and refresh it when it is close to expiry.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde_json::{json, Map, Value};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};

const ODATA_VERBOSE: &str = "application/json;odata=verbose";
const DEFAULT_DIGEST_TIMEOUT_SECS: u64 = 1800;

/// The two logical collections mirrored remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Parts,
    Commands,
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKind::Parts => write!(f, "part"),
            ListKind::Commands => write!(f, "command"),
        }
    }
}

/// An item as returned by the remote store after creation
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedItem {
    pub id: i64,
    pub fields: Value,
}

/// Create/update contract of a remote list store
#[allow(async_fn_in_trait)]
pub trait ListStore {
    /// Create an item and return it with its assigned identifier
    async fn create_item(&mut self, list: ListKind, fields: Map<String, Value>) -> Result<CreatedItem>;

    /// Merge the given fields into the item with identifier `id`
    async fn update_item(&mut self, list: ListKind, id: i64, fields: Map<String, Value>) -> Result<()>;

    /// Re-acquire the write digest
    async fn refresh_digest(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
struct FormDigest {
    value: String,
    expires_at: Instant,
}

impl FormDigest {
    fn is_stale(&self, margin: Duration) -> bool {
        Instant::now() + margin >= self.expires_at
    }
}

/// Authenticated session against one SharePoint site
pub struct SharePointClient {
    http: Client,
    config: SyncConfig,
    access_token: String,
    digest: FormDigest,
    entity_types: HashMap<ListKind, String>,
}

impl SharePointClient {
    /// Acquire token, digest and both entity types. Any failure is fatal.
    pub async fn connect(config: SyncConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("cannot build HTTP client: {e}")))?;

        let access_token = fetch_access_token(&http, &config).await?;
        let digest = fetch_form_digest(&http, &config, &access_token).await?;

        let mut entity_types = HashMap::new();
        for list in [ListKind::Parts, ListKind::Commands] {
            let title = list_title(&config, list);
            let entity_type = fetch_entity_type(&http, &config, &access_token, title).await?;
            tracing::debug!("Entity type for '{}': {}", title, entity_type);
            entity_types.insert(list, entity_type);
        }

        tracing::info!("Connected to {}", config.site_base());
        Ok(Self {
            http,
            config,
            access_token,
            digest,
            entity_types,
        })
    }

    pub fn entity_type(&self, list: ListKind) -> Option<&str> {
        self.entity_types.get(&list).map(String::as_str)
    }

    fn items_url(&self, list: ListKind) -> String {
        format!(
            "{}/items",
            list_url(&self.config, list_title(&self.config, list))
        )
    }

    fn payload(&self, list: ListKind, fields: Map<String, Value>) -> Result<Value> {
        let entity_type = self.entity_type(list).ok_or_else(|| SyncError::Schema {
            list: list_title(&self.config, list).to_string(),
            message: "entity type not resolved".to_string(),
        })?;

        let mut payload = Map::new();
        payload.insert("__metadata".to_string(), json!({ "type": entity_type }));
        payload.extend(fields);
        Ok(Value::Object(payload))
    }

    async fn ensure_fresh_digest(&mut self) -> Result<()> {
        if self.digest.is_stale(self.config.digest_refresh_margin()) {
            tracing::info!("Form digest near expiry, refreshing");
            self.refresh_digest().await?;
        }
        Ok(())
    }
}

impl ListStore for SharePointClient {
    async fn create_item(&mut self, list: ListKind, fields: Map<String, Value>) -> Result<CreatedItem> {
        self.ensure_fresh_digest().await?;
        let title = list_title(&self.config, list).to_string();
        let context = format!("create item in '{title}'");
        let payload = self.payload(list, fields)?;

        let response = self
            .http
            .post(self.items_url(list))
            .header(ACCEPT, ODATA_VERBOSE)
            .header(CONTENT_TYPE, ODATA_VERBOSE)
            .bearer_auth(&self.access_token)
            .header("X-RequestDigest", &self.digest.value)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::transport(&context, e))?;

        let body = success_json(response, &context).await?;
        let item = body.get("d").cloned().unwrap_or(body);
        let id = item
            .get("ID")
            .or_else(|| item.get("Id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| SyncError::Response {
                context: context.clone(),
                message: "created item has no ID".to_string(),
            })?;

        tracing::debug!("Created {} item {} in '{}'", list, id, title);
        Ok(CreatedItem { id, fields: item })
    }

    async fn update_item(&mut self, list: ListKind, id: i64, fields: Map<String, Value>) -> Result<()> {
        self.ensure_fresh_digest().await?;
        let title = list_title(&self.config, list).to_string();
        let context = format!("update item {id} in '{title}'");
        let payload = self.payload(list, fields)?;

        let response = self
            .http
            .post(format!("{}({})", self.items_url(list), id))
            .header(ACCEPT, ODATA_VERBOSE)
            .header(CONTENT_TYPE, ODATA_VERBOSE)
            .bearer_auth(&self.access_token)
            .header("X-RequestDigest", &self.digest.value)
            .header("X-HTTP-Method", "MERGE")
            .header("IF-MATCH", "*")
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::transport(&context, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Status {
                context,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn refresh_digest(&mut self) -> Result<()> {
        self.digest = fetch_form_digest(&self.http, &self.config, &self.access_token).await?;
        Ok(())
    }
}

fn list_title(config: &SyncConfig, list: ListKind) -> &str {
    match list {
        ListKind::Parts => &config.parts_list,
        ListKind::Commands => &config.commands_list,
    }
}

/// `<site>/_api/web/lists/getbytitle('<title>')`, quotes doubled per OData
fn list_url(config: &SyncConfig, title: &str) -> String {
    let escaped = title.replace('\'', "''");
    format!(
        "{}/_api/web/lists/getbytitle('{}')",
        config.site_base(),
        urlencoding::encode(&escaped)
    )
}

async fn success_json(response: Response, context: &str) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| SyncError::transport(context, e))?;

    if !status.is_success() {
        return Err(SyncError::Status {
            context: context.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| SyncError::Response {
        context: context.to_string(),
        message: format!("{e}: {body}"),
    })
}

async fn fetch_access_token(http: &Client, config: &SyncConfig) -> Result<String> {
    let scope = config.scope()?;
    let form = [
        ("grant_type", "client_credentials"),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("scope", scope.as_str()),
    ];

    let response = http
        .post(config.token_endpoint())
        .form(&form)
        .send()
        .await
        .map_err(|e| SyncError::transport("token", e))?;

    let body = response
        .text()
        .await
        .map_err(|e| SyncError::transport("token", e))?;
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    parsed
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(SyncError::Auth(body))
}

async fn fetch_form_digest(http: &Client, config: &SyncConfig, token: &str) -> Result<FormDigest> {
    let url = format!("{}/_api/contextinfo", config.site_base());
    let response = http
        .post(url)
        .header(ACCEPT, ODATA_VERBOSE)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| SyncError::transport("contextinfo", e))?;

    let body = response
        .text()
        .await
        .map_err(|e| SyncError::transport("contextinfo", e))?;
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    let info = &parsed["d"]["GetContextWebInformation"];

    let value = info["FormDigestValue"]
        .as_str()
        .ok_or_else(|| SyncError::Digest(body.clone()))?
        .to_string();
    let timeout = info["FormDigestTimeoutSeconds"]
        .as_u64()
        .unwrap_or(DEFAULT_DIGEST_TIMEOUT_SECS);

    tracing::debug!("Acquired form digest valid for {}s", timeout);
    Ok(FormDigest {
        value,
        expires_at: Instant::now() + Duration::from_secs(timeout),
    })
}

async fn fetch_entity_type(
    http: &Client,
    config: &SyncConfig,
    token: &str,
    title: &str,
) -> Result<String> {
    let url = format!(
        "{}?$select=ListItemEntityTypeFullName",
        list_url(config, title)
    );
    let schema_err = |message: String| SyncError::Schema {
        list: title.to_string(),
        message,
    };

    let response = http
        .get(url)
        .header(ACCEPT, ODATA_VERBOSE)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| schema_err(e.to_string()))?;

    let body = response.text().await.map_err(|e| schema_err(e.to_string()))?;
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    parsed["d"]["ListItemEntityTypeFullName"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| schema_err(body))
}
