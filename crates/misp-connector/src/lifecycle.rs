//! Cleanup of the host platform's cached dynamic variables.
//!
//! When the connector is activated, deactivated or reconfigured, the values
//! the host cached from earlier runs (macros) may refer to a different MISP
//! instance. The lifecycle hooks remove them through a [`MacroStore`].

use crate::config::HostConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Path of the host platform's dynamic-variable collection.
const DYNAMIC_VARIABLE_PATH: &str = "api/wf/api/dynamic-variable/";

/// Errors raised by a macro store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MacroStoreError {
    #[error("Macro store request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid macro store response: {0}")]
    InvalidResponse(String),

    #[error("Macro store configuration error: {0}")]
    Config(String),
}

/// Access to the host platform's dynamic variables.
#[async_trait]
pub trait MacroStore: Send + Sync {
    /// Looks up the identifier of a dynamic variable by name.
    async fn find(&self, name: &str) -> Result<Option<String>, MacroStoreError>;

    /// Deletes a dynamic variable by identifier.
    async fn delete(&self, id: &str) -> Result<(), MacroStoreError>;
}

/// Outcome of one cleanup pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Names of the variables that were deleted.
    pub deleted: Vec<String>,
    /// Names that were not present in the store.
    pub missing: Vec<String>,
    /// Names whose lookup or deletion failed.
    pub failed: Vec<String>,
}

/// Deletes each named variable from the store.
///
/// Failures are logged and recorded; they never stop the remaining names
/// from being processed.
pub async fn clear_macros(store: &dyn MacroStore, names: &[String]) -> CleanupReport {
    let mut report = CleanupReport::default();

    for name in names {
        let id = match store.find(name).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                report.missing.push(name.clone());
                continue;
            }
            Err(e) => {
                error!(macro_name = %name, "{}", e);
                report.failed.push(name.clone());
                continue;
            }
        };

        info!(macro_name = %name, "Resetting global variable");
        match store.delete(&id).await {
            Ok(()) => report.deleted.push(name.clone()),
            Err(e) => {
                error!(macro_name = %name, "{}", e);
                report.failed.push(name.clone());
            }
        }
    }

    report
}

/// In-memory macro store for tests and offline runs.
#[derive(Debug, Default)]
pub struct InMemoryMacroStore {
    /// Variable name to identifier.
    variables: RwLock<HashMap<String, String>>,
    next_id: AtomicUsize,
    fail_lookups: bool,
}

impl InMemoryMacroStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store whose lookups always fail.
    pub fn failing() -> Self {
        Self {
            fail_lookups: true,
            ..Self::default()
        }
    }

    /// Adds a variable, returning its identifier.
    pub async fn insert(&self, name: &str) -> String {
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        self.variables
            .write()
            .await
            .insert(name.to_string(), id.clone());
        id
    }

    /// Returns whether a variable with this name exists.
    pub async fn contains(&self, name: &str) -> bool {
        self.variables.read().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.variables.read().await.len()
    }
}

#[async_trait]
impl MacroStore for InMemoryMacroStore {
    async fn find(&self, name: &str) -> Result<Option<String>, MacroStoreError> {
        if self.fail_lookups {
            return Err(MacroStoreError::RequestFailed(format!(
                "lookup of '{}' failed",
                name
            )));
        }
        Ok(self.variables.read().await.get(name).cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), MacroStoreError> {
        let mut variables = self.variables.write().await;
        let before = variables.len();
        variables.retain(|_, v| v != id);
        if variables.len() == before {
            return Err(MacroStoreError::RequestFailed(format!(
                "no variable with id {}",
                id
            )));
        }
        Ok(())
    }
}

/// Macro store backed by the host platform's dynamic-variable REST API.
pub struct HostMacroStore {
    client: Client,
    base_url: String,
}

impl HostMacroStore {
    pub fn new(config: &HostConfig) -> Result<Self, MacroStoreError> {
        let base_url = config.base_url();

        if !config.verify_ssl {
            warn!(base_url = %base_url, "TLS certificate verification DISABLED for host API");
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|_| MacroStoreError::Config("token contains invalid characters".into()))?;
            auth.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .default_headers(headers)
            .build()
            .map_err(|e| MacroStoreError::Config(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, DYNAMIC_VARIABLE_PATH)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, MacroStoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| MacroStoreError::RequestFailed(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| MacroStoreError::RequestFailed(e.to_string()))?;

        if status.is_success() {
            Ok(text)
        } else {
            Err(MacroStoreError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                text.chars().take(200).collect::<String>()
            )))
        }
    }
}

#[async_trait]
impl MacroStore for HostMacroStore {
    async fn find(&self, name: &str) -> Result<Option<String>, MacroStoreError> {
        let url = self.collection_url();
        debug!(url = %url, macro_name = %name, "Looking up dynamic variable");

        let text = self
            .send(self.client.get(&url).query(&[("name", name)]))
            .await?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| MacroStoreError::InvalidResponse(e.to_string()))?;

        let first = match body.get("hydra:member").and_then(Value::as_array) {
            Some(members) => members.first(),
            None => {
                return Err(MacroStoreError::InvalidResponse(
                    "missing hydra:member collection".into(),
                ))
            }
        };

        match first.and_then(|m| m.get("id")) {
            None => Ok(None),
            Some(Value::String(id)) => Ok(Some(id.clone())),
            Some(Value::Number(id)) => Ok(Some(id.to_string())),
            Some(other) => Err(MacroStoreError::InvalidResponse(format!(
                "unexpected variable id: {}",
                other
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), MacroStoreError> {
        let url = format!("{}{}/", self.collection_url(), urlencoding::encode(id));
        debug!(url = %url, "Deleting dynamic variable");

        self.send(self.client.delete(&url).query(&[("format", "json")]))
            .await
            .map(|_| ())
    }
}
