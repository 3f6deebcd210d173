//! Connection configuration for a MISP instance.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

/// MISP automation key.
///
/// The key is zeroized from memory when dropped and never printed by
/// `Debug` or `Display`.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Zeroizing::new(key.into()))
    }

    /// Exposes the key for use in a request header.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl PartialEq for ApiKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl Eq for ApiKey {}

impl Serialize for ApiKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ApiKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(ApiKey::new)
    }
}

/// MISP connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MispConfig {
    /// Hostname or URL of the MISP server.
    pub hostname: String,
    /// Automation key sent in the `Authorization` header.
    pub api_key: ApiKey,
    /// Whether to verify TLS certificates.
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Whether lifecycle hooks clear the host's cached dynamic variables.
    #[serde(default)]
    pub clear_macros: bool,
    /// Names of the dynamic variables cleared by the lifecycle hooks.
    #[serde(default)]
    pub macros: Vec<String>,
}

fn default_verify_ssl() -> bool {
    true
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_timeout() -> u64 {
    30
}

impl MispConfig {
    pub fn new(hostname: impl Into<String>, api_key: impl Into<ApiKey>) -> Self {
        Self {
            hostname: hostname.into(),
            api_key: api_key.into(),
            verify_ssl: default_verify_ssl(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            clear_macros: false,
            macros: Vec::new(),
        }
    }

    pub fn with_timeouts(mut self, connect_timeout_secs: u64, timeout_secs: u64) -> Self {
        self.connect_timeout_secs = connect_timeout_secs;
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_macro_cleanup(mut self, macros: Vec<String>) -> Self {
        self.clear_macros = true;
        self.macros = macros;
        self
    }

    /// Normalized base URL: scheme present, exactly one trailing slash.
    pub fn base_url(&self) -> String {
        normalize_base_url(&self.hostname)
    }
}

/// Connection to the host platform's dynamic-variable API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Hostname or URL of the host platform.
    pub url: String,
    /// Bearer token for the host API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<ApiKey>,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl HostConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            verify_ssl: default_verify_ssl(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn with_token(mut self, token: impl Into<ApiKey>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> String {
        normalize_base_url(&self.url)
    }
}

/// A bare hostname gets `https://`; an explicit `http://` or `https://` is
/// kept as given.
fn normalize_base_url(host: &str) -> String {
    let host = host.trim().trim_matches('/');
    if host.starts_with("https://") || host.starts_with("http://") {
        format!("{}/", host)
    } else {
        format!("https://{}/", host)
    }
}
