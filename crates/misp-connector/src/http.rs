//! HTTP client for the MISP REST API.
//!
//! Each call issues exactly one request. There is no retry, rate limiting or
//! caching layer: the host platform decides whether to re-run an operation.

use crate::config::MispConfig;
use crate::traits::{ConnectorError, ConnectorResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Maximum number of body characters echoed into logs and error messages.
const BODY_PREVIEW_CHARS: usize = 500;

/// Request body sent to MISP.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON.
    Json(Value),
    /// Sent verbatim.
    Text(String),
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

/// Message reported for a non-success status.
///
/// Known statuses use a fixed message. Anything else falls back to the
/// response body, preferring its JSON form.
pub fn status_message(status: StatusCode, body: &str) -> String {
    match status.as_u16() {
        400 => "Bad/Invalid Request".to_string(),
        401 => "Unauthorized: Invalid credentials provided failed to authorize".to_string(),
        404 => "Not Found".to_string(),
        429 => "Too Many Requests".to_string(),
        500 => "Internal Server Error".to_string(),
        code => match serde_json::from_str::<Value>(body) {
            Ok(Value::String(s)) => s,
            Ok(Value::Null) | Err(_) => format!("HTTP {}: {}", code, preview(body)),
            Ok(json) => json.to_string(),
        },
    }
}

/// Decodes a success body as JSON regardless of the declared content type.
///
/// Blank bodies decode to `null`; anything else that is not JSON is an
/// error.
pub fn decode_body(status: StatusCode, text: &str) -> ConnectorResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| {
        ConnectorError::InvalidResponse(format!(
            "Failed to parse response (status {}): {} - Body: {}",
            status,
            e,
            preview(text)
        ))
    })
}

fn preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Maps a transport failure onto the connector's error kinds.
pub fn classify_transport_error(e: &reqwest::Error) -> ConnectorError {
    if is_tls_error(e) {
        ConnectorError::Tls
    } else if e.is_timeout() && e.is_connect() {
        ConnectorError::ConnectTimeout
    } else if e.is_timeout() {
        ConnectorError::ReadTimeout
    } else if e.is_connect() {
        ConnectorError::ConnectionFailed
    } else {
        ConnectorError::RequestFailed(e.to_string())
    }
}

/// Walks the source chain looking for a TLS failure.
///
/// reqwest has no TLS error kind. rustls surfaces certificate problems by
/// message and protocol violations (such as a plain-HTTP peer) as
/// `io::ErrorKind::InvalidData`.
fn is_tls_error(e: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::InvalidData {
                return true;
            }
        }
        let msg = err.to_string().to_lowercase();
        if msg.contains("certificate") || msg.contains("handshake") {
            return true;
        }
        current = err.source();
    }
    false
}

fn query_pairs(query: &Map<String, Value>) -> Vec<(String, String)> {
    query
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Authenticated client bound to one MISP instance.
pub struct MispClient {
    client: Client,
    base_url: String,
}

impl MispClient {
    /// Builds a client from connector configuration.
    pub fn new(config: &MispConfig) -> ConnectorResult<Self> {
        let base_url = config.base_url();

        if !config.verify_ssl {
            warn!(
                base_url = %base_url,
                "TLS certificate verification DISABLED - connection is vulnerable to MITM attacks"
            );
        }

        let mut auth = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ConnectorError::Config("API key contains invalid characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .default_headers(headers)
            .build()
            .map_err(|e| ConnectorError::Config(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Gets the normalized base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a URL from a relative path.
    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Executes a GET request.
    pub async fn get(&self, path: &str) -> ConnectorResult<Value> {
        self.request(Method::GET, path, None, None).await
    }

    /// Executes a POST request with a JSON body.
    pub async fn post(&self, path: &str, body: Value) -> ConnectorResult<Value> {
        self.request(Method::POST, path, Some(RequestBody::Json(body)), None)
            .await
    }

    /// Executes a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> ConnectorResult<Value> {
        self.request(Method::POST, path, None, None).await
    }

    /// Executes a DELETE request.
    pub async fn delete(&self, path: &str) -> ConnectorResult<Value> {
        self.request(Method::DELETE, path, None, None).await
    }

    /// Issues a single request and decodes the JSON response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        query: Option<&Map<String, Value>>,
    ) -> ConnectorResult<Value> {
        let url = self.build_url(path);
        debug!(method = %method, url = %url, "Endpoint URL");

        let mut request = self.client.request(method.clone(), &url);
        if let Some(query) = query {
            request = request.query(&query_pairs(query));
        }
        request = match body {
            Some(RequestBody::Json(value)) => request.body(value.to_string()),
            Some(RequestBody::Text(text)) => request.body(text),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&e))?;
        debug!(status = %status, body = %preview(&text), "Response received");

        if status.is_success() {
            info!(url = %url, "Successfully got response");
            decode_body(status, &text)
        } else {
            let message = status_message(status, &text);
            error!(status = status.as_u16(), url = %url, "{}", message);
            Err(ConnectorError::Http {
                status: status.as_u16(),
                message,
            })
        }
    }
}
