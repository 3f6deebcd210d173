//! Core error, result and trait definitions for the MISP connector.
//!
//! Every failure the connector can produce is a [`ConnectorError`], so the
//! host platform only ever has to handle one error kind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the connector.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("{0}")]
    Validation(String),

    /// The remote answered with a non-success status.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("SSL certificate validation failed")]
    Tls,

    #[error("The request timed out while trying to connect to the server")]
    ConnectTimeout,

    #[error("The server did not send any data in the allotted amount of time")]
    ReadTimeout,

    #[error("Invalid endpoint or credentials")]
    ConnectionFailed,

    #[error("{0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The remote accepted the request but reported a failure in the body.
    #[error("{0}")]
    Remote(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("{0}")]
    HealthCheck(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}. Error as follows: {source}")]
    Operation {
        context: String,
        #[source]
        source: Box<ConnectorError>,
    },
}

impl ConnectorError {
    /// Wraps this error with an operation-specific context message.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ConnectorError::Operation {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the HTTP status carried by this error, looking through
    /// operation wrappers.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnectorError::Http { status, .. } => Some(*status),
            ConnectorError::Operation { source, .. } => source.status(),
            _ => None,
        }
    }

    /// Returns true for failures that happened before any response was read.
    pub fn is_transport(&self) -> bool {
        match self {
            ConnectorError::Tls
            | ConnectorError::ConnectTimeout
            | ConnectorError::ReadTimeout
            | ConnectorError::ConnectionFailed
            | ConnectorError::RequestFailed(_) => true,
            ConnectorError::Operation { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Health status of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    /// Connector is healthy and operational.
    Healthy,
    /// Connector is unhealthy and not operational.
    Unhealthy(String),
}

/// Base trait for connectors driven by a host platform.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector name.
    fn name(&self) -> &str;

    /// Returns the connector type (e.g., "threat_intel").
    fn connector_type(&self) -> &str;

    /// Checks the health of the connector.
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth>;

    /// Tests the connection to the external system.
    async fn test_connection(&self) -> ConnectorResult<bool>;
}
