//! # misp-connector
//!
//! Connector that lets a security-orchestration host drive a MISP instance
//! through a fixed set of named operations.
//!
//! The host calls [`execute`] with a connection config, an operation name and
//! a parameter map, or [`check_health`] to probe connectivity. Every failure
//! surfaces as a [`ConnectorError`].

pub mod config;
pub mod connector;
pub mod http;
pub mod lifecycle;
pub mod mapping;
pub mod operations;
pub mod payload;
pub mod testing;
pub mod traits;

pub use config::{ApiKey, HostConfig, MispConfig};
pub use connector::{check_health, execute, MispConnector};
pub use http::{MispClient, RequestBody};
pub use lifecycle::{
    clear_macros, CleanupReport, HostMacroStore, InMemoryMacroStore, MacroStore, MacroStoreError,
};
pub use mapping::{
    attribute_categories, attribute_types, Analysis, Distribution, LabelledCode, ThreatLevel,
};
pub use operations::{Operation, OperationParams};
pub use payload::{build_payload, is_truthy};
pub use traits::{Connector, ConnectorError, ConnectorHealth, ConnectorResult};
