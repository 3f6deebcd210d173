//! # misp-observability
//!
//! Structured logging for the MISP connector workspace.

pub mod logging;

pub use logging::{init_logging, init_logging_with_config, LoggingConfig};
