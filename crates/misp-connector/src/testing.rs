//! Testing harness for the MISP connector.
//!
//! Provides helper functions to simplify tests against mock MISP servers.

use crate::config::MispConfig;
use crate::traits::{ConnectorHealth, ConnectorResult};

/// API key used by [`test_config`].
pub const TEST_API_KEY: &str = "test-automation-key";

/// Creates a test config with short timeouts and verification enabled.
pub fn test_config(hostname: &str) -> MispConfig {
    MispConfig::new(hostname, TEST_API_KEY).with_timeouts(2, 5)
}

/// Asserts that a connector health check returns healthy.
pub fn assert_healthy(result: &ConnectorResult<ConnectorHealth>) {
    match result {
        Ok(ConnectorHealth::Healthy) => {}
        other => panic!("Expected Healthy, got {:?}", other),
    }
}

/// Asserts that a connector health check returns unhealthy.
pub fn assert_unhealthy(result: &ConnectorResult<ConnectorHealth>) {
    match result {
        Ok(ConnectorHealth::Unhealthy(_)) => {}
        other => panic!("Expected Unhealthy, got {:?}", other),
    }
}
