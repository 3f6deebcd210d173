//! MISP connector: operation dispatch, health check and lifecycle hooks.

use crate::config::MispConfig;
use crate::http::MispClient;
use crate::lifecycle::{clear_macros, CleanupReport, MacroStore};
use crate::operations::{login, Operation, OperationParams};
use crate::payload::is_truthy;
use crate::traits::{Connector, ConnectorError, ConnectorHealth, ConnectorResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// MISP connector.
pub struct MispConnector {
    config: MispConfig,
    client: MispClient,
    macro_store: Option<Arc<dyn MacroStore>>,
}

impl MispConnector {
    pub fn new(config: MispConfig) -> ConnectorResult<Self> {
        let client = MispClient::new(&config)?;
        debug!(base_url = %client.base_url(), "MISP connector initialized");
        Ok(Self {
            config,
            client,
            macro_store: None,
        })
    }

    /// Attaches the store used by the lifecycle hooks.
    pub fn with_macro_store(mut self, store: Arc<dyn MacroStore>) -> Self {
        self.macro_store = Some(store);
        self
    }

    pub fn config(&self) -> &MispConfig {
        &self.config
    }

    pub fn client(&self) -> &MispClient {
        &self.client
    }

    /// Executes an operation by its host-facing name.
    #[instrument(skip(self, params))]
    pub async fn execute(
        &self,
        operation: &str,
        params: &OperationParams,
    ) -> ConnectorResult<Value> {
        let operation = operation.parse::<Operation>().map_err(|e| {
            error!("{}", e);
            e
        })?;
        self.execute_operation(operation, params).await
    }

    /// Executes a parsed operation.
    pub async fn execute_operation(
        &self,
        operation: Operation,
        params: &OperationParams,
    ) -> ConnectorResult<Value> {
        info!(operation = %operation, "Executing action");
        operation.run(&self.client, params).await.map_err(|e| {
            error!(operation = %operation, "{}", e);
            e
        })
    }

    /// Probes the server with a benign list call.
    ///
    /// Fails when the call errors or returns an empty response.
    pub async fn check_health(&self) -> ConnectorResult<()> {
        match login(&self.client).await {
            Ok(response) if is_truthy(&response) => Ok(()),
            Ok(response) => Err(health_failure(format!(
                "Error in Check Health: {}",
                response
            ))),
            Err(e) => Err(health_failure(e)),
        }
    }

    /// Clears the configured macros if cleanup is enabled.
    async fn reset_macros(&self, hook: &str) -> CleanupReport {
        if !self.config.clear_macros {
            debug!(hook, "Macro cleanup disabled");
            return CleanupReport::default();
        }
        match &self.macro_store {
            Some(store) => {
                info!(hook, count = self.config.macros.len(), "Clearing cached macros");
                clear_macros(store.as_ref(), &self.config.macros).await
            }
            None => {
                debug!(hook, "No macro store attached");
                CleanupReport::default()
            }
        }
    }

    pub async fn on_activate(&self) -> CleanupReport {
        self.reset_macros("activate").await
    }

    pub async fn on_deactivate(&self) -> CleanupReport {
        self.reset_macros("deactivate").await
    }

    pub async fn on_add_config(&self, active: bool) -> CleanupReport {
        debug!(active, "Configuration added");
        self.reset_macros("add_config").await
    }

    pub async fn on_delete_config(&self) -> CleanupReport {
        self.reset_macros("delete_config").await
    }
}

#[async_trait]
impl Connector for MispConnector {
    fn name(&self) -> &str {
        "misp"
    }

    fn connector_type(&self) -> &str {
        "threat_intel"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        match self.check_health().await {
            Ok(()) => Ok(ConnectorHealth::Healthy),
            Err(e) => Ok(ConnectorHealth::Unhealthy(e.to_string())),
        }
    }

    async fn test_connection(&self) -> ConnectorResult<bool> {
        self.check_health().await.map(|_| true)
    }
}

fn health_failure(detail: impl std::fmt::Display) -> ConnectorError {
    let err = ConnectorError::HealthCheck(format!(
        "Error connecting to MISP. Error as follows: {}",
        detail
    ));
    error!("{}", err);
    err
}

/// Host entry point: runs one operation with a freshly built connector.
pub async fn execute(
    config: &MispConfig,
    operation: &str,
    params: &OperationParams,
) -> ConnectorResult<Value> {
    let connector = MispConnector::new(config.clone()).map_err(|e| {
        error!(operation, "{}", e);
        e
    })?;
    connector.execute(operation, params).await
}

/// Host entry point: runs the health probe with a freshly built connector.
pub async fn check_health(config: &MispConfig) -> ConnectorResult<()> {
    let connector = MispConnector::new(config.clone()).map_err(health_failure)?;
    connector.check_health().await
}
