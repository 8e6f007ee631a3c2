use anyhow::Context;
use connector_bridge::config::BridgeConfig;
use connector_bridge::dashboard::{ActivityLog, DashboardAssembler};
use connector_bridge::dispatch::DispatchEngine;
use connector_bridge::health::HealthAggregator;
use connector_bridge::http_server::{serve, AppState};
use connector_bridge::local::LocalExecutor;
use connector_bridge::registry::ConnectorRegistry;
use connector_bridge::remote::RemoteCallClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Fail fast: a missing credential or broken catalog must prevent serving
    let config = BridgeConfig::load().context("configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    let registry = Arc::new(ConnectorRegistry::with_default_catalog().context("registry")?);
    info!(connectors = registry.len(), "catalog loaded");

    let remote = Arc::new(RemoteCallClient::from_config(&config).context("remote client")?);

    let health = HealthAggregator::new(registry.clone(), remote.clone(), &config.health);
    health.start();

    let activity = ActivityLog::new(config.dashboard.activity_capacity);
    let dispatch = Arc::new(DispatchEngine::new(
        registry.clone(),
        Arc::new(LocalExecutor),
        remote,
        health.clone(),
        activity.clone(),
    ));
    let dashboard = Arc::new(DashboardAssembler::new(
        registry.clone(),
        health,
        activity,
        config.dashboard.case.clone(),
    ));

    let state = AppState {
        registry,
        dispatch,
        dashboard,
    };

    serve(&config.server.bind_addr, state)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))
}
