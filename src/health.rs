//! Connector health tracking.
//!
//! A background task probes every connector on a fixed interval, and
//! request handling pushes live call outcomes into the same guarded
//! store, so a failed execute counts toward unhealthiness between
//! scheduled probes. Once the consecutive-failure streak reaches the
//! configured threshold the dispatcher short-circuits calls to that
//! connector.

use crate::config::HealthConfig;
use crate::error::Result;
use crate::registry::ConnectorRegistry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Reachability probe against the remote MCP server
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> Result<()>;
}

#[async_trait]
impl HealthProbe for crate::remote::RemoteCallClient {
    async fn probe(&self) -> Result<()> {
        crate::remote::RemoteCallClient::probe(self).await
    }
}

/// Per-connector health record. Created at first probe, overwritten in
/// place for the process lifetime, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub connector_id: String,
    pub reachable: bool,
    pub last_checked: DateTime<Utc>,
    pub consecutive_failures: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl HealthStatus {
    fn fresh(connector_id: &str) -> Self {
        Self {
            connector_id: connector_id.to_string(),
            reachable: true,
            last_checked: Utc::now(),
            consecutive_failures: 0,
            last_error: None,
        }
    }
}

/// Shared health store plus the scheduled prober
#[derive(Clone)]
pub struct HealthAggregator {
    statuses: Arc<RwLock<HashMap<String, HealthStatus>>>,
    registry: Arc<ConnectorRegistry>,
    prober: Arc<dyn HealthProbe>,
    probe_interval: Duration,
    unhealthy_threshold: u32,
}

impl HealthAggregator {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        prober: Arc<dyn HealthProbe>,
        config: &HealthConfig,
    ) -> Self {
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            registry,
            prober,
            probe_interval: Duration::from_secs(config.probe_interval_secs),
            unhealthy_threshold: config.unhealthy_threshold.max(1),
        }
    }

    pub fn unhealthy_threshold(&self) -> u32 {
        self.unhealthy_threshold
    }

    /// Probe a single connector and update its cached status. Suites
    /// with no remote tools are always reachable.
    pub async fn probe(&self, connector_id: &str) -> Result<HealthStatus> {
        let suite = self.registry.get(connector_id)?;

        let outcome = if suite.has_remote_tools() {
            self.prober.probe().await
        } else {
            Ok(())
        };

        let status = match outcome {
            Ok(()) => {
                self.record_success(connector_id).await;
                debug!(connector = connector_id, "health probe succeeded");
                self.get(connector_id).await
            }
            Err(err) => {
                self.record_failure(connector_id, &err.to_string()).await;
                warn!(connector = connector_id, "health probe failed: {err}");
                self.get(connector_id).await
            }
        };

        // record_* always inserts the entry
        Ok(status.unwrap_or_else(|| HealthStatus::fresh(connector_id)))
    }

    /// Probe every registered connector once
    pub async fn probe_all(&self) {
        let ids: Vec<String> = self
            .registry
            .list()
            .iter()
            .map(|s| s.id.clone())
            .collect();
        for id in ids {
            if let Err(err) = self.probe(&id).await {
                warn!(connector = %id, "probe skipped: {err}");
            }
        }
    }

    /// Spawn the scheduled prober as an independent background task
    pub fn start(&self) {
        let aggregator = self.clone();
        info!(
            interval_secs = self.probe_interval.as_secs(),
            "starting health prober"
        );
        tokio::spawn(async move {
            let mut ticker = interval(aggregator.probe_interval);
            loop {
                ticker.tick().await;
                aggregator.probe_all().await;
            }
        });
    }

    /// Cached status map. In-memory read only, never touches the network.
    pub async fn snapshot(&self) -> HashMap<String, HealthStatus> {
        self.statuses.read().await.clone()
    }

    pub async fn get(&self, connector_id: &str) -> Option<HealthStatus> {
        self.statuses.read().await.get(connector_id).cloned()
    }

    /// A success resets the streak to zero
    pub async fn record_success(&self, connector_id: &str) {
        let mut statuses = self.statuses.write().await;
        let status = statuses
            .entry(connector_id.to_string())
            .or_insert_with(|| HealthStatus::fresh(connector_id));
        status.reachable = true;
        status.consecutive_failures = 0;
        status.last_error = None;
        status.last_checked = Utc::now();
    }

    /// A failure increments the streak
    pub async fn record_failure(&self, connector_id: &str, error: &str) {
        let mut statuses = self.statuses.write().await;
        let status = statuses
            .entry(connector_id.to_string())
            .or_insert_with(|| HealthStatus::fresh(connector_id));
        status.reachable = false;
        status.consecutive_failures += 1;
        status.last_error = Some(error.to_string());
        status.last_checked = Utc::now();
    }

    /// Short-circuit predicate for the dispatcher
    pub async fn is_unavailable(&self, connector_id: &str) -> bool {
        self.statuses
            .read()
            .await
            .get(connector_id)
            .map(|s| s.consecutive_failures >= self.unhealthy_threshold)
            .unwrap_or(false)
    }

    /// Connectors currently below the unhealthy threshold. Never-probed
    /// connectors count as online.
    pub async fn online_count(&self) -> usize {
        let statuses = self.statuses.read().await;
        self.registry
            .list()
            .iter()
            .filter(|suite| {
                statuses
                    .get(&suite.id)
                    .map(|s| s.consecutive_failures < self.unhealthy_threshold)
                    .unwrap_or(true)
            })
            .count()
    }
}
