//! Mobile dashboard assembly.
//!
//! Pure in-memory aggregation of the connector catalog, the latest
//! health snapshot, the case summary, and recent activity. Never
//! performs network I/O.

use crate::config::CaseOverview;
use crate::dispatch::ExecuteResult;
use crate::health::{HealthAggregator, HealthStatus};
use crate::registry::{ConnectorRegistry, ConnectorSuite};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Bounded list of the most recent execute results. Ring-buffer
/// semantics: oldest evicted first.
#[derive(Clone)]
pub struct ActivityLog {
    entries: Arc<RwLock<VecDeque<ExecuteResult>>>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub async fn record(&self, result: ExecuteResult) {
        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(result);
    }

    /// Most recent entries, newest first
    pub async fn recent(&self) -> Vec<ExecuteResult> {
        self.entries.read().await.iter().rev().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Online/total connector counts for the status strip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorStatusSummary {
    pub online: usize,
    pub total: usize,
}

/// One-tap shortcut to a connector tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAction {
    pub name: String,
    pub connector: String,
    pub tool: String,
}

/// Everything the mobile client renders in one response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub case_overview: CaseOverview,
    pub connector_status: ConnectorStatusSummary,
    pub connectors: Vec<ConnectorSuite>,
    pub health: HashMap<String, HealthStatus>,
    pub recent_activity: Vec<ExecuteResult>,
    pub quick_actions: Vec<QuickAction>,
}

pub struct DashboardAssembler {
    registry: Arc<ConnectorRegistry>,
    health: HealthAggregator,
    activity: ActivityLog,
    case_overview: CaseOverview,
}

impl DashboardAssembler {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        health: HealthAggregator,
        activity: ActivityLog,
        case_overview: CaseOverview,
    ) -> Self {
        Self {
            registry,
            health,
            activity,
            case_overview,
        }
    }

    pub async fn assemble(&self) -> DashboardView {
        let connectors = self.registry.list().to_vec();
        let health = self.health.snapshot().await;
        let online = self.health.online_count().await;

        DashboardView {
            case_overview: self.case_overview.clone(),
            connector_status: ConnectorStatusSummary {
                online,
                total: connectors.len(),
            },
            quick_actions: quick_actions(&connectors),
            recent_activity: self.activity.recent().await,
            connectors,
            health,
        }
    }
}

/// One shortcut per suite, pointing at its first tool
fn quick_actions(connectors: &[ConnectorSuite]) -> Vec<QuickAction> {
    connectors
        .iter()
        .filter_map(|suite| {
            suite.tools.first().map(|tool| QuickAction {
                name: humanize(&tool.name),
                connector: suite.id.clone(),
                tool: tool.name.clone(),
            })
        })
        .collect()
}

/// "legal_research" -> "Legal Research"
fn humanize(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
