//! Dispatch engine: validates execute requests against the registry,
//! selects an executor, and normalizes every outcome into a typed
//! `ExecuteResult`. Never returns an error across the boundary.

use crate::dashboard::ActivityLog;
use crate::error::{BridgeError, ErrorKind};
use crate::health::HealthAggregator;
use crate::registry::{ConnectorRegistry, ExecutionMode, Tool};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// One tool-invocation request
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub connector: String,
    pub tool: String,
    #[serde(default)]
    pub context: Map<String, Value>,
}

/// Error half of the result envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Normalized outcome of a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub id: Uuid,
    pub success: bool,
    pub connector: String,
    pub tool: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecuteError>,
    /// Remote attempt count; absent for local and pre-dispatch failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Successful executor output
pub struct ExecutorOutcome {
    pub value: Value,
    pub attempts: Option<u32>,
}

/// Failed executor output, still tagged with attempts where known
#[derive(Debug)]
pub struct ExecutorFailure {
    pub error: BridgeError,
    pub attempts: Option<u32>,
}

/// Polymorphic execution seam: one implementation per execution mode
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        connector_id: &str,
        tool_name: &str,
        context: &Map<String, Value>,
    ) -> std::result::Result<ExecutorOutcome, ExecutorFailure>;
}

#[async_trait]
impl ToolExecutor for crate::remote::RemoteCallClient {
    async fn execute(
        &self,
        connector_id: &str,
        tool_name: &str,
        context: &Map<String, Value>,
    ) -> std::result::Result<ExecutorOutcome, ExecutorFailure> {
        match self.call(connector_id, tool_name, context).await {
            Ok(outcome) => Ok(ExecutorOutcome {
                value: outcome.value,
                attempts: Some(outcome.attempts),
            }),
            Err(failure) => Err(ExecutorFailure {
                error: failure.error,
                attempts: Some(failure.attempts),
            }),
        }
    }
}

pub struct DispatchEngine {
    registry: Arc<ConnectorRegistry>,
    local: Arc<dyn ToolExecutor>,
    remote: Arc<dyn ToolExecutor>,
    health: HealthAggregator,
    activity: ActivityLog,
}

impl DispatchEngine {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        local: Arc<dyn ToolExecutor>,
        remote: Arc<dyn ToolExecutor>,
        health: HealthAggregator,
        activity: ActivityLog,
    ) -> Self {
        Self {
            registry,
            local,
            remote,
            health,
            activity,
        }
    }

    /// Execute a request end to end. Every outcome, success or failure,
    /// comes back as an `ExecuteResult` with latency attached.
    pub async fn execute(&self, request: ExecuteRequest) -> ExecuteResult {
        let started = Instant::now();
        let (mode, outcome) = self.run(&request).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(outcome) => {
                debug!(
                    connector = %request.connector,
                    tool = %request.tool,
                    latency_ms,
                    "execute succeeded"
                );
                ExecuteResult {
                    id: Uuid::new_v4(),
                    success: true,
                    connector: request.connector,
                    tool: request.tool,
                    mode,
                    result: Some(outcome.value),
                    error: None,
                    attempts: outcome.attempts,
                    latency_ms,
                    timestamp: Utc::now(),
                }
            }
            Err(failure) => {
                info!(
                    connector = %request.connector,
                    tool = %request.tool,
                    kind = ?failure.error.kind(),
                    latency_ms,
                    "execute failed: {}",
                    failure.error
                );
                ExecuteResult {
                    id: Uuid::new_v4(),
                    success: false,
                    connector: request.connector,
                    tool: request.tool,
                    mode,
                    result: None,
                    error: Some(ExecuteError {
                        kind: failure.error.kind(),
                        message: failure.error.to_string(),
                    }),
                    attempts: failure.attempts,
                    latency_ms,
                    timestamp: Utc::now(),
                }
            }
        };

        self.activity.record(result.clone()).await;
        result
    }

    async fn run(
        &self,
        request: &ExecuteRequest,
    ) -> (
        Option<ExecutionMode>,
        std::result::Result<ExecutorOutcome, ExecutorFailure>,
    ) {
        let (suite, tool) = match self.registry.lookup(&request.connector, &request.tool) {
            Ok(found) => found,
            Err(error) => {
                return (
                    None,
                    Err(ExecutorFailure {
                        error,
                        attempts: None,
                    }),
                )
            }
        };

        if let Err(error) = validate_payload(tool, &request.context) {
            return (
                None,
                Err(ExecutorFailure {
                    error,
                    attempts: None,
                }),
            );
        }

        let mode = suite.effective_mode(tool);
        match mode {
            ExecutionMode::Local => {
                // Local stubs never touch the network or the failure streak
                let outcome = self
                    .local
                    .execute(&request.connector, &request.tool, &request.context)
                    .await;
                (Some(mode), outcome)
            }
            ExecutionMode::Remote => {
                if self.health.is_unavailable(&request.connector).await {
                    return (
                        Some(mode),
                        Err(ExecutorFailure {
                            error: BridgeError::ConnectorUnavailable(format!(
                                "connector '{}' is failing; skipping call until it recovers",
                                request.connector
                            )),
                            attempts: None,
                        }),
                    );
                }

                let outcome = self
                    .remote
                    .execute(&request.connector, &request.tool, &request.context)
                    .await;
                match &outcome {
                    Ok(_) => self.health.record_success(&request.connector).await,
                    Err(failure) => {
                        self.health
                            .record_failure(&request.connector, &failure.error.to_string())
                            .await
                    }
                }
                (Some(mode), outcome)
            }
        }
    }
}

/// Check a context payload against the tool's field schema. Reports all
/// missing and mismatched fields at once.
fn validate_payload(tool: &Tool, context: &Map<String, Value>) -> crate::error::Result<()> {
    let mut missing = Vec::new();
    let mut mismatched = Vec::new();

    for field in &tool.fields {
        match context.get(&field.name) {
            None if field.required => missing.push(field.name.clone()),
            Some(value) if !field.field_type.matches(value) => {
                mismatched.push(format!("{} (expected {:?})", field.name, field.field_type));
            }
            _ => {}
        }
    }

    if missing.is_empty() && mismatched.is_empty() {
        return Ok(());
    }

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required field(s): {}", missing.join(", ")));
    }
    if !mismatched.is_empty() {
        parts.push(format!("type mismatch: {}", mismatched.join(", ")));
    }
    Err(BridgeError::InvalidPayload(parts.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HealthConfig;
    use crate::health::HealthProbe;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct NoopProbe;

    #[async_trait]
    impl HealthProbe for NoopProbe {
        async fn probe(&self) -> crate::error::Result<()> {
            Ok(())
        }
    }

    /// Counts invocations; succeeds or fails per the configured script
    struct ScriptedExecutor {
        calls: AtomicU32,
        failures_before_success: u32,
        attempts_per_call: u32,
    }

    impl ScriptedExecutor {
        fn succeeding() -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success: 0,
                attempts_per_call: 1,
            }
        }

        fn failing() -> Self {
            Self {
                calls: AtomicU32::new(0),
                failures_before_success: u32::MAX,
                attempts_per_call: 3,
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ToolExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            _connector_id: &str,
            tool_name: &str,
            _context: &Map<String, Value>,
        ) -> std::result::Result<ExecutorOutcome, ExecutorFailure> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(ExecutorFailure {
                    error: BridgeError::Timeout("scripted timeout".to_string()),
                    attempts: Some(self.attempts_per_call),
                })
            } else {
                Ok(ExecutorOutcome {
                    value: json!({"tool": tool_name, "ok": true}),
                    attempts: Some(self.attempts_per_call),
                })
            }
        }
    }

    struct Harness {
        engine: DispatchEngine,
        local: Arc<ScriptedExecutor>,
        remote: Arc<ScriptedExecutor>,
        health: HealthAggregator,
        activity: ActivityLog,
    }

    fn harness(local: ScriptedExecutor, remote: ScriptedExecutor) -> Harness {
        let registry = Arc::new(ConnectorRegistry::with_default_catalog().unwrap());
        let health = HealthAggregator::new(
            registry.clone(),
            Arc::new(NoopProbe),
            &HealthConfig {
                probe_interval_secs: 30,
                probe_timeout_secs: 1,
                unhealthy_threshold: 3,
            },
        );
        let activity = ActivityLog::new(10);
        let local = Arc::new(local);
        let remote = Arc::new(remote);
        let engine = DispatchEngine::new(
            registry,
            local.clone(),
            remote.clone(),
            health.clone(),
            activity.clone(),
        );
        Harness {
            engine,
            local,
            remote,
            health,
            activity,
        }
    }

    fn request(connector: &str, tool: &str, context: Value) -> ExecuteRequest {
        ExecuteRequest {
            connector: connector.to_string(),
            tool: tool.to_string(),
            context: context.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_unknown_connector_makes_no_call() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());

        let result = h
            .engine
            .execute(request("ghost", "anything", json!({})))
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::UnknownConnector);
        assert_eq!(h.local.call_count(), 0);
        assert_eq!(h.remote.call_count(), 0);
        // No streak mutation either
        assert!(h.health.get("ghost").await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_tool_makes_no_call() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());

        let result = h
            .engine
            .execute(request("legal_ai", "teleport", json!({})))
            .await;

        assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::UnknownTool);
        assert_eq!(h.remote.call_count(), 0);
        assert!(h.health.get("legal_ai").await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_payload_lists_fields() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());

        let result = h
            .engine
            .execute(request(
                "legal_ai",
                "legal_research",
                json!({"jurisdiction": 42}),
            ))
            .await;

        assert!(!result.success);
        let error = result.error.unwrap();
        assert_eq!(error.kind, ErrorKind::InvalidPayload);
        assert!(error.message.contains("query"));
        assert!(error.message.contains("jurisdiction"));
        assert_eq!(h.remote.call_count(), 0);
    }

    #[tokio::test]
    async fn test_local_tool_never_calls_remote() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());

        let result = h
            .engine
            .execute(request(
                "fileops",
                "file_process",
                json!({"file_name": "exhibit_a.pdf"}),
            ))
            .await;

        assert!(result.success);
        assert_eq!(result.mode, Some(ExecutionMode::Local));
        assert_eq!(h.local.call_count(), 1);
        assert_eq!(h.remote.call_count(), 0);
        // Local execution leaves health untouched
        assert!(h.health.get("fileops").await.is_none());
    }

    #[tokio::test]
    async fn test_remote_success_resets_streak() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());
        h.health.record_failure("legal_ai", "earlier flake").await;

        let result = h
            .engine
            .execute(request("legal_ai", "legal_research", json!({"query": "x"})))
            .await;

        assert!(result.success);
        assert_eq!(result.mode, Some(ExecutionMode::Remote));
        assert_eq!(result.attempts, Some(1));
        assert_eq!(
            h.health.get("legal_ai").await.unwrap().consecutive_failures,
            0
        );
    }

    #[tokio::test]
    async fn test_remote_failure_increments_streak() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::failing());

        let result = h
            .engine
            .execute(request("legal_ai", "legal_research", json!({"query": "x"})))
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_ref().unwrap().kind, ErrorKind::Timeout);
        assert_eq!(result.attempts, Some(3));
        assert_eq!(
            h.health.get("legal_ai").await.unwrap().consecutive_failures,
            1
        );
    }

    #[tokio::test]
    async fn test_short_circuit_after_threshold() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::failing());

        for _ in 0..3 {
            h.engine
                .execute(request("legal_ai", "legal_research", json!({"query": "x"})))
                .await;
        }
        assert_eq!(h.remote.call_count(), 3);

        // Streak is at the threshold: no further network attempts
        let result = h
            .engine
            .execute(request("legal_ai", "legal_research", json!({"query": "x"})))
            .await;
        assert_eq!(
            result.error.as_ref().unwrap().kind,
            ErrorKind::ConnectorUnavailable
        );
        assert_eq!(h.remote.call_count(), 3);

        // A recovery (e.g. from a probe) reopens the path
        h.health.record_success("legal_ai").await;
        h.engine
            .execute(request("legal_ai", "legal_research", json!({"query": "x"})))
            .await;
        assert_eq!(h.remote.call_count(), 4);
    }

    #[tokio::test]
    async fn test_every_outcome_recorded_in_activity() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());

        h.engine
            .execute(request("fileops", "file_process", json!({"file_name": "a"})))
            .await;
        h.engine.execute(request("ghost", "x", json!({}))).await;

        let recent = h.activity.recent().await;
        assert_eq!(recent.len(), 2);
        // Newest first
        assert_eq!(recent[0].connector, "ghost");
        assert_eq!(recent[1].connector, "fileops");
    }

    #[tokio::test]
    async fn test_latency_recorded() {
        let h = harness(ScriptedExecutor::succeeding(), ScriptedExecutor::succeeding());
        let result = h
            .engine
            .execute(request("fileops", "file_process", json!({"file_name": "a"})))
            .await;
        // Latency is always present, even if sub-millisecond
        assert!(result.latency_ms < 5_000);
    }

    #[test]
    fn test_validate_payload_accepts_extra_fields() {
        let tool = Tool::new(
            "t",
            "test",
            vec![crate::registry::FieldSpec::required(
                "query",
                crate::registry::FieldType::String,
            )],
        );
        let context = json!({"query": "x", "unrelated": 1});
        assert!(validate_payload(&tool, context.as_object().unwrap()).is_ok());
    }
}
