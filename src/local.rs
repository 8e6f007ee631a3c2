//! Local-stub execution for tools that are simulated in-process.

use crate::dispatch::{ExecutorFailure, ExecutorOutcome, ToolExecutor};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Produces simulated results without any network call
pub struct LocalExecutor;

#[async_trait]
impl ToolExecutor for LocalExecutor {
    async fn execute(
        &self,
        connector_id: &str,
        tool_name: &str,
        context: &Map<String, Value>,
    ) -> Result<ExecutorOutcome, ExecutorFailure> {
        debug!(connector = connector_id, tool = tool_name, "local-stub execution");

        let summary = match tool_name {
            "file_process" => {
                let file = context
                    .get("file_name")
                    .and_then(Value::as_str)
                    .unwrap_or("(unnamed)");
                format!("processed {file}")
            }
            other => format!("simulated {other}"),
        };

        Ok(ExecutorOutcome {
            value: json!({
                "tool": tool_name,
                "connector": connector_id,
                "simulated": true,
                "summary": summary,
                "received": context,
                "completed_at": Utc::now(),
            }),
            attempts: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_process_stub() {
        let executor = LocalExecutor;
        let mut context = Map::new();
        context.insert("file_name".to_string(), json!("exhibit_a.pdf"));

        let outcome = executor
            .execute("fileops", "file_process", &context)
            .await
            .unwrap();

        assert_eq!(outcome.value["simulated"], true);
        assert_eq!(outcome.value["summary"], "processed exhibit_a.pdf");
        assert_eq!(outcome.value["received"]["file_name"], "exhibit_a.pdf");
        assert!(outcome.attempts.is_none());
    }

    #[tokio::test]
    async fn test_generic_stub() {
        let executor = LocalExecutor;
        let outcome = executor
            .execute("advanced_labs", "vr_simulation", &Map::new())
            .await
            .unwrap();
        assert_eq!(outcome.value["summary"], "simulated vr_simulation");
    }
}
