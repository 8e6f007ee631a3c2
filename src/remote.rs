//! JSON-RPC client for forwarding tool calls to the MCP server.
//!
//! Owns retry, backoff, timeout, and error classification. Transient
//! failures (timeouts, refused connections) are retried with jittered
//! exponential backoff; deterministic failures (protocol violations,
//! remote-reported errors) are surfaced immediately.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use rand::Rng;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// JSON-RPC 2.0 Request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: i64,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// Backoff parameters for transient remote failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            multiplier: 2.0,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry (attempt numbers start at 1).
    /// Nominal delay grows exponentially, capped, then jittered by ±50%.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let nominal = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent as i32);
        let capped = nominal.min(self.max_delay.as_secs_f64());
        let jitter = rand::thread_rng().gen_range(0.5..=1.5);
        Duration::from_secs_f64(capped * jitter)
    }
}

impl From<&crate::config::RetryConfig> for RetryPolicy {
    fn from(config: &crate::config::RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            multiplier: config.multiplier,
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Successful remote result, tagged with how many attempts it took
#[derive(Debug, Clone)]
pub struct RemoteOutcome {
    pub value: Value,
    pub attempts: u32,
}

/// Final remote failure, tagged with the attempt count at exhaustion
#[derive(Debug)]
pub struct RemoteFailure {
    pub error: BridgeError,
    pub attempts: u32,
}

/// Wire client to the MCP server
pub struct RemoteCallClient {
    client: Client,
    endpoint: String,
    api_key: SecretString,
    call_timeout: Duration,
    probe_timeout: Duration,
    retry: RetryPolicy,
    next_id: AtomicI64,
}

impl RemoteCallClient {
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        call_timeout: Duration,
        probe_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/mcp", base_url.trim_end_matches('/')),
            api_key,
            call_timeout,
            probe_timeout,
            retry,
            next_id: AtomicI64::new(1),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Ok(Self::new(
            &config.mcp.base_url,
            config.api_key()?,
            config.call_timeout(),
            config.probe_timeout(),
            RetryPolicy::from(&config.retry),
        ))
    }

    /// Forward a tool call, retrying transient failures up to the attempt ceiling
    pub async fn call(
        &self,
        connector_id: &str,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> std::result::Result<RemoteOutcome, RemoteFailure> {
        let params = json!({
            "name": tool_name,
            "arguments": arguments,
        });

        let started = Instant::now();
        let mut attempt = 1;
        loop {
            match self
                .request("tools/call", Some(params.clone()), self.call_timeout)
                .await
            {
                Ok(value) => {
                    debug!(
                        connector = connector_id,
                        tool = tool_name,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "MCP call succeeded"
                    );
                    return Ok(RemoteOutcome {
                        value,
                        attempts: attempt,
                    });
                }
                Err(err) => {
                    let transient = err.kind().is_transient();
                    warn!(
                        connector = connector_id,
                        tool = tool_name,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        transient,
                        "MCP call attempt failed: {err}"
                    );
                    if !transient || attempt >= self.retry.max_attempts {
                        return Err(RemoteFailure {
                            error: err,
                            attempts: attempt,
                        });
                    }
                    sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Lightweight reachability check used by the health prober. Single
    /// attempt, short timeout, never retried.
    pub async fn probe(&self) -> Result<()> {
        self.request("tools/list", None, self.probe_timeout)
            .await
            .map(|_| ())
    }

    /// One JSON-RPC round trip with error classification
    async fn request(&self, method: &str, params: Option<Value>, timeout: Duration) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::RemoteError(format!(
                "MCP server returned HTTP {status}"
            )));
        }

        let body = response.text().await.map_err(classify_transport_error)?;
        let rpc: JsonRpcResponse = serde_json::from_str(&body)
            .map_err(|e| BridgeError::ProtocolError(format!("malformed JSON-RPC response: {e}")))?;

        if let Some(error) = rpc.error {
            return Err(BridgeError::RemoteError(format!(
                "{} (code {})",
                error.message, error.code
            )));
        }

        rpc.result
            .ok_or_else(|| BridgeError::ProtocolError("response has neither result nor error".to_string()))
    }
}

/// Classify a reqwest transport error into the bridge taxonomy
fn classify_transport_error(err: reqwest::Error) -> BridgeError {
    if err.is_timeout() {
        BridgeError::Timeout(err.to_string())
    } else if err.is_connect() {
        BridgeError::ConnectionRefused(err.to_string())
    } else {
        BridgeError::ProtocolError(err.to_string())
    }
}
