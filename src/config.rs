//! Bridge configuration: file defaults with environment overrides.

use crate::error::{BridgeError, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
    pub server: ServerConfig,
    pub mcp: McpConfig,
    pub retry: RetryConfig,
    pub health: HealthConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpConfig {
    /// Base URL of the MCP server; tool calls go to `{base_url}/mcp`
    pub base_url: String,
    /// Perplexity API key passed through as the bearer token on MCP calls
    pub api_key: Option<String>,
    pub call_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthConfig {
    pub probe_interval_secs: u64,
    pub probe_timeout_secs: u64,
    /// Consecutive failures at which a connector is short-circuited
    pub unhealthy_threshold: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashboardConfig {
    /// Ring-buffer capacity of the recent-activity list
    pub activity_capacity: usize,
    pub case: CaseOverview,
}

/// Case summary shown on the mobile dashboard
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaseOverview {
    pub case_id: String,
    pub status: String,
    pub next_hearing: String,
    pub exhibits_ready: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_addr: "0.0.0.0:8080".to_string(),
                log_level: "info".to_string(),
            },
            mcp: McpConfig {
                base_url: "https://perplexity-mcp-server-production.railway.app".to_string(),
                api_key: None,
                call_timeout_secs: 30,
            },
            retry: RetryConfig {
                max_attempts: 3,
                base_delay_ms: 200,
                multiplier: 2.0,
                max_delay_ms: 5_000,
            },
            health: HealthConfig {
                probe_interval_secs: 30,
                probe_timeout_secs: 5,
                unhealthy_threshold: 3,
            },
            dashboard: DashboardConfig {
                activity_capacity: 20,
                case: CaseOverview {
                    case_id: "1FDV-23-0001009".to_string(),
                    status: "Active".to_string(),
                    next_hearing: "2025-11-08".to_string(),
                    exhibits_ready: 8,
                },
            },
        }
    }
}

impl BridgeConfig {
    /// Load configuration: defaults, then an optional config file, then environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder();

        let defaults = BridgeConfig::default();
        settings = settings.add_source(
            config::Config::try_from(&defaults)
                .map_err(|e| BridgeError::Config(e.to_string()))?,
        );

        let config_paths = ["bridge-config.toml", "config/bridge.toml"];
        for path in &config_paths {
            if std::path::Path::new(path).exists() {
                settings = settings.add_source(config::File::with_name(path));
                break;
            }
        }

        // BRIDGE__SERVER__BIND_ADDR style overrides
        settings = settings.add_source(
            config::Environment::with_prefix("BRIDGE")
                .separator("__")
                .try_parsing(true),
        );

        let config: BridgeConfig = settings
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| BridgeError::Config(e.to_string()))?;

        let mut final_config = config;

        // Direct environment variables kept for compatibility with the original bridge
        if let Ok(key) = std::env::var("PERPLEXITY_API_KEY") {
            final_config.mcp.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("MCP_SERVER_URL") {
            final_config.mcp.base_url = url;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            final_config.server.bind_addr = addr;
        } else if let Ok(port) = std::env::var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| BridgeError::Config(format!("invalid PORT value: {port}")))?;
            final_config.server.bind_addr = format!("0.0.0.0:{port}");
        }

        final_config.validate()?;
        Ok(final_config)
    }

    /// Fail fast on configuration the process cannot serve with
    pub fn validate(&self) -> Result<()> {
        if self.mcp.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(BridgeError::Config(
                "PERPLEXITY_API_KEY is required (set the env var or mcp.api_key)".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(BridgeError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.health.unhealthy_threshold == 0 {
            return Err(BridgeError::Config(
                "health.unhealthy_threshold must be at least 1".to_string(),
            ));
        }
        // A zero period would panic inside the prober's interval timer
        if self.health.probe_interval_secs == 0 {
            return Err(BridgeError::Config(
                "health.probe_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// API key wrapped for safe handling; `validate` guarantees presence at startup
    pub fn api_key(&self) -> Result<SecretString> {
        self.mcp
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| BridgeError::Config("missing API key".to_string()))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.mcp.call_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.health.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.health.probe_timeout_secs)
    }
}
