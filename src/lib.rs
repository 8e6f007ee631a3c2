//! # connector-bridge
//!
//! Bridge service exposing unified connector suites to a thin mobile
//! client. Tool invocations are either simulated locally or forwarded to
//! a remote MCP server with retry, backoff, and timeout handling; a
//! background prober feeds a health snapshot consumed by the dispatcher's
//! short-circuit policy and the mobile dashboard.

pub mod config;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod http_server;
pub mod local;
pub mod registry;
pub mod remote;

pub use config::BridgeConfig;
pub use dispatch::{DispatchEngine, ExecuteRequest, ExecuteResult};
pub use error::{BridgeError, ErrorKind, Result};
pub use registry::ConnectorRegistry;
