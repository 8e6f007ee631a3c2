//! Error types for the connector bridge.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Error taxonomy for connector dispatch and remote calls
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connector id is not in the registry
    #[error("Unknown connector: {0}")]
    UnknownConnector(String),

    /// Tool name is not in the connector's suite
    #[error("Unknown tool: {tool} (connector: {connector})")]
    UnknownTool { connector: String, tool: String },

    /// Request payload failed schema validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Remote call exceeded its deadline
    #[error("Remote call timed out: {0}")]
    Timeout(String),

    /// TCP-level failure reaching the remote server
    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    /// Remote responded with something that is not a valid JSON-RPC message
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Remote executed the call and reported a failure
    #[error("Remote error: {0}")]
    RemoteError(String),

    /// Short-circuited without a network attempt due to the failure streak
    #[error("Connector unavailable: {0}")]
    ConnectorUnavailable(String),

    /// Configuration error (startup-fatal)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Registry structural violation (startup-fatal)
    #[error("Registry error: {0}")]
    Registry(String),
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::UnknownConnector(_) => ErrorKind::UnknownConnector,
            BridgeError::UnknownTool { .. } => ErrorKind::UnknownTool,
            BridgeError::InvalidPayload(_) => ErrorKind::InvalidPayload,
            BridgeError::Timeout(_) => ErrorKind::Timeout,
            BridgeError::ConnectionRefused(_) => ErrorKind::ConnectionRefused,
            BridgeError::ProtocolError(_) => ErrorKind::ProtocolError,
            BridgeError::RemoteError(_) => ErrorKind::RemoteError,
            BridgeError::ConnectorUnavailable(_) => ErrorKind::ConnectorUnavailable,
            BridgeError::Config(_) => ErrorKind::Config,
            BridgeError::Registry(_) => ErrorKind::Registry,
        }
    }
}

/// Wire-visible error kind carried in `ExecuteResult` envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownConnector,
    UnknownTool,
    InvalidPayload,
    Timeout,
    ConnectionRefused,
    ProtocolError,
    RemoteError,
    ConnectorUnavailable,
    Config,
    Registry,
}

impl ErrorKind {
    /// Map the error kind to an HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorKind::UnknownConnector | ErrorKind::UnknownTool => StatusCode::NOT_FOUND,
            ErrorKind::InvalidPayload => StatusCode::BAD_REQUEST,
            ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::ConnectionRefused | ErrorKind::ProtocolError | ErrorKind::RemoteError => {
                StatusCode::BAD_GATEWAY
            }
            ErrorKind::ConnectorUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Config | ErrorKind::Registry => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Transient kinds are retried by the remote client; everything else is deterministic
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::ConnectionRefused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err = BridgeError::UnknownConnector("ghost".to_string());
        assert_eq!(err.kind(), ErrorKind::UnknownConnector);
        assert!(err.to_string().contains("ghost"));

        let err = BridgeError::UnknownTool {
            connector: "legal_ai".to_string(),
            tool: "nope".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::UnknownTool);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ErrorKind::UnknownConnector.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::UnknownTool.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::InvalidPayload.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(ErrorKind::ConnectionRefused.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorKind::ProtocolError.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ErrorKind::RemoteError.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorKind::ConnectorUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_transient_classification() {
        assert!(ErrorKind::Timeout.is_transient());
        assert!(ErrorKind::ConnectionRefused.is_transient());
        assert!(!ErrorKind::ProtocolError.is_transient());
        assert!(!ErrorKind::RemoteError.is_transient());
        assert!(!ErrorKind::InvalidPayload.is_transient());
    }
}
