//! Error types for the gydnc MCP server with JSON-RPC error code mapping.

use thiserror::Error;

/// Errors that can occur in the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// A core entity/backend operation failed.
    #[error(transparent)]
    Core(#[from] gydnc_core::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protocol-level failure (transport, handshake).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The request parameters were malformed or incomplete.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Map the error to a JSON-RPC error code.
    ///
    /// Core sentinel kinds that describe a bad request (unknown entity or
    /// backend, invalid alias or filter, duplicate create, ambiguous
    /// target) surface as invalid-params so clients can correct the call;
    /// everything else is an internal error.
    #[must_use]
    pub fn error_code(&self) -> i32 {
        match self {
            Self::Core(e) => match e.kind() {
                "entity-not-found"
                | "entity-already-exists"
                | "backend-not-found"
                | "ambiguous-backend"
                | "invalid-alias"
                | "invalid-filter" => -32602,
                _ => -32603,
            },
            Self::Json(_) => -32700,
            Self::Protocol(_) => -32600,
            Self::InvalidParams(_) => -32602,
            Self::Internal(_) => -32603,
        }
    }

    /// The stable error kind, when the failure came from the core.
    #[must_use]
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::Core(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// Result type alias for MCP operations.
pub type McpResult<T> = Result<T, McpError>;
