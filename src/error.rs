//! Error types for the MongoDB MCP server

use thiserror::Error;

use crate::protocol::error_codes;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, McpError>;

/// Errors that can occur while serving tool requests
#[derive(Error, Debug)]
pub enum McpError {
    /// A query, document or update argument is not a usable JSON object
    #[error("{0}")]
    InvalidJson(String),

    /// An `_id` string that is not a valid ObjectId
    #[error("Invalid ObjectId format")]
    InvalidIdentifier,

    /// An aggregation pipeline that is not a list of stage objects
    #[error("Pipeline must be a list of aggregation stages")]
    InvalidPipeline,

    /// The store could not be reached at startup
    #[error("Failed to connect to MongoDB: {0}")]
    Connection(String),

    /// Store-level fault, including a lost connection
    #[error("Database error: {0}")]
    Database(String),

    /// `tools/call` named a tool that is not registered
    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    /// Unrecognised top-level RPC method
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// Tool arguments do not satisfy the advertised input schema
    #[error("Tool execution failed: {0}")]
    InvalidArguments(String),

    /// A tool handler failed outright (panicked) instead of returning
    #[error("Tool execution failed: {0}")]
    ToolFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl McpError {
    /// Errors a tool handler reports inside its result payload rather than as an RPC error
    pub fn is_domain_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidJson(_) | Self::InvalidIdentifier | Self::InvalidPipeline | Self::Database(_)
        )
    }

    /// JSON-RPC error code used when this error ends a request
    pub fn rpc_code(&self) -> i32 {
        match self {
            Self::ToolNotFound(_) | Self::UnknownMethod(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidArguments(_) | Self::ToolFailed(_) => error_codes::TOOL_EXECUTION_FAILED,
            _ => error_codes::SERVER_ERROR,
        }
    }
}

impl From<mongodb::error::Error> for McpError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors() {
        assert!(McpError::InvalidIdentifier.is_domain_error());
        assert!(McpError::Database("down".into()).is_domain_error());
        assert!(!McpError::ToolNotFound("x".into()).is_domain_error());
        assert!(!McpError::Internal("x".into()).is_domain_error());
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(McpError::ToolNotFound("x".into()).rpc_code(), -32601);
        assert_eq!(McpError::UnknownMethod("x".into()).rpc_code(), -32601);
        assert_eq!(McpError::InvalidArguments("x".into()).rpc_code(), -32001);
        assert_eq!(McpError::ToolFailed("x".into()).rpc_code(), -32001);
        assert_eq!(McpError::Internal("x".into()).rpc_code(), -32000);
    }

    #[test]
    fn test_messages() {
        assert_eq!(McpError::InvalidIdentifier.to_string(), "Invalid ObjectId format");
        assert_eq!(
            McpError::Database("timeout".into()).to_string(),
            "Database error: timeout"
        );
        assert_eq!(
            McpError::ToolNotFound("drop_database".into()).to_string(),
            "Tool 'drop_database' not found"
        );
    }
}
