//! Tool-level errors for the cidian worker server.
//!
//! Storage, network and validation failures arrive as `cidian_core::Error`
//! and convert on their own; these cover what only the tools can detect.

use rmcp::model::{ErrorCode, ErrorData as McpError};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., empty id list).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// A referenced vocabulary entry does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::NotFound(msg) => (-32004, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        let err: McpError = ToolError::InvalidInput("ids cannot be empty".into()).into();
        assert_eq!(err.code, ErrorCode(-32602));

        let err: McpError = ToolError::NotFound("word 9".into()).into();
        assert_eq!(err.code, ErrorCode(-32004));
        assert_eq!(err.message, "word 9");
    }
}
