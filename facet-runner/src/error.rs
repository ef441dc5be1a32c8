use std::fmt;

/// Failure of a workflow run or of its setup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The endpoint could not be reached, or an invocation itself raised
    Transport(String),
    /// The submitted operation finalized but reported failure
    OperationFailed {
        /// Correlation identifier (tx hash) of the failed operation
        tx_hash: String,
    },
    /// Startup configuration is missing or invalid
    Config(String),
}

impl WorkflowError {
    pub fn transport(message: impl Into<String>) -> Self {
        WorkflowError::Transport(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        WorkflowError::Config(message.into())
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::Transport(message) => write!(f, "transport error: {}", message),
            WorkflowError::OperationFailed { tx_hash } => {
                write!(f, "operation failed: {}", tx_hash)
            }
            WorkflowError::Config(message) => write!(f, "configuration error: {}", message),
        }
    }
}

impl std::error::Error for WorkflowError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_failed_names_hash() {
        let err = WorkflowError::OperationFailed { tx_hash: "0xabc".to_string() };
        assert_eq!(err.to_string(), "operation failed: 0xabc");
    }

    #[test]
    fn test_constructors() {
        assert_eq!(
            WorkflowError::transport("connection refused").to_string(),
            "transport error: connection refused"
        );
        assert_eq!(
            WorkflowError::config("PRIVATE_KEY must be set").to_string(),
            "configuration error: PRIVATE_KEY must be set"
        );
    }
}
