//! Shared types describing the outcome of a facet-runner workflow run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =====================================================
// Operation Status
// =====================================================

/// Lifecycle of a submitted state-changing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Being encoded, signed and sent
    Submitting,
    /// Accepted by the node, has a tx hash, no receipt yet
    Pending,
    /// Finalized with a successful receipt, value not read back yet
    Finalized,
    /// Finalized with a successful receipt and the value read back
    Confirmed,
    /// Finalized but the receipt reports failure
    Reverted,
    /// Never finalized: transport or encoding error
    Failed,
    /// Finalized with a successful receipt but the read-back failed
    Unread,
}

impl OperationStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationStatus::Confirmed
                | OperationStatus::Reverted
                | OperationStatus::Failed
                | OperationStatus::Unread
        )
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationStatus::Submitting => write!(f, "submitting"),
            OperationStatus::Pending => write!(f, "pending"),
            OperationStatus::Finalized => write!(f, "finalized"),
            OperationStatus::Confirmed => write!(f, "confirmed"),
            OperationStatus::Reverted => write!(f, "reverted"),
            OperationStatus::Failed => write!(f, "failed"),
            OperationStatus::Unread => write!(f, "unread"),
        }
    }
}

// =====================================================
// Run Report
// =====================================================

/// A named contract call with positional arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSummary {
    pub function: String,
    pub args: Vec<Value>,
    /// Wei sent with the call, decimal string
    #[serde(default = "zero_value")]
    pub value: String,
}

fn zero_value() -> String {
    "0".to_string()
}

/// Summary of one submit/confirm/read run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub facet: String,
    pub address: String,
    pub submit: CallSummary,
    pub query: CallSummary,
    pub status: OperationStatus,
    pub tx_hash: Option<String>,
    pub explorer_url: Option<String>,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
    /// Value returned by the read-only query, only present on success
    pub result: Option<Value>,
    pub error: Option<String>,
    pub started_at: String,
    pub finished_at: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.status == OperationStatus::Confirmed && self.result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(OperationStatus::Reverted).unwrap(), json!("reverted"));
        let parsed: OperationStatus = serde_json::from_value(json!("pending")).unwrap();
        assert_eq!(parsed, OperationStatus::Pending);
        assert_eq!(OperationStatus::Unread.to_string(), "unread");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!OperationStatus::Submitting.is_terminal());
        assert!(!OperationStatus::Pending.is_terminal());
        assert!(!OperationStatus::Finalized.is_terminal());
        assert!(OperationStatus::Confirmed.is_terminal());
        assert!(OperationStatus::Reverted.is_terminal());
        assert!(OperationStatus::Failed.is_terminal());
        assert!(OperationStatus::Unread.is_terminal());
    }

    #[test]
    fn test_call_summary_value_defaults_to_zero() {
        let call: CallSummary =
            serde_json::from_value(json!({ "function": "getResult", "args": [] })).unwrap();
        assert_eq!(call.value, "0");
    }
}
