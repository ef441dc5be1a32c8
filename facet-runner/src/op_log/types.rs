//! Operation log data types

use chrono::{DateTime, Utc};
use facet_runner_types::{CallSummary, OperationStatus, RunReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One submitted operation and what became of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Unique identifier for this run
    pub id: String,
    /// Facet the operation targets
    pub facet: String,
    /// Endpoint address
    pub address: String,
    /// State-changing call
    pub submit: CallSummary,
    /// Read-only call issued after success
    pub query: CallSummary,
    /// Current status
    pub status: OperationStatus,
    /// Correlation identifier (set once submitted)
    pub tx_hash: Option<String>,
    /// Explorer URL (set once tx_hash is known, if an explorer is configured)
    pub explorer_url: Option<String>,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
    /// Value read back after confirmation
    pub result: Option<Value>,
    /// Error message if failed or reverted
    pub error: Option<String>,
    /// When the operation was recorded
    pub created_at: DateTime<Utc>,
    /// When the operation reached a terminal status
    pub finished_at: Option<DateTime<Utc>>,
}

impl OperationRecord {
    pub fn new(facet: String, address: String, submit: CallSummary, query: CallSummary) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            facet,
            address,
            submit,
            query,
            status: OperationStatus::Submitting,
            tx_hash: None,
            explorer_url: None,
            block_number: None,
            gas_used: None,
            result: None,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn to_report(&self) -> RunReport {
        RunReport {
            run_id: self.id.clone(),
            facet: self.facet.clone(),
            address: self.address.clone(),
            submit: self.submit.clone(),
            query: self.query.clone(),
            status: self.status,
            tx_hash: self.tx_hash.clone(),
            explorer_url: self.explorer_url.clone(),
            block_number: self.block_number,
            gas_used: self.gas_used.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            started_at: self.created_at.to_rfc3339(),
            finished_at: self.finished_at.map(|t| t.to_rfc3339()),
        }
    }
}
