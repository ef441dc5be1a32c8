//! Operation log manager
//!
//! Thread-safe storage of submitted operations and their status.

use chrono::Utc;
use dashmap::DashMap;
use facet_runner_types::OperationStatus;
use serde_json::Value;
use std::sync::Arc;

use super::types::OperationRecord;

/// Log of submitted operations
/// Uses DashMap for thread-safe concurrent access
pub struct OperationLog {
    /// Map of run id -> OperationRecord
    records: DashMap<String, OperationRecord>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Store a new operation
    pub fn record(&self, record: OperationRecord) -> String {
        let id = record.id.clone();
        log::info!(
            "[OpLog] Recording {} {} on {}",
            id, record.submit.function, record.address
        );
        self.records.insert(id.clone(), record);
        id
    }

    /// List operations sorted by created_at (most recent first)
    pub fn list_recent(&self, limit: usize) -> Vec<OperationRecord> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        records
    }

    /// Apply an update unless the record is missing or already terminal
    fn update<F>(&self, id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut OperationRecord),
    {
        match self.records.get_mut(id) {
            Some(mut record) if !record.status.is_terminal() => {
                apply(&mut *record);
                if record.status.is_terminal() {
                    record.finished_at = Some(Utc::now());
                }
                true
            }
            Some(record) => {
                log::warn!(
                    "[OpLog] Ignoring update for {}: already {}",
                    id, record.status
                );
                false
            }
            None => false,
        }
    }

    /// Mark operation as accepted by the node
    pub fn mark_pending(&self, id: &str, tx_hash: &str, explorer_url: Option<String>) -> bool {
        self.update(id, |record| {
            log::info!("[OpLog] {} pending as {}", id, tx_hash);
            record.status = OperationStatus::Pending;
            record.tx_hash = Some(tx_hash.to_string());
            record.explorer_url = explorer_url;
        })
    }

    /// Store the successful receipt; the value is read back afterwards
    pub fn mark_finalized(&self, id: &str, block_number: Option<u64>, gas_used: Option<String>) -> bool {
        self.update(id, |record| {
            log::info!("[OpLog] {} finalized in block {:?}", id, block_number);
            record.status = OperationStatus::Finalized;
            record.block_number = block_number;
            record.gas_used = gas_used;
        })
    }

    /// Mark operation as confirmed, with the value read back afterwards
    pub fn mark_confirmed(&self, id: &str, result: Value) -> bool {
        self.update(id, |record| {
            log::info!("[OpLog] {} confirmed", id);
            record.status = OperationStatus::Confirmed;
            record.result = Some(result);
        })
    }

    /// Mark operation as finalized with failure
    pub fn mark_reverted(&self, id: &str, block_number: Option<u64>, gas_used: Option<String>) -> bool {
        self.update(id, |record| {
            log::warn!("[OpLog] {} reverted", id);
            record.status = OperationStatus::Reverted;
            record.block_number = block_number;
            record.gas_used = gas_used;
            record.error = Some("Operation reverted on-chain".to_string());
        })
    }

    /// Mark operation as failed with error.
    /// A finalized operation keeps its receipt and becomes `Unread`.
    pub fn mark_failed(&self, id: &str, error: &str) -> bool {
        self.update(id, |record| {
            record.status = if record.status == OperationStatus::Finalized {
                log::warn!("[OpLog] {} finalized but read-back failed: {}", id, error);
                OperationStatus::Unread
            } else {
                log::warn!("[OpLog] {} failed: {}", id, error);
                OperationStatus::Failed
            };
            record.error = Some(error.to_string());
        })
    }
}

impl Default for OperationLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Create an Arc-wrapped OperationLog for sharing across tasks
pub fn create_operation_log() -> Arc<OperationLog> {
    Arc::new(OperationLog::new())
}
