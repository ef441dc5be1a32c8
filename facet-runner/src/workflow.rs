//! Submit, confirm, read.
//!
//! A run resolves the endpoint, submits one state-changing call, suspends
//! until it finalizes and, only when it succeeded, reads the updated value
//! back with one read-only call. Failures are never retried.

use crate::endpoint::{EndpointResolver, FacetEndpoint, OperationCall, ResultValue};
use crate::error::WorkflowError;
use crate::op_log::{OperationLog, OperationRecord};

/// The two calls a run issues against one facet
#[derive(Debug, Clone)]
pub struct WorkflowPlan {
    pub facet: String,
    pub submit: OperationCall,
    pub query: OperationCall,
}

impl WorkflowPlan {
    pub fn new(facet: impl Into<String>, submit: OperationCall, query: OperationCall) -> Self {
        Self { facet: facet.into(), submit, query }
    }
}

/// Run the workflow against the endpoint at `address`.
///
/// Prints the value read back on stdout and returns it. Every run leaves
/// exactly one record in `ops`, including runs whose endpoint never resolved.
pub async fn run(
    resolver: &dyn EndpointResolver,
    address: &str,
    plan: &WorkflowPlan,
    ops: &OperationLog,
) -> Result<ResultValue, WorkflowError> {
    let id = ops.record(OperationRecord::new(
        plan.facet.clone(),
        address.to_string(),
        plan.submit.summary(),
        plan.query.summary(),
    ));

    log::info!("[workflow] Resolving endpoint {}", address);
    let result = match resolver.resolve(address).await {
        Ok(endpoint) => drive(endpoint.as_ref(), plan, ops, &id).await,
        Err(e) => Err(e),
    };
    if let Err(WorkflowError::Transport(message)) = &result {
        ops.mark_failed(&id, message);
    }
    result
}

async fn drive(
    endpoint: &dyn FacetEndpoint,
    plan: &WorkflowPlan,
    ops: &OperationLog,
    id: &str,
) -> Result<ResultValue, WorkflowError> {
    log::info!(
        "[workflow] Submitting {} to {} at {}",
        plan.submit, endpoint.facet_name(), endpoint.address()
    );
    let pending = endpoint.submit(&plan.submit).await?;
    let explorer_url = endpoint.explorer_url(pending.tx_hash());
    if let Some(url) = &explorer_url {
        log::info!("[workflow] Explorer: {}", url);
    }
    ops.mark_pending(id, pending.tx_hash(), explorer_url);

    log::info!("[workflow] Waiting for {} to finalize", pending.tx_hash());
    let outcome = endpoint.await_finalization(pending).await?;

    if !outcome.success {
        ops.mark_reverted(id, outcome.block_number, outcome.gas_used);
        log::warn!("[workflow] {} failed: {}", plan.submit, outcome.tx_hash);
        return Err(WorkflowError::OperationFailed { tx_hash: outcome.tx_hash });
    }

    ops.mark_finalized(id, outcome.block_number, outcome.gas_used);

    let value = endpoint.query(&plan.query).await?;
    ops.mark_confirmed(id, value.as_value().clone());

    println!("This is from the {}: {}", endpoint.facet_name(), value);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{FinalizedOutcome, PendingOperation};
    use async_trait::async_trait;
    use facet_runner_types::OperationStatus;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const DIAMOND: &str = "0xCd6fb07E5f11c12aa8bd16d51D8aB368d3bb4C47";

    /// In-memory calculator facet that finalizes with a scripted outcome
    struct FakeEndpoint {
        submit_error: Option<WorkflowError>,
        finalize_error: Option<WorkflowError>,
        query_error: Option<WorkflowError>,
        success: bool,
        tx_hash: String,
        query_value: serde_json::Value,
        submitted: Mutex<Vec<OperationCall>>,
        awaited: AtomicUsize,
        queried: AtomicUsize,
    }

    impl FakeEndpoint {
        fn finalizing(success: bool, tx_hash: &str) -> Self {
            Self {
                submit_error: None,
                finalize_error: None,
                query_error: None,
                success,
                tx_hash: tx_hash.to_string(),
                query_value: json!("7"),
                submitted: Mutex::new(Vec::new()),
                awaited: AtomicUsize::new(0),
                queried: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FacetEndpoint for FakeEndpoint {
        fn address(&self) -> &str {
            DIAMOND
        }

        fn facet_name(&self) -> &str {
            "CalculatorFacet"
        }

        async fn submit(&self, call: &OperationCall) -> Result<PendingOperation, WorkflowError> {
            if let Some(err) = &self.submit_error {
                return Err(err.clone());
            }
            self.submitted.lock().unwrap().push(call.clone());
            Ok(PendingOperation::new(self.tx_hash.clone()))
        }

        async fn await_finalization(
            &self,
            pending: PendingOperation,
        ) -> Result<FinalizedOutcome, WorkflowError> {
            self.awaited.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.finalize_error {
                return Err(err.clone());
            }
            Ok(FinalizedOutcome {
                tx_hash: pending.tx_hash().to_string(),
                success: self.success,
                block_number: Some(42),
                gas_used: Some("21000".to_string()),
            })
        }

        async fn query(&self, _call: &OperationCall) -> Result<ResultValue, WorkflowError> {
            self.queried.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.query_error {
                return Err(err.clone());
            }
            Ok(ResultValue::new(self.query_value.clone()))
        }
    }

    /// Knows exactly one deployed address
    struct FakeResolver {
        endpoint: Arc<FakeEndpoint>,
    }

    #[async_trait]
    impl EndpointResolver for FakeResolver {
        async fn resolve(&self, address: &str) -> Result<Arc<dyn FacetEndpoint>, WorkflowError> {
            if !address.eq_ignore_ascii_case(DIAMOND) {
                return Err(WorkflowError::transport(format!("No contract deployed at {}", address)));
            }
            let endpoint: Arc<dyn FacetEndpoint> = self.endpoint.clone();
            Ok(endpoint)
        }
    }

    fn subtract_plan() -> WorkflowPlan {
        WorkflowPlan::new(
            "CalculatorFacet",
            OperationCall::new("subtract", vec![json!(8), json!(1)]),
            OperationCall::new("getResult", vec![]),
        )
    }

    #[tokio::test]
    async fn test_success_returns_queried_value() {
        let endpoint = Arc::new(FakeEndpoint::finalizing(true, "0x01"));
        let resolver = FakeResolver { endpoint: endpoint.clone() };
        let ops = OperationLog::new();

        let value = run(&resolver, DIAMOND, &subtract_plan(), &ops).await.unwrap();

        assert_eq!(value, ResultValue::new(json!("7")));
        assert_eq!(endpoint.queried.load(Ordering::SeqCst), 1);
        assert_eq!(endpoint.awaited.load(Ordering::SeqCst), 1);
        assert_eq!(
            endpoint.submitted.lock().unwrap().as_slice(),
            &[OperationCall::new("subtract", vec![json!(8), json!(1)])]
        );

        let record = &ops.list_recent(1)[0];
        assert_eq!(record.status, OperationStatus::Confirmed);
        assert_eq!(record.tx_hash.as_deref(), Some("0x01"));
        assert_eq!(record.block_number, Some(42));
        assert_eq!(record.result, Some(json!("7")));
    }

    #[tokio::test]
    async fn test_value_is_returned_unchanged() {
        let mut fake = FakeEndpoint::finalizing(true, "0x02");
        fake.query_value = json!(["1", true]);
        let resolver = FakeResolver { endpoint: Arc::new(fake) };

        let value = run(&resolver, DIAMOND, &subtract_plan(), &OperationLog::new()).await.unwrap();
        assert_eq!(value.as_value(), &json!(["1", true]));
    }

    #[tokio::test]
    async fn test_failed_operation_skips_query() {
        let endpoint = Arc::new(FakeEndpoint::finalizing(false, "0xabc"));
        let resolver = FakeResolver { endpoint: endpoint.clone() };
        let ops = OperationLog::new();

        let err = run(&resolver, DIAMOND, &subtract_plan(), &ops).await.unwrap_err();

        assert_eq!(err, WorkflowError::OperationFailed { tx_hash: "0xabc".to_string() });
        assert_eq!(endpoint.queried.load(Ordering::SeqCst), 0);
        let record = &ops.list_recent(1)[0];
        assert_eq!(record.status, OperationStatus::Reverted);
        assert_eq!(record.block_number, Some(42));
    }

    #[tokio::test]
    async fn test_submit_error_awaits_nothing() {
        let mut fake = FakeEndpoint::finalizing(true, "0x03");
        fake.submit_error = Some(WorkflowError::transport("nonce too low"));
        let endpoint = Arc::new(fake);
        let resolver = FakeResolver { endpoint: endpoint.clone() };
        let ops = OperationLog::new();

        let err = run(&resolver, DIAMOND, &subtract_plan(), &ops).await.unwrap_err();

        assert_eq!(err, WorkflowError::transport("nonce too low"));
        assert_eq!(endpoint.awaited.load(Ordering::SeqCst), 0);
        assert_eq!(endpoint.queried.load(Ordering::SeqCst), 0);

        let record = &ops.list_recent(1)[0];
        assert_eq!(record.status, OperationStatus::Failed);
        assert!(record.tx_hash.is_none());
        assert_eq!(record.error.as_deref(), Some("nonce too low"));
    }

    #[tokio::test]
    async fn test_finalization_error_propagates_unmodified() {
        let mut fake = FakeEndpoint::finalizing(true, "0x04");
        fake.finalize_error = Some(WorkflowError::transport("connection reset"));
        let endpoint = Arc::new(fake);
        let resolver = FakeResolver { endpoint: endpoint.clone() };
        let ops = OperationLog::new();

        let err = run(&resolver, DIAMOND, &subtract_plan(), &ops).await.unwrap_err();

        assert_eq!(err, WorkflowError::transport("connection reset"));
        assert_eq!(endpoint.queried.load(Ordering::SeqCst), 0);
        let record = &ops.list_recent(1)[0];
        assert_eq!(record.status, OperationStatus::Failed);
        assert_eq!(record.tx_hash.as_deref(), Some("0x04"));
    }

    #[tokio::test]
    async fn test_unknown_address_is_transport_error() {
        let endpoint = Arc::new(FakeEndpoint::finalizing(true, "0x05"));
        let resolver = FakeResolver { endpoint: endpoint.clone() };
        let ops = OperationLog::new();

        let err = run(&resolver, "0x0000000000000000000000000000000000000001", &subtract_plan(), &ops)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Transport(_)));
        assert!(endpoint.submitted.lock().unwrap().is_empty());

        let records = ops.list_recent(10);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, OperationStatus::Failed);
        assert_eq!(records[0].facet, "CalculatorFacet");
        assert!(records[0].tx_hash.is_none());
        assert!(records[0].error.as_deref().unwrap().contains("No contract deployed"));
    }

    #[tokio::test]
    async fn test_query_error_after_success_keeps_receipt() {
        let mut fake = FakeEndpoint::finalizing(true, "0x06");
        fake.query_error = Some(WorkflowError::transport("query reset"));
        let endpoint = Arc::new(fake);
        let resolver = FakeResolver { endpoint: endpoint.clone() };
        let ops = OperationLog::new();

        let err = run(&resolver, DIAMOND, &subtract_plan(), &ops).await.unwrap_err();

        assert_eq!(err, WorkflowError::transport("query reset"));
        assert_eq!(endpoint.queried.load(Ordering::SeqCst), 1);

        let record = &ops.list_recent(1)[0];
        assert_eq!(record.status, OperationStatus::Unread);
        assert_eq!(record.tx_hash.as_deref(), Some("0x06"));
        assert_eq!(record.block_number, Some(42));
        assert_eq!(record.gas_used.as_deref(), Some("21000"));
        assert_eq!(record.error.as_deref(), Some("query reset"));
        assert!(record.result.is_none());
        assert!(!record.to_report().succeeded());
    }
}
