//! Endpoint Capability
//!
//! The workflow only ever talks to a deployed contract through these traits.
//! A resolver turns an address into an endpoint handle; the handle submits
//! state-changing calls, awaits their finalization and runs read-only queries.
//!
//! ## Flow
//! 1. `EndpointResolver::resolve` checks the address and returns a handle
//! 2. `FacetEndpoint::submit` returns a `PendingOperation` (not a result)
//! 3. `FacetEndpoint::await_finalization` consumes it into a `FinalizedOutcome`
//! 4. `FacetEndpoint::query` reads the updated `ResultValue`

pub mod evm;

pub use evm::EvmResolver;

use async_trait::async_trait;
use facet_runner_types::CallSummary;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::WorkflowError;

/// A named contract function with positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct OperationCall {
    pub function: String,
    pub args: Vec<Value>,
    /// Wei sent along, decimal or 0x hex. Ignored by queries.
    pub value: String,
}

impl OperationCall {
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
            value: "0".to_string(),
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn summary(&self) -> CallSummary {
        CallSummary {
            function: self.function.clone(),
            args: self.args.clone(),
            value: self.value.clone(),
        }
    }
}

impl fmt::Display for OperationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<String> = self.args.iter().map(scalar_string).collect();
        write!(f, "{}({})", self.function, args.join(", "))
    }
}

/// A submitted state-changing call that has not finalized yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    tx_hash: String,
}

impl PendingOperation {
    pub fn new(tx_hash: impl Into<String>) -> Self {
        Self { tx_hash: tx_hash.into() }
    }

    /// Correlation identifier linking the submission to its outcome
    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }
}

/// Immutable outcome of a pending operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedOutcome {
    pub tx_hash: String,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<String>,
}

/// Scalar read back from the endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct ResultValue(Value);

impl ResultValue {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl fmt::Display for ResultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", scalar_string(&self.0))
    }
}

/// Strings print bare, everything else as JSON
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Handle to one deployed contract instance
#[async_trait]
pub trait FacetEndpoint: Send + Sync {
    /// Address this handle was resolved for
    fn address(&self) -> &str;

    /// Facet name used for reporting
    fn facet_name(&self) -> &str;

    /// Block explorer link for a submitted operation
    fn explorer_url(&self, _tx_hash: &str) -> Option<String> {
        None
    }

    /// Submit a state-changing call; confirmation is deferred
    async fn submit(&self, call: &OperationCall) -> Result<PendingOperation, WorkflowError>;

    /// Suspend until the operation finalizes
    async fn await_finalization(
        &self,
        pending: PendingOperation,
    ) -> Result<FinalizedOutcome, WorkflowError>;

    /// Run a read-only call
    async fn query(&self, call: &OperationCall) -> Result<ResultValue, WorkflowError>;
}

/// Turns an endpoint reference into a usable handle
#[async_trait]
pub trait EndpointResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Arc<dyn FacetEndpoint>, WorkflowError>;
}
