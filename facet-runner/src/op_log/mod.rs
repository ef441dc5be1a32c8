//! Operation Log
//!
//! Records every state-changing operation the workflow submits and follows
//! it through its lifecycle.
//!
//! ## Flow
//! 1. `record` stores a new operation as `submitting` (returns its run id)
//! 2. `mark_pending` attaches the tx hash once the node accepted it
//! 3. `mark_finalized` stores a successful receipt, `mark_reverted` a failed one
//! 4. `mark_confirmed` stores the value read back afterwards
//! 5. `mark_failed` covers transport errors; after `mark_finalized` the record
//!    keeps its receipt and ends as `unread`

mod manager;
mod types;

pub use manager::{create_operation_log, OperationLog};
pub use types::OperationRecord;
