//! Tessera Transaction
//!
//! Per-transaction bookkeeping between the graph API and the fact store.
//!
//! Responsibilities:
//! - Record pending operations keyed by element (operation log)
//! - Merge same-element mutations and cancel contradictory ones
//! - Cascade cancellation to operations that depend on a cancelled add
//! - Produce one deduplicated, ordered batch for commit
//! - Rewrite temporary identities to permanent ones after commit

mod error;
mod oplog;
mod resolver;

pub use error::{TransactionError, TransactionResult};
pub use oplog::{Operation, OperationLog, TRANSACTION_KEY};
pub use resolver::IdResolver;
