//! Tessera Store
//!
//! The fact store boundary.
//!
//! Responsibilities:
//! - Define the contract the graph layer commits batches through
//! - Validate batches as a whole (no partial application)
//! - Serve point-in-time snapshots and per-entity history
//! - Provide an in-memory reference implementation

mod error;
mod memory;
mod snapshot;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryFactStore;
pub use snapshot::Snapshot;
pub use store::{CommitReceipt, FactStore, TxInfo};
