//! Tessera integration test support.
//!
//! Fixtures shared by the scenario tests under `tests/`:
//! - `init_tracing` installs a test-friendly subscriber once
//! - `FailingStore` rejects commits on demand
//! - `LossyStore` drops temporary id assignments from commit receipts

mod fixtures;

pub use fixtures::{init_tracing, memory_graph, FailingStore, LossyStore};

/// Everything a scenario test needs.
pub mod prelude {
    pub use crate::fixtures::{init_tracing, memory_graph, FailingStore, LossyStore};
    pub use tessera_core::{attrs, Attribute, ElementId, EntityRef, Fact, Identity, Statement, TxTime, Value};
    pub use tessera_graph::{
        diff, diff_elements, facts, next_version, previous_version, time_id, version_interval,
        version_sequence, DerivedGraph, Element, Graph, GraphConfig, GraphError, TimeDirection,
        TxContext, TxFilter, TxStamp, VersionInterval, WorkingSet,
    };
    pub use tessera_store::{FactStore, MemoryFactStore, StoreError, TxInfo};
    pub use tessera_transaction::TransactionError;
}
