//! Test fixtures.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tessera_core::{EntityId, Statement, TxTime};
use tessera_graph::Graph;
use tessera_store::{CommitReceipt, FactStore, MemoryFactStore, Snapshot, StoreError, StoreResult, TxInfo};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Install a subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A graph over a fresh in-memory store.
pub fn memory_graph() -> Graph<MemoryFactStore> {
    init_tracing();
    Graph::new(MemoryFactStore::new())
}

/// Wraps a store and rejects the next commit once armed.
#[derive(Debug, Default)]
pub struct FailingStore<S> {
    inner: S,
    fail_next: AtomicBool,
}

impl<S: FactStore> FailingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_next: AtomicBool::new(false),
        }
    }

    /// Make the next commit fail.
    pub fn fail_next_commit(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: FactStore> FactStore for FailingStore<S> {
    fn read(&self, at: Option<TxTime>) -> StoreResult<Snapshot> {
        self.inner.read(at)
    }

    fn commit(&self, batch: &[Statement]) -> StoreResult<CommitReceipt> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            debug!(statements = batch.len(), "rejecting commit");
            return Err(StoreError::unavailable("injected failure"));
        }
        self.inner.commit(batch)
    }

    fn history(&self, entity: EntityId) -> StoreResult<Vec<TxTime>> {
        self.inner.history(entity)
    }

    fn tx_info(&self, t: TxTime) -> StoreResult<TxInfo> {
        self.inner.tx_info(t)
    }

    fn latest(&self) -> Option<TxTime> {
        self.inner.latest()
    }

    fn tx_at_or_before(&self, instant: DateTime<Utc>) -> Option<TxTime> {
        self.inner.tx_at_or_before(instant)
    }
}

/// Wraps a store and returns receipts without temporary id assignments.
#[derive(Debug, Default)]
pub struct LossyStore<S> {
    inner: S,
}

impl<S: FactStore> LossyStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: FactStore> FactStore for LossyStore<S> {
    fn read(&self, at: Option<TxTime>) -> StoreResult<Snapshot> {
        self.inner.read(at)
    }

    fn commit(&self, batch: &[Statement]) -> StoreResult<CommitReceipt> {
        let mut receipt = self.inner.commit(batch)?;
        receipt.temp_ids.clear();
        Ok(receipt)
    }

    fn history(&self, entity: EntityId) -> StoreResult<Vec<TxTime>> {
        self.inner.history(entity)
    }

    fn tx_info(&self, t: TxTime) -> StoreResult<TxInfo> {
        self.inner.tx_info(t)
    }

    fn latest(&self) -> Option<TxTime> {
        self.inner.latest()
    }

    fn tx_at_or_before(&self, instant: DateTime<Utc>) -> Option<TxTime> {
        self.inner.tx_at_or_before(instant)
    }
}
