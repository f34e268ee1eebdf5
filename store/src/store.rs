//! The fact store contract.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_core::{Attribute, Attributes, EntityId, Statement, TempId, TxTime, Value};

use crate::error::StoreResult;
use crate::snapshot::Snapshot;

/// Outcome of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// Time of the new transaction.
    pub tx: TxTime,
    /// Snapshot right after the transaction.
    pub snapshot: Snapshot,
    /// Permanent id assigned to every temporary id the batch introduced.
    pub temp_ids: HashMap<TempId, EntityId>,
}

/// Metadata of one committed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxInfo {
    pub t: TxTime,
    pub instant: DateTime<Utc>,
    /// Attributes attached through `Statement::Annotate`.
    pub annotations: Attributes,
}

impl TxInfo {
    pub fn annotation(&self, attribute: &Attribute) -> Option<&Value> {
        self.annotations.get(attribute)
    }
}

/// An append-only, versioned store of facts.
///
/// `commit` is atomic: either every statement of the batch is applied in a
/// single new transaction, or the store is left unchanged.
pub trait FactStore: Send + Sync {
    /// Snapshot as of `at`, or the latest snapshot for `None`.
    fn read(&self, at: Option<TxTime>) -> StoreResult<Snapshot>;

    /// Apply `batch` as one transaction.
    fn commit(&self, batch: &[Statement]) -> StoreResult<CommitReceipt>;

    /// Transactions that changed facts about `entity`, oldest first.
    fn history(&self, entity: EntityId) -> StoreResult<Vec<TxTime>>;

    fn tx_info(&self, t: TxTime) -> StoreResult<TxInfo>;

    /// The most recent transaction, if any.
    fn latest(&self) -> Option<TxTime>;

    /// The last transaction committed at or before `instant`.
    fn tx_at_or_before(&self, instant: DateTime<Utc>) -> Option<TxTime>;
}

impl<S: FactStore + ?Sized> FactStore for Arc<S> {
    fn read(&self, at: Option<TxTime>) -> StoreResult<Snapshot> {
        (**self).read(at)
    }

    fn commit(&self, batch: &[Statement]) -> StoreResult<CommitReceipt> {
        (**self).commit(batch)
    }

    fn history(&self, entity: EntityId) -> StoreResult<Vec<TxTime>> {
        (**self).history(entity)
    }

    fn tx_info(&self, t: TxTime) -> StoreResult<TxInfo> {
        (**self).tx_info(t)
    }

    fn latest(&self) -> Option<TxTime> {
        (**self).latest()
    }

    fn tx_at_or_before(&self, instant: DateTime<Utc>) -> Option<TxTime> {
        (**self).tx_at_or_before(instant)
    }
}
