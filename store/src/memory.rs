//! In-memory fact store.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tessera_core::{Attributes, EntityId, EntityRef, Fact, Statement, TxTime};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::snapshot::Snapshot;
use crate::store::{CommitReceipt, FactStore, TxInfo};

/// One entry of the append-only log.
#[derive(Debug, Clone)]
struct Datom {
    fact: Fact,
    tx: TxTime,
    added: bool,
}

#[derive(Debug)]
struct Inner {
    /// All datoms, in transaction order.
    log: Vec<Datom>,
    /// Transaction metadata; `txs[i]` has time `i + 1`.
    txs: Vec<TxInfo>,
    current: Snapshot,
    next_entity: u64,
}

impl Inner {
    fn alloc_entity(&mut self) -> EntityId {
        let id = EntityId::new(self.next_entity);
        self.next_entity += 1;
        id
    }

    fn next_tx(&self) -> TxTime {
        TxTime::new(self.txs.len() as u64 + 1)
    }

    /// Wall-clock time for a new transaction, strictly after the previous one.
    fn next_instant(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.txs.last() {
            Some(last) if now <= last.instant => last.instant + Duration::milliseconds(1),
            _ => now,
        }
    }

    fn tx_info(&self, t: TxTime) -> Option<&TxInfo> {
        let index = t.raw().checked_sub(1)?;
        self.txs.get(index as usize)
    }
}

/// Fact store kept entirely in memory.
///
/// Committed datoms are never rewritten; historical snapshots are rebuilt
/// by replaying the log up to the requested transaction.
#[derive(Debug)]
pub struct MemoryFactStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryFactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFactStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                log: Vec::new(),
                txs: Vec::new(),
                current: Snapshot::empty(),
                next_entity: 1,
            }),
        }
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).txs.len()
    }

    /// Number of datoms in the log.
    pub fn datom_count(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).log.len()
    }
}

impl FactStore for MemoryFactStore {
    fn read(&self, at: Option<TxTime>) -> StoreResult<Snapshot> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let t = match at {
            None => return Ok(inner.current.clone()),
            Some(t) => t,
        };
        if inner.tx_info(t).is_none() {
            return Err(StoreError::UnknownTransaction { t });
        }

        let mut snapshot = Snapshot::empty();
        for datom in inner.log.iter().take_while(|datom| datom.tx <= t) {
            snapshot.replay(&datom.fact, datom.added);
        }
        snapshot.set_basis(Some(t));
        Ok(snapshot)
    }

    fn commit(&self, batch: &[Statement]) -> StoreResult<CommitReceipt> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.current.check_batch(batch)?;

        let tx = inner.next_tx();
        let mut temp_ids = HashMap::new();
        for statement in batch {
            if let Statement::Assert {
                entity: EntityRef::Temp(temp_id),
                ..
            } = statement
            {
                if !temp_ids.contains_key(temp_id) {
                    let id = inner.alloc_entity();
                    temp_ids.insert(*temp_id, id);
                }
            }
        }

        let resolve = |entity: EntityRef| match entity {
            EntityRef::Temp(temp_id) => temp_ids
                .get(&temp_id)
                .map(|id| EntityRef::Perm(*id))
                .unwrap_or(entity),
            EntityRef::Perm(_) => entity,
        };

        let mut snapshot = inner.current.clone();
        let mut annotations = Attributes::new();
        let mut datoms = Vec::new();
        for statement in batch {
            if let Statement::Annotate { attrs } = statement {
                for (attribute, value) in attrs {
                    annotations.insert(attribute.clone(), value.map_ref(resolve));
                }
                continue;
            }
            for change in snapshot.apply(statement, &resolve) {
                datoms.push(Datom {
                    fact: change.fact,
                    tx,
                    added: change.added,
                });
            }
        }
        snapshot.set_basis(Some(tx));

        let instant = inner.next_instant();
        debug!(
            tx = %tx,
            statements = batch.len(),
            datoms = datoms.len(),
            new_entities = temp_ids.len(),
            "committed batch"
        );

        inner.log.extend(datoms);
        inner.txs.push(TxInfo {
            t: tx,
            instant,
            annotations,
        });
        inner.current = snapshot.clone();

        Ok(CommitReceipt {
            tx,
            snapshot,
            temp_ids,
        })
    }

    fn history(&self, entity: EntityId) -> StoreResult<Vec<TxTime>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let subject = EntityRef::Perm(entity);
        let txs: BTreeSet<TxTime> = inner
            .log
            .iter()
            .filter(|datom| datom.fact.subject == subject)
            .map(|datom| datom.tx)
            .collect();
        if txs.is_empty() {
            return Err(StoreError::unknown_entity(entity));
        }
        Ok(txs.into_iter().collect())
    }

    fn tx_info(&self, t: TxTime) -> StoreResult<TxInfo> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .tx_info(t)
            .cloned()
            .ok_or(StoreError::UnknownTransaction { t })
    }

    fn latest(&self) -> Option<TxTime> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.txs.last().map(|info| info.t)
    }

    fn tx_at_or_before(&self, instant: DateTime<Utc>) -> Option<TxTime> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .txs
            .iter()
            .rev()
            .find(|info| info.instant <= instant)
            .map(|info| info.t)
    }
}
