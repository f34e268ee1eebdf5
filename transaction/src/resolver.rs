//! Temporary-to-permanent identity resolution.

use std::collections::{BTreeMap, HashMap};

use tessera_core::{ElementId, EntityId, EntityRef, Identity, IdentityCell, TempId};
use tessera_store::Snapshot;
use tracing::debug;

use crate::error::{TransactionError, TransactionResult};

#[derive(Debug, Clone)]
struct Tracked {
    element: ElementId,
    cell: IdentityCell,
}

/// Tracks elements staged with a temporary identity until their batch commits.
#[derive(Debug, Clone, Default)]
pub struct IdResolver {
    tracked: BTreeMap<TempId, Tracked>,
    by_element: HashMap<ElementId, TempId>,
}

impl IdResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Register an element whose identity `cell` currently holds `temp_id`.
    pub fn track(&mut self, temp_id: TempId, element: ElementId, cell: IdentityCell) {
        if let Some(previous) = self.by_element.insert(element, temp_id) {
            self.tracked.remove(&previous);
        }
        self.tracked.insert(temp_id, Tracked { element, cell });
    }

    /// Stop tracking an element. Returns false if it was not tracked.
    pub fn untrack(&mut self, element: ElementId) -> bool {
        match self.by_element.remove(&element) {
            Some(temp_id) => self.tracked.remove(&temp_id).is_some(),
            None => false,
        }
    }

    pub fn is_tracked(&self, element: ElementId) -> bool {
        self.by_element.contains_key(&element)
    }

    /// The shared identity cell of a tracked element.
    pub fn cell(&self, element: ElementId) -> Option<IdentityCell> {
        let temp_id = self.by_element.get(&element)?;
        self.tracked.get(temp_id).map(|tracked| tracked.cell.clone())
    }

    pub fn temp_id(&self, element: ElementId) -> Option<TempId> {
        self.by_element.get(&element).copied()
    }

    /// Rewrite every tracked identity to its permanent id.
    ///
    /// Every tracked element must have an id in `temp_ids`, and `snapshot`
    /// must map the element to that same id. The first mismatch aborts with
    /// `ConsistencyViolation` before any cell is rewritten. On success the
    /// resolver is empty and the number of rewritten cells is returned.
    pub fn resolve(
        &mut self,
        snapshot: &Snapshot,
        temp_ids: &HashMap<TempId, EntityId>,
    ) -> TransactionResult<usize> {
        let mut resolved = Vec::with_capacity(self.tracked.len());
        for (temp_id, tracked) in &self.tracked {
            let entity = temp_ids.get(temp_id).copied().ok_or_else(|| {
                TransactionError::consistency_violation(
                    tracked.element,
                    *temp_id,
                    "the store assigned no permanent id",
                )
            })?;
            match snapshot.lookup(tracked.element.uuid()) {
                Some(EntityRef::Perm(found)) if found == entity => {}
                found => {
                    return Err(TransactionError::consistency_violation(
                        tracked.element,
                        *temp_id,
                        match found {
                            Some(other) => format!("expected {} in snapshot, found {}", entity, other),
                            None => format!("expected {} in snapshot, found nothing", entity),
                        },
                    ))
                }
            }
            resolved.push((tracked.cell.clone(), entity));
        }

        let count = resolved.len();
        for (cell, entity) in resolved {
            cell.set(Identity::Permanent(entity));
        }
        self.clear();
        debug!(resolved = count, "resolved temporary ids");
        Ok(count)
    }

    /// Drop all tracking without resolving.
    pub fn clear(&mut self) {
        self.tracked.clear();
        self.by_element.clear();
    }
}
