//! Operation log for pending graph mutations.
//!
//! The log holds at most one live operation per element. Operations keep the
//! position of their first insertion, so merging or replacing an element's
//! operation never reorders the batch.

use std::collections::{BTreeMap, HashMap, HashSet};

use tessera_core::{Attribute, Attributes, ElementId, EntityRef, Statement, Value};
use uuid::Uuid;

use crate::error::{TransactionError, TransactionResult};

/// Key of the transaction annotation operation.
pub const TRANSACTION_KEY: ElementId = ElementId(Uuid::nil());

/// A pending operation on one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// The element is created in this transaction.
    Add {
        /// Always a `Statement::Assert` carrying the staged attributes.
        statement: Statement,
        /// Elements this add depends on; cancelling one of them cancels this add.
        touches: Vec<ElementId>,
    },
    /// Changes to an element that already exists in the store.
    Modify {
        entity: EntityRef,
        asserts: Attributes,
        retracts: Attributes,
    },
    /// Removal of an element that already exists in the store.
    Delete { statement: Statement },
    /// Attributes of the transaction itself.
    Annotate { statement: Statement },
}

impl Operation {
    /// Statements this operation contributes to the batch.
    ///
    /// A modify emits its retractions before its assertion.
    pub fn statements(&self) -> Vec<Statement> {
        match self {
            Operation::Add { statement, .. }
            | Operation::Delete { statement }
            | Operation::Annotate { statement } => vec![statement.clone()],
            Operation::Modify {
                entity,
                asserts,
                retracts,
            } => {
                let mut statements: Vec<Statement> = retracts
                    .iter()
                    .map(|(attribute, value)| {
                        Statement::retract(*entity, attribute.clone(), value.clone())
                    })
                    .collect();
                if !asserts.is_empty() {
                    statements.push(Statement::assert(*entity, asserts.clone()));
                }
                statements
            }
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, Operation::Add { .. })
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete { .. })
    }

    fn staged_attrs(&self) -> Option<&Attributes> {
        match self {
            Operation::Add {
                statement: Statement::Assert { attrs, .. },
                ..
            } => Some(attrs),
            _ => None,
        }
    }

    fn staged_attrs_mut(&mut self) -> Option<&mut Attributes> {
        match self {
            Operation::Add {
                statement: Statement::Assert { attrs, .. },
                ..
            } => Some(attrs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    seq: u64,
    op: Operation,
}

/// Ordered map of pending operations, keyed by element.
#[derive(Debug, Clone, Default)]
pub struct OperationLog {
    ops: HashMap<ElementId, Slot>,
    /// Insertion sequence -> element.
    order: BTreeMap<u64, ElementId>,
    /// Elements whose add was cancelled in this transaction.
    cancelled: HashSet<ElementId>,
    next_seq: u64,
}

impl OperationLog {
    /// Create a new empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The live operation for `id`.
    pub fn operation(&self, id: ElementId) -> Option<&Operation> {
        self.ops.get(&id).map(|slot| &slot.op)
    }

    /// Live operations in insertion order.
    pub fn operations(&self) -> impl Iterator<Item = (ElementId, &Operation)> + '_ {
        self.order
            .values()
            .filter_map(move |id| self.ops.get(id).map(|slot| (*id, &slot.op)))
    }

    /// Returns true if `id` has a live add.
    pub fn is_added(&self, id: ElementId) -> bool {
        self.operation(id).map_or(false, Operation::is_add)
    }

    /// Returns true if `id` has a pending delete.
    pub fn is_deleted(&self, id: ElementId) -> bool {
        self.operation(id).map_or(false, Operation::is_delete)
    }

    /// Returns true if the add of `id` was cancelled in this transaction.
    pub fn was_cancelled(&self, id: ElementId) -> bool {
        self.cancelled.contains(&id)
    }

    /// Record the creation of an element.
    pub fn record_add(
        &mut self,
        id: ElementId,
        statement: Statement,
        touches: Vec<ElementId>,
    ) -> TransactionResult<()> {
        if !statement.is_assert() {
            return Err(TransactionError::invalid_statement(format!(
                "an add must be an assert, got {}",
                statement
            )));
        }
        if self.ops.contains_key(&id) {
            return Err(TransactionError::invalid_statement(format!(
                "element {} already has a pending operation",
                id
            )));
        }
        self.cancelled.remove(&id);
        self.upsert(id, Operation::Add { statement, touches });
        Ok(())
    }

    /// Record a change to an element.
    ///
    /// For a live add the change is merged into the staged attributes.
    /// Otherwise it is merged into the element's standalone modify.
    pub fn record_modify(&mut self, id: ElementId, statement: Statement) -> TransactionResult<()> {
        if self.is_deleted(id) {
            return Err(TransactionError::AlreadyDeleted { element: id });
        }

        if let Some(attrs) = self.ops.get_mut(&id).and_then(|slot| slot.op.staged_attrs_mut()) {
            match statement {
                Statement::Assert { attrs: changes, .. } => attrs.extend(changes),
                Statement::Retract { attribute, .. } => {
                    attrs.remove(&attribute);
                }
                other => {
                    return Err(TransactionError::invalid_statement(format!(
                        "a modify must be an assert or a retract, got {}",
                        other
                    )))
                }
            }
            return Ok(());
        }

        let entity = match statement.entity() {
            Some(entity) if matches!(statement, Statement::Assert { .. } | Statement::Retract { .. }) => {
                entity
            }
            _ => {
                return Err(TransactionError::invalid_statement(format!(
                    "a modify must be an assert or a retract, got {}",
                    statement
                )))
            }
        };

        if !self.ops.contains_key(&id) {
            self.upsert(
                id,
                Operation::Modify {
                    entity,
                    asserts: Attributes::new(),
                    retracts: Attributes::new(),
                },
            );
        }

        if let Some(Slot {
            op: Operation::Modify {
                asserts, retracts, ..
            },
            ..
        }) = self.ops.get_mut(&id)
        {
            match statement {
                Statement::Assert { attrs, .. } => {
                    for (attribute, value) in attrs {
                        retracts.remove(&attribute);
                        asserts.insert(attribute, value);
                    }
                }
                Statement::Retract {
                    attribute, value, ..
                } => {
                    asserts.remove(&attribute);
                    retracts.insert(attribute, value);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Drop a pending standalone assert of `attribute` without recording a retraction.
    ///
    /// Returns true if an assert was withdrawn.
    pub fn withdraw_modify(&mut self, id: ElementId, attribute: &Attribute) -> bool {
        let (withdrawn, now_empty) = match self.ops.get_mut(&id) {
            Some(Slot {
                op: Operation::Modify {
                    asserts, retracts, ..
                },
                ..
            }) => {
                let withdrawn = asserts.remove(attribute).is_some();
                (withdrawn, asserts.is_empty() && retracts.is_empty())
            }
            _ => return false,
        };
        if now_empty {
            self.remove(id);
        }
        withdrawn
    }

    /// Record the removal of an element.
    ///
    /// A live add is cancelled together with every add that touches it,
    /// transitively; the cancelled ids are returned. Otherwise a delete
    /// replaces whatever operation the element had.
    pub fn record_delete(
        &mut self,
        id: ElementId,
        statement: Statement,
    ) -> TransactionResult<Vec<ElementId>> {
        if !matches!(statement, Statement::RetractEntity { .. }) {
            return Err(TransactionError::invalid_statement(format!(
                "a delete must retract an entity, got {}",
                statement
            )));
        }

        if self.is_added(id) {
            return Ok(self.cancel_cascade(id));
        }
        if self.is_deleted(id) {
            return Err(TransactionError::AlreadyDeleted { element: id });
        }

        self.upsert(id, Operation::Delete { statement });
        Ok(Vec::new())
    }

    /// Cancel the live add of `id`, leaving dependent adds in place.
    pub fn cancel(&mut self, id: ElementId) -> TransactionResult<()> {
        if !self.is_added(id) {
            return Err(TransactionError::NotInTransaction { element: id });
        }
        self.remove(id);
        self.cancelled.insert(id);
        Ok(())
    }

    /// Record transaction metadata, merging into earlier annotations.
    pub fn record_annotation(&mut self, statement: Statement) -> TransactionResult<()> {
        let attrs = match statement {
            Statement::Annotate { attrs } => attrs,
            other => {
                return Err(TransactionError::invalid_statement(format!(
                    "an annotation must annotate the transaction, got {}",
                    other
                )))
            }
        };

        match self.ops.get_mut(&TRANSACTION_KEY) {
            Some(Slot {
                op: Operation::Annotate {
                    statement: Statement::Annotate { attrs: existing },
                },
                ..
            }) => existing.extend(attrs),
            _ => self.upsert(
                TRANSACTION_KEY,
                Operation::Annotate {
                    statement: Statement::Annotate { attrs },
                },
            ),
        }
        Ok(())
    }

    /// Stage a property on a live add.
    pub fn set_property(
        &mut self,
        id: ElementId,
        attribute: Attribute,
        value: Value,
    ) -> TransactionResult<()> {
        self.staged_mut(id)?.insert(attribute, value);
        Ok(())
    }

    /// Remove a staged property from a live add, returning its value.
    pub fn remove_property(
        &mut self,
        id: ElementId,
        attribute: &Attribute,
    ) -> TransactionResult<Option<Value>> {
        Ok(self.staged_mut(id)?.remove(attribute))
    }

    pub fn get_property(&self, id: ElementId, attribute: &Attribute) -> TransactionResult<Option<&Value>> {
        Ok(self.data(id)?.get(attribute))
    }

    pub fn property_keys(&self, id: ElementId) -> TransactionResult<Vec<Attribute>> {
        Ok(self.data(id)?.keys().cloned().collect())
    }

    /// Staged attributes of a live add.
    pub fn data(&self, id: ElementId) -> TransactionResult<&Attributes> {
        match self.ops.get(&id) {
            Some(slot) => slot
                .op
                .staged_attrs()
                .ok_or(TransactionError::NotStaged { element: id }),
            None => Err(self.missing(id)),
        }
    }

    /// The deduplicated batch, in insertion order.
    pub fn batch(&self) -> Vec<Statement> {
        let mut seen = HashSet::new();
        let mut batch = Vec::new();
        for (_, op) in self.operations() {
            for statement in op.statements() {
                if seen.insert(statement.clone()) {
                    batch.push(statement);
                }
            }
        }
        batch
    }

    /// Drop every operation and cancellation record.
    pub fn flush(&mut self) {
        self.ops.clear();
        self.order.clear();
        self.cancelled.clear();
    }

    fn staged_mut(&mut self, id: ElementId) -> TransactionResult<&mut Attributes> {
        if !self.ops.contains_key(&id) {
            return Err(self.missing(id));
        }
        self.ops
            .get_mut(&id)
            .and_then(|slot| slot.op.staged_attrs_mut())
            .ok_or(TransactionError::NotStaged { element: id })
    }

    fn missing(&self, id: ElementId) -> TransactionError {
        if self.cancelled.contains(&id) {
            TransactionError::StaleOperation { element: id }
        } else {
            TransactionError::NotInTransaction { element: id }
        }
    }

    fn upsert(&mut self, id: ElementId, op: Operation) {
        match self.ops.get_mut(&id) {
            Some(slot) => slot.op = op,
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, id);
                self.ops.insert(id, Slot { seq, op });
            }
        }
    }

    fn remove(&mut self, id: ElementId) -> Option<Operation> {
        let slot = self.ops.remove(&id)?;
        self.order.remove(&slot.seq);
        Some(slot.op)
    }

    /// Touched element -> live adds touching it.
    fn touch_adjacency(&self) -> HashMap<ElementId, Vec<ElementId>> {
        let mut adjacency: HashMap<ElementId, Vec<ElementId>> = HashMap::new();
        for (id, op) in self.operations() {
            if let Operation::Add { touches, .. } = op {
                for touched in touches {
                    adjacency.entry(*touched).or_default().push(id);
                }
            }
        }
        adjacency
    }

    fn cancel_cascade(&mut self, root: ElementId) -> Vec<ElementId> {
        let mut cancelled = Vec::new();
        let mut frontier = vec![root];

        while !frontier.is_empty() {
            let adjacency = self.touch_adjacency();
            let mut next = Vec::new();
            for id in frontier {
                if !self.is_added(id) {
                    continue;
                }
                self.remove(id);
                self.cancelled.insert(id);
                cancelled.push(id);
                if let Some(dependents) = adjacency.get(&id) {
                    next.extend(dependents.iter().copied());
                }
            }
            frontier = next;
        }

        cancelled
    }
}
