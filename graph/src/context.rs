//! Per-transaction state and the mutation API.

use std::cell::RefCell;
use std::io::Write;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tessera_core::{
    Attribute, Attributes, ElementId, EntityId, EntityRef, Identity, IdentityCell, Statement,
    TempId, TxTime, Value, EDGE_TYPE, VERTEX_TYPE,
};
use tessera_store::{FactStore, Snapshot};
use tessera_transaction::{IdResolver, OperationLog, TransactionError};
use tracing::{debug, info, warn};

use crate::element::{Element, Kind};
use crate::error::{GraphError, GraphResult};
use crate::graph::Graph;

/// Where a mutation of an element is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationTarget {
    /// The element is added in this transaction; changes merge into its add.
    Staged,
    /// The element exists in the store under this id.
    Committed(EntityId),
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    instant: DateTime<Utc>,
    /// `None` when the instant precedes every transaction.
    t: Option<TxTime>,
}

/// One logical transaction against a [`Graph`].
///
/// Mutations are staged in an operation log and only reach the store on
/// [`commit_transaction`](TxContext::commit_transaction). Reads on live
/// handles see the staged mutations.
pub struct TxContext<'g, S: FactStore> {
    graph: &'g Graph<S>,
    oplog: OperationLog,
    resolver: IdResolver,
    next_temp: u64,
    /// Latest snapshot with the pending batch applied; dropped on every mutation.
    live: RefCell<Option<Arc<Snapshot>>>,
    checkpoint: Option<Checkpoint>,
}

impl<'g, S: FactStore> TxContext<'g, S> {
    pub(crate) fn new(graph: &'g Graph<S>) -> Self {
        Self {
            graph,
            oplog: OperationLog::new(),
            resolver: IdResolver::new(),
            next_temp: 1,
            live: RefCell::new(None),
            checkpoint: None,
        }
    }

    pub fn graph(&self) -> &'g Graph<S> {
        self.graph
    }

    pub(crate) fn store(&self) -> &'g S {
        self.graph.store()
    }

    /// Number of pending operations.
    pub fn pending_len(&self) -> usize {
        self.oplog.len()
    }

    /// The batch a commit would submit.
    pub fn batch(&self) -> Vec<Statement> {
        self.oplog.batch()
    }

    // ========== Mutations ==========

    pub fn add_vertex(&mut self) -> GraphResult<Element> {
        let id = ElementId::generate();
        let temp_id = self.alloc_temp();
        let attrs = element_attrs(id, VERTEX_TYPE);

        self.oplog
            .record_add(id, Statement::assert(temp_id, attrs), Vec::new())?;
        let cell = self.track(temp_id, id);
        Ok(Element::new(id, cell, None, Kind::Vertex))
    }

    /// Add an edge from `out_vertex` to `in_vertex`.
    ///
    /// Either endpoint may be pinned; the edge always joins the live versions.
    pub fn add_edge(
        &mut self,
        out_vertex: &Element,
        in_vertex: &Element,
        label: &str,
    ) -> GraphResult<Element> {
        for vertex in [out_vertex, in_vertex] {
            if !vertex.is_vertex() {
                return Err(GraphError::NotAVertex { id: vertex.id() });
            }
        }
        let out_ref = self.live_entity(out_vertex.id())?;
        let in_ref = self.live_entity(in_vertex.id())?;

        let id = ElementId::generate();
        let temp_id = self.alloc_temp();
        let mut attrs = element_attrs(id, EDGE_TYPE);
        attrs.insert(Attribute::edge_label(), Value::from(label));
        attrs.insert(Attribute::edge_out_vertex(), Value::Ref(out_ref));
        attrs.insert(Attribute::edge_in_vertex(), Value::Ref(in_ref));

        self.oplog.record_add(
            id,
            Statement::assert(temp_id, attrs),
            vec![out_vertex.id(), in_vertex.id()],
        )?;
        let cell = self.track(temp_id, id);
        Ok(Element::new(
            id,
            cell,
            None,
            Kind::Edge {
                label: label.to_string(),
                out_vertex: out_vertex.id(),
                in_vertex: in_vertex.id(),
            },
        ))
    }

    pub fn remove_edge(&mut self, edge: &Element) -> GraphResult<()> {
        if !edge.is_edge() {
            return Err(GraphError::element_not_found(edge.id()));
        }
        self.remove_element(edge.id())
    }

    /// Remove a vertex and every edge incident to it.
    pub fn remove_vertex(&mut self, vertex: &Element) -> GraphResult<()> {
        if !vertex.is_vertex() {
            return Err(GraphError::NotAVertex { id: vertex.id() });
        }
        if !self.oplog.is_added(vertex.id()) {
            for edge in self.incident_edges(vertex)? {
                self.remove_element(edge.id())?;
            }
        }
        self.remove_element(vertex.id())
    }

    pub fn set_property(
        &mut self,
        element: &Element,
        key: &str,
        value: impl Into<Value>,
    ) -> GraphResult<()> {
        let attribute = self.graph.config().property_attribute(key)?;
        let value = value.into();
        match self.begin_mutation(element)? {
            MutationTarget::Staged => self.oplog.set_property(element.id(), attribute, value)?,
            MutationTarget::Committed(entity) => {
                let mut attrs = Attributes::new();
                attrs.insert(attribute, value);
                self.oplog
                    .record_modify(element.id(), Statement::assert(entity, attrs))?;
            }
        }
        self.invalidate();
        Ok(())
    }

    /// Remove a property, returning the value it had on the live view.
    pub fn remove_property(&mut self, element: &Element, key: &str) -> GraphResult<Option<Value>> {
        let attribute = self.graph.config().property_attribute(key)?;
        let previous = match self.begin_mutation(element)? {
            MutationTarget::Staged => self.oplog.remove_property(element.id(), &attribute)?,
            MutationTarget::Committed(entity) => {
                let entity_ref = EntityRef::Perm(entity);
                let previous = self.live_view()?.value(&entity_ref, &attribute).cloned();
                let committed = self.store().read(None)?.value(&entity_ref, &attribute).cloned();
                match committed {
                    Some(value) => self.oplog.record_modify(
                        element.id(),
                        Statement::retract(entity, attribute, value),
                    )?,
                    None => {
                        self.oplog.withdraw_modify(element.id(), &attribute);
                    }
                }
                previous
            }
        };
        self.invalidate();
        Ok(previous)
    }

    /// Attach an attribute to the transaction itself.
    pub fn annotate(&mut self, key: &str, value: impl Into<Value>) -> GraphResult<()> {
        let mut attrs = Attributes::new();
        attrs.insert(Attribute::tx(key)?, value.into());
        self.oplog.record_annotation(Statement::annotate(attrs))?;
        Ok(())
    }

    /// Decide where a mutation of `element` is recorded.
    pub fn begin_mutation(&self, element: &Element) -> GraphResult<MutationTarget> {
        let id = element.id();
        if self.oplog.is_added(id) {
            return Ok(MutationTarget::Staged);
        }
        if self.oplog.was_cancelled(id) {
            return Err(TransactionError::StaleOperation { element: id }.into());
        }
        if self.oplog.is_deleted(id) {
            return Err(GraphError::element_not_found(id));
        }
        match self.live_view()?.lookup(id.uuid()) {
            Some(EntityRef::Perm(entity)) => Ok(MutationTarget::Committed(entity)),
            _ => Err(TransactionError::NotInTransaction { element: id }.into()),
        }
    }

    // ========== Reads ==========

    /// Property value as seen by `element`: its pinned snapshot, or the live view.
    pub fn property(&self, element: &Element, key: &str) -> GraphResult<Option<Value>> {
        let attribute = self.graph.config().property_attribute(key)?;
        if element.is_live() && self.oplog.is_added(element.id()) {
            return Ok(self.oplog.get_property(element.id(), &attribute)?.cloned());
        }
        let snapshot = self.view_of(element)?;
        let entity = visible_entity(&snapshot, element.id())?;
        Ok(snapshot.value(&entity, &attribute).cloned())
    }

    /// Property keys of `element`, sorted.
    pub fn property_keys(&self, element: &Element) -> GraphResult<Vec<String>> {
        let config = self.graph.config();
        let attributes: Vec<Attribute> = if element.is_live() && self.oplog.is_added(element.id()) {
            self.oplog.property_keys(element.id())?
        } else {
            let snapshot = self.view_of(element)?;
            let entity = visible_entity(&snapshot, element.id())?;
            snapshot
                .entity(&entity)
                .map(|attrs| attrs.keys().cloned().collect())
                .unwrap_or_default()
        };
        Ok(attributes
            .iter()
            .filter_map(|attribute| config.property_key(attribute))
            .map(str::to_string)
            .collect())
    }

    /// Returns true if the element is not visible on the live view.
    pub fn is_deleted(&self, element: &Element) -> GraphResult<bool> {
        let id = element.id();
        if self.oplog.is_deleted(id) || self.oplog.was_cancelled(id) {
            return Ok(true);
        }
        if self.oplog.is_added(id) {
            return Ok(false);
        }
        Ok(self.live_view()?.lookup(id.uuid()).is_none())
    }

    /// The element on the live view.
    ///
    /// Staged elements share the identity slot that commit rewrites.
    pub fn get_live_element(&self, id: ElementId) -> GraphResult<Option<Element>> {
        let snapshot = self.live_view()?;
        let element = snapshot
            .lookup(id.uuid())
            .and_then(|entity| Element::read(&snapshot, entity, None));
        Ok(element.map(|element| match self.resolver.cell(id) {
            Some(cell) => element.live(cell),
            None => element,
        }))
    }

    /// The element as of transaction `t`.
    pub fn get_pinned_element(&self, id: ElementId, t: TxTime) -> GraphResult<Option<Element>> {
        let snapshot = self.store().read(Some(t))?;
        Ok(snapshot
            .lookup(id.uuid())
            .and_then(|entity| Element::read(&snapshot, entity, Some(t))))
    }

    /// The element at the checkpoint if one is set, otherwise on the live view.
    pub fn get_element(&self, id: ElementId) -> GraphResult<Option<Element>> {
        match self.checkpoint {
            Some(Checkpoint { t: Some(t), .. }) => self.get_pinned_element(id, t),
            Some(Checkpoint { t: None, .. }) => Ok(None),
            None => self.get_live_element(id),
        }
    }

    /// Edges of the live view with `vertex` as an endpoint.
    pub fn incident_edges(&self, vertex: &Element) -> GraphResult<Vec<Element>> {
        let snapshot = self.live_view()?;
        let entity = visible_entity(&snapshot, vertex.id())?;
        let edges = snapshot
            .referrers(&entity)
            .into_iter()
            .filter_map(|referrer| Element::read(&snapshot, referrer, None))
            .filter(|edge| {
                edge.out_vertex() == Some(vertex.id()) || edge.in_vertex() == Some(vertex.id())
            })
            .map(|edge| match self.resolver.cell(edge.id()) {
                Some(cell) => edge.live(cell),
                None => edge,
            })
            .collect();
        Ok(edges)
    }

    // ========== Transaction lifecycle ==========

    /// Submit the pending batch.
    ///
    /// Returns the new transaction time, or `None` when nothing was pending.
    /// On failure every pending operation is discarded.
    pub fn commit_transaction(&mut self) -> GraphResult<Option<TxTime>> {
        let batch = self.oplog.batch();
        let tx_events = self.oplog.len();
        let handle: &'g Graph<S> = self.graph;
        let graph = handle.config().name.as_str();

        if batch.is_empty() {
            debug!(graph, "nothing to commit");
            self.reset();
            return Ok(None);
        }

        let receipt = match self.store().commit(&batch) {
            Ok(receipt) => receipt,
            Err(err) => {
                warn!(graph, tx_events, error = %err, "commit failed, discarding transaction");
                self.reset();
                return Err(GraphError::StoreCommitFailed(err));
            }
        };

        let resolved = self.resolver.resolve(&receipt.snapshot, &receipt.temp_ids);
        self.reset();
        let resolved = resolved?;
        info!(graph, tx = %receipt.tx, tx_events, resolved, "committed transaction");
        Ok(Some(receipt.tx))
    }

    /// Discard every pending operation. The store is not touched.
    pub fn rollback_transaction(&mut self) {
        debug!(graph = %self.graph.config().name, tx_events = self.oplog.len(), "rollback");
        self.reset();
    }

    /// Pin element lookups to the last transaction at or before `instant`.
    pub fn set_checkpoint(&mut self, instant: DateTime<Utc>) -> Option<TxTime> {
        let t = self.store().tx_at_or_before(instant);
        self.checkpoint = Some(Checkpoint { instant, t });
        t
    }

    pub fn clear_checkpoint(&mut self) {
        self.checkpoint = None;
    }

    pub fn checkpoint(&self) -> Option<DateTime<Utc>> {
        self.checkpoint.map(|checkpoint| checkpoint.instant)
    }

    /// Write the pending batch as one JSON statement per line.
    pub fn dump_pending<W: Write>(&self, writer: &mut W) -> GraphResult<usize> {
        let batch = self.oplog.batch();
        for statement in &batch {
            serde_json::to_writer(&mut *writer, statement)?;
            writeln!(writer)?;
        }
        Ok(batch.len())
    }

    // ========== Internals ==========

    /// Latest store snapshot with the pending batch applied.
    ///
    /// The cached view is rebuilt once another context commits.
    pub(crate) fn live_view(&self) -> GraphResult<Arc<Snapshot>> {
        let latest = self.store().latest();
        if let Some(snapshot) = self.live.borrow().as_ref() {
            if snapshot.basis() == latest {
                return Ok(Arc::clone(snapshot));
            }
        }
        let snapshot = Arc::new(self.store().read(None)?.with(&self.oplog.batch())?);
        *self.live.borrow_mut() = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Snapshot `element` reads from.
    pub(crate) fn view_of(&self, element: &Element) -> GraphResult<Arc<Snapshot>> {
        match element.snapshot() {
            Some(t) => Ok(Arc::new(self.store().read(Some(t))?)),
            None => self.live_view(),
        }
    }

    fn live_entity(&self, id: ElementId) -> GraphResult<EntityRef> {
        let live = self.live_view()?;
        visible_entity(&live, id)
    }

    fn remove_element(&mut self, id: ElementId) -> GraphResult<()> {
        if self.oplog.is_added(id) {
            let temp_id = self
                .resolver
                .temp_id(id)
                .ok_or_else(|| GraphError::element_not_found(id))?;
            let cancelled = self
                .oplog
                .record_delete(id, Statement::retract_entity(temp_id))?;
            for element in &cancelled {
                self.resolver.untrack(*element);
            }
            debug!(element = %id, cancelled = cancelled.len(), "cancelled staged add");
        } else {
            if self.oplog.is_deleted(id) {
                return Err(GraphError::element_not_found(id));
            }
            let entity = self.live_entity(id)?;
            self.oplog
                .record_delete(id, Statement::retract_entity(entity))?;
        }
        self.invalidate();
        Ok(())
    }

    fn alloc_temp(&mut self) -> TempId {
        let temp_id = TempId::new(self.next_temp);
        self.next_temp += 1;
        temp_id
    }

    fn track(&mut self, temp_id: TempId, id: ElementId) -> IdentityCell {
        let cell = IdentityCell::new(Identity::Temporary(temp_id));
        self.resolver.track(temp_id, id, cell.clone());
        self.invalidate();
        cell
    }

    fn invalidate(&self) {
        self.live.replace(None);
    }

    fn reset(&mut self) {
        self.oplog.flush();
        self.resolver.clear();
        self.invalidate();
    }
}

fn element_attrs(id: ElementId, element_type: &str) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert(Attribute::element_id(), Value::Uuid(id.uuid()));
    attrs.insert(Attribute::element_type(), Value::Keyword(element_type.to_string()));
    attrs
}

fn visible_entity(snapshot: &Snapshot, id: ElementId) -> GraphResult<EntityRef> {
    snapshot
        .lookup(id.uuid())
        .ok_or_else(|| GraphError::element_not_found(id))
}
