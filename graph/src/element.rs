//! Vertex and edge handles.

use std::fmt;
use std::hash::{Hash, Hasher};

use tessera_core::{
    Attribute, ElementId, EntityId, EntityRef, Identity, IdentityCell, TxTime, Value, EDGE_TYPE,
    VERTEX_TYPE,
};
use tessera_store::Snapshot;

/// What kind of element a handle refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    Vertex,
    Edge {
        label: String,
        /// Tail of the edge.
        out_vertex: ElementId,
        /// Head of the edge.
        in_vertex: ElementId,
    },
}

/// A handle to a vertex or an edge.
///
/// Handles compare and hash by their external id only, so versions of the
/// same element at different times are equal.
#[derive(Debug, Clone)]
pub struct Element {
    id: ElementId,
    store_id: IdentityCell,
    snapshot: Option<TxTime>,
    kind: Kind,
}

impl Element {
    pub(crate) fn new(id: ElementId, store_id: IdentityCell, snapshot: Option<TxTime>, kind: Kind) -> Self {
        Self {
            id,
            store_id,
            snapshot,
            kind,
        }
    }

    /// Read the element stored under `entity` in `snapshot`.
    pub(crate) fn read(snapshot: &Snapshot, entity: EntityRef, at: Option<TxTime>) -> Option<Self> {
        let id = element_id_of(snapshot, entity)?;
        let kind = match snapshot.value(&entity, &Attribute::element_type())?.as_keyword()? {
            VERTEX_TYPE => Kind::Vertex,
            EDGE_TYPE => {
                let label = snapshot
                    .value(&entity, &Attribute::edge_label())
                    .and_then(Value::as_str)?
                    .to_string();
                let out_ref = snapshot
                    .value(&entity, &Attribute::edge_out_vertex())?
                    .as_entity_ref()?;
                let in_ref = snapshot
                    .value(&entity, &Attribute::edge_in_vertex())?
                    .as_entity_ref()?;
                Kind::Edge {
                    label,
                    out_vertex: element_id_of(snapshot, out_ref)?,
                    in_vertex: element_id_of(snapshot, in_ref)?,
                }
            }
            _ => return None,
        };
        let identity = match entity {
            EntityRef::Temp(temp_id) => Identity::Temporary(temp_id),
            EntityRef::Perm(entity_id) => Identity::Permanent(entity_id),
        };
        Some(Self::new(id, IdentityCell::new(identity), at, kind))
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Current store identity. Staged elements are temporary until commit.
    pub fn identity(&self) -> Identity {
        self.store_id.get()
    }

    pub fn entity_id(&self) -> Option<EntityId> {
        self.identity().permanent()
    }

    pub(crate) fn cell(&self) -> &IdentityCell {
        &self.store_id
    }

    /// The time this handle is pinned to; `None` for live handles.
    pub fn snapshot(&self) -> Option<TxTime> {
        self.snapshot
    }

    pub fn is_live(&self) -> bool {
        self.snapshot.is_none()
    }

    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self.kind, Kind::Vertex)
    }

    pub fn is_edge(&self) -> bool {
        matches!(self.kind, Kind::Edge { .. })
    }

    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            Kind::Edge { label, .. } => Some(label),
            Kind::Vertex => None,
        }
    }

    pub fn out_vertex(&self) -> Option<ElementId> {
        match &self.kind {
            Kind::Edge { out_vertex, .. } => Some(*out_vertex),
            Kind::Vertex => None,
        }
    }

    pub fn in_vertex(&self) -> Option<ElementId> {
        match &self.kind {
            Kind::Edge { in_vertex, .. } => Some(*in_vertex),
            Kind::Vertex => None,
        }
    }

    /// The same element on the live view, sharing `cell`.
    pub(crate) fn live(&self, cell: IdentityCell) -> Self {
        Self::new(self.id, cell, None, self.kind.clone())
    }
}

fn element_id_of(snapshot: &Snapshot, entity: EntityRef) -> Option<ElementId> {
    snapshot
        .value(&entity, &Attribute::element_id())?
        .as_uuid()
        .map(ElementId::from)
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Vertex => write!(f, "v[{}]", self.id),
            Kind::Edge {
                label,
                out_vertex,
                in_vertex,
            } => write!(f, "e[{}][{}-{}->{}]", self.id, out_vertex, label, in_vertex),
        }
    }
}
