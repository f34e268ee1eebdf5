//! Fact-level differences between element versions.

use std::collections::BTreeSet;

use tessera_core::{Attribute, ElementId, EntityRef, Fact, TxTime, Value, VERTEX_TYPE};
use tessera_store::{FactStore, Snapshot};

use crate::context::TxContext;
use crate::element::{Element, Kind};
use crate::error::GraphResult;

/// The elements a diff is computed over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingSet {
    vertices: Vec<ElementId>,
    edges: Vec<ElementId>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertex(mut self, id: ElementId) -> Self {
        self.vertices.push(id);
        self
    }

    pub fn with_edge(mut self, id: ElementId) -> Self {
        self.edges.push(id);
        self
    }

    /// Sort `elements` into vertices and edges.
    pub fn from_elements<'a>(elements: impl IntoIterator<Item = &'a Element>) -> Self {
        elements.into_iter().fold(Self::new(), |set, element| {
            if element.is_vertex() {
                set.with_vertex(element.id())
            } else {
                set.with_edge(element.id())
            }
        })
    }

    pub fn vertices(&self) -> &[ElementId] {
        &self.vertices
    }

    pub fn edges(&self) -> &[ElementId] {
        &self.edges
    }

    fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.vertices.iter().chain(self.edges.iter()).copied()
    }
}

/// A read-only graph seeded with a fixed set of facts.
///
/// A derived graph may hold several values for one attribute of one subject
/// (for instance both sides of a changed property), so it is a plain fact set
/// rather than a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedGraph {
    facts: BTreeSet<Fact>,
}

impl DerivedGraph {
    pub fn new(facts: BTreeSet<Fact>) -> Self {
        Self { facts }
    }

    pub fn facts(&self) -> &BTreeSet<Fact> {
        &self.facts
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn contains(&self, fact: &Fact) -> bool {
        self.facts.contains(fact)
    }

    pub fn facts_about<'a>(&'a self, subject: &'a EntityRef) -> impl Iterator<Item = &'a Fact> + 'a {
        self.facts.iter().filter(move |fact| fact.subject == *subject)
    }

    /// Every value of `attribute` on `subject`.
    pub fn values(&self, subject: &EntityRef, attribute: &Attribute) -> Vec<&Value> {
        self.facts
            .iter()
            .filter(|fact| fact.subject == *subject && fact.attribute == *attribute)
            .map(|fact| &fact.value)
            .collect()
    }

    pub fn subjects(&self) -> BTreeSet<EntityRef> {
        self.facts.iter().map(|fact| fact.subject).collect()
    }

    /// Subjects typed as vertices.
    pub fn vertices(&self) -> BTreeSet<EntityRef> {
        let vertex_type = Attribute::element_type();
        self.facts
            .iter()
            .filter(|fact| {
                fact.attribute == vertex_type && fact.value.as_keyword() == Some(VERTEX_TYPE)
            })
            .map(|fact| fact.subject)
            .collect()
    }
}

/// All facts describing the version of `element`.
pub fn facts<S: FactStore>(ctx: &TxContext<'_, S>, element: &Element) -> GraphResult<BTreeSet<Fact>> {
    let snapshot = ctx.view_of(element)?;
    Ok(element_facts(&snapshot, element.id()))
}

/// Facts that differ for the working set between `t1` and `t2`.
pub fn diff<S: FactStore>(
    ctx: &TxContext<'_, S>,
    working_set: &WorkingSet,
    t1: TxTime,
    t2: TxTime,
) -> GraphResult<DerivedGraph> {
    let before = ctx.store().read(Some(t1))?;
    let after = ctx.store().read(Some(t2))?;

    let mut left = BTreeSet::new();
    let mut right = BTreeSet::new();
    for id in working_set.ids() {
        left.extend(element_facts(&before, id));
        right.extend(element_facts(&after, id));
    }
    Ok(symmetric_difference(left, right))
}

/// Facts that differ between two element versions.
pub fn diff_elements<S: FactStore>(
    ctx: &TxContext<'_, S>,
    a: &Element,
    b: &Element,
) -> GraphResult<DerivedGraph> {
    Ok(symmetric_difference(facts(ctx, a)?, facts(ctx, b)?))
}

fn symmetric_difference(left: BTreeSet<Fact>, right: BTreeSet<Fact>) -> DerivedGraph {
    DerivedGraph::new(left.symmetric_difference(&right).cloned().collect())
}

/// Own facts of an element, plus the facts that tie it to its neighbours.
///
/// A vertex includes the type, endpoint and label facts of its incident
/// edges and the type facts of their endpoints; an edge includes the type
/// facts of its endpoints. An element
/// missing from the snapshot contributes nothing.
fn element_facts(snapshot: &Snapshot, id: ElementId) -> BTreeSet<Fact> {
    let entity = match snapshot.lookup(id.uuid()) {
        Some(entity) => entity,
        None => return BTreeSet::new(),
    };
    let mut facts: BTreeSet<Fact> = snapshot.facts_of(&entity).into_iter().collect();

    let structural = [
        Attribute::element_type(),
        Attribute::edge_label(),
        Attribute::edge_out_vertex(),
        Attribute::edge_in_vertex(),
    ];
    match Element::read(snapshot, entity, snapshot.basis()).map(|element| element.kind().clone()) {
        Some(Kind::Vertex) => {
            for edge in snapshot.referrers(&entity) {
                let is_incident = [Attribute::edge_out_vertex(), Attribute::edge_in_vertex()]
                    .iter()
                    .any(|end| snapshot.value(&edge, end) == Some(&Value::Ref(entity)));
                if !is_incident {
                    continue;
                }
                for attribute in &structural {
                    if let Some(value) = snapshot.value(&edge, attribute) {
                        facts.insert(Fact::new(edge, attribute.clone(), value.clone()));
                    }
                }
                insert_endpoint_types(snapshot, edge, &mut facts);
            }
        }
        Some(Kind::Edge { .. }) => insert_endpoint_types(snapshot, entity, &mut facts),
        None => {}
    }
    facts
}

fn insert_endpoint_types(snapshot: &Snapshot, edge: EntityRef, facts: &mut BTreeSet<Fact>) {
    for end in [Attribute::edge_out_vertex(), Attribute::edge_in_vertex()] {
        let vertex = match snapshot.value(&edge, &end).and_then(Value::as_entity_ref) {
            Some(vertex) => vertex,
            None => continue,
        };
        if let Some(value) = snapshot.value(&vertex, &Attribute::element_type()) {
            facts.insert(Fact::new(vertex, Attribute::element_type(), value.clone()));
        }
    }
}
