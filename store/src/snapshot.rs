//! Immutable fact snapshots.
//!
//! Every attribute has cardinality one: asserting a new value for an
//! attribute replaces the previous one.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tessera_core::{
    Attribute, Attributes, EntityRef, Fact, Statement, TempId, TxTime, Value, ELEMENT_ID,
};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

/// A single fact added to or removed from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Change {
    pub fact: Fact,
    pub added: bool,
}

impl Change {
    fn added(subject: EntityRef, attribute: Attribute, value: Value) -> Self {
        Self {
            fact: Fact::new(subject, attribute, value),
            added: true,
        }
    }

    fn removed(subject: EntityRef, attribute: Attribute, value: Value) -> Self {
        Self {
            fact: Fact::new(subject, attribute, value),
            added: false,
        }
    }
}

/// The set of facts that hold at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    basis: Option<TxTime>,
    entities: BTreeMap<EntityRef, Attributes>,
    /// `graph.element/id` value -> entity.
    by_element: HashMap<Uuid, EntityRef>,
    /// Ref target -> entities holding a reference to it.
    referrers: HashMap<EntityRef, BTreeSet<EntityRef>>,
}

impl Snapshot {
    /// An empty snapshot with no basis.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The transaction this snapshot is as of. `None` before the first commit.
    pub fn basis(&self) -> Option<TxTime> {
        self.basis
    }

    pub(crate) fn set_basis(&mut self, basis: Option<TxTime>) {
        self.basis = basis;
    }

    /// Number of entities with at least one fact.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.entities.contains_key(entity)
    }

    /// All attributes of an entity.
    pub fn entity(&self, entity: &EntityRef) -> Option<&Attributes> {
        self.entities.get(entity)
    }

    pub fn value(&self, entity: &EntityRef, attribute: &Attribute) -> Option<&Value> {
        self.entities.get(entity).and_then(|attrs| attrs.get(attribute))
    }

    /// Find the entity carrying `uuid` as its element id.
    pub fn lookup(&self, uuid: Uuid) -> Option<EntityRef> {
        self.by_element.get(&uuid).copied()
    }

    /// Entities holding a reference to `entity`, in entity order.
    pub fn referrers(&self, entity: &EntityRef) -> Vec<EntityRef> {
        self.referrers
            .get(entity)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Every fact of the snapshot, ordered by subject then attribute.
    pub fn facts(&self) -> impl Iterator<Item = Fact> + '_ {
        self.entities.iter().flat_map(|(subject, attrs)| {
            attrs
                .iter()
                .map(move |(attribute, value)| Fact::new(*subject, attribute.clone(), value.clone()))
        })
    }

    /// The facts about one entity.
    pub fn facts_of(&self, entity: &EntityRef) -> Vec<Fact> {
        self.entities
            .get(entity)
            .map(|attrs| {
                attrs
                    .iter()
                    .map(|(attribute, value)| Fact::new(*entity, attribute.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Apply `batch` speculatively.
    ///
    /// The batch is validated exactly as a commit would validate it.
    /// Temporary ids are kept as-is, so entities the batch introduces are
    /// keyed by their `EntityRef::Temp` in the result.
    pub fn with(&self, batch: &[Statement]) -> StoreResult<Snapshot> {
        self.check_batch(batch)?;
        let mut next = self.clone();
        for statement in batch {
            next.apply(statement, &|entity| entity);
        }
        Ok(next)
    }

    /// Validate a batch against this snapshot as a whole.
    pub fn check_batch(&self, batch: &[Statement]) -> StoreResult<()> {
        let introduced: HashSet<TempId> = batch
            .iter()
            .filter(|statement| statement.is_assert())
            .filter_map(|statement| statement.entity().and_then(|entity| entity.as_temp()))
            .collect();

        let mut asserted: HashMap<(EntityRef, &Attribute), &Value> = HashMap::new();
        let mut asserted_entities: HashSet<EntityRef> = HashSet::new();
        let mut retracted: Vec<(EntityRef, &Attribute, &Value)> = Vec::new();
        let mut retracted_entities: HashSet<EntityRef> = HashSet::new();

        for statement in batch {
            match statement {
                Statement::Assert { entity, attrs } => {
                    self.check_ref(*entity, &introduced)?;
                    asserted_entities.insert(*entity);
                    for (attribute, value) in attrs {
                        if let Some(target) = value.as_entity_ref() {
                            self.check_ref(target, &introduced)?;
                        }
                        if let Some(previous) = asserted.insert((*entity, attribute), value) {
                            if previous != value {
                                return Err(StoreError::contradiction(
                                    *entity,
                                    Some(attribute),
                                    format!("asserted as both {} and {}", previous, value),
                                ));
                            }
                        }
                    }
                }
                Statement::Retract {
                    entity,
                    attribute,
                    value,
                } => {
                    self.check_ref(*entity, &introduced)?;
                    retracted.push((*entity, attribute, value));
                }
                Statement::RetractEntity { entity } => {
                    self.check_ref(*entity, &introduced)?;
                    retracted_entities.insert(*entity);
                }
                Statement::Annotate { attrs } => {
                    for target in attrs.values().filter_map(Value::as_entity_ref) {
                        self.check_ref(target, &introduced)?;
                    }
                }
            }
        }

        for (entity, attribute, value) in retracted {
            if asserted.get(&(entity, attribute)) == Some(&value) {
                return Err(StoreError::contradiction(
                    entity,
                    Some(attribute),
                    format!("{} is both asserted and retracted", value),
                ));
            }
        }

        if let Some(entity) = retracted_entities
            .iter()
            .find(|entity| asserted_entities.contains(*entity))
        {
            return Err(StoreError::contradiction(
                *entity,
                None,
                "entity is both asserted and retracted",
            ));
        }

        for ((entity, attribute), value) in &asserted {
            if let Some(target) = value.as_entity_ref() {
                if retracted_entities.contains(&target) {
                    return Err(StoreError::contradiction(
                        *entity,
                        Some(*attribute),
                        format!("references retracted entity {}", target),
                    ));
                }
            }
        }

        Ok(())
    }

    fn check_ref(&self, entity: EntityRef, introduced: &HashSet<TempId>) -> StoreResult<()> {
        match entity {
            EntityRef::Temp(temp_id) if !introduced.contains(&temp_id) => {
                Err(StoreError::UnresolvedTempId { temp_id })
            }
            EntityRef::Temp(_) => Ok(()),
            EntityRef::Perm(_) if self.contains(&entity) => Ok(()),
            EntityRef::Perm(_) => Err(StoreError::unknown_entity(entity)),
        }
    }

    /// Apply one validated statement, rewriting entity references through `resolve`.
    pub(crate) fn apply(
        &mut self,
        statement: &Statement,
        resolve: &dyn Fn(EntityRef) -> EntityRef,
    ) -> Vec<Change> {
        match statement {
            Statement::Assert { entity, attrs } => {
                let subject = resolve(*entity);
                attrs
                    .iter()
                    .flat_map(|(attribute, value)| {
                        self.assert_fact(subject, attribute.clone(), value.map_ref(resolve))
                    })
                    .collect::<Vec<_>>()
            }
            Statement::Retract {
                entity,
                attribute,
                value,
            } => self
                .retract_fact(resolve(*entity), attribute, &value.map_ref(resolve))
                .into_iter()
                .collect(),
            Statement::RetractEntity { entity } => self.retract_entity(resolve(*entity)),
            Statement::Annotate { .. } => Vec::new(),
        }
    }

    /// Replay one datom of the log.
    pub(crate) fn replay(&mut self, fact: &Fact, added: bool) {
        if added {
            self.assert_fact(fact.subject, fact.attribute.clone(), fact.value.clone());
        } else {
            self.retract_fact(fact.subject, &fact.attribute, &fact.value);
        }
    }

    fn assert_fact(&mut self, subject: EntityRef, attribute: Attribute, value: Value) -> Vec<Change> {
        let attrs = self.entities.entry(subject).or_default();
        if attrs.get(&attribute) == Some(&value) {
            return Vec::new();
        }

        let mut changes = Vec::with_capacity(2);
        if let Some(old) = attrs.insert(attribute.clone(), value.clone()) {
            self.unindex(subject, &attribute, &old);
            changes.push(Change::removed(subject, attribute.clone(), old));
        }
        self.index(subject, &attribute, &value);
        changes.push(Change::added(subject, attribute, value));
        changes
    }

    /// Retracting a fact that does not hold is a no-op.
    fn retract_fact(&mut self, subject: EntityRef, attribute: &Attribute, value: &Value) -> Option<Change> {
        let attrs = self.entities.get_mut(&subject)?;
        if attrs.get(attribute) != Some(value) {
            return None;
        }
        let old = attrs.remove(attribute)?;
        if attrs.is_empty() {
            self.entities.remove(&subject);
        }
        self.unindex(subject, attribute, &old);
        Some(Change::removed(subject, attribute.clone(), old))
    }

    fn retract_entity(&mut self, subject: EntityRef) -> Vec<Change> {
        let mut changes = Vec::new();

        for referrer in self.referrers(&subject) {
            let pointing: Vec<(Attribute, Value)> = self
                .entities
                .get(&referrer)
                .map(|attrs| {
                    attrs
                        .iter()
                        .filter(|(_, value)| value.as_entity_ref() == Some(subject))
                        .map(|(attribute, value)| (attribute.clone(), value.clone()))
                        .collect()
                })
                .unwrap_or_default();
            for (attribute, value) in pointing {
                changes.extend(self.retract_fact(referrer, &attribute, &value));
            }
        }

        for fact in self.facts_of(&subject) {
            changes.extend(self.retract_fact(subject, &fact.attribute, &fact.value));
        }

        changes
    }

    fn index(&mut self, subject: EntityRef, attribute: &Attribute, value: &Value) {
        if attribute.as_str() == ELEMENT_ID {
            if let Some(uuid) = value.as_uuid() {
                self.by_element.insert(uuid, subject);
            }
        }
        if let Some(target) = value.as_entity_ref() {
            self.referrers.entry(target).or_default().insert(subject);
        }
    }

    /// Call after removing the value from `entities`.
    fn unindex(&mut self, subject: EntityRef, attribute: &Attribute, value: &Value) {
        if attribute.as_str() == ELEMENT_ID {
            if let Some(uuid) = value.as_uuid() {
                if self.by_element.get(&uuid) == Some(&subject) {
                    self.by_element.remove(&uuid);
                }
            }
        }
        if let Some(target) = value.as_entity_ref() {
            let still_refers = self
                .entities
                .get(&subject)
                .map(|attrs| attrs.values().any(|v| v.as_entity_ref() == Some(target)))
                .unwrap_or(false);
            if still_refers {
                return;
            }
            if let Some(set) = self.referrers.get_mut(&target) {
                set.remove(&subject);
                if set.is_empty() {
                    self.referrers.remove(&target);
                }
            }
        }
    }
}
