//! Identity types for Tessera elements and store entities.
//!
//! Two identity spaces coexist:
//! - `ElementId` is the stable external identity of a vertex or edge. It is
//!   assigned when the element is created and never changes.
//! - `EntityId` / `TempId` are store-local. A freshly added element carries a
//!   `TempId` until its batch commits and the store assigns an `EntityId`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

/// Stable external identifier of a graph element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub Uuid);

impl ElementId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ElementId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permanent identifier of an entity, assigned by the fact store at commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new EntityId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Temporary identifier, valid only inside the batch that introduces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TempId(pub u64);

impl TempId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tmp{}", self.0)
    }
}

/// Transaction time: the basis of one committed transaction.
///
/// Transaction times are strictly increasing in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxTime(pub u64);

impl TxTime {
    pub fn new(t: u64) -> Self {
        Self(t)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TxTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx{}", self.0)
    }
}

/// Reference to an entity inside a statement or fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityRef {
    /// An entity introduced by the current batch.
    Temp(TempId),
    /// An entity already known to the store.
    Perm(EntityId),
}

impl EntityRef {
    /// Returns true if this refers to a batch-local entity.
    pub fn is_temp(&self) -> bool {
        matches!(self, EntityRef::Temp(_))
    }

    /// Get as a TempId if this is a temporary reference.
    pub fn as_temp(&self) -> Option<TempId> {
        match self {
            EntityRef::Temp(id) => Some(*id),
            EntityRef::Perm(_) => None,
        }
    }

    /// Get as an EntityId if this is a permanent reference.
    pub fn as_perm(&self) -> Option<EntityId> {
        match self {
            EntityRef::Temp(_) => None,
            EntityRef::Perm(id) => Some(*id),
        }
    }
}

impl From<EntityId> for EntityRef {
    fn from(id: EntityId) -> Self {
        EntityRef::Perm(id)
    }
}

impl From<TempId> for EntityRef {
    fn from(id: TempId) -> Self {
        EntityRef::Temp(id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Temp(id) => write!(f, "{}", id),
            EntityRef::Perm(id) => write!(f, "{}", id),
        }
    }
}

/// Store-local identity of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// Staged in an uncommitted add.
    Temporary(TempId),
    /// Durable in the fact store.
    Permanent(EntityId),
}

impl Identity {
    pub fn is_temporary(&self) -> bool {
        matches!(self, Identity::Temporary(_))
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Identity::Permanent(_))
    }

    /// Get the permanent id, if resolved.
    pub fn permanent(&self) -> Option<EntityId> {
        match self {
            Identity::Temporary(_) => None,
            Identity::Permanent(id) => Some(*id),
        }
    }

    /// The reference to use for this identity inside a statement.
    pub fn entity_ref(&self) -> EntityRef {
        match self {
            Identity::Temporary(id) => EntityRef::Temp(*id),
            Identity::Permanent(id) => EntityRef::Perm(*id),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entity_ref())
    }
}

/// Shared identity slot that can be rewritten in place.
///
/// Every clone observes the same identity, so rewriting a tracked cell at
/// commit updates all handles of that element.
#[derive(Debug, Clone)]
pub struct IdentityCell(Arc<RwLock<Identity>>);

impl IdentityCell {
    pub fn new(identity: Identity) -> Self {
        Self(Arc::new(RwLock::new(identity)))
    }

    /// Read the current identity.
    pub fn get(&self) -> Identity {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the identity.
    pub fn set(&self, identity: Identity) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = identity;
    }

    /// Returns true if both cells are the same slot.
    pub fn shares_slot(&self, other: &IdentityCell) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
