//! Value types for Tessera facts.
//!
//! Values are the atomic data stored in the value position of a fact.
//! Scalars, uuids, keywords and entity references.
//!
//! Facts live in ordered sets, so `Value` has a total order. Floats compare
//! by `f64::total_cmp`, which keeps `Eq`, `Ord` and `Hash` consistent.

use crate::{Attribute, EntityRef};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// A value that can be stored in a fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// Ordered by `f64::total_cmp`.
    Float(f64),
    String(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    Uuid(Uuid),
    /// Enumerated keyword such as an element type.
    Keyword(String),
    /// Reference to another entity.
    Ref(EntityRef),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        if let Value::Int(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        if let Value::Uuid(u) = self {
            Some(*u)
        } else {
            None
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        if let Value::Keyword(k) = self {
            Some(k)
        } else {
            None
        }
    }

    /// The referenced entity of a `Ref` value.
    pub fn as_entity_ref(&self) -> Option<EntityRef> {
        if let Value::Ref(r) = self {
            Some(*r)
        } else {
            None
        }
    }

    /// Rewrite an entity reference through `map`. Other values are cloned as-is.
    pub fn map_ref(&self, map: impl FnOnce(EntityRef) -> EntityRef) -> Value {
        match self {
            Value::Ref(r) => Value::Ref(map(*r)),
            other => other.clone(),
        }
    }

    /// Position of the variant in the cross-kind order.
    fn kind_rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::String(_) => 3,
            Value::Timestamp(_) => 4,
            Value::Uuid(_) => 5,
            Value::Keyword(_) => 6,
            Value::Ref(_) => 7,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Int(x), Value::Int(y)) | (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
            (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
            (Value::String(x), Value::String(y)) | (Value::Keyword(x), Value::Keyword(y)) => {
                x.cmp(y)
            }
            (Value::Uuid(x), Value::Uuid(y)) => x.cmp(y),
            (Value::Ref(x), Value::Ref(y)) => x.cmp(y),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            Value::Bool(x) => x.hash(state),
            Value::Int(x) | Value::Timestamp(x) => x.hash(state),
            Value::Float(x) => x.to_bits().hash(state),
            Value::String(x) | Value::Keyword(x) => x.hash(state),
            Value::Uuid(x) => x.hash(state),
            Value::Ref(x) => x.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(x) => write!(f, "{}", x),
            Value::Int(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{:?}", x),
            Value::Timestamp(x) => write!(f, "#inst {}", x),
            Value::Uuid(x) => write!(f, "#uuid \"{}\"", x),
            Value::Keyword(x) => write!(f, ":{}", x),
            Value::Ref(x) => write!(f, "{}", x),
        }
    }
}

macro_rules! value_from {
    ($($source:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value.into())
                }
            }
        )+
    };
}

value_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    f64 => Float,
    String => String,
    &str => String,
    Uuid => Uuid,
    EntityRef => Ref,
}

/// Type alias for attribute storage on one entity.
///
/// Ordered so that statements built from it serialize deterministically.
pub type Attributes = BTreeMap<Attribute, Value>;

/// Helper macro to create attribute maps from `"ns/name" => value` pairs.
///
/// Panics on a malformed attribute name; intended for tests and literals.
#[macro_export]
macro_rules! attrs {
    () => {
        std::collections::BTreeMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        {
            let mut map = $crate::Attributes::new();
            $(
                map.insert(
                    $crate::Attribute::parse($key).expect("valid attribute literal"),
                    $crate::Value::from($value),
                );
            )+
            map
        }
    };
}
