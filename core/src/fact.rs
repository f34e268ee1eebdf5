//! Facts and the statements submitted to a fact store.

use crate::{Attribute, Attributes, EntityRef, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single `(subject, attribute, value)` triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fact {
    pub subject: EntityRef,
    pub attribute: Attribute,
    pub value: Value,
}

impl Fact {
    pub fn new(subject: impl Into<EntityRef>, attribute: Attribute, value: impl Into<Value>) -> Self {
        Self {
            subject: subject.into(),
            attribute,
            value: value.into(),
        }
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {}]", self.subject, self.attribute, self.value)
    }
}

/// One unit of a batch submitted to the fact store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statement {
    /// Assert every attribute of `attrs` on `entity`.
    Assert { entity: EntityRef, attrs: Attributes },
    /// Retract one fact.
    Retract {
        entity: EntityRef,
        attribute: Attribute,
        value: Value,
    },
    /// Retract every fact about `entity`, and every reference to it.
    RetractEntity { entity: EntityRef },
    /// Attributes of the transaction itself.
    Annotate { attrs: Attributes },
}

impl Statement {
    pub fn assert(entity: impl Into<EntityRef>, attrs: Attributes) -> Self {
        Statement::Assert {
            entity: entity.into(),
            attrs,
        }
    }

    pub fn retract(entity: impl Into<EntityRef>, attribute: Attribute, value: Value) -> Self {
        Statement::Retract {
            entity: entity.into(),
            attribute,
            value,
        }
    }

    pub fn retract_entity(entity: impl Into<EntityRef>) -> Self {
        Statement::RetractEntity {
            entity: entity.into(),
        }
    }

    pub fn annotate(attrs: Attributes) -> Self {
        Statement::Annotate { attrs }
    }

    /// The entity this statement is about. Annotations have none.
    pub fn entity(&self) -> Option<EntityRef> {
        match self {
            Statement::Assert { entity, .. }
            | Statement::Retract { entity, .. }
            | Statement::RetractEntity { entity } => Some(*entity),
            Statement::Annotate { .. } => None,
        }
    }

    /// Returns true for statements that add facts.
    pub fn is_assert(&self) -> bool {
        matches!(self, Statement::Assert { .. })
    }
}

fn write_attrs(f: &mut fmt::Formatter<'_>, attrs: &Attributes) -> fmt::Result {
    let mut first = true;
    for (attribute, value) in attrs {
        if !first {
            write!(f, ", ")?;
        }
        write!(f, "{} {}", attribute, value)?;
        first = false;
    }
    Ok(())
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assert { entity, attrs } => {
                write!(f, "{{:db/id {}", entity)?;
                if !attrs.is_empty() {
                    write!(f, ", ")?;
                    write_attrs(f, attrs)?;
                }
                write!(f, "}}")
            }
            Statement::Retract {
                entity,
                attribute,
                value,
            } => write!(f, "[:db/retract {} {} {}]", entity, attribute, value),
            Statement::RetractEntity { entity } => write!(f, "[:db/retractEntity {}]", entity),
            Statement::Annotate { attrs } => {
                write!(f, "{{:db/id :tx")?;
                if !attrs.is_empty() {
                    write!(f, ", ")?;
                    write_attrs(f, attrs)?;
                }
                write!(f, "}}")
            }
        }
    }
}
