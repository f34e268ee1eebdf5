//! Attribute names and the reserved graph meta model.
//!
//! An attribute is a namespaced keyword `namespace/name`. The `graph.*`
//! namespaces are reserved for the element meta model; user properties live
//! under a configurable namespace (default `property`), and transaction
//! annotations under `tx`.

use crate::error::{CoreError, CoreResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Attribute holding the element's stable UUID.
pub const ELEMENT_ID: &str = "graph.element/id";
/// Attribute holding the element type keyword.
pub const ELEMENT_TYPE: &str = "graph.element/type";
/// Attribute holding an edge label.
pub const EDGE_LABEL: &str = "graph.edge/label";
/// Attribute referencing an edge's outgoing (tail) vertex.
pub const EDGE_OUT_VERTEX: &str = "graph.edge/outVertex";
/// Attribute referencing an edge's incoming (head) vertex.
pub const EDGE_IN_VERTEX: &str = "graph.edge/inVertex";

/// Keyword value of `graph.element/type` for vertices.
pub const VERTEX_TYPE: &str = "graph.element.type/vertex";
/// Keyword value of `graph.element/type` for edges.
pub const EDGE_TYPE: &str = "graph.element.type/edge";

/// Default namespace for user properties.
pub const DEFAULT_PROPERTY_NAMESPACE: &str = "property";
/// Namespace for transaction annotations.
pub const TX_NAMESPACE: &str = "tx";

const RESERVED_PREFIX: &str = "graph.";

fn namespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_.\-]*$").expect("namespace pattern compiles")
    })
}

/// Check that `namespace` is usable as the left side of an attribute.
pub fn validate_namespace(namespace: &str) -> CoreResult<()> {
    if namespace_pattern().is_match(namespace) {
        Ok(())
    } else {
        Err(CoreError::invalid_attribute(
            namespace,
            "namespace must start with a letter and contain only letters, digits, '_', '-' or '.'",
        ))
    }
}

/// A namespaced attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attribute(String);

impl Attribute {
    /// Build an attribute from a namespace and a name.
    pub fn new(namespace: &str, name: &str) -> CoreResult<Self> {
        validate_namespace(namespace)?;
        if name.is_empty() {
            return Err(CoreError::invalid_attribute(
                format!("{}/", namespace),
                "name must not be empty",
            ));
        }
        Ok(Self(format!("{}/{}", namespace, name)))
    }

    /// Parse a full `namespace/name` attribute.
    pub fn parse(full: &str) -> CoreResult<Self> {
        match full.split_once('/') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Err(CoreError::invalid_attribute(full, "missing '/' separator")),
        }
    }

    /// Build a reserved meta model attribute from one of the constants in this module.
    pub(crate) fn reserved(full: &'static str) -> Self {
        Self(full.to_string())
    }

    pub fn element_id() -> Self {
        Self::reserved(ELEMENT_ID)
    }

    pub fn element_type() -> Self {
        Self::reserved(ELEMENT_TYPE)
    }

    pub fn edge_label() -> Self {
        Self::reserved(EDGE_LABEL)
    }

    pub fn edge_out_vertex() -> Self {
        Self::reserved(EDGE_OUT_VERTEX)
    }

    pub fn edge_in_vertex() -> Self {
        Self::reserved(EDGE_IN_VERTEX)
    }

    /// Attribute of a transaction annotation.
    pub fn tx(name: &str) -> CoreResult<Self> {
        Self::new(TX_NAMESPACE, name)
    }

    /// The full `namespace/name` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn namespace(&self) -> &str {
        self.0.split_once('/').map(|(ns, _)| ns).unwrap_or(&self.0)
    }

    pub fn name(&self) -> &str {
        self.0.split_once('/').map(|(_, name)| name).unwrap_or("")
    }

    /// Returns true for meta model attributes.
    pub fn is_reserved(&self) -> bool {
        self.0.starts_with(RESERVED_PREFIX)
    }

    /// The user property name if this attribute lives in `namespace`.
    pub fn property_name(&self, namespace: &str) -> Option<&str> {
        if self.namespace() == namespace {
            Some(self.name())
        } else {
            None
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ":{}", self.0)
    }
}
