//! Graph configuration.

use serde::Deserialize;
use tessera_core::{validate_namespace, Attribute, DEFAULT_PROPERTY_NAMESPACE};

use crate::error::{GraphError, GraphResult};

/// Property keys that collide with element identity.
const RESERVED_KEYS: [&str; 3] = ["", "id", "label"];

fn default_name() -> String {
    "tessera".to_string()
}

fn default_property_namespace() -> String {
    DEFAULT_PROPERTY_NAMESPACE.to_string()
}

/// Settings of one graph handle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Name reported in logs.
    #[serde(default = "default_name")]
    pub name: String,
    /// Namespace user properties are stored under.
    #[serde(default = "default_property_namespace")]
    pub property_namespace: String,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            property_namespace: default_property_namespace(),
        }
    }
}

impl GraphConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> GraphResult<Self> {
        let config: GraphConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GraphResult<()> {
        if self.name.trim().is_empty() {
            return Err(GraphError::config("name must not be empty"));
        }
        if self.property_namespace.starts_with("graph.") {
            return Err(GraphError::config(format!(
                "property namespace {:?} is reserved",
                self.property_namespace
            )));
        }
        validate_namespace(&self.property_namespace)
            .map_err(|err| GraphError::config(format!("property namespace: {}", err)))
    }

    /// Store attribute of a user property key.
    pub fn property_attribute(&self, key: &str) -> GraphResult<Attribute> {
        if RESERVED_KEYS.contains(&key) || key.contains('/') {
            return Err(GraphError::invalid_property_key(key));
        }
        Ok(Attribute::new(&self.property_namespace, key)?)
    }

    /// User property key of a store attribute, if it is one.
    pub fn property_key<'a>(&self, attribute: &'a Attribute) -> Option<&'a str> {
        attribute.property_name(&self.property_namespace)
    }
}
