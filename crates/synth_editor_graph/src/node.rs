// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node templates and node instances.

use crate::config::NodeLayout;
use crate::error::TemplateError;
use crate::port::{Port, PortDirection, PortId};
use crate::serialization::RESERVED_KEYS;
use egui::{Pos2, Vec2};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Unique identifier for a node (`"node<n>"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Create a node ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub(crate) fn from_counter(n: u64) -> Self {
        Self(format!("node{n}"))
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Port declared by a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortTemplate {
    /// Port ID
    pub id: PortId,
    /// Display name
    pub name: String,
}

/// Config field declared by a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTemplate {
    /// Field ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Initial value of new instances
    pub default: String,
}

/// Node type definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Unique type tag
    pub id: String,
    /// Display name
    pub name: String,
    /// Input ports, in display order
    #[serde(default)]
    pub inputs: Vec<PortTemplate>,
    /// Output ports, in display order
    #[serde(default)]
    pub outputs: Vec<PortTemplate>,
    /// Configurable fields, in display order
    #[serde(default)]
    pub config_fields: Vec<FieldTemplate>,
}

impl NodeTemplate {
    /// Create a template with no ports or fields
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            config_fields: Vec::new(),
        }
    }

    /// Add an input port
    pub fn with_input(mut self, id: &str, name: &str) -> Self {
        self.inputs.push(PortTemplate {
            id: PortId::new(id),
            name: name.to_string(),
        });
        self
    }

    /// Add an output port
    pub fn with_output(mut self, id: &str, name: &str) -> Self {
        self.outputs.push(PortTemplate {
            id: PortId::new(id),
            name: name.to_string(),
        });
        self
    }

    /// Add a config field
    pub fn with_field(mut self, id: &str, name: &str, default: impl fmt::Display) -> Self {
        self.config_fields.push(FieldTemplate {
            id: id.to_string(),
            name: name.to_string(),
            default: default.to_string(),
        });
        self
    }

    /// Check that the template can round-trip through a graph document.
    ///
    /// Config fields and input ports share the document's key space with
    /// the reserved keys, so all of them must be distinct. Port IDs must be
    /// unique within the node.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let mut keys = HashSet::new();
        let entry_keys = self
            .config_fields
            .iter()
            .map(|f| f.id.as_str())
            .chain(self.inputs.iter().map(|p| p.id.as_str()));
        for key in entry_keys {
            if RESERVED_KEYS.contains(&key) {
                return Err(TemplateError::ReservedKey {
                    template: self.id.clone(),
                    key: key.to_string(),
                });
            }
            if !keys.insert(key) {
                return Err(self.duplicate(key));
            }
        }

        let mut ports = HashSet::new();
        for port in self.inputs.iter().chain(&self.outputs) {
            if !ports.insert(port.id.as_str()) {
                return Err(self.duplicate(port.id.as_str()));
            }
        }
        Ok(())
    }

    fn duplicate(&self, key: &str) -> TemplateError {
        TemplateError::DuplicateKey {
            template: self.id.clone(),
            key: key.to_string(),
        }
    }

    /// Whether the template declares a config field
    pub fn has_field(&self, field: &str) -> bool {
        self.config_fields.iter().any(|f| f.id == field)
    }

    /// Whether the template declares an input port
    pub fn has_input(&self, port: &str) -> bool {
        self.inputs.iter().any(|p| p.id.as_str() == port)
    }

    /// Build a node instance of this type
    pub fn instantiate(&self, id: NodeId, position: Pos2, layout: &NodeLayout) -> Node {
        let ports = |templates: &[PortTemplate], direction: PortDirection| -> Vec<Port> {
            templates
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    Port::new(
                        p.id.clone(),
                        p.name.clone(),
                        direction,
                        layout.port_offset(direction, i),
                        layout.anchor_dx(direction),
                    )
                })
                .collect()
        };

        Node {
            id,
            node_type: self.id.clone(),
            name: self.name.clone(),
            position,
            size: layout.node_size(
                self.inputs.len(),
                self.outputs.len(),
                self.config_fields.len(),
            ),
            fields: self
                .config_fields
                .iter()
                .map(|f| (f.id.clone(), f.default.clone()))
                .collect(),
            inputs: ports(&self.inputs, PortDirection::Input),
            outputs: ports(&self.outputs, PortDirection::Output),
        }
    }
}

/// Read access to node templates by type tag
pub trait TemplateLookup {
    /// Find the template for a type tag
    fn lookup_template(&self, type_tag: &str) -> Option<&NodeTemplate>;
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    node_type: String,
    name: String,
    position: Pos2,
    size: Vec2,
    fields: IndexMap<String, String>,
    inputs: Vec<Port>,
    outputs: Vec<Port>,
}

impl Node {
    /// Node ID
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Type tag of the template this node was built from
    pub fn node_type(&self) -> &str {
        &self.node_type
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the node origin in graph-local coordinates
    pub fn position(&self) -> Pos2 {
        self.position
    }

    /// Body size
    pub fn size(&self) -> Vec2 {
        self.size
    }

    /// Input ports
    pub fn inputs(&self) -> &[Port] {
        &self.inputs
    }

    /// Output ports
    pub fn outputs(&self) -> &[Port] {
        &self.outputs
    }

    /// Get all ports
    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Get a port by ID
    pub fn port(&self, port_id: &PortId) -> Option<&Port> {
        self.ports().find(|p| p.id == *port_id)
    }

    pub(crate) fn port_mut(&mut self, port_id: &PortId) -> Option<&mut Port> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id == *port_id)
    }

    /// Anchor of a port in graph-local coordinates
    pub fn port_anchor(&self, port_id: &PortId) -> Option<Pos2> {
        self.port(port_id).map(|p| self.position + p.offset)
    }

    /// Current value of a config field
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Config fields and their values, in template order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn set_position(&mut self, position: Pos2) {
        self.position = position;
    }

    /// Returns false when the template declares no such field
    pub(crate) fn set_field(&mut self, field: &str, value: String) -> bool {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Registry of available node types
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    types: IndexMap<String, NodeTemplate>,
}

impl NodeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load templates from a RON list
    pub fn from_ron_str(text: &str) -> Result<Self, TemplateError> {
        let templates: Vec<NodeTemplate> = ron::from_str(text)?;
        let mut registry = Self::new();
        for template in templates {
            registry.register(template)?;
        }
        Ok(registry)
    }

    /// Register a node type, replacing any previous template with the same tag.
    ///
    /// Fails if the template's keys would collide in an exported document.
    pub fn register(&mut self, template: NodeTemplate) -> Result<(), TemplateError> {
        template.validate()?;
        self.types.insert(template.id.clone(), template);
        Ok(())
    }

    /// Get a node type by tag
    pub fn get(&self, id: &str) -> Option<&NodeTemplate> {
        self.types.get(id)
    }

    /// Get all registered types
    pub fn templates(&self) -> impl Iterator<Item = &NodeTemplate> {
        self.types.values()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl TemplateLookup for NodeRegistry {
    fn lookup_template(&self, type_tag: &str) -> Option<&NodeTemplate> {
        self.get(type_tag)
    }
}
