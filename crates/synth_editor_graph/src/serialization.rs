// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph documents: export to and import from JSON.
//!
//! A document maps each node key to its position, type tag, config field
//! values and, for every input port, the list of output ports feeding it:
//!
//! ```json
//! {
//!   "node0": {
//!     "diagram_position": {"x": 10.0, "y": 10.0},
//!     "type": "sinwave",
//!     "frequency": "440",
//!     "phase": []
//!   }
//! }
//! ```
//!
//! Output ports are not listed; their connections are recovered from the
//! input side.

use crate::error::{DocumentError, GraphError, Result};
use crate::graph::Graph;
use crate::node::{NodeId, TemplateLookup};
use crate::port::PortLocator;
use egui::Pos2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document keys of a node that are not config fields or input ports
pub const RESERVED_KEYS: [&str; 2] = ["diagram_position", "type"];

/// Node position as stored in a document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagramPosition {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

impl From<Pos2> for DiagramPosition {
    fn from(p: Pos2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<DiagramPosition> for Pos2 {
    fn from(p: DiagramPosition) -> Self {
        Pos2::new(p.x, p.y)
    }
}

/// One node of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// Node position
    pub diagram_position: DiagramPosition,
    /// Template tag
    #[serde(rename = "type")]
    pub node_type: String,
    /// Config field values (strings) and input port connection lists
    #[serde(flatten)]
    pub entries: IndexMap<String, Value>,
}

/// A whole graph document, keyed by node ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphDocument {
    /// Nodes in document order
    pub nodes: IndexMap<String, NodeDocument>,
}

impl GraphDocument {
    /// Parse a document from JSON
    pub fn from_json_str(json: &str) -> std::result::Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document as pretty JSON
    pub fn to_json_string(&self) -> std::result::Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Graph {
    /// Export the graph as a document
    pub fn export(&self) -> GraphDocument {
        let nodes = self
            .nodes()
            .map(|node| {
                let mut entries = IndexMap::new();
                for (field, value) in node.fields() {
                    entries.insert(field.to_string(), Value::String(value.to_string()));
                }
                for port in node.inputs() {
                    let sources: Vec<Value> = port
                        .connections()
                        .filter_map(|id| self.connection(id))
                        .map(|c| {
                            serde_json::json!({
                                "node": c.source.node.as_str(),
                                "port": c.source.port.as_str()
                            })
                        })
                        .collect();
                    entries.insert(port.id.to_string(), Value::Array(sources));
                }

                let document = NodeDocument {
                    diagram_position: node.position().into(),
                    node_type: node.node_type().to_string(),
                    entries,
                };
                (node.id().to_string(), document)
            })
            .collect();
        GraphDocument { nodes }
    }

    /// Build a new graph from a document without touching this one.
    ///
    /// Returns the graph together with the mapping from document keys to
    /// the new node IDs. The new graph continues this graph's ID sequence.
    pub fn build_from_document(
        &self,
        document: &GraphDocument,
        registry: &dyn TemplateLookup,
    ) -> Result<(Graph, IndexMap<String, NodeId>)> {
        let mut graph = self.successor();
        let mut remap: IndexMap<String, NodeId> = IndexMap::new();

        // Pass 1: nodes and field values
        for (key, node_doc) in &document.nodes {
            let template = registry
                .lookup_template(&node_doc.node_type)
                .ok_or_else(|| GraphError::UnknownTemplate(node_doc.node_type.clone()))?;
            let position = node_doc.diagram_position;
            if !(position.x.is_finite() && position.y.is_finite()) {
                return Err(DocumentError::InvalidEntry {
                    node: key.clone(),
                    key: "diagram_position".to_string(),
                    reason: "is out of range".to_string(),
                }
                .into());
            }
            let id = graph.create_node(registry, &node_doc.node_type, node_doc.diagram_position.into())?;

            for (entry, value) in &node_doc.entries {
                if template.has_field(entry) {
                    let value = field_value(value).ok_or_else(|| DocumentError::InvalidEntry {
                        node: key.clone(),
                        key: entry.clone(),
                        reason: "is not a string value".to_string(),
                    })?;
                    graph.set_config_field(&id, entry, value);
                } else if !template.has_input(entry) {
                    tracing::warn!("Ignoring unknown entry {entry:?} of node {key:?}");
                }
            }
            remap.insert(key.clone(), id);
        }

        // Pass 2: connections, from the input side
        for (key, node_doc) in &document.nodes {
            let target_node = &remap[key];
            let Some(template) = registry.lookup_template(&node_doc.node_type) else {
                continue;
            };
            for input in &template.inputs {
                let Some(value) = node_doc.entries.get(input.id.as_str()) else {
                    continue;
                };
                let references: Vec<PortLocator> =
                    serde_json::from_value(value.clone()).map_err(|e| DocumentError::InvalidEntry {
                        node: key.clone(),
                        key: input.id.to_string(),
                        reason: format!("is not a list of port references: {e}"),
                    })?;

                let target = PortLocator::new(target_node.clone(), input.id.clone());
                for reference in references {
                    let source_node = remap.get(reference.node.as_str()).ok_or_else(|| {
                        DocumentError::UnresolvedNode {
                            node: key.clone(),
                            port: input.id.to_string(),
                            reference: reference.node.to_string(),
                        }
                    })?;
                    let source = PortLocator::new(source_node.clone(), reference.port.clone());
                    let source_direction =
                        graph.port_direction(&source).ok_or_else(|| DocumentError::UnknownPort {
                            node: reference.node.to_string(),
                            port: reference.port.to_string(),
                        })?;
                    if !crate::port::compatible(source_direction, crate::port::PortDirection::Input) {
                        return Err(DocumentError::IncompatiblePorts {
                            from: PortLocator::new(reference.node.clone(), reference.port.clone()),
                            to: PortLocator::new(key.as_str(), input.id.clone()),
                        }
                        .into());
                    }
                    graph.connect(&source, &target).map_err(|e| DocumentError::InvalidEntry {
                        node: key.clone(),
                        key: input.id.to_string(),
                        reason: e.to_string(),
                    })?;
                }
            }
        }

        graph.drain_events();
        Ok((graph, remap))
    }

    /// Replace this graph with the content of a document.
    ///
    /// The document is fully rebuilt offline first; on any error this
    /// graph is left exactly as it was.
    pub fn import(&mut self, document: &GraphDocument, registry: &dyn TemplateLookup) -> Result<()> {
        let (graph, _) = self.build_from_document(document, registry)?;
        debug_assert_eq!(graph.validate(), Ok(()));
        tracing::info!(
            "Imported graph with {} node(s) and {} connection(s)",
            graph.node_count(),
            graph.connection_count()
        );
        self.replace_with(graph);
        Ok(())
    }

    /// Parse a JSON document and import it
    pub fn import_json(&mut self, json: &str, registry: &dyn TemplateLookup) -> Result<()> {
        let document = GraphDocument::from_json_str(json)?;
        self.import(&document, registry)
    }

    /// Export the graph as pretty JSON
    pub fn export_json(&self) -> std::result::Result<String, DocumentError> {
        self.export().to_json_string()
    }
}

fn field_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
