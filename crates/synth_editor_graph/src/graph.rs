// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.

use crate::config::NodeLayout;
use crate::connection::{Connection, ConnectionId, Endpoint};
use crate::error::{GraphError, Result};
use crate::events::GraphEvent;
use crate::node::{Node, NodeId, TemplateLookup};
use crate::port::{Port, PortDirection, PortLocator};
use egui::Pos2;
use indexmap::IndexMap;

/// A node graph.
///
/// Every committed connection is registered with both of its ports, and
/// every port lists exactly the connections that reference it. Each public
/// mutation keeps this true on return.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Nodes in creation order
    nodes: IndexMap<NodeId, Node>,
    /// Committed connections in creation order
    pub(crate) connections: IndexMap<ConnectionId, Connection>,
    /// Shared counter for node and connection IDs
    next_id: u64,
    layout: NodeLayout,
    events: Vec<GraphEvent>,
}

impl Graph {
    /// Create a new empty graph with the default node layout
    pub fn new() -> Self {
        Self::with_layout(NodeLayout::default())
    }

    /// Create a new empty graph
    pub fn with_layout(layout: NodeLayout) -> Self {
        Self {
            nodes: IndexMap::new(),
            connections: IndexMap::new(),
            next_id: 0,
            layout,
            events: Vec::new(),
        }
    }

    /// Node geometry used for new nodes
    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    pub(crate) fn next_counter(&mut self) -> u64 {
        let n = self.next_id;
        self.next_id += 1;
        n
    }

    /// Start a fresh graph that continues this graph's ID sequence
    pub(crate) fn successor(&self) -> Self {
        let mut graph = Self::with_layout(self.layout.clone());
        graph.next_id = self.next_id;
        graph
    }

    pub(crate) fn emit(&mut self, event: GraphEvent) {
        self.events.push(event);
    }

    /// Take all queued renderer notifications
    pub fn drain_events(&mut self) -> Vec<GraphEvent> {
        std::mem::take(&mut self.events)
    }

    /// Queued renderer notifications
    pub fn pending_events(&self) -> &[GraphEvent] {
        &self.events
    }

    /// Instantiate a node of type `type_tag` at `position`
    pub fn create_node(
        &mut self,
        registry: &dyn TemplateLookup,
        type_tag: &str,
        position: Pos2,
    ) -> Result<NodeId> {
        let template = registry
            .lookup_template(type_tag)
            .ok_or_else(|| GraphError::UnknownTemplate(type_tag.to_string()))?;

        let id = NodeId::from_counter(self.next_counter());
        let node = template.instantiate(id.clone(), position, &self.layout);
        self.nodes.insert(id.clone(), node);

        tracing::debug!("Created {type_tag} node {id} at ({}, {})", position.x, position.y);
        self.emit(GraphEvent::NodeCreated {
            node: id.clone(),
            node_type: type_tag.to_string(),
            position,
        });
        Ok(id)
    }

    /// Remove a node and every connection attached to it
    pub fn delete_node(&mut self, node_id: &NodeId) -> Option<Node> {
        let attached: Vec<ConnectionId> = self
            .nodes
            .get(node_id)?
            .ports()
            .flat_map(Port::connections)
            .cloned()
            .collect();
        // a self-connection is listed by both of its ports
        let removed = attached
            .iter()
            .filter(|id| self.delete_connection(id).is_some())
            .count();

        let node = self.nodes.shift_remove(node_id)?;
        tracing::debug!("Removed node {node_id} and {removed} connection(s)");
        self.emit(GraphEvent::NodeRemoved {
            node: node_id.clone(),
        });
        Some(node)
    }

    /// Set a config field. Returns false if the node or field does not exist.
    pub fn set_config_field(&mut self, node_id: &NodeId, field: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        if !node.set_field(field, value.clone()) {
            tracing::debug!("Node {node_id} has no config field {field:?}");
            return false;
        }
        self.emit(GraphEvent::FieldChanged {
            node: node_id.clone(),
            field: field.to_string(),
            value,
        });
        true
    }

    /// Move a node and recompute the path of every connection attached to it
    pub fn move_node(&mut self, node_id: &NodeId, position: Pos2) -> bool {
        let Some(node) = self.nodes.get_mut(node_id) else {
            return false;
        };
        node.set_position(position);
        let attached: Vec<ConnectionId> = node
            .ports()
            .flat_map(Port::connections)
            .cloned()
            .collect();

        self.emit(GraphEvent::NodeMoved {
            node: node_id.clone(),
            position,
        });
        for connection_id in &attached {
            self.refresh_connection_path(connection_id);
        }
        true
    }

    /// Get a node by ID
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Get all nodes, in creation order
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Current position of a node
    pub fn node_position(&self, node_id: &NodeId) -> Option<Pos2> {
        self.nodes.get(node_id).map(Node::position)
    }

    /// Resolve a port locator
    pub fn port(&self, locator: &PortLocator) -> Option<&Port> {
        self.nodes.get(&locator.node)?.port(&locator.port)
    }

    pub(crate) fn port_mut(&mut self, locator: &PortLocator) -> Option<&mut Port> {
        self.nodes.get_mut(&locator.node)?.port_mut(&locator.port)
    }

    /// Direction of a port
    pub fn port_direction(&self, locator: &PortLocator) -> Option<PortDirection> {
        self.port(locator).map(|p| p.direction)
    }

    /// Anchor of a port in graph-local coordinates
    pub fn port_anchor(&self, locator: &PortLocator) -> Option<Pos2> {
        self.nodes.get(&locator.node)?.port_anchor(&locator.port)
    }

    /// Get a connection by ID
    pub fn connection(&self, connection_id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(connection_id)
    }

    /// Get all connections, in creation order
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Get the number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connections attached to a port, in attachment order
    pub fn connections_at(&self, locator: &PortLocator) -> Vec<&Connection> {
        self.port(locator)
            .map(|port| {
                port.connections()
                    .filter_map(|id| self.connections.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get connections involving a node
    pub fn connections_for_node<'a>(
        &'a self,
        node_id: &'a NodeId,
    ) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.values().filter(move |c| c.involves_node(node_id))
    }

    /// Replace this graph's content with `other`, keeping undrained events
    pub fn replace_with(&mut self, other: Graph) {
        let pending = std::mem::take(&mut self.events);
        *self = other;
        self.events = pending;
        self.emit(GraphEvent::GraphReplaced);
    }

    /// Check that connections and port connection sets agree
    pub fn validate(&self) -> std::result::Result<(), InvariantViolation> {
        for (id, connection) in &self.connections {
            if connection.id != *id || connection.is_provisional() {
                return Err(InvariantViolation::BadConnectionId(id.clone()));
            }
            let Endpoint::Port(target) = &connection.target else {
                return Err(InvariantViolation::FloatingTarget(id.clone()));
            };
            for (locator, expected) in [
                (&connection.source, PortDirection::Output),
                (target, PortDirection::Input),
            ] {
                let port = self
                    .port(locator)
                    .ok_or_else(|| InvariantViolation::DanglingEndpoint(id.clone(), locator.clone()))?;
                if port.direction != expected {
                    return Err(InvariantViolation::WrongDirection(id.clone(), locator.clone()));
                }
                if !port.has_connection(id) {
                    return Err(InvariantViolation::Unregistered(id.clone(), locator.clone()));
                }
            }
        }

        for node in self.nodes.values() {
            for port in node.ports() {
                let locator = PortLocator::new(node.id().clone(), port.id.clone());
                for id in port.connections() {
                    let references_port = self
                        .connections
                        .get(id)
                        .is_some_and(|c| c.involves_port(&locator));
                    if !references_port {
                        return Err(InvariantViolation::StaleRegistration(id.clone(), locator));
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

/// Inconsistency between connections and port connection sets
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    /// Stored under a different or reserved ID
    #[error("connection stored under a bad id: {0}")]
    BadConnectionId(ConnectionId),

    /// Committed connection without a target port
    #[error("connection {0} has a floating target")]
    FloatingTarget(ConnectionId),

    /// Endpoint port does not exist
    #[error("connection {0} refers to missing port {1}")]
    DanglingEndpoint(ConnectionId, PortLocator),

    /// Source is not an output, or target is not an input
    #[error("connection {0} has the wrong direction at {1}")]
    WrongDirection(ConnectionId, PortLocator),

    /// Endpoint port does not list the connection
    #[error("connection {0} is not registered at {1}")]
    Unregistered(ConnectionId, PortLocator),

    /// Port lists a connection that does not reference it
    #[error("port {1} lists stale connection {0}")]
    StaleRegistration(ConnectionId, PortLocator),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::create_synth_registry;

    #[test]
    fn test_ids_are_monotonic() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let a = graph.create_node(&registry, "sinwave", Pos2::ZERO).unwrap();
        let b = graph.create_node(&registry, "linear", Pos2::ZERO).unwrap();
        graph.delete_node(&b);
        let c = graph.create_node(&registry, "linear", Pos2::ZERO).unwrap();
        assert_eq!(a.as_str(), "node0");
        assert_eq!(b.as_str(), "node1");
        assert_eq!(c.as_str(), "node2");
    }

    #[test]
    fn test_unknown_template_adds_nothing() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let result = graph.create_node(&registry, "doesnotexist", Pos2::ZERO);
        assert!(matches!(result, Err(GraphError::UnknownTemplate(t)) if t == "doesnotexist"));
        assert_eq!(graph.node_count(), 0);
        assert!(graph.pending_events().is_empty());
    }

    #[test]
    fn test_delete_node_cascades() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let a = graph.create_node(&registry, "sinwave", Pos2::ZERO).unwrap();
        let b = graph.create_node(&registry, "fft", Pos2::ZERO).unwrap();
        let c = graph.create_node(&registry, "linear", Pos2::ZERO).unwrap();
        let out = PortLocator::new(a.clone(), "output");
        graph.connect(&out, &PortLocator::new(b.clone(), "ampl")).unwrap();
        graph.connect(&out, &PortLocator::new(b.clone(), "phase")).unwrap();
        graph
            .connect(&PortLocator::new(b.clone(), "output"), &PortLocator::new(c.clone(), "phase"))
            .unwrap();

        graph.delete_node(&b).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(graph.connections_for_node(&b).count(), 0);
        assert!(!graph.port(&out).unwrap().is_connected());
        graph.validate().unwrap();

        assert!(graph.delete_node(&b).is_none());
    }

    #[test]
    fn test_delete_self_connected_node() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let a = graph.create_node(&registry, "sinwave", Pos2::ZERO).unwrap();
        let id = graph
            .connect(&PortLocator::new(a.clone(), "output"), &PortLocator::new(a.clone(), "phase"))
            .unwrap();
        graph.drain_events();

        graph.delete_node(&a).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert_eq!(
            graph.drain_events(),
            vec![
                GraphEvent::ConnectionRemoved { connection: id },
                GraphEvent::NodeRemoved { node: a },
            ]
        );
    }

    #[test]
    fn test_move_node_refreshes_attached_paths() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let a = graph.create_node(&registry, "sinwave", Pos2::ZERO).unwrap();
        let b = graph.create_node(&registry, "fft", Pos2::new(200.0, 0.0)).unwrap();
        let id = graph
            .connect(&PortLocator::new(a.clone(), "output"), &PortLocator::new(b, "ampl"))
            .unwrap();
        graph.drain_events();

        assert!(graph.move_node(&a, Pos2::new(5.0, 5.0)));
        let events = graph.drain_events();
        assert!(matches!(&events[0], GraphEvent::NodeMoved { position, .. } if *position == Pos2::new(5.0, 5.0)));
        assert!(matches!(
            &events[1],
            GraphEvent::ConnectionPathChanged { connection, path } if *connection == id && path.start == Pos2::new(101.0, 37.0)
        ));
        assert!(!graph.move_node(&NodeId::new("node42"), Pos2::ZERO));
    }

    #[test]
    fn test_set_config_field() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let a = graph.create_node(&registry, "sawtooth", Pos2::ZERO).unwrap();
        assert_eq!(graph.node(&a).unwrap().field("alpha"), Some("0.1"));
        assert!(graph.set_config_field(&a, "alpha", "0.25"));
        assert!(!graph.set_config_field(&a, "length", "3"));
        assert!(!graph.set_config_field(&NodeId::new("node9"), "alpha", "1"));
        assert_eq!(graph.node(&a).unwrap().field("alpha"), Some("0.25"));
    }

    #[test]
    fn test_replace_with_keeps_pending_events() {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        graph.create_node(&registry, "sinwave", Pos2::ZERO).unwrap();
        let mut other = graph.successor();
        let id = other.create_node(&registry, "fft", Pos2::ZERO).unwrap();
        assert_eq!(id.as_str(), "node1");

        graph.replace_with(other);
        assert_eq!(graph.node_count(), 1);
        let events = graph.drain_events();
        assert!(matches!(events.first(), Some(GraphEvent::NodeCreated { .. })));
        assert_eq!(events.last(), Some(&GraphEvent::GraphReplaced));
    }
}
