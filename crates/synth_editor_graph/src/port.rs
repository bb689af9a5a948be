// SPDX-License-Identifier: MIT OR Apache-2.0
//! Port definitions for node inputs/outputs.

use crate::connection::ConnectionId;
use crate::node::NodeId;
use egui::Vec2;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a port within its node (e.g. `"phase"` or `"output"`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub String);

impl PortId {
    /// Create a port ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PortId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Port direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    /// Input port
    Input,
    /// Output port
    Output,
}

/// Whether two ports of the given directions may be connected.
///
/// Exactly one side must be an input and the other an output; no other
/// typing applies.
pub fn compatible(a: PortDirection, b: PortDirection) -> bool {
    matches!(
        (a, b),
        (PortDirection::Input, PortDirection::Output) | (PortDirection::Output, PortDirection::Input)
    )
}

/// Stable reference to a port: owning node plus port ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortLocator {
    /// Owning node
    pub node: NodeId,
    /// Port within the node
    pub port: PortId,
}

impl PortLocator {
    /// Create a locator
    pub fn new(node: impl Into<NodeId>, port: impl Into<PortId>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.port)
    }
}

/// A port on a node instance
#[derive(Debug, Clone)]
pub struct Port {
    /// Port ID, unique within the node
    pub id: PortId,
    /// Display name
    pub name: String,
    /// Port direction
    pub direction: PortDirection,
    /// Position relative to the node origin
    pub offset: Vec2,
    /// Horizontal Bézier control offset used when shaping attached connections
    pub anchor_dx: f32,
    /// Committed connections attached to this port, in attachment order
    connections: IndexSet<ConnectionId>,
}

impl Port {
    /// Create an unconnected port
    pub fn new(
        id: PortId,
        name: impl Into<String>,
        direction: PortDirection,
        offset: Vec2,
        anchor_dx: f32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            direction,
            offset,
            anchor_dx,
            connections: IndexSet::new(),
        }
    }

    /// Check if a connection to another port is valid
    pub fn can_connect(&self, other: &Port) -> bool {
        compatible(self.direction, other.direction)
    }

    /// Connections attached to this port
    pub fn connections(&self) -> impl Iterator<Item = &ConnectionId> {
        self.connections.iter()
    }

    /// Whether `id` is attached to this port
    pub fn has_connection(&self, id: &ConnectionId) -> bool {
        self.connections.contains(id)
    }

    /// Number of attached connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether anything is attached
    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    pub(crate) fn attach(&mut self, id: ConnectionId) -> bool {
        self.connections.insert(id)
    }

    pub(crate) fn detach(&mut self, id: &ConnectionId) -> bool {
        self.connections.shift_remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PortDirection::{Input, Output};

    #[test]
    fn test_compatibility_requires_opposite_kinds() {
        assert!(compatible(Input, Output));
        assert!(compatible(Output, Input));
        assert!(!compatible(Input, Input));
        assert!(!compatible(Output, Output));
    }

    #[test]
    fn test_can_connect_follows_direction() {
        let input = Port::new(PortId::new("phase"), "phase", Input, Vec2::new(0.0, 32.0), -50.0);
        let output = Port::new(PortId::new("output"), "output", Output, Vec2::new(96.0, 32.0), 50.0);
        assert!(input.can_connect(&output));
        assert!(output.can_connect(&input));
        assert!(!input.can_connect(&input));
    }

    #[test]
    fn test_attach_and_detach() {
        let mut port = Port::new(PortId::new("phase"), "phase", Input, Vec2::new(0.0, 32.0), -50.0);
        let id = ConnectionId::new("connection3");
        assert!(!port.is_connected());
        assert!(port.attach(id.clone()));
        assert!(!port.attach(id.clone()));
        assert_eq!(port.connection_count(), 1);
        assert!(port.detach(&id));
        assert!(!port.detach(&id));
    }

    #[test]
    fn test_locator_display() {
        let locator = PortLocator::new("node2", "ampl");
        assert_eq!(locator.to_string(), "node2.ampl");
    }
}
