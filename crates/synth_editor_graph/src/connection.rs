// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connections between ports, the provisional connection of a drag, and
//! their rendered Bézier paths.

use crate::coords::ScreenTransform;
use crate::error::ConnectionError;
use crate::events::GraphEvent;
use crate::graph::Graph;
use crate::node::NodeId;
use crate::port::{PortDirection, PortLocator};
use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved ID of the connection being dragged out of a port
pub const PROVISIONAL_CONNECTION_ID: &str = "dragged_connection";

/// Unique identifier for a connection (`"connection<n>"`, or the provisional sentinel)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub String);

impl ConnectionId {
    /// Create a connection ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The sentinel ID of the provisional connection
    pub fn provisional() -> Self {
        Self(PROVISIONAL_CONNECTION_ID.to_string())
    }

    pub(crate) fn from_counter(n: u64) -> Self {
        Self(format!("connection{n}"))
    }

    /// Whether this is the provisional sentinel
    pub fn is_provisional(&self) -> bool {
        self.0 == PROVISIONAL_CONNECTION_ID
    }

    /// The ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Far end of a connection
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    /// Bound to a real port
    Port(PortLocator),
    /// Floating anchor following the pointer, in graph-local coordinates
    Floating(Pos2),
}

/// A connection between two ports.
///
/// Committed connections always run from an output (`source`) to an
/// input (`target`). The provisional connection keeps the port the drag
/// started from as its source, whatever its direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    /// Connection ID
    pub id: ConnectionId,
    /// Source port
    pub source: PortLocator,
    /// Target port, or floating anchor while provisional
    pub target: Endpoint,
}

impl Connection {
    /// Whether this is the connection under construction
    pub fn is_provisional(&self) -> bool {
        self.id.is_provisional()
    }

    /// Target port, if bound to one
    pub fn target_port(&self) -> Option<&PortLocator> {
        match &self.target {
            Endpoint::Port(locator) => Some(locator),
            Endpoint::Floating(_) => None,
        }
    }

    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: &NodeId) -> bool {
        self.source.node == *node_id || self.target_port().is_some_and(|t| t.node == *node_id)
    }

    /// Check if this connection involves a specific port
    pub fn involves_port(&self, locator: &PortLocator) -> bool {
        self.source == *locator || self.target_port() == Some(locator)
    }
}

/// Cubic Bézier shape of a rendered connection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BezierPath {
    /// Source anchor
    pub start: Pos2,
    /// First control point
    pub ctrl1: Pos2,
    /// Second control point
    pub ctrl2: Pos2,
    /// Target anchor
    pub end: Pos2,
}

impl BezierPath {
    /// Shape a path between two anchors, pulling each end horizontally by its port's offset
    pub fn new(start: Pos2, start_dx: f32, end: Pos2, end_dx: f32) -> Self {
        Self {
            start,
            ctrl1: start + Vec2::new(start_dx, 0.0),
            ctrl2: end + Vec2::new(end_dx, 0.0),
            end,
        }
    }

    /// Point on the curve at parameter `t` in `[0, 1]`
    pub fn point_at(&self, t: f32) -> Pos2 {
        let u = 1.0 - t;
        let w0 = u * u * u;
        let w1 = 3.0 * u * u * t;
        let w2 = 3.0 * u * t * t;
        let w3 = t * t * t;
        Pos2::new(
            w0 * self.start.x + w1 * self.ctrl1.x + w2 * self.ctrl2.x + w3 * self.end.x,
            w0 * self.start.y + w1 * self.ctrl1.y + w2 * self.ctrl2.y + w3 * self.end.y,
        )
    }

    /// Curve midpoint, where the close button of a connection sits
    pub fn midpoint(&self) -> Pos2 {
        self.point_at(0.5)
    }

    /// Sample `segments + 1` points along the curve
    pub fn sample(&self, segments: usize) -> Vec<Pos2> {
        let segments = segments.max(1);
        (0..=segments)
            .map(|i| self.point_at(i as f32 / segments as f32))
            .collect()
    }

    /// Map all four points through a transform
    pub fn transformed(&self, transform: &ScreenTransform) -> Self {
        Self {
            start: transform.to_screen(self.start),
            ctrl1: transform.to_screen(self.ctrl1),
            ctrl2: transform.to_screen(self.ctrl2),
            end: transform.to_screen(self.end),
        }
    }

    /// SVG path data (`M start C ctrl1 ctrl2 end`)
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.ctrl1.x,
            self.ctrl1.y,
            self.ctrl2.x,
            self.ctrl2.y,
            self.end.x,
            self.end.y
        )
    }
}

impl Graph {
    /// Whether two existing ports may be connected
    pub fn ports_compatible(&self, a: &PortLocator, b: &PortLocator) -> bool {
        match (self.port(a), self.port(b)) {
            (Some(pa), Some(pb)) => pa.can_connect(pb),
            _ => false,
        }
    }

    /// Start dragging a connection out of `source`, with its far end floating at `pointer`.
    ///
    /// The provisional connection is not registered with any port. Returns
    /// `None` when the source port does not exist.
    pub fn begin_provisional_connection(
        &mut self,
        source: &PortLocator,
        pointer: Pos2,
    ) -> Option<Connection> {
        if self.port(source).is_none() {
            tracing::debug!("Ignoring connection drag from missing port {source}");
            return None;
        }
        tracing::trace!("Provisional connection from {source}");
        Some(Connection {
            id: ConnectionId::provisional(),
            source: source.clone(),
            target: Endpoint::Floating(pointer),
        })
    }

    /// Rebind the provisional target to the hovered port if it is compatible
    /// with the source, otherwise to a floating anchor at `pointer`
    pub fn update_provisional_target(
        &self,
        connection: &mut Connection,
        hovered: Option<&PortLocator>,
        pointer: Pos2,
    ) {
        connection.target = match hovered {
            Some(port) if self.ports_compatible(&connection.source, port) => {
                Endpoint::Port(port.clone())
            }
            _ => Endpoint::Floating(pointer),
        };
    }

    /// End a connection drag. Commits a permanent connection when `release`
    /// is a port compatible with the source; otherwise nothing changes.
    pub fn finalize_or_discard(
        &mut self,
        connection: Connection,
        release: Option<&PortLocator>,
    ) -> Option<ConnectionId> {
        self.emit(GraphEvent::ConnectionRemoved {
            connection: connection.id.clone(),
        });

        let target = release?;
        if !self.ports_compatible(&connection.source, target) {
            tracing::debug!(
                "Discarding connection drag: {} and {target} are not compatible",
                connection.source
            );
            return None;
        }
        self.connect(&connection.source, target).ok()
    }

    /// Create a permanent connection between two ports of opposite kind.
    ///
    /// Argument order does not matter; the stored connection runs from the
    /// output to the input.
    pub fn connect(
        &mut self,
        a: &PortLocator,
        b: &PortLocator,
    ) -> Result<ConnectionId, ConnectionError> {
        let da = self.existing_port_direction(a)?;
        let db = self.existing_port_direction(b)?;
        if !crate::port::compatible(da, db) {
            return Err(ConnectionError::IncompatiblePorts(a.clone(), b.clone()));
        }

        let (source, target) = match da {
            PortDirection::Output => (a.clone(), b.clone()),
            PortDirection::Input => (b.clone(), a.clone()),
        };

        let id = ConnectionId::from_counter(self.next_counter());
        for locator in [&source, &target] {
            if let Some(port) = self.port_mut(locator) {
                port.attach(id.clone());
            }
        }
        self.connections.insert(
            id.clone(),
            Connection {
                id: id.clone(),
                source: source.clone(),
                target: Endpoint::Port(target.clone()),
            },
        );

        tracing::debug!("Connected {source} -> {target} as {id}");
        self.emit(GraphEvent::ConnectionCreated {
            connection: id.clone(),
            source,
            target,
        });
        self.refresh_connection_path(&id);
        Ok(id)
    }

    fn existing_port_direction(
        &self,
        locator: &PortLocator,
    ) -> Result<PortDirection, ConnectionError> {
        let node = self
            .node(&locator.node)
            .ok_or_else(|| ConnectionError::NodeNotFound(locator.node.clone()))?;
        node.port(&locator.port)
            .map(|p| p.direction)
            .ok_or_else(|| ConnectionError::PortNotFound(locator.clone()))
    }

    /// Remove a connection and unregister it from its endpoints.
    ///
    /// Unknown IDs and endpoints that are already gone are skipped.
    pub fn delete_connection(&mut self, connection_id: &ConnectionId) -> Option<Connection> {
        let Some(connection) = self.connections.shift_remove(connection_id) else {
            tracing::debug!("Connection {connection_id} already removed");
            return None;
        };

        let endpoints = std::iter::once(&connection.source).chain(connection.target_port());
        for locator in endpoints {
            if let Some(port) = self.port_mut(locator) {
                port.detach(connection_id);
            }
        }

        tracing::debug!("Removed connection {connection_id}");
        self.emit(GraphEvent::ConnectionRemoved {
            connection: connection_id.clone(),
        });
        Some(connection)
    }

    /// Rendered path of a connection from the current port anchors.
    ///
    /// A floating end is pulled by the negation of the source's offset.
    /// Returns `None` if an endpoint port no longer exists.
    pub fn connection_path(&self, connection: &Connection) -> Option<BezierPath> {
        let source_port = self.port(&connection.source)?;
        let start = self.port_anchor(&connection.source)?;
        let (end, end_dx) = match &connection.target {
            Endpoint::Port(locator) => (self.port_anchor(locator)?, self.port(locator)?.anchor_dx),
            Endpoint::Floating(pointer) => (*pointer, -source_port.anchor_dx),
        };
        Some(BezierPath::new(start, source_port.anchor_dx, end, end_dx))
    }

    /// Recompute a connection's path and notify the renderer
    pub fn update_path(&mut self, connection: &Connection) -> Option<BezierPath> {
        let path = self.connection_path(connection)?;
        self.emit(GraphEvent::ConnectionPathChanged {
            connection: connection.id.clone(),
            path,
        });
        Some(path)
    }

    pub(crate) fn refresh_connection_path(&mut self, connection_id: &ConnectionId) {
        let path = self
            .connections
            .get(connection_id)
            .and_then(|c| self.connection_path(c));
        if let Some(path) = path {
            self.emit(GraphEvent::ConnectionPathChanged {
                connection: connection_id.clone(),
                path,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::create_synth_registry;

    fn two_nodes() -> (Graph, NodeId, NodeId) {
        let registry = create_synth_registry();
        let mut graph = Graph::new();
        let a = graph.create_node(&registry, "sinwave", Pos2::new(10.0, 10.0)).unwrap();
        let b = graph.create_node(&registry, "fft", Pos2::new(100.0, 10.0)).unwrap();
        (graph, a, b)
    }

    #[test]
    fn test_connect_registers_both_ends() {
        let (mut graph, a, b) = two_nodes();
        let out = PortLocator::new(a.clone(), "output");
        let ampl = PortLocator::new(b.clone(), "ampl");

        // input-first order is normalized to output -> input
        let id = graph.connect(&ampl, &out).unwrap();
        let connection = graph.connection(&id).unwrap();
        assert_eq!(connection.source, out);
        assert_eq!(connection.target_port(), Some(&ampl));
        assert!(graph.port(&out).unwrap().has_connection(&id));
        assert!(graph.port(&ampl).unwrap().has_connection(&id));
        graph.validate().unwrap();
    }

    #[test]
    fn test_connect_rejects_same_kind_and_missing_ports() {
        let (mut graph, a, b) = two_nodes();
        let phase_a = PortLocator::new(a.clone(), "phase");
        let phase_b = PortLocator::new(b.clone(), "phase");
        assert!(matches!(
            graph.connect(&phase_a, &phase_b),
            Err(ConnectionError::IncompatiblePorts(..))
        ));
        assert!(matches!(
            graph.connect(&PortLocator::new(a, "nope"), &phase_b),
            Err(ConnectionError::PortNotFound(_))
        ));
        assert!(matches!(
            graph.connect(&PortLocator::new("node99", "output"), &phase_b),
            Err(ConnectionError::NodeNotFound(_))
        ));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn test_ports_compatible_resolves_both_ports() {
        let (graph, a, b) = two_nodes();
        let out_a = PortLocator::new(a.clone(), "output");
        let ampl_b = PortLocator::new(b.clone(), "ampl");
        assert!(graph.ports_compatible(&out_a, &ampl_b));
        assert!(graph.ports_compatible(&ampl_b, &out_a));
        assert!(!graph.ports_compatible(&PortLocator::new(a, "phase"), &ampl_b));
        assert!(!graph.ports_compatible(&out_a, &PortLocator::new(b, "missing")));
    }

    #[test]
    fn test_provisional_connection_is_not_registered() {
        let (mut graph, a, b) = two_nodes();
        let out = PortLocator::new(a, "output");
        let phase = PortLocator::new(b, "phase");

        let mut provisional = graph
            .begin_provisional_connection(&out, Pos2::new(50.0, 50.0))
            .unwrap();
        assert!(provisional.is_provisional());
        assert_eq!(provisional.id.as_str(), "dragged_connection");

        graph.update_provisional_target(&mut provisional, Some(&phase), Pos2::new(99.0, 58.0));
        assert_eq!(provisional.target_port(), Some(&phase));
        assert!(!graph.port(&out).unwrap().is_connected());
        assert!(!graph.port(&phase).unwrap().is_connected());

        // incompatible hover falls back to the floating anchor
        graph.update_provisional_target(&mut provisional, Some(&out), Pos2::new(1.0, 2.0));
        assert_eq!(provisional.target, Endpoint::Floating(Pos2::new(1.0, 2.0)));
    }

    #[test]
    fn test_finalize_commits_once() {
        let (mut graph, a, b) = two_nodes();
        let out = PortLocator::new(a, "output");
        let ampl = PortLocator::new(b, "ampl");

        let provisional = graph.begin_provisional_connection(&out, Pos2::ZERO).unwrap();
        let id = graph.finalize_or_discard(provisional, Some(&ampl)).unwrap();
        assert!(id.as_str().starts_with("connection"));
        assert_eq!(graph.port(&out).unwrap().connection_count(), 1);
        assert_eq!(graph.port(&ampl).unwrap().connection_count(), 1);
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn test_discard_changes_nothing() {
        let (mut graph, a, b) = two_nodes();
        let phase_a = PortLocator::new(a, "phase");
        let phase_b = PortLocator::new(b, "phase");

        let provisional = graph.begin_provisional_connection(&phase_a, Pos2::ZERO).unwrap();
        assert_eq!(graph.finalize_or_discard(provisional.clone(), Some(&phase_b)), None);
        assert_eq!(graph.finalize_or_discard(provisional, None), None);
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.nodes().all(|n| n.ports().all(|p| !p.is_connected())));
    }

    #[test]
    fn test_delete_connection_twice_is_a_no_op() {
        let (mut graph, a, b) = two_nodes();
        let id = graph
            .connect(&PortLocator::new(a, "output"), &PortLocator::new(b, "ampl"))
            .unwrap();
        assert!(graph.delete_connection(&id).is_some());
        assert!(graph.delete_connection(&id).is_none());
        assert_eq!(graph.connection_count(), 0);
        graph.validate().unwrap();
    }

    #[test]
    fn test_path_uses_anchor_offsets() {
        let (mut graph, a, b) = two_nodes();
        let id = graph
            .connect(&PortLocator::new(a, "output"), &PortLocator::new(b, "ampl"))
            .unwrap();
        let path = graph.connection_path(graph.connection(&id).unwrap()).unwrap();
        assert_eq!(path.start, Pos2::new(106.0, 42.0));
        assert_eq!(path.ctrl1, Pos2::new(156.0, 42.0));
        assert_eq!(path.ctrl2, Pos2::new(50.0, 42.0));
        assert_eq!(path.end, Pos2::new(100.0, 42.0));
        assert_eq!(path.to_svg_path(), "M 106 42 C 156 42, 50 42, 100 42");
    }

    #[test]
    fn test_floating_end_mirrors_source_offset() {
        let (mut graph, _, b) = two_nodes();
        let phase = PortLocator::new(b, "phase");
        let provisional = graph
            .begin_provisional_connection(&phase, Pos2::new(0.0, 0.0))
            .unwrap();
        let path = graph.connection_path(&provisional).unwrap();
        assert_eq!(path.ctrl1, Pos2::new(50.0, 58.0));
        assert_eq!(path.ctrl2, Pos2::new(50.0, 0.0));
    }

    #[test]
    fn test_bezier_endpoints() {
        let path = BezierPath::new(Pos2::ZERO, 10.0, Pos2::new(100.0, 0.0), -10.0);
        assert_eq!(path.point_at(0.0), path.start);
        assert_eq!(path.point_at(1.0), path.end);
        assert_eq!(path.midpoint(), Pos2::new(50.0, 0.0));
        assert_eq!(path.sample(4).len(), 5);
    }
}
