// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pointer-driven editing: hit classification and the drag state machine.
//!
//! A renderer reports what lies under the pointer as an [`Element`];
//! [`classify`] reduces it to the capability that matters for editing and
//! [`DragController`] turns press/move/release/leave sequences into graph
//! mutations. All handling is synchronous, one event at a time.

use crate::config::EditorConfig;
use crate::connection::{Connection, ConnectionId};
use crate::coords::ScreenTransform;
use crate::error::Result;
use crate::graph::Graph;
use crate::node::{NodeId, TemplateLookup};
use crate::port::PortLocator;
use egui::{Pos2, Vec2};

/// Something that can be deleted with a close button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Closeable {
    /// A node (its connections go with it)
    Node(NodeId),
    /// A single connection
    Connection(ConnectionId),
}

/// Visual element under the pointer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Header strip of a node
    NodeHeader(NodeId),
    /// Body of a node outside any interactive part
    NodeBody(NodeId),
    /// A config field editing box (never starts a drag)
    ConfigField {
        /// Owning node
        node: NodeId,
        /// Field ID
        field: String,
    },
    /// A port
    Port(PortLocator),
    /// A close button
    CloseButton(Closeable),
    /// The curve of a committed connection
    Connection(ConnectionId),
}

/// What a press on an element can do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hit {
    /// Start dragging this node
    DragHandle(NodeId),
    /// Start or finish a connection here
    Port(PortLocator),
    /// Delete this
    Close(Closeable),
    /// Nothing
    Inert,
}

/// Reduce the element under the pointer to its editing capability
pub fn classify(element: Option<&Element>) -> Hit {
    match element {
        Some(Element::NodeHeader(node)) => Hit::DragHandle(node.clone()),
        Some(Element::Port(locator)) => Hit::Port(locator.clone()),
        Some(Element::CloseButton(target)) => Hit::Close(target.clone()),
        Some(Element::NodeBody(_) | Element::ConfigField { .. } | Element::Connection(_)) | None => {
            Hit::Inert
        }
    }
}

/// Geometric hit testing against the node layout, in graph-local coordinates
pub struct LayoutHitTester<'a> {
    graph: &'a Graph,
    connection_close_radius: f32,
    connection_pick_distance: f32,
}

impl<'a> LayoutHitTester<'a> {
    /// Create a hit tester for `graph`
    pub fn new(graph: &'a Graph, config: &EditorConfig) -> Self {
        Self {
            graph,
            connection_close_radius: config.connection_close_radius,
            connection_pick_distance: graph.layout().port_radius,
        }
    }

    /// Find the topmost element at a graph-local position
    pub fn hit_test(&self, point: Pos2) -> Option<Element> {
        self.hit_node(point).or_else(|| self.hit_connection(point))
    }

    fn hit_node(&self, point: Pos2) -> Option<Element> {
        let layout = self.graph.layout();
        // later nodes are drawn on top
        let topmost_first: Vec<_> = self.graph.nodes().rev().collect();

        // ports stick out of the body, so they win over any overlapping node
        for node in &topmost_first {
            let local = point - node.position().to_vec2();
            for port in node.ports() {
                if local.distance(Pos2::ZERO + port.offset) <= layout.port_radius {
                    return Some(Element::Port(PortLocator::new(node.id().clone(), port.id.clone())));
                }
            }
        }

        for node in &topmost_first {
            let local = point - node.position().to_vec2();
            let body = egui::Rect::from_min_size(Pos2::ZERO, node.size());
            if !body.contains(local) {
                continue;
            }
            if layout.close_button_rect().contains(local) {
                return Some(Element::CloseButton(Closeable::Node(node.id().clone())));
            }
            for (i, (field, _)) in node.fields().enumerate() {
                if layout.field_rect(i).contains(local) {
                    return Some(Element::ConfigField {
                        node: node.id().clone(),
                        field: field.to_string(),
                    });
                }
            }
            if layout.header_rect().contains(local) {
                return Some(Element::NodeHeader(node.id().clone()));
            }
            return Some(Element::NodeBody(node.id().clone()));
        }
        None
    }

    fn hit_connection(&self, point: Pos2) -> Option<Element> {
        for connection in self.graph.connections() {
            let Some(path) = self.graph.connection_path(connection) else {
                continue;
            };
            if path.midpoint().distance(point) <= self.connection_close_radius {
                return Some(Element::CloseButton(Closeable::Connection(connection.id.clone())));
            }
            if path.sample(32).iter().any(|p| p.distance(point) <= self.connection_pick_distance) {
                return Some(Element::Connection(connection.id.clone()));
            }
        }
        None
    }
}

/// Kind of pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEventKind {
    /// Primary button pressed
    Press,
    /// Pointer moved
    Move,
    /// Primary button released
    Release,
    /// Pointer left the editing surface
    Leave,
}

/// A pointer event in screen coordinates, with the element it hit
#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    /// Event kind
    pub kind: PointerEventKind,
    /// Pointer position on screen
    pub position: Pos2,
    /// Element under the pointer, if any
    pub target: Option<Element>,
}

impl PointerEvent {
    /// Create a pointer event
    pub fn new(kind: PointerEventKind, position: Pos2, target: Option<Element>) -> Self {
        Self {
            kind,
            position,
            target,
        }
    }

    /// Button press
    pub fn press(position: Pos2, target: Option<Element>) -> Self {
        Self::new(PointerEventKind::Press, position, target)
    }

    /// Pointer motion
    pub fn moved(position: Pos2, target: Option<Element>) -> Self {
        Self::new(PointerEventKind::Move, position, target)
    }

    /// Button release
    pub fn release(position: Pos2, target: Option<Element>) -> Self {
        Self::new(PointerEventKind::Release, position, target)
    }

    /// Pointer left the surface
    pub fn leave(position: Pos2) -> Self {
        Self::new(PointerEventKind::Leave, position, None)
    }
}

/// State of the drag in progress
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragSession {
    /// No drag in progress
    #[default]
    Idle,
    /// Moving a node
    DraggingNode {
        /// Node being moved
        node: NodeId,
        /// Node position minus pointer position at press time
        grab_offset: Vec2,
    },
    /// Growing a connection out of a port
    DraggingConnection {
        /// The provisional connection
        connection: Connection,
    },
}

/// Drives graph edits from pointer events
#[derive(Debug, Clone, Default)]
pub struct DragController {
    session: DragSession,
    transform: ScreenTransform,
    palette_template: Option<String>,
    config: EditorConfig,
}

impl DragController {
    /// Create a controller with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller with the given configuration
    pub fn with_config(config: EditorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Set the transform from graph-local space to screen space
    pub fn set_transform(&mut self, transform: ScreenTransform) {
        self.transform = transform;
    }

    /// Transform from graph-local space to screen space
    pub fn transform(&self) -> &ScreenTransform {
        &self.transform
    }

    /// Current drag state
    pub fn session(&self) -> &DragSession {
        &self.session
    }

    /// Whether no drag is in progress
    pub fn is_idle(&self) -> bool {
        matches!(self.session, DragSession::Idle)
    }

    /// Feed one pointer event
    pub fn handle(&mut self, graph: &mut Graph, event: PointerEvent) {
        let local = self.transform.to_local(event.position);
        let hit = classify(event.target.as_ref());
        let session = std::mem::take(&mut self.session);

        self.session = match event.kind {
            PointerEventKind::Press => self.press(graph, session, hit, local),
            PointerEventKind::Move => self.motion(graph, session, hit, local),
            PointerEventKind::Release | PointerEventKind::Leave => {
                Self::release(graph, session, hit)
            }
        };
    }

    fn press(&self, graph: &mut Graph, session: DragSession, hit: Hit, local: Pos2) -> DragSession {
        if session != DragSession::Idle {
            return session;
        }

        match hit {
            Hit::Close(Closeable::Node(node)) => {
                graph.delete_node(&node);
                DragSession::Idle
            }
            Hit::Close(Closeable::Connection(connection)) => {
                graph.delete_connection(&connection);
                DragSession::Idle
            }
            Hit::DragHandle(node) => match graph.node_position(&node) {
                Some(position) => {
                    tracing::trace!("Dragging node {node}");
                    DragSession::DraggingNode {
                        node,
                        grab_offset: position - local,
                    }
                }
                None => DragSession::Idle,
            },
            Hit::Port(locator) => match graph.begin_provisional_connection(&locator, local) {
                Some(connection) => {
                    graph.update_path(&connection);
                    DragSession::DraggingConnection { connection }
                }
                None => DragSession::Idle,
            },
            Hit::Inert => DragSession::Idle,
        }
    }

    fn motion(&self, graph: &mut Graph, session: DragSession, hit: Hit, local: Pos2) -> DragSession {
        match session {
            DragSession::DraggingNode { node, grab_offset } => {
                let position = self.config.snap(local + grab_offset);
                if !graph.move_node(&node, position) {
                    // deleted under us
                    return DragSession::Idle;
                }
                DragSession::DraggingNode { node, grab_offset }
            }
            DragSession::DraggingConnection { mut connection } => {
                let hovered = match &hit {
                    Hit::Port(locator) => Some(locator),
                    _ => None,
                };
                graph.update_provisional_target(&mut connection, hovered, local);
                graph.update_path(&connection);
                DragSession::DraggingConnection { connection }
            }
            DragSession::Idle => DragSession::Idle,
        }
    }

    fn release(graph: &mut Graph, session: DragSession, hit: Hit) -> DragSession {
        if let DragSession::DraggingConnection { connection } = session {
            let target = match &hit {
                Hit::Port(locator) => Some(locator),
                _ => None,
            };
            graph.finalize_or_discard(connection, target);
        }
        DragSession::Idle
    }

    /// A palette entry started being dragged
    pub fn begin_palette_drag(&mut self, template: impl Into<String>) {
        self.palette_template = Some(template.into());
    }

    /// The palette drag ended somewhere other than the canvas
    pub fn cancel_palette_drag(&mut self) {
        self.palette_template = None;
    }

    /// Template currently dragged from the palette
    pub fn palette_template(&self) -> Option<&str> {
        self.palette_template.as_deref()
    }

    /// The palette drag was dropped on the canvas at screen position `position`
    pub fn drop_on_canvas(
        &mut self,
        graph: &mut Graph,
        registry: &dyn TemplateLookup,
        position: Pos2,
    ) -> Result<Option<NodeId>> {
        let Some(template) = self.palette_template.take() else {
            return Ok(None);
        };
        let local = self.config.snap(self.transform.to_local(position));
        graph.create_node(registry, &template, local).map(Some)
    }
}
