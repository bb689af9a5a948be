// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end editing sessions driven through the pointer state machine.

use egui::Pos2;
use synth_editor_graph::interaction::Closeable;
use synth_editor_graph::{
    create_synth_registry, BezierPath, DragController, DragSession, Element, Graph, GraphError,
    GraphEvent, NodeId, NodeRegistry, PointerEvent, PortLocator,
};

struct Session {
    registry: NodeRegistry,
    graph: Graph,
    controller: DragController,
}

impl Session {
    fn new() -> Self {
        Self {
            registry: create_synth_registry(),
            graph: Graph::new(),
            controller: DragController::new(),
        }
    }

    fn node(&mut self, template: &str, x: f32, y: f32) -> NodeId {
        self.graph.create_node(&self.registry, template, Pos2::new(x, y)).unwrap()
    }

    fn press(&mut self, x: f32, y: f32, target: Option<Element>) {
        self.controller.handle(&mut self.graph, PointerEvent::press(Pos2::new(x, y), target));
    }

    fn move_to(&mut self, x: f32, y: f32, target: Option<Element>) {
        self.controller.handle(&mut self.graph, PointerEvent::moved(Pos2::new(x, y), target));
    }

    fn release(&mut self, x: f32, y: f32, target: Option<Element>) {
        self.controller.handle(&mut self.graph, PointerEvent::release(Pos2::new(x, y), target));
    }

    fn port_set(&self, locator: &PortLocator) -> Vec<String> {
        self.graph
            .port(locator)
            .unwrap()
            .connections()
            .map(|id| id.as_str().to_string())
            .collect()
    }
}

#[test]
fn test_connect_then_drag_source_node() {
    let mut s = Session::new();
    let a = s.node("sinwave", 10.0, 10.0);
    let b = s.node("fft", 100.0, 10.0);
    let a_out = PortLocator::new(a.clone(), "output");
    let b_ampl = PortLocator::new(b.clone(), "ampl");

    s.press(106.0, 42.0, Some(Element::Port(a_out.clone())));
    s.move_to(101.0, 43.0, Some(Element::Port(b_ampl.clone())));
    s.release(101.0, 43.0, Some(Element::Port(b_ampl.clone())));

    assert_eq!(s.graph.connection_count(), 1);
    let id = s.graph.connections().next().unwrap().id.clone();
    assert_eq!(s.port_set(&a_out), vec![id.as_str().to_string()]);
    assert_eq!(s.port_set(&b_ampl), vec![id.as_str().to_string()]);
    s.graph.drain_events();

    // grab the header 20 right and 5 down of the node origin
    s.press(30.0, 15.0, Some(Element::NodeHeader(a.clone())));
    s.move_to(40.0, 35.0, None);
    s.release(40.0, 35.0, None);

    assert_eq!(s.graph.node_position(&a), Some(Pos2::new(20.0, 30.0)));
    let expected = BezierPath::new(Pos2::new(116.0, 62.0), 50.0, Pos2::new(100.0, 42.0), -50.0);
    let connection = s.graph.connection(&id).unwrap();
    assert_eq!(s.graph.connection_path(connection), Some(expected));
    assert!(s.graph.drain_events().contains(&GraphEvent::ConnectionPathChanged {
        connection: id,
        path: expected,
    }));
    assert!(s.graph.validate().is_ok());
}

#[test]
fn test_release_over_empty_space_discards() {
    let mut s = Session::new();
    let a = s.node("sinwave", 10.0, 10.0);
    s.node("fft", 100.0, 10.0);
    let a_out = PortLocator::new(a, "output");

    s.press(106.0, 42.0, Some(Element::Port(a_out.clone())));
    assert!(matches!(s.controller.session(), DragSession::DraggingConnection { .. }));
    s.move_to(300.0, 300.0, None);
    s.release(300.0, 300.0, None);

    assert!(s.controller.is_idle());
    assert_eq!(s.graph.connection_count(), 0);
    assert!(s.port_set(&a_out).is_empty());
}

#[test]
fn test_input_to_input_discards() {
    let mut s = Session::new();
    let a = s.node("sinwave", 10.0, 10.0);
    let b = s.node("fft", 100.0, 10.0);
    let a_phase = PortLocator::new(a, "phase");
    let b_phase = PortLocator::new(b, "phase");

    s.press(10.0, 42.0, Some(Element::Port(a_phase.clone())));
    s.move_to(100.0, 58.0, Some(Element::Port(b_phase.clone())));
    s.release(100.0, 58.0, Some(Element::Port(b_phase.clone())));

    assert_eq!(s.graph.connection_count(), 0);
    assert!(s.port_set(&a_phase).is_empty());
    assert!(s.port_set(&b_phase).is_empty());
}

#[test]
fn test_connection_drag_from_input_normalizes_direction() {
    let mut s = Session::new();
    let a = s.node("sinwave", 10.0, 10.0);
    let b = s.node("fft", 100.0, 10.0);

    s.press(100.0, 42.0, Some(Element::Port(PortLocator::new(b.clone(), "ampl"))));
    s.release(106.0, 42.0, Some(Element::Port(PortLocator::new(a.clone(), "output"))));

    let connection = s.graph.connections().next().unwrap();
    assert_eq!(connection.source, PortLocator::new(a, "output"));
    assert_eq!(connection.target_port(), Some(&PortLocator::new(b, "ampl")));
}

#[test]
fn test_close_node_removes_its_connections() {
    let mut s = Session::new();
    let a = s.node("sinwave", 10.0, 10.0);
    let b = s.node("fft", 100.0, 10.0);
    let c = s.node("linear", 10.0, 120.0);
    let b_ampl = PortLocator::new(b.clone(), "ampl");
    s.graph.connect(&PortLocator::new(a.clone(), "output"), &b_ampl).unwrap();
    s.graph
        .connect(&PortLocator::new(c.clone(), "output"), &PortLocator::new(b.clone(), "phase"))
        .unwrap();

    s.press(98.0, 18.0, Some(Element::CloseButton(Closeable::Node(a.clone()))));

    assert!(s.graph.node(&a).is_none());
    assert_eq!(s.graph.connection_count(), 1);
    assert!(s.graph.connections().all(|conn| !conn.involves_node(&a)));
    assert!(s.port_set(&b_ampl).is_empty());
    assert!(s.graph.validate().is_ok());
}

#[test]
fn test_import_unknown_template_keeps_live_graph() {
    let mut s = Session::new();
    let a = s.node("sinwave", 10.0, 10.0);
    let b = s.node("fft", 100.0, 10.0);
    s.graph
        .connect(&PortLocator::new(a, "output"), &PortLocator::new(b, "ampl"))
        .unwrap();
    let before = s.graph.export();

    let json = r#"{"n1": {"diagram_position": {"x": 0, "y": 0}, "type": "doesnotexist"}}"#;
    let err = s.graph.import_json(json, &s.registry).unwrap_err();

    assert!(matches!(err, GraphError::UnknownTemplate(ref t) if t == "doesnotexist"));
    assert_eq!(s.graph.export(), before);
    assert_eq!(s.graph.connection_count(), 1);
}
