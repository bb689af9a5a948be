// SPDX-License-Identifier: MIT OR Apache-2.0
//! egui canvas for the graph editor.
//!
//! The canvas is a projection of the [`Graph`]: it paints nodes and
//! connections every frame, turns raw pointer input into
//! [`PointerEvent`]s for the [`DragController`], and edits config fields
//! through [`Graph::set_config_field`]. It never changes the model any
//! other way.

use crate::config::EditorConfig;
use crate::connection::BezierPath;
use crate::coords::ScreenTransform;
use crate::graph::Graph;
use crate::interaction::{DragController, DragSession, Element, LayoutHitTester, PointerEvent};
use crate::node::{Node, NodeId, NodeRegistry, TemplateLookup};
use egui::{Color32, Pos2, Rect, Stroke, Vec2};

const NODE_ROUNDING: f32 = 2.0;
const NODE_SHADOW_OFFSET: f32 = 4.0;
const CONNECTION_THICKNESS: f32 = 1.5;
const CURVE_SEGMENTS: usize = 32;
const GRID_SPACING: f32 = 16.0;

/// Drag-and-drop payload of a palette entry: the template tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteItem(pub String);

/// Interactive graph canvas
pub struct GraphCanvas {
    controller: DragController,
    config: EditorConfig,
    /// Current pan offset (graph space)
    pub pan: Vec2,
    /// Current zoom level
    pub zoom: f32,
    /// Show grid
    pub show_grid: bool,
    last_pointer: Option<Pos2>,
}

impl GraphCanvas {
    /// Create a canvas
    pub fn new(config: EditorConfig) -> Self {
        Self {
            controller: DragController::with_config(config.clone()),
            config,
            pan: Vec2::ZERO,
            zoom: 1.0,
            show_grid: true,
            last_pointer: None,
        }
    }

    /// The drag state machine driven by this canvas
    pub fn controller(&self) -> &DragController {
        &self.controller
    }

    /// Transform used in the last frame
    pub fn transform(&self) -> ScreenTransform {
        *self.controller.transform()
    }

    /// Show the template palette; entries can be dragged onto the canvas
    pub fn palette_ui(&mut self, ui: &mut egui::Ui, registry: &NodeRegistry) {
        for template in registry.templates() {
            let id = egui::Id::new(("palette", template.id.as_str()));
            let response = ui
                .dnd_drag_source(id, PaletteItem(template.id.clone()), |ui| {
                    ui.label(&template.name);
                })
                .response;
            if response.drag_started() {
                self.controller.begin_palette_drag(template.id.clone());
            }
        }
    }

    /// Render the canvas and process this frame's input
    pub fn ui(&mut self, ui: &mut egui::Ui, graph: &mut Graph, registry: &dyn TemplateLookup) {
        let rect = ui.available_rect_before_wrap();
        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        self.handle_view_input(ui, &response, rect);
        let transform = ScreenTransform::from_pan_zoom(self.pan, self.zoom, rect.min);
        self.controller.set_transform(transform);
        self.handle_pointer(ui, rect, graph);
        self.handle_palette_drop(ui, &response, graph, registry);

        for event in graph.drain_events() {
            tracing::trace!(?event, "graph event");
        }

        if self.show_grid {
            self.draw_grid(&painter, rect, &transform);
        }
        self.draw_connections(&painter, graph, &transform);

        let mut edits: Vec<(NodeId, String, String)> = Vec::new();
        for node in graph.nodes() {
            self.draw_node(ui, &painter, graph, node, &transform, &mut edits);
        }
        for (node, field, value) in edits {
            graph.set_config_field(&node, &field, value);
        }

        self.draw_status_bar(&painter, rect, graph);
    }

    fn handle_view_input(&mut self, ui: &egui::Ui, response: &egui::Response, rect: Rect) {
        if response.dragged_by(egui::PointerButton::Middle) {
            self.pan += response.drag_delta() / self.zoom;
        }

        let (hover, scroll) = ui.input(|i| (i.pointer.hover_pos(), i.raw_scroll_delta.y));
        if let Some(pointer) = hover.filter(|p| rect.contains(*p)) {
            if scroll != 0.0 {
                let before = ScreenTransform::from_pan_zoom(self.pan, self.zoom, rect.min).to_local(pointer);
                self.zoom = (self.zoom * (1.0 + scroll * 0.001)).clamp(0.25, 4.0);
                let after = ScreenTransform::from_pan_zoom(self.pan, self.zoom, rect.min).to_local(pointer);
                // keep the point under the pointer fixed
                self.pan += after - before;
            }
        }
    }

    fn element_at(&self, graph: &Graph, screen: Pos2) -> Option<Element> {
        let local = self.controller.transform().to_local(screen);
        LayoutHitTester::new(graph, &self.config).hit_test(local)
    }

    fn handle_pointer(&mut self, ui: &egui::Ui, rect: Rect, graph: &mut Graph) {
        let (hover, pressed, released) = ui.input(|i| {
            (
                i.pointer.hover_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
            )
        });

        match hover.filter(|p| rect.contains(*p)) {
            Some(pos) => {
                if pressed {
                    let target = self.element_at(graph, pos);
                    self.controller.handle(graph, PointerEvent::press(pos, target));
                }
                if self.last_pointer != Some(pos) {
                    let target = self.element_at(graph, pos);
                    self.controller.handle(graph, PointerEvent::moved(pos, target));
                }
                if released {
                    let target = self.element_at(graph, pos);
                    self.controller.handle(graph, PointerEvent::release(pos, target));
                }
                self.last_pointer = Some(pos);
            }
            None => {
                if !self.controller.is_idle() {
                    let pos = self.last_pointer.unwrap_or(rect.min);
                    self.controller.handle(graph, PointerEvent::leave(pos));
                }
                self.last_pointer = None;
            }
        }
    }

    fn handle_palette_drop(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        graph: &mut Graph,
        registry: &dyn TemplateLookup,
    ) {
        if let Some(item) = response.dnd_release_payload::<PaletteItem>() {
            if self.controller.palette_template() != Some(item.0.as_str()) {
                self.controller.begin_palette_drag(item.0.clone());
            }
            let Some(pos) = ui.input(|i| i.pointer.interact_pos()) else {
                self.controller.cancel_palette_drag();
                return;
            };
            if let Err(e) = self.controller.drop_on_canvas(graph, registry, pos) {
                tracing::warn!("Palette drop failed: {e}");
            }
        } else if self.controller.palette_template().is_some()
            && !egui::DragAndDrop::has_any_payload(ui.ctx())
        {
            self.controller.cancel_palette_drag();
        }
    }

    fn draw_grid(&self, painter: &egui::Painter, rect: Rect, transform: &ScreenTransform) {
        let spacing = self.config.snap_to_grid.unwrap_or(GRID_SPACING) * self.zoom;
        if spacing < 4.0 {
            return;
        }
        let color = Color32::from_rgba_unmultiplied(60, 60, 60, 100);
        let origin = transform.to_screen(Pos2::ZERO);

        let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(spacing);
        while x < rect.right() {
            painter.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(1.0, color),
            );
            x += spacing;
        }
        let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(spacing);
        while y < rect.bottom() {
            painter.line_segment(
                [Pos2::new(rect.left(), y), Pos2::new(rect.right(), y)],
                Stroke::new(1.0, color),
            );
            y += spacing;
        }
    }

    fn draw_connections(&self, painter: &egui::Painter, graph: &Graph, transform: &ScreenTransform) {
        for connection in graph.connections() {
            if let Some(path) = graph.connection_path(connection) {
                let path = path.transformed(transform);
                self.draw_curve(painter, &path, Color32::from_gray(20));

                let mid = path.midpoint();
                let radius = self.config.connection_close_radius * self.zoom;
                painter.circle_filled(mid, radius, Color32::WHITE);
                painter.circle_stroke(mid, radius, Stroke::new(1.0, Color32::BLACK));
                painter.text(
                    mid,
                    egui::Align2::CENTER_CENTER,
                    "x",
                    egui::FontId::proportional(9.0 * self.zoom),
                    Color32::BLACK,
                );
            }
        }

        if let DragSession::DraggingConnection { connection } = self.controller.session() {
            if let Some(path) = graph.connection_path(connection) {
                self.draw_curve(painter, &path.transformed(transform), Color32::from_rgb(100, 150, 255));
            }
        }
    }

    fn draw_curve(&self, painter: &egui::Painter, path: &BezierPath, color: Color32) {
        let points = path.sample(CURVE_SEGMENTS);
        for pair in points.windows(2) {
            painter.line_segment([pair[0], pair[1]], Stroke::new(CONNECTION_THICKNESS * self.zoom, color));
        }
    }

    fn draw_node(
        &self,
        ui: &mut egui::Ui,
        painter: &egui::Painter,
        graph: &Graph,
        node: &Node,
        transform: &ScreenTransform,
        edits: &mut Vec<(NodeId, String, String)>,
    ) {
        let layout = graph.layout();
        let origin = node.position();
        let to_screen = |r: Rect| {
            Rect::from_min_max(
                transform.to_screen(origin + r.min.to_vec2()),
                transform.to_screen(origin + r.max.to_vec2()),
            )
        };
        let body = to_screen(Rect::from_min_size(Pos2::ZERO, node.size()));
        if !painter.clip_rect().intersects(body) {
            return;
        }
        let font = |size: f32| egui::FontId::proportional(size * self.zoom);
        let outline = Stroke::new(1.0, Color32::BLACK);

        painter.rect_filled(
            body.translate(Vec2::splat(NODE_SHADOW_OFFSET * self.zoom)),
            NODE_ROUNDING,
            Color32::from_rgba_unmultiplied(0, 0, 0, 76),
        );
        painter.rect_filled(body, NODE_ROUNDING, Color32::WHITE);
        painter.rect_stroke(body, NODE_ROUNDING, outline);

        let header = to_screen(layout.header_rect());
        painter.rect_stroke(header, 0.0, outline);
        painter.text(
            header.left_center() + Vec2::new(4.0 * self.zoom, 0.0),
            egui::Align2::LEFT_CENTER,
            node.name(),
            font(11.0),
            Color32::BLACK,
        );
        painter.text(
            to_screen(layout.close_button_rect()).center(),
            egui::Align2::CENTER_CENTER,
            "x",
            font(11.0),
            Color32::BLACK,
        );

        for port in node.ports() {
            let center = transform.to_screen(origin + port.offset);
            let radius = layout.port_radius * self.zoom;
            painter.circle_filled(center, radius, Color32::WHITE);
            painter.circle_stroke(center, radius, outline);
        }
        for port in node.inputs() {
            painter.text(
                transform.to_screen(origin + port.offset + Vec2::new(8.0, 0.0)),
                egui::Align2::LEFT_CENTER,
                &port.name,
                font(10.0),
                Color32::from_gray(40),
            );
        }

        for (i, (field, value)) in node.fields().enumerate() {
            let field_rect = to_screen(layout.field_rect(i));
            let label = layout.field_rect(i).min;
            painter.text(
                transform.to_screen(origin + label.to_vec2() - Vec2::new(0.0, 2.0)),
                egui::Align2::LEFT_BOTTOM,
                field,
                font(9.0),
                Color32::from_gray(40),
            );

            let mut text = value.to_string();
            let edit = egui::TextEdit::singleline(&mut text)
                .id(egui::Id::new((node.id().as_str(), field)))
                .font(font(10.0))
                .desired_width(field_rect.width());
            if ui.put(field_rect, edit).changed() {
                edits.push((node.id().clone(), field.to_string(), text));
            }
        }
    }

    fn draw_status_bar(&self, painter: &egui::Painter, rect: Rect, graph: &Graph) {
        painter.text(
            Pos2::new(rect.left() + 5.0, rect.bottom() - 10.0),
            egui::Align2::LEFT_CENTER,
            format!(
                "Nodes: {} | Connections: {} | Zoom: {:.0}%",
                graph.node_count(),
                graph.connection_count(),
                self.zoom * 100.0,
            ),
            egui::FontId::proportional(11.0),
            Color32::from_gray(150),
        );
    }
}

impl Default for GraphCanvas {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
