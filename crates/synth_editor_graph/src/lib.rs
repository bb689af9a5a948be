// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph editing engine for the synth editor.
//!
//! This crate provides the model and interaction layer of a visual
//! dataflow editor:
//! - Graph model with typed input/output ports
//! - Connection validation and Bézier routing
//! - Pointer-driven drag state machine
//! - JSON import/export of whole graphs
//!
//! ## Architecture
//!
//! The [`Graph`] is the single source of truth. Mutations queue
//! [`GraphEvent`]s that a renderer drains; the bundled egui
//! [`ui::GraphCanvas`] is one such renderer. Geometry lives in graph-local
//! space and is mapped to the screen through a [`ScreenTransform`].

pub mod catalog;
pub mod config;
pub mod connection;
pub mod coords;
pub mod error;
pub mod events;
pub mod graph;
pub mod interaction;
pub mod node;
pub mod port;
pub mod serialization;
pub mod ui;

pub use catalog::create_synth_registry;
pub use config::{EditorConfig, NodeLayout};
pub use connection::{BezierPath, Connection, ConnectionId, Endpoint};
pub use coords::ScreenTransform;
pub use error::{ConfigError, ConnectionError, DocumentError, GraphError, Result, TemplateError};
pub use events::GraphEvent;
pub use graph::{Graph, InvariantViolation};
pub use interaction::{DragController, DragSession, Element, Hit, LayoutHitTester, PointerEvent};
pub use node::{Node, NodeId, NodeRegistry, NodeTemplate, TemplateLookup};
pub use port::{Port, PortDirection, PortId, PortLocator};
pub use serialization::GraphDocument;
