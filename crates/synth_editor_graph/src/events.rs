// SPDX-License-Identifier: MIT OR Apache-2.0
//! Notifications for the rendering layer.
//!
//! The graph queues one event per visible change; a renderer drains the
//! queue with [`Graph::drain_events`](crate::graph::Graph::drain_events)
//! and mirrors it into its scene. Events never feed back into the model.

use crate::connection::{BezierPath, ConnectionId};
use crate::node::NodeId;
use crate::port::PortLocator;
use egui::Pos2;

/// A change the renderer should reflect
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    /// A node was instantiated
    NodeCreated {
        /// New node
        node: NodeId,
        /// Its template tag
        node_type: String,
        /// Where it was placed
        position: Pos2,
    },
    /// A node was moved
    NodeMoved {
        /// Moved node
        node: NodeId,
        /// New position
        position: Pos2,
    },
    /// A node was deleted (its connections are removed first)
    NodeRemoved {
        /// Deleted node
        node: NodeId,
    },
    /// A config field changed value
    FieldChanged {
        /// Owning node
        node: NodeId,
        /// Field ID
        field: String,
        /// New value
        value: String,
    },
    /// A permanent connection was committed
    ConnectionCreated {
        /// New connection
        connection: ConnectionId,
        /// Output end
        source: PortLocator,
        /// Input end
        target: PortLocator,
    },
    /// A connection's path was recomputed (including the provisional one)
    ConnectionPathChanged {
        /// Connection
        connection: ConnectionId,
        /// New path, in graph-local coordinates
        path: BezierPath,
    },
    /// A connection was removed (including the provisional one)
    ConnectionRemoved {
        /// Removed connection
        connection: ConnectionId,
    },
    /// The whole graph was replaced by an import; rebuild the scene
    GraphReplaced,
}
