// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for graph editing, import and configuration.

use crate::node::NodeId;
use crate::port::PortLocator;
use std::path::PathBuf;

/// User-visible failure of a graph operation
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Creation requested for a type the registry does not know
    #[error("Unknown node template: {0}")]
    UnknownTemplate(String),

    /// Import document rejected before it replaced the live graph
    #[error("Malformed graph document: {0}")]
    MalformedDocument(#[from] DocumentError),
}

/// Reason an import document was rejected
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Not valid JSON, or required fields (`type`, `diagram_position`) missing
    #[error("invalid document: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry has the wrong shape for the field or port it names
    #[error("node {node:?}: entry {key:?} {reason}")]
    InvalidEntry {
        /// Document key of the node
        node: String,
        /// Offending entry key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// A connection refers to a node key that is not in the document
    #[error("node {node:?}: port {port:?} refers to unknown node {reference:?}")]
    UnresolvedNode {
        /// Document key of the node holding the reference
        node: String,
        /// Input port holding the reference
        port: String,
        /// Node key that could not be resolved
        reference: String,
    },

    /// A connection refers to a port its node does not have
    #[error("node {node:?} has no port {port:?}")]
    UnknownPort {
        /// Document key of the node
        node: String,
        /// Port that does not exist
        port: String,
    },

    /// A connection joins two ports of the same kind
    #[error("cannot connect {from} to {to}: ports are of the same kind")]
    IncompatiblePorts {
        /// Referenced endpoint
        from: PortLocator,
        /// Input port holding the reference
        to: PortLocator,
    },
}

/// Template that cannot be registered
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A field or input port uses a key the document format reserves
    #[error("template {template:?}: {key:?} is a reserved document key")]
    ReservedKey {
        /// Template tag
        template: String,
        /// Offending key
        key: String,
    },

    /// Two fields or ports share an ID
    #[error("template {template:?}: {key:?} is declared more than once")]
    DuplicateKey {
        /// Template tag
        template: String,
        /// Offending key
        key: String,
    },

    /// The RON text could not be parsed
    #[error("invalid template list: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Error when creating a permanent connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(PortLocator),

    /// Both ports are inputs or both are outputs
    #[error("Incompatible ports: {0} and {1}")]
    IncompatiblePorts(PortLocator, PortLocator),
}

/// Error loading or saving editor configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("config file {path:?}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The RON text could not be parsed
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The configuration could not be written as RON
    #[error("could not serialize config: {0}")]
    Serialize(#[from] ron::Error),
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
