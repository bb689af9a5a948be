// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editor configuration: node geometry and interaction settings.
//!
//! Stored as RON. Every field has a default, so a config file only needs
//! to name what it overrides.

use crate::error::ConfigError;
use crate::port::PortDirection;
use egui::{Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Geometry of an instantiated node, in graph-local units
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeLayout {
    /// Node body width
    pub width: f32,
    /// Height of the header strip (the drag handle)
    pub header_height: f32,
    /// Width of the close button at the right end of the header
    pub close_button_width: f32,
    /// Vertical position of the first port
    pub port_top: f32,
    /// Vertical distance between ports
    pub port_spacing: f32,
    /// Port hit radius
    pub port_radius: f32,
    /// Horizontal position of config field boxes
    pub field_x: f32,
    /// Vertical position of the first config field box
    pub field_top: f32,
    /// Vertical distance between config fields
    pub field_spacing: f32,
    /// Config field box width
    pub field_width: f32,
    /// Config field box height
    pub field_height: f32,
    /// Horizontal Bézier control offset of output ports (inputs use the negation)
    pub anchor_offset: f32,
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self {
            width: 96.0,
            header_height: 16.0,
            close_button_width: 12.0,
            port_top: 32.0,
            port_spacing: 16.0,
            port_radius: 4.0,
            field_x: 40.0,
            field_top: 32.0,
            field_spacing: 32.0,
            field_width: 44.0,
            field_height: 16.0,
            anchor_offset: 50.0,
        }
    }
}

impl NodeLayout {
    /// Position of the `index`-th port of the given direction, relative to the node origin
    pub fn port_offset(&self, direction: PortDirection, index: usize) -> Vec2 {
        let y = self.port_top + self.port_spacing * index as f32;
        match direction {
            PortDirection::Input => Vec2::new(0.0, y),
            PortDirection::Output => Vec2::new(self.width, y),
        }
    }

    /// Bézier control offset for a port of the given direction
    pub fn anchor_dx(&self, direction: PortDirection) -> f32 {
        match direction {
            PortDirection::Input => -self.anchor_offset,
            PortDirection::Output => self.anchor_offset,
        }
    }

    /// Body size of a node with the given port and field counts
    pub fn node_size(&self, inputs: usize, outputs: usize, fields: usize) -> Vec2 {
        let content = (self.field_spacing * fields as f32)
            .max(self.port_spacing * inputs as f32)
            .max(self.port_spacing * outputs as f32);
        Vec2::new(self.width, self.port_top + content)
    }

    /// Header strip, relative to the node origin
    pub fn header_rect(&self) -> Rect {
        Rect::from_min_size(Pos2::ZERO, Vec2::new(self.width, self.header_height))
    }

    /// Close button, relative to the node origin
    pub fn close_button_rect(&self) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.width - self.close_button_width, 0.0),
            Vec2::new(self.close_button_width, self.header_height),
        )
    }

    /// Editing box of the `index`-th config field, relative to the node origin
    pub fn field_rect(&self, index: usize) -> Rect {
        Rect::from_min_size(
            Pos2::new(self.field_x, self.field_top + self.field_spacing * index as f32),
            Vec2::new(self.field_width, self.field_height),
        )
    }
}

/// Editor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Node geometry
    pub layout: NodeLayout,
    /// Radius of the close button drawn at a connection's midpoint
    pub connection_close_radius: f32,
    /// Grid size that dragged and dropped nodes snap to, if any
    pub snap_to_grid: Option<f32>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            layout: NodeLayout::default(),
            connection_close_radius: 6.0,
            snap_to_grid: None,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Serialize the configuration as pretty RON
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let config = ron::ser::PrettyConfig::default()
            .depth_limit(3)
            .separate_tuple_members(true);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron_str(&content)?;
        tracing::debug!("Loaded editor config from {:?}", path);
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_ron_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Snap a graph-local position to the configured grid
    pub fn snap(&self, position: Pos2) -> Pos2 {
        match self.snap_to_grid {
            Some(size) if size > 0.0 => Pos2::new(
                (position.x / size).round() * size,
                (position.y / size).round() * size,
            ),
            _ => position,
        }
    }
}
