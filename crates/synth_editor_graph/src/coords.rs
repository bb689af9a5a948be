// SPDX-License-Identifier: MIT OR Apache-2.0
//! Mapping between screen space and graph-local space.
//!
//! Only axis-aligned scale and translation are supported; rotation and
//! skew never occur in the editor's visual tree.

use egui::{Pos2, Vec2};

/// Affine transform from a local space to screen space (`screen = local * scale + translation`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenTransform {
    /// Per-axis scale (`a`, `d`). Must be non-zero.
    pub scale: Vec2,
    /// Translation (`e`, `f`)
    pub translation: Vec2,
}

impl ScreenTransform {
    /// The identity transform
    pub const IDENTITY: Self = Self {
        scale: Vec2::new(1.0, 1.0),
        translation: Vec2::ZERO,
    };

    /// Create a transform from its matrix coefficients
    pub fn new(a: f32, d: f32, e: f32, f: f32) -> Self {
        Self {
            scale: Vec2::new(a, d),
            translation: Vec2::new(e, f),
        }
    }

    /// Transform of a canvas panned by `pan` (graph units), zoomed by `zoom`,
    /// whose top-left corner sits at `origin` on screen
    pub fn from_pan_zoom(pan: Vec2, zoom: f32, origin: Pos2) -> Self {
        Self {
            scale: Vec2::splat(zoom),
            translation: pan * zoom + origin.to_vec2(),
        }
    }

    /// Compose a transform nested inside `parent`: the result maps this
    /// transform's local space straight to the parent's screen space
    pub fn then(self, parent: ScreenTransform) -> Self {
        Self {
            scale: self.scale * parent.scale,
            translation: self.translation * parent.scale + parent.translation,
        }
    }

    /// Collapse a chain of transforms, outermost first
    pub fn nested(chain: impl IntoIterator<Item = ScreenTransform>) -> Self {
        chain
            .into_iter()
            .fold(Self::IDENTITY, |outer, inner| inner.then(outer))
    }

    /// Map a screen position into local coordinates
    pub fn to_local(&self, screen: Pos2) -> Pos2 {
        Pos2::new(
            (screen.x - self.translation.x) / self.scale.x,
            (screen.y - self.translation.y) / self.scale.y,
        )
    }

    /// Map a local position onto the screen
    pub fn to_screen(&self, local: Pos2) -> Pos2 {
        Pos2::new(
            local.x * self.scale.x + self.translation.x,
            local.y * self.scale.y + self.translation.y,
        )
    }

    /// Map a screen-space displacement into local units
    pub fn vector_to_local(&self, delta: Vec2) -> Vec2 {
        delta / self.scale
    }
}

impl Default for ScreenTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Map a pointer position into the local space of `transform`
pub fn to_local(pointer: Pos2, transform: &ScreenTransform) -> Pos2 {
    transform.to_local(pointer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_local_inverts_scale_and_translation() {
        let t = ScreenTransform::new(2.0, 4.0, 10.0, 20.0);
        assert_eq!(to_local(Pos2::new(30.0, 60.0), &t), Pos2::new(10.0, 10.0));
        assert_eq!(t.to_screen(Pos2::new(10.0, 10.0)), Pos2::new(30.0, 60.0));
    }

    #[test]
    fn test_nested_transforms() {
        let page = ScreenTransform::new(1.0, 1.0, 100.0, 50.0);
        let canvas = ScreenTransform::new(2.0, 2.0, 5.0, 5.0);
        let combined = ScreenTransform::nested([page, canvas]);
        assert_eq!(combined, canvas.then(page));

        let local = Pos2::new(3.0, 7.0);
        let by_steps = page.to_screen(canvas.to_screen(local));
        assert_eq!(combined.to_screen(local), by_steps);
        assert_eq!(combined.to_local(by_steps), local);
    }

    #[test]
    fn test_pan_zoom() {
        let t = ScreenTransform::from_pan_zoom(Vec2::new(10.0, 0.0), 2.0, Pos2::new(5.0, 5.0));
        assert_eq!(t.to_screen(Pos2::ZERO), Pos2::new(25.0, 5.0));
        assert_eq!(t.vector_to_local(Vec2::new(4.0, 2.0)), Vec2::new(2.0, 1.0));
    }
}
