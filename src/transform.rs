//! Background layer placement and the rendering-surface ↔ image-space mapping.
//!
//! Pointer positions handed to the engine are already in rendering-surface
//! space (viewport zoom/pan undone by [`crate::viewport::Viewport`]), so the
//! transforms here only undo the background layer's own placement and scale.

use egui::{Pos2, Rect, Vec2};

/// Fraction of the container the fitted image may occupy.
pub const FIT_MARGIN: f32 = 0.95;

/// Smallest scale we ever produce; keeps the mapping invertible for
/// degenerate containers (minimised window, zero-sized panel).
const MIN_SCALE: f32 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundLayer {
    pub original_width: u32,
    pub original_height: u32,
    pub display_scale: f32,
    /// Top-left of the image in rendering-surface space.
    pub display_position: Pos2,
}

impl BackgroundLayer {
    /// Fit an image of `original` pixel size into `container`.
    ///
    /// The rendering surface is sized to exactly the scaled image (see
    /// [`Self::surface_size`]) so the image sits at the surface origin and no
    /// surface coordinate can fall outside it.
    pub fn fit(original: (u32, u32), container: Vec2) -> Self {
        let (w, h) = (original.0.max(1) as f32, original.1.max(1) as f32);
        let scale = ((container.x / w).min(container.y / h) * FIT_MARGIN).max(MIN_SCALE);
        Self {
            original_width: original.0,
            original_height: original.1,
            display_scale: scale,
            display_position: Pos2::ZERO,
        }
    }

    /// Size of the rendering surface: the displayed image, nothing more.
    pub fn surface_size(&self) -> Vec2 {
        egui::vec2(
            self.original_width as f32 * self.display_scale,
            self.original_height as f32 * self.display_scale,
        )
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.original_width, self.original_height)
    }

    pub fn to_image_space(&self, p: Pos2) -> Pos2 {
        ((p - self.display_position) / self.display_scale).to_pos2()
    }

    pub fn to_canvas_space(&self, q: Pos2) -> Pos2 {
        self.display_position + q.to_vec2() * self.display_scale
    }

    pub fn rect_to_image_space(&self, r: Rect) -> Rect {
        Rect::from_min_max(self.to_image_space(r.min), self.to_image_space(r.max))
    }

    pub fn rect_to_canvas_space(&self, r: Rect) -> Rect {
        Rect::from_min_max(self.to_canvas_space(r.min), self.to_canvas_space(r.max))
    }

    /// Carry a surface point laid out against `self` over to `next`.
    pub fn reproject(&self, next: &BackgroundLayer, p: Pos2) -> Pos2 {
        let q = self.to_image_space(p);
        // Image-space coordinates are normalised so a replacement bitmap with
        // different dimensions keeps annotations over the same relative area.
        let s = self.image_ratio(next);
        next.to_canvas_space(egui::pos2(q.x * s.x, q.y * s.y))
    }

    /// Per-axis ratio of original dimensions between `next` and `self`.
    pub fn image_ratio(&self, next: &BackgroundLayer) -> Vec2 {
        egui::vec2(
            next.original_width.max(1) as f32 / self.original_width.max(1) as f32,
            next.original_height.max(1) as f32 / self.original_height.max(1) as f32,
        )
    }

    /// Carry an image-space rectangle over to `next`'s bitmap.
    pub fn rescale_image_rect(&self, next: &BackgroundLayer, r: Rect) -> Rect {
        let s = self.image_ratio(next);
        Rect::from_min_max(
            egui::pos2(r.min.x * s.x, r.min.y * s.y),
            egui::pos2(r.max.x * s.x, r.max.y * s.y),
        )
    }

    /// Ratio of surface lengths between `next` and `self`.
    pub fn length_ratio(&self, next: &BackgroundLayer) -> f32 {
        next.display_scale * self.image_ratio(next).x / self.display_scale
    }
}
