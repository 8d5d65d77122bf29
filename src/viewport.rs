use egui::{Pos2, Vec2};

pub const MIN_ZOOM: f32 = 0.5;
pub const MAX_ZOOM: f32 = 4.0;

const ZOOM_OUT_STEP: f32 = 0.95;
const ZOOM_IN_STEP: f32 = 1.05;

/// Zoom/pan applied on top of the rendering surface.
///
/// Screen positions are expressed relative to the surface's unzoomed origin on
/// screen ("local" positions); `surface = (local - pan) / zoom`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    zoom: f32,
    pan: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan
    }

    /// One wheel notch of zoom anchored at `pointer` (local position).
    /// Positive `wheel_delta` zooms out. Returns false when clamping left the
    /// zoom where it was.
    pub fn zoom_at(&mut self, pointer: Pos2, wheel_delta: f32) -> bool {
        let step = if wheel_delta > 0.0 { ZOOM_OUT_STEP } else { ZOOM_IN_STEP };
        let new_zoom = (self.zoom * step).clamp(MIN_ZOOM, MAX_ZOOM);
        if new_zoom == self.zoom {
            return false;
        }
        let anchor = self.local_to_surface(pointer);
        self.zoom = new_zoom;
        self.pan = pointer.to_vec2() - anchor.to_vec2() * new_zoom;
        true
    }

    /// Panning is deliberately unbounded.
    pub fn pan(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn local_to_surface(&self, local: Pos2) -> Pos2 {
        ((local.to_vec2() - self.pan) / self.zoom).to_pos2()
    }

    pub fn surface_to_local(&self, surface: Pos2) -> Pos2 {
        (surface.to_vec2() * self.zoom + self.pan).to_pos2()
    }
}
