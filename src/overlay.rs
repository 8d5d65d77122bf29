//! Text overlays: translated text boxes anchored to the background image by
//! normalised ratios, with optional opaque covers over the source lettering.

use egui::{Pos2, Rect, Vec2};

use crate::scene::EntityId;
use crate::transform::BackgroundLayer;

pub const MIN_FONT_SIZE: f32 = 12.0;
pub const MAX_FONT_SIZE: f32 = 36.0;
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Grab radius around a corner handle, surface px.
pub const HANDLE_RADIUS: f32 = 6.0;
/// Smallest box a corner drag can produce, surface px.
pub const MIN_OVERLAY_SIZE: f32 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub const BLACK: Color4 = Color4 { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color4 = Color4 { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub fn to_egui(&self) -> egui::Color32 {
        let [r, g, b, a] = self.to_rgba8();
        egui::Color32::from_rgba_unmultiplied(r, g, b, a)
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        Self {
            r: rgb[0],
            g: rgb[1],
            b: rgb[2],
            a: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub color: Color4,
    pub cover_color: Color4,
    pub align: TextAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            color: Color4::BLACK,
            cover_color: Color4::WHITE,
            align: TextAlign::Center,
        }
    }
}

/// OCR + translation result for one selection, bounds in image space.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationRecord {
    pub id: String,
    pub original_text: String,
    pub translated_text: String,
    pub bounds: Rect,
}

/// Position and size as fractions of the original image, plus the font size
/// as a fraction of the rendering-surface width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RelativePosition {
    pub left_ratio: f32,
    pub top_ratio: f32,
    pub width_ratio: f32,
    pub height_ratio: f32,
    pub font_size_ratio: f32,
}

/// Opaque rectangle hiding the source lettering. Kept in image space so it
/// always tracks the current background layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cover {
    pub image_bounds: Rect,
    pub color: Color4,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextOverlay {
    pub source_id: String,
    pub original_text: String,
    pub content: String,
    /// Rendering-surface space; always re-derived from `relative`.
    pub bounds: Rect,
    pub font_size: f32,
    pub style: TextStyle,
    pub relative: RelativePosition,
    pub cover: Option<Cover>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    pub fn of(self, rect: Rect) -> Pos2 {
        match self {
            Corner::TopLeft => rect.left_top(),
            Corner::TopRight => rect.right_top(),
            Corner::BottomLeft => rect.left_bottom(),
            Corner::BottomRight => rect.right_bottom(),
        }
    }

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayHit {
    Handle(Corner),
    Body,
}

impl TextOverlay {
    pub fn from_record(
        record: &TranslationRecord,
        style: &TextStyle,
        layer: &BackgroundLayer,
        with_cover: bool,
    ) -> Self {
        let (ow, oh) = (layer.original_width.max(1) as f32, layer.original_height.max(1) as f32);
        let b = record.bounds;
        let relative = RelativePosition {
            left_ratio: b.min.x / ow,
            top_ratio: b.min.y / oh,
            width_ratio: b.width() / ow,
            height_ratio: b.height() / oh,
            font_size_ratio: style.font_size / layer.surface_size().x.max(1.0),
        };
        let mut overlay = Self {
            source_id: record.id.clone(),
            original_text: record.original_text.clone(),
            content: record.translated_text.clone(),
            bounds: layer.rect_to_canvas_space(b),
            font_size: style.font_size,
            style: style.clone(),
            relative,
            cover: with_cover.then_some(Cover {
                image_bounds: b,
                color: style.cover_color,
            }),
        };
        overlay.reanchor(layer);
        overlay
    }

    /// Re-derive surface bounds and font size from the stored ratios.
    pub fn reanchor(&mut self, layer: &BackgroundLayer) {
        let surface = layer.surface_size();
        let pos = layer.display_position;
        let r = self.relative;
        let min = egui::pos2(pos.x + r.left_ratio * surface.x, pos.y + r.top_ratio * surface.y);
        let size = egui::vec2(r.width_ratio * surface.x, r.height_ratio * surface.y);
        self.bounds = Rect::from_min_size(min, size);
        self.font_size = (surface.x * r.font_size_ratio).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    }

    /// Recompute position/size ratios after the surface bounds were edited.
    fn refresh_ratios(&mut self, layer: &BackgroundLayer) {
        let surface = layer.surface_size();
        let (sw, sh) = (surface.x.max(f32::EPSILON), surface.y.max(f32::EPSILON));
        let offset = self.bounds.min - layer.display_position;
        self.relative.left_ratio = offset.x / sw;
        self.relative.top_ratio = offset.y / sh;
        self.relative.width_ratio = self.bounds.width() / sw;
        self.relative.height_ratio = self.bounds.height() / sh;
    }

    pub fn translate(&mut self, delta: Vec2, layer: &BackgroundLayer) {
        self.bounds = self.bounds.translate(delta);
        self.refresh_ratios(layer);
    }

    /// Drag `corner` to `pointer`, keeping the opposite corner fixed.
    pub fn resize(&mut self, corner: Corner, pointer: Pos2, layer: &BackgroundLayer) {
        let anchor = corner.opposite().of(self.bounds);
        let mut dx = pointer.x - anchor.x;
        let mut dy = pointer.y - anchor.y;
        if dx.abs() < MIN_OVERLAY_SIZE {
            dx = if dx < 0.0 { -MIN_OVERLAY_SIZE } else { MIN_OVERLAY_SIZE };
        }
        if dy.abs() < MIN_OVERLAY_SIZE {
            dy = if dy < 0.0 { -MIN_OVERLAY_SIZE } else { MIN_OVERLAY_SIZE };
        }
        self.bounds = Rect::from_two_pos(anchor, anchor + egui::vec2(dx, dy));
        self.refresh_ratios(layer);
        self.font_size =
            (layer.surface_size().x * self.relative.font_size_ratio).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
    }

    /// Handles are only offered when `with_handles` (the overlay is active).
    pub fn hit(&self, p: Pos2, with_handles: bool) -> Option<OverlayHit> {
        if with_handles {
            for corner in Corner::ALL {
                if (corner.of(self.bounds) - p).length() <= HANDLE_RADIUS {
                    return Some(OverlayHit::Handle(corner));
                }
            }
        }
        self.bounds.contains(p).then_some(OverlayHit::Body)
    }

    pub fn image_bounds(&self, layer: &BackgroundLayer) -> Rect {
        layer.rect_to_image_space(self.bounds)
    }
}

/// Pointer gesture currently driving an overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum OverlayGesture {
    #[default]
    None,
    Drag { id: EntityId, last: Pos2 },
    Resize { id: EntityId, corner: Corner },
}

/// Which overlay is selected, which one is in text-edit mode, and what the
/// pointer is doing to it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OverlayFocus {
    pub active: Option<EntityId>,
    pub editing: Option<EntityId>,
    pub gesture: OverlayGesture,
}

impl OverlayFocus {
    /// Drop every reference to `id`.
    pub fn forget(&mut self, id: EntityId) {
        if self.active == Some(id) {
            self.active = None;
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        match self.gesture {
            OverlayGesture::Drag { id: g, .. } | OverlayGesture::Resize { id: g, .. } if g == id => {
                self.gesture = OverlayGesture::None;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TranslationRecord {
        TranslationRecord {
            id: "1".into(),
            original_text: "こんにちは".into(),
            translated_text: "Hello".into(),
            bounds: Rect::from_min_size(egui::pos2(100.0, 200.0), egui::vec2(300.0, 150.0)),
        }
    }

    fn near(a: Pos2, b: Pos2) -> bool {
        (a - b).length() < 1e-3
    }

    fn layer(scale: f32) -> BackgroundLayer {
        BackgroundLayer {
            original_width: 1000,
            original_height: 1500,
            display_scale: scale,
            display_position: Pos2::ZERO,
        }
    }

    #[test]
    fn creation_maps_to_canvas_and_stores_ratios() {
        let l = layer(0.5);
        let o = TextOverlay::from_record(&record(), &TextStyle::default(), &l, true);
        assert!(near(o.bounds.min, egui::pos2(50.0, 100.0)));
        assert!((o.bounds.width() - 150.0).abs() < 1e-3);
        assert!((o.relative.left_ratio - 0.1).abs() < 1e-6);
        assert!((o.relative.top_ratio - 200.0 / 1500.0).abs() < 1e-6);
        assert!((o.relative.font_size_ratio - 16.0 / 500.0).abs() < 1e-6);
        assert!((o.font_size - 16.0).abs() < 1e-3);
        assert_eq!(o.cover.map(|c| c.image_bounds), Some(record().bounds));
    }

    #[test]
    fn reanchor_follows_layer_changes_and_clamps_font() {
        let mut o = TextOverlay::from_record(&record(), &TextStyle::default(), &layer(0.5), false);
        o.reanchor(&layer(1.0));
        assert!(near(o.bounds.min, egui::pos2(100.0, 200.0)));
        assert!((o.bounds.width() - 300.0).abs() < 1e-3);
        assert!((o.font_size - 32.0).abs() < 1e-3);

        o.reanchor(&layer(2.0));
        assert_eq!(o.font_size, MAX_FONT_SIZE);
        o.reanchor(&layer(0.1));
        assert_eq!(o.font_size, MIN_FONT_SIZE);
    }

    #[test]
    fn moved_overlay_survives_reanchor() {
        let l = layer(0.5);
        let mut o = TextOverlay::from_record(&record(), &TextStyle::default(), &l, false);
        o.translate(egui::vec2(10.0, -20.0), &l);
        let moved = o.bounds;
        o.reanchor(&layer(1.0));
        o.reanchor(&l);
        assert!((o.bounds.min - moved.min).length() < 1e-3);
        assert!((o.bounds.max - moved.max).length() < 1e-3);
    }

    #[test]
    fn corner_resize_keeps_opposite_corner() {
        let l = layer(0.5);
        let mut o = TextOverlay::from_record(&record(), &TextStyle::default(), &l, false);
        let fixed = o.bounds.left_top();
        o.resize(Corner::BottomRight, egui::pos2(400.0, 300.0), &l);
        assert!(near(o.bounds.left_top(), fixed));
        assert!(near(o.bounds.right_bottom(), egui::pos2(400.0, 300.0)));

        // Collapsing past the anchor still leaves a usable box.
        o.resize(Corner::BottomRight, fixed, &l);
        assert!((o.bounds.width() - MIN_OVERLAY_SIZE).abs() < 1e-3);
        assert!((o.bounds.height() - MIN_OVERLAY_SIZE).abs() < 1e-3);
    }

    #[test]
    fn handles_only_hit_when_requested() {
        let o = TextOverlay::from_record(&record(), &TextStyle::default(), &layer(0.5), false);
        let corner = o.bounds.right_bottom();
        assert_eq!(o.hit(corner, true), Some(OverlayHit::Handle(Corner::BottomRight)));
        assert_eq!(o.hit(corner, false), Some(OverlayHit::Body));
        assert_eq!(o.hit(egui::pos2(0.0, 0.0), true), None);
    }
}
