use egui::{Pos2, Rect};

use crate::transform::BackgroundLayer;

/// Drags must exceed this on both axes (surface px) to become a region.
pub const MIN_SELECTION_SIZE: f32 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SelectionRegion {
    pub id: u32,
    /// Rendering-surface space, always normalised.
    pub bounds: Rect,
    pub highlighted: bool,
}

/// A region projected into original-image pixels, ready for OCR.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageSelection {
    pub id: u32,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ImageSelection {
    pub fn project(region: &SelectionRegion, layer: &BackgroundLayer) -> Self {
        let r = layer.rect_to_image_space(region.bounds);
        Self {
            id: region.id,
            left: r.min.x,
            top: r.min.y,
            width: r.width(),
            height: r.height(),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(egui::pos2(self.left, self.top), egui::vec2(self.width, self.height))
    }
}

/// Rectangle drag between pointer-down and pointer-up.
#[derive(Clone, Copy, Debug)]
pub struct SelectionDrag {
    start: Pos2,
    current: Pos2,
}

impl SelectionDrag {
    pub fn begin(p: Pos2) -> Self {
        Self { start: p, current: p }
    }

    pub fn update(&mut self, p: Pos2) {
        self.current = p;
    }

    /// Normalised regardless of drag direction.
    pub fn bounds(&self) -> Rect {
        Rect::from_two_pos(self.start, self.current)
    }

    /// Bounds to commit, or `None` when the drag was too small.
    pub fn finish(self, end: Pos2) -> Option<Rect> {
        let rect = Rect::from_two_pos(self.start, end);
        (rect.width() > MIN_SELECTION_SIZE && rect.height() > MIN_SELECTION_SIZE).then_some(rect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_normalised_for_any_direction() {
        let mut drag = SelectionDrag::begin(egui::pos2(100.0, 80.0));
        drag.update(egui::pos2(40.0, 20.0));
        let r = drag.bounds();
        assert_eq!(r.min, egui::pos2(40.0, 20.0));
        assert_eq!(r.max, egui::pos2(100.0, 80.0));
        assert_eq!(drag.finish(egui::pos2(40.0, 20.0)), Some(r));
    }

    #[test]
    fn small_drags_are_discarded() {
        let drag = SelectionDrag::begin(egui::pos2(10.0, 10.0));
        assert_eq!(drag.finish(egui::pos2(15.0, 40.0)), None);
        assert_eq!(drag.finish(egui::pos2(40.0, 15.0)), None);
        assert!(drag.finish(egui::pos2(15.5, 15.5)).is_some());
    }

    #[test]
    fn projection_goes_through_the_background_layer() {
        let layer = BackgroundLayer {
            original_width: 1000,
            original_height: 1000,
            display_scale: 0.5,
            display_position: Pos2::ZERO,
        };
        let region = SelectionRegion {
            id: 3,
            bounds: Rect::from_min_max(egui::pos2(10.0, 20.0), egui::pos2(60.0, 120.0)),
            highlighted: false,
        };
        let sel = ImageSelection::project(&region, &layer);
        assert_eq!(sel.id, 3);
        assert_eq!((sel.left, sel.top, sel.width, sel.height), (20.0, 40.0, 100.0, 200.0));
    }
}
