//! Free-hand mask strokes: capture, brush width, and export to a binary bitmap
//! at the original image resolution.

use egui::{Pos2, Rect};
use image::{GrayImage, Luma};

use crate::error::{AnnotateError, Result};
use crate::raster;
use crate::transform::BackgroundLayer;

pub const MIN_BRUSH_WIDTH: f32 = 5.0;
pub const MAX_BRUSH_WIDTH: f32 = 50.0;
pub const DEFAULT_BRUSH_WIDTH: f32 = 20.0;
const WHEEL_WIDTH_STEP: f32 = 2.0;

/// Subdivisions used when flattening a quadratic segment.
const CURVE_STEPS: usize = 8;

pub const MASK_FILL: Luma<u8> = Luma([255]);
pub const MASK_EMPTY: Luma<u8> = Luma([0]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Pos2),
    LineTo(Pos2),
    QuadTo { ctrl: Pos2, to: Pos2 },
}

/// A committed free-hand stroke in rendering-surface space.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskStroke {
    pub commands: Vec<PathCommand>,
    pub width: f32,
}

impl MaskStroke {
    /// Smooth raw pointer samples into a path: quadratic segments through the
    /// midpoints of consecutive samples, closed off with a straight line to the
    /// final sample.
    pub fn from_points(points: &[Pos2], width: f32) -> Option<Self> {
        let (&first, rest) = points.split_first()?;
        let mut commands = vec![PathCommand::MoveTo(first)];
        if rest.is_empty() {
            commands.push(PathCommand::LineTo(first));
        } else {
            for pair in points.windows(2).skip(1) {
                let mid = pair[0] + (pair[1] - pair[0]) * 0.5;
                commands.push(PathCommand::QuadTo { ctrl: pair[0], to: mid });
            }
            commands.push(PathCommand::LineTo(points[points.len() - 1]));
        }
        Some(Self {
            commands,
            width: width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH),
        })
    }

    /// Flatten the path into a polyline.
    pub fn polyline(&self) -> Vec<Pos2> {
        let mut out = Vec::new();
        let mut cursor = Pos2::ZERO;
        for cmd in &self.commands {
            match *cmd {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => {
                    out.push(p);
                    cursor = p;
                }
                PathCommand::QuadTo { ctrl, to } => {
                    for i in 1..=CURVE_STEPS {
                        let t = i as f32 / CURVE_STEPS as f32;
                        let u = 1.0 - t;
                        let x = u * u * cursor.x + 2.0 * u * t * ctrl.x + t * t * to.x;
                        let y = u * u * cursor.y + 2.0 * u * t * ctrl.y + t * t * to.y;
                        out.push(egui::pos2(x, y));
                    }
                    cursor = to;
                }
            }
        }
        out
    }

    /// Apply `f` to every control and end point.
    pub fn map_points(&mut self, mut f: impl FnMut(Pos2) -> Pos2) {
        for cmd in &mut self.commands {
            match cmd {
                PathCommand::MoveTo(p) | PathCommand::LineTo(p) => *p = f(*p),
                PathCommand::QuadTo { ctrl, to } => {
                    *ctrl = f(*ctrl);
                    *to = f(*to);
                }
            }
        }
    }

    pub fn bounds(&self) -> Rect {
        let mut rect = Rect::NOTHING;
        for p in self.polyline() {
            rect.extend_with(p);
        }
        rect.expand(self.width * 0.5)
    }
}

/// Brush width in rendering-surface pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Brush {
    width: f32,
}

impl Default for Brush {
    fn default() -> Self {
        Self {
            width: DEFAULT_BRUSH_WIDTH,
        }
    }
}

impl Brush {
    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn set_width(&mut self, width: f32) {
        self.width = width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH);
    }

    /// Plain mouse wheel: scrolling up widens the brush.
    pub fn adjust(&mut self, wheel_delta: f32) {
        if wheel_delta == 0.0 {
            return;
        }
        self.set_width(self.width - wheel_delta.signum() * WHEEL_WIDTH_STEP);
    }

    /// Diameter of the cursor preview on screen at the given zoom.
    pub fn cursor_diameter(&self, zoom: f32) -> f32 {
        self.width * zoom
    }
}

/// In-progress stroke between pointer-down and pointer-up.
#[derive(Clone, Debug, Default)]
pub struct StrokeCapture {
    points: Vec<Pos2>,
}

impl StrokeCapture {
    pub fn begin(p: Pos2) -> Self {
        Self { points: vec![p] }
    }

    pub fn extend(&mut self, p: Pos2) {
        if self.points.last() != Some(&p) {
            self.points.push(p);
        }
    }

    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    pub fn finish(self, width: f32) -> Option<MaskStroke> {
        MaskStroke::from_points(&self.points, width)
    }
}

/// Rasterise `strokes` into a black bitmap of the original image size, with
/// every stroke drawn pure white.
pub fn export_mask<'a>(
    layer: &BackgroundLayer,
    strokes: impl IntoIterator<Item = &'a MaskStroke>,
) -> Result<GrayImage> {
    let mut mask = GrayImage::from_pixel(layer.original_width, layer.original_height, MASK_EMPTY);
    let mut drawn = 0usize;
    for stroke in strokes {
        let points: Vec<Pos2> = stroke
            .polyline()
            .into_iter()
            .map(|p| layer.to_image_space(p))
            .collect();
        let width = stroke.width / layer.display_scale;
        raster::stroke_polyline(&mut mask, &points, width, MASK_FILL);
        drawn += 1;
    }
    if drawn == 0 {
        return Err(AnnotateError::NoMask);
    }
    log::debug!(
        "exported mask {}x{} from {} stroke(s)",
        mask.width(),
        mask.height(),
        drawn
    );
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer() -> BackgroundLayer {
        BackgroundLayer::fit((200, 100), egui::vec2(420.0, 210.0))
    }

    #[test]
    fn single_sample_becomes_a_dot() {
        let stroke = MaskStroke::from_points(&[egui::pos2(4.0, 4.0)], 10.0).unwrap();
        assert_eq!(stroke.commands.len(), 2);
        assert_eq!(stroke.polyline(), vec![egui::pos2(4.0, 4.0); 2]);
    }

    #[test]
    fn smoothing_ends_on_last_sample() {
        let pts = [egui::pos2(0.0, 0.0), egui::pos2(10.0, 0.0), egui::pos2(20.0, 10.0)];
        let stroke = MaskStroke::from_points(&pts, 8.0).unwrap();
        assert_eq!(stroke.commands.first(), Some(&PathCommand::MoveTo(pts[0])));
        assert_eq!(stroke.commands.last(), Some(&PathCommand::LineTo(pts[2])));
        assert_eq!(*stroke.polyline().last().unwrap(), pts[2]);
    }

    #[test]
    fn brush_width_is_clamped() {
        let mut brush = Brush::default();
        for _ in 0..100 {
            brush.adjust(-1.0);
        }
        assert_eq!(brush.width(), MAX_BRUSH_WIDTH);
        for _ in 0..100 {
            brush.adjust(1.0);
        }
        assert_eq!(brush.width(), MIN_BRUSH_WIDTH);
        assert_eq!(brush.cursor_diameter(2.0), MIN_BRUSH_WIDTH * 2.0);
    }

    #[test]
    fn export_without_strokes_is_an_input_error() {
        let err = export_mask(&layer(), std::iter::empty()).unwrap_err();
        assert!(matches!(err, AnnotateError::NoMask));
    }

    #[test]
    fn export_is_binary_and_full_resolution() {
        let layer = layer();
        let mut capture = StrokeCapture::begin(egui::pos2(20.0, 20.0));
        capture.extend(egui::pos2(80.0, 60.0));
        capture.extend(egui::pos2(150.0, 30.0));
        let stroke = capture.finish(12.0).unwrap();

        let mask = export_mask(&layer, [&stroke]).unwrap();
        assert_eq!(mask.dimensions(), (200, 100));
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        assert!(mask.pixels().any(|p| p.0[0] == 255));

        // Width is carried over to image space: 12 surface px / scale.
        let start = layer.to_image_space(egui::pos2(20.0, 20.0));
        let half = 12.0 / layer.display_scale / 2.0;
        let x = (start.x - half * 0.8) as u32;
        assert_eq!(mask.get_pixel(x, start.y as u32).0[0], 255);
    }
}
