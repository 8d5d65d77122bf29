use std::io::Cursor;

use ab_glyph::FontArc;
use egui::{Pos2, Rect};
use image::{EncodableLayout, ImageBuffer, ImageFormat, Pixel, PixelWithColorType, Rgba, RgbaImage};

use crate::error::Result;
use crate::overlay::TextOverlay;
use crate::text_layout::{self, FixedMetrics, GlyphMetrics};
use crate::transform::BackgroundLayer;

/// Stamp a thick polyline with round caps and joins. Pixels whose centre is
/// within `width / 2` of any segment are set to `value`; nothing is blended,
/// so a binary target stays binary.
pub fn stroke_polyline<P: Pixel>(
    img: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    points: &[Pos2],
    width: f32,
    value: P,
) {
    let radius = (width * 0.5).max(0.5);
    match points {
        [] => {}
        [only] => fill_capsule(img, *only, *only, radius, value),
        _ => {
            for pair in points.windows(2) {
                fill_capsule(img, pair[0], pair[1], radius, value);
            }
        }
    }
}

fn fill_capsule<P: Pixel>(
    img: &mut ImageBuffer<P, Vec<P::Subpixel>>,
    a: Pos2,
    b: Pos2,
    radius: f32,
    value: P,
) {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let min_x = ((a.x.min(b.x) - radius).floor() as i64).max(0);
    let min_y = ((a.y.min(b.y) - radius).floor() as i64).max(0);
    let max_x = ((a.x.max(b.x) + radius).ceil() as i64).min(w - 1);
    let max_y = ((a.y.max(b.y) + radius).ceil() as i64).min(h - 1);
    if min_x > max_x || min_y > max_y {
        return;
    }

    let ab = b - a;
    let len_sq = ab.length_sq();
    let r_sq = radius * radius;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = egui::pos2(x as f32 + 0.5, y as f32 + 0.5);
            let t = if len_sq > 0.0 {
                ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = a + ab * t;
            if (p - closest).length_sq() <= r_sq {
                img.put_pixel(x as u32, y as u32, value);
            }
        }
    }
}

/// Fill an image-space rectangle, clipped to the image.
pub fn fill_rect(img: &mut RgbaImage, rect: Rect, color: [u8; 4]) {
    let x0 = rect.min.x.round().max(0.0) as u32;
    let y0 = rect.min.y.round().max(0.0) as u32;
    let x1 = (rect.max.x.round().max(0.0) as u32).min(img.width());
    let y1 = (rect.max.y.round().max(0.0) as u32).min(img.height());
    for y in y0..y1 {
        for x in x0..x1 {
            img.put_pixel(x, y, Rgba(color));
        }
    }
}

/// Flatten background, covers, and overlay text into one bitmap at the
/// original image resolution.
///
/// Covers go down first so an overlay moved off its source region is never
/// hidden by another overlay's cover. Without a font the text is laid out but
/// not drawn.
pub fn flatten_scene<'a>(
    background: &RgbaImage,
    layer: &BackgroundLayer,
    overlays: impl IntoIterator<Item = &'a TextOverlay> + Clone,
    font: Option<&FontArc>,
) -> RgbaImage {
    let mut out = background.clone();
    for overlay in overlays.clone() {
        if let Some(cover) = &overlay.cover {
            fill_rect(&mut out, cover.image_bounds, cover.color.to_rgba8());
        }
    }

    let metrics: &dyn GlyphMetrics = match font {
        Some(f) => f,
        None => &FixedMetrics,
    };
    for overlay in overlays {
        let bounds = overlay.image_bounds(layer);
        let size = overlay.font_size / layer.display_scale;
        let lines = text_layout::wrap_text(metrics, &overlay.content, size, bounds.width());
        match font {
            Some(f) => text_layout::draw_lines(
                &mut out,
                f,
                &lines,
                size,
                bounds,
                overlay.style.align,
                overlay.style.color.to_rgba8(),
            ),
            None => log::debug!(
                "no font configured; skipping {} line(s) of overlay text",
                lines.len()
            ),
        }
    }
    out
}

/// Encode any 8-bit buffer as PNG bytes for upload.
pub fn encode_png<P>(img: &ImageBuffer<P, Vec<P::Subpixel>>) -> Result<Vec<u8>>
where
    P: Pixel + PixelWithColorType,
    [P::Subpixel]: EncodableLayout,
{
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::{TextStyle, TranslationRecord};
    use image::{GrayImage, Luma};

    #[test]
    fn polyline_has_round_caps() {
        let mut img = GrayImage::new(40, 40);
        stroke_polyline(&mut img, &[egui::pos2(10.0, 20.0), egui::pos2(30.0, 20.0)], 10.0, Luma([255]));
        // Inside the cap past the end point.
        assert_eq!(img.get_pixel(33, 20).0[0], 255);
        // Corner of the bounding box is outside the rounded cap.
        assert_eq!(img.get_pixel(34, 24).0[0], 0);
        assert_eq!(img.get_pixel(20, 25).0[0], 0);
        assert_eq!(img.get_pixel(20, 24).0[0], 255);
    }

    #[test]
    fn strokes_outside_the_image_are_clipped() {
        let mut img = GrayImage::new(10, 10);
        stroke_polyline(&mut img, &[egui::pos2(-50.0, -50.0), egui::pos2(-40.0, -40.0)], 8.0, Luma([255]));
        assert!(img.pixels().all(|p| p.0[0] == 0));
        stroke_polyline(&mut img, &[egui::pos2(-5.0, 5.0), egui::pos2(15.0, 5.0)], 2.0, Luma([255]));
        assert_eq!(img.get_pixel(0, 5).0[0], 255);
        assert_eq!(img.get_pixel(9, 5).0[0], 255);
    }

    #[test]
    fn flatten_paints_covers_at_original_resolution() {
        let background = RgbaImage::from_pixel(100, 50, Rgba([10, 20, 30, 255]));
        let layer = BackgroundLayer::fit((100, 50), egui::vec2(50.0, 25.0));
        let record = TranslationRecord {
            id: "1".into(),
            original_text: "元気".into(),
            translated_text: "Fine".into(),
            bounds: Rect::from_min_max(egui::pos2(10.0, 10.0), egui::pos2(30.0, 20.0)),
        };
        let overlay = TextOverlay::from_record(&record, &TextStyle::default(), &layer, true);
        let out = flatten_scene(&background, &layer, [&overlay], None);
        assert_eq!(out.dimensions(), (100, 50));
        assert_eq!(out.get_pixel(15, 15).0, [255, 255, 255, 255]);
        assert_eq!(out.get_pixel(5, 5).0, [10, 20, 30, 255]);
    }

    #[test]
    fn png_encoding_keeps_the_mask_binary() {
        let mut mask = GrayImage::new(8, 8);
        mask.put_pixel(3, 3, Luma([255]));
        let bytes = encode_png(&mask).unwrap();
        let back = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(back, mask);
    }
}
