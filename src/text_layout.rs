//! Deterministic text layout for flattened output.
//!
//! Lines are wrapped greedily on whitespace using per-glyph advances; a word
//! wider than the box (or text with no spaces, as in Japanese) breaks between
//! characters instead.

use ab_glyph::{point, Font, FontArc, ScaleFont};
use egui::Rect;
use image::{Rgba, RgbaImage};

use crate::overlay::TextAlign;

pub trait GlyphMetrics {
    fn advance(&self, ch: char, size: f32) -> f32;
    fn line_height(&self, size: f32) -> f32;
}

/// Font-free metrics: 0.6em for ASCII, a full em for everything else.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedMetrics;

impl GlyphMetrics for FixedMetrics {
    fn advance(&self, ch: char, size: f32) -> f32 {
        if ch.is_ascii() {
            size * 0.6
        } else {
            size
        }
    }

    fn line_height(&self, size: f32) -> f32 {
        size * 1.2
    }
}

impl GlyphMetrics for FontArc {
    fn advance(&self, ch: char, size: f32) -> f32 {
        self.as_scaled(size).h_advance(self.glyph_id(ch))
    }

    fn line_height(&self, size: f32) -> f32 {
        let scaled = self.as_scaled(size);
        scaled.height() + scaled.line_gap()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LaidOutLine {
    pub text: String,
    pub width: f32,
}

fn flush(line: &mut String, width: &mut f32, lines: &mut Vec<LaidOutLine>) {
    lines.push(LaidOutLine {
        text: std::mem::take(line),
        width: *width,
    });
    *width = 0.0;
}

fn measure(metrics: &dyn GlyphMetrics, text: &str, size: f32) -> f32 {
    text.chars().map(|c| metrics.advance(c, size)).sum()
}

/// Wrap `text` into lines no wider than `max_width` (except single glyphs
/// that cannot fit on their own). Explicit newlines are kept.
pub fn wrap_text(metrics: &dyn GlyphMetrics, text: &str, size: f32, max_width: f32) -> Vec<LaidOutLine> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_w = 0.0f32;
        let space_w = metrics.advance(' ', size);

        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(LaidOutLine {
                text: String::new(),
                width: 0.0,
            });
            continue;
        }

        for word in words {
            let word_w = measure(metrics, word, size);
            let needed = if current.is_empty() { word_w } else { current_w + space_w + word_w };
            if needed <= max_width {
                if !current.is_empty() {
                    current.push(' ');
                    current_w += space_w;
                }
                current.push_str(word);
                current_w += word_w;
                continue;
            }
            if !current.is_empty() {
                flush(&mut current, &mut current_w, &mut lines);
            }
            if word_w <= max_width {
                current.push_str(word);
                current_w = word_w;
                continue;
            }
            // Break inside the word.
            for ch in word.chars() {
                let w = metrics.advance(ch, size);
                if current_w + w > max_width && !current.is_empty() {
                    flush(&mut current, &mut current_w, &mut lines);
                }
                current.push(ch);
                current_w += w;
            }
        }
        if !current.is_empty() {
            flush(&mut current, &mut current_w, &mut lines);
        }
    }
    lines
}

/// Draw `lines` into `target`, vertically centred in `bounds` and aligned
/// horizontally per `align`. Coverage is alpha-blended over what is there.
pub fn draw_lines(
    target: &mut RgbaImage,
    font: &FontArc,
    lines: &[LaidOutLine],
    size: f32,
    bounds: Rect,
    align: TextAlign,
    color: [u8; 4],
) {
    let scaled = font.as_scaled(size);
    let line_h = font.line_height(size);
    let block_h = line_h * lines.len() as f32;
    let mut baseline = bounds.min.y + (bounds.height() - block_h).max(0.0) * 0.5 + scaled.ascent();
    let (tw, th) = (target.width() as i32, target.height() as i32);

    for line in lines {
        let mut x = match align {
            TextAlign::Left => bounds.min.x,
            TextAlign::Center => bounds.center().x - line.width * 0.5,
            TextAlign::Right => bounds.max.x - line.width,
        };
        let mut prev = None;
        for ch in line.text.chars() {
            let id = font.glyph_id(ch);
            if let Some(p) = prev {
                x += scaled.kern(p, id);
            }
            let glyph = id.with_scale_and_position(size, point(x, baseline));
            if let Some(outlined) = font.outline_glyph(glyph) {
                let b = outlined.px_bounds();
                outlined.draw(|gx, gy, cov| {
                    let px = b.min.x as i32 + gx as i32;
                    let py = b.min.y as i32 + gy as i32;
                    if px >= 0 && py >= 0 && px < tw && py < th {
                        blend(target.get_pixel_mut(px as u32, py as u32), color, cov);
                    }
                });
            }
            x += scaled.h_advance(id);
            prev = Some(id);
        }
        baseline += line_h;
    }
}

fn blend(dst: &mut Rgba<u8>, color: [u8; 4], coverage: f32) {
    let a = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    for c in 0..3 {
        let v = dst.0[c] as f32 * (1.0 - a) + color[c] as f32 * a;
        dst.0[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    let out_a = dst.0[3] as f32 / 255.0 + a * (1.0 - dst.0[3] as f32 / 255.0);
    dst.0[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_spaces() {
        // 10 px per ASCII glyph at size 100/6.
        let size = 100.0 / 6.0;
        let lines = wrap_text(&FixedMetrics, "aaa bbb ccc", size, 75.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa bbb", "ccc"]);
        assert!((lines[0].width - 70.0).abs() < 1e-3);
    }

    #[test]
    fn unspaced_text_breaks_between_characters() {
        let lines = wrap_text(&FixedMetrics, "日本語を勉強", 10.0, 35.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["日本語", "を勉強"]);
    }

    #[test]
    fn explicit_newlines_are_kept() {
        let lines = wrap_text(&FixedMetrics, "hi\n\nthere", 10.0, 1000.0);
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["hi", "", "there"]);
    }

    #[test]
    fn layout_is_deterministic() {
        let a = wrap_text(&FixedMetrics, "the quick brown fox jumps", 14.0, 90.0);
        let b = wrap_text(&FixedMetrics, "the quick brown fox jumps", 14.0, 90.0);
        assert_eq!(a, b);
    }
}
