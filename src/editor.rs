//! The annotation session: one background image, its scene, the undo stack,
//! and the gate around collaborator round trips.
//!
//! All pointer positions handed to [`Editor`] are rendering-surface
//! positions, i.e. the front-end has already undone viewport zoom and pan via
//! [`Viewport::local_to_surface`].

use std::path::Path;

use ab_glyph::FontArc;
use egui::{Pos2, Rect, Vec2};
use image::{DynamicImage, RgbaImage};

use crate::error::{AnnotateError, Result};
use crate::gate::{JobToken, Operation, OperationGate};
use crate::history::{ConsumedStroke, History, HistoryEntry};
use crate::mask::{self, Brush, MaskStroke, StrokeCapture};
use crate::overlay::{OverlayFocus, OverlayGesture, OverlayHit, TextOverlay, TextStyle, TranslationRecord};
use crate::raster;
use crate::scene::{EntityId, Scene};
use crate::selection::{ImageSelection, SelectionDrag};
use crate::tasks::{InpaintRequest, TranslateRequest};
use crate::transform::BackgroundLayer;
use crate::viewport::Viewport;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Tool {
    Mask,
    Selection,
    #[default]
    Pointer,
}

/// Outcome of handing a finished round trip back to the session.
#[derive(Debug, PartialEq)]
pub enum Completion<T> {
    Applied(T),
    /// The job was started against a session that is gone; nothing changed.
    Stale,
}

struct Background {
    image: RgbaImage,
    layer: BackgroundLayer,
}

pub struct Editor {
    background: Option<Background>,
    container: Vec2,
    /// Bumped whenever the background bitmap changes.
    revision: u64,
    viewport: Viewport,
    scene: Scene,
    history: History,
    gate: OperationGate,
    tool: Tool,
    brush: Brush,
    capture: Option<StrokeCapture>,
    drag: Option<SelectionDrag>,
    focus: OverlayFocus,
    /// Strokes submitted with the in-flight inpaint.
    submitted_strokes: Vec<EntityId>,
    style: TextStyle,
    with_cover: bool,
    font: Option<FontArc>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(None, true)
    }
}

fn stroke_to_image(stroke: &MaskStroke, layer: &BackgroundLayer) -> MaskStroke {
    let mut out = stroke.clone();
    out.map_points(|p| layer.to_image_space(p));
    out.width /= layer.display_scale;
    out
}

fn stroke_to_canvas(stroke: &MaskStroke, layer: &BackgroundLayer) -> MaskStroke {
    let mut out = stroke.clone();
    out.map_points(|p| layer.to_canvas_space(p));
    out.width *= layer.display_scale;
    out
}

impl Editor {
    pub fn new(font: Option<FontArc>, with_cover: bool) -> Self {
        Self {
            background: None,
            container: egui::vec2(800.0, 600.0),
            revision: 0,
            viewport: Viewport::default(),
            scene: Scene::default(),
            history: History::default(),
            gate: OperationGate::default(),
            tool: Tool::default(),
            brush: Brush::default(),
            capture: None,
            drag: None,
            focus: OverlayFocus::default(),
            submitted_strokes: Vec::new(),
            style: TextStyle::default(),
            with_cover,
            font,
        }
    }

    // -- session ------------------------------------------------------------

    /// Start a fresh session on `image`. Anything in flight becomes stale.
    pub fn load_image(&mut self, image: RgbaImage) {
        self.gate.reset();
        self.submitted_strokes.clear();
        self.scene.clear();
        self.history.clear();
        self.viewport.reset();
        self.focus = OverlayFocus::default();
        self.capture = None;
        self.drag = None;
        let layer = BackgroundLayer::fit(image.dimensions(), self.container);
        log::info!(
            "loaded {}x{} image at scale {:.3}",
            image.width(),
            image.height(),
            layer.display_scale
        );
        self.background = Some(Background { image, layer });
        self.revision += 1;
    }

    pub fn open(&mut self, path: &Path) -> Result<()> {
        let image = image::open(path)?.to_rgba8();
        log::info!("opened {}", path.display());
        self.load_image(image);
        Ok(())
    }

    /// Refit the background to a new container and carry the scene along.
    pub fn resize_container(&mut self, size: Vec2) {
        if size == self.container {
            return;
        }
        self.container = size;
        if let Some(bg) = &mut self.background {
            let next = BackgroundLayer::fit(bg.layer.dimensions(), size);
            self.scene.reanchor(&bg.layer, &next);
            bg.layer = next;
        }
    }

    fn replace_background(&mut self, image: RgbaImage) {
        let next = BackgroundLayer::fit(image.dimensions(), self.container);
        match &mut self.background {
            Some(bg) => {
                self.scene.reanchor(&bg.layer, &next);
                bg.image = image;
                bg.layer = next;
            }
            None => self.background = Some(Background { image, layer: next }),
        }
        self.revision += 1;
    }

    // -- accessors ----------------------------------------------------------

    pub fn image(&self) -> Option<&RgbaImage> {
        self.background.as_ref().map(|bg| &bg.image)
    }

    pub fn layer(&self) -> Option<&BackgroundLayer> {
        self.background.as_ref().map(|bg| &bg.layer)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn container(&self) -> Vec2 {
        self.container
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn gate(&self) -> &OperationGate {
        &self.gate
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.brush.set_width(width);
    }

    pub fn focus(&self) -> &OverlayFocus {
        &self.focus
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: TextStyle) {
        self.style = style;
    }

    pub fn set_font(&mut self, font: Option<FontArc>) {
        self.font = font;
    }

    /// Samples of the stroke being drawn right now.
    pub fn capture_points(&self) -> Option<&[Pos2]> {
        self.capture.as_ref().map(StrokeCapture::points)
    }

    /// Rectangle of the selection drag in progress.
    pub fn drag_bounds(&self) -> Option<Rect> {
        self.drag.as_ref().map(SelectionDrag::bounds)
    }

    // -- tools and viewport -------------------------------------------------

    /// Refused while an operation is in flight.
    pub fn set_tool(&mut self, tool: Tool) -> bool {
        if self.gate.is_busy() {
            return false;
        }
        if tool != self.tool {
            self.capture = None;
            self.drag = None;
            if tool != Tool::Pointer {
                self.focus = OverlayFocus::default();
            }
            self.tool = tool;
        }
        true
    }

    /// Mouse wheel at `local`. In the mask tool the plain wheel resizes the
    /// brush and `ctrl` switches it back to zooming.
    pub fn wheel(&mut self, local: Pos2, delta: f32, ctrl: bool) -> bool {
        if delta == 0.0 {
            return false;
        }
        if self.tool == Tool::Mask && !ctrl {
            let before = self.brush.width();
            self.brush.adjust(delta);
            return self.brush.width() != before;
        }
        self.viewport.zoom_at(local, delta)
    }

    pub fn pan(&mut self, delta: Vec2) -> bool {
        if self.gate.is_busy() {
            return false;
        }
        self.viewport.pan(delta);
        true
    }

    pub fn reset_viewport(&mut self) {
        self.viewport.reset();
    }

    // -- pointer ------------------------------------------------------------

    /// Pin a surface point to the displayed image so nothing drawn or
    /// selected can reach past the bitmap's edges.
    fn clip(&self, p: Pos2) -> Pos2 {
        match &self.background {
            Some(bg) => Rect::from_min_size(bg.layer.display_position, bg.layer.surface_size()).clamp(p),
            None => p,
        }
    }

    pub fn pointer_down(&mut self, p: Pos2) {
        if self.gate.is_busy() || self.background.is_none() {
            return;
        }
        let p = self.clip(p);
        match self.tool {
            Tool::Mask => self.capture = Some(StrokeCapture::begin(p)),
            Tool::Selection => self.drag = Some(SelectionDrag::begin(p)),
            Tool::Pointer => self.press_overlay(p),
        }
    }

    /// First press selects and starts a drag; a press on the overlay that is
    /// already active enters text editing; a press on nothing clears focus.
    fn press_overlay(&mut self, p: Pos2) {
        match self.scene.overlay_at(p, self.focus.active) {
            Some((id, OverlayHit::Handle(corner))) => {
                self.focus.active = Some(id);
                self.focus.gesture = OverlayGesture::Resize { id, corner };
            }
            Some((id, OverlayHit::Body)) if self.focus.active == Some(id) => {
                self.focus.editing = Some(id);
                self.focus.gesture = OverlayGesture::None;
            }
            Some((id, OverlayHit::Body)) => {
                self.focus.active = Some(id);
                self.focus.editing = None;
                self.focus.gesture = OverlayGesture::Drag { id, last: p };
            }
            None => self.focus = OverlayFocus::default(),
        }
    }

    pub fn pointer_move(&mut self, p: Pos2) {
        if self.gate.is_busy() {
            return;
        }
        let p = self.clip(p);
        if let Some(capture) = &mut self.capture {
            capture.extend(p);
        }
        if let Some(drag) = &mut self.drag {
            drag.update(p);
        }
        let Some(bg) = &self.background else {
            return;
        };
        match self.focus.gesture {
            OverlayGesture::Drag { id, last } => {
                if let Some(overlay) = self.scene.overlay_mut(id) {
                    overlay.translate(p - last, &bg.layer);
                }
                self.focus.gesture = OverlayGesture::Drag { id, last: p };
            }
            OverlayGesture::Resize { id, corner } => {
                if let Some(overlay) = self.scene.overlay_mut(id) {
                    overlay.resize(corner, p, &bg.layer);
                }
            }
            OverlayGesture::None => {}
        }
    }

    pub fn pointer_up(&mut self, p: Pos2) {
        if self.gate.is_busy() {
            return;
        }
        let p = self.clip(p);
        if let Some(mut capture) = self.capture.take() {
            capture.extend(p);
            if let Some(stroke) = capture.finish(self.brush.width()) {
                let id = self.scene.add_stroke(stroke);
                self.history.push(HistoryEntry::Stroke(id));
            }
        }
        if let Some(drag) = self.drag.take() {
            match drag.finish(p) {
                Some(bounds) => {
                    let id = self.scene.add_region(bounds);
                    self.history.push(HistoryEntry::SelectionRegion(id));
                }
                None => log::debug!("selection drag too small, discarded"),
            }
        }
        self.focus.gesture = OverlayGesture::None;
    }

    // -- undo ---------------------------------------------------------------

    /// Reverse the most recent action. `Ok(None)` when there is nothing left.
    pub fn undo(&mut self) -> Result<Option<String>> {
        if self.gate.is_busy() {
            return Err(AnnotateError::Busy);
        }
        let Some(entry) = self.history.pop() else {
            log::info!("nothing to undo");
            return Ok(None);
        };
        let description = entry.description();
        match entry {
            HistoryEntry::Stroke(id) => {
                self.scene.remove_stroke(id);
            }
            HistoryEntry::SelectionRegion(id) => {
                self.scene.remove_region(id);
            }
            HistoryEntry::Overlay(id) => {
                self.scene.remove_overlay(id);
                self.focus.forget(id);
            }
            HistoryEntry::ImageReplacement {
                previous,
                previous_dimensions,
                consumed,
            } => {
                debug_assert_eq!(previous.dimensions(), previous_dimensions);
                self.replace_background(previous);
                if let Some(bg) = &self.background {
                    for c in &consumed {
                        self.scene.restore_stroke(c.id, stroke_to_canvas(&c.stroke, &bg.layer));
                    }
                }
                self.history.reinstate_strokes(&consumed);
            }
        }
        log::info!("undo: {description}");
        Ok(Some(description))
    }

    // -- selections ---------------------------------------------------------

    /// Every live region in image space, ordered by id.
    pub fn get_selections(&self) -> Vec<ImageSelection> {
        match &self.background {
            Some(bg) => self.scene.project_regions(&bg.layer),
            None => Vec::new(),
        }
    }

    pub fn has_selections(&self) -> bool {
        self.scene.region_count() > 0
    }

    /// Remove every region. Ids keep counting up.
    pub fn clear_selections(&mut self) {
        let dropped = self.history.drop_regions();
        self.scene.clear_regions();
        log::debug!("cleared selections ({dropped} history entries)");
    }

    pub fn highlight_selection(&mut self, id: Option<u32>) {
        self.scene.highlight_region(id);
    }

    // -- inpaint ------------------------------------------------------------

    /// Export the mask and claim the gate. Nothing is claimed on error.
    pub fn begin_inpaint(&mut self) -> Result<InpaintRequest> {
        let bg = self.background.as_ref().ok_or(AnnotateError::NoBackground)?;
        if self.gate.is_busy() {
            return Err(AnnotateError::Busy);
        }
        let mask = mask::export_mask(&bg.layer, self.scene.strokes().map(|(_, s)| s))?;
        let image_png = raster::encode_png(&bg.image)?;
        let mask_png = raster::encode_png(&mask)?;
        let token = self.gate.try_begin(Operation::Inpaint)?;
        self.submitted_strokes = self.scene.stroke_ids();
        log::info!("inpaint started with {} stroke(s)", self.submitted_strokes.len());
        Ok(InpaintRequest {
            token,
            image_png,
            mask_png,
        })
    }

    /// Apply an inpaint result: swap the background, consume the submitted
    /// strokes, record one undoable replacement. Failures change nothing but
    /// the gate.
    pub fn finish_inpaint(
        &mut self,
        token: JobToken,
        result: Result<RgbaImage>,
    ) -> Result<Completion<()>> {
        if !self.gate.finish(token) {
            log::warn!("discarding stale inpaint result");
            return Ok(Completion::Stale);
        }
        let submitted = std::mem::take(&mut self.submitted_strokes);
        let image = result?;
        let bg = self.background.as_ref().ok_or(AnnotateError::NoBackground)?;
        let previous = bg.image.clone();
        let previous_dimensions = bg.layer.dimensions();

        let mut consumed = Vec::new();
        for (position, id) in self.history.lift_strokes(&submitted) {
            if let Some(stroke) = self.scene.remove_stroke(id) {
                consumed.push(ConsumedStroke {
                    position,
                    id,
                    stroke: stroke_to_image(&stroke, &bg.layer),
                });
            }
        }

        log::info!(
            "inpaint applied: {}x{} -> {}x{}, {} stroke(s) consumed",
            previous_dimensions.0,
            previous_dimensions.1,
            image.width(),
            image.height(),
            consumed.len()
        );
        self.replace_background(image);
        self.history.push(HistoryEntry::ImageReplacement {
            previous,
            previous_dimensions,
            consumed,
        });
        Ok(Completion::Applied(()))
    }

    // -- translate ----------------------------------------------------------

    /// Flatten the scene, project the selections, and claim the gate.
    pub fn begin_translate(&mut self) -> Result<TranslateRequest> {
        let bg = self.background.as_ref().ok_or(AnnotateError::NoBackground)?;
        if self.gate.is_busy() {
            return Err(AnnotateError::Busy);
        }
        let selections = self.scene.project_regions(&bg.layer);
        if selections.is_empty() {
            return Err(AnnotateError::NoSelections);
        }
        let flat = raster::flatten_scene(
            &bg.image,
            &bg.layer,
            self.scene.overlays().map(|(_, o)| o),
            self.font.as_ref(),
        );
        let image_png = raster::encode_png(&flat)?;
        let token = self.gate.try_begin(Operation::Translate)?;
        log::info!("translate started with {} selection(s)", selections.len());
        Ok(TranslateRequest {
            token,
            image_png,
            selections,
        })
    }

    /// Release the gate and hand back the records. Selections stay put.
    pub fn finish_translate(
        &mut self,
        token: JobToken,
        result: Result<Vec<TranslationRecord>>,
    ) -> Result<Completion<Vec<TranslationRecord>>> {
        if !self.gate.finish(token) {
            log::warn!("discarding stale translate result");
            return Ok(Completion::Stale);
        }
        let records = result?;
        log::info!("translate returned {} record(s)", records.len());
        Ok(Completion::Applied(records))
    }

    // -- overlays -----------------------------------------------------------

    /// One overlay per record, each its own history entry.
    pub fn add_overlays(&mut self, records: &[TranslationRecord]) -> Result<Vec<EntityId>> {
        let bg = self.background.as_ref().ok_or(AnnotateError::NoBackground)?;
        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let overlay = TextOverlay::from_record(record, &self.style, &bg.layer, self.with_cover);
            let id = self.scene.add_overlay(overlay);
            self.history.push(HistoryEntry::Overlay(id));
            ids.push(id);
        }
        Ok(ids)
    }

    pub fn set_overlay_text(&mut self, id: EntityId, text: &str) -> bool {
        match self.scene.overlay_mut(id) {
            Some(overlay) => {
                overlay.content = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Focus left the overlay being edited.
    pub fn blur_overlay(&mut self) {
        self.focus.editing = None;
    }

    // -- output -------------------------------------------------------------

    /// Background, covers, and overlay text at original resolution.
    pub fn flatten(&self) -> Result<RgbaImage> {
        let bg = self.background.as_ref().ok_or(AnnotateError::NoBackground)?;
        Ok(raster::flatten_scene(
            &bg.image,
            &bg.layer,
            self.scene.overlays().map(|(_, o)| o),
            self.font.as_ref(),
        ))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let flat = self.flatten()?;
        let lossy = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
        if lossy {
            DynamicImage::ImageRgba8(flat).to_rgb8().save(path)?;
        } else {
            flat.save(path)?;
        }
        log::info!("saved {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn editor() -> Editor {
        let mut ed = Editor::default();
        ed.resize_container(egui::vec2(500.0, 500.0));
        ed.load_image(RgbaImage::from_pixel(200, 100, Rgba([9, 9, 9, 255])));
        ed
    }

    fn stroke(ed: &mut Editor, from: Pos2, to: Pos2) {
        ed.pointer_down(from);
        ed.pointer_move(to);
        ed.pointer_up(to);
    }

    fn record(id: &str) -> TranslationRecord {
        TranslationRecord {
            id: id.into(),
            original_text: "元気".into(),
            translated_text: "Fine".into(),
            bounds: Rect::from_min_max(egui::pos2(10.0, 10.0), egui::pos2(60.0, 40.0)),
        }
    }

    #[test]
    fn strokes_and_regions_land_in_history() {
        let mut ed = editor();
        ed.set_tool(Tool::Mask);
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(50.0, 30.0));
        ed.set_tool(Tool::Selection);
        stroke(&mut ed, egui::pos2(100.0, 100.0), egui::pos2(104.0, 150.0));
        stroke(&mut ed, egui::pos2(100.0, 100.0), egui::pos2(150.0, 150.0));
        assert_eq!(ed.scene().stroke_count(), 1);
        assert_eq!(ed.scene().region_count(), 1);
        assert_eq!(ed.history().len(), 2);
    }

    #[test]
    fn gestures_are_blocked_while_busy() {
        let mut ed = editor();
        ed.set_tool(Tool::Mask);
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(50.0, 30.0));
        let _request = ed.begin_inpaint().unwrap();

        assert!(!ed.set_tool(Tool::Selection));
        assert!(!ed.pan(egui::vec2(5.0, 5.0)));
        stroke(&mut ed, egui::pos2(60.0, 60.0), egui::pos2(90.0, 90.0));
        assert_eq!(ed.scene().stroke_count(), 1);
        assert!(matches!(ed.undo(), Err(AnnotateError::Busy)));
        assert!(matches!(ed.begin_translate(), Err(AnnotateError::Busy)));
        assert!(ed.gate().inpainting() && !ed.gate().translating());
        // Zoom stays available.
        assert!(ed.wheel(egui::pos2(0.0, 0.0), -1.0, true));
    }

    #[test]
    fn failed_inpaint_releases_gate_and_keeps_scene() {
        let mut ed = editor();
        ed.set_tool(Tool::Mask);
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(50.0, 30.0));
        let request = ed.begin_inpaint().unwrap();
        let err = ed
            .finish_inpaint(request.token, Err(AnnotateError::Network("refused".into())))
            .unwrap_err();
        assert!(matches!(err, AnnotateError::Network(_)));
        assert!(!ed.is_busy());
        assert_eq!(ed.scene().stroke_count(), 1);
        assert_eq!(ed.history().len(), 1);
    }

    #[test]
    fn input_errors_leave_the_gate_idle() {
        let mut ed = editor();
        assert!(matches!(ed.begin_inpaint(), Err(AnnotateError::NoMask)));
        assert!(matches!(ed.begin_translate(), Err(AnnotateError::NoSelections)));
        assert!(!ed.is_busy());
        let mut empty = Editor::default();
        assert!(matches!(empty.begin_inpaint(), Err(AnnotateError::NoBackground)));
    }

    #[test]
    fn results_from_a_previous_session_are_stale() {
        let mut ed = editor();
        ed.set_tool(Tool::Selection);
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(60.0, 60.0));
        let request = ed.begin_translate().unwrap();
        ed.load_image(RgbaImage::new(50, 50));
        let outcome = ed.finish_translate(request.token, Ok(vec![record("1")])).unwrap();
        assert_eq!(outcome, Completion::Stale);
        assert!(!ed.is_busy());
        assert_eq!(ed.scene().overlay_count(), 0);
    }

    #[test]
    fn overlay_press_selects_then_edits() {
        let mut ed = editor();
        let ids = ed.add_overlays(&[record("1")]).unwrap();
        let id = ids[0];
        let center = ed.scene().overlay(id).unwrap().bounds.center();

        ed.pointer_down(center);
        assert_eq!(ed.focus().active, Some(id));
        assert_eq!(ed.focus().editing, None);
        ed.pointer_move(center + egui::vec2(10.0, 5.0));
        ed.pointer_up(center + egui::vec2(10.0, 5.0));
        let moved = ed.scene().overlay(id).unwrap().bounds.center();
        assert!((moved - center - egui::vec2(10.0, 5.0)).length() < 1e-3);

        ed.pointer_down(moved);
        ed.pointer_up(moved);
        assert_eq!(ed.focus().editing, Some(id));
        assert!(ed.set_overlay_text(id, "Fine!"));
        ed.blur_overlay();
        assert_eq!(ed.focus().editing, None);
        assert_eq!(ed.scene().overlay(id).unwrap().content, "Fine!");

        ed.pointer_down(egui::pos2(400.0, 190.0));
        assert_eq!(ed.focus().active, None);
    }

    #[test]
    fn undoing_an_overlay_clears_focus_and_cover() {
        let mut ed = editor();
        let id = ed.add_overlays(&[record("1")]).unwrap()[0];
        let center = ed.scene().overlay(id).unwrap().bounds.center();
        ed.pointer_down(center);
        assert_eq!(ed.undo().unwrap().as_deref(), Some("Text overlay"));
        assert_eq!(ed.focus().active, None);
        assert_eq!(ed.scene().overlay_count(), 0);
        let flat = ed.flatten().unwrap();
        assert_eq!(flat.get_pixel(20, 20).0, [9, 9, 9, 255]);
    }

    #[test]
    fn clearing_selections_drops_their_undo_entries() {
        let mut ed = editor();
        ed.set_tool(Tool::Selection);
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(60.0, 60.0));
        stroke(&mut ed, egui::pos2(70.0, 10.0), egui::pos2(120.0, 60.0));
        ed.clear_selections();
        assert!(!ed.has_selections());
        assert!(ed.history().is_empty());
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(60.0, 60.0));
        assert_eq!(ed.get_selections()[0].id, 3);
    }

    #[test]
    fn mask_wheel_adjusts_brush_unless_ctrl() {
        let mut ed = editor();
        ed.set_tool(Tool::Mask);
        let width = ed.brush().width();
        assert!(ed.wheel(egui::pos2(0.0, 0.0), -1.0, false));
        assert_eq!(ed.brush().width(), width + 2.0);
        assert_eq!(ed.viewport().zoom(), 1.0);
        assert!(ed.wheel(egui::pos2(0.0, 0.0), -1.0, true));
        assert!(ed.viewport().zoom() > 1.0);
    }

    #[test]
    fn container_resize_reanchors_every_entity() {
        let mut ed = editor();
        ed.set_tool(Tool::Selection);
        stroke(&mut ed, egui::pos2(10.0, 10.0), egui::pos2(60.0, 60.0));
        let before = ed.get_selections();
        ed.resize_container(egui::vec2(1000.0, 1000.0));
        let after = ed.get_selections();
        assert!((before[0].left - after[0].left).abs() < 1e-2);
        assert!((before[0].width - after[0].width).abs() < 1e-2);
    }
}
