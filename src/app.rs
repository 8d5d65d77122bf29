use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use eframe::egui;
use panelpachi::config::Config;
use panelpachi::editor::{Completion, Editor, Tool};
use panelpachi::error::AnnotateError;
use panelpachi::mask::{MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH};
use panelpachi::overlay::{Corner, TextAlign, HANDLE_RADIUS};
use panelpachi::services::Collaborators;
use panelpachi::tasks::{self, JobOutcome, Wake};
use panelpachi::viewport::Viewport;

/// How long a transient notice stays on screen, seconds.
const NOTICE_SECS: f64 = 3.0;

const MASK_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(200, 30, 30, 140);
const REGION_COLOR: egui::Color32 = egui::Color32::from_rgb(0, 120, 255);
const REGION_HIGHLIGHT: egui::Color32 = egui::Color32::from_rgb(255, 170, 0);

/// Where the rendering surface sits on screen this frame.
#[derive(Clone, Copy)]
struct SurfaceFrame {
    origin: egui::Pos2,
    viewport: Viewport,
}

impl SurfaceFrame {
    fn to_screen(&self, surface: egui::Pos2) -> egui::Pos2 {
        self.origin + self.viewport.surface_to_local(surface).to_vec2()
    }

    fn to_surface(&self, screen: egui::Pos2) -> egui::Pos2 {
        self.viewport.local_to_surface((screen - self.origin).to_pos2())
    }

    fn local(&self, screen: egui::Pos2) -> egui::Pos2 {
        (screen - self.origin).to_pos2()
    }

    fn rect_to_screen(&self, r: egui::Rect) -> egui::Rect {
        egui::Rect::from_min_max(self.to_screen(r.min), self.to_screen(r.max))
    }
}

pub struct PanelApp {
    editor: Editor,
    services: Arc<dyn Collaborators>,
    service_url: String,

    texture: Option<egui::TextureHandle>,
    texture_revision: u64,

    jobs_tx: Sender<JobOutcome>,
    jobs_rx: Receiver<JobOutcome>,
    health_rx: Receiver<bool>,
    service_up: bool,

    notice: Option<(String, f64)>,
    error: Option<String>,

    edit_buf: String,
    edit_target: Option<panelpachi::scene::EntityId>,
}

fn waker(ctx: &egui::Context) -> Wake {
    let ctx = ctx.clone();
    Arc::new(move || ctx.request_repaint())
}

impl PanelApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: Config, services: Arc<dyn Collaborators>) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::channel();
        let (health_tx, health_rx) = mpsc::channel();
        tasks::spawn_health_probe(
            services.clone(),
            config.health_interval,
            health_tx,
            waker(&cc.egui_ctx),
        );

        let mut app = Self {
            editor: Editor::new(config.font.clone(), config.with_cover),
            services,
            service_url: config.service_url.clone(),
            texture: None,
            texture_revision: 0,
            jobs_tx,
            jobs_rx,
            health_rx,
            service_up: false,
            notice: None,
            error: None,
            edit_buf: String::new(),
            edit_target: None,
        };
        if let Some(path) = &config.image {
            app.open(path.clone());
        }
        app
    }

    fn report(&mut self, err: AnnotateError, now: f64) {
        if err.is_transient() {
            log::info!("{err}");
            self.notice = Some((err.to_string(), now + NOTICE_SECS));
        } else {
            log::error!("{err}");
            self.error = Some(err.to_string());
        }
    }

    fn open(&mut self, path: PathBuf) {
        if let Err(e) = self.editor.open(&path) {
            self.report(e, 0.0);
        }
    }

    fn open_dialog(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "bmp"])
            .pick_file()
        {
            self.open(path);
        }
    }

    fn save_dialog(&mut self, now: f64) {
        if self.editor.image().is_none() {
            self.report(AnnotateError::NoBackground, now);
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .add_filter("JPEG", &["jpg", "jpeg"])
            .set_file_name("translated.png")
            .save_file()
        else {
            return;
        };
        match self.editor.save(&path) {
            Ok(()) => self.notice = Some((format!("Saved {}", path.display()), now + NOTICE_SECS)),
            Err(e) => self.report(e, now),
        }
    }

    fn undo(&mut self, now: f64) {
        match self.editor.undo() {
            Ok(Some(_)) => {}
            Ok(None) => self.notice = Some(("Nothing to undo".to_string(), now + NOTICE_SECS)),
            Err(e) => self.report(e, now),
        }
    }

    fn start_inpaint(&mut self, ctx: &egui::Context, now: f64) {
        match self.editor.begin_inpaint() {
            Ok(request) => tasks::spawn_inpaint(self.services.clone(), request, self.jobs_tx.clone(), waker(ctx)),
            Err(e) => self.report(e, now),
        }
    }

    fn start_translate(&mut self, ctx: &egui::Context, now: f64) {
        match self.editor.begin_translate() {
            Ok(request) => {
                tasks::spawn_translate(self.services.clone(), request, self.jobs_tx.clone(), waker(ctx))
            }
            Err(e) => self.report(e, now),
        }
    }

    fn drain_channels(&mut self, now: f64) {
        while let Ok(up) = self.health_rx.try_recv() {
            if up != self.service_up {
                log::info!("service at {} is {}", self.service_url, if up { "up" } else { "down" });
            }
            self.service_up = up;
        }
        while let Ok(outcome) = self.jobs_rx.try_recv() {
            let applied = match outcome {
                JobOutcome::Inpainted { token, result } => {
                    self.editor.finish_inpaint(token, result).map(|_| ())
                }
                JobOutcome::Translated { token, result } => match self.editor.finish_translate(token, result) {
                    Ok(Completion::Applied(records)) => self.editor.add_overlays(&records).map(|_| ()),
                    Ok(Completion::Stale) => Ok(()),
                    Err(e) => Err(e),
                },
            };
            if let Err(e) = applied {
                self.report(e, now);
            }
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        if self.texture.is_some() && self.texture_revision == self.editor.revision() {
            return;
        }
        let Some(img) = self.editor.image() else {
            return;
        };
        let size = [img.width() as usize, img.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, img.as_raw());
        self.texture = Some(ctx.load_texture("background", color_image, egui::TextureOptions::LINEAR));
        self.texture_revision = self.editor.revision();
    }

    fn toolbar(&mut self, ui: &mut egui::Ui, ctx: &egui::Context, now: f64) {
        let busy = self.editor.is_busy();
        let loaded = self.editor.image().is_some();
        ui.horizontal(|ui| {
            if ui.add_enabled(!busy, egui::Button::new("Open…")).clicked() {
                self.open_dialog();
            }
            if ui.add_enabled(loaded, egui::Button::new("Save…")).clicked() {
                self.save_dialog(now);
            }
            ui.separator();
            for (tool, label) in [(Tool::Pointer, "Pointer"), (Tool::Mask, "Mask"), (Tool::Selection, "Select text")] {
                let selected = self.editor.tool() == tool;
                if ui
                    .add_enabled(!busy, egui::SelectableLabel::new(selected, label))
                    .clicked()
                {
                    self.editor.set_tool(tool);
                }
            }
            if self.editor.tool() == Tool::Mask {
                ui.separator();
                ui.label("Brush:");
                let mut width = self.editor.brush().width();
                if ui
                    .add(egui::Slider::new(&mut width, MIN_BRUSH_WIDTH..=MAX_BRUSH_WIDTH))
                    .changed()
                {
                    self.editor.set_brush_width(width);
                }
            }
            ui.separator();
            let ready = loaded && !busy && self.service_up;
            if ui
                .add_enabled(ready, egui::Button::new("Inpaint"))
                .on_disabled_hover_text("Needs an image, an idle session, and a reachable service")
                .clicked()
            {
                self.start_inpaint(ctx, now);
            }
            if ui.add_enabled(ready, egui::Button::new("Translate")).clicked() {
                self.start_translate(ctx, now);
            }
            if ui
                .add_enabled(self.editor.has_selections(), egui::Button::new("Clear selections"))
                .clicked()
            {
                self.editor.clear_selections();
            }
            ui.separator();
            if ui
                .add_enabled(!busy && !self.editor.history().is_empty(), egui::Button::new("Undo"))
                .clicked()
            {
                self.undo(now);
            }
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", self.editor.viewport().zoom() * 100.0));
            if busy {
                ui.separator();
                ui.add(egui::Spinner::new());
                ui.label(if self.editor.gate().inpainting() { "Inpainting…" } else { "Translating…" });
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let (color, text) = if self.service_up {
                    (egui::Color32::from_rgb(60, 180, 75), "service up")
                } else {
                    (egui::Color32::from_rgb(200, 60, 60), "service down")
                };
                ui.colored_label(color, text).on_hover_text(self.service_url.as_str());
            });
        });
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("Selections");
        let mut hovered = None;
        for sel in self.editor.get_selections() {
            let r = ui.label(format!(
                "#{}  {:.0}×{:.0} at ({:.0}, {:.0})",
                sel.id, sel.width, sel.height, sel.left, sel.top
            ));
            if r.hovered() {
                hovered = Some(sel.id);
            }
        }
        self.editor.highlight_selection(hovered);

        ui.separator();
        ui.heading("History");
        egui::ScrollArea::vertical().show(ui, |ui| {
            for line in self.editor.history().descriptions() {
                ui.label(line);
            }
        });
    }

    fn draw_scene(&self, painter: &egui::Painter, frame: SurfaceFrame) {
        let zoom = frame.viewport.zoom();
        let Some(layer) = self.editor.layer() else {
            return;
        };

        if let Some(tex) = &self.texture {
            let surface = egui::Rect::from_min_size(layer.display_position, layer.surface_size());
            painter.image(
                tex.id(),
                frame.rect_to_screen(surface),
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        for (_, stroke) in self.editor.scene().strokes() {
            let points: Vec<egui::Pos2> = stroke.polyline().into_iter().map(|p| frame.to_screen(p)).collect();
            draw_round_polyline(painter, &points, stroke.width * zoom, MASK_COLOR);
        }
        if let Some(points) = self.editor.capture_points() {
            let points: Vec<egui::Pos2> = points.iter().map(|p| frame.to_screen(*p)).collect();
            draw_round_polyline(painter, &points, self.editor.brush().width() * zoom, MASK_COLOR);
        }

        for region in self.editor.scene().regions() {
            let color = if region.highlighted { REGION_HIGHLIGHT } else { REGION_COLOR };
            let rect = frame.rect_to_screen(region.bounds);
            painter.rect_stroke(rect, 0.0, egui::Stroke::new(2.0, color), egui::StrokeKind::Middle);
            painter.text(
                rect.left_top() + egui::vec2(3.0, 2.0),
                egui::Align2::LEFT_TOP,
                region.id.to_string(),
                egui::FontId::proportional(12.0),
                color,
            );
        }
        if let Some(bounds) = self.editor.drag_bounds() {
            painter.rect_stroke(
                frame.rect_to_screen(bounds),
                0.0,
                egui::Stroke::new(1.5, REGION_COLOR),
                egui::StrokeKind::Middle,
            );
        }

        let focus = self.editor.focus();
        for (id, overlay) in self.editor.scene().overlays() {
            if let Some(cover) = &overlay.cover {
                let rect = frame.rect_to_screen(layer.rect_to_canvas_space(cover.image_bounds));
                painter.rect_filled(rect, 0.0, cover.color.to_egui());
            }
            let rect = frame.rect_to_screen(overlay.bounds);
            if focus.editing != Some(id) {
                let (halign, x) = match overlay.style.align {
                    TextAlign::Left => (egui::Align::Min, rect.left()),
                    TextAlign::Center => (egui::Align::Center, rect.center().x),
                    TextAlign::Right => (egui::Align::Max, rect.right()),
                };
                let mut job = egui::text::LayoutJob::simple(
                    overlay.content.clone(),
                    egui::FontId::proportional(overlay.font_size * zoom),
                    overlay.style.color.to_egui(),
                    rect.width(),
                );
                job.halign = halign;
                let galley = painter.layout_job(job);
                let y = rect.center().y - galley.size().y * 0.5;
                painter.galley(egui::pos2(x, y), galley, overlay.style.color.to_egui());
            }
            if focus.active == Some(id) {
                draw_selection_indicator(painter, rect);
                for corner in Corner::ALL {
                    painter.circle_filled(corner.of(rect), HANDLE_RADIUS * 0.75, REGION_COLOR);
                }
            }
        }
    }

    fn overlay_editor(&mut self, ctx: &egui::Context, frame: SurfaceFrame) {
        let editing = self.editor.focus().editing;
        if editing != self.edit_target {
            self.edit_target = editing;
            self.edit_buf = editing
                .and_then(|id| self.editor.scene().overlay(id))
                .map(|o| o.content.clone())
                .unwrap_or_default();
        }
        let Some(id) = editing else {
            return;
        };
        let Some(overlay) = self.editor.scene().overlay(id) else {
            return;
        };
        let rect = frame.rect_to_screen(overlay.bounds);
        let font = egui::FontId::proportional(overlay.font_size * frame.viewport.zoom());
        let mut changed = false;
        let mut lost = false;
        egui::Area::new(egui::Id::new("overlay_edit"))
            .fixed_pos(rect.min)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                let te = ui.add(
                    egui::TextEdit::multiline(&mut self.edit_buf)
                        .font(font)
                        .desired_width(rect.width())
                        .desired_rows(2),
                );
                changed = te.changed();
                if te.lost_focus() {
                    lost = true;
                } else {
                    te.request_focus();
                }
            });
        if changed {
            self.editor.set_overlay_text(id, &self.edit_buf);
        }
        if lost {
            self.editor.blur_overlay();
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui, ctx: &egui::Context) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let canvas_rect = response.rect;
        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

        self.editor.resize_container(canvas_rect.size());
        let surface_size = self.editor.layer().map(|l| l.surface_size()).unwrap_or_default();
        let frame = SurfaceFrame {
            origin: canvas_rect.center() - surface_size * 0.5,
            viewport: *self.editor.viewport(),
        };

        self.draw_scene(&painter, frame);

        if self.editor.tool() == Tool::Mask {
            if let Some(pos) = response.hover_pos() {
                let r = self.editor.brush().cursor_diameter(frame.viewport.zoom()) * 0.5;
                painter.circle_stroke(pos, r, egui::Stroke::new(1.0, egui::Color32::WHITE));
            }
        }

        self.overlay_editor(ctx, frame);

        // Pan: middle button, or space + primary drag.
        let (middle_down, space_down, pointer_delta) =
            ctx.input(|i| (i.pointer.middle_down(), i.key_down(egui::Key::Space), i.pointer.delta()));
        let panning = middle_down || (space_down && response.dragged_by(egui::PointerButton::Primary));
        if panning && pointer_delta != egui::Vec2::ZERO {
            self.editor.pan(pointer_delta);
        }

        // Wheel: ctrl+wheel arrives as a zoom factor, the plain wheel as scroll.
        if let Some(pos) = response.hover_pos() {
            let (delta, ctrl) = ctx.input(|i| {
                let z = i.zoom_delta();
                if z != 1.0 {
                    (if z > 1.0 { -1.0 } else { 1.0 }, true)
                } else {
                    (-i.raw_scroll_delta.y, i.modifiers.ctrl)
                }
            });
            if delta != 0.0 {
                self.editor.wheel(frame.local(pos), delta, ctrl);
            }
        }

        if panning || space_down {
            return;
        }
        let press = ctx.input(|i| i.pointer.press_origin());
        if response.drag_started_by(egui::PointerButton::Primary) {
            if let Some(pos) = press.or(response.hover_pos()) {
                self.editor.pointer_down(frame.to_surface(pos));
            }
        }
        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.hover_pos().or(ctx.input(|i| i.pointer.latest_pos())) {
                self.editor.pointer_move(frame.to_surface(pos));
            }
        }
        if response.drag_stopped_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.hover_pos().or(ctx.input(|i| i.pointer.latest_pos())) {
                self.editor.pointer_up(frame.to_surface(pos));
            }
        }
        if response.clicked_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = frame.to_surface(pos);
                self.editor.pointer_down(p);
                self.editor.pointer_up(p);
            }
        }
    }

    fn notices(&mut self, ctx: &egui::Context, now: f64) {
        if matches!(&self.notice, Some((_, until)) if *until <= now) {
            self.notice = None;
        }
        if self.notice.is_none() && self.error.is_none() {
            return;
        }
        let mut dismissed = false;
        egui::TopBottomPanel::bottom("notices").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some((text, _)) = &self.notice {
                    ui.label(text.as_str());
                }
                if let Some(err) = &self.error {
                    ui.colored_label(egui::Color32::from_rgb(220, 80, 80), err.as_str());
                    dismissed = ui.small_button("Dismiss").clicked();
                }
            });
        });
        if dismissed {
            self.error = None;
        }
        if self.notice.is_some() {
            ctx.request_repaint_after(std::time::Duration::from_millis(250));
        }
    }
}

fn draw_round_polyline(painter: &egui::Painter, points: &[egui::Pos2], width: f32, color: egui::Color32) {
    let stroke = egui::Stroke::new(width, color);
    if points.len() >= 2 {
        painter.add(egui::Shape::line(points.to_vec(), stroke));
    }
    // Round caps; egui lines are butt-ended.
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        painter.circle_filled(*first, width * 0.5, color);
        painter.circle_filled(*last, width * 0.5, color);
    }
}

fn draw_selection_indicator(painter: &egui::Painter, rect: egui::Rect) {
    painter.rect_stroke(
        rect.expand(4.0),
        2.0,
        egui::Stroke::new(1.5, REGION_COLOR),
        egui::StrokeKind::Middle,
    );
}

impl eframe::App for PanelApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);
        self.drain_channels(now);
        self.ensure_texture(ctx);

        let typing = self.editor.focus().editing.is_some();
        let (undo, save, reset) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::Z),
                i.modifiers.command && i.key_pressed(egui::Key::S),
                !typing && !i.modifiers.any() && i.key_pressed(egui::Key::R),
            )
        });
        if undo && !typing {
            self.undo(now);
        }
        if save {
            self.save_dialog(now);
        }
        if reset {
            self.editor.reset_viewport();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| self.toolbar(ui, ctx, now));
        self.notices(ctx, now);
        egui::SidePanel::right("details")
            .default_width(220.0)
            .show(ctx, |ui| self.side_panel(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            if self.editor.image().is_none() {
                ui.centered_and_justified(|ui| ui.label("Open a page to start (File → Open, or pass a path)."));
                return;
            }
            self.canvas(ui, ctx);
        });
    }
}
