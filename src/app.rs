use eframe::egui;
use std::cell::RefCell;
use std::rc::Rc;

use crate::batch::{Batch, BatchSummary, PendingImage};
use crate::circle::{Circle, Point};
use crate::config::{AnnotatorConfig, Keys, Palette};
use crate::session::{Command, DrawState, Session, SessionEnd, SessionEvent};

const CENTER_DOT_RADIUS: f32 = 2.0;
const RING_WIDTH: f32 = 1.0;

/// What the window leaves behind once it closes.
#[derive(Default)]
struct RunOutcome {
    summary: BatchSummary,
    error: Option<anyhow::Error>,
}

// ── Current image ───────────────────────────────────────────────────────────

struct Current {
    pending: PendingImage,
    session: Session,
    texture: Option<egui::TextureHandle>,
}

impl Current {
    fn image_size(&self) -> egui::Vec2 {
        egui::vec2(
            self.pending.image.width() as f32,
            self.pending.image.height() as f32,
        )
    }

    fn contains(&self, p: Point) -> bool {
        p.x >= 0
            && p.y >= 0
            && (p.x as u32) < self.pending.image.width()
            && (p.y as u32) < self.pending.image.height()
    }
}

// ── App ─────────────────────────────────────────────────────────────────────

struct CircleApp {
    batch: Batch,
    keys: Keys,
    palette: Palette,
    current: Option<Current>,
    closing: bool,
    outcome: Rc<RefCell<RunOutcome>>,

    // pan & zoom
    pan: egui::Vec2,
    zoom: f32,
    panning: bool,
    needs_fit: bool,
}

impl CircleApp {
    fn new(
        batch: Batch,
        keys: Keys,
        palette: Palette,
        outcome: Rc<RefCell<RunOutcome>>,
    ) -> Self {
        Self {
            batch,
            keys,
            palette,
            current: None,
            closing: false,
            outcome,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
            panning: false,
            needs_fit: true,
        }
    }

    fn close(&mut self, ctx: &egui::Context) {
        if !self.closing {
            self.closing = true;
            self.outcome.borrow_mut().summary = self.batch.summary();
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// Closing the window mid-image counts as abort.
    fn window_closed(&mut self) {
        if let Some(current) = self.current.take() {
            log::info!(
                "window closed on {}, nothing written",
                current.pending.job.image_path.display()
            );
            self.batch.abort();
        }
        self.closing = true;
        self.outcome.borrow_mut().summary = self.batch.summary();
    }

    fn fail(&mut self, ctx: &egui::Context, err: anyhow::Error) {
        log::error!("{err:#}");
        self.outcome.borrow_mut().error = Some(err);
        self.current = None;
        self.close(ctx);
    }

    /// Load the next image that still needs annotating, or close when the
    /// batch is exhausted.
    fn advance(&mut self, ctx: &egui::Context) {
        match self.batch.next_image() {
            Ok(Some(pending)) => {
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
                    "circle-annotate — {}",
                    file_name(&pending)
                )));
                self.current = Some(Current {
                    pending,
                    session: Session::new(),
                    texture: None,
                });
                self.needs_fit = true;
            }
            Ok(None) => {
                log::info!("no images left to annotate");
                self.close(ctx);
            }
            Err(err) => self.fail(ctx, err),
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, event: SessionEvent) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        match current.session.handle(event) {
            None => {}
            Some(SessionEnd::Finished(circles)) => {
                let Some(done) = self.current.take() else {
                    return;
                };
                if let Err(err) = self.batch.finish(&done.pending, &circles) {
                    self.fail(ctx, err);
                    return;
                }
                ctx.request_repaint();
            }
            Some(SessionEnd::Aborted) => {
                if let Some(done) = self.current.take() {
                    log::info!(
                        "aborted on {}, nothing written",
                        done.pending.job.image_path.display()
                    );
                }
                self.batch.abort();
                self.close(ctx);
            }
        }
    }

    fn dispatch_all(&mut self, ctx: &egui::Context, events: Vec<SessionEvent>) {
        for event in events {
            if self.current.is_none() {
                break;
            }
            self.dispatch(ctx, event);
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(current) = self.current.as_mut() else {
            return;
        };
        if current.texture.is_some() {
            return;
        }
        let rgba = current.pending.image.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        current.texture = Some(ctx.load_texture(
            "image",
            color_image,
            egui::TextureOptions::NEAREST,
        ));
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(
        &self,
        canvas_rect: egui::Rect,
        image_size: egui::Vec2,
        img_pos: egui::Pos2,
    ) -> egui::Pos2 {
        canvas_rect.center() + self.pan + (img_pos.to_vec2() - image_size * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image pixels
    fn screen_to_image(
        &self,
        canvas_rect: egui::Rect,
        image_size: egui::Vec2,
        screen_pos: egui::Pos2,
    ) -> Point {
        let rel = screen_pos - canvas_rect.center() - self.pan;
        let x = rel.x / self.zoom + image_size.x * 0.5;
        let y = rel.y / self.zoom + image_size.y * 0.5;
        Point::new(x.floor() as i32, y.floor() as i32)
    }

    fn fit_to(&mut self, canvas_rect: egui::Rect, image_size: egui::Vec2) {
        if image_size.x > 0.0 && image_size.y > 0.0 {
            let scale = (canvas_rect.width() / image_size.x).min(canvas_rect.height() / image_size.y);
            self.zoom = scale.clamp(0.1, 10.0);
        }
        self.pan = egui::Vec2::ZERO;
        self.needs_fit = false;
    }

    fn draw_circle(
        &self,
        painter: &egui::Painter,
        canvas_rect: egui::Rect,
        image_size: egui::Vec2,
        circle: &Circle,
        ring: egui::Color32,
    ) {
        let center = self.image_to_screen(canvas_rect, image_size, pixel_center(circle.center));
        painter.circle_filled(center, CENTER_DOT_RADIUS, self.palette.center.to_egui());
        painter.circle_stroke(
            center,
            circle.ring_radius() as f32 * self.zoom,
            egui::Stroke::new(RING_WIDTH, ring),
        );
    }

    fn draw_canvas(&self, painter: &egui::Painter, canvas_rect: egui::Rect) {
        painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

        let Some(current) = self.current.as_ref() else {
            return;
        };
        let image_size = current.image_size();

        if let Some(ref tex) = current.texture {
            let img_rect = egui::Rect::from_min_max(
                self.image_to_screen(canvas_rect, image_size, egui::Pos2::ZERO),
                self.image_to_screen(canvas_rect, image_size, image_size.to_pos2()),
            );
            painter.image(
                tex.id(),
                img_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }

        let committed = self.palette.committed_ring.to_egui();
        for circle in current.session.circles() {
            self.draw_circle(painter, canvas_rect, image_size, circle, committed);
        }
        if let Some(pending) = current.session.pending() {
            let ring = self.palette.pending_ring.to_egui();
            self.draw_circle(painter, canvas_rect, image_size, &pending, ring);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) -> Option<Command> {
        let mut command = None;
        ui.horizontal(|ui| {
            if let Some(current) = self.current.as_ref() {
                ui.label(format!(
                    "{} ({}/{})",
                    file_name(&current.pending),
                    current.pending.position,
                    current.pending.total
                ));
                ui.separator();
                ui.label(format!("Circles: {}", current.session.circles().len()));
                if let DrawState::Placing { radius, .. } = current.session.state() {
                    ui.label(format!("r = {radius:.1}"));
                }
            }
            ui.separator();
            if ui
                .button(format!("Undo ({})", self.keys.undo.name()))
                .clicked()
            {
                command = Some(Command::Undo);
            }
            if ui
                .button(format!("Next ({})", self.keys.next.name()))
                .clicked()
            {
                command = Some(Command::Finish);
            }
            if ui
                .button(format!("Quit ({})", self.keys.abort.name()))
                .clicked()
            {
                command = Some(Command::Abort);
            }
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
        });
        command
    }
}

/// Middle of the pixel a click was floored to.
fn pixel_center(p: Point) -> egui::Pos2 {
    egui::pos2(p.x as f32 + 0.5, p.y as f32 + 0.5)
}

fn file_name(pending: &PendingImage) -> String {
    pending
        .job
        .image_path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for CircleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.closing {
            return;
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            self.window_closed();
            return;
        }

        if self.current.is_none() {
            self.advance(ctx);
            if self.current.is_none() {
                return;
            }
        }
        self.ensure_texture(ctx);

        // Keyboard shortcuts
        let keys = self.keys;
        let key_command = ctx.input(|i| {
            if i.key_pressed(keys.abort) {
                Some(Command::Abort)
            } else if i.key_pressed(keys.next) {
                Some(Command::Finish)
            } else if i.key_pressed(keys.undo) {
                Some(Command::Undo)
            } else {
                None
            }
        });

        let toolbar_command = egui::TopBottomPanel::top("toolbar")
            .show(ctx, |ui| self.toolbar(ui))
            .inner;

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let canvas_rect = response.rect;

            let Some(image_size) = self.current.as_ref().map(Current::image_size) else {
                return;
            };
            if self.needs_fit {
                self.fit_to(canvas_rect, image_size);
            }

            // Handle pan (middle mouse button)
            let middle_down = ctx.input(|i| i.pointer.middle_down());
            if middle_down {
                self.pan += ctx.input(|i| i.pointer.delta());
                self.panning = true;
            } else {
                self.panning = false;
            }

            // Handle zoom (scroll wheel)
            let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
            if scroll_delta != 0.0 && response.hovered() {
                let zoom_factor = 1.0 + scroll_delta * 0.002;
                let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                if let Some(cursor) = response.hover_pos() {
                    let cursor_rel = cursor - canvas_rect.center() - self.pan;
                    self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                }
                self.zoom = new_zoom;
            }

            // Pointer input (primary button only, not while panning)
            let mut events = Vec::new();
            if !self.panning {
                if let Some(pos) = response.hover_pos() {
                    let point = self.screen_to_image(canvas_rect, image_size, pos);
                    events.push(SessionEvent::PointerMoved(point));
                    let pressed = ctx.input(|i| i.pointer.primary_pressed());
                    let inside = self
                        .current
                        .as_ref()
                        .is_some_and(|current| current.contains(point));
                    if pressed && inside {
                        events.push(SessionEvent::PrimaryClick(point));
                    }
                }
            }

            events.extend(
                toolbar_command
                    .or(key_command)
                    .map(SessionEvent::Command),
            );
            self.dispatch_all(ctx, events);

            self.draw_canvas(&painter, canvas_rect);
        });
    }
}

// ── Entry ───────────────────────────────────────────────────────────────────

/// Run the annotation window over `batch` until it is exhausted, aborted or
/// closed. Errors raised inside the UI loop are returned once the window is
/// gone.
pub fn run(batch: Batch, config: &AnnotatorConfig) -> anyhow::Result<BatchSummary> {
    let keys = config.keys.resolve()?;
    let outcome = Rc::new(RefCell::new(RunOutcome::default()));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_title("circle-annotate"),
        ..Default::default()
    };

    let app = CircleApp::new(batch, keys, config.palette.clone(), Rc::clone(&outcome));
    eframe::run_native(
        "circle-annotate",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|err| anyhow::anyhow!("window failed: {err}"))?;

    let mut outcome = outcome.borrow_mut();
    match outcome.error.take() {
        Some(err) => Err(err),
        None => Ok(outcome.summary),
    }
}
