//! egui application shell: toolbar, canvas panel, and status bar.
//!
//! The shell owns a [`CanvasEngine`] and translates egui input into engine
//! calls.  All painting happens CPU-side in the engine; the shell only
//! re-uploads the rendered frame as a texture when the engine reports a
//! visual change.

use eframe::egui;
use egui::{Color32, ColorImage, Pos2, Sense, TextureHandle, TextureOptions};
use image::Rgba;

use crate::canvas::CanvasEngine;
use crate::io;
use crate::shapes::ShapeKind;
use crate::{log_err, log_info};

pub struct EaselApp {
    engine: CanvasEngine,
    texture: Option<TextureHandle>,
    /// True while a press that started over the canvas is still held, so the
    /// gesture keeps receiving moves even when the pointer leaves the rect.
    pointer_captured: bool,
    pen_rgb: [u8; 3],
    status: String,
}

impl EaselApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            engine: CanvasEngine::new(),
            texture: None,
            pointer_captured: false,
            pen_rgb: [0, 0, 0],
            status: String::new(),
        }
    }

    fn open_image(&mut self) {
        let Some(path) = io::open_dialog() else {
            return;
        };
        match self.engine.load(&path) {
            Ok(()) => {
                log_info!("Loaded {}", path.display());
                self.status = format!("Loaded {}", path.display());
            }
            Err(e) => {
                log_err!("{}", e);
                self.status = e;
            }
        }
    }

    fn save_image(&mut self) {
        let Some(path) = io::save_dialog() else {
            return;
        };
        match self.engine.save(&path) {
            Ok(()) => {
                log_info!("Saved {}", path.display());
                self.status = format!("Saved {}", path.display());
            }
            Err(e) => {
                log_err!("{}", e);
                self.status = e;
            }
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        let (undo, redo, open, save, escape) = ctx.input(|i| {
            (
                i.modifiers.command && !i.modifiers.shift && i.key_pressed(egui::Key::Z),
                i.modifiers.command
                    && (i.key_pressed(egui::Key::Y)
                        || (i.modifiers.shift && i.key_pressed(egui::Key::Z))),
                i.modifiers.command && i.key_pressed(egui::Key::O),
                i.modifiers.command && i.key_pressed(egui::Key::S),
                i.key_pressed(egui::Key::Escape),
            )
        });
        if undo {
            self.engine.undo();
        }
        if redo {
            self.engine.redo();
        }
        if open {
            self.open_image();
        }
        if save {
            self.save_image();
        }
        if escape {
            self.engine.clear_selection();
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("Open…").clicked() {
                self.open_image();
            }
            if ui.button("Save…").clicked() {
                self.save_image();
            }
            ui.separator();

            if ui
                .add_enabled(self.engine.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                self.engine.undo();
            }
            if ui
                .add_enabled(self.engine.can_redo(), egui::Button::new("Redo"))
                .clicked()
            {
                self.engine.redo();
            }
            ui.separator();

            for &kind in ShapeKind::all() {
                let selected = self.engine.tool() == kind;
                if ui.selectable_label(selected, kind.label()).clicked() {
                    self.engine.set_tool(kind);
                }
            }
            ui.separator();

            ui.color_edit_button_srgb(&mut self.pen_rgb);
            let [r, g, b] = self.pen_rgb;
            self.engine.set_pen_color(Rgba([r, g, b, 255]));

            let mut width = self.engine.pen_width();
            ui.add(egui::Slider::new(&mut width, 1.0..=64.0).text("Width"));
            self.engine.set_pen_width(width);
        });
    }

    fn status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            match self.engine.cursor_position() {
                Some(p) => ui.label(format!("{}, {}", p.x.round() as i32, p.y.round() as i32)),
                None => ui.label("—"),
            };
            ui.separator();
            ui.label(&self.status);
        });
    }

    fn canvas_panel(&mut self, ctx: &egui::Context, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        self.engine.on_resize(rect.size());

        let pressed = ctx.input(|i| i.pointer.primary_pressed());
        let down = ctx.input(|i| i.pointer.primary_down());
        let released = ctx.input(|i| i.pointer.primary_released());
        let hover = ctx.input(|i| i.pointer.hover_pos());
        let over_canvas = hover.is_some_and(|p| rect.contains(p));

        // Positions handed to the engine are relative to the canvas widget.
        let local = |p: Pos2| p - rect.min.to_vec2();

        if pressed && over_canvas {
            if let Some(p) = hover {
                self.engine.pointer_pressed(local(p));
                self.pointer_captured = true;
            }
        } else if down && self.pointer_captured {
            if let Some(p) = hover {
                self.engine.pointer_moved(local(p));
            }
        } else if over_canvas {
            if let Some(p) = hover {
                self.engine.pointer_hover(local(p));
            }
        }
        if released && self.pointer_captured {
            self.pointer_captured = false;
            // A release outside the window can arrive with no hover position;
            // the gesture must still terminate, so fall back to the last
            // position egui saw, then to the engine's own last point.
            let latest = ctx.input(|i| i.pointer.latest_pos());
            let fallback = self
                .engine
                .cursor_position()
                .map(|p| self.engine.mapping().to_physical(p));
            if let Some(p) = release_position(hover.or(latest), rect.min, fallback) {
                self.engine.pointer_released(p);
            }
        }

        // Re-upload the frame only when the engine changed something.
        if self.engine.take_dirty() || self.texture.is_none() {
            let frame = self.engine.render_frame();
            let size = [frame.width() as usize, frame.height() as usize];
            let img = ColorImage::from_rgba_unmultiplied(size, frame.as_raw());
            match &mut self.texture {
                Some(tex) => tex.set(img, TextureOptions::NEAREST),
                None => self.texture = Some(ctx.load_texture("canvas", img, TextureOptions::NEAREST)),
            }
        }

        if let Some(tex) = &self.texture {
            let shown = self.engine.mapping().displayed_rect();
            let shown = shown.translate(rect.min.to_vec2());
            ui.painter().image(
                tex.id(),
                shown,
                egui::Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        }
    }
}

/// Widget-local position a pointer release lands at.  `screen` is the live
/// (or last-seen) screen position; `fallback` is already widget-local.
fn release_position(
    screen: Option<Pos2>,
    widget_origin: Pos2,
    fallback: Option<Pos2>,
) -> Option<Pos2> {
    screen.map(|p| p - widget_origin.to_vec2()).or(fallback)
}

impl eframe::App for EaselApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame {
                fill: Color32::from_gray(40),
                ..Default::default()
            })
            .show(ctx, |ui| {
                self.canvas_panel(ctx, ui);
            });

        // Keep repainting while a gesture is in flight so previews track the
        // pointer without waiting for the next input event.
        if self.engine.is_gesture_active() {
            ctx.request_repaint();
        }
    }
}
