//! Canvas engine: layers, coordinate mapping, and the gesture state machine.
//!
//! The engine owns three rasters in logical (image) coordinates:
//!
//! * `background` — the loaded image, if any; replaced wholesale by
//!   `load`/`undo`/`redo`.
//! * `drawing`    — committed strokes and shapes, fully transparent until
//!   the user paints; the layer that history and saving operate on.
//! * `preview`    — `drawing` plus the in-progress shape, rebuilt on every
//!   pointer move and never recorded in history.
//!
//! The UI shell feeds physical pointer positions in; everything past the
//! mapper runs in logical coordinates.

use egui::{Pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};
use std::path::Path;

use crate::history::History;
use crate::io;
use crate::mapping::Mapping;
use crate::raster;
use crate::shapes::{Shape, ShapeKind};

/// Default logical canvas size before any image is loaded.
const DEFAULT_WIDTH: u32 = 800;
const DEFAULT_HEIGHT: u32 = 600;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Interaction state.  One gesture (press-drag-release) at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Gesture {
    Idle,
    Drawing,
    Selecting,
}

pub struct CanvasEngine {
    background: Option<RgbaImage>,
    drawing: RgbaImage,
    preview: RgbaImage,
    mapping: Mapping,
    widget_size: Vec2,

    pen_color: Rgba<u8>,
    pen_width: f32,
    tool: ShapeKind,

    gesture: Gesture,
    active_shape: Option<Shape>,
    selection_start: Pos2,
    selection_rect: Option<Rect>,
    last_gesture_pos: Option<Pos2>,

    cursor_pos: Option<Pos2>,
    history: History,
    dirty: bool,
}

impl Default for CanvasEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasEngine {
    pub fn new() -> Self {
        let drawing = RgbaImage::new(DEFAULT_WIDTH, DEFAULT_HEIGHT);
        let preview = drawing.clone();
        let mut engine = Self {
            background: None,
            drawing,
            preview,
            mapping: Mapping::default(),
            widget_size: Vec2::new(DEFAULT_WIDTH as f32, DEFAULT_HEIGHT as f32),
            pen_color: BLACK,
            pen_width: 3.0,
            tool: ShapeKind::Freehand,
            gesture: Gesture::Idle,
            active_shape: None,
            selection_start: Pos2::ZERO,
            selection_rect: None,
            last_gesture_pos: None,
            cursor_pos: None,
            history: History::default(),
            dirty: true,
        };
        // Baseline entry: the blank canvas the user can never undo past.
        engine.history.push(engine.composite());
        engine
    }

    // ---- tool configuration -------------------------------------------------

    pub fn set_pen_color(&mut self, color: Rgba<u8>) {
        self.pen_color = color;
    }

    pub fn set_pen_width(&mut self, width: f32) {
        self.pen_width = width.max(1.0);
    }

    pub fn set_tool(&mut self, tool: ShapeKind) {
        self.tool = tool;
    }

    pub fn pen_color(&self) -> Rgba<u8> {
        self.pen_color
    }

    pub fn pen_width(&self) -> f32 {
        self.pen_width
    }

    pub fn tool(&self) -> ShapeKind {
        self.tool
    }

    // ---- accessors ----------------------------------------------------------

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn drawing(&self) -> &RgbaImage {
        &self.drawing
    }

    pub fn background(&self) -> Option<&RgbaImage> {
        self.background.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn history_len(&self) -> usize {
        self.history.undo_count()
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Last known logical pointer position, for the status readout.
    pub fn cursor_position(&self) -> Option<Pos2> {
        self.cursor_pos
    }

    /// True once since the last visual change; the shell re-uploads the
    /// frame texture when set.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ---- pointer events (physical/widget coordinates) -----------------------

    pub fn pointer_pressed(&mut self, physical: Pos2) {
        let p = self.mapping.to_logical(physical);
        self.cursor_pos = Some(p);
        self.last_gesture_pos = Some(p);
        match self.tool {
            ShapeKind::GroupSelect => {
                self.gesture = Gesture::Selecting;
                self.selection_start = p;
                self.selection_rect = None;
                self.dirty = true;
            }
            kind => {
                self.gesture = Gesture::Drawing;
                self.active_shape = Some(Shape::new(kind, p, self.pen_color, self.pen_width));
                self.rebuild_preview();
            }
        }
    }

    pub fn pointer_moved(&mut self, physical: Pos2) {
        let p = self.mapping.to_logical(physical);
        self.cursor_pos = Some(p);
        if self.last_gesture_pos == Some(p) {
            return;
        }
        self.last_gesture_pos = Some(p);
        match self.gesture {
            Gesture::Drawing => {
                if let Some(shape) = self.active_shape.as_mut() {
                    shape.update(p);
                    self.rebuild_preview();
                }
            }
            Gesture::Selecting => {
                self.selection_rect = Some(Rect::from_two_pos(self.selection_start, p));
                self.dirty = true;
            }
            Gesture::Idle => {}
        }
    }

    pub fn pointer_released(&mut self, physical: Pos2) {
        let p = self.mapping.to_logical(physical);
        self.cursor_pos = Some(p);
        match self.gesture {
            Gesture::Drawing => {
                if let Some(mut shape) = self.active_shape.take() {
                    shape.update(p);
                    // A no-background resize changes the composite without a
                    // commit; record it first so undoing this stroke lands on
                    // the resized canvas.  Usually a duplicate of the top and
                    // suppressed.
                    self.history.push(self.composite());
                    shape.draw(&mut self.drawing);
                }
                self.gesture = Gesture::Idle;
                self.last_gesture_pos = None;
                self.rebuild_preview();
                self.push_snapshot();
            }
            Gesture::Selecting => {
                self.commit_select_move(p);
                self.gesture = Gesture::Idle;
                self.last_gesture_pos = None;
                self.rebuild_preview();
            }
            Gesture::Idle => {}
        }
    }

    /// Cursor movement with no button held: status readout only.
    pub fn pointer_hover(&mut self, physical: Pos2) {
        self.cursor_pos = Some(self.mapping.to_logical(physical));
    }

    // ---- operations exposed to the UI shell ---------------------------------

    /// Replace the background with the image decoded from `path`.  On
    /// failure the canvas is left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), String> {
        let img = io::load_image(path)?;
        self.load_from_image(img);
        Ok(())
    }

    /// Replace the background with an already-decoded image.  The previous
    /// state is recorded first so the load itself is undoable.
    pub fn load_from_image(&mut self, img: RgbaImage) {
        self.abort_gesture();
        self.history.push(self.composite());
        let (w, h) = img.dimensions();
        self.background = Some(img);
        self.drawing = RgbaImage::new(w, h);
        self.mapping.update(self.widget_size, Some((w, h)));
        self.rebuild_preview();
        self.history.push(self.composite());
    }

    /// Encode the current composite to `path`.  Does not mutate state.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        io::save_image(&self.composite(), path)
    }

    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.undo() {
            self.apply_snapshot(snapshot);
        }
    }

    pub fn redo(&mut self) {
        if let Some(snapshot) = self.history.redo() {
            self.apply_snapshot(snapshot);
        }
    }

    /// Force-exit an in-progress selection without committing a move.
    pub fn clear_selection(&mut self) {
        if self.gesture == Gesture::Selecting {
            self.gesture = Gesture::Idle;
        }
        self.selection_rect = None;
        self.last_gesture_pos = None;
        self.dirty = true;
    }

    /// React to the canvas widget changing size.  Zero-size resizes are
    /// absorbed.  An active gesture is aborted: the in-progress shape is
    /// dropped, the committed layer is kept, and nothing reaches history.
    pub fn on_resize(&mut self, size: Vec2) {
        if size.x < 1.0 || size.y < 1.0 || size == self.widget_size {
            return;
        }
        self.abort_gesture();
        self.widget_size = size;
        let bg_dims = self.background.as_ref().map(|b| b.dimensions());
        self.mapping.update(size, bg_dims);
        if self.background.is_none() {
            self.resize_drawing_to_widget();
        }
        self.rebuild_preview();
    }

    /// Merge background (white sheet when none) and drawing layer.  This is
    /// the snapshot unit for history and the image that gets saved.
    pub fn composite(&self) -> RgbaImage {
        let mut out = match &self.background {
            Some(bg) => bg.clone(),
            None => RgbaImage::from_pixel(self.drawing.width(), self.drawing.height(), WHITE),
        };
        raster::composite_over(&mut out, &self.drawing);
        out
    }

    /// The frame the shell displays: composite with the preview layer in
    /// place of the committed one, plus the dashed selection outline.
    pub fn render_frame(&self) -> RgbaImage {
        let mut out = match &self.background {
            Some(bg) => bg.clone(),
            None => RgbaImage::from_pixel(self.preview.width(), self.preview.height(), WHITE),
        };
        raster::composite_over(&mut out, &self.preview);
        if let Some(rect) = self.selection_rect {
            raster::dashed_rect(&mut out, rect, BLACK);
        }
        out
    }

    // ---- internals ----------------------------------------------------------

    fn rebuild_preview(&mut self) {
        self.preview = self.drawing.clone();
        if let Some(shape) = &self.active_shape {
            shape.draw(&mut self.preview);
        }
        self.dirty = true;
    }

    fn push_snapshot(&mut self) {
        self.history.push(self.composite());
    }

    fn abort_gesture(&mut self) {
        self.gesture = Gesture::Idle;
        self.active_shape = None;
        self.selection_rect = None;
        self.last_gesture_pos = None;
    }

    /// Restore an undo/redo snapshot: the composite becomes the new
    /// background under a fresh transparent drawing layer.
    fn apply_snapshot(&mut self, snapshot: RgbaImage) {
        self.abort_gesture();
        let (w, h) = snapshot.dimensions();
        self.background = Some(snapshot);
        self.drawing = RgbaImage::new(w, h);
        self.mapping.update(self.widget_size, Some((w, h)));
        self.rebuild_preview();
    }

    /// Cut the selected pixels out of the drawing layer and paste them
    /// translated by the drag delta.
    fn commit_select_move(&mut self, release: Pos2) {
        let rect = Rect::from_two_pos(self.selection_start, release);
        self.selection_rect = None;
        let Some(patch) = raster::copy_region(&self.drawing, rect) else {
            self.dirty = true;
            return;
        };
        // Same pre-commit record as the stroke path: uncommitted size
        // changes must be undoable separately from the move.
        self.history.push(self.composite());
        raster::clear_region(&mut self.drawing, rect);
        let delta = release - self.selection_start;
        let ox = (rect.min.x.floor() + delta.x).round() as i32;
        let oy = (rect.min.y.floor() + delta.y).round() as i32;
        raster::paste_region(&mut self.drawing, &patch, ox, oy);
        self.push_snapshot();
    }

    /// Grow/shrink the drawing layer to the widget size, keeping existing
    /// pixels anchored at the origin.  Only used while no background is
    /// loaded (the layer otherwise tracks the background size).
    fn resize_drawing_to_widget(&mut self) {
        let w = self.widget_size.x.ceil().max(1.0) as u32;
        let h = self.widget_size.y.ceil().max(1.0) as u32;
        if self.drawing.dimensions() == (w, h) {
            return;
        }
        let mut next = RgbaImage::new(w, h);
        let cw = w.min(self.drawing.width());
        let ch = h.min(self.drawing.height());
        for y in 0..ch {
            for x in 0..cw {
                next.put_pixel(x, y, *self.drawing.get_pixel(x, y));
            }
        }
        self.drawing = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn drag(engine: &mut CanvasEngine, from: Pos2, to: Pos2) {
        engine.pointer_pressed(from);
        engine.pointer_moved(to);
        engine.pointer_released(to);
    }

    #[test]
    fn rectangle_gesture_commits_once() {
        let mut engine = CanvasEngine::new();
        engine.set_tool(ShapeKind::Rectangle);
        engine.set_pen_color(RED);
        engine.set_pen_width(3.0);
        let before = engine.history_len();

        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(110.0, 60.0));

        // Outline pixels of the normalized (10,10)-(110,60) rect are red.
        assert_eq!(*engine.drawing().get_pixel(10, 35), RED);
        assert_eq!(*engine.drawing().get_pixel(60, 10), RED);
        assert_eq!(engine.drawing().get_pixel(60, 35)[3], 0);
        assert_eq!(engine.history_len(), before + 1);
    }

    #[test]
    fn zero_length_eraser_drag_pushes_nothing() {
        let mut engine = CanvasEngine::new();
        engine.set_tool(ShapeKind::Eraser);
        let before = engine.history_len();
        drag(&mut engine, Pos2::new(40.0, 40.0), Pos2::new(40.0, 40.0));
        // Erasing blank pixels leaves the composite equal to the top entry.
        assert_eq!(engine.history_len(), before);
        assert!(!engine.can_undo());
    }

    #[test]
    fn undo_then_redo_restores_composites_exactly() {
        let mut engine = CanvasEngine::new();
        engine.set_tool(ShapeKind::Line);
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(100.0, 10.0));
        let one_stroke = engine.composite();
        drag(&mut engine, Pos2::new(10.0, 50.0), Pos2::new(100.0, 50.0));
        let two_strokes = engine.composite();
        assert_ne!(one_stroke.as_raw(), two_strokes.as_raw());

        engine.undo();
        assert_eq!(engine.composite().as_raw(), one_stroke.as_raw());
        engine.redo();
        assert_eq!(engine.composite().as_raw(), two_strokes.as_raw());
    }

    #[test]
    fn undo_at_baseline_keeps_state() {
        let mut engine = CanvasEngine::new();
        let blank = engine.composite();
        engine.undo();
        assert_eq!(engine.composite().as_raw(), blank.as_raw());
    }

    #[test]
    fn new_commit_clears_redo() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(50.0, 10.0));
        engine.undo();
        assert!(engine.can_redo());
        drag(&mut engine, Pos2::new(10.0, 30.0), Pos2::new(50.0, 30.0));
        assert!(!engine.can_redo());
    }

    #[test]
    fn loading_an_image_rescales_the_mapping() {
        let mut engine = CanvasEngine::new();
        engine.on_resize(Vec2::new(800.0, 600.0));
        engine.load_from_image(RgbaImage::from_pixel(400, 300, Rgba([0, 255, 0, 255])));

        assert_eq!(engine.mapping().scale(), 2.0);
        assert_eq!(engine.mapping().offset(), Vec2::ZERO);
        assert_eq!(engine.drawing().dimensions(), (400, 300));
        // A widget-space press lands at half the coordinates in image space.
        engine.pointer_hover(Pos2::new(100.0, 100.0));
        assert_eq!(engine.cursor_position(), Some(Pos2::new(50.0, 50.0)));
    }

    #[test]
    fn load_is_undoable() {
        let mut engine = CanvasEngine::new();
        let blank = engine.composite();
        engine.load_from_image(RgbaImage::from_pixel(64, 64, Rgba([0, 255, 0, 255])));
        assert_ne!(engine.composite().as_raw(), blank.as_raw());
        engine.undo();
        assert_eq!(engine.composite().as_raw(), blank.as_raw());
    }

    #[test]
    fn resize_mid_gesture_aborts_without_committing() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        let before = engine.history_len();

        engine.pointer_pressed(Pos2::new(10.0, 10.0));
        engine.pointer_moved(Pos2::new(50.0, 50.0));
        assert!(engine.is_gesture_active());

        engine.on_resize(Vec2::new(1000.0, 700.0));
        assert!(!engine.is_gesture_active());
        // The in-progress stroke never reached the committed layer.
        assert!(engine.drawing().pixels().all(|p| p[3] == 0));
        assert_eq!(engine.history_len(), before);

        // A stray release afterwards is ignored.
        engine.pointer_released(Pos2::new(60.0, 60.0));
        assert_eq!(engine.history_len(), before);
    }

    #[test]
    fn resize_preserves_committed_pixels_at_origin() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(20.0, 20.0), Pos2::new(20.0, 20.0));
        assert!(engine.drawing().get_pixel(20, 20)[3] > 0);

        engine.on_resize(Vec2::new(1024.0, 768.0));
        assert_eq!(engine.drawing().dimensions(), (1024, 768));
        assert!(engine.drawing().get_pixel(20, 20)[3] > 0);
    }

    #[test]
    fn undo_after_growing_resize_restores_grown_canvas() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        engine.on_resize(Vec2::new(1000.0, 700.0));
        engine.set_tool(ShapeKind::Line);
        drag(&mut engine, Pos2::new(20.0, 20.0), Pos2::new(80.0, 20.0));
        assert_eq!(engine.composite().dimensions(), (1000, 700));

        // Undo removes the stroke but keeps the grown blank canvas.
        engine.undo();
        assert_eq!(engine.composite().dimensions(), (1000, 700));
        assert!(engine.drawing().pixels().all(|p| p[3] == 0));
        assert_eq!(
            *engine.composite().get_pixel(50, 20),
            Rgba([255, 255, 255, 255])
        );

        engine.redo();
        assert_eq!(*engine.composite().get_pixel(50, 20), RED);
    }

    #[test]
    fn undo_after_resize_then_select_move_keeps_grown_canvas() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(10.0, 10.0));
        engine.on_resize(Vec2::new(1000.0, 700.0));

        engine.set_tool(ShapeKind::GroupSelect);
        drag(&mut engine, Pos2::new(5.0, 5.0), Pos2::new(25.0, 25.0));
        assert_eq!(engine.drawing().get_pixel(30, 30)[3], 255);

        engine.undo();
        assert_eq!(engine.composite().dimensions(), (1000, 700));
        assert_eq!(*engine.composite().get_pixel(10, 10), RED);
        assert_eq!(
            *engine.composite().get_pixel(30, 30),
            Rgba([255, 255, 255, 255])
        );
    }

    #[test]
    fn select_move_translates_pixels() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        // Commit a dot at (10,10).
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(10.0, 10.0));
        assert_eq!(engine.drawing().get_pixel(10, 10)[3], 255);
        let before = engine.history_len();

        engine.set_tool(ShapeKind::GroupSelect);
        drag(&mut engine, Pos2::new(5.0, 5.0), Pos2::new(25.0, 25.0));

        // The dot moved by the drag delta (20,20); the source was cleared.
        assert_eq!(engine.drawing().get_pixel(10, 10)[3], 0);
        assert_eq!(engine.drawing().get_pixel(30, 30)[3], 255);
        assert_eq!(engine.history_len(), before + 1);
    }

    #[test]
    fn clear_selection_exits_without_committing() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(10.0, 10.0));
        let committed = engine.drawing().clone();
        let before = engine.history_len();

        engine.set_tool(ShapeKind::GroupSelect);
        engine.pointer_pressed(Pos2::new(5.0, 5.0));
        engine.pointer_moved(Pos2::new(25.0, 25.0));
        engine.clear_selection();

        assert!(!engine.is_gesture_active());
        assert_eq!(engine.drawing().as_raw(), committed.as_raw());
        assert_eq!(engine.history_len(), before);
    }

    #[test]
    fn save_then_load_round_trips_the_composite() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(100.0, 80.0));
        let saved = engine.composite();

        let path = std::env::temp_dir()
            .join(format!("easel-canvas-test-{}.png", std::process::id()));
        engine.save(&path).unwrap();
        engine.load(&path).unwrap();
        assert_eq!(engine.composite().as_raw(), saved.as_raw());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn failed_load_leaves_state_untouched() {
        let mut engine = CanvasEngine::new();
        engine.set_pen_color(RED);
        drag(&mut engine, Pos2::new(10.0, 10.0), Pos2::new(50.0, 50.0));
        let before = engine.composite();
        let history_before = engine.history_len();

        let err = engine.load(std::path::Path::new("/nonexistent/easel/missing.png"));
        assert!(err.is_err());
        assert_eq!(engine.composite().as_raw(), before.as_raw());
        assert_eq!(engine.history_len(), history_before);
    }

    #[test]
    fn hover_reports_logical_cursor_position() {
        let mut engine = CanvasEngine::new();
        engine.pointer_hover(Pos2::new(123.0, 45.0));
        assert_eq!(engine.cursor_position(), Some(Pos2::new(123.0, 45.0)));
        assert!(!engine.is_gesture_active());
    }
}
