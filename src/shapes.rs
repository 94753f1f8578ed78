//! Drawable shape primitives.
//!
//! `Shape` is a single kind-tagged value describing one in-progress or
//! committed primitive.  Non-path kinds keep a start/end pair and render
//! from the normalized rectangle between them; freehand and eraser paths
//! keep the full point sequence and render as round-capped polylines.

use std::f32::consts::PI;

use egui::{Pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};

use crate::raster;

/// Tool / primitive selector, in toolbar order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Freehand,
    Line,
    Rectangle,
    Ellipse,
    Arrow,
    Star,
    Diamond,
    Heart,
    Eraser,
    GroupSelect,
}

impl ShapeKind {
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Freehand => "Freehand",
            ShapeKind::Line => "Line",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::Ellipse => "Ellipse",
            ShapeKind::Arrow => "Arrow",
            ShapeKind::Star => "Star",
            ShapeKind::Diamond => "Diamond",
            ShapeKind::Heart => "Heart",
            ShapeKind::Eraser => "Eraser",
            ShapeKind::GroupSelect => "Group Select",
        }
    }

    pub fn all() -> &'static [ShapeKind] {
        &[
            ShapeKind::Freehand,
            ShapeKind::Line,
            ShapeKind::Rectangle,
            ShapeKind::Ellipse,
            ShapeKind::Arrow,
            ShapeKind::Star,
            ShapeKind::Diamond,
            ShapeKind::Heart,
            ShapeKind::Eraser,
            ShapeKind::GroupSelect,
        ]
    }

    /// Path kinds accumulate points; the rest only track start/end.
    pub fn is_path(&self) -> bool {
        matches!(self, ShapeKind::Freehand | ShapeKind::Eraser)
    }
}

/// One drawable primitive, alive for the duration of a press-drag-release
/// gesture and then either drawn into the committed layer or dropped.
#[derive(Clone, Debug)]
pub struct Shape {
    pub kind: ShapeKind,
    pub start: Pos2,
    pub end: Pos2,
    /// Recorded point sequence; populated for path kinds only.
    pub points: Vec<Pos2>,
    pub color: Rgba<u8>,
    pub width: f32,
}

impl Shape {
    /// A new shape anchored at the press point.  `kind` must be a drawable
    /// kind, never `GroupSelect`.
    pub fn new(kind: ShapeKind, start: Pos2, color: Rgba<u8>, width: f32) -> Self {
        debug_assert!(kind != ShapeKind::GroupSelect);
        let points = if kind.is_path() { vec![start] } else { Vec::new() };
        Self {
            kind,
            start,
            end: start,
            points,
            color,
            width: width.max(1.0),
        }
    }

    /// Extend the shape toward `p`: path kinds append, others replace the
    /// end point.  Duplicate consecutive points are dropped.
    pub fn update(&mut self, p: Pos2) {
        if self.kind.is_path() {
            if self.points.last() != Some(&p) {
                self.points.push(p);
            }
        }
        self.end = p;
    }

    /// Normalized rectangle spanning the recorded points, outset by the
    /// stroke width for path kinds.
    pub fn bounding_rect(&self) -> Rect {
        if self.kind.is_path() {
            let mut rect = Rect::NOTHING;
            for p in &self.points {
                rect.extend_with(*p);
            }
            rect.expand(self.width)
        } else {
            Rect::from_two_pos(self.start, self.end)
        }
    }

    /// Render into `surface` (the preview layer during a drag, the drawing
    /// layer on commit).
    pub fn draw(&self, surface: &mut RgbaImage) {
        let rect = Rect::from_two_pos(self.start, self.end);
        match self.kind {
            ShapeKind::Freehand => {
                raster::stroke_polyline(surface, &self.points, self.width, Some(self.color));
            }
            ShapeKind::Eraser => {
                raster::stroke_polyline(surface, &self.points, self.width, None);
            }
            ShapeKind::Line => {
                raster::stroke_segment(surface, self.start, self.end, self.width, Some(self.color));
            }
            ShapeKind::Rectangle => {
                let corners = [
                    rect.min,
                    Pos2::new(rect.max.x, rect.min.y),
                    rect.max,
                    Pos2::new(rect.min.x, rect.max.y),
                ];
                raster::stroke_polygon(surface, &corners, self.width, self.color);
            }
            ShapeKind::Ellipse => {
                let pts = ellipse_points(rect);
                raster::stroke_polygon(surface, &pts, self.width, self.color);
            }
            ShapeKind::Arrow => self.draw_arrow(surface),
            ShapeKind::Star => {
                let pts = star_points(rect);
                raster::stroke_polygon(surface, &pts, self.width, self.color);
            }
            ShapeKind::Diamond => {
                let pts = diamond_points(rect);
                raster::stroke_polygon(surface, &pts, self.width, self.color);
            }
            ShapeKind::Heart => {
                let pts = heart_points(rect);
                raster::fill_polygon(surface, &pts, self.color);
            }
            ShapeKind::GroupSelect => {}
        }
    }

    /// Shaft line plus two head segments at ±60° off the reverse shaft
    /// direction; head length is four pen widths.
    fn draw_arrow(&self, surface: &mut RgbaImage) {
        raster::stroke_segment(surface, self.start, self.end, self.width, Some(self.color));

        let head = self.width * 4.0;
        let dx = self.start.x - self.end.x;
        let dy = self.start.y - self.end.y;
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let angle = (-dy).atan2(dx);
        let p1 = self.end
            + Vec2::new((angle + PI / 3.0).sin() * head, (angle + PI / 3.0).cos() * head);
        let p2 = self.end
            + Vec2::new(
                (angle + PI - PI / 3.0).sin() * head,
                (angle + PI - PI / 3.0).cos() * head,
            );
        raster::stroke_segment(surface, self.end, p1, self.width, Some(self.color));
        raster::stroke_segment(surface, self.end, p2, self.width, Some(self.color));
    }
}

// ============================================================================
// VERTEX GENERATORS
// ============================================================================

/// Five-pointed star inscribed in a circle of radius `min(w, h) / 2`
/// centered on `rect`.  Outer vertices sit at `-90° + k·72°`; inner
/// vertices at the midpoint angles with half the radius.
pub fn star_points(rect: Rect) -> Vec<Pos2> {
    let radius = rect.width().min(rect.height()) / 2.0;
    let center = rect.center();
    let mut pts = Vec::with_capacity(10);
    for i in 0..5 {
        let mut angle = 2.0 * PI * i as f32 / 5.0 - PI / 2.0;
        pts.push(center + Vec2::new(radius * angle.cos(), radius * angle.sin()));
        angle += PI / 5.0;
        pts.push(center + Vec2::new(radius / 2.0 * angle.cos(), radius / 2.0 * angle.sin()));
    }
    pts
}

/// Polygon through the top/right/bottom/left edge midpoints of `rect`.
pub fn diamond_points(rect: Rect) -> Vec<Pos2> {
    let c = rect.center();
    vec![
        Pos2::new(c.x, rect.min.y),
        Pos2::new(rect.max.x, c.y),
        Pos2::new(c.x, rect.max.y),
        Pos2::new(rect.min.x, c.y),
    ]
}

/// Two symmetric cubic Béziers from a bottom anchor, flattened to a closed
/// polygon.  Control points scale with `min(w, h) / 100`.
pub fn heart_points(rect: Rect) -> Vec<Pos2> {
    let s = rect.width().min(rect.height()) / 100.0;
    let c = rect.center();
    let top = Pos2::new(c.x, c.y + 25.0 * s);
    let bottom = Pos2::new(c.x, c.y + 45.0 * s);

    let mut pts = vec![top];
    raster::flatten_cubic(
        top,
        Pos2::new(c.x + 45.0 * s, c.y - 55.0 * s),
        Pos2::new(c.x + 95.0 * s, c.y - 35.0 * s),
        bottom,
        &mut pts,
    );
    raster::flatten_cubic(
        bottom,
        Pos2::new(c.x - 95.0 * s, c.y - 35.0 * s),
        Pos2::new(c.x - 45.0 * s, c.y - 55.0 * s),
        top,
        &mut pts,
    );
    pts
}

/// Ellipse outline inscribed in `rect`, sampled densely enough to look
/// smooth after stroking.
fn ellipse_points(rect: Rect) -> Vec<Pos2> {
    let rx = rect.width() / 2.0;
    let ry = rect.height() / 2.0;
    let c = rect.center();
    let n = ((rx.max(ry) * 2.0) as usize).clamp(32, 256);
    (0..n)
        .map(|i| {
            let a = 2.0 * PI * i as f32 / n as f32;
            Pos2::new(c.x + rx * a.cos(), c.y + ry * a.sin())
        })
        .collect()
}
