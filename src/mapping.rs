//! Physical ↔ logical coordinate mapping.
//!
//! Physical coordinates are widget pixels; logical coordinates are pixels of
//! the backing image.  With a background loaded, the image is scaled by
//! `min(widgetW/imgW, widgetH/imgH)` and centered in the widget.  Without
//! one, the mapping is the identity over the widget bounds.

use egui::{Pos2, Rect, Vec2};

#[derive(Clone, Debug)]
pub struct Mapping {
    scale: f32,
    offset: Vec2,
    widget: Vec2,
    background: Option<Vec2>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            widget: Vec2::new(800.0, 600.0),
            background: None,
        }
    }
}

impl Mapping {
    /// Recompute scale and offset.  Called on every resize and every
    /// successful image load.
    pub fn update(&mut self, widget: Vec2, background: Option<(u32, u32)>) {
        self.widget = widget;
        self.background = match background {
            Some((w, h)) if w > 0 && h > 0 => Some(Vec2::new(w as f32, h as f32)),
            _ => None,
        };
        match self.background {
            Some(img) if widget.x > 0.0 && widget.y > 0.0 => {
                self.scale = (widget.x / img.x).min(widget.y / img.y);
                self.offset = Vec2::new(
                    (widget.x - img.x * self.scale) / 2.0,
                    (widget.y - img.y * self.scale) / 2.0,
                );
            }
            _ => {
                self.scale = 1.0;
                self.offset = Vec2::ZERO;
            }
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// The widget-space rectangle the backing image is displayed in.
    /// Falls back to the widget bounds when no background is loaded.
    pub fn displayed_rect(&self) -> Rect {
        match self.background {
            Some(img) => Rect::from_min_size(self.offset.to_pos2(), img * self.scale),
            None => Rect::from_min_size(Pos2::ZERO, self.widget),
        }
    }

    /// Convert a physical (widget) point to logical (image) coordinates.
    /// Points outside the displayed rectangle are clamped in, never rejected.
    pub fn to_logical(&self, physical: Pos2) -> Pos2 {
        let shown = self.displayed_rect();
        let clamped = Pos2::new(
            physical.x.clamp(shown.min.x, shown.max.x),
            physical.y.clamp(shown.min.y, shown.max.y),
        );
        match self.background {
            Some(_) => Pos2::new(
                (clamped.x - self.offset.x) / self.scale,
                (clamped.y - self.offset.y) / self.scale,
            ),
            None => clamped,
        }
    }

    /// Convert a logical point to physical (widget) coordinates.
    pub fn to_physical(&self, logical: Pos2) -> Pos2 {
        match self.background {
            Some(_) => Pos2::new(
                logical.x * self.scale + self.offset.x,
                logical.y * self.scale + self.offset.y,
            ),
            None => logical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_without_background() {
        let mut m = Mapping::default();
        m.update(Vec2::new(640.0, 480.0), None);
        assert_eq!(m.scale(), 1.0);
        assert_eq!(m.offset(), Vec2::ZERO);
        let p = Pos2::new(123.0, 45.0);
        assert_eq!(m.to_logical(p), p);
        assert_eq!(m.to_physical(p), p);
    }

    #[test]
    fn scale_two_for_half_size_image() {
        // 400x300 image shown in an 800x600 widget fits exactly at 2x.
        let mut m = Mapping::default();
        m.update(Vec2::new(800.0, 600.0), Some((400, 300)));
        assert_eq!(m.scale(), 2.0);
        assert_eq!(m.offset(), Vec2::ZERO);
        assert_eq!(m.to_logical(Pos2::new(800.0, 600.0)), Pos2::new(400.0, 300.0));
    }

    #[test]
    fn letterboxed_image_is_centered() {
        let mut m = Mapping::default();
        m.update(Vec2::new(1000.0, 500.0), Some((500, 500)));
        assert_eq!(m.scale(), 1.0);
        assert_eq!(m.offset(), Vec2::new(250.0, 0.0));
        assert_eq!(m.to_logical(Pos2::new(250.0, 0.0)), Pos2::new(0.0, 0.0));
        assert_eq!(m.to_physical(Pos2::new(250.0, 250.0)), Pos2::new(500.0, 250.0));
    }

    #[test]
    fn out_of_range_points_clamp() {
        let mut m = Mapping::default();
        m.update(Vec2::new(800.0, 600.0), Some((400, 300)));
        assert_eq!(m.to_logical(Pos2::new(-50.0, -50.0)), Pos2::new(0.0, 0.0));
        assert_eq!(m.to_logical(Pos2::new(9999.0, 9999.0)), Pos2::new(400.0, 300.0));
    }

    #[test]
    fn round_trip_inside_displayed_rect() {
        let mut m = Mapping::default();
        m.update(Vec2::new(800.0, 600.0), Some((640, 480)));
        for p in [
            Pos2::new(10.0, 10.0),
            Pos2::new(400.0, 300.0),
            Pos2::new(799.0, 599.0),
        ] {
            let back = m.to_physical(m.to_logical(p));
            assert!((back.x - p.x).abs() <= 1.0, "{p:?} -> {back:?}");
            assert!((back.y - p.y).abs() <= 1.0, "{p:?} -> {back:?}");
        }
    }
}
