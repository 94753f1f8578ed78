//! Software rasterizer for the drawing layer.
//!
//! Everything here operates on plain `RgbaImage` buffers in logical (image)
//! coordinates.  Strokes are built from anti-aliased disc stamps stepped
//! densely along each segment, which gives round caps and joins for free.
//! Erasing uses the same stamps but reduces alpha instead of painting.

use egui::{Pos2, Rect};
use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Dash pattern for the selection outline: 4 px on, 4 px off.
const DASH_ON: i32 = 4;
const DASH_PERIOD: i32 = 8;

/// Segments used when flattening one cubic Bézier.
const BEZIER_STEPS: u32 = 24;

// ============================================================================
// PIXEL-LEVEL BLENDING
// ============================================================================

/// Source-over blend of `color` onto `(x, y)` with the given coverage.
/// Out-of-bounds coordinates are ignored.
pub fn blend_pixel(img: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let sa = (color[3] as f32 / 255.0) * coverage.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let s = color[c] as f32;
        let d = dst[c] as f32;
        dst[c] = ((s * sa + d * da * (1.0 - sa)) / out_a).round().min(255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().min(255.0) as u8;
}

/// Reduce the alpha at `(x, y)` by `coverage` (clear composition).
pub fn erase_pixel(img: &mut RgbaImage, x: i32, y: i32, coverage: f32) {
    if x < 0 || y < 0 || x >= img.width() as i32 || y >= img.height() as i32 {
        return;
    }
    let dst = img.get_pixel_mut(x as u32, y as u32);
    let keep = 1.0 - coverage.clamp(0.0, 1.0);
    dst[3] = (dst[3] as f32 * keep).round() as u8;
}

/// Smoothstep between edge0 and edge1.
#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

// ============================================================================
// STAMPS AND STROKES
// ============================================================================

/// Stamp one anti-aliased disc.  `paint` is the stroke color, or `None` to
/// erase instead of painting.
pub fn stamp_disc(img: &mut RgbaImage, center: Pos2, radius: f32, paint: Option<Rgba<u8>>) {
    let r = radius.max(0.5);
    let x0 = (center.x - r - 1.0).floor() as i32;
    let x1 = (center.x + r + 1.0).ceil() as i32;
    let y0 = (center.y - r - 1.0).floor() as i32;
    let y1 = (center.y + r + 1.0).ceil() as i32;

    for y in y0..=y1 {
        for x in x0..=x1 {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            let dist = (dx * dx + dy * dy).sqrt();
            let cov = smoothstep(r + 0.5, r - 0.5, dist);
            if cov > 0.003 {
                match paint {
                    Some(c) => blend_pixel(img, x, y, c, cov),
                    None => erase_pixel(img, x, y, cov),
                }
            }
        }
    }
}

/// Stroke one segment with round caps by dense disc stepping.
pub fn stroke_segment(img: &mut RgbaImage, a: Pos2, b: Pos2, width: f32, paint: Option<Rgba<u8>>) {
    let radius = (width * 0.5).max(0.5);
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 0.1 {
        stamp_disc(img, a, radius, paint);
        return;
    }

    let steps = distance.ceil() as usize;
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        stamp_disc(img, Pos2::new(a.x + dx * t, a.y + dy * t), radius, paint);
    }
}

/// Stroke an open polyline through `points` (round caps and joins).
pub fn stroke_polyline(img: &mut RgbaImage, points: &[Pos2], width: f32, paint: Option<Rgba<u8>>) {
    match points {
        [] => {}
        [only] => stamp_disc(img, *only, (width * 0.5).max(0.5), paint),
        _ => {
            for pair in points.windows(2) {
                stroke_segment(img, pair[0], pair[1], width, paint);
            }
        }
    }
}

/// Stroke a closed polygon outline.
pub fn stroke_polygon(img: &mut RgbaImage, points: &[Pos2], width: f32, color: Rgba<u8>) {
    if points.is_empty() {
        return;
    }
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        stroke_segment(img, a, b, width, Some(color));
    }
}

// ============================================================================
// POLYGON FILL
// ============================================================================

/// Scanline even-odd fill of a closed polygon.
pub fn fill_polygon(img: &mut RgbaImage, points: &[Pos2], color: Rgba<u8>) {
    if points.len() < 3 {
        return;
    }
    let min_y = points
        .iter()
        .map(|p| p.y)
        .fold(f32::MAX, f32::min)
        .floor()
        .max(0.0) as i32;
    let max_y = points
        .iter()
        .map(|p| p.y)
        .fold(f32::MIN, f32::max)
        .ceil()
        .min(img.height() as f32 - 1.0) as i32;

    let mut xs: Vec<f32> = Vec::new();
    for y in min_y..=max_y {
        let yc = y as f32 + 0.5;
        xs.clear();
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                let t = (yc - a.y) / (b.y - a.y);
                xs.push(a.x + t * (b.x - a.x));
            }
        }
        xs.sort_by(f32::total_cmp);
        for pair in xs.chunks(2) {
            if let [start, end] = pair {
                let x0 = start.round().max(0.0) as i32;
                let x1 = end.round().min(img.width() as f32) as i32;
                for x in x0..x1 {
                    blend_pixel(img, x, y, color, 1.0);
                }
            }
        }
    }
}

/// Flatten one cubic Bézier into line segments, appending to `out`.
/// The start point `p0` is not appended (the caller already holds it).
pub fn flatten_cubic(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, out: &mut Vec<Pos2>) {
    for i in 1..=BEZIER_STEPS {
        let t = i as f32 / BEZIER_STEPS as f32;
        let u = 1.0 - t;
        let x = u * u * u * p0.x
            + 3.0 * u * u * t * p1.x
            + 3.0 * u * t * t * p2.x
            + t * t * t * p3.x;
        let y = u * u * u * p0.y
            + 3.0 * u * u * t * p1.y
            + 3.0 * u * t * t * p2.y
            + t * t * t * p3.y;
        out.push(Pos2::new(x, y));
    }
}

// ============================================================================
// SELECTION HELPERS
// ============================================================================

/// Draw a 1 px dashed rectangle outline (selection preview).
pub fn dashed_rect(img: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let x0 = rect.min.x.round() as i32;
    let y0 = rect.min.y.round() as i32;
    let x1 = rect.max.x.round() as i32;
    let y1 = rect.max.y.round() as i32;

    for x in x0..=x1 {
        if (x - x0) % DASH_PERIOD < DASH_ON {
            blend_pixel(img, x, y0, color, 1.0);
            blend_pixel(img, x, y1, color, 1.0);
        }
    }
    for y in y0..=y1 {
        if (y - y0) % DASH_PERIOD < DASH_ON {
            blend_pixel(img, x0, y, color, 1.0);
            blend_pixel(img, x1, y, color, 1.0);
        }
    }
}

/// Integer pixel bounds of `rect` clamped to the image: `(x0, y0, x1, y1)`,
/// exclusive on the max side.  Returns `None` when the clamped area is empty.
pub fn pixel_bounds(img: &RgbaImage, rect: Rect) -> Option<(u32, u32, u32, u32)> {
    let x0 = rect.min.x.floor().max(0.0) as u32;
    let y0 = rect.min.y.floor().max(0.0) as u32;
    let x1 = (rect.max.x.ceil() as i64).clamp(0, img.width() as i64) as u32;
    let y1 = (rect.max.y.ceil() as i64).clamp(0, img.height() as i64) as u32;
    if x0 >= x1 || y0 >= y1 {
        None
    } else {
        Some((x0, y0, x1, y1))
    }
}

/// Copy the pixel content of `rect` out into its own image.
pub fn copy_region(img: &RgbaImage, rect: Rect) -> Option<RgbaImage> {
    let (x0, y0, x1, y1) = pixel_bounds(img, rect)?;
    let mut out = RgbaImage::new(x1 - x0, y1 - y0);
    for y in y0..y1 {
        for x in x0..x1 {
            out.put_pixel(x - x0, y - y0, *img.get_pixel(x, y));
        }
    }
    Some(out)
}

/// Clear the pixel content of `rect` to full transparency.
pub fn clear_region(img: &mut RgbaImage, rect: Rect) {
    if let Some((x0, y0, x1, y1)) = pixel_bounds(img, rect) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Rgba([0, 0, 0, 0]));
            }
        }
    }
}

/// Paste `patch` onto `img` at `(ox, oy)` with source-over blending.
pub fn paste_region(img: &mut RgbaImage, patch: &RgbaImage, ox: i32, oy: i32) {
    for y in 0..patch.height() {
        for x in 0..patch.width() {
            let p = *patch.get_pixel(x, y);
            if p[3] > 0 {
                blend_pixel(img, ox + x as i32, oy + y as i32, p, 1.0);
            }
        }
    }
}

// ============================================================================
// COMPOSITING
// ============================================================================

/// Source-over composite `src` onto `dst`, row-parallel.  Sizes may differ;
/// only the overlapping region is blended.
pub fn composite_over(dst: &mut RgbaImage, src: &RgbaImage) {
    let w = dst.width().min(src.width()) as usize;
    let h = dst.height().min(src.height()) as usize;
    let dst_stride = dst.width() as usize * 4;
    let src_stride = src.width() as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = &mut *dst;

    dst_raw
        .par_chunks_mut(dst_stride)
        .take(h)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src_raw[y * src_stride..y * src_stride + w * 4];
            for x in 0..w {
                let i = x * 4;
                let sa = src_row[i + 3] as f32 / 255.0;
                if sa <= 0.0 {
                    continue;
                }
                let da = row[i + 3] as f32 / 255.0;
                let out_a = sa + da * (1.0 - sa);
                if out_a <= 0.0 {
                    continue;
                }
                for c in 0..3 {
                    let s = src_row[i + c] as f32;
                    let d = row[i + c] as f32;
                    row[i + c] = ((s * sa + d * da * (1.0 - sa)) / out_a).round().min(255.0) as u8;
                }
                row[i + 3] = (out_a * 255.0).round().min(255.0) as u8;
            }
        });
}
