//! Geometric filtering and rectification of detected text regions.
//!
//! Detectors return four-corner polygons in arbitrary order and arbitrary
//! frame positions. This module puts them into natural reading order, keeps
//! only the ones shaped and placed like burned-in subtitles, and warps each
//! survivor into an upright crop ready for recognition.

use subtitle_lift_types::{GrayFrame, Point, TextRegion};

/// Two regions whose top edges are within this many pixels vertically are
/// treated as the same visual line when ordering.
const ROW_TOLERANCE_PX: f32 = 10.0;

/// A rectified crop at least this much taller than wide gets rotated 90°
/// to recover accidentally vertical text.
const ROTATE_ASPECT_THRESHOLD: f32 = 1.5;

/// Ratios describing where in the frame a subtitle is allowed to live and
/// how large it may be, all relative to frame dimensions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryConfig {
    /// Width of the centered horizontal band the centroid must fall in.
    pub center_ratio: f32,
    /// Height of the bottom band the centroid must fall in.
    pub bottom_ratio: f32,
    /// Minimum region width.
    pub min_width_ratio: f32,
    /// Maximum region width.
    pub horizontal_ratio: f32,
    /// Maximum region height.
    pub max_height_ratio: f32,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            center_ratio: 0.5,
            bottom_ratio: 0.2,
            min_width_ratio: 0.05,
            horizontal_ratio: 0.9,
            max_height_ratio: 0.25,
        }
    }
}

/// How a region is squared up before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectifyMode {
    /// Warp the detector quad directly.
    Quad,
    /// Warp the minimum-area enclosing rectangle of the quad.
    MinAreaRect,
}

impl RectifyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RectifyMode::Quad => "quad",
            RectifyMode::MinAreaRect => "min-area-rect",
        }
    }
}

/// Sorts regions top-to-bottom, left-to-right, then runs a local adjacency
/// correction: neighbors whose top edges sit within [`ROW_TOLERANCE_PX`] of
/// each other belong to the same visual line and are reordered by x. A plain
/// lexicographic sort would split lines whose boxes are a few pixels off,
/// which scrambles multi-line joins.
pub fn sort_reading_order(regions: &mut [TextRegion]) {
    regions.sort_by(|a, b| {
        let pa = a.top_left();
        let pb = b.top_left();
        pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
    });

    for i in 0..regions.len().saturating_sub(1) {
        for j in (0..=i).rev() {
            let later = regions[j + 1].top_left();
            let earlier = regions[j].top_left();
            if (later.y - earlier.y).abs() < ROW_TOLERANCE_PX && later.x < earlier.x {
                regions.swap(j, j + 1);
            } else {
                break;
            }
        }
    }
}

/// Keeps only regions whose centroid sits in the centered bottom band and
/// whose size falls within the configured subtitle bounds. Rejects
/// full-width overlays, logos, and corner timestamps.
pub fn filter_subtitle_regions(
    regions: Vec<TextRegion>,
    frame_width: u32,
    frame_height: u32,
    config: &GeometryConfig,
) -> Vec<TextRegion> {
    let w = frame_width as f32;
    let h = frame_height as f32;
    let center_x_min = (1.0 - config.center_ratio) / 2.0 * w;
    let center_x_max = (1.0 + config.center_ratio) / 2.0 * w;
    let bottom_y_min = (1.0 - config.bottom_ratio) * h;
    let min_width = config.min_width_ratio * w;
    let max_width = config.horizontal_ratio * w;
    let max_height = config.max_height_ratio * h;

    regions
        .into_iter()
        .filter(|region| {
            let centroid = region.centroid();
            let width = region.width();
            let height = region.height();
            centroid.x >= center_x_min
                && centroid.x <= center_x_max
                && centroid.y >= bottom_y_min
                && width >= min_width
                && width <= max_width
                && height < max_height
        })
        .collect()
}

/// Rectifies one region into an upright crop, or `None` when the region is
/// degenerate. The crop inherits the source frame's index and timestamp.
pub fn rectify(frame: &GrayFrame, region: &TextRegion, mode: RectifyMode) -> Option<GrayFrame> {
    let corners = match mode {
        RectifyMode::Quad => region.corners,
        RectifyMode::MinAreaRect => canonicalize_corners(min_area_rect(&region.corners)),
    };
    rectify_corners(frame, corners)
}

/// Rectifies every region and drops crops that came out taller than wide;
/// subtitle lines are wider than tall, so vertical slivers are detector
/// artifacts.
pub fn rectify_regions(
    frame: &GrayFrame,
    regions: &[TextRegion],
    mode: RectifyMode,
) -> Vec<GrayFrame> {
    regions
        .iter()
        .filter_map(|region| rectify(frame, region, mode))
        .filter(|crop| crop.width() > crop.height())
        .collect()
}

fn rectify_corners(frame: &GrayFrame, corners: [Point; 4]) -> Option<GrayFrame> {
    let crop_width = corners[0]
        .distance(&corners[1])
        .max(corners[2].distance(&corners[3])) as u32;
    let crop_height = corners[0]
        .distance(&corners[3])
        .max(corners[1].distance(&corners[2])) as u32;
    if crop_width == 0 || crop_height == 0 {
        return None;
    }

    let map = QuadMap::new(&corners)?;
    let mut data = Vec::with_capacity((crop_width * crop_height) as usize);
    for y in 0..crop_height {
        let v = y as f64 / crop_height as f64;
        for x in 0..crop_width {
            let u = x as f64 / crop_width as f64;
            let (sx, sy) = map.apply(u, v);
            data.push(sample_bicubic(frame, sx, sy));
        }
    }

    let (width, height, data) =
        if crop_height as f32 / crop_width as f32 >= ROTATE_ASPECT_THRESHOLD {
            rotate90_ccw(crop_width, crop_height, &data)
        } else {
            (crop_width, crop_height, data)
        };

    GrayFrame::from_owned(width, height, width as usize, frame.timestamp(), data)
        .ok()
        .map(|crop| crop.with_frame_index(frame.frame_index()))
}

/// Projective mapping from the unit square onto a quadrilateral, corners in
/// (top-left, top-right, bottom-right, bottom-left) order.
struct QuadMap {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
    g: f64,
    h: f64,
}

impl QuadMap {
    fn new(corners: &[Point; 4]) -> Option<Self> {
        let (x0, y0) = (corners[0].x as f64, corners[0].y as f64);
        let (x1, y1) = (corners[1].x as f64, corners[1].y as f64);
        let (x2, y2) = (corners[2].x as f64, corners[2].y as f64);
        let (x3, y3) = (corners[3].x as f64, corners[3].y as f64);

        let sx = x0 - x1 + x2 - x3;
        let sy = y0 - y1 + y2 - y3;

        if sx.abs() < f64::EPSILON && sy.abs() < f64::EPSILON {
            // Parallelogram: the mapping is affine.
            return Some(Self {
                a: x1 - x0,
                b: x3 - x0,
                c: x0,
                d: y1 - y0,
                e: y3 - y0,
                f: y0,
                g: 0.0,
                h: 0.0,
            });
        }

        let dx1 = x1 - x2;
        let dx2 = x3 - x2;
        let dy1 = y1 - y2;
        let dy2 = y3 - y2;
        let den = dx1 * dy2 - dy1 * dx2;
        if den.abs() < f64::EPSILON {
            return None;
        }
        let g = (sx * dy2 - sy * dx2) / den;
        let h = (dx1 * sy - dy1 * sx) / den;
        Some(Self {
            a: x1 - x0 + g * x1,
            b: x3 - x0 + h * x3,
            c: x0,
            d: y1 - y0 + g * y1,
            e: y3 - y0 + h * y3,
            f: y0,
            g,
            h,
        })
    }

    fn apply(&self, u: f64, v: f64) -> (f64, f64) {
        let w = self.g * u + self.h * v + 1.0;
        (
            (self.a * u + self.b * v + self.c) / w,
            (self.d * u + self.e * v + self.f) / w,
        )
    }
}

fn cubic_weight(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        (A + 2.0) * t * t * t - (A + 3.0) * t * t + 1.0
    } else if t < 2.0 {
        A * (t * t * t - 5.0 * t * t + 8.0 * t - 4.0)
    } else {
        0.0
    }
}

/// Bicubic sample at a fractional source position with edge replication.
fn sample_bicubic(frame: &GrayFrame, x: f64, y: f64) -> u8 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let mut acc = 0.0;
    for n in -1i64..=2 {
        let wy = cubic_weight(n as f64 - fy);
        if wy == 0.0 {
            continue;
        }
        for m in -1i64..=2 {
            let wx = cubic_weight(m as f64 - fx);
            if wx == 0.0 {
                continue;
            }
            let sample = frame.pixel_clamped(x0 as i64 + m, y0 as i64 + n);
            acc += wx * wy * sample as f64;
        }
    }
    acc.round().clamp(0.0, 255.0) as u8
}

fn rotate90_ccw(width: u32, height: u32, data: &[u8]) -> (u32, u32, Vec<u8>) {
    let w = width as usize;
    let h = height as usize;
    let mut rotated = vec![0u8; w * h];
    // Counter-clockwise: output row i comes from input column (width - 1 - i).
    for i in 0..w {
        for j in 0..h {
            rotated[i * h + j] = data[j * w + (w - 1 - i)];
        }
    }
    (height, width, rotated)
}

/// Minimum-area enclosing rectangle of a point set, via convex hull plus
/// rotating calipers. Corner order is unspecified; see
/// [`canonicalize_corners`].
pub fn min_area_rect(points: &[Point]) -> [Point; 4] {
    let hull = convex_hull(points);
    if hull.len() < 3 {
        return bounding_rect(points);
    }

    let mut best_area = f32::INFINITY;
    let mut best = bounding_rect(points);

    for i in 0..hull.len() {
        let p = hull[i];
        let q = hull[(i + 1) % hull.len()];
        let len = p.distance(&q);
        if len <= f32::EPSILON {
            continue;
        }
        let ux = (q.x - p.x) / len;
        let uy = (q.y - p.y) / len;
        // Normal of the edge direction.
        let nx = -uy;
        let ny = ux;

        let mut s_min = f32::INFINITY;
        let mut s_max = f32::NEG_INFINITY;
        let mut t_min = f32::INFINITY;
        let mut t_max = f32::NEG_INFINITY;
        for point in &hull {
            let dx = point.x - p.x;
            let dy = point.y - p.y;
            let s = dx * ux + dy * uy;
            let t = dx * nx + dy * ny;
            s_min = s_min.min(s);
            s_max = s_max.max(s);
            t_min = t_min.min(t);
            t_max = t_max.max(t);
        }

        let area = (s_max - s_min) * (t_max - t_min);
        if area < best_area {
            best_area = area;
            let corner = |s: f32, t: f32| Point {
                x: p.x + ux * s + nx * t,
                y: p.y + uy * s + ny * t,
            };
            best = [
                corner(s_min, t_min),
                corner(s_max, t_min),
                corner(s_max, t_max),
                corner(s_min, t_max),
            ];
        }
    }

    best
}

/// Orders min-area-rect corners as (top-left, top-right, bottom-right,
/// bottom-left): sort by x, then assign top/bottom within the left and right
/// pairs by comparing y.
pub fn canonicalize_corners(mut corners: [Point; 4]) -> [Point; 4] {
    corners.sort_by(|a, b| a.x.total_cmp(&b.x));

    let (top_left, bottom_left) = if corners[1].y > corners[0].y {
        (corners[0], corners[1])
    } else {
        (corners[1], corners[0])
    };
    let (top_right, bottom_right) = if corners[3].y > corners[2].y {
        (corners[2], corners[3])
    } else {
        (corners[3], corners[2])
    };

    [top_left, top_right, bottom_right, bottom_left]
}

fn bounding_rect(points: &[Point]) -> [Point; 4] {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }
    [
        Point::new(min_x, min_y),
        Point::new(max_x, min_y),
        Point::new(max_x, max_y),
        Point::new(min_x, max_y),
    ]
}

/// Convex hull by monotone chain, counter-clockwise, no repeated endpoint.
fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| a.x == b.x && a.y == b.y);
    if sorted.len() < 3 {
        return sorted;
    }

    let cross = |o: Point, a: Point, b: Point| -> f32 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() * 2);
    for &point in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], point) <= 0.0 {
            hull.pop();
        }
        hull.push(point);
    }
    let lower_len = hull.len() + 1;
    for &point in sorted.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], point) <= 0.0
        {
            hull.pop();
        }
        hull.push(point);
    }
    hull.pop();
    hull
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(width: u32, height: u32, fill: u8) -> GrayFrame {
        GrayFrame::from_packed(width, height, vec![fill; (width * height) as usize]).unwrap()
    }

    fn gradient_frame(width: u32, height: u32) -> GrayFrame {
        let mut data = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(((x + y * width) % 251) as u8);
            }
        }
        GrayFrame::from_packed(width, height, data).unwrap()
    }

    #[test]
    fn reading_order_handles_same_row_jitter() {
        // Two boxes on one visual line, returned right-first by the detector
        // with a few pixels of vertical jitter.
        let right = TextRegion::from_rect(200.0, 100.0, 80.0, 20.0);
        let left = TextRegion::from_rect(40.0, 104.0, 80.0, 20.0);
        let below = TextRegion::from_rect(40.0, 140.0, 80.0, 20.0);
        let mut regions = vec![below, right, left];
        sort_reading_order(&mut regions);
        assert_eq!(regions, vec![left, right, below]);
    }

    #[test]
    fn reading_order_respects_tolerance_boundary() {
        // 10px apart is a different row; the later-left box must not move up.
        let upper = TextRegion::from_rect(200.0, 100.0, 80.0, 20.0);
        let lower_left = TextRegion::from_rect(40.0, 110.0, 80.0, 20.0);
        let mut regions = vec![lower_left, upper];
        sort_reading_order(&mut regions);
        assert_eq!(regions, vec![upper, lower_left]);
    }

    #[test]
    fn filter_rejects_top_of_frame() {
        let config = GeometryConfig::default();
        // Centered at (0.5 W, 0.1 H): well above the bottom band.
        let region = TextRegion::from_rect(270.0, 26.0, 100.0, 20.0);
        let kept = filter_subtitle_regions(vec![region], 640, 360, &config);
        assert!(kept.is_empty());
    }

    #[test]
    fn filter_keeps_bottom_center() {
        let config = GeometryConfig::default();
        // Centered at (0.5 W, 0.95 H).
        let region = TextRegion::from_rect(270.0, 332.0, 100.0, 20.0);
        let kept = filter_subtitle_regions(vec![region], 640, 360, &config);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn filter_rejects_off_center_and_oversized() {
        let config = GeometryConfig::default();
        let side = TextRegion::from_rect(10.0, 330.0, 100.0, 20.0);
        let full_width = TextRegion::from_rect(20.0, 330.0, 600.0, 20.0);
        let sliver = TextRegion::from_rect(310.0, 330.0, 10.0, 20.0);
        let kept = filter_subtitle_regions(vec![side, full_width, sliver], 640, 360, &config);
        assert!(kept.is_empty());
    }

    #[test]
    fn rectify_axis_aligned_rect_preserves_size() {
        let frame = gradient_frame(64, 64);
        let region = TextRegion::from_rect(8.0, 16.0, 40.0, 12.0);
        let crop = rectify(&frame, &region, RectifyMode::Quad).unwrap();
        assert_eq!(crop.width(), 40);
        assert_eq!(crop.height(), 12);
    }

    #[test]
    fn rectify_copies_pixels_for_identity_warp() {
        let frame = gradient_frame(32, 32);
        let region = TextRegion::from_rect(4.0, 4.0, 16.0, 8.0);
        let crop = rectify(&frame, &region, RectifyMode::Quad).unwrap();
        // Integer-aligned warp lands exactly on source pixels.
        assert_eq!(crop.data()[0], frame.pixel_clamped(4, 4));
        assert_eq!(crop.pixel_clamped(5, 3), frame.pixel_clamped(9, 7));
    }

    #[test]
    fn rectify_rotates_tall_crops() {
        let frame = flat_frame(64, 64, 50);
        // 10 wide, 30 tall: aspect 3.0 triggers the 90° rotation.
        let region = TextRegion::from_rect(10.0, 10.0, 10.0, 30.0);
        let crop = rectify(&frame, &region, RectifyMode::Quad).unwrap();
        assert_eq!(crop.width(), 30);
        assert_eq!(crop.height(), 10);
    }

    #[test]
    fn rectify_regions_drops_vertical_slivers() {
        let frame = flat_frame(64, 64, 50);
        // 10x12 stays taller than wide even though it avoids rotation.
        let sliver = TextRegion::from_rect(4.0, 4.0, 10.0, 12.0);
        let line = TextRegion::from_rect(4.0, 30.0, 40.0, 10.0);
        let crops = rectify_regions(&frame, &[sliver, line], RectifyMode::Quad);
        assert_eq!(crops.len(), 1);
        assert_eq!(crops[0].width(), 40);
    }

    #[test]
    fn rectify_propagates_frame_index() {
        let frame = flat_frame(32, 32, 10).with_frame_index(Some(42));
        let region = TextRegion::from_rect(2.0, 2.0, 20.0, 8.0);
        let crop = rectify(&frame, &region, RectifyMode::Quad).unwrap();
        assert_eq!(crop.frame_index(), Some(42));
    }

    #[test]
    fn min_area_rect_of_axis_aligned_points_is_tight() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        let rect = canonicalize_corners(min_area_rect(&points));
        assert!((rect[0].x - 0.0).abs() < 1e-3 && (rect[0].y - 0.0).abs() < 1e-3);
        assert!((rect[2].x - 10.0).abs() < 1e-3 && (rect[2].y - 4.0).abs() < 1e-3);
    }

    #[test]
    fn min_area_rect_follows_rotation() {
        // A 10 x 2 rectangle rotated 45°; the tight rectangle has the same
        // side lengths, far smaller than the axis-aligned bounding box.
        let s = std::f32::consts::FRAC_1_SQRT_2;
        let points = [
            Point::new(0.0, 0.0),
            Point::new(10.0 * s, 10.0 * s),
            Point::new(10.0 * s - 2.0 * s, 10.0 * s + 2.0 * s),
            Point::new(-2.0 * s, 2.0 * s),
        ];
        let rect = min_area_rect(&points);
        let w = rect[0].distance(&rect[1]);
        let h = rect[1].distance(&rect[2]);
        let mut sides = [w, h];
        sides.sort_by(f32::total_cmp);
        assert!((sides[0] - 2.0).abs() < 1e-2, "short side {}", sides[0]);
        assert!((sides[1] - 10.0).abs() < 1e-2, "long side {}", sides[1]);
    }

    #[test]
    fn canonicalize_orders_corners_clockwise_from_top_left() {
        let rect = canonicalize_corners([
            Point::new(10.0, 4.0),
            Point::new(0.0, 4.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(rect[0], Point::new(0.0, 0.0));
        assert_eq!(rect[1], Point::new(10.0, 0.0));
        assert_eq!(rect[2], Point::new(10.0, 4.0));
        assert_eq!(rect[3], Point::new(0.0, 4.0));
    }
}
