use geo::{BoundingRect, Centroid, LineString, Rotate, point};

/// Tolerance for floating point equality.
pub const EPS: f64 = 1e-9;

/// Single point in world units.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Closed loop of vertices with optional hole loops.
/// Solids wind counter-clockwise, holes clockwise; the last vertex is not
/// repeated.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Polygon {
    pub points: Vec<Point>,
    #[serde(default)]
    pub children: Vec<Polygon>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            children: Vec::new(),
        }
    }
}

/// Bounding box of a polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Smallest bounds covering both boxes.
    pub fn merge(&self, other: &Bounds) -> Bounds {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let x2 = (self.x + self.width).max(other.x + other.width);
        let y2 = (self.y + self.height).max(other.y + other.height);
        Bounds {
            x,
            y,
            width: x2 - x,
            height: y2 - y,
        }
    }
}

pub fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < EPS
}

pub fn almost_equal_points(a: Point, b: Point) -> bool {
    almost_equal(a.x, b.x) && almost_equal(a.y, b.y)
}

fn to_linestring(points: &[Point]) -> LineString<f64> {
    points.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>().into()
}

/// Calculate the rectangular bounds of the polygon.
/// Returns `None` if there are fewer than 3 points.
pub fn get_polygon_bounds(points: &[Point]) -> Option<Bounds> {
    if points.len() < 3 {
        return None;
    }
    let ls = to_linestring(points);
    let rect = ls.bounding_rect()?;
    Some(Bounds {
        x: rect.min().x,
        y: rect.min().y,
        width: rect.width(),
        height: rect.height(),
    })
}

/// Signed area of the polygon. Positive for counter-clockwise winding.
pub fn polygon_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        area += points[j].x * points[i].y - points[i].x * points[j].y;
        j = i;
    }
    0.5 * area
}

/// Centroid of the polygon outline.
pub fn polygon_centroid(points: &[Point]) -> Option<Point> {
    let poly = geo::Polygon::new(to_linestring(points), vec![]);
    let c = poly.centroid()?;
    Some(Point::new(c.x(), c.y()))
}

/// Rotate polygon by the given angle in degrees around the origin.
pub fn rotate_polygon(points: &[Point], angle_deg: f64) -> Vec<Point> {
    if points.is_empty() {
        return Vec::new();
    }
    let ls = to_linestring(points);
    let origin = point!(x: 0.0, y: 0.0);
    let rotated = ls.rotate_around_point(angle_deg, origin);
    rotated
        .points()
        .map(|c| Point::new(c.x(), c.y()))
        .collect()
}

/// Translate polygon by (dx, dy).
pub fn translate_polygon(points: &[Point], dx: f64, dy: f64) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(p.x + dx, p.y + dy))
        .collect()
}

/// Reorient so the signed area is positive.
pub fn ensure_ccw(points: &mut [Point]) {
    if polygon_area(points) < 0.0 {
        points.reverse();
    }
}

/// Reorient so the signed area is negative.
pub fn ensure_cw(points: &mut [Point]) {
    if polygon_area(points) > 0.0 {
        points.reverse();
    }
}

/// Drop consecutive vertices closer than `tol`, including the closing pair.
pub fn clean_polygon(points: &[Point], tol: f64) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        match out.last() {
            Some(&prev) if (p.x - prev.x).hypot(p.y - prev.y) < tol => {}
            _ => out.push(p),
        }
    }
    while out.len() > 1 {
        let first = out[0];
        let last = *out.last().unwrap();
        if (first.x - last.x).hypot(first.y - last.y) < tol {
            out.pop();
        } else {
            break;
        }
    }
    out
}

/// True if `p` lies strictly between `a` and `b` on the segment, endpoints
/// excluded.
pub fn on_segment(a: Point, b: Point, p: Point) -> bool {
    // vertical line
    if almost_equal(a.x, b.x) && almost_equal(p.x, a.x) {
        return !almost_equal(p.y, b.y)
            && !almost_equal(p.y, a.y)
            && p.y < b.y.max(a.y)
            && p.y > b.y.min(a.y);
    }
    // horizontal line
    if almost_equal(a.y, b.y) && almost_equal(p.y, a.y) {
        return !almost_equal(p.x, b.x)
            && !almost_equal(p.x, a.x)
            && p.x < b.x.max(a.x)
            && p.x > b.x.min(a.x);
    }
    // range check
    if (p.x < a.x && p.x < b.x)
        || (p.x > a.x && p.x > b.x)
        || (p.y < a.y && p.y < b.y)
        || (p.y > a.y && p.y > b.y)
    {
        return false;
    }
    // exclude endpoints
    if almost_equal_points(p, a) || almost_equal_points(p, b) {
        return false;
    }
    let cross = (p.y - a.y) * (b.x - a.x) - (p.x - a.x) * (b.y - a.y);
    if cross.abs() > EPS {
        return false;
    }
    let dot = (p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y);
    if dot < 0.0 || almost_equal(dot, 0.0) {
        return false;
    }
    let len2 = (b.x - a.x) * (b.x - a.x) + (b.y - a.y) * (b.y - a.y);
    if dot > len2 || almost_equal(dot, len2) {
        return false;
    }
    true
}

/// Intersection point of segments AB and EF, or of their infinite lines when
/// `infinite` is set. Coincident endpoints do not count as intersecting.
pub fn line_intersect(a: Point, b: Point, e: Point, f: Point, infinite: bool) -> Option<Point> {
    let a1 = b.y - a.y;
    let b1 = a.x - b.x;
    let c1 = b.x * a.y - a.x * b.y;
    let a2 = f.y - e.y;
    let b2 = e.x - f.x;
    let c2 = f.x * e.y - e.x * f.y;
    let denom = a1 * b2 - a2 * b1;
    let x = (b1 * c2 - b2 * c1) / denom;
    let y = (a2 * c1 - a1 * c2) / denom;
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    if !infinite {
        if (a.x - b.x).abs() > EPS {
            let out = if a.x < b.x { x < a.x || x > b.x } else { x > a.x || x < b.x };
            if out {
                return None;
            }
        }
        if (a.y - b.y).abs() > EPS {
            let out = if a.y < b.y { y < a.y || y > b.y } else { y > a.y || y < b.y };
            if out {
                return None;
            }
        }
        if (e.x - f.x).abs() > EPS {
            let out = if e.x < f.x { x < e.x || x > f.x } else { x > e.x || x < f.x };
            if out {
                return None;
            }
        }
        if (e.y - f.y).abs() > EPS {
            let out = if e.y < f.y { y < e.y || y > f.y } else { y > e.y || y < f.y };
            if out {
                return None;
            }
        }
    }
    Some(Point::new(x, y))
}

/// Ray-cast point-in-polygon. Returns `None` when the point lies exactly on
/// a vertex or edge; callers following the on-edge-is-inside convention
/// treat that as inside.
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> Option<bool> {
    if polygon.len() < 3 {
        return None;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let pi = polygon[i];
        let pj = polygon[j];
        if almost_equal_points(pi, p) {
            return None;
        }
        if on_segment(pi, pj, p) {
            return None;
        }
        if almost_equal_points(pi, pj) {
            j = i;
            continue;
        }
        let crosses = ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x);
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    Some(inside)
}

fn wrapped(points: &[Point], i: isize) -> Point {
    let n = points.len() as isize;
    points[(((i % n) + n) % n) as usize]
}

/// True when an edge of `a` properly crosses an edge of `b` translated by
/// `b_offset`. Shared vertices and grazing contact do not count; a touching
/// vertex whose neighbours fall on opposite sides does.
fn polygon_edges_cross(a: &[Point], b: &[Point], b_offset: Point) -> bool {
    let bp: Vec<Point> = b.iter().map(|&p| p + b_offset).collect();
    let na = a.len() as isize;
    let nb = bp.len() as isize;
    for i in 0..na {
        for j in 0..nb {
            let a1 = wrapped(a, i);
            let a2 = wrapped(a, i + 1);
            let b1 = wrapped(&bp, j);
            let b2 = wrapped(&bp, j + 1);
            let a0 = wrapped(a, i - 1);
            let b0 = wrapped(&bp, j - 1);
            let a3 = wrapped(a, i + 2);
            let b3 = wrapped(&bp, j + 2);

            // a vertex resting on a segment may or may not cross; decide by
            // which side its neighbours fall on
            if on_segment(a1, a2, b1) || almost_equal_points(a1, b1) {
                let b0in = point_in_polygon(b0, a);
                let b2in = point_in_polygon(b2, a);
                if matches!(
                    (b0in, b2in),
                    (Some(true), Some(false)) | (Some(false), Some(true))
                ) {
                    return true;
                }
                continue;
            }
            if on_segment(b1, b2, a1) || almost_equal_points(a1, b2) {
                let a0in = point_in_polygon(a0 - b_offset, b);
                let a2in = point_in_polygon(a2 - b_offset, b);
                if matches!(
                    (a0in, a2in),
                    (Some(true), Some(false)) | (Some(false), Some(true))
                ) {
                    return true;
                }
                continue;
            }
            if on_segment(a1, a2, b2) || almost_equal_points(a2, b2) {
                let b1in = point_in_polygon(b1, a);
                let b3in = point_in_polygon(b3, a);
                if matches!(
                    (b1in, b3in),
                    (Some(true), Some(false)) | (Some(false), Some(true))
                ) {
                    return true;
                }
                continue;
            }
            if on_segment(b1, b2, a2) || almost_equal_points(a2, b1) {
                let a1in = point_in_polygon(a1 - b_offset, b);
                let a3in = point_in_polygon(a3 - b_offset, b);
                if matches!(
                    (a1in, a3in),
                    (Some(true), Some(false)) | (Some(false), Some(true))
                ) {
                    return true;
                }
                continue;
            }
            if line_intersect(b1, b2, a1, a2, false).is_some() {
                return true;
            }
        }
    }
    false
}

/// True when the polygons properly overlap. Polygons that merely share
/// boundary points or edges do not overlap; full enclosure does.
/// `b_offset` translates polygon `b`.
pub fn polygons_overlap(a: &[Point], b: &[Point], b_offset: Point) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    if polygon_edges_cross(a, b, b_offset) {
        return true;
    }
    // no edge crossings: one polygon may still enclose the other
    if b.iter()
        .any(|&p| point_in_polygon(p + b_offset, a) == Some(true))
    {
        return true;
    }
    if a.iter()
        .any(|&p| point_in_polygon(p - b_offset, b) == Some(true))
    {
        return true;
    }
    false
}

/// True when `inner` translated by `inner_offset` lies entirely within
/// `outer`, boundary contact allowed.
pub fn polygon_contains_polygon(outer: &[Point], inner: &[Point], inner_offset: Point) -> bool {
    if outer.len() < 3 || inner.len() < 3 {
        return false;
    }
    if inner
        .iter()
        .any(|&p| point_in_polygon(p + inner_offset, outer) == Some(false))
    {
        return false;
    }
    !polygon_edges_cross(outer, inner, inner_offset)
}

/// True when every turn of the outline has the same sign.
pub fn is_convex(points: &[Point]) -> bool {
    if points.len() < 3 {
        return false;
    }
    let n = points.len();
    let mut sign = 0.0f64;
    for i in 0..n {
        let p0 = points[i];
        let p1 = points[(i + 1) % n];
        let p2 = points[(i + 2) % n];
        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);
        if cross.abs() < EPS {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}

/// True when the polygon is an axis-aligned rectangle within `tol`.
pub fn is_rectangle(points: &[Point], tol: f64) -> bool {
    let Some(b) = get_polygon_bounds(points) else {
        return false;
    };
    points.iter().all(|p| {
        ((p.x - b.x).abs() < tol || (p.x - (b.x + b.width)).abs() < tol)
            && ((p.y - b.y).abs() < tol || (p.y - (b.y + b.height)).abs() < tol)
    })
}

/// True when no two non-adjacent edges of the outline intersect.
pub fn is_simple(points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    for i in 0..n {
        for j in (i + 1)..n {
            // skip adjacent edges, including the wrap-around pair
            if j == i + 1 || (i == 0 && j == n - 1) {
                continue;
            }
            let a1 = points[i];
            let a2 = points[(i + 1) % n];
            let b1 = points[j];
            let b2 = points[(j + 1) % n];
            if line_intersect(a1, a2, b1, b2, false).is_some() {
                return false;
            }
            if on_segment(a1, a2, b1) || on_segment(b1, b2, a1) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn area_of_square() {
        let pts = square(1.0);
        assert_eq!(polygon_area(&pts), 1.0);
        let bounds = get_polygon_bounds(&pts).unwrap();
        assert_eq!(bounds.width, 1.0);
        assert_eq!(bounds.height, 1.0);
    }

    #[test]
    fn area_of_triangle_cw() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 0.0),
        ];
        assert!((polygon_area(&pts) + 0.5).abs() < EPS);
    }

    #[test]
    fn rotate_preserves_bounds() {
        let rotated = rotate_polygon(&square(1.0), 90.0);
        let b = get_polygon_bounds(&rotated).unwrap();
        assert!((b.width - 1.0).abs() < 1e-6);
        assert!((b.height - 1.0).abs() < 1e-6);
    }

    #[test]
    fn rotation_round_trips() {
        let pts = vec![
            Point::new(0.3, 0.1),
            Point::new(4.2, 0.4),
            Point::new(2.0, 3.7),
        ];
        for k in 0..8 {
            let angle = k as f64 * 45.0;
            let there = rotate_polygon(&pts, angle);
            let back = rotate_polygon(&there, -angle);
            for (orig, round) in pts.iter().zip(&back) {
                assert!((orig.x - round.x).abs() < 1e-9);
                assert!((orig.y - round.y).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn centroid_of_square() {
        let c = polygon_centroid(&square(2.0)).unwrap();
        assert!((c.x - 1.0).abs() < 1e-9);
        assert!((c.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_polygon() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)];
        assert_eq!(polygon_area(&pts), 0.0);
        assert!(get_polygon_bounds(&pts).is_none());
    }

    #[test]
    fn point_in_polygon_interior_exterior_edge() {
        let pts = square(2.0);
        assert_eq!(point_in_polygon(Point::new(1.0, 1.0), &pts), Some(true));
        assert_eq!(point_in_polygon(Point::new(3.0, 1.0), &pts), Some(false));
        assert_eq!(point_in_polygon(Point::new(1.0, 0.0), &pts), None);
        assert_eq!(point_in_polygon(Point::new(0.0, 0.0), &pts), None);
    }

    #[test]
    fn overlap_and_touch() {
        let a = square(2.0);
        assert!(polygons_overlap(&a, &a, Point::new(1.0, 1.0)));
        // sharing one edge is not an overlap
        assert!(!polygons_overlap(&a, &a, Point::new(2.0, 0.0)));
        assert!(!polygons_overlap(&a, &a, Point::new(5.0, 5.0)));
        // full enclosure without edge crossings
        let b = square(1.0);
        assert!(polygons_overlap(&a, &b, Point::new(0.5, 0.5)));
    }

    #[test]
    fn containment() {
        let outer = square(4.0);
        let inner = square(1.0);
        assert!(polygon_contains_polygon(
            &outer,
            &inner,
            Point::new(1.0, 1.0)
        ));
        assert!(!polygon_contains_polygon(
            &outer,
            &inner,
            Point::new(3.5, 3.5)
        ));
    }

    #[test]
    fn convexity_and_rectangles() {
        assert!(is_convex(&square(4.0)));
        let l_shape = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert!(!is_convex(&l_shape));
        assert!(is_rectangle(&square(4.0), EPS));
        assert!(!is_rectangle(&l_shape, EPS));
    }

    #[test]
    fn simple_versus_bowtie() {
        assert!(is_simple(&square(1.0)));
        let bowtie = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
        ];
        assert!(!is_simple(&bowtie));
    }

    #[test]
    fn clean_drops_near_duplicates() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(0.01, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(0.0, 5.0),
            Point::new(0.0, 0.05),
        ];
        let cleaned = clean_polygon(&pts, 0.3);
        assert_eq!(cleaned.len(), 4);
    }
}
