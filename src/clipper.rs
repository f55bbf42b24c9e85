use geo_clipper::{Clipper, EndType, JoinType};
use geo_types::{Coord, LineString, MultiPolygon, Polygon as GeoPolygon};

use crate::geometry::{EPS, Point, ensure_ccw, get_polygon_bounds, polygon_area};

/// Scale factor applied to coordinates before handing them to Clipper.
pub const CLIPPER_SCALE: f64 = 10_000_000.0;

/// Miter limit for offset joins.
const MITER_LIMIT: f64 = 2.0;

fn to_ring(points: &[Point]) -> LineString<f64> {
    points
        .iter()
        .map(|p| Coord { x: p.x, y: p.y })
        .collect::<Vec<_>>()
        .into()
}

fn to_geo_polygon(outer: &[Point], holes: &[Vec<Point>]) -> GeoPolygon<f64> {
    GeoPolygon::new(
        to_ring(outer),
        holes.iter().map(|h| to_ring(h)).collect(),
    )
}

/// Ring back to an open vertex list, dropping the repeated closing vertex.
fn ring_points(ring: &LineString<f64>) -> Vec<Point> {
    let mut pts: Vec<Point> = ring.points().map(|c| Point::new(c.x(), c.y())).collect();
    if pts.len() > 1 {
        let first = pts[0];
        let last = *pts.last().unwrap();
        if (first.x - last.x).abs() < EPS && (first.y - last.y).abs() < EPS {
            pts.pop();
        }
    }
    pts
}

fn exterior_rings(solution: &MultiPolygon<f64>) -> Vec<Vec<Point>> {
    let mut rings: Vec<Vec<Point>> = solution
        .iter()
        .map(|p| ring_points(p.exterior()))
        .filter(|r| r.len() >= 3)
        .collect();
    for r in &mut rings {
        ensure_ccw(r);
    }
    // largest loop first so callers can treat rings[0] as the outer region
    rings.sort_by(|a, b| {
        polygon_area(b)
            .abs()
            .partial_cmp(&polygon_area(a).abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rings
}

/// Offset a closed polygon by `delta` (positive grows, negative shrinks)
/// using miter joins. Returns the resulting outlines largest-first, or an
/// empty vec when the offset annihilates the polygon.
pub fn offset_polygon(points: &[Point], delta: f64) -> Vec<Vec<Point>> {
    if points.len() < 3 {
        return Vec::new();
    }
    let poly = to_geo_polygon(points, &[]);
    let solution = poly.offset(
        delta,
        JoinType::Miter(MITER_LIMIT),
        EndType::ClosedPolygon,
        CLIPPER_SCALE,
    );
    exterior_rings(&solution)
}

/// Union a set of closed loops into their non-overlapping outlines,
/// largest-first.
pub fn union_polygons(loops: &[Vec<Point>]) -> Vec<Vec<Point>> {
    let mut iter = loops.iter().filter(|l| l.len() >= 3);
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let mut acc = MultiPolygon::new(vec![to_geo_polygon(first, &[])]);
    for l in iter {
        acc = acc.union(&to_geo_polygon(l, &[]), CLIPPER_SCALE);
    }
    exterior_rings(&acc)
}

/// Subtract `clip` loops from a subject region (outer loops with optional
/// hole loops) and return every ring of the remainder, exteriors and
/// interiors alike. Empty when nothing survives.
pub fn difference_all_rings(
    subject_outers: &[Vec<Point>],
    subject_holes: &[Vec<Point>],
    clip: &[Vec<Point>],
) -> Vec<Vec<Point>> {
    let polys: Vec<GeoPolygon<f64>> = subject_outers
        .iter()
        .filter(|o| o.len() >= 3)
        .map(|outer| {
            let bounds = get_polygon_bounds(outer);
            let holes: Vec<Vec<Point>> = subject_holes
                .iter()
                .filter(|h| h.len() >= 3)
                .filter(|h| {
                    bounds.is_some_and(|b| {
                        let p = h[0];
                        p.x >= b.x - EPS
                            && p.x <= b.x + b.width + EPS
                            && p.y >= b.y - EPS
                            && p.y <= b.y + b.height + EPS
                    })
                })
                .cloned()
                .collect();
            to_geo_polygon(outer, &holes)
        })
        .collect();
    if polys.is_empty() {
        return Vec::new();
    }
    let subject = MultiPolygon::new(polys);
    let clip_polys: Vec<GeoPolygon<f64>> = clip
        .iter()
        .filter(|l| l.len() >= 3)
        .map(|l| to_geo_polygon(l, &[]))
        .collect();
    let solution = if clip_polys.is_empty() {
        subject
    } else {
        subject.difference(&MultiPolygon::new(clip_polys), CLIPPER_SCALE)
    };
    let mut rings = Vec::new();
    for poly in &solution {
        let ext = ring_points(poly.exterior());
        if ext.len() >= 3 {
            rings.push(ext);
        }
        for interior in poly.interiors() {
            let int = ring_points(interior);
            if int.len() >= 3 {
                rings.push(int);
            }
        }
    }
    rings
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
    fn offset_grows_and_shrinks() {
        let grown = offset_polygon(&square(10.0), 1.0);
        assert_eq!(grown.len(), 1);
        let area = polygon_area(&grown[0]);
        assert!((area - 144.0).abs() < 0.5);

        let shrunk = offset_polygon(&square(10.0), -1.0);
        assert_eq!(shrunk.len(), 1);
        let area = polygon_area(&shrunk[0]);
        assert!((area - 64.0).abs() < 0.5);
    }

    #[test]
    fn offset_can_annihilate() {
        let gone = offset_polygon(&square(1.0), -2.0);
        assert!(gone.is_empty());
    }

    #[test]
    fn union_merges_overlapping_squares() {
        let a = square(2.0);
        let b: Vec<Point> = square(2.0)
            .into_iter()
            .map(|p| Point::new(p.x + 1.0, p.y))
            .collect();
        let merged = union_polygons(&[a, b]);
        assert_eq!(merged.len(), 1);
        assert!((polygon_area(&merged[0]) - 6.0).abs() < 1e-3);
    }

    #[test]
    fn difference_carves_a_hole() {
        let outer = square(10.0);
        let inner: Vec<Point> = square(2.0)
            .into_iter()
            .map(|p| Point::new(p.x + 4.0, p.y + 4.0))
            .collect();
        let rings = difference_all_rings(&[outer], &[], &[inner]);
        // one exterior ring and one interior ring
        assert_eq!(rings.len(), 2);
    }

    #[test]
    fn difference_with_empty_clip_returns_subject() {
        let rings = difference_all_rings(&[square(4.0)], &[], &[]);
        assert_eq!(rings.len(), 1);
        assert!((polygon_area(&rings[0]).abs() - 16.0).abs() < 1e-3);
    }
}
