use crate::clipper::offset_polygon;
use crate::geometry::{
    Bounds, Point, Polygon, clean_polygon, ensure_ccw, ensure_cw, get_polygon_bounds,
    polygon_area, rotate_polygon,
};

/// A placeable part: the cleaned input polygon plus everything the workers
/// need to know about it up front.
#[derive(Debug, Clone)]
pub struct Part {
    pub id: usize,
    /// Outer contour, counter-clockwise.
    pub points: Vec<Point>,
    /// Hole contours, clockwise.
    pub holes: Vec<Vec<Point>>,
    /// Contour grown by spacing/2, used for all NFP queries. `None` when the
    /// offset failed and the part can never be placed.
    pub offset_points: Option<Vec<Point>>,
    pub area: f64,
    pub bounds: Option<Bounds>,
    /// Angles this part may be placed at, degrees.
    pub rotations: Vec<f64>,
}

impl Part {
    /// Build a part from an input polygon: clean within `tol`, normalise
    /// winding, grow by `spacing/2` and precompute the allowed rotations.
    pub fn new(id: usize, polygon: &Polygon, tol: f64, spacing: f64, rotations: usize) -> Self {
        let mut points = clean_polygon(&polygon.points, tol);
        ensure_ccw(&mut points);
        let holes: Vec<Vec<Point>> = polygon
            .children
            .iter()
            .map(|c| {
                let mut h = clean_polygon(&c.points, tol);
                ensure_cw(&mut h);
                h
            })
            .filter(|h| h.len() >= 3)
            .collect();
        let area = polygon_area(&points).abs();
        let bounds = get_polygon_bounds(&points);
        let offset_points = if spacing > 0.0 {
            offset_polygon(&points, spacing / 2.0).into_iter().next()
        } else {
            Some(points.clone())
        };
        let steps = rotations.max(1);
        let rotations = (0..steps)
            .map(|k| k as f64 * 360.0 / steps as f64)
            .collect();
        Self {
            id,
            points,
            holes,
            offset_points,
            area,
            bounds,
            rotations,
        }
    }
}

/// A part committed to one rotation, with the rotated geometry cached.
#[derive(Debug, Clone)]
pub struct RotatedPart {
    pub part_id: usize,
    pub rotation: f64,
    /// Rotated offset contour; what the NFP calculator and placement see.
    pub points: Vec<Point>,
    /// Rotated hole contours (from the un-offset part).
    pub holes: Vec<Vec<Point>>,
    pub bounds: Option<Bounds>,
    /// Area of the original, un-offset contour.
    pub area: f64,
}

impl RotatedPart {
    /// A part whose spacing offset was infeasible gets an empty contour and
    /// is reported as unplaced by the worker.
    pub fn new(part: &Part, rotation: f64) -> Self {
        let points = match part.offset_points.as_ref() {
            Some(source) if rotation == 0.0 => source.clone(),
            Some(source) => rotate_polygon(source, rotation),
            None => Vec::new(),
        };
        let holes = part
            .holes
            .iter()
            .map(|h| {
                if rotation == 0.0 {
                    h.clone()
                } else {
                    rotate_polygon(h, rotation)
                }
            })
            .collect();
        let bounds = get_polygon_bounds(&points);
        Self {
            part_id: part.id,
            rotation,
            points,
            holes,
            bounds,
            area: part.area,
        }
    }
}
