use crate::geometry::{
    EPS, Point, almost_equal, almost_equal_points, ensure_ccw, ensure_cw, get_polygon_bounds,
    is_convex, is_rectangle, on_segment, point_in_polygon, polygons_overlap,
};

/// Result of a no-fit-polygon query.
///
/// `Fit` carries the trajectory loops of B's reference vertex (its first
/// vertex). `NoFit` means no valid placement locus exists (or the orbit
/// failed to close); `Degenerate` means the probe collapsed, e.g. both
/// outlines are identical.
#[derive(Debug, Clone, PartialEq)]
pub enum NfpOutcome {
    Fit(Vec<Vec<Point>>),
    NoFit,
    Degenerate,
}

/// Outer no-fit polygon of B orbiting A: the locus of B's reference vertex
/// where the parts touch without overlapping.
pub fn outer_nfp(a: &[Point], b: &[Point], explore_concave: bool) -> NfpOutcome {
    if a.len() < 3 || b.len() < 3 {
        return NfpOutcome::Degenerate;
    }
    if is_convex(a) && is_convex(b) {
        let loop_pts = minkowski_nfp(a, b);
        if loop_pts.len() < 3 {
            return NfpOutcome::Degenerate;
        }
        return NfpOutcome::Fit(vec![loop_pts]);
    }
    no_fit_polygon(a, b, false, explore_concave)
}

/// Inner fit polygon of B inside a container. The leading loops (CCW) are
/// the feasible region; trailing CW loops are forbidden islands around the
/// container's holes.
pub fn inner_nfp(
    outer: &[Point],
    holes: &[Vec<Point>],
    b: &[Point],
    explore_concave: bool,
) -> NfpOutcome {
    if outer.len() < 3 || b.len() < 3 {
        return NfpOutcome::Degenerate;
    }
    let mut loops = if is_rectangle(outer, 1e-3) {
        match no_fit_polygon_rectangle(outer, b) {
            Some(l) => l,
            None => return NfpOutcome::NoFit,
        }
    } else {
        match no_fit_polygon(outer, b, true, explore_concave) {
            NfpOutcome::Fit(l) => l,
            other => return other,
        }
    };
    for hole in holes {
        let mut hole_ccw = hole.clone();
        ensure_ccw(&mut hole_ccw);
        if let NfpOutcome::Fit(island_loops) = outer_nfp(&hole_ccw, b, explore_concave) {
            for mut island in island_loops {
                ensure_cw(&mut island);
                loops.push(island);
            }
        }
    }
    NfpOutcome::Fit(loops)
}

/// Inner fit of B in a rectangular container A, taken directly from the
/// bounding boxes. `None` when B does not fit. A zero-extent result is kept:
/// it is the single exact-fit placement.
pub fn no_fit_polygon_rectangle(a: &[Point], b: &[Point]) -> Option<Vec<Vec<Point>>> {
    let ab = get_polygon_bounds(a)?;
    let bb = get_polygon_bounds(b)?;
    if bb.width > ab.width + EPS || bb.height > ab.height + EPS {
        return None;
    }
    let b0 = b[0];
    let x1 = ab.x - bb.x + b0.x;
    let x2 = ab.x + ab.width - (bb.x + bb.width) + b0.x;
    let y1 = ab.y - bb.y + b0.y;
    let y2 = ab.y + ab.height - (bb.y + bb.height) + b0.y;
    Some(vec![vec![
        Point::new(x1, y1),
        Point::new(x2, y1),
        Point::new(x2, y2),
        Point::new(x1, y2),
    ]])
}

/// Outer NFP of two convex polygons: the Minkowski sum of A and reflected B,
/// built by merging the edge fans in angular order and shifted so the loop
/// tracks B's reference vertex.
pub fn minkowski_nfp(a: &[Point], b: &[Point]) -> Vec<Point> {
    let mut a_ccw = a.to_vec();
    ensure_ccw(&mut a_ccw);
    let mut neg: Vec<Point> = b.iter().map(|p| Point::new(-p.x, -p.y)).collect();
    ensure_ccw(&mut neg);

    let sa = bottom_index(&a_ccw);
    let sb = bottom_index(&neg);
    let na = a_ccw.len();
    let nb = neg.len();

    let edge = |poly: &[Point], start: usize, k: usize| {
        let n = poly.len();
        poly[(start + k + 1) % n] - poly[(start + k) % n]
    };

    let mut result = Vec::with_capacity(na + nb);
    let mut p = a_ccw[sa] + neg[sb];
    let (mut i, mut j) = (0usize, 0usize);
    while i < na || j < nb {
        result.push(p);
        let step = if i >= na {
            let e = edge(&neg, sb, j);
            j += 1;
            e
        } else if j >= nb {
            let e = edge(&a_ccw, sa, i);
            i += 1;
            e
        } else {
            let ea = edge(&a_ccw, sa, i);
            let eb = edge(&neg, sb, j);
            if ea.x * eb.y - ea.y * eb.x >= 0.0 {
                i += 1;
                ea
            } else {
                j += 1;
                eb
            }
        };
        p = p + step;
    }
    // report the trajectory of b's reference vertex
    for q in &mut result {
        *q = *q + b[0];
    }
    normalize_loop(&result)
}

/// General no-fit polygon by orbital sliding: keep B in sliding contact with
/// A, always taking the longest collision-free translation, until the
/// reference vertex closes its orbit. `inside` flips the convention to the
/// inner fit; `search_edges` seeds extra orbits from unvisited start
/// positions (concave pockets, disjoint interior regions).
pub fn no_fit_polygon(a: &[Point], b: &[Point], inside: bool, search_edges: bool) -> NfpOutcome {
    if a.len() < 3 || b.len() < 3 {
        return NfpOutcome::Degenerate;
    }
    let mut a_ccw = a.to_vec();
    ensure_ccw(&mut a_ccw);
    let mut b_ccw = b.to_vec();
    ensure_ccw(&mut b_ccw);
    let a = &a_ccw[..];
    let b = &b_ccw[..];

    let max_iters = 16 * (a.len() + b.len());
    let mut marked = vec![false; a.len()];
    let mut loops: Vec<Vec<Point>> = Vec::new();
    let mut degenerate = false;

    if !inside {
        // B's lowest vertex touching A's highest vertex cannot overlap, so it
        // is always a valid orbit seed
        let start = a[top_index(a)] - b[bottom_index(b)];
        if let Some(l) = orbit(a, b, start, &mut marked, max_iters) {
            let l = normalize_loop(&l);
            if l.len() >= 3 {
                loops.push(l);
            }
        }
    }

    if inside || search_edges {
        loop {
            match search_start_point(a, b, inside, &mut marked, &loops) {
                StartSearch::Found(off) => {
                    if let Some(l) = orbit(a, b, off, &mut marked, max_iters) {
                        let l = normalize_loop(&l);
                        if l.len() >= 3 {
                            loops.push(l);
                        }
                    }
                }
                StartSearch::Degenerate => {
                    degenerate = true;
                    break;
                }
                StartSearch::Exhausted => break,
            }
            if !search_edges && !loops.is_empty() {
                break;
            }
        }
    }

    if loops.is_empty() {
        if degenerate {
            return NfpOutcome::Degenerate;
        }
        return NfpOutcome::NoFit;
    }
    for l in &mut loops {
        ensure_ccw(l);
    }
    NfpOutcome::Fit(loops)
}

fn bottom_index(points: &[Point]) -> usize {
    let mut idx = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let best = points[idx];
        if p.y < best.y - EPS || (almost_equal(p.y, best.y) && p.x < best.x - EPS) {
            idx = i;
        }
    }
    idx
}

fn top_index(points: &[Point]) -> usize {
    let mut idx = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let best = points[idx];
        if p.y > best.y + EPS || (almost_equal(p.y, best.y) && p.x < best.x - EPS) {
            idx = i;
        }
    }
    idx
}

fn normalize_loop(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        match out.last() {
            Some(&prev) if almost_equal_points(prev, p) => {}
            _ => out.push(p),
        }
    }
    while out.len() > 1 && almost_equal_points(out[0], *out.last().unwrap()) {
        out.pop();
    }
    out
}

#[derive(Clone, Copy)]
struct Touch {
    kind: u8,
    a: usize,
    b: usize,
}

/// Candidate translation; `marks` are A-vertex indices visited when the
/// vector is chosen, used to seed later orbit searches.
#[derive(Clone, Copy)]
struct SlideVector {
    x: f64,
    y: f64,
    marks: [Option<usize>; 2],
}

fn find_touchings(a: &[Point], b: &[Point], off: Point) -> Vec<Touch> {
    let na = a.len();
    let nb = b.len();
    let mut touching = Vec::new();
    for i in 0..na {
        let next_i = (i + 1) % na;
        for j in 0..nb {
            let next_j = (j + 1) % nb;
            let bj = b[j] + off;
            let bnj = b[next_j] + off;
            if almost_equal_points(a[i], bj) {
                touching.push(Touch { kind: 0, a: i, b: j });
            } else if on_segment(a[i], a[next_i], bj) {
                touching.push(Touch {
                    kind: 1,
                    a: next_i,
                    b: j,
                });
            } else if on_segment(bj, bnj, a[i]) {
                touching.push(Touch {
                    kind: 2,
                    a: i,
                    b: next_j,
                });
            }
        }
    }
    touching
}

fn slide_vectors(a: &[Point], b: &[Point], off: Point, touching: &[Touch], marked: &mut [bool]) -> Vec<SlideVector> {
    let na = a.len();
    let nb = b.len();
    let mut vectors = Vec::new();
    for t in touching {
        marked[t.a] = true;
        let prev_ai = (t.a + na - 1) % na;
        let next_ai = (t.a + 1) % na;
        let vertex_a = a[t.a];
        let prev_a = a[prev_ai];
        let next_a = a[next_ai];
        let prev_bi = (t.b + nb - 1) % nb;
        let vertex_b = b[t.b];
        let prev_b = b[prev_bi];
        let next_b = b[(t.b + 1) % nb];
        match t.kind {
            0 => {
                vectors.push(SlideVector {
                    x: prev_a.x - vertex_a.x,
                    y: prev_a.y - vertex_a.y,
                    marks: [Some(t.a), Some(prev_ai)],
                });
                vectors.push(SlideVector {
                    x: next_a.x - vertex_a.x,
                    y: next_a.y - vertex_a.y,
                    marks: [Some(t.a), Some(next_ai)],
                });
                // B's edges slide in the opposite sense
                vectors.push(SlideVector {
                    x: vertex_b.x - prev_b.x,
                    y: vertex_b.y - prev_b.y,
                    marks: [None, None],
                });
                vectors.push(SlideVector {
                    x: vertex_b.x - next_b.x,
                    y: vertex_b.y - next_b.y,
                    marks: [None, None],
                });
            }
            1 => {
                vectors.push(SlideVector {
                    x: vertex_a.x - (vertex_b.x + off.x),
                    y: vertex_a.y - (vertex_b.y + off.y),
                    marks: [Some(prev_ai), Some(t.a)],
                });
                vectors.push(SlideVector {
                    x: prev_a.x - (vertex_b.x + off.x),
                    y: prev_a.y - (vertex_b.y + off.y),
                    marks: [Some(t.a), Some(prev_ai)],
                });
            }
            _ => {
                vectors.push(SlideVector {
                    x: vertex_a.x - (vertex_b.x + off.x),
                    y: vertex_a.y - (vertex_b.y + off.y),
                    marks: [None, None],
                });
                vectors.push(SlideVector {
                    x: vertex_a.x - (prev_b.x + off.x),
                    y: vertex_a.y - (prev_b.y + off.y),
                    marks: [None, None],
                });
            }
        }
    }
    vectors
}

fn orbit(
    a: &[Point],
    b: &[Point],
    start_off: Point,
    marked: &mut [bool],
    max_iters: usize,
) -> Option<Vec<Point>> {
    let mut off = start_off;
    let reference_start = b[0] + off;
    let mut reference = reference_start;
    let mut loop_pts = vec![reference_start];
    let mut prev: Option<Point> = None;
    let mut counter = 0;

    while counter < max_iters {
        let touching = find_touchings(a, b, off);
        let vectors = slide_vectors(a, b, off, &touching, marked);

        let mut translate: Option<SlideVector> = None;
        let mut maxd = 0.0f64;
        for v in &vectors {
            if v.x == 0.0 && v.y == 0.0 {
                continue;
            }
            // never slide straight back the way we came
            if let Some(pv) = prev {
                if v.y * pv.y + v.x * pv.x < 0.0 {
                    let vl = (v.x * v.x + v.y * v.y).sqrt();
                    let pl = (pv.x * pv.x + pv.y * pv.y).sqrt();
                    let cross = (v.y / vl) * (pv.x / pl) - (v.x / vl) * (pv.y / pl);
                    if cross.abs() < 1e-4 {
                        continue;
                    }
                }
            }
            let slide = polygon_slide_distance(a, b, off, Point::new(v.x, v.y), true);
            let vecd2 = v.x * v.x + v.y * v.y;
            let d = match slide {
                Some(d) if d * d <= vecd2 => d,
                _ => vecd2.sqrt(),
            };
            if d > maxd {
                maxd = d;
                translate = Some(*v);
            }
        }

        let Some(mut t) = translate else {
            return None;
        };
        if almost_equal(maxd, 0.0) {
            return None;
        }
        for m in t.marks.iter().flatten() {
            marked[*m] = true;
        }
        prev = Some(Point::new(t.x, t.y));

        let vlength2 = t.x * t.x + t.y * t.y;
        if maxd * maxd < vlength2 && !almost_equal(maxd * maxd, vlength2) {
            let scale = ((maxd * maxd) / vlength2).sqrt();
            t.x *= scale;
            t.y *= scale;
        }

        reference.x += t.x;
        reference.y += t.y;
        if almost_equal_points(reference, reference_start) {
            // full orbit
            return Some(loop_pts);
        }
        // revisiting an interior point means the trajectory pinched itself
        let pinched = loop_pts.len() > 1
            && loop_pts[..loop_pts.len() - 1]
                .iter()
                .any(|p| almost_equal_points(reference, *p));
        if pinched {
            return Some(loop_pts);
        }
        loop_pts.push(reference);
        off.x += t.x;
        off.y += t.y;
        counter += 1;
    }
    // orbit failed to close
    None
}

enum StartSearch {
    Found(Point),
    Degenerate,
    Exhausted,
}

/// Hunt for a translation of B that touches an unvisited vertex of A and
/// satisfies the inside/outside condition without overlap, skipping
/// positions already recorded in `existing` loops.
fn search_start_point(
    a: &[Point],
    b: &[Point],
    inside: bool,
    marked: &mut [bool],
    existing: &[Vec<Point>],
) -> StartSearch {
    let na = a.len();
    for i in 0..na {
        if marked[i] {
            continue;
        }
        marked[i] = true;
        for j in 0..b.len() {
            let mut off = a[i] - b[j];
            let Some(mut b_inside) = probe_side(a, b, off) else {
                return StartSearch::Degenerate;
            };
            if b_inside == inside
                && !polygons_overlap(a, b, off)
                && !in_nfp(b[0] + off, existing)
            {
                return StartSearch::Found(off);
            }

            // slide B along the edge leaving A[i] and test again
            let mut vx = a[(i + 1) % na].x - a[i].x;
            let mut vy = a[(i + 1) % na].y - a[i].y;
            let d1 = polygon_projection_distance(a, Point::new(0.0, 0.0), b, off, Point::new(vx, vy));
            let d2 = polygon_projection_distance(b, off, a, Point::new(0.0, 0.0), Point::new(-vx, -vy));
            let d = match (d1, d2) {
                (None, None) => None,
                (Some(d1), None) => Some(d1),
                (None, Some(d2)) => Some(d2),
                (Some(d1), Some(d2)) => Some(d1.min(d2)),
            };
            let Some(d) = d else {
                continue;
            };
            if almost_equal(d, 0.0) || d <= 0.0 {
                continue;
            }
            let vd2 = vx * vx + vy * vy;
            if d * d < vd2 && !almost_equal(d * d, vd2) {
                let vd = vd2.sqrt();
                vx *= d / vd;
                vy *= d / vd;
            }
            off.x += vx;
            off.y += vy;
            match probe_side(a, b, off) {
                Some(side) => b_inside = side,
                None => return StartSearch::Degenerate,
            }
            if b_inside == inside
                && !polygons_overlap(a, b, off)
                && !in_nfp(b[0] + off, existing)
            {
                return StartSearch::Found(off);
            }
        }
    }
    StartSearch::Exhausted
}

/// Which side of A the translated B lies on, judged by its first vertex that
/// is not exactly on A's boundary. `None` when every vertex is on the
/// boundary.
fn probe_side(a: &[Point], b: &[Point], off: Point) -> Option<bool> {
    for k in 0..b.len() {
        if let Some(v) = point_in_polygon(b[k] + off, a) {
            return Some(v);
        }
    }
    None
}

fn in_nfp(p: Point, loops: &[Vec<Point>]) -> bool {
    loops
        .iter()
        .any(|l| l.iter().any(|&q| almost_equal_points(p, q)))
}

fn normalize_vector(v: Point) -> Point {
    let d2 = v.x * v.x + v.y * v.y;
    if almost_equal(d2, 1.0) {
        return v;
    }
    let len = d2.sqrt();
    Point::new(v.x / len, v.y / len)
}

/// How far B can translate along `direction` before colliding with A.
/// `None` when no edge pair constrains the motion.
fn polygon_slide_distance(
    a: &[Point],
    b: &[Point],
    b_off: Point,
    direction: Point,
    ignore_negative: bool,
) -> Option<f64> {
    let dir = normalize_vector(direction);
    let mut distance: Option<f64> = None;
    let na = a.len();
    let nb = b.len();
    for i in 0..nb {
        let b1 = b[i] + b_off;
        let b2 = b[(i + 1) % nb] + b_off;
        if almost_equal_points(b1, b2) {
            continue;
        }
        for j in 0..na {
            let a1 = a[j];
            let a2 = a[(j + 1) % na];
            if almost_equal_points(a1, a2) {
                continue;
            }
            if let Some(d) = segment_distance(a1, a2, b1, b2, dir) {
                if distance.is_none_or(|cur| d < cur)
                    && (!ignore_negative || d > 0.0 || almost_equal(d, 0.0))
                {
                    distance = Some(d);
                }
            }
        }
    }
    distance
}

/// Largest projection over B's vertices of the smallest crossing distance to
/// A's edges along `direction`: how far B must travel to land on A.
fn polygon_projection_distance(
    a: &[Point],
    a_off: Point,
    b: &[Point],
    b_off: Point,
    direction: Point,
) -> Option<f64> {
    let na = a.len();
    let mut distance: Option<f64> = None;
    for i in 0..b.len() {
        let p = b[i] + b_off;
        let mut minprojection: Option<f64> = None;
        for j in 0..na {
            let s1 = a[j] + a_off;
            let s2 = a[(j + 1) % na] + a_off;
            if ((s2.y - s1.y) * direction.x - (s2.x - s1.x) * direction.y).abs() < EPS {
                continue;
            }
            if let Some(d) = point_distance(p, s1, s2, direction, false) {
                if minprojection.is_none_or(|cur| d < cur) {
                    minprojection = Some(d);
                }
            }
        }
        if let Some(mp) = minprojection {
            if distance.is_none_or(|cur| mp > cur) {
                distance = Some(mp);
            }
        }
    }
    distance
}

/// Signed distance from `p` to segment (s1, s2) measured along `normal`.
/// `None` when the point does not project onto the segment (unless
/// `infinite`).
fn point_distance(p: Point, s1: Point, s2: Point, normal: Point, infinite: bool) -> Option<f64> {
    let normal = normalize_vector(normal);
    let dir = Point::new(normal.y, -normal.x);

    let pdot = p.x * dir.x + p.y * dir.y;
    let s1dot = s1.x * dir.x + s1.y * dir.y;
    let s2dot = s2.x * dir.x + s2.y * dir.y;

    let pdotnorm = p.x * normal.x + p.y * normal.y;
    let s1dotnorm = s1.x * normal.x + s1.y * normal.y;
    let s2dotnorm = s2.x * normal.x + s2.y * normal.y;

    if !infinite {
        if ((pdot < s1dot || almost_equal(pdot, s1dot))
            && (pdot < s2dot || almost_equal(pdot, s2dot)))
            || ((pdot > s1dot || almost_equal(pdot, s1dot))
                && (pdot > s2dot || almost_equal(pdot, s2dot)))
        {
            // point doesn't fall within the segment's sweep
            return None;
        }
        if almost_equal(pdot, s1dot)
            && almost_equal(pdot, s2dot)
            && pdotnorm > s1dotnorm
            && pdotnorm > s2dotnorm
        {
            return Some((pdotnorm - s1dotnorm).min(pdotnorm - s2dotnorm));
        }
        if almost_equal(pdot, s1dot)
            && almost_equal(pdot, s2dot)
            && pdotnorm < s1dotnorm
            && pdotnorm < s2dotnorm
        {
            return Some(-(s1dotnorm - pdotnorm).min(s2dotnorm - pdotnorm));
        }
    }
    Some(-(pdotnorm - s1dotnorm + (s1dotnorm - s2dotnorm) * (s1dot - pdot) / (s1dot - s2dot)))
}

/// Distance segment (E, F) can slide along `direction` before hitting
/// segment (A, B). `None` when the sweeps never meet.
fn segment_distance(a: Point, b: Point, e: Point, f: Point, direction: Point) -> Option<f64> {
    let normal = Point::new(direction.y, -direction.x);
    let reverse = Point::new(-direction.x, -direction.y);

    let dot_a = a.x * normal.x + a.y * normal.y;
    let dot_b = b.x * normal.x + b.y * normal.y;
    let dot_e = e.x * normal.x + e.y * normal.y;
    let dot_f = f.x * normal.x + f.y * normal.y;

    let cross_a = a.x * direction.x + a.y * direction.y;
    let cross_b = b.x * direction.x + b.y * direction.y;
    let cross_e = e.x * direction.x + e.y * direction.y;
    let cross_f = f.x * direction.x + f.y * direction.y;

    let ab_min = dot_a.min(dot_b);
    let ab_max = dot_a.max(dot_b);
    let ef_min = dot_e.min(dot_f);
    let ef_max = dot_e.max(dot_f);

    // segments that will merely touch at one point
    if almost_equal(ab_max, ef_min) || almost_equal(ab_min, ef_max) {
        return None;
    }
    // segments miss each other completely
    if ab_max < ef_min || ab_min > ef_max {
        return None;
    }

    let overlap = if (ab_max > ef_max && ab_min < ef_min) || (ef_max > ab_max && ef_min < ab_min) {
        1.0
    } else {
        let min_max = ab_max.min(ef_max);
        let max_min = ab_min.max(ef_min);
        let max_max = ab_max.max(ef_max);
        let min_min = ab_min.min(ef_min);
        (min_max - max_min) / (max_max - min_min)
    };

    let cross_abe = (e.y - a.y) * (b.x - a.x) - (e.x - a.x) * (b.y - a.y);
    let cross_abf = (f.y - a.y) * (b.x - a.x) - (f.x - a.x) * (b.y - a.y);

    // lines are colinear
    if almost_equal(cross_abe, 0.0) && almost_equal(cross_abf, 0.0) {
        let ab_norm = normalize_vector(Point::new(b.y - a.y, a.x - b.x));
        let ef_norm = normalize_vector(Point::new(f.y - e.y, e.x - f.x));
        // segment normals must point in opposite directions
        if (ab_norm.y * ef_norm.x - ab_norm.x * ef_norm.y).abs() < EPS
            && ab_norm.y * ef_norm.y + ab_norm.x * ef_norm.x < 0.0
        {
            // the segment normal of AB must point in the same direction as
            // the motion for the contact to block it
            let normdot = ab_norm.y * direction.y + ab_norm.x * direction.x;
            if almost_equal(normdot, 0.0) {
                return None;
            }
            if normdot < 0.0 {
                return Some(0.0);
            }
        }
        return None;
    }

    let mut distances: Vec<f64> = Vec::new();

    if almost_equal(dot_a, dot_e) {
        distances.push(cross_a - cross_e);
    } else if almost_equal(dot_a, dot_f) {
        distances.push(cross_a - cross_f);
    } else if dot_a > ef_min && dot_a < ef_max {
        let mut d = point_distance(a, e, f, reverse, false);
        if let Some(dv) = d {
            if almost_equal(dv, 0.0) {
                // A touches EF but AB is moving away from it
                let db = point_distance(b, e, f, reverse, true);
                if db.is_none_or(|db| db < 0.0 || almost_equal(db * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(dv) = d {
            distances.push(dv);
        }
    }

    if almost_equal(dot_b, dot_e) {
        distances.push(cross_b - cross_e);
    } else if almost_equal(dot_b, dot_f) {
        distances.push(cross_b - cross_f);
    } else if dot_b > ef_min && dot_b < ef_max {
        let mut d = point_distance(b, e, f, reverse, false);
        if let Some(dv) = d {
            if almost_equal(dv, 0.0) {
                let da = point_distance(a, e, f, reverse, true);
                if da.is_none_or(|da| da < 0.0 || almost_equal(da * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(dv) = d {
            distances.push(dv);
        }
    }

    if dot_e > ab_min && dot_e < ab_max {
        let mut d = point_distance(e, a, b, direction, false);
        if let Some(dv) = d {
            if almost_equal(dv, 0.0) {
                let df = point_distance(f, a, b, direction, true);
                if df.is_none_or(|df| df < 0.0 || almost_equal(df * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(dv) = d {
            distances.push(dv);
        }
    }

    if dot_f > ab_min && dot_f < ab_max {
        let mut d = point_distance(f, a, b, direction, false);
        if let Some(dv) = d {
            if almost_equal(dv, 0.0) {
                let de = point_distance(e, a, b, direction, true);
                if de.is_none_or(|de| de < 0.0 || almost_equal(de * overlap, 0.0)) {
                    d = None;
                }
            }
        }
        if let Some(dv) = d {
            distances.push(dv);
        }
    }

    if distances.is_empty() {
        return None;
    }
    distances.into_iter().reduce(f64::min)
}
