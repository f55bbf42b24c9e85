use std::sync::atomic::{AtomicBool, Ordering};

use crate::cache::{CONTAINER_ID, NfpCache, NfpKey};
use crate::clipper::difference_all_rings;
use crate::geometry::{
    Bounds, EPS, Point, almost_equal, almost_equal_points, ensure_ccw, point_in_polygon,
    polygon_area, polygon_contains_polygon, polygons_overlap, translate_polygon,
};
use crate::nfp::{NfpOutcome, inner_nfp, outer_nfp};
use crate::part::RotatedPart;

/// Container ready for placement: spacing applied, min corner at the origin.
#[derive(Debug, Clone, Default)]
pub struct Container {
    /// Outer contour, counter-clockwise. Empty when the inward spacing
    /// offset annihilated the container.
    pub points: Vec<Point>,
    /// Hole contours, clockwise.
    pub holes: Vec<Vec<Point>>,
}

/// One placed part.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PlacedPart {
    pub part_id: usize,
    pub dx: f64,
    pub dy: f64,
    pub rotation: f64,
}

/// Outcome of placing one ordered part list.
#[derive(Debug, Clone)]
pub struct PlacementResult {
    pub placements: Vec<PlacedPart>,
    pub unplaced: Vec<usize>,
    pub fitness: f64,
    pub bounds_width: f64,
    pub placed_area: f64,
}

/// Knobs the worker needs from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct PlacementOptions {
    pub explore_concave: bool,
    pub use_holes: bool,
}

struct Candidate {
    reference: Point,
    /// Index of the placed part hosting this candidate in its hole, if any.
    host: Option<usize>,
}

/// Greedily place `parts` in order inside `container`, consulting `cache`
/// for every NFP. Deterministic: identical inputs give identical output.
pub fn place_parts(
    container: &Container,
    parts: &[RotatedPart],
    cache: &NfpCache,
    options: PlacementOptions,
    cancel: &AtomicBool,
) -> PlacementResult {
    let mut placements: Vec<PlacedPart> = Vec::new();
    let mut placed: Vec<(RotatedPart, Point)> = Vec::new();
    let mut unplaced: Vec<usize> = Vec::new();
    let mut unplaced_area = 0.0;
    let mut placed_bounds: Option<Bounds> = None;
    let mut placed_area = 0.0;

    for (index, rp) in parts.iter().enumerate() {
        if cancel.load(Ordering::Relaxed) {
            for rest in &parts[index..] {
                unplaced.push(rest.part_id);
                unplaced_area += rest.area;
            }
            break;
        }
        if container.points.len() < 3 || rp.points.len() < 3 {
            unplaced.push(rp.part_id);
            unplaced_area += rp.area;
            continue;
        }

        let inner = cache.get_or_compute(
            NfpKey::inner(CONTAINER_ID, rp.part_id, 0.0, rp.rotation),
            || inner_nfp(&container.points, &container.holes, &rp.points, options.explore_concave),
        );
        let NfpOutcome::Fit(inner_loops) = &*inner else {
            unplaced.push(rp.part_id);
            unplaced_area += rp.area;
            continue;
        };
        let mut feasible: Vec<&Vec<Point>> = Vec::new();
        let mut islands: Vec<&Vec<Point>> = Vec::new();
        for l in inner_loops {
            if l.len() >= 3 && polygon_area(l) < -EPS {
                islands.push(l);
            } else {
                feasible.push(l);
            }
        }

        // outer NFPs of everything already placed form the forbidden region
        let mut forbidden: Vec<Vec<Point>> = Vec::new();
        let mut pair_failed = false;
        for (q, qt) in &placed {
            let outcome = cache.get_or_compute(
                NfpKey::outer(q.part_id, rp.part_id, q.rotation, rp.rotation),
                || outer_nfp(&q.points, &rp.points, options.explore_concave),
            );
            match &*outcome {
                NfpOutcome::Fit(loops) => {
                    forbidden.extend(loops.iter().map(|l| translate_polygon(l, qt.x, qt.y)));
                }
                _ => {
                    pair_failed = true;
                    break;
                }
            }
        }
        if pair_failed {
            unplaced.push(rp.part_id);
            unplaced_area += rp.area;
            continue;
        }

        let mut candidates = collect_candidates(&feasible, &islands, &forbidden);
        if options.use_holes {
            hole_candidates(&placed, rp, cache, options, &mut candidates);
        }

        let reference = rp.points[0];
        let Some(part_bounds) = rp.bounds else {
            unplaced.push(rp.part_id);
            unplaced_area += rp.area;
            continue;
        };
        let mut best: Option<(f64, Point, Point)> = None; // (width, reference, translation)
        for cand in &candidates {
            let t = cand.reference - reference;
            if let Some(host) = cand.host {
                if !hole_candidate_valid(&placed, host, rp, t) {
                    continue;
                }
            }
            let cand_bounds = Bounds {
                x: part_bounds.x + t.x,
                y: part_bounds.y + t.y,
                width: part_bounds.width,
                height: part_bounds.height,
            };
            let total = match &placed_bounds {
                Some(b) => b.merge(&cand_bounds),
                None => cand_bounds,
            };
            let width = total.width;
            let better = match &best {
                None => true,
                Some((bw, bref, _)) => {
                    width < bw - EPS
                        || (almost_equal(width, *bw)
                            && (cand.reference.x < bref.x - EPS
                                || (almost_equal(cand.reference.x, bref.x)
                                    && cand.reference.y < bref.y - EPS)))
                }
            };
            if better {
                best = Some((width, cand.reference, t));
            }
        }

        match best {
            Some((_, _, t)) => {
                let cand_bounds = Bounds {
                    x: part_bounds.x + t.x,
                    y: part_bounds.y + t.y,
                    width: part_bounds.width,
                    height: part_bounds.height,
                };
                placed_bounds = Some(match &placed_bounds {
                    Some(b) => b.merge(&cand_bounds),
                    None => cand_bounds,
                });
                placed_area += rp.area;
                placements.push(PlacedPart {
                    part_id: rp.part_id,
                    dx: t.x,
                    dy: t.y,
                    rotation: rp.rotation,
                });
                placed.push((rp.clone(), t));
            }
            None => {
                unplaced.push(rp.part_id);
                unplaced_area += rp.area;
            }
        }
    }

    let bounds_width = placed_bounds.map(|b| b.width).unwrap_or(0.0);
    PlacementResult {
        placements,
        unplaced,
        fitness: 2.0 * bounds_width + unplaced_area,
        bounds_width,
        placed_area,
    }
}

/// Candidate reference points: every ring vertex of the clipper difference
/// (feasible region minus forbidden region), plus boundary vertices of the
/// source loops that pass the exact inside-or-on test. NFP boundaries are
/// touching placements, and the boolean difference alone drops those
/// measure-zero positions.
fn collect_candidates(
    feasible: &[&Vec<Point>],
    islands: &[&Vec<Point>],
    forbidden: &[Vec<Point>],
) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();

    let subject: Vec<Vec<Point>> = feasible
        .iter()
        .filter(|l| l.len() >= 3)
        .map(|l| (*l).clone())
        .collect();
    let holes: Vec<Vec<Point>> = islands.iter().map(|l| (*l).clone()).collect();
    for ring in difference_all_rings(&subject, &holes, forbidden) {
        for v in ring {
            out.push(Candidate {
                reference: v,
                host: None,
            });
        }
    }

    let boundary = feasible
        .iter()
        .flat_map(|l| l.iter())
        .chain(islands.iter().flat_map(|l| l.iter()))
        .chain(forbidden.iter().flat_map(|l| l.iter()));
    for &v in boundary {
        if in_feasible_region(v, feasible, islands, forbidden) {
            out.push(Candidate {
                reference: v,
                host: None,
            });
        }
    }
    out
}

fn in_feasible_region(
    p: Point,
    feasible: &[&Vec<Point>],
    islands: &[&Vec<Point>],
    forbidden: &[Vec<Point>],
) -> bool {
    let inside_feasible = feasible.iter().any(|l| {
        if l.len() >= 3 {
            point_in_polygon(p, l) != Some(false)
        } else {
            // degenerate exact-fit region: only its own points qualify
            l.iter().any(|&q| almost_equal_points(p, q))
        }
    });
    if !inside_feasible {
        return false;
    }
    if islands.iter().any(|l| point_in_polygon(p, l) == Some(true)) {
        return false;
    }
    !forbidden
        .iter()
        .any(|l| l.len() >= 3 && point_in_polygon(p, l) == Some(true))
}

/// Candidate positions inside holes of already placed parts, keyed on the
/// host's rotation so the hole inner fit is cached per orientation.
fn hole_candidates(
    placed: &[(RotatedPart, Point)],
    rp: &RotatedPart,
    cache: &NfpCache,
    options: PlacementOptions,
    out: &mut Vec<Candidate>,
) {
    for (host_idx, (q, qt)) in placed.iter().enumerate() {
        for hole in &q.holes {
            if hole.len() < 3 {
                continue;
            }
            let mut hole_ccw = hole.clone();
            ensure_ccw(&mut hole_ccw);
            let outcome = cache.get_or_compute(
                NfpKey::inner(q.part_id, rp.part_id, q.rotation, rp.rotation),
                || inner_nfp(&hole_ccw, &[], &rp.points, options.explore_concave),
            );
            if let NfpOutcome::Fit(loops) = &*outcome {
                for l in loops {
                    for &v in l {
                        out.push(Candidate {
                            reference: v + *qt,
                            host: Some(host_idx),
                        });
                    }
                }
            }
        }
    }
}

/// A hole candidate is only valid when the part ends up wholly inside one of
/// the host's holes and clear of every other placed part.
fn hole_candidate_valid(
    placed: &[(RotatedPart, Point)],
    host: usize,
    rp: &RotatedPart,
    t: Point,
) -> bool {
    let (q, qt) = &placed[host];
    let contained = q.holes.iter().any(|hole| {
        let mut hole_ccw = hole.clone();
        ensure_ccw(&mut hole_ccw);
        let hole_world = translate_polygon(&hole_ccw, qt.x, qt.y);
        polygon_contains_polygon(&hole_world, &rp.points, t)
    });
    if !contained {
        return false;
    }
    placed.iter().enumerate().all(|(i, (other, ot))| {
        i == host || !polygons_overlap(&translate_polygon(&other.points, ot.x, ot.y), &rp.points, t)
    })
}
