use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, bail, ensure};
use rayon::prelude::*;

use crate::cache::NfpCache;
use crate::clipper::offset_polygon;
use crate::ga::GeneticAlgorithm;
use crate::geometry::{
    Point, Polygon, clean_polygon, ensure_ccw, ensure_cw, get_polygon_bounds, is_simple,
    polygon_area, translate_polygon,
};
use crate::part::{Part, RotatedPart};
use crate::placement::{Container, PlacedPart, PlacementOptions, PlacementResult, place_parts};

/// Run configuration. Unknown knobs cannot exist: this is the whole set.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NestConfig {
    /// Maximum chord error accepted from the ingest layer; also the vertex
    /// deduplication tolerance.
    pub curve_tolerance: f64,
    /// Mandatory clearance between parts and between part and container.
    pub spacing: f64,
    /// Number of allowed rotation steps per part (angles k*360/rotations).
    pub rotations: usize,
    pub population_size: usize,
    /// Per-gene mutation percentage, clamped to [1, 50].
    pub mutation_rate: usize,
    pub max_generations: usize,
    pub explore_concave: bool,
    pub use_holes: bool,
    pub seed: u64,
}

impl Default for NestConfig {
    fn default() -> Self {
        Self {
            curve_tolerance: 0.3,
            spacing: 0.0,
            rotations: 4,
            population_size: 10,
            mutation_rate: 10,
            max_generations: 100,
            explore_concave: false,
            use_holes: false,
            seed: 0,
        }
    }
}

impl NestConfig {
    /// Reject unusable values, clamp the rest.
    pub fn validated(mut self) -> Result<Self> {
        ensure!(
            self.population_size >= 2,
            "population_size must be at least 2"
        );
        ensure!(self.max_generations >= 1, "max_generations must be at least 1");
        ensure!(
            self.curve_tolerance.is_finite() && self.curve_tolerance > 0.0,
            "curve_tolerance must be positive"
        );
        ensure!(
            self.spacing.is_finite() && self.spacing >= 0.0,
            "spacing must be non-negative"
        );
        self.mutation_rate = self.mutation_rate.clamp(1, 50);
        self.rotations = self.rotations.max(1);
        Ok(self)
    }
}

/// Best layout found by a run.
#[derive(Debug, Clone)]
pub struct FitnessRecord {
    pub placements: Vec<PlacedPart>,
    pub unplaced: Vec<usize>,
    pub fitness: f64,
    /// Total area of the placed parts.
    pub area: f64,
    pub bounds_width: f64,
}

#[derive(Debug, Clone)]
pub struct NestResult {
    pub best: FitnessRecord,
    pub generations: usize,
    pub utilization: f64,
    pub cancelled: bool,
}

type ProgressFn = dyn Fn(usize, f64, f64) + Send + Sync;

/// Owns the configuration, parts, container, RNG seed and NFP cache for one
/// nesting job and drives the GA over placement workers.
pub struct Nester {
    config: NestConfig,
    parts: Vec<Part>,
    container: Container,
    container_area: f64,
    /// Translation that moved the container's min corner to the origin;
    /// added back to every emitted placement.
    shift: Point,
    cache: NfpCache,
    cancel: Arc<AtomicBool>,
    progress: Option<Box<ProgressFn>>,
}

impl Nester {
    pub fn new(container: &Polygon, parts: &[Polygon], config: NestConfig) -> Result<Self> {
        let config = config.validated()?;
        if parts.is_empty() {
            bail!("no parts to nest");
        }
        validate_polygon(container, "container")?;
        for (i, p) in parts.iter().enumerate() {
            validate_polygon(p, &format!("part {i}"))?;
        }

        // container: clean, orient, apply spacing, move to the origin
        let mut outer = clean_polygon(&container.points, config.curve_tolerance);
        ensure!(outer.len() >= 3, "container degenerates under cleaning");
        ensure_ccw(&mut outer);
        let mut holes: Vec<Vec<Point>> = container
            .children
            .iter()
            .map(|c| {
                let mut h = clean_polygon(&c.points, config.curve_tolerance);
                ensure_ccw(&mut h);
                h
            })
            .filter(|h| h.len() >= 3)
            .collect();
        if config.spacing > 0.0 {
            outer = offset_polygon(&outer, -config.spacing / 2.0)
                .into_iter()
                .next()
                .unwrap_or_default();
            holes = holes
                .iter()
                .filter_map(|h| offset_polygon(h, config.spacing / 2.0).into_iter().next())
                .collect();
        }
        let (shift, container_geom) = match get_polygon_bounds(&outer) {
            Some(b) => {
                let shift = Point::new(b.x, b.y);
                let points = translate_polygon(&outer, -shift.x, -shift.y);
                let holes = holes
                    .iter()
                    .map(|h| {
                        let mut h = translate_polygon(h, -shift.x, -shift.y);
                        ensure_cw(&mut h);
                        h
                    })
                    .collect();
                (shift, Container { points, holes })
            }
            // spacing swallowed the container whole; every part is unplaceable
            None => (Point::new(0.0, 0.0), Container::default()),
        };

        let hole_area: f64 = container
            .children
            .iter()
            .map(|c| polygon_area(&c.points).abs())
            .sum();
        let container_area = (polygon_area(&container.points).abs() - hole_area).max(0.0);

        let parts = parts
            .iter()
            .enumerate()
            .map(|(id, p)| {
                Part::new(
                    id,
                    p,
                    config.curve_tolerance,
                    config.spacing,
                    config.rotations,
                )
            })
            .collect();

        Ok(Self {
            config,
            parts,
            container: container_geom,
            container_area,
            shift,
            cache: NfpCache::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    /// Flag that callers may set from another thread to stop the run; the
    /// best layout found so far is returned.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Per-generation callback `(generation, best_fitness, utilization)`.
    pub fn on_progress<F>(&mut self, f: F)
    where
        F: Fn(usize, f64, f64) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(f));
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Evolve placements until `max_generations` or until the best fitness
    /// stalls for `max(20, max_generations / 5)` generations.
    pub fn run(&mut self) -> Result<NestResult> {
        let mut ga = GeneticAlgorithm::new(
            &self.parts,
            self.config.population_size,
            self.config.mutation_rate,
            self.config.seed,
        );
        let options = PlacementOptions {
            explore_concave: self.config.explore_concave,
            use_holes: self.config.use_holes,
        };
        let stall_limit = (self.config.max_generations / 5).max(20);

        let mut best: Option<FitnessRecord> = None;
        let mut stall = 0usize;
        let mut generations = 0usize;
        let mut cancelled = false;

        for generation in 0..self.config.max_generations {
            if self.cancel.load(Ordering::Relaxed) {
                cancelled = true;
                break;
            }

            let container = &self.container;
            let parts = &self.parts;
            let cache = &self.cache;
            let cancel = &self.cancel;
            let results: Vec<PlacementResult> = ga
                .population
                .par_iter()
                .map(|ind| {
                    let rotated: Vec<RotatedPart> = ind
                        .order
                        .iter()
                        .zip(&ind.rotations)
                        .map(|(&i, &r)| RotatedPart::new(&parts[i], r))
                        .collect();
                    place_parts(container, &rotated, cache, options, cancel)
                })
                .collect();
            for (ind, res) in ga.population.iter_mut().zip(&results) {
                ind.fitness = res.fitness;
            }
            generations = generation + 1;

            // candidates are scanned in individual order, so ties keep the
            // earliest index and the outcome is independent of scheduling
            let mut improved = false;
            for res in &results {
                if best.as_ref().is_none_or(|b| res.fitness < b.fitness) {
                    best = Some(self.record(res));
                    improved = true;
                }
            }

            if let (Some(cb), Some(b)) = (&self.progress, &best) {
                cb(generation, b.fitness, self.utilization_of(b));
            }

            if improved {
                stall = 0;
            } else {
                stall += 1;
                if stall >= stall_limit {
                    break;
                }
            }
            if generation + 1 < self.config.max_generations {
                ga.generation();
            }
        }

        let best = best.unwrap_or_else(|| FitnessRecord {
            placements: Vec::new(),
            unplaced: self.parts.iter().map(|p| p.id).collect(),
            fitness: self.parts.iter().map(|p| p.area).sum(),
            area: 0.0,
            bounds_width: 0.0,
        });
        let utilization = self.utilization_of(&best);
        Ok(NestResult {
            best,
            generations,
            utilization,
            cancelled,
        })
    }

    fn utilization_of(&self, record: &FitnessRecord) -> f64 {
        if self.container_area > 0.0 {
            (record.area / self.container_area).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Placement result mapped back into the caller's coordinate frame.
    fn record(&self, res: &PlacementResult) -> FitnessRecord {
        let placements = res
            .placements
            .iter()
            .map(|p| PlacedPart {
                part_id: p.part_id,
                dx: p.dx + self.shift.x,
                dy: p.dy + self.shift.y,
                rotation: p.rotation,
            })
            .collect();
        FitnessRecord {
            placements,
            unplaced: res.unplaced.clone(),
            fitness: res.fitness,
            area: res.placed_area,
            bounds_width: res.bounds_width,
        }
    }
}

fn validate_polygon(polygon: &Polygon, what: &str) -> Result<()> {
    let contours =
        std::iter::once(&polygon.points).chain(polygon.children.iter().map(|c| &c.points));
    for (i, contour) in contours.enumerate() {
        let label = if i == 0 { "outline" } else { "hole" };
        ensure!(
            contour.len() >= 3,
            "{what}: {label} needs at least 3 vertices"
        );
        ensure!(
            contour.iter().all(|p| p.x.is_finite() && p.y.is_finite()),
            "{what}: {label} has a non-finite coordinate"
        );
        ensure!(
            is_simple(contour),
            "{what}: {label} is self-intersecting"
        );
    }
    Ok(())
}
