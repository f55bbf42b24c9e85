use clap::Parser;
use std::path::PathBuf;

use polynest::geometry::{get_polygon_bounds, rotate_polygon};
use polynest::part::Part;
use polynest::{NestConfig, Nester, PlacedPart, Point, Polygon};

/// Command line arguments for the nesting engine
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliArgs {
    /// JSON job file holding the container and the parts
    #[arg(long, value_name = "FILE")]
    pub job: PathBuf,

    /// Where to write the placement report
    #[arg(long, default_value = "placements.json", value_name = "FILE")]
    pub output: PathBuf,

    /// Optional SVG preview of the best layout
    #[arg(long, value_name = "FILE")]
    pub svg: Option<PathBuf>,

    /// Maximum error allowed when the ingest layer approximated curves
    #[arg(long = "curve-tolerance", default_value_t = 0.3)]
    pub curve_tolerance: f64,

    /// Minimum space between parts
    #[arg(long, default_value_t = 0.0)]
    pub spacing: f64,

    /// Number of rotations to test for each part
    #[arg(long, default_value_t = 4)]
    pub rotations: usize,

    /// Population size for the genetic algorithm
    #[arg(long, default_value_t = 10, value_name = "SIZE")]
    pub population_size: usize,

    /// Mutation rate of the genetic algorithm (1-50)
    #[arg(long, default_value_t = 10, value_name = "RATE")]
    pub mutation_rate: usize,

    /// Upper bound on generations
    #[arg(long, default_value_t = 100)]
    pub max_generations: usize,

    /// PRNG seed; the same seed and inputs reproduce the same layout
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Place parts inside the holes of other parts
    #[arg(long, default_value_t = false)]
    pub use_holes: bool,

    /// Explore concave areas for more robust placement
    #[arg(long, default_value_t = false)]
    pub explore_concave: bool,

    /// Print a summary line per generation
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

impl CliArgs {
    fn config(&self) -> NestConfig {
        NestConfig {
            curve_tolerance: self.curve_tolerance,
            spacing: self.spacing,
            rotations: self.rotations,
            population_size: self.population_size,
            mutation_rate: self.mutation_rate,
            max_generations: self.max_generations,
            explore_concave: self.explore_concave,
            use_holes: self.use_holes,
            seed: self.seed,
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct JobPolygon {
    points: Vec<[f64; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct JobPart {
    points: Vec<[f64; 2]>,
    #[serde(default)]
    holes: Vec<Vec<[f64; 2]>>,
    #[serde(default = "default_quantity")]
    quantity: usize,
}

fn default_quantity() -> usize {
    1
}

/// Polygon input contract: the container and a multiset of parts, all as
/// ordered vertex lists.
#[derive(Debug, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct JobFile {
    container: JobPolygon,
    parts: Vec<JobPart>,
}

fn to_polygon(points: &[[f64; 2]], holes: &[Vec<[f64; 2]>]) -> Polygon {
    let mut poly = Polygon::new(points.iter().map(|p| Point::new(p[0], p[1])).collect());
    poly.children = holes
        .iter()
        .map(|h| Polygon::new(h.iter().map(|p| Point::new(p[0], p[1])).collect()))
        .collect();
    poly
}

fn load_job(path: &PathBuf) -> anyhow::Result<(Polygon, Vec<Polygon>)> {
    let data = std::fs::read_to_string(path)?;
    let job: JobFile = serde_json::from_str(&data)?;
    let container = to_polygon(&job.container.points, &job.container.holes);
    let mut parts = Vec::new();
    for part in &job.parts {
        let poly = to_polygon(&part.points, &part.holes);
        for _ in 0..part.quantity.max(1) {
            parts.push(poly.clone());
        }
    }
    Ok((container, parts))
}

/// Placement output contract, serialized as the report file.
#[derive(serde::Serialize)]
struct Report<'a> {
    placements: &'a [PlacedPart],
    unplaced: &'a [usize],
    fitness: f64,
    bounds_width: f64,
    utilization: f64,
    generations: usize,
    cancelled: bool,
}

fn polygon_svg_points(points: &[Point], dx: f64, dy: f64) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x + dx, p.y + dy))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render the layout as a standalone SVG string.
fn create_svg(container: &Polygon, parts: &[Part], placements: &[PlacedPart]) -> String {
    let bounds = get_polygon_bounds(&container.points);
    let (width, height) = bounds.map(|b| (b.x + b.width, b.y + b.height)).unwrap_or((0.0, 0.0));
    let mut body = String::new();
    body.push_str(&format!(
        "<polygon points=\"{}\" fill=\"none\" stroke=\"blue\"/>\n",
        polygon_svg_points(&container.points, 0.0, 0.0)
    ));
    for hole in &container.children {
        body.push_str(&format!(
            "<polygon points=\"{}\" fill=\"none\" stroke=\"blue\"/>\n",
            polygon_svg_points(&hole.points, 0.0, 0.0)
        ));
    }
    for p in placements {
        let part = &parts[p.part_id];
        let outline = rotate_polygon(&part.points, p.rotation);
        body.push_str(&format!(
            "<polygon points=\"{}\" fill=\"none\" stroke=\"black\"/>\n",
            polygon_svg_points(&outline, p.dx, p.dy)
        ));
        for hole in &part.holes {
            let outline = rotate_polygon(hole, p.rotation);
            body.push_str(&format!(
                "<polygon points=\"{}\" fill=\"none\" stroke=\"black\"/>\n",
                polygon_svg_points(&outline, p.dx, p.dy)
            ));
        }
    }
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\">{}</svg>",
        width, height, body
    )
}

fn main() {
    let args = CliArgs::parse();

    let (container, parts) = match load_job(&args.job) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to parse {}: {}", args.job.display(), e);
            std::process::exit(1);
        }
    };
    let total_parts = parts.len();

    let mut nester = match Nester::new(&container, &parts, args.config()) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to initialize nesting: {}", e);
            std::process::exit(1);
        }
    };
    if args.progress {
        nester.on_progress(|generation, fitness, utilization| {
            println!(
                "generation {}: best fitness {:.3}, utilization {:.1}%",
                generation,
                fitness,
                utilization * 100.0
            );
        });
    }

    let result = match nester.run() {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Nesting failed: {}", e);
            std::process::exit(1);
        }
    };

    let report = Report {
        placements: &result.best.placements,
        unplaced: &result.best.unplaced,
        fitness: result.best.fitness,
        bounds_width: result.best.bounds_width,
        utilization: result.utilization,
        generations: result.generations,
        cancelled: result.cancelled,
    };
    let json = match serde_json::to_string_pretty(&report) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to serialize report: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = std::fs::write(&args.output, json) {
        eprintln!("Failed to write {}: {}", args.output.display(), e);
        std::process::exit(1);
    }

    if let Some(svg_path) = &args.svg {
        let svg = create_svg(&container, nester.parts(), &result.best.placements);
        if let Err(e) = std::fs::write(svg_path, svg) {
            eprintln!("Failed to write {}: {}", svg_path.display(), e);
            std::process::exit(1);
        }
    }

    println!(
        "Placed {}/{} parts, utilization {:.1}%; placements written to {}",
        result.best.placements.len(),
        total_parts,
        result.utilization * 100.0,
        args.output.display()
    );
}
