use polynest::geometry::{
    Bounds, Point, get_polygon_bounds, point_in_polygon, polygons_overlap, rotate_polygon,
    translate_polygon,
};
use polynest::{NestConfig, Nester, PlacedPart, Polygon};
use std::sync::{Arc, Mutex};

fn square(size: f64) -> Polygon {
    Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(size, 0.0),
        Point::new(size, size),
        Point::new(0.0, size),
    ])
}

fn rect(w: f64, h: f64) -> Polygon {
    Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(w, 0.0),
        Point::new(w, h),
        Point::new(0.0, h),
    ])
}

fn scenario_config() -> NestConfig {
    NestConfig {
        seed: 1,
        rotations: 1,
        population_size: 4,
        max_generations: 5,
        ..NestConfig::default()
    }
}

fn world_polygon(parts: &[Polygon], p: &PlacedPart) -> Vec<Point> {
    let rotated = rotate_polygon(&parts[p.part_id].points, p.rotation);
    translate_polygon(&rotated, p.dx, p.dy)
}

fn world_bounds(parts: &[Polygon], p: &PlacedPart) -> Bounds {
    get_polygon_bounds(&world_polygon(parts, p)).unwrap()
}

fn box_gap(a: &Bounds, b: &Bounds) -> f64 {
    let gx = (b.x - (a.x + a.width)).max(a.x - (b.x + b.width)).max(0.0);
    let gy = (b.y - (a.y + a.height)).max(a.y - (b.y + b.height)).max(0.0);
    gx.hypot(gy)
}

#[test]
fn single_square_fits_at_origin() {
    let parts = vec![square(10.0)];
    let mut nester = Nester::new(&square(100.0), &parts, scenario_config()).unwrap();
    let result = nester.run().unwrap();
    assert_eq!(result.best.placements.len(), 1);
    assert!(result.best.unplaced.is_empty());
    let p = result.best.placements[0];
    assert!(p.dx.abs() < 1e-9 && p.dy.abs() < 1e-9);
    assert!((result.best.bounds_width - 10.0).abs() < 1e-9);
    assert!((result.best.fitness - 20.0).abs() < 1e-9);
    assert!((result.utilization - 0.01).abs() < 1e-9);
    assert!(!result.cancelled);
}

#[test]
fn two_identical_squares_tile() {
    let parts = vec![square(50.0), square(50.0)];
    let mut nester = Nester::new(&square(100.0), &parts, scenario_config()).unwrap();
    let result = nester.run().unwrap();
    assert_eq!(result.best.placements.len(), 2);
    assert!(result.best.unplaced.is_empty());

    let a = result.best.placements[0];
    let b = result.best.placements[1];
    assert!(!polygons_overlap(
        &world_polygon(&parts, &a),
        &parts[b.part_id].points,
        Point::new(b.dx, b.dy),
    ));
    // minimising bounding width stacks the squares: (0,0) and (0,50)
    assert!(a.dx.abs() < 1e-9 && a.dy.abs() < 1e-9);
    assert!(b.dx.abs() < 1e-9 && (b.dy - 50.0).abs() < 1e-9);
    assert!((result.best.bounds_width - 50.0).abs() < 1e-9);
    assert!((result.utilization - 0.5).abs() < 1e-9);
}

#[test]
fn oversize_part_is_unplaced() {
    let parts = vec![square(200.0)];
    let mut nester = Nester::new(&square(100.0), &parts, scenario_config()).unwrap();
    let result = nester.run().unwrap();
    assert!(result.best.placements.is_empty());
    assert_eq!(result.best.unplaced, vec![0]);
    assert!((result.best.fitness - 40_000.0).abs() < 1e-9);
    assert_eq!(result.utilization, 0.0);
}

#[test]
fn spacing_keeps_parts_apart() {
    let parts = vec![square(40.0), square(40.0)];
    let config = NestConfig {
        spacing: 5.0,
        ..scenario_config()
    };
    let mut nester = Nester::new(&square(100.0), &parts, config).unwrap();
    let result = nester.run().unwrap();
    assert_eq!(result.best.placements.len(), 2);

    let ba = world_bounds(&parts, &result.best.placements[0]);
    let bb = world_bounds(&parts, &result.best.placements[1]);
    assert!(box_gap(&ba, &bb) >= 5.0 - 1e-6, "gap was {}", box_gap(&ba, &bb));
    // and clearance of spacing/2 from the container walls
    for b in [&ba, &bb] {
        assert!(b.x >= 2.5 - 1e-6);
        assert!(b.y >= 2.5 - 1e-6);
        assert!(b.x + b.width <= 97.5 + 1e-6);
        assert!(b.y + b.height <= 97.5 + 1e-6);
    }
}

#[test]
fn concave_container_places_part_in_the_arm() {
    // L container: bottom arm 100x40, left arm 40x100
    let container = Polygon::new(vec![
        Point::new(0.0, 0.0),
        Point::new(100.0, 0.0),
        Point::new(100.0, 40.0),
        Point::new(40.0, 40.0),
        Point::new(40.0, 100.0),
        Point::new(0.0, 100.0),
    ]);
    // only fits the bottom arm
    let parts = vec![rect(60.0, 30.0)];
    let mut nester = Nester::new(&container, &parts, scenario_config()).unwrap();
    let result = nester.run().unwrap();
    assert_eq!(result.best.placements.len(), 1);
    let p = result.best.placements[0];
    // anywhere in the bottom arm means y stays below the notch
    assert!(p.dy <= 10.0 + 1e-6, "part left the arm: dy = {}", p.dy);
    let world = world_polygon(&parts, &p);
    for v in &world {
        assert!(
            point_in_polygon(*v, &container.points) != Some(false),
            "vertex ({}, {}) escaped the container",
            v.x,
            v.y
        );
    }
}

#[test]
fn same_seed_reproduces_bit_identical_layouts() {
    let run = || {
        let parts = vec![square(50.0), square(50.0)];
        let mut nester = Nester::new(&square(100.0), &parts, scenario_config()).unwrap();
        nester.run().unwrap()
    };
    let a = run();
    let b = run();
    assert_eq!(a.best.placements.len(), b.best.placements.len());
    for (pa, pb) in a.best.placements.iter().zip(&b.best.placements) {
        assert_eq!(pa.part_id, pb.part_id);
        assert_eq!(pa.dx.to_bits(), pb.dx.to_bits());
        assert_eq!(pa.dy.to_bits(), pb.dy.to_bits());
        assert_eq!(pa.rotation.to_bits(), pb.rotation.to_bits());
    }
    assert_eq!(a.best.fitness.to_bits(), b.best.fitness.to_bits());
    assert_eq!(a.generations, b.generations);
}

#[test]
fn mixed_parts_never_overlap() {
    let parts = vec![
        rect(30.0, 20.0),
        rect(20.0, 30.0),
        square(25.0),
        rect(40.0, 10.0),
        square(15.0),
    ];
    let config = NestConfig {
        seed: 3,
        rotations: 4,
        population_size: 4,
        max_generations: 8,
        ..NestConfig::default()
    };
    let mut nester = Nester::new(&square(100.0), &parts, config).unwrap();
    let result = nester.run().unwrap();
    assert_eq!(
        result.best.placements.len() + result.best.unplaced.len(),
        parts.len()
    );
    let worlds: Vec<Vec<Point>> = result
        .best
        .placements
        .iter()
        .map(|p| world_polygon(&parts, p))
        .collect();
    for i in 0..worlds.len() {
        for j in (i + 1)..worlds.len() {
            assert!(
                !polygons_overlap(&worlds[i], &worlds[j], Point::new(0.0, 0.0)),
                "parts {} and {} overlap",
                result.best.placements[i].part_id,
                result.best.placements[j].part_id
            );
        }
    }
    assert!((0.0..=1.0).contains(&result.utilization));
}

#[test]
fn best_fitness_never_worsens_across_generations() {
    let parts = vec![square(30.0), square(30.0), rect(20.0, 40.0), rect(40.0, 20.0)];
    let config = NestConfig {
        seed: 7,
        rotations: 2,
        population_size: 6,
        max_generations: 10,
        ..NestConfig::default()
    };
    let mut nester = Nester::new(&square(100.0), &parts, config).unwrap();
    let seen: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    nester.on_progress(move |_, best_fitness, utilization| {
        assert!((0.0..=1.0).contains(&utilization));
        sink.lock().unwrap().push(best_fitness);
    });
    let result = nester.run().unwrap();
    let history = seen.lock().unwrap();
    assert!(!history.is_empty());
    for pair in history.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "best fitness worsened: {:?}", pair);
    }
    assert!((result.best.fitness - history.last().unwrap()).abs() < 1e-9);
}

#[test]
fn infeasible_container_still_reports_all_parts() {
    // spacing eats the whole container
    let parts = vec![square(2.0), square(3.0)];
    let config = NestConfig {
        spacing: 20.0,
        ..scenario_config()
    };
    let mut nester = Nester::new(&square(10.0), &parts, config).unwrap();
    let result = nester.run().unwrap();
    assert!(result.best.placements.is_empty());
    assert_eq!(result.best.unplaced.len(), 2);
    assert!((result.best.fitness - 13.0).abs() < 1e-9);
}
