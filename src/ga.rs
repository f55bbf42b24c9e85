use rand::prelude::*;
use rand::rngs::StdRng;

use crate::part::Part;

/// One candidate solution: a placement order and a rotation per position.
/// The two vectors are aligned by position.
#[derive(Debug, Clone)]
pub struct Individual {
    pub order: Vec<usize>,
    pub rotations: Vec<f64>,
    pub fitness: f64,
}

impl Individual {
    fn fresh(order: Vec<usize>, rotations: Vec<f64>) -> Self {
        Self {
            order,
            rotations,
            fitness: f64::MAX,
        }
    }
}

/// Permutation/rotation search over part orderings. All randomness lives in
/// the owned, seeded RNG; evaluation happens outside, so a run is
/// reproducible at any parallelism degree.
pub struct GeneticAlgorithm<'a> {
    parts: &'a [Part],
    mutation_rate: usize,
    rng: StdRng,
    pub population: Vec<Individual>,
}

/// Probability that a tournament is won by the better-ranked contender.
const TOURNAMENT_BIAS: f64 = 0.75;

impl<'a> GeneticAlgorithm<'a> {
    /// Seed the population: individual 0 orders parts by area descending
    /// with no rotation, the rest are mutations of it.
    pub fn new(parts: &'a [Part], population_size: usize, mutation_rate: usize, seed: u64) -> Self {
        let mut order: Vec<usize> = (0..parts.len()).collect();
        order.sort_by(|&i, &j| {
            parts[j]
                .area
                .partial_cmp(&parts[i].area)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let base = Individual::fresh(order, vec![0.0; parts.len()]);
        let mut ga = GeneticAlgorithm {
            parts,
            mutation_rate,
            rng: StdRng::seed_from_u64(seed),
            population: vec![base.clone()],
        };
        while ga.population.len() < population_size {
            let m = ga.mutate(&base);
            ga.population.push(m);
        }
        ga
    }

    fn random_rotation(&mut self, part_idx: usize) -> f64 {
        let rotations = &self.parts[part_idx].rotations;
        rotations[self.rng.gen_range(0..rotations.len())]
    }

    /// Per gene: swap with the next position, and independently resample the
    /// rotation, each at `mutation_rate` percent.
    fn mutate(&mut self, ind: &Individual) -> Individual {
        let rate = self.mutation_rate as f64 * 0.01;
        let mut order = ind.order.clone();
        let mut rotations = ind.rotations.clone();
        for i in 0..order.len() {
            if self.rng.r#gen::<f64>() < rate && i + 1 < order.len() {
                order.swap(i, i + 1);
            }
            if self.rng.r#gen::<f64>() < rate {
                rotations[i] = self.random_rotation(order[i]);
            }
        }
        Individual::fresh(order, rotations)
    }

    /// Single-cut order crossover: each child keeps one parent's prefix and
    /// fills up with the other parent's remaining genes in their order,
    /// rotations travelling with their gene.
    fn mate(&mut self, male: &Individual, female: &Individual) -> (Individual, Individual) {
        let len = male.order.len();
        if len < 2 {
            return (
                Individual::fresh(male.order.clone(), male.rotations.clone()),
                Individual::fresh(female.order.clone(), female.rotations.clone()),
            );
        }
        let cut = self.rng.gen_range(1..len);

        let mut order1 = male.order[..cut].to_vec();
        let mut rot1 = male.rotations[..cut].to_vec();
        for (&g, &r) in female.order.iter().zip(&female.rotations) {
            if !order1.contains(&g) {
                order1.push(g);
                rot1.push(r);
            }
        }
        let mut order2 = female.order[..cut].to_vec();
        let mut rot2 = female.rotations[..cut].to_vec();
        for (&g, &r) in male.order.iter().zip(&male.rotations) {
            if !order2.contains(&g) {
                order2.push(g);
                rot2.push(r);
            }
        }
        (
            Individual::fresh(order1, rot1),
            Individual::fresh(order2, rot2),
        )
    }

    /// Tournament of two distinct contenders; the better rank wins with
    /// probability 0.75. `exclude` keeps the second parent distinct from the
    /// first.
    fn tournament(&mut self, exclude: Option<usize>) -> usize {
        let candidates: Vec<usize> = (0..self.population.len())
            .filter(|i| Some(*i) != exclude)
            .collect();
        if candidates.len() == 1 {
            return candidates[0];
        }
        let a = candidates[self.rng.gen_range(0..candidates.len())];
        let b = loop {
            let pick = candidates[self.rng.gen_range(0..candidates.len())];
            if pick != a {
                break pick;
            }
        };
        // the population is sorted by fitness, so the lower index is better
        let (better, worse) = if a < b { (a, b) } else { (b, a) };
        if self.rng.r#gen::<f64>() < TOURNAMENT_BIAS {
            better
        } else {
            worse
        }
    }

    /// Breed the next generation from an evaluated population: stable sort
    /// by fitness, keep the best unchanged, fill up with offspring.
    pub fn generation(&mut self) {
        self.population.sort_by(|a, b| {
            a.fitness
                .partial_cmp(&b.fitness)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut newpop = vec![self.population[0].clone()];
        while newpop.len() < self.population.len() {
            let m_idx = self.tournament(None);
            let f_idx = self.tournament(Some(m_idx));
            let male = self.population[m_idx].clone();
            let female = self.population[f_idx].clone();
            let (c1, c2) = self.mate(&male, &female);
            let c1 = self.mutate(&c1);
            newpop.push(c1);
            if newpop.len() < self.population.len() {
                let c2 = self.mutate(&c2);
                newpop.push(c2);
            }
        }
        self.population = newpop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Polygon};

    fn square_part(id: usize, size: f64) -> Part {
        let poly = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]);
        Part::new(id, &poly, 0.3, 0.0, 4)
    }

    fn parts() -> Vec<Part> {
        vec![
            square_part(0, 1.0),
            square_part(1, 3.0),
            square_part(2, 2.0),
            square_part(3, 5.0),
        ]
    }

    fn is_permutation(order: &[usize], len: usize) -> bool {
        let mut seen = vec![false; len];
        for &i in order {
            if i >= len || seen[i] {
                return false;
            }
            seen[i] = true;
        }
        order.len() == len
    }

    #[test]
    fn first_individual_is_area_descending() {
        let parts = parts();
        let ga = GeneticAlgorithm::new(&parts, 4, 10, 1);
        assert_eq!(ga.population.len(), 4);
        assert_eq!(ga.population[0].order, vec![3, 1, 2, 0]);
        assert!(ga.population[0].rotations.iter().all(|&r| r == 0.0));
    }

    #[test]
    fn offspring_are_permutations() {
        let parts = parts();
        let mut ga = GeneticAlgorithm::new(&parts, 6, 30, 42);
        for ind in &mut ga.population {
            ind.fitness = ind.order[0] as f64;
        }
        for _ in 0..10 {
            ga.generation();
            for ind in &ga.population {
                assert!(is_permutation(&ind.order, parts.len()));
                assert_eq!(ind.rotations.len(), parts.len());
                for (&g, &r) in ind.order.iter().zip(&ind.rotations) {
                    assert!(parts[g].rotations.contains(&r) || r == 0.0);
                }
            }
            for ind in &mut ga.population {
                ind.fitness = ind.order[0] as f64;
            }
        }
    }

    #[test]
    fn elite_survives_unchanged() {
        let parts = parts();
        let mut ga = GeneticAlgorithm::new(&parts, 4, 10, 7);
        for (i, ind) in ga.population.iter_mut().enumerate() {
            ind.fitness = i as f64 + 1.0;
        }
        let best = ga.population[0].clone();
        ga.generation();
        assert_eq!(ga.population[0].order, best.order);
        assert_eq!(ga.population[0].rotations, best.rotations);
        assert_eq!(ga.population[0].fitness, best.fitness);
    }

    #[test]
    fn same_seed_same_population() {
        let parts = parts();
        let run = |seed: u64| {
            let mut ga = GeneticAlgorithm::new(&parts, 5, 20, seed);
            for _ in 0..5 {
                for (i, ind) in ga.population.iter_mut().enumerate() {
                    ind.fitness = (ind.order[0] * 10 + i) as f64;
                }
                ga.generation();
            }
            ga.population
                .iter()
                .map(|i| (i.order.clone(), i.rotations.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }
}
