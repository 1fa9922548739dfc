//! Generational step of the neuroevolution loop.
//!
//! A [`GeneticAlgorithm`] owns a fixed-size population of [`Network`]s. Fitness is
//! accumulated elsewhere (by self-play battles in the training loop); this module
//! only turns one population into the next.
//!
//! # Algorithm Overview
//!
//! [`GeneticAlgorithm::evolve`] runs once per generation:
//!
//! 1. **Rank** - Sort the population by fitness, best first
//! 2. **Mutants** - For each of the `floor(N * elitism_rate)` elitism slots, clone
//!    and mutate two tournament winners (each drawn separately)
//! 3. **Crossover** - For each slot again, cross two tournament winners, seed the
//!    child's fitness with the parents' mean, then mutate the child
//! 4. **Carry-over** - Fill the rest with the top-ranked survivors, unchanged
//!
//! The population size never changes. Mutants and children inherit fitness, so a
//! strong lineage keeps its rank until the next round of battles says otherwise.
//!
//! # Genetic Operators
//!
//! ## Tournament Selection
//!
//! Draws `k` individuals uniformly with replacement and returns the fittest. The
//! first one drawn wins ties, so `k = 1` is uniform selection.
//!
//! ## Mutation and Crossover
//!
//! Both are delegated to [`NetworkEvolver`]. Mutation is self-adaptive: each network
//! carries its own per-category evolvability and mutation strength, which are
//! themselves mutated.
//!
//! # Example
//!
//! ```
//! use oxo_training::{config::GeneticConfig, genetic::GeneticAlgorithm};
//! use rand::SeedableRng as _;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let config = GeneticConfig {
//!     population_size: 20,
//!     ..GeneticConfig::default()
//! };
//! let mut ga = GeneticAlgorithm::new(config, &mut rng);
//! let summary = ga.evolve(&mut rng);
//! assert_eq!(summary.mutants, 4);
//! assert_eq!(ga.population().len(), 20);
//! ```

use oxo_neural::{Network, NetworkEvolver};
use rand::{Rng, seq::IndexedRandom as _};

use crate::config::GeneticConfig;

/// How the slots of a freshly evolved population were filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvolutionSummary {
    pub mutants: usize,
    pub crossovers: usize,
    pub carried_over: usize,
}

impl EvolutionSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.mutants + self.crossovers + self.carried_over
    }
}

#[derive(Debug, Clone)]
pub struct GeneticAlgorithm {
    config: GeneticConfig,
    evolver: NetworkEvolver,
    population: Vec<Network>,
}

impl GeneticAlgorithm {
    /// Creates a GA with a fresh initial population.
    ///
    /// # Arguments
    ///
    /// * `config` - Population size, selection and mutation parameters
    /// * `rng` - Random number generator
    pub fn new<R>(config: GeneticConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let mut ga = Self::from_population(config, vec![]);
        ga.population = ga.create_initial_population(rng);
        ga
    }

    /// Creates a GA around an existing (for example, loaded) population.
    #[must_use]
    pub fn from_population(config: GeneticConfig, population: Vec<Network>) -> Self {
        Self {
            evolver: NetworkEvolver::new(config.mutation),
            config,
            population,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    #[must_use]
    pub fn evolver(&self) -> &NetworkEvolver {
        &self.evolver
    }

    #[must_use]
    pub fn population(&self) -> &[Network] {
        &self.population
    }

    /// Mutable access for battles, stagnation replacement and imports.
    pub fn population_mut(&mut self) -> &mut Vec<Network> {
        &mut self.population
    }

    /// Returns the fittest individual, or `None` for an empty population.
    #[must_use]
    pub fn best(&self) -> Option<&Network> {
        self.population
            .iter()
            .max_by(|a, b| a.fitness().total_cmp(&b.fitness()))
    }

    /// Builds `population_size` fresh networks.
    pub fn create_initial_population<R>(&self, rng: &mut R) -> Vec<Network>
    where
        R: Rng + ?Sized,
    {
        self.fresh_networks(self.config.population_size, rng)
    }

    /// Builds `count` minimal networks, each grown by `initial_random_nodes`
    /// random node insertions.
    pub fn fresh_networks<R>(&self, count: usize, rng: &mut R) -> Vec<Network>
    where
        R: Rng + ?Sized,
    {
        (0..count)
            .map(|_| {
                let mut network = Network::new(self.config.network, rng);
                for _ in 0..self.config.initial_random_nodes {
                    self.evolver.add_random_node(&mut network, rng);
                }
                network.update_topological_order();
                network
            })
            .collect()
    }

    /// Replaces the population with a fresh one; every fitness starts at zero.
    pub fn reset_population<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        self.population = self.create_initial_population(rng);
        for network in &mut self.population {
            network.set_fitness(0.0);
        }
    }

    /// Produces the next generation in place.
    ///
    /// # Returns
    ///
    /// How many slots were filled by mutants, crossover children and carried-over
    /// survivors. The three always add up to the configured population size when
    /// the current population is at least that large.
    pub fn evolve<R>(&mut self, rng: &mut R) -> EvolutionSummary
    where
        R: Rng + ?Sized,
    {
        let size = self.config.population_size;
        self.population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));

        let slots = self.config.elite_slots();
        let mut next = Vec::with_capacity(size);
        let mut summary = EvolutionSummary::default();

        for _ in 0..slots {
            for _ in 0..2 {
                let Some(parent) = self.tournament_select(self.config.tournament_size, rng) else {
                    break;
                };
                let mut mutant = parent.clone();
                self.evolver.mutate(&mut mutant, rng);
                next.push(mutant);
                summary.mutants += 1;
            }
        }

        for _ in 0..slots {
            let k = self.config.tournament_size;
            let (Some(parent1), Some(parent2)) =
                (self.tournament_select(k, rng), self.tournament_select(k, rng))
            else {
                break;
            };
            let mut child = self.evolver.crossover(parent1, parent2, rng);
            child.set_fitness(f64::midpoint(parent1.fitness(), parent2.fitness()));
            self.evolver.mutate(&mut child, rng);
            next.push(child);
            summary.crossovers += 1;
        }

        let remaining = size.saturating_sub(next.len());
        next.extend(self.population.iter().take(remaining).cloned());
        summary.carried_over = next.len() - summary.mutants - summary.crossovers;

        if next.len() > size {
            next.truncate(size);
            summary.crossovers = size.saturating_sub(summary.mutants).min(summary.crossovers);
            summary.mutants = summary.mutants.min(size);
            summary.carried_over = 0;
        }

        self.population = next;
        summary
    }

    /// Draws `k` individuals with replacement and returns the fittest.
    ///
    /// # Arguments
    ///
    /// * `k` - Tournament size; clamped to at least 1
    /// * `rng` - Random number generator
    ///
    /// # Returns
    ///
    /// `None` only when the population is empty.
    pub fn tournament_select<R>(&self, k: usize, rng: &mut R) -> Option<&Network>
    where
        R: Rng + ?Sized,
    {
        let mut best: Option<&Network> = None;
        for _ in 0..k.max(1) {
            let candidate = self.population.choose(rng)?;
            if best.is_none_or(|b| candidate.fitness() > b.fitness()) {
                best = Some(candidate);
            }
        }
        best
    }

    /// Multiplies every fitness by `factor`.
    pub fn scale_fitness(&mut self, factor: f64) {
        for network in &mut self.population {
            network.set_fitness(network.fitness() * factor);
        }
    }

    /// Highest fitness in the population, or `0.0` when it is empty.
    #[must_use]
    pub fn max_fitness(&self) -> f64 {
        self.best().map_or(0.0, Network::fitness)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    fn small_ga(population_size: usize, rng: &mut Pcg64Mcg) -> GeneticAlgorithm {
        let config = GeneticConfig {
            population_size,
            ..GeneticConfig::default()
        };
        GeneticAlgorithm::new(config, rng)
    }

    #[test]
    fn test_initial_population_is_grown() {
        let mut rng = Pcg64Mcg::seed_from_u64(1);
        let ga = small_ga(10, &mut rng);
        assert_eq!(ga.population().len(), 10);
        for network in ga.population() {
            // Nine inputs are always enough sources for any hidden kind.
            assert_eq!(network.hidden_node_ids().len(), 5);
        }
    }

    #[test]
    fn test_evolve_slot_counts() {
        let mut rng = Pcg64Mcg::seed_from_u64(2);
        let mut ga = small_ga(20, &mut rng);
        for (i, network) in ga.population_mut().iter_mut().enumerate() {
            #[expect(clippy::cast_precision_loss)]
            let fitness = i as f64;
            network.set_fitness(fitness);
        }
        let summary = ga.evolve(&mut rng);
        assert_eq!(summary.mutants, 4);
        assert_eq!(summary.crossovers, 2);
        assert_eq!(summary.carried_over, 14);
        assert_eq!(summary.total(), 20);
        assert_eq!(ga.population().len(), 20);

        // Carry-over takes the best survivors in rank order.
        let carried = ga.population()[6..]
            .iter()
            .map(Network::fitness)
            .collect::<Vec<_>>();
        #[expect(clippy::cast_precision_loss)]
        let expected = (6..20).rev().map(|f| f as f64).collect::<Vec<_>>();
        assert_eq!(carried, expected);
    }

    #[test]
    fn test_evolve_keeps_size_over_generations() {
        let mut rng = Pcg64Mcg::seed_from_u64(3);
        let mut ga = small_ga(12, &mut rng);
        for _ in 0..5 {
            for network in ga.population_mut() {
                network.set_fitness(rng.random_range(0.0..10.0));
            }
            ga.evolve(&mut rng);
            assert_eq!(ga.population().len(), 12);
        }
    }

    #[test]
    fn test_full_elitism_is_truncated() {
        let mut rng = Pcg64Mcg::seed_from_u64(4);
        let config = GeneticConfig {
            population_size: 10,
            elitism_rate: 0.5,
            ..GeneticConfig::default()
        };
        let mut ga = GeneticAlgorithm::new(config, &mut rng);
        let summary = ga.evolve(&mut rng);
        assert_eq!(ga.population().len(), 10);
        assert_eq!(summary.total(), 10);
    }

    #[test]
    fn test_tournament_returns_member() {
        let mut rng = Pcg64Mcg::seed_from_u64(5);
        let mut ga = small_ga(8, &mut rng);
        for (i, network) in ga.population_mut().iter_mut().enumerate() {
            #[expect(clippy::cast_precision_loss)]
            let fitness = i as f64;
            network.set_fitness(fitness);
        }
        for k in [1, 3, 50] {
            let winner = ga.tournament_select(k, &mut rng).unwrap();
            assert!(ga.population().iter().any(|n| std::ptr::eq(n, winner)));
        }
        // A huge tournament almost surely sees the best individual.
        let winner = ga.tournament_select(500, &mut rng).unwrap();
        assert!((winner.fitness() - 7.0).abs() < f64::EPSILON);

        let empty = GeneticAlgorithm::from_population(*ga.config(), vec![]);
        assert!(empty.tournament_select(3, &mut rng).is_none());
    }

    #[test]
    fn test_scale_and_reset() {
        let mut rng = Pcg64Mcg::seed_from_u64(6);
        let mut ga = small_ga(4, &mut rng);
        for network in ga.population_mut() {
            network.set_fitness(4.0);
        }
        ga.scale_fitness(0.25);
        assert!(ga.population().iter().all(|n| (n.fitness() - 1.0).abs() < 1e-12));
        assert!((ga.max_fitness() - 1.0).abs() < 1e-12);

        ga.reset_population(&mut rng);
        assert_eq!(ga.population().len(), 4);
        assert!(ga.population().iter().all(|n| n.fitness().abs() < f64::EPSILON));
    }
}
