//! Continuous self-play training.
//!
//! [`TrainingManager`] repeatedly pits two random members of the population
//! against each other, credits fitness from the result, and every
//! `population_size * battles_per_generation_factor` battles benchmarks the
//! population against the rule-based agent, evolves it and saves it.
//!
//! The loop is cooperative: every game it plays, benchmark games included, is
//! followed by a yield (or a sleep, in background mode), and a
//! [`TrainingControl`] stop request is honoured before the next game. A
//! generation end interrupted by a stop is finished first when training
//! resumes. Observers receive a [`TrainingSnapshot`] through a
//! `tokio::sync::watch` channel.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use oxo_engine::Player;
use oxo_neural::{ConfigError, Network};
use oxo_stats::descriptive::mean_or_zero;
use rand::{SeedableRng as _, rngs::StdRng, seq::index};
use tokio::{
    sync::watch,
    task::{JoinError, JoinHandle},
};
use tracing::{debug, info, warn};

use crate::{
    agent::{NeuralAgent, RuleBasedAgent},
    config::{TrainingConfig, TrainingMode},
    genetic::GeneticAlgorithm,
    simulation::{GameRecord, simulate_game},
    stats::{GenerationReport, TrainingStats},
    storage::{PopulationStore, StorageError},
};

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainingError {
    #[display("invalid training configuration: {_0}")]
    #[from]
    Config(ConfigError),
    #[display("failed to load the saved population: {_0}")]
    #[from]
    Storage(StorageError),
    #[display(
        "network has {actual_inputs} inputs and {actual_outputs} outputs, \
         the population uses {expected_inputs} and {expected_outputs}"
    )]
    IncompatibleNetwork {
        expected_inputs: usize,
        expected_outputs: usize,
        actual_inputs: usize,
        actual_outputs: usize,
    },
    #[display("training task failed: {_0}")]
    #[from]
    Task(JoinError),
}

/// Flags shared between a running loop and its controller.
#[derive(Debug)]
pub struct TrainingControl {
    running: AtomicBool,
    full_speed: AtomicBool,
}

impl TrainingControl {
    #[must_use]
    pub fn new(mode: TrainingMode) -> Self {
        Self {
            running: AtomicBool::new(true),
            full_speed: AtomicBool::new(mode == TrainingMode::FullSpeed),
        }
    }

    /// Asks the loop to finish its current battle and return.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn set_full_speed(&self, full_speed: bool) {
        self.full_speed.store(full_speed, Ordering::Relaxed);
    }

    #[must_use]
    pub fn mode(&self) -> TrainingMode {
        if self.full_speed.load(Ordering::Relaxed) {
            TrainingMode::FullSpeed
        } else {
            TrainingMode::Background
        }
    }
}

/// The two networks of the last battle, as they were when it ended, with the
/// game they played.
#[derive(Debug, Clone)]
pub struct MatchView {
    pub x: Network,
    pub o: Network,
    pub game: Arc<GameRecord>,
}

// Last battle by population index; the networks are cloned only when a
// snapshot is built.
#[derive(Debug, Clone)]
struct LastMatch {
    x_index: usize,
    o_index: usize,
    game: Arc<GameRecord>,
}

/// What observers see after each battle.
#[derive(Debug, Clone)]
pub struct TrainingSnapshot {
    pub stats: TrainingStats,
    pub population_size: usize,
    pub last_match: Option<Arc<MatchView>>,
    /// Most recent game that ended with a winner.
    pub latest_decisive_game: Option<Arc<GameRecord>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BattleOutcome {
    pub x_index: usize,
    pub o_index: usize,
    pub winner: Option<Player>,
    pub moves: usize,
    pub average_game_length: f64,
    /// The loser was overwritten by a mutated copy of the winner.
    pub loser_replaced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    pub battle: BattleOutcome,
    pub generation: Option<GenerationReport>,
}

pub struct TrainingManager {
    config: TrainingConfig,
    ga: GeneticAlgorithm,
    stats: TrainingStats,
    rng: StdRng,
    store: Option<Arc<dyn PopulationStore + Send + Sync>>,
    snapshot_tx: watch::Sender<TrainingSnapshot>,
    last_match: Option<LastMatch>,
    latest_decisive_game: Option<Arc<GameRecord>>,
}

impl std::fmt::Debug for TrainingManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrainingManager")
            .field("config", &self.config)
            .field("population", &self.ga.population().len())
            .field("stats", &self.stats)
            .field("has_store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

impl TrainingManager {
    /// Starts a fresh session with a new population.
    ///
    /// # Arguments
    ///
    /// * `config` - Training parameters, validated here
    /// * `store` - Where generations are saved, if anywhere
    /// * `seed` - Seed for reproducible runs; drawn from the OS when `None`
    pub fn new(
        config: TrainingConfig,
        store: Option<Box<dyn PopulationStore + Send + Sync>>,
        seed: Option<u64>,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let ga = GeneticAlgorithm::new(config.genetic, &mut rng);
        info!(
            population = ga.population().len(),
            "Created new initial population"
        );
        let stats = TrainingStats::new(&config);
        Ok(Self::from_parts(config, ga, stats, rng, store))
    }

    /// Resumes the session saved in `store`, or starts a fresh one when the
    /// store is empty.
    ///
    /// Saved networks whose width differs from the configured one are skipped.
    /// A smaller saved population is topped up with fresh networks.
    pub fn create_or_load(
        config: TrainingConfig,
        store: Box<dyn PopulationStore + Send + Sync>,
        seed: Option<u64>,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        let Some(saved) = store.load(&mut rng)? else {
            return Self::new(config, Some(store), seed);
        };

        let loaded = saved.population.len();
        let mut population = saved
            .population
            .into_iter()
            .filter(|n| *n.config() == config.genetic.network)
            .collect::<Vec<_>>();
        if population.len() < loaded {
            warn!(
                skipped = loaded - population.len(),
                "Skipped saved networks with a different input/output width"
            );
        }
        let mut ga = GeneticAlgorithm::from_population(config.genetic, vec![]);
        let missing = config.genetic.population_size.saturating_sub(population.len());
        population.extend(ga.fresh_networks(missing, &mut rng));
        *ga.population_mut() = population;

        let mut stats = saved.stats.unwrap_or_else(|| TrainingStats::new(&config));
        stats.rebound(&config);
        info!(
            population = ga.population().len(),
            generation = stats.generation,
            saved_at = %saved.saved_at,
            "Loaded population from storage"
        );
        Ok(Self::from_parts(config, ga, stats, rng, Some(store)))
    }

    fn from_parts(
        config: TrainingConfig,
        ga: GeneticAlgorithm,
        stats: TrainingStats,
        rng: StdRng,
        store: Option<Box<dyn PopulationStore + Send + Sync>>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(TrainingSnapshot {
            stats: stats.clone(),
            population_size: ga.population().len(),
            last_match: None,
            latest_decisive_game: None,
        });
        Self {
            config,
            ga,
            stats,
            rng,
            store: store.map(Arc::from),
            snapshot_tx,
            last_match: None,
            latest_decisive_game: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    #[must_use]
    pub fn population(&self) -> &[Network] {
        self.ga.population()
    }

    #[must_use]
    pub fn best_network(&self) -> Option<&Network> {
        self.ga.best()
    }

    #[must_use]
    pub fn latest_decisive_game(&self) -> Option<&GameRecord> {
        self.latest_decisive_game.as_deref()
    }

    /// Returns a receiver whose current value is a snapshot of the session
    /// as it is now, last match included.
    pub fn subscribe(&self) -> watch::Receiver<TrainingSnapshot> {
        self.snapshot_tx.send_replace(self.snapshot());
        self.snapshot_tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> TrainingSnapshot {
        let population = self.ga.population();
        let last_match = self.last_match.as_ref().and_then(|m| {
            Some(Arc::new(MatchView {
                x: population.get(m.x_index)?.clone(),
                o: population.get(m.o_index)?.clone(),
                game: Arc::clone(&m.game),
            }))
        });
        TrainingSnapshot {
            stats: self.stats.clone(),
            population_size: population.len(),
            last_match,
            latest_decisive_game: self.latest_decisive_game.clone(),
        }
    }

    /// The battles of the current generation are all played but the
    /// generation has not been closed yet.
    #[must_use]
    pub fn generation_end_due(&self) -> bool {
        self.stats.current_generation.games() > 0
            && self
                .stats
                .battle_count
                .is_multiple_of(self.config.battles_per_generation())
    }

    /// Plays one battle and, when it completes a generation, evolves.
    ///
    /// Returns `None` when the population has fewer than two members.
    pub fn step(&mut self) -> Option<StepOutcome> {
        let battle = self.run_battle()?;
        let generation = self
            .generation_end_due()
            .then(|| self.run_generation_end());
        self.publish();
        Some(StepOutcome { battle, generation })
    }

    /// Plays two distinct random members against each other and credits the result.
    pub fn run_battle(&mut self) -> Option<BattleOutcome> {
        let population = self.ga.population_mut();
        if population.len() < 2 {
            return None;
        }
        let picked = index::sample(&mut self.rng, population.len(), 2);
        let (x_index, o_index) = (picked.index(0), picked.index(1));

        let (x, o) = pair_mut(population, x_index, o_index);
        let game = simulate_game(
            &mut NeuralAgent::new(x),
            &mut NeuralAgent::new(o),
            self.config.rules,
            self.config.max_moves_per_game,
            &mut self.rng,
        );
        let outcome = self.settle_battle(x_index, o_index, &game);

        let game = Arc::new(game);
        if game.is_decisive() {
            self.latest_decisive_game = Some(Arc::clone(&game));
        }
        self.last_match = Some(LastMatch {
            x_index,
            o_index,
            game,
        });
        Some(outcome)
    }

    // Stagnation replacement and fitness credit for a finished game.
    fn settle_battle(
        &mut self,
        x_index: usize,
        o_index: usize,
        game: &GameRecord,
    ) -> BattleOutcome {
        let moves = game.len();
        let average_game_length = self.stats.record_battle(game.winner, moves);
        let mut loser_replaced = false;

        if let Some(winner) = game.winner {
            let (winner_index, loser_index) = match winner {
                Player::X => (x_index, o_index),
                Player::O => (o_index, x_index),
            };
            let winner_fitness = self.ga.population()[winner_index].fitness();
            let loser_fitness = self.ga.population()[loser_index].fitness();

            if average_game_length > self.config.stagnation_threshold()
                && winner_fitness >= loser_fitness
            {
                let mut clone = self.ga.population()[winner_index].clone();
                self.ga.evolver().mutate(&mut clone, &mut self.rng);
                self.ga.population_mut()[loser_index] = clone;
                loser_replaced = true;
                debug!(
                    winner = winner_index,
                    loser = loser_index,
                    average_game_length,
                    "Replaced loser with a mutated copy of the winner"
                );
            }

            let weights = self.config.role_weights;
            #[expect(clippy::cast_precision_loss)]
            let moves = moves as f64;
            let population = self.ga.population_mut();
            population[winner_index].add_fitness(
                weights.get(winner) / 100.0 * (100.0 - moves).max(0.0)
                    + loser_fitness.max(0.0) / self.config.loser_bonus_divisor,
            );
            if !loser_replaced {
                let loser_weight = weights.get(winner.opponent());
                population[loser_index].add_fitness(loser_weight / 100.0 * moves);
            }
        }

        self.stats.best_fitness = self.ga.max_fitness();
        BattleOutcome {
            x_index,
            o_index,
            winner: game.winner,
            moves,
            average_game_length,
            loser_replaced,
        }
    }

    /// Benchmarks, evolves, rescales and saves; closes the generation in the stats.
    pub fn run_generation_end(&mut self) -> GenerationReport {
        let winners = (0..self.ga.population().len())
            .filter(|&index| self.benchmark_member(index))
            .collect::<Vec<_>>();
        let report = self.finish_generation(&winners);
        self.persist();
        report
    }

    /// [`run_generation_end`](Self::run_generation_end) with a yield after
    /// every benchmark game and the save on a blocking task.
    ///
    /// Returns `None`, leaving fitness and statistics untouched, when `control`
    /// is stopped before the last benchmark game; the generation end is then
    /// still due.
    pub async fn end_generation(&mut self, control: &TrainingControl) -> Option<GenerationReport> {
        let mut winners = vec![];
        for index in 0..self.ga.population().len() {
            if !control.is_running() {
                return None;
            }
            if self.benchmark_member(index) {
                winners.push(index);
            }
            tokio::task::yield_now().await;
        }
        let report = self.finish_generation(&winners);
        if let Some(task) = self.save_task() {
            log_save_result(task.await);
        }
        self.publish();
        Some(report)
    }

    // Plays one member as X against the rule-based agent; true on a win.
    fn benchmark_member(&mut self, index: usize) -> bool {
        let network = &mut self.ga.population_mut()[index];
        let game = simulate_game(
            &mut NeuralAgent::new(network),
            &mut RuleBasedAgent,
            self.config.rules,
            self.config.max_moves_per_game,
            &mut self.rng,
        );
        game.winner == Some(Player::X)
    }

    #[expect(clippy::cast_precision_loss)]
    fn finish_generation(&mut self, benchmark_winners: &[usize]) -> GenerationReport {
        let bonus = self.config.benchmark_win_bonus;
        let population = self.ga.population_mut();
        for &index in benchmark_winners {
            population[index].add_fitness(bonus);
        }
        let benchmark_win_rate = if population.is_empty() {
            0.0
        } else {
            benchmark_winners.len() as f64 / population.len() as f64
        };

        let max_fitness = self.ga.max_fitness();
        let summary = self.ga.evolve(&mut self.rng);
        self.last_match = None;
        if max_fitness.is_finite() && max_fitness > 0.0 {
            self.ga.scale_fitness(1.0 / max_fitness);
        }
        let average_fitness = mean_or_zero(self.ga.population().iter().map(Network::fitness));
        let best_fitness = self.stats.best_fitness;
        let report = self.stats.close_generation(best_fitness, average_fitness, benchmark_win_rate);

        info!(
            generation = report.generation,
            best_fitness = report.best_fitness,
            average_fitness = report.average_fitness,
            x_share = report.x_share,
            benchmark_win_rate = report.benchmark_win_rate,
            mutants = summary.mutants,
            crossovers = summary.crossovers,
            carried_over = summary.carried_over,
            "Generation evolved"
        );
        report
    }

    /// Saves through the configured store; a session without one saves nothing.
    pub fn save(&self) -> Result<(), StorageError> {
        match &self.store {
            Some(store) => store.save(self.ga.population(), &self.stats),
            None => Ok(()),
        }
    }

    // Storage failures never stop training.
    fn persist(&self) {
        log_save_result(Ok(self.save()));
    }

    // Saves a copy of the population off the async worker.
    fn save_task(&self) -> Option<JoinHandle<Result<(), StorageError>>> {
        let store = Arc::clone(self.store.as_ref()?);
        let population = self.ga.population().to_vec();
        let stats = self.stats.clone();
        Some(tokio::task::spawn_blocking(move || {
            store.save(&population, &stats)
        }))
    }

    fn publish(&self) {
        if self.snapshot_tx.receiver_count() == 0 {
            return;
        }
        self.snapshot_tx.send_replace(self.snapshot());
    }

    /// Rebuilds the population and clears every statistic.
    pub fn reset_training(&mut self) {
        self.ga.reset_population(&mut self.rng);
        self.stats = TrainingStats::new(&self.config);
        self.last_match = None;
        self.latest_decisive_game = None;
        info!(population = self.ga.population().len(), "Training reset");
        self.publish();
    }

    /// Appends a network to the population. The next evolution trims the
    /// population back to its configured size.
    pub fn import_network(&mut self, network: Network) -> Result<(), TrainingError> {
        let expected = self.config.genetic.network;
        let actual = *network.config();
        if actual != expected {
            return Err(TrainingError::IncompatibleNetwork {
                expected_inputs: expected.input_size,
                expected_outputs: expected.output_size,
                actual_inputs: actual.input_size,
                actual_outputs: actual.output_size,
            });
        }
        self.ga.population_mut().push(network);
        info!(
            population = self.ga.population().len(),
            "Imported network into population"
        );
        Ok(())
    }

    /// Trains until `control` is stopped or `generation_limit` more generations
    /// have been evolved, then saves.
    pub async fn run(&mut self, control: &TrainingControl, generation_limit: Option<u64>) {
        let stop_at = generation_limit.map(|g| self.stats.generation + g);
        info!(
            population = self.ga.population().len(),
            generation = self.stats.generation,
            battles = self.stats.battle_count,
            "Training started"
        );

        loop {
            if !control.is_running() {
                info!("Stop requested");
                break;
            }
            if stop_at.is_some_and(|g| self.stats.generation >= g) {
                info!(generation = self.stats.generation, "Reached generation limit");
                break;
            }
            if self.generation_end_due() {
                if self.end_generation(control).await.is_none() {
                    info!("Stop requested during generation end");
                    break;
                }
                continue;
            }

            let started = Instant::now();
            if self.run_battle().is_none() {
                warn!("Population has fewer than two networks, nothing to train");
                break;
            }
            self.publish();
            match self.config.throttle(control.mode(), started.elapsed()) {
                Some(pause) => tokio::time::sleep(pause).await,
                None => tokio::task::yield_now().await,
            }
        }

        if let Some(task) = self.save_task() {
            log_save_result(task.await);
        }
        info!(
            generation = self.stats.generation,
            battles = self.stats.battle_count,
            "Training stopped"
        );
    }

    /// Moves the manager onto a tokio task.
    #[must_use]
    pub fn spawn(mut self, generation_limit: Option<u64>) -> TrainingHandle {
        let control = Arc::new(TrainingControl::new(self.config.mode));
        let snapshots = self.subscribe();
        let task_control = Arc::clone(&control);
        let task = tokio::spawn(async move {
            self.run(&task_control, generation_limit).await;
            self
        });
        TrainingHandle {
            control,
            snapshots,
            task,
        }
    }
}

/// Controls a manager running on its own task.
#[derive(Debug)]
pub struct TrainingHandle {
    control: Arc<TrainingControl>,
    snapshots: watch::Receiver<TrainingSnapshot>,
    task: JoinHandle<TrainingManager>,
}

impl TrainingHandle {
    pub fn stop(&self) {
        self.control.stop();
    }

    pub fn set_full_speed(&self, full_speed: bool) {
        self.control.set_full_speed(full_speed);
    }

    #[must_use]
    pub fn control(&self) -> Arc<TrainingControl> {
        Arc::clone(&self.control)
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TrainingSnapshot> {
        self.snapshots.clone()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the loop to return and hands the manager back.
    pub async fn join(self) -> Result<TrainingManager, TrainingError> {
        Ok(self.task.await?)
    }
}

fn log_save_result(result: Result<Result<(), StorageError>, JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to save population, continuing in memory"),
        Err(e) => warn!(error = %e, "Save task failed, continuing in memory"),
    }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = items.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
