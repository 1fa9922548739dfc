//! Self-play training of evolvable networks.
//!
//! This crate runs the networks of `oxo-neural` on the decaying-piece board of
//! `oxo-engine` and evolves them by playing them against each other.
//!
//! # How Training Works
//!
//! 1. **Population** - Start from minimal networks grown by a few random nodes
//! 2. **Battles** - Two random members play one game; the winner gains fitness
//!    for a quick win, the loser a little for holding out
//! 3. **Stagnation** - When games get long on average, a decisive loser is
//!    overwritten by a mutated copy of the winner
//! 4. **Benchmark** - Once per generation, every member plays X against the
//!    rule-based agent and earns a bonus for a win
//! 5. **Evolution** - Mutants, crossover children and survivors form the next
//!    generation; fitness is rescaled so the best is 1
//! 6. **Persistence** - The population and statistics are saved each generation
//!
//! # Architecture
//!
//! ```text
//! TrainingManager
//!     ↓ picks pairs from
//! GeneticAlgorithm (population)
//!     ↓ wrapped in
//! NeuralAgent / RuleBasedAgent
//!     ↓ played by
//! simulate_game (oxo-engine GameState)
//!     ↓ produces
//! GameRecord → fitness, TrainingStats, TrainingSnapshot
//! ```
//!
//! # Modules
//!
//! - [`agent`]: move-selection policies
//! - [`simulation`]: plays one game between two agents
//! - [`genetic`]: the generational step
//! - [`training`]: the continuous loop and its control handle
//! - [`stats`]: counters and histories of a session
//! - [`storage`]: saving and loading populations
//! - [`scenario`]: win-in-one and must-block test positions
//! - [`config`]: all tunable parameters with their defaults

pub use self::{
    agent::{Agent, NeuralAgent, RandomAgent, RuleBasedAgent},
    config::{GeneticConfig, RoleWeights, TrainingConfig, TrainingMode},
    genetic::{EvolutionSummary, GeneticAlgorithm},
    scenario::{Scenario, ScenarioAccuracy, ScenarioKind, scenario_accuracy},
    simulation::{GameRecord, RecordedMove, simulate_game},
    stats::{GenerationReport, GenerationResults, TrainingStats},
    storage::{JsonFileStore, PopulationStore, SavedTraining, StorageError},
    training::{
        BattleOutcome, MatchView, StepOutcome, TrainingControl, TrainingError, TrainingHandle,
        TrainingManager, TrainingSnapshot,
    },
};

pub mod agent;
pub mod config;
pub mod genetic;
pub mod scenario;
pub mod simulation;
pub mod stats;
pub mod storage;
pub mod training;
