use std::time::Duration;

use chrono::{DateTime, Utc};
use oxo_engine::Player;
use oxo_stats::{history::BoundedHistory, rolling::RollingAverage};
use serde::{Deserialize, Serialize};

use crate::config::TrainingConfig;

/// Battle outcomes of the generation in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResults {
    pub x_wins: u64,
    pub o_wins: u64,
    pub draws: u64,
}

impl GenerationResults {
    pub fn record(&mut self, winner: Option<Player>) {
        match winner {
            Some(Player::X) => self.x_wins += 1,
            Some(Player::O) => self.o_wins += 1,
            None => self.draws += 1,
        }
    }

    #[must_use]
    pub fn games(&self) -> u64 {
        self.x_wins + self.o_wins + self.draws
    }

    /// Mean of the per-game samples 1 (X wins), 0 (O wins) and 0.5 (no winner).
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn x_share(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        (self.x_wins as f64 + self.draws as f64 * 0.5) / games as f64
    }

    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn win_rate(&self, player: Player) -> f64 {
        let games = self.games();
        if games == 0 {
            return 0.0;
        }
        let wins = match player {
            Player::X => self.x_wins,
            Player::O => self.o_wins,
        };
        wins as f64 / games as f64
    }
}

/// Values recorded at the end of a generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationReport {
    pub generation: u64,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub x_share: f64,
    pub x_win_rate: f64,
    pub o_win_rate: f64,
    pub benchmark_win_rate: f64,
}

/// Counters and histories of a training session, persisted with the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingStats {
    pub battle_count: u64,
    pub generation: u64,
    pub best_fitness: f64,
    pub average_fitness: f64,
    pub start_time: DateTime<Utc>,
    pub best_fitness_history: BoundedHistory<f64>,
    pub average_fitness_history: BoundedHistory<f64>,
    pub win_rate_history: BoundedHistory<f64>,
    pub x_win_rate_history: BoundedHistory<f64>,
    pub o_win_rate_history: BoundedHistory<f64>,
    pub benchmark_win_rate_history: BoundedHistory<f64>,
    pub current_generation: GenerationResults,
    pub average_game_length: RollingAverage,
}

impl TrainingStats {
    #[must_use]
    pub fn new(config: &TrainingConfig) -> Self {
        let history = || BoundedHistory::new(config.history_capacity);
        Self {
            battle_count: 0,
            generation: 0,
            best_fitness: 0.0,
            average_fitness: 0.0,
            start_time: Utc::now(),
            best_fitness_history: history(),
            average_fitness_history: history(),
            win_rate_history: history(),
            x_win_rate_history: history(),
            o_win_rate_history: history(),
            benchmark_win_rate_history: history(),
            current_generation: GenerationResults::default(),
            average_game_length: RollingAverage::new(config.game_length_window),
        }
    }

    /// Re-applies the configured history capacity and averaging window to
    /// statistics read back from storage.
    pub fn rebound(&mut self, config: &TrainingConfig) {
        let capacity = config.history_capacity;
        for history in [
            &mut self.best_fitness_history,
            &mut self.average_fitness_history,
            &mut self.win_rate_history,
            &mut self.x_win_rate_history,
            &mut self.o_win_rate_history,
            &mut self.benchmark_win_rate_history,
        ] {
            *history = BoundedHistory::with_capacity_from(capacity, history.iter().copied());
        }
        self.average_game_length =
            RollingAverage::with_value(config.game_length_window, self.average_game_length.value());
    }

    /// Counts a finished battle and folds its length into the rolling average.
    ///
    /// Returns the updated average game length.
    #[expect(clippy::cast_precision_loss)]
    pub fn record_battle(&mut self, winner: Option<Player>, moves: usize) -> f64 {
        self.battle_count += 1;
        self.current_generation.record(winner);
        self.average_game_length.update(moves as f64)
    }

    /// Closes the current generation: bumps the counter, appends to every
    /// history and clears the per-generation results.
    pub fn close_generation(
        &mut self,
        best_fitness: f64,
        average_fitness: f64,
        benchmark_win_rate: f64,
    ) -> GenerationReport {
        let results = self.current_generation;
        self.generation += 1;
        self.best_fitness = best_fitness;
        self.average_fitness = average_fitness;

        let report = GenerationReport {
            generation: self.generation,
            best_fitness,
            average_fitness,
            x_share: results.x_share(),
            x_win_rate: results.win_rate(Player::X),
            o_win_rate: results.win_rate(Player::O),
            benchmark_win_rate,
        };
        self.best_fitness_history.push(report.best_fitness);
        self.average_fitness_history.push(report.average_fitness);
        self.win_rate_history.push(report.x_share);
        self.x_win_rate_history.push(report.x_win_rate);
        self.o_win_rate_history.push(report.o_win_rate);
        self.benchmark_win_rate_history.push(report.benchmark_win_rate);
        self.current_generation = GenerationResults::default();
        report
    }

    /// Wall-clock time since the session started, zero if the clock went back.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        (Utc::now() - self.start_time).to_std().unwrap_or_default()
    }
}
