use std::time::Duration;

use oxo_engine::{GameRules, Player};
use oxo_neural::{ConfigError, MutationConfig, NetworkConfig};
use serde::{Deserialize, Serialize};

/// Population-level parameters of the genetic algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneticConfig {
    pub population_size: usize,
    /// Share of the population reserved for elite mutants (twice) and crossover
    /// children (once) in each generation.
    pub elitism_rate: f64,
    pub tournament_size: usize,
    /// Random nodes added to each fresh network of the initial population.
    pub initial_random_nodes: usize,
    pub network: NetworkConfig,
    pub mutation: MutationConfig,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 2048,
            elitism_rate: 0.1,
            tournament_size: 5,
            initial_random_nodes: 5,
            network: NetworkConfig::default(),
            mutation: MutationConfig::default(),
        }
    }
}

impl GeneticConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::ZeroSize {
                field: "populationSize",
            });
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::ZeroSize {
                field: "tournamentSize",
            });
        }
        if !(0.0..=1.0).contains(&self.elitism_rate) {
            return Err(ConfigError::InvalidRate {
                field: "elitismRate",
                value: self.elitism_rate,
            });
        }
        self.network.validate()?;
        self.mutation.validate()
    }

    /// Number of elitism reservations: `floor(population_size * elitism_rate)`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn elite_slots(&self) -> usize {
        (self.population_size as f64 * self.elitism_rate).floor() as usize
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingMode {
    /// Sleeps after each battle for three times its duration.
    #[default]
    Background,
    /// Only yields to the scheduler between battles.
    FullSpeed,
}

/// Fitness weight of each side; the second mover is weighted higher.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleWeights {
    pub x: f64,
    pub o: f64,
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self { x: 0.1, o: 5.0 }
    }
}

impl RoleWeights {
    #[must_use]
    pub fn get(&self, player: Player) -> f64 {
        match player {
            Player::X => self.x,
            Player::O => self.o,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainingConfig {
    pub genetic: GeneticConfig,
    pub rules: GameRules,
    pub max_moves_per_game: usize,
    pub role_weights: RoleWeights,
    /// Flat fitness bonus for beating the rule-based opponent in a benchmark.
    pub benchmark_win_bonus: f64,
    /// A generation lasts `population_size * battles_per_generation_factor` battles.
    pub battles_per_generation_factor: usize,
    pub history_capacity: usize,
    pub game_length_window: u32,
    pub loser_bonus_divisor: f64,
    /// Initial throttling mode; it can be switched while training runs.
    pub mode: TrainingMode,
    /// Multiple of a battle's own duration slept after it in background mode.
    pub background_sleep_factor: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            genetic: GeneticConfig::default(),
            rules: GameRules::default(),
            max_moves_per_game: 500,
            role_weights: RoleWeights::default(),
            benchmark_win_bonus: 5.0,
            battles_per_generation_factor: 5,
            history_capacity: 100,
            game_length_window: 50,
            loser_bonus_divisor: 10.0,
            mode: TrainingMode::Background,
            background_sleep_factor: 3,
        }
    }
}

impl TrainingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.genetic.validate()?;
        if self.max_moves_per_game == 0 {
            return Err(ConfigError::ZeroSize {
                field: "maxMovesPerGame",
            });
        }
        if self.battles_per_generation_factor == 0 {
            return Err(ConfigError::ZeroSize {
                field: "battlesPerGenerationFactor",
            });
        }
        if self.rules.max_lifetime == 0 {
            return Err(ConfigError::ZeroSize {
                field: "maxLifetime",
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn battles_per_generation(&self) -> u64 {
        (self.genetic.population_size * self.battles_per_generation_factor) as u64
    }

    /// Average game length above which a decisive loser is replaced by a
    /// mutated clone of the winner.
    #[must_use]
    #[expect(clippy::cast_precision_loss)]
    pub fn stagnation_threshold(&self) -> f64 {
        (oxo_engine::BOARD_SIZE * self.rules.max_lifetime as usize) as f64
    }

    /// Pause after a battle that took `battle_duration`; `None` means only
    /// yield to the scheduler.
    #[must_use]
    pub fn throttle(&self, mode: TrainingMode, battle_duration: Duration) -> Option<Duration> {
        match mode {
            TrainingMode::Background => Some(battle_duration * self.background_sleep_factor),
            TrainingMode::FullSpeed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elite_slots_floor() {
        let config = GeneticConfig {
            population_size: 20,
            ..GeneticConfig::default()
        };
        assert_eq!(config.elite_slots(), 2);
        assert_eq!(GeneticConfig::default().elite_slots(), 204);
    }

    #[test]
    fn test_defaults_validate() {
        let config = TrainingConfig::default();
        config.validate().unwrap();
        assert!((config.stagnation_threshold() - 36.0).abs() < 1e-12);
        assert_eq!(config.battles_per_generation(), 2048 * 5);
    }

    #[test]
    fn test_throttle_by_mode() {
        let config = TrainingConfig::default();
        let battle = Duration::from_millis(4);
        assert_eq!(
            config.throttle(TrainingMode::Background, battle),
            Some(Duration::from_millis(12))
        );
        assert_eq!(config.throttle(TrainingMode::FullSpeed, battle), None);
    }

    #[test]
    fn test_rejects_bad_rate() {
        let config = GeneticConfig {
            elitism_rate: 1.5,
            ..GeneticConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
