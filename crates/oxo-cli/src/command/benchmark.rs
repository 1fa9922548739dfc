use std::path::PathBuf;

use oxo_engine::{GameRules, Player};
use oxo_neural::Network;
use oxo_stats::descriptive::DescriptiveStats;
use oxo_training::{
    Agent, NeuralAgent, RandomAgent, RuleBasedAgent, TrainingConfig, scenario_accuracy,
    simulate_game,
};
use rand::{RngCore, SeedableRng as _};

use crate::util;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct BenchmarkArg {
    /// Network file to evaluate
    file: PathBuf,
    /// Games per opponent and side
    #[arg(long, default_value_t = 100)]
    games: usize,
    /// Tactical positions per kind
    #[arg(long, default_value_t = 100)]
    scenarios: usize,
    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Default)]
struct Tally {
    wins: usize,
    losses: usize,
    draws: usize,
    lengths: Vec<f64>,
}

impl Tally {
    #[expect(clippy::cast_precision_loss)]
    fn record(&mut self, winner: Option<Player>, side: Player, moves: usize) {
        match winner {
            Some(p) if p == side => self.wins += 1,
            Some(_) => self.losses += 1,
            None => self.draws += 1,
        }
        self.lengths.push(moves as f64);
    }

    #[expect(clippy::cast_precision_loss)]
    fn win_rate(&self) -> f64 {
        let games = self.wins + self.losses + self.draws;
        if games == 0 {
            return 0.0;
        }
        self.wins as f64 / games as f64
    }
}

pub(crate) fn run(arg: &BenchmarkArg) -> anyhow::Result<()> {
    let BenchmarkArg {
        file,
        games,
        scenarios,
        seed,
    } = arg;

    let mut rng = seed.map_or_else(
        rand::rngs::StdRng::from_os_rng,
        rand::rngs::StdRng::seed_from_u64,
    );
    let mut network = util::read_network_file(file, &mut rng)?;
    let config = TrainingConfig::default();

    eprintln!(
        "Benchmarking {} ({} nodes, {} thinking iterations)",
        file.display(),
        network.node_count(),
        network.thinking_iterations()
    );
    println!(
        "{:<12} {:<5} {:>6} {:>6} {:>6} {:>8} {:>10}",
        "opponent", "side", "wins", "losses", "draws", "win%", "avg moves"
    );
    for (name, opponent) in [
        ("rule-based", &mut RuleBasedAgent as &mut dyn Agent),
        ("random", &mut RandomAgent as &mut dyn Agent),
    ] {
        for side in Player::ALL {
            let tally = play_matches(
                &mut network,
                opponent,
                side,
                *games,
                config.rules,
                config.max_moves_per_game,
                &mut rng,
            );
            let lengths = DescriptiveStats::new(tally.lengths.iter().copied());
            println!(
                "{:<12} {:<5} {:>6} {:>6} {:>6} {:>7.1}% {:>10.2}",
                name,
                side.to_string(),
                tally.wins,
                tally.losses,
                tally.draws,
                tally.win_rate() * 100.0,
                lengths.map_or(0.0, |s| s.mean)
            );
        }
    }

    let accuracy = scenario_accuracy(&mut network, *scenarios, &mut rng);
    println!();
    println!("Tactical accuracy over {scenarios} positions per kind:");
    println!("  win in one: {:>6.1}%", accuracy.win_in_one * 100.0);
    println!("  must block: {:>6.1}%", accuracy.must_block * 100.0);
    Ok(())
}

fn play_matches(
    network: &mut Network,
    opponent: &mut dyn Agent,
    side: Player,
    games: usize,
    rules: GameRules,
    max_moves: usize,
    rng: &mut dyn RngCore,
) -> Tally {
    let mut tally = Tally::default();
    for _ in 0..games {
        let mut agent = NeuralAgent::new(network);
        let record = match side {
            Player::X => simulate_game(&mut agent, opponent, rules, max_moves, rng),
            Player::O => simulate_game(opponent, &mut agent, rules, max_moves, rng),
        };
        tally.record(record.winner, side, record.len());
    }
    tally
}

#[cfg(test)]
mod tests {
    use oxo_neural::NetworkConfig;
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_tally_counts_from_the_network_side() {
        let mut tally = Tally::default();
        tally.record(Some(Player::O), Player::O, 5);
        tally.record(Some(Player::X), Player::O, 6);
        tally.record(None, Player::O, 500);
        assert_eq!((tally.wins, tally.losses, tally.draws), (1, 1, 1));
        assert!((tally.win_rate() - 1.0 / 3.0).abs() < 1e-12);
        assert!(Tally::default().win_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_play_matches_plays_every_game() {
        let mut rng = Pcg64Mcg::seed_from_u64(9);
        let mut network = Network::new(NetworkConfig::default(), &mut rng);
        let tally = play_matches(
            &mut network,
            &mut RandomAgent,
            Player::O,
            4,
            GameRules::default(),
            30,
            &mut rng,
        );
        assert_eq!(tally.wins + tally.losses + tally.draws, 4);
        assert_eq!(tally.lengths.len(), 4);
        assert!(tally.lengths.iter().all(|&l| l <= 30.0));
    }
}
