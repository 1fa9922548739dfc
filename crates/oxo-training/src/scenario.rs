//! Tactical positions for checking whether a network has learned to finish a
//! line or to stop one.
//!
//! Scenarios are built on bare boards: pieces are dropped alternately on random
//! cells (without decay) until a position with the wanted property appears.
//! Networks are scored with [`NeuralAgent::decide`], a single pass over the
//! `+1`/`-1` board encoding.

use arrayvec::ArrayVec;
use oxo_engine::{BOARD_SIZE, Board, Player};
use oxo_neural::Network;
use rand::{Rng, RngCore, seq::IndexedRandom as _};

use crate::agent::NeuralAgent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum ScenarioKind {
    #[display("win in one")]
    WinInOne,
    #[display("must block")]
    MustBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub board: Board,
    pub to_move: Player,
    /// Every cell that solves the position.
    pub solutions: ArrayVec<usize, BOARD_SIZE>,
}

impl Scenario {
    /// A position where the side to move can complete a line right away.
    ///
    /// Between 2 and 5 pieces are on the board.
    pub fn win_in_one<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        loop {
            let (board, to_move) = random_position(rng.random_range(2..=5), rng);
            if board.check_win().is_some() {
                continue;
            }
            let solutions = board.winning_cells(to_move);
            if !solutions.is_empty() {
                return Self {
                    kind: ScenarioKind::WinInOne,
                    board,
                    to_move,
                    solutions,
                };
            }
        }
    }

    /// A position where the opponent threatens to complete a line and the side
    /// to move has no win of its own.
    ///
    /// Between 3 and 6 pieces are on the board.
    pub fn must_block<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        loop {
            let (board, to_move) = random_position(rng.random_range(3..=6), rng);
            if board.check_win().is_some() || !board.winning_cells(to_move).is_empty() {
                continue;
            }
            let solutions = board.winning_cells(to_move.opponent());
            if !solutions.is_empty() {
                return Self {
                    kind: ScenarioKind::MustBlock,
                    board,
                    to_move,
                    solutions,
                };
            }
        }
    }

    #[must_use]
    pub fn is_solved_by(&self, cell: usize) -> bool {
        self.solutions.contains(&cell)
    }
}

// Returns the board and the side whose turn it is next.
fn random_position<R>(pieces: usize, rng: &mut R) -> (Board, Player)
where
    R: Rng + ?Sized,
{
    let mut board = Board::EMPTY;
    let mut player = *Player::ALL.choose(rng).unwrap_or(&Player::X);
    for _ in 0..pieces {
        let Some(&cell) = board.available_cells().choose(rng) else {
            break;
        };
        board.set(cell, Some(player));
        player = player.opponent();
    }
    (board, player)
}

/// Share of solved scenarios per kind.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScenarioAccuracy {
    pub win_in_one: f64,
    pub must_block: f64,
}

/// Scores `network` on `count` scenarios of each kind.
///
/// The network is only read through forward passes, but stateful nodes
/// (memory, latch) keep whatever they hold after the last scenario.
#[expect(clippy::cast_precision_loss)]
pub fn scenario_accuracy(
    network: &mut Network,
    count: usize,
    rng: &mut dyn RngCore,
) -> ScenarioAccuracy {
    if count == 0 {
        return ScenarioAccuracy::default();
    }
    let mut agent = NeuralAgent::new(network);
    let mut win_in_one = 0_usize;
    let mut must_block = 0_usize;
    for _ in 0..count {
        let scenario = Scenario::win_in_one(rng);
        if solves(&mut agent, &scenario, rng) {
            win_in_one += 1;
        }
        let scenario = Scenario::must_block(rng);
        if solves(&mut agent, &scenario, rng) {
            must_block += 1;
        }
    }
    ScenarioAccuracy {
        win_in_one: win_in_one as f64 / count as f64,
        must_block: must_block as f64 / count as f64,
    }
}

fn solves(agent: &mut NeuralAgent<'_>, scenario: &Scenario, rng: &mut dyn RngCore) -> bool {
    agent
        .decide(&scenario.board, scenario.to_move, rng)
        .is_some_and(|cell| scenario.is_solved_by(cell))
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg64Mcg;

    use super::*;

    #[test]
    fn test_win_in_one_positions() {
        let mut rng = Pcg64Mcg::seed_from_u64(11);
        for _ in 0..100 {
            let scenario = Scenario::win_in_one(&mut rng);
            let pieces = scenario.board.cells().iter().flatten().count();
            assert!((2..=5).contains(&pieces));
            assert!(scenario.board.check_win().is_none());
            for &cell in &scenario.solutions {
                let mut board = scenario.board;
                board.set(cell, Some(scenario.to_move));
                assert_eq!(board.check_win().unwrap().winner, scenario.to_move);
            }
        }
    }

    #[test]
    fn test_must_block_positions() {
        let mut rng = Pcg64Mcg::seed_from_u64(12);
        for _ in 0..100 {
            let scenario = Scenario::must_block(&mut rng);
            let pieces = scenario.board.cells().iter().flatten().count();
            assert!((3..=6).contains(&pieces));
            assert!(scenario.board.winning_cells(scenario.to_move).is_empty());
            let opponent = scenario.to_move.opponent();
            for &cell in &scenario.solutions {
                let mut board = scenario.board;
                board.set(cell, Some(opponent));
                assert_eq!(board.check_win().unwrap().winner, opponent);
            }
        }
    }

    #[test]
    fn test_accuracy_is_a_share() {
        let mut rng = Pcg64Mcg::seed_from_u64(13);
        let mut network = Network::new(Default::default(), &mut rng);
        let accuracy = scenario_accuracy(&mut network, 20, &mut rng);
        assert!((0.0..=1.0).contains(&accuracy.win_in_one));
        assert!((0.0..=1.0).contains(&accuracy.must_block));
        assert_eq!(
            scenario_accuracy(&mut network, 0, &mut rng),
            ScenarioAccuracy::default()
        );
    }
}
