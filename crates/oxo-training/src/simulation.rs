use oxo_engine::{GameRules, GameState, MoveOutcome, Player, WinResult};
use oxo_neural::ForwardOutput;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// One accepted move with the activation trace that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMove {
    pub player: Player,
    pub cell: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activations: Option<ForwardOutput>,
}

/// A finished (or cut-off) game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub moves: Vec<RecordedMove>,
    pub winner: Option<Player>,
    pub win: Option<WinResult>,
}

impl GameRecord {
    #[must_use]
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    #[must_use]
    pub fn is_decisive(&self) -> bool {
        self.winner.is_some()
    }
}

/// Plays `x` against `o` from an empty board.
///
/// The game ends on a win, a draw, after `max_moves` accepted moves, or as
/// soon as the side to move returns no move or an invalid one.
pub fn simulate_game(
    x: &mut dyn Agent,
    o: &mut dyn Agent,
    rules: GameRules,
    max_moves: usize,
    rng: &mut dyn RngCore,
) -> GameRecord {
    let mut state = GameState::new(rules);
    let mut record = GameRecord::default();

    while state.is_active() && record.moves.len() < max_moves {
        let player = state.current_player();
        let agent: &mut dyn Agent = match player {
            Player::X => &mut *x,
            Player::O => &mut *o,
        };
        let Some(cell) = agent.choose_move(&state, rng) else {
            break;
        };
        if !state.is_valid_move(cell) {
            break;
        }
        let activations = agent.last_activations().cloned();
        let outcome = state.make_move(cell);
        record.moves.push(RecordedMove {
            player,
            cell,
            activations,
        });
        match outcome {
            MoveOutcome::Win(win) => {
                record.winner = Some(win.winner);
                record.win = Some(win);
                break;
            }
            MoveOutcome::Draw | MoveOutcome::Invalid => break,
            MoveOutcome::Continue => {}
        }
    }
    record
}
