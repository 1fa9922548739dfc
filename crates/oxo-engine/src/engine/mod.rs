//! Turn handling on top of the [`Board`](crate::Board).
//!
//! - [`GameState`] - board, side to move, move history and active pieces
//! - [`GameRules`] - rule parameters (piece lifetime)
//! - [`MoveOutcome`] - result of [`GameState::make_move`]

pub use self::game_state::*;

mod game_state;
