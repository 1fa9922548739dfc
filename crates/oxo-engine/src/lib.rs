//! Rule engine for noughts and crosses with decaying pieces.
//!
//! The engine is a small state machine consumed by the training system:
//!
//! - [`Board`] - 3×3 grid of cells owned by a [`Player`] or empty
//! - [`GameState`] - turn order, move history and the piece-decay rule
//! - [`Symmetry`] - the 8 symmetries of the square board as cell permutations
//!
//! # Piece Decay
//!
//! Every placed piece starts with [`GameRules::max_lifetime`] lives. After a move,
//! only the mover's pieces lose one life; a piece with no lives left is removed
//! from the board. Wins are checked after decay, so a line completed by a move
//! that also expires one of its pieces does not count.
//!
//! # Example
//!
//! ```
//! use oxo_engine::{GameRules, GameState, MoveOutcome, Player};
//!
//! let mut state = GameState::new(GameRules::default());
//! assert_eq!(state.current_player(), Player::X);
//! assert!(state.make_move(4).is_continue());
//! assert_eq!(state.current_player(), Player::O);
//! assert!(matches!(state.make_move(4), MoveOutcome::Invalid));
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;
