use serde::{Deserialize, Serialize};

use crate::core::{BOARD_SIZE, Board, Player, WinResult};

/// Rule parameters of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRules {
    /// Lifetime of a newly placed piece. Each of the owner's moves, including the
    /// placing one, removes one life.
    pub max_lifetime: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self { max_lifetime: 4 }
    }
}

/// A piece currently on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePiece {
    pub player: Player,
    pub cell: usize,
    pub lifetime: u32,
}

/// A move that was accepted by [`GameState::make_move`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub player: Player,
    pub cell: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::IsVariant)]
pub enum MoveOutcome {
    /// The game is over, the cell is out of range, or it is occupied.
    Invalid,
    /// The move was applied and the turn passed to the opponent.
    Continue,
    Win(WinResult),
    /// The board is full with no completed line.
    Draw,
}

#[derive(Debug, Clone)]
pub struct GameState {
    rules: GameRules,
    board: Board,
    current_player: Player,
    move_history: Vec<Move>,
    active_pieces: Vec<ActivePiece>,
    active: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameRules::default())
    }
}

impl GameState {
    #[must_use]
    pub fn new(rules: GameRules) -> Self {
        Self {
            rules,
            board: Board::EMPTY,
            current_player: Player::X,
            move_history: vec![],
            active_pieces: Vec::with_capacity(BOARD_SIZE),
            active: true,
        }
    }

    pub fn reset(&mut self) {
        self.board = Board::EMPTY;
        self.current_player = Player::X;
        self.move_history.clear();
        self.active_pieces.clear();
        self.active = true;
    }

    #[must_use]
    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    #[must_use]
    pub fn move_history(&self) -> &[Move] {
        &self.move_history
    }

    #[must_use]
    pub fn active_pieces(&self) -> &[ActivePiece] {
        &self.active_pieces
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn is_valid_move(&self, cell: usize) -> bool {
        self.active && self.board.is_empty_cell(cell)
    }

    pub fn make_move(&mut self, cell: usize) -> MoveOutcome {
        if !self.is_valid_move(cell) {
            return MoveOutcome::Invalid;
        }

        let player = self.current_player;
        self.board.set(cell, Some(player));
        self.move_history.push(Move { player, cell });
        self.active_pieces.push(ActivePiece {
            player,
            cell,
            lifetime: self.rules.max_lifetime,
        });
        self.decay_pieces(player);

        if let Some(win) = self.board.check_win() {
            self.active = false;
            return MoveOutcome::Win(win);
        }
        if self.board.is_full() {
            self.active = false;
            return MoveOutcome::Draw;
        }

        self.current_player = player.opponent();
        MoveOutcome::Continue
    }

    #[must_use]
    pub fn last_move(&self) -> Option<&Move> {
        self.move_history.last()
    }

    // Only the mover's pieces age; expired pieces leave the board.
    fn decay_pieces(&mut self, mover: Player) {
        let board = &mut self.board;
        self.active_pieces.retain_mut(|piece| {
            if piece.player != mover {
                return true;
            }
            piece.lifetime = piece.lifetime.saturating_sub(1);
            if piece.lifetime == 0 {
                board.set(piece.cell, None);
                return false;
            }
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(state: &mut GameState, cells: &[usize]) -> MoveOutcome {
        let mut outcome = MoveOutcome::Invalid;
        for &cell in cells {
            outcome = state.make_move(cell);
        }
        outcome
    }

    #[test]
    fn test_turns_alternate_and_occupied_cells_are_invalid() {
        let mut state = GameState::default();
        assert!(state.make_move(0).is_continue());
        assert_eq!(state.current_player(), Player::O);
        assert!(state.make_move(0).is_invalid());
        assert!(state.make_move(BOARD_SIZE).is_invalid());
        assert_eq!(state.move_history().len(), 1);
    }

    #[test]
    fn test_row_wins_and_ends_game() {
        let mut state = GameState::default();
        let outcome = play(&mut state, &[0, 3, 1, 4, 2]);
        let MoveOutcome::Win(win) = outcome else {
            panic!("expected win, got {outcome:?}");
        };
        assert_eq!(win.winner, Player::X);
        assert_eq!(win.line, [0, 1, 2]);
        assert!(!state.is_active());
        assert!(state.make_move(8).is_invalid());
    }

    #[test]
    fn test_pieces_decay_after_owner_moves() {
        // A new piece ages on the move that places it, so it survives two more own moves.
        let mut state = GameState::new(GameRules { max_lifetime: 3 });
        play(&mut state, &[0, 8, 1]);
        assert_eq!(state.board().get(0), Some(Player::X));
        // O's move ages only O's pieces.
        play(&mut state, &[7]);
        assert_eq!(state.board().get(0), Some(Player::X));
        // X's third move expires the piece on cell 0.
        play(&mut state, &[3]);
        assert_eq!(state.board().get(0), None);
        assert_eq!(state.board().get(1), Some(Player::X));
        assert!(
            state
                .active_pieces()
                .iter()
                .all(|p| p.cell != 0 && p.lifetime > 0)
        );
    }

    #[test]
    fn test_expired_piece_cannot_complete_line() {
        let mut state = GameState::new(GameRules { max_lifetime: 3 });
        let outcome = play(&mut state, &[0, 5, 1, 8, 2]);
        // Cell 0 expires before the win check, so 0-1-2 is not a line.
        assert!(outcome.is_continue());
        assert_eq!(state.board().get(0), None);
        assert_eq!(state.board().get(2), Some(Player::X));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut state = GameState::default();
        play(&mut state, &[4, 0]);
        state.reset();
        assert_eq!(state.board(), &Board::EMPTY);
        assert_eq!(state.current_player(), Player::X);
        assert!(state.move_history().is_empty());
        assert!(state.is_active());
    }
}
