use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

/// Number of cells on the board.
pub const BOARD_SIZE: usize = 9;

/// Number of rows (and columns) of the square board.
pub const BOARD_SIDE: usize = 3;

/// The 8 winning lines: rows, columns, then the two diagonals.
pub const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// One of the two sides. `X` always moves first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum Player {
    X,
    O,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::X, Player::O];

    #[must_use]
    pub fn opponent(self) -> Self {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }
}

/// A completed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinResult {
    pub winner: Player,
    pub line: [usize; 3],
    /// Index into [`WIN_LINES`].
    pub line_index: usize,
}

/// The 3×3 grid, indexed row-major from the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Option<Player>; BOARD_SIZE],
}

impl Board {
    pub const EMPTY: Self = Self {
        cells: [None; BOARD_SIZE],
    };

    #[must_use]
    pub fn from_cells(cells: [Option<Player>; BOARD_SIZE]) -> Self {
        Self { cells }
    }

    #[must_use]
    pub fn cells(&self) -> &[Option<Player>; BOARD_SIZE] {
        &self.cells
    }

    /// Returns the owner of `cell`, or `None` if it is empty or out of range.
    #[must_use]
    pub fn get(&self, cell: usize) -> Option<Player> {
        self.cells.get(cell).copied().flatten()
    }

    pub fn set(&mut self, cell: usize, owner: Option<Player>) {
        self.cells[cell] = owner;
    }

    #[must_use]
    pub fn is_empty_cell(&self, cell: usize) -> bool {
        cell < BOARD_SIZE && self.cells[cell].is_none()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// Empty cells in ascending index order.
    #[must_use]
    pub fn available_cells(&self) -> ArrayVec<usize, BOARD_SIZE> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the first completed line in [`WIN_LINES`] order.
    #[must_use]
    pub fn check_win(&self) -> Option<WinResult> {
        WIN_LINES
            .iter()
            .enumerate()
            .find_map(|(line_index, &line)| {
                let [a, b, c] = line;
                let owner = self.cells[a]?;
                (self.cells[b] == Some(owner) && self.cells[c] == Some(owner)).then_some(
                    WinResult {
                        winner: owner,
                        line,
                        line_index,
                    },
                )
            })
    }

    /// Returns the cells where `player` would complete a line with one move.
    #[must_use]
    pub fn winning_cells(&self, player: Player) -> ArrayVec<usize, BOARD_SIZE> {
        self.available_cells()
            .into_iter()
            .filter(|&cell| {
                let mut probe = *self;
                probe.set(cell, Some(player));
                probe.check_win().is_some_and(|w| w.winner == player)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_from_str(s: &str) -> Board {
        let mut board = Board::EMPTY;
        for (i, ch) in s.chars().filter(|c| !c.is_whitespace()).enumerate() {
            let owner = match ch {
                'X' => Some(Player::X),
                'O' => Some(Player::O),
                _ => None,
            };
            board.set(i, owner);
        }
        board
    }

    #[test]
    fn test_empty_board_has_no_winner() {
        assert!(Board::EMPTY.check_win().is_none());
        assert_eq!(Board::EMPTY.available_cells().len(), BOARD_SIZE);
    }

    #[test]
    fn test_detects_column_and_diagonal() {
        let board = board_from_str("X.. X.. X..");
        let win = board.check_win().unwrap();
        assert_eq!(win.winner, Player::X);
        assert_eq!(win.line, [0, 3, 6]);
        assert_eq!(win.line_index, 3);

        let board = board_from_str("..O .O. O..");
        assert_eq!(board.check_win().unwrap().line_index, 7);
    }

    #[test]
    fn test_winning_cells() {
        let board = board_from_str("XX. OO. ...");
        assert_eq!(board.winning_cells(Player::X).as_slice(), &[2]);
        assert_eq!(board.winning_cells(Player::O).as_slice(), &[5]);
    }

    #[test]
    fn test_player_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&Player::O).unwrap(), "\"O\"");
        assert_eq!(Player::X.opponent(), Player::O);
    }
}
