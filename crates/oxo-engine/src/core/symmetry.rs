use serde::{Deserialize, Serialize};

use super::board::{BOARD_SIZE, Board};

/// One of the 8 symmetries of the square board (the dihedral group D4).
///
/// Each symmetry is a permutation of cell indices: a piece on cell `i` moves to
/// cell [`Symmetry::map_cell(i)`](Symmetry::map_cell).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum Symmetry {
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
    FlipHorizontal,
    FlipVertical,
    FlipMainDiagonal,
    FlipAntiDiagonal,
}

impl Symmetry {
    pub const ALL: [Symmetry; 8] = [
        Symmetry::Identity,
        Symmetry::Rotate90,
        Symmetry::Rotate180,
        Symmetry::Rotate270,
        Symmetry::FlipHorizontal,
        Symmetry::FlipVertical,
        Symmetry::FlipMainDiagonal,
        Symmetry::FlipAntiDiagonal,
    ];

    #[must_use]
    pub const fn cell_map(self) -> &'static [usize; BOARD_SIZE] {
        match self {
            Symmetry::Identity => &[0, 1, 2, 3, 4, 5, 6, 7, 8],
            Symmetry::Rotate90 => &[6, 3, 0, 7, 4, 1, 8, 5, 2],
            Symmetry::Rotate180 => &[8, 7, 6, 5, 4, 3, 2, 1, 0],
            Symmetry::Rotate270 => &[2, 5, 8, 1, 4, 7, 0, 3, 6],
            Symmetry::FlipHorizontal => &[2, 1, 0, 5, 4, 3, 8, 7, 6],
            Symmetry::FlipVertical => &[6, 7, 8, 3, 4, 5, 0, 1, 2],
            Symmetry::FlipMainDiagonal => &[0, 3, 6, 1, 4, 7, 2, 5, 8],
            Symmetry::FlipAntiDiagonal => &[8, 5, 2, 7, 4, 1, 6, 3, 0],
        }
    }

    #[must_use]
    pub fn is_identity(self) -> bool {
        self == Symmetry::Identity
    }

    #[must_use]
    pub fn map_cell(self, cell: usize) -> usize {
        self.cell_map()[cell]
    }

    #[must_use]
    pub fn apply_to_board(self, board: &Board) -> Board {
        let mut transformed = Board::EMPTY;
        for (cell, owner) in board.cells().iter().enumerate() {
            transformed.set(self.map_cell(cell), *owner);
        }
        transformed
    }
}
