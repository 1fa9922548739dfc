use std::fmt;

use oxo_engine::{BOARD_SIZE, Board, GameState, Player};
use oxo_neural::{ForwardOutput, Network};
use rand::{RngCore, seq::IndexedRandom as _};

/// A move-selection policy for one side of a game.
pub trait Agent: fmt::Debug {
    /// Returns the cell to play, or `None` to resign when no move is possible.
    fn choose_move(&mut self, state: &GameState, rng: &mut dyn RngCore) -> Option<usize>;

    /// Activation trace of the last decision, for agents backed by a network.
    fn last_activations(&self) -> Option<&ForwardOutput> {
        None
    }
}

/// Plays with a network; the network is borrowed for the duration of a game.
#[derive(Debug)]
pub struct NeuralAgent<'a> {
    network: &'a mut Network,
    last_activations: Option<ForwardOutput>,
}

impl<'a> NeuralAgent<'a> {
    #[must_use]
    pub fn new(network: &'a mut Network) -> Self {
        Self {
            network,
            last_activations: None,
        }
    }

    #[must_use]
    pub fn network(&self) -> &Network {
        self.network
    }

    /// Single-pass decision on a bare board, encoding own pieces as `+1` and
    /// opponent pieces as `-1`.
    pub fn decide(&mut self, board: &Board, player: Player, rng: &mut dyn RngCore) -> Option<usize> {
        let mut inputs = [0.0; BOARD_SIZE];
        for (input, owner) in inputs.iter_mut().zip(board.cells()) {
            *input = match owner {
                Some(p) if *p == player => 1.0,
                Some(_) => -1.0,
                None => 0.0,
            };
        }
        let output = self.network.forward(&inputs, rng);
        let cell = best_available_cell(&output.outputs, &board.available_cells());
        self.last_activations = Some(output);
        cell
    }
}

impl Agent for NeuralAgent<'_> {
    fn choose_move(&mut self, state: &GameState, rng: &mut dyn RngCore) -> Option<usize> {
        let available = state.board().available_cells();
        if available.is_empty() {
            return None;
        }
        let inputs = encode_state(state, state.current_player());
        let output = self.network.think(&inputs, rng);
        let cell = best_available_cell(&output.outputs, &available);
        self.last_activations = Some(output);
        cell
    }

    fn last_activations(&self) -> Option<&ForwardOutput> {
        self.last_activations.as_ref()
    }
}

/// Network input for `player`: `+lifetime` for own pieces, `-lifetime` for the
/// opponent's, 0 for empty cells.
#[must_use]
pub fn encode_state(state: &GameState, player: Player) -> [f64; BOARD_SIZE] {
    let mut inputs = [0.0; BOARD_SIZE];
    for piece in state.active_pieces() {
        let lifetime = f64::from(piece.lifetime);
        inputs[piece.cell] = if piece.player == player {
            lifetime
        } else {
            -lifetime
        };
    }
    inputs
}

/// The available cell with the largest output; the earliest cell wins ties.
#[must_use]
pub fn best_available_cell(outputs: &[f64], available: &[usize]) -> Option<usize> {
    let value = |cell: usize| outputs.get(cell).copied().unwrap_or(f64::NEG_INFINITY);
    let (&first, rest) = available.split_first()?;
    Some(rest.iter().fold(first, |best, &cell| {
        if value(cell) > value(best) { cell } else { best }
    }))
}

/// Takes a winning cell if there is one, else blocks the opponent's winning
/// cell, else plays a random available cell.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedAgent;

impl RuleBasedAgent {
    #[must_use]
    pub fn choose_on_board(board: &Board, player: Player, rng: &mut dyn RngCore) -> Option<usize> {
        if let Some(&cell) = board.winning_cells(player).first() {
            return Some(cell);
        }
        if let Some(&cell) = board.winning_cells(player.opponent()).first() {
            return Some(cell);
        }
        board.available_cells().choose(rng).copied()
    }
}

impl Agent for RuleBasedAgent {
    fn choose_move(&mut self, state: &GameState, rng: &mut dyn RngCore) -> Option<usize> {
        Self::choose_on_board(state.board(), state.current_player(), rng)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAgent;

impl Agent for RandomAgent {
    fn choose_move(&mut self, state: &GameState, rng: &mut dyn RngCore) -> Option<usize> {
        state.board().available_cells().choose(rng).copied()
    }
}
