//! Collaborator traits consumed by the search.
//!
//! The engine never inspects board semantics. Everything game specific goes
//! through two capabilities supplied by the caller:
//!
//! - [`Evaluator`]: the rules engine. Applies moves, detects game over and
//!   picks uniformly random legal moves for rollouts.
//! - [`Expander`]: the move generator. Lists candidate moves to add to the
//!   tree when a node is expanded.
//!
//! Moves carry their own evaluation score through the [`Move`] trait.

use rand::Rng;
use thiserror::Error;

use crate::board::{Board, Side};

/// Errors a rules engine can report when asked to apply a move.
///
/// Any of these aborts the running search call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Move ({row}, {col}) is outside the board")]
    OutOfBounds { row: usize, col: usize },

    #[error("Cell ({row}, {col}) is already occupied")]
    CellOccupied { row: usize, col: usize },
}

/// Outcome of applying a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    /// The game continues.
    #[default]
    InProgress,
    /// The game ended without a winner.
    Draw,
    /// The game ended and the given side won.
    Won(Side),
}

impl GameStatus {
    #[inline]
    pub fn is_over(self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }

    /// Winning side, `None` for draws and unfinished games.
    #[inline]
    pub fn winner(self) -> Option<Side> {
        match self {
            GameStatus::Won(side) => Some(side),
            _ => None,
        }
    }
}

/// A move that can be applied to a board.
///
/// The expander may attach an evaluation to each move, which is seeded into
/// the tree statistics when the move is expanded. Recommended range is
/// `-1.0` (clearly losing) to `1.0` (clearly winning), from the perspective of
/// the side making the move. `0.0` is neutral.
pub trait Move: Clone + std::fmt::Debug {
    fn eval(&self) -> f64;
}

/// Rules engine used for expansion and rollouts.
pub trait Evaluator {
    type Move: Move;

    /// A uniformly random legal move for `side`, or `None` when no move exists.
    ///
    /// The random source belongs to the caller of the search and is passed
    /// in on every call.
    fn random_move<R: Rng + ?Sized>(
        &self,
        board: &Board,
        side: Side,
        rng: &mut R,
    ) -> Option<Self::Move>;

    /// Apply `mv` for `side`, mutating `board` in place.
    ///
    /// On error the board must be left unchanged. If the move would end the
    /// game in favour of a side other than the mover, the status is reported
    /// but the board is not mutated.
    fn apply_move(
        &self,
        board: &mut Board,
        side: Side,
        mv: &Self::Move,
    ) -> Result<GameStatus, RuleError>;

    /// Side that moves after `side`.
    fn next_player(&self, side: Side) -> Side;

    /// Side that moved before `side`. Must invert [`Evaluator::next_player`].
    fn prev_player(&self, side: Side) -> Side;
}

/// Move generator used when a node is expanded.
pub trait Expander<M> {
    /// Candidate (preferably legal) moves for `side`. May be empty.
    fn expand(&self, board: &Board, side: Side) -> Vec<M>;
}

impl<M, F> Expander<M> for F
where
    F: Fn(&Board, Side) -> Vec<M>,
{
    fn expand(&self, board: &Board, side: Side) -> Vec<M> {
        self(board, side)
    }
}
