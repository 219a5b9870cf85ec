//! Shared test fixtures: a tiny two-player game and instrumented collaborators.
//!
//! `RowGame`: players 1 and 2 alternately fill empty cells; a player wins by
//! owning a whole row, the game is drawn when the board is full.

use std::cell::Cell;

use rand::Rng;

use crate::board::{Board, Side};
use crate::evaluator::{Evaluator, Expander, GameStatus, Move, RuleError};

#[derive(Debug, Clone, PartialEq)]
pub struct CellMove {
    pub row: usize,
    pub col: usize,
    pub eval: f64,
}

impl CellMove {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col, eval: 0.0 }
    }
}

impl Move for CellMove {
    fn eval(&self) -> f64 {
        self.eval
    }
}

#[derive(Debug, Default)]
pub struct RowGame;

impl Evaluator for RowGame {
    type Move = CellMove;

    fn random_move<R: Rng + ?Sized>(
        &self,
        board: &Board,
        _side: Side,
        rng: &mut R,
    ) -> Option<CellMove> {
        let empty: Vec<_> = board.empty_cells().collect();
        if empty.is_empty() {
            return None;
        }
        let (row, col) = empty[rng.gen_range(0..empty.len())];
        Some(CellMove::new(row, col))
    }

    fn apply_move(
        &self,
        board: &mut Board,
        side: Side,
        mv: &CellMove,
    ) -> Result<GameStatus, RuleError> {
        match board.get(mv.row, mv.col) {
            None => {
                return Err(RuleError::OutOfBounds {
                    row: mv.row,
                    col: mv.col,
                })
            }
            Some(0) => {}
            Some(_) => {
                return Err(RuleError::CellOccupied {
                    row: mv.row,
                    col: mv.col,
                })
            }
        }

        board.set(mv.row, mv.col, side);
        let owns_row = (0..board.cols()).all(|c| board.get(mv.row, c) == Some(side));
        if owns_row {
            Ok(GameStatus::Won(side))
        } else if board.is_full() {
            Ok(GameStatus::Draw)
        } else {
            Ok(GameStatus::InProgress)
        }
    }

    fn next_player(&self, side: Side) -> Side {
        3 - side
    }

    fn prev_player(&self, side: Side) -> Side {
        3 - side
    }
}

/// Lists every empty cell, attaching a fixed evaluation to each move and
/// counting how often it is asked.
#[derive(Debug, Default)]
pub struct EmptyCells {
    pub eval: f64,
    pub calls: Cell<u32>,
}

impl EmptyCells {
    pub fn with_eval(eval: f64) -> Self {
        Self {
            eval,
            calls: Cell::new(0),
        }
    }
}

impl Expander<CellMove> for EmptyCells {
    fn expand(&self, board: &Board, _side: Side) -> Vec<CellMove> {
        self.calls.set(self.calls.get() + 1);
        board
            .empty_cells()
            .map(|(row, col)| CellMove {
                row,
                col,
                eval: self.eval,
            })
            .collect()
    }
}

/// Wraps [`RowGame`] and rejects every move after the first `succeed` ones.
#[derive(Debug)]
pub struct FailingRules {
    pub succeed: u32,
    pub applied: Cell<u32>,
}

impl FailingRules {
    pub fn after(succeed: u32) -> Self {
        Self {
            succeed,
            applied: Cell::new(0),
        }
    }
}

impl Evaluator for FailingRules {
    type Move = CellMove;

    fn random_move<R: Rng + ?Sized>(
        &self,
        board: &Board,
        side: Side,
        rng: &mut R,
    ) -> Option<CellMove> {
        RowGame.random_move(board, side, rng)
    }

    fn apply_move(
        &self,
        board: &mut Board,
        side: Side,
        mv: &CellMove,
    ) -> Result<GameStatus, RuleError> {
        if self.applied.get() >= self.succeed {
            return Err(RuleError::IllegalMove(format!(
                "rejected ({}, {})",
                mv.row, mv.col
            )));
        }
        self.applied.set(self.applied.get() + 1);
        RowGame.apply_move(board, side, mv)
    }

    fn next_player(&self, side: Side) -> Side {
        3 - side
    }

    fn prev_player(&self, side: Side) -> Side {
        3 - side
    }
}
