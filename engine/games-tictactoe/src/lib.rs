//! k-in-a-row grid game for the mcts engine
//!
//! Two players (1 = X, 2 = O) take turns placing a mark on an empty cell of
//! a `rows x cols` board. The first to line up `target` marks horizontally,
//! vertically or diagonally wins; a full board without a line is a draw.
//! Classic TicTacToe is `GridRules::tictactoe()` (3x3, three in a row).
//!
//! The crate plugs into the engine through:
//! - [`GridEvaluator`]: rules engine ([`mcts::Evaluator`])
//! - [`GridExpander`]: lists every empty cell ([`mcts::Expander`])
//!
//! # Usage
//!
//! ```rust
//! use games_tictactoe::{GridEvaluator, GridExpander, GridRules};
//! use mcts::Mcts;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//! use std::time::Duration;
//!
//! let rules = GridRules::tictactoe();
//! let board = rules.new_board();
//! let engine = Mcts::new(GridEvaluator::new(rules), GridExpander);
//!
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//! let result = engine
//!     .search(&board, 1, Duration::from_secs(10), 0, 500, &mut rng)
//!     .unwrap();
//! assert!(board.get(result.best_move.row, result.best_move.col) == Some(0));
//! ```

use std::fmt;

use mcts::{Board, Evaluator, Expander, GameStatus, Move, RuleError, Side};
use rand::seq::IteratorRandom;
use rand::Rng;
use thiserror::Error;

/// Player that moves first.
pub const X: Side = 1;
/// Player that moves second.
pub const O: Side = 2;

/// Line directions checked for a win: horizontal, vertical and both diagonals.
const DIRECTIONS: [(isize, isize); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// Errors raised when configuring a grid game.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("Board must be at least 1x1, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("Target {target} cannot fit on a {rows}x{cols} board")]
    InvalidTarget {
        target: usize,
        rows: usize,
        cols: usize,
    },
}

/// Board geometry and winning line length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridRules {
    rows: usize,
    cols: usize,
    target: usize,
}

impl GridRules {
    pub fn new(rows: usize, cols: usize, target: usize) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::InvalidDimensions { rows, cols });
        }
        if target == 0 || target > rows.max(cols) {
            return Err(GridError::InvalidTarget { target, rows, cols });
        }
        Ok(Self { rows, cols, target })
    }

    /// Standard 3x3 TicTacToe.
    pub fn tictactoe() -> Self {
        Self {
            rows: 3,
            cols: 3,
            target: 3,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn target(&self) -> usize {
        self.target
    }

    /// Empty board of the configured size.
    pub fn new_board(&self) -> Board {
        Board::new(self.rows, self.cols)
    }

    /// Outcome of `side` playing at (`row`, `col`), without touching the board.
    pub fn evaluate(
        &self,
        board: &Board,
        side: Side,
        row: usize,
        col: usize,
    ) -> Result<GameStatus, RuleError> {
        if board.rows() != self.rows || board.cols() != self.cols {
            return Err(RuleError::IllegalMove(format!(
                "board is {}x{}, rules expect {}x{}",
                board.rows(),
                board.cols(),
                self.rows,
                self.cols
            )));
        }
        match board.get(row, col) {
            None => return Err(RuleError::OutOfBounds { row, col }),
            Some(0) => {}
            Some(_) => return Err(RuleError::CellOccupied { row, col }),
        }

        if self.completes_line(board, side, row, col) {
            Ok(GameStatus::Won(side))
        } else if board.empty_cells().nth(1).is_none() {
            // The cell being filled was the last empty one
            Ok(GameStatus::Draw)
        } else {
            Ok(GameStatus::InProgress)
        }
    }

    /// Status of a position by scanning every cell.
    ///
    /// Returns the first winner found in row-major order, otherwise Draw for
    /// a full board and InProgress for anything else.
    pub fn status(&self, board: &Board) -> GameStatus {
        for row in 0..board.rows() {
            for col in 0..board.cols() {
                let side = board.get(row, col).unwrap_or(0);
                if side != 0 && self.line_through(board, side, row, col) >= self.target {
                    return GameStatus::Won(side);
                }
            }
        }
        if board.is_full() {
            GameStatus::Draw
        } else {
            GameStatus::InProgress
        }
    }

    /// Whether placing `side` at (`row`, `col`) creates a winning line.
    fn completes_line(&self, board: &Board, side: Side, row: usize, col: usize) -> bool {
        self.line_through(board, side, row, col) >= self.target
    }

    /// Longest run of `side` through (`row`, `col`), counting that cell as
    /// belonging to `side`.
    fn line_through(&self, board: &Board, side: Side, row: usize, col: usize) -> usize {
        DIRECTIONS
            .iter()
            .map(|&(dr, dc)| {
                1 + run_length(board, side, row, col, dr, dc)
                    + run_length(board, side, row, col, -dr, -dc)
            })
            .max()
            .unwrap_or(1)
    }
}

/// Number of consecutive `side` cells starting next to (`row`, `col`) and
/// walking in direction (`dr`, `dc`).
fn run_length(board: &Board, side: Side, row: usize, col: usize, dr: isize, dc: isize) -> usize {
    let mut count = 0;
    let (mut r, mut c) = (row as isize, col as isize);
    loop {
        r += dr;
        c += dc;
        if r < 0 || c < 0 {
            return count;
        }
        match board.get(r as usize, c as usize) {
            Some(v) if v == side => count += 1,
            _ => return count,
        }
    }
}

/// Placement of `side`'s mark at (`row`, `col`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMove {
    pub row: usize,
    pub col: usize,
    pub side: Side,
    pub eval: f64,
}

impl GridMove {
    pub fn new(row: usize, col: usize, side: Side) -> Self {
        Self {
            row,
            col,
            side,
            eval: 0.0,
        }
    }
}

impl Move for GridMove {
    fn eval(&self) -> f64 {
        self.eval
    }
}

impl fmt::Display for GridMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = match self.side {
            X => "X",
            O => "O",
            _ => "?",
        };
        write!(f, "{}@({}, {})", mark, self.row, self.col)
    }
}

/// Rules engine for [`GridRules`].
#[derive(Debug, Clone)]
pub struct GridEvaluator {
    rules: GridRules,
}

impl GridEvaluator {
    pub fn new(rules: GridRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &GridRules {
        &self.rules
    }
}

impl Evaluator for GridEvaluator {
    type Move = GridMove;

    fn random_move<R: Rng + ?Sized>(
        &self,
        board: &Board,
        side: Side,
        rng: &mut R,
    ) -> Option<GridMove> {
        board
            .empty_cells()
            .choose(rng)
            .map(|(row, col)| GridMove::new(row, col, side))
    }

    fn apply_move(
        &self,
        board: &mut Board,
        side: Side,
        mv: &GridMove,
    ) -> Result<GameStatus, RuleError> {
        let status = self.rules.evaluate(board, side, mv.row, mv.col)?;
        // evaluate() only reports wins for the mover; kept so a rules change
        // that can hand the win to someone else never mutates the board
        if matches!(status, GameStatus::Won(winner) if winner != side) {
            return Ok(status);
        }
        board.set(mv.row, mv.col, side);
        Ok(status)
    }

    fn next_player(&self, side: Side) -> Side {
        3 - side
    }

    fn prev_player(&self, side: Side) -> Side {
        3 - side
    }
}

/// Move generator listing every empty cell with a neutral evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridExpander;

impl Expander<GridMove> for GridExpander {
    fn expand(&self, board: &Board, side: Side) -> Vec<GridMove> {
        board
            .empty_cells()
            .map(|(row, col)| GridMove::new(row, col, side))
            .collect()
    }
}
