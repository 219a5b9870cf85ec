//! Rectangular integer grid shared between the engine and its collaborators.
//!
//! Cells hold `0` when empty and a positive player id otherwise. The engine
//! never interprets cell values; it only clones boards so that every tree
//! node owns an independent snapshot.

use std::fmt;

use thiserror::Error;

/// Player identifier. `0` is reserved for "empty cell" and "draw".
pub type Side = i32;

/// Errors raised when building a board from raw rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board must have at least one row and one column")]
    Empty,

    #[error("Row {row} has {found} columns, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
}

/// Owned `rows x cols` grid stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<i32>,
}

impl Board {
    /// Create an empty board.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    /// Build a board from nested rows, rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, BoardError> {
        let expected = rows.first().map(Vec::len).unwrap_or(0);
        if expected == 0 {
            return Err(BoardError::Empty);
        }

        let num_rows = rows.len();
        let mut cells = Vec::with_capacity(num_rows * expected);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != expected {
                return Err(BoardError::Ragged {
                    row,
                    expected,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }

        Ok(Self {
            rows: num_rows,
            cols: expected,
            cells,
        })
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn in_bounds(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols
    }

    /// Cell value, or `None` when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<i32> {
        if self.in_bounds(row, col) {
            Some(self.cells[row * self.cols + col])
        } else {
            None
        }
    }

    /// Overwrite a cell. Returns false (and leaves the board untouched) when
    /// the coordinates are out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: i32) -> bool {
        if !self.in_bounds(row, col) {
            return false;
        }
        self.cells[row * self.cols + col] = value;
        true
    }

    /// Coordinates of every empty cell in row-major order.
    pub fn empty_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 0)
            .map(move |(idx, _)| (idx / cols, idx % cols))
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|v| *v != 0)
    }

    /// Rows as nested vectors (the inverse of [`Board::from_rows`]).
    ///
    /// A board with zero rows or columns has no cells and yields no rows.
    pub fn to_rows(&self) -> Vec<Vec<i32>> {
        self.row_slices().map(<[i32]>::to_vec).collect()
    }

    fn row_slices(&self) -> std::slice::Chunks<'_, i32> {
        // Zero-width boards have an empty cell vec, so any chunk size works
        self.cells.chunks(self.cols.max(1))
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.row_slices() {
            let line: Vec<String> = row
                .iter()
                .map(|v| match v {
                    0 => ".".to_string(),
                    v => v.to_string(),
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
