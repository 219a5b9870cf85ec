//! Game-agnostic Monte Carlo Tree Search with UCB1 selection and random
//! rollouts.
//!
//! The engine never looks at board semantics. It works with any game that
//! supplies an [`Evaluator`] (rules engine) and an [`Expander`] (move
//! generator) over a rectangular integer [`Board`].
//!
//! # Overview
//!
//! Each iteration consists of four phases:
//!
//! 1. **Selection**: descend from the root along the child with the highest
//!    UCB1 score (`score / n + c * sqrt(ln N / n)`); unvisited children are
//!    always tried first
//! 2. **Expansion**: add one child per candidate move, seeding each move's
//!    self-reported evaluation into every ancestor
//! 3. **Simulation**: play uniformly random moves from the first new child
//!    until the game ends
//! 4. **Backpropagation**: add a visit to every node up to the root and +-1
//!    for the nodes of the winning and losing sides
//!
//! When the time or iteration budget is spent (at least one iteration always
//! runs) the most visited root child is recommended, earliest child first
//! on ties.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mcts::{Board, Mcts};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//! use std::time::Duration;
//!
//! let engine = Mcts::new(my_rules, my_move_generator);
//! let mut rng = ChaCha20Rng::seed_from_u64(42);
//!
//! let result = engine.search(
//!     &Board::new(3, 3),
//!     1,                           // side to move
//!     Duration::from_millis(80),   // time budget
//!     0,                           // max depth (0 = unlimited)
//!     0,                           // max iterations (0 = time only)
//!     &mut rng,
//! )?;
//!
//! println!("Best move: {:?} after {} visits", result.best_move, result.root_visits);
//! ```
//!
//! # Configuration
//!
//! [`SearchConfig`] bundles the limits and tuning knobs and can be loaded
//! from a `config.toml` `[mcts]` table with `MCTS_*` environment overrides.
//!
//! # Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                     Mcts / MctsSearch                       |
//! +-------------------------------------------------------------+
//! |  +-------------+  +-------------+  +---------------------+  |
//! |  |  MctsTree   |  |  Evaluator  |  |      Expander       |  |
//! |  |  (arena)    |  |  (rules)    |  |  (move generator)   |  |
//! |  +------+------+  +------+------+  +----------+----------+  |
//! |         |                |                    |             |
//! |         v                v                    v             |
//! |  +------------------------------------------------------+   |
//! |  |      select -> expand -> simulate -> backpropagate   |   |
//! |  +------------------------------------------------------+   |
//! +-------------------------------------------------------------+
//! ```

pub mod board;
pub mod config;
pub mod evaluator;
pub mod node;
pub mod search;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_util;

// Re-export main types
pub use board::{Board, BoardError, Side};
pub use config::{
    apply_env_overrides, load_config, load_from_path, ConfigError, SearchConfig,
    CONFIG_SEARCH_PATHS,
};
pub use evaluator::{Evaluator, Expander, GameStatus, Move, RuleError};
pub use node::{MctsNode, NodeId};
pub use search::{run_mcts, Mcts, MctsSearch, SearchError, SearchResult};
pub use tree::{ChildStats, MctsTree, TreeStats};
