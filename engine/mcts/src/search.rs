//! MCTS search implementation.
//!
//! Each iteration runs the four classic phases:
//! 1. Selection: descend from the root along the highest UCB1 child
//! 2. Expansion: add a child per candidate move, seeding move evaluations
//! 3. Simulation: random playout from the first new child to game end
//! 4. Backpropagation: update visits and scores up to the root
//!
//! The loop runs until the time or iteration budget is spent (always at
//! least once), then the most visited root child is returned.

use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::board::{Board, Side};
use crate::config::{validate_exploration, ConfigError, SearchConfig};
use crate::evaluator::{Evaluator, Expander, Move, RuleError};
use crate::node::NodeId;
use crate::tree::{MctsTree, TreeStats};

/// Errors that can occur during MCTS search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Rules engine error: {0}")]
    Rule(#[from] RuleError),

    #[error("Root has no children at decision time (no moves were ever generated)")]
    NoChildrenAtDecision,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

/// Result of an MCTS search.
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    /// Most visited move at the root
    pub best_move: M,

    /// Total visits recorded at the root
    pub root_visits: u64,

    /// Number of iterations performed
    pub iterations: u32,

    /// Wall clock time spent searching
    pub elapsed: Duration,

    /// Shape of the final tree
    pub tree: TreeStats,
}

/// Reusable search engine bound to a rules engine and a move generator.
///
/// The engine holds no tree between calls. Each [`Mcts::search`] builds a
/// fresh tree and discards it on return, so one engine can serve any number
/// of sequential searches.
#[derive(Debug, Clone)]
pub struct Mcts<E, X> {
    evaluator: E,
    expander: X,
    exploration: f64,
    max_rollout_moves: u32,
}

impl<E, X> Mcts<E, X>
where
    E: Evaluator,
    X: Expander<E::Move>,
{
    pub fn new(evaluator: E, expander: X) -> Self {
        let defaults = SearchConfig::default();
        Self {
            evaluator,
            expander,
            exploration: defaults.exploration,
            max_rollout_moves: defaults.max_rollout_moves,
        }
    }

    /// Builder pattern: set UCB1 exploration constant. A negative or
    /// non-finite value makes every search fail with `InvalidConfig`.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: cap rollout length (0 = unlimited).
    pub fn with_max_rollout_moves(mut self, n: u32) -> Self {
        self.max_rollout_moves = n;
        self
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn expander(&self) -> &X {
        &self.expander
    }

    /// Search the best move for `side` on `board`.
    ///
    /// `max_depth` and `max_iterations` of 0 mean unlimited. At least one
    /// iteration runs even when `duration` is zero. The caller's board is
    /// only read.
    pub fn search<R: Rng + ?Sized>(
        &self,
        board: &Board,
        side: Side,
        duration: Duration,
        max_depth: u32,
        max_iterations: u32,
        rng: &mut R,
    ) -> Result<SearchResult<E::Move>, SearchError> {
        MctsSearch::new(&self.evaluator, &self.expander, board, side)
            .with_exploration(self.exploration)
            .with_max_depth(max_depth)
            .with_max_rollout_moves(self.max_rollout_moves)
            .run(duration, max_iterations, rng)
    }

    /// Search with every limit and tuning knob taken from `config`.
    pub fn search_with_config<R: Rng + ?Sized>(
        &self,
        board: &Board,
        side: Side,
        config: &SearchConfig,
        rng: &mut R,
    ) -> Result<SearchResult<E::Move>, SearchError> {
        run_mcts(&self.evaluator, &self.expander, board, side, config, rng)
    }
}

/// State of a single search call.
pub struct MctsSearch<'a, E: Evaluator, X> {
    tree: MctsTree<E::Move>,
    evaluator: &'a E,
    expander: &'a X,
    exploration: f64,
    max_depth: u32,
    max_rollout_moves: u32,
}

impl<'a, E, X> MctsSearch<'a, E, X>
where
    E: Evaluator,
    X: Expander<E::Move>,
{
    /// Create a search for `side` to move on a copy of `board`.
    ///
    /// The root is attributed to the side preceding `side`, so its children
    /// are played by `side`.
    pub fn new(evaluator: &'a E, expander: &'a X, board: &Board, side: Side) -> Self {
        let root_side = evaluator.prev_player(side);
        let defaults = SearchConfig::default();
        Self {
            tree: MctsTree::new(board.clone(), root_side),
            evaluator,
            expander,
            exploration: defaults.exploration,
            max_depth: defaults.max_depth,
            max_rollout_moves: defaults.max_rollout_moves,
        }
    }

    /// Builder pattern: set UCB1 exploration constant. Checked when the
    /// search runs.
    pub fn with_exploration(mut self, c: f64) -> Self {
        self.exploration = c;
        self
    }

    /// Builder pattern: set maximum expansion depth (0 = unlimited).
    pub fn with_max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Builder pattern: cap rollout length (0 = unlimited).
    pub fn with_max_rollout_moves(mut self, n: u32) -> Self {
        self.max_rollout_moves = n;
        self
    }

    /// Iterate until the budget is spent, then pick the most visited move.
    ///
    /// The budget is checked between iterations only. Any rules engine error
    /// aborts the search, as does an exploration constant that is negative
    /// or not finite.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        duration: Duration,
        max_iterations: u32,
        rng: &mut R,
    ) -> Result<SearchResult<E::Move>, SearchError> {
        validate_exploration(self.exploration)?;

        let start = Instant::now();
        debug!(
            side = self.evaluator.next_player(self.tree.get(self.tree.root()).side),
            duration_ms = duration.as_millis() as u64,
            max_depth = self.max_depth,
            max_iterations,
            "MCTS search started"
        );

        let mut iterations = 0u32;
        while iterations == 0 || start.elapsed() < duration {
            if max_iterations > 0 && iterations >= max_iterations {
                break;
            }
            self.iterate(rng)?;
            iterations += 1;
        }

        let (best_move, root_visits) = self.best_move()?;
        let elapsed = start.elapsed();
        let tree = self.tree.stats();

        debug!(
            iterations,
            root_visits,
            nodes = tree.total_nodes,
            max_depth = tree.max_depth,
            elapsed_ms = elapsed.as_millis() as u64,
            "MCTS search complete"
        );

        Ok(SearchResult {
            best_move,
            root_visits,
            iterations,
            elapsed,
            tree,
        })
    }

    /// Run a single iteration (select -> expand -> simulate -> backpropagate).
    pub fn iterate<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), SearchError> {
        let leaf_id = self.tree.select_leaf(self.tree.root(), self.exploration);
        self.expand_node(leaf_id)?;

        let playout_id = self.tree.first_child_or_self(leaf_id);
        let winner = self.random_playout(playout_id, rng)?;
        self.tree.backpropagate(playout_id, winner);

        trace!(
            leaf = leaf_id.0,
            playout = playout_id.0,
            winner = winner.unwrap_or(0),
            "MCTS iteration complete"
        );

        Ok(())
    }

    /// Expand a node by adding one child per candidate move.
    ///
    /// No-op for terminal nodes, nodes that were already expanded and nodes
    /// at the depth limit. Every move is applied before any child is
    /// attached, so a rules error leaves the tree untouched.
    fn expand_node(&mut self, node_id: NodeId) -> Result<(), SearchError> {
        let node = self.tree.get(node_id);
        if node.expanded || node.is_terminal() {
            return Ok(());
        }
        if self.max_depth > 0 && node.depth >= self.max_depth {
            return Ok(());
        }

        let side = self.evaluator.next_player(node.side);
        let moves = self.expander.expand(&node.board, side);

        let mut pending = Vec::with_capacity(moves.len());
        for mv in moves {
            let mut board = node.board.clone();
            let status = self.evaluator.apply_move(&mut board, side, &mv)?;
            pending.push((mv, board, status));
        }

        trace!(node = node_id.0, side, children = pending.len(), "Expanding node");

        self.tree.get_mut(node_id).expanded = true;
        for (mv, board, status) in pending {
            let eval = mv.eval();
            let child_id = self.tree.add_child(node_id, mv, side, board, status);
            self.tree.seed_evaluation(child_id, eval);
        }

        Ok(())
    }

    /// Play uniformly random moves on a scratch board until the game ends.
    ///
    /// Returns the winner, or `None` for a draw. Running out of moves or
    /// hitting the rollout cap counts as a draw.
    fn random_playout<R: Rng + ?Sized>(
        &self,
        node_id: NodeId,
        rng: &mut R,
    ) -> Result<Option<Side>, SearchError> {
        let node = self.tree.get(node_id);
        if node.is_terminal() {
            return Ok(node.status.winner());
        }

        let mut board = node.board.clone();
        let mut side = self.evaluator.next_player(node.side);
        let mut played = 0u32;

        loop {
            if self.max_rollout_moves > 0 && played >= self.max_rollout_moves {
                return Ok(None);
            }
            let mv = match self.evaluator.random_move(&board, side, rng) {
                Some(mv) => mv,
                None => return Ok(None),
            };
            let status = self.evaluator.apply_move(&mut board, side, &mv)?;
            if status.is_over() {
                return Ok(status.winner());
            }
            side = self.evaluator.next_player(side);
            played += 1;
        }
    }

    /// Most visited root move together with the root's visit count.
    pub fn best_move(&self) -> Result<(E::Move, u64), SearchError> {
        let root_id = self.tree.root();
        let root = self.tree.get(root_id);

        let best_move = self
            .tree
            .best_child(root_id)
            .and_then(|id| self.tree.get(id).mv.clone());

        match best_move {
            Some(mv) => Ok((mv, root.visits)),
            None => {
                warn!(
                    root_visits = root.visits,
                    "No root children at decision time"
                );
                Err(SearchError::NoChildrenAtDecision)
            }
        }
    }

    /// Get the search tree (for inspection/debugging).
    pub fn tree(&self) -> &MctsTree<E::Move> {
        &self.tree
    }
}

/// Convenience function to run a single search configured by `config`.
pub fn run_mcts<E, X, R>(
    evaluator: &E,
    expander: &X,
    board: &Board,
    side: Side,
    config: &SearchConfig,
    rng: &mut R,
) -> Result<SearchResult<E::Move>, SearchError>
where
    E: Evaluator,
    X: Expander<E::Move>,
    R: Rng + ?Sized,
{
    config.validate()?;
    MctsSearch::new(evaluator, expander, board, side)
        .with_exploration(config.exploration)
        .with_max_depth(config.max_depth)
        .with_max_rollout_moves(config.max_rollout_moves)
        .run(config.duration(), config.max_iterations, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::GameStatus;
    use crate::test_util::{CellMove, EmptyCells, FailingRules, RowGame};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    const LONG: Duration = Duration::from_secs(600);

    fn board(rows: Vec<Vec<i32>>) -> Board {
        Board::from_rows(rows).unwrap()
    }

    #[test]
    fn test_root_side_precedes_requested_side() {
        let (rules, expander) = (RowGame, EmptyCells::default());
        let search = MctsSearch::new(&rules, &expander, &Board::new(3, 3), 1);

        let root = search.tree().get(search.tree().root());
        assert_eq!(root.side, 2);
        assert_eq!(root.depth, 0);
        assert!(root.mv.is_none());
    }

    #[test]
    fn test_zero_duration_runs_one_iteration() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let mut rng = ChaCha20Rng::seed_from_u64(1);

        let result = engine
            .search(&Board::new(3, 3), 1, Duration::ZERO, 0, 0, &mut rng)
            .unwrap();

        assert_eq!(result.iterations, 1);
        // Nine seeded children plus one rollout
        assert_eq!(result.root_visits, 10);
        assert_eq!(result.tree.total_nodes, 10);
        // The first child got the only rollout, so it has the most visits
        assert_eq!(result.best_move, CellMove::new(0, 0));
    }

    #[test]
    fn test_iteration_budget() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let mut rng = ChaCha20Rng::seed_from_u64(2);

        let result = engine
            .search(&Board::new(3, 3), 1, LONG, 0, 50, &mut rng)
            .unwrap();

        assert_eq!(result.iterations, 50);
        assert!(result.root_visits >= 50);
    }

    #[test]
    fn test_same_seed_same_result() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let start = board(vec![vec![1, 0, 0], vec![0, 2, 0], vec![0, 0, 0]]);

        let run = |seed| {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            engine.search(&start, 1, LONG, 0, 300, &mut rng).unwrap()
        };
        let (a, b) = (run(9), run(9));

        assert_eq!(a.best_move, b.best_move);
        assert_eq!(a.root_visits, b.root_visits);
        assert_eq!(a.tree, b.tree);
    }

    #[test]
    fn test_finds_immediate_win() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let start = board(vec![vec![1, 1, 0], vec![2, 2, 0], vec![0, 0, 0]]);
        let mut rng = ChaCha20Rng::seed_from_u64(3);

        let result = engine.search(&start, 1, LONG, 0, 2_000, &mut rng).unwrap();
        assert_eq!(result.best_move, CellMove::new(0, 2));
    }

    #[test]
    fn test_blocks_opponent_win() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        // Side 2 owns two cells of the middle row; side 1 has no immediate win
        let start = board(vec![vec![1, 0, 0], vec![2, 2, 0], vec![1, 0, 0]]);
        let mut rng = ChaCha20Rng::seed_from_u64(4);

        let result = engine.search(&start, 1, LONG, 0, 3_000, &mut rng).unwrap();
        assert_eq!(result.best_move, CellMove::new(1, 2));
    }

    #[test]
    fn test_caller_board_untouched() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let start = board(vec![vec![1, 0], vec![0, 2]]);
        let snapshot = start.clone();
        let mut rng = ChaCha20Rng::seed_from_u64(5);

        engine.search(&start, 1, LONG, 0, 100, &mut rng).unwrap();
        assert_eq!(start, snapshot);
    }

    #[test]
    fn test_expansion_seeds_move_evaluations() {
        let (rules, expander) = (RowGame, EmptyCells::with_eval(0.5));
        let mut search = MctsSearch::new(&rules, &expander, &Board::new(2, 2), 1);
        let root_id = search.tree().root();

        search.expand_node(root_id).unwrap();

        let tree = search.tree();
        let root = tree.get(root_id);
        assert_eq!(root.children.len(), 4);
        assert_eq!(root.visits, 4);
        // Root belongs to side 2, every child to side 1
        assert!((root.win_score + 2.0).abs() < 1e-12);
        for &child_id in &root.children {
            let child = tree.get(child_id);
            assert_eq!(child.side, 1);
            assert_eq!(child.depth, 1);
            assert_eq!(child.visits, 1);
            assert!((child.win_score - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_expansion_copies_boards() {
        let (rules, expander) = (RowGame, EmptyCells::default());
        let mut search = MctsSearch::new(&rules, &expander, &Board::new(1, 3), 1);
        let root_id = search.tree().root();
        search.expand_node(root_id).unwrap();

        let children = search.tree().children(root_id).to_vec();
        assert_eq!(search.tree().get(children[0]).board.to_rows(), vec![vec![1, 0, 0]]);
        assert_eq!(search.tree().get(children[1]).board.to_rows(), vec![vec![0, 1, 0]]);

        search.tree.get_mut(children[0]).board.set(0, 2, 2);

        assert_eq!(search.tree().get(root_id).board, Board::new(1, 3));
        assert_eq!(search.tree().get(children[1]).board.to_rows(), vec![vec![0, 1, 0]]);
        assert_eq!(search.tree().get(children[2]).board.to_rows(), vec![vec![0, 0, 1]]);
    }

    #[test]
    fn test_expand_is_idempotent() {
        let (rules, expander) = (RowGame, EmptyCells::with_eval(1.0));
        let mut search = MctsSearch::new(&rules, &expander, &Board::new(2, 2), 1);
        let root_id = search.tree().root();

        search.expand_node(root_id).unwrap();
        let children = search.tree().children(root_id).to_vec();
        let stats = search.tree().stats();

        search.expand_node(root_id).unwrap();

        assert_eq!(search.tree().children(root_id), children.as_slice());
        assert_eq!(search.tree().stats(), stats);
        assert_eq!(expander.calls.get(), 1);
    }

    #[test]
    fn test_terminal_node_is_not_expanded() {
        let (rules, expander) = (RowGame, EmptyCells::default());
        let start = board(vec![vec![1, 0], vec![0, 0]]);
        let mut search = MctsSearch::new(&rules, &expander, &start, 1);
        let root_id = search.tree().root();
        search.expand_node(root_id).unwrap();

        let winning = search
            .tree()
            .children(root_id)
            .iter()
            .copied()
            .find(|&id| search.tree().get(id).status == GameStatus::Won(1))
            .unwrap();
        let calls = expander.calls.get();

        search.expand_node(winning).unwrap();

        assert!(search.tree().children(winning).is_empty());
        assert_eq!(expander.calls.get(), calls);
    }

    #[test]
    fn test_empty_expansion_is_expanded_once() {
        let (rules, expander) = (RowGame, EmptyCells::default());
        let full = board(vec![vec![1, 2], vec![2, 1]]);
        let mut search = MctsSearch::new(&rules, &expander, &full, 1);
        let root_id = search.tree().root();

        search.expand_node(root_id).unwrap();
        search.expand_node(root_id).unwrap();

        assert!(search.tree().get(root_id).expanded);
        assert_eq!(expander.calls.get(), 1);
    }

    #[test]
    fn test_max_depth_limits_expansion() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let mut rng = ChaCha20Rng::seed_from_u64(6);

        let result = engine
            .search(&Board::new(3, 3), 1, LONG, 1, 200, &mut rng)
            .unwrap();

        assert_eq!(result.tree.max_depth, 1);
        assert_eq!(result.tree.total_nodes, 10);
        assert_eq!(result.iterations, 200);
    }

    #[test]
    fn test_no_moves_is_fatal() {
        let engine = Mcts::new(RowGame, EmptyCells::default());
        let full = board(vec![vec![1, 2], vec![2, 1]]);
        let mut rng = ChaCha20Rng::seed_from_u64(7);

        let err = engine
            .search(&full, 1, Duration::ZERO, 0, 5, &mut rng)
            .unwrap_err();
        assert!(matches!(err, SearchError::NoChildrenAtDecision));
    }

    #[test]
    fn test_rule_error_during_expansion_aborts() {
        let (rules, expander) = (FailingRules::after(3), EmptyCells::default());
        let mut search = MctsSearch::new(&rules, &expander, &Board::new(3, 3), 1);
        let mut rng = ChaCha20Rng::seed_from_u64(8);

        let err = search.iterate(&mut rng).unwrap_err();
        assert!(matches!(err, SearchError::Rule(RuleError::IllegalMove(_))));

        // Nothing was attached or seeded
        let root = search.tree().get(search.tree().root());
        assert!(!root.expanded);
        assert!(root.children.is_empty());
        assert_eq!(root.visits, 0);
        assert_eq!(search.tree().len(), 1);
    }

    #[test]
    fn test_rule_error_during_rollout_skips_backpropagation() {
        // Expansion of the empty 3x3 root applies exactly nine moves
        let (rules, expander) = (FailingRules::after(9), EmptyCells::default());
        let mut search = MctsSearch::new(&rules, &expander, &Board::new(3, 3), 1);
        let mut rng = ChaCha20Rng::seed_from_u64(9);

        let err = search.iterate(&mut rng).unwrap_err();
        assert!(matches!(err, SearchError::Rule(_)));

        let tree = search.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.visits, 9);
        assert_eq!(tree.get(root.children[0]).visits, 1);
    }

    #[test]
    fn test_rule_error_fails_search() {
        let engine = Mcts::new(FailingRules::after(20), EmptyCells::default());
        let mut rng = ChaCha20Rng::seed_from_u64(10);

        let result = engine.search(&Board::new(3, 3), 1, LONG, 0, 100, &mut rng);
        assert!(matches!(result, Err(SearchError::Rule(_))));
    }

    #[test]
    fn test_rollout_cap_scores_draw() {
        let (rules, expander) = (RowGame, EmptyCells::default());
        let mut search =
            MctsSearch::new(&rules, &expander, &Board::new(3, 3), 1).with_max_rollout_moves(1);
        let mut rng = ChaCha20Rng::seed_from_u64(11);

        // One random move can never finish a row on an almost empty board
        for _ in 0..20 {
            search.iterate(&mut rng).unwrap();
        }
        let root = search.tree().get(search.tree().root());
        assert!(root.win_score.abs() < 1e-12);
    }

    #[test]
    fn test_run_mcts_with_config() {
        let (rules, expander) = (RowGame, EmptyCells::default());
        let config = SearchConfig::for_testing().with_max_iterations(25);
        let mut rng = ChaCha20Rng::seed_from_u64(12);

        let result = run_mcts(&rules, &expander, &Board::new(2, 3), 2, &config, &mut rng).unwrap();
        assert_eq!(result.iterations, 25);

        let bad = SearchConfig::for_testing().with_exploration(f64::INFINITY);
        let err = run_mcts(&rules, &expander, &Board::new(2, 3), 2, &bad, &mut rng).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_exploration_rejected_before_searching() {
        let mut rng = ChaCha20Rng::seed_from_u64(13);

        for c in [f64::NAN, -0.5, f64::INFINITY] {
            let engine = Mcts::new(RowGame, EmptyCells::default()).with_exploration(c);
            let err = engine
                .search(&Board::new(3, 3), 1, LONG, 0, 10, &mut rng)
                .unwrap_err();
            assert!(matches!(err, SearchError::InvalidConfig(ConfigError::Invalid(_))));
            assert_eq!(engine.expander().calls.get(), 0);
        }
    }
}
