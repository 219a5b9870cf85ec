//! MCTS tree node representation.
//!
//! Each node owns a snapshot of the board reached by playing `mv` from the
//! parent, along with the visit statistics used for UCB1 selection.

use crate::board::{Board, Side};
use crate::evaluator::GameStatus;

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode<M> {
    /// Parent node index (NONE for root). Non-owning back reference.
    pub parent: NodeId,

    /// Children in expansion order. Empty until expanded.
    pub children: Vec<NodeId>,

    /// Side whose move produced this node. For the root this is the side
    /// preceding the one the search was asked to move for.
    pub side: Side,

    /// Move that led here from the parent (None for root)
    pub mv: Option<M>,

    /// Distance from root
    pub depth: u32,

    /// Number of statistic updates that passed through this node
    pub visits: u64,

    /// Signed score accumulator. Receives both move evaluations seeded at
    /// expansion time and +-1 rollout results, so it mixes two scales.
    pub win_score: f64,

    /// Terminal status reported by the rules engine when the node was created
    pub status: GameStatus,

    /// Whether expansion already ran on this node
    pub expanded: bool,

    /// Owned board snapshot
    pub board: Board,
}

impl<M> MctsNode<M> {
    /// Create a new root node.
    pub fn new_root(board: Board, side: Side) -> Self {
        Self {
            parent: NodeId::NONE,
            children: Vec::new(),
            side,
            mv: None,
            depth: 0,
            visits: 0,
            win_score: 0.0,
            status: GameStatus::InProgress,
            expanded: false,
            board,
        }
    }

    /// Create a new child node.
    pub fn new_child(
        parent: NodeId,
        depth: u32,
        side: Side,
        mv: M,
        board: Board,
        status: GameStatus,
    ) -> Self {
        Self {
            parent,
            children: Vec::new(),
            side,
            mv: Some(mv),
            depth,
            visits: 0,
            win_score: 0.0,
            status,
            expanded: false,
            board,
        }
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.status.is_over()
    }

    /// Check if this is a leaf node (terminal or without children).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal() || self.children.is_empty()
    }

    /// Mean score per visit. Returns 0.0 if never visited.
    #[inline]
    pub fn mean_score(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.win_score / self.visits as f64
        }
    }

    /// UCB1 score of this node as seen from a parent with `parent_visits`.
    ///
    /// `score / n + c * sqrt(ln(N) / n)`. Returns `None` for unvisited
    /// nodes, which the selector treats as absolute priority.
    #[inline]
    pub fn ucb1(&self, parent_visits: u64, exploration: f64) -> Option<f64> {
        if self.visits == 0 {
            return None;
        }
        let visits = self.visits as f64;
        let explore = ((parent_visits as f64).ln() / visits).sqrt();
        Some(self.win_score / visits + exploration * explore)
    }
}
