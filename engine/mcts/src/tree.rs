//! MCTS tree structure with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by NodeId indices.
//! Children are owned through the parent's `children` list, parents are
//! reached through a non-owning `parent` index, so upward traversal during
//! backpropagation is O(1) per step and no reference cycles exist.

use crate::board::{Board, Side};
use crate::evaluator::GameStatus;
use crate::node::{MctsNode, NodeId};

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<M> {
    /// Arena storing all nodes
    nodes: Vec<MctsNode<M>>,

    /// Root node index (always 0 after initialization)
    root: NodeId,
}

impl<M> MctsTree<M> {
    /// Create a new tree whose root holds `board` and was produced by `side`.
    pub fn new(board: Board, side: Side) -> Self {
        Self {
            nodes: vec![MctsNode::new_root(board, side)],
            root: NodeId(0),
        }
    }

    /// Get the root node ID.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Get a reference to a node by ID.
    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<M> {
        &self.nodes[id.index()]
    }

    /// Get a mutable reference to a node by ID.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<M> {
        &mut self.nodes[id.index()]
    }

    /// Get the total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (should never be true after construction).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Children of a node in expansion order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.get(id).children
    }

    /// Attach a new child under `parent_id` and return its NodeId.
    ///
    /// The child takes ownership of `board`, so callers hand over a fresh
    /// copy and no two nodes ever share a grid.
    pub fn add_child(
        &mut self,
        parent_id: NodeId,
        mv: M,
        side: Side,
        board: Board,
        status: GameStatus,
    ) -> NodeId {
        let depth = self.get(parent_id).depth + 1;
        let child = MctsNode::new_child(parent_id, depth, side, mv, board, status);

        let child_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(child);
        self.get_mut(parent_id).children.push(child_id);

        child_id
    }

    /// Select the child of `node_id` with the highest UCB1 score.
    ///
    /// An unvisited child is returned immediately, earliest first, without
    /// evaluating the formula. Among visited children ties go to the one
    /// created first.
    pub fn select_child(&self, node_id: NodeId, exploration: f64) -> Option<NodeId> {
        let node = self.get(node_id);
        let parent_visits = node.visits;

        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in &node.children {
            let score = match self.get(child_id).ucb1(parent_visits, exploration) {
                Some(score) => score,
                None => return Some(child_id),
            };
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child_id, score)),
            }
        }

        best.map(|(id, _)| id)
    }

    /// Descend from `from` along the highest UCB1 child until reaching a
    /// terminal node or a node without children.
    pub fn select_leaf(&self, from: NodeId, exploration: f64) -> NodeId {
        let mut current = from;
        loop {
            if self.get(current).is_leaf() {
                return current;
            }
            match self.select_child(current, exploration) {
                Some(child_id) => current = child_id,
                None => return current,
            }
        }
    }

    /// First child of a node, or the node itself when it is terminal or has
    /// no children.
    pub fn first_child_or_self(&self, node_id: NodeId) -> NodeId {
        let node = self.get(node_id);
        if node.is_terminal() {
            return node_id;
        }
        node.children.first().copied().unwrap_or(node_id)
    }

    /// Seed a freshly created child's move evaluation into every node from
    /// the child up to the root.
    ///
    /// Each node gains one visit. Nodes played by the same side as the child
    /// add `eval`, the others subtract it.
    pub fn seed_evaluation(&mut self, child_id: NodeId, eval: f64) {
        let side = self.get(child_id).side;
        let mut current_id = child_id;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.visits += 1;
            if node.side == side {
                node.win_score += eval;
            } else {
                node.win_score -= eval;
            }
            current_id = node.parent;
        }
    }

    /// Backpropagate a rollout outcome from `leaf_id` up to the root.
    ///
    /// Every node gains one visit. With a winner, nodes played by the winner
    /// gain 1.0 and all others lose 1.0. Draws (`None`) only count the visit.
    pub fn backpropagate(&mut self, leaf_id: NodeId, winner: Option<Side>) {
        let mut current_id = leaf_id;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.visits += 1;
            if let Some(winner) = winner {
                if node.side == winner {
                    node.win_score += 1.0;
                } else {
                    node.win_score -= 1.0;
                }
            }
            current_id = node.parent;
        }
    }

    /// Most visited child of `node_id`, first created on ties.
    /// Returns None if the node has no children.
    pub fn best_child(&self, node_id: NodeId) -> Option<NodeId> {
        let mut best: Option<(NodeId, u64)> = None;
        for &child_id in self.children(node_id) {
            let visits = self.get(child_id).visits;
            match best {
                Some((_, best_visits)) if visits <= best_visits => {}
                _ => best = Some((child_id, visits)),
            }
        }
        best.map(|(id, _)| id)
    }

    /// Per-child statistics of a node in expansion order.
    pub fn child_stats(&self, node_id: NodeId) -> Vec<ChildStats> {
        self.children(node_id)
            .iter()
            .map(|&id| {
                let child = self.get(id);
                ChildStats {
                    id,
                    visits: child.visits,
                    win_score: child.win_score,
                    terminal: child.is_terminal(),
                }
            })
            .collect()
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visits,
            root_win_score: root.win_score,
            max_depth: self.nodes.iter().map(|n| n.depth).max().unwrap_or(0),
        }
    }
}

/// Statistics for one child, as reported by [`MctsTree::child_stats`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChildStats {
    pub id: NodeId,
    pub visits: u64,
    pub win_score: f64,
    pub terminal: bool,
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u64,
    pub root_win_score: f64,
    pub max_depth: u32,
}
