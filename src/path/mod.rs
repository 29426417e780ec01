//! Paths: planning, resolution to 3-D waypoints, and per-tick following

mod follow;
mod ladder;
mod planner;
mod resolve;

pub use follow::FollowResult;
pub use ladder::{DismountDir, LadderMotion, LadderState};
pub use planner::{PathCost, PlanError, RouteKind, search};
pub use resolve::{ResolveError, resolve_positions};

use glam::Vec3;

use crate::nav::{CellId, Dir, LadderId};

/// How a node is entered from its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum How {
    /// Walk along the floor in this direction
    Walk(Dir),
    /// Climb a ladder up
    LadderUp,
    /// Climb a ladder down
    LadderDown,
    /// No traversal: the path start or the concrete terminal point
    None,
}

/// One waypoint of a path
#[derive(Debug, Clone, Copy)]
pub struct PathNode {
    /// Cell this node lies in
    pub cell: CellId,
    /// Resolved world position
    pub pos: Vec3,
    /// Ladder to traverse to reach this node, if any
    pub ladder: Option<LadderId>,
    /// Traversal kind from the previous node
    pub how: How,
}

/// An ordered waypoint sequence with a cursor.
///
/// Owned exclusively by one agent. Invariants: adjacent nodes' cells are
/// graph-adjacent or ladder-linked, the cursor stays within bounds, and
/// the last node is a concrete goal position rather than a cell center.
#[derive(Debug, Default)]
pub struct Path {
    nodes: Vec<PathNode>,
    cursor: usize,
}

impl Path {
    /// True if the path holds at least two nodes
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.nodes.len() >= 2
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at the given index
    #[must_use]
    pub fn node(&self, index: usize) -> &PathNode {
        &self.nodes[index]
    }

    /// All nodes in order
    #[must_use]
    pub fn nodes(&self) -> &[PathNode] {
        &self.nodes
    }

    /// Index of the node currently steered toward
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The terminal goal position
    #[must_use]
    pub fn end_pos(&self) -> Vec3 {
        self.nodes.last().map_or(Vec3::ZERO, |n| n.pos)
    }

    /// Drop all nodes and reset the cursor
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.cursor = 0;
    }

    /// Move the cursor, clamped to the last node
    pub fn set_cursor(&mut self, index: usize) {
        self.cursor = index.min(self.nodes.len().saturating_sub(1));
    }

    pub(crate) fn push(&mut self, node: PathNode) {
        self.nodes.push(node);
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut Vec<PathNode> {
        &mut self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(cell: u32) -> PathNode {
        PathNode {
            cell: CellId(cell),
            pos: Vec3::ZERO,
            ladder: None,
            how: How::None,
        }
    }

    #[test]
    fn test_cursor_is_clamped() {
        let mut path = Path::default();
        path.push(node(0));
        path.push(node(1));
        path.push(node(2));
        path.set_cursor(100);
        assert_eq!(path.cursor(), 2);
        path.set_cursor(1);
        assert_eq!(path.cursor(), 1);
    }

    #[test]
    fn test_single_node_is_not_valid() {
        let mut path = Path::default();
        assert!(!path.is_valid());
        path.push(node(0));
        assert!(!path.is_valid());
        path.push(node(1));
        assert!(path.is_valid());
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut path = Path::default();
        path.push(node(0));
        path.push(node(1));
        path.set_cursor(1);
        path.clear();
        assert_eq!(path.cursor(), 0);
        assert!(path.is_empty());
    }
}
