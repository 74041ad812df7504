// Binary decision tree recorded by the branch-and-bound search.
//
// Nodes live in an arena and refer to each other by id. Node 0 is the root
// relaxation; the left child of a node tightens the branching variable's
// upper bound (`x ≤ ⌊v⌋`), the right child its lower bound (`x ≥ ⌈v⌉`).

use std::fmt;

pub const ROOT_ID: usize = 0;

/// Bound tightening that separates a child problem from its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchCut {
    pub id: usize,
    pub column: usize,
    pub upper: bool,
    pub bound: f64,
}

impl fmt::Display for BranchCut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = if self.upper { "<=" } else { ">=" };
        write!(f, "cut {}: x{} {} {}", self.id, self.column, relation, self.bound)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// What the search concluded at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Not solved yet (or never reached because the search stopped).
    Pending,
    /// Fractional relaxation, split into two children.
    Branched,
    /// Integral relaxation that became the new incumbent.
    Incumbent,
    /// Integral relaxation no better than the incumbent.
    Integral,
    /// Relaxation bound cannot beat the incumbent.
    Pruned,
    Infeasible,
    Unbounded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: usize,
    pub parent: Option<usize>,
    pub left: Option<usize>,
    pub right: Option<usize>,
    pub depth: usize,
    /// Cuts accumulated from the root down to this node.
    pub cuts: Vec<BranchCut>,
    pub relaxation_value: Option<f64>,
    pub values: Vec<f64>,
    pub outcome: NodeOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode {
                id: ROOT_ID,
                parent: None,
                left: None,
                right: None,
                depth: 0,
                cuts: Vec::new(),
                relaxation_value: None,
                values: Vec::new(),
                outcome: NodeOutcome::Pending,
            }],
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT_ID]
    }

    /// Append a child below `parent`; `None` if the parent is unknown or the
    /// slot is already taken.
    pub fn add_child(&mut self, parent: usize, direction: Direction, cut: BranchCut) -> Option<usize> {
        let (depth, mut cuts) = {
            let p = self.nodes.get(parent)?;
            let taken = match direction {
                Direction::Left => p.left.is_some(),
                Direction::Right => p.right.is_some(),
            };
            if taken {
                return None;
            }
            (p.depth + 1, p.cuts.clone())
        };
        cuts.push(cut);

        let id = self.nodes.len();
        self.nodes.push(TreeNode {
            id,
            parent: Some(parent),
            left: None,
            right: None,
            depth,
            cuts,
            relaxation_value: None,
            values: Vec::new(),
            outcome: NodeOutcome::Pending,
        });
        let p = &mut self.nodes[parent];
        match direction {
            Direction::Left => p.left = Some(id),
            Direction::Right => p.right = Some(id),
        }
        Some(id)
    }

    pub fn get(&self, id: usize) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn parent(&self, id: usize) -> Option<&TreeNode> {
        self.get(id)?.parent.and_then(|p| self.get(p))
    }

    /// Child of `id` with the given id, if it is a direct child.
    pub fn child(&self, id: usize, child: usize) -> Option<&TreeNode> {
        let node = self.get(id)?;
        if node.left == Some(child) || node.right == Some(child) {
            self.get(child)
        } else {
            None
        }
    }

    /// Walks from `id` up to the root, `id` first.
    pub fn ancestors(&self, id: usize) -> impl Iterator<Item = &TreeNode> + '_ {
        std::iter::successors(self.get(id), move |node| node.parent.and_then(|p| self.get(p)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// The node whose relaxation produced the final incumbent, if any.
    pub fn incumbent(&self) -> Option<&TreeNode> {
        self.nodes
            .iter()
            .rev()
            .find(|n| n.outcome == NodeOutcome::Incumbent)
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            let indent = "  ".repeat(node.depth);
            write!(f, "{}node {} [{:?}]", indent, node.id, node.outcome)?;
            if let Some(value) = node.relaxation_value {
                write!(f, " z = {}", value)?;
            }
            if let Some(cut) = node.cuts.last() {
                write!(f, " ({})", cut)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(id: usize, upper: bool, bound: f64) -> BranchCut {
        BranchCut {
            id,
            column: 0,
            upper,
            bound,
        }
    }

    #[test]
    fn children_inherit_cuts_and_depth() {
        let mut tree = DecisionTree::new();
        let left = tree.add_child(ROOT_ID, Direction::Left, cut(1, true, 2.0)).unwrap();
        let right = tree.add_child(ROOT_ID, Direction::Right, cut(2, false, 3.0)).unwrap();
        let grandchild = tree.add_child(left, Direction::Right, cut(3, false, 1.0)).unwrap();

        assert_eq!(tree.len(), 4);
        assert_eq!(tree.get(grandchild).unwrap().depth, 2);
        assert_eq!(tree.get(grandchild).unwrap().cuts.len(), 2);
        assert_eq!(tree.parent(right).unwrap().id, ROOT_ID);
        assert_eq!(tree.child(ROOT_ID, left).unwrap().id, left);
        assert!(tree.child(ROOT_ID, grandchild).is_none());

        let path: Vec<usize> = tree.ancestors(grandchild).map(|n| n.id).collect();
        assert_eq!(path, vec![grandchild, left, ROOT_ID]);
    }

    #[test]
    fn occupied_slots_are_refused() {
        let mut tree = DecisionTree::new();
        assert!(tree.add_child(ROOT_ID, Direction::Left, cut(1, true, 0.0)).is_some());
        assert!(tree.add_child(ROOT_ID, Direction::Left, cut(2, true, 0.0)).is_none());
        assert!(tree.add_child(42, Direction::Right, cut(3, false, 1.0)).is_none());
    }

    #[test]
    fn display_lists_every_node() {
        let mut tree = DecisionTree::new();
        tree.add_child(ROOT_ID, Direction::Left, cut(1, true, 2.0));
        let rendered = tree.to_string();
        assert_eq!(rendered.lines().count(), 2);
        assert!(rendered.contains("cut 1: x0 <= 2"));
    }
}
