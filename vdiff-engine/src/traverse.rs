//! Traversal with caller-controlled descent.
//!
//! The visitor is called once per node. It decides itself whether and when to descend by
//! calling [`Traversal::visit_children_of`]: calling it first gives a post-order traversal,
//! calling it last a pre-order one. Each node is visited at most once, even though nodes
//! with two different parents are reachable twice.
//!
//! The tree is handed to the visitor mutably, so visitors may restructure the part of the
//! tree they have already processed.

use crate::node::NodeId;
use crate::tree::DiffTree;
use std::collections::HashSet;

pub type Visitor<'v, S> = dyn Fn(&mut Traversal<'v, S>, &mut DiffTree, NodeId) + 'v;

pub struct Traversal<'v, S> {
    visitor: &'v Visitor<'v, S>,
    visited: HashSet<NodeId>,
    /// State threaded through all visitor calls.
    pub state: S,
}

impl<'v, S> Traversal<'v, S> {
    /// Visit `node` unless it was visited already.
    pub fn visit(&mut self, tree: &mut DiffTree, node: NodeId) {
        if self.visited.insert(node) {
            let visitor = self.visitor;
            visitor(self, tree, node);
        }
    }

    /// Visit all children of `node` at either time, in insertion order.
    pub fn visit_children_of(&mut self, tree: &mut DiffTree, node: NodeId) {
        let children = tree.node(node).all_children().to_vec();
        for child in children {
            self.visit(tree, child);
        }
    }

    pub fn is_visited(&self, node: NodeId) -> bool {
        self.visited.contains(&node)
    }
}

/// Traverse the tree starting at its root and return the final state.
pub fn traverse<S, F>(tree: &mut DiffTree, state: S, visitor: F) -> S
where
    F: Fn(&mut Traversal<'_, S>, &mut DiffTree, NodeId),
{
    let root = tree.root();
    traverse_from(tree, root, state, visitor)
}

/// Traverse the subtree below `start`.
pub fn traverse_from<S, F>(tree: &mut DiffTree, start: NodeId, state: S, visitor: F) -> S
where
    F: Fn(&mut Traversal<'_, S>, &mut DiffTree, NodeId),
{
    let mut traversal = Traversal {
        visitor: &visitor,
        visited: HashSet::new(),
        state,
    };
    traversal.visit(tree, start);
    traversal.state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_number::DiffLineNumber;
    use crate::node::DiffNode;
    use crate::types::DiffType;

    fn sample() -> (DiffTree, Vec<NodeId>) {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let mut ids = vec![root];
        for i in 1..=3 {
            let line = DiffLineNumber::new(i, i, i);
            let id = tree.insert(DiffNode::artifact(DiffType::Non, line, line, vec![format!("l{}", i)]));
            tree.add_below(id, Some(root), Some(root)).unwrap();
            ids.push(id);
        }
        (tree, ids)
    }

    #[test]
    fn test_pre_and_post_order() {
        let (mut tree, ids) = sample();
        let pre = traverse(&mut tree, Vec::new(), |t, tree, node| {
            t.state.push(node);
            t.visit_children_of(tree, node);
        });
        assert_eq!(pre, ids);

        let post = traverse(&mut tree, Vec::new(), |t, tree, node| {
            t.visit_children_of(tree, node);
            t.state.push(node);
        });
        assert_eq!(post, vec![ids[1], ids[2], ids[3], ids[0]]);
    }

    #[test]
    fn test_descent_is_optional() {
        let (mut tree, ids) = sample();
        let visited = traverse(&mut tree, 0usize, |t, _, _| t.state += 1);
        assert_eq!(visited, 1);
        assert_eq!(traverse_from(&mut tree, ids[2], 0usize, |t, _, _| t.state += 1), 1);
    }

    #[test]
    fn test_nodes_with_two_parents_are_visited_once() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let line = DiffLineNumber::new(1, 1, 1);
        let a = tree.insert(DiffNode::artifact(DiffType::Non, line, line, vec!["a".into()]));
        let b = tree.insert(DiffNode::artifact(DiffType::Non, line, line, vec!["b".into()]));
        tree.add_below(a, Some(root), Some(root)).unwrap();
        tree.add_below(b, Some(root), Some(a)).unwrap();
        let count = traverse(&mut tree, 0usize, |t, tree, node| {
            t.state += 1;
            t.visit_children_of(tree, node);
        });
        assert_eq!(count, 3);
    }
}
