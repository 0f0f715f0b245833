//! The variation diff tree.
//!
//! A [`DiffTree`] owns an arena of [`DiffNode`]s and the handle of its root. All edges are
//! stored twice: as the parent handle of the child (per [`Time`]) and in the parent's child
//! list for that time. Every mutation below keeps both directions in sync.
//!
//! Dropped nodes stay in the arena but are no longer reachable from the root; queries only
//! ever look at reachable nodes.

use crate::error::GraphError;
use crate::formula::Formula;
use crate::node::{DiffNode, NodeId};
use crate::types::{DiffType, NodeType, Time};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Where a tree came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiffTreeSource {
    #[default]
    Unknown,
    /// The patch of one file in one commit.
    Patch { file: String, commit: String },
    /// A patch or source file on disk.
    File(PathBuf),
    /// A tree read back from a line graph whose header did not name a patch.
    Named(String),
}

impl fmt::Display for DiffTreeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffTreeSource::Unknown => write!(f, "unknown"),
            DiffTreeSource::Patch { file, commit } => write!(f, "{}@{}", file, commit),
            DiffTreeSource::File(path) => write!(f, "{}", path.display()),
            DiffTreeSource::Named(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiffTree {
    nodes: Vec<DiffNode>,
    root: NodeId,
    source: DiffTreeSource,
}

impl Default for DiffTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffTree {
    /// A tree consisting of nothing but the root.
    pub fn new() -> Self {
        Self {
            nodes: vec![DiffNode::root()],
            root: NodeId(0),
            source: DiffTreeSource::Unknown,
        }
    }

    /// An arena without nodes. The root must be set before the tree is used.
    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
            source: DiffTreeSource::Unknown,
        }
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        self.root == id
    }

    pub fn source(&self) -> &DiffTreeSource {
        &self.source
    }

    pub fn set_source(&mut self, source: DiffTreeSource) {
        self.source = source;
    }

    /// Move a detached node into the arena.
    pub fn insert(&mut self, node: DiffNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&DiffNode> {
        self.nodes.get(id.0)
    }

    /// Panics if `id` was not handed out by this tree.
    pub fn node(&self, id: NodeId) -> &DiffNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut DiffNode {
        &mut self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId, time: Time) -> Option<NodeId> {
        self.node(id).parent(time)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Make `child` a child of `parent` at `time`. Both must exist at `time` and `child`
    /// must not have a parent at `time` yet.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId, time: Time) -> Result<(), GraphError> {
        for id in [parent, child] {
            let node = self.node(id);
            if !node.diff_type.exists_at(time) {
                return Err(GraphError::WrongTime {
                    node: node.id(),
                    diff_type: node.diff_type,
                    time,
                });
            }
        }
        match self.node(child).parent(time) {
            Some(existing) if existing == parent => {
                return Err(GraphError::AlreadyChild {
                    parent: self.node(parent).id(),
                    child: self.node(child).id(),
                    time,
                });
            }
            Some(_) => {
                return Err(GraphError::HasParent {
                    child: self.node(child).id(),
                    time,
                });
            }
            None => {}
        }

        self.link(parent, child, time);
        Ok(())
    }

    fn link(&mut self, parent: NodeId, child: NodeId, time: Time) {
        *self.nodes[child.0].parent_mut(time) = Some(parent);
        let p = &mut self.nodes[parent.0];
        p.children_mut(time).push(child);
        if !p.children.contains(&child) {
            p.children.push(child);
        }
    }

    /// Like [`DiffTree::add_below`] but without validation, for the parser whose stacks
    /// only ever hold parents that exist at the respective time.
    pub(crate) fn link_below(
        &mut self,
        child: NodeId,
        before_parent: Option<NodeId>,
        after_parent: Option<NodeId>,
    ) {
        let diff_type = self.node(child).diff_type;
        for (time, parent) in [(Time::Before, before_parent), (Time::After, after_parent)] {
            if let Some(parent) = parent {
                if diff_type.exists_at(time) {
                    self.link(parent, child, time);
                }
            }
        }
    }

    /// Attach `child` below the given parents. A parent is only used for the times at which
    /// `child` exists, so an added node is never linked to `before_parent`.
    pub fn add_below(
        &mut self,
        child: NodeId,
        before_parent: Option<NodeId>,
        after_parent: Option<NodeId>,
    ) -> Result<(), GraphError> {
        let diff_type = self.node(child).diff_type;
        if let Some(parent) = before_parent {
            if diff_type.exists_before() {
                self.add_child(parent, child, Time::Before)?;
            }
        }
        if let Some(parent) = after_parent {
            if diff_type.exists_after() {
                self.add_child(parent, child, Time::After)?;
            }
        }
        Ok(())
    }

    /// Unlink `child` from `parent` at `time`. Returns false if it was not a child there.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId, time: Time) -> bool {
        let p = &mut self.nodes[parent.0];
        let list = p.children_mut(time);
        let Some(pos) = list.iter().position(|c| *c == child) else {
            return false;
        };
        list.remove(pos);
        if !p.children(time.other()).contains(&child) {
            p.children.retain(|c| *c != child);
        }
        *self.nodes[child.0].parent_mut(time) = None;
        true
    }

    /// Unlink `child` from `parent` at every time.
    pub fn remove_child_everywhere(&mut self, parent: NodeId, child: NodeId) -> bool {
        let before = self.remove_child(parent, child, Time::Before);
        let after = self.remove_child(parent, child, Time::After);
        before || after
    }

    pub fn remove_children(&mut self, parent: NodeId, children: &[NodeId]) {
        for child in children {
            self.remove_child_everywhere(parent, *child);
        }
    }

    /// Unlink all children of `parent` at `time` and return them.
    pub fn remove_children_at(&mut self, parent: NodeId, time: Time) -> Vec<NodeId> {
        let orphans = self.node(parent).children(time).to_vec();
        for child in &orphans {
            self.remove_child(parent, *child, time);
        }
        orphans
    }

    pub fn remove_before_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        self.remove_children_at(parent, Time::Before)
    }

    pub fn remove_after_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        self.remove_children_at(parent, Time::After)
    }

    /// Detach `id` from both of its parents. Its own subtree stays attached to it.
    pub fn drop_node(&mut self, id: NodeId) {
        for time in Time::ALL {
            if let Some(parent) = self.parent(id, time) {
                self.remove_child(parent, id, time);
            }
        }
    }

    /// Move all children of `other`, at both times, below `id`.
    pub fn steal_children_of(&mut self, id: NodeId, other: NodeId) -> Result<(), GraphError> {
        for time in Time::ALL {
            for child in self.remove_children_at(other, time) {
                self.add_child(id, child, time)?;
            }
        }
        Ok(())
    }

    /// Remove `id` from the tree, handing its children to its parents.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        for time in Time::ALL {
            if let Some(parent) = self.parent(id, time) {
                self.remove_child(parent, id, time);
                for child in self.remove_children_at(id, time) {
                    self.add_child(parent, child, time)?;
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All nodes reachable from the root, in pre-order, each node exactly once.
    pub fn compute_all_nodes(&self) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.node(id).all_children().iter().rev());
        }
        order
    }

    pub fn for_all(&self, mut f: impl FnMut(NodeId, &DiffNode)) {
        for id in self.compute_all_nodes() {
            f(id, self.node(id));
        }
    }

    pub fn compute_all_nodes_that(&self, predicate: impl Fn(&DiffNode) -> bool) -> Vec<NodeId> {
        self.compute_all_nodes()
            .into_iter()
            .filter(|id| predicate(self.node(*id)))
            .collect()
    }

    pub fn compute_artifact_nodes(&self) -> Vec<NodeId> {
        self.compute_all_nodes_that(|n| n.is_artifact())
    }

    /// All annotations except the root.
    pub fn compute_annotation_nodes(&self) -> Vec<NodeId> {
        let root = self.root;
        self.compute_all_nodes()
            .into_iter()
            .filter(|id| *id != root && self.node(*id).is_annotation())
            .collect()
    }

    pub fn all_match(&self, predicate: impl Fn(&DiffNode) -> bool) -> bool {
        self.compute_all_nodes().into_iter().all(|id| predicate(self.node(id)))
    }

    pub fn any_match(&self, predicate: impl Fn(&DiffNode) -> bool) -> bool {
        self.compute_all_nodes().into_iter().any(|id| predicate(self.node(id)))
    }

    pub fn count(&self, predicate: impl Fn(&DiffNode) -> bool) -> usize {
        self.compute_all_nodes_that(predicate).len()
    }

    /// Number of reachable nodes, root included.
    pub fn size(&self) -> usize {
        self.compute_all_nodes().len()
    }

    /// A tree is empty if its root has no children.
    pub fn is_empty(&self) -> bool {
        self.node(self.root).is_leaf()
    }

    /// The reachable node with the given packed id.
    pub fn node_by_id(&self, packed_id: i32) -> Option<NodeId> {
        self.compute_all_nodes()
            .into_iter()
            .find(|id| self.node(*id).id() == packed_id)
    }

    /// True if the node has the same ancestors before and after the edit.
    pub fn before_path_equals_after_path(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let node = self.node(current);
            match (node.before_parent(), node.after_parent()) {
                (None, None) => return true,
                (Some(b), Some(a)) if a == b => current = b,
                _ => return false,
            }
        }
    }

    /// Number of annotation ancestors at `time`.
    pub fn depth(&self, id: NodeId, time: Time) -> Option<usize> {
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.parent(current, time) {
            depth += 1;
            current = parent;
            if depth > self.nodes.len() {
                return None;
            }
        }
        (current == self.root).then_some(depth)
    }

    // ------------------------------------------------------------------
    // Formulas
    // ------------------------------------------------------------------

    /// The formula the node adds on its own at `time`. `None` if the node does not exist at
    /// `time` or is not properly nested.
    pub fn feature_mapping(&self, id: NodeId, time: Time) -> Option<Formula> {
        self.feature_mapping_clauses(id, time).map(Formula::and)
    }

    /// The conjunction of the feature mappings of all ancestors at `time`.
    pub fn presence_condition(&self, id: NodeId, time: Time) -> Option<Formula> {
        self.presence_condition_clauses(id, time).map(Formula::and)
    }

    fn direct_mapping(&self, id: NodeId) -> Formula {
        self.node(id)
            .direct_feature_mapping()
            .cloned()
            .unwrap_or(Formula::True)
    }

    fn feature_mapping_clauses(&self, id: NodeId, time: Time) -> Option<Vec<Formula>> {
        let node = self.node(id);
        if !node.diff_type.exists_at(time) {
            return None;
        }
        match node.node_type {
            NodeType::If => Some(vec![self.direct_mapping(id)]),
            NodeType::Elif | NodeType::Else => {
                let mut clauses = Vec::new();
                if node.is_elif() {
                    clauses.push(self.direct_mapping(id));
                }
                let mut ancestor = node.parent(time)?;
                loop {
                    let a = self.node(ancestor);
                    clauses.push(self.direct_mapping(ancestor).negate());
                    match a.node_type {
                        NodeType::If => break,
                        NodeType::Elif => ancestor = a.parent(time)?,
                        _ => return None,
                    }
                }
                Some(clauses)
            }
            NodeType::Artifact => self.feature_mapping_clauses(node.parent(time)?, time),
        }
    }

    fn presence_condition_clauses(&self, id: NodeId, time: Time) -> Option<Vec<Formula>> {
        let node = self.node(id);
        if !node.diff_type.exists_at(time) {
            return None;
        }
        if id == self.root {
            return Some(vec![Formula::True]);
        }
        match node.node_type {
            NodeType::If => {
                let mut clauses = self.presence_condition_clauses(node.parent(time)?, time)?;
                clauses.push(self.direct_mapping(id));
                Some(clauses)
            }
            NodeType::Elif | NodeType::Else => {
                let mut clauses = self.feature_mapping_clauses(id, time)?;
                let mut chain_head = node.parent(time)?;
                while !self.node(chain_head).is_if() {
                    chain_head = self.parent(chain_head, time)?;
                }
                let outer = self.parent(chain_head, time)?;
                clauses.extend(self.presence_condition_clauses(outer, time)?);
                Some(clauses)
            }
            NodeType::Artifact => self.presence_condition_clauses(node.parent(time)?, time),
        }
    }

    // ------------------------------------------------------------------
    // Consistency
    // ------------------------------------------------------------------

    /// Check the structural invariants of every reachable node.
    pub fn assert_consistency(&self) -> Result<(), GraphError> {
        let all = self.compute_all_nodes();
        for &id in &all {
            self.assert_node_consistency(id)?;
        }
        Ok(())
    }

    pub fn is_consistent(&self) -> bool {
        self.assert_consistency().is_ok()
    }

    fn assert_node_consistency(&self, id: NodeId) -> Result<(), GraphError> {
        let node = self.node(id);
        let inconsistent = |reason: String| GraphError::Inconsistent {
            node: node.id(),
            reason,
        };

        if id == self.root {
            if node.has_parents() {
                return Err(inconsistent("root has a parent".into()));
            }
            if node.is_if() && node.direct_feature_mapping() != Some(&Formula::True) {
                return Err(inconsistent("root mapping is not true".into()));
            }
        } else {
            let expected = (node.diff_type.exists_before(), node.diff_type.exists_after());
            let actual = (node.before_parent().is_some(), node.after_parent().is_some());
            if expected != actual {
                return Err(inconsistent(format!(
                    "{} node has parents (before: {}, after: {})",
                    node.diff_type, actual.0, actual.1
                )));
            }
        }

        for time in Time::ALL {
            if let Some(parent) = node.parent(time) {
                let p = self.node(parent);
                if p.children(time).iter().filter(|c| **c == id).count() != 1 {
                    return Err(inconsistent(format!(
                        "not listed exactly once as {} child of its parent",
                        time
                    )));
                }
                if (node.is_else() || node.is_elif()) && !(p.is_if() || p.is_elif()) {
                    return Err(inconsistent(format!(
                        "{} below {} at time {}",
                        node.node_type, p.node_type, time
                    )));
                }
                if self.depth(id, time).is_none() {
                    return Err(inconsistent(format!("{} path does not end at the root", time)));
                }
            }
            for &child in node.children(time) {
                if self.node(child).parent(time) != Some(id) {
                    return Err(inconsistent(format!(
                        "{} child {} does not point back",
                        time,
                        self.node(child).id()
                    )));
                }
            }
        }

        let union_ok = node.all_children().iter().all(|c| {
            node.children(Time::Before).contains(c) || node.children(Time::After).contains(c)
        }) && Time::ALL
            .iter()
            .all(|t| node.children(*t).iter().all(|c| node.all_children().contains(c)));
        if !union_ok {
            return Err(inconsistent("child lists out of sync".into()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Unparsing
    // ------------------------------------------------------------------

    /// Print the tree as a full unified diff. Every `#if` chain is closed by one `#endif`
    /// carrying the diff type of its `#if`.
    pub fn to_text_diff(&self) -> String {
        let mut out = String::new();
        self.write_text_diff(self.root, &mut HashSet::new(), &mut out);
        out
    }

    fn write_text_diff(&self, id: NodeId, visited: &mut HashSet<NodeId>, out: &mut String) {
        if !visited.insert(id) {
            return;
        }
        let node = self.node(id);
        let symbol = node.diff_type.symbol();
        let is_root = id == self.root;
        if !is_root {
            for line in node.label() {
                out.push_str(symbol);
                out.push_str(line);
                out.push('\n');
            }
        }
        for &child in node.all_children() {
            self.write_text_diff(child, visited, out);
        }
        if !is_root && node.is_if() {
            out.push_str(symbol);
            out.push_str("#endif\n");
        }
    }

    /// Number of nodes of each diff type, root included.
    pub fn count_by_diff_type(&self) -> HashMap<DiffType, usize> {
        let mut counts = HashMap::new();
        self.for_all(|_, n| *counts.entry(n.diff_type).or_insert(0) += 1);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_number::DiffLineNumber;

    fn line(i: i32) -> DiffLineNumber {
        DiffLineNumber::new(i, i, i)
    }

    fn annotation(tree: &mut DiffTree, diff_type: DiffType, node_type: NodeType, at: i32, f: Option<Formula>) -> NodeId {
        let node = DiffNode::new(
            diff_type,
            node_type,
            line(at).restricted_to(diff_type),
            line(at + 1).restricted_to(diff_type),
            f,
            vec![format!("#{}", node_type.name().to_lowercase())],
        );
        tree.insert(node)
    }

    fn artifact(tree: &mut DiffTree, diff_type: DiffType, at: i32, text: &str) -> NodeId {
        tree.insert(DiffNode::artifact(
            diff_type,
            line(at).restricted_to(diff_type),
            line(at + 1).restricted_to(diff_type),
            vec![text.into()],
        ))
    }

    #[test]
    fn test_add_below_respects_diff_type() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let a = artifact(&mut tree, DiffType::Add, 1, "int x;");
        tree.add_below(a, Some(root), Some(root)).unwrap();
        assert_eq!(tree.parent(a, Time::Before), None);
        assert_eq!(tree.parent(a, Time::After), Some(root));
        assert_eq!(tree.node(root).children(Time::Before), &[] as &[NodeId]);
        assert_eq!(tree.node(root).all_children(), &[a]);
        tree.assert_consistency().unwrap();
    }

    #[test]
    fn test_add_child_twice_fails() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let a = artifact(&mut tree, DiffType::Non, 1, "int x;");
        tree.add_child(root, a, Time::Before).unwrap();
        assert!(matches!(
            tree.add_child(root, a, Time::Before),
            Err(GraphError::AlreadyChild { .. })
        ));
        let r = artifact(&mut tree, DiffType::Rem, 2, "int y;");
        assert!(matches!(
            tree.add_child(root, r, Time::After),
            Err(GraphError::WrongTime { .. })
        ));
    }

    #[test]
    fn test_drop_and_steal() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let if_a = annotation(&mut tree, DiffType::Non, NodeType::If, 1, Some(Formula::var("A")));
        let x = artifact(&mut tree, DiffType::Add, 2, "x");
        let y = artifact(&mut tree, DiffType::Rem, 3, "y");
        tree.add_below(if_a, Some(root), Some(root)).unwrap();
        tree.add_below(x, Some(if_a), Some(if_a)).unwrap();
        tree.add_below(y, Some(if_a), Some(if_a)).unwrap();

        let merged = annotation(&mut tree, DiffType::Non, NodeType::If, 1, Some(Formula::var("B")));
        tree.drop_node(if_a);
        assert!(tree.is_empty());
        tree.steal_children_of(merged, if_a).unwrap();
        tree.add_below(merged, Some(root), Some(root)).unwrap();

        assert!(tree.node(if_a).is_leaf());
        assert_eq!(tree.node(merged).all_children(), &[y, x]);
        assert_eq!(tree.parent(x, Time::After), Some(merged));
        assert_eq!(tree.parent(y, Time::Before), Some(merged));
        tree.assert_consistency().unwrap();
        assert_eq!(tree.size(), 4);
    }

    #[test]
    fn test_remove_node_keeps_children() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let if_a = annotation(&mut tree, DiffType::Non, NodeType::If, 1, Some(Formula::var("A")));
        let x = artifact(&mut tree, DiffType::Non, 2, "x");
        tree.add_below(if_a, Some(root), Some(root)).unwrap();
        tree.add_below(x, Some(if_a), Some(if_a)).unwrap();
        tree.remove_node(if_a).unwrap();
        assert_eq!(tree.node(root).all_children(), &[x]);
        assert!(tree.before_path_equals_after_path(x));
        tree.assert_consistency().unwrap();
    }

    #[test]
    fn test_presence_conditions_of_chain() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let if_a = annotation(&mut tree, DiffType::Non, NodeType::If, 1, Some(Formula::var("A")));
        let elif_b = annotation(&mut tree, DiffType::Non, NodeType::Elif, 3, Some(Formula::var("B")));
        let else_ = annotation(&mut tree, DiffType::Non, NodeType::Else, 5, None);
        let x = artifact(&mut tree, DiffType::Non, 6, "x");
        tree.add_below(if_a, Some(root), Some(root)).unwrap();
        tree.add_below(elif_b, Some(if_a), Some(if_a)).unwrap();
        tree.add_below(else_, Some(elif_b), Some(elif_b)).unwrap();
        tree.add_below(x, Some(else_), Some(else_)).unwrap();
        tree.assert_consistency().unwrap();

        let a = Formula::var("A");
        let b = Formula::var("B");
        assert_eq!(tree.presence_condition(root, Time::After), Some(Formula::True));
        assert_eq!(tree.presence_condition(if_a, Time::After), Some(a.clone()));

        let pc_elif = tree.presence_condition(elif_b, Time::Before).unwrap();
        assert!(pc_elif.is_equivalent_to(&Formula::and([a.clone().negate(), b.clone()])));

        let pc_else = tree.presence_condition(else_, Time::After).unwrap();
        let expected = Formula::and([a.negate(), b.negate()]);
        assert!(pc_else.is_equivalent_to(&expected));
        assert_eq!(tree.presence_condition(x, Time::After), Some(pc_else.clone()));
        assert!(tree.feature_mapping(x, Time::Before).unwrap().is_equivalent_to(&expected));
    }

    #[test]
    fn test_presence_condition_at_wrong_time() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let x = artifact(&mut tree, DiffType::Add, 1, "x");
        tree.add_below(x, Some(root), Some(root)).unwrap();
        assert_eq!(tree.presence_condition(x, Time::Before), None);
        assert_eq!(tree.presence_condition(x, Time::After), Some(Formula::True));
    }

    #[test]
    fn test_inconsistency_is_detected() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let x = artifact(&mut tree, DiffType::Non, 1, "x");
        tree.add_child(root, x, Time::Before).unwrap();
        assert!(!tree.is_consistent());
        tree.add_child(root, x, Time::After).unwrap();
        assert!(tree.is_consistent());

        let e = annotation(&mut tree, DiffType::Non, NodeType::Else, 2, None);
        tree.add_below(e, Some(x), Some(x)).unwrap();
        assert!(!tree.is_consistent());
        tree.drop_node(e);
        tree.add_below(e, Some(root), Some(root)).unwrap();
        assert!(tree.is_consistent());
    }

    #[test]
    fn test_to_text_diff() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let if_a = annotation(&mut tree, DiffType::Add, NodeType::If, 1, Some(Formula::var("A")));
        let x = artifact(&mut tree, DiffType::Non, 2, "int x;");
        tree.add_below(if_a, Some(root), Some(root)).unwrap();
        tree.add_below(x, Some(root), Some(if_a)).unwrap();
        assert_eq!(tree.to_text_diff(), "+#if\n int x;\n+#endif\n");
    }

    #[test]
    fn test_node_by_id() {
        let mut tree = DiffTree::new();
        let root = tree.root();
        let x = artifact(&mut tree, DiffType::Add, 2, "int x;");
        let y = artifact(&mut tree, DiffType::Add, 3, "int y;");
        tree.add_below(x, Some(root), Some(root)).unwrap();

        assert_eq!(tree.node_by_id(tree.node(root).id()), Some(root));
        assert_eq!(tree.node_by_id(tree.node(x).id()), Some(x));
        // detached nodes are not reachable
        assert_eq!(tree.node_by_id(tree.node(y).id()), None);
    }
}
