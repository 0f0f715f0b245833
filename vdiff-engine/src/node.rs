//! Nodes of a variation diff.
//!
//! A node exists before the edit, after it, or both, and may therefore have up to two
//! parents: one in the tree before the edit and one in the tree after it. Nodes live in the
//! arena of a [`crate::tree::DiffTree`] and refer to each other by [`NodeId`]; all operations
//! that touch links between nodes are defined on the tree.

use crate::formula::Formula;
use crate::line_number::{DiffLineNumber, INVALID};
use crate::types::{DiffType, NodeType, Time, TYPE_BITS};
use std::fmt;

/// Handle of a node within the arena of one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct DiffNode {
    pub diff_type: DiffType,
    pub node_type: NodeType,
    from: DiffLineNumber,
    to: DiffLineNumber,
    feature_mapping: Option<Formula>,
    label: Vec<String>,
    is_multiline_macro: bool,

    pub(crate) before_parent: Option<NodeId>,
    pub(crate) after_parent: Option<NodeId>,
    pub(crate) before_children: Vec<NodeId>,
    pub(crate) after_children: Vec<NodeId>,
    /// Union of before and after children in insertion order.
    pub(crate) children: Vec<NodeId>,
}

impl DiffNode {
    /// Create a detached node. The feature mapping is dropped for node types that cannot
    /// carry one.
    pub fn new(
        diff_type: DiffType,
        node_type: NodeType,
        from: DiffLineNumber,
        to: DiffLineNumber,
        feature_mapping: Option<Formula>,
        label: Vec<String>,
    ) -> Self {
        let feature_mapping = if node_type.is_conditional() {
            Some(feature_mapping.unwrap_or(Formula::True))
        } else {
            None
        };
        Self {
            diff_type,
            node_type,
            from,
            to,
            feature_mapping,
            label,
            is_multiline_macro: false,
            before_parent: None,
            after_parent: None,
            before_children: Vec::new(),
            after_children: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The root node: an unchanged `#if true` that is not backed by any line.
    pub fn root() -> Self {
        Self::new(
            DiffType::Non,
            NodeType::If,
            DiffLineNumber::invalid(),
            DiffLineNumber::invalid(),
            Some(Formula::True),
            Vec::new(),
        )
    }

    pub fn artifact(
        diff_type: DiffType,
        from: DiffLineNumber,
        to: DiffLineNumber,
        label: Vec<String>,
    ) -> Self {
        Self::new(diff_type, NodeType::Artifact, from, to, None, label)
    }

    /// Reconstruct a detached node from a packed id as produced by [`DiffNode::id`].
    /// Only the diff line number survives packing; conditional annotations get the
    /// mapping `true`.
    pub fn from_id(id: i32, label: Vec<String>) -> Option<Self> {
        let mask = (1 << TYPE_BITS) - 1;
        let node_type = NodeType::from_ordinal(id & mask)?;
        let diff_type = DiffType::from_ordinal((id >> TYPE_BITS) & mask)?;
        let in_diff = (id >> (2 * TYPE_BITS)) - 1;
        let from = DiffLineNumber::new(in_diff, INVALID, INVALID);
        let mapping = node_type.is_conditional().then_some(Formula::True);
        Some(Self::new(
            diff_type,
            node_type,
            from,
            DiffLineNumber::invalid(),
            mapping,
            label,
        ))
    }

    /// Packs the diff line number, diff type and node type into an integer that is unique
    /// within one diff.
    pub fn id(&self) -> i32 {
        let mut id = 1 + self.from.in_diff;
        id = (id << TYPE_BITS) | self.diff_type.ordinal();
        id = (id << TYPE_BITS) | self.node_type.ordinal();
        id
    }

    pub fn from_line(&self) -> DiffLineNumber {
        self.from
    }

    pub fn to_line(&self) -> DiffLineNumber {
        self.to
    }

    pub fn set_from_line(&mut self, from: DiffLineNumber) {
        self.from = from;
    }

    pub fn set_to_line(&mut self, to: DiffLineNumber) {
        self.to = to;
    }

    /// The lines of source text this node stands for, without diff prefix.
    pub fn label(&self) -> &[String] {
        &self.label
    }

    pub fn label_text(&self) -> String {
        self.label.join("\n")
    }

    pub fn add_label_line(&mut self, line: impl Into<String>) {
        self.label.push(line.into());
    }

    /// The formula of an `#if` or `#elif` without any context.
    pub fn direct_feature_mapping(&self) -> Option<&Formula> {
        self.feature_mapping.as_ref()
    }

    pub fn is_multiline_macro(&self) -> bool {
        self.is_multiline_macro
    }

    pub fn set_multiline_macro(&mut self, is_multiline_macro: bool) {
        self.is_multiline_macro = is_multiline_macro;
    }

    pub fn is_if(&self) -> bool {
        self.node_type == NodeType::If
    }

    pub fn is_elif(&self) -> bool {
        self.node_type == NodeType::Elif
    }

    pub fn is_else(&self) -> bool {
        self.node_type == NodeType::Else
    }

    pub fn is_artifact(&self) -> bool {
        self.node_type == NodeType::Artifact
    }

    pub fn is_annotation(&self) -> bool {
        self.node_type.is_annotation()
    }

    pub fn before_parent(&self) -> Option<NodeId> {
        self.before_parent
    }

    pub fn after_parent(&self) -> Option<NodeId> {
        self.after_parent
    }

    pub fn parent(&self, time: Time) -> Option<NodeId> {
        match time {
            Time::Before => self.before_parent,
            Time::After => self.after_parent,
        }
    }

    pub fn children(&self, time: Time) -> &[NodeId] {
        match time {
            Time::Before => &self.before_children,
            Time::After => &self.after_children,
        }
    }

    pub fn all_children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn total_number_of_children(&self) -> usize {
        self.children.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_parents(&self) -> bool {
        self.before_parent.is_some() || self.after_parent.is_some()
    }

    pub(crate) fn parent_mut(&mut self, time: Time) -> &mut Option<NodeId> {
        match time {
            Time::Before => &mut self.before_parent,
            Time::After => &mut self.after_parent,
        }
    }

    pub(crate) fn children_mut(&mut self, time: Time) -> &mut Vec<NodeId> {
        match time {
            Time::Before => &mut self.before_children,
            Time::After => &mut self.after_children,
        }
    }
}

impl fmt::Display for DiffNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.feature_mapping {
            Some(mapping) => write!(
                f,
                "{}_{} from {} to {} with \"{}\"",
                self.diff_type, self.node_type, self.from, self.to, mapping
            ),
            None => write!(
                f,
                "{}_{} from {} to {} with \"{}\"",
                self.diff_type,
                self.node_type,
                self.from,
                self.to,
                self.label.join(" ")
            ),
        }
    }
}
