//! Label formats of the line-graph text format.
//!
//! A node label format decides what is written after the id in a `v` line and how a node
//! is rebuilt from it. The node and diff type are always recoverable from the packed id, so
//! every format can rebuild at least the types. A tree label format does the same for the
//! `t #` header.

use crate::annotation::{parse_directive, CppFormulaExtractor, FeatureMappingExtractor};
use crate::multiline_macro::join_continued_lines;
use crate::node::{DiffNode, NodeId};
use crate::tree::{DiffTree, DiffTreeSource};
use serde::{Deserialize, Serialize};

pub const LINE_BREAK: &str = "<br>";
pub const TREE_NAME_SEPARATOR: &str = "$$$";

pub trait NodeLabelFormat: Send + Sync {
    fn to_label(&self, tree: &DiffTree, id: NodeId) -> String;

    /// Rebuild a detached node. `None` if the id does not encode valid types.
    fn from_label_and_id(&self, label: &str, id: i32) -> Option<DiffNode> {
        DiffNode::from_id(id, vec![label.to_string()])
    }
}

/// The source lines of the node, joined by `<br>`. Formulas of conditional annotations are
/// re-extracted from their directive on import.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelOnly;

impl NodeLabelFormat for LabelOnly {
    fn to_label(&self, tree: &DiffTree, id: NodeId) -> String {
        tree.node(id).label().join(LINE_BREAK)
    }

    fn from_label_and_id(&self, label: &str, id: i32) -> Option<DiffNode> {
        let lines: Vec<String> = if label.is_empty() {
            Vec::new()
        } else {
            label.split(LINE_BREAK).map(str::to_string).collect()
        };
        let node = DiffNode::from_id(id, lines)?;
        if !node.node_type.is_conditional() || node.label().is_empty() {
            return Some(node);
        }
        let code = join_continued_lines(node.label());
        let mapping = parse_directive(&code)
            .map(|(directive, condition)| CppFormulaExtractor.extract(directive, condition));
        let mut rebuilt = DiffNode::new(
            node.diff_type,
            node.node_type,
            node.from_line(),
            node.to_line(),
            mapping,
            node.label().to_vec(),
        );
        rebuilt.set_multiline_macro(node.label().len() > 1);
        Some(rebuilt)
    }
}

/// `<DIFFTYPE>_<NODETYPE>_<label>`, for example `ADD_IF_#if A`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeDiff;

impl NodeLabelFormat for TypeDiff {
    fn to_label(&self, tree: &DiffTree, id: NodeId) -> String {
        let node = tree.node(id);
        format!(
            "{}_{}_{}",
            node.diff_type.name(),
            node.node_type.name(),
            LabelOnly.to_label(tree, id)
        )
    }

    fn from_label_and_id(&self, label: &str, id: i32) -> Option<DiffNode> {
        let node = DiffNode::from_id(id, Vec::new())?;
        let prefix = format!("{}_{}_", node.diff_type.name(), node.node_type.name());
        LabelOnly.from_label_and_id(label.strip_prefix(&prefix).unwrap_or(label), id)
    }
}

/// Only the types, for example `ADD_IF`. Used for mined patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeOnly;

impl NodeLabelFormat for TypeOnly {
    fn to_label(&self, tree: &DiffTree, id: NodeId) -> String {
        let node = tree.node(id);
        format!("{}_{}", node.diff_type.name(), node.node_type.name())
    }

    fn from_label_and_id(&self, _label: &str, id: i32) -> Option<DiffNode> {
        DiffNode::from_id(id, Vec::new())
    }
}

/// Node label formats selectable in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFormatKind {
    #[default]
    LabelOnly,
    TypeDiff,
    TypeOnly,
}

impl NodeFormatKind {
    pub fn format(self) -> Box<dyn NodeLabelFormat> {
        match self {
            NodeFormatKind::LabelOnly => Box::new(LabelOnly),
            NodeFormatKind::TypeDiff => Box::new(TypeDiff),
            NodeFormatKind::TypeOnly => Box::new(TypeOnly),
        }
    }
}

pub trait TreeLabelFormat: Send + Sync {
    fn to_label(&self, source: &DiffTreeSource) -> String;
    fn from_label(&self, label: &str) -> DiffTreeSource;
}

/// `<file>$$$<commit>` for trees of one file in one commit. Other sources are written by
/// their display form and read back as named sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitDiffTreeLabelFormat;

impl TreeLabelFormat for CommitDiffTreeLabelFormat {
    fn to_label(&self, source: &DiffTreeSource) -> String {
        match source {
            DiffTreeSource::Patch { file, commit } => {
                format!("{}{}{}", file.replace('\\', "/"), TREE_NAME_SEPARATOR, commit)
            }
            other => other.to_string(),
        }
    }

    fn from_label(&self, label: &str) -> DiffTreeSource {
        match label.split_once(TREE_NAME_SEPARATOR) {
            Some((file, commit)) => DiffTreeSource::Patch {
                file: file.to_string(),
                commit: commit.to_string(),
            },
            None => DiffTreeSource::Named(label.to_string()),
        }
    }
}
