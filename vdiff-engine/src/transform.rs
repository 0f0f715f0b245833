//! In-place transformations of variation diffs.
//!
//! Every transformer is total: it never fails on a consistent tree. Some transformers only
//! make sense on trees already simplified by others, which they state via
//! [`DiffTreeTransformer::dependencies`]. [`apply_all`] checks the order of a pipeline before
//! touching any tree.
//!
//! Built-in transformers:
//! 1. **cut-non-edited-subtrees**: removes unchanged leaves that sit below the same parent
//!    before and after the edit, bottom-up, so that only edited parts and their context remain.
//! 2. **collapse-nested-non-edited-annotations**: merges corridors of unchanged annotations,
//!    each with a single child, into one annotation with the conjunction of their formulas.
//! 3. **naive-moved-code-detection**: pairs removed and added artifacts with the same text and
//!    turns each pair into one unchanged artifact.

use crate::error::{GraphError, TransformError};
use crate::formula::Formula;
use crate::line_number::DiffLineNumber;
use crate::node::{DiffNode, NodeId};
use crate::traverse::traverse;
use crate::tree::DiffTree;
use crate::types::{DiffType, NodeType, Time};

/// A named in-place transformation of a tree.
pub trait DiffTreeTransformer: Send + Sync {
    /// Name used in pipelines and configuration files.
    fn name(&self) -> &'static str;

    /// Names of transformers that must have run earlier in the same pipeline.
    fn dependencies(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn transform(&self, tree: &mut DiffTree) -> Result<(), TransformError>;
}

/// Names of all built-in transformers, in an order that satisfies their dependencies.
pub const TRANSFORMER_NAMES: [&str; 3] = [
    CutNonEditedSubtrees::NAME,
    CollapseNestedNonEditedAnnotations::NAME,
    NaiveMovedCodeDetection::NAME,
];

/// Look up a built-in transformer.
pub fn transformer_by_name(name: &str) -> Result<Box<dyn DiffTreeTransformer>, TransformError> {
    match name {
        CutNonEditedSubtrees::NAME => Ok(Box::new(CutNonEditedSubtrees)),
        CollapseNestedNonEditedAnnotations::NAME => Ok(Box::new(CollapseNestedNonEditedAnnotations)),
        NaiveMovedCodeDetection::NAME => Ok(Box::new(NaiveMovedCodeDetection)),
        other => Err(TransformError::UnknownTransformer(other.to_string())),
    }
}

/// Build a pipeline from transformer names and validate its order.
pub fn pipeline_from_names<S: AsRef<str>>(
    names: &[S],
) -> Result<Vec<Box<dyn DiffTreeTransformer>>, TransformError> {
    let pipeline = names
        .iter()
        .map(|name| transformer_by_name(name.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    check_dependencies(&pipeline)?;
    Ok(pipeline)
}

/// Every dependency of a transformer must appear earlier in the pipeline.
pub fn check_dependencies(pipeline: &[Box<dyn DiffTreeTransformer>]) -> Result<(), TransformError> {
    for (i, transformer) in pipeline.iter().enumerate() {
        for dependency in transformer.dependencies() {
            if !pipeline[..i].iter().any(|t| t.name() == dependency) {
                return Err(TransformError::DependencyNotMet {
                    transformer: transformer.name().to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Apply a pipeline to a tree, checking dependencies first.
pub fn apply_all(
    pipeline: &[Box<dyn DiffTreeTransformer>],
    tree: &mut DiffTree,
) -> Result<(), TransformError> {
    check_dependencies(pipeline)?;
    for transformer in pipeline {
        transformer.transform(tree)?;
        tracing::debug!(transformer = transformer.name(), nodes = tree.size(), "Applied transformer");
    }
    Ok(())
}

// ──────────────────────────────────────────────────────────────
// Cut non-edited subtrees
// ──────────────────────────────────────────────────────────────

/// Removes unchanged leaves whose parent is the same before and after the edit. Runs
/// bottom-up, so whole unchanged subtrees disappear.
pub struct CutNonEditedSubtrees;

impl CutNonEditedSubtrees {
    pub const NAME: &'static str = "cut-non-edited-subtrees";
}

impl DiffTreeTransformer for CutNonEditedSubtrees {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn transform(&self, tree: &mut DiffTree) -> Result<(), TransformError> {
        traverse(tree, (), |t, tree, node| {
            let children = tree.node(node).all_children().to_vec();
            let mut removable = Vec::new();
            for child in children {
                t.visit(tree, child);
                let c = tree.node(child);
                if c.is_leaf() && c.before_parent() == Some(node) && c.after_parent() == Some(node) {
                    removable.push(child);
                }
            }
            if !removable.is_empty() {
                tree.remove_children(node, &removable);
            }
        });
        Ok(())
    }
}

// ──────────────────────────────────────────────────────────────
// Collapse nested non-edited annotations
// ──────────────────────────────────────────────────────────────

/// Merges chains of unchanged annotations into a single `#if`.
///
/// A chain starts at an `#if` head and runs through annotations that are the only child of
/// their predecessor and have the same parent before and after the edit. It ends at a node
/// whose children are edited or that has more than one child. A node with `#else` or `#elif`
/// children never ends a chain, as those branches would then negate the merged formula.
/// Chains without an end are left alone.
pub struct CollapseNestedNonEditedAnnotations;

impl CollapseNestedNonEditedAnnotations {
    pub const NAME: &'static str = "collapse-nested-non-edited-annotations";
    pub const LABEL: &'static str = "$Collapsed Nested Annotations$";
}

impl DiffTreeTransformer for CollapseNestedNonEditedAnnotations {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![CutNonEditedSubtrees::NAME]
    }

    fn transform(&self, tree: &mut DiffTree) -> Result<(), TransformError> {
        // mappings are read before any chain is collapsed
        let chains = find_chains(tree)
            .into_iter()
            .map(|chain| Chain::resolve(tree, chain))
            .collect::<Result<Vec<_>, _>>()?;
        for chain in chains {
            collapse_chain(tree, chain)?;
        }
        Ok(())
    }
}

struct Chain {
    head: NodeId,
    end: NodeId,
    mapping: Formula,
}

impl Chain {
    fn resolve(tree: &DiffTree, mut nodes: Vec<NodeId>) -> Result<Self, GraphError> {
        let (Some(&head), Some(&end)) = (nodes.first(), nodes.last()) else {
            return Err(GraphError::Inconsistent {
                node: tree.node(tree.root()).id(),
                reason: "empty annotation chain".to_string(),
            });
        };

        let mut mappings = Vec::with_capacity(nodes.len());
        while let Some(popped) = nodes.pop() {
            let node = tree.node(popped);
            if node.is_artifact() {
                return Err(inconsistent(node, "artifact within annotation chain"));
            }
            let mapping = tree
                .feature_mapping(popped, Time::After)
                .ok_or_else(|| inconsistent(node, "annotation in chain has no feature mapping"))?;
            mappings.push(mapping);
            if !node.is_if() {
                // the mapping of an else or elif already accounts for its whole chain
                while let Some(previous) = nodes.pop() {
                    if tree.node(previous).is_if() {
                        break;
                    }
                }
            }
        }

        Ok(Chain {
            head,
            end,
            mapping: Formula::and(mappings),
        })
    }
}

fn in_chain_tail(tree: &DiffTree, id: NodeId) -> bool {
    let node = tree.node(id);
    match (node.before_parent(), node.after_parent()) {
        (Some(b), Some(a)) if a == b => tree.node(b).total_number_of_children() == 1,
        _ => false,
    }
}

fn has_branch_child(tree: &DiffTree, id: NodeId) -> bool {
    tree.node(id)
        .all_children()
        .iter()
        .any(|c| matches!(tree.node(*c).node_type, NodeType::Else | NodeType::Elif))
}

fn is_chain_end(tree: &DiffTree, id: NodeId) -> bool {
    let node = tree.node(id);
    in_chain_tail(tree, id)
        && !has_branch_child(tree, id)
        && (node.total_number_of_children() != 1
            || node
                .all_children()
                .iter()
                .any(|c| tree.node(*c).diff_type != DiffType::Non))
}

fn is_chain_head(tree: &DiffTree, id: NodeId) -> bool {
    let parent_is_root = tree.node(id).before_parent() == Some(tree.root());
    tree.node(id).is_if() && (!in_chain_tail(tree, id) || parent_is_root) && !is_chain_end(tree, id)
}

fn find_chains(tree: &DiffTree) -> Vec<Vec<NodeId>> {
    let mut candidates: Vec<Vec<NodeId>> = Vec::new();
    let mut chains = Vec::new();

    for id in tree.compute_all_nodes() {
        let node = tree.node(id);
        if tree.is_root(id) || node.diff_type != DiffType::Non || !node.is_annotation() {
            continue;
        }
        if is_chain_head(tree, id) {
            candidates.push(vec![id]);
        } else if in_chain_tail(tree, id) {
            let parent = node.before_parent();
            let Some(pos) = candidates.iter().position(|c| c.last().copied() == parent) else {
                continue;
            };
            candidates[pos].push(id);
            if is_chain_end(tree, id) {
                chains.push(candidates.remove(pos));
            }
        }
    }
    chains
}

fn collapse_chain(tree: &mut DiffTree, chain: Chain) -> Result<(), TransformError> {
    let h = tree.node(chain.head);
    let before_parent = h.before_parent();
    let after_parent = h.after_parent();
    let merged = DiffNode::new(
        DiffType::Non,
        NodeType::If,
        h.from_line(),
        h.to_line(),
        Some(chain.mapping),
        vec![CollapseNestedNonEditedAnnotations::LABEL.to_string()],
    );
    let merged = tree.insert(merged);

    tree.drop_node(chain.head);
    tree.steal_children_of(merged, chain.end)?;
    tree.add_below(merged, before_parent, after_parent)?;
    Ok(())
}

fn inconsistent(node: &DiffNode, reason: &str) -> GraphError {
    GraphError::Inconsistent {
        node: node.id(),
        reason: reason.to_string(),
    }
}

// ──────────────────────────────────────────────────────────────
// Naive moved code detection
// ──────────────────────────────────────────────────────────────

/// Turns a removed and an added artifact with the same trimmed text into one unchanged
/// artifact. Candidates are matched last first, each against the first remaining artifact
/// of the inverse diff type.
pub struct NaiveMovedCodeDetection;

impl NaiveMovedCodeDetection {
    pub const NAME: &'static str = "naive-moved-code-detection";
}

impl DiffTreeTransformer for NaiveMovedCodeDetection {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn transform(&self, tree: &mut DiffTree) -> Result<(), TransformError> {
        for (a, b) in find_code_twins(tree) {
            let (added, removed) = if tree.node(a).diff_type == DiffType::Add {
                (a, b)
            } else {
                (b, a)
            };
            let after_parent = tree.parent(added, Time::After);
            let before_parent = tree.parent(removed, Time::Before);
            let merged = merge_twins(tree.node(added), tree.node(removed));
            let merged = tree.insert(merged);

            tree.drop_node(added);
            tree.drop_node(removed);
            tree.steal_children_of(merged, added)?;
            tree.steal_children_of(merged, removed)?;
            tree.add_below(merged, before_parent, after_parent)?;
            tracing::debug!(node = tree.node(merged).id(), "Detected moved code");
        }
        Ok(())
    }
}

fn find_code_twins(tree: &DiffTree) -> Vec<(NodeId, NodeId)> {
    let mut artifacts = tree.compute_artifact_nodes();
    let mut twins = Vec::new();

    while let Some(code) = artifacts.pop() {
        let node = tree.node(code);
        let Some(wanted) = node.diff_type.inverse() else {
            continue;
        };
        let text = node.label_text();
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let twin = artifacts.iter().position(|other| {
            let other = tree.node(*other);
            other.diff_type == wanted && other.label_text().trim() == text
        });
        if let Some(pos) = twin {
            twins.push((code, artifacts.remove(pos)));
        }
    }
    twins
}

fn merge_twins(added: &DiffNode, removed: &DiffNode) -> DiffNode {
    let (add_from, rem_from) = (added.from_line(), removed.from_line());
    let (add_to, rem_to) = (added.to_line(), removed.to_line());
    let from = DiffLineNumber::new(
        add_from.in_diff.min(rem_from.in_diff),
        rem_from.before_edit,
        add_from.after_edit,
    );
    let to = DiffLineNumber::new(
        add_to.in_diff.max(rem_to.in_diff),
        rem_to.before_edit,
        add_to.after_edit,
    );
    DiffNode::artifact(DiffType::Non, from, to, added.label().to_vec())
}
