//! The line-graph text format.
//!
//! ```text
//! t # src/main.c$$$abc123
//! v 16
//! v 144 #if A
//! v 195 int x;
//! e 144 16 ba
//! e 195 144 a
//!
//! ```
//!
//! A `t #` header starts a tree, `v <id> <label>` declares a node and
//! `e <child> <parent> <relation>` links a child to its parent before the edit (`b`), after it
//! (`a`) or both (`ba`). Ids are the packed ids of [`crate::node::DiffNode::id`]. Each tree
//! is followed by a blank line.

use crate::error::LineGraphError;
use crate::format::{CommitDiffTreeLabelFormat, NodeLabelFormat, TreeLabelFormat};
use crate::node::NodeId;
use crate::tree::DiffTree;
use crate::types::{DiffType, Time};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

pub const TREE_HEADER: &str = "t #";
pub const NODE: &str = "v";
pub const EDGE: &str = "e";
pub const BEFORE_AND_AFTER: &str = "ba";
pub const BEFORE: &str = "b";
pub const AFTER: &str = "a";

/// Formats used for both directions.
pub struct LineGraphOptions {
    pub node_format: Box<dyn NodeLabelFormat>,
    pub tree_format: Box<dyn TreeLabelFormat>,
}

impl LineGraphOptions {
    pub fn new(node_format: Box<dyn NodeLabelFormat>) -> Self {
        Self {
            node_format,
            tree_format: Box::new(CommitDiffTreeLabelFormat),
        }
    }
}

impl Default for LineGraphOptions {
    fn default() -> Self {
        Self::new(Box::new(crate::format::LabelOnly))
    }
}

/// Number of exported nodes per diff type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub trees: usize,
    pub add: usize,
    pub rem: usize,
    pub non: usize,
}

impl ExportStats {
    pub fn merge(&mut self, other: &ExportStats) {
        self.trees += other.trees;
        self.add += other.add;
        self.rem += other.rem;
        self.non += other.non;
    }

    fn count(&mut self, diff_type: DiffType) {
        match diff_type {
            DiffType::Add => self.add += 1,
            DiffType::Rem => self.rem += 1,
            DiffType::Non => self.non += 1,
        }
    }
}

/// Append one tree to `out`.
pub fn export_tree(tree: &DiffTree, options: &LineGraphOptions, out: &mut String) -> ExportStats {
    let mut stats = ExportStats {
        trees: 1,
        ..Default::default()
    };
    let nodes = tree.compute_all_nodes();

    let _ = writeln!(out, "{} {}", TREE_HEADER, options.tree_format.to_label(tree.source()));
    for &id in &nodes {
        let node = tree.node(id);
        stats.count(node.diff_type);
        let _ = writeln!(
            out,
            "{} {} {}",
            NODE,
            node.id(),
            options.node_format.to_label(tree, id)
        );
    }
    // edges are listed per parent so that imports restore the order of children
    for &parent in &nodes {
        for &child in tree.node(parent).all_children() {
            let c = tree.node(child);
            let before = c.before_parent() == Some(parent);
            let after = c.after_parent() == Some(parent);
            match (before, after) {
                (true, true) => write_edge(out, tree, child, parent, BEFORE_AND_AFTER),
                (true, false) => write_edge(out, tree, child, parent, BEFORE),
                (false, true) => write_edge(out, tree, child, parent, AFTER),
                (false, false) => {}
            }
        }
    }
    out.push('\n');
    stats
}

fn write_edge(out: &mut String, tree: &DiffTree, child: NodeId, parent: NodeId, relation: &str) {
    let _ = writeln!(
        out,
        "{} {} {} {}",
        EDGE,
        tree.node(child).id(),
        tree.node(parent).id(),
        relation
    );
}

pub fn export_trees<'a>(
    trees: impl IntoIterator<Item = &'a DiffTree>,
    options: &LineGraphOptions,
) -> (String, ExportStats) {
    let mut out = String::new();
    let mut stats = ExportStats::default();
    for tree in trees {
        stats.merge(&export_tree(tree, options, &mut out));
    }
    (out, stats)
}

/// Tree under construction while reading.
struct PendingTree {
    label: String,
    tree: DiffTree,
    ids: HashMap<i32, NodeId>,
}

impl PendingTree {
    fn new(label: &str, options: &LineGraphOptions) -> Self {
        let mut tree = DiffTree::empty();
        tree.set_source(options.tree_format.from_label(label));
        Self {
            label: label.to_string(),
            tree,
            ids: HashMap::new(),
        }
    }

    /// Pick the root and hand out the tree. Trees without nodes are skipped.
    fn finish(mut self) -> Result<Option<DiffTree>, LineGraphError> {
        if self.ids.is_empty() {
            return Ok(None);
        }
        let roots: Vec<NodeId> = self
            .ids
            .values()
            .copied()
            .filter(|id| !self.tree.node(*id).has_parents())
            .collect();
        if roots.len() != 1 {
            return Err(LineGraphError::NoUniqueRoot {
                tree: self.label,
                roots: roots.len(),
            });
        }
        self.tree.set_root(roots[0]);
        Ok(Some(self.tree))
    }
}

/// Read all trees of a line graph.
pub fn import_line_graph(
    text: &str,
    options: &LineGraphOptions,
) -> Result<Vec<DiffTree>, LineGraphError> {
    let mut trees = Vec::new();
    let mut current = PendingTree::new("", options);

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        if let Some(label) = line.strip_prefix(TREE_HEADER) {
            let previous = std::mem::replace(&mut current, PendingTree::new(label.trim(), options));
            trees.extend(previous.finish()?);
        } else if let Some(rest) = line.strip_prefix(NODE).and_then(|r| r.strip_prefix(' ')) {
            read_node(&mut current, rest, line_no, line, options)?;
        } else if let Some(rest) = line.strip_prefix(EDGE).and_then(|r| r.strip_prefix(' ')) {
            read_edge(&mut current, rest, line_no, line)?;
        } else if !line.trim().is_empty() {
            return Err(LineGraphError::Syntax {
                line: line_no,
                text: line.to_string(),
            });
        }
    }
    trees.extend(current.finish()?);
    tracing::debug!(trees = trees.len(), "Imported line graph");
    Ok(trees)
}

pub fn import_line_graph_file(
    path: &Path,
    options: &LineGraphOptions,
) -> Result<Vec<DiffTree>, LineGraphError> {
    let text = std::fs::read_to_string(path)?;
    import_line_graph(&text, options)
}

fn read_node(
    current: &mut PendingTree,
    rest: &str,
    line_no: usize,
    line: &str,
    options: &LineGraphOptions,
) -> Result<(), LineGraphError> {
    let invalid = || LineGraphError::InvalidNode {
        line: line_no,
        text: line.to_string(),
    };
    let (id, label) = rest.split_once(' ').unwrap_or((rest, ""));
    let id: i32 = id.parse().map_err(|_| invalid())?;
    if current.ids.contains_key(&id) {
        return Err(invalid());
    }
    let node = options
        .node_format
        .from_label_and_id(label, id)
        .ok_or_else(invalid)?;
    let handle = current.tree.insert(node);
    current.ids.insert(id, handle);
    Ok(())
}

fn read_edge(
    current: &mut PendingTree,
    rest: &str,
    line_no: usize,
    line: &str,
) -> Result<(), LineGraphError> {
    let parts: Vec<&str> = rest.split_whitespace().collect();
    let &[child, parent, relation] = parts.as_slice() else {
        return Err(LineGraphError::Syntax {
            line: line_no,
            text: line.to_string(),
        });
    };
    let lookup = |raw: &str| -> Result<NodeId, LineGraphError> {
        let id: i32 = raw.parse().map_err(|_| LineGraphError::Syntax {
            line: line_no,
            text: line.to_string(),
        })?;
        current
            .ids
            .get(&id)
            .copied()
            .ok_or(LineGraphError::UnknownNode { line: line_no, id })
    };
    let child = lookup(child)?;
    let parent = lookup(parent)?;

    let times: &[Time] = match relation {
        BEFORE_AND_AFTER => &Time::ALL,
        BEFORE => &[Time::Before],
        AFTER => &[Time::After],
        other => {
            return Err(LineGraphError::UnknownRelation {
                line: line_no,
                relation: other.to_string(),
            })
        }
    };
    for &time in times {
        current
            .tree
            .add_child(parent, child, time)
            .map_err(|source| LineGraphError::Graph {
                line: line_no,
                source,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::trees_equivalent;
    use crate::format::{NodeFormatKind, TypeOnly};
    use crate::parser::{parse_diff, ParseOptions};
    use crate::tree::DiffTreeSource;

    fn sample() -> DiffTree {
        let mut tree = parse_diff(
            " #if A\n-#if B\n+#if C\n int x;\n-#endif\n+#endif\n+int y;\n #endif\n",
            &ParseOptions::default(),
        )
        .unwrap();
        tree.set_source(DiffTreeSource::Patch {
            file: "src/x.c".into(),
            commit: "deadbeef".into(),
        });
        tree
    }

    #[test]
    fn test_export_format() {
        let tree = parse_diff("+#if A\n+int x;\n+#endif\n", &ParseOptions::default()).unwrap();
        let (text, stats) = export_trees([&tree], &LineGraphOptions::new(Box::new(TypeOnly)));
        let if_id = tree.node(tree.compute_annotation_nodes()[0]).id();
        let x_id = tree.node(tree.compute_artifact_nodes()[0]).id();
        let expected = format!(
            "t # unknown\nv 16 NON_IF\nv {if_id} ADD_IF\nv {x_id} ADD_ARTIFACT\ne {if_id} 16 a\ne {x_id} {if_id} a\n\n"
        );
        assert_eq!(text, expected);
        assert_eq!(
            stats,
            ExportStats {
                trees: 1,
                add: 2,
                rem: 0,
                non: 1
            }
        );
    }

    #[test]
    fn test_round_trip() {
        let tree = sample();
        for kind in [NodeFormatKind::LabelOnly, NodeFormatKind::TypeDiff, NodeFormatKind::TypeOnly] {
            let options = LineGraphOptions::new(kind.format());
            let (text, _) = export_trees([&tree, &tree], &options);
            let imported = import_line_graph(&text, &options).unwrap();
            assert_eq!(imported.len(), 2);
            for back in &imported {
                back.assert_consistency().unwrap();
                assert!(trees_equivalent(&tree, back));
                assert_eq!(back.source(), tree.source());
                assert_eq!(back.size(), tree.size());
                assert_same_parents(&tree, back);
            }
        }
    }

    fn assert_same_parents(expected: &DiffTree, actual: &DiffTree) {
        let packed = |t: &DiffTree, id: Option<NodeId>| id.map(|id| t.node(id).id());
        for id in expected.compute_all_nodes() {
            let node_id = expected.node(id).id();
            let other = actual.node_by_id(node_id).unwrap();
            for time in [Time::Before, Time::After] {
                assert_eq!(
                    packed(actual, actual.parent(other, time)),
                    packed(expected, expected.parent(id, time)),
                    "parent of {} at {:?}",
                    node_id,
                    time
                );
            }
        }
    }

    #[test]
    fn test_round_trip_keeps_parents_per_time() {
        let tree = sample();
        let x = tree
            .compute_artifact_nodes()
            .into_iter()
            .find(|id| tree.node(*id).label_text().trim() == "int x;")
            .unwrap();
        assert_ne!(tree.parent(x, Time::Before), tree.parent(x, Time::After));

        let options = LineGraphOptions::default();
        let (text, _) = export_trees([&tree], &options);
        let back = import_line_graph(&text, &options).unwrap().remove(0);
        assert_same_parents(&tree, &back);
    }

    #[test]
    fn test_label_round_trip() {
        let tree = sample();
        let options = LineGraphOptions::default();
        let (text, _) = export_trees([&tree], &options);
        let back = import_line_graph(&text, &options).unwrap().remove(0);
        let labels = |t: &DiffTree| -> Vec<String> {
            t.compute_all_nodes()
                .into_iter()
                .map(|id| t.node(id).label_text())
                .collect()
        };
        assert_eq!(labels(&back), labels(&tree));
        let c = back
            .compute_annotation_nodes()
            .into_iter()
            .find(|id| back.node(*id).label_text() == "#if C")
            .unwrap();
        assert_eq!(
            back.node(c).direct_feature_mapping(),
            Some(&crate::formula::Formula::var("C"))
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = import_line_graph("t # x\nv 16 \nx 1 2\n", &LineGraphOptions::default()).unwrap_err();
        assert!(matches!(err, LineGraphError::Syntax { line: 3, .. }));

        let err = import_line_graph("t # x\nv sixteen \n", &LineGraphOptions::default()).unwrap_err();
        assert!(matches!(err, LineGraphError::InvalidNode { line: 2, .. }));
    }

    #[test]
    fn test_unknown_node_and_relation() {
        let err = import_line_graph("t # x\nv 16 \nv 136 #if A\ne 136 24 ba\n", &LineGraphOptions::default())
            .unwrap_err();
        assert!(matches!(err, LineGraphError::UnknownNode { line: 4, id: 24 }));

        let err = import_line_graph("t # x\nv 16 \nv 136 #if A\ne 136 16 ab\n", &LineGraphOptions::default())
            .unwrap_err();
        assert!(matches!(err, LineGraphError::UnknownRelation { line: 4, .. }));
    }

    #[test]
    fn test_no_unique_root() {
        let err = import_line_graph("t # x\nv 16 \nv 136 #if A\n", &LineGraphOptions::default())
            .unwrap_err();
        assert!(matches!(err, LineGraphError::NoUniqueRoot { roots: 2, .. }));
    }

    #[test]
    fn test_file_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trees.lg");
        let (text, _) = export_trees([&sample()], &LineGraphOptions::default());
        std::fs::write(&path, text).unwrap();
        let trees = import_line_graph_file(&path, &LineGraphOptions::default()).unwrap();
        assert_eq!(trees.len(), 1);
    }
}
