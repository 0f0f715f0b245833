//! Removal of structurally equal trees.
//!
//! Two trees are duplicates if they are equal as ordered trees over node type and diff type:
//! labels, line numbers and formulas are ignored, the order of children is not. This is the
//! equivalence used for mined patterns, whose labels carry nothing but types anyway.

use crate::node::NodeId;
use crate::tree::DiffTree;

/// Ordered structural equality of two trees, starting at their roots.
pub fn trees_equivalent(a: &DiffTree, b: &DiffTree) -> bool {
    subtrees_equivalent(a, a.root(), b, b.root())
}

fn subtrees_equivalent(a: &DiffTree, x: NodeId, b: &DiffTree, y: NodeId) -> bool {
    let (nx, ny) = (a.node(x), b.node(y));
    if nx.node_type != ny.node_type || nx.diff_type != ny.diff_type {
        return false;
    }
    let (cx, cy) = (nx.all_children(), ny.all_children());
    cx.len() == cy.len()
        && cx
            .iter()
            .zip(cy)
            .all(|(cx, cy)| subtrees_equivalent(a, *cx, b, *cy))
}

/// Keep the first tree of every equivalence class, preserving input order.
pub fn filter_duplicates(trees: Vec<DiffTree>) -> Vec<DiffTree> {
    let total = trees.len();
    let mut unique: Vec<DiffTree> = Vec::with_capacity(total);
    for tree in trees {
        if !unique.iter().any(|kept| trees_equivalent(kept, &tree)) {
            unique.push(tree);
        }
    }
    tracing::debug!(total, unique = unique.len(), "Removed duplicate trees");
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_diff, ParseOptions};
    use crate::tree::DiffTreeSource;

    fn parse(diff: &str) -> DiffTree {
        parse_diff(diff, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_duplicates_from_different_commits() {
        let mut first = parse("+#if A\n+int x;\n+#endif\n");
        first.set_source(DiffTreeSource::Patch {
            file: "a.c".into(),
            commit: "1111".into(),
        });
        let mut second = parse("+#ifdef CONFIG_B\n+return 0;\n+#endif\n");
        second.set_source(DiffTreeSource::Patch {
            file: "b.c".into(),
            commit: "2222".into(),
        });
        let other = parse(" #if A\n+int x;\n #endif\n");

        let unique = filter_duplicates(vec![first, second, other]);
        assert_eq!(unique.len(), 2);
        assert_eq!(
            unique[0].source(),
            &DiffTreeSource::Patch {
                file: "a.c".into(),
                commit: "1111".into()
            }
        );
    }

    #[test]
    fn test_child_order_matters() {
        let a = parse(" #if A\n+int x;\n-int y;\n #endif\n");
        let b = parse(" #if A\n-int y;\n+int x;\n #endif\n");
        assert!(!trees_equivalent(&a, &b));
        assert!(trees_equivalent(&a, &a.clone()));
        assert_eq!(filter_duplicates(vec![a, b]).len(), 2);
    }
}
