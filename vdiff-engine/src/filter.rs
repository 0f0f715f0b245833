//! Named tree predicates that remember why trees were rejected.

use crate::tree::DiffTree;
use crate::types::DiffType;
use std::collections::BTreeMap;

type Predicate = Box<dyn Fn(&DiffTree) -> bool + Send + Sync>;

/// A conjunction of named predicates. For every predicate it counts the trees it rejected;
/// a tree is only counted for the first predicate that rejects it.
#[derive(Default)]
pub struct ExplainedFilter {
    predicates: Vec<(String, Predicate)>,
    rejections: BTreeMap<String, usize>,
}

impl ExplainedFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate. Trees for which it returns false are rejected.
    pub fn with(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(&DiffTree) -> bool + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        self.rejections.insert(name.clone(), 0);
        self.predicates.push((name, Box::new(predicate)));
        self
    }

    /// The filters applied to mined trees by default.
    pub fn standard() -> Self {
        Self::new()
            .with("consistent", consistent)
            .with("not_empty", not_empty)
            .with("has_edits", has_edits)
            .with("more_than_one_artifact_node", more_than_one_artifact_node)
    }

    pub fn test(&mut self, tree: &DiffTree) -> bool {
        for (name, predicate) in &self.predicates {
            if !predicate(tree) {
                *self.rejections.entry(name.clone()).or_insert(0) += 1;
                return false;
            }
        }
        true
    }

    /// Number of rejected trees per predicate name.
    pub fn explain(&self) -> &BTreeMap<String, usize> {
        &self.rejections
    }

    pub fn reset(&mut self) {
        for count in self.rejections.values_mut() {
            *count = 0;
        }
    }
}

pub fn consistent(tree: &DiffTree) -> bool {
    tree.is_consistent()
}

/// The tree has more than its root.
pub fn not_empty(tree: &DiffTree) -> bool {
    !tree.is_empty()
}

pub fn has_edits(tree: &DiffTree) -> bool {
    tree.any_match(|n| n.diff_type != DiffType::Non)
}

pub fn more_than_one_artifact_node(tree: &DiffTree) -> bool {
    tree.count(|n| n.is_artifact()) > 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_diff, ParseOptions};

    fn parse(diff: &str) -> DiffTree {
        parse_diff(diff, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_standard_filter_counts_rejections() {
        let mut filter = ExplainedFilter::standard();
        let trees = [
            DiffTree::new(),
            parse(" int a;\n"),
            parse("+int a;\n"),
            parse(" int a;\n #if A\n+int b;\n #endif\n"),
        ];
        let accepted: Vec<bool> = trees.iter().map(|t| filter.test(t)).collect();
        assert_eq!(accepted, vec![false, false, false, true]);

        let counts = filter.explain();
        assert_eq!(counts["consistent"], 0);
        assert_eq!(counts["not_empty"], 1);
        assert_eq!(counts["has_edits"], 1);
        assert_eq!(counts["more_than_one_artifact_node"], 1);

        filter.reset();
        assert!(filter.explain().values().all(|c| *c == 0));
    }

    #[test]
    fn test_custom_predicate() {
        let mut filter = ExplainedFilter::new().with("small", |t: &DiffTree| t.size() < 3);
        assert!(filter.test(&parse("+int a;\n")));
        assert!(!filter.test(&parse("+#if A\n+int a;\n+#endif\n")));
        assert_eq!(filter.explain()["small"], 1);
    }
}
