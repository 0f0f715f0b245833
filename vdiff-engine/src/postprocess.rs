//! Cleanup of mined trees: filter, simplify, deduplicate.

use crate::dedup::filter_duplicates;
use crate::error::TransformError;
use crate::filter::ExplainedFilter;
use crate::transform::{apply_all, check_dependencies, CutNonEditedSubtrees, DiffTreeTransformer};
use crate::tree::DiffTree;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
pub struct PostprocessResult {
    #[serde(skip)]
    pub trees: Vec<DiffTree>,
    /// Trees rejected per filter name.
    pub filter_counts: BTreeMap<String, usize>,
    pub duplicates: usize,
}

pub struct Postprocessor {
    filter: ExplainedFilter,
    transformers: Vec<Box<dyn DiffTreeTransformer>>,
}

impl Postprocessor {
    pub fn new(filter: ExplainedFilter, transformers: Vec<Box<dyn DiffTreeTransformer>>) -> Self {
        Self {
            filter,
            transformers,
        }
    }

    /// Standard filters followed by cutting non-edited subtrees.
    pub fn standard() -> Self {
        Self::new(
            ExplainedFilter::standard(),
            vec![Box::new(CutNonEditedSubtrees)],
        )
    }

    /// Filter the trees, transform the survivors and drop duplicates. Filter counts are
    /// reset on every call.
    pub fn postprocess(&mut self, trees: Vec<DiffTree>) -> Result<PostprocessResult, TransformError> {
        check_dependencies(&self.transformers)?;
        self.filter.reset();

        let mut kept = Vec::with_capacity(trees.len());
        for mut tree in trees {
            if !self.filter.test(&tree) {
                continue;
            }
            apply_all(&self.transformers, &mut tree)?;
            kept.push(tree);
        }

        let before_dedup = kept.len();
        let trees = filter_duplicates(kept);
        let duplicates = before_dedup - trees.len();
        tracing::info!(kept = trees.len(), duplicates, "Postprocessed trees");

        Ok(PostprocessResult {
            trees,
            filter_counts: self.filter.explain().clone(),
            duplicates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse_diff, ParseOptions};
    use crate::transform::CollapseNestedNonEditedAnnotations;

    fn parse(diff: &str) -> DiffTree {
        parse_diff(diff, &ParseOptions::default()).unwrap()
    }

    #[test]
    fn test_postprocess() {
        let trees = vec![
            parse(" int a;\n #if A\n+int b;\n #endif\n"),
            parse(" int c;\n #if B\n+int d;\n #endif\n"),
            parse(" int a;\n"),
        ];
        let result = Postprocessor::standard().postprocess(trees).unwrap();
        // both edited trees reduce to root -> IF -> added artifact
        assert_eq!(result.trees.len(), 1);
        assert_eq!(result.duplicates, 1);
        assert_eq!(result.trees[0].size(), 3);
        assert_eq!(result.filter_counts["has_edits"], 1);
    }

    #[test]
    fn test_postprocess_checks_dependencies() {
        let mut post = Postprocessor::new(
            ExplainedFilter::new(),
            vec![Box::new(CollapseNestedNonEditedAnnotations)],
        );
        let result = post.postprocess(vec![parse("+int a;\n")]);
        assert!(matches!(result, Err(TransformError::DependencyNotMet { .. })));
    }
}
