//! Batch mining of variation diffs from a directory of patch files.
//!
//! Every patch is parsed on its own blocking task. A patch that fails is logged, counted by
//! error kind and skipped; it never aborts the batch. The parsed trees are then filtered,
//! transformed by the configured pipeline and deduplicated together, and exported as one line
//! graph. Filters see the full parsed trees, before any context is cut away.

use crate::config::Settings;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::task::JoinSet;
use vdiff_engine::linegraph::{export_trees, ExportStats};
use vdiff_engine::filter::ExplainedFilter;
use vdiff_engine::postprocess::Postprocessor;
use vdiff_engine::{parse_patch_file, DiffTree, ParseOptions, PatchError};

pub const PATCH_EXTENSIONS: [&str; 2] = ["diff", "patch"];

#[derive(Debug, Error)]
pub enum MiningError {
    #[error("{}: {source}", path.display())]
    Patch {
        path: PathBuf,
        #[source]
        source: PatchError,
    },
}

impl MiningError {
    /// Short tag used to group failures in the summary.
    pub fn kind(&self) -> &'static str {
        match self {
            MiningError::Patch {
                source: PatchError::Parse(e),
                ..
            } => e.kind.as_str(),
            MiningError::Patch { .. } => "IO",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MiningSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub patches: usize,
    pub mined: usize,
    pub failed: usize,
    /// Failed patches per error kind.
    pub failures: BTreeMap<String, usize>,
    /// Mined trees rejected per filter.
    pub filter_counts: BTreeMap<String, usize>,
    pub duplicates: usize,
    pub export: ExportStats,
}

impl MiningSummary {
    fn new(started_at: DateTime<Utc>, patches: usize) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            patches,
            mined: 0,
            failed: 0,
            failures: BTreeMap::new(),
            filter_counts: BTreeMap::new(),
            duplicates: 0,
            export: ExportStats::default(),
        }
    }

    fn record_failure(&mut self, error: &MiningError) {
        self.failed += 1;
        *self.failures.entry(error.kind().to_string()).or_insert(0) += 1;
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

pub struct MiningOutput {
    pub line_graph: String,
    pub summary: MiningSummary,
}

/// Parse one patch file.
pub fn mine_patch(path: &Path, options: &ParseOptions) -> Result<DiffTree, MiningError> {
    parse_patch_file(path, options).map_err(|source| MiningError::Patch {
        path: path.to_path_buf(),
        source,
    })
}

/// All patch files below `dir`, sorted by path.
pub async fn collect_patches(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut patches = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                pending.push(path);
            } else if path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| PATCH_EXTENSIONS.contains(&e))
            {
                patches.push(path);
            }
        }
    }
    patches.sort();
    Ok(patches)
}

/// Mine all patches below `dir` into one line graph.
pub async fn mine_directory(dir: &Path, settings: &Settings) -> anyhow::Result<MiningOutput> {
    let started_at = Utc::now();
    let patches = collect_patches(dir).await?;
    let mut postprocessor = Postprocessor::new(ExplainedFilter::standard(), settings.pipeline()?);
    let options = settings.parse;
    tracing::info!(patches = patches.len(), dir = %dir.display(), "Mining patches");

    let mut tasks = JoinSet::new();
    for (index, path) in patches.iter().cloned().enumerate() {
        tasks.spawn_blocking(move || (index, mine_patch(&path, &options)));
    }
    let mut results = Vec::with_capacity(patches.len());
    while let Some(joined) = tasks.join_next().await {
        results.push(joined?);
    }
    results.sort_by_key(|(index, _)| *index);

    let mut summary = MiningSummary::new(started_at, patches.len());
    let mut trees = Vec::new();
    for (_, result) in results {
        match result {
            Ok(tree) => {
                tracing::debug!(source = %tree.source(), nodes = tree.size(), "Mined tree");
                trees.push(tree);
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Skipping patch");
                summary.record_failure(&e);
            }
        }
    }
    summary.mined = trees.len();

    let processed = postprocessor.postprocess(trees)?;
    summary.filter_counts = processed.filter_counts;
    summary.duplicates = processed.duplicates;

    let (line_graph, stats) = export_trees(&processed.trees, &settings.line_graph_options());
    summary.export = stats;
    summary.finished_at = Utc::now();
    tracing::info!(
        mined = summary.mined,
        failed = summary.failed,
        exported = stats.trees,
        "Mining finished"
    );

    Ok(MiningOutput {
        line_graph,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdiff_engine::linegraph::import_line_graph;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_collect_patches() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.diff", "+int a;\n");
        write(dir.path(), "sub/a.patch", "+int a;\n");
        write(dir.path(), "notes.txt", "");
        let patches = collect_patches(dir.path()).await.unwrap();
        assert_eq!(patches.len(), 2);
        assert!(patches.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_mine_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1.diff", " int a;\n #if A\n+int b;\n #endif\n");
        write(dir.path(), "2.diff", " int c;\n #if B\n+int d;\n #endif\n");
        write(dir.path(), "3.diff", "+#if A\n+int x;\n");
        write(dir.path(), "4.diff", " #endif\n");

        let settings = Settings::default();
        let output = mine_directory(dir.path(), &settings).await.unwrap();
        let summary = &output.summary;
        assert_eq!(summary.patches, 4);
        assert_eq!(summary.mined, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.failures["NOT_ALL_ANNOTATIONS_CLOSED"], 1);
        assert_eq!(summary.failures["ENDIF_WITHOUT_IF"], 1);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.export.trees, 1);

        let trees = import_line_graph(&output.line_graph, &settings.line_graph_options()).unwrap();
        assert_eq!(trees.len(), 1);
    }

    #[tokio::test]
    async fn test_mine_single_edit_patch() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "1.diff", " int a;\n #if A\n+int b;\n #endif\n");

        let settings = Settings::default();
        let output = mine_directory(dir.path(), &settings).await.unwrap();
        assert_eq!(output.summary.mined, 1);
        assert_eq!(output.summary.export.trees, 1);
        assert!(output.summary.filter_counts.values().all(|n| *n == 0));

        // the configured pipeline still cut the unchanged context
        let trees = import_line_graph(&output.line_graph, &settings.line_graph_options()).unwrap();
        assert_eq!(trees[0].size(), 3);
    }

    #[test]
    fn test_summary_serializes_timestamps() {
        let summary = MiningSummary::new(Utc::now(), 0);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["started_at"].is_string());
        assert_eq!(json["export"]["trees"], 0);
    }
}
