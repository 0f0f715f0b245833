use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vdiff_engine::format::{CommitDiffTreeLabelFormat, NodeFormatKind};
use vdiff_engine::linegraph::LineGraphOptions;
use vdiff_engine::transform::{pipeline_from_names, CutNonEditedSubtrees, DiffTreeTransformer};
use vdiff_engine::ParseOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub parse: ParseOptions,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub transform: TransformSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSettings {
    #[serde(default)]
    pub node_format: NodeFormatKind,
    #[serde(default)]
    pub tree_format: TreeFormatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeFormatKind {
    #[default]
    CommitDiff,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformSettings {
    /// Transformer names, applied in order to every mined tree.
    #[serde(default = "default_pipeline")]
    pub pipeline: Vec<String>,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            pipeline: default_pipeline(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
        }
    }
}

fn default_pipeline() -> Vec<String> {
    vec![CutNonEditedSubtrees::NAME.to_string()]
}
fn default_log_dir() -> PathBuf {
    PathBuf::from(".vdiff/logs")
}

impl Settings {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.pipeline()?;
        Ok(settings)
    }

    /// Load settings from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The configured transformers. Fails on unknown names and unmet dependencies.
    pub fn pipeline(&self) -> anyhow::Result<Vec<Box<dyn DiffTreeTransformer>>> {
        Ok(pipeline_from_names(self.transform.pipeline.as_slice())?)
    }

    pub fn line_graph_options(&self) -> LineGraphOptions {
        let mut options = LineGraphOptions::new(self.export.node_format.format());
        match self.export.tree_format {
            TreeFormatKind::CommitDiff => options.tree_format = Box::new(CommitDiffTreeLabelFormat),
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.parse.collapse_multiple_code_lines);
        assert!(settings.parse.ignore_empty_lines);
        assert_eq!(settings.export.node_format, NodeFormatKind::LabelOnly);
        assert_eq!(settings.transform.pipeline, vec!["cut-non-edited-subtrees".to_string()]);
        assert_eq!(settings.logging.log_dir, PathBuf::from(".vdiff/logs"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = Settings::default();
        settings.parse.collapse_multiple_code_lines = false;
        settings.export.node_format = NodeFormatKind::TypeOnly;
        settings.transform.pipeline.push("collapse-nested-non-edited-annotations".into());
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert!(!loaded.parse.collapse_multiple_code_lines);
        assert_eq!(loaded.export.node_format, NodeFormatKind::TypeOnly);
        assert_eq!(loaded.pipeline().unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_pipeline_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"transform": {"pipeline": ["sort-everything"]}}"#).unwrap();
        assert!(Settings::load(&path).is_err());

        std::fs::write(
            &path,
            r#"{"transform": {"pipeline": ["collapse-nested-non-edited-annotations"]}}"#,
        )
        .unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_or_default(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.transform.pipeline.len(), 1);
    }
}
