use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use vdiff_core::config::Settings;
use vdiff_core::logging::init_logging;
use vdiff_core::mining::mine_directory;
use vdiff_engine::dedup::filter_duplicates;
use vdiff_engine::linegraph::{export_trees, import_line_graph_file};
use vdiff_engine::parse_patch_file;
use vdiff_engine::transform::apply_all;

#[derive(Parser)]
#[command(
    name = "vdiff",
    about = "Variation diffs of preprocessor-annotated source code"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the settings file
    #[arg(long, global = true, default_value = ".vdiff/settings.json")]
    config: PathBuf,

    /// Directory for log files (overrides the settings file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one patch file and print its variation diff as a line graph
    Parse {
        /// Unified diff of one file
        patch: PathBuf,
        /// Write the line graph here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Mine all patches in a directory into one line graph
    Mine {
        /// Directory searched recursively for .diff and .patch files
        dir: PathBuf,
        /// Output line graph; the summary is written next to it
        #[arg(long)]
        out: PathBuf,
    },
    /// Remove structurally duplicate trees from a line graph
    Dedup {
        /// Input line graph
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
    /// Check that every tree of a line graph is consistent
    Check {
        /// Input line graph
        input: PathBuf,
    },
    /// Write the default settings file
    Init,
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    Settings::load_or_default(&cli.config)
}

fn log_dir(cli: &Cli, settings: &Settings) -> PathBuf {
    cli.log_dir
        .clone()
        .unwrap_or_else(|| settings.logging.log_dir.clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match cli.command {
        Commands::Init => Settings::default(),
        _ => load_settings(&cli)?,
    };
    let _guard = init_logging(&log_dir(&cli, &settings))?;

    let result = match &cli.command {
        Commands::Parse { patch, out } => cmd_parse(&settings, patch, out.as_deref()).await,
        Commands::Mine { dir, out } => cmd_mine(&settings, dir, out).await,
        Commands::Dedup { input, out } => cmd_dedup(&settings, input, out).await,
        Commands::Check { input } => cmd_check(&settings, input).await,
        Commands::Init => cmd_init(&cli, &settings).await,
    };
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

async fn cmd_parse(settings: &Settings, patch: &Path, out: Option<&Path>) -> anyhow::Result<()> {
    let mut tree = parse_patch_file(patch, &settings.parse)?;
    apply_all(&settings.pipeline()?, &mut tree)?;

    let (text, stats) = export_trees([&tree], &settings.line_graph_options());
    match out {
        Some(path) => {
            tokio::fs::write(path, text).await?;
            tracing::info!(
                out = %path.display(),
                add = stats.add,
                rem = stats.rem,
                non = stats.non,
                "Wrote line graph"
            );
        }
        None => print!("{}", text),
    }
    Ok(())
}

async fn cmd_mine(settings: &Settings, dir: &Path, out: &Path) -> anyhow::Result<()> {
    let output = mine_directory(dir, settings).await?;

    if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(out, &output.line_graph).await?;
    let summary_path = out.with_extension("summary.json");
    output.summary.save(&summary_path)?;

    let s = &output.summary;
    println!("Patches: {} ({} mined, {} failed)", s.patches, s.mined, s.failed);
    for (kind, count) in &s.failures {
        println!("  {}: {}", kind, count);
    }
    println!("Duplicates removed: {}", s.duplicates);
    println!(
        "Exported {} trees ({} added, {} removed, {} unchanged nodes)",
        s.export.trees, s.export.add, s.export.rem, s.export.non
    );
    println!("Line graph: {}", out.display());
    println!("Summary: {}", summary_path.display());
    Ok(())
}

async fn cmd_dedup(settings: &Settings, input: &Path, out: &Path) -> anyhow::Result<()> {
    let options = settings.line_graph_options();
    let trees = import_line_graph_file(input, &options)?;
    let total = trees.len();
    let unique = filter_duplicates(trees);

    let (text, _) = export_trees(&unique, &options);
    tokio::fs::write(out, text).await?;
    tracing::info!(total, unique = unique.len(), "Deduplicated line graph");
    println!("{} of {} trees kept", unique.len(), total);
    Ok(())
}

async fn cmd_check(settings: &Settings, input: &Path) -> anyhow::Result<()> {
    let trees = import_line_graph_file(input, &settings.line_graph_options())?;
    let mut inconsistent = 0;
    for tree in &trees {
        if let Err(e) = tree.assert_consistency() {
            inconsistent += 1;
            tracing::warn!(source = %tree.source(), error = %e, "Inconsistent tree");
        }
    }
    println!("{} trees, {} inconsistent", trees.len(), inconsistent);
    if inconsistent > 0 {
        anyhow::bail!("{} inconsistent trees in {}", inconsistent, input.display());
    }
    Ok(())
}

async fn cmd_init(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    settings.save(&cli.config)?;
    println!("Configuration saved to {}", cli.config.display());
    Ok(())
}
