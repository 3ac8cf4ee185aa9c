use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use davis_dataset::{
    summarize_layout, DatasetRegistry, DavisConfig, PairingMode, TransformPipeline,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "davis_manifest",
    about = "Build the image/annotation manifest for a DAVIS split"
)]
struct Args {
    /// TOML config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dataset root containing ImageSets/, JPEGImages/ and Annotations/.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Split to index (train or val).
    #[arg(long)]
    split: Option<String>,
    /// Challenge year selecting ImageSets/<year>/.
    #[arg(long)]
    year: Option<u32>,
    /// Resolution directory under JPEGImages/ and Annotations/.
    #[arg(long)]
    resolution: Option<String>,
    /// Mark the dataset for downstream edge computation (`--edge false` clears it).
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    edge: Option<bool>,
    /// How files are paired inside a sequence (stem or positional).
    #[arg(long)]
    pairing: Option<PairingMode>,
    /// Write the manifest as JSON to this path.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print per-sequence image/label counts as JSON instead of building.
    #[arg(long, default_value_t = false)]
    summary: bool,
}

fn resolve_config(args: &Args) -> Result<DavisConfig> {
    let cfg = match &args.config {
        Some(path) => DavisConfig::from_path(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => DavisConfig::load_default().context("load default config")?,
    };
    Ok(apply_overrides(cfg, args).with_transforms(TransformPipeline::identity()))
}

/// Flags given on the command line win over config-file values.
fn apply_overrides(mut cfg: DavisConfig, args: &Args) -> DavisConfig {
    if let Some(root) = &args.root {
        cfg.dataset_root = root.clone();
    }
    if let Some(split) = &args.split {
        cfg.split = split.clone();
    }
    if let Some(year) = args.year {
        cfg.year = year;
    }
    if let Some(resolution) = &args.resolution {
        cfg.resolution = resolution.clone();
    }
    if let Some(edge) = args.edge {
        cfg.compute_edge = edge;
    }
    if let Some(pairing) = args.pairing {
        cfg.pairing = pairing;
    }
    cfg
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = resolve_config(&args)?;

    if args.summary {
        let summary = summarize_layout(&cfg).context("summarize dataset layout")?;
        for seq in summary.mismatched() {
            tracing::warn!(
                sequence = seq.sequence.as_str(),
                images = seq.images,
                labels = seq.labels,
                "image/label count mismatch"
            );
        }
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let root = cfg.dataset_root.clone();
    let dataset = DatasetRegistry::with_builtin()
        .build("davis", cfg)
        .with_context(|| format!("build DAVIS manifest under {}", root.display()))?;
    let manifest = dataset.manifest();

    match &args.output {
        Some(path) => {
            manifest
                .save_json(path)
                .with_context(|| format!("write manifest {}", path.display()))?;
            println!(
                "wrote {} samples ({} classes, ignore_index {}) to {}",
                manifest.len(),
                dataset.num_classes(),
                dataset.ignore_index(),
                path.display()
            );
        }
        None => {
            for entry in manifest {
                println!(
                    "{}\t{}",
                    entry.image_path.display(),
                    entry.label_path.display()
                );
            }
        }
    }
    Ok(())
}
