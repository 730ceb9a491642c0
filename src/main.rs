//! Command-line front end for the scorer.
//!
//!   food-aesthetics score --model models/food_aesthetics.json dish1.jpg dish2.png
//!   food-aesthetics init-model --out models/food_aesthetics.json --seed 7

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use food_aesthetics::{
    logging, ImageOutcome, NetworkSpec, RawImage, ScorerConfig, Scorer, ScoringNetwork,
};

#[derive(Parser, Debug)]
#[command(name = "food-aesthetics", version, about = "Score food photographs for aesthetic quality")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score one or more image files; prints one JSON line per image.
    Score {
        /// Model artifact (JSON).
        #[arg(long)]
        model: PathBuf,
        /// Images per forward pass.
        #[arg(long, default_value_t = 8)]
        batch_size: usize,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Write an untrained artifact with the default architecture.
    InitModel {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 224)]
        input_size: u32,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Score { model, batch_size, images } => score(&model, batch_size, &images),
        Command::InitModel { out, seed, input_size } => init_model(&out, seed, input_size),
    }
}

fn score(model_path: &Path, batch_size: usize, paths: &[PathBuf]) -> Result<()> {
    let network = ScoringNetwork::load_json(&model_path.to_string_lossy())
        .with_context(|| format!("loading model {}", model_path.display()))?;
    let scorer = Scorer::with_model(Arc::new(network), ScorerConfig::with_batch_size(batch_size))?;

    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let image = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => RawImage::new(bytes, ext),
            None => RawImage::undeclared(bytes),
        };
        images.push(image);
    }

    let result = scorer.score_many(&images)?;
    for (outcome, path) in result.outcomes.iter().zip(paths) {
        let line = match outcome {
            ImageOutcome::Scored(s) => json!({
                "index": s.index,
                "path": path.display().to_string(),
                "aesthetic_score": s.score.value(),
                "image_size": s.image_size(),
            }),
            ImageOutcome::Failed(f) => json!({
                "index": f.index,
                "path": path.display().to_string(),
                "error": f.error.to_string(),
                "error_kind": f.kind(),
            }),
        };
        println!("{}", line);
    }
    info!(total = result.total_images, successful = result.successful_images, "done");
    Ok(())
}

fn init_model(out: &Path, seed: u64, input_size: u32) -> Result<()> {
    if let Some(dir) = out.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let network = NetworkSpec::with_input_size(input_size).build(seed)?;
    network.save_json(&out.to_string_lossy())?;
    info!(path = %out.display(), seed, input_size, "model artifact written");
    Ok(())
}
