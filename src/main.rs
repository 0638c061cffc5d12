mod app;
mod batch;
mod circle;
mod config;
mod session;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use crate::batch::Batch;
use crate::config::AnnotatorConfig;

/// Mark circles in a directory of images, one `x,y,radius` record per image.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Directory of images to annotate (asked for when omitted)
    input_dir: Option<PathBuf>,
    /// Directory receiving one `.txt` record per image (asked for when omitted)
    output_dir: Option<PathBuf>,
    /// JSON file with key bindings, colors and ordering
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn pick_folder(title: &str) -> Option<PathBuf> {
    rfd::FileDialog::new().set_title(title).pick_folder()
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AnnotatorConfig::load(path)?,
        None => AnnotatorConfig::default(),
    };

    let input_dir = cli
        .input_dir
        .or_else(|| pick_folder("Images to annotate"))
        .context("no input directory given")?;
    let output_dir = cli
        .output_dir
        .or_else(|| pick_folder("Where to write circle records"))
        .context("no output directory given")?;

    let batch = Batch::plan(&input_dir, &output_dir, &config)?;
    let summary = app::run(batch, &config)?;
    log::info!(
        "annotated {} images, skipped {}{}",
        summary.annotated,
        summary.skipped,
        if summary.aborted { ", aborted" } else { "" }
    );
    Ok(())
}
