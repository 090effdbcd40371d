mod config;
mod core;
mod decoder;
mod renderer;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::config::PackConfig;
use crate::core::extractor::FrameExtractor;
use crate::core::frame_manager::FrameManager;
use crate::core::packer;

#[derive(Parser)]
#[command(author, version, about = "Pack video frames into a 1-bit-per-pixel stream", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract frames with ffmpeg, then pack them
    Run {
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Extract frames only
    Extract {
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Pack already extracted frames
    Pack {
        #[command(flatten)]
        layout: LayoutArgs,
    },
    /// Show one frame of a packed stream
    Inspect {
        #[command(flatten)]
        layout: LayoutArgs,
        /// 1-based frame index
        #[arg(long, default_value_t = 1)]
        index: usize,
        /// Also write the frame as a PNG
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Print the layout of a packed stream as JSON
    Info {
        #[command(flatten)]
        layout: LayoutArgs,
    },
}

/// Options shared by every subcommand. Flags override the config file,
/// which overrides the built-in defaults.
#[derive(Args, Debug, Default)]
struct LayoutArgs {
    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    video: Option<PathBuf>,
    #[arg(long)]
    frames_dir: Option<PathBuf>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long)]
    width: Option<u32>,
    #[arg(short = 'H', long)]
    height: Option<u32>,
    /// Number of frames to extract and pack
    #[arg(short = 'n', long)]
    frames: Option<u32>,
    /// Luminance above which a pixel is foreground
    #[arg(short, long)]
    threshold: Option<u8>,
}

impl LayoutArgs {
    fn resolve(&self) -> Result<PackConfig> {
        let mut cfg = PackConfig::load(self.config.as_deref())?;
        if let Some(video) = &self.video {
            cfg.video = video.clone();
        }
        if let Some(dir) = &self.frames_dir {
            cfg.frames_dir = dir.clone();
        }
        if let Some(output) = &self.output {
            cfg.output = output.clone();
        }
        cfg.width = self.width.unwrap_or(cfg.width);
        cfg.height = self.height.unwrap_or(cfg.height);
        cfg.frame_count = self.frames.unwrap_or(cfg.frame_count);
        cfg.threshold = self.threshold.unwrap_or(cfg.threshold);
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { layout } => {
            let cfg = layout.resolve()?;
            let extractor = FrameExtractor::default();
            FrameExtractor::check_input(&cfg.video)?;
            extractor.check_available()?;
            extractor.extract(&cfg)?;
            pack(&cfg)?;
            println!("\nFrame extraction complete!");
            println!("  Binary file: {}", cfg.output.display());
            println!("  Frame size: {}x{}", cfg.width, cfg.height);
            println!("  Total frames: {}", cfg.frame_count);
        }
        Commands::Extract { layout } => {
            let cfg = layout.resolve()?;
            let extractor = FrameExtractor::default();
            FrameExtractor::check_input(&cfg.video)?;
            extractor.check_available()?;
            extractor.extract(&cfg)?;
        }
        Commands::Pack { layout } => {
            pack(&layout.resolve()?)?;
        }
        Commands::Inspect { layout, index, png } => {
            let cfg = layout.resolve()?;
            inspect(&cfg, *index, png.as_deref())?;
        }
        Commands::Info { layout } => {
            let cfg = layout.resolve()?;
            println!("{}", serde_json::to_string_pretty(&info(&cfg)?)?);
        }
    }

    Ok(())
}

fn pack(cfg: &PackConfig) -> Result<()> {
    let summary = packer::pack_to_file(cfg)?;
    log::info!("Wrote {} frames ({} bytes)", summary.frames_written, summary.bytes_written);
    if !summary.missing.is_empty() {
        log::warn!("{} of {} frames were missing", summary.missing.len(), summary.frames_written);
    }
    let size = std::fs::metadata(&cfg.output)
        .with_context(|| format!("Failed to stat {}", cfg.output.display()))?
        .len();
    if size != cfg.stream_size() {
        bail!("{} is {} bytes, expected {}", cfg.output.display(), size, cfg.stream_size());
    }
    println!("  Size: {} bytes ({:.2} MB)", size, size as f64 / 1024.0 / 1024.0);
    Ok(())
}

/// Only what the stream itself determines; the threshold is not recoverable.
fn info(cfg: &PackConfig) -> Result<serde_json::Value> {
    let frames = FrameManager::load(&cfg.output, cfg.width, cfg.height)?;
    Ok(json!({
        "file": cfg.output,
        "layout": frames.layout(),
    }))
}

fn inspect(cfg: &PackConfig, index: usize, png: Option<&Path>) -> Result<()> {
    let frames = FrameManager::load(&cfg.output, cfg.width, cfg.height)?;
    let frame = index
        .checked_sub(1)
        .and_then(|i| frames.unpack_frame(i))
        .with_context(|| {
            format!("Frame {} out of range (stream has {} frames)", index, frames.frame_count())
        })?;

    print!("{}", renderer::render_half_blocks(&frame));
    if let Some(path) = png {
        renderer::save_png(&frame, path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}
