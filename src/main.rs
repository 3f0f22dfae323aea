// SYNOID Chaos Main Entry Point
// Copyright (c) 2026 Xing_The_Creator | SYNOID

use synoid_chaos::config::{self, EngineSettings, ProjectFile};
use synoid_chaos::effects::{self, EffectKind};
use synoid_chaos::engine::FfmpegEngine;
use synoid_chaos::{PipelineExecutor, RenderRequest, Timeline};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "synoid-chaos")]
#[command(about = "SYNOID Chaos - randomized effect timeline renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a video through an effect timeline
    Render {
        /// Input video path (overrides the project file)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output video path (overrides the project file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Timeline JSON (a bare array or a project file)
        #[arg(short, long)]
        timeline: Option<PathBuf>,

        /// Project file holding input, output and timeline
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Seed for reproducible renders
        #[arg(long)]
        seed: Option<u64>,

        /// Fast, duration-capped render
        #[arg(long)]
        preview: bool,
    },

    /// Quick low-quality render of the first few seconds
    Preview {
        /// Input video path
        #[arg(short, long)]
        input: PathBuf,

        /// Timeline JSON (a bare array or a project file)
        #[arg(short, long)]
        timeline: PathBuf,

        /// Output path (defaults to <input>_preview.mp4)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for reproducible renders
        #[arg(long)]
        seed: Option<u64>,
    },

    /// List every effect in the catalog
    Effects,

    /// Generate a random timeline
    RandomTimeline {
        /// Number of effects
        #[arg(short, long, default_value_t = 3)]
        count: usize,

        /// Write the timeline here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seed for reproducible generation
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Verify that ffmpeg is reachable
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let args = Cli::parse();
    let settings = EngineSettings::from_env();

    match args.command {
        Commands::Render {
            input,
            output,
            timeline,
            project,
            seed,
            preview,
        } => {
            let mut request = build_request(input, output, timeline, project)?;
            request.preview = preview;
            render(&settings, request, seed).await?;
        }
        Commands::Preview {
            input,
            timeline,
            output,
            seed,
        } => {
            let out_path = output.unwrap_or_else(|| preview_path(&input));
            let timeline = config::load_timeline(&timeline).context("Failed to load timeline")?;
            render(&settings, RenderRequest::new(input, out_path, timeline).preview(), seed).await?;
        }
        Commands::Effects => {
            for kind in EffectKind::ALL {
                println!("{:<18} {}", kind.name(), kind.description());
            }
        }
        Commands::RandomTimeline { count, output, seed } => {
            let mut rng = make_rng(seed);
            let timeline = Timeline::random(count, &mut rng);
            let json = timeline.to_json().context("Failed to serialize timeline")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Random timeline with {} effects saved to {:?}", timeline.len(), path);
                }
                None => println!("{}", json),
            }
        }
        Commands::Check => {
            let engine = FfmpegEngine::new(&settings);
            if !engine.is_available().await {
                bail!("ffmpeg not found at {:?}", settings.ffmpeg);
            }
            println!("ffmpeg OK ({:?})", settings.ffmpeg);
        }
    }

    Ok(())
}

fn build_request(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    timeline: Option<PathBuf>,
    project: Option<PathBuf>,
) -> anyhow::Result<RenderRequest> {
    let project_path = match project {
        Some(path) => Some(path),
        None => {
            let default = PathBuf::from(config::DEFAULT_PROJECT_FILE);
            (timeline.is_none() && default.exists()).then_some(default)
        }
    };
    let project = match project_path {
        Some(path) => Some(ProjectFile::load(&path).context("Failed to load project")?),
        None => None,
    };

    let timeline = match (&timeline, &project) {
        (Some(path), _) => config::load_timeline(path).context("Failed to load timeline")?,
        (None, Some(p)) => p.timeline.clone(),
        (None, None) => bail!("no timeline given; pass --timeline or --project"),
    };
    let input = match (input, &project) {
        (Some(i), _) => i,
        (None, Some(p)) if !p.input.is_empty() => PathBuf::from(&p.input),
        _ => bail!("no input video given"),
    };
    let output = output
        .or_else(|| project.as_ref().map(|p| PathBuf::from(&p.output)))
        .unwrap_or_else(|| PathBuf::from("output.mp4"));

    Ok(RenderRequest::new(input, output, timeline))
}

async fn render(settings: &EngineSettings, request: RenderRequest, seed: Option<u64>) -> anyhow::Result<()> {
    for name in effects::validate_timeline(&request.timeline) {
        warn!("Unknown effect {:?} in timeline; it will be skipped", name);
    }

    let engine = Arc::new(FfmpegEngine::new(settings));
    let executor = PipelineExecutor::new(engine, settings);
    let mut rng = make_rng(seed);

    let summary = executor
        .render(&request, &mut rng)
        .await
        .with_context(|| format!("Render of {:?} failed", request.input))?;

    println!("Rendered {:?}", summary.output);
    for step in &summary.applied {
        println!("  {} (level {})", step.name, step.level);
    }
    if !summary.skipped.is_empty() {
        println!("  skipped: {}", summary.skipped.join(", "));
    }
    Ok(())
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn preview_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    input.with_file_name(format!("{}_preview.mp4", stem))
}
