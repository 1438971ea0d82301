//! # heks_app: demo runner
//!
//! Runs a small scripted scene headlessly: a player sprite walks across a room
//! larger than the screen while a viewport follows it. Draw calls go to a
//! surface that only logs them.
//!
//! ## Usage
//!
//! ```text
//! heks_app [--config engine.json] [--frames 120] [--fps 30]
//! ```
//!
//! Set `RUST_LOG=heks_engine=debug` to see engine lifecycle logs.

mod scene;
mod surface;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use heks_engine::{Engine, EngineConfig, GameLoopRunner, IntervalScheduler, Keyboard, Renderer};
use surface::LogSurface;

#[derive(Parser)]
#[command(name = "heks_app", about = "Run the heks demo scene")]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of frames to run, overriding the config (0 = until stopped)
    #[arg(short, long)]
    frames: Option<u64>,

    /// Target frames per second, overriding the config
    #[arg(long, value_parser = parse_fps)]
    fps: Option<f64>,
}

fn parse_fps(value: &str) -> Result<f64, String> {
    let fps: f64 = value.parse().map_err(|e| format!("{e}"))?;
    if !fps.is_finite() || fps <= 0.0 {
        return Err(format!("fps must be a positive number, got {value}"));
    }
    Ok(fps)
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    EngineConfig::from_json_str(&json)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("heks_app=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default().with_max_frames(scene::DEFAULT_FRAMES),
    };
    if let Some(frames) = args.frames {
        config = config.with_max_frames(frames);
    }
    if let Some(fps) = args.fps {
        config = config.with_target_fps(fps);
    }
    info!(
        width = config.size.width,
        height = config.size.height,
        fps = config.target_fps,
        frames = config.max_frames,
        "engine configured"
    );

    let mut engine = Engine::builder(config.clone())
        .with_module(Keyboard::new())
        .with_module(Renderer::new(LogSurface::new(config.scale)))
        .build()?;
    let player = scene::setup(&mut engine)?;

    let mut scheduler = IntervalScheduler::new(config.target_fps);
    let mut runner = GameLoopRunner::new();
    runner
        .run(&mut engine, &mut scheduler, config.max_frames)
        .await?;

    let position = engine.get_value_of_component_for_entity(&player, "position")?;
    let draws = engine
        .module::<Renderer<LogSurface>>()
        .map_or(0, |renderer| renderer.surface().draw_calls());
    info!(
        steps = runner.steps,
        fps = runner.fps(),
        draws,
        position = ?position,
        "demo finished"
    );
    Ok(())
}
