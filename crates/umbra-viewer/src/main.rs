//! Umbra Viewer - open a scene in an interactive window
//!
//! Usage:
//!   umbra-viewer <scene.toml> [--width <px>] [--height <px>] [--shadow-resolution <texels>]
//!                [--no-shadows] [--no-post] [--snapshot-dir <dir>] [--log-level <filter>]

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use umbra_render::RendererConfig;
use umbra_scene::load_scene;
use umbra_viewer::{ViewerApp, ViewerOptions};
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser)]
#[command(name = "umbra-viewer")]
#[command(about = "Umbra viewer - real-time shadowed rendering of a scene file")]
struct Args {
    /// Path to scene file
    scene: PathBuf,

    /// Window width in pixels
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Window height in pixels
    #[arg(long, default_value_t = 768)]
    height: u32,

    /// Shadow map edge length in texels [default: 2048]
    #[arg(long)]
    shadow_resolution: Option<u32>,

    /// Start with shadows off (F4 toggles)
    #[arg(long)]
    no_shadows: bool,

    /// Disable exposure and fog in the composite pass
    #[arg(long)]
    no_post: bool,

    /// Directory F12 writes depth and height map snapshots to
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "umbra_render=debug,wgpu=warn" [default: RUST_LOG or info]
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(filter: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    match filter.map(str::to_owned).or_else(|| std::env::var("RUST_LOG").ok()) {
        Some(filter) => {
            builder.parse_filters(&filter);
        }
        None => {
            builder.filter_level(log::LevelFilter::Info);
        }
    }
    builder.init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let scene_file = load_scene(&args.scene)
        .with_context(|| format!("Failed to load scene '{}'", args.scene.display()))?;

    // Defaults, then the scene's [render] table, then the command line
    let mut config = RendererConfig::default();
    config.apply_scene(&scene_file);
    if let Some(resolution) = args.shadow_resolution {
        config.shadow_resolution = resolution;
    }
    if args.no_shadows {
        config.shadows = false;
    }
    if args.no_post {
        config.post.enabled = false;
    }
    anyhow::ensure!(
        args.width > 0 && args.height > 0,
        "Window size must be non-zero, got {}x{}",
        args.width,
        args.height
    );
    anyhow::ensure!(config.shadow_resolution > 0, "Shadow resolution must be non-zero");

    log::info!("Loaded scene: {}", scene_file.scene.name);
    log::info!("Controls:");
    log::info!("  Left drag  - Look");
    log::info!("  WASD / QE  - Move / down, up (Shift: faster)");
    log::info!("  1-6        - Debug view");
    log::info!("  Keypad +/- - Day/night cycle");
    log::info!("  F4         - Toggle shadows");
    log::info!("  F12        - Write depth snapshots");
    log::info!("  Escape     - Exit");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let options = ViewerOptions {
        scene_path: args.scene,
        width: args.width,
        height: args.height,
        config,
        snapshot_dir: args.snapshot_dir,
    };
    let mut app = ViewerApp::new(options, scene_file);
    event_loop.run_app(&mut app)?;

    match app.take_failure() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
