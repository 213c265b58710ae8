//! # Lottie CLI
//!
//! Host for the playback engine on a terminal.
//!
//! ## Commands
//! - `info`: Summarize an animation file
//! - `render`: Write one frame as SVG or PNG
//! - `play`: Play in real time, optionally dumping every refreshed frame
//! - `debug`: Toggle the persisted verbose logging flag

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lottie_core::debug::DebugSettings;
use lottie_core::{Engine, EngineOptions, ManualScheduler, MonotonicClock, Player, SceneGraph};
use lottie_data::model::Animation;
use lottie_raster::RasterOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const CONTAINER_ID: &str = "lottie-stage";

#[derive(Parser)]
#[command(name = "lottie")]
#[command(about = "Plays and renders Lottie animations")]
#[command(version)]
struct Cli {
    /// Where the debug toggle is persisted
    #[arg(long, global = true, default_value = ".lottie-player.json")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a summary of an animation
    Info {
        /// Path to the animation JSON
        input: PathBuf,
    },

    /// Render a single frame
    Render {
        /// Path to the animation JSON
        input: PathBuf,

        /// Composition frame to render
        #[arg(short, long, default_value_t = 0.0)]
        frame: f32,

        /// Output file; `.png` rasterizes, anything else writes SVG
        #[arg(short, long)]
        out: PathBuf,

        /// Pixel scale for PNG output
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
    },

    /// Play in real time
    Play {
        /// Path to the animation JSON
        input: PathBuf,

        /// Refresh rate of the host loop
        #[arg(long, default_value_t = 60.0)]
        refresh: f64,

        /// Seconds to play; one loop when omitted
        #[arg(short, long)]
        duration: Option<f64>,

        /// Write each refreshed frame as SVG into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Enable, disable or show verbose engine logging
    Debug {
        #[arg(value_enum, default_value_t = Toggle::Status)]
        toggle: Toggle,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken settings file must not keep the player from starting.
    let settings = DebugSettings::load(&cli.settings);
    let verbose = settings.as_ref().map(|s| s.verbose).unwrap_or(false);
    let default_filter = if verbose {
        "lottie=trace,lottie_core=debug,lottie_cli=debug"
    } else {
        "lottie_core=warn,lottie_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match &settings {
        Ok(settings) => settings.apply(),
        Err(e) => tracing::warn!(path = %cli.settings.display(), "ignoring debug settings: {e}"),
    }

    match cli.command {
        Commands::Info { input } => cmd_info(&input),
        Commands::Render {
            input,
            frame,
            out,
            scale,
        } => cmd_render(&input, frame, &out, scale),
        Commands::Play {
            input,
            refresh,
            duration,
            out_dir,
        } => cmd_play(&input, refresh, duration, out_dir.as_deref()),
        Commands::Debug { toggle } => cmd_debug(&cli.settings, toggle),
    }
}

fn load_animation(path: &Path) -> Result<Animation> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Animation::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}

fn mount(animation: Animation) -> Result<Engine> {
    let scene = SceneGraph::with_container(animation.w, animation.h, CONTAINER_ID);
    let engine = Engine::mount(animation, scene, CONTAINER_ID, EngineOptions::default())?;
    Ok(engine)
}

fn cmd_info(input: &Path) -> Result<()> {
    let animation = load_animation(input)?;
    let engine = mount(animation)?;
    let animation = engine.animation();
    let model = engine.model();

    println!("Name:       {}", animation.nm.as_deref().unwrap_or("unnamed"));
    if let Some(version) = &animation.v {
        println!("Version:    {version}");
    }
    println!("Canvas:     {}x{}", animation.w, animation.h);
    println!("Frame rate: {}", animation.fr);
    println!(
        "Frames:     {}..{} ({:.2}s)",
        animation.ip,
        animation.op,
        animation.total_frames() / animation.fr.max(f32::EPSILON)
    );
    println!("Layers:     {} top level, {} mounted", animation.layers.len(), model.slots.len());
    println!("Assets:     {}", animation.assets.len());
    println!("Drawables:  {}", model.drawables.len());
    Ok(())
}

fn cmd_render(input: &Path, frame: f32, out: &Path, scale: f32) -> Result<()> {
    let mut engine = mount(load_animation(input)?)?;
    let is_png = out
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));

    if is_png {
        let options = RasterOptions {
            scale,
            background: None,
        };
        let png = lottie_raster::render_frame_png(&mut engine, frame, &options)?;
        std::fs::write(out, png).with_context(|| format!("writing {}", out.display()))?;
    } else {
        engine.render_frame(frame);
        std::fs::write(out, engine.scene().to_svg_string())
            .with_context(|| format!("writing {}", out.display()))?;
    }
    tracing::info!(frame, out = %out.display(), "frame written");
    Ok(())
}

fn cmd_play(input: &Path, refresh: f64, duration: Option<f64>, out_dir: Option<&Path>) -> Result<()> {
    if !(refresh.is_finite() && refresh > 0.0) {
        bail!("refresh rate must be positive, got {refresh}");
    }
    let engine = mount(load_animation(input)?)?;
    let loop_seconds = engine.animation().total_frames() as f64 / engine.animation().fr.max(1.0) as f64;
    let seconds = duration.unwrap_or(loop_seconds);
    if !(seconds.is_finite() && seconds >= 0.0) {
        bail!("duration must be a non-negative number of seconds, got {seconds}");
    }
    let duration = Duration::from_secs_f64(seconds);
    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut player = Player::new(engine, MonotonicClock::new(), ManualScheduler::new());
    let interval = Duration::from_secs_f64(1.0 / refresh);
    let started = Instant::now();
    let mut refreshes = 0u64;

    player.play();
    while started.elapsed() < duration {
        std::thread::sleep(interval);
        while let Some(id) = player.scheduler_mut().take_pending() {
            player.on_tick(id);
        }
        refreshes += 1;

        if let Some(dir) = out_dir {
            let path = dir.join(format!("frame_{refreshes:05}.svg"));
            std::fs::write(&path, player.engine().scene().to_svg_string())
                .with_context(|| format!("writing {}", path.display()))?;
        }
        tracing::debug!(frame = player.current_frame(), "refresh");
    }
    player.pause();

    tracing::info!(
        refreshes,
        seconds = started.elapsed().as_secs_f64(),
        last_frame = player.current_frame(),
        "playback finished"
    );
    Ok(())
}

fn cmd_debug(path: &Path, toggle: Toggle) -> Result<()> {
    let mut settings = DebugSettings::load(path)?;
    match toggle {
        Toggle::On => settings.verbose = true,
        Toggle::Off => settings.verbose = false,
        Toggle::Status => {
            println!("verbose logging: {}", if settings.verbose { "on" } else { "off" });
            return Ok(());
        }
    }
    settings.store(path)?;
    println!(
        "verbose logging {} ({})",
        if settings.verbose { "enabled" } else { "disabled" },
        path.display()
    );
    Ok(())
}
