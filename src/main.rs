//! mkd-replay - inspect, render and rehearse recorded sessions
//!
//! # Commands
//!
//! - `mkd-replay info <dir>` - Print a JSON summary of a recording
//! - `mkd-replay render <dir>` - Render annotated frames to PNG
//! - `mkd-replay rehearse <dir>` - Run action replay against a simulated device

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mkd_replay::config::Config;
use mkd_replay::replay::{
    ActionExecutor, ActionReplayEngine, ChannelKeyListener, ChannelObserver, ReplayEvent,
    ReplayManager, ReplayMode, SafetyMonitor, SimulatedInput,
};
use mkd_replay::util;

#[derive(Parser)]
#[command(name = "mkd-replay")]
#[command(about = "Action and visual replay of recorded sessions")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to ~/.mkd)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log to stderr at info level instead of the log file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a JSON summary of a recording
    Info {
        /// Recording directory (relative names are also looked up under
        /// <data-dir>/recordings)
        dir: PathBuf,
    },

    /// Render annotated frames to PNG files
    Render(RenderArgs),

    /// Replay actions against a simulated input device
    Rehearse(RehearseArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Recording directory
    dir: PathBuf,

    /// Frame to render
    #[arg(long, conflicts_with = "all", requires = "out")]
    frame: Option<usize>,

    /// Output file for --frame
    #[arg(long)]
    out: Option<PathBuf>,

    /// Render every frame
    #[arg(long, requires = "out_dir")]
    all: bool,

    /// Output directory for --all
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Args)]
struct RehearseArgs {
    /// Recording directory
    dir: PathBuf,

    /// Playback speed multiplier
    #[arg(long)]
    speed: Option<f64>,

    /// Use the fixed inter-action delay instead of recorded timing
    #[arg(long)]
    fixed_timing: bool,

    /// Skip mouse-move actions
    #[arg(long)]
    skip_moves: bool,

    /// Stop after this many seconds (0 = unlimited)
    #[arg(long)]
    max_duration: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    util::init_data_dir(cli.data_dir.clone());
    init_logging(cli.verbose)?;

    let config = Config::load();

    match cli.command {
        Commands::Info { dir } => info(&config, util::resolve_recording_path(&dir)),
        Commands::Render(mut args) => {
            args.dir = util::resolve_recording_path(&args.dir);
            render(&config, args)
        }
        Commands::Rehearse(mut args) => {
            args.dir = util::resolve_recording_path(&args.dir);
            rehearse(&config, args).await
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    if verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            )
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    // Initialize logging to file (~/.mkd/logs/mkd-replay.log)
    fs::create_dir_all(util::logs_dir())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(util::log_file_path())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(log_file)
        .with_ansi(false) // Disable ANSI colors in log file
        .init();
    Ok(())
}

fn simulated_engine() -> (ActionReplayEngine, SimulatedInput, ChannelKeyListener) {
    let input = SimulatedInput::new();
    let keys = ChannelKeyListener::new();
    let engine = ActionReplayEngine::new(
        ActionExecutor::new(Arc::new(input.clone())),
        SafetyMonitor::new(Arc::new(keys.clone())),
    );
    (engine, input, keys)
}

fn load(config: &Config, engine: ActionReplayEngine, dir: &Path) -> Result<ReplayManager> {
    let mut manager = ReplayManager::new(engine).with_visual(config.visual_engine());
    if !manager.load_recording(dir) {
        bail!(
            "{} is not a recording (no screenshots or actions found)",
            dir.display()
        );
    }
    Ok(manager)
}

fn info(config: &Config, dir: PathBuf) -> Result<()> {
    let (engine, _, _) = simulated_engine();
    let manager = load(config, engine, &dir)?;
    let info = manager
        .get_recording_info()
        .context("recording info unavailable")?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn render(config: &Config, args: RenderArgs) -> Result<()> {
    let mut visual = config.visual_engine();
    if !visual
        .load_recording(&args.dir)
        .with_context(|| format!("failed to load {}", args.dir.display()))?
    {
        bail!("{} has no screenshots", args.dir.display());
    }

    match (args.frame, args.out, args.all, args.out_dir) {
        (Some(frame), Some(out), false, _) => {
            visual.render_frame_to(frame, &out)?;
            println!("Rendered frame {frame} to {}", out.display());
        }
        (None, _, true, Some(out_dir)) => {
            fs::create_dir_all(&out_dir)?;
            for frame in 0..visual.frame_count() {
                visual.render_frame_to(frame, &out_dir.join(format!("frame_{frame:04}.png")))?;
            }
            println!(
                "Rendered {} frames to {}",
                visual.frame_count(),
                out_dir.display()
            );
        }
        _ => bail!("pass either --frame N --out FILE or --all --out-dir DIR"),
    }
    Ok(())
}

/// Run action replay against [`SimulatedInput`]. Nothing reaches real
/// devices; Ctrl-C acts as the emergency stop key. Failed actions are always
/// skipped since nobody is around to resume a paused rehearsal.
async fn rehearse(config: &Config, args: RehearseArgs) -> Result<()> {
    let (engine, input, keys) = simulated_engine();
    let (observer, mut events) = ChannelObserver::new();
    let engine = engine
        .with_observer(Arc::new(observer))
        .with_confirmation(Arc::new(|_, count| {
            tracing::info!(count, "Rehearsal uses a simulated device; starting without prompt");
            true
        }));
    let mut manager = load(config, engine, &args.dir)?;

    let mut options = config.replay.clone();
    options.pause_on_error = false;
    if let Some(speed) = args.speed {
        options.playback_speed = speed;
    }
    if args.fixed_timing {
        options.use_original_timing = false;
    }
    if args.skip_moves {
        options.skip_mouse_moves = true;
    }
    if let Some(secs) = args.max_duration {
        options.max_duration = Duration::try_from_secs_f64(secs).ok().filter(|d| !d.is_zero());
    }

    let emergency_key = options.emergency_stop_key.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            keys.press(emergency_key);
        }
    });

    manager.launch_replay(ReplayMode::Action, options)?;

    let mut poll = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            Some(event) = events.recv() => report(&event),
            _ = poll.tick() => {
                if manager.action_engine().status().is_terminal() {
                    break;
                }
            }
        }
    }
    let status = manager.action_engine_mut().wait().await;
    while let Ok(event) = events.try_recv() {
        report(&event);
    }
    ctrl_c.abort();

    let engine = manager.action_engine();
    let device = input.device();
    println!("Status: {status}");
    println!(
        "Processed {}/{} actions ({} executed, {} device calls)",
        engine.current_action_index(),
        engine.actions().len(),
        engine.executor().invocation_count(),
        input.call_count()
    );
    println!(
        "Final cursor ({}, {}), typed {:?}, scrolled ({}, {})",
        device.cursor.0, device.cursor.1, device.typed, device.scrolled.0, device.scrolled.1
    );
    Ok(())
}

fn report(event: &ReplayEvent) {
    match event {
        ReplayEvent::Progress { fraction, action } => {
            println!("[{:>5.1}%] {} @ {:.2}s", fraction * 100.0, action.kind, action.timestamp);
        }
        ReplayEvent::ActionSkipped { index, action } => {
            println!("skipped action {} ({})", index + 1, action.kind);
        }
        ReplayEvent::Error(message) => eprintln!("error: {message}"),
        ReplayEvent::Complete => println!("complete"),
        ReplayEvent::VisualFeedback(_) => {}
    }
}
