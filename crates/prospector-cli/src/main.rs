//! `prospector` – command line front end for the rover pipeline.
//!
//! Subcommands:
//!
//! - `classify <IMAGE>` – run perception once on a saved camera frame and
//!   print what was seen; optionally write the vision overlay.
//! - `replay <LOG>` – drive the full perceive/decide loop over a simulator
//!   recording (`robot_log.csv` plus its `IMG/` directory) and write the
//!   resulting world map.
//! - `config` – print the effective configuration, or `--init` a default
//!   `prospector.toml`.
//!
//! Logging goes through `tracing` (see `prospector_runtime::telemetry`);
//! user-facing results are printed to stdout.

mod config;
mod replay;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use colored::Colorize;
use image::RgbImage;
use prospector_perception::{Channel, ObservationSummary, PerceptionStep};
use prospector_runtime::{Mode, RoverLoop, init_tracing};
use prospector_types::{Pose, ProspectorError};
use tracing::{info, warn};

/// Camera resolution of the simulator; other sizes are re-planned on the fly.
const SIM_FRAME: (u32, u32) = (320, 160);

#[derive(Parser)]
#[command(name = "prospector", version, about = "Rover perception and drive pipeline")]
struct Cli {
    /// Config file (default: ./prospector.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a single camera frame.
    Classify {
        image: PathBuf,
        /// Rover world x position.
        #[arg(long, default_value_t = 100.0)]
        x: f32,
        /// Rover world y position.
        #[arg(long, default_value_t = 100.0)]
        y: f32,
        /// Rover heading in degrees.
        #[arg(long, default_value_t = 0.0)]
        yaw: f32,
        /// Write the obstacle/rock/navigable overlay here.
        #[arg(long)]
        vision_out: Option<PathBuf>,
        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Replay a simulator recording through the rover loop.
    Replay {
        /// `robot_log.csv` written by the simulator.
        log: PathBuf,
        /// Directory holding the frames; defaults to the paths in the log.
        #[arg(long)]
        frames_dir: Option<PathBuf>,
        /// Rate the recording is replayed at, in ticks per second.
        #[arg(long, default_value_t = 25.0)]
        tick_hz: f64,
        /// Write the final world map image here.
        #[arg(long)]
        map_out: Option<PathBuf>,
    },
    /// Show or initialise the configuration.
    Config {
        /// Write the defaults to the config path if no file exists there.
        #[arg(long)]
        init: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing("prospector");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ProspectorError> {
    let path = config::config_path(cli.config.as_deref());
    match cli.command {
        Command::Classify {
            image,
            x,
            y,
            yaw,
            vision_out,
            json,
        } => classify(&path, &image, Pose::new(x, y, yaw), vision_out.as_deref(), json),
        Command::Replay {
            log,
            frames_dir,
            tick_hz,
            map_out,
        } => replay_log(&path, &log, frames_dir.as_deref(), tick_hz, map_out.as_deref()),
        Command::Config { init } => show_config(&path, init),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// classify
// ─────────────────────────────────────────────────────────────────────────────

fn classify(
    config_path: &Path,
    image: &Path,
    pose: Pose,
    vision_out: Option<&Path>,
    json: bool,
) -> Result<(), ProspectorError> {
    let cfg = config::load(config_path)?;
    let frame = load_frame(image)?;
    let mut step = PerceptionStep::new(cfg.perception, frame.width(), frame.height())?;
    let mut map = step.new_world_map();
    let output = step.run(&frame, &pose, &mut map);
    let summary = ObservationSummary::of(&output.observations);

    if json {
        let raw = serde_json::to_string_pretty(&summary)
            .map_err(|e| ProspectorError::Io(format!("failed to encode summary: {e}")))?;
        println!("{raw}");
    } else {
        print_banner();
        println!("  {} {}", "Frame".bold(), image.display());
        println!(
            "  navigable {:>6} px   mean {}",
            summary.navigable_pixels.to_string().blue(),
            fmt_angle(summary.navigable_mean_deg)
        );
        println!(
            "  obstacle  {:>6} px",
            summary.obstacle_pixels.to_string().red()
        );
        println!(
            "  rock      {:>6} px   mean {}",
            summary.rock_pixels.to_string().yellow(),
            fmt_angle(summary.rock_mean_deg)
        );
        println!("  map updated: {}", output.map_updated);
    }

    if let Some(out) = vision_out {
        save_image(&output.vision, out)?;
        info!(path = %out.display(), "vision overlay written");
    }
    Ok(())
}

fn fmt_angle(deg: Option<f32>) -> String {
    deg.map_or_else(|| "-".dimmed().to_string(), |d| format!("{d:+.1}°"))
}

// ─────────────────────────────────────────────────────────────────────────────
// replay
// ─────────────────────────────────────────────────────────────────────────────

fn replay_log(
    config_path: &Path,
    log: &Path,
    frames_dir: Option<&Path>,
    tick_hz: f64,
    map_out: Option<&Path>,
) -> Result<(), ProspectorError> {
    if !tick_hz.is_finite() || tick_hz <= 0.0 {
        return Err(ProspectorError::invalid_config(
            "tick_hz",
            format!("must be a positive rate, got {tick_hz}"),
        ));
    }
    let cfg = config::load(config_path)?;
    let text = std::fs::read_to_string(log)
        .map_err(|e| ProspectorError::Io(format!("failed to read {}: {e}", log.display())))?;
    let records = replay::parse_log(&text, &log.display().to_string())?;
    let log_dir = log.parent().unwrap_or(Path::new("."));

    print_banner();
    println!(
        "  Replaying {} frames from {} at {tick_hz} Hz\n",
        records.len().to_string().bold(),
        log.display()
    );

    let mut rover = RoverLoop::new(cfg.perception, cfg.drive, SIM_FRAME.0, SIM_FRAME.1)?;
    let t0 = Instant::now();
    let mut ticks = 0usize;
    let mut skipped = 0usize;
    let mut rejected = 0usize;
    let mut last_mode: Option<Mode> = None;

    for (i, record) in records.iter().enumerate() {
        let frame_path = record.frame_path(log_dir, frames_dir);
        let frame = match load_frame(&frame_path) {
            Ok(f) => f,
            Err(e) => {
                warn!(frame = %frame_path.display(), error = %e, "skipping frame");
                skipped += 1;
                continue;
            }
        };
        let now = t0 + Duration::from_secs_f64(i as f64 / tick_hz);
        let out = rover.tick(&frame, &record.telemetry(), now);
        ticks += 1;
        if out.rejected.is_some() {
            rejected += 1;
        }
        if last_mode.is_none_or(|m| !m.same_kind(&out.mode)) {
            let driver = record
                .recorded_steer
                .map_or_else(String::new, |s| format!(" (driver {s:+.1})"));
            println!(
                "  [{:>6.2}s] {} throttle {:+.2} brake {:.1} steer {:+.1}{}",
                i as f64 / tick_hz,
                out.mode.to_string().cyan().bold(),
                out.command.throttle,
                out.command.brake,
                out.command.steer,
                driver.dimmed()
            );
            last_mode = Some(out.mode);
        }
    }

    let map = rover.map();
    println!();
    println!("  {} {ticks} ticks, {skipped} skipped, {rejected} rejected", "Done:".green().bold());
    println!(
        "  map cells: navigable {}  obstacle {}  rock {}",
        map.channel_count(Channel::Navigable).to_string().blue(),
        map.channel_count(Channel::Obstacle).to_string().red(),
        map.channel_count(Channel::Rock).to_string().yellow()
    );

    if let Some(out) = map_out {
        save_image(&map.to_image(), out)?;
        println!("  map written to {}", out.display().to_string().bold());
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// config
// ─────────────────────────────────────────────────────────────────────────────

fn show_config(path: &Path, init: bool) -> Result<(), ProspectorError> {
    if init {
        if path.exists() {
            println!("  {} already exists; leaving it untouched.", path.display());
        } else {
            config::save_to(&config::Config::default(), path)?;
            println!("  {} {}", "Wrote".green(), path.display().to_string().bold());
        }
        return Ok(());
    }

    let cfg = config::load(path)?;
    let raw = toml::to_string_pretty(&cfg)
        .map_err(|e| ProspectorError::Io(format!("failed to serialize config: {e}")))?;
    println!("# effective configuration ({})", path.display());
    print!("{raw}");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// helpers
// ─────────────────────────────────────────────────────────────────────────────

fn load_frame(path: &Path) -> Result<RgbImage, ProspectorError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| ProspectorError::Image(format!("{}: {e}", path.display())))
}

fn save_image(img: &RgbImage, path: &Path) -> Result<(), ProspectorError> {
    img.save(path)
        .map_err(|e| ProspectorError::Image(format!("{}: {e}", path.display())))
}

fn print_banner() {
    println!();
    println!("{}", "  ╔═╗╦═╗╔═╗╔═╗╔═╗╔═╗╔╦╗╔═╗╦═╗".bold().yellow());
    println!("{}", "  ╠═╝╠╦╝║ ║╚═╗╠═╝║╣  ║ ║ ║╠╦╝".bold().yellow());
    println!("{}", "  ╩  ╩╚═╚═╝╚═╝╩  ╚═╝ ╩ ╚═╝╩╚═".bold().yellow());
    println!(
        "  {} v{}",
        "Rover Prospector".bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
}
