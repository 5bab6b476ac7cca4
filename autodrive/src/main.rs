use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use autodrive::autopilot::{AutopilotConfig, AutopilotController};
use autodrive::car::CarParams;
use autodrive::radar::RadarDistances;
use autodrive::session::DrivingSession;
use autodrive::track::TrackFile;
use drive_protocol::ControlCommands;
use predictor_client::HttpPredictor;

/// Headless driving session runner. Drives a car around a track with either
/// the autopilot (against a live predictor) or a built-in scripted driver,
/// and exports the recorded telemetry as JSON.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Track file (JSON) to drive on.
    #[arg(long, default_value = "autodrive/tracks/practice-loop.json")]
    track: PathBuf,

    /// Predictor base URL. Omit to use the scripted driver.
    #[arg(long)]
    predictor: Option<String>,

    /// Session length in seconds.
    #[arg(long, default_value_t = 30.0)]
    duration: f64,

    /// Tick interval in milliseconds.
    #[arg(long, default_value_t = 16.0)]
    tick_ms: f64,

    /// Where to write the telemetry JSON.
    #[arg(long, default_value = "telemetry.json")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autodrive=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let track = TrackFile::load(&cli.track)?.into_track();
    info!(track = %track.name, start = ?track.start, "loaded track");

    let mut session = DrivingSession::new(track, CarParams::default());
    let mut autopilot = cli.predictor.as_ref().map(|url| {
        info!(predictor = %url, "autopilot enabled");
        AutopilotController::new(HttpPredictor::new(url.clone()), AutopilotConfig::default())
    });

    // Pace real time only when a live predictor is involved; scripted runs
    // can go as fast as the machine allows.
    let mut ticker = autopilot
        .is_some()
        .then(|| tokio::time::interval(Duration::from_secs_f64(cli.tick_ms / 1000.0)));

    let total_ticks = (cli.duration * 1000.0 / cli.tick_ms).ceil() as u64;
    let mut collisions = 0u32;

    for _ in 0..total_ticks {
        if let Some(ticker) = ticker.as_mut() {
            ticker.tick().await;
        }

        let controls = match autopilot.as_mut() {
            Some(controller) => controller
                .control(
                    session.distances(),
                    session.car().speed(),
                    session.elapsed_ms(),
                )
                .unwrap_or_else(|error| {
                    warn!(%error, "autopilot failed this tick, applying safe default");
                    ControlCommands::SAFE_DEFAULT
                }),
            None => scripted_controls(session.distances(), session.car().speed()),
        };

        if session.step(cli.tick_ms, controls) {
            collisions += 1;
            info!(collisions, "car left the track, restarting");
            session.restart();
            if let Some(controller) = autopilot.as_mut() {
                controller.reset();
            }
        }
    }

    let json = session
        .recorder()
        .export_json()
        .context("failed to serialize telemetry")?;
    std::fs::write(&cli.output, json)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;

    info!(
        samples = session.recorder().len(),
        collisions,
        output = %cli.output.display(),
        "telemetry exported"
    );
    Ok(())
}

/// Deterministic fallback driver: hold forward, steer toward the clearer
/// side, shed speed when the center ray gets tight.
fn scripted_controls(distances: &RadarDistances, speed: f32) -> ControlCommands {
    let left_clear = (distances.far_left + distances.mid_left) / 2.0;
    let right_clear = (distances.far_right + distances.mid_right) / 2.0;

    let mut commands = ControlCommands {
        forward: true,
        ..ControlCommands::default()
    };

    if distances.center < 150.0 && speed > 80.0 {
        commands.forward = false;
        commands.backward = true;
    }

    let balance = right_clear - left_clear;
    if balance > 15.0 {
        commands.right = true;
    } else if balance < -15.0 {
        commands.left = true;
    }

    commands
}
