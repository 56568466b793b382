#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that replays or streams a match into the spectator.

mod config;
mod headless;
mod ws;

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use spectator_rendering::{Color, FrameControl, Presentation, RenderingBackend, Scene};
use spectator_rendering_macroquad::MacroquadBackend;
use spectator_session::{ReplayTransport, Session, Transport};
use spectator_system_playback::SystemClock;
use spectator_world::query;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use self::{config::SpectatorConfig, headless::HeadlessBackend, ws::WsTransport};

const HEADLESS_FRAME_INTERVAL: Duration = Duration::from_millis(16);
const BACKGROUND: Color = Color::from_rgb_u8(0, 0, 0);

/// Replay spectator for recorded or live matches.
#[derive(Parser, Debug)]
#[command(name = "spectator", version)]
#[command(about = "Watch a recorded or live match round by round", long_about = None)]
struct Cli {
    /// Configuration file; defaults to ./spectator.toml when present.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Milliseconds between two rounds.
    #[arg(long)]
    ms_per_round: Option<u64>,

    /// Round after which no further rounds are requested.
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Run without a window, logging progress instead.
    #[arg(long)]
    headless: bool,

    #[command(subcommand)]
    source: Source,
}

/// Where match events come from.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Source {
    /// Replay a recorded stream (JSON lines or a JSON array of envelopes).
    Replay {
        /// Recording to play back.
        file: PathBuf,
    },
    /// Connect to a replay stream server.
    Stream {
        /// WebSocket endpoint; defaults to the configured stream URL.
        url: Option<String>,

        /// Replay identifier appended as the `id` query parameter.
        #[arg(long)]
        id: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = SpectatorConfig::load(cli.config.as_deref())?;
    if let Some(ms_per_round) = cli.ms_per_round {
        config.playback.ms_per_round = ms_per_round;
    }
    if let Some(max_rounds) = cli.max_rounds {
        config.playback.max_rounds = max_rounds;
    }

    let transport = open_transport(&cli.source, &config)?;
    run(&config, transport, cli.headless)
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}

fn open_transport(source: &Source, config: &SpectatorConfig) -> Result<Box<dyn Transport>> {
    match source {
        Source::Replay { file } => {
            let transport = ReplayTransport::open(file)
                .with_context(|| format!("failed to open replay {}", file.display()))?;
            info!(path = %file.display(), messages = transport.remaining(), "replaying recording");
            Ok(Box::new(transport))
        }
        Source::Stream { url, id } => {
            let base = url.as_deref().unwrap_or(&config.stream.url);
            let url = ws::stream_url(base, id.as_deref());
            Ok(Box::new(WsTransport::connect(&url)?))
        }
    }
}

fn run(config: &SpectatorConfig, mut transport: Box<dyn Transport>, headless: bool) -> Result<()> {
    let mut session = Session::new(config.session_config(), SystemClock::new());
    session
        .start(transport.as_mut())
        .context("failed to send the initial pull request")?;

    let update = move |_delta: Duration, scene: &mut Scene| {
        frame(&mut session, transport.as_mut(), scene, headless)
    };
    let presentation = Presentation::new(config.window.title.clone(), BACKGROUND, Scene::new());

    if headless {
        HeadlessBackend::new(HEADLESS_FRAME_INTERVAL).run(presentation, update)
    } else {
        MacroquadBackend::new()
            .with_vsync(config.window.vsync)
            .with_show_fps(config.window.show_fps)
            .with_window_size(config.window.width, config.window.height)
            .run(presentation, update)
            .context("rendering backend failed")
    }
}

/// Pumps the session once; a stopped session closes headless runs and keeps
/// the final frame on screen otherwise.
fn frame(
    session: &mut Session<SystemClock>,
    transport: &mut dyn Transport,
    scene: &mut Scene,
    exit_when_stopped: bool,
) -> FrameControl {
    match session.pump(transport, scene) {
        Ok(Some(report)) => {
            if report.requested {
                debug!(
                    round = report.round,
                    units = query::unit_count(session.world()),
                    effects = report.drawn.effects,
                    "requested next round"
                );
            }
            FrameControl::Continue
        }
        Ok(None) if exit_when_stopped => {
            let world = session.world();
            let summary = query::match_summary(world);
            info!(
                round = query::current_round(world),
                winner = summary.winner.as_deref().unwrap_or("undecided"),
                reason = ?session.stop_reason(),
                "playback finished"
            );
            FrameControl::Exit
        }
        Ok(None) => FrameControl::Continue,
        Err(err) => {
            error!(error = %err, "transport failed");
            FrameControl::Exit
        }
    }
}
