//! # Tapestry Main Entry Point
//!
//! Loads settings, sets up macroquad rendering, and runs the main game loop.

use clap::Parser;
use log::{error, info};
use macroquad::color::YELLOW;
use macroquad::time::{get_fps, get_frame_time};
use macroquad::window::{next_frame, request_new_screen_size, set_fullscreen};
use std::path::PathBuf;
use tapestry::{
    Game, HeadlessSurface, InputEvent, InputHandler, MacroquadSurface, Settings, Surface,
    TapestryResult,
};

/// Command line arguments for Tapestry.
#[derive(Parser, Debug)]
#[command(name = "tapestry")]
#[command(about = "A multi-genre RPG built on a stacked game state machine")]
#[command(version)]
struct Args {
    /// Settings file (JSON); defaults are used when it does not exist
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Random seed for world generation and encounters
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Show the state stack and frame rate on screen
    #[arg(long)]
    dev_mode: bool,

    /// Run this many frames without a window, then exit
    #[arg(long)]
    headless_frames: Option<u32>,
}

#[macroquad::main("Tapestry")]
async fn main() {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    info!("Starting Tapestry v{}", tapestry::VERSION);

    if let Err(e) = run(&args).await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

/// Initializes the logging system based on the specified log level.
///
/// `RUST_LOG` takes precedence over `--log-level` when set.
fn initialize_logging(log_level: &str) {
    #[cfg(feature = "dev-tools")]
    {
        use tracing_subscriber::EnvFilter;

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .format_timestamp_millis()
            .init();
    }
}

async fn run(args: &Args) -> TapestryResult<()> {
    let settings = Settings::load(&args.settings)?.normalized();
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);

    let mut game = Game::new(&settings, seed)?;

    match args.headless_frames {
        Some(frames) => {
            run_headless(&mut game, &settings, frames);
            Ok(())
        }
        None => {
            run_game_loop(&mut game, &settings, args.dev_mode).await;
            Ok(())
        }
    }
}

/// Drives `frames` frames against an in-memory surface.
fn run_headless(game: &mut Game, settings: &Settings, frames: u32) {
    info!("Running {} headless frames", frames);
    let mut surface = HeadlessSurface::new(settings.screen_width, settings.screen_height);
    let dt = 1.0 / settings.fps.max(1) as f32;

    // Start a run and take a few steps so every state gets exercised
    let script = [
        InputEvent::Confirm,
        InputEvent::Move(tapestry::Direction::East),
        InputEvent::Move(tapestry::Direction::East),
        InputEvent::Interact,
        InputEvent::Pause,
        InputEvent::Pause,
    ];

    for frame in 0..frames {
        surface.clear();
        let events: Vec<InputEvent> = script.get(frame as usize).copied().into_iter().collect();
        game.frame(&events, dt, &mut surface);
        if !game.is_running() {
            break;
        }
    }

    info!(
        "Headless run finished: stack {:?}, {} draw calls in last frame",
        game.state_manager().stack(),
        surface.commands().len()
    );
}

/// Main game loop implementation.
async fn run_game_loop(game: &mut Game, settings: &Settings, dev_mode: bool) {
    request_new_screen_size(settings.screen_width, settings.screen_height);
    set_fullscreen(settings.fullscreen);

    let input_handler = InputHandler::from_controls(&settings.controls);
    let mut surface = MacroquadSurface::new();

    while game.is_running() {
        let events = input_handler.poll();
        game.frame(&events, get_frame_time(), &mut surface);

        if dev_mode {
            draw_dev_overlay(game, &mut surface);
        }

        next_frame().await;
    }

    info!("Player quit the game");
}

fn draw_dev_overlay(game: &Game, surface: &mut dyn Surface) {
    let (_, height) = surface.size();
    let stack = game.state_manager().stack().join(" > ");
    surface.draw_text(
        &format!("FPS {}  |  {}", get_fps(), stack),
        10.0,
        height - 10.0,
        16.0,
        YELLOW,
    );
}
