mod assets;
mod config;
mod input;
mod renderer;

use std::fs::File;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use skyrun_core::config::SimConfig;
use skyrun_core::rng::SeededRandom;
use skyrun_core::{SimulationState, step};

use assets::Assets;
use config::ShellConfig;
use input::InputState;
use renderer::{Layout, Renderer, compose_frame};

/// Sleep between input polls. Shorter than any sensible tick.
const POLL_SLEEP: Duration = Duration::from_millis(2);

fn main() -> ExitCode {
    let shell = match ShellConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("skyrun: {e}");
            return ExitCode::FAILURE;
        },
    };

    // stdout is the game screen, so logs go to a file.
    if let Err(e) = init_logging(&shell.log_file) {
        eprintln!(
            "skyrun: cannot open log file {}: {e}, logging disabled",
            shell.log_file.display()
        );
    }

    let config = match SimConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            eprintln!("skyrun: {e}");
            return ExitCode::FAILURE;
        },
    };

    let layout = Layout::new(&config.view, &shell);
    let player_cells = layout.cells_for(config.physics.player_width, config.physics.player_height);
    let tile_cells = layout.cells_for(config.world.block_size, config.world.block_size);
    let assets = match Assets::load(&shell.assets_dir, player_cells, tile_cells) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("Asset load failed: {e}");
            eprintln!("skyrun: {e}");
            return ExitCode::FAILURE;
        },
    };

    let mut rng = SeededRandom::from_optional_seed(config.world.seed);
    tracing::info!(
        seed = rng.seed(),
        tick_rate_hz = shell.tick_rate_hz,
        time_scaled = shell.time_scaled,
        "Starting run"
    );
    let mut state = SimulationState::new(config, &mut rng);

    let mut renderer = Renderer::new();
    let mut input = InputState::new();
    match renderer.init() {
        Ok(enhanced) => input.honor_release = enhanced,
        Err(e) => {
            // Raw mode may already be on.
            let _ = renderer.cleanup();
            tracing::error!("Terminal init failed: {e}");
            eprintln!("skyrun: terminal init failed: {e}");
            return ExitCode::FAILURE;
        },
    }

    let result = game_loop(
        &mut state,
        &mut rng,
        &mut renderer,
        &mut input,
        &shell,
        &layout,
        &assets,
    );

    if let Err(e) = renderer.cleanup() {
        eprintln!("skyrun: terminal cleanup failed: {e}");
    }

    tracing::info!(
        ticks = state.tick,
        distance = state.distance_blocks(),
        "Run ended"
    );

    match result {
        Ok(()) => {
            println!(
                "Distance: {} blocks ({} ticks, seed {})",
                state.distance_blocks(),
                state.tick,
                rng.seed()
            );
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!("Terminal I/O error: {e}");
            eprintln!("skyrun: {e}");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn game_loop(
    state: &mut SimulationState,
    rng: &mut SeededRandom,
    renderer: &mut Renderer,
    input: &mut InputState,
    shell: &ShellConfig,
    layout: &Layout,
    assets: &Assets,
) -> std::io::Result<()> {
    let tick_rate = shell.tick_duration();
    let mut last_tick = Instant::now();

    renderer.present(compose_frame(state, assets, layout))?;

    loop {
        input.drain_events()?;
        if input.quit_requested() {
            return Ok(());
        }

        let elapsed = last_tick.elapsed();
        if elapsed >= tick_rate {
            last_tick = Instant::now();
            let frame_input = input.frame_input();
            let dt = shell.dt_for(elapsed);
            step(state, &frame_input, dt, rng);
            renderer.present(compose_frame(state, assets, layout))?;
        }

        std::thread::sleep(POLL_SLEEP);
    }
}
