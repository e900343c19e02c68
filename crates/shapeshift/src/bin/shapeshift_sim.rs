//! # SHAPESHIFT Headless Simulator
//!
//! Runs a level without any window, saves halfway, finishes the run, then
//! reloads the save and replays the second half to check that it ends in
//! the same state.
//!
//! ```bash
//! shapeshift_sim [seconds] [level] [config.toml]
//! RUST_LOG=shapeshift=debug shapeshift_sim 30 2
//! ```

use std::process::ExitCode;

use shapeshift::{
    FileStorage, Game, GameCommand, GameConfig, GameError, GameLoop, GameLoopConfig, GameResult,
};

/// Simulated frame rate; the loop converts frames into fixed ticks.
const FRAME_DELTA: f32 = 1.0 / 60.0;

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(err) => {
            tracing::error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn run() -> GameResult<bool> {
    let mut args = std::env::args().skip(1);
    let seconds = parse_arg(args.next(), "seconds", 10.0_f32)?;
    let level = parse_arg(args.next(), "level", 1_i32)?;
    let config = match args.next() {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default(),
    };

    let storage = FileStorage::new(config.save_path.clone());
    let loop_config = GameLoopConfig { enable_timing_logs: true, ..GameLoopConfig::for_game(&config) };
    let mut game = Game::new(config, Box::new(storage))?;
    game.execute(GameCommand::LoadLevel(level))?;
    tracing::info!(level = game.level().index(), name = game.level().name(), seconds, "starting simulation");

    let frames = (seconds / FRAME_DELTA).round() as u64;
    let half = frames / 2;

    let mut game_loop = GameLoop::new(loop_config.clone());
    run_frames(&mut game_loop, &mut game, half)?;
    game.execute(GameCommand::Save)?;
    tracing::info!(population = game.population().len(), frame = half, "saved");

    let mut first = GameLoop::new(loop_config.clone());
    run_frames(&mut first, &mut game, frames - half)?;
    let expected = game.save_bytes();
    game_loop.stats().log_summary();
    first.stats().log_summary();

    game.execute(GameCommand::Load)?;
    let mut replay = GameLoop::new(loop_config);
    run_frames(&mut replay, &mut game, frames - half)?;
    let replayed = game.save_bytes();

    let matches = expected == replayed;
    if matches {
        tracing::info!(population = game.population().len(), bytes = replayed.len(), "replay matches");
    } else if game.config().reseed_on_load {
        tracing::info!("reseed_on_load is set, replay check skipped");
    } else {
        tracing::warn!(expected = expected.len(), replayed = replayed.len(), "replay diverged");
    }
    Ok(matches || game.config().reseed_on_load)
}

fn run_frames(game_loop: &mut GameLoop, game: &mut Game, frames: u64) -> GameResult<()> {
    for _ in 0..frames {
        game_loop.advance(FRAME_DELTA, game)?;
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(arg: Option<String>, name: &str, default: T) -> GameResult<T> {
    match arg {
        Some(text) => text
            .parse()
            .map_err(|_| GameError::Config(format!("invalid {name} argument '{text}'"))),
        None => Ok(default),
    }
}
