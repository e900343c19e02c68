//! Integration tests driving a whole game through commands and ticks.

use shapeshift::config::{KillZoneConfig, SpawnZoneConfig, VolumeConfig};
use shapeshift::{FileStorage, Game, GameCommand, GameConfig, GameError, MemoryStorage};
use shapeshift_shared::Vec3;
use tempfile::TempDir;

fn config() -> GameConfig {
    GameConfig { seed: Some(1234), creation_speed: 10.0, destruction_speed: 2.0, ..GameConfig::default() }
}

fn game(config: GameConfig) -> Game {
    Game::new(config, Box::new(MemoryStorage::new())).unwrap()
}

fn run(game: &mut Game, ticks: usize) {
    let dt = game.fixed_delta();
    for _ in 0..ticks {
        game.update(dt).unwrap();
    }
}

#[test]
fn test_reload_replays_identically() {
    for level in [1, 2] {
        let mut game = game(config());
        game.execute(GameCommand::LoadLevel(level)).unwrap();
        run(&mut game, 150);
        game.execute(GameCommand::Save).unwrap();

        run(&mut game, 150);
        let expected = game.save_bytes();
        assert!(!game.population().is_empty());

        game.execute(GameCommand::Load).unwrap();
        assert_eq!(game.level().index(), level);
        run(&mut game, 150);
        assert_eq!(game.save_bytes(), expected, "level {level} diverged after reload");
        assert!(game.population().is_consistent());
    }
}

#[test]
fn test_same_seed_same_run() {
    let mut a = game(config());
    let mut b = game(config());
    run(&mut a, 200);
    run(&mut b, 200);
    assert_eq!(a.save_bytes(), b.save_bytes());
}

#[test]
fn test_failed_load_leaves_game_untouched() {
    let mut game = game(config());
    run(&mut game, 100);
    let saved = game.save_bytes();
    run(&mut game, 20);
    let before = game.save_bytes();

    let truncated = &saved[..saved.len() / 2];
    assert!(game.load_bytes(truncated).is_err());
    assert_eq!(game.save_bytes(), before);

    let mut future = saved.clone();
    future[..4].copy_from_slice(&(-99_i32).to_le_bytes());
    assert!(game.load_bytes(&future).is_err());
    assert_eq!(game.save_bytes(), before);

    game.load_bytes(&saved).unwrap();
    assert_eq!(game.save_bytes(), saved);
}

#[test]
fn test_save_from_unknown_level_is_rejected() {
    let mut two_levels = game(config());
    two_levels.execute(GameCommand::LoadLevel(2)).unwrap();
    run(&mut two_levels, 50);
    let saved = two_levels.save_bytes();

    let mut one_level_config = config();
    one_level_config.levels.truncate(1);
    let mut one_level = game(one_level_config);
    run(&mut one_level, 50);
    let before = one_level.save_bytes();

    let err = one_level.load_bytes(&saved).unwrap_err();
    assert_eq!(err, GameError::UnknownLevel { requested: 2, available: 1 });
    assert_eq!(one_level.save_bytes(), before);
    assert_eq!(one_level.level().index(), 1);
}

#[test]
fn test_new_game_clears_population() {
    let mut game = game(config());
    run(&mut game, 100);
    assert!(!game.population().is_empty());

    game.execute(GameCommand::NewGame).unwrap();
    assert!(game.population().is_empty());
    assert_eq!(game.population().dying_count(), 0);
    let counters = game.manager().counters();
    assert_eq!(counters.creation_progress, 0.0);
    assert_eq!(counters.destruction_progress, 0.0);
    assert_eq!(counters.creation_speed, 10.0);
}

#[test]
fn test_kill_zone_empties_spawn_area() {
    let mut config = GameConfig { creation_speed: 50.0, ..config() };
    config.levels[0].kill_zones.push(KillZoneConfig {
        volume: VolumeConfig::Box { center: Vec3::ZERO, size: Vec3::splat(100.0) },
        dying_duration: 0.0,
    });
    let mut game = game(config);

    let dt = game.fixed_delta();
    for _ in 0..20 {
        let report = game.update(dt).unwrap();
        assert_eq!(report.spawned, 1);
        assert!(game.population().is_empty());
    }
}

#[test]
fn test_population_limit_is_respected() {
    let mut config = GameConfig { creation_speed: 500.0, destruction_speed: 0.0, ..config() };
    config.levels[0].population_limit = 25;
    let mut game = game(config);

    run(&mut game, 100);
    assert!(game.population().alive_count() <= 25);
    assert!(game.population().is_consistent());
}

#[test]
fn test_file_storage_round_trip() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::new(dir.path().join("saveFile"));
    let mut game = Game::new(config(), Box::new(storage)).unwrap();

    run(&mut game, 80);
    game.execute(GameCommand::Save).unwrap();
    let saved = game.save_bytes();
    assert_eq!(std::fs::read(dir.path().join("saveFile")).unwrap(), saved);

    run(&mut game, 80);
    game.execute(GameCommand::Load).unwrap();
    assert_eq!(game.save_bytes(), saved);
}

#[test]
fn test_level_zone_spawns_without_creation_speed() {
    let mut config = GameConfig { creation_speed: 0.0, destruction_speed: 0.0, ..config() };
    if let SpawnZoneConfig::Sphere { spawn_speed, .. } = &mut config.levels[0].spawn_zone {
        *spawn_speed = 2.0;
    }
    let mut game = game(config.clone());

    let report = game.update(0.75).unwrap();
    assert_eq!(report.spawned, 0);
    assert_eq!(report.source_spawned, 1);
    assert!(!game.population().is_empty());
    assert_eq!(game.level().spawn_zone().spawn_progress(), 0.5);
    let saved = game.save_bytes();

    let mut other = Game::new(config, Box::new(MemoryStorage::new())).unwrap();
    other.load_bytes(&saved).unwrap();
    assert_eq!(other.level().spawn_zone().spawn_progress(), 0.5);
    assert_eq!(other.population().len(), game.population().len());

    assert_eq!(other.update(0.25).unwrap().source_spawned, 1);
    assert_eq!(other.level().spawn_zone().spawn_progress(), 0.0);
}
