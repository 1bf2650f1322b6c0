use ml_block_dodge::ai::RandomAgent;
use ml_block_dodge::game::{EngineConfig, EngineStatus, GameEngine, TickOutcome, FALL_INTERVAL};

fn engine(rows: usize, cols: usize, density: f64, seed: u64) -> GameEngine {
    GameEngine::new(EngineConfig {
        rows,
        cols,
        density,
        seed: Some(seed),
        ..Default::default()
    })
}

#[test]
fn open_columns_survive_every_fall() {
    for seed in 0..40 {
        let density = 0.1 + (seed % 9) as f64 * 0.1;
        let mut engine = engine(8, 7, density, seed);
        let mut agent = RandomAgent::with_seed(seed);

        for _ in 0..1_500 {
            match engine.tick(Some(&mut agent)) {
                TickOutcome::Fell { .. } => {
                    assert!(
                        !engine.open_columns().is_empty(),
                        "seed {seed}: no open column after fall"
                    );
                }
                TickOutcome::Halted => break,
                TickOutcome::Decided { .. } => {}
            }
        }
    }
}

#[test]
fn exactly_one_entity_cell_at_every_tick() {
    for seed in 0..40 {
        let mut engine = engine(6, 5, 0.35, seed);
        let mut agent = RandomAgent::with_seed(seed + 1_000);

        while !engine.is_over() && engine.tick_count() < 2_000 {
            engine.tick(Some(&mut agent));
            assert_eq!(engine.board().entity_count(), 1, "seed {seed}");

            let position = engine.position();
            assert!(position.row < 6 && position.col < 5, "seed {seed}: {position:?}");
            assert!(engine.board().get(position).is_entity());
        }
    }
}

#[test]
fn fully_blocked_rows_are_always_repaired() {
    let mut engine = engine(10, 10, 1.0, 7);
    for _ in 0..5 * FALL_INTERVAL {
        if let TickOutcome::Fell { .. } = engine.tick(None) {
            assert_eq!(engine.open_columns().len(), 1);
        }
        if engine.is_over() {
            break;
        }
    }
}

#[test]
fn ticks_after_game_over_change_nothing() {
    for seed in 0..10 {
        let mut engine = engine(4, 3, 0.9, seed);
        let mut agent = RandomAgent::with_seed(seed);
        let outcome = engine.run_episode(Some(&mut agent), Some(50_000));
        if !outcome.collided {
            continue;
        }

        let before = engine.snapshot();
        assert_eq!(before.status, EngineStatus::GameOver);
        assert_eq!(engine.tick(Some(&mut agent)), TickOutcome::Halted);
        assert_eq!(engine.snapshot(), before);
    }
}
