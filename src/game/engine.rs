use std::collections::BTreeSet;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::action::Action;
use super::board::{Board, Cell, Position};
use super::generator::EscapeGenerator;
use crate::ai::{Agent, Observation};

/// Every `FALL_INTERVAL`-th tick is a fall tick; the rest are decision ticks.
pub const FALL_INTERVAL: u64 = 10;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rows: usize,
    pub cols: usize,
    /// Delay between ticks when running in real time.
    pub tick_ms: u64,
    /// Probability that a newly generated cell is an obstacle.
    pub density: f64,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            rows: 10,
            cols: 10,
            tick_ms: 0,
            density: 0.2,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Running,
    GameOver,
}

/// What a single call to [`GameEngine::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Rows shifted down and a new top row was generated.
    Fell { survived: bool },
    /// The agent was queried and its move applied.
    Decided { action: Action, survived: bool },
    /// The episode is over; nothing happened.
    Halted,
}

/// Owned copy of the engine state, for renderers and history.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub board: Board,
    pub position: Position,
    pub score: u32,
    pub tick: u64,
    pub status: EngineStatus,
}

/// Summary of a finished (or truncated) episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeOutcome {
    pub score: u32,
    pub ticks: u64,
    pub collided: bool,
}

/// Tick-driven falling-obstacle simulation.
pub struct GameEngine {
    config: EngineConfig,
    board: Board,
    position: Position,
    score: u32,
    tick: u64,
    status: EngineStatus,
    generator: EscapeGenerator,
    rng: StdRng,
}

impl GameEngine {
    /// Create an engine seeded from the config (or the OS when unseeded).
    pub fn new(config: EngineConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    /// Create an engine drawing obstacles from the given generator.
    pub fn with_rng(config: EngineConfig, rng: StdRng) -> Self {
        let (board, position) = Board::with_spawn(config.rows, config.cols);
        let generator = EscapeGenerator::new(config.cols, config.density);
        GameEngine {
            config,
            board,
            position,
            score: 0,
            tick: 0,
            status: EngineStatus::Running,
            generator,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Number of ticks processed so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn is_over(&self) -> bool {
        self.status == EngineStatus::GameOver
    }

    /// Top-row columns currently known to be reachable.
    pub fn open_columns(&self) -> &BTreeSet<usize> {
        self.generator.open_columns()
    }

    pub fn observation(&self) -> Observation<'_> {
        Observation {
            board: &self.board,
            position: self.position,
            score: self.score,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            board: self.board.clone(),
            position: self.position,
            score: self.score,
            tick: self.tick,
            status: self.status,
        }
    }

    /// Advance the simulation by one tick.
    ///
    /// Without an agent, decision ticks apply the neutral action.
    pub fn tick(&mut self, agent: Option<&mut (dyn Agent + '_)>) -> TickOutcome {
        if self.is_over() {
            return TickOutcome::Halted;
        }

        let tick = self.tick;
        self.tick += 1;

        if tick % FALL_INTERVAL == 0 {
            self.fall(agent)
        } else {
            self.decision(agent)
        }
    }

    /// Tick until the entity collides or `max_ticks` ticks have elapsed,
    /// sleeping `tick_ms` between ticks.
    pub fn run_episode(
        &mut self,
        mut agent: Option<&mut (dyn Agent + '_)>,
        max_ticks: Option<u64>,
    ) -> EpisodeOutcome {
        let delay = Duration::from_millis(self.config.tick_ms);
        while !self.is_over() {
            if max_ticks.is_some_and(|max| self.tick >= max) {
                break;
            }
            self.tick(agent.as_deref_mut());
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        EpisodeOutcome {
            score: self.score,
            ticks: self.tick,
            collided: self.is_over(),
        }
    }

    fn fall(&mut self, agent: Option<&mut (dyn Agent + '_)>) -> TickOutcome {
        let row = self.generator.draw_row(self.config.cols, &mut self.rng);
        self.board.shift_down(&row);
        let generation = self.generator.secure_top_row(&mut self.board, &mut self.rng);
        if let Some(col) = generation.repaired {
            tracing::trace!(col, "cleared blocking column");
        }

        let survived = self.resolve(self.position, agent);
        if survived {
            self.score += 1;
        }
        TickOutcome::Fell { survived }
    }

    fn decision(&mut self, mut agent: Option<&mut (dyn Agent + '_)>) -> TickOutcome {
        let action = match agent.as_mut() {
            Some(agent) => agent.decide(&self.observation()),
            None => Action::STAY,
        };

        let previous = self.position;
        self.position = self.apply(action);
        let survived = self.resolve(previous, agent);
        TickOutcome::Decided { action, survived }
    }

    /// Target position for an action; out-of-range moves leave it unchanged.
    fn apply(&self, action: Action) -> Position {
        if !(-1..=1).contains(&action.col_delta) {
            return self.position;
        }
        let col = self.position.col as i64 + action.col_delta as i64;
        if col < 0 || col >= self.config.cols as i64 {
            return self.position;
        }
        Position::new(self.position.row, col as usize)
    }

    /// Check for a collision at the current position and redraw the entity.
    fn resolve(&mut self, previous: Position, agent: Option<&mut (dyn Agent + '_)>) -> bool {
        let current = self.position;
        if self.board.get(current) == Cell::Obstacle {
            self.board.set(previous, Cell::Empty);
            self.board.set(current, Cell::Collided);
            self.status = EngineStatus::GameOver;
            tracing::debug!(score = self.score, tick = self.tick, "collision");
            if let Some(agent) = agent {
                agent.on_terminal(&self.observation());
            }
            false
        } else {
            self.board.set(previous, Cell::Empty);
            self.board.set(current, Cell::Agent);
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Agent that replays a fixed move and counts callbacks.
    struct FixedAgent {
        action: Action,
        decisions: usize,
        terminals: usize,
    }

    impl FixedAgent {
        fn new(action: Action) -> Self {
            FixedAgent {
                action,
                decisions: 0,
                terminals: 0,
            }
        }
    }

    impl Agent for FixedAgent {
        fn decide(&mut self, _observation: &Observation<'_>) -> Action {
            self.decisions += 1;
            self.action
        }

        fn on_terminal(&mut self, _observation: &Observation<'_>) {
            self.terminals += 1;
        }

        fn name(&self) -> &str {
            "Fixed"
        }
    }

    fn seeded(rows: usize, cols: usize, density: f64, seed: u64) -> GameEngine {
        GameEngine::new(EngineConfig {
            rows,
            cols,
            density,
            seed: Some(seed),
            ..Default::default()
        })
    }

    #[test]
    fn test_initial_state() {
        let engine = seeded(10, 10, 0.2, 1);
        assert_eq!(engine.status(), EngineStatus::Running);
        assert_eq!(engine.tick_count(), 0);
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.position(), Position::new(9, 4));
        assert_eq!(engine.board().entity_count(), 1);
        assert_eq!(engine.board().count(Cell::Obstacle), 0);
    }

    #[test]
    fn test_tick_cadence() {
        let mut engine = seeded(5, 5, 0.0, 1);
        assert!(matches!(engine.tick(None), TickOutcome::Fell { .. }));
        for _ in 1..FALL_INTERVAL {
            assert!(matches!(engine.tick(None), TickOutcome::Decided { .. }));
        }
        assert!(matches!(engine.tick(None), TickOutcome::Fell { .. }));
    }

    #[test]
    fn test_empty_board_score_counts_fall_ticks() {
        let mut engine = seeded(2, 2, 0.0, 7);
        assert_eq!(engine.position(), Position::new(1, 0));
        let mut agent = FixedAgent::new(Action::STAY);

        let mut falls = 0;
        for _ in 0..20 {
            if let TickOutcome::Fell { .. } = engine.tick(Some(&mut agent)) {
                falls += 1;
            }
        }

        assert_eq!(falls, 2);
        assert_eq!(engine.score(), 2);
        assert_eq!(agent.decisions, 18);
        assert_eq!(engine.board().count(Cell::Obstacle), 0);
        assert!(!engine.is_over());
    }

    #[test]
    fn test_out_of_bounds_move_is_ignored() {
        let mut engine = seeded(3, 3, 0.0, 1);
        let mut agent = FixedAgent::new(Action::LEFT);
        engine.tick(Some(&mut agent));
        for _ in 0..5 {
            engine.tick(Some(&mut agent));
        }
        assert_eq!(engine.position(), Position::new(2, 0));
        assert_eq!(engine.board().get(Position::new(2, 0)), Cell::Agent);
        assert_eq!(engine.board().entity_count(), 1);
    }

    #[test]
    fn test_oversized_delta_is_ignored() {
        let mut engine = seeded(3, 5, 0.0, 1);
        let mut agent = FixedAgent::new(Action::new(0, 2));
        engine.tick(Some(&mut agent));
        engine.tick(Some(&mut agent));
        assert_eq!(engine.position(), Position::new(2, 2));
    }

    #[test]
    fn test_row_delta_is_ignored() {
        let mut engine = seeded(4, 4, 0.0, 1);
        let mut agent = FixedAgent::new(Action::new(-1, 1));
        engine.tick(Some(&mut agent));
        engine.tick(Some(&mut agent));
        assert_eq!(engine.position(), Position::new(3, 2));
    }

    #[test]
    fn test_moving_into_obstacle_ends_game() {
        let mut engine = seeded(3, 3, 0.0, 1);
        engine.tick(None);
        engine.board.set(Position::new(2, 2), Cell::Obstacle);

        let mut agent = FixedAgent::new(Action::RIGHT);
        let outcome = engine.tick(Some(&mut agent));

        assert_eq!(
            outcome,
            TickOutcome::Decided {
                action: Action::RIGHT,
                survived: false
            }
        );
        assert!(engine.is_over());
        assert_eq!(agent.terminals, 1);
        assert_eq!(engine.board().get(Position::new(2, 2)), Cell::Collided);
        assert_eq!(engine.board().get(Position::new(2, 1)), Cell::Empty);
        assert_eq!(engine.board().entity_count(), 1);
    }

    #[test]
    fn test_falling_obstacle_ends_game_without_scoring() {
        let mut engine = seeded(2, 3, 0.0, 1);
        engine.tick(None);
        assert_eq!(engine.score(), 1);
        for _ in 1..FALL_INTERVAL {
            engine.tick(None);
        }
        engine.board.set(Position::new(0, 1), Cell::Obstacle);

        let mut agent = FixedAgent::new(Action::STAY);
        let outcome = engine.tick(Some(&mut agent));

        assert_eq!(outcome, TickOutcome::Fell { survived: false });
        assert_eq!(engine.score(), 1);
        assert_eq!(agent.terminals, 1);
        assert_eq!(engine.board().get(Position::new(1, 1)), Cell::Collided);
    }

    #[test]
    fn test_no_ticks_after_game_over() {
        let mut engine = seeded(3, 3, 0.0, 1);
        engine.tick(None);
        engine.board.set(Position::new(2, 0), Cell::Obstacle);
        let mut agent = FixedAgent::new(Action::LEFT);
        engine.tick(Some(&mut agent));
        assert!(engine.is_over());

        let ticks = engine.tick_count();
        assert_eq!(engine.tick(Some(&mut agent)), TickOutcome::Halted);
        assert_eq!(engine.tick_count(), ticks);
        assert_eq!(agent.decisions, 1);
        assert_eq!(agent.terminals, 1);
    }

    #[test]
    fn test_run_episode_respects_tick_cap() {
        let mut engine = seeded(4, 4, 0.0, 3);
        let outcome = engine.run_episode(None, Some(25));
        assert_eq!(outcome.ticks, 25);
        assert_eq!(outcome.score, 3);
        assert!(!outcome.collided);
    }

    #[test]
    fn test_run_episode_until_collision() {
        let mut engine = seeded(6, 4, 0.9, 17);
        let mut agent = FixedAgent::new(Action::STAY);
        let outcome = engine.run_episode(Some(&mut agent), Some(100_000));
        assert!(outcome.collided);
        assert_eq!(agent.terminals, 1);
        assert_eq!(engine.snapshot().status, EngineStatus::GameOver);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut engine = seeded(4, 4, 0.5, 3);
        let snapshot = engine.snapshot();
        for _ in 0..30 {
            engine.tick(None);
        }
        assert_eq!(snapshot.tick, 0);
        assert_eq!(snapshot.board.count(Cell::Obstacle), 0);
    }
}
