use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;

use crate::pickups::{self, Effect, Food, PowerUp};
use crate::snake::Snake;
use crate::{ArenaConfig, Direction, PlayerId, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Idle,
    Running,
    Paused,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    Win(PlayerId),
    Draw,
}

/// Terminal report of a round, produced by the tick that transitions the
/// match into `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundReport {
    pub outcome: RoundOutcome,
    pub final_scores: [u32; 2],
}

/// Internal-consistency failures. The resolver is assumed to catch every
/// body overlap as a death; an overlap that survives it means the
/// simulation state can no longer be trusted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
    #[error("player {0:?} body overlaps itself while alive")]
    CorruptBody(PlayerId),
}

/// The whole simulation: grid, both snakes, collectibles, RNG, and the
/// match state machine. All mutation happens through the lifecycle
/// methods and `tick`; the host reads everything else through the
/// borrowing accessors.
#[derive(Debug)]
pub struct DuelState {
    cfg: ArenaConfig,
    snakes: [Snake; 2],
    food: Vec<Food>,
    power_ups: Vec<PowerUp>,
    rng: ChaCha8Rng,
    phase: MatchPhase,
    scores: [u32; 2],
    round_wins: [u32; 2],
}

impl DuelState {
    pub fn with_seed(cfg: ArenaConfig, seed: u64) -> Self {
        Self::with_rng(cfg, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create an idle match with deterministic RNG.
    pub fn with_rng(cfg: ArenaConfig, rng: ChaCha8Rng) -> Self {
        let snakes = Self::spawn_snakes(&cfg);
        Self {
            cfg,
            snakes,
            food: Vec::new(),
            power_ups: Vec::new(),
            rng,
            phase: MatchPhase::Idle,
            scores: [0, 0],
            round_wins: [0, 0],
        }
    }

    /// Create an idle match with a non-deterministic seed.
    pub fn new(cfg: ArenaConfig) -> Self {
        Self::with_rng(cfg, ChaCha8Rng::from_os_rng())
    }

    fn spawn_snakes(cfg: &ArenaConfig) -> [Snake; 2] {
        let y = cfg.height / 2;
        [
            Snake::new(
                Point::new(cfg.width / 4, y),
                Direction::Right,
                cfg.initial_len,
            ),
            Snake::new(
                Point::new(cfg.width * 3 / 4, y),
                Direction::Left,
                cfg.initial_len,
            ),
        ]
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.cfg
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn snake(&self, player: PlayerId) -> &Snake {
        &self.snakes[player.index()]
    }

    pub fn food(&self) -> &[Food] {
        &self.food
    }

    pub fn power_ups(&self) -> &[PowerUp] {
        &self.power_ups
    }

    pub fn score(&self, player: PlayerId) -> u32 {
        self.scores[player.index()]
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn round_wins(&self) -> [u32; 2] {
        self.round_wins
    }

    /// Latest-direction input register for one player. Writable at any
    /// time; consumed once at the start of the next tick. A 180° reversal
    /// of that player's current direction is silently ignored.
    pub fn set_direction(&mut self, player: PlayerId, dir: Direction) {
        self.snakes[player.index()].set_direction(dir);
    }

    /// Begin a round. Valid from `Idle` or `Ended`; a no-op elsewhere.
    /// Win tallies persist; everything else on the field resets.
    pub fn start_round(&mut self) {
        if !matches!(self.phase, MatchPhase::Idle | MatchPhase::Ended) {
            return;
        }
        self.snakes = Self::spawn_snakes(&self.cfg);
        self.food.clear();
        self.power_ups.clear();
        self.scores = [0, 0];
        self.spawn_food();
        self.phase = MatchPhase::Running;
    }

    pub fn pause(&mut self) {
        if self.phase == MatchPhase::Running {
            self.phase = MatchPhase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == MatchPhase::Paused {
            self.phase = MatchPhase::Running;
        }
    }

    /// Zero the win tallies and scores and return to `Idle`. Valid from
    /// any state.
    pub fn reset_match(&mut self) {
        self.snakes = Self::spawn_snakes(&self.cfg);
        self.food.clear();
        self.power_ups.clear();
        self.scores = [0, 0];
        self.round_wins = [0, 0];
        self.phase = MatchPhase::Idle;
    }

    /// Advance the simulation by one tick. Only moves while `Running`.
    /// Returns the round report on the tick a round ends, `None`
    /// otherwise.
    pub fn tick(&mut self, now: Instant) -> Result<Option<RoundReport>, SimError> {
        if self.phase != MatchPhase::Running {
            return Ok(None);
        }

        for snake in &mut self.snakes {
            snake.advance();
        }

        let occupied = self.snake_and_food_cells();
        pickups::maintain_power_ups(&self.cfg, &occupied, &mut self.power_ups, now, &mut self.rng);
        if self.food.is_empty() {
            // A previous spawn no-opped on a full grid; retry.
            self.spawn_food();
        }

        for snake in &mut self.snakes {
            snake.expire_effects(now);
        }

        self.resolve_food();
        self.resolve_power_ups(now);
        self.resolve_bounds();
        self.resolve_self_collisions();
        self.resolve_cross_collisions();
        self.check_consistency()?;

        let dead = [!self.snakes[0].alive, !self.snakes[1].alive];
        if dead[0] || dead[1] {
            self.phase = MatchPhase::Ended;
            let outcome = match (dead[0], dead[1]) {
                (true, true) => RoundOutcome::Draw,
                (true, false) => {
                    self.round_wins[1] += 1;
                    RoundOutcome::Win(PlayerId::Two)
                }
                _ => {
                    self.round_wins[0] += 1;
                    RoundOutcome::Win(PlayerId::One)
                }
            };
            return Ok(Some(RoundReport {
                outcome,
                final_scores: self.scores,
            }));
        }
        Ok(None)
    }

    fn snake_and_food_cells(&self) -> HashSet<Point> {
        let mut occupied: HashSet<Point> = self
            .snakes
            .iter()
            .flat_map(|s| s.segments().copied())
            .collect();
        occupied.extend(self.food.iter().map(|f| f.pos));
        occupied
    }

    fn spawn_food(&mut self) {
        let occupied = self.snake_and_food_cells();
        if let Some(food) = pickups::spawn_food(&self.cfg, &occupied, &mut self.rng) {
            self.food.push(food);
        }
    }

    /// Phase 1: a head on a food cell grows the snake, awards the food's
    /// point value, and respawns one food. Player one is checked first.
    /// DoubleScore is tracked on the snake but does not change the award.
    fn resolve_food(&mut self) {
        for i in 0..self.snakes.len() {
            if !self.snakes[i].alive {
                continue;
            }
            let head = self.snakes[i].head();
            let Some(idx) = self.food.iter().position(|f| f.pos == head) else {
                continue;
            };
            let food = self.food.swap_remove(idx);
            self.snakes[i].grow();
            self.scores[i] += food.kind.points();
            self.spawn_food();
        }
    }

    /// Phase 2: a head on a power-up cell consumes it and starts (or
    /// refreshes) the matching effect.
    fn resolve_power_ups(&mut self, now: Instant) {
        for i in 0..self.snakes.len() {
            if !self.snakes[i].alive {
                continue;
            }
            let head = self.snakes[i].head();
            if let Some(idx) = self.power_ups.iter().position(|p| p.pos == head) {
                let power_up = self.power_ups.swap_remove(idx);
                self.snakes[i].apply_effect(power_up.kind, now);
            }
        }
    }

    /// Phase 3: a head outside the grid is a death. Invincibility does
    /// not apply here.
    fn resolve_bounds(&mut self) {
        for snake in &mut self.snakes {
            if snake.alive && !self.cfg.in_bounds(snake.head()) {
                snake.kill();
            }
        }
    }

    /// Phase 4: Invincible-aware self-collision.
    fn resolve_self_collisions(&mut self) {
        for snake in &mut self.snakes {
            if snake.alive && snake.collides_with_self() {
                snake.kill();
            }
        }
    }

    /// Phase 5: head-to-head on the same cell kills both (a draw);
    /// otherwise a head anywhere on the other body (dead bodies stay on
    /// the field) kills the runner-in. Invincibility is not consulted.
    fn resolve_cross_collisions(&mut self) {
        let [one, two] = &mut self.snakes;
        if one.alive && two.alive && one.head() == two.head() {
            one.kill();
            two.kill();
            return;
        }
        if one.alive && two.occupies(one.head()) {
            one.kill();
        }
        if two.alive && one.occupies(two.head()) {
            two.kill();
        }
    }

    /// An alive, non-Invincible snake must never hold duplicate cells
    /// once the resolver has run.
    fn check_consistency(&self) -> Result<(), SimError> {
        for (snake, player) in self.snakes.iter().zip(PlayerId::BOTH) {
            if !snake.alive || snake.effects().is_active(Effect::Invincible) {
                continue;
            }
            let distinct: HashSet<&Point> = snake.segments().collect();
            if distinct.len() != snake.len() {
                return Err(SimError::CorruptBody(player));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pickups::FoodKind;
    use std::collections::VecDeque;
    use std::time::Duration;

    const TICK: Duration = Duration::from_millis(120);

    fn arena(seed: u64) -> DuelState {
        let mut state = DuelState::with_seed(ArenaConfig::default(), seed);
        state.start_round();
        state
    }

    fn place_food(state: &mut DuelState, pos: Point, kind: FoodKind) {
        state.food = vec![Food { pos, kind }];
    }

    /// A snake whose next advance folds its head back into its own body.
    fn folded_snake() -> Snake {
        let mut snake = Snake::new(Point::new(5, 5), Direction::Right, 3);
        snake.body = VecDeque::from(vec![
            Point::new(5, 5),
            Point::new(4, 5),
            Point::new(4, 6),
            Point::new(5, 6),
            Point::new(6, 6),
        ]);
        snake.dir = Direction::Down;
        snake
    }

    #[test]
    fn food_hit_grows_scores_and_respawns_same_tick() {
        let mut state = arena(42);
        state.snakes[0] = Snake::new(Point::new(5, 5), Direction::Right, 3);
        place_food(&mut state, Point::new(6, 5), FoodKind::Normal);

        let report = state.tick(Instant::now()).unwrap();
        assert!(report.is_none());

        let snake = state.snake(PlayerId::One);
        assert_eq!(snake.head(), Point::new(6, 5));
        assert_eq!(snake.len(), 4);
        assert_eq!(state.score(PlayerId::One), 10);
        assert_eq!(state.food().len(), 1, "exactly one replacement food");
        assert_ne!(state.food()[0].pos, Point::new(6, 5));
    }

    #[test]
    fn bonus_food_awards_25_points() {
        let mut state = arena(42);
        state.snakes[0] = Snake::new(Point::new(5, 5), Direction::Right, 3);
        place_food(&mut state, Point::new(6, 5), FoodKind::Bonus);
        state.tick(Instant::now()).unwrap();
        assert_eq!(state.score(PlayerId::One), 25);
    }

    #[test]
    fn double_score_does_not_multiply_the_award() {
        let mut state = arena(42);
        let now = Instant::now();
        state.snakes[0] = Snake::new(Point::new(5, 5), Direction::Right, 3);
        state.snakes[0].apply_effect(Effect::DoubleScore, now);
        place_food(&mut state, Point::new(6, 5), FoodKind::Normal);
        state.tick(now).unwrap();
        assert_eq!(state.score(PlayerId::One), 10);
    }

    #[test]
    fn reversal_is_rejected_and_motion_continues() {
        let mut state = arena(1);
        let head_before = state.snake(PlayerId::One).head();
        state.set_direction(PlayerId::One, Direction::Left); // facing Right
        state.tick(Instant::now()).unwrap();
        let snake = state.snake(PlayerId::One);
        assert_eq!(snake.direction(), Direction::Right);
        assert_eq!(snake.head(), Point::new(head_before.x + 1, head_before.y));
    }

    #[test]
    fn boundary_death_ignores_invincibility() {
        let mut state = arena(1);
        let now = Instant::now();
        state.snakes[0] = Snake::new(Point::new(0, 5), Direction::Left, 3);
        state.snakes[0].apply_effect(Effect::Invincible, now);
        let report = state.tick(now).unwrap().expect("round must end");
        assert!(!state.snake(PlayerId::One).is_alive());
        assert_eq!(report.outcome, RoundOutcome::Win(PlayerId::Two));
        assert_eq!(state.round_wins(), [0, 1]);
        assert_eq!(state.phase(), MatchPhase::Ended);
    }

    #[test]
    fn self_collision_kills_without_invincibility() {
        let mut state = arena(1);
        state.snakes[0] = folded_snake();
        let report = state.tick(Instant::now()).unwrap().expect("round must end");
        assert!(!state.snake(PlayerId::One).is_alive());
        assert_eq!(report.outcome, RoundOutcome::Win(PlayerId::Two));
    }

    #[test]
    fn invincibility_suppresses_self_collision_until_expiry() {
        let t0 = Instant::now();

        // Still immune just before the 3 s expiry.
        let mut state = arena(1);
        state.snakes[0] = folded_snake();
        state.snakes[0].apply_effect(Effect::Invincible, t0);
        let report = state.tick(t0 + Duration::from_millis(2900)).unwrap();
        assert!(report.is_none());
        assert!(state.snake(PlayerId::One).is_alive());

        // The same configuration past expiry dies.
        let mut state = arena(1);
        state.snakes[0] = folded_snake();
        state.snakes[0].apply_effect(Effect::Invincible, t0);
        let report = state.tick(t0 + Duration::from_millis(3100)).unwrap();
        assert!(report.is_some());
        assert!(!state.snake(PlayerId::One).is_alive());
    }

    #[test]
    fn head_on_collision_is_a_draw_for_both() {
        let mut state = arena(9);
        state.snakes[0] = Snake::new(Point::new(6, 7), Direction::Right, 3);
        state.snakes[1] = Snake::new(Point::new(8, 7), Direction::Left, 3);
        place_food(&mut state, Point::new(20, 20), FoodKind::Normal);

        let report = state.tick(Instant::now()).unwrap().expect("round must end");
        assert_eq!(report.outcome, RoundOutcome::Draw);
        assert!(!state.snake(PlayerId::One).is_alive());
        assert!(!state.snake(PlayerId::Two).is_alive());
        assert_eq!(state.round_wins(), [0, 0], "a draw increments no tally");
    }

    #[test]
    fn running_into_the_other_body_loses() {
        let mut state = arena(9);
        // Player one's head steps into player two's trailing segment.
        state.snakes[0] = Snake::new(Point::new(9, 9), Direction::Right, 3);
        state.snakes[1] = Snake::new(Point::new(10, 8), Direction::Up, 3);
        place_food(&mut state, Point::new(20, 20), FoodKind::Normal);

        let report = state.tick(Instant::now()).unwrap().expect("round must end");
        assert_eq!(report.outcome, RoundOutcome::Win(PlayerId::Two));
        assert_eq!(state.round_wins(), [0, 1]);
        assert!(state.snake(PlayerId::Two).is_alive());
    }

    #[test]
    fn cross_collision_ignores_invincibility() {
        let mut state = arena(9);
        let now = Instant::now();
        state.snakes[0] = Snake::new(Point::new(9, 9), Direction::Right, 3);
        state.snakes[0].apply_effect(Effect::Invincible, now);
        state.snakes[1] = Snake::new(Point::new(10, 8), Direction::Up, 3);
        place_food(&mut state, Point::new(20, 20), FoodKind::Normal);

        let report = state.tick(now).unwrap().expect("round must end");
        assert_eq!(report.outcome, RoundOutcome::Win(PlayerId::Two));
    }

    #[test]
    fn consuming_a_power_up_starts_its_effect() {
        let mut state = arena(5);
        let now = Instant::now();
        state.snakes[0] = Snake::new(Point::new(5, 5), Direction::Right, 3);
        place_food(&mut state, Point::new(20, 20), FoodKind::Normal);
        state.power_ups = vec![PowerUp {
            pos: Point::new(6, 5),
            kind: Effect::SpeedBoost,
            spawned_at: now,
        }];

        state.tick(now).unwrap();
        assert!(
            state.power_ups().iter().all(|p| p.pos != Point::new(6, 5)),
            "consumed power-up is removed from the field"
        );
        assert!(
            state
                .snake(PlayerId::One)
                .effects()
                .is_active(Effect::SpeedBoost)
        );
    }

    #[test]
    fn both_players_can_consume_different_targets_in_one_tick() {
        let mut state = arena(5);
        let now = Instant::now();
        state.snakes[0] = Snake::new(Point::new(5, 5), Direction::Right, 3);
        state.snakes[1] = Snake::new(Point::new(20, 10), Direction::Left, 3);
        place_food(&mut state, Point::new(6, 5), FoodKind::Normal);
        state.power_ups = vec![PowerUp {
            pos: Point::new(19, 10),
            kind: Effect::Invincible,
            spawned_at: now,
        }];

        state.tick(now).unwrap();
        assert_eq!(state.score(PlayerId::One), 10);
        assert!(
            state
                .snake(PlayerId::Two)
                .effects()
                .is_active(Effect::Invincible)
        );
    }

    #[test]
    fn lifecycle_transitions() {
        let mut state = DuelState::with_seed(ArenaConfig::default(), 2);
        assert_eq!(state.phase(), MatchPhase::Idle);

        // Pause/resume are only valid around Running.
        state.pause();
        assert_eq!(state.phase(), MatchPhase::Idle);

        state.start_round();
        assert_eq!(state.phase(), MatchPhase::Running);
        assert_eq!(state.food().len(), 1);

        // start_round is a no-op while Running.
        let head = state.snake(PlayerId::One).head();
        state.start_round();
        assert_eq!(state.snake(PlayerId::One).head(), head);

        state.pause();
        assert_eq!(state.phase(), MatchPhase::Paused);
        let report = state.tick(Instant::now()).unwrap();
        assert!(report.is_none());
        assert_eq!(
            state.snake(PlayerId::One).head(),
            head,
            "paused ticks leave entity state untouched"
        );

        state.resume();
        assert_eq!(state.phase(), MatchPhase::Running);
        state.tick(Instant::now()).unwrap();
        assert_ne!(state.snake(PlayerId::One).head(), head);

        state.reset_match();
        assert_eq!(state.phase(), MatchPhase::Idle);
        assert_eq!(state.round_wins(), [0, 0]);
        assert_eq!(state.scores(), [0, 0]);
        assert!(state.food().is_empty());
    }

    #[test]
    fn ended_round_reports_once_and_tallies_persist() {
        let mut state = arena(1);
        state.snakes[0] = Snake::new(Point::new(0, 5), Direction::Left, 3);
        let now = Instant::now();
        assert!(state.tick(now).unwrap().is_some());
        // Ended: further ticks are inert and report nothing.
        assert!(state.tick(now + TICK).unwrap().is_none());
        assert_eq!(state.phase(), MatchPhase::Ended);

        state.start_round();
        assert_eq!(state.phase(), MatchPhase::Running);
        assert_eq!(state.round_wins(), [0, 1], "tally persists across rounds");
        assert_eq!(state.scores(), [0, 0], "round scores reset");
        assert!(state.snake(PlayerId::One).is_alive());
    }

    /// Scripted input stream used by the longer-running property tests.
    fn scripted_input(i: u64) -> Option<(PlayerId, Direction)> {
        match i % 11 {
            0 => Some((PlayerId::One, Direction::Up)),
            2 => Some((PlayerId::One, Direction::Right)),
            4 => Some((PlayerId::One, Direction::Down)),
            5 => Some((PlayerId::Two, Direction::Down)),
            7 => Some((PlayerId::Two, Direction::Left)),
            9 => Some((PlayerId::Two, Direction::Up)),
            _ => None,
        }
    }

    fn run_scripted(seed: u64, ticks: u64) -> DuelState {
        let t0 = Instant::now();
        let mut state = DuelState::with_seed(ArenaConfig::default(), seed);
        state.start_round();
        for i in 0..ticks {
            if state.phase() == MatchPhase::Ended {
                state.start_round();
            }
            if let Some((player, dir)) = scripted_input(i) {
                state.set_direction(player, dir);
            }
            state.tick(t0 + TICK * i as u32).expect("consistent state");
        }
        state
    }

    #[test]
    fn identical_seed_and_inputs_reproduce_the_match() {
        // Both runs anchor their own clock; only durations matter.
        let a = run_scripted(77, 600);
        let b = run_scripted(77, 600);

        assert_eq!(a.scores(), b.scores());
        assert_eq!(a.round_wins(), b.round_wins());
        assert_eq!(a.phase(), b.phase());
        for player in PlayerId::BOTH {
            let bodies_a: Vec<Point> = a.snake(player).segments().copied().collect();
            let bodies_b: Vec<Point> = b.snake(player).segments().copied().collect();
            assert_eq!(bodies_a, bodies_b);
            assert_eq!(a.snake(player).is_alive(), b.snake(player).is_alive());
        }
        assert_eq!(a.food().to_vec(), b.food().to_vec());
        let pickups_a: Vec<(Point, Effect)> =
            a.power_ups().iter().map(|p| (p.pos, p.kind)).collect();
        let pickups_b: Vec<(Point, Effect)> =
            b.power_ups().iter().map(|p| (p.pos, p.kind)).collect();
        assert_eq!(pickups_a, pickups_b);
    }

    #[test]
    fn body_length_never_decreases_mid_round() {
        let t0 = Instant::now();
        let mut state = DuelState::with_seed(ArenaConfig::default(), 123);
        state.start_round();
        let mut prev = [state.snake(PlayerId::One).len(), state.snake(PlayerId::Two).len()];
        for i in 0..600u64 {
            if state.phase() == MatchPhase::Ended {
                state.start_round();
                prev = [
                    state.snake(PlayerId::One).len(),
                    state.snake(PlayerId::Two).len(),
                ];
            }
            if let Some((player, dir)) = scripted_input(i) {
                state.set_direction(player, dir);
            }
            state.tick(t0 + TICK * i as u32).expect("consistent state");
            for player in PlayerId::BOTH {
                let len = state.snake(player).len();
                let delta = len as i64 - prev[player.index()] as i64;
                assert!(
                    delta == 0 || delta == 1,
                    "length moved by {delta} on tick {i}"
                );
                prev[player.index()] = len;
            }
        }
    }

    #[test]
    fn alive_bodies_hold_no_duplicate_cells() {
        let t0 = Instant::now();
        let mut state = DuelState::with_seed(ArenaConfig::default(), 456);
        state.start_round();
        for i in 0..600u64 {
            if state.phase() == MatchPhase::Ended {
                state.start_round();
            }
            if let Some((player, dir)) = scripted_input(i) {
                state.set_direction(player, dir);
            }
            // check_consistency runs inside tick; an Err here is the
            // invariant failing.
            state.tick(t0 + TICK * i as u32).expect("no body overlap");
        }
    }
}
