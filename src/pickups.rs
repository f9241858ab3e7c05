use rand::Rng;
use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::{ArenaConfig, Point};

pub const NORMAL_FOOD_POINTS: u32 = 10;
pub const BONUS_FOOD_POINTS: u32 = 25;
/// Chance that a freshly spawned food is the bonus kind.
const BONUS_FOOD_ODDS: f64 = 0.2;

/// Per-tick chance of attempting a power-up spawn.
const POWER_UP_SPAWN_CHANCE: f64 = 0.005;
pub const MAX_POWER_UPS: usize = 3;
pub const POWER_UP_LIFETIME: Duration = Duration::from_secs(10);

/// Random-position trials before a spawn attempt gives up (food falls
/// back to a full scan; power-ups simply retry on a later tick).
const SPAWN_TRIALS: usize = 32;

/// Timed modifier granted by a power-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    SpeedBoost,
    Invincible,
    DoubleScore,
}

impl Effect {
    pub const ALL: [Self; 3] = [Self::SpeedBoost, Self::Invincible, Self::DoubleScore];

    pub fn duration(self) -> Duration {
        match self {
            Self::SpeedBoost => Duration::from_secs(5),
            Self::Invincible => Duration::from_secs(3),
            Self::DoubleScore => Duration::from_secs(8),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodKind {
    Normal,
    Bonus,
}

impl FoodKind {
    pub fn points(self) -> u32 {
        match self {
            Self::Normal => NORMAL_FOOD_POINTS,
            Self::Bonus => BONUS_FOOD_POINTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Food {
    pub pos: Point,
    pub kind: FoodKind,
}

#[derive(Debug, Clone, Copy)]
pub struct PowerUp {
    pub pos: Point,
    pub kind: Effect,
    pub spawned_at: Instant,
}

impl PowerUp {
    pub fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.spawned_at) > POWER_UP_LIFETIME
    }
}

fn random_cell(cfg: &ArenaConfig, rng: &mut impl Rng) -> Point {
    Point::new(
        rng.random_range(0..cfg.width),
        rng.random_range(0..cfg.height),
    )
}

/// Spawn one food on a uniformly random free cell, `occupied` being the
/// union of both snake bodies and any existing food. Rejection sampling
/// first; if the trials all land on occupied cells, fall back to scanning
/// for the free cells so the spawn succeeds whenever one exists. Returns
/// `None` only when the grid is completely full.
pub fn spawn_food(cfg: &ArenaConfig, occupied: &HashSet<Point>, rng: &mut impl Rng) -> Option<Food> {
    let kind = if rng.random_bool(BONUS_FOOD_ODDS) {
        FoodKind::Bonus
    } else {
        FoodKind::Normal
    };

    for _ in 0..SPAWN_TRIALS {
        let p = random_cell(cfg, rng);
        if !occupied.contains(&p) {
            return Some(Food { pos: p, kind });
        }
    }

    let free: Vec<Point> = (0..cfg.height)
        .flat_map(|y| (0..cfg.width).map(move |x| Point::new(x, y)))
        .filter(|p| !occupied.contains(p))
        .collect();
    if free.is_empty() {
        return None;
    }
    let pos = free[rng.random_range(0..free.len())];
    Some(Food { pos, kind })
}

/// Per-tick power-up upkeep: occasionally spawn one on a cell free of
/// snake bodies, food, and other power-ups (capped at [`MAX_POWER_UPS`]),
/// and remove any that outlived [`POWER_UP_LIFETIME`]. `occupied` is the
/// union of both snake bodies and food cells.
pub fn maintain_power_ups(
    cfg: &ArenaConfig,
    occupied: &HashSet<Point>,
    power_ups: &mut Vec<PowerUp>,
    now: Instant,
    rng: &mut impl Rng,
) {
    if power_ups.len() < MAX_POWER_UPS && rng.random_bool(POWER_UP_SPAWN_CHANCE) {
        for _ in 0..SPAWN_TRIALS {
            let p = random_cell(cfg, rng);
            if occupied.contains(&p) || power_ups.iter().any(|pu| pu.pos == p) {
                continue;
            }
            let kind = Effect::ALL[rng.random_range(0..Effect::ALL.len())];
            power_ups.push(PowerUp {
                pos: p,
                kind,
                spawned_at: now,
            });
            break;
        }
    }

    power_ups.retain(|pu| !pu.expired(now));
}
