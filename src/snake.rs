use std::collections::VecDeque;
use std::time::Instant;

use crate::pickups::Effect;
use crate::{Direction, Point};

/// Timed status effects, each stored as an absolute expiry instant.
#[derive(Debug, Clone, Default)]
pub struct EffectSet {
    speed_boost: Option<Instant>,
    invincible: Option<Instant>,
    double_score: Option<Instant>,
}

impl EffectSet {
    fn slot_mut(&mut self, effect: Effect) -> &mut Option<Instant> {
        match effect {
            Effect::SpeedBoost => &mut self.speed_boost,
            Effect::Invincible => &mut self.invincible,
            Effect::DoubleScore => &mut self.double_score,
        }
    }

    /// Start the effect, or refresh its expiry if already active.
    pub fn apply(&mut self, effect: Effect, now: Instant) {
        *self.slot_mut(effect) = Some(now + effect.duration());
    }

    /// Clear every effect whose expiry has passed.
    pub fn expire(&mut self, now: Instant) {
        for slot in [
            &mut self.speed_boost,
            &mut self.invincible,
            &mut self.double_score,
        ] {
            if slot.is_some_and(|expiry| expiry <= now) {
                *slot = None;
            }
        }
    }

    pub fn is_active(&self, effect: Effect) -> bool {
        match effect {
            Effect::SpeedBoost => self.speed_boost.is_some(),
            Effect::Invincible => self.invincible.is_some(),
            Effect::DoubleScore => self.double_score.is_some(),
        }
    }

    pub fn active(&self) -> impl Iterator<Item = Effect> + '_ {
        Effect::ALL.into_iter().filter(|&e| self.is_active(e))
    }
}

/// One player's snake: an ordered body of cells (front = head), the
/// current movement direction, and a buffered next direction consumed at
/// the start of each tick.
#[derive(Debug, Clone)]
pub struct Snake {
    pub(crate) body: VecDeque<Point>,
    pub(crate) dir: Direction,
    /// Latest accepted direction request; applied on the next advance.
    pub(crate) buffered_dir: Option<Direction>,
    pub(crate) alive: bool,
    /// Skip tail removal on the next advance.
    pub(crate) pending_growth: bool,
    /// Tail cell shed by the advance of the current tick, if any.
    shed_tail: Option<Point>,
    pub(crate) effects: EffectSet,
}

impl Snake {
    /// Spawn a snake of `len` cells with its head at `head`, trailing
    /// away opposite to `dir`.
    pub fn new(head: Point, dir: Direction, len: usize) -> Self {
        let (dx, dy) = dir.dx_dy();
        let body = (0..len.max(1) as i32)
            .map(|i| Point::new(head.x - dx * i, head.y - dy * i))
            .collect();
        Self {
            body,
            dir,
            buffered_dir: None,
            alive: true,
            pending_growth: false,
            shed_tail: None,
            effects: EffectSet::default(),
        }
    }

    pub fn head(&self) -> Point {
        *self.body.front().expect("snake body is non-empty")
    }

    pub fn segments(&self) -> impl Iterator<Item = &Point> {
        self.body.iter()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn direction(&self) -> Direction {
        self.dir
    }

    pub fn effects(&self) -> &EffectSet {
        &self.effects
    }

    pub fn occupies(&self, p: Point) -> bool {
        self.body.contains(&p)
    }

    /// Request a direction change. A 180° reversal of the current
    /// direction is silently ignored; otherwise the request overwrites
    /// any earlier one (latest write wins).
    pub fn set_direction(&mut self, dir: Direction) {
        if dir.is_opposite(self.dir) {
            return;
        }
        self.buffered_dir = Some(dir);
    }

    /// Move one cell: apply the buffered direction, prepend the new head,
    /// and shed the tail unless growth is pending. The new head is not
    /// bounds-checked here; the resolver consumes out-of-grid heads.
    pub fn advance(&mut self) {
        if let Some(next) = self.buffered_dir.take() {
            self.dir = next;
        }
        let next_head = self.head().step(self.dir);
        self.body.push_front(next_head);
        if self.pending_growth {
            self.pending_growth = false;
            self.shed_tail = None;
        } else {
            self.shed_tail = self.body.pop_back();
        }
    }

    /// Lengthen by one segment. Called by the resolver on a food hit:
    /// the tail shed by this tick's advance is restored so the growth is
    /// visible immediately; with no shed tail the growth applies on the
    /// next advance instead.
    pub fn grow(&mut self) {
        match self.shed_tail.take() {
            Some(tail) => self.body.push_back(tail),
            None => self.pending_growth = true,
        }
    }

    pub fn apply_effect(&mut self, effect: Effect, now: Instant) {
        self.effects.apply(effect, now);
    }

    pub fn expire_effects(&mut self, now: Instant) {
        self.effects.expire(now);
    }

    /// Head overlapping any non-head body cell. Invincibility suppresses
    /// self-collision death (and only self-collision death).
    pub fn collides_with_self(&self) -> bool {
        if self.effects.is_active(Effect::Invincible) {
            return false;
        }
        let head = self.head();
        self.body.iter().skip(1).any(|&s| s == head)
    }

    /// Freeze in place; the body stays on the field for the rest of the
    /// round.
    pub fn kill(&mut self) {
        self.alive = false;
    }
}
