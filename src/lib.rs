pub mod arena;
pub mod pickups;
pub mod render;
pub mod snake;

pub use arena::{DuelState, MatchPhase, RoundOutcome, RoundReport, SimError};
pub use pickups::{Effect, Food, FoodKind, PowerUp};
pub use snake::Snake;

/// Integer coordinate type for grid cells (not pixels)
pub type Coord = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: Coord,
    pub y: Coord,
}

impl Point {
    #[inline]
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    /// The neighboring cell one step along `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.dx_dy();
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    #[inline]
    pub fn dx_dy(self) -> (Coord, Coord) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    #[inline]
    pub fn is_opposite(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Up, Self::Down)
                | (Self::Down, Self::Up)
                | (Self::Right, Self::Left)
                | (Self::Left, Self::Right)
        )
    }
}

/// One of the two local players. Doubles as an index into the
/// per-player arrays kept by the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerId {
    One,
    Two,
}

impl PlayerId {
    pub const BOTH: [Self; 2] = [Self::One, Self::Two];

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    #[inline]
    pub const fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArenaConfig {
    pub width: Coord,
    pub height: Coord,
    /// Initial snake length (>= 1)
    pub initial_len: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            width: 32,
            height: 24,
            initial_len: 3,
        }
    }
}

impl ArenaConfig {
    #[inline]
    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.x < self.width && p.y >= 0 && p.y < self.height
    }
}
