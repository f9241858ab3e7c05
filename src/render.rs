use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

use crate::pickups::{Effect, FoodKind};
use crate::{Coord, DuelState, PlayerId, Point};

/// What occupies one grid cell, for drawing. Built fresh from a borrowed
/// `DuelState` each frame; never holds a handle back into the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Head(PlayerId),
    Body(PlayerId),
    Food(FoodKind),
    Power(Effect),
}

impl Cell {
    /// ASCII glyph, used by the `Display` debug view.
    fn glyph(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Head(PlayerId::One) => 'A',
            Self::Body(PlayerId::One) => 'a',
            Self::Head(PlayerId::Two) => 'B',
            Self::Body(PlayerId::Two) => 'b',
            Self::Food(FoodKind::Normal) => '*',
            Self::Food(FoodKind::Bonus) => '%',
            Self::Power(Effect::SpeedBoost) => 'S',
            Self::Power(Effect::Invincible) => 'I',
            Self::Power(Effect::DoubleScore) => 'D',
        }
    }

    fn style(self) -> Style {
        match self {
            Self::Empty => Style::default(),
            Self::Head(PlayerId::One) => Style::default().fg(Color::LightGreen),
            Self::Body(PlayerId::One) => Style::default().fg(Color::Green),
            Self::Head(PlayerId::Two) => Style::default().fg(Color::LightCyan),
            Self::Body(PlayerId::Two) => Style::default().fg(Color::Cyan),
            Self::Food(FoodKind::Normal) => Style::default().fg(Color::Red),
            Self::Food(FoodKind::Bonus) => Style::default().fg(Color::Yellow),
            Self::Power(_) => Style::default().fg(Color::Magenta),
        }
    }

    fn tui_glyph(self) -> char {
        match self {
            Self::Empty => ' ',
            Self::Head(_) => '█',
            Self::Body(_) => '▓',
            Self::Food(_) => '●',
            Self::Power(_) => self.glyph(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CellGrid {
    pub width: Coord,
    pub height: Coord,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn new(width: Coord, height: Coord) -> Self {
        let size = (width.max(0) * height.max(0)) as usize;
        Self {
            width,
            height,
            cells: vec![Cell::Empty; size],
        }
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            None
        } else {
            Some((p.y * self.width + p.x) as usize)
        }
    }

    /// Out-of-grid positions are ignored: a dead snake's head may sit one
    /// cell beyond the boundary.
    pub fn set(&mut self, p: Point, cell: Cell) {
        if let Some(i) = self.idx(p) {
            self.cells[i] = cell;
        }
    }

    pub fn get(&self, p: Point) -> Cell {
        self.idx(p).map_or(Cell::Empty, |i| self.cells[i])
    }
}

impl std::fmt::Display for CellGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for y in 0..self.height {
            for x in 0..self.width {
                write!(f, "{}", self.get(Point::new(x, y)).glyph())?;
            }
            if y + 1 < self.height {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

/// Snapshot the field into a cell raster. Pickups are painted first,
/// then bodies, then heads, so a head is visible on the cell it crashed
/// into.
pub fn rasterize(state: &DuelState) -> CellGrid {
    let cfg = state.config();
    let mut grid = CellGrid::new(cfg.width, cfg.height);
    for food in state.food() {
        grid.set(food.pos, Cell::Food(food.kind));
    }
    for power_up in state.power_ups() {
        grid.set(power_up.pos, Cell::Power(power_up.kind));
    }
    for player in PlayerId::BOTH {
        for &seg in state.snake(player).segments().skip(1) {
            grid.set(seg, Cell::Body(player));
        }
    }
    for player in PlayerId::BOTH {
        grid.set(state.snake(player).head(), Cell::Head(player));
    }
    grid
}

/// Colored ratatui text for the host frame, one styled span per cell.
pub fn to_text(grid: &CellGrid) -> Text<'static> {
    let lines = (0..grid.height)
        .map(|y| {
            Line::from(
                (0..grid.width)
                    .map(|x| {
                        let cell = grid.get(Point::new(x, y));
                        Span::styled(cell.tui_glyph().to_string(), cell.style())
                    })
                    .collect::<Vec<_>>(),
            )
        })
        .collect::<Vec<_>>();
    Text::from(lines)
}
