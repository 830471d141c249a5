use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use carconsole::physics::Rect;
use carconsole::{PhysicsConfig, Round};

const PLAYER_COLORS: [Color; 4] = [Color::Red, Color::Blue, Color::Green, Color::Magenta];

#[derive(Clone, Copy)]
struct Cell {
    glyph: char,
    style: Style,
}

struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    fn new(width: usize, height: usize) -> Self {
        let blank = Cell {
            glyph: ' ',
            style: Style::default(),
        };
        Self {
            width,
            height,
            cells: vec![blank; width * height],
        }
    }

    fn col(&self, x: f32) -> isize {
        (x / 100.0 * self.width as f32).floor() as isize
    }

    fn row(&self, y: f32) -> isize {
        (y / 100.0 * self.height as f32).floor() as isize
    }

    fn set(&mut self, col: isize, row: isize, glyph: char, style: Style) {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return;
        }
        self.cells[row as usize * self.width + col as usize] = Cell { glyph, style };
    }

    /// Fills every cell whose area the rect touches, clipped to the view.
    fn fill(&mut self, rect: &Rect, glyph: char, style: Style) {
        let max = rect.max();
        let (c0, c1) = (self.col(rect.min.x), self.col(max.x - 0.001));
        let (r0, r1) = (self.row(rect.min.y), self.row(max.y - 0.001));
        for row in r0..=r1 {
            for col in c0..=c1 {
                self.set(col, row, glyph, style);
            }
        }
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| {
                let spans: Vec<Span> = row
                    .iter()
                    .map(|cell| Span::styled(cell.glyph.to_string(), cell.style))
                    .collect();
                Line::from(spans)
            })
            .collect()
    }
}

/// Draws lanes, obstacles and cars into `width` x `height` cells.
pub fn draw_road(round: &Round, width: u16, height: u16) -> Vec<Line<'static>> {
    let config = round.config();
    let mut grid = Grid::new(width as usize, height as usize);

    draw_lanes(&mut grid, config, round.scroll_offset());

    let obstacle_style = Style::default().fg(Color::Yellow);
    for obstacle in round.obstacles() {
        grid.fill(&obstacle.rect(), '#', obstacle_style);
    }

    for car in round.players() {
        let color = PLAYER_COLORS[car.index as usize % PLAYER_COLORS.len()];
        let (glyph, style) = if car.crashed {
            ('x', Style::default().fg(Color::DarkGray))
        } else {
            (
                char::from_digit(u32::from(car.index) + 1, 10).unwrap_or('?'),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )
        };
        grid.fill(&car.rect(config), glyph, style);
    }

    grid.into_lines()
}

fn draw_lanes(grid: &mut Grid, config: &PhysicsConfig, scroll_offset: f32) {
    let edge = Style::default().fg(Color::White);
    let dash = Style::default().fg(Color::DarkGray);
    let left = grid.col(config.lane_min) - 1;
    let right = grid.col(config.lane_max) + 1;
    let middle = grid.col((config.lane_min + config.lane_max) / 2.0);
    let shift = (scroll_offset / config.scroll_cycle * 4.0) as isize;

    for row in 0..grid.height as isize {
        grid.set(left, row, '|', edge);
        grid.set(right, row, '|', edge);
        if (row + shift).rem_euclid(4) < 2 {
            grid.set(middle, row, ':', dash);
        }
    }
}
