use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Row, Table};

use crate::events::ServerEvent;
use crate::server::ServerStats;

pub struct LogEntry {
    pub level: log::Level,
    pub message: String,
}

pub struct TuiState {
    logs: VecDeque<LogEntry>,
    capacity: usize,
    scroll: usize,
}

impl TuiState {
    pub fn new(capacity: usize) -> Self {
        Self {
            logs: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            scroll: 0,
        }
    }

    pub fn push_event(&mut self, event: &ServerEvent) {
        self.push(event.level(), event.message());
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(log::Level::Info, message.into());
    }

    fn push(&mut self, level: log::Level, message: String) {
        if self.logs.len() == self.capacity {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry { level, message });
    }

    pub fn scroll_up(&mut self) {
        self.scroll = (self.scroll + 5).min(self.logs.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_sub(5);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }

    /// Most recent last, skipping `scroll` entries from the bottom.
    pub fn visible(&self, rows: usize) -> impl Iterator<Item = &LogEntry> {
        let end = self.logs.len().saturating_sub(self.scroll);
        let start = end.saturating_sub(rows);
        self.logs.range(start..end)
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, stats: &ServerStats) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(8),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_capacity(frame, chunks[1], stats);
    render_rooms(frame, chunks[2], stats);
    render_logs(frame, chunks[3], state);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(
        " Car Console Relay - Uptime: {} ",
        format_duration(stats.uptime_secs)
    );

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Connections: {}  |  Rooms: {}  |  Frames: {} in / {} out",
        stats.connections,
        stats.rooms.len(),
        stats.frames_in,
        stats.frames_out
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_capacity(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Seats ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let seats = stats.rooms.len() * stats.max_players;
    let taken: usize = stats.rooms.iter().map(|room| room.controllers).sum();
    let ratio = if seats == 0 {
        0.0
    } else {
        taken as f64 / seats as f64
    };

    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!("{}/{} controllers seated", taken, seats));

    frame.render_widget(gauge, area);
}

fn render_rooms(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Rooms ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let header = Row::new(["Code", "Players", "Age"])
        .style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));

    let rows = stats.rooms.iter().map(|room| {
        let players = format!("{}/{}", room.controllers, room.max_players);
        let color = if room.controllers >= room.max_players {
            Color::Green
        } else {
            Color::White
        };
        Row::new([
            room.code.to_string(),
            players,
            format_duration(room.age_secs),
        ])
        .style(Style::default().fg(color))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn render_logs(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let rows = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .visible(rows)
        .map(|entry| {
            let color = match entry.level {
                log::Level::Error => Color::Red,
                log::Level::Warn => Color::Yellow,
                log::Level::Info => Color::White,
                _ => Color::DarkGray,
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<5} ", entry.level),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
                Span::styled(entry.message.clone(), Style::default().fg(color)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("q/ESC quit  |  PgUp/PgDn scroll log  |  End follow log")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_is_bounded_and_scrolls() {
        let mut state = TuiState::new(3);
        for i in 0..5 {
            state.log_info(format!("line {}", i));
        }

        let visible: Vec<_> = state.visible(10).map(|e| e.message.as_str()).collect();
        assert_eq!(visible, ["line 2", "line 3", "line 4"]);

        state.scroll_up();
        let visible: Vec<_> = state.visible(10).map(|e| e.message.as_str()).collect();
        assert_eq!(visible, ["line 2"]);

        state.scroll_to_bottom();
        assert_eq!(state.visible(1).count(), 1);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(3725), "01:02:05");
    }
}
