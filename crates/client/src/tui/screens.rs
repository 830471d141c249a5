use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use carconsole::{ControllerState, RoundMode, RoundPhase, ScreenSession, Steer};

use super::road::draw_road;

pub fn render_screen(frame: &mut Frame, session: &ScreenSession, now: Instant, connected: bool) {
    let area = frame.area();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(30)])
        .split(area);

    let road_block = Block::default()
        .title(" Road ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let road_area = road_block.inner(columns[0]);
    frame.render_widget(road_block, columns[0]);

    if let Some(round) = session.round() {
        let lines = draw_road(round, road_area.width, road_area.height);
        frame.render_widget(Paragraph::new(lines), road_area);
    }

    render_sidebar(frame, columns[1], session, now, connected);

    if session.is_closed() {
        render_banner(frame, road_area, "Room closed", Color::Red);
    } else if session.phase() == RoundPhase::Over {
        let text = match session.round().and_then(|round| round.winner()) {
            Some(winner) => format!("GAME OVER - winner: {}", winner),
            None => "GAME OVER".to_string(),
        };
        render_banner(frame, road_area, &text, Color::Yellow);
    }
}

fn render_sidebar(
    frame: &mut Frame,
    area: Rect,
    session: &ScreenSession,
    now: Instant,
    connected: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(4),
        ])
        .split(area);

    let code = session
        .room_code()
        .map(|code| code.to_string())
        .unwrap_or_else(|| "......".to_string());
    let code_color = if connected { Color::Green } else { Color::Red };
    let room = Paragraph::new(Line::from(Span::styled(
        code,
        Style::default().fg(code_color).add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title(" Room ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(room, chunks[0]);

    let mut lines = vec![Line::from(format!(
        "Players: {}/{}",
        session.player_count(),
        session.capacity()
    ))];

    match session.round() {
        Some(round) => {
            let clock = match (round.mode(), round.remaining(now)) {
                (RoundMode::Versus, Some(remaining)) => {
                    format!("Time left: {}s", remaining.as_secs())
                }
                _ => format!("Time: {}s", round.elapsed(now).as_secs()),
            };
            lines.push(Line::from(clock));
            lines.push(Line::from(""));
            for car in round.players() {
                let status = if car.crashed { " (crashed)" } else { "" };
                lines.push(Line::from(format!(
                    "P{}  {:>5}  {:>4.1}{}",
                    u16::from(car.index) + 1,
                    car.score,
                    car.forward_speed,
                    status
                )));
            }
        }
        None => {
            lines.push(Line::from(""));
            for index in session.roster() {
                lines.push(Line::from(format!("P{} ready", u16::from(index) + 1)));
            }
            if session.player_count() == 0 {
                lines.push(Line::from(Span::styled(
                    "Waiting for controllers...",
                    Style::default().fg(Color::DarkGray),
                )));
            }
        }
    }

    if let Some(error) = session.last_error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )));
    }

    let status = Paragraph::new(lines).block(
        Block::default()
            .title(" Lobby ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow)),
    );
    frame.render_widget(status, chunks[1]);

    let help = Paragraph::new("Enter Start  R Restart\nQ Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" Controls ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(help, chunks[2]);
}

fn render_banner(frame: &mut Frame, area: Rect, text: &str, color: Color) {
    let banner_area = centered_rect(text.len() as u16 + 6, 3, area);
    frame.render_widget(Clear, banner_area);
    let banner = Paragraph::new(text.to_string())
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(banner, banner_area);
}

pub struct ControllerView<'a> {
    pub state: &'a ControllerState,
    pub input: &'a str,
    pub validation: Option<&'a str>,
    pub steer: Steer,
    pub gas: bool,
    pub brake: bool,
    pub connected: bool,
}

pub fn render_controller(frame: &mut Frame, view: &ControllerView) {
    let area = frame.area();
    let block = Block::default()
        .title(" Car Console Controller ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(block, area);

    if view.state.is_joined() {
        render_pad(frame, area, view);
    } else {
        render_join(frame, area, view);
    }
}

fn render_join(frame: &mut Frame, area: Rect, view: &ControllerView) {
    let dialog_area = centered_rect(40, 9, area);
    frame.render_widget(Clear, dialog_area);

    let dialog = Block::default()
        .title(" Join Room ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(dialog, dialog_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .split(dialog_area);

    let label = Paragraph::new("Room code:").style(Style::default().fg(Color::White));
    frame.render_widget(label, inner[0]);

    let input = Paragraph::new(format!("{}_", view.input))
        .style(Style::default().fg(Color::White))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow)),
        );
    frame.render_widget(input, inner[1]);

    let error = view
        .validation
        .or(view.state.error.as_deref())
        .or((!view.connected).then_some("Disconnected from server"));
    if let Some(error) = error {
        let error_text = Paragraph::new(error.to_string())
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center);
        frame.render_widget(error_text, inner[2]);
    }

    let help = Paragraph::new("Enter Join  Esc Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, inner[3]);
}

fn render_pad(frame: &mut Frame, area: Rect, view: &ControllerView) {
    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(5),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let player = view
        .state
        .player_index
        .map(|index| format!("Player {}", u16::from(index) + 1))
        .unwrap_or_default();
    let room = view
        .state
        .room
        .as_ref()
        .map(|code| code.to_string())
        .unwrap_or_default();
    let header = Paragraph::new(format!(
        "{}  |  Room {}  |  {} connected",
        player, room, view.state.total_players
    ))
    .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
    .alignment(Alignment::Center);
    frame.render_widget(header, inner[0]);

    let controls = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(20),
        ])
        .split(inner[1]);

    let pads = [
        ("<", view.steer == Steer::Left, Color::Cyan),
        ("-", view.steer == Steer::Center, Color::DarkGray),
        (">", view.steer == Steer::Right, Color::Cyan),
        ("GAS", view.gas, Color::Green),
        ("BRAKE", view.brake, Color::Red),
    ];
    for ((label, active, color), area) in pads.into_iter().zip(controls.iter()) {
        let style = if active {
            Style::default().fg(Color::Black).bg(color)
        } else {
            Style::default().fg(color)
        };
        let pad = Paragraph::new(label)
            .style(style)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(pad, *area);
    }

    if view.state.game_over {
        let text = Paragraph::new("GAME OVER - press R to restart")
            .style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center);
        frame.render_widget(text, inner[2]);
    }

    let help = Paragraph::new("←/→ Steer  ↑/↓ Center  W Gas  S Brake  R Restart  Q Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, inner[3]);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
