use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use carconsole::{ClientMessage, PhysicsConfig, ScreenSession};

use crate::net::{ClientConfig, RelayClient};
use crate::tui::{self, Tui};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    None,
    Quit,
    Start,
    Send(ClientMessage),
}

fn handle_key(code: KeyCode, modifiers: KeyModifiers) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Enter => Action::Start,
        // the relay echoes restart-game back to the screen
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Send(ClientMessage::RestartGame),
        _ => Action::None,
    }
}

/// Hosts a room and runs the engine at the configured frame interval.
pub async fn run(config: ClientConfig, seed: Option<u64>) -> Result<()> {
    let mut client = RelayClient::connect(&config.server_url).await?;
    client.send(ClientMessage::CreateRoom);

    let physics = PhysicsConfig::default();
    let mut session = match seed {
        Some(seed) => ScreenSession::with_seed(physics, config.lobby_capacity, seed),
        None => ScreenSession::new(physics, config.lobby_capacity),
    };

    let mut tui = Tui::new()?;
    let mut next_frame = Instant::now();

    loop {
        let now = Instant::now();
        for message in client.drain() {
            session.apply(message, now);
        }

        if now >= next_frame {
            if let Some(game_over) = session.frame(now) {
                client.send(game_over);
            }
            next_frame += config.frame_interval;
            if next_frame < now {
                next_frame = now + config.frame_interval;
            }
        }

        let connected = client.is_connected();
        tui.draw(|frame| tui::render_screen(frame, &session, now, connected))?;

        let wait = next_frame
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1));
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match handle_key(key.code, key.modifiers) {
                        Action::None => {}
                        Action::Quit => break,
                        Action::Start => {
                            if !session.start(Instant::now()) {
                                log::debug!("nothing to start");
                            }
                        }
                        Action::Send(message) => client.send(message),
                    }
                }
            }
        }
    }

    tui.restore_terminal()?;
    Ok(())
}
