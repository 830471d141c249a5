use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use carconsole::{
    ClientMessage, ControllerState, Pedal, PedalInput, ROOM_CODE_LEN, RoomCode, ServerMessage,
    Steer, SteerTracker, restart_sequence, validate_room_code,
};

use crate::net::{ClientConfig, RelayClient};
use crate::tui::{self, ControllerView, Tui};

/// Keyboard stand-in for the phone controller. Pedals toggle since a
/// terminal reports presses but not releases.
#[derive(Debug, Default)]
struct ControllerApp {
    state: ControllerState,
    input: String,
    validation: Option<String>,
    tracker: SteerTracker,
    gas: bool,
    brake: bool,
    should_quit: bool,
}

impl ControllerApp {
    fn apply(&mut self, message: &ServerMessage) {
        let was_joined = self.state.is_joined();
        self.state.apply(message);
        if was_joined && !self.state.is_joined() {
            self.release();
        }
    }

    fn release(&mut self) {
        self.tracker.reset();
        self.gas = false;
        self.brake = false;
    }

    fn join(&mut self, code: &RoomCode) -> Vec<ClientMessage> {
        self.validation = None;
        self.state.error = None;
        vec![ClientMessage::JoinRoom(code.to_string())]
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Vec<ClientMessage> {
        if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
            self.should_quit = true;
            return Vec::new();
        }
        if self.state.is_joined() {
            self.handle_pad_key(code)
        } else {
            self.handle_join_key(code)
        }
    }

    fn handle_join_key(&mut self, code: KeyCode) -> Vec<ClientMessage> {
        match code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => match validate_room_code(&self.input) {
                Ok(room) => return self.join(&room),
                Err(err) => self.validation = Some(err.to_string()),
            },
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_alphanumeric() && self.input.len() < ROOM_CODE_LEN => {
                self.input.push(c.to_ascii_uppercase());
            }
            _ => {}
        }
        Vec::new()
    }

    fn handle_pad_key(&mut self, code: KeyCode) -> Vec<ClientMessage> {
        let steer = match code {
            KeyCode::Left | KeyCode::Char('a') => Some(Steer::Left),
            KeyCode::Right | KeyCode::Char('d') => Some(Steer::Right),
            KeyCode::Up | KeyCode::Down | KeyCode::Char(' ') => Some(Steer::Center),
            _ => None,
        };
        if let Some(steer) = steer {
            return self.tracker.set(steer).into_iter().collect();
        }

        match code {
            KeyCode::Char('w') => {
                self.gas = !self.gas;
                vec![ClientMessage::PedalInput(PedalInput::new(Pedal::Gas, self.gas))]
            }
            KeyCode::Char('s') => {
                self.brake = !self.brake;
                vec![ClientMessage::PedalInput(PedalInput::new(
                    Pedal::Brake,
                    self.brake,
                ))]
            }
            KeyCode::Char('r') => {
                self.release();
                self.state.game_over = false;
                restart_sequence().into()
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn view(&self, connected: bool) -> ControllerView<'_> {
        ControllerView {
            state: &self.state,
            input: &self.input,
            validation: self.validation.as_deref(),
            steer: self.tracker.current(),
            gas: self.gas,
            brake: self.brake,
            connected,
        }
    }
}

/// Joins `room` right away when given, otherwise asks for a code.
pub async fn run(config: ClientConfig, room: Option<RoomCode>) -> Result<()> {
    let mut client = RelayClient::connect(&config.server_url).await?;
    let mut app = ControllerApp::default();
    if let Some(room) = &room {
        app.input = room.to_string();
        for message in app.join(room) {
            client.send(message);
        }
    }

    let mut tui = Tui::new()?;

    while !app.should_quit {
        for message in client.drain() {
            app.apply(&message);
        }

        let connected = client.is_connected();
        tui.draw(|frame| tui::render_controller(frame, &app.view(connected)))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    for message in app.handle_key(key.code, key.modifiers) {
                        client.send(message);
                    }
                }
            }
        }
    }

    tui.restore_terminal()?;
    Ok(())
}
