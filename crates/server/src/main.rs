mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::ServerConfig;
use server::{RelayServer, ServerHandle};
use tui::TuiState;

#[derive(Parser)]
#[command(name = "carconsole-server")]
#[command(about = "Room relay for the car console game")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, env = "PORT", default_value_t = carconsole::DEFAULT_PORT)]
    port: u16,

    #[arg(
        short,
        long,
        default_value_t = carconsole::DEFAULT_MAX_PLAYERS,
        help = "Controllers per room, clamped to 1..=4"
    )]
    max_players: usize,

    #[arg(long, default_value_t = 500, help = "Lines kept in the dashboard log")]
    log_capacity: usize,

    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.bind, args.port),
        max_players: carconsole::clamp_max_players(args.max_players),
        log_capacity: args.log_capacity,
    };
    let log_capacity = config.log_capacity;

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let server = RelayServer::bind(config).await?;
    let mut handle = server.spawn()?;

    if args.headless {
        run_headless(&mut handle).await;
    } else {
        run_with_tui(&mut handle, log_capacity)?;
    }

    handle.shutdown();
    Ok(())
}

async fn run_headless(handle: &mut ServerHandle) {
    loop {
        tokio::select! {
            event = handle.next_event() => match event {
                Some(event) => event.log(),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Server shutting down");
                break;
            }
        }
    }
}

fn run_with_tui(handle: &mut ServerHandle, log_capacity: usize) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let mut tui_state = TuiState::new(log_capacity);
    tui_state.log_info(format!("Dashboard attached to ws://{}", handle.local_addr()));

    loop {
        for event in handle.drain_events() {
            tui_state.push_event(&event);
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::PageUp => tui_state.scroll_up(),
                        KeyCode::PageDown => tui_state.scroll_down(),
                        KeyCode::End => tui_state.scroll_to_bottom(),
                        _ => {}
                    }
                }
            }
        }

        let stats = handle.stats();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats);
        })?;
    }

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
