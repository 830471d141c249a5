mod controller;
mod net;
mod screen;
mod tui;

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};

use carconsole::{room_code_from_link, validate_room_code};

use net::ClientConfig;

#[derive(Parser)]
#[command(name = "carconsole")]
#[command(about = "Car console screen and controller")]
struct Args {
    #[arg(
        short,
        long,
        global = true,
        help = "Relay address (e.g., ws://127.0.0.1:3333)"
    )]
    server: Option<String>,

    #[arg(long, global = true, help = "Write logs here; the terminal belongs to the UI")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host a room and show the road.
    Screen {
        #[arg(
            long,
            default_value_t = carconsole::DEFAULT_MAX_PLAYERS,
            help = "Lobby size that starts the round, clamped to 1..=4"
        )]
        players: usize,

        #[arg(long, default_value_t = 16, help = "Milliseconds per frame")]
        frame_ms: u64,

        #[arg(long, help = "Seed for a repeatable obstacle stream")]
        seed: Option<u64>,
    },
    /// Drive a car in someone else's room.
    Controller {
        #[arg(short, long, conflicts_with = "link")]
        room: Option<String>,

        #[arg(short, long, help = "Join link carrying a ?room= code")]
        link: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        let file = File::create(path)?;
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }

    let mut config = ClientConfig::default();
    if let Some(server) = args.server {
        config.server_url = server;
    }

    match args.command {
        Command::Screen {
            players,
            frame_ms,
            seed,
        } => {
            config.lobby_capacity = carconsole::clamp_max_players(players);
            config.frame_interval = Duration::from_millis(frame_ms.max(1));
            screen::run(config, seed).await
        }
        Command::Controller { room, link } => {
            let room = match (room, link) {
                (Some(room), _) => Some(validate_room_code(&room)?),
                (None, Some(link)) => match room_code_from_link(&link) {
                    Some(room) => Some(room),
                    None => bail!("{} does not carry a room code", link),
                },
                (None, None) => None,
            };
            controller::run(config, room).await
        }
    }
}
