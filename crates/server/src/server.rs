use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Result;
use futures_util::{SinkExt, Stream, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use carconsole::{
    ClientMessage, ConnectionId, Delivery, Gateway, Role, RoomCode, RoomRegistry, ServerMessage,
};

use crate::config::ServerConfig;
use crate::events::ServerEvent;

#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub code: RoomCode,
    pub controllers: usize,
    pub max_players: usize,
    pub age_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ServerStats {
    pub uptime_secs: u64,
    pub connections: usize,
    pub max_players: usize,
    pub rooms: Vec<RoomSummary>,
    pub frames_in: u64,
    pub frames_out: u64,
}

#[derive(Debug)]
enum Command {
    Connected {
        connection: ConnectionId,
        addr: SocketAddr,
        outbound: mpsc::UnboundedSender<Message>,
    },
    Inbound {
        connection: ConnectionId,
        message: ClientMessage,
    },
    Malformed {
        connection: ConnectionId,
        error: String,
    },
    Disconnected {
        connection: ConnectionId,
    },
}

pub struct RelayServer {
    listener: TcpListener,
    config: ServerConfig,
}

impl RelayServer {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Starts the accept loop and the dispatcher on the current runtime.
    pub fn spawn(self) -> Result<ServerHandle> {
        let local_addr = self.local_addr()?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let max_players = carconsole::clamp_max_players(self.config.max_players);
        let (stats_tx, stats_rx) = watch::channel(ServerStats {
            max_players,
            ..Default::default()
        });

        let _ = event_tx.send(ServerEvent::Listening { addr: local_addr });

        let dispatcher = Dispatcher {
            gateway: Gateway::new(RoomRegistry::new(max_players)),
            peers: HashMap::new(),
            events: event_tx.clone(),
            stats: stats_tx,
            started: Instant::now(),
            max_players,
            frames_in: 0,
            frames_out: 0,
        };

        let dispatcher = tokio::spawn(dispatcher.run(command_rx));
        let accept = tokio::spawn(accept_loop(self.listener, command_tx, event_tx));

        Ok(ServerHandle {
            local_addr,
            events: event_rx,
            stats: stats_rx,
            accept,
            dispatcher,
        })
    }
}

pub struct ServerHandle {
    local_addr: SocketAddr,
    events: mpsc::UnboundedReceiver<ServerEvent>,
    stats: watch::Receiver<ServerStats>,
    accept: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> ServerStats {
        self.stats.borrow().clone()
    }

    pub async fn next_event(&mut self) -> Option<ServerEvent> {
        self.events.recv().await
    }

    pub fn drain_events(&mut self) -> Vec<ServerEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    pub fn shutdown(self) {
        self.accept.abort();
        self.dispatcher.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let mut next_id: ConnectionId = 1;
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                let _ = events.send(ServerEvent::Error {
                    message: format!("accept failed: {}", err),
                });
                continue;
            }
        };

        let connection = next_id;
        next_id += 1;
        let commands = commands.clone();
        let events = events.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, addr, connection, commands).await {
                let _ = events.send(ServerEvent::Error {
                    message: format!("connection {} error: {}", connection, err),
                });
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connection: ConnectionId,
    commands: mpsc::UnboundedSender<Command>,
) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_write.send(msg).await.is_err() {
                break;
            }
        }
        let _ = ws_write.close().await;
    });

    commands.send(Command::Connected {
        connection,
        addr,
        outbound: tx,
    })?;

    let result = read_frames(&mut ws_read, connection, &commands).await;
    // the dispatcher drops the outbound sender, which ends the writer
    let _ = commands.send(Command::Disconnected { connection });
    result
}

async fn read_frames<S>(
    ws_read: &mut S,
    connection: ConnectionId,
    commands: &mpsc::UnboundedSender<Command>,
) -> Result<()>
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg) = ws_read.next().await {
        let msg = msg?;
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }

        let command = match ClientMessage::from_json(msg.to_text()?) {
            Ok(message) => Command::Inbound {
                connection,
                message,
            },
            Err(err) => Command::Malformed {
                connection,
                error: err.to_string(),
            },
        };
        commands.send(command)?;
    }
    Ok(())
}

/// Owns the gateway. Every command runs to completion before the next one.
struct Dispatcher {
    gateway: Gateway,
    peers: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    events: mpsc::UnboundedSender<ServerEvent>,
    stats: watch::Sender<ServerStats>,
    started: Instant,
    max_players: usize,
    frames_in: u64,
    frames_out: u64,
}

impl Dispatcher {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
            self.publish_stats();
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connected {
                connection,
                addr,
                outbound,
            } => {
                self.gateway.connect(connection);
                self.peers.insert(connection, outbound);
                self.emit(ServerEvent::ClientConnected { connection, addr });
            }
            Command::Inbound {
                connection,
                message,
            } => {
                self.frames_in += 1;
                let game_over = match &message {
                    ClientMessage::GameOver(data) => Some(data.winner),
                    _ => None,
                };

                let deliveries = self.gateway.handle(connection, message);
                self.report(connection, &deliveries);
                if let (Some(winner), Some(Role::Screen { room })) =
                    (game_over, self.gateway.role(connection))
                {
                    let room = room.clone();
                    self.emit(ServerEvent::GameOver { room, winner });
                }
                self.deliver(deliveries);
            }
            Command::Malformed { connection, error } => {
                self.emit(ServerEvent::MalformedFrame { connection, error });
            }
            Command::Disconnected { connection } => {
                let role = self.gateway.role(connection).cloned();
                let deliveries = self.gateway.disconnect(connection);
                self.peers.remove(&connection);
                self.deliver(deliveries);

                let Some(role) = role else {
                    return;
                };
                self.emit(ServerEvent::ClientDisconnected {
                    connection,
                    role: role.as_str(),
                });
                if let Role::Screen { room } = role {
                    self.emit(ServerEvent::RoomClosed { room });
                }
            }
        }
    }

    /// Lifecycle events are read off the replies addressed to the sender.
    fn report(&self, connection: ConnectionId, deliveries: &[Delivery]) {
        for delivery in deliveries.iter().filter(|d| d.to == connection) {
            match &delivery.message {
                ServerMessage::RoomCreated(room) => self.emit(ServerEvent::RoomCreated {
                    room: room.clone(),
                    screen: connection,
                }),
                ServerMessage::JoinedRoom(joined) => self.emit(ServerEvent::PlayerJoined {
                    room: joined.room_code.clone(),
                    connection,
                    player_index: joined.player_index,
                }),
                ServerMessage::Error(error) => self.emit(ServerEvent::JoinRejected {
                    connection,
                    reason: error.reason.clone(),
                }),
                _ => {}
            }
        }
    }

    fn deliver(&mut self, deliveries: Vec<Delivery>) {
        for Delivery { to, message } in deliveries {
            let Some(peer) = self.peers.get(&to) else {
                continue;
            };
            match message.to_json() {
                Ok(text) => {
                    if peer.send(Message::text(text)).is_ok() {
                        self.frames_out += 1;
                    }
                }
                Err(err) => self.emit(ServerEvent::Error {
                    message: format!("could not encode {}: {}", message.event_name(), err),
                }),
            }
        }
    }

    fn emit(&self, event: ServerEvent) {
        let _ = self.events.send(event);
    }

    fn publish_stats(&self) {
        let now = Instant::now();
        let mut rooms: Vec<_> = self
            .gateway
            .registry()
            .rooms()
            .map(|room| RoomSummary {
                code: room.code.clone(),
                controllers: room.controller_count(),
                max_players: room.max_players(),
                age_secs: now.duration_since(room.created_at).as_secs(),
            })
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));

        self.stats.send_replace(ServerStats {
            uptime_secs: self.started.elapsed().as_secs(),
            connections: self.peers.len(),
            max_players: self.max_players,
            rooms,
            frames_in: self.frames_in,
            frames_out: self.frames_out,
        });
    }
}
