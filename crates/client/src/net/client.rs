use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use carconsole::{ClientMessage, ServerMessage};

/// WebSocket link to the relay. Reads land in a channel drained once per
/// frame; writes go out through a dedicated task.
pub struct RelayClient {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    inbound: mpsc::UnboundedReceiver<ServerMessage>,
    connected: bool,
}

impl RelayClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws_stream, _) = connect_async(url)
            .await
            .with_context(|| format!("could not reach {}", url))?;
        log::info!("connected to {}", url);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let text = match message.to_json() {
                    Ok(text) => text,
                    Err(err) => {
                        log::error!("could not encode message: {}", err);
                        continue;
                    }
                };
                if ws_write.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
            let _ = ws_write.close().await;
        });

        tokio::spawn(async move {
            while let Some(frame) = ws_read.next().await {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(err) => {
                        log::warn!("connection lost: {}", err);
                        break;
                    }
                };
                if frame.is_close() {
                    break;
                }
                let Ok(text) = frame.to_text() else {
                    continue;
                };
                if !frame.is_text() {
                    continue;
                }
                match ServerMessage::from_json(text) {
                    Ok(message) => {
                        if inbound_tx.send(message).is_err() {
                            break;
                        }
                    }
                    Err(err) => log::warn!("dropping frame: {}", err),
                }
            }
        });

        Ok(Self {
            outbound,
            inbound,
            connected: true,
        })
    }

    pub fn send(&mut self, message: ClientMessage) {
        log::trace!("sending {:?}", message);
        if self.outbound.send(message).is_err() {
            self.connected = false;
        }
    }

    /// Everything received since the last call, in arrival order.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(message) => messages.push(message),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.connected = false;
                    break;
                }
            }
        }
        messages
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
