//! Messaging channel lifecycle.
//!
//! A [`ConnectionManager`] owns one background task that connects,
//! performs the STOMP handshake, subscribes to the room and player topics,
//! requests a sync and then multiplexes outbound commands with inbound
//! snapshots. Any drop re-enters `Connecting` after a fixed delay, forever,
//! until [`ConnectionManager::close`] is called.

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::command::GameCommand;
use crate::stomp::Frame;
use crate::transport::{Connector, Transport};

/// Subscription id for the room-wide topic.
pub const PUBLIC_SUBSCRIPTION: &str = "sub-public";
/// Subscription id for the player topic.
pub const PRIVATE_SUBSCRIPTION: &str = "sub-private";

const STOMP_HOST: &str = "/";

/// Channel connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ConnectionState {
    /// Not connected; either closed or waiting to retry.
    Disconnected,
    /// Connect or handshake in progress.
    Connecting,
    /// Subscribed and ready to publish.
    Connected,
}

/// A snapshot body received on one of the two topics.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Room-wide snapshot.
    Public(Value),
    /// Snapshot addressed to this player.
    Private(Value),
}

/// Topic names for one room and player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// `/topic/room/{roomId}`
    pub public: String,
    /// `/topic/room/{roomId}/player/{playerId}`
    pub private: String,
}

impl Topics {
    /// Builds topic names.
    pub fn new(room_id: &str, player_id: &str) -> Self {
        let public = format!("/topic/room/{room_id}");
        let private = format!("{public}/player/{player_id}");
        Self { public, private }
    }
}

struct Outbound {
    destination: String,
    body: String,
}

/// Handle to the messaging channel for one `(room, player)` pair.
pub struct ConnectionManager {
    room_id: String,
    player_id: String,
    state: Arc<watch::Sender<ConnectionState>>,
    outbound: mpsc::UnboundedSender<Outbound>,
    closed: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("room_id", &self.room_id)
            .field("player_id", &self.player_id)
            .field("state", &*self.state.borrow())
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl ConnectionManager {
    /// Starts the channel. Must be called inside a Tokio runtime.
    ///
    /// Returns the handle and the receiver of inbound snapshots, in arrival
    /// order across both topics.
    #[instrument(skip(connector, reconnect_delay), fields(delay_ms = reconnect_delay.as_millis() as u64))]
    pub fn open(
        connector: Arc<dyn Connector>,
        room_id: &str,
        player_id: &str,
        reconnect_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<Inbound>) {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state_tx);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let session = Session {
            connector,
            topics: Topics::new(room_id, player_id),
            player_id: player_id.to_string(),
            state: Arc::clone(&state),
            closed: Arc::clone(&closed),
            inbound: inbound_tx,
        };
        let task = tokio::spawn(connection_loop(session, outbound_rx, reconnect_delay));
        info!("Connection manager started");

        let manager = Self {
            room_id: room_id.to_string(),
            player_id: player_id.to_string(),
            state,
            outbound: outbound_tx,
            closed,
            task,
        };
        (manager, inbound_rx)
    }

    /// Room this channel is bound to.
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Player this channel is bound to.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Current connectivity.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watches connectivity changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Publishes a raw payload. Dropped unless connected; returns whether it
    /// was handed to the channel.
    #[instrument(skip(self, payload))]
    pub fn publish(&self, destination: &str, payload: &Value) -> bool {
        if self.state() != ConnectionState::Connected {
            debug!(state = %self.state(), "Not connected, dropping publish");
            return false;
        }
        let outbound = Outbound {
            destination: destination.to_string(),
            body: payload.to_string(),
        };
        self.outbound.send(outbound).is_ok()
    }

    /// Publishes a game command on behalf of this player.
    pub fn send_command(&self, command: &GameCommand) -> bool {
        self.publish(&command.destination(), &command.body(&self.player_id))
    }

    /// Tears the channel down. Any pending reconnect delay is cancelled
    /// before this returns. Idempotent.
    #[instrument(skip(self), fields(room_id = %self.room_id))]
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.task.abort();
        self.state.send_replace(ConnectionState::Disconnected);
        info!("Connection closed");
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

/// Everything one connection attempt needs.
struct Session {
    connector: Arc<dyn Connector>,
    topics: Topics,
    player_id: String,
    state: Arc<watch::Sender<ConnectionState>>,
    closed: Arc<AtomicBool>,
    inbound: mpsc::UnboundedSender<Inbound>,
}

/// Why a session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Unexpected: retry after the delay.
    Dropped(String),
    /// The handle or the snapshot receiver is gone: stop for good.
    Abandoned,
}

async fn connection_loop(
    session: Session,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    reconnect_delay: Duration,
) {
    debug!("Connection loop started");
    loop {
        session.set_state(ConnectionState::Connecting);
        match session.run(&mut outbound).await {
            SessionEnd::Abandoned => {
                session.set_state(ConnectionState::Disconnected);
                debug!("Connection loop abandoned");
                return;
            }
            SessionEnd::Dropped(reason) => {
                session.set_state(ConnectionState::Disconnected);
                warn!(reason = %reason, delay_ms = reconnect_delay.as_millis() as u64, "Connection dropped, retrying");
            }
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

impl Session {
    /// Publishes a state change unless the handle has been closed. Checked
    /// under the watch lock, so it is ordered against `close`.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if self.closed.load(Ordering::Acquire) || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    async fn run(&self, outbound: &mut mpsc::UnboundedReceiver<Outbound>) -> SessionEnd {
        let mut transport = match self.connector.connect().await {
            Ok(transport) => transport,
            Err(e) => return SessionEnd::Dropped(e.to_string()),
        };

        if let Err(end) = self.handshake(transport.as_mut()).await {
            let _ = transport.close().await;
            return end;
        }

        // Commands queued while the previous session was dying are stale.
        let mut discarded = 0usize;
        while outbound.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "Discarded commands from previous session");
        }

        self.set_state(ConnectionState::Connected);
        info!(topic = %self.topics.public, "Connected and subscribed");

        loop {
            tokio::select! {
                next = outbound.recv() => {
                    let Some(Outbound { destination, body }) = next else {
                        let _ = transport.send(Frame::disconnect().encode()).await;
                        let _ = transport.close().await;
                        return SessionEnd::Abandoned;
                    };
                    debug!(destination = %destination, "Sending command");
                    if let Err(e) = transport.send(Frame::send(&destination, body).encode()).await {
                        error!(error = %e, "Send failed");
                        return SessionEnd::Dropped(e.to_string());
                    }
                }
                incoming = transport.recv() => {
                    match incoming {
                        Some(Ok(text)) => {
                            if let Some(end) = self.on_text(&text) {
                                return end;
                            }
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Receive failed");
                            return SessionEnd::Dropped(e.to_string());
                        }
                        None => return SessionEnd::Dropped("closed by server".to_string()),
                    }
                }
            }
        }
    }

    /// CONNECT, wait for CONNECTED, subscribe both topics, then sync.
    async fn handshake(&self, transport: &mut dyn Transport) -> Result<(), SessionEnd> {
        let dropped = |e: crate::transport::TransportError| SessionEnd::Dropped(e.to_string());

        transport
            .send(Frame::connect(STOMP_HOST).encode())
            .await
            .map_err(dropped)?;

        loop {
            let text = match transport.recv().await {
                Some(Ok(text)) => text,
                Some(Err(e)) => return Err(dropped(e)),
                None => return Err(SessionEnd::Dropped("closed during handshake".to_string())),
            };
            match Frame::decode(&text) {
                Ok(Some(frame)) if frame.command() == "CONNECTED" => {
                    debug!(version = ?frame.header_value("version"), "STOMP session established");
                    break;
                }
                Ok(Some(frame)) if frame.command() == "ERROR" => {
                    let message = frame.header_value("message").unwrap_or("handshake refused");
                    return Err(SessionEnd::Dropped(message.to_string()));
                }
                Ok(Some(frame)) => debug!(command = %frame.command(), "Ignoring frame before CONNECTED"),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Malformed frame during handshake"),
            }
        }

        for (id, topic) in [
            (PUBLIC_SUBSCRIPTION, &self.topics.public),
            (PRIVATE_SUBSCRIPTION, &self.topics.private),
        ] {
            transport
                .send(Frame::subscribe(id, topic).encode())
                .await
                .map_err(dropped)?;
        }

        let sync = GameCommand::Sync;
        transport
            .send(Frame::send(&sync.destination(), sync.body(&self.player_id).to_string()).encode())
            .await
            .map_err(dropped)?;
        Ok(())
    }

    /// Routes one inbound text. Returns `Some` when the session must end.
    fn on_text(&self, text: &str) -> Option<SessionEnd> {
        let frame = match Frame::decode(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return None;
            }
        };

        match frame.command() {
            "MESSAGE" => {
                let Some(body) = self.parse_body(&frame) else {
                    return None;
                };
                let inbound = match self.route(&frame) {
                    Some(Route::Public) => Inbound::Public(body),
                    Some(Route::Private) => Inbound::Private(body),
                    None => {
                        debug!(destination = ?frame.header_value("destination"), "Message for unknown subscription");
                        return None;
                    }
                };
                if self.inbound.send(inbound).is_err() {
                    return Some(SessionEnd::Abandoned);
                }
                None
            }
            "ERROR" => {
                let message = frame.header_value("message").unwrap_or("server error");
                Some(SessionEnd::Dropped(message.to_string()))
            }
            other => {
                debug!(command = %other, "Ignoring frame");
                None
            }
        }
    }

    fn route(&self, frame: &Frame) -> Option<Route> {
        match frame.header_value("subscription") {
            Some(PUBLIC_SUBSCRIPTION) => return Some(Route::Public),
            Some(PRIVATE_SUBSCRIPTION) => return Some(Route::Private),
            _ => {}
        }
        match frame.header_value("destination") {
            Some(d) if d == self.topics.public => Some(Route::Public),
            Some(d) if d == self.topics.private => Some(Route::Private),
            _ => None,
        }
    }

    fn parse_body(&self, frame: &Frame) -> Option<Value> {
        serde_json::from_str(frame.body_text())
            .map_err(|e| warn!(error = %e, "Snapshot body is not JSON"))
            .ok()
    }
}

enum Route {
    Public,
    Private,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics() {
        let topics = Topics::new("123456", "PLAYER_abc");
        assert_eq!(topics.public, "/topic/room/123456");
        assert_eq!(topics.private, "/topic/room/123456/player/PLAYER_abc");
    }
}
