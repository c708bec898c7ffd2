//! The game client context object.
//!
//! One [`GameClient`] owns everything a session needs: the saved identity,
//! the bootstrap client, the messaging channel, the reconciled view, the
//! result overlay and any pending choice prompt. Nothing lives in globals.

use derive_more::{Display, Error, From};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use crate::actions::{Action, ActionPanel, ActionResolver, ChoicePrompt, Refusal, Resolution};
use crate::bootstrap::{BootstrapClient, BootstrapError, JoinOutcome, generate_player_id};
use crate::command::GameCommand;
use crate::config::{ClientConfig, ConfigError};
use crate::connection::{ConnectionManager, ConnectionState, Inbound};
use crate::overlay::{HandResult, ResultOverlay};
use crate::reconciler::{Reconciler, Snapshot};
use crate::session_store::{
    FileStorage, KeyValueStorage, SessionRecord, SessionStore, StorageError,
};
use crate::transport::{Connector, WebSocketConnector};
use crate::view::Phase;

/// Client operation failure.
#[derive(Debug, Display, Error, From)]
pub enum ClientError {
    /// Room create or join failed.
    #[display("{_0}")]
    #[from]
    Bootstrap(BootstrapError),
    /// Saving or clearing the session failed.
    #[display("{_0}")]
    #[from]
    Storage(StorageError),
    /// Configuration is unusable.
    #[display("{_0}")]
    #[from]
    Config(ConfigError),
    /// Restore was requested with nothing saved.
    #[display("No saved session to restore")]
    NoSavedSession,
}

/// Something the UI should react to.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A snapshot was folded into the view.
    ViewUpdated,
    /// Connectivity changed.
    Connection(ConnectionState),
    /// A new hand result is on screen.
    ResultShown(HandResult),
    /// The hand result timed out.
    ResultExpired,
    /// The game reached its final phase.
    GameOver,
    /// The channel ended; no further events for this session.
    Closed,
}

struct ActiveSession {
    record: SessionRecord,
    connection: ConnectionManager,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    state: watch::Receiver<ConnectionState>,
    reconciler: Reconciler,
}

/// Context object for one player's session.
pub struct GameClient<S> {
    config: ClientConfig,
    bootstrap: BootstrapClient,
    connector: Arc<dyn Connector>,
    sessions: SessionStore<S>,
    active: Option<ActiveSession>,
    overlay: ResultOverlay,
    overlay_expiry: mpsc::UnboundedReceiver<u64>,
    pending: Option<ChoicePrompt>,
    queued: VecDeque<ClientEvent>,
}

impl GameClient<FileStorage> {
    /// Production client: WebSocket transport and file-backed session.
    #[instrument(skip(config), fields(server_url = %config.server_url()))]
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = Arc::new(WebSocketConnector::new(config.ws_url()?));
        let storage = FileStorage::new(config.session_file());
        Ok(Self::new(config, connector, storage))
    }
}

impl<S: KeyValueStorage> GameClient<S> {
    /// Assembles a client from its collaborators.
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>, storage: S) -> Self {
        let bootstrap = BootstrapClient::new(config.server_url());
        let (overlay, overlay_expiry) = ResultOverlay::new(config.result_overlay_duration());
        Self {
            config,
            bootstrap,
            connector,
            sessions: SessionStore::new(storage),
            active: None,
            overlay,
            overlay_expiry,
            pending: None,
            queued: VecDeque::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The bootstrap client; clones share its join guard.
    pub fn bootstrap(&self) -> &BootstrapClient {
        &self.bootstrap
    }

    /// Saved session, if complete.
    pub fn saved_session(&self) -> Option<SessionRecord> {
        self.sessions.load()
    }

    /// Identity of the live session.
    pub fn session(&self) -> Option<&SessionRecord> {
        self.active.as_ref().map(|a| &a.record)
    }

    /// Reconciled view of the live session.
    pub fn reconciler(&self) -> Option<&Reconciler> {
        self.active.as_ref().map(|a| &a.reconciler)
    }

    /// Connectivity of the live session.
    pub fn connection_state(&self) -> ConnectionState {
        self.active
            .as_ref()
            .map_or(ConnectionState::Disconnected, |a| a.connection.state())
    }

    /// Hand result on screen.
    pub fn result(&self) -> Option<&HandResult> {
        self.overlay.current()
    }

    /// Hides the hand result early.
    pub fn dismiss_result(&mut self) {
        self.overlay.dismiss();
    }

    /// Prompt awaiting [`choose`](Self::choose).
    pub fn pending_prompt(&self) -> Option<&ChoicePrompt> {
        self.pending.as_ref()
    }

    /// What the action area shows.
    pub fn panel(&self) -> ActionPanel {
        self.active
            .as_ref()
            .map_or(ActionPanel::Hidden, |a| ActionResolver::new(&a.reconciler).panel())
    }

    /// Creates a room when `room_id` is empty, joins it and opens the channel.
    ///
    /// `rejoin_player_id` is reused only together with an explicit room. The
    /// session is saved only after the server accepts; a rejection leaves
    /// both the saved session and any live session untouched.
    #[instrument(skip(self))]
    pub async fn join(
        &mut self,
        name: &str,
        room_id: Option<&str>,
        rejoin_player_id: Option<&str>,
    ) -> Result<JoinOutcome, ClientError> {
        let room_id = room_id.map(str::trim).filter(|r| !r.is_empty());
        let player_id = match (rejoin_player_id, room_id) {
            (Some(pid), Some(_)) if !pid.is_empty() => pid.to_string(),
            _ => generate_player_id(),
        };
        let room_id = match room_id {
            Some(room_id) => room_id.to_string(),
            None => self.bootstrap.create_room().await?,
        };

        let outcome = self.bootstrap.join_room(&room_id, &player_id, name).await?;
        let JoinOutcome::Joined { room_id } = &outcome else {
            info!("Join rejected, keeping current state");
            return Ok(outcome);
        };

        let record = SessionRecord::new(player_id.as_str(), room_id.as_str(), name);
        self.sessions.save(&record)?;
        self.start_session(record);
        Ok(outcome)
    }

    /// Rejoins the saved room with the saved player id.
    #[instrument(skip(self))]
    pub async fn restore(&mut self) -> Result<JoinOutcome, ClientError> {
        let record = self.sessions.load().ok_or(ClientError::NoSavedSession)?;
        self.join(
            record.player_name(),
            Some(record.room_id().as_str()),
            Some(record.player_id().as_str()),
        )
        .await
    }

    fn start_session(&mut self, record: SessionRecord) {
        self.stop_session();
        let (connection, inbound) = ConnectionManager::open(
            Arc::clone(&self.connector),
            record.room_id(),
            record.player_id(),
            self.config.reconnect_delay(),
        );
        let state = connection.watch_state();
        let reconciler = Reconciler::new(record.player_id().as_str());
        info!(room_id = %record.room_id(), player_id = %record.player_id(), "Session started");
        self.active = Some(ActiveSession {
            record,
            connection,
            inbound,
            state,
            reconciler,
        });
    }

    /// Drops the live session: channel, view, overlay and prompt together.
    fn stop_session(&mut self) {
        if let Some(active) = self.active.take() {
            active.connection.close();
        }
        self.overlay.reset();
        self.pending = None;
        self.queued.clear();
    }

    /// Disconnects but keeps the saved session for a later restore.
    #[instrument(skip(self))]
    pub fn disconnect(&mut self) {
        self.stop_session();
    }

    /// Leaves the room and forgets the saved session.
    #[instrument(skip(self))]
    pub fn leave(&mut self) -> Result<(), ClientError> {
        self.stop_session();
        self.sessions.clear()?;
        info!("Left room");
        Ok(())
    }

    /// Clears the saved session without touching a live one.
    pub fn forget(&self) -> Result<(), ClientError> {
        self.sessions.clear()?;
        Ok(())
    }

    /// Waits for the next event. Returns `None` when no session is live.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            let active = self.active.as_mut()?;
            tokio::select! {
                inbound = active.inbound.recv() => {
                    let Some(inbound) = inbound else {
                        return Some(ClientEvent::Closed);
                    };
                    let before = active.reconciler.current_phase();
                    active.reconciler.apply(Snapshot::from_inbound(&inbound));
                    let after = active.reconciler.current_phase();

                    self.queued.push_back(ClientEvent::ViewUpdated);
                    if self.overlay.observe(&active.reconciler) {
                        if let Some(result) = self.overlay.current() {
                            self.queued.push_back(ClientEvent::ResultShown(result.clone()));
                        }
                    }
                    if after == Some(Phase::Finished) && before != after {
                        self.queued.push_back(ClientEvent::GameOver);
                    }
                }
                changed = active.state.changed() => {
                    if changed.is_err() {
                        return Some(ClientEvent::Closed);
                    }
                    let state = *active.state.borrow_and_update();
                    debug!(%state, "Connection state changed");
                    return Some(ClientEvent::Connection(state));
                }
                Some(generation) = self.overlay_expiry.recv() => {
                    if self.overlay.expire(generation) {
                        return Some(ClientEvent::ResultExpired);
                    }
                }
            }
        }
    }

    /// Resolves a button press and publishes the command it yields.
    #[instrument(skip(self))]
    pub fn select(&mut self, action: Action) -> Resolution {
        let Some(active) = self.active.as_ref() else {
            return Resolution::Unavailable(Refusal::NotExposed);
        };
        let resolution = ActionResolver::new(&active.reconciler).select(action);
        self.pending = match &resolution {
            Resolution::Choose(prompt) => Some(prompt.clone()),
            _ => None,
        };
        self.dispatch(&resolution);
        resolution
    }

    /// Answers the pending prompt.
    #[instrument(skip(self))]
    pub fn choose(&mut self, index: usize) -> Resolution {
        let (Some(active), Some(prompt)) = (self.active.as_ref(), self.pending.take()) else {
            return Resolution::Stale;
        };
        let resolution = ActionResolver::new(&active.reconciler).choose(&prompt, index);
        if resolution == Resolution::Unavailable(Refusal::InvalidChoice) {
            self.pending = Some(prompt);
        }
        self.dispatch(&resolution);
        resolution
    }

    /// Abandons the pending prompt.
    pub fn cancel_prompt(&mut self) {
        self.pending = None;
    }

    /// Discards a hand tile.
    #[instrument(skip(self))]
    pub fn discard(&mut self, tile_id: &str) -> Resolution {
        self.resolve_direct(|resolver| resolver.discard(tile_id))
    }

    /// Declares a concealed kong on a specific hand tile.
    #[instrument(skip(self))]
    pub fn kong_with(&mut self, tile_id: &str) -> Resolution {
        self.resolve_direct(|resolver| resolver.kong_with(tile_id))
    }

    fn resolve_direct(&mut self, f: impl FnOnce(&ActionResolver<'_>) -> Resolution) -> Resolution {
        let Some(active) = self.active.as_ref() else {
            return Resolution::Stale;
        };
        let resolution = f(&ActionResolver::new(&active.reconciler));
        if resolution.command().is_some() {
            self.pending = None;
        }
        self.dispatch(&resolution);
        resolution
    }

    /// Asks the server to resend both snapshots.
    pub fn sync(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.connection.send_command(&GameCommand::Sync))
    }

    fn dispatch(&self, resolution: &Resolution) {
        let (Some(command), Some(active)) = (resolution.command(), self.active.as_ref()) else {
            return;
        };
        if !active.connection.send_command(command) {
            warn!(destination = %command.destination(), "Command dropped while disconnected");
        }
    }
}
