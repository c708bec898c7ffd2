//! FZMahjong client library - state reconciliation and action resolution
//!
//! Client side of a four-player Fuzhou mahjong room. The server pushes two
//! snapshot streams per player over STOMP; this crate folds them into one
//! view and turns button presses into game commands.
//!
//! # Architecture
//!
//! - **Bootstrap**: HTTP room creation and join
//! - **Connection**: STOMP session over WebSocket with reconnect
//! - **Reconciler**: merges public and private snapshots into a view
//! - **Actions**: decides which actions are offered and what they send
//! - **Client**: context object tying a session together
//!
//! # Example
//!
//! ```no_run
//! use fzmahjong::{ClientConfig, GameClient, JoinOutcome};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::load(None)?;
//! let mut client = GameClient::from_config(config)?;
//! if let JoinOutcome::Joined { room_id } = client.join("Ann", None, None).await? {
//!     println!("Joined room {room_id}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod actions;
mod bootstrap;
mod client;
mod command;
mod config;
mod connection;
mod overlay;
mod presentation;
mod reconciler;
mod session_store;
mod shell;
mod stomp;
mod transport;
mod view;

// Crate-level exports - Action resolution
pub use actions::{Action, ActionPanel, ActionResolver, ChoicePrompt, Refusal, Resolution};

// Crate-level exports - Room bootstrap
pub use bootstrap::{BootstrapClient, BootstrapError, JoinOutcome, generate_player_id};

// Crate-level exports - Client context
pub use client::{ClientError, ClientEvent, GameClient};

// Crate-level exports - Commands
pub use command::{COMMAND_PREFIX, GameCommand};

// Crate-level exports - Configuration
pub use config::{ClientConfig, ConfigError, SERVER_URL_ENV};

// Crate-level exports - Messaging channel
pub use connection::{
    ConnectionManager, ConnectionState, Inbound, PRIVATE_SUBSCRIPTION, PUBLIC_SUBSCRIPTION,
    Topics,
};
pub use stomp::{ACCEPT_VERSION, Frame, StompError};
pub use transport::{
    Connector, Transport, TransportError, WebSocketConnector, WebSocketTransport,
};

// Crate-level exports - Result overlay
pub use overlay::{HandResult, ResultOverlay, UNKNOWN_PLAYER, normalize_hu_label};

// Crate-level exports - Text rendering
pub use presentation::{format_hand, format_panel, format_prompt, render_view, status_line};
pub use shell::{ShellExit, run_shell};

// Crate-level exports - View and reconciliation
pub use reconciler::{Reconciler, Snapshot};
pub use view::{Capabilities, GameView, Phase, PlayerInfo, ViewPatch};

// Crate-level exports - Session persistence
pub use session_store::{
    FileStorage, KeyValueStorage, MemoryStorage, PLAYER_ID_KEY, PLAYER_NAME_KEY, ROOM_ID_KEY,
    SessionRecord, SessionStore, StorageError,
};
