//! Room bootstrap over HTTP.
//!
//! Creating and joining rooms are plain request/response calls. Only one
//! join may be outstanding per client; a second attempt fails fast.

use derive_more::{Display, Error, From};
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, instrument, warn};

const PLAYER_ID_PREFIX: &str = "PLAYER_";
const PLAYER_ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generates a fresh player id: `PLAYER_` followed by nine base-36 characters.
pub fn generate_player_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..PLAYER_ID_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.gen_range(0..BASE36.len())]))
        .collect();
    format!("{PLAYER_ID_PREFIX}{suffix}")
}

/// Bootstrap failure.
#[derive(Debug, Display, Error, From)]
pub enum BootstrapError {
    /// Request failed or the response could not be decoded.
    #[display("Bootstrap request failed: {_0}")]
    #[from]
    Http(reqwest::Error),
    /// Server answered with a non-success status.
    #[display("Server returned {status} for {endpoint}")]
    Status {
        /// Endpoint path.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
    },
    /// Create-room response carried no room id.
    #[display("Server did not return a room id")]
    MissingRoomId,
    /// Another join is still in flight.
    #[display("A join request is already in progress")]
    JoinInFlight,
}

/// Result of a join request the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Joined; the room id is the server's, or the requested one if omitted.
    Joined {
        /// Room actually joined.
        room_id: String,
    },
    /// Server refused the join (room full, unknown room, ...).
    Rejected,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRoomResponse {
    room_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinRoomResponse {
    #[serde(default)]
    success: bool,
    room_id: Option<serde_json::Value>,
}

/// Room ids may arrive as strings or numbers.
fn room_id_text(value: Option<serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Releases the in-flight flag when dropped.
struct JoinGuard {
    flag: Arc<AtomicBool>,
}

impl JoinGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for JoinGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// HTTP client for room creation and joining.
///
/// Clones share the join-in-flight flag.
#[derive(Debug, Clone)]
pub struct BootstrapClient {
    base_url: String,
    client: reqwest::Client,
    join_in_flight: Arc<AtomicBool>,
}

impl BootstrapClient {
    /// Creates a client for the server at `base_url`.
    #[instrument(skip_all, fields(base_url = %base_url.as_ref()))]
    pub fn new(base_url: impl AsRef<str>) -> Self {
        Self {
            base_url: base_url.as_ref().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            join_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns true while a join request is outstanding.
    pub fn is_joining(&self) -> bool {
        self.join_in_flight.load(Ordering::Acquire)
    }

    /// Asks the server for a new room and returns its id.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn create_room(&self) -> Result<String, BootstrapError> {
        const ENDPOINT: &str = "/api/room/create";
        info!("Creating room");

        let response = self
            .client
            .post(format!("{}{}", self.base_url, ENDPOINT))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Create room failed");
            return Err(BootstrapError::Status {
                endpoint: ENDPOINT,
                status: status.as_u16(),
            });
        }

        let body: CreateRoomResponse = response.json().await?;
        let room_id = room_id_text(body.room_id).ok_or(BootstrapError::MissingRoomId)?;
        info!(room_id = %room_id, "Room created");
        Ok(room_id)
    }

    /// Joins `room_id` as `player_id` under `player_name`.
    ///
    /// Fails with [`BootstrapError::JoinInFlight`] if another join from this
    /// client (or a clone) has not resolved yet.
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn join_room(
        &self,
        room_id: &str,
        player_id: &str,
        player_name: &str,
    ) -> Result<JoinOutcome, BootstrapError> {
        const ENDPOINT: &str = "/api/room/join";
        let _guard = JoinGuard::acquire(&self.join_in_flight).ok_or_else(|| {
            debug!("Join already in flight");
            BootstrapError::JoinInFlight
        })?;
        info!("Joining room");

        let response = self
            .client
            .post(format!("{}{}", self.base_url, ENDPOINT))
            .json(&serde_json::json!({
                "roomId": room_id,
                "playerId": player_id,
                "playerName": player_name,
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Join room failed");
            return Err(BootstrapError::Status {
                endpoint: ENDPOINT,
                status: status.as_u16(),
            });
        }

        let body: JoinRoomResponse = response.json().await?;
        if !body.success {
            info!("Join rejected by server");
            return Ok(JoinOutcome::Rejected);
        }
        let room_id = room_id_text(body.room_id).unwrap_or_else(|| room_id.to_string());
        info!(joined_room = %room_id, "Joined room");
        Ok(JoinOutcome::Joined { room_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_shape() {
        let id = generate_player_id();
        let suffix = id.strip_prefix("PLAYER_").unwrap();
        assert_eq!(suffix.len(), 9);
        assert!(suffix.bytes().all(|b| BASE36.contains(&b)));
    }

    #[test]
    fn test_room_id_accepts_numbers() {
        assert_eq!(room_id_text(Some(serde_json::json!(482913))), Some("482913".to_string()));
        assert_eq!(room_id_text(Some(serde_json::json!(""))), None);
        assert_eq!(room_id_text(None), None);
    }

    #[test]
    fn test_guard_is_exclusive_and_released() {
        let flag = Arc::new(AtomicBool::new(false));
        let guard = JoinGuard::acquire(&flag).unwrap();
        assert!(JoinGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(JoinGuard::acquire(&flag).is_some());
    }
}
