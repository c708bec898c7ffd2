//! Outbound game commands.

use serde_json::{Value, json};
use strum::IntoStaticStr;

/// Destination prefix for game commands.
pub const COMMAND_PREFIX: &str = "/app/game/";

/// A command the client may publish. Every body carries the player id.
#[derive(Debug, Clone, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "camelCase")]
pub enum GameCommand {
    /// Ask the server to resend both snapshots.
    Sync,
    /// Discard a tile from hand.
    Discard {
        /// Tile instance id.
        tile_id: String,
    },
    /// Claim the discard into a run with two hand tiles.
    Chi {
        /// Lower hand tile id.
        tile_id1: String,
        /// Higher hand tile id.
        tile_id2: String,
    },
    /// Claim the discard into a triplet.
    Peng,
    /// Claim the discard into an open kong.
    Gang,
    /// Declare a concealed kong.
    AnGang {
        /// A hand tile of the kong face.
        tile_id: String,
    },
    /// Declare a win.
    Hu,
    /// Decline the current offer.
    Pass,
    /// Replace flowers during the flower phase.
    ReplaceFlower,
    /// Reveal the gold tile (dealer only).
    OpenGold,
    /// Continue with, or end, the game after a hand.
    Continue {
        /// True to play another hand.
        proceed: bool,
    },
}

impl GameCommand {
    /// Destination path, e.g. `/app/game/anGang`.
    pub fn destination(&self) -> String {
        let name: &'static str = self.into();
        format!("{COMMAND_PREFIX}{name}")
    }

    /// JSON body for `player_id`.
    pub fn body(&self, player_id: &str) -> Value {
        match self {
            Self::Discard { tile_id } | Self::AnGang { tile_id } => {
                json!({ "playerId": player_id, "tileId": tile_id })
            }
            Self::Chi { tile_id1, tile_id2 } => {
                json!({ "playerId": player_id, "tileId1": tile_id1, "tileId2": tile_id2 })
            }
            Self::Continue { proceed } => json!({ "playerId": player_id, "continue": proceed }),
            Self::Sync
            | Self::Peng
            | Self::Gang
            | Self::Hu
            | Self::Pass
            | Self::ReplaceFlower
            | Self::OpenGold => json!({ "playerId": player_id }),
        }
    }
}
