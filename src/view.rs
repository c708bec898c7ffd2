//! Typed game view and snapshot patches.
//!
//! Every field of a snapshot is tri-state on the wire: absent (leave as is),
//! `null` (clear) or a value (replace). A field whose value fails to parse is
//! treated as absent so one bad field never poisons the rest of a snapshot.

use derive_getters::Getters;
use fzmahjong_tiles::{Tile, TileFace};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

/// Server-driven stage of the hand or game.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Waiting for four players.
    Waiting,
    /// Tiles being dealt.
    Dealing,
    /// Players replacing flowers in turn.
    ReplacingFlowers,
    /// Dealer about to reveal the gold tile.
    OpeningGold,
    /// Normal play.
    Playing,
    /// A hand just ended.
    HandFinished,
    /// The game is over.
    Finished,
    /// Players deciding whether to play another hand.
    ConfirmContinue,
}

/// One seat at the table as the room sees it.
#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    /// Player id.
    id: String,
    /// Display name.
    #[serde(default)]
    name: String,
    /// Seat index.
    #[serde(default)]
    position: Option<u8>,
    /// Concealed tile count.
    #[serde(default)]
    hand_size: Option<u32>,
    /// Revealed flowers.
    #[serde(default)]
    flower_tiles: Option<Vec<Tile>>,
    /// Exposed melds.
    #[serde(default)]
    exposed_melds: Option<Vec<Vec<Tile>>>,
    /// Running score.
    #[serde(default)]
    score: Option<i64>,
    /// True for the current dealer.
    #[serde(default)]
    is_dealer: Option<bool>,
    /// Consecutive hands this player has dealt.
    #[serde(default)]
    dealer_streak: Option<u32>,
}

/// Server-declared legal actions for the local player.
///
/// Without a `discardedTile` the enabled flags are self-actions (self-drawn
/// win, concealed kong, three-gold win); with one they are reactions to that
/// discard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(default)]
    can_chi: Option<bool>,
    #[serde(default)]
    can_peng: Option<bool>,
    #[serde(default)]
    can_gang: Option<bool>,
    #[serde(default)]
    can_an_gang: Option<bool>,
    #[serde(default)]
    can_hu: Option<bool>,
    #[serde(default)]
    can_san_jin_dao: Option<bool>,
    #[serde(default)]
    discarded_tile: Option<Tile>,
    #[serde(default)]
    an_gang_tiles: Option<Vec<TileFace>>,
    #[serde(default)]
    ting_tiles: Option<Vec<TileFace>>,
}

impl Capabilities {
    /// Run claim offered.
    pub fn can_chi(&self) -> bool {
        self.can_chi.unwrap_or(false)
    }

    /// Triplet claim offered.
    pub fn can_peng(&self) -> bool {
        self.can_peng.unwrap_or(false)
    }

    /// Open kong claim offered.
    pub fn can_gang(&self) -> bool {
        self.can_gang.unwrap_or(false)
    }

    /// Concealed kong offered.
    pub fn can_an_gang(&self) -> bool {
        self.can_an_gang.unwrap_or(false)
    }

    /// Win offered.
    pub fn can_hu(&self) -> bool {
        self.can_hu.unwrap_or(false)
    }

    /// Three-gold win offered.
    pub fn can_san_jin_dao(&self) -> bool {
        self.can_san_jin_dao.unwrap_or(false)
    }

    /// The discard being reacted to, if any.
    pub fn discarded_tile(&self) -> Option<&Tile> {
        self.discarded_tile.as_ref()
    }

    /// Faces eligible for a concealed kong, in server order.
    pub fn an_gang_tiles(&self) -> &[TileFace] {
        self.an_gang_tiles.as_deref().unwrap_or_default()
    }

    /// Advisory waiting tiles.
    pub fn ting_tiles(&self) -> &[TileFace] {
        self.ting_tiles.as_deref().unwrap_or_default()
    }

    /// True when no discard is pending and some self-action is enabled.
    pub fn offers_self_action(&self) -> bool {
        self.discarded_tile.is_none()
            && (self.can_hu() || self.can_an_gang() || self.can_san_jin_dao())
    }

    /// True when some reaction to a discard is enabled.
    pub fn offers_reaction(&self) -> bool {
        self.can_chi() || self.can_peng() || self.can_gang() || self.can_hu()
    }
}

/// Reads one field. `None`: leave unchanged. `Some(None)`: clear.
fn parse_field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str) -> Option<Option<T>> {
    match object.get(key)? {
        Value::Null => Some(None),
        value => match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(Some(parsed)),
            Err(e) => {
                warn!(field = key, error = %e, "Malformed snapshot field, keeping previous value");
                None
            }
        },
    }
}

macro_rules! view_fields {
    ($( $(#[$doc:meta])* $field:ident : $ty:ty = $key:literal; )+) => {
        /// The client's picture of the game.
        ///
        /// Built only by applying [`ViewPatch`]es; a field is `None` until a
        /// snapshot sets it, or after one clears it.
        #[derive(Debug, Clone, Default, PartialEq, Serialize)]
        #[serde(rename_all = "camelCase")]
        pub struct GameView {
            $(
                #[serde(skip_serializing_if = "Option::is_none")]
                $field: Option<$ty>,
            )+
        }

        impl GameView {
            $(
                $(#[$doc])*
                pub fn $field(&self) -> Option<&$ty> {
                    self.$field.as_ref()
                }
            )+

            /// Overwrites every field the patch carries.
            pub fn apply(&mut self, patch: &ViewPatch) {
                $(
                    if let Some(value) = &patch.$field {
                        self.$field = value.clone();
                    }
                )+
            }
        }

        /// Field changes carried by one snapshot.
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct ViewPatch {
            $( $field: Option<Option<$ty>>, )+
        }

        impl ViewPatch {
            /// Parses a snapshot body. Unknown keys are ignored; a body that
            /// is not an object yields an empty patch.
            pub fn from_json(value: &Value) -> Self {
                let Some(object) = value.as_object() else {
                    warn!("Snapshot is not a JSON object, ignoring");
                    return Self::default();
                };
                Self {
                    $( $field: parse_field(object, $key), )+
                }
            }

            /// Returns true if the patch changes nothing.
            pub fn is_empty(&self) -> bool {
                true $( && self.$field.is_none() )+
            }
        }
    };
}

view_fields! {
    /// Room id.
    room_id: String = "roomId";
    /// Current phase.
    phase: Phase = "phase";
    /// Seats in table order.
    players: Vec<PlayerInfo> = "players";
    /// The hand's wildcard face.
    gold_tile: TileFace = "goldTile";
    /// Seat whose turn it is.
    current_player_index: usize = "currentPlayerIndex";
    /// Dealer seat.
    dealer_index: usize = "dealerIndex";
    /// Tiles left in the wall.
    remaining_tiles: u32 = "remainingTiles";
    /// Discard pile.
    discarded_tiles: Vec<Tile> = "discardedTiles";
    /// Most recent discard.
    last_discarded_tile: Tile = "lastDiscardedTile";
    /// Local player's concealed hand.
    my_hand_tiles: Vec<Tile> = "myHandTiles";
    /// Local player's flowers.
    my_flower_tiles: Vec<Tile> = "myFlowerTiles";
    /// Local player's exposed melds.
    my_exposed_melds: Vec<Vec<Tile>> = "myExposedMelds";
    /// Local player's legal actions.
    available_actions: Capabilities = "availableActions";
    /// Flower replacement in progress.
    replacing_flowers: bool = "replacingFlowers";
    /// Seat currently replacing flowers.
    current_flower_player_index: usize = "currentFlowerPlayerIndex";
    /// Waiting for the dealer to open the gold.
    waiting_open_gold: bool = "waitingOpenGold";
    /// Continue votes by player id; `None` means undecided.
    continue_decisions: BTreeMap<String, Option<bool>> = "continueDecisions";
    /// Dealer's winning streak.
    consecutive_dealer_wins: u32 = "consecutiveDealerWins";
    /// Player the server is waiting on.
    current_action_player_id: String = "currentActionPlayerId";
    /// What the server is waiting for.
    current_action_type: String = "currentActionType";
    /// Player who acted last.
    last_action_player_id: String = "lastActionPlayerId";
    /// Last action taken.
    last_action_type: String = "lastActionType";
    /// Winner of the last hand.
    last_win_player_id: String = "lastWinPlayerId";
    /// How the last hand was won.
    last_win_type: String = "lastWinType";
    /// Tile most recently drawn by the local player.
    last_drawn_tile: Tile = "lastDrawnTile";
    /// Seat that drew last.
    last_draw_player_index: usize = "lastDrawPlayerIndex";
}

impl ViewPatch {
    /// Phase change carried by this patch, if any.
    pub fn phase_change(&self) -> Option<Option<Phase>> {
        self.phase
    }
}

impl GameView {
    pub(crate) fn override_phase(&mut self, phase: Option<Phase>) {
        self.phase = phase;
    }

    /// Looks up a seat by player id.
    pub fn player(&self, id: &str) -> Option<&PlayerInfo> {
        self.players.as_deref()?.iter().find(|p| p.id == id)
    }
}
