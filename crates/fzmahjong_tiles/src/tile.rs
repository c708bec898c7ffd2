//! Core tile types.
//!
//! Tiles arrive from the server as `{"type": "WAN", "value": 3, "id": "..."}`.
//! Ranks are validated on construction and on deserialization; a rank outside
//! the range for its kind is a format error, never clamped.

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Tile kind (suit or honor family).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum TileKind {
    /// Characters suit (万), ranks 1-9.
    Wan,
    /// Bamboo suit (条), ranks 1-9.
    Tiao,
    /// Dots suit (饼), ranks 1-9.
    Bing,
    /// Winds (东南西北), ranks 1-4.
    Wind,
    /// Dragons (中白发), ranks 1-3.
    Dragon,
    /// Flowers (春夏秋冬梅兰竹菊), ranks 1-8.
    Flower,
}

impl TileKind {
    /// Highest valid rank for this kind. The lowest is always 1.
    pub fn max_rank(self) -> u8 {
        match self {
            Self::Wan | Self::Tiao | Self::Bing => 9,
            Self::Wind => 4,
            Self::Dragon => 3,
            Self::Flower => 8,
        }
    }

    /// Returns true for the three numeric suits, the only kinds that form runs.
    pub fn is_suited(self) -> bool {
        matches!(self, Self::Wan | Self::Tiao | Self::Bing)
    }

    /// Returns true for winds and dragons.
    pub fn is_honor(self) -> bool {
        matches!(self, Self::Wind | Self::Dragon)
    }

    /// Returns true if `rank` is valid for this kind.
    pub fn accepts_rank(self, rank: i64) -> bool {
        (1..=i64::from(self.max_rank())).contains(&rank)
    }
}

/// Error produced when a tile descriptor is out of range.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TileError {
    /// Rank is outside the valid range for the kind.
    #[display("rank {rank} is out of range for {kind} (1-{})", kind.max_rank())]
    RankOutOfRange {
        /// Tile kind.
        kind: TileKind,
        /// Offending rank.
        rank: i64,
    },
}

/// A tile face: kind and rank, without an instance id.
///
/// This is also the shape of the per-hand wildcard ("gold") designation and
/// of concealed-kong candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawFace", into = "RawFace")]
pub struct TileFace {
    kind: TileKind,
    rank: u8,
}

impl TileFace {
    /// Creates a face, rejecting out-of-range ranks.
    #[instrument]
    pub fn new(kind: TileKind, rank: i64) -> Result<Self, TileError> {
        if !kind.accepts_rank(rank) {
            return Err(TileError::RankOutOfRange { kind, rank });
        }
        Ok(Self {
            kind,
            rank: rank as u8,
        })
    }

    /// Returns the kind.
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    /// Returns the rank.
    pub fn rank(&self) -> u8 {
        self.rank
    }

    /// Returns the face `offset` ranks away in the same suit, if it exists.
    pub fn offset(&self, offset: i64) -> Option<Self> {
        Self::new(self.kind, i64::from(self.rank) + offset).ok()
    }
}

#[derive(Serialize, Deserialize)]
struct RawFace {
    #[serde(rename = "type")]
    kind: TileKind,
    value: i64,
}

impl TryFrom<RawFace> for TileFace {
    type Error = TileError;

    fn try_from(raw: RawFace) -> Result<Self, Self::Error> {
        Self::new(raw.kind, raw.value)
    }
}

impl From<TileFace> for RawFace {
    fn from(face: TileFace) -> Self {
        Self {
            kind: face.kind,
            value: i64::from(face.rank),
        }
    }
}

/// A physical tile: a face plus an instance id unique within a hand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTile", into = "RawTile")]
pub struct Tile {
    face: TileFace,
    id: String,
}

impl Tile {
    /// Creates a tile, rejecting out-of-range ranks.
    pub fn new(kind: TileKind, rank: i64, id: impl Into<String>) -> Result<Self, TileError> {
        Ok(Self {
            face: TileFace::new(kind, rank)?,
            id: id.into(),
        })
    }

    /// Creates a tile from an already validated face.
    pub fn from_face(face: TileFace, id: impl Into<String>) -> Self {
        Self {
            face,
            id: id.into(),
        }
    }

    /// Returns the face.
    pub fn face(&self) -> TileFace {
        self.face
    }

    /// Returns the kind.
    pub fn kind(&self) -> TileKind {
        self.face.kind
    }

    /// Returns the rank.
    pub fn rank(&self) -> u8 {
        self.face.rank
    }

    /// Returns the instance id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns true if this tile shows `face` (instance id ignored).
    pub fn shows(&self, face: &TileFace) -> bool {
        self.face == *face
    }

    /// Returns true if this tile matches the wildcard designation, if any.
    pub fn is_gold(&self, gold: Option<&TileFace>) -> bool {
        gold.is_some_and(|g| self.shows(g))
    }
}

#[derive(Serialize, Deserialize)]
struct RawTile {
    #[serde(rename = "type")]
    kind: TileKind,
    value: i64,
    id: String,
}

impl TryFrom<RawTile> for Tile {
    type Error = TileError;

    fn try_from(raw: RawTile) -> Result<Self, Self::Error> {
        Self::new(raw.kind, raw.value, raw.id)
    }
}

impl From<Tile> for RawTile {
    fn from(tile: Tile) -> Self {
        Self {
            kind: tile.face.kind,
            value: i64::from(tile.face.rank),
            id: tile.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_ranges() {
        assert!(TileFace::new(TileKind::Wan, 9).is_ok());
        assert!(TileFace::new(TileKind::Wan, 10).is_err());
        assert!(TileFace::new(TileKind::Wind, 4).is_ok());
        assert!(TileFace::new(TileKind::Wind, 5).is_err());
        assert!(TileFace::new(TileKind::Dragon, 3).is_ok());
        assert!(TileFace::new(TileKind::Dragon, 4).is_err());
        assert!(TileFace::new(TileKind::Flower, 8).is_ok());
        assert!(TileFace::new(TileKind::Flower, 0).is_err());
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        let json = r#"{"type":"DRAGON","value":4,"id":"d4"}"#;
        assert!(serde_json::from_str::<Tile>(json).is_err());
    }

    #[test]
    fn test_face_ignores_instance_id() {
        let json = r#"{"type":"BING","value":5,"id":"BING5_99"}"#;
        let face: TileFace = serde_json::from_str(json).unwrap();
        assert_eq!(face, TileFace::new(TileKind::Bing, 5).unwrap());
    }

    #[test]
    fn test_offset_stays_in_suit() {
        let face = TileFace::new(TileKind::Tiao, 8).unwrap();
        assert_eq!(face.offset(1).map(|f| f.rank()), Some(9));
        assert_eq!(face.offset(2), None);
    }
}
