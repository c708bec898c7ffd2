//! Run (chi) candidate search.
//!
//! Given the local hand and another player's discard, lists every way the
//! discard can complete a run. Gold tiles never take part in a run.

use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{Tile, TileFace};

/// Where the discarded tile sits in the completed run.
///
/// Ordering follows presentation order: `Low`, `Mid`, `High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum RunPosition {
    /// Discard is the highest tile: hand supplies rank-2 and rank-1.
    Low,
    /// Discard is the middle tile: hand supplies rank-1 and rank+1.
    Mid,
    /// Discard is the lowest tile: hand supplies rank+1 and rank+2.
    High,
}

impl RunPosition {
    /// Rank offsets (relative to the discard) of the two hand tiles.
    fn offsets(self) -> (i64, i64) {
        match self {
            Self::Low => (-2, -1),
            Self::Mid => (-1, 1),
            Self::High => (1, 2),
        }
    }
}

/// One way to absorb a discard into a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct ChiCandidate {
    /// Lower-ranked hand tile.
    pub first: Tile,
    /// Higher-ranked hand tile.
    pub second: Tile,
    /// Position of the discard within the run.
    pub position: RunPosition,
}

impl ChiCandidate {
    /// Returns the three tiles of the run in rank order, discard included.
    pub fn sequence<'a>(&'a self, discarded: &'a Tile) -> [&'a Tile; 3] {
        match self.position {
            RunPosition::Low => [&self.first, &self.second, discarded],
            RunPosition::Mid => [&self.first, discarded, &self.second],
            RunPosition::High => [discarded, &self.first, &self.second],
        }
    }

    /// Instance ids of the two hand tiles, in the order the server expects.
    pub fn tile_ids(&self) -> (&str, &str) {
        (self.first.id(), self.second.id())
    }
}

/// Computes every run the discard can complete, ordered `Low`, `Mid`, `High`.
///
/// For each required rank only the first matching instance in hand order is
/// considered, so the result is deterministic for a given hand ordering.
#[instrument(skip(hand, discarded), fields(hand_len = hand.len(), discarded = %discarded))]
pub fn chi_candidates(
    hand: &[Tile],
    discarded: &Tile,
    gold: Option<&TileFace>,
) -> Vec<ChiCandidate> {
    if discarded.is_gold(gold) {
        debug!("Discard is the gold tile, no runs possible");
        return Vec::new();
    }
    if !discarded.kind().is_suited() {
        debug!(kind = %discarded.kind(), "Discard cannot form a run");
        return Vec::new();
    }

    let face = discarded.face();
    let first_of = |offset: i64| {
        let wanted = face.offset(offset)?;
        hand.iter().find(|t| t.shows(&wanted))
    };

    let candidates: Vec<ChiCandidate> = [RunPosition::Low, RunPosition::Mid, RunPosition::High]
        .into_iter()
        .filter_map(|position| {
            let (lo, hi) = position.offsets();
            let first = first_of(lo)?;
            let second = first_of(hi)?;
            if first.is_gold(gold) || second.is_gold(gold) {
                return None;
            }
            Some(ChiCandidate::new(first.clone(), second.clone(), position))
        })
        .collect();

    debug!(count = candidates.len(), "Computed chi candidates");
    candidates
}
