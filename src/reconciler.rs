//! Merges public and private snapshots into one view.
//!
//! The room topic sends partial updates that accumulate; the player topic
//! sends the full private picture, which replaces the previous one and is
//! also folded into the public half. The merged view is the public half
//! overlaid with the latest private snapshot, so private values win on any
//! overlapping key regardless of arrival order.

use fzmahjong_tiles::{Tile, TileFace};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::connection::Inbound;
use crate::view::{Capabilities, GameView, Phase, ViewPatch};

/// One parsed inbound snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Partial room-wide update.
    Public(ViewPatch),
    /// Full private picture for the local player.
    Private(ViewPatch),
}

impl Snapshot {
    /// Parses an inbound body into the matching variant.
    pub fn from_inbound(inbound: &Inbound) -> Self {
        match inbound {
            Inbound::Public(body) => Self::Public(ViewPatch::from_json(body)),
            Inbound::Private(body) => Self::Private(ViewPatch::from_json(body)),
        }
    }

    /// Topic the snapshot came from.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Public(_) => "public",
            Self::Private(_) => "private",
        }
    }

    fn patch(&self) -> &ViewPatch {
        match self {
            Self::Public(patch) | Self::Private(patch) => patch,
        }
    }
}

/// Owner of the reconciled view for one session.
#[derive(Debug, Clone)]
pub struct Reconciler {
    player_id: String,
    public: GameView,
    private: Option<ViewPatch>,
    merged: GameView,
    latest_phase: Option<Phase>,
}

impl Reconciler {
    /// Creates an empty reconciler for `player_id`.
    pub fn new(player_id: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            public: GameView::default(),
            private: None,
            merged: GameView::default(),
            latest_phase: None,
        }
    }

    /// Local player id.
    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Folds one snapshot into the view.
    #[instrument(skip_all, fields(channel = snapshot.channel()))]
    pub fn apply(&mut self, snapshot: Snapshot) {
        if let Some(phase) = snapshot.patch().phase_change() {
            self.latest_phase = phase;
        }
        match snapshot {
            Snapshot::Public(patch) => {
                self.public.apply(&patch);
            }
            Snapshot::Private(patch) => {
                self.public.apply(&patch);
                self.private = Some(patch);
            }
        }
        self.rebuild();
        debug!(phase = ?self.latest_phase, "View reconciled");
    }

    /// Parses and folds a room-topic body.
    pub fn on_public_snapshot(&mut self, body: &Value) {
        self.apply(Snapshot::Public(ViewPatch::from_json(body)));
    }

    /// Parses and folds a player-topic body.
    pub fn on_private_snapshot(&mut self, body: &Value) {
        self.apply(Snapshot::Private(ViewPatch::from_json(body)));
    }

    fn rebuild(&mut self) {
        let mut merged = self.public.clone();
        if let Some(private) = &self.private {
            merged.apply(private);
        }
        // A stale private phase must not mask a newer public one.
        merged.override_phase(self.latest_phase);
        self.merged = merged;
    }

    /// Drops everything received so far.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.public = GameView::default();
        self.private = None;
        self.merged = GameView::default();
        self.latest_phase = None;
    }

    /// The merged view.
    pub fn view(&self) -> &GameView {
        &self.merged
    }

    /// Phase from the most recent snapshot that carried one, on either topic.
    pub fn current_phase(&self) -> Option<Phase> {
        self.latest_phase
    }

    /// Capability descriptor, if the server sent one.
    pub fn current_capabilities(&self) -> Option<&Capabilities> {
        self.merged.available_actions()
    }

    /// Local hand in server order; empty before the deal.
    pub fn my_hand(&self) -> &[Tile] {
        self.merged.my_hand_tiles().map(Vec::as_slice).unwrap_or_default()
    }

    /// Local player's seat index.
    pub fn my_index_among_players(&self) -> Option<usize> {
        self.merged
            .players()?
            .iter()
            .position(|p| p.id() == &self.player_id)
    }

    /// The hand's wildcard face.
    pub fn gold_tile(&self) -> Option<&TileFace> {
        self.merged.gold_tile()
    }

    /// Local continue vote. `None` when absent or undecided.
    pub fn my_continue_decision(&self) -> Option<bool> {
        self.merged
            .continue_decisions()?
            .get(&self.player_id)
            .copied()
            .flatten()
    }

    /// Display name for a player id.
    pub fn player_name(&self, id: &str) -> Option<&str> {
        self.merged.player(id).map(|p| p.name().as_str())
    }
}
