//! Transient hand-result display.

use derive_getters::Getters;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use crate::reconciler::Reconciler;
use crate::view::Phase;

/// Name shown when the winner is not among the known players.
pub const UNKNOWN_PLAYER: &str = "Unknown";

/// Normalises a win type for display: absent → 胡, any self-draw → 自摸.
pub fn normalize_hu_label(win_type: Option<&str>) -> &str {
    match win_type {
        None | Some("") => "胡",
        Some(text) if text.contains("自摸") => "自摸",
        Some(text) => text,
    }
}

/// Who won a hand, and how.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct HandResult {
    /// Winner's display name.
    player_name: String,
    /// Raw win type from the server.
    win_type: Option<String>,
}

impl HandResult {
    /// Creates a result.
    pub fn new(player_name: impl Into<String>, win_type: Option<String>) -> Self {
        Self {
            player_name: player_name.into(),
            win_type,
        }
    }

    /// Display label for the win type.
    pub fn label(&self) -> &str {
        normalize_hu_label(self.win_type.as_deref())
    }
}

/// Shows the latest hand result and hides it after a fixed time.
///
/// Each shown result gets a generation number. The timer reports the
/// generation it was started for, so an expiry that arrives after a newer
/// result (or a dismissal) is ignored.
#[derive(Debug)]
pub struct ResultOverlay {
    duration: Duration,
    generation: u64,
    current: Option<(u64, HandResult)>,
    last_seen: Option<(String, Option<String>)>,
    timer: Option<JoinHandle<()>>,
    expiry_tx: mpsc::UnboundedSender<u64>,
}

impl ResultOverlay {
    /// Creates an overlay and the receiver of timer expiries.
    pub fn new(duration: Duration) -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let overlay = Self {
            duration,
            generation: 0,
            current: None,
            last_seen: None,
            timer: None,
            expiry_tx,
        };
        (overlay, expiry_rx)
    }

    /// The result on screen, if any.
    pub fn current(&self) -> Option<&HandResult> {
        self.current.as_ref().map(|(_, result)| result)
    }

    /// Shows `result`, replacing any earlier one and restarting the timer.
    /// Must be called inside a Tokio runtime.
    #[instrument(skip(self), fields(player = %result.player_name))]
    pub fn show(&mut self, result: HandResult) -> u64 {
        self.cancel_timer();
        self.generation += 1;
        let generation = self.generation;
        let tx = self.expiry_tx.clone();
        let duration = self.duration;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(generation);
        }));
        info!(generation, label = %result.label(), "Showing hand result");
        self.current = Some((generation, result));
        generation
    }

    /// Shows a result if the view names a winner not seen before.
    ///
    /// The server keeps the last winner across hands, so while a hand is in
    /// progress nothing is shown and the seen winner is forgotten. A repeat of
    /// the same winner and win type in the next hand is then shown again.
    pub fn observe(&mut self, reconciler: &Reconciler) -> bool {
        if matches!(
            reconciler.current_phase(),
            Some(Phase::Dealing | Phase::ReplacingFlowers | Phase::OpeningGold | Phase::Playing)
        ) {
            self.last_seen = None;
            return false;
        }
        let view = reconciler.view();
        let Some(winner) = view.last_win_player_id() else {
            return false;
        };
        let key = (winner.clone(), view.last_win_type().cloned());
        if self.last_seen.as_ref() == Some(&key) {
            return false;
        }
        let name = reconciler.player_name(winner).unwrap_or(UNKNOWN_PLAYER);
        let result = HandResult::new(name, key.1.clone());
        self.last_seen = Some(key);
        self.show(result);
        true
    }

    /// Handles a timer expiry. Returns true if it hid the current result.
    #[instrument(skip(self))]
    pub fn expire(&mut self, generation: u64) -> bool {
        match &self.current {
            Some((shown, _)) if *shown == generation => {
                self.current = None;
                self.timer = None;
                debug!("Hand result expired");
                true
            }
            _ => {
                debug!("Ignoring stale expiry");
                false
            }
        }
    }

    /// Hides the current result early.
    pub fn dismiss(&mut self) {
        self.cancel_timer();
        self.current = None;
    }

    /// Hides everything and forgets the last winner seen.
    pub fn reset(&mut self) {
        self.dismiss();
        self.last_seen = None;
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl Drop for ResultOverlay {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
