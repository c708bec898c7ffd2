//! Text rendering of the reconciled view.

use fzmahjong_tiles::{Tile, TileFace};
use std::fmt::Write as _;

use crate::actions::{ActionPanel, ChoicePrompt};
use crate::reconciler::Reconciler;
use crate::view::Phase;

/// One-line status for the current phase.
pub fn status_line(reconciler: &Reconciler) -> String {
    let view = reconciler.view();
    match reconciler.current_phase() {
        Some(Phase::Waiting) => "Waiting for players to join...".to_string(),
        Some(Phase::Dealing) => "Dealing...".to_string(),
        Some(Phase::ReplacingFlowers) => "Replacing flowers...".to_string(),
        Some(Phase::OpeningGold) => "Opening gold...".to_string(),
        Some(Phase::Playing) => {
            let current = view
                .current_player_index()
                .and_then(|i| view.players()?.get(*i));
            match current {
                Some(p) if p.id() == reconciler.player_id() => "It's YOUR TURN!".to_string(),
                Some(p) => format!("It's [{}] turn", p.name()),
                None => String::new(),
            }
        }
        Some(Phase::HandFinished) => "Hand finished".to_string(),
        Some(Phase::Finished) => "Game Over".to_string(),
        Some(Phase::ConfirmContinue) => "Waiting for confirmation to continue...".to_string(),
        None => String::new(),
    }
}

/// Hand as `1:3万 2:5条 ...`, gold tiles marked with `*`.
pub fn format_hand(hand: &[Tile], gold: Option<&TileFace>) -> String {
    let mut out = String::new();
    for (i, tile) in hand.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mark = if tile.is_gold(gold) { "*" } else { "" };
        let _ = write!(out, "{}:{}{}", i + 1, tile, mark);
    }
    out
}

/// Buttons in the action area, e.g. `[吃 chi] [过 pass]`.
pub fn format_panel(panel: &ActionPanel) -> String {
    panel
        .actions()
        .into_iter()
        .map(|a| format!("[{} {}]", a.label(), a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numbered options of a prompt.
pub fn format_prompt(prompt: &ChoicePrompt) -> String {
    match prompt {
        ChoicePrompt::Chi {
            discarded,
            candidates,
        } => candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let run: Vec<String> = c.sequence(discarded).iter().map(|t| t.to_string()).collect();
                format!("{}. {}", i + 1, run.join(""))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        ChoicePrompt::ConcealedKong { options } => options
            .iter()
            .enumerate()
            .map(|(i, face)| format!("{}. {}", i + 1, face))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Multi-line summary of the table.
pub fn render_view(reconciler: &Reconciler) -> String {
    let view = reconciler.view();
    let mut out = String::new();
    let dash = || "-".to_string();

    let _ = writeln!(
        out,
        "Room: {}  Gold: {}  Remaining: {}",
        view.room_id().cloned().unwrap_or_else(dash),
        reconciler.gold_tile().map_or_else(dash, |g| g.to_string()),
        view.remaining_tiles().map_or_else(dash, |r| r.to_string()),
    );
    if let Some(players) = view.players() {
        for (i, p) in players.iter().enumerate() {
            let current = view.current_player_index() == Some(&i);
            let dealer = p.is_dealer().unwrap_or(false);
            let _ = writeln!(
                out,
                "{} {}{} score {} hand {}",
                if current { ">" } else { " " },
                p.name(),
                if dealer { " (庄)" } else { "" },
                p.score().unwrap_or(0),
                p.hand_size().map_or_else(dash, |n| n.to_string()),
            );
        }
    }
    if let Some(tile) = view.last_discarded_tile() {
        let _ = writeln!(out, "Last discard: {}", tile);
    }
    let _ = writeln!(out, "Hand: {}", format_hand(reconciler.my_hand(), reconciler.gold_tile()));
    if let Some(ting) = reconciler.current_capabilities().map(|c| c.ting_tiles()) {
        if !ting.is_empty() {
            let names: Vec<String> = ting.iter().map(|t| t.to_string()).collect();
            let _ = writeln!(out, "Ting: {}", names.join(" "));
        }
    }
    let _ = write!(out, "{}", status_line(reconciler));
    out
}
