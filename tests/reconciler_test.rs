//! Merging of public and private snapshots.

use fzmahjong::{Phase, Reconciler};
use serde_json::{Value, json};

fn public_snapshot() -> Value {
    json!({
        "roomId": "1001",
        "phase": "PLAYING",
        "players": [
            {"id": "P1", "name": "Ann", "position": 0, "handSize": 16},
            {"id": "P2", "name": "Bo", "position": 1, "handSize": 16},
            {"id": "P3", "name": "Cy", "position": 2, "handSize": 16},
            {"id": "P4", "name": "Di", "position": 3, "handSize": 16},
        ],
        "currentPlayerIndex": 1,
        "dealerIndex": 0,
        "remainingTiles": 80,
        "goldTile": {"type": "TIAO", "value": 1},
    })
}

fn private_snapshot() -> Value {
    json!({
        "phase": "PLAYING",
        "remainingTiles": 79,
        "myHandTiles": [
            {"type": "WAN", "value": 2, "id": "w2"},
            {"type": "WAN", "value": 4, "id": "w4"},
        ],
        "availableActions": {"canHu": false},
    })
}

#[test]
fn test_redelivered_public_snapshot_is_idempotent() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&public_snapshot());
    let once = reconciler.view().clone();

    reconciler.on_public_snapshot(&public_snapshot());

    assert_eq!(reconciler.view(), &once);
}

#[test]
fn test_private_wins_in_either_order() {
    let mut private_first = Reconciler::new("P1");
    private_first.on_private_snapshot(&private_snapshot());
    private_first.on_public_snapshot(&public_snapshot());

    let mut public_first = Reconciler::new("P1");
    public_first.on_public_snapshot(&public_snapshot());
    public_first.on_private_snapshot(&private_snapshot());

    for reconciler in [&private_first, &public_first] {
        assert_eq!(reconciler.view().remaining_tiles(), Some(&79));
        assert_eq!(reconciler.my_hand().len(), 2);
        assert_eq!(reconciler.view().current_player_index(), Some(&1));
        assert_eq!(reconciler.my_index_among_players(), Some(0));
    }
}

#[test]
fn test_public_updates_accumulate() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&public_snapshot());
    reconciler.on_public_snapshot(&json!({"currentPlayerIndex": 2}));

    assert_eq!(reconciler.view().current_player_index(), Some(&2));
    assert_eq!(reconciler.view().room_id().map(String::as_str), Some("1001"));
    assert_eq!(reconciler.player_name("P4"), Some("Di"));
}

#[test]
fn test_new_private_snapshot_replaces_the_old_one() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_private_snapshot(&private_snapshot());
    reconciler.on_private_snapshot(&json!({
        "myHandTiles": [{"type": "BING", "value": 9, "id": "b9"}],
    }));

    let hand = reconciler.my_hand();
    assert_eq!(hand.len(), 1);
    assert_eq!(hand[0].id(), "b9");
}

#[test]
fn test_phase_follows_most_recent_snapshot() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_private_snapshot(&json!({"phase": "PLAYING"}));
    reconciler.on_public_snapshot(&json!({"phase": "CONFIRM_CONTINUE"}));

    assert_eq!(reconciler.current_phase(), Some(Phase::ConfirmContinue));
    assert_eq!(reconciler.view().phase(), Some(&Phase::ConfirmContinue));

    reconciler.on_private_snapshot(&json!({"phase": "DEALING"}));
    assert_eq!(reconciler.current_phase(), Some(Phase::Dealing));
}

#[test]
fn test_snapshot_without_phase_keeps_phase() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&json!({"phase": "OPENING_GOLD"}));
    reconciler.on_private_snapshot(&json!({"remainingTiles": 60}));

    assert_eq!(reconciler.current_phase(), Some(Phase::OpeningGold));
}

#[test]
fn test_malformed_field_means_no_change() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&public_snapshot());
    reconciler.on_public_snapshot(&json!({
        "remainingTiles": "lots",
        "goldTile": {"type": "WAN", "value": 12},
        "phase": "NAPPING",
        "currentPlayerIndex": 3,
    }));

    let view = reconciler.view();
    assert_eq!(view.remaining_tiles(), Some(&80));
    assert_eq!(reconciler.gold_tile().map(|g| g.rank()), Some(1));
    assert_eq!(reconciler.current_phase(), Some(Phase::Playing));
    assert_eq!(view.current_player_index(), Some(&3));
}

#[test]
fn test_non_object_body_changes_nothing() {
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&public_snapshot());
    let before = reconciler.view().clone();

    reconciler.on_public_snapshot(&json!("garbage"));
    reconciler.on_private_snapshot(&json!([1, 2, 3]));

    assert_eq!(reconciler.view().remaining_tiles(), before.remaining_tiles());
    assert_eq!(reconciler.current_phase(), Some(Phase::Playing));
}

#[test]
fn test_continue_decision_lookup() {
    let mut reconciler = Reconciler::new("P2");
    reconciler.on_public_snapshot(&json!({
        "phase": "CONFIRM_CONTINUE",
        "continueDecisions": {"P1": true, "P2": null},
    }));
    assert_eq!(reconciler.my_continue_decision(), None);

    reconciler.on_public_snapshot(&json!({
        "continueDecisions": {"P1": true, "P2": false},
    }));
    assert_eq!(reconciler.my_continue_decision(), Some(false));
}
