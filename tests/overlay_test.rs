//! Hand result overlay timing and supersession.

use fzmahjong::{HandResult, Reconciler, ResultOverlay, UNKNOWN_PLAYER};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

const SHORT: Duration = Duration::from_millis(30);
const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_result_expires_after_duration() {
    let (mut overlay, mut expiry) = ResultOverlay::new(SHORT);
    let generation = overlay.show(HandResult::new("Ann", Some("自摸".to_string())));
    assert_eq!(overlay.current().map(|r| r.label()), Some("自摸"));

    let fired = timeout(WAIT, expiry.recv())
        .await
        .expect("timer fired")
        .expect("channel open");

    assert_eq!(fired, generation);
    assert!(overlay.expire(fired));
    assert!(overlay.current().is_none());
}

#[tokio::test]
async fn test_newer_result_supersedes_older() {
    let (mut overlay, mut expiry) = ResultOverlay::new(SHORT);
    let first = overlay.show(HandResult::new("Ann", None));
    let second = overlay.show(HandResult::new("Bo", Some("抢金".to_string())));

    assert!(!overlay.expire(first));
    assert_eq!(overlay.current().map(|r| r.player_name().as_str()), Some("Bo"));

    let fired = timeout(WAIT, expiry.recv())
        .await
        .expect("timer fired")
        .expect("channel open");
    assert_eq!(fired, second);
    assert!(overlay.expire(fired));
}

#[tokio::test]
async fn test_dismiss_cancels_timer() {
    let (mut overlay, mut expiry) = ResultOverlay::new(SHORT);
    let generation = overlay.show(HandResult::new("Ann", None));

    overlay.dismiss();

    assert!(overlay.current().is_none());
    assert!(timeout(SHORT * 4, expiry.recv()).await.is_err());
    assert!(!overlay.expire(generation));
}

#[tokio::test]
async fn test_observe_shows_each_win_once() {
    let (mut overlay, _expiry) = ResultOverlay::new(WAIT);
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&json!({
        "players": [{"id": "P1", "name": "Ann"}, {"id": "P2", "name": "Bo"}],
        "lastWinPlayerId": "P2",
        "lastWinType": "金雀自摸",
    }));

    assert!(overlay.observe(&reconciler));
    assert_eq!(overlay.current().map(|r| r.label()), Some("自摸"));
    assert!(!overlay.observe(&reconciler));

    reconciler.on_public_snapshot(&json!({"lastWinPlayerId": "P9", "lastWinType": null}));
    assert!(overlay.observe(&reconciler));
    let shown = overlay.current().expect("result shown");
    assert_eq!(shown.player_name(), UNKNOWN_PLAYER);
    assert_eq!(shown.label(), "胡");
}

#[tokio::test]
async fn test_no_winner_shows_nothing() {
    let (mut overlay, _expiry) = ResultOverlay::new(WAIT);
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&json!({"phase": "PLAYING"}));

    assert!(!overlay.observe(&reconciler));
    assert!(overlay.current().is_none());
}

#[tokio::test]
async fn test_repeat_win_in_next_hand_shows_again() {
    let (mut overlay, _expiry) = ResultOverlay::new(WAIT);
    let mut reconciler = Reconciler::new("P1");
    reconciler.on_public_snapshot(&json!({
        "phase": "HAND_FINISHED",
        "players": [{"id": "P1", "name": "Ann"}, {"id": "P2", "name": "Bo"}],
        "lastWinPlayerId": "P2",
        "lastWinType": "自摸",
    }));
    assert!(overlay.observe(&reconciler));
    overlay.dismiss();

    reconciler.on_public_snapshot(&json!({"phase": "PLAYING"}));
    assert!(!overlay.observe(&reconciler), "stale winner during play");
    assert!(overlay.current().is_none());

    reconciler.on_public_snapshot(&json!({"phase": "HAND_FINISHED"}));
    assert!(overlay.observe(&reconciler));
    assert_eq!(overlay.current().map(|r| r.player_name().as_str()), Some("Bo"));
}
