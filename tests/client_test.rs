//! Game client end to end: HTTP join, scripted channel, gestures.

mod common;

use axum::routing::post;
use axum::{Json, Router};
use common::{MockConnector, ServerSide, WAIT, message, next_link};
use fzmahjong::{
    Action, ClientConfig, ClientEvent, GameClient, JoinOutcome, MemoryStorage, Resolution,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::timeout;

const PUBLIC_TOPIC: &str = "/topic/room/1001";

async fn spawn_join_server() -> String {
    let app = Router::new().route(
        "/api/room/join",
        post(|| async { Json(json!({"success": true, "roomId": "1001"})) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{addr}")
}

async fn joined_client() -> (GameClient<MemoryStorage>, ServerSide, String) {
    let base = spawn_join_server().await;
    let (links_tx, mut links) = mpsc::unbounded_channel();
    let config = ClientConfig::default()
        .with_server_url(base.as_str())
        .with_result_overlay_ms(60_000u64);
    let mut client = GameClient::new(
        config,
        Arc::new(MockConnector { links: links_tx }),
        MemoryStorage::new(),
    );

    let outcome = client
        .join("Ann", Some("1001"), None)
        .await
        .expect("join answered");
    assert!(matches!(outcome, JoinOutcome::Joined { .. }));
    let player_id = client.session().expect("live session").player_id().clone();

    let mut server = next_link(&mut links).await;
    server.accept().await;
    (client, server, player_id)
}

/// Pulls events until `ready` holds, returning everything seen.
async fn pump_until(
    client: &mut GameClient<MemoryStorage>,
    ready: impl Fn(&GameClient<MemoryStorage>) -> bool,
) -> Vec<ClientEvent> {
    let mut seen = Vec::new();
    while !ready(&*client) {
        let event = timeout(WAIT, client.next_event())
            .await
            .expect("event in time")
            .expect("session live");
        seen.push(event);
    }
    seen
}

fn hand_dealt(client: &GameClient<MemoryStorage>) -> bool {
    client.reconciler().is_some_and(|r| r.my_hand().len() == 4)
}

fn deal(player_id: &str) -> Value {
    json!({
        "phase": "PLAYING",
        "players": [
            {"id": player_id, "name": "Ann"},
            {"id": "P2", "name": "Bo"},
            {"id": "P3", "name": "Cy"},
            {"id": "P4", "name": "Di"},
        ],
        "goldTile": {"type": "TIAO", "value": 9},
        "currentPlayerIndex": 1,
    })
}

fn private_with_discard() -> String {
    json!({
        "myHandTiles": [
            {"type": "WAN", "value": 3, "id": "w3"},
            {"type": "WAN", "value": 4, "id": "w4"},
            {"type": "WAN", "value": 6, "id": "w6"},
            {"type": "WAN", "value": 7, "id": "w7"},
        ],
        "availableActions": {
            "canChi": true,
            "discardedTile": {"type": "WAN", "value": 5, "id": "d5"},
        },
    })
    .to_string()
}

#[tokio::test]
async fn test_chi_prompt_round_trip() {
    let (mut client, mut server, player_id) = joined_client().await;
    let private_topic = format!("{PUBLIC_TOPIC}/player/{player_id}");

    server.push(message(Some("sub-public"), PUBLIC_TOPIC, &deal(&player_id).to_string()));
    server.push(message(Some("sub-private"), &private_topic, &private_with_discard()));
    pump_until(&mut client, hand_dealt).await;

    let Resolution::Choose(prompt) = client.select(Action::Chi) else {
        panic!("expected a chi prompt");
    };
    assert_eq!(prompt.len(), 3);
    assert!(client.pending_prompt().is_some());

    let resolution = client.choose(1);
    assert!(resolution.command().is_some());
    assert!(client.pending_prompt().is_none());

    let sent = server.next_frame().await;
    assert_eq!(sent.header_value("destination"), Some("/app/game/chi"));
    let body: Value = serde_json::from_str(sent.body_text()).expect("json body");
    assert_eq!(
        body,
        json!({"playerId": player_id, "tileId1": "w4", "tileId2": "w6"})
    );
}

#[tokio::test]
async fn test_win_and_game_over_events() {
    let (mut client, server, player_id) = joined_client().await;
    server.push(message(Some("sub-public"), PUBLIC_TOPIC, &deal(&player_id).to_string()));
    pump_until(&mut client, |c| {
        c.reconciler().is_some_and(|r| r.player_name("P2").is_some())
    })
    .await;

    server.push(message(
        Some("sub-public"),
        PUBLIC_TOPIC,
        r#"{"phase":"FINISHED","lastWinPlayerId":"P2","lastWinType":"抢金"}"#,
    ));
    let seen = pump_until(&mut client, |c| c.result().is_some()).await;
    assert!(seen.iter().any(|e| matches!(e, ClientEvent::ViewUpdated)));

    let result = client.result().expect("result shown");
    assert_eq!(result.player_name(), "Bo");
    assert_eq!(result.label(), "抢金");

    let mut game_over = false;
    while !game_over {
        let event = timeout(WAIT, client.next_event())
            .await
            .expect("event in time")
            .expect("session live");
        game_over = event == ClientEvent::GameOver;
    }
}

#[tokio::test]
async fn test_leave_drops_view_and_session() {
    let (mut client, server, player_id) = joined_client().await;
    server.push(message(Some("sub-public"), PUBLIC_TOPIC, &deal(&player_id).to_string()));
    pump_until(&mut client, |c| {
        c.reconciler().is_some_and(|r| r.current_phase().is_some())
    })
    .await;

    client.leave().expect("leave");

    assert!(client.reconciler().is_none());
    assert!(client.saved_session().is_none());
    assert!(client.result().is_none());
    assert!(client.next_event().await.is_none());
    assert_eq!(
        client.select(Action::Pass),
        Resolution::Unavailable(fzmahjong::Refusal::NotExposed)
    );
}
