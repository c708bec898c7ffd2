//! WebSocket connector against raw local listeners.

use fzmahjong::{Connector, TransportError, WebSocketConnector};
use url::Url;

/// Accepts connections and hangs up on each without a reply.
async fn spawn_hangup_listener() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });
    port
}

#[tokio::test]
async fn test_secure_url_reaches_tls_handshake() {
    let port = spawn_hangup_listener().await;
    let url = Url::parse(&format!("wss://127.0.0.1:{port}/ws")).expect("valid url");

    let result = WebSocketConnector::new(url).connect().await;

    let Err(TransportError::Connect(message)) = result else {
        panic!("expected a connect failure");
    };
    assert!(
        !message.contains("TLS support not compiled in"),
        "wss must be supported: {message}"
    );
}

#[tokio::test]
async fn test_plain_url_hangup_is_connect_error() {
    let port = spawn_hangup_listener().await;
    let url = Url::parse(&format!("ws://127.0.0.1:{port}/ws")).expect("valid url");

    let result = WebSocketConnector::new(url).connect().await;

    assert!(matches!(result, Err(TransportError::Connect(_))));
}
