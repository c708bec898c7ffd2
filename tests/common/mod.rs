//! Scripted in-memory STOMP server shared by the channel tests.

#![allow(dead_code)]

use async_trait::async_trait;
use fzmahjong::{Connector, Frame, Transport, TransportError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

pub const WAIT: Duration = Duration::from_secs(2);

/// Server end of one mock connection.
pub struct ServerSide {
    pub to_client: mpsc::UnboundedSender<Result<String, TransportError>>,
    pub from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerSide {
    pub async fn next_frame(&mut self) -> Frame {
        let text = timeout(WAIT, self.from_client.recv())
            .await
            .expect("frame in time")
            .expect("client still connected");
        Frame::decode(&text)
            .expect("well-formed frame")
            .expect("not a heart-beat")
    }

    pub fn push(&self, frame: Frame) {
        self.to_client
            .send(Ok(frame.encode()))
            .expect("client listening");
    }

    /// Answers CONNECT and returns the frames sent before the session is live.
    pub async fn accept(&mut self) -> Vec<Frame> {
        let connect = self.next_frame().await;
        assert_eq!(connect.command(), "CONNECT");
        self.push(Frame::new("CONNECTED").header("version", "1.2"));
        let mut frames = Vec::new();
        for _ in 0..3 {
            frames.push(self.next_frame().await);
        }
        frames
    }
}

struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Result<String, TransportError>>,
    outgoing: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.outgoing
            .send(text)
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.incoming.recv().await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Hands each new connection's server side to the test.
pub struct MockConnector {
    pub links: mpsc::UnboundedSender<ServerSide>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        self.links
            .send(ServerSide {
                to_client,
                from_client,
            })
            .map_err(|_| TransportError::Connect("test finished".to_string()))?;
        Ok(Box::new(MockTransport { incoming, outgoing }))
    }
}

/// Waits for the client's next connection attempt.
pub async fn next_link(links: &mut mpsc::UnboundedReceiver<ServerSide>) -> ServerSide {
    timeout(WAIT, links.recv())
        .await
        .expect("connect attempt in time")
        .expect("connector alive")
}

/// MESSAGE frame as the broker would deliver it.
pub fn message(subscription: Option<&str>, destination: &str, body: &str) -> Frame {
    let frame = Frame::new("MESSAGE")
        .header("destination", destination)
        .header("message-id", "m-1");
    let frame = match subscription {
        Some(id) => frame.header("subscription", id),
        None => frame,
    };
    frame.body(body)
}
