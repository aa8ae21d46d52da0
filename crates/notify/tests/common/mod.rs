//! Test WebSocket server for transport integration tests.
//!
//! Serves up to a fixed number of successful handshakes, then accepts and
//! immediately drops further TCP connections so reconnect attempts can be
//! counted without succeeding.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Commands a test can issue against the currently connected client.
pub enum ServerCommand {
    /// Push a raw text frame.
    Push(String),
    /// Send a close frame and drop the connection.
    Close,
}

pub struct WsTestServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    subscriptions: Arc<Mutex<Vec<String>>>,
    command_tx: mpsc::UnboundedSender<ServerCommand>,
}

impl WsTestServer {
    /// Start a server that completes at most `max_handshakes` WebSocket
    /// handshakes; later connections are accepted at the TCP level and
    /// dropped, which fails the client handshake.
    pub async fn start(max_handshakes: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        let (command_tx, mut command_rx) = mpsc::unbounded_channel();

        let accepted_task = Arc::clone(&accepted);
        let subscriptions_task = Arc::clone(&subscriptions);

        tokio::spawn(async move {
            let mut handshakes = 0usize;
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                accepted_task.fetch_add(1, Ordering::SeqCst);

                if handshakes >= max_handshakes {
                    // Drop the socket; the client's handshake fails.
                    continue;
                }

                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    continue;
                };
                handshakes += 1;

                // Serve this client until it goes away or the test closes it.
                loop {
                    tokio::select! {
                        command = command_rx.recv() => match command {
                            Some(ServerCommand::Push(text)) => {
                                let _ = ws.send(Message::Text(text)).await;
                            }
                            Some(ServerCommand::Close) => {
                                let _ = ws.close(None).await;
                                break;
                            }
                            None => return,
                        },
                        frame = ws.next() => match frame {
                            Some(Ok(Message::Text(text))) => {
                                record_subscription(&subscriptions_task, &text);
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        },
                    }
                }
            }
        });

        Self {
            addr,
            accepted,
            subscriptions,
            command_tx,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Total TCP connections accepted (served and dropped alike).
    pub fn accepted_count(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Destinations of subscribe frames received so far, in arrival order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// Push a raw text frame to the connected client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.command_tx.send(ServerCommand::Push(text.into()));
    }

    /// Close the current client connection server-side.
    pub fn close_client(&self) {
        let _ = self.command_tx.send(ServerCommand::Close);
    }
}

fn record_subscription(subscriptions: &Mutex<Vec<String>>, text: &str) {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(text) else {
        return;
    };
    if value["type"] == "subscribe" {
        if let Some(destination) = value["destination"].as_str() {
            subscriptions.lock().unwrap().push(destination.to_string());
        }
    }
}
