//! Production [`Connector`] binding over tokio-tungstenite.
//!
//! Each [`Connector::connect`] call spawns one task that dials the endpoint
//! and pumps the socket, reporting lifecycle and payload events back through
//! a shared channel tagged with a generation number. The driver compares
//! tags against the connector's current generation so a replaced transport
//! can never inject stale events into the state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt as _, StreamExt as _};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::traits::{Connector, Transport, TransportEvent};

/// Connector that dials real WebSocket endpoints.
pub(crate) struct SocketConnector {
    generation: Arc<AtomicU64>,
    event_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl SocketConnector {
    pub(crate) fn new(
        generation: Arc<AtomicU64>,
        event_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    ) -> Self {
        Self {
            generation,
            event_tx,
        }
    }
}

impl Connector for SocketConnector {
    type Transport = SocketTransport;

    fn connect(&mut self, endpoint: &str) -> SocketTransport {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(
            endpoint.to_owned(),
            generation,
            self.event_tx.clone(),
            outgoing_rx,
        ));
        SocketTransport { outgoing_tx }
    }
}

/// Handle to one spawned socket task. Dropping it closes the outgoing
/// channel, which makes the task hang up the connection.
pub(crate) struct SocketTransport {
    outgoing_tx: mpsc::UnboundedSender<String>,
}

impl Transport for SocketTransport {
    fn send(&mut self, text: &str) {
        if self.outgoing_tx.send(text.to_owned()).is_err() {
            // Socket task already gone; a matching Close/Error event is on
            // its way to the state machine.
            tracing::debug!("Dropping payload queued on a dead transport");
        }
    }
}

async fn run_socket(
    endpoint: String,
    generation: u64,
    event_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    mut outgoing_rx: mpsc::UnboundedReceiver<String>,
) {
    let ws_stream = match connect_async(&endpoint).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            tracing::warn!(%endpoint, error = %e, "Unable to connect to room");
            _ = event_tx.send((generation, TransportEvent::Error));
            return;
        }
    };

    _ = event_tx.send((generation, TransportEvent::Open));
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        _ = event_tx.send((generation, TransportEvent::Message(text.to_string())));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        _ = event_tx.send((generation, TransportEvent::Close));
                        return;
                    }
                    Some(Ok(_)) => {
                        // Binary and ping/pong frames are not part of the protocol.
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Room connection failed");
                        _ = event_tx.send((generation, TransportEvent::Error));
                        return;
                    }
                }
            }
            outgoing = outgoing_rx.recv() => {
                match outgoing {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text.into())).await {
                            tracing::warn!(error = %e, "Room connection failed while sending");
                            _ = event_tx.send((generation, TransportEvent::Error));
                            return;
                        }
                    }
                    // Transport handle dropped: this attempt was replaced.
                    None => return,
                }
            }
        }
    }
}
