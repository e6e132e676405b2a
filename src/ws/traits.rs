//! Core traits for the transport seam.
//!
//! [`ConnectionManager`](super::ConnectionManager) never talks to a socket
//! directly: it asks a [`Connector`] for a fresh [`Transport`] handle on
//! every attempt and reacts to [`TransportEvent`]s fed back in by whoever
//! drives the transport. The production binding over tokio-tungstenite
//! lives in [`socket`](super::socket); tests substitute a recording mock.

/// An owned handle to one established (or in-flight) connection attempt.
///
/// The manager holds exactly one at a time and replaces it wholesale on
/// reconnect; dropping the old handle is what tears the old connection down.
pub trait Transport: Send {
    /// Queue a text payload for transmission.
    ///
    /// Infallible by design: failures on a dead transport surface as
    /// [`TransportEvent`]s (or are silently dropped), never as manager-level
    /// errors.
    fn send(&mut self, text: &str);
}

/// Factory for [`Transport`] handles bound to an endpoint.
pub trait Connector: Send {
    type Transport: Transport;

    /// Start a new connection attempt. Like the browser socket constructor
    /// this never fails synchronously; a refused connection arrives later as
    /// [`TransportEvent::Error`].
    fn connect(&mut self, endpoint: &str) -> Self::Transport;
}

/// Lifecycle and payload events emitted by a transport.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection was established
    Open,
    /// The peer closed the connection
    Close,
    /// The connection failed or was aborted
    Error,
    /// A text payload arrived
    Message(String),
}
