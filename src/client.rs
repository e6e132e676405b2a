use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_stream::try_stream;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use url::Url;

use crate::Result;
use crate::error::Error;
use crate::status::Status;
use crate::ws::config::Config;
use crate::ws::connection::{ConnectionManager, ConnectionState};
use crate::ws::error::WsError;
use crate::ws::socket::SocketConnector;

/// Broadcast channel capacity for incoming payloads.
const BROADCAST_CAPACITY: usize = 1024;

/// Client for a live caption room.
///
/// Maintains one persistent connection to the room server in a background
/// task, reconnecting automatically after failures (see
/// [`Config::retry_window`]). Incoming status payloads fan out to every
/// subscriber.
///
/// # Example
///
/// ```rust, no_run
/// use caption_room_client::{Client, ws::config::Config};
/// use futures::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::with_room("wss://example.com/connect", "qwrtpd", Config::default())?;
///
///     let mut statuses = Box::pin(client.statuses());
///     while let Some(status) = statuses.next().await {
///         println!("{:?}", status?);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// Endpoint the background driver dials
    endpoint: Url,
    /// Commands for the driver task
    command_tx: mpsc::UnboundedSender<Command>,
    /// Watch channel for connection state changes
    state_rx: watch::Receiver<ConnectionState>,
    /// Broadcast sender for incoming payloads
    broadcast_tx: broadcast::Sender<String>,
}

enum Command {
    Send(String),
    Reconnect,
}

impl Client {
    /// Connect to a fully formed room endpoint.
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        Self::start(parse_endpoint(endpoint)?, config)
    }

    /// Connect to a named room on the given server endpoint.
    ///
    /// Builds the `?room=<name>` connection URL and rejects room names the
    /// server would refuse (6 to 16 ASCII alphanumeric characters) before
    /// dialing.
    pub fn with_room(endpoint: &str, room: &str, config: Config) -> Result<Self> {
        Self::start(room_endpoint(endpoint, room)?, config)
    }

    fn start(endpoint: Url, config: Config) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        tokio::spawn(drive(
            endpoint.to_string(),
            config,
            command_rx,
            broadcast_tx.clone(),
            state_tx,
        ));

        Ok(Self {
            inner: Arc::new(ClientInner {
                endpoint,
                command_tx,
                state_rx,
                broadcast_tx,
            }),
        })
    }

    /// The endpoint this client dials.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.inner.endpoint.as_str()
    }

    /// Transmit a text payload to the room.
    ///
    /// The payload is handed to the current transport; if the connection is
    /// not open it is dropped there, not surfaced as an error here. An error
    /// means the client itself has shut down.
    pub fn send(&self, text: &str) -> Result<()> {
        self.inner
            .command_tx
            .send(Command::Send(text.to_owned()))
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Force an immediate new connection attempt, regardless of how recently
    /// the last one was made.
    pub fn reconnect(&self) -> Result<()> {
        self.inner
            .command_tx
            .send(Command::Reconnect)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_rx.clone()
    }

    /// Subscribe to raw incoming payloads.
    ///
    /// Each call returns a new independent receiver; payloads arrive in
    /// message order with their content unchanged.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Stream decoded [`Status`] records.
    ///
    /// A slow consumer that falls behind the broadcast buffer gets a
    /// [`WsError::Lagged`] error and may keep reading afterwards.
    pub fn statuses(&self) -> impl Stream<Item = Result<Status>> + use<> {
        let mut rx = self.subscribe();

        try_stream! {
            loop {
                match rx.recv().await {
                    Ok(raw) => yield Status::decode(&raw),
                    Err(RecvError::Lagged(count)) => {
                        tracing::warn!("Status stream lagged, missed {count} messages");
                        Err(WsError::Lagged { count })?;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
}

/// Driver task: serializes transport events and user commands into the
/// synchronous state machine.
async fn drive(
    endpoint: String,
    config: Config,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
    broadcast_tx: broadcast::Sender<String>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let generation = Arc::new(AtomicU64::new(0));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let connector = SocketConnector::new(Arc::clone(&generation), event_tx);

    let payload_tx = broadcast_tx;
    let mut manager = ConnectionManager::new(
        endpoint,
        connector,
        config,
        Box::new(move |text| {
            _ = payload_tx.send(text.to_owned());
        }),
    );
    manager.set_on_state_change(Box::new(move |state| {
        _ = state_tx.send(state);
    }));

    loop {
        tokio::select! {
            Some((event_generation, event)) = event_rx.recv() => {
                // Events from a replaced transport are stale; the handle was
                // already discarded and must not drive the state machine.
                if event_generation == generation.load(Ordering::SeqCst) {
                    manager.handle_event(event);
                }
            }
            command = command_rx.recv() => {
                match command {
                    Some(Command::Send(text)) => manager.send(&text),
                    Some(Command::Reconnect) => manager.reconnect(),
                    // All client handles dropped: tear everything down.
                    None => break,
                }
            }
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint)?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(Error::validation(format!(
            "endpoint scheme must be ws or wss, got {}",
            url.scheme()
        )));
    }
    Ok(url)
}

fn room_endpoint(endpoint: &str, room: &str) -> Result<Url> {
    if !matches!(room.len(), 6..=16) || !room.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::validation(format!(
            "room name must be 6-16 ASCII alphanumeric characters, got {room:?}"
        )));
    }
    let mut url = parse_endpoint(endpoint)?;
    url.query_pairs_mut().append_pair("room", room);
    Ok(url)
}
