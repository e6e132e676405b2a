#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use tokio::time::Instant;

use super::config::Config;
use super::traits::{Connector, Transport as _, TransportEvent};

/// Handler invoked once per inbound payload, in arrival order.
pub type PayloadHandler = Box<dyn FnMut(&str) + Send>;

/// Single-slot observer invoked synchronously after each state change.
pub type StateChangeHandler = Box<dyn FnMut(ConnectionState) + Send>;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Attempting to connect; initial state and re-entered on every retry
    Connecting,
    /// Connection established
    Open,
    /// Connection closed or failed
    Error,
}

impl ConnectionState {
    /// Check if the connection is currently open.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Owns one logical room connection and keeps it alive across failures.
///
/// The manager is a synchronous state machine: all work happens inside
/// [`handle_event`](Self::handle_event) and the public methods, which run to
/// completion on the caller's thread. Exactly one transport handle is owned
/// at a time and is replaced wholesale on every attempt, so there is never
/// ambiguity about which connection is current.
///
/// Reconnection is reactive, not timed. When the state *transitions* into
/// [`ConnectionState::Error`], the manager retries immediately if at least
/// [`Config::retry_window`] has elapsed since the last attempt and otherwise
/// does nothing. No timer is scheduled, so rapid error bursts inside the
/// window coalesce into a single suppressed decision. [`reconnect`](Self::reconnect)
/// bypasses the window entirely.
pub struct ConnectionManager<C: Connector> {
    /// Target endpoint, immutable after construction
    endpoint: String,
    connector: C,
    config: Config,
    state: ConnectionState,
    /// The active transport handle; always `Some` after construction
    transport: Option<C::Transport>,
    last_attempt: Instant,
    handler: PayloadHandler,
    on_state_change: Option<StateChangeHandler>,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager and immediately start the first connection attempt.
    pub fn new(endpoint: String, connector: C, config: Config, handler: PayloadHandler) -> Self {
        let mut manager = Self {
            endpoint,
            connector,
            config,
            state: ConnectionState::Connecting,
            transport: None,
            last_attempt: Instant::now(),
            handler,
            on_state_change: None,
        };
        manager.connect();
        manager
    }

    /// Install the state-change observer, replacing any previous one.
    pub fn set_on_state_change(&mut self, handler: StateChangeHandler) {
        self.on_state_change = Some(handler);
    }

    /// Get the current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Feed a transport event into the state machine.
    ///
    /// Payloads are forwarded verbatim to the handler without touching the
    /// state. Close and error are indistinguishable failures: both land in
    /// [`ConnectionState::Error`] and run the retry check.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                self.set_state(ConnectionState::Open);
            }
            TransportEvent::Close | TransportEvent::Error => {
                let entered_error = self.set_state(ConnectionState::Error);
                if entered_error {
                    self.auto_reconnect();
                }
            }
            TransportEvent::Message(text) => {
                tracing::trace!(len = text.len(), "Forwarding room payload");
                (self.handler)(&text);
            }
        }
    }

    /// Force an immediate new connection attempt, regardless of how recently
    /// the last one was made. The previous transport is discarded.
    pub fn reconnect(&mut self) {
        self.connect();
    }

    /// Transmit a text payload over the current transport.
    ///
    /// The caller should only send while [`ConnectionState::Open`]; anything
    /// queued on a transport that is not open is handled (typically dropped)
    /// by the transport itself.
    pub fn send(&mut self, text: &str) {
        if let Some(transport) = &mut self.transport {
            transport.send(text);
        }
    }

    fn auto_reconnect(&mut self) {
        if self.last_attempt.elapsed() > self.config.retry_window {
            tracing::debug!("Retry window elapsed, reconnecting");
            self.connect();
        } else {
            tracing::debug!("Connection error inside retry window, suppressing retry");
        }
    }

    fn connect(&mut self) {
        self.last_attempt = Instant::now();
        self.set_state(ConnectionState::Connecting);
        // Dropping the previous handle tears the old connection down.
        self.transport = Some(self.connector.connect(&self.endpoint));
    }

    /// Returns whether the state actually changed.
    fn set_state(&mut self, state: ConnectionState) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state;
        if let Some(observer) = &mut self.on_state_change {
            observer(state);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    #![expect(clippy::unwrap_used, reason = "asserting on test state")]

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::time::advance;

    use super::*;

    #[derive(Default)]
    struct MockConnector {
        constructed: Arc<AtomicUsize>,
        sent: Arc<Mutex<Vec<(usize, String)>>>,
    }

    struct MockTransport {
        generation: usize,
        sent: Arc<Mutex<Vec<(usize, String)>>>,
    }

    impl Connector for MockConnector {
        type Transport = MockTransport;

        fn connect(&mut self, _endpoint: &str) -> MockTransport {
            let generation = self.constructed.fetch_add(1, Ordering::SeqCst) + 1;
            MockTransport {
                generation,
                sent: Arc::clone(&self.sent),
            }
        }
    }

    impl super::super::traits::Transport for MockTransport {
        fn send(&mut self, text: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((self.generation, text.to_owned()));
        }
    }

    fn manager_with_spy() -> (ConnectionManager<MockConnector>, Arc<AtomicUsize>) {
        let connector = MockConnector::default();
        let constructed = Arc::clone(&connector.constructed);
        let manager = ConnectionManager::new(
            "ws://room.invalid/connect".to_owned(),
            connector,
            Config::default(),
            Box::new(|_| {}),
        );
        (manager, constructed)
    }

    #[tokio::test(start_paused = true)]
    async fn construction_connects_once() {
        let (manager, constructed) = manager_with_spy();
        assert_eq!(manager.state(), ConnectionState::Connecting);
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn open_event_sets_open() {
        let (mut manager, _) = manager_with_spy();
        manager.handle_event(TransportEvent::Open);
        assert_eq!(manager.state(), ConnectionState::Open);
        assert!(manager.state().is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn error_inside_window_suppresses_retry() {
        let (mut manager, constructed) = manager_with_spy();
        advance(Duration::from_millis(4999)).await;
        manager.handle_event(TransportEvent::Error);
        assert_eq!(manager.state(), ConnectionState::Error);
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn error_after_window_retries_immediately() {
        let (mut manager, constructed) = manager_with_spy();
        manager.handle_event(TransportEvent::Open);
        advance(Duration::from_millis(5001)).await;
        manager.handle_event(TransportEvent::Error);
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_treated_like_error() {
        let (mut manager, constructed) = manager_with_spy();
        manager.handle_event(TransportEvent::Open);
        advance(Duration::from_secs(6)).await;
        manager.handle_event(TransportEvent::Close);
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_errors_coalesce() {
        let (mut manager, constructed) = manager_with_spy();
        manager.handle_event(TransportEvent::Error);
        advance(Duration::from_secs(6)).await;
        // State is already Error: a second failure event is not a
        // transition, so no retry check runs.
        manager.handle_event(TransportEvent::Error);
        manager.handle_event(TransportEvent::Close);
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_ignores_the_window() {
        let (mut manager, constructed) = manager_with_spy();
        manager.reconnect();
        manager.reconnect();
        assert_eq!(constructed.load(Ordering::SeqCst), 3);
        assert_eq!(manager.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_resets_the_window() {
        let (mut manager, constructed) = manager_with_spy();
        advance(Duration::from_secs(6)).await;
        manager.reconnect();
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
        // The forced attempt just reset the clock, so this error is inside
        // the window again.
        manager.handle_event(TransportEvent::Error);
        assert_eq!(constructed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn payloads_forward_verbatim_in_order() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&received);
        let mut manager = ConnectionManager::new(
            "ws://room.invalid/connect".to_owned(),
            MockConnector::default(),
            Config::default(),
            Box::new(move |text| sink.lock().unwrap().push(text.to_owned())),
        );

        manager.handle_event(TransportEvent::Open);
        manager.handle_event(TransportEvent::Message("n2$first".to_owned()));
        manager.handle_event(TransportEvent::Message(String::new()));
        manager.handle_event(TransportEvent::Message("$ raw, unparsed ".to_owned()));

        assert_eq!(
            *received.lock().unwrap(),
            vec!["n2$first".to_owned(), String::new(), "$ raw, unparsed ".to_owned()]
        );
        // Message events never touch the state.
        assert_eq!(manager.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn send_goes_to_the_current_transport() {
        let connector = MockConnector::default();
        let sent = Arc::clone(&connector.sent);
        let mut manager = ConnectionManager::new(
            "ws://room.invalid/connect".to_owned(),
            connector,
            Config::default(),
            Box::new(|_| {}),
        );

        manager.send("from first");
        manager.reconnect();
        manager.send("from second");

        assert_eq!(
            *sent.lock().unwrap(),
            vec![(1, "from first".to_owned()), (2, "from second".to_owned())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn observer_fires_only_on_transitions() {
        let (mut manager, _) = manager_with_spy();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.set_on_state_change(Box::new(move |state| sink.lock().unwrap().push(state)));

        manager.handle_event(TransportEvent::Open);
        manager.handle_event(TransportEvent::Error);
        manager.handle_event(TransportEvent::Error); // no transition
        advance(Duration::from_secs(6)).await;
        manager.reconnect();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ConnectionState::Open,
                ConnectionState::Error,
                ConnectionState::Connecting,
            ]
        );
    }
}
