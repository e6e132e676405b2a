#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// Room connection error variants.
///
/// Transport-level failures never show up here: they collapse into the
/// manager's `Error` state and self-heal through the reconnect policy.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// The connection was closed and the client handle can no longer reach it
    ConnectionClosed,
    /// A payload stream lagged behind and missed messages
    Lagged {
        /// Number of payloads that were missed
        count: u64,
    },
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionClosed => write!(f, "room connection closed"),
            Self::Lagged { count } => write!(f, "payload stream lagged, missed {count} messages"),
        }
    }
}

impl StdError for WsError {}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Kind};

    #[test]
    fn lagged_display_includes_count() {
        let error = WsError::Lagged { count: 7 };
        assert_eq!(error.to_string(), "payload stream lagged, missed 7 messages");
    }

    #[test]
    fn ws_error_converts_to_websocket_kind() {
        let error: Error = WsError::ConnectionClosed.into();
        assert_eq!(error.kind(), Kind::WebSocket);
        assert!(error.downcast_ref::<WsError>().is_some());
    }
}
