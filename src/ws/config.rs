#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

const DEFAULT_RETRY_WINDOW: Duration = Duration::from_millis(5000);

/// Configuration for room connection behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Minimum interval between automatic reconnect attempts. An error that
    /// lands inside the window is suppressed; one that lands after it
    /// triggers an immediate retry. There is no exponential backoff: the
    /// protocol is human-paced and a flat floor is enough to avoid
    /// hot-looping on a dead endpoint.
    pub retry_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retry_window: DEFAULT_RETRY_WINDOW,
        }
    }
}
