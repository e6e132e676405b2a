//! Live room watcher.
//!
//! Connects to a caption room, logs every connection state change, and
//! prints decoded statuses as the room produces them. The connection
//! recovers from server hangups on its own; kill and restart the server
//! to watch the retry window in action.
//!
//! Run with tracing enabled:
//! ```sh
//! RUST_LOG=info ROOM_URL=ws://127.0.0.1:3000/connect ROOM=qwrtpd cargo run --example watch_room
//! ```

use caption_room_client::Client;
use caption_room_client::ws::config::Config;
use futures::StreamExt as _;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let endpoint =
        std::env::var("ROOM_URL").unwrap_or_else(|_| "ws://127.0.0.1:3000/connect".to_owned());
    let room = std::env::var("ROOM").unwrap_or_else(|_| "qwrtpd".to_owned());

    let client = Client::with_room(&endpoint, &room, Config::default())?;
    info!(%endpoint, %room, "connecting");

    let mut state_rx = client.state_receiver();
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            info!(state = ?*state_rx.borrow(), "connection state changed");
        }
    });

    let mut statuses = Box::pin(client.statuses());
    while let Some(status) = statuses.next().await {
        match status {
            Ok(status) => {
                if let Some(clients) = status.clients {
                    info!(clients, "room occupancy");
                }
                if let Some(text) = status.text {
                    info!(caption = %text, "caption");
                }
            }
            Err(e) => warn!(error = %e, "status stream error"),
        }
    }

    Ok(())
}
