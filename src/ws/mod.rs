//! Room connection infrastructure.
//!
//! - [`ConnectionManager`]: synchronous state machine that owns one logical
//!   connection and keeps it alive across failures with a flat retry window
//! - [`Transport`]/[`Connector`](traits::Connector): the seam between the
//!   state machine and whatever actually moves bytes
//! - `socket`: the tokio-tungstenite binding used by [`crate::Client`]

pub mod config;
pub mod connection;
pub mod error;
pub(crate) mod socket;
pub mod traits;

pub use connection::{ConnectionManager, ConnectionState};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use traits::*;
