//! sorter-link - networking core of the fruit-sorter HMI
//!
//! This library implements the HMI's native communication layer:
//!
//! - [`CommandServer`]: the command-oriented TCP protocol spoken by the
//!   sorting controller's subsystems (sync word, 12-byte header, body
//!   length resolved per command id)
//! - [`PlcServer`]: raw TCP fan-out server for the PLC channel
//! - [`PeerClient`]: outbound TCP connection to a peer subsystem
//! - [`UdpEndpoint`]: datagram send plus a bound receive tap
//! - [`protocol`]: the command tables and packed payload records shared
//!   by all of the above
//!
//! Endpoints are explicitly owned objects: construct, install callbacks,
//! `start`, and later `destroy`/`stop`. Callbacks run on the endpoints'
//! worker threads; the host synchronises its own state.

pub mod config;
pub mod error;
pub mod net;
pub mod protocol;

pub use config::NetConfig;
pub use error::{Error, Result};
pub use net::{can_connect, CommandServer, PeerClient, PlcServer, UdpEndpoint};
pub use protocol::{body_size_for, CommandHead, SYNC_WORD};
