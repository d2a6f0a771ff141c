//! Endpoint implementations: command server, PLC fan-out, peer client, UDP
//!
//! Every endpoint owns its sockets and background workers. Callbacks are
//! shared function objects installed before `start`/`connect`; they run
//! on the worker threads and must be safe to call concurrently. `destroy`
//! (or `stop`) flips the running flag, unblocks the workers through the
//! sockets and joins them before returning.

pub mod command_server;
pub mod peer_client;
pub mod plc_server;
pub mod udp;
mod util;

pub use command_server::{CommandServer, SetBufferFn, SetCommandHeadFn, SetDataLengthFn};
pub use peer_client::{PeerClient, PeerDataCallback};
pub use plc_server::{PlcDataCallback, PlcServer};
pub use udp::{DatagramCallback, UdpEndpoint, MAX_DATAGRAM};
pub use util::can_connect;

use std::sync::Arc;

/// Zero-argument lifecycle notification (`on_connected`, `on_closed`, …)
pub type NotifyCallback = Arc<dyn Fn() + Send + Sync>;
/// Error report with a human-readable message
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;
