//! Error types for sorter-link
//!
//! All I/O failures are surfaced as values; nothing in the library panics
//! the process. Endpoint construction (`start`/`connect`) returns the
//! error to the caller; everything after that is reported through the
//! endpoint's `on_error` callback and recovered locally (the offending
//! client is closed, the accept loop keeps running).

use thiserror::Error;

/// Errors that can occur in sorter-link
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to create socket: {0}")]
    SocketCreate(std::io::Error),

    #[error("bind failed: {0}")]
    Bind(std::io::Error),

    #[error("listen failed: {0}")]
    Listen(std::io::Error),

    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    #[error("invalid address: {0}")]
    InvalidAddr(String),

    #[error("sync word mismatch: expected 0x{expected:08X}, got 0x{got:08X}")]
    SyncMismatch { expected: u32, got: u32 },

    #[error("peer closed mid-frame")]
    ShortRead,

    #[error("send made no progress")]
    ShortWrite,

    #[error("record size mismatch: expected {expected} bytes, got {got}")]
    RecordSize { expected: usize, got: usize },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
