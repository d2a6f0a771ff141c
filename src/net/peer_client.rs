//! Outbound TCP client for peer subsystems
//!
//! Dials a peer that speaks either the raw framing or the command
//! protocol; this side does not interpret the bytes. One background
//! receive loop per connection, synchronous sends from the caller's
//! thread. Sends are serialised by the socket mutex so bytes from two
//! concurrent `send` calls never interleave on the wire.

use crate::error::{Error, Result};
use crate::net::util::{connect_bound, lock, parse_ipv4};
use crate::net::{ErrorCallback, NotifyCallback};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddrV4, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// Received chunk from the peer
pub type PeerDataCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

const READ_CHUNK: usize = 4096;

struct Shared {
    connected: AtomicBool,
    stream: Mutex<Option<TcpStream>>,
    on_connected: Mutex<Option<NotifyCallback>>,
    on_data_received: Mutex<Option<PeerDataCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
    on_disconnected: Mutex<Option<NotifyCallback>>,
}

impl Shared {
    fn emit_error(&self, msg: &str) {
        if let Some(cb) = lock(&self.on_error).clone() {
            cb(msg);
        }
    }

    /// Tear the connection down; `on_disconnected` fires exactly once
    /// per successful connect, whichever side notices first.
    fn teardown(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(stream) = lock(&self.stream).take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if let Some(cb) = lock(&self.on_disconnected).clone() {
            cb();
        }
    }
}

/// Symmetric TCP client with a background receive loop
pub struct PeerClient {
    shared: Arc<Shared>,
    recv_thread: Option<JoinHandle<()>>,
}

impl PeerClient {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                connected: AtomicBool::new(false),
                stream: Mutex::new(None),
                on_connected: Mutex::new(None),
                on_data_received: Mutex::new(None),
                on_error: Mutex::new(None),
                on_disconnected: Mutex::new(None),
            }),
            recv_thread: None,
        }
    }

    pub fn set_on_connected(&self, cb: impl Fn() + Send + Sync + 'static) {
        *lock(&self.shared.on_connected) = Some(Arc::new(cb));
    }

    pub fn set_on_data_received(&self, cb: impl Fn(&[u8]) + Send + Sync + 'static) {
        *lock(&self.shared.on_data_received) = Some(Arc::new(cb));
    }

    pub fn set_on_error(&self, cb: impl Fn(&str) + Send + Sync + 'static) {
        *lock(&self.shared.on_error) = Some(Arc::new(cb));
    }

    pub fn set_on_disconnected(&self, cb: impl Fn() + Send + Sync + 'static) {
        *lock(&self.shared.on_disconnected) = Some(Arc::new(cb));
    }

    /// Connect to the peer, optionally binding the local interface
    ///
    /// Already-connected clients return Ok without reconnecting. The
    /// local port is always OS-chosen.
    pub fn connect(&mut self, remote_ip: &str, remote_port: u16, local_ip: Option<&str>) -> Result<()> {
        if self.shared.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        // A previous connection's reader has finished by now; reap it
        if let Some(handle) = self.recv_thread.take() {
            let _ = handle.join();
        }

        let remote_addr: std::net::Ipv4Addr = remote_ip.parse().map_err(|_| {
            self.shared.emit_error("Invalid remote IP");
            Error::InvalidAddr(remote_ip.to_string())
        })?;
        let remote = SocketAddrV4::new(remote_addr, remote_port);
        let local = match local_ip {
            Some(ip) => Some(parse_ipv4(ip)?),
            None => None,
        };

        let stream = match connect_bound(remote, local) {
            Ok(s) => s,
            Err(e) => {
                self.shared.emit_error(&e.to_string());
                return Err(e);
            }
        };
        let reader_stream = stream.try_clone().map_err(Error::SocketCreate)?;

        *lock(&self.shared.stream) = Some(stream);
        self.shared.connected.store(true, Ordering::SeqCst);
        log::info!("connected to peer {}", remote);

        if let Some(cb) = lock(&self.shared.on_connected).clone() {
            cb();
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("peer-client-recv".to_string())
            .spawn(move || receive_loop(&shared, reader_stream))?;
        self.recv_thread = Some(handle);

        Ok(())
    }

    /// Snapshot of the connection state
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Send all bytes to the peer
    ///
    /// Holds the socket mutex for the whole write, so concurrent callers
    /// are linearised. A failed write destroys the connection.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let write_result = {
            let guard = lock(&self.shared.stream);
            let Some(stream) = guard.as_ref() else {
                return Err(Error::ShortWrite);
            };
            (&*stream).write_all(data)
        };

        if let Err(e) = write_result {
            log::error!("peer send failed: {}", e);
            self.shared.emit_error("Failed to send data");
            self.shared.teardown();
            return Err(Error::ShortWrite);
        }

        Ok(())
    }

    /// Close the connection and join the receive loop
    ///
    /// Emits `on_disconnected` if the connection was still up.
    pub fn destroy(&mut self) {
        self.shared.teardown();
        if let Some(handle) = self.recv_thread.take() {
            let _ = handle.join();
        }
    }
}

impl Default for PeerClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PeerClient {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn receive_loop(shared: &Shared, mut stream: TcpStream) {
    let mut buf = [0u8; READ_CHUNK];

    while shared.connected.load(Ordering::Relaxed) {
        match stream.read(&mut buf) {
            Ok(0) => {
                shared.emit_error("Remote closed connection");
                break;
            }
            Ok(n) => {
                if let Some(cb) = lock(&shared.on_data_received).clone() {
                    cb(&buf[..n]);
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                if shared.connected.load(Ordering::Relaxed) {
                    log::debug!("peer receive error: {}", e);
                    shared.emit_error("Receive error");
                }
                break;
            }
        }
    }

    shared.teardown();
    log::debug!("peer receive loop exiting");
}
