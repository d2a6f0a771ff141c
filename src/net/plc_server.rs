//! Raw TCP fan-out server for the PLC channel
//!
//! The PLC side speaks an opaque byte stream: receive chunks are handed
//! to the host exactly as the socket produced them, and `send` writes the
//! same bytes to every connected client. The channel is low-rate, so the
//! broadcast simply holds the client map for the whole fan-out.

use crate::error::Result;
use crate::net::util::{listen_with_backlog, lock, parse_ipv4, peer_key};
use crate::net::{ErrorCallback, NotifyCallback};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Received chunk from one client: `(client_key, bytes)`
pub type PlcDataCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

/// Read chunk size for the per-client receive loop
const READ_CHUNK: usize = 4096;
/// Listen backlog for the PLC side
const LISTEN_BACKLOG: i32 = 100;

struct Shared {
    running: AtomicBool,
    clients: Mutex<HashMap<String, TcpStream>>,
    reader_threads: Mutex<Vec<JoinHandle<()>>>,
    on_connected: Mutex<Option<NotifyCallback>>,
    on_data_received: Mutex<Option<PlcDataCallback>>,
    on_error: Mutex<Option<ErrorCallback>>,
    on_closed: Mutex<Option<NotifyCallback>>,
}

/// Fan-out TCP server: many clients, one broadcast `send`
pub struct PlcServer {
    shared: Arc<Shared>,
    accept_thread: Option<JoinHandle<()>>,
    local_addr: Option<std::net::SocketAddr>,
}

impl PlcServer {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                clients: Mutex::new(HashMap::new()),
                reader_threads: Mutex::new(Vec::new()),
                on_connected: Mutex::new(None),
                on_data_received: Mutex::new(None),
                on_error: Mutex::new(None),
                on_closed: Mutex::new(None),
            }),
            accept_thread: None,
            local_addr: None,
        }
    }

    /// Address the server is listening on, once started
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.local_addr
    }

    pub fn set_on_connected(&self, cb: impl Fn() + Send + Sync + 'static) {
        *lock(&self.shared.on_connected) = Some(Arc::new(cb));
    }

    pub fn set_on_data_received(&self, cb: impl Fn(&str, &[u8]) + Send + Sync + 'static) {
        *lock(&self.shared.on_data_received) = Some(Arc::new(cb));
    }

    pub fn set_on_error(&self, cb: impl Fn(&str) + Send + Sync + 'static) {
        *lock(&self.shared.on_error) = Some(Arc::new(cb));
    }

    pub fn set_on_closed(&self, cb: impl Fn() + Send + Sync + 'static) {
        *lock(&self.shared.on_closed) = Some(Arc::new(cb));
    }

    /// Bind, listen and start accepting PLC clients
    pub fn start(&mut self, ip: &str, port: u16) -> Result<()> {
        if self.shared.running.load(Ordering::SeqCst) {
            self.destroy();
        }

        let bind_ip = parse_ipv4(ip).inspect_err(|e| self.emit_error(&e.to_string()))?;
        let listener = match listen_with_backlog(bind_ip, port, LISTEN_BACKLOG) {
            Ok(l) => l,
            Err(e) => {
                self.emit_error(&e.to_string());
                return Err(e);
            }
        };
        listener.set_nonblocking(true)?;
        self.local_addr = listener.local_addr().ok();

        self.shared.running.store(true, Ordering::SeqCst);
        log::info!("PLC server listening on {}:{}", bind_ip, port);

        if let Some(cb) = lock(&self.shared.on_connected).clone() {
            cb();
        }

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("plc-server-accept".to_string())
            .spawn(move || {
                while shared.running.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((stream, addr)) => {
                            if let Err(e) = stream.set_nonblocking(false) {
                                log::warn!("failed to set blocking mode for {}: {}", addr, e);
                                continue;
                            }
                            let key = peer_key(addr);
                            log::info!("PLC client connected: {}", key);

                            let reader_stream = match stream.try_clone() {
                                Ok(s) => s,
                                Err(e) => {
                                    log::error!("failed to clone client socket: {}", e);
                                    continue;
                                }
                            };
                            lock(&shared.clients).insert(key.clone(), stream);

                            let reader_shared = Arc::clone(&shared);
                            let spawned = thread::Builder::new()
                                .name(format!("plc-client-{}", key))
                                .spawn(move || {
                                    client_loop(&reader_shared, reader_stream, &key);
                                });
                            match spawned {
                                Ok(h) => lock(&shared.reader_threads).push(h),
                                Err(e) => log::error!("failed to spawn client thread: {}", e),
                            }
                        }
                        Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                            thread::sleep(Duration::from_millis(10));
                        }
                        Err(e) => {
                            if shared.running.load(Ordering::Relaxed) {
                                log::error!("PLC accept error: {}", e);
                            }
                        }
                    }
                }
                log::debug!("PLC accept loop exiting");
            })?;
        self.accept_thread = Some(handle);

        Ok(())
    }

    /// Broadcast bytes to every connected client
    ///
    /// A failed write to one client is logged and does not abort the
    /// others; the dead client is reaped by its receive loop.
    pub fn send(&self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let clients = lock(&self.shared.clients);
        for (key, stream) in clients.iter() {
            if let Err(e) = (&*stream).write_all(data) {
                log::warn!("PLC send to {} failed: {}", key, e);
            }
        }
        Ok(())
    }

    /// Number of currently connected clients
    pub fn client_count(&self) -> usize {
        lock(&self.shared.clients).len()
    }

    /// Stop accepting, close every client and join all workers
    ///
    /// Idempotent; `on_closed` fires once per successful `start`.
    pub fn destroy(&mut self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }

        // Stop the accept loop first so the client map cannot grow while
        // it is being torn down
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }

        {
            let mut clients = lock(&self.shared.clients);
            for (key, stream) in clients.iter() {
                log::debug!("closing PLC client {}", key);
                let _ = stream.shutdown(Shutdown::Both);
            }
            clients.clear();
        }

        for handle in lock(&self.shared.reader_threads).drain(..) {
            let _ = handle.join();
        }

        log::info!("PLC server stopped");
        if let Some(cb) = lock(&self.shared.on_closed).clone() {
            cb();
        }
    }

    fn emit_error(&self, msg: &str) {
        if let Some(cb) = lock(&self.shared.on_error).clone() {
            cb(msg);
        }
    }
}

impl Default for PlcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PlcServer {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Per-client receive loop: every successful read is one delivery
fn client_loop(shared: &Shared, mut stream: TcpStream, key: &str) {
    let mut buf = [0u8; READ_CHUNK];

    while shared.running.load(Ordering::Relaxed) {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if let Some(cb) = lock(&shared.on_data_received).clone() {
                    cb(key, &buf[..n]);
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("PLC client {} read error: {}", key, e);
                break;
            }
        }
    }

    // Reap the map entry; closing the socket happens on drop
    if let Some(stream) = lock(&shared.clients).remove(key) {
        let _ = stream.shutdown(Shutdown::Both);
    }
    log::info!("PLC client disconnected: {}", key);
}
