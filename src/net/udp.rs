//! UDP endpoint: datagram sender plus bound receive loop
//!
//! The receiver is a raw tap: datagrams are delivered to the host
//! callback as-is, one callback per datagram, capped at a single MTU.
//! No header parsing happens on this channel, so the `src_id`/`cmd_id`
//! slots of the callback are always zero. The sender is a separate
//! unconnected socket; the caller provides the exact datagram.

use crate::error::{Error, Result};
use crate::net::util::{lock, parse_ipv4, set_recv_buffer};
use std::io::ErrorKind;
use std::net::{SocketAddrV4, UdpSocket};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Datagram delivery: `(src_id, cmd_id, bytes)`; the ids are placeholders
/// and always zero, kept for a future UDP framing pass.
pub type DatagramCallback = Arc<dyn Fn(i32, i32, &[u8]) + Send + Sync>;

/// Largest accepted datagram: one MTU worth of payload
pub const MAX_DATAGRAM: usize = 1472;
/// Kernel receive buffer sizing for bursty telemetry
const RECV_BUFFER_BYTES: i32 = 5_000_000;
/// How often the receive loop rechecks the running flag
const RECV_POLL: Duration = Duration::from_millis(500);

/// Stateless datagram sender + bound receiver
pub struct UdpEndpoint {
    send_socket: Mutex<UdpSocket>,
    running: Arc<AtomicBool>,
    recv_thread: Option<JoinHandle<()>>,
    recv_addr: Option<std::net::SocketAddr>,
}

impl UdpEndpoint {
    /// Create the endpoint with its unconnected send socket
    pub fn new() -> Result<Self> {
        let send_socket = UdpSocket::bind("0.0.0.0:0").map_err(Error::SocketCreate)?;
        Ok(Self {
            send_socket: Mutex::new(send_socket),
            running: Arc::new(AtomicBool::new(false)),
            recv_thread: None,
            recv_addr: None,
        })
    }

    /// Address the receive side is bound to, once started
    pub fn recv_addr(&self) -> Option<std::net::SocketAddr> {
        self.recv_addr
    }

    /// Send one datagram to `ip:port`; returns bytes sent
    pub fn send_to(&self, data: &[u8], ip: &str, port: u16) -> Result<usize> {
        let addr = SocketAddrV4::new(
            ip.parse().map_err(|_| Error::InvalidAddr(ip.to_string()))?,
            port,
        );
        let n = lock(&self.send_socket).send_to(data, addr)?;
        Ok(n)
    }

    /// Bind the receive side and start delivering datagrams
    pub fn start(
        &mut self,
        bind_ip: &str,
        port: u16,
        on_datagram: DatagramCallback,
    ) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            self.stop();
        }

        let ip = parse_ipv4(bind_ip)?;
        let socket = UdpSocket::bind(SocketAddrV4::new(ip, port)).map_err(Error::Bind)?;
        set_recv_buffer(socket.as_raw_fd(), RECV_BUFFER_BYTES);
        socket.set_read_timeout(Some(RECV_POLL))?;
        self.recv_addr = socket.local_addr().ok();

        self.running.store(true, Ordering::SeqCst);
        log::info!("UDP receiver bound to {}:{}", ip, port);

        let running = Arc::clone(&self.running);
        let handle = thread::Builder::new()
            .name("udp-recv".to_string())
            .spawn(move || {
                let mut buf = [0u8; MAX_DATAGRAM];
                while running.load(Ordering::Relaxed) {
                    match socket.recv_from(&mut buf) {
                        Ok((n, _peer)) => {
                            // No framing on this channel; raw tap
                            on_datagram(0, 0, &buf[..n]);
                        }
                        Err(ref e)
                            if e.kind() == ErrorKind::WouldBlock
                                || e.kind() == ErrorKind::TimedOut =>
                        {
                            // Timeout: just recheck the running flag
                        }
                        Err(e) => {
                            if running.load(Ordering::Relaxed) {
                                log::error!("UDP receive error: {}", e);
                                thread::sleep(Duration::from_millis(10));
                            }
                        }
                    }
                }
                log::debug!("UDP receive loop exiting");
            })?;
        self.recv_thread = Some(handle);

        Ok(())
    }

    /// Stop the receive loop and join it; the sender stays usable
    pub fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.recv_thread.take() {
            let _ = handle.join();
        }
        log::info!("UDP receiver stopped");
    }
}

impl Drop for UdpEndpoint {
    fn drop(&mut self) {
        self.stop();
    }
}
