//! Command-protocol TCP server
//!
//! Accepts connections from the sorting-controller subsystems and parses
//! the command frame: sync word, 12-byte header, body sized by the
//! command length map (with a two-stage read for the variable-length
//! image commands). Each accepted socket carries exactly one frame and
//! is closed afterwards; the controller reconnects per command.
//!
//! Connections are processed in accept order on a single worker, so
//! frames never interleave. Framing failures close the offending client
//! and the accept loop keeps running.

use crate::error::{Error, Result};
use crate::net::util::{listen_with_backlog, lock, parse_ipv4, recv_exact};
use crate::net::ErrorCallback;
use crate::protocol::{CommandHead, HEADER_SIZE, SYNC_WORD};
use std::io::ErrorKind;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Upper bound on a single body read; spliced camera images are the
/// largest legitimate frames
const MAX_BODY_BYTES: i32 = 16 * 1024 * 1024;

/// Hook letting the host amend the mapped body length before the read
pub type SetDataLengthFn = Arc<dyn Fn(CommandHead) -> CommandHead + Send + Sync>;
/// Delivery of the framed payload (empty slice for bodiless commands)
pub type SetBufferFn = Arc<dyn Fn(&CommandHead, &[u8]) + Send + Sync>;
/// Notification that the header is final and the body read is starting
pub type SetCommandHeadFn = Arc<dyn Fn(&CommandHead) + Send + Sync>;

struct Shared {
    running: AtomicBool,
    /// Clone of the socket currently mid-frame, so destroy can unblock it
    active_client: Mutex<Option<TcpStream>>,
    on_error: Mutex<Option<ErrorCallback>>,
}

/// TCP server for the command-oriented controller protocol
pub struct CommandServer {
    shared: Arc<Shared>,
    accept_thread: Option<JoinHandle<()>>,
    local_addr: Option<std::net::SocketAddr>,
}

impl CommandServer {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                active_client: Mutex::new(None),
                on_error: Mutex::new(None),
            }),
            accept_thread: None,
            local_addr: None,
        }
    }

    /// Address the server is listening on, once started
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.local_addr
    }

    /// Install the framing-error callback; call before `start`
    pub fn set_on_error(&self, cb: impl Fn(&str) + Send + Sync + 'static) {
        *lock(&self.shared.on_error) = Some(Arc::new(cb));
    }

    /// Bind and start accepting command frames
    ///
    /// `dst_id` is this endpoint's subsystem id; frames addressed
    /// elsewhere are still delivered (the controller shares one wire for
    /// all subsystems) but logged. `run_once` stops the accept loop after
    /// the first frame. `max_pending` is the listen backlog.
    #[allow(clippy::too_many_arguments)]
    pub fn start(
        &mut self,
        ip: &str,
        port: u16,
        dst_id: i32,
        run_once: bool,
        set_data_length: SetDataLengthFn,
        set_buffer: SetBufferFn,
        set_receive_command_head: SetCommandHeadFn,
        max_pending: i32,
    ) -> Result<()> {
        if self.shared.running.load(Ordering::SeqCst) {
            self.destroy();
        }

        let bind_ip = parse_ipv4(ip)?;
        let listener = match listen_with_backlog(bind_ip, port, max_pending) {
            Ok(l) => l,
            Err(e) => {
                emit_error(&self.shared, &e.to_string());
                return Err(e);
            }
        };
        listener.set_nonblocking(true)?;
        self.local_addr = listener.local_addr().ok();

        self.shared.running.store(true, Ordering::SeqCst);
        log::info!("command server listening on {}:{}", bind_ip, port);

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("cmd-server-accept".to_string())
            .spawn(move || {
                accept_loop(
                    &shared,
                    listener,
                    dst_id,
                    run_once,
                    set_data_length,
                    set_buffer,
                    set_receive_command_head,
                );
            })?;
        self.accept_thread = Some(handle);

        Ok(())
    }

    /// Stop accepting, abort any in-flight frame and join the worker
    ///
    /// Idempotent; a second call is a no-op.
    pub fn destroy(&mut self) {
        if !self.shared.running.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(client) = lock(&self.shared.active_client).take() {
            let _ = client.shutdown(Shutdown::Both);
        }

        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }

        log::info!("command server stopped");
    }
}

impl Default for CommandServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CommandServer {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[allow(clippy::too_many_arguments)]
fn accept_loop(
    shared: &Shared,
    listener: TcpListener,
    dst_id: i32,
    run_once: bool,
    set_data_length: SetDataLengthFn,
    set_buffer: SetBufferFn,
    set_receive_command_head: SetCommandHeadFn,
) {
    while shared.running.load(Ordering::Relaxed) {
        let (mut stream, addr) = match listener.accept() {
            Ok(pair) => pair,
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(e) => {
                if shared.running.load(Ordering::Relaxed) {
                    log::error!("accept error: {}", e);
                }
                continue;
            }
        };

        log::debug!("client connected: {}", addr);
        if let Err(e) = stream.set_nonblocking(false) {
            log::warn!("failed to set blocking mode for {}: {}", addr, e);
        }

        // Publish a clone so destroy() can break a blocked frame read
        match stream.try_clone() {
            Ok(clone) => *lock(&shared.active_client) = Some(clone),
            Err(e) => log::warn!("failed to clone client socket: {}", e),
        }
        if !shared.running.load(Ordering::Relaxed) {
            break;
        }

        let result = serve_frame(
            &mut stream,
            dst_id,
            &set_data_length,
            &set_buffer,
            &set_receive_command_head,
        );
        lock(&shared.active_client).take();

        match result {
            Ok(()) => {}
            Err(Error::SyncMismatch { expected, got }) => {
                log::error!(
                    "sync error from {}: expected 0x{:08X}, got 0x{:08X}",
                    addr,
                    expected,
                    got
                );
                emit_error(shared, "Sync Error");
            }
            Err(Error::ShortRead) => {
                log::debug!("client {} closed mid-frame", addr);
            }
            Err(e) => {
                log::error!("frame error from {}: {}", addr, e);
                emit_error(shared, &e.to_string());
            }
        }

        // One frame per connection: close and go back to accept
        drop(stream);

        if run_once {
            break;
        }
    }

    log::debug!("accept loop exiting");
}

/// Parse a single command frame off an accepted socket
fn serve_frame(
    stream: &mut TcpStream,
    dst_id: i32,
    set_data_length: &SetDataLengthFn,
    set_buffer: &SetBufferFn,
    set_receive_command_head: &SetCommandHeadFn,
) -> Result<()> {
    let mut sync = [0u8; 4];
    recv_exact(stream, &mut sync)?;
    let word = u32::from_le_bytes(sync);
    if word != SYNC_WORD {
        return Err(Error::SyncMismatch {
            expected: SYNC_WORD,
            got: word,
        });
    }

    let mut header = [0u8; HEADER_SIZE];
    recv_exact(stream, &mut header)?;
    let src_id = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let dest_id = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    let cmd_id = i32::from_le_bytes([header[8], header[9], header[10], header[11]]);

    if dest_id != dst_id {
        log::debug!("frame for subsystem {} received by {}", dest_id, dst_id);
    }
    log::debug!("command 0x{:04X} from subsystem {}", cmd_id, src_id);

    // Length map first, then the host hook gets the final say
    let mut head = CommandHead::for_command(cmd_id, src_id);
    head = set_data_length(head);

    if head.read_data_pack {
        let mut prefix = [0u8; 4];
        recv_exact(stream, &mut prefix)?;
        head.length = i32::from_le_bytes(prefix);
    }

    if head.length > MAX_BODY_BYTES {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("body length {} exceeds limit", head.length),
        )));
    }

    set_receive_command_head(&head);

    if head.length > 0 {
        let mut body = vec![0u8; head.length as usize];
        recv_exact(stream, &mut body)?;
        set_buffer(&head, &body);
    } else {
        set_buffer(&head, &[]);
    }

    Ok(())
}

fn emit_error(shared: &Shared, msg: &str) {
    let cb = lock(&shared.on_error).clone();
    if let Some(cb) = cb {
        cb(msg);
    }
}
