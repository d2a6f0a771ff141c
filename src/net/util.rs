//! Shared socket plumbing for the endpoints
//!
//! The listen/connect helpers go through `libc` directly: the endpoints
//! need a configurable listen backlog, a local-address bind before
//! `connect`, and kernel buffer sizing, none of which `std::net` exposes.
//! Everything returned to callers is a regular `std` socket.

use crate::error::{Error, Result};
use std::io::{self, Read};
use std::mem;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener, TcpStream};
use std::os::fd::{FromRawFd, RawFd};
use std::time::Duration;

/// Parse an IPv4 address string; empty means any-interface
pub(crate) fn parse_ipv4(ip: &str) -> Result<Ipv4Addr> {
    if ip.is_empty() {
        return Ok(Ipv4Addr::UNSPECIFIED);
    }
    ip.parse()
        .map_err(|_| Error::InvalidAddr(ip.to_string()))
}

fn sockaddr_v4(ip: Ipv4Addr, port: u16) -> libc::sockaddr_in {
    libc::sockaddr_in {
        sin_family: libc::AF_INET as libc::sa_family_t,
        sin_port: port.to_be(),
        sin_addr: libc::in_addr {
            s_addr: u32::from_ne_bytes(ip.octets()),
        },
        sin_zero: [0; 8],
    }
}

fn set_sockopt_int(fd: RawFd, opt: libc::c_int, value: libc::c_int) -> io::Result<()> {
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            opt,
            &value as *const libc::c_int as *const libc::c_void,
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Create a listening TCP socket with an explicit backlog
///
/// `SO_REUSEADDR` is set before bind so a restarted endpoint can rebind
/// its port while old connections drain in TIME_WAIT.
pub(crate) fn listen_with_backlog(ip: Ipv4Addr, port: u16, backlog: i32) -> Result<TcpListener> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(Error::SocketCreate(io::Error::last_os_error()));
    }

    if let Err(e) = set_sockopt_int(fd, libc::SO_REUSEADDR, 1) {
        log::warn!("SO_REUSEADDR failed: {}", e);
    }

    let addr = sockaddr_v4(ip, port);
    let rc = unsafe {
        libc::bind(
            fd,
            &addr as *const libc::sockaddr_in as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        let e = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(Error::Bind(e));
    }

    if unsafe { libc::listen(fd, backlog) } < 0 {
        let e = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(Error::Listen(e));
    }

    Ok(unsafe { TcpListener::from_raw_fd(fd) })
}

/// Connect to a remote peer, optionally binding the local side first
///
/// The local port is always OS-chosen. `SO_KEEPALIVE` is enabled so a
/// silently vanished peer eventually surfaces as a receive error.
pub(crate) fn connect_bound(
    remote: SocketAddrV4,
    local_ip: Option<Ipv4Addr>,
) -> Result<TcpStream> {
    let fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    if fd < 0 {
        return Err(Error::SocketCreate(io::Error::last_os_error()));
    }

    if let Err(e) = set_sockopt_int(fd, libc::SO_KEEPALIVE, 1) {
        log::warn!("SO_KEEPALIVE failed: {}", e);
    }

    if let Some(ip) = local_ip {
        let addr = sockaddr_v4(ip, 0);
        let rc = unsafe {
            libc::bind(
                fd,
                &addr as *const libc::sockaddr_in as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            let e = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(Error::Bind(e));
        }
    }

    let addr = sockaddr_v4(*remote.ip(), remote.port());
    let rc = unsafe {
        libc::connect(
            fd,
            &addr as *const libc::sockaddr_in as *const libc::sockaddr,
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        let e = io::Error::last_os_error();
        unsafe { libc::close(fd) };
        return Err(Error::Connect(e));
    }

    Ok(unsafe { TcpStream::from_raw_fd(fd) })
}

/// Ask the kernel for a larger receive buffer; best effort
pub(crate) fn set_recv_buffer(fd: RawFd, bytes: i32) {
    if let Err(e) = set_sockopt_int(fd, libc::SO_RCVBUF, bytes) {
        log::warn!("SO_RCVBUF({}) failed: {}", bytes, e);
    }
}

/// Receive exactly `buf.len()` bytes or fail
///
/// Loops over partial reads; a peer close or error mid-frame surfaces as
/// [`Error::ShortRead`] so the caller aborts the frame. Never returns
/// with a partially filled buffer.
pub(crate) fn recv_exact(stream: &mut TcpStream, buf: &mut [u8]) -> Result<()> {
    match stream.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::ShortRead),
        Err(e) if e.kind() == io::ErrorKind::ConnectionReset => Err(Error::ShortRead),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Lock a mutex, recovering the data if a worker panicked while holding it
pub(crate) fn lock<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Map key for an accepted client, `"a.b.c.d:port"`
pub(crate) fn peer_key(addr: SocketAddr) -> String {
    addr.to_string()
}

/// Probe whether a TCP endpoint accepts connections within `timeout_ms`
///
/// Opens a throwaway connection and closes it immediately. Utility only;
/// never used on the data path.
pub fn can_connect(host: &str, port: u16, timeout_ms: u64) -> bool {
    let Ok(ip) = host.parse::<Ipv4Addr>() else {
        return false;
    };
    let addr = SocketAddr::from(SocketAddrV4::new(ip, port));
    TcpStream::connect_timeout(&addr, Duration::from_millis(timeout_ms)).is_ok()
}
