//! End-to-end tests for the PLC fan-out server

use crossbeam_channel::unbounded;
use sorter_link::net::PlcServer;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn wait_for_clients(server: &PlcServer, n: usize) {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while server.client_count() < n {
        assert!(Instant::now() < deadline, "clients never registered");
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn read_exactly(stream: &mut TcpStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream
        .set_read_timeout(Some(RECV_TIMEOUT))
        .expect("set timeout");
    stream.read_exact(&mut buf).expect("read");
    buf
}

#[test]
fn test_broadcast_reaches_every_client() {
    let mut server = PlcServer::new();
    server.start("127.0.0.1", 0).expect("start");
    let port = server.local_addr().unwrap().port();

    let mut a = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let mut b = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for_clients(&server, 2);

    server.send(&[0x01, 0x02]).expect("send");

    assert_eq!(read_exactly(&mut a, 2), vec![0x01, 0x02]);
    assert_eq!(read_exactly(&mut b, 2), vec![0x01, 0x02]);

    server.destroy();
}

#[test]
fn test_received_chunks_carry_client_key() {
    let mut server = PlcServer::new();
    let (tx, rx) = unbounded();
    server.set_on_data_received(move |key, bytes| {
        let _ = tx.send((key.to_string(), bytes.to_vec()));
    });
    server.start("127.0.0.1", 0).expect("start");
    let port = server.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for_clients(&server, 1);
    client.write_all(&[9, 8, 7]).unwrap();

    let (key, bytes) = rx.recv_timeout(RECV_TIMEOUT).expect("event");
    assert_eq!(key, client.local_addr().unwrap().to_string());
    assert_eq!(bytes, vec![9, 8, 7]);

    server.destroy();
}

#[test]
fn test_disconnected_client_is_reaped() {
    let mut server = PlcServer::new();
    server.start("127.0.0.1", 0).expect("start");
    let port = server.local_addr().unwrap().port();

    let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for_clients(&server, 1);
    drop(client);

    let deadline = Instant::now() + RECV_TIMEOUT;
    while server.client_count() > 0 {
        assert!(Instant::now() < deadline, "client never reaped");
        std::thread::sleep(Duration::from_millis(5));
    }

    // Broadcasting into an empty map is a no-op, not an error
    server.send(&[1]).expect("send");
    server.destroy();
}

#[test]
fn test_lifecycle_callbacks_fire_once() {
    let connected = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));

    let mut server = PlcServer::new();
    {
        let connected = Arc::clone(&connected);
        server.set_on_connected(move || {
            connected.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let closed = Arc::clone(&closed);
        server.set_on_closed(move || {
            closed.fetch_add(1, Ordering::SeqCst);
        });
    }

    server.start("127.0.0.1", 0).expect("start");
    assert_eq!(connected.load(Ordering::SeqCst), 1);

    server.destroy();
    server.destroy();
    assert_eq!(closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_destroy_closes_connected_clients() {
    let mut server = PlcServer::new();
    server.start("127.0.0.1", 0).expect("start");
    let port = server.local_addr().unwrap().port();

    let mut client = TcpStream::connect(("127.0.0.1", port)).unwrap();
    wait_for_clients(&server, 1);

    server.destroy();

    // The client's read must observe EOF once the server tears down
    client
        .set_read_timeout(Some(RECV_TIMEOUT))
        .expect("set timeout");
    let mut buf = [0u8; 1];
    let n = client.read(&mut buf).expect("read after destroy");
    assert_eq!(n, 0);
}
