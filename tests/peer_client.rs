//! End-to-end tests for the outbound peer client

use crossbeam_channel::unbounded;
use sorter_link::net::PeerClient;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

fn wait_until(deadline_msg: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + RECV_TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "timed out: {deadline_msg}");
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_connect_send_receive() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let connected = Arc::new(AtomicUsize::new(0));
    let (data_tx, data_rx) = unbounded();

    let mut client = PeerClient::new();
    {
        let connected = Arc::clone(&connected);
        client.set_on_connected(move || {
            connected.fetch_add(1, Ordering::SeqCst);
        });
    }
    client.set_on_data_received(move |bytes| {
        let _ = data_tx.send(bytes.to_vec());
    });

    client.connect("127.0.0.1", port, None).expect("connect");
    assert!(client.is_connected());
    assert_eq!(connected.load(Ordering::SeqCst), 1);

    let (mut server_side, _) = listener.accept().unwrap();

    // Client -> server
    client.send(&[1, 2, 3]).expect("send");
    let mut buf = [0u8; 3];
    server_side
        .set_read_timeout(Some(RECV_TIMEOUT))
        .expect("set timeout");
    server_side.read_exact(&mut buf).unwrap();
    assert_eq!(buf, [1, 2, 3]);

    // Server -> client
    server_side.write_all(&[4, 5]).unwrap();
    let bytes = data_rx.recv_timeout(RECV_TIMEOUT).expect("data");
    assert_eq!(bytes, vec![4, 5]);

    client.destroy();
}

#[test]
fn test_local_bind_is_honoured() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = PeerClient::new();
    client
        .connect("127.0.0.1", port, Some("127.0.0.1"))
        .expect("connect");

    let (_server_side, peer) = listener.accept().unwrap();
    assert_eq!(peer.ip().to_string(), "127.0.0.1");

    client.destroy();
}

#[test]
fn test_peer_close_then_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let connected = Arc::new(AtomicUsize::new(0));
    let disconnected = Arc::new(AtomicUsize::new(0));

    let mut client = PeerClient::new();
    {
        let connected = Arc::clone(&connected);
        client.set_on_connected(move || {
            connected.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let disconnected = Arc::clone(&disconnected);
        client.set_on_disconnected(move || {
            disconnected.fetch_add(1, Ordering::SeqCst);
        });
    }

    client.connect("127.0.0.1", port, None).expect("connect");
    let (server_side, _) = listener.accept().unwrap();

    // Peer closes; on_disconnected must fire exactly once
    drop(server_side);
    wait_until("client noticed close", || !client.is_connected());
    wait_until("disconnect callback", || {
        disconnected.load(Ordering::SeqCst) == 1
    });

    // Destroy after the fact must not emit a second disconnect
    client.destroy();
    assert_eq!(disconnected.load(Ordering::SeqCst), 1);

    // Second connect works and fires on_connected again
    client.connect("127.0.0.1", port, None).expect("reconnect");
    let (_server_side2, _) = listener.accept().unwrap();
    assert!(client.is_connected());
    assert_eq!(connected.load(Ordering::SeqCst), 2);

    client.destroy();
    assert_eq!(disconnected.load(Ordering::SeqCst), 2);
}

#[test]
fn test_send_after_destroy_fails() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = PeerClient::new();
    client.connect("127.0.0.1", port, None).expect("connect");
    let _accepted = listener.accept().unwrap();

    client.destroy();
    assert!(!client.is_connected());
    assert!(client.send(&[1]).is_err());
}

#[test]
fn test_connect_refused_surfaces_error() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let errors = Arc::new(AtomicUsize::new(0));
    let mut client = PeerClient::new();
    {
        let errors = Arc::clone(&errors);
        client.set_on_error(move |_msg| {
            errors.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(client.connect("127.0.0.1", port, None).is_err());
    assert!(!client.is_connected());
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_sends_do_not_interleave() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let mut client = PeerClient::new();
    client.connect("127.0.0.1", port, None).expect("connect");
    let (mut server_side, _) = listener.accept().unwrap();

    // Two writers, each sending a run of its own byte
    const RUN: usize = 1024;
    const ROUNDS: usize = 50;
    let client = Arc::new(client);
    let handles: Vec<_> = [0x11u8, 0x22u8]
        .into_iter()
        .map(|byte| {
            let client = Arc::clone(&client);
            std::thread::spawn(move || {
                let chunk = vec![byte; RUN];
                for _ in 0..ROUNDS {
                    client.send(&chunk).expect("send");
                }
            })
        })
        .collect();

    let mut received = vec![0u8; RUN * ROUNDS * 2];
    server_side
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set timeout");
    server_side.read_exact(&mut received).unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every RUN-sized block must be uniform: no interleaving mid-chunk
    for (i, block) in received.chunks(RUN).enumerate() {
        let first = block[0];
        assert!(
            block.iter().all(|&b| b == first),
            "block {} mixed bytes from two senders",
            i
        );
    }
}
