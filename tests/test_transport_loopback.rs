// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The six end-to-end scenarios: Echo, Splice, Multiplex, Id/len round trip,
// Graceful close, Deferred fin. Each runs once over an in-memory
// `DuplexPipe` pair and once over a real loopback `TcpStream` pair, since
// the transport's logic must not depend on which `StreamSocket` backs it.

use std::net::{TcpListener, TcpStream};
use std::thread;

use wiremux::socket::{DuplexPipe, TcpSocket};
use wiremux::{Config, Endpoint, Transport};

fn tcp_pair() -> (TcpSocket, TcpSocket) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || listener.accept().unwrap().0);
    let client = TcpStream::connect(addr).unwrap();
    let server = server.join().unwrap();
    (TcpSocket::new(server).unwrap(), TcpSocket::new(client).unwrap())
}

fn run_scenario<F: Fn(Endpoint, Endpoint)>(scenario: F) {
    let (sock_a, sock_b) = DuplexPipe::pair();
    let a = Transport::new(sock_a, Config::default());
    let b = Transport::new(sock_b, Config::default());
    scenario(a.open_channel(1), b.open_channel(1));

    let (sock_a, sock_b) = tcp_pair();
    let a = Transport::new(sock_a, Config::default());
    let b = Transport::new(sock_b, Config::default());
    scenario(a.open_channel(1), b.open_channel(1));
}

#[test]
fn echo_scenario() {
    run_scenario(|ep_a, ep_b| {
        ep_a.send(b"ping");
        let got = ep_b.blocking_receive();
        assert_eq!(got, b"ping");
        ep_b.send(&got);
        assert_eq!(ep_a.blocking_receive(), b"ping");
    });
}

#[test]
fn splice_scenario() {
    run_scenario(|ep_a, ep_b| {
        ep_a.send(&[1, 2, 3]);
        ep_a.send(&[4]);
        ep_a.send(&[5, 6]);

        let mut buf = [0u8; 6];
        ep_b.blocking_receive_into(&mut buf);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6]);
    });
}

#[test]
fn multiplex_scenario_keeps_channels_independent() {
    let (sock_a, sock_b) = DuplexPipe::pair();
    let a = Transport::new(sock_a, Config::default());
    let b = Transport::new(sock_b, Config::default());

    let a1 = a.open_channel(1);
    let a2 = a.open_channel(2);
    let b1 = b.open_channel(1);
    let b2 = b.open_channel(2);

    a2.send(b"second");
    a1.send(b"first");

    // Each channel's queue is independent of arrival order on the wire.
    assert_eq!(b1.blocking_receive(), b"first");
    assert_eq!(b2.blocking_receive(), b"second");
}

#[test]
fn id_len_round_trip_scenario() {
    run_scenario(|ep_a, ep_b| {
        ep_a.send_id_len(b"payload", 42, 7);
        let (id, len, data) = ep_b.blocking_receive_id_len();
        assert_eq!(id, 42);
        assert_eq!(len, 7);
        assert_eq!(data, b"payload");
    });
}

#[test]
fn graceful_close_scenario() {
    run_scenario(|ep_a, ep_b| {
        let t = thread::spawn(move || {
            ep_a.synchronize_end();
        });
        ep_b.synchronize_end();
        t.join().unwrap();
    });
}

#[test]
fn deferred_fin_scenario() {
    let (sock_a, sock_b) = DuplexPipe::pair();
    let a = Transport::new(sock_a, Config::default());
    let b = Transport::new(sock_b, Config::default());

    let ep_a = a.open_channel(9);
    ep_a.signal_end();

    // Give the frame time to arrive and be recorded as a deferred fin
    // before channel 9 is registered on B's side at all.
    thread::sleep(std::time::Duration::from_millis(30));

    let ep_b = b.open_channel(9);
    ep_b.wait_for_fin();
    assert!(!ep_b.is_alive());
}
