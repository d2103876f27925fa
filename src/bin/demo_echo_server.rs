// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// Accepts one connection, performs the handshake, then echoes every block
// it receives on channel 1 back to the sender until the peer signals fin.
//
// Usage: demo_echo_server [addr]   (default 127.0.0.1:7070)

use std::net::TcpListener;

use wiremux::socket::TcpSocket;
use wiremux::{accept_with_handshake, Config, Transport};

const CHANNEL: u8 = 1;

fn main() {
    env_logger::init();

    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:7070".into());
    let listener = TcpListener::bind(&addr).expect("bind");
    println!("demo_echo_server listening on {addr}");

    let (mut stream, peer_addr) = listener.accept().expect("accept");
    println!("accepted connection from {peer_addr}");

    let peer = accept_with_handshake(&mut stream, 1, 0).expect("handshake");
    println!("peer reports id={} index={}", peer.peer_id, peer.connection_index);

    let socket = TcpSocket::new(stream).expect("wrap socket");
    let transport = Transport::new(socket, Config::default());
    let endpoint = transport.open_channel(CHANNEL);

    // `blocking_receive` only wakes on new data, never on fin alone, so we
    // poll `is_alive()` between receives to notice the client signalling
    // end-of-stream with nothing left queued.
    while endpoint.is_alive() {
        if !endpoint.data_available() {
            std::thread::sleep(std::time::Duration::from_millis(5));
            continue;
        }
        let block = endpoint.blocking_receive();
        println!("echoing {} bytes", block.len());
        endpoint.send(&block);
    }

    endpoint.synchronize_end();
    println!("demo_echo_server done");
}
