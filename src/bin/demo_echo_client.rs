// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// Connects to a demo_echo_server, sends each line read from stdin on
// channel 1, prints back whatever comes echoed, and signals end when
// stdin closes.
//
// Usage: demo_echo_client [addr]   (default 127.0.0.1:7070)

use std::io::{self, BufRead};

use wiremux::socket::TcpSocket;
use wiremux::{connect_with_retry, Config, Transport};

const CHANNEL: u8 = 1;

fn main() {
    env_logger::init();

    let addr = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:7070".into());
    let (stream, peer) = connect_with_retry(addr.clone(), 2, 0).expect("connect");
    println!("connected to {addr}, peer reports id={} index={}", peer.peer_id, peer.connection_index);

    let socket = TcpSocket::new(stream).expect("wrap socket");
    let transport = Transport::new(socket, Config::default());
    let endpoint = transport.open_channel(CHANNEL);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        endpoint.send(line.as_bytes());
        let echoed = endpoint.blocking_receive();
        println!("< {}", String::from_utf8_lossy(&echoed));
    }

    endpoint.synchronize_end();
    println!("demo_echo_client done");
}
