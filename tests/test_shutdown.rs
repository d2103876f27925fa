// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// Whole-connection teardown (`Transport::kill`) and per-channel
// re-registration after an `Endpoint` is dropped.

use wiremux::socket::DuplexPipe;
use wiremux::{Config, Transport};

#[test]
fn kill_propagates_to_the_peers_receiver_pump() {
    let (sock_a, sock_b) = DuplexPipe::pair();
    let a = Transport::new(sock_a, Config::default());
    let b = Transport::new(sock_b, Config::default());

    assert!(a.is_alive());
    assert!(b.is_alive());

    a.kill();
    while b.is_alive() {
        std::thread::yield_now();
    }
    assert!(!b.is_alive());
}

#[test]
fn dropping_an_endpoint_frees_its_channel_for_reregistration() {
    let (sock_a, sock_b) = DuplexPipe::pair();
    let a = Transport::new(sock_a, Config::default());
    let _b = Transport::new(sock_b, Config::default());

    let ep = a.open_channel(4);
    drop(ep);

    // No double-registration panic: the slot was freed on drop.
    let ep2 = a.open_channel(4);
    ep2.send(b"still works");
}

#[test]
fn synchronize_end_on_both_sides_does_not_deadlock() {
    let (sock_a, sock_b) = DuplexPipe::pair();
    let a = Transport::new(sock_a, Config::default());
    let b = Transport::new(sock_b, Config::default());

    let ep_a = a.open_channel(1);
    let ep_b = b.open_channel(1);

    let t = std::thread::spawn(move || ep_a.synchronize_end());
    ep_b.synchronize_end();
    t.join().unwrap();
}
