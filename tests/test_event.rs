// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// `Event` exercised from outside the crate, across real threads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use wiremux::{Event, Reset};

#[test]
fn manual_reset_lets_a_late_waiter_through() {
    let ev = Event::new(Reset::Manual);
    ev.set();
    // A waiter arriving after `set()` must still return immediately.
    ev.wait();
    assert!(ev.is_set());
}

#[test]
fn auto_reset_serialises_a_producer_consumer_pair() {
    let ev = Arc::new(Event::new(Reset::Auto));
    let consumed = Arc::new(AtomicUsize::new(0));

    let consumer = {
        let ev = Arc::clone(&ev);
        let consumed = Arc::clone(&consumed);
        thread::spawn(move || {
            for _ in 0..5 {
                ev.wait();
                consumed.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    for _ in 0..5 {
        thread::sleep(Duration::from_millis(5));
        ev.set();
    }
    consumer.join().unwrap();
    assert_eq!(consumed.load(Ordering::SeqCst), 5);
}
