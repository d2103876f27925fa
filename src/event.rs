// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// In-process condition with manual-reset and auto-reset modes, used to wake
// a single application thread blocked on per-channel data or fin readiness.
// Unlike the named, cross-process waiter this transport's predecessor used,
// an `Event` here only ever has one writer side and one reader side within
// the same process, so it is built directly on `std::sync::{Mutex, Condvar}`
// rather than a named OS primitive.

use std::sync::{Condvar, Mutex};

/// Whether an `Event`, once set, stays set until explicitly reset, or is
/// automatically consumed by the next `wait()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reset {
    /// `Set` is sticky; `Wait` returns immediately while set, and `Reset`
    /// must be called explicitly to clear it. Multiple waiters are safe.
    Manual,
    /// `Wait` atomically consumes the set state; exactly one waiter per
    /// `Set` is woken.
    Auto,
}

/// A condition variable with two modes, matching the `data_event` /
/// `fin_event` pair used by channel endpoints: `fin_event` is manual-reset
/// (set at most once, many readers may observe it), `data_event` is
/// auto-reset (one wakeup should correspond to one reason to re-check the
/// queue, though re-checking the queue itself is always safe regardless).
pub struct Event {
    mode: Reset,
    mutex: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    /// Create a new, initially-unset event of the given reset mode.
    pub fn new(mode: Reset) -> Self {
        Self {
            mode,
            mutex: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Set the event, waking waiters. Idempotent while already set.
    pub fn set(&self) {
        let mut set = self.mutex.lock().unwrap();
        if *set {
            return;
        }
        *set = true;
        match self.mode {
            Reset::Manual => self.cond.notify_all(),
            Reset::Auto => self.cond.notify_one(),
        }
    }

    /// Block until the event is set. On an auto-reset event this also
    /// clears the set state before returning, waking at most one waiter
    /// per `set()` call; on a manual-reset event the state is left set.
    pub fn wait(&self) {
        let mut set = self.mutex.lock().unwrap();
        while !*set {
            set = self.cond.wait(set).unwrap();
        }
        if self.mode == Reset::Auto {
            *set = false;
        }
    }

    /// Snapshot whether the event is currently set, without consuming it.
    pub fn is_set(&self) -> bool {
        *self.mutex.lock().unwrap()
    }

    /// Explicitly clear the set state. Meaningful for manual-reset events;
    /// on an auto-reset event this simply forces the next `wait()` to block.
    pub fn reset(&self) {
        *self.mutex.lock().unwrap() = false;
    }
}
