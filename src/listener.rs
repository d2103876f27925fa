// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// Per-channel listener bookkeeping inside the receiver pump. Two lock
// granularities are deliberately kept apart here: `in_use` / the events /
// `pending_fin_forward` are mutated only under the shared `Lock` (owned by
// the receiver pump, passed in at each call site), while the FIFO queue of
// received blocks is guarded by its own per-channel `queue_mutex` so a slow
// consumer on one channel never blocks registration or admin bookkeeping
// on another.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::event::Event;

/// A received frame's payload, held in a per-channel queue until consumed.
pub type ReceivedBlock = Vec<u8>;

/// Per-channel state. One of these exists for every channel id in
/// `[0, MAX_CHANNELS)`, including the (never-registered) admin channel.
pub struct ListenerEntry {
    pub queue: Mutex<VecDeque<ReceivedBlock>>,
    /// Set (non-blocking wake) whenever a block is pushed; `None` until a
    /// listener registers.
    pub data_event: Mutex<Option<Arc<Event>>>,
    /// Set at most once, when peer end-of-stream is observed for this
    /// channel; `None` until a listener registers.
    pub fin_event: Mutex<Option<Arc<Event>>>,
    /// True between `register` and either `unregister` or fin.
    pub in_use: Mutex<bool>,
    /// True when `unregister`/peer-fin happened before a listener
    /// registered — the next registration must immediately observe fin.
    pub pending_fin_forward: Mutex<bool>,
}

impl ListenerEntry {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            data_event: Mutex::new(None),
            fin_event: Mutex::new(None),
            in_use: Mutex::new(false),
            pending_fin_forward: Mutex::new(false),
        }
    }
}

/// Fixed-size table of listener entries, one per channel id.
pub struct ListenerTable {
    entries: Vec<ListenerEntry>,
}

impl ListenerTable {
    pub fn new(max_channels: usize) -> Self {
        let mut entries = Vec::with_capacity(max_channels);
        entries.resize_with(max_channels, ListenerEntry::new);
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, channel_id: u8) -> &ListenerEntry {
        &self.entries[channel_id as usize]
    }
}
