// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The receiver pump: one dedicated thread that owns the read side of the
// socket, demultiplexes frames by channel id, and delivers payloads into
// per-channel FIFOs. Port of `rcvthread`'s design, generalised from a
// shared-memory listener table push to a length-prefixed stream read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::TransportError;
use crate::event::{Event, Reset};
use crate::frame::{ChannelId, FrameHeader, ADMIN_CHANNEL, HEADER_LEN, MAX_CHANNELS};
use crate::lock::Lock;
use crate::socket::StreamSocket;

use crate::listener::ListenerTable;

/// Producer-facing handle to the receiver pump's listener table.
/// Cheap to clone; every clone refers to the same table and the same
/// background thread.
#[derive(Clone)]
pub struct ReceiverHandle {
    inner: Arc<ReceiverInner>,
}

struct ReceiverInner {
    listeners: ListenerTable,
    lock: Lock,
    max_frame_len: u64,
    alive: AtomicBool,
    last_error: Mutex<Option<TransportError>>,
}

/// Owns the receiver pump's background thread. Dropping this joins the
/// thread and flushes every per-channel queue, matching `rcvthread`'s
/// destructor behaviour.
pub struct ReceiverPump {
    handle: ReceiverHandle,
    join: Option<JoinHandle<()>>,
}

impl ReceiverPump {
    /// Spawn the receiver pump thread, reading frames from `socket`.
    /// `lock` must be the same `Lock` instance given to the matching
    /// `SenderPump` — channel endpoints assert this at construction.
    pub fn spawn(socket: Arc<dyn StreamSocket>, lock: Lock, max_frame_len: u64) -> Self {
        let inner = Arc::new(ReceiverInner {
            listeners: ListenerTable::new(MAX_CHANNELS),
            lock,
            max_frame_len,
            alive: AtomicBool::new(true),
            last_error: Mutex::new(None),
        });
        let handle = ReceiverHandle {
            inner: Arc::clone(&inner),
        };

        let thread_inner = Arc::clone(&inner);
        let join = std::thread::Builder::new()
            .name("wiremux-receiver".into())
            .spawn(move || run(thread_inner, socket))
            .expect("failed to spawn receiver pump thread");

        Self {
            handle,
            join: Some(join),
        }
    }

    pub fn handle(&self) -> ReceiverHandle {
        self.handle.clone()
    }
}

impl Drop for ReceiverPump {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
        // The thread's own exit path already flushes every channel queue
        // (see `run`'s tail); nothing further to do here.
    }
}

impl ReceiverHandle {
    pub fn lock(&self) -> &Lock {
        &self.inner.lock
    }

    /// Whether the pump's background thread is still running.
    pub fn is_alive(&self) -> bool {
        self.inner.alive.load(Ordering::Acquire)
    }

    /// Take the typed error that ended the pump, if its exit was caused by
    /// one (currently only `TransportError::FrameTooLarge`). Returns `None`
    /// while the pump is still running, and also `None` after a plain I/O
    /// failure or ordinary peer disconnect — those are reported only via
    /// `log::warn!` and `is_alive() == false`, per the design. Consumes the
    /// stored error, since `TransportError::Io` isn't `Clone`.
    pub fn take_last_error(&self) -> Option<TransportError> {
        self.inner.last_error.lock().unwrap().take()
    }

    /// Register a listener for `channel_id`. `channel_id` must not be the
    /// admin channel, and no other listener may currently be registered
    /// for it (both are programmer-error assertions, per the design).
    ///
    /// If the peer had already signalled fin for this channel before the
    /// listener was registered (deferred fin), `fin_event` is set
    /// immediately, without blocking.
    pub fn add_listener(&self, channel_id: ChannelId, data_event: Arc<Event>, fin_event: Arc<Event>) {
        assert_ne!(channel_id, ADMIN_CHANNEL, "the admin channel is never registered by an endpoint");
        let entry = self.inner.listeners.get(channel_id);

        let had_deferred_fin = self.inner.lock.with(|| {
            assert!(
                !*entry.in_use.lock().unwrap(),
                "double listener registration on channel {channel_id}"
            );
            *entry.data_event.lock().unwrap() = Some(data_event);
            *entry.fin_event.lock().unwrap() = Some(Arc::clone(&fin_event));
            *entry.in_use.lock().unwrap() = true;

            let mut deferred = entry.pending_fin_forward.lock().unwrap();
            if *deferred {
                *deferred = false;
                true
            } else {
                false
            }
        });

        if had_deferred_fin {
            self.remove_listener(channel_id);
        }
    }

    /// Unregister the listener for `channel_id`, firing its `fin_event`.
    /// If no listener is currently registered, the fin is recorded as
    /// pending so the next registration observes it immediately.
    ///
    /// Called both by the pump itself (on peer fin) and by endpoint
    /// destructors (on local shutdown).
    pub fn remove_listener(&self, channel_id: ChannelId) {
        let entry = self.inner.listeners.get(channel_id);
        let fin_event = self.inner.lock.with(|| {
            let mut in_use = entry.in_use.lock().unwrap();
            if *in_use {
                *in_use = false;
                entry.fin_event.lock().unwrap().clone()
            } else {
                *entry.pending_fin_forward.lock().unwrap() = true;
                None
            }
        });
        if let Some(fin_event) = fin_event {
            fin_event.set();
        }
    }

    /// Free every queued block for `channel_id`. Idempotent: calling this
    /// twice in a row leaves the queue empty both times.
    pub fn flush_queue(&self, channel_id: ChannelId) {
        let entry = self.inner.listeners.get(channel_id);
        entry.queue.lock().unwrap().clear();
    }

    pub(crate) fn queue_and_mutex(&self, channel_id: ChannelId) -> &crate::listener::ListenerEntry {
        self.inner.listeners.get(channel_id)
    }

    fn push_block(&self, channel_id: ChannelId, block: Vec<u8>) {
        let entry = self.inner.listeners.get(channel_id);
        entry.queue.lock().unwrap().push_back(block);

        let in_use = self.inner.lock.with(|| *entry.in_use.lock().unwrap());
        if in_use {
            if let Some(ev) = entry.data_event.lock().unwrap().as_ref() {
                ev.set();
            }
        }
    }

    fn flush_all(&self) {
        for id in 0..self.inner.listeners.len() as u16 {
            self.flush_queue(id as ChannelId);
        }
    }
}

/// The receiver pump's main loop: read one frame header at a time. A
/// zero-byte read on the header is the only "peer disappeared" signal;
/// any other short read mid-frame is a hard I/O error and also ends the
/// loop. Channel 0 (any length) means whole-connection teardown. A
/// zero-length frame on a non-admin channel is that channel's fin. Any
/// other frame is read in full and pushed onto its channel's queue.
fn run(inner: Arc<ReceiverInner>, socket: Arc<dyn StreamSocket>) {
    log::debug!("receiver pump starting");
    let handle = ReceiverHandle {
        inner: Arc::clone(&inner),
    };

    loop {
        let mut hdr_buf = [0u8; HEADER_LEN];
        match socket.read_exact_or_eof(&mut hdr_buf) {
            Ok(false) => {
                log::debug!("receiver pump: peer disappeared (EOF at frame boundary)");
                break;
            }
            Ok(true) => {}
            Err(e) => {
                log::warn!("receiver pump: short read, stopping: {e}");
                break;
            }
        }
        let header = FrameHeader::decode(hdr_buf);

        if header.is_teardown() {
            if header.length > 0 {
                let mut discard = vec![0u8; header.length as usize];
                if let Err(e) = socket.read_exact(&mut discard) {
                    log::warn!("receiver pump: failed discarding admin payload: {e}");
                }
            }
            log::debug!("receiver pump: admin teardown frame received");
            break;
        }

        if header.is_fin() {
            handle.remove_listener(header.channel_id);
            continue;
        }

        if header.length > inner.max_frame_len {
            log::warn!(
                "receiver pump: frame on channel {} claims {} bytes, exceeding the configured maximum {}; stopping",
                header.channel_id,
                header.length,
                inner.max_frame_len
            );
            *inner.last_error.lock().unwrap() = Some(TransportError::FrameTooLarge {
                channel_id: header.channel_id,
                len: header.length,
                max: inner.max_frame_len,
            });
            break;
        }

        let mut block = vec![0u8; header.length as usize];
        if let Err(e) = socket.read_exact(&mut block) {
            log::warn!("receiver pump: short read on channel {} payload: {e}", header.channel_id);
            break;
        }
        log::trace!(
            "receiver pump: frame on channel {} ({} bytes)",
            header.channel_id,
            block.len()
        );
        handle.push_block(header.channel_id, block);
    }

    inner.alive.store(false, Ordering::Release);
    handle.flush_all();
    log::debug!("receiver pump exiting");
}
