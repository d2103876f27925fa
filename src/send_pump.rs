// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The sender pump: one dedicated thread that owns the write side of the
// socket and serialises outbound work items from any number of producer
// contexts into a single, ordered byte stream. Port of `sndthread`'s
// design (a FIFO task queue plus a wake condition), generalised from a
// shared-memory ring push to a length-prefixed stream write.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::event::{Event, Reset};
use crate::frame::{encode_id_len_buf, ChannelId, FrameHeader, ADMIN_CHANNEL};
use crate::lock::Lock;
use crate::socket::StreamSocket;

/// A completed, self-contained outbound work item.
struct SendTask {
    channel_id: ChannelId,
    buffer: Vec<u8>,
    completion: Option<Arc<Event>>,
}

struct Queue {
    tasks: VecDeque<SendTask>,
}

/// Producer-facing handle to the sender pump's task queue and wake signal.
/// Cheap to clone; every clone refers to the same queue and the same
/// background thread.
#[derive(Clone)]
pub struct SenderHandle {
    inner: Arc<SenderInner>,
}

struct SenderInner {
    queue: Mutex<Queue>,
    wake: Event,
    lock: Lock,
}

/// Owns the sender pump's background thread. Dropping this joins the
/// thread (which only happens after `kill_task()` or socket failure).
pub struct SenderPump {
    handle: SenderHandle,
    join: Option<JoinHandle<()>>,
}

impl SenderPump {
    /// Spawn the sender pump thread, writing frames to `socket` as tasks
    /// are enqueued. `lock` must be the same `Lock` instance given to the
    /// matching `ReceiverPump` — channel endpoints assert this at
    /// construction.
    pub fn spawn(socket: Arc<dyn StreamSocket>, lock: Lock) -> Self {
        let inner = Arc::new(SenderInner {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
            }),
            wake: Event::new(Reset::Auto),
            lock,
        });
        let handle = SenderHandle {
            inner: Arc::clone(&inner),
        };

        let thread_inner = Arc::clone(&inner);
        let join = std::thread::Builder::new()
            .name("wiremux-sender".into())
            .spawn(move || run(thread_inner, socket))
            .expect("failed to spawn sender pump thread");

        Self {
            handle,
            join: Some(join),
        }
    }

    /// A cloneable producer handle for constructing channel endpoints.
    pub fn handle(&self) -> SenderHandle {
        self.handle.clone()
    }
}

impl Drop for SenderPump {
    fn drop(&mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl SenderHandle {
    /// The `Lock` this pump shares with its paired receiver pump.
    pub fn lock(&self) -> &Lock {
        &self.inner.lock
    }

    fn enqueue(&self, task: SendTask) {
        self.inner.queue.lock().unwrap().tasks.push_back(task);
        self.inner.wake.set();
    }

    /// Enqueue `payload` as a plain outbound block on `channel_id`. Returns
    /// once the task is queued; the bytes may not yet be on the wire.
    pub fn add_snd_task(&self, channel_id: ChannelId, payload: &[u8]) {
        self.enqueue(SendTask {
            channel_id,
            buffer: payload.to_vec(),
            completion: None,
        });
    }

    /// Like `add_snd_task`, but prepends a `(start_id, len)` little-endian
    /// `u64` pair ahead of `payload`.
    pub fn add_snd_task_start_len(&self, channel_id: ChannelId, payload: &[u8], start_id: u64, len: u64) {
        self.enqueue(SendTask {
            channel_id,
            buffer: encode_id_len_buf(payload, start_id, len),
            completion: None,
        });
    }

    /// Like `add_snd_task`, but `completion` is set once the bytes have
    /// actually reached the socket — the only way to observe "complete on
    /// the wire" rather than merely "queued".
    pub fn add_event_snd_task(&self, channel_id: ChannelId, payload: &[u8], completion: Arc<Event>) {
        self.enqueue(SendTask {
            channel_id,
            buffer: payload.to_vec(),
            completion: Some(completion),
        });
    }

    /// `add_event_snd_task` combined with the id/len prefix convention.
    pub fn add_event_snd_task_start_len(
        &self,
        channel_id: ChannelId,
        payload: &[u8],
        start_id: u64,
        len: u64,
        completion: Arc<Event>,
    ) {
        self.enqueue(SendTask {
            channel_id,
            buffer: encode_id_len_buf(payload, start_id, len),
            completion: Some(completion),
        });
    }

    /// Enqueue a zero-length frame on `channel_id`: the peer's
    /// end-of-stream (fin) signal for that channel.
    pub fn signal_end(&self, channel_id: ChannelId) {
        assert_ne!(channel_id, ADMIN_CHANNEL, "fin is not meaningful on the admin channel");
        self.enqueue(SendTask {
            channel_id,
            buffer: Vec::new(),
            completion: None,
        });
    }

    /// Enqueue the admin-channel teardown frame. After the pump writes it,
    /// the sender pump thread exits.
    pub fn kill_task(&self) {
        self.enqueue(SendTask {
            channel_id: ADMIN_CHANNEL,
            buffer: Vec::new(),
            completion: None,
        });
    }
}

/// The sender pump's main loop: wait for work, snapshot the current queue
/// depth, drain exactly that many tasks (new arrivals during the drain are
/// picked up on the next outer iteration — this bounds per-wakeup work
/// while still amortising the wait), write each task's frame contiguously,
/// then fire its completion event if it has one.
fn run(inner: Arc<SenderInner>, socket: Arc<dyn StreamSocket>) {
    log::debug!("sender pump starting");
    let mut running = true;
    while running {
        let is_empty = inner.lock.with(|| inner.queue.lock().unwrap().tasks.is_empty());
        if is_empty {
            inner.wake.wait();
        }

        let n = inner.lock.with(|| inner.queue.lock().unwrap().tasks.len());
        for _ in 0..n {
            if !running {
                break;
            }
            let task = match inner.lock.with(|| inner.queue.lock().unwrap().tasks.pop_front()) {
                Some(t) => t,
                None => break,
            };

            let header = FrameHeader {
                channel_id: task.channel_id,
                length: task.buffer.len() as u64,
            };
            if let Err(e) = write_frame(socket.as_ref(), &header, &task.buffer) {
                log::warn!("sender pump: write failed, stopping: {e}");
                running = false;
                break;
            }
            log::trace!(
                "sender pump: wrote frame on channel {} ({} bytes)",
                task.channel_id,
                task.buffer.len()
            );

            if task.channel_id == ADMIN_CHANNEL {
                running = false;
            }
            if let Some(completion) = &task.completion {
                completion.set();
            }
        }
    }
    log::debug!("sender pump exiting");
}

fn write_frame(socket: &dyn StreamSocket, header: &FrameHeader, payload: &[u8]) -> std::io::Result<()> {
    socket.write_all(&header.encode())?;
    if !payload.is_empty() {
        socket.write_all(payload)?;
    }
    Ok(())
}
