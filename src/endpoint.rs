// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The application-facing channel endpoint: couples one application thread
// (or several, for send — see below) to both pumps. Port of `channel`'s
// design; the state machine in the distilled spec's section 4.5 is
// realised here via `send_alive` / `recv_alive` atomics.
//
// `send`/`send_id_len` may be called from any number of producer threads
// sharing one `Endpoint` (the sender pump's task queue is the serialising
// point); `blocking_receive*` is intended for a single consuming thread,
// matching the "one application thread per channel" usage the design
// assumes for the receive side.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::event::{Event, Reset};
use crate::frame::{decode_id_len_buf, ChannelId, ADMIN_CHANNEL};
use crate::recv_pump::ReceiverHandle;
use crate::send_pump::SenderHandle;

/// An application-visible handle for one channel, multiplexed over a
/// shared `Transport`.
pub struct Endpoint {
    channel_id: ChannelId,
    receiver: ReceiverHandle,
    sender: SenderHandle,
    data_event: Arc<Event>,
    fin_event: Arc<Event>,
    send_alive: AtomicBool,
    recv_alive: AtomicBool,
}

impl Endpoint {
    /// Construct and register a channel endpoint. Asserts that `receiver`
    /// and `sender` were built sharing the same `Lock`, and that
    /// `channel_id` is not the admin channel — both are programmer-error
    /// conditions, not recoverable ones.
    pub(crate) fn new(channel_id: ChannelId, receiver: ReceiverHandle, sender: SenderHandle) -> Self {
        assert_ne!(
            channel_id, ADMIN_CHANNEL,
            "channel 0 is the admin channel and may not be opened as an endpoint"
        );
        assert!(
            receiver.lock().same_as(sender.lock()),
            "receiver pump and sender pump must share the same Lock"
        );

        let data_event = Arc::new(Event::new(Reset::Auto));
        let fin_event = Arc::new(Event::new(Reset::Manual));
        receiver.add_listener(channel_id, Arc::clone(&data_event), Arc::clone(&fin_event));

        Self {
            channel_id,
            receiver,
            sender,
            data_event,
            fin_event,
            send_alive: AtomicBool::new(true),
            recv_alive: AtomicBool::new(true),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Queue `buf` as an outbound block. Non-blocking: returns once the
    /// task is queued, the bytes may not yet be on the wire.
    pub fn send(&self, buf: &[u8]) {
        assert!(self.send_alive.load(Ordering::Acquire), "send after signal_end");
        self.sender.add_snd_task(self.channel_id, buf);
    }

    /// Like `send`, but the first 16 bytes of the emitted block encode
    /// `(id, len)` little-endian, ahead of `buf`.
    pub fn send_id_len(&self, buf: &[u8], id: u64, len: u64) {
        assert!(self.send_alive.load(Ordering::Acquire), "send after signal_end");
        self.sender.add_snd_task_start_len(self.channel_id, buf, id, len);
    }

    fn queue_empty(&self) -> bool {
        self.receiver
            .queue_and_mutex(self.channel_id)
            .queue
            .lock()
            .unwrap()
            .is_empty()
    }

    /// Block until at least one message is queued, then return its full
    /// payload, in FIFO order with every other `blocking_receive*` call on
    /// this channel.
    pub fn blocking_receive(&self) -> Vec<u8> {
        assert!(self.recv_alive.load(Ordering::Acquire), "receive after fin");
        loop {
            {
                let entry = self.receiver.queue_and_mutex(self.channel_id);
                let mut queue = entry.queue.lock().unwrap();
                if let Some(block) = queue.pop_front() {
                    return block;
                }
            }
            self.data_event.wait();
        }
    }

    /// Fill `buf` with exactly `buf.len()` bytes, splicing across as many
    /// queued blocks as needed. A block that contains more than is needed
    /// is shrunk in place and kept at the head of the queue for the next
    /// call; a block with fewer bytes than needed is consumed entirely and
    /// the fill continues with the next block. `blocking_receive_into(&mut
    /// [])` returns immediately without touching the queue.
    pub fn blocking_receive_into(&self, buf: &mut [u8]) {
        assert!(self.recv_alive.load(Ordering::Acquire), "receive after fin");
        let mut filled = 0usize;
        while filled < buf.len() {
            while self.queue_empty() {
                self.data_event.wait();
            }
            let entry = self.receiver.queue_and_mutex(self.channel_id);
            let mut queue = entry.queue.lock().unwrap();
            let need = buf.len() - filled;
            let have = queue.front().map(Vec::len).unwrap_or(0);

            if have <= need {
                let block = queue.pop_front().expect("queue was non-empty");
                buf[filled..filled + have].copy_from_slice(&block);
                filled += have;
            } else {
                let block = queue.front_mut().expect("queue was non-empty");
                buf[filled..filled + need].copy_from_slice(&block[..need]);
                let remainder = block.split_off(need);
                *block = remainder;
                filled += need;
            }
        }
    }

    /// `blocking_receive`, re-parsed through the id/len sending convention:
    /// returns `(id, len, data)` where `data` is the payload following the
    /// 16-byte prefix.
    pub fn blocking_receive_id_len(&self) -> (u64, u64, Vec<u8>) {
        let block = self.blocking_receive();
        let (id, len, data) = decode_id_len_buf(&block);
        (id, len, data.to_vec())
    }

    /// Non-blocking snapshot: is there a queued block right now?
    pub fn data_available(&self) -> bool {
        !self.queue_empty()
    }

    /// True unless the queue is empty AND the peer has signalled fin —
    /// i.e. there is nothing left to ever receive on this channel.
    pub fn is_alive(&self) -> bool {
        !(self.queue_empty() && self.fin_event.is_set())
    }

    /// Signal end-of-stream to the peer on this channel. After this,
    /// `send`/`send_id_len` must not be called again.
    pub fn signal_end(&self) {
        self.sender.signal_end(self.channel_id);
        self.send_alive.store(false, Ordering::Release);
    }

    /// Block until the peer's fin for this channel is observed.
    pub fn wait_for_fin(&self) {
        self.fin_event.wait();
        self.recv_alive.store(false, Ordering::Release);
    }

    /// Orderly teardown: signal our own end (if not already done), discard
    /// anything still queued inbound, then wait for the peer's fin. Used
    /// when the caller is done with the channel and only needs the peer's
    /// acknowledgement — not a data-preserving drain.
    pub fn synchronize_end(&self) {
        if self.send_alive.load(Ordering::Acquire) {
            self.signal_end();
        }
        if self.recv_alive.load(Ordering::Acquire) {
            self.receiver.flush_queue(self.channel_id);
            self.wait_for_fin();
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        if self.recv_alive.load(Ordering::Acquire) {
            self.receiver.remove_listener(self.channel_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::Lock;
    use crate::recv_pump::ReceiverPump;
    use crate::send_pump::SenderPump;
    use crate::socket::{DuplexPipe, StreamSocket};
    use std::thread;

    fn make_pair() -> (Endpoint, Endpoint, ReceiverPump, ReceiverPump, SenderPump, SenderPump) {
        let (sock_a, sock_b) = DuplexPipe::pair();
        let sock_a: Arc<dyn StreamSocket> = Arc::new(sock_a);
        let sock_b: Arc<dyn StreamSocket> = Arc::new(sock_b);

        let lock_a = Lock::new();
        let lock_b = Lock::new();

        let recv_a = ReceiverPump::spawn(Arc::clone(&sock_a), lock_a.clone(), 1 << 40);
        let send_a = SenderPump::spawn(sock_a, lock_a);
        let recv_b = ReceiverPump::spawn(Arc::clone(&sock_b), lock_b.clone(), 1 << 40);
        let send_b = SenderPump::spawn(sock_b, lock_b);

        // A's sender writes to the pipe that B's receiver reads, and vice
        // versa, because `DuplexPipe::pair()` already cross-wires the two
        // ends — `sock_a`'s writes arrive at `sock_b`'s reads.
        let ep_a = Endpoint::new(5, recv_a.handle(), send_a.handle());
        let ep_b = Endpoint::new(5, recv_b.handle(), send_b.handle());

        (ep_a, ep_b, recv_a, recv_b, send_a, send_b)
    }

    #[test]
    fn echo_scenario() {
        let (ep_a, ep_b, _ra, _rb, _sa, _sb) = make_pair();
        ep_a.send(&[0xDE, 0xAD, 0xBE, 0xEF]);
        let received = ep_b.blocking_receive();
        assert_eq!(received, vec![0xDE, 0xAD, 0xBE, 0xEF]);

        ep_b.send(&received);
        let echoed = ep_a.blocking_receive();
        assert_eq!(echoed, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn splice_scenario() {
        let (ep_a, ep_b, _ra, _rb, _sa, _sb) = make_pair();
        ep_a.send(&[0x01, 0x02]);
        ep_a.send(&[0x03]);
        ep_a.send(&[0x04, 0x05, 0x06, 0x07]);

        let mut first = [0u8; 5];
        ep_b.blocking_receive_into(&mut first);
        assert_eq!(first, [0x01, 0x02, 0x03, 0x04, 0x05]);

        let mut second = [0u8; 2];
        ep_b.blocking_receive_into(&mut second);
        assert_eq!(second, [0x06, 0x07]);
    }

    #[test]
    fn zero_length_receive_does_not_touch_queue() {
        let (ep_a, ep_b, _ra, _rb, _sa, _sb) = make_pair();
        ep_a.send(&[0xAA]);
        // Give the write a moment to land before proving we didn't consume it.
        thread::sleep(std::time::Duration::from_millis(20));
        ep_b.blocking_receive_into(&mut []);
        assert!(ep_b.data_available());
        assert_eq!(ep_b.blocking_receive(), vec![0xAA]);
    }

    #[test]
    fn id_len_round_trip() {
        let (ep_a, ep_b, _ra, _rb, _sa, _sb) = make_pair();
        ep_a.send_id_len(&[0x42], 7, 99);
        let (id, len, data) = ep_b.blocking_receive_id_len();
        assert_eq!(id, 7);
        assert_eq!(len, 99);
        assert_eq!(data, vec![0x42]);
    }

    #[test]
    fn graceful_close_both_sides() {
        let (ep_a, ep_b, _ra, _rb, _sa, _sb) = make_pair();
        let t = thread::spawn(move || {
            ep_a.synchronize_end();
            ep_a
        });
        ep_b.synchronize_end();
        let ep_a = t.join().unwrap();

        assert!(!ep_a.is_alive());
        assert!(!ep_b.is_alive());
        assert!(ep_a.fin_event.is_set());
        assert!(ep_b.fin_event.is_set());
    }
}
