// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// `Transport` ties one socket to its receiver pump and sender pump and is
// the entry point applications use to open channel endpoints. It owns
// both pump threads; dropping it joins them.

use std::sync::Arc;

use crate::config::Config;
use crate::endpoint::Endpoint;
use crate::error::TransportError;
use crate::frame::ChannelId;
use crate::lock::Lock;
use crate::recv_pump::ReceiverPump;
use crate::send_pump::SenderPump;
use crate::socket::StreamSocket;

/// One multiplexed connection to a peer. Construct with the two peers'
/// already-connected (and, if relevant, already-handshaken — see
/// `crate::handshake`) `StreamSocket`, then `open_channel` for each
/// logical channel the application needs.
pub struct Transport {
    receiver: ReceiverPump,
    sender: SenderPump,
}

impl Transport {
    /// Spawn the receiver pump and sender pump over `socket`, sharing one
    /// `Lock` between them as required by `Endpoint::new`'s assertion.
    pub fn new<S: StreamSocket + 'static>(socket: S, config: Config) -> Self {
        let socket: Arc<dyn StreamSocket> = Arc::new(socket);
        let lock = Lock::new();
        let receiver = ReceiverPump::spawn(Arc::clone(&socket), lock.clone(), config.max_frame_len);
        let sender = SenderPump::spawn(socket, lock);
        Self { receiver, sender }
    }

    /// Open (register) the channel endpoint for `channel_id`. Panics if
    /// `channel_id` is the admin channel, or if a listener is already
    /// registered for it — both are programmer-error conditions.
    pub fn open_channel(&self, channel_id: ChannelId) -> Endpoint {
        Endpoint::new(channel_id, self.receiver.handle(), self.sender.handle())
    }

    /// Begin whole-connection teardown: enqueue the admin-channel frame.
    /// The sender pump writes it and exits; the peer's receiver pump, on
    /// reading it, exits too. Callers that care about individual channels
    /// should `synchronize_end()` each of them first (section 4.7).
    pub fn kill(&self) {
        self.sender.handle().kill_task();
    }

    /// Whether the receiver pump's background thread is still running.
    /// Becomes `false` once the peer tears down the connection or the
    /// socket fails; every open channel's `is_alive()` will eventually
    /// become `false` too as their fin events fire on pump exit.
    pub fn is_alive(&self) -> bool {
        self.receiver.handle().is_alive()
    }

    /// Take the typed error that caused the receiver pump to exit, if any
    /// (e.g. `TransportError::FrameTooLarge` — see `Config::max_frame_len`).
    /// `None` if the pump is still alive, or exited from a plain I/O
    /// failure or ordinary peer disconnect instead.
    pub fn take_last_error(&self) -> Option<TransportError> {
        self.receiver.handle().take_last_error()
    }
}
