// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// Error taxonomy for the parts of the transport that are recoverable at an
// API boundary. Socket failures inside the pumps are deliberately NOT
// represented here — per the design, they surface to the application only
// as `Endpoint::is_alive() == false`, never as a propagated error, and are
// merely logged at the point of failure.

use std::fmt;

/// Errors returned from transport/handshake construction paths.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("frame length {len} on channel {channel_id} exceeds the configured maximum {max}")]
    FrameTooLarge {
        channel_id: u8,
        len: u64,
        max: u64,
    },

    #[error("handshake mismatch: expected {expected}, got {got}")]
    HandshakeMismatch { expected: PeerInfo, got: PeerInfo },

    #[error("handshake did not complete after exhausting all connect retries")]
    HandshakeRetriesExhausted,
}

/// A `(peer_id, connection_index)` pair exchanged during the handshake.
/// Exists purely to give `HandshakeMismatch`'s fields a name in Debug
/// output without repeating the tuple type everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInfo {
    pub peer_id: u32,
    pub connection_index: u32,
}

impl fmt::Display for PeerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(peer_id={}, connection_index={})", self.peer_id, self.connection_index)
    }
}
