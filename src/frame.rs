// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The wire unit: `(channel_id: u8, length: u64 little-endian, payload)`.
// This module owns only the constants and the header encode/decode; the
// pumps own the actual socket reads/writes (reading the header is cheap
// enough to inline there, but the layout itself lives here so both pumps
// agree on it).

/// Number of addressable channels. Channel ids are `u8`, so this is also
/// the natural size of the receiver pump's listener table.
pub const MAX_CHANNELS: usize = 256;

/// Channel 0 is reserved: it carries only whole-connection teardown
/// signals and is never registered by an application-facing endpoint.
pub const ADMIN_CHANNEL: ChannelId = 0;

/// An 8-bit channel identifier, `0` reserved for the admin channel.
pub type ChannelId = u8;

/// Byte length of a frame header: 1 byte channel id + 8 bytes length.
pub const HEADER_LEN: usize = 1 + 8;

/// Byte length of the `(start_id, len)` prefix used by the id/len sending
/// convention (`send_id_len` / `blocking_receive_id_len`).
pub const ID_LEN_PREFIX_LEN: usize = 8 + 8;

/// A decoded frame header, read off the wire ahead of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub channel_id: ChannelId,
    pub length: u64,
}

impl FrameHeader {
    /// Encode `(channel_id, length)` into the 9-byte wire header.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = self.channel_id;
        buf[1..9].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Decode a 9-byte wire header.
    pub fn decode(buf: [u8; HEADER_LEN]) -> Self {
        let channel_id = buf[0];
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&buf[1..9]);
        let length = u64::from_le_bytes(len_bytes);
        Self {
            channel_id,
            length,
        }
    }

    /// Whether this header signals end-of-stream (fin) for its channel:
    /// non-admin channel, zero length.
    pub fn is_fin(&self) -> bool {
        self.channel_id != ADMIN_CHANNEL && self.length == 0
    }

    /// Whether this header signals whole-connection teardown (admin
    /// frame). Payload content, if any, is ignored by the receiver pump.
    pub fn is_teardown(&self) -> bool {
        self.channel_id == ADMIN_CHANNEL
    }
}

/// Prepend a `(start_id, len)` little-endian `u64` pair to `payload`,
/// producing the buffer the id/len sending convention places on the wire.
pub fn encode_id_len_buf(payload: &[u8], start_id: u64, len: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ID_LEN_PREFIX_LEN + payload.len());
    buf.extend_from_slice(&start_id.to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// Parse a received block produced by `encode_id_len_buf` back into
/// `(start_id, len, data)`. Panics if `block` is shorter than the 16-byte
/// prefix — callers only use this convention on channels where both peers
/// agreed to it, so a short block here is a protocol-usage bug, not a
/// recoverable I/O condition.
pub fn decode_id_len_buf(block: &[u8]) -> (u64, u64, &[u8]) {
    assert!(
        block.len() >= ID_LEN_PREFIX_LEN,
        "id/len block too short: {} bytes",
        block.len()
    );
    let mut id_bytes = [0u8; 8];
    let mut len_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&block[0..8]);
    len_bytes.copy_from_slice(&block[8..16]);
    let start_id = u64::from_le_bytes(id_bytes);
    let len = u64::from_le_bytes(len_bytes);
    (start_id, len, &block[16..])
}
