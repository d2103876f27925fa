// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The minimal process-level connection establishment the transport
// depends on: immediately after a stream connects, each side exchanges two
// 32-bit little-endian integers, `(peer_id, connection_index)`. Everything
// else about connection establishment — listen/bind/accept, the
// `sockets[peer_id][connection_index]` placement table, retrying a
// mismatched accept — is the caller's responsibility; this module only
// implements the handshake primitive and a connect-and-retry convenience
// wrapper for the common case of a real TCP endpoint.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use crate::error::{PeerInfo, TransportError};

/// Number of connect attempts before giving up, per the distilled spec's
/// external-interface note.
pub const RETRY_CONNECT: u32 = 10;

/// Delay between connect retries.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(10);

/// Exchange `(my_peer_id, my_connection_index)` with whatever is on the
/// other end of `stream`, writing ours first and then reading theirs.
/// Works on any `Read + Write` stream, not just `TcpStream`, so it can run
/// against a test double too.
pub fn exchange_peer_info<S: Read + Write>(
    stream: &mut S,
    my_peer_id: u32,
    my_connection_index: u32,
) -> io::Result<PeerInfo> {
    let mut out = [0u8; 8];
    out[0..4].copy_from_slice(&my_peer_id.to_le_bytes());
    out[4..8].copy_from_slice(&my_connection_index.to_le_bytes());
    stream.write_all(&out)?;

    let mut inp = [0u8; 8];
    stream.read_exact(&mut inp)?;
    let mut peer_id_bytes = [0u8; 4];
    let mut conn_idx_bytes = [0u8; 4];
    peer_id_bytes.copy_from_slice(&inp[0..4]);
    conn_idx_bytes.copy_from_slice(&inp[4..8]);

    Ok(PeerInfo {
        peer_id: u32::from_le_bytes(peer_id_bytes),
        connection_index: u32::from_le_bytes(conn_idx_bytes),
    })
}

/// Connect to `addr` over TCP, retrying up to `RETRY_CONNECT` times at
/// `RETRY_INTERVAL` on failure, then perform `exchange_peer_info`. Returns
/// the connected stream plus the peer's reported `(peer_id,
/// connection_index)` so the caller can validate it against whatever it
/// expected (a mismatch, per the distilled spec, means the acceptor should
/// drop and retry — that decision belongs to the caller, since only the
/// caller knows its expected peer topology).
pub fn connect_with_retry<A: ToSocketAddrs + Clone>(
    addr: A,
    my_peer_id: u32,
    my_connection_index: u32,
) -> Result<(TcpStream, PeerInfo), TransportError> {
    let mut last_err = None;
    for attempt in 0..RETRY_CONNECT {
        match TcpStream::connect(addr.clone()) {
            Ok(mut stream) => {
                let peer = exchange_peer_info(&mut stream, my_peer_id, my_connection_index)?;
                return Ok((stream, peer));
            }
            Err(e) => {
                log::debug!("connect attempt {}/{} failed: {e}", attempt + 1, RETRY_CONNECT);
                last_err = Some(e);
                thread::sleep(RETRY_INTERVAL);
            }
        }
    }
    match last_err {
        Some(e) => Err(TransportError::Io(e)),
        None => Err(TransportError::HandshakeRetriesExhausted),
    }
}

/// Perform the handshake on an already-accepted socket (the listening
/// side's counterpart to `connect_with_retry`), returning the peer's
/// reported `(peer_id, connection_index)` so the caller can place the
/// socket into its own `sockets[peer_id][connection_index]` table, or drop
/// and retry on a mismatch.
pub fn accept_with_handshake(
    stream: &mut TcpStream,
    my_peer_id: u32,
    my_connection_index: u32,
) -> io::Result<PeerInfo> {
    exchange_peer_info(stream, my_peer_id, my_connection_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn handshake_exchanges_peer_info_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            accept_with_handshake(&mut stream, 1, 0).unwrap()
        });

        let (_client_stream, got) = connect_with_retry(addr, 2, 5).unwrap();
        let server_saw = server.join().unwrap();

        assert_eq!(got, PeerInfo { peer_id: 1, connection_index: 0 });
        assert_eq!(server_saw, PeerInfo { peer_id: 2, connection_index: 5 });
    }

    #[test]
    fn exchange_peer_info_round_trips_over_a_pipe() {
        use crate::socket::DuplexPipe;
        // DuplexPipe implements StreamSocket (the pump-facing trait), not
        // Read + Write directly, so wrap it minimally for this test.
        struct RwAdapter(DuplexPipe);
        impl Read for RwAdapter {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.0.read_exact(buf)?;
                Ok(buf.len())
            }
        }
        impl Write for RwAdapter {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.write_all(buf)?;
                Ok(buf.len())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let (a, b) = DuplexPipe::pair();
        let mut a = RwAdapter(a);
        let mut b = RwAdapter(b);

        let t = thread::spawn(move || exchange_peer_info(&mut b, 9, 1).unwrap());
        let a_saw = exchange_peer_info(&mut a, 3, 4).unwrap();
        let b_saw = t.join().unwrap();

        assert_eq!(a_saw, PeerInfo { peer_id: 9, connection_index: 1 });
        assert_eq!(b_saw, PeerInfo { peer_id: 3, connection_index: 4 });
    }
}
