// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
// The stream socket abstraction is, per the design, an external
// collaborator: exact-byte-count blocking read/write with cumulative byte
// counters. This module defines the trait boundary and a concrete
// `TcpStream` adapter (the "batteries included" default); the pumps only
// ever program against `StreamSocket`.
//
// Methods take `&self`, not `&mut self`: a socket is full-duplex, and the
// receiver pump (reading) and the sender pump (writing) run on two
// different threads against the *same* `Arc<dyn StreamSocket>` with no
// further synchronisation between them, exactly as two threads may safely
// read and write the same `TcpStream` concurrently via `&TcpStream`'s
// `Read`/`Write` impls. Each implementation is responsible for its own
// interior mutability where the OS handle itself doesn't already allow
// concurrent use (see `DuplexPipe` below).

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

/// A blocking, exact-byte-count stream socket with cumulative send/receive
/// byte counters, as depended on by the receiver and sender pumps.
///
/// Implementations must read/write *exactly* the requested number of
/// bytes, returning an error (rather than a short count) if the peer
/// closes mid-frame — the pumps rely on "short read == connection death".
pub trait StreamSocket: Send + Sync {
    /// Like a blocking exact-byte read, but returns `Ok(false)` instead of
    /// an error when zero bytes were read before EOF (a clean peer
    /// disconnect at a frame boundary), and `Ok(true)` on a full,
    /// successful read. A *partial* read that then hits EOF is reported as
    /// an `UnexpectedEof` error — only a boundary-aligned EOF is "clean".
    fn read_exact_or_eof(&self, buf: &mut [u8]) -> io::Result<bool>;

    /// Read exactly `buf.len()` bytes, treating any EOF (boundary-aligned
    /// or not) as an error. Convenience wrapper over
    /// [`StreamSocket::read_exact_or_eof`] for callers that already know
    /// more data must be coming (e.g. a frame's payload, once its header
    /// declared a non-zero length).
    fn read_exact(&self, buf: &mut [u8]) -> io::Result<()> {
        if !self.read_exact_or_eof(buf)? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer disconnected",
            ));
        }
        Ok(())
    }

    /// Write exactly `buf.len()` bytes.
    fn write_all(&self, buf: &[u8]) -> io::Result<()>;

    /// Cumulative bytes successfully read so far.
    fn recv_count(&self) -> u64;

    /// Cumulative bytes successfully written so far.
    fn send_count(&self) -> u64;
}

/// Default `StreamSocket` implementation over `std::net::TcpStream`.
pub struct TcpSocket {
    stream: TcpStream,
    recv_count: AtomicU64,
    send_count: AtomicU64,
}

impl TcpSocket {
    /// Wrap an already-connected `TcpStream`. Disables Nagle's algorithm
    /// (`TCP_NODELAY`) since frames are already explicitly length-prefixed
    /// and the transport does its own batching via the sender pump's
    /// drain loop — holding small writes for coalescing only adds latency
    /// here. Also enables TCP keepalive so a silently vanished peer (no
    /// FIN, no RST) is eventually observed as a read error rather than
    /// hanging the receiver pump forever.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let sock_ref = SockRef::from(&stream);
        sock_ref.set_nodelay(true)?;
        sock_ref.set_tcp_keepalive(
            &TcpKeepalive::new()
                .with_time(Duration::from_secs(30))
                .with_interval(Duration::from_secs(10)),
        )?;
        Ok(Self {
            stream,
            recv_count: AtomicU64::new(0),
            send_count: AtomicU64::new(0),
        })
    }

    /// Borrow the underlying `TcpStream`, e.g. to read the peer address.
    pub fn inner(&self) -> &TcpStream {
        &self.stream
    }
}

impl StreamSocket for TcpSocket {
    fn read_exact_or_eof(&self, buf: &mut [u8]) -> io::Result<bool> {
        read_loop(&mut &self.stream, buf, &self.recv_count)
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        (&self.stream).write_all(buf)?;
        self.send_count
            .fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn recv_count(&self) -> u64 {
        self.recv_count.load(Ordering::Relaxed)
    }

    fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }
}

/// Shared "read exactly, or report a clean EOF at a frame boundary" loop
/// used by every `StreamSocket` implementation so the EOF-vs-short-read
/// distinction is made in exactly one place.
fn read_loop<R: Read>(reader: &mut R, buf: &mut [u8], counter: &AtomicU64) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed mid-frame",
                ));
            }
            Ok(n) => {
                filled += n;
                counter.fetch_add(n as u64, Ordering::Relaxed);
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// An in-memory, in-process duplex byte pipe implementing `StreamSocket`,
/// used by tests so two-peer scenarios are deterministic and don't depend
/// on the host's loopback TCP stack. Each `DuplexPipe::pair()` call returns
/// two ends; writes on one end become reads on the other.
///
/// Unlike a raw socket fd, an `mpsc::Receiver` needs `&mut self` to drain,
/// so the read side's state (the channel receiver plus a small reassembly
/// buffer for reads that don't land on a chunk boundary) lives behind a
/// `Mutex` to satisfy the `&self` trait signature.
pub struct DuplexPipe {
    read_state: Mutex<ReadState>,
    tx: Mutex<std::sync::mpsc::Sender<Vec<u8>>>,
    recv_count: AtomicU64,
    send_count: AtomicU64,
}

struct ReadState {
    rx: std::sync::mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl DuplexPipe {
    /// Create a connected pair of in-memory sockets.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_b) = std::sync::mpsc::channel();
        let (tx_b, rx_a) = std::sync::mpsc::channel();
        (
            Self::new(rx_a, tx_a),
            Self::new(rx_b, tx_b),
        )
    }

    fn new(rx: std::sync::mpsc::Receiver<Vec<u8>>, tx: std::sync::mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            read_state: Mutex::new(ReadState {
                rx,
                pending: Vec::new(),
            }),
            tx: Mutex::new(tx),
            recv_count: AtomicU64::new(0),
            send_count: AtomicU64::new(0),
        }
    }
}

impl StreamSocket for DuplexPipe {
    fn read_exact_or_eof(&self, buf: &mut [u8]) -> io::Result<bool> {
        let mut state = self.read_state.lock().unwrap();
        let had_pending = !state.pending.is_empty();

        while state.pending.len() < buf.len() {
            match state.rx.recv() {
                Ok(chunk) => state.pending.extend_from_slice(&chunk),
                Err(_) => break, // sender dropped: no more data will ever arrive
            }
        }

        if state.pending.len() < buf.len() {
            if !had_pending && state.pending.is_empty() {
                return Ok(false); // clean EOF at a frame boundary
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "peer closed mid-frame",
            ));
        }

        let rest = state.pending.split_off(buf.len());
        buf.copy_from_slice(&state.pending);
        state.pending = rest;
        self.recv_count
            .fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(true)
    }

    fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.tx
            .lock()
            .unwrap()
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"))?;
        self.send_count
            .fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    fn recv_count(&self) -> u64 {
        self.recv_count.load(Ordering::Relaxed)
    }

    fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::Relaxed)
    }
}
