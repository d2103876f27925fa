// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 wiremux contributors
//
//! A multiplexed, bidirectional, reliable message transport over a single
//! stream-oriented connection between two peers.
//!
//! One stream socket (a `TcpStream` by default, or anything implementing
//! [`StreamSocket`]) carries up to [`frame::MAX_CHANNELS`] independent,
//! FIFO-ordered logical channels. A [`Transport`] owns the socket and spawns
//! two dedicated threads against it — a receiver pump that demultiplexes
//! inbound frames into per-channel queues, and a sender pump that serialises
//! outbound work from any number of producers into one ordered byte stream.
//! Applications interact with individual channels through an [`Endpoint`],
//! obtained via [`Transport::open_channel`].
//!
//! ```no_run
//! use wiremux::{Config, Transport};
//! use wiremux::socket::TcpSocket;
//! use std::net::TcpStream;
//!
//! let stream = TcpStream::connect("127.0.0.1:9000")?;
//! let transport = Transport::new(TcpSocket::new(stream)?, Config::default());
//! let endpoint = transport.open_channel(1);
//! endpoint.send(b"hello");
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! What this crate does *not* do: establish the underlying connection beyond
//! the minimal peer-id handshake in [`handshake`], encrypt or authenticate
//! the transport, apply flow control beyond what the stream already
//! provides, allocate channels dynamically, reorder messages across
//! channels, or persist state across restarts.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod frame;
pub mod handshake;
pub mod listener;
pub mod lock;
pub mod recv_pump;
pub mod send_pump;
pub mod socket;
pub mod transport;

pub use config::Config;
pub use endpoint::Endpoint;
pub use error::{PeerInfo, TransportError};
pub use event::{Event, Reset};
pub use frame::{ChannelId, ADMIN_CHANNEL, MAX_CHANNELS};
pub use handshake::{accept_with_handshake, connect_with_retry, exchange_peer_info};
pub use lock::Lock;
pub use socket::{StreamSocket, TcpSocket};
pub use transport::Transport;
