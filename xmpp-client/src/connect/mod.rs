// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `ServerConnector` provides transports for XMPP clients

use core::future::Future;
use core::time::Duration;
use std::io;

use bytes::BytesMut;

use crate::Error;

pub mod starttls;

pub mod tcp;
pub use tcp::{TcpServerConnector, TcpTransport};

/// A duplex byte channel to an XMPP server which can be upgraded to TLS in
/// place.
///
/// Reads are split in two: [`wait_readable`](Transport::wait_readable)
/// blocks for at most the given time until bytes are available, and
/// [`read`](Transport::read) then takes whatever is available without
/// blocking. A transport is always in blocking mode in that sense; there is
/// no separate switch for it.
pub trait Transport: Send {
    /// Waits up to `timeout` for incoming bytes.
    ///
    /// Returns `true` when a following `read` will not block, including when
    /// the peer has closed the connection (the `read` then returns 0).
    fn wait_readable(&mut self, timeout: Duration)
        -> impl Future<Output = io::Result<bool>> + Send;

    /// Appends the bytes available right now to `buf`, returning how many
    /// were appended. Returns 0 once the peer closed the connection.
    fn read(&mut self, buf: &mut BytesMut) -> impl Future<Output = io::Result<usize>> + Send;

    /// Writes all of `data` and flushes it.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = io::Result<()>> + Send;

    /// Replaces the plaintext channel with a TLS session to `domain`,
    /// keeping the underlying connection.
    fn upgrade_to_tls(&mut self, domain: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Shuts the connection down. Closing a closed transport is a no-op.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Whether the transport can still be written to.
    fn is_open(&self) -> bool;
}

/// Trait called to connect to an XMPP server, perhaps called multiple times
pub trait ServerConnector: Clone + core::fmt::Debug + Send + Unpin + 'static {
    /// The type of Transport this ServerConnector produces
    type Transport: Transport;

    /// Opens a plaintext connection to `host:port`. Stream negotiation,
    /// including STARTTLS, is driven by the caller.
    fn connect(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Transport, Error>> + Send;
}
