// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! `TcpServerConnector` provides a `ServerConnector` for TCP connections
//! which are upgraded with STARTTLS.

use core::time::Duration;
use std::io;

use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_rustls::client::TlsStream;

use crate::{
    connect::{
        starttls::{tls_handshake, StartTlsError},
        ServerConnector, Transport,
    },
    Error,
};

const READ_CHUNK: usize = 4096;

/// Connect via TCP to an XMPP server
#[derive(Debug, Clone, Default)]
pub struct TcpServerConnector;

impl ServerConnector for TcpServerConnector {
    type Transport = TcpTransport;

    async fn connect(&self, host: &str, port: u16) -> Result<TcpTransport, Error> {
        log::debug!("connecting to {}:{}", host, port);
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        Ok(TcpTransport::new(stream))
    }
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Closed,
}

/// A TCP connection, plaintext or TLS
pub struct TcpTransport {
    stream: Stream,
    /// Bytes read by `wait_readable` and not yet handed out by `read`.
    pending: BytesMut,
    eof: bool,
}

impl TcpTransport {
    /// Wraps a connected socket.
    pub fn new(stream: TcpStream) -> TcpTransport {
        TcpTransport {
            stream: Stream::Plain(stream),
            pending: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Whether the TLS upgrade has been done.
    pub fn is_secure(&self) -> bool {
        matches!(self.stream, Stream::Tls(_))
    }

    async fn read_some(&mut self) -> io::Result<usize> {
        self.pending.reserve(READ_CHUNK);
        match &mut self.stream {
            Stream::Plain(s) => s.read_buf(&mut self.pending).await,
            Stream::Tls(s) => s.read_buf(&mut self.pending).await,
            Stream::Closed => Ok(0),
        }
    }
}

impl Transport for TcpTransport {
    async fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        if !self.pending.is_empty() || self.eof {
            return Ok(true);
        }
        // read_buf is cancel safe: if the timeout fires, nothing was read.
        match tokio::time::timeout(timeout, self.read_some()).await {
            Ok(Ok(0)) => {
                self.eof = true;
                Ok(true)
            }
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(false),
        }
    }

    async fn read(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        let chunk = self.pending.split();
        buf.extend_from_slice(&chunk);
        Ok(chunk.len())
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.stream {
            Stream::Plain(s) => {
                s.write_all(data).await?;
                s.flush().await
            }
            Stream::Tls(s) => {
                s.write_all(data).await?;
                s.flush().await
            }
            Stream::Closed => Err(io::ErrorKind::NotConnected.into()),
        }
    }

    async fn upgrade_to_tls(&mut self, domain: &str) -> Result<(), Error> {
        let tcp = match core::mem::replace(&mut self.stream, Stream::Closed) {
            Stream::Plain(tcp) => tcp,
            other => {
                self.stream = other;
                return Err(StartTlsError::NotPlaintext.into());
            }
        };
        self.pending.clear();
        let tls = tls_handshake(tcp, domain).await?;
        self.stream = Stream::Tls(Box::new(tls));
        log::debug!("TLS established with {}", domain);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        let result = match &mut self.stream {
            Stream::Plain(s) => s.shutdown().await,
            Stream::Tls(s) => s.shutdown().await,
            Stream::Closed => Ok(()),
        };
        self.stream = Stream::Closed;
        self.pending.clear();
        result
    }

    fn is_open(&self) -> bool {
        !matches!(self.stream, Stream::Closed) && !self.eof
    }
}
