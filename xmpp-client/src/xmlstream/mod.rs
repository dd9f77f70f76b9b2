// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! # RFC 6120 XML Streams
//!
//! **Note:** The XML stream is a low-level API which you should probably not
//! use directly.
//!
//! An [`XmlStream`] owns the [`Transport`] and turns the bytes read from it
//! into top-level elements. Every readiness cycle is read in full, repaired
//! into a standalone document by [`normalize`] and parsed with minidom; the
//! children of the resulting root are appended to a [`StanzaQueue`], from
//! which callers take elements by tag name.
//!
//! ## Ordering
//!
//! Within one read, children are queued grouped by namespace: first those
//! in the namespaces declared on the root, in declaration order, then any
//! other namespace in order of first appearance. Document order is kept
//! within each namespace. Elements of different namespaces arriving in the
//! same read are thus not necessarily queued in the order the server sent
//! them. Reads themselves are queued in the order they happen.

use core::time::Duration;

use bytes::BytesMut;
use minidom::Element;

use crate::{
    config::Timeouts,
    connect::Transport,
    error::{Error, ProtocolError},
    ns,
};

mod framing;
mod queue;

pub use framing::{declared_namespaces, normalize, Normalized};
pub use queue::{StanzaQueue, ANY};

/// Tag requesting the stream header itself rather than a queued element.
pub const STREAM_HEADER: &str = "stream:stream";

/// One parsed readiness cycle.
struct Document {
    root: Element,
    /// Namespaces declared on the root, in declaration order.
    namespaces: Vec<String>,
}

/// An XMPP stream over a [`Transport`], as seen by the initiating entity.
pub struct XmlStream<T: Transport> {
    transport: T,
    queue: StanzaQueue,
    realm: String,
    timeouts: Timeouts,
    closed: bool,
    /// Bytes of a read that did not parse, retried in front of the next.
    carry: BytesMut,
}

impl<T: Transport> XmlStream<T> {
    /// Wraps a connected transport. `realm` is the domain the stream is
    /// opened to.
    pub fn new(transport: T, realm: &str, timeouts: Timeouts) -> XmlStream<T> {
        XmlStream {
            transport,
            queue: StanzaQueue::new(),
            realm: realm.to_owned(),
            timeouts,
            closed: false,
            carry: BytesMut::new(),
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Elements received and not consumed yet.
    pub fn queue(&self) -> &StanzaQueue {
        &self.queue
    }

    /// Whether the server has ended the stream.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Timeouts used by the bounded waits.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Writes raw text.
    pub async fn send_raw(&mut self, data: &str) -> Result<(), Error> {
        log::debug!("SEND {}", data);
        self.transport.write(data.as_bytes()).await?;
        Ok(())
    }

    /// Serialises and writes an element.
    pub async fn send(&mut self, element: &Element) -> Result<(), Error> {
        self.send_raw(&String::from(element)).await
    }

    /// Opens a new stream to `to`.
    ///
    /// Whatever is still queued or carried over belongs to the previous
    /// stream and is dropped.
    pub async fn send_header(&mut self, to: &str) -> Result<(), Error> {
        self.queue.clear();
        self.carry.clear();
        self.closed = false;
        let header = format!(
            "<?xml version='1.0'?><stream:stream to='{}' xmlns:stream='{}' xmlns='{}' version='1.0'>",
            to,
            ns::STREAM,
            ns::JABBER_CLIENT
        );
        self.send_raw(&header).await
    }

    /// Ends the stream and closes the transport.
    pub async fn close(&mut self) -> Result<(), Error> {
        if self.transport.is_open() {
            self.send_raw("</stream:stream>").await?;
        }
        self.transport.close().await?;
        self.closed = true;
        Ok(())
    }

    /// Reads everything available in one readiness cycle and parses it
    /// into a stream root.
    ///
    /// Returns `None` when nothing arrived within the poll interval, or
    /// when the peer closed the connection.
    ///
    /// Data which still fails to parse after one more poll interval is
    /// reported as an error and kept: the next read is parsed behind it,
    /// or on its own if the two together still do not parse.
    async fn read_document(&mut self) -> Result<Option<Document>, Error> {
        if !self.transport.wait_readable(self.timeouts.poll).await? {
            return Ok(None);
        }
        let carried = self.carry.split();
        let mut buf = BytesMut::new();
        loop {
            if self.transport.read(&mut buf).await? == 0 {
                log::debug!("connection closed by peer");
                self.closed = true;
                if buf.is_empty() && carried.is_empty() {
                    return Ok(None);
                }
                return self.parse_carried(&carried, &buf).map(Some);
            }
            if self.transport.wait_readable(Duration::ZERO).await? {
                continue;
            }
            match self.parse_carried(&carried, &buf) {
                Ok(document) => return Ok(Some(document)),
                // An element may have been split across TCP segments; give
                // the rest one poll interval to arrive.
                Err(e) => {
                    if !self.transport.wait_readable(self.timeouts.poll).await? {
                        self.carry.extend_from_slice(&carried);
                        self.carry.extend_from_slice(&buf);
                        return Err(e);
                    }
                }
            }
        }
    }

    fn parse_carried(&mut self, carried: &[u8], fresh: &[u8]) -> Result<Document, Error> {
        if carried.is_empty() {
            return self.parse(fresh);
        }
        let mut joined = BytesMut::with_capacity(carried.len() + fresh.len());
        joined.extend_from_slice(carried);
        joined.extend_from_slice(fresh);
        match self.parse(&joined) {
            Ok(document) => Ok(document),
            Err(e) => match self.parse(fresh) {
                Ok(document) => {
                    log::warn!("dropping {} unparseable bytes", carried.len());
                    Ok(document)
                }
                Err(_) => Err(e),
            },
        }
    }

    fn parse(&mut self, buf: &[u8]) -> Result<Document, Error> {
        let raw = core::str::from_utf8(buf).map_err(ProtocolError::Utf8)?;
        log::trace!("RECV {}", raw);
        let normalized = normalize(raw, &self.realm);
        let root = normalized
            .document
            .parse::<Element>()
            .map_err(ProtocolError::Parser)?;
        if normalized.closed {
            log::debug!("stream closed by server");
            self.closed = true;
        }
        Ok(Document {
            namespaces: declared_namespaces(&normalized.document),
            root,
        })
    }

    /// Runs one readiness cycle, queueing every received element.
    ///
    /// Returns whether anything was read.
    pub async fn fill(&mut self) -> Result<bool, Error> {
        let Some(document) = self.read_document().await? else {
            return Ok(false);
        };
        self.enqueue(&document, |_| true);
        Ok(true)
    }

    /// Queues the children of the root for which `keep` holds.
    fn enqueue<F: Fn(&Element) -> bool>(&mut self, document: &Document, keep: F) {
        let root = &document.root;
        let mut namespaces = document.namespaces.clone();
        for child in root.children() {
            let ns = child.ns();
            if !namespaces.contains(&ns) {
                namespaces.push(ns);
            }
        }
        for ns in &namespaces {
            for child in root.children().filter(|c| c.ns() == *ns && keep(c)) {
                log::debug!("RECV {}", String::from(child));
                self.queue.push(child.clone());
            }
        }
    }

    /// Takes the first queued element named `tag`, or the head of the queue
    /// for [`ANY`].
    ///
    /// Reads from the transport first only if the queue is empty. With
    /// [`STREAM_HEADER`] as `tag`, one read cycle is always made and the
    /// parsed root is returned. `<stream:features/>` stays inside it;
    /// anything else the server sent along with its header is queued.
    ///
    /// `Ok(None)` means nothing matched yet.
    pub async fn pop(&mut self, tag: &str) -> Result<Option<Element>, Error> {
        if tag == STREAM_HEADER {
            let Some(document) = self.read_document().await? else {
                return Ok(None);
            };
            self.enqueue(&document, |c| !c.is("features", ns::STREAM));
            return Ok(Some(document.root));
        }
        if self.queue.is_empty() {
            self.fill().await?;
        }
        Ok(self.queue.pop(tag))
    }

    /// Waits for the stream header, up to the response timeout.
    ///
    /// A `<stream:error/>` sent along with the header ends the wait with
    /// [`ProtocolError::StreamError`].
    pub async fn wait_header(&mut self) -> Result<Element, Error> {
        let timeout = self.timeouts.response;
        tokio::time::timeout(timeout, self.wait_header_unbounded())
            .await
            .map_err(|_| Error::Timeout)?
    }

    async fn wait_header_unbounded(&mut self) -> Result<Element, Error> {
        loop {
            if let Some(root) = self.pop(STREAM_HEADER).await? {
                if let Some(error) = self.queue.pop_matching(|e| e.is("error", ns::STREAM)) {
                    return Err(stream_error(&error));
                }
                return Ok(root);
            }
            if self.closed {
                return Err(Error::Disconnected);
            }
            tokio::task::yield_now().await;
        }
    }

    /// Waits for the first element named `tag`, up to the response timeout.
    pub async fn wait_for_tag(&mut self, tag: &str) -> Result<Element, Error> {
        let name = queue::local_name(tag);
        self.wait_for(|elem| elem.name() == name).await
    }

    /// Waits for the first element for which `predicate` holds, up to the
    /// response timeout.
    ///
    /// Non-matching elements stay queued. Unlike [`pop`](Self::pop), new
    /// data is read even while unrelated elements are queued. A
    /// `<stream:error/>` ends the wait with
    /// [`ProtocolError::StreamError`].
    pub async fn wait_for<F: FnMut(&Element) -> bool>(
        &mut self,
        mut predicate: F,
    ) -> Result<Element, Error> {
        let timeout = self.timeouts.response;
        tokio::time::timeout(timeout, self.wait_for_unbounded(&mut predicate))
            .await
            .map_err(|_| Error::Timeout)?
    }

    async fn wait_for_unbounded<F: FnMut(&Element) -> bool>(
        &mut self,
        predicate: &mut F,
    ) -> Result<Element, Error> {
        loop {
            if let Some(error) = self.queue.pop_matching(|e| e.is("error", ns::STREAM)) {
                return Err(stream_error(&error));
            }
            if let Some(elem) = self.queue.pop_matching(&mut *predicate) {
                return Ok(elem);
            }
            if self.closed {
                return Err(Error::Disconnected);
            }
            if !self.fill().await? {
                tokio::task::yield_now().await;
            }
        }
    }
}

fn stream_error(error: &Element) -> Error {
    let condition = error
        .children()
        .find(|c| c.has_ns(ns::XMPP_STREAMS) && c.name() != "text")
        .map(|c| c.name().to_owned())
        .unwrap_or_else(|| String::from("undefined-condition"));
    log::warn!("stream error from server: {}", condition);
    ProtocolError::StreamError(condition).into()
}
