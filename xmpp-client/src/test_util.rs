// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An in-memory server for tests.
//!
//! Server data is delivered in bursts: each burst becomes visible to exactly
//! one readiness cycle, the way one TCP segment would. Bursts are either
//! queued up front or produced by a responder that sees every write.

use core::fmt;
use core::time::Duration;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::BytesMut;
use minidom::Element;

use crate::{
    connect::{ServerConnector, Transport},
    Error,
};

pub(crate) const SERVER_HEADER: &str = "<?xml version='1.0'?><stream:stream xmlns:stream='http://etherx.jabber.org/streams' xmlns='jabber:client' from='capulet.lit' id='s1' version='1.0'>";

type Responder = Box<dyn FnMut(&str) -> Vec<String> + Send>;

#[derive(Default)]
struct Shared {
    bursts: VecDeque<Vec<u8>>,
    current: BytesMut,
    written: Vec<String>,
    responder: Option<Responder>,
    closed: bool,
    hung_up: bool,
    tls: bool,
    refuse: bool,
}

/// Handle on the scripted server, kept by the test while the connection
/// owns the transport.
#[derive(Clone, Default)]
pub(crate) struct Script {
    shared: Arc<Mutex<Shared>>,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Script").finish_non_exhaustive()
    }
}

impl Script {
    pub(crate) fn new() -> Script {
        Script::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap()
    }

    /// Queues a burst of server data.
    pub(crate) fn burst(self, data: &str) -> Script {
        self.push_burst(data);
        self
    }

    pub(crate) fn push_burst(&self, data: &str) {
        self.lock().bursts.push_back(data.as_bytes().to_vec());
    }

    /// Installs a responder called with every write; the bursts it returns
    /// are queued.
    pub(crate) fn respond<F: FnMut(&str) -> Vec<String> + Send + 'static>(
        self,
        responder: F,
    ) -> Script {
        self.lock().responder = Some(Box::new(responder));
        self
    }

    /// Makes the connector fail.
    pub(crate) fn refuse(self) -> Script {
        self.lock().refuse = true;
        self
    }

    /// The server closes the connection once its bursts are delivered.
    pub(crate) fn hang_up(&self) {
        self.lock().hung_up = true;
    }

    pub(crate) fn written(&self) -> Vec<String> {
        self.lock().written.clone()
    }

    /// Every write which parses as a single element.
    pub(crate) fn written_elements(&self) -> Vec<Element> {
        self.written()
            .iter()
            .filter_map(|w| w.parse::<Element>().ok())
            .collect()
    }

    pub(crate) fn is_tls(&self) -> bool {
        self.lock().tls
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn transport(&self) -> ScriptedTransport {
        ScriptedTransport {
            shared: self.shared.clone(),
        }
    }

    pub(crate) fn connector(&self) -> ScriptedConnector {
        ScriptedConnector {
            script: self.clone(),
        }
    }
}

/// Transport end of a [`Script`].
pub(crate) struct ScriptedTransport {
    shared: Arc<Mutex<Shared>>,
}

impl Transport for ScriptedTransport {
    async fn wait_readable(&mut self, timeout: Duration) -> io::Result<bool> {
        let ready = {
            let mut shared = self.shared.lock().unwrap();
            if !shared.current.is_empty() {
                true
            } else if shared.bursts.is_empty() {
                shared.hung_up
            } else if timeout.is_zero() {
                false
            } else {
                let burst = shared.bursts.pop_front().unwrap_or_default();
                shared.current.extend_from_slice(&burst);
                true
            }
        };
        if !ready && !timeout.is_zero() {
            tokio::time::sleep(timeout).await;
        }
        Ok(ready)
    }

    async fn read(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        let mut shared = self.shared.lock().unwrap();
        let chunk = shared.current.split();
        buf.extend_from_slice(&chunk);
        Ok(chunk.len())
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let mut shared = self.shared.lock().unwrap();
        if shared.closed {
            return Err(io::ErrorKind::NotConnected.into());
        }
        let text = String::from_utf8_lossy(data).into_owned();
        let replies = match shared.responder.as_mut() {
            Some(responder) => responder(&text),
            None => Vec::new(),
        };
        shared.written.push(text);
        shared
            .bursts
            .extend(replies.into_iter().map(String::into_bytes));
        Ok(())
    }

    async fn upgrade_to_tls(&mut self, _domain: &str) -> Result<(), Error> {
        self.shared.lock().unwrap().tls = true;
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.shared.lock().unwrap().closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.shared.lock().unwrap().closed
    }
}

/// Connector handing out the transport of a [`Script`].
#[derive(Clone, Debug)]
pub(crate) struct ScriptedConnector {
    script: Script,
}

impl ServerConnector for ScriptedConnector {
    type Transport = ScriptedTransport;

    async fn connect(&self, _host: &str, _port: u16) -> Result<ScriptedTransport, Error> {
        if self.script.lock().refuse {
            return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
        }
        Ok(self.script.transport())
    }
}

/// Value of attribute `name` on the element `written` serialises, if it
/// parses.
pub(crate) fn attr_of(written: &str, name: &str) -> Option<String> {
    written
        .parse::<Element>()
        .ok()?
        .attr(name)
        .map(String::from)
}
