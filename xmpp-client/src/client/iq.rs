// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use minidom::Element;

use crate::{client::Connection, connect::ServerConnector, error::Error, ns};

/// A fresh stanza id.
pub(crate) fn make_id(prefix: &str) -> String {
    format!("{}-{:08x}", prefix, rand::random::<u32>())
}

/// Whether `elem` answers the iq with id `id`.
pub(crate) fn is_reply_to(elem: &Element, id: &str) -> bool {
    elem.name() == "iq"
        && elem.attr("id") == Some(id)
        && matches!(elem.attr("type"), Some("result") | Some("error"))
}

impl<C: ServerConnector> Connection<C> {
    /// Builds an iq from us.
    pub(crate) fn iq(&self, type_: &str, id: &str, to: Option<&str>, payload: Element) -> Element {
        Element::builder("iq", ns::JABBER_CLIENT)
            .attr("from", self.config.full_jid())
            .attr("to", to.map(String::from))
            .attr("type", type_)
            .attr("id", id)
            .append(payload)
            .build()
    }

    /// Sends an iq get or set and waits for the result or error carrying
    /// the same id. Other received elements stay queued.
    pub(crate) async fn request(&mut self, iq: Element) -> Result<Element, Error> {
        let id = iq.attr("id").unwrap_or_default().to_owned();
        let stream = self.stream_mut()?;
        stream.send(&iq).await?;
        let reply = stream.wait_for(|e| is_reply_to(e, &id)).await?;
        log::debug!("received reply to {}", id);
        Ok(reply)
    }

    /// Sends an XEP-0199 ping to `to` and returns its id.
    ///
    /// The pong is not awaited; it arrives through [`wait`](Self::wait) like
    /// any other stanza.
    pub async fn ping(&mut self, to: &str) -> Result<String, Error> {
        let id = make_id("ping");
        let ping = self.iq("get", &id, Some(to), Element::bare("ping", ns::PING));
        self.send(&ping).await?;
        Ok(id)
    }

    /// Answers the ping with id `id` from `to`.
    pub async fn pong(&mut self, to: &str, id: &str) -> Result<(), Error> {
        let pong = Element::builder("iq", ns::JABBER_CLIENT)
            .attr("from", self.config.full_jid())
            .attr("to", to)
            .attr("id", id)
            .attr("type", "result")
            .build();
        self.send(&pong).await
    }
}
