// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use minidom::Element;

use crate::{
    client::{iq::make_id, Connection, ConnectionState},
    connect::ServerConnector,
    error::{Error, ProtocolError},
    jid::FullJid,
    ns,
};

/// Reads the JID out of a successful bind result, if the server sent one.
fn bound_jid(reply: &Element) -> Result<Option<FullJid>, ProtocolError> {
    if reply.attr("type") != Some("result") {
        return Err(ProtocolError::InvalidBindResponse);
    }
    let Some(jid) = reply
        .get_child("bind", ns::BIND)
        .and_then(|bind| bind.get_child("jid", ns::BIND))
    else {
        return Ok(None);
    };
    FullJid::new(jid.text().trim())
        .map(Some)
        .map_err(|_| ProtocolError::InvalidBindResponse)
}

impl<C: ServerConnector> Connection<C> {
    /// Binds the configured resource.
    pub async fn bind(&mut self) -> Result<(), Error> {
        let id = make_id("bind");
        let bind = Element::builder("bind", ns::BIND)
            .append(
                Element::builder("resource", ns::BIND)
                    .append(self.config.resource().to_owned())
                    .build(),
            )
            .build();
        let iq = Element::builder("iq", ns::JABBER_CLIENT)
            .attr("type", "set")
            .attr("id", id)
            .append(bind)
            .build();
        let reply = self.request(iq).await?;
        self.bound_jid = bound_jid(&reply)?;
        if let Some(jid) = &self.bound_jid {
            log::debug!("bound to {}", jid);
        }
        self.state = ConnectionState::Bound;
        Ok(())
    }

    /// Establishes the session with the legacy RFC 3921 iq.
    ///
    /// Servers which do not need it may answer with an error; that is
    /// logged and otherwise ignored.
    pub async fn establish_session(&mut self) -> Result<(), Error> {
        let id = make_id("sess");
        let iq = Element::builder("iq", ns::JABBER_CLIENT)
            .attr("to", self.config.domain())
            .attr("type", "set")
            .attr("id", id)
            .append(Element::bare("session", ns::SESSION))
            .build();
        let reply = self.request(iq).await?;
        if reply.attr("type") == Some("error") {
            log::warn!("server refused session establishment, continuing");
        }
        self.state = ConnectionState::SessionEstablished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(xml: &str) -> Element {
        xml.parse().unwrap()
    }

    #[test]
    fn bind_result_with_jid() {
        let reply = elem(
            "<iq xmlns='jabber:client' type='result' id='b'>\
                <bind xmlns='urn:ietf:params:xml:ns:xmpp-bind'><jid>juliet@capulet.lit/balcony</jid></bind>\
            </iq>",
        );
        let jid = bound_jid(&reply).unwrap().unwrap();
        assert_eq!(jid.to_string(), "juliet@capulet.lit/balcony");
    }

    #[test]
    fn bind_result_without_jid() {
        let reply = elem("<iq xmlns='jabber:client' type='result' id='b'/>");
        assert!(bound_jid(&reply).unwrap().is_none());
    }

    #[test]
    fn bind_error() {
        let reply = elem("<iq xmlns='jabber:client' type='error' id='b'/>");
        assert!(matches!(
            bound_jid(&reply),
            Err(ProtocolError::InvalidBindResponse)
        ));
    }
}
