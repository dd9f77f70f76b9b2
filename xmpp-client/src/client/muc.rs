// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Service discovery (XEP-0030) and multi-user chat (XEP-0045).

use minidom::Element;

use crate::{
    client::{iq::make_id, Connection},
    connect::ServerConnector,
    error::Error,
    jid::{BareJid, Jid},
    ns,
};

/// Node queried for the nickname a room reserved for us.
const RESERVED_NICK_NODE: &str = "x-roomuser-item";

/// An entity found by a disco#items query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoItem {
    /// Address of the item.
    pub jid: String,
    /// Human-readable name, if the server gave one.
    pub name: Option<String>,
}

fn items_of(reply: &Element) -> Vec<DiscoItem> {
    let Some(query) = reply.get_child("query", ns::DISCO_ITEMS) else {
        return Vec::new();
    };
    query
        .children()
        .filter(|c| c.is("item", ns::DISCO_ITEMS))
        .filter_map(|item| {
            Some(DiscoItem {
                jid: item.attr("jid")?.to_owned(),
                name: item.attr("name").map(String::from),
            })
        })
        .collect()
}

fn features_of(reply: &Element) -> Vec<String> {
    let Some(query) = reply.get_child("query", ns::DISCO_INFO) else {
        return Vec::new();
    };
    query
        .children()
        .filter(|c| c.is("feature", ns::DISCO_INFO))
        .filter_map(|feature| feature.attr("var").map(String::from))
        .collect()
}

fn reserved_nick_of(reply: &Element) -> Option<String> {
    reply
        .get_child("query", ns::DISCO_INFO)?
        .get_child("identity", ns::DISCO_INFO)?
        .attr("name")
        .filter(|name| !name.is_empty())
        .map(String::from)
}

fn is_from_room(elem: &Element, room: &BareJid) -> bool {
    elem.name() == "presence"
        && elem
            .attr("from")
            .and_then(|from| Jid::new(from).ok())
            .is_some_and(|from| from.to_bare() == *room)
}

impl<C: ServerConnector> Connection<C> {
    fn disco_query(&self, target: &str, xmlns: &str, node: Option<&str>) -> Element {
        let query = Element::builder("query", xmlns)
            .attr("node", node.map(String::from))
            .build();
        self.iq("get", &make_id("disco"), Some(target), query)
    }

    /// Asks the server which items (components, services) it hosts and
    /// caches the answer.
    pub async fn discover_items(&mut self) -> Result<&[DiscoItem], Error> {
        let domain = self.config.domain().to_owned();
        let query = self.disco_query(&domain, ns::DISCO_ITEMS, None);
        log::debug!("querying {} for items", domain);
        let reply = self.request(query).await?;
        let items = items_of(&reply);
        log::debug!("{} items found", items.len());
        Ok(self.items.insert(items).as_slice())
    }

    async fn query_features(&mut self, target: &str) -> Result<Vec<String>, Error> {
        let query = self.disco_query(target, ns::DISCO_INFO, None);
        let reply = self.request(query).await?;
        Ok(features_of(&reply))
    }

    /// Whether the server or any item it hosts supports multi-user chat.
    ///
    /// Items are discovered first if that has not happened yet, then every
    /// item and the server itself are asked for their features.
    pub async fn is_muc_supported(&mut self) -> Result<bool, Error> {
        if self.items.is_none() {
            self.discover_items().await?;
        }
        let mut targets: Vec<String> = self
            .items
            .iter()
            .flatten()
            .map(|item| item.jid.clone())
            .collect();
        targets.push(self.config.domain().to_owned());

        let mut supported = false;
        for target in targets {
            log::debug!("querying {} for MUC support", target);
            if self.query_features(&target).await?.iter().any(|f| f == ns::MUC) {
                supported = true;
            }
        }
        Ok(supported)
    }

    async fn request_reserved_nickname(
        &mut self,
        room: &BareJid,
    ) -> Result<Option<String>, Error> {
        let query = self.disco_query(
            &room.to_string(),
            ns::DISCO_INFO,
            Some(RESERVED_NICK_NODE),
        );
        log::debug!("querying for reserved nickname in {}", room);
        let reply = self.request(query).await?;
        Ok(reserved_nick_of(&reply))
    }

    /// Joins the room `room` as `nick` and returns the nickname used.
    ///
    /// Unless `override_reserved_nick` is set, the room is first asked for
    /// a nickname reserved for us, which is then used instead of `nick`.
    /// Returns once the room sent a presence back. Joining a room twice
    /// records it once.
    pub async fn join(
        &mut self,
        room: &str,
        nick: &str,
        override_reserved_nick: bool,
    ) -> Result<String, Error> {
        let room = BareJid::new(room)?;
        let nick = match override_reserved_nick {
            true => nick.to_owned(),
            false => self
                .request_reserved_nickname(&room)
                .await?
                .unwrap_or_else(|| nick.to_owned()),
        };

        let presence = Element::builder("presence", ns::JABBER_CLIENT)
            .attr("from", self.config.full_jid())
            .attr("to", format!("{}/{}", room, nick))
            .append(Element::bare("x", ns::MUC))
            .build();
        log::debug!("joining {} as {}", room, nick);
        let stream = self.stream_mut()?;
        stream.send(&presence).await?;
        stream.wait_for(|e| is_from_room(e, &room)).await?;

        if self.joined_rooms.insert(room.clone()) {
            log::debug!("joined {}", room);
        }
        Ok(nick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(xml: &str) -> Element {
        xml.parse().unwrap()
    }

    #[test]
    fn parse_items() {
        let reply = elem(
            "<iq xmlns='jabber:client' type='result' id='d'>\
                <query xmlns='http://jabber.org/protocol/disco#items'>\
                    <item jid='conference.capulet.lit' name='Chatrooms'/>\
                    <item jid='pubsub.capulet.lit'/>\
                    <item name='no jid'/>\
                </query>\
            </iq>",
        );
        assert_eq!(
            items_of(&reply),
            [
                DiscoItem {
                    jid: "conference.capulet.lit".into(),
                    name: Some("Chatrooms".into())
                },
                DiscoItem {
                    jid: "pubsub.capulet.lit".into(),
                    name: None
                },
            ]
        );
    }

    #[test]
    fn empty_items() {
        let reply = elem(
            "<iq xmlns='jabber:client' type='result' id='d'>\
                <query xmlns='http://jabber.org/protocol/disco#items'/>\
            </iq>",
        );
        assert!(items_of(&reply).is_empty());
        assert!(items_of(&elem("<iq xmlns='jabber:client' type='error' id='d'/>")).is_empty());
    }

    #[test]
    fn parse_features() {
        let reply = elem(
            "<iq xmlns='jabber:client' type='result' id='d'>\
                <query xmlns='http://jabber.org/protocol/disco#info'>\
                    <identity category='conference' type='text' name='Chatrooms'/>\
                    <feature var='http://jabber.org/protocol/disco#info'/>\
                    <feature var='http://jabber.org/protocol/muc'/>\
                </query>\
            </iq>",
        );
        assert_eq!(features_of(&reply), [ns::DISCO_INFO, ns::MUC]);
    }

    #[test]
    fn reserved_nick() {
        let reply = elem(
            "<iq xmlns='jabber:client' type='result' id='d'>\
                <query xmlns='http://jabber.org/protocol/disco#info' node='x-roomuser-item'>\
                    <identity category='conference' name='thirdwitch' type='text'/>\
                </query>\
            </iq>",
        );
        assert_eq!(reserved_nick_of(&reply).as_deref(), Some("thirdwitch"));

        let reply = elem(
            "<iq xmlns='jabber:client' type='result' id='d'>\
                <query xmlns='http://jabber.org/protocol/disco#info' node='x-roomuser-item'/>\
            </iq>",
        );
        assert_eq!(reserved_nick_of(&reply), None);
    }

    #[test]
    fn presence_from_room() {
        let room = BareJid::new("coven@chat.shakespeare.lit").unwrap();
        let occupant = elem(
            "<presence xmlns='jabber:client' from='coven@chat.shakespeare.lit/firstwitch'/>",
        );
        let other = elem("<presence xmlns='jabber:client' from='juliet@capulet.lit/balcony'/>");
        assert!(is_from_room(&occupant, &room));
        assert!(!is_from_room(&other, &room));
    }
}
