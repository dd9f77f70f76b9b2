// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Typed, immutable views of received stanzas.
//!
//! Every view is built once from a parsed [`Element`] and never touches the
//! element again.

use minidom::Element;

use crate::ns;

/// Attributes common to every stanza.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StanzaHeader {
    /// The `from` attribute.
    pub from: Option<String>,
    /// The `to` attribute.
    pub to: Option<String>,
    /// The `id` attribute.
    pub id: Option<String>,
    /// The raw `type` attribute.
    pub type_: Option<String>,
}

impl From<&Element> for StanzaHeader {
    fn from(elem: &Element) -> StanzaHeader {
        let attr = |name: &str| elem.attr(name).map(String::from);
        StanzaHeader {
            from: attr("from"),
            to: attr("to"),
            id: attr("id"),
            type_: attr("type"),
        }
    }
}

/// Text carried in a given language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LangText {
    /// The text content.
    pub content: String,
    /// The `xml:lang` of the element carrying it, if any.
    pub lang: Option<String>,
}

impl From<&Element> for LangText {
    fn from(elem: &Element) -> LangText {
        LangText {
            content: elem.text(),
            lang: elem.attr("xml:lang").map(String::from),
        }
    }
}

/// The type of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    /// One-to-one chat.
    Chat,
    /// An error bounced back.
    Error,
    /// Multi-user chat.
    Groupchat,
    /// An alert or notification.
    Headline,
    /// Anything else.
    #[default]
    Normal,
}

impl MessageType {
    /// Maps the `type` attribute, falling back to `Normal` for anything
    /// unknown or missing.
    pub fn from_attr(attr: Option<&str>) -> MessageType {
        match attr {
            Some("chat") => MessageType::Chat,
            Some("error") => MessageType::Error,
            Some("groupchat") => MessageType::Groupchat,
            Some("headline") => MessageType::Headline,
            _ => MessageType::Normal,
        }
    }

    /// The attribute value.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Chat => "chat",
            MessageType::Error => "error",
            MessageType::Groupchat => "groupchat",
            MessageType::Headline => "headline",
            MessageType::Normal => "normal",
        }
    }
}

/// A received `<message/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Common attributes. `type_` holds the raw attribute.
    pub header: StanzaHeader,
    /// The message type.
    pub type_: MessageType,
    /// Text of the `<error/>` child; only set for error messages, and empty
    /// when they carry none.
    pub error: Option<String>,
    /// `xml:lang` of the message.
    pub lang: Option<String>,
    /// Every `<subject/>`, in document order.
    pub subjects: Vec<LangText>,
    /// Every `<body/>`, in document order.
    pub bodies: Vec<LangText>,
    /// Thread id; empty when there is none.
    pub thread: String,
    /// Whether the message carries a delayed delivery notice.
    pub delayed: bool,
}

impl From<&Element> for Message {
    fn from(elem: &Element) -> Message {
        let type_ = MessageType::from_attr(elem.attr("type"));
        let error = match type_ {
            MessageType::Error => Some(
                elem.children()
                    .find(|c| c.name() == "error")
                    .map(Element::text)
                    .unwrap_or_default(),
            ),
            _ => None,
        };
        Message {
            header: StanzaHeader::from(elem),
            type_,
            error,
            lang: elem.attr("xml:lang").map(String::from),
            subjects: elem
                .children()
                .filter(|c| c.name() == "subject")
                .map(LangText::from)
                .collect(),
            bodies: elem
                .children()
                .filter(|c| c.name() == "body")
                .map(LangText::from)
                .collect(),
            thread: elem
                .children()
                .find(|c| c.name() == "thread")
                .map(Element::text)
                .unwrap_or_default(),
            delayed: elem.has_child("delay", ns::DELAY),
        }
    }
}

impl Message {
    /// The first body without a language, or else the first body.
    pub fn body(&self) -> Option<&str> {
        self.bodies
            .iter()
            .find(|b| b.lang.is_none())
            .or_else(|| self.bodies.first())
            .map(|b| b.content.as_str())
    }
}

/// A received `<iq/>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Iq {
    /// Common attributes.
    pub header: StanzaHeader,
    /// The first child element, if any.
    pub payload: Option<Element>,
}

impl From<&Element> for Iq {
    fn from(elem: &Element) -> Iq {
        Iq {
            header: StanzaHeader::from(elem),
            payload: elem.children().next().cloned(),
        }
    }
}

/// A received `<presence/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presence {
    /// Common attributes.
    pub header: StanzaHeader,
    /// Content of `<show/>`.
    pub show: Option<String>,
    /// Content of the first `<status/>`.
    pub status: Option<String>,
    /// Content of `<priority/>`, when it is a valid priority.
    pub priority: Option<i8>,
}

impl From<&Element> for Presence {
    fn from(elem: &Element) -> Presence {
        let child_text = |name: &str| {
            elem.children()
                .find(|c| c.name() == name)
                .map(Element::text)
        };
        Presence {
            header: StanzaHeader::from(elem),
            show: child_text("show"),
            status: child_text("status"),
            priority: child_text("priority").and_then(|p| p.trim().parse().ok()),
        }
    }
}

/// Any received top-level element.
#[derive(Debug, Clone, PartialEq)]
pub enum Stanza {
    /// `<message/>`
    Message(Message),
    /// `<iq/>`
    Iq(Iq),
    /// `<presence/>`
    Presence(Presence),
    /// Anything else, named by its tag.
    Unknown(String, StanzaHeader),
}

impl From<&Element> for Stanza {
    fn from(elem: &Element) -> Stanza {
        match elem.name() {
            "message" => Stanza::Message(Message::from(elem)),
            "iq" => Stanza::Iq(Iq::from(elem)),
            "presence" => Stanza::Presence(Presence::from(elem)),
            name => Stanza::Unknown(name.to_owned(), StanzaHeader::from(elem)),
        }
    }
}

impl Stanza {
    /// Attributes common to every stanza.
    pub fn header(&self) -> &StanzaHeader {
        match self {
            Stanza::Message(m) => &m.header,
            Stanza::Iq(iq) => &iq.header,
            Stanza::Presence(p) => &p.header,
            Stanza::Unknown(_, header) => header,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(xml: &str) -> Element {
        xml.parse().unwrap()
    }

    #[test]
    fn message_fields() {
        let message = Message::from(&elem(
            "<message xmlns='jabber:client' from='romeo@montague.lit/orchard' to='juliet@capulet.lit' id='m1' type='chat' xml:lang='en'>\
                <subject>Balcony</subject>\
                <body>Art thou not Romeo?</body>\
                <body xml:lang='fr'>N'es-tu pas Roméo ?</body>\
                <thread>e0ffe42b28561960c6b12b944a092794b9683a38</thread>\
            </message>",
        ));
        assert_eq!(message.header.from.as_deref(), Some("romeo@montague.lit/orchard"));
        assert_eq!(message.header.id.as_deref(), Some("m1"));
        assert_eq!(message.type_, MessageType::Chat);
        assert_eq!(message.lang.as_deref(), Some("en"));
        assert_eq!(message.subjects.len(), 1);
        assert_eq!(message.bodies.len(), 2);
        assert_eq!(message.bodies[1].lang.as_deref(), Some("fr"));
        assert_eq!(message.body(), Some("Art thou not Romeo?"));
        assert_eq!(message.thread, "e0ffe42b28561960c6b12b944a092794b9683a38");
        assert_eq!(message.error, None);
        assert!(!message.delayed);
    }

    #[test]
    fn message_defaults() {
        let message = Message::from(&elem(
            "<message xmlns='jabber:client' type='bogus'><body>hi</body></message>",
        ));
        assert_eq!(message.type_, MessageType::Normal);
        assert_eq!(message.header.type_.as_deref(), Some("bogus"));
        assert_eq!(message.thread, "");
        assert_eq!(message.lang, None);
    }

    #[test]
    fn error_message() {
        let message = Message::from(&elem(
            "<message xmlns='jabber:client' type='error'><error type='cancel'>gone</error></message>",
        ));
        assert_eq!(message.type_, MessageType::Error);
        assert_eq!(message.error.as_deref(), Some("gone"));

        let message = Message::from(&elem("<message xmlns='jabber:client' type='error'/>"));
        assert_eq!(message.error.as_deref(), Some(""));
    }

    #[test]
    fn delayed_message() {
        let message = Message::from(&elem(
            "<message xmlns='jabber:client' type='groupchat'>\
                <body>old news</body>\
                <delay xmlns='urn:xmpp:delay' stamp='2002-09-10T23:08:25Z'/>\
            </message>",
        ));
        assert_eq!(message.type_, MessageType::Groupchat);
        assert!(message.delayed);

        // legacy XEP-0091 stamp
        let message = Message::from(&elem(
            "<message xmlns='jabber:client' type='groupchat'>\
                <body>old news</body>\
                <delay xmlns='jabber:x:delay' stamp='20020910T23:08:25'/>\
            </message>",
        ));
        assert!(!message.delayed);
    }

    #[test]
    fn iq_payload() {
        let iq = Iq::from(&elem(
            "<iq xmlns='jabber:client' type='get' id='p1'><ping xmlns='urn:xmpp:ping'/></iq>",
        ));
        assert_eq!(iq.header.type_.as_deref(), Some("get"));
        assert!(iq.payload.unwrap().is("ping", "urn:xmpp:ping"));
    }

    #[test]
    fn presence_fields() {
        let presence = Presence::from(&elem(
            "<presence xmlns='jabber:client' from='coven@chat.shakespeare.lit/thirdwitch'>\
                <show>away</show><status>brb</status><priority>-5</priority>\
            </presence>",
        ));
        assert_eq!(presence.show.as_deref(), Some("away"));
        assert_eq!(presence.status.as_deref(), Some("brb"));
        assert_eq!(presence.priority, Some(-5));
    }

    #[test]
    fn unknown_stanza() {
        let stanza = Stanza::from(&elem("<r xmlns='urn:xmpp:sm:3'/>"));
        assert_eq!(stanza, Stanza::Unknown("r".into(), StanzaHeader::default()));
    }
}
