// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use minidom::Element;

use crate::{
    config::ConnectionConfig,
    connect::{ServerConnector, TcpServerConnector},
    error::Error,
    jid::{BareJid, FullJid, Jid},
    ns,
    stanza::{Iq, Message, MessageType, Presence, Stanza},
    xmlstream::{XmlStream, ANY},
};

mod bind;
mod iq;
mod login;
mod muc;

pub use muc::DiscoItem;

/// Values accepted for `<show/>`.
const SHOW_VALUES: [&str; 4] = ["away", "chat", "dnd", "xa"];

/// Where a [`Connection`] stands in the session lifecycle.
///
/// The negotiation states are passed twice: once before and once after
/// authentication (and once more in between when STARTTLS is used).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// Stream header sent, waiting for the server's.
    StreamOpen,
    /// `<stream:features/>` received.
    FeaturesKnown,
    /// `<starttls/>` sent, TLS handshake pending.
    TlsNegotiating,
    /// SASL exchange in progress.
    Authenticating,
    /// A resource has been bound.
    Bound,
    /// The session has been established; stanzas can flow.
    SessionEstablished,
    /// The stream has been closed by [`Connection::disconnect`].
    Terminated,
}

/// An XMPP client connection
///
/// Operations are driven one at a time by the caller: `&mut self` on every
/// one of them makes them non-reentrant. The usual sequence is
/// [`connect`](Self::connect), [`authenticate`](Self::authenticate),
/// [`bind`](Self::bind), [`establish_session`](Self::establish_session),
/// then [`presence`](Self::presence) and messaging. Incoming stanzas are
/// picked up with [`wait`](Self::wait) and inspected with
/// [`get_message`](Self::get_message) and friends.
///
/// No error is retried and no state is rolled back: after a failure the
/// connection stays where it was and should be
/// [`disconnect`](Self::disconnect)ed.
///
/// Dropping a connection drops the transport, which closes the socket
/// without sending `</stream:stream>`.
pub struct Connection<C: ServerConnector = TcpServerConnector> {
    config: ConnectionConfig,
    connector: C,
    stream: Option<XmlStream<C::Transport>>,
    state: ConnectionState,
    secure: bool,
    authenticated: bool,
    features: Option<Element>,
    mechanisms: Vec<String>,
    bound_jid: Option<FullJid>,
    joined_rooms: HashSet<BareJid>,
    items: Option<Vec<DiscoItem>>,
    last_stanza: Option<Element>,
}

impl Connection<TcpServerConnector> {
    /// Creates a connection which will reach the server over TCP.
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, TcpServerConnector)
    }
}

impl<C: ServerConnector> Connection<C> {
    /// Creates a connection which obtains its transport from `connector`.
    pub fn with_connector(config: ConnectionConfig, connector: C) -> Self {
        Connection {
            config,
            connector,
            stream: None,
            state: ConnectionState::Disconnected,
            secure: false,
            authenticated: false,
            features: None,
            mechanisms: Vec::new(),
            bound_jid: None,
            joined_rooms: HashSet::new(),
            items: None,
            last_stanza: None,
        }
    }

    /// The configuration this connection was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the stream runs over TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Whether SASL authentication succeeded.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The last `<stream:features/>` received.
    pub fn features(&self) -> Option<&Element> {
        self.features.as_ref()
    }

    /// SASL mechanisms offered by the server.
    pub fn mechanisms(&self) -> &[String] {
        &self.mechanisms
    }

    /// The full JID the server assigned at bind time, if it told us.
    pub fn bound_jid(&self) -> Option<&FullJid> {
        self.bound_jid.as_ref()
    }

    /// Rooms joined with [`join`](Self::join).
    pub fn joined_rooms(&self) -> &HashSet<BareJid> {
        &self.joined_rooms
    }

    /// Items found by [`discover_items`](Self::discover_items); `None`
    /// until discovery ran.
    pub fn items(&self) -> Option<&[DiscoItem]> {
        self.items.as_deref()
    }

    /// The stanza most recently returned by [`wait`](Self::wait).
    pub fn last_stanza(&self) -> Option<&Element> {
        self.last_stanza.as_ref()
    }

    fn stream_mut(&mut self) -> Result<&mut XmlStream<C::Transport>, Error> {
        self.stream.as_mut().ok_or(Error::Disconnected)
    }

    /// Sends a stanza built by the caller.
    pub async fn send(&mut self, stanza: &Element) -> Result<(), Error> {
        self.stream_mut()?.send(stanza).await
    }

    /// Sends presence.
    ///
    /// `show` must be one of `away`, `chat`, `dnd` or `xa`; otherwise it is
    /// left out. `priority` is the signed byte of RFC 6121 section 4.7.2.3,
    /// so only integers in -128..=127 are sent. Larger integers are
    /// dropped like any other invalid value rather than clamped. Without
    /// any argument a bare `<presence/>` is sent.
    pub async fn presence(
        &mut self,
        status: Option<&str>,
        show: Option<&str>,
        priority: Option<&str>,
    ) -> Result<(), Error> {
        let mut presence = Element::builder("presence", ns::JABBER_CLIENT);
        if status.is_some() || show.is_some() || priority.is_some() {
            presence = presence.attr("xml:lang", "en");
        }
        if let Some(status) = status {
            presence = presence.append(
                Element::builder("status", ns::JABBER_CLIENT)
                    .append(status.to_owned())
                    .build(),
            );
        }
        match show {
            Some(show) if SHOW_VALUES.contains(&show) => {
                presence = presence.append(
                    Element::builder("show", ns::JABBER_CLIENT)
                        .append(show.to_owned())
                        .build(),
                );
            }
            Some(show) => log::warn!("dropping invalid presence show {:?}", show),
            None => (),
        }
        match priority.map(|p| (p, p.trim().parse::<i8>())) {
            Some((_, Ok(priority))) => {
                presence = presence.append(
                    Element::builder("priority", ns::JABBER_CLIENT)
                        .append(priority.to_string())
                        .build(),
                );
            }
            Some((priority, Err(_))) => {
                log::warn!("dropping invalid presence priority {:?}", priority)
            }
            None => (),
        }
        self.send(&presence.build()).await
    }

    /// Sends `text` to `to`.
    ///
    /// When the bare JID of `to` is a joined room, the message goes to the
    /// room itself as `groupchat`; otherwise it is a `normal` message to
    /// `to` as given.
    pub async fn message(&mut self, to: &str, text: &str) -> Result<(), Error> {
        let bare = Jid::new(to)?.to_bare();
        let (to, type_) = if self.joined_rooms.contains(&bare) {
            (bare.to_string(), MessageType::Groupchat)
        } else {
            (to.to_owned(), MessageType::Normal)
        };
        let message = Element::builder("message", ns::JABBER_CLIENT)
            .attr("to", to)
            .attr("from", self.config.full_jid())
            .attr("type", type_.as_str())
            .attr("xml:lang", "en")
            .append(
                Element::builder("body", ns::JABBER_CLIENT)
                    .append(text.to_owned())
                    .build(),
            )
            .build();
        self.send(&message).await
    }

    /// Takes the next received stanza, whatever it is, and keeps it as the
    /// most recent one.
    ///
    /// Returns its tag name, or `None` when nothing arrived within one poll
    /// interval; the most recent stanza is then left as it was.
    pub async fn wait(&mut self) -> Result<Option<String>, Error> {
        let stream = self.stream_mut()?;
        let Some(stanza) = stream.pop(ANY).await? else {
            if stream.is_closed() {
                return Err(Error::Disconnected);
            }
            return Ok(None);
        };
        let name = stanza.name().to_owned();
        self.last_stanza = Some(stanza);
        Ok(Some(name))
    }

    fn last_named(&self, expected: &'static str) -> Result<&Element, Error> {
        match &self.last_stanza {
            Some(stanza) if stanza.name() == expected => Ok(stanza),
            other => Err(Error::UnexpectedStanza {
                expected,
                received: other.as_ref().map(|s| s.name().to_owned()),
            }),
        }
    }

    /// The most recent stanza as a message.
    pub fn get_message(&self) -> Result<Message, Error> {
        self.last_named("message").map(Message::from)
    }

    /// The most recent stanza as an iq.
    pub fn get_iq(&self) -> Result<Iq, Error> {
        self.last_named("iq").map(Iq::from)
    }

    /// The most recent stanza as a presence.
    pub fn get_presence(&self) -> Result<Presence, Error> {
        self.last_named("presence").map(Presence::from)
    }

    /// The most recent stanza, whatever its kind.
    pub fn get_stanza(&self) -> Option<Stanza> {
        self.last_stanza.as_ref().map(Stanza::from)
    }

    /// Closes the stream and the transport.
    ///
    /// Disconnecting an unconnected or already disconnected connection does
    /// nothing.
    pub async fn disconnect(&mut self) -> Result<(), Error> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        let result = stream.close().await;
        log::debug!("stream closed");
        self.state = ConnectionState::Terminated;
        result
    }
}
