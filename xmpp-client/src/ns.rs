// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! XML namespaces used on the wire.

/// RFC 6120: XMPP Core
pub const JABBER_CLIENT: &str = "jabber:client";
/// RFC 6120: XMPP Core
pub const STREAM: &str = "http://etherx.jabber.org/streams";
/// RFC 6120: XMPP Core
pub const TLS: &str = "urn:ietf:params:xml:ns:xmpp-tls";
/// RFC 6120: XMPP Core
pub const SASL: &str = "urn:ietf:params:xml:ns:xmpp-sasl";
/// RFC 6120: XMPP Core
pub const BIND: &str = "urn:ietf:params:xml:ns:xmpp-bind";
/// RFC 6120: XMPP Core
pub const XMPP_STREAMS: &str = "urn:ietf:params:xml:ns:xmpp-streams";
/// RFC 3921: legacy session establishment
pub const SESSION: &str = "urn:ietf:params:xml:ns:xmpp-session";
/// XEP-0030: Service Discovery
pub const DISCO_INFO: &str = "http://jabber.org/protocol/disco#info";
/// XEP-0030: Service Discovery
pub const DISCO_ITEMS: &str = "http://jabber.org/protocol/disco#items";
/// XEP-0045: Multi-User Chat
pub const MUC: &str = "http://jabber.org/protocol/muc";
/// XEP-0198: Stream Management, historical namespace servers declared on
/// the stream root
pub const SM_ACK: &str = "http://www.xmpp.org/extensions/xep-0198.html#ns";
/// XEP-0199: XMPP Ping
pub const PING: &str = "urn:xmpp:ping";
/// XEP-0203: Delayed Delivery
pub const DELAY: &str = "urn:xmpp:delay";
