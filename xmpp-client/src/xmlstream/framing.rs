// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns a chunk of an XMPP stream into a standalone XML document.
//!
//! The server opens `<stream:stream>` once and leaves it open until the
//! session ends, and after STARTTLS or SASL success it opens a new one
//! without closing the old. A chunk read off the socket is therefore rarely
//! well-formed on its own. [`normalize`] repairs the envelope so that the
//! chunk always parses as exactly one `<stream:stream/>` root whose children
//! are the received top-level elements.

use std::borrow::Cow;

use crate::ns;

const STREAM_OPEN: &str = "<stream:stream";
const STREAM_CLOSE: &str = "</stream:stream>";

/// A chunk of stream data, made parseable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// The repaired document.
    pub document: String,
    /// The chunk carried the server's `</stream:stream>`.
    pub closed: bool,
}

/// Repairs the stream envelope around `raw`.
///
/// - An XML declaration at the front is kept at the front.
/// - A chunk starting with the stream header gets a synthetic closing tag
///   unless it already carries one.
/// - A chunk without any stream header is wrapped in a synthetic
///   `<stream:stream>` declaring the stream, ack and client namespaces, with
///   `realm` as its `from`. A trailing `</stream:stream>` inside such a
///   chunk is the server ending the session and is reported as `closed`.
pub fn normalize(raw: &str, realm: &str) -> Normalized {
    let raw = raw.trim_start();
    let (prologue, body) = split_prologue(raw);
    let body = body.trim_start();

    if body.starts_with(STREAM_OPEN) {
        let closed = body.contains(STREAM_CLOSE);
        let mut document = String::with_capacity(prologue.len() + body.len() + STREAM_CLOSE.len());
        document.push_str(prologue);
        document.push_str(body);
        if !closed {
            document.push_str(STREAM_CLOSE);
        }
        return Normalized { document, closed };
    }

    if body.contains(STREAM_OPEN) {
        // Data in front of a stream restart. Leave it to the parser to
        // reject rather than guess.
        return Normalized {
            document: format!("{}{}", prologue, body),
            closed: false,
        };
    }

    let (inner, closed) = match body.trim_end().strip_suffix(STREAM_CLOSE) {
        Some(inner) => (inner, true),
        None => (body, false),
    };
    let document = format!(
        "{}<stream:stream xmlns:stream='{}' xmlns:ack='{}' xmlns='{}' from='{}' xml:lang='en' version='1.0'>{}{}",
        prologue,
        ns::STREAM,
        ns::SM_ACK,
        ns::JABBER_CLIENT,
        escape_attr(realm),
        inner,
        STREAM_CLOSE
    );
    Normalized { document, closed }
}

/// Escapes `value` for use inside a single- or double-quoted attribute.
fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '\'', '"']) {
        return Cow::Borrowed(value);
    }
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

fn split_prologue(raw: &str) -> (&str, &str) {
    if raw.starts_with("<?xml") {
        if let Some(end) = raw.find("?>") {
            return raw.split_at(end + 2);
        }
    }
    ("", raw)
}

/// Namespace URIs declared on the root start tag of `document`, in
/// declaration order.
pub fn declared_namespaces(document: &str) -> Vec<String> {
    let (_, body) = split_prologue(document.trim_start());
    let Some(start) = body.find('<') else {
        return Vec::new();
    };
    let Some(len) = body[start..].find('>') else {
        return Vec::new();
    };
    let mut tag = &body[start..start + len];
    let mut namespaces = Vec::new();
    while let Some(pos) = tag.find("xmlns") {
        tag = &tag[pos + "xmlns".len()..];
        let Some(eq) = tag.find('=') else {
            break;
        };
        let name = &tag[..eq];
        if !(name.is_empty() || name.starts_with(':')) {
            continue;
        }
        let value = tag[eq + 1..].trim_start();
        let Some(quote) = value.chars().next().filter(|c| *c == '\'' || *c == '"') else {
            break;
        };
        let value = &value[1..];
        let Some(end) = value.find(quote) else {
            break;
        };
        let uri = value[..end].to_owned();
        if !namespaces.contains(&uri) {
            namespaces.push(uri);
        }
        tag = &value[end + 1..];
    }
    namespaces
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "<stream:stream xmlns:stream='http://etherx.jabber.org/streams' xmlns='jabber:client' from='x' version='1.0'>";

    #[test]
    fn header_gets_closed() {
        let raw = format!("<?xml version='1.0'?>{}", HEADER);
        let normalized = normalize(&raw, "x");
        assert_eq!(
            normalized.document,
            format!("<?xml version='1.0'?>{}</stream:stream>", HEADER)
        );
        assert!(!normalized.closed);
    }

    #[test]
    fn fragment_gets_wrapped() {
        let normalized = normalize("<message><body>hi</body></message>", "capulet.lit");
        assert!(normalized
            .document
            .starts_with("<stream:stream xmlns:stream='http://etherx.jabber.org/streams'"));
        assert!(normalized.document.contains("from='capulet.lit'"));
        assert!(normalized
            .document
            .ends_with("<message><body>hi</body></message></stream:stream>"));
        assert!(!normalized.closed);
    }

    #[test]
    fn prologue_stays_in_front() {
        let normalized = normalize("<?xml version='1.0'?><presence/>", "x");
        assert!(normalized
            .document
            .starts_with("<?xml version='1.0'?><stream:stream "));
    }

    #[test]
    fn close_tag_is_detected() {
        let normalized = normalize("<message/></stream:stream>", "x");
        assert!(normalized.closed);
        assert_eq!(normalized.document.matches(STREAM_CLOSE).count(), 1);

        let normalized = normalize("</stream:stream>", "x");
        assert!(normalized.closed);
    }

    #[test]
    fn realm_is_escaped() {
        let normalized = normalize("<presence/>", "o'brien&co");
        assert!(normalized.document.contains("from='o&apos;brien&amp;co'"));
        let root: minidom::Element = normalized.document.parse().unwrap();
        assert_eq!(root.attr("from"), Some("o'brien&co"));
        assert_eq!(root.children().count(), 1);

        assert_eq!(escape_attr("capulet.lit"), "capulet.lit");
    }

    #[test]
    fn namespaces_in_declaration_order() {
        let normalized = normalize("<presence/>", "x");
        assert_eq!(
            declared_namespaces(&normalized.document),
            [ns::STREAM, ns::SM_ACK, ns::JABBER_CLIENT]
        );

        let raw = format!("<?xml version='1.0'?>{}", HEADER);
        assert_eq!(
            declared_namespaces(&raw),
            [ns::STREAM, ns::JABBER_CLIENT]
        );
    }

    #[test]
    fn double_quoted_namespaces() {
        let tag = r#"<stream:stream xmlns="jabber:client" xmlns:stream="http://etherx.jabber.org/streams">"#;
        assert_eq!(declared_namespaces(tag), [ns::JABBER_CLIENT, ns::STREAM]);
    }
}
