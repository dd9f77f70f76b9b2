// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use sasl::client::MechanismError as SaslMechanismError;
use std::error::Error as StdError;
use std::fmt;
use std::io::Error as IoError;

use crate::{connect::starttls::StartTlsError, jid, minidom};

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// I/O error on the transport
    Io(IoError),
    /// Transport failure while establishing the connection
    Connect(Box<Error>),
    /// TLS upgrade failure
    Tls(StartTlsError),
    /// Error parsing Jabber-Id
    JidParse(jid::Error),
    /// Protocol-level error
    Protocol(ProtocolError),
    /// Authentication error
    Auth(AuthError),
    /// The most recent stanza is not of the requested kind
    UnexpectedStanza {
        /// Tag name that was requested
        expected: &'static str,
        /// Tag name of the most recent stanza, if any was received
        received: Option<String>,
    },
    /// A bounded wait expired before the awaited element arrived
    Timeout,
    /// No open stream, or the peer closed it
    Disconnected,
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(fmt, "IO error: {}", e),
            Error::Connect(e) => write!(fmt, "failed to connect: {}", e),
            Error::Tls(e) => write!(fmt, "TLS error: {}", e),
            Error::JidParse(e) => write!(fmt, "jid parse error: {}", e),
            Error::Protocol(e) => write!(fmt, "protocol error: {}", e),
            Error::Auth(e) => write!(fmt, "authentication error: {}", e),
            Error::UnexpectedStanza {
                expected,
                received: Some(received),
            } => write!(
                fmt,
                "last stanza received was <{}/>, not <{}/>",
                received, expected
            ),
            Error::UnexpectedStanza {
                expected,
                received: None,
            } => write!(fmt, "no stanza received yet, expected <{}/>", expected),
            Error::Timeout => write!(fmt, "timed out waiting for the server"),
            Error::Disconnected => write!(fmt, "disconnected"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Connect(e) => Some(e.as_ref()),
            Error::Tls(e) => Some(e),
            Error::JidParse(e) => Some(e),
            Error::Protocol(e) => Some(e),
            Error::Auth(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<StartTlsError> for Error {
    fn from(e: StartTlsError) -> Self {
        Error::Tls(e)
    }
}

impl From<jid::Error> for Error {
    fn from(e: jid::Error) -> Self {
        Error::JidParse(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

impl From<AuthError> for Error {
    fn from(e: AuthError) -> Self {
        Error::Auth(e)
    }
}

impl From<minidom::Error> for Error {
    fn from(e: minidom::Error) -> Self {
        ProtocolError::Parser(e).into()
    }
}

/// XMPP protocol-level error
#[derive(Debug)]
pub enum ProtocolError {
    /// Received bytes could not be parsed as XML, even after the stream
    /// envelope was repaired
    Parser(minidom::Error),
    /// Received bytes are not valid UTF-8
    Utf8(std::str::Utf8Error),
    /// The server sent a `<stream:error/>`
    StreamError(String),
    /// The server never sent `<stream:features/>`
    NoStreamFeatures,
    /// Invalid response to resource binding
    InvalidBindResponse,
    /// The server requires STARTTLS but TLS is disabled for this connection
    TlsRequired,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProtocolError::Parser(e) => write!(fmt, "malformed stream: {}", e),
            ProtocolError::Utf8(e) => write!(fmt, "malformed stream: {}", e),
            ProtocolError::StreamError(condition) => write!(fmt, "stream error: {}", condition),
            ProtocolError::NoStreamFeatures => write!(fmt, "no <stream:features/> received"),
            ProtocolError::InvalidBindResponse => {
                write!(fmt, "invalid response to resource binding")
            }
            ProtocolError::TlsRequired => {
                write!(fmt, "server requires STARTTLS but TLS is disabled")
            }
        }
    }
}

impl StdError for ProtocolError {}

impl From<minidom::Error> for ProtocolError {
    fn from(e: minidom::Error) -> Self {
        ProtocolError::Parser(e)
    }
}

/// Authentication error
#[derive(Debug)]
pub enum AuthError {
    /// No matching SASL mechanism available
    NoMechanism,
    /// Local SASL implementation error
    Sasl(SaslMechanismError),
    /// Failure from server, carrying the defined condition
    Fail(String),
}

impl StdError for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::NoMechanism => write!(fmt, "no matching SASL mechanism available"),
            AuthError::Sasl(s) => write!(fmt, "local SASL implementation error: {}", s),
            AuthError::Fail(c) => write!(fmt, "failure from the server: {}", c),
        }
    }
}

impl From<SaslMechanismError> for AuthError {
    fn from(e: SaslMechanismError) -> Self {
        AuthError::Sasl(e)
    }
}
