// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Connection parameters supplied when a [`Connection`](crate::Connection)
//! is built.

use core::time::Duration;

/// Default XMPP client-to-server port.
pub const DEFAULT_PORT: u16 = 5222;

/// Resource requested at bind time unless configured otherwise.
pub const DEFAULT_RESOURCE: &str = "NewXmpp";

/// Configuration for timeouts on an XML stream.
///
/// `poll` bounds one readiness wait on the transport: if no byte arrives
/// within it, a read attempt reports "nothing yet" rather than blocking.
/// `response` bounds every operation that waits for a specific element
/// from the server (the stream header, `<proceed/>`, SASL replies, iq
/// results, MUC presence).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Upper bound of a single readiness wait.
    pub poll: Duration,

    /// Upper bound of a wait for a specific element.
    pub response: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            poll: Duration::from_millis(200),
            response: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    /// Tight timeouts suitable for communicating on a fast LAN or
    /// localhost, and in tests.
    pub fn tight() -> Self {
        Self {
            poll: Duration::from_millis(10),
            response: Duration::from_secs(2),
        }
    }
}

/// Who to log in as and where to connect to.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    username: String,
    realm: Option<String>,
    password: String,
    host: String,
    port: u16,
    tls: bool,
    resource: String,
    timeouts: Timeouts,
}

impl ConnectionConfig {
    /// Creates a configuration from credentials and the host to connect to.
    ///
    /// `username` may be given as `user@realm`, in which case it is split on
    /// the first `@`.
    pub fn new<U: AsRef<str>, P: Into<String>, H: Into<String>>(
        username: U,
        password: P,
        host: H,
    ) -> ConnectionConfig {
        let (username, realm) = match username.as_ref().split_once('@') {
            Some((user, realm)) => (user.to_owned(), Some(realm.to_owned())),
            None => (username.as_ref().to_owned(), None),
        };
        ConnectionConfig {
            username,
            realm,
            password: password.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            tls: true,
            resource: String::from(DEFAULT_RESOURCE),
            timeouts: Timeouts::default(),
        }
    }

    /// Sets the TCP port.
    pub fn with_port(mut self, port: u16) -> ConnectionConfig {
        self.port = port;
        self
    }

    /// Enables or disables STARTTLS.
    pub fn with_tls(mut self, tls: bool) -> ConnectionConfig {
        self.tls = tls;
        self
    }

    /// Sets the resource requested at bind time.
    pub fn with_resource<R: Into<String>>(mut self, resource: R) -> ConnectionConfig {
        self.resource = resource.into();
        self
    }

    /// Sets the stream timeouts.
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> ConnectionConfig {
        self.timeouts = timeouts;
        self
    }

    /// Local part of the account.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Domain part of the account, if one was given.
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Password of the account.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Host to open the TCP connection to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port to open the TCP connection to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether STARTTLS is used when the server offers it.
    pub fn tls(&self) -> bool {
        self.tls
    }

    /// Resource requested at bind time.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Stream timeouts.
    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// The XMPP domain this account lives on: the realm, or the host when
    /// no realm was given.
    pub fn domain(&self) -> &str {
        self.realm.as_deref().unwrap_or(&self.host)
    }

    /// `user@domain`
    pub fn bare_jid(&self) -> String {
        format!("{}@{}", self.username, self.domain())
    }

    /// `user@domain/resource`
    pub fn full_jid(&self) -> String {
        format!("{}@{}/{}", self.username, self.domain(), self.resource)
    }
}
