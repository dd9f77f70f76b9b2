// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Types shared by all mechanisms.

/// The credentials a mechanism authenticates with.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    /// The authentication identity (the local part of the JID for XMPP).
    pub username: Option<String>,
    /// The password.
    pub password: Option<String>,
    /// The realm the user belongs to (the domain part of the JID).
    ///
    /// DIGEST-MD5 falls back to it when the server does not name one.
    pub realm: Option<String>,
    /// An authorization identity to act as, if different from the
    /// authentication identity.
    pub authzid: Option<String>,
}

impl Credentials {
    /// Sets the username.
    pub fn with_username<U: Into<String>>(mut self, username: U) -> Credentials {
        self.username = Some(username.into());
        self
    }

    /// Sets the password.
    pub fn with_password<P: Into<String>>(mut self, password: P) -> Credentials {
        self.password = Some(password.into());
        self
    }

    /// Sets the realm.
    pub fn with_realm<R: Into<String>>(mut self, realm: R) -> Credentials {
        self.realm = Some(realm.into());
        self
    }

    /// Sets the authorization identity.
    pub fn with_authzid<A: Into<String>>(mut self, authzid: A) -> Credentials {
        self.authzid = Some(authzid.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let creds = Credentials::default()
            .with_username("romeo")
            .with_password("juliet")
            .with_realm("montague.lit");
        assert_eq!(creds.username.as_deref(), Some("romeo"));
        assert_eq!(creds.password.as_deref(), Some("juliet"));
        assert_eq!(creds.realm.as_deref(), Some("montague.lit"));
        assert_eq!(creds.authzid, None);
    }
}
