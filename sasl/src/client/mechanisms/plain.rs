// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Provides the SASL "PLAIN" mechanism.

use crate::client::{Mechanism, MechanismError};
use crate::common::Credentials;

/// A struct for the SASL PLAIN mechanism.
///
/// The whole exchange is the initial response
/// `authzid NUL authcid NUL password`.
pub struct Plain {
    authzid: String,
    username: String,
    password: String,
}

impl Plain {
    /// Constructs a new struct for authenticating using the SASL PLAIN
    /// mechanism.
    ///
    /// It is recommended that instead you use a `Credentials` struct and
    /// turn it into the requested mechanism using `from_credentials`.
    pub fn new<N: Into<String>, P: Into<String>>(username: N, password: P) -> Plain {
        Plain {
            authzid: String::new(),
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Mechanism for Plain {
    fn name(&self) -> &str {
        "PLAIN"
    }

    fn from_credentials(credentials: Credentials) -> Result<Plain, MechanismError> {
        let username = credentials.username.ok_or(MechanismError::NoUsername)?;
        let password = credentials.password.ok_or(MechanismError::NoPassword)?;
        Ok(Plain {
            authzid: credentials.authzid.unwrap_or_default(),
            username,
            password,
        })
    }

    fn initial(&mut self) -> Vec<u8> {
        let mut auth = Vec::with_capacity(
            self.authzid.len() + self.username.len() + self.password.len() + 2,
        );
        auth.extend(self.authzid.bytes());
        auth.push(0);
        auth.extend(self.username.bytes());
        auth.push(0);
        auth.extend(self.password.bytes());
        auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_without_authzid() {
        let mut plain = Plain::new("juliet", "r0m30");
        assert_eq!(plain.initial(), b"\0juliet\0r0m30".to_vec());
    }

    #[test]
    fn initial_with_authzid() {
        let creds = Credentials::default()
            .with_username("juliet")
            .with_password("r0m30")
            .with_authzid("juliet@capulet.lit");
        let mut plain = Plain::from_credentials(creds).unwrap();
        assert_eq!(
            plain.initial(),
            b"juliet@capulet.lit\0juliet\0r0m30".to_vec()
        );
    }

    #[test]
    fn missing_password() {
        let creds = Credentials::default().with_username("juliet");
        assert_eq!(
            Plain::from_credentials(creds).err(),
            Some(MechanismError::NoPassword)
        );
    }

    #[test]
    fn challenge_is_rejected() {
        let mut plain = Plain::new("juliet", "r0m30");
        assert_eq!(
            plain.response(b"nonce=\"x\""),
            Err(MechanismError::UnexpectedChallenge)
        );
    }
}
