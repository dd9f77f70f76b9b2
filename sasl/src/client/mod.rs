// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Client-side mechanisms and the trait they implement.

use core::fmt;

use crate::common::Credentials;

pub mod mechanisms;

/// An error raised by a mechanism while processing server data.
#[derive(Debug, PartialEq, Eq)]
pub enum MechanismError {
    /// The credentials lack a username.
    NoUsername,
    /// The credentials lack a password.
    NoPassword,
    /// The server data is not valid UTF-8 or not `key=value` pairs.
    InvalidChallenge,
    /// The challenge has no `nonce`.
    MissingNonce,
    /// The challenge only offers protection levels we do not implement.
    UnsupportedQop(String),
    /// The server answered with data where none was expected.
    UnexpectedChallenge,
    /// The `rspauth` sent by the server does not prove knowledge of the
    /// password.
    InvalidServerSignature,
    /// The platform random number generator failed.
    Random(String),
}

impl fmt::Display for MechanismError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MechanismError::NoUsername => write!(fmt, "no username in credentials"),
            MechanismError::NoPassword => write!(fmt, "no password in credentials"),
            MechanismError::InvalidChallenge => write!(fmt, "malformed challenge"),
            MechanismError::MissingNonce => write!(fmt, "challenge carries no nonce"),
            MechanismError::UnsupportedQop(qop) => write!(fmt, "unsupported qop: {}", qop),
            MechanismError::UnexpectedChallenge => write!(fmt, "unexpected challenge"),
            MechanismError::InvalidServerSignature => {
                write!(fmt, "server sent an invalid rspauth")
            }
            MechanismError::Random(e) => write!(fmt, "random number generator failed: {}", e),
        }
    }
}

impl std::error::Error for MechanismError {}

/// A client-side SASL mechanism.
pub trait Mechanism {
    /// The IANA name of the mechanism, as advertised in stream features.
    fn name(&self) -> &str;

    /// Builds the mechanism from credentials.
    fn from_credentials(credentials: Credentials) -> Result<Self, MechanismError>
    where
        Self: Sized;

    /// The initial response sent along with `<auth/>`. Empty when the
    /// mechanism waits for the server to speak first.
    fn initial(&mut self) -> Vec<u8> {
        Vec::new()
    }

    /// Answers a server challenge.
    fn response(&mut self, _challenge: &[u8]) -> Result<Vec<u8>, MechanismError> {
        Err(MechanismError::UnexpectedChallenge)
    }

    /// Checks the additional data carried by the server's success.
    fn success(&mut self, data: &[u8]) -> Result<(), MechanismError> {
        if data.is_empty() {
            Ok(())
        } else {
            Err(MechanismError::UnexpectedChallenge)
        }
    }
}
