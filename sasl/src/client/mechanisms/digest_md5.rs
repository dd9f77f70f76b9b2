// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Provides the SASL "DIGEST-MD5" mechanism, as far as XMPP servers use it:
//! authentication only (`qop=auth`), no integrity or confidentiality layer.

use std::collections::HashMap;

use md5::{Digest, Md5};

use crate::client::{Mechanism, MechanismError};
use crate::common::Credentials;

const NONCE_COUNT: &str = "00000001";
const SERVICE: &str = "xmpp";

/// The directives of a server challenge, with quotes removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Challenge {
    directives: HashMap<String, String>,
}

impl Challenge {
    /// Parses a decoded challenge of comma-separated `key=value` or
    /// `key="value"` directives.
    ///
    /// Commas inside quoted values do not split directives.
    pub fn parse(data: &[u8]) -> Result<Challenge, MechanismError> {
        let data = core::str::from_utf8(data).map_err(|_| MechanismError::InvalidChallenge)?;
        let mut directives = HashMap::new();
        for part in split_directives(data) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or(MechanismError::InvalidChallenge)?;
            directives.insert(
                key.trim().to_owned(),
                value.trim().trim_matches('"').to_owned(),
            );
        }
        Ok(Challenge { directives })
    }

    /// Returns the value of a directive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.directives.get(key).map(String::as_str)
    }

    /// Whether the directive is present.
    pub fn contains(&self, key: &str) -> bool {
        self.directives.contains_key(key)
    }

    /// Number of directives.
    pub fn len(&self) -> usize {
        self.directives.len()
    }

    /// Whether no directive was found.
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    /// Fills in `realm` when the server left it out, which ejabberd does.
    pub fn with_default_realm(mut self, realm: Option<&str>) -> Challenge {
        if let Some(realm) = realm {
            self.directives
                .entry(String::from("realm"))
                .or_insert_with(|| realm.to_owned());
        }
        self
    }
}

fn split_directives(data: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = data.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            '\\' if quoted => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ',' if !quoted => parts.push(core::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

fn ha1(username: &str, realm: &str, password: &str, nonce: &str, cnonce: &str) -> String {
    let mut a1 = Md5::digest(format!("{}:{}:{}", username, realm, password).as_bytes()).to_vec();
    a1.extend_from_slice(format!(":{}:{}", nonce, cnonce).as_bytes());
    md5_hex(&a1)
}

fn kd(ha1: &str, nonce: &str, cnonce: &str, qop: &str, ha2: &str) -> String {
    md5_hex(format!("{}:{}:{}:{}:{}:{}", ha1, nonce, NONCE_COUNT, cnonce, qop, ha2).as_bytes())
}

/// Computes the `response` directive of RFC 2831 §2.1.2.1 for
/// nonce-count `00000001`.
pub fn digest_response(
    username: &str,
    realm: &str,
    password: &str,
    nonce: &str,
    cnonce: &str,
    qop: &str,
    digest_uri: &str,
) -> String {
    let ha1 = ha1(username, realm, password, nonce, cnonce);
    let ha2 = md5_hex(format!("AUTHENTICATE:{}", digest_uri).as_bytes());
    kd(&ha1, nonce, cnonce, qop, &ha2)
}

/// Computes the `rspauth` value the server must send back after a
/// successful `response` (RFC 2831 §2.1.3).
pub fn rspauth(
    username: &str,
    realm: &str,
    password: &str,
    nonce: &str,
    cnonce: &str,
    qop: &str,
    digest_uri: &str,
) -> String {
    let ha1 = ha1(username, realm, password, nonce, cnonce);
    let ha2 = md5_hex(format!(":{}", digest_uri).as_bytes());
    kd(&ha1, nonce, cnonce, qop, &ha2)
}

fn make_cnonce() -> Result<String, MechanismError> {
    let mut rand = [0u8; 16];
    getrandom::getrandom(&mut rand).map_err(|e| MechanismError::Random(e.to_string()))?;
    Ok(hex::encode(rand))
}

fn select_qop(offered: Option<&str>) -> Result<String, MechanismError> {
    match offered {
        None => Ok(String::from("auth")),
        Some(offered) if offered.split(',').any(|qop| qop.trim() == "auth") => {
            Ok(String::from("auth"))
        }
        Some(offered) => Err(MechanismError::UnsupportedQop(offered.to_owned())),
    }
}

enum State {
    Initial,
    ResponseSent { expected_rspauth: String },
    Done,
}

/// A struct for the SASL DIGEST-MD5 mechanism.
pub struct DigestMd5 {
    username: String,
    password: String,
    realm: Option<String>,
    state: State,
}

impl DigestMd5 {
    /// Constructs a new struct for authenticating using the SASL DIGEST-MD5
    /// mechanism.
    pub fn new<N: Into<String>, P: Into<String>>(
        username: N,
        password: P,
        realm: Option<String>,
    ) -> DigestMd5 {
        DigestMd5 {
            username: username.into(),
            password: password.into(),
            realm,
            state: State::Initial,
        }
    }

    fn respond_with_cnonce(
        &mut self,
        challenge: &[u8],
        cnonce: &str,
    ) -> Result<Vec<u8>, MechanismError> {
        let challenge = Challenge::parse(challenge)?.with_default_realm(self.realm.as_deref());
        let nonce = challenge.get("nonce").ok_or(MechanismError::MissingNonce)?;
        let realm = challenge.get("realm").unwrap_or("");
        let qop = select_qop(challenge.get("qop"))?;
        let charset = challenge.get("charset").unwrap_or("utf-8");
        let digest_uri = format!("{}/{}", SERVICE, realm);

        let response = digest_response(
            &self.username,
            realm,
            &self.password,
            nonce,
            cnonce,
            &qop,
            &digest_uri,
        );
        let expected_rspauth = rspauth(
            &self.username,
            realm,
            &self.password,
            nonce,
            cnonce,
            &qop,
            &digest_uri,
        );

        let reply = format!(
            "username=\"{}\",realm=\"{}\",nonce=\"{}\",cnonce=\"{}\",nc={},qop={},digest-uri=\"{}\",response={},charset={}",
            self.username, realm, nonce, cnonce, NONCE_COUNT, qop, digest_uri, response, charset
        );
        self.state = State::ResponseSent { expected_rspauth };
        Ok(reply.into_bytes())
    }

    fn verify_rspauth(&mut self, data: &[u8]) -> Result<(), MechanismError> {
        let State::ResponseSent { expected_rspauth } = &self.state else {
            return Err(MechanismError::UnexpectedChallenge);
        };
        let challenge = Challenge::parse(data)?;
        let valid = match challenge.get("rspauth") {
            Some(rspauth) => rspauth == expected_rspauth.as_str(),
            None => return Err(MechanismError::InvalidChallenge),
        };
        if !valid {
            return Err(MechanismError::InvalidServerSignature);
        }
        self.state = State::Done;
        Ok(())
    }
}

impl Mechanism for DigestMd5 {
    fn name(&self) -> &str {
        "DIGEST-MD5"
    }

    fn from_credentials(credentials: Credentials) -> Result<DigestMd5, MechanismError> {
        let username = credentials.username.ok_or(MechanismError::NoUsername)?;
        let password = credentials.password.ok_or(MechanismError::NoPassword)?;
        Ok(DigestMd5::new(username, password, credentials.realm))
    }

    fn response(&mut self, challenge: &[u8]) -> Result<Vec<u8>, MechanismError> {
        match self.state {
            State::Initial => {
                let cnonce = make_cnonce()?;
                self.respond_with_cnonce(challenge, &cnonce)
            }
            // The second challenge only carries rspauth and is answered
            // with an empty response.
            State::ResponseSent { .. } => {
                self.verify_rspauth(challenge)?;
                Ok(Vec::new())
            }
            State::Done => Err(MechanismError::UnexpectedChallenge),
        }
    }

    fn success(&mut self, data: &[u8]) -> Result<(), MechanismError> {
        match self.state {
            State::ResponseSent { .. } if !data.is_empty() => self.verify_rspauth(data),
            State::ResponseSent { .. } | State::Done => Ok(()),
            State::Initial => Err(MechanismError::UnexpectedChallenge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_map(reply: &[u8]) -> Challenge {
        Challenge::parse(reply).unwrap()
    }

    #[test]
    fn rfc2831_response() {
        let response = digest_response(
            "chris",
            "elwood.innosoft.com",
            "secret",
            "OA6MG9tEQGm2hh",
            "OA6MHXh6VqTrRk",
            "auth",
            "imap/elwood.innosoft.com",
        );
        assert_eq!(response, "d388dad90d4bbd760a152321f2143af7");
    }

    #[test]
    fn rfc2831_rspauth() {
        let rspauth = rspauth(
            "chris",
            "elwood.innosoft.com",
            "secret",
            "OA6MG9tEQGm2hh",
            "OA6MHXh6VqTrRk",
            "auth",
            "imap/elwood.innosoft.com",
        );
        assert_eq!(rspauth, "ea40f60335c427b5527b84dbabcdfffd");
    }

    #[test]
    fn parse_challenge() {
        let challenge =
            Challenge::parse(b"realm=\"example.com\",nonce=\"abc123\",qop=\"auth\",charset=utf-8")
                .unwrap();
        assert_eq!(challenge.len(), 4);
        assert_eq!(challenge.get("realm"), Some("example.com"));
        assert_eq!(challenge.get("nonce"), Some("abc123"));
        assert_eq!(challenge.get("qop"), Some("auth"));
        assert_eq!(challenge.get("charset"), Some("utf-8"));
        assert!(!challenge.contains("algorithm"));
    }

    #[test]
    fn parse_challenge_default_realm() {
        let challenge = Challenge::parse(b"nonce=\"abc123\",qop=\"auth\"")
            .unwrap()
            .with_default_realm(Some("capulet.lit"));
        assert_eq!(challenge.get("realm"), Some("capulet.lit"));

        let challenge = Challenge::parse(b"realm=\"server.lit\",nonce=\"abc123\"")
            .unwrap()
            .with_default_realm(Some("capulet.lit"));
        assert_eq!(challenge.get("realm"), Some("server.lit"));
    }

    #[test]
    fn parse_challenge_quoted_comma() {
        let challenge =
            Challenge::parse(b"nonce=\"a,b\",qop=\"auth,auth-int\",algorithm=md5-sess").unwrap();
        assert_eq!(challenge.get("nonce"), Some("a,b"));
        assert_eq!(challenge.get("qop"), Some("auth,auth-int"));
        assert_eq!(challenge.get("algorithm"), Some("md5-sess"));
    }

    #[test]
    fn parse_invalid_challenge() {
        assert_eq!(
            Challenge::parse(b"nonce"),
            Err(MechanismError::InvalidChallenge)
        );
        assert_eq!(
            Challenge::parse(&[0xff, 0xfe]),
            Err(MechanismError::InvalidChallenge)
        );
    }

    #[test]
    fn full_exchange() {
        let mut mechanism = DigestMd5::new("juliet", "r0m30", Some(String::from("capulet.lit")));
        assert!(mechanism.initial().is_empty());

        let reply = mechanism
            .respond_with_cnonce(
                b"nonce=\"OA6MG9tEQGm2hh\",qop=\"auth\",charset=utf-8,algorithm=md5-sess",
                "OA6MHXh6VqTrRk",
            )
            .unwrap();
        let reply = reply_map(&reply);
        assert_eq!(reply.get("username"), Some("juliet"));
        assert_eq!(reply.get("realm"), Some("capulet.lit"));
        assert_eq!(reply.get("nonce"), Some("OA6MG9tEQGm2hh"));
        assert_eq!(reply.get("cnonce"), Some("OA6MHXh6VqTrRk"));
        assert_eq!(reply.get("nc"), Some("00000001"));
        assert_eq!(reply.get("qop"), Some("auth"));
        assert_eq!(reply.get("digest-uri"), Some("xmpp/capulet.lit"));
        assert_eq!(reply.get("charset"), Some("utf-8"));
        let expected = digest_response(
            "juliet",
            "capulet.lit",
            "r0m30",
            "OA6MG9tEQGm2hh",
            "OA6MHXh6VqTrRk",
            "auth",
            "xmpp/capulet.lit",
        );
        assert_eq!(reply.get("response"), Some(expected.as_str()));

        let rspauth = rspauth(
            "juliet",
            "capulet.lit",
            "r0m30",
            "OA6MG9tEQGm2hh",
            "OA6MHXh6VqTrRk",
            "auth",
            "xmpp/capulet.lit",
        );
        let second = mechanism
            .response(format!("rspauth={}", rspauth).as_bytes())
            .unwrap();
        assert!(second.is_empty());
        mechanism.success(b"").unwrap();
    }

    #[test]
    fn rspauth_in_success() {
        let mut mechanism = DigestMd5::new("juliet", "r0m30", None);
        mechanism
            .respond_with_cnonce(b"realm=\"capulet.lit\",nonce=\"n\",qop=\"auth\"", "c")
            .unwrap();
        let rspauth = rspauth("juliet", "capulet.lit", "r0m30", "n", "c", "auth", "xmpp/capulet.lit");
        mechanism
            .success(format!("rspauth={}", rspauth).as_bytes())
            .unwrap();
    }

    #[test]
    fn wrong_rspauth() {
        let mut mechanism = DigestMd5::new("juliet", "r0m30", None);
        mechanism
            .respond_with_cnonce(b"realm=\"capulet.lit\",nonce=\"n\"", "c")
            .unwrap();
        assert_eq!(
            mechanism.response(b"rspauth=00000000000000000000000000000000"),
            Err(MechanismError::InvalidServerSignature)
        );
    }

    #[test]
    fn missing_nonce() {
        let mut mechanism = DigestMd5::new("juliet", "r0m30", None);
        assert_eq!(
            mechanism.response(b"realm=\"capulet.lit\",qop=\"auth\""),
            Err(MechanismError::MissingNonce)
        );
    }

    #[test]
    fn unsupported_qop() {
        let mut mechanism = DigestMd5::new("juliet", "r0m30", None);
        assert_eq!(
            mechanism.response(b"nonce=\"n\",qop=\"auth-conf\""),
            Err(MechanismError::UnsupportedQop(String::from("auth-conf")))
        );
    }

    #[test]
    fn random_cnonce_differs() {
        let mut first = DigestMd5::new("juliet", "r0m30", None);
        let mut second = DigestMd5::new("juliet", "r0m30", None);
        let challenge = b"realm=\"capulet.lit\",nonce=\"n\",qop=\"auth\"";
        let first = reply_map(&first.response(challenge).unwrap());
        let second = reply_map(&second.response(challenge).unwrap());
        assert_ne!(first.get("cnonce"), second.get("cnonce"));
    }
}
