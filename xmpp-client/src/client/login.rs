// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use base64::{engine::general_purpose::STANDARD as Base64, Engine};
use minidom::Element;
use sasl::client::mechanisms::{DigestMd5, Plain};
use sasl::client::{Mechanism, MechanismError};
use sasl::common::Credentials;

use crate::{
    client::{Connection, ConnectionState},
    connect::{starttls::StartTlsError, ServerConnector, Transport},
    error::{AuthError, Error, ProtocolError},
    ns,
    xmlstream::XmlStream,
};

type MechanismConstructor = fn(Credentials) -> Result<Box<dyn Mechanism + Send>, MechanismError>;

fn digest_md5(creds: Credentials) -> Result<Box<dyn Mechanism + Send>, MechanismError> {
    Ok(Box::new(DigestMd5::from_credentials(creds)?))
}

fn plain(creds: Credentials) -> Result<Box<dyn Mechanism + Send>, MechanismError> {
    Ok(Box::new(Plain::from_credentials(creds)?))
}

/// Mechanisms we implement, most preferred first.
static LOCAL_MECHANISMS: [(&str, MechanismConstructor); 2] =
    [("DIGEST-MD5", digest_md5), ("PLAIN", plain)];

fn mechanisms_of(features: &Element) -> Option<Vec<String>> {
    let mechanisms = features.get_child("mechanisms", ns::SASL)?;
    Some(
        mechanisms
            .children()
            .filter(|c| c.is("mechanism", ns::SASL))
            .map(|c| c.text().trim().to_owned())
            .collect(),
    )
}

fn decode(text: &str) -> Result<Vec<u8>, AuthError> {
    let text = text.trim();
    if text == "=" {
        return Ok(Vec::new());
    }
    Base64
        .decode(text)
        .map_err(|_| AuthError::Sasl(MechanismError::InvalidChallenge))
}

fn sasl_element(name: &str, data: &[u8]) -> Element {
    let text = (!data.is_empty()).then(|| Base64.encode(data));
    Element::builder(name, ns::SASL).append_all(text).build()
}

fn failure_condition(failure: &Element) -> String {
    failure
        .children()
        .find(|c| c.name() != "text")
        .map(|c| c.name().to_owned())
        .unwrap_or_else(|| String::from("not-authorized"))
}

impl<C: ServerConnector> Connection<C> {
    /// Opens the transport and negotiates the stream up to the point where
    /// authentication can start, upgrading to TLS when the server offers it
    /// and TLS is enabled.
    ///
    /// Transport failures are reported as [`Error::Connect`].
    pub async fn connect(&mut self) -> Result<(), Error> {
        self.negotiate().await.map_err(|e| match e {
            Error::Io(_) | Error::Tls(_) => Error::Connect(Box::new(e)),
            e => e,
        })
    }

    async fn negotiate(&mut self) -> Result<(), Error> {
        let transport = self
            .connector
            .connect(self.config.host(), self.config.port())
            .await?;
        self.stream = Some(XmlStream::new(
            transport,
            self.config.domain(),
            self.config.timeouts(),
        ));
        self.state = ConnectionState::StreamOpen;
        self.secure = false;
        self.authenticated = false;
        self.bound_jid = None;
        self.mechanisms.clear();
        self.open_stream().await?;

        let starttls = self
            .features
            .as_ref()
            .and_then(|f| f.get_child("starttls", ns::TLS))
            .map(|s| s.has_child("required", ns::TLS));
        match starttls {
            Some(_) if self.config.tls() => self.starttls().await,
            Some(true) => Err(ProtocolError::TlsRequired.into()),
            Some(false) => {
                log::warn!("server offers STARTTLS but TLS is disabled");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Sends a stream header and waits for the server's header and
    /// features.
    async fn open_stream(&mut self) -> Result<(), Error> {
        let domain = self.config.domain().to_owned();
        let stream = self.stream_mut()?;
        stream.send_header(&domain).await?;
        self.state = ConnectionState::StreamOpen;

        let stream = self.stream_mut()?;
        let header = stream.wait_header().await?;
        log::debug!(
            "stream opened by {}, id {}",
            header.attr("from").unwrap_or("?"),
            header.attr("id").unwrap_or("?")
        );
        let features = match header.get_child("features", ns::STREAM) {
            Some(features) => features.clone(),
            None => stream
                .wait_for(|e| e.is("features", ns::STREAM))
                .await
                .map_err(|e| match e {
                    Error::Timeout => ProtocolError::NoStreamFeatures.into(),
                    e => e,
                })?,
        };

        if let Some(mechanisms) = mechanisms_of(&features) {
            log::debug!("server offers SASL mechanisms {:?}", mechanisms);
            self.mechanisms = mechanisms;
        }
        self.features = Some(features);
        self.state = ConnectionState::FeaturesKnown;
        Ok(())
    }

    async fn starttls(&mut self) -> Result<(), Error> {
        self.state = ConnectionState::TlsNegotiating;
        let domain = self.config.domain().to_owned();
        let stream = self.stream_mut()?;
        stream
            .send(&Element::builder("starttls", ns::TLS).build())
            .await?;
        let reply = stream
            .wait_for(|e| e.is("proceed", ns::TLS) || e.is("failure", ns::TLS))
            .await?;
        if reply.name() == "failure" {
            return Err(StartTlsError::Refused.into());
        }
        stream.transport_mut().upgrade_to_tls(&domain).await?;
        self.secure = true;
        self.open_stream().await
    }

    fn credentials(&self) -> Credentials {
        let creds = Credentials::default()
            .with_username(self.config.username())
            .with_password(self.config.password())
            .with_realm(self.config.domain());
        match self.config.realm() {
            Some(realm) => creds.with_authzid(format!("{}@{}", self.config.username(), realm)),
            None => creds,
        }
    }

    /// Authenticates with DIGEST-MD5, or PLAIN when the server does not
    /// offer DIGEST-MD5, then restarts the stream.
    pub async fn authenticate(&mut self) -> Result<(), Error> {
        let constructor = LOCAL_MECHANISMS
            .iter()
            .find(|(name, _)| self.mechanisms.iter().any(|m| m.as_str() == *name))
            .map(|(_, constructor)| *constructor)
            .ok_or(AuthError::NoMechanism)?;
        let mut mechanism = constructor(self.credentials()).map_err(AuthError::Sasl)?;
        log::debug!("authenticating with {}", mechanism.name());
        self.state = ConnectionState::Authenticating;

        let stream = self.stream_mut()?;
        let initial = mechanism.initial();
        let mut auth = sasl_element("auth", &initial);
        auth.set_attr("mechanism", mechanism.name());
        stream.send(&auth).await?;

        loop {
            let reply = stream
                .wait_for(|e| {
                    e.has_ns(ns::SASL) && matches!(e.name(), "challenge" | "success" | "failure")
                })
                .await?;
            match reply.name() {
                "challenge" => {
                    let challenge = decode(&reply.text())?;
                    let response = mechanism.response(&challenge).map_err(AuthError::Sasl)?;
                    stream.send(&sasl_element("response", &response)).await?;
                }
                "success" => {
                    let data = decode(&reply.text())?;
                    mechanism.success(&data).map_err(AuthError::Sasl)?;
                    break;
                }
                _ => return Err(AuthError::Fail(failure_condition(&reply)).into()),
            }
        }

        log::debug!("authenticated as {}", self.config.bare_jid());
        self.authenticated = true;
        self.open_stream().await
    }
}
