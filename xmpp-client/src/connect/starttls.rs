// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! TLS session setup for the STARTTLS upgrade

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::{
    client::TlsStream,
    rustls::pki_types::{InvalidDnsNameError, ServerName},
    rustls::{ClientConfig, Error as TlsError, RootCertStore},
    TlsConnector,
};

use crate::Error;

fn root_store() -> Result<RootCertStore, Error> {
    let mut root_store = RootCertStore::empty();
    #[cfg(feature = "webpki-roots")]
    {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }
    #[cfg(feature = "rustls-native-certs")]
    {
        let (added, ignored) =
            root_store.add_parsable_certificates(rustls_native_certs::load_native_certs()?);
        log::debug!(
            "loaded {} native root certificates, ignored {}",
            added,
            ignored
        );
    }
    Ok(root_store)
}

/// Runs the TLS client handshake for `domain` over an already connected
/// stream.
pub(crate) async fn tls_handshake<S: AsyncRead + AsyncWrite + Unpin>(
    stream: S,
    domain: &str,
) -> Result<TlsStream<S>, Error> {
    let domain = ServerName::try_from(domain.to_owned()).map_err(StartTlsError::DnsNameError)?;
    let config = ClientConfig::builder()
        .with_root_certificates(root_store()?)
        .with_no_client_auth();
    let tls_stream = TlsConnector::from(Arc::new(config))
        .connect(domain, stream)
        .await?;
    Ok(tls_stream)
}

/// StartTLS Error
#[derive(Debug)]
pub enum StartTlsError {
    /// TLS error
    Tls(TlsError),
    /// DNS name parsing error
    DnsNameError(InvalidDnsNameError),
    /// The server answered `<starttls/>` with `<failure/>`
    Refused,
    /// The transport has no plaintext connection left to upgrade
    NotPlaintext,
}

impl fmt::Display for StartTlsError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Tls(e) => write!(fmt, "TLS error: {}", e),
            Self::DnsNameError(e) => write!(fmt, "DNS name error: {}", e),
            Self::Refused => write!(fmt, "server refused STARTTLS"),
            Self::NotPlaintext => write!(fmt, "transport is not a plaintext connection"),
        }
    }
}

impl StdError for StartTlsError {}

impl From<TlsError> for StartTlsError {
    fn from(e: TlsError) -> Self {
        Self::Tls(e)
    }
}

impl From<InvalidDnsNameError> for StartTlsError {
    fn from(e: InvalidDnsNameError) -> Self {
        Self::DnsNameError(e)
    }
}
