// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A small [XMPP](https://xmpp.org/) client with asynchronous I/O using [tokio](https://tokio.rs/).
//!
//! # Getting started
//!
//! Build a [`ConnectionConfig`], turn it into a [`Connection`] and drive it
//! through the session lifecycle step by step:
//!
//! ```no_run
//! use xmpp_client::{Connection, ConnectionConfig};
//!
//! # async fn run() -> Result<(), xmpp_client::Error> {
//! let config = ConnectionConfig::new("juliet@capulet.lit", "pencil", "capulet.lit");
//! let mut conn = Connection::new(config);
//! conn.connect().await?;
//! conn.authenticate().await?;
//! conn.bind().await?;
//! conn.establish_session().await?;
//! conn.presence(None, None, None).await?;
//! conn.message("romeo@montague.lit", "Wherefore art thou?").await?;
//! while let Some(name) = conn.wait().await? {
//!     if name == "message" {
//!         println!("{:?}", conn.get_message()?.body());
//!     }
//! }
//! conn.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! Supported:
//! - [x] Plaintext TCP and STARTTLS (rustls)
//! - [x] SASL DIGEST-MD5, with PLAIN as fallback
//! - [x] Resource binding and legacy session establishment
//! - [x] Service discovery, multi-user chat joins, XMPP ping
//! - [x] Custom transports via the [`connect::ServerConnector`] trait
//! - [ ] SCRAM, stream management, BOSH, websockets

#![deny(unsafe_code, missing_docs, bare_trait_objects)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod config;
pub mod connect;
/// Detailed error types
pub mod error;
pub mod ns;
pub mod stanza;
pub mod xmlstream;

mod client;
pub use client::{Connection, ConnectionState, DiscoItem};

#[doc(inline)]
pub use crate::config::{ConnectionConfig, Timeouts};
#[doc(inline)]
/// Generic xmpp_client Error
pub use crate::error::Error;

// Re-exports
pub use jid;
pub use minidom;

#[cfg(test)]
mod test_util;
