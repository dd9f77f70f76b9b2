// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Client side of the SASL mechanisms an XMPP client needs against older
//! servers: `DIGEST-MD5` ([RFC 2831](https://tools.ietf.org/html/rfc2831))
//! and `PLAIN` ([RFC 4616](https://tools.ietf.org/html/rfc4616)).
//!
//! Mechanisms work on raw bytes. Base64 wrapping belongs to the protocol
//! carrying the exchange.
//!
//! ```
//! use sasl::client::mechanisms::Plain;
//! use sasl::client::Mechanism;
//! use sasl::common::Credentials;
//!
//! let creds = Credentials::default()
//!     .with_username("user")
//!     .with_password("pencil");
//! let mut mechanism = Plain::from_credentials(creds).unwrap();
//! assert_eq!(mechanism.name(), "PLAIN");
//! assert_eq!(mechanism.initial(), b"\0user\0pencil");
//! ```

#![deny(missing_docs, bare_trait_objects)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod client;
pub mod common;
