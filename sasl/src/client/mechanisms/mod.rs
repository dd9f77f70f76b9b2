// Copyright (c) 2025 xmpp-client contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Provides a few SASL mechanisms.

#[cfg(feature = "digest-md5")]
mod digest_md5;
mod plain;

#[cfg(feature = "digest-md5")]
pub use self::digest_md5::{digest_response, rspauth, Challenge, DigestMd5};
pub use self::plain::Plain;
