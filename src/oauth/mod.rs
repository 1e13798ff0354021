// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # OAuth Authority Client
//!
//! Everything that talks to the remote OAuth authority lives here.
//!
//! ## Pieces
//!
//! - `codec` - signed-envelope decoding (signature, expiry, clock-skew tolerance)
//! - `transport` - the authority's fixed operation table and HTTP plumbing
//! - `token` - the process-wide service token: lazy refresh, single-flight
//!   renewal, and the background renewal loop
//! - `error` - the error taxonomy shared by all of the above
//!
//! ## Trust model
//!
//! Every authority response is a JWT signed with the shared secret. Claims are
//! only ever read from a [`codec::SignedEnvelope`], which cannot be constructed
//! without signature verification succeeding.

pub mod codec;
pub mod error;
pub mod token;
pub mod transport;

pub use codec::{SignedEnvelope, TokenCodec};
pub use error::AuthError;
pub use token::{ServiceToken, ServiceTokenManager};
pub use transport::{AuthTransport, AuthorityOperation};
