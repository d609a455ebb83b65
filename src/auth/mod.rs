// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Authentication
//!
//! The Core Relay accepts a single shared bearer token, configured as
//! `coreApiToken` on both sides.
//!
//! ## Auth Flow
//!
//! 1. The console sends `Authorization: Bearer <token>` on every request
//! 2. The relay hashes the presented token with SHA-256 and compares it with
//!    the digest of its configured token
//! 3. `/health` and the API docs are served without a token
//!
//! ## Gaps
//!
//! - Without a configured token the relay serves unauthenticated and logs a
//!   warning at start-up.
//! - Client certificates (mutual TLS) are not supported.

pub mod error;
pub mod middleware;

pub use error::AuthError;
pub use middleware::{require_token, RelayAuth};
