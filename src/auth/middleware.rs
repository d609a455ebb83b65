// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer-token middleware for the relay routes.
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/query-tip", get(query_tip))
//!     .route_layer(axum::middleware::from_fn_with_state(auth, require_token));
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use sha2::{Digest, Sha256};

use super::AuthError;

/// Configured relay token, kept only as its SHA-256 digest.
#[derive(Clone, Default)]
pub struct RelayAuth {
    digest: Option<[u8; 32]>,
}

impl std::fmt::Debug for RelayAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayAuth")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl RelayAuth {
    /// `None` disables authentication.
    pub fn new(token: Option<&str>) -> Self {
        Self {
            digest: token.map(digest),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.digest.is_some()
    }

    /// Whether `presented` matches the configured token. Always true when
    /// authentication is disabled.
    pub fn verify(&self, presented: &str) -> bool {
        match &self.digest {
            Some(expected) => {
                let presented = digest(presented);
                expected
                    .iter()
                    .zip(presented.iter())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
            }
            None => true,
        }
    }
}

fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Reject requests without the configured bearer token.
pub async fn require_token(
    State(auth): State<RelayAuth>,
    request: Request,
    next: Next,
) -> Response {
    if !auth.is_enabled() {
        return next.run(request).await;
    }

    let token = match bearer_token(&request) {
        Ok(token) => token,
        Err(err) => {
            tracing::warn!(path = %request.uri().path(), code = err.error_code(), "relay request rejected");
            return err.into_response();
        }
    };

    if !auth.verify(token) {
        tracing::warn!(path = %request.uri().path(), "relay request with invalid token");
        return AuthError::InvalidToken.into_response();
    }

    next.run(request).await
}

fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?;
    let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidAuthHeader)
}
