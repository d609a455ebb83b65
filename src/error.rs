// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Error types.
//!
//! - [`ApiError`] is what relay handlers return: a status code and a
//!   `{error}` JSON body.
//! - [`OpsError`] is what console workflows return. Its variants follow the
//!   operator-facing failure taxonomy; none of them carries a passphrase or
//!   key material.

use std::io;
use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::blockchain::{LedgerError, RelayError};
use crate::config::ConfigError;
use crate::process::ProcessError;
use crate::storage::{KeyStoreError, VaultError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// The node rejected or failed a request. Details stay in the relay log.
    pub fn node_failure() -> Self {
        Self::new(
            StatusCode::BAD_GATEWAY,
            "node request failed; check the relay log for details",
        )
    }

    /// The node refused a submitted transaction. Its reason goes back to
    /// the console so the operator can tell a ledger rule failure from an
    /// outage.
    pub fn node_rejection(err: &LedgerError) -> Self {
        let reason = match err {
            LedgerError::Process(ProcessError::Failed { stderr, .. }) => stderr.trim(),
            LedgerError::Parse { detail, .. } => detail.trim(),
            _ => "",
        };
        if reason.is_empty() {
            return Self::node_failure();
        }
        Self::new(
            StatusCode::BAD_GATEWAY,
            format!("node rejected the transaction: {reason}"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Console workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum OpsError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("owner wallet `{name}` not found (missing {missing})")]
    WalletNotFound { name: String, missing: PathBuf },

    #[error("pool `{name}` not found (missing {missing})")]
    PoolNotFound { name: String, missing: PathBuf },

    #[error("wallet balance is too low: {available} lovelace available, {required} required")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("{component} version {local} does not match relay version {relay}")]
    VersionMismatch {
        component: &'static str,
        local: String,
        relay: String,
    },

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("transaction submission failed: {0}")]
    Submission(#[source] RelayError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("pool cold signing key not found at {0}")]
    ColdKeyMissing(PathBuf),

    #[error("required key file {0} does not exist")]
    MissingKeyFile(PathBuf),

    #[error(
        "no epoch can be chosen for retirement: current epoch {current}, \
         maximum retirement offset {max_offset}"
    )]
    RetirementWindowEmpty { current: u64, max_offset: u64 },

    #[error("asset quantities overflow")]
    ValueOverflow,

    #[error("operator input failed: {0}")]
    Prompt(#[source] io::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl OpsError {
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> OpsError {
        let path = path.into();
        move |source| OpsError::Io { path, source }
    }
}

impl From<KeyStoreError> for OpsError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::WalletNotFound { name, missing } => {
                OpsError::WalletNotFound { name, missing }
            }
            KeyStoreError::PoolNotFound { name, missing } => OpsError::PoolNotFound { name, missing },
            KeyStoreError::Io { path, source } => OpsError::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        assert_eq!(bad.message, "bad");

        let unauthorized = ApiError::unauthorized("no token");
        assert_eq!(unauthorized.status, StatusCode::UNAUTHORIZED);

        let node = ApiError::node_failure();
        assert_eq!(node.status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn key_store_errors_map_to_not_found() {
        let err: OpsError = KeyStoreError::PoolNotFound {
            name: "p".into(),
            missing: PathBuf::from("/v/p.node.vkey"),
        }
        .into();
        assert!(matches!(err, OpsError::PoolNotFound { .. }));
    }

    #[test]
    fn insufficient_funds_message() {
        let err = OpsError::InsufficientFunds {
            available: 2,
            required: 1_000_000,
        };
        assert_eq!(
            err.to_string(),
            "wallet balance is too low: 2 lovelace available, 1000000 required"
        );
    }
}
