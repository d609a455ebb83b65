// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Console-side client for the Core Relay.
//!
//! All chain reads and all submissions from the console go through
//! [`RelayApi`]. Requests use a fixed timeout and are never retried; a failed
//! call aborts the current workflow.

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use super::types::{ChainTip, ProtocolParams, StakeAddressInfo, TextEnvelope, Utxo};
use crate::config::OpsConfig;
use crate::models::{
    CoreKeysRequest, CoreKeysResponse, EpochResponse, KesPeriodResponse, StakeAddressResponse,
    SubmitTxRequest, SubmitTxResponse, UtxoResponse, VersionResponse,
};

/// Relay client errors.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("relay request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("relay request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("relay returned {status} for {endpoint}: {message}")]
    Status {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Operations the console needs from the relay.
#[async_trait]
pub trait RelayApi: Send + Sync {
    async fn cardano_version(&self) -> Result<String, RelayError>;
    async fn current_epoch(&self) -> Result<u64, RelayError>;
    async fn start_kes_period(&self) -> Result<u64, RelayError>;
    async fn stake_address_info(&self, address: &str) -> Result<StakeAddressInfo, RelayError>;
    async fn protocol_params(&self) -> Result<ProtocolParams, RelayError>;
    async fn utxo(&self, address: &str) -> Result<Vec<Utxo>, RelayError>;
    async fn tip(&self) -> Result<ChainTip, RelayError>;
    /// Submit a signed transaction; returns its hash.
    async fn submit_tx(&self, tx: &TextEnvelope) -> Result<String, RelayError>;
    /// One-way operational key handoff.
    async fn send_core_keys(&self, keys: &CoreKeysRequest) -> Result<(), RelayError>;
}

/// HTTP implementation of [`RelayApi`].
#[derive(Clone)]
pub struct RelayClient {
    base: Url,
    http: Client,
    token: Option<String>,
}

impl std::fmt::Debug for RelayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayClient")
            .field("base", &self.base.as_str())
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

impl RelayClient {
    pub fn new(
        base: &str,
        timeout: std::time::Duration,
        token: Option<String>,
    ) -> Result<Self, RelayError> {
        let base = Url::parse(base).map_err(|e| RelayError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(RelayError::InvalidUrl(base.to_string()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| RelayError::Transport {
                endpoint: base.to_string(),
                source,
            })?;
        Ok(Self { base, http, token })
    }

    pub fn from_config(config: &OpsConfig) -> Result<Self, RelayError> {
        Self::new(
            &config.core_api,
            config.request_timeout(),
            config.core_api_token.clone(),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, RelayError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, RelayError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(endpoint = %url.path(), "relay GET");
        let request = self.authorize(self.http.get(url.clone()));
        Self::decode(url, request.send().await).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, RelayError> {
        let url = self.endpoint(segments)?;
        tracing::debug!(endpoint = %url.path(), "relay POST");
        let request = self.authorize(self.http.post(url.clone()).json(body));
        Self::decode(url, request.send().await).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn decode<T: DeserializeOwned>(
        url: Url,
        sent: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<T, RelayError> {
        let endpoint = url.path().to_string();
        let response = sent.map_err(|source| transport(&endpoint, source))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(status, response.text().await.unwrap_or_default());
            return Err(RelayError::Status {
                endpoint,
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(|source| {
            if source.is_timeout() {
                RelayError::Timeout { endpoint: endpoint.clone() }
            } else {
                RelayError::Decode {
                    endpoint: endpoint.clone(),
                    source,
                }
            }
        })
    }
}

fn transport(endpoint: &str, source: reqwest::Error) -> RelayError {
    if source.is_timeout() {
        RelayError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        RelayError::Transport {
            endpoint: endpoint.to_string(),
            source,
        }
    }
}

/// Prefer the `{error}` field of the relay's JSON error body.
fn error_message(status: StatusCode, body: String) -> String {
    serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("error").to_string()
            } else {
                body
            }
        })
}

#[async_trait]
impl RelayApi for RelayClient {
    async fn cardano_version(&self) -> Result<String, RelayError> {
        let body: VersionResponse = self.get(&["cardano-version"]).await?;
        Ok(body.version)
    }

    async fn current_epoch(&self) -> Result<u64, RelayError> {
        let body: EpochResponse = self.get(&["current-epoch"]).await?;
        Ok(body.epoch)
    }

    async fn start_kes_period(&self) -> Result<u64, RelayError> {
        let body: KesPeriodResponse = self.get(&["start-kes-period"]).await?;
        Ok(body.start_kes_period)
    }

    async fn stake_address_info(&self, address: &str) -> Result<StakeAddressInfo, RelayError> {
        let body: StakeAddressResponse = self.get(&["query-stake-address", address]).await?;
        Ok(body.stake_addr)
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, RelayError> {
        self.get(&["query-protocol-params"]).await
    }

    async fn utxo(&self, address: &str) -> Result<Vec<Utxo>, RelayError> {
        let body: UtxoResponse = self.get(&["query-utxo", address]).await?;
        Ok(body.utxo)
    }

    async fn tip(&self) -> Result<ChainTip, RelayError> {
        self.get(&["query-tip"]).await
    }

    async fn submit_tx(&self, tx: &TextEnvelope) -> Result<String, RelayError> {
        let body: SubmitTxResponse = self
            .post(&["submit-tx"], &SubmitTxRequest { tx: tx.clone() })
            .await?;
        Ok(body.tx_hash)
    }

    async fn send_core_keys(&self, keys: &CoreKeysRequest) -> Result<(), RelayError> {
        let body: CoreKeysResponse = self.post(&["receive-core-keys"], keys).await?;
        if body.success {
            Ok(())
        } else {
            Err(RelayError::Status {
                endpoint: "/receive-core-keys".to_string(),
                status: 200,
                message: "relay reported failure".to_string(),
            })
        }
    }
}
