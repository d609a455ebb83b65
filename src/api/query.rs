// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Read-only chain queries, answered by the local node.

use axum::{
    extract::{Path, State},
    Json,
};

use super::node_call;
use crate::{
    blockchain::ChainTip,
    error::ApiError,
    models::{EpochResponse, KesPeriodResponse, StakeAddressResponse, UtxoResponse, VersionResponse},
    state::AppState,
};

const MAX_ADDRESS_LEN: usize = 128;

/// Addresses are forwarded to the ledger CLI as arguments, so only bech32
/// text is accepted.
fn validate_address(address: &str) -> Result<(), ApiError> {
    let well_formed = !address.is_empty()
        && address.len() <= MAX_ADDRESS_LEN
        && address.contains('1')
        && address
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if well_formed {
        Ok(())
    } else {
        Err(ApiError::bad_request("address must be a bech32 string"))
    }
}

#[utoipa::path(
    get,
    path = "/cardano-version",
    tag = "Query",
    responses(
        (status = 200, description = "Node version", body = VersionResponse),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn cardano_version(
    State(state): State<AppState>,
) -> Result<Json<VersionResponse>, ApiError> {
    let version = node_call(&state, "node version", |node| node.node_version()).await?;
    Ok(Json(VersionResponse { version }))
}

#[utoipa::path(
    get,
    path = "/current-epoch",
    tag = "Query",
    responses(
        (status = 200, description = "Epoch of the chain tip", body = EpochResponse),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn current_epoch(State(state): State<AppState>) -> Result<Json<EpochResponse>, ApiError> {
    let tip = node_call(&state, "query tip", |node| node.query_tip()).await?;
    Ok(Json(EpochResponse { epoch: tip.epoch }))
}

#[utoipa::path(
    get,
    path = "/start-kes-period",
    tag = "Query",
    responses(
        (status = 200, description = "KES period of the chain tip", body = KesPeriodResponse),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn start_kes_period(
    State(state): State<AppState>,
) -> Result<Json<KesPeriodResponse>, ApiError> {
    let start_kes_period = node_call(&state, "kes period", |node| node.kes_period()).await?;
    Ok(Json(KesPeriodResponse { start_kes_period }))
}

#[utoipa::path(
    get,
    path = "/query-stake-address/{address}",
    tag = "Query",
    params(("address" = String, Path, description = "Bech32 stake address")),
    responses(
        (status = 200, description = "Registration entries; empty when unregistered", body = StakeAddressResponse),
        (status = 400, description = "Malformed address"),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn stake_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<StakeAddressResponse>, ApiError> {
    validate_address(&address)?;
    let stake_addr = node_call(&state, "stake address info", move |node| {
        node.stake_address_info(&address)
    })
    .await?;
    Ok(Json(StakeAddressResponse { stake_addr }))
}

#[utoipa::path(
    get,
    path = "/query-protocol-params",
    tag = "Query",
    responses(
        (status = 200, description = "Protocol parameters as reported by the node", body = crate::blockchain::ProtocolParams),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn protocol_params(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let params = node_call(&state, "protocol parameters", |node| node.protocol_params()).await?;
    Ok(Json(params))
}

#[utoipa::path(
    get,
    path = "/query-utxo/{address}",
    tag = "Query",
    params(("address" = String, Path, description = "Bech32 payment address")),
    responses(
        (status = 200, description = "UTXO set of the address", body = UtxoResponse),
        (status = 400, description = "Malformed address"),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn utxo(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<UtxoResponse>, ApiError> {
    validate_address(&address)?;
    let utxo = node_call(&state, "query utxo", move |node| node.utxo(&address)).await?;
    Ok(Json(UtxoResponse { utxo }))
}

#[utoipa::path(
    get,
    path = "/query-tip",
    tag = "Query",
    responses(
        (status = 200, description = "Chain tip", body = ChainTip),
        (status = 502, description = "Node request failed")
    )
)]
pub async fn tip(State(state): State<AppState>) -> Result<Json<ChainTip>, ApiError> {
    let tip = node_call(&state, "query tip", |node| node.query_tip()).await?;
    Ok(Json(tip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RelayAuth;
    use crate::blockchain::{TxIn, Utxo, Value};
    use crate::testing::FakeNode;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn state(node: FakeNode) -> AppState {
        AppState::new(Arc::new(node), "/nonexistent", RelayAuth::default())
    }

    #[test]
    fn address_validation() {
        assert!(validate_address("addr_test1qz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer").is_ok());
        assert!(validate_address("stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw").is_ok());
        assert!(validate_address("").is_err());
        assert!(validate_address("--socket-path").is_err());
        assert!(validate_address("addr_test1/../x").is_err());
        assert!(validate_address(&"a1".repeat(100)).is_err());
    }

    #[tokio::test]
    async fn epoch_comes_from_tip() {
        let Json(body) = current_epoch(State(state(FakeNode::default()))).await.unwrap();
        assert_eq!(body.epoch, 100);
    }

    #[tokio::test]
    async fn utxo_is_wrapped() {
        let node = FakeNode {
            utxo: vec![Utxo {
                tx_in: TxIn {
                    tx_hash: "aa".repeat(32),
                    index: 1,
                },
                address: "addr_test1abc".into(),
                value: Value::from_lovelace(3_000_000),
            }],
            ..FakeNode::default()
        };
        let Json(body) = utxo(State(state(node)), Path("addr_test1abc".into()))
            .await
            .unwrap();
        assert_eq!(body.utxo.len(), 1);
        assert_eq!(body.utxo[0].value.lovelace(), 3_000_000);
    }

    #[tokio::test]
    async fn bad_address_is_rejected_before_node() {
        let node = FakeNode {
            fail: true,
            ..FakeNode::default()
        };
        let err = stake_address(State(state(node)), Path("-x".into()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn protocol_params_are_passed_through() {
        let Json(body) = protocol_params(State(state(FakeNode::default()))).await.unwrap();
        assert_eq!(body["stakePoolDeposit"], 500_000_000u64);
        assert_eq!(body["txFeePerByte"], 44);
    }
}
