// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use tracing::info;

use super::node_call_with;
use crate::{
    error::ApiError,
    models::{SubmitTxRequest, SubmitTxResponse},
    state::AppState,
};

/// Forward a signed transaction to the node.
#[utoipa::path(
    post,
    path = "/submit-tx",
    tag = "Submit",
    request_body = SubmitTxRequest,
    responses(
        (status = 200, description = "Transaction accepted by the node", body = SubmitTxResponse),
        (status = 400, description = "Malformed transaction envelope"),
        (status = 502, description = "Node rejected the transaction")
    )
)]
pub async fn submit_tx(
    State(state): State<AppState>,
    Json(request): Json<SubmitTxRequest>,
) -> Result<Json<SubmitTxResponse>, ApiError> {
    let tx = request.tx;
    if tx.kind.trim().is_empty() {
        return Err(ApiError::bad_request("tx.type must not be empty"));
    }
    if tx.cbor_hex.is_empty() || hex::decode(&tx.cbor_hex).is_err() {
        return Err(ApiError::bad_request("tx.cborHex must be non-empty hex"));
    }

    let tx_hash = node_call_with(
        &state,
        "submit transaction",
        move |node| node.submit(&tx),
        ApiError::node_rejection,
    )
    .await?;
    info!(tx_hash = %tx_hash, "transaction submitted");
    Ok(Json(SubmitTxResponse { tx_hash }))
}
