// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::error;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::require_token,
    blockchain::{ChainTip, LedgerError, NodeCli, ProtocolParams, TextEnvelope},
    error::ApiError,
    models::{
        CoreKeysRequest, CoreKeysResponse, EpochResponse, KesPeriodResponse,
        StakeAddressResponse, SubmitTxRequest, SubmitTxResponse, UtxoResponse, VersionResponse,
    },
    state::AppState,
};

pub mod health;
pub mod keys;
pub mod query;
pub mod submit;

pub fn router(state: AppState) -> Router {
    let relay_routes = Router::new()
        .route("/cardano-version", get(query::cardano_version))
        .route("/current-epoch", get(query::current_epoch))
        .route("/start-kes-period", get(query::start_kes_period))
        .route("/query-stake-address/{address}", get(query::stake_address))
        .route("/query-protocol-params", get(query::protocol_params))
        .route("/query-utxo/{address}", get(query::utxo))
        .route("/query-tip", get(query::tip))
        .route("/submit-tx", post(submit::submit_tx))
        .route("/receive-core-keys", post(keys::receive_core_keys))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            require_token,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .with_state(state)
        .merge(relay_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

/// Run a blocking node call off the async executor.
///
/// Node failures are logged in full; clients only see a generic 502.
pub(crate) async fn node_call<T, F>(
    state: &AppState,
    operation: &'static str,
    call: F,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn NodeCli) -> Result<T, LedgerError> + Send + 'static,
{
    node_call_with(state, operation, call, |_| ApiError::node_failure()).await
}

/// Like [`node_call`], with `to_api` deciding what the client sees.
pub(crate) async fn node_call_with<T, F, M>(
    state: &AppState,
    operation: &'static str,
    call: F,
    to_api: M,
) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&dyn NodeCli) -> Result<T, LedgerError> + Send + 'static,
    M: FnOnce(&LedgerError) -> ApiError,
{
    let node = state.node.clone();
    tokio::task::spawn_blocking(move || call(node.as_ref()))
        .await
        .map_err(|err| {
            error!(operation, error = %err, "node task panicked or was cancelled");
            ApiError::internal("internal error")
        })?
        .map_err(|err| {
            error!(operation, error = %err, "node request failed");
            to_api(&err)
        })
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        query::cardano_version,
        query::current_epoch,
        query::start_kes_period,
        query::stake_address,
        query::protocol_params,
        query::utxo,
        query::tip,
        submit::submit_tx,
        keys::receive_core_keys
    ),
    components(
        schemas(
            VersionResponse,
            EpochResponse,
            KesPeriodResponse,
            StakeAddressResponse,
            UtxoResponse,
            ProtocolParams,
            ChainTip,
            TextEnvelope,
            SubmitTxRequest,
            SubmitTxResponse,
            CoreKeysRequest,
            CoreKeysResponse,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Relay liveness"),
        (name = "Query", description = "Read-only chain queries"),
        (name = "Submit", description = "Signed transaction submission"),
        (name = "Keys", description = "Operational key handoff")
    )
)]
struct ApiDoc;
