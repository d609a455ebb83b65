// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::Path;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" or "degraded".
    pub status: String,
    /// Whether the key directory accepts writes ("ok" or "unwritable").
    pub keys_dir: String,
}

fn check_keys_dir(dir: &Path) -> bool {
    std::fs::create_dir_all(dir).is_ok() && tempfile::tempfile_in(dir).is_ok()
}

/// Returns 200 when the relay can accept a key handoff, 503 otherwise.
/// Does not query the node.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Relay is healthy", body = HealthResponse),
        (status = 503, description = "Key directory is not writable", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let dir = state.keys_dir.clone();
    let writable = tokio::task::spawn_blocking(move || check_keys_dir(&dir))
        .await
        .unwrap_or(false);

    let (status, label) = if writable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            keys_dir: if writable { "ok" } else { "unwritable" }.to_string(),
        }),
    )
}
