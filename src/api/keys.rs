// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operational key handoff.
//!
//! The console posts the pool's hot keys once; the relay writes every field
//! that is present into its key directory, replacing what was there. Nothing
//! written here can be read back over HTTP.

use std::io::{self, Write};
use std::path::Path;

use axum::{extract::State, Json};
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::{
    error::ApiError,
    models::{CoreKeysRequest, CoreKeysResponse},
    state::AppState,
};

#[utoipa::path(
    post,
    path = "/receive-core-keys",
    tag = "Keys",
    request_body = CoreKeysRequest,
    responses(
        (status = 200, description = "Present fields were written", body = CoreKeysResponse),
        (status = 500, description = "Key directory is not writable")
    )
)]
pub async fn receive_core_keys(
    State(state): State<AppState>,
    Json(request): Json<CoreKeysRequest>,
) -> Result<Json<CoreKeysResponse>, ApiError> {
    let dir = state.keys_dir.clone();
    let written = tokio::task::spawn_blocking(move || write_core_keys(&dir, &request))
        .await
        .map_err(|err| {
            error!(error = %err, "key write task panicked or was cancelled");
            ApiError::internal("internal error")
        })?
        .map_err(|err| {
            error!(dir = %state.keys_dir.display(), error = %err, "failed to write operational keys");
            ApiError::internal("failed to write key files")
        })?;

    if written.is_empty() {
        warn!("key handoff carried no files");
    } else {
        info!(files = ?written, "operational keys received");
    }
    Ok(Json(CoreKeysResponse { success: true }))
}

/// Write the present fields of `request` into `dir`; returns the file names
/// written. Each file is replaced atomically and readable only by the owner.
pub fn write_core_keys(dir: &Path, request: &CoreKeysRequest) -> io::Result<Vec<&'static str>> {
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (name, body) in request.files() {
        let Some(body) = body else { continue };
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(body.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(dir.join(name)).map_err(|e| e.error)?;
        written.push(name);
    }
    Ok(written)
}
