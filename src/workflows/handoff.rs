// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operational key handoff to the block-producing core.

use std::fs;
use std::path::Path;

use tracing::info;

use super::OpsContext;
use crate::config::PoolMetadata;
use crate::error::OpsError;
use crate::models::CoreKeysRequest;
use crate::storage::{PoolFiles, PrivPaths};

fn read_key(path: &Path) -> Result<String, OpsError> {
    if !path.is_file() {
        return Err(OpsError::MissingKeyFile(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(OpsError::io(path))
}

/// Read every file the core needs to produce blocks. All of them must exist.
pub fn collect_core_keys(
    paths: &PrivPaths,
    pool_name: &str,
    metadata: &PoolMetadata,
) -> Result<CoreKeysRequest, OpsError> {
    let pool = PoolFiles::load(paths, pool_name)?;
    let mut request = CoreKeysRequest::default();
    request.kes = Some(read_key(&pool.kes_skey)?);
    request.vrf = Some(read_key(&pool.vrf_skey)?);
    request.node_cert = Some(read_key(&pool.node_cert)?);
    request.node_counter = Some(read_key(&pool.node_counter)?);
    request.node_skey = Some(read_key(&pool.node_skey)?);
    request.metadata = Some(metadata.to_pretty_json());
    Ok(request)
}

pub async fn send_keys_to_core(ctx: &OpsContext) -> Result<(), OpsError> {
    let request = collect_core_keys(
        &ctx.paths,
        &ctx.config.priv_pool_name,
        &ctx.config.pool_metadata,
    )?;
    ctx.relay.send_core_keys(&request).await?;
    info!(pool = %ctx.config.priv_pool_name, "operational keys handed off");
    ctx.notify("Keys sent to core successfully");
    Ok(())
}
