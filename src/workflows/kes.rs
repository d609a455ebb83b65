// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! KES key rotation.
//!
//! ```text
//! NoActiveKeys ──────────────────────────────┐
//!                                            ▼
//! ActiveKeys ──confirm──► PendingRenewal ──► ActiveKeys(new)
//!     │
//!     └──decline──► ActiveKeys (unchanged)
//! ```
//!
//! The start period is fetched from the relay before any file is touched, so
//! an unreachable relay leaves the current keys in place.

use std::path::PathBuf;

use tracing::info;

use super::OpsContext;
use crate::error::OpsError;
use crate::storage::{backup_suffix_now, backup_then_remove, PoolFiles};

const RENEW_PROMPT: &str = "There are existing KES keys. Should I backup and create new KES key?";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KesOutcome {
    /// No KES keys existed; a pair and an operational certificate were issued.
    Created { kes_period: u64 },
    /// Existing keys were backed up and replaced.
    Renewed {
        kes_period: u64,
        backups: Vec<PathBuf>,
    },
    /// The operator kept the existing keys.
    Kept,
}

/// Rotate the KES pair of the configured pool.
pub async fn run(ctx: &OpsContext) -> Result<KesOutcome, OpsError> {
    let pool = PoolFiles::load(&ctx.paths, &ctx.config.priv_pool_name)?;
    rotate_kes(ctx, &pool).await
}

pub async fn rotate_kes(ctx: &OpsContext, pool: &PoolFiles) -> Result<KesOutcome, OpsError> {
    if !pool.has_cold_signing_key() {
        return Err(OpsError::ColdKeyMissing(pool.node_skey.clone()));
    }

    let existing = pool.has_kes_keys();
    if existing && !ctx.confirm(RENEW_PROMPT)? {
        ctx.notify("Keeping existing KES keys");
        return Ok(KesOutcome::Kept);
    }

    let kes_period = ctx.relay.start_kes_period().await?;

    let backups = if existing {
        backup_then_remove(&pool.rotating_files(), &backup_suffix_now())
            .map_err(OpsError::io(&pool.kes_skey))?
    } else {
        Vec::new()
    };

    ctx.ledger.node_key_gen_kes(&pool.kes_vkey, &pool.kes_skey)?;
    ctx.ledger.issue_op_cert(
        &pool.kes_vkey,
        &pool.node_skey,
        &pool.node_counter,
        kes_period,
        &pool.node_cert,
    )?;

    info!(pool = %pool.name, kes_period, renewed = existing, "operational certificate issued");
    ctx.notify(&format!("New KES key and operational certificate issued at KES period {kes_period}"));

    Ok(if existing {
        KesOutcome::Renewed {
            kes_period,
            backups,
        }
    } else {
        KesOutcome::Created { kes_period }
    })
}
