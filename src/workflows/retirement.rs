// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Pool retirement.

use tracing::info;

use super::OpsContext;
use crate::blockchain::{Certificate, CertificateKind, CertTx, SubmitOutcome};
use crate::error::OpsError;
use crate::operator::prompt_until;
use crate::storage::{PoolFiles, Wallet};

/// Epochs a pool may retire in: the open interval
/// `(current + 1, current + max_offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetirementWindow {
    lower: u64,
    upper: u64,
}

impl RetirementWindow {
    /// Fails with [`OpsError::RetirementWindowEmpty`] when no integer lies
    /// strictly inside the interval.
    pub fn new(current: u64, max_offset: u64) -> Result<Self, OpsError> {
        let lower = current.saturating_add(1);
        let upper = current.saturating_add(max_offset);
        if upper <= lower.saturating_add(1) {
            return Err(OpsError::RetirementWindowEmpty {
                current,
                max_offset,
            });
        }
        Ok(Self { lower, upper })
    }

    /// Exclusive lower bound.
    pub fn lower(&self) -> u64 {
        self.lower
    }

    /// Exclusive upper bound.
    pub fn upper(&self) -> u64 {
        self.upper
    }

    pub fn contains(&self, epoch: u64) -> bool {
        epoch > self.lower && epoch < self.upper
    }

    /// Parse operator input into an epoch inside the window.
    pub fn parse(&self, raw: &str) -> Result<u64, String> {
        raw.parse::<u64>()
            .ok()
            .filter(|epoch| self.contains(*epoch))
            .ok_or_else(|| {
                format!(
                    "retirement epoch must be between {} ~ {} (exclusive)",
                    self.lower, self.upper
                )
            })
    }
}

/// Retire the configured pool at an operator-chosen epoch.
pub async fn retire_pool(ctx: &OpsContext) -> Result<SubmitOutcome, OpsError> {
    let wallet = Wallet::load(&ctx.paths, &ctx.config.priv_owner_wallet)?;
    let pool = PoolFiles::load(&ctx.paths, &ctx.config.priv_pool_name)?;
    if !pool.has_cold_signing_key() {
        return Err(OpsError::ColdKeyMissing(pool.node_skey.clone()));
    }

    let current = ctx.relay.current_epoch().await?;
    let params = ctx.relay.protocol_params().await?;
    let window = RetirementWindow::new(current, params.pool_retire_max_epoch)?;

    let prompt = format!(
        "Enter the epoch to be retired ({} < retire epoch < {})",
        window.lower(),
        window.upper()
    );
    let epoch = prompt_until(ctx.operator.as_ref(), &prompt, |raw| window.parse(raw))
        .map_err(OpsError::Prompt)?;

    let cert_path = ctx.paths.pool_file(&pool.name, "dereg.cert");
    ctx.ledger
        .deregistration_cert(&pool.node_vkey, epoch, &cert_path)?;
    info!(pool = %pool.name, epoch, "pool deregistration certificate created");

    ctx.tx_builder()
        .build_and_submit(CertTx {
            payment_addr: wallet.payment_addr.clone(),
            deposit: 0,
            certificates: vec![Certificate::new(
                CertificateKind::PoolDeregistration { epoch },
                cert_path,
            )],
            mint: Vec::new(),
            signing_keys: vec![wallet.files.payment_skey.clone(), pool.node_skey.clone()],
        })
        .await
}
