// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! New-or-update stake pool.
//!
//! Creates the owner wallet and the pool keys when they are missing, rotates
//! the KES pair, registers the stake key if the chain does not know it yet,
//! then submits the pool registration together with the owner's delegation.

use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;
use tracing::info;

use super::{kes, OpsContext};
use crate::blockchain::{
    ada_to_lovelace, format_ada, Certificate, CertificateKind, CertTx, PoolRegistration,
    SubmitOutcome,
};
use crate::error::OpsError;
use crate::storage::keys::ensure_dir;
use crate::storage::{KeyStoreError, PoolFiles, Wallet, WalletFiles};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStage {
    StakeKey,
    Pool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The operator declined to create a missing wallet or pool.
    Cancelled,
    /// The operator declined a transaction; later stages did not run.
    Declined { stage: RegistrationStage },
    Registered {
        /// `None` when the stake key was already registered.
        stake_tx: Option<String>,
        pool_tx: String,
    },
}

pub async fn new_or_update_pool(ctx: &OpsContext) -> Result<RegistrationOutcome, OpsError> {
    let wallet_name = &ctx.config.priv_owner_wallet;
    let pool_name = &ctx.config.priv_pool_name;

    let wallet = match Wallet::load(&ctx.paths, wallet_name) {
        Ok(wallet) => wallet,
        Err(KeyStoreError::WalletNotFound { .. }) => {
            if !ctx.confirm("Not found Owner Wallet. Should I create it?")? {
                return Ok(RegistrationOutcome::Cancelled);
            }
            create_wallet(ctx, wallet_name)?
        }
        Err(other) => return Err(other.into()),
    };
    ctx.notify(&format!("Wallet payment address: {}", wallet.payment_addr));

    let pool = match PoolFiles::load(&ctx.paths, pool_name) {
        Ok(pool) => pool,
        Err(KeyStoreError::PoolNotFound { .. }) => {
            if !ctx.confirm("Not found Pool. Should I create it?")? {
                return Ok(RegistrationOutcome::Cancelled);
            }
            create_pool(ctx, pool_name)?
        }
        Err(other) => return Err(other.into()),
    };
    let pool_id = ctx.ledger.stake_pool_id(&pool.node_vkey)?;
    ctx.notify(&format!("Pool Id: {pool_id}"));

    kes::rotate_kes(ctx, &pool).await?;

    let params = ctx.relay.protocol_params().await?;
    let stake_info = ctx.relay.stake_address_info(&wallet.stake_addr).await?;

    let stake_tx = if stake_info.is_registered() {
        ctx.notify("Stake Key Certificate already registered");
        ctx.notify(&serde_json::to_string_pretty(&stake_info).unwrap_or_default());
        None
    } else {
        match register_stake_key(ctx, &wallet, params.stake_address_deposit).await? {
            SubmitOutcome::Submitted { tx_hash } => Some(tx_hash),
            SubmitOutcome::Declined => {
                ctx.report_submission(&SubmitOutcome::Declined);
                return Ok(RegistrationOutcome::Declined {
                    stage: RegistrationStage::StakeKey,
                });
            }
        }
    };

    match register_pool(ctx, &wallet, &pool, params.stake_pool_deposit).await? {
        SubmitOutcome::Submitted { tx_hash } => Ok(RegistrationOutcome::Registered {
            stake_tx,
            pool_tx: tx_hash,
        }),
        SubmitOutcome::Declined => {
            ctx.report_submission(&SubmitOutcome::Declined);
            Ok(RegistrationOutcome::Declined {
                stage: RegistrationStage::Pool,
            })
        }
    }
}

/// Generate payment and stake keys and derive both addresses.
pub fn create_wallet(ctx: &OpsContext, name: &str) -> Result<Wallet, OpsError> {
    let files = WalletFiles::at(&ctx.paths, name);
    ensure_dir(&ctx.paths.wallet_dir(name))?;

    ctx.ledger
        .address_key_gen(&files.payment_vkey, &files.payment_skey)?;
    ctx.ledger
        .stake_address_key_gen(&files.stake_vkey, &files.stake_skey)?;

    let network = ctx.network();
    let stake_addr = ctx.ledger.stake_address_build(&files.stake_vkey, network)?;
    fs::write(&files.stake_addr_file, &stake_addr).map_err(OpsError::io(&files.stake_addr_file))?;
    let payment_addr =
        ctx.ledger
            .address_build(&files.payment_vkey, Some(&files.stake_vkey), network)?;
    fs::write(&files.payment_addr_file, &payment_addr)
        .map_err(OpsError::io(&files.payment_addr_file))?;

    info!(wallet = name, "owner wallet created");
    Ok(Wallet::load(&ctx.paths, name)?)
}

/// Generate the cold key, its counter, and the VRF pair.
pub fn create_pool(ctx: &OpsContext, name: &str) -> Result<PoolFiles, OpsError> {
    let files = PoolFiles::at(&ctx.paths, name);
    ensure_dir(&ctx.paths.pool_dir(name))?;

    ctx.ledger
        .node_key_gen(&files.node_vkey, &files.node_skey, &files.node_counter)?;
    ctx.ledger.node_key_gen_vrf(&files.vrf_vkey, &files.vrf_skey)?;

    info!(pool = name, "pool keys created");
    Ok(PoolFiles::load(&ctx.paths, name)?)
}

async fn register_stake_key(
    ctx: &OpsContext,
    wallet: &Wallet,
    deposit: u64,
) -> Result<SubmitOutcome, OpsError> {
    ctx.notify("Registering Stake Key Cert");
    let cert = match wallet.stake_cert() {
        Some(existing) => existing.to_path_buf(),
        None => {
            let cert = wallet.files.stake_cert.clone();
            ctx.ledger
                .stake_registration_cert(&wallet.files.stake_vkey, &cert)?;
            cert
        }
    };

    let outcome = ctx
        .tx_builder()
        .build_and_submit(CertTx {
            payment_addr: wallet.payment_addr.clone(),
            deposit,
            certificates: vec![Certificate::new(CertificateKind::StakeRegistration, cert)],
            mint: Vec::new(),
            signing_keys: vec![
                wallet.files.payment_skey.clone(),
                wallet.files.stake_skey.clone(),
            ],
        })
        .await?;
    if let SubmitOutcome::Submitted { .. } = &outcome {
        ctx.report_submission(&outcome);
    }
    Ok(outcome)
}

async fn register_pool(
    ctx: &OpsContext,
    wallet: &Wallet,
    pool: &PoolFiles,
    pool_deposit: u64,
) -> Result<SubmitOutcome, OpsError> {
    ctx.notify("Registering Pool Cert and Delegation Cert");
    let data = &ctx.config.pool_data;

    let metadata = ctx.config.pool_metadata.to_pretty_json();
    let mut metadata_file = NamedTempFile::new().map_err(OpsError::io(std::env::temp_dir()))?;
    metadata_file
        .write_all(metadata.as_bytes())
        .map_err(OpsError::io(metadata_file.path()))?;
    let metadata_hash = ctx.ledger.pool_metadata_hash(metadata_file.path())?;

    let pool_cert = ctx.paths.pool_file(&pool.name, "pool.cert");
    let registration = PoolRegistration {
        cold_vkey: &pool.node_vkey,
        vrf_vkey: &pool.vrf_vkey,
        pledge_lovelace: ada_to_lovelace(data.pool_pledge_ada).ok_or(OpsError::ValueOverflow)?,
        cost_lovelace: ada_to_lovelace(data.pool_cost_ada).ok_or(OpsError::ValueOverflow)?,
        margin: data.pool_margin,
        reward_stake_vkey: &wallet.files.stake_vkey,
        owner_stake_vkey: &wallet.files.stake_vkey,
        relays: &data.relays,
        metadata_url: &data.metadata_url,
        metadata_hash: &metadata_hash,
    };
    ctx.ledger
        .pool_registration_cert(&registration, ctx.network(), &pool_cert)?;

    let first_registration = ctx.confirm(&format!(
        "Is this the first pool registration and deposit? If it is, a stake pool deposit of {} ADA will be charged.",
        format_ada(pool_deposit)
    ))?;

    let delegation_cert = ctx.paths.wallet_file(wallet.name(), "deleg.cert");
    ctx.ledger
        .delegation_cert(&wallet.files.stake_vkey, &pool.node_vkey, &delegation_cert)?;

    let outcome = ctx
        .tx_builder()
        .build_and_submit(CertTx {
            payment_addr: wallet.payment_addr.clone(),
            deposit: if first_registration { pool_deposit } else { 0 },
            certificates: vec![
                Certificate::new(CertificateKind::PoolRegistration, pool_cert),
                Certificate::new(CertificateKind::StakeDelegation, delegation_cert),
            ],
            mint: Vec::new(),
            signing_keys: vec![
                wallet.files.payment_skey.clone(),
                wallet.files.stake_skey.clone(),
                pool.node_skey.clone(),
            ],
        })
        .await?;
    if let SubmitOutcome::Submitted { .. } = &outcome {
        ctx.report_submission(&outcome);
    }
    Ok(outcome)
}
