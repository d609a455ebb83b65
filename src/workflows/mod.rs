// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Console Workflows
//!
//! Every operation the console offers, plus the outer runner that wraps them.
//!
//! ## Runner contract
//!
//! 1. Compare local tool versions with the relay (all operations except key
//!    extraction). A mismatch aborts before any vault is touched.
//! 2. Ask for the vault passphrase and unlock the domains the operation needs.
//! 3. Run the workflow.
//! 4. Lock those domains again, whatever the workflow returned.
//!
//! Workflows receive an [`OpsContext`] and talk to the relay, the ledger CLI
//! and the operator only through it.

use std::sync::Arc;

use tracing::{error, info};

use crate::blockchain::{
    format_ada, CardanoCli, CertTxBuilder, LedgerCli, RelayApi, RelayClient, SubmitOutcome,
};
use crate::config::{Network, OpsConfig};
use crate::error::OpsError;
use crate::operator::{prompt_passphrase, Operator, TerminalOperator};
use crate::process::{CommandRunner, SystemRunner};
use crate::storage::{Domain, LockOutcome, PrivPaths, UnlockOutcome, VaultManager};

pub mod derive;
pub mod handoff;
pub mod kes;
pub mod mint;
pub mod registration;
pub mod retirement;

/// Operations offered by the console menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    UnlockVault,
    LockVault,
    NewOrUpdatePool,
    RotateKes,
    MintToken,
    GetUtxo,
    RetirePool,
    SendKeysToCore,
    ExtractWalletKeys,
    Exit,
}

impl Operation {
    /// Menu order.
    pub const ALL: [Operation; 10] = [
        Operation::UnlockVault,
        Operation::LockVault,
        Operation::NewOrUpdatePool,
        Operation::RotateKes,
        Operation::MintToken,
        Operation::GetUtxo,
        Operation::RetirePool,
        Operation::SendKeysToCore,
        Operation::ExtractWalletKeys,
        Operation::Exit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Operation::UnlockVault => "Unlock priv folder",
            Operation::LockVault => "Lock priv folder",
            Operation::NewOrUpdatePool => "New or Update Stake Pool",
            Operation::RotateKes => "Rotate KES Key",
            Operation::MintToken => "Mint multi asset token",
            Operation::GetUtxo => "Get UTXO of address",
            Operation::RetirePool => "Retire Pool",
            Operation::SendKeysToCore => "Send Operation Keys to Core",
            Operation::ExtractWalletKeys => "Extract wallet keys from mnemonic",
            Operation::Exit => "Exit",
        }
    }

    /// Vault domains unlocked for the duration of the workflow.
    pub fn required_domains(&self) -> &'static [Domain] {
        match self {
            Operation::NewOrUpdatePool | Operation::RetirePool => &[Domain::Wallet, Domain::Pool],
            Operation::RotateKes | Operation::SendKeysToCore => &[Domain::Pool],
            Operation::MintToken | Operation::ExtractWalletKeys => &[Domain::Wallet],
            Operation::UnlockVault
            | Operation::LockVault
            | Operation::GetUtxo
            | Operation::Exit => &[],
        }
    }

    pub fn needs_version_check(&self) -> bool {
        !matches!(self, Operation::ExtractWalletKeys | Operation::Exit)
    }
}

/// Everything a workflow may use.
pub struct OpsContext {
    pub config: OpsConfig,
    pub paths: PrivPaths,
    pub relay: Arc<dyn RelayApi>,
    pub ledger: Arc<dyn LedgerCli>,
    pub runner: Arc<dyn CommandRunner>,
    pub operator: Arc<dyn Operator>,
    pub vault: VaultManager,
}

impl OpsContext {
    pub fn new(
        config: OpsConfig,
        relay: Arc<dyn RelayApi>,
        ledger: Arc<dyn LedgerCli>,
        runner: Arc<dyn CommandRunner>,
        operator: Arc<dyn Operator>,
    ) -> Self {
        let paths = PrivPaths::new(&config.priv_dir);
        let vault = VaultManager::with_tools(
            paths.clone(),
            runner.clone(),
            config.tools.tar.clone(),
            config.tools.gpg.clone(),
        );
        Self {
            config,
            paths,
            relay,
            ledger,
            runner,
            operator,
            vault,
        }
    }

    /// Context backed by the real tools, relay and terminal.
    pub fn from_config(config: OpsConfig) -> Result<Self, OpsError> {
        let runner: Arc<dyn CommandRunner> = Arc::new(SystemRunner::default());
        let ledger = Arc::new(CardanoCli::new(runner.clone(), &config.tools));
        let relay = Arc::new(RelayClient::from_config(&config)?);
        Ok(Self::new(
            config,
            relay,
            ledger,
            runner,
            Arc::new(TerminalOperator),
        ))
    }

    pub fn network(&self) -> Network {
        self.config.network()
    }

    pub fn notify(&self, message: &str) {
        self.operator.notify(message);
    }

    pub fn confirm(&self, message: &str) -> Result<bool, OpsError> {
        self.operator.confirm(message).map_err(OpsError::Prompt)
    }

    pub(crate) fn tx_builder(&self) -> CertTxBuilder<'_> {
        CertTxBuilder::new(
            self.relay.as_ref(),
            self.ledger.as_ref(),
            self.operator.as_ref(),
            self.network(),
            self.config.min_spendable_lovelace,
        )
    }

    pub(crate) fn report_submission(&self, outcome: &SubmitOutcome) {
        match outcome {
            SubmitOutcome::Submitted { tx_hash } => {
                info!(%tx_hash, "transaction submitted");
                self.notify(&format!("Tx submitted. TxHash: {tx_hash}"));
            }
            SubmitOutcome::Declined => self.notify("Transaction not submitted"),
        }
    }
}

/// Compare local `cardano-node` and `cardano-cli` versions with the relay's.
pub async fn version_check(ctx: &OpsContext) -> Result<(), OpsError> {
    ctx.notify("Checking versions");
    let relay = ctx.relay.cardano_version().await?;
    let local = [
        ("cardano-node", ctx.ledger.local_node_version()?),
        ("cardano-cli", ctx.ledger.local_cli_version()?),
    ];
    for (component, version) in local {
        if version != relay {
            return Err(OpsError::VersionMismatch {
                component,
                local: version,
                relay,
            });
        }
        ctx.notify(&format!("Good {component} {version}"));
    }
    Ok(())
}

/// Run one operation under the runner contract.
pub async fn run_operation(ctx: &OpsContext, operation: Operation) -> Result<(), OpsError> {
    if operation == Operation::Exit {
        return Ok(());
    }
    if operation.needs_version_check() {
        version_check(ctx).await?;
    }

    match operation {
        Operation::UnlockVault => return unlock_all(ctx),
        Operation::LockVault => return lock_all(ctx),
        Operation::GetUtxo => return show_utxo(ctx).await,
        _ => {}
    }

    let passphrase = prompt_passphrase(ctx.operator.as_ref()).map_err(OpsError::Prompt)?;
    let session = ctx
        .vault
        .open_session(operation.required_domains(), passphrase)?;

    let result = run_workflow(ctx, operation).await;

    match (result, session.close()) {
        (Ok(()), Ok(_)) => Ok(()),
        (Ok(()), Err(lock_err)) => Err(lock_err.into()),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(lock_err)) => {
            error!(error = %lock_err, "vault re-lock failed after workflow error");
            Err(err)
        }
    }
}

async fn run_workflow(ctx: &OpsContext, operation: Operation) -> Result<(), OpsError> {
    match operation {
        Operation::NewOrUpdatePool => {
            let outcome = registration::new_or_update_pool(ctx).await?;
            info!(?outcome, "pool registration finished");
        }
        Operation::RotateKes => {
            let outcome = kes::run(ctx).await?;
            info!(?outcome, "KES rotation finished");
        }
        Operation::MintToken => {
            let outcome = mint::mint_token(ctx).await?;
            ctx.report_submission(&outcome);
        }
        Operation::RetirePool => {
            let outcome = retirement::retire_pool(ctx).await?;
            ctx.report_submission(&outcome);
        }
        Operation::SendKeysToCore => handoff::send_keys_to_core(ctx).await?,
        Operation::ExtractWalletKeys => {
            let wallet = derive::extract_wallet_keys(ctx)?;
            ctx.notify(&format!("Wallet `{}` saved", wallet.name()));
        }
        Operation::UnlockVault
        | Operation::LockVault
        | Operation::GetUtxo
        | Operation::Exit => {}
    }
    Ok(())
}

fn unlock_all(ctx: &OpsContext) -> Result<(), OpsError> {
    let passphrase = prompt_passphrase(ctx.operator.as_ref()).map_err(OpsError::Prompt)?;
    ctx.notify("Unlocking priv folder");
    for domain in Domain::ALL {
        match ctx.vault.unlock(domain, &passphrase)? {
            UnlockOutcome::Unlocked => ctx.notify(&format!("{domain}: unlocked")),
            UnlockOutcome::AlreadyUnlocked => ctx.notify(&format!("{domain}: already unlocked")),
            UnlockOutcome::NothingToUnlock => ctx.notify(&format!("{domain}: nothing to unlock")),
        }
    }
    Ok(())
}

fn lock_all(ctx: &OpsContext) -> Result<(), OpsError> {
    let passphrase = prompt_passphrase(ctx.operator.as_ref()).map_err(OpsError::Prompt)?;
    ctx.notify("Locking priv folder");
    for domain in Domain::ALL {
        match ctx.vault.lock(domain, &passphrase)? {
            LockOutcome::Locked { backup: Some(backup) } => ctx.notify(&format!(
                "{domain}: locked (previous archive kept as {})",
                backup.display()
            )),
            LockOutcome::Locked { backup: None } => ctx.notify(&format!("{domain}: locked")),
            LockOutcome::NothingToLock => ctx.notify(&format!("{domain}: nothing to lock")),
        }
    }
    Ok(())
}

async fn show_utxo(ctx: &OpsContext) -> Result<(), OpsError> {
    let address = ctx.operator.input("addr =").map_err(OpsError::Prompt)?;
    let utxos = ctx.relay.utxo(address.trim()).await?;
    if utxos.is_empty() {
        ctx.notify("No UTXO at this address");
    }
    for utxo in &utxos {
        let assets: Vec<String> = utxo
            .value
            .iter()
            .filter(|(asset, _)| asset.as_str() != crate::blockchain::LOVELACE)
            .map(|(asset, quantity)| format!("{quantity} {asset}"))
            .collect();
        let mut line = format!("{} {} ADA", utxo.tx_in, format_ada(utxo.value.lovelace()));
        if !assets.is_empty() {
            line.push_str(&format!(" + {}", assets.join(" + ")));
        }
        ctx.notify(&line);
    }
    Ok(())
}

/// Interactive menu loop. Failed operations are reported and the menu is
/// shown again; a closed terminal ends the loop.
pub async fn console_loop(ctx: &OpsContext) -> Result<(), OpsError> {
    let labels: Vec<&str> = Operation::ALL.iter().map(Operation::label).collect();
    loop {
        let index = ctx
            .operator
            .select("Select an operation", &labels)
            .map_err(OpsError::Prompt)?;
        let Some(operation) = Operation::ALL.get(index).copied() else {
            continue;
        };
        if operation == Operation::Exit {
            return Ok(());
        }

        info!(operation = operation.label(), "running operation");
        match run_operation(ctx, operation).await {
            Ok(()) => {}
            Err(OpsError::Prompt(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(OpsError::Prompt(err));
            }
            Err(err) => {
                error!(operation = operation.label(), error = %err, "operation failed");
                ctx.notify(&format!(">>> {} failed: {err}", operation.label()));
            }
        }
    }
}
