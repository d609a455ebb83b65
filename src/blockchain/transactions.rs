// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Certificate-deposit transaction building and submission.
//!
//! Every value-moving workflow goes through [`CertTxBuilder`]:
//!
//! 1. fetch the UTXO set of the payment address from the relay
//! 2. aggregate balances per asset and check the spendable minimum
//! 3. draft a transaction spending everything back to the payment address,
//!    minus the deposit, plus any certificates and mint actions
//! 4. compute the minimum fee with one witness per signing key and subtract
//!    it from the single output (single pass; the fee is computed on the
//!    pre-fee body)
//! 5. show the figures and ask the operator to confirm
//! 6. sign with the given keys and submit through the relay

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use tracing::{info, warn};

use super::cli::LedgerCli;
use super::client::RelayApi;
use super::types::{format_ada, Certificate, MintAction, TextEnvelope, TxDraft, TxOut, Utxo, Value};
use crate::config::Network;
use crate::error::OpsError;
use crate::operator::Operator;

/// Result of a transaction the operator was asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The relay accepted the transaction.
    Submitted { tx_hash: String },
    /// The operator declined at the confirmation prompt; nothing was signed.
    Declined,
}

impl SubmitOutcome {
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Submitted { tx_hash } => Some(tx_hash),
            SubmitOutcome::Declined => None,
        }
    }
}

/// What a workflow wants on chain.
#[derive(Debug)]
pub struct CertTx {
    /// Source of funds and destination of the change output.
    pub payment_addr: String,
    /// Lovelace locked by the certificates (0 for none).
    pub deposit: u64,
    pub certificates: Vec<Certificate>,
    pub mint: Vec<MintAction>,
    /// Signing key files; also the witness count used for the fee.
    pub signing_keys: Vec<PathBuf>,
}

/// Figures shown to the operator before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSummary {
    /// Aggregated lovelace across all inputs.
    pub balance: u64,
    pub deposit: u64,
    pub fee: u64,
    /// Lovelace left on the change output.
    pub remaining: u64,
}

/// Sum quantities per asset across `utxos`. Order does not matter.
pub fn aggregate_balance(utxos: &[Utxo]) -> Result<Value, OpsError> {
    let mut total = Value::new();
    for utxo in utxos {
        for (asset, quantity) in utxo.value.iter() {
            total
                .checked_add_asset(asset, *quantity)
                .ok_or(OpsError::ValueOverflow)?;
        }
    }
    Ok(total)
}

/// Builds, funds, signs and submits certificate-bearing transactions.
pub struct CertTxBuilder<'a> {
    relay: &'a dyn RelayApi,
    ledger: &'a dyn LedgerCli,
    operator: &'a dyn Operator,
    network: Network,
    min_spendable: u64,
}

impl<'a> CertTxBuilder<'a> {
    pub fn new(
        relay: &'a dyn RelayApi,
        ledger: &'a dyn LedgerCli,
        operator: &'a dyn Operator,
        network: Network,
        min_spendable: u64,
    ) -> Self {
        Self {
            relay,
            ledger,
            operator,
            network,
            min_spendable,
        }
    }

    pub async fn build_and_submit(&self, tx: CertTx) -> Result<SubmitOutcome, OpsError> {
        let utxos = self.relay.utxo(&tx.payment_addr).await?;
        let balance = aggregate_balance(&utxos)?;
        let available = balance.lovelace();
        if available < self.min_spendable {
            return Err(OpsError::InsufficientFunds {
                available,
                required: self.min_spendable,
            });
        }

        let mut output = balance.clone();
        for action in &tx.mint {
            output
                .checked_add_asset(&action.asset_id(), action.quantity)
                .ok_or(OpsError::ValueOverflow)?;
        }
        let after_deposit = available
            .checked_sub(tx.deposit)
            .ok_or(OpsError::InsufficientFunds {
                available,
                required: tx.deposit,
            })?;
        output.set_lovelace(after_deposit);

        let params = self.relay.protocol_params().await?;
        let workdir = TempDir::new().map_err(OpsError::io(std::env::temp_dir()))?;
        let params_file = workdir.path().join("protocol.json");
        let params_json = serde_json::to_vec(&params).map_err(|e| OpsError::Io {
            path: params_file.clone(),
            source: e.into(),
        })?;
        fs::write(&params_file, params_json).map_err(OpsError::io(&params_file))?;

        let mut draft = TxDraft {
            inputs: utxos.iter().map(|u| u.tx_in.clone()).collect(),
            outputs: vec![TxOut {
                address: tx.payment_addr.clone(),
                value: output,
            }],
            certificates: tx.certificates,
            mint: tx.mint,
            fee: 0,
        };

        let draft_file = workdir.path().join("tx.draft");
        self.ledger.build_raw(&draft, &draft_file)?;
        let fee = self.ledger.calculate_min_fee(
            &draft_file,
            &draft,
            tx.signing_keys.len(),
            &params_file,
            self.network,
        )?;

        let remaining = after_deposit
            .checked_sub(fee)
            .ok_or(OpsError::InsufficientFunds {
                available,
                required: tx.deposit.saturating_add(fee),
            })?;
        draft.outputs[0].value.set_lovelace(remaining);
        draft.fee = fee;

        let summary = FeeSummary {
            balance: available,
            deposit: tx.deposit,
            fee,
            remaining,
        };
        self.present(&summary);

        let proceed = self
            .operator
            .confirm("Should proceed transaction?")
            .map_err(OpsError::Prompt)?;
        if !proceed {
            info!("transaction declined by operator");
            return Ok(SubmitOutcome::Declined);
        }

        let body_file = workdir.path().join("tx.raw");
        let signed_file = workdir.path().join("tx.signed");
        self.ledger.build_raw(&draft, &body_file)?;
        self.ledger
            .sign(&body_file, &tx.signing_keys, self.network, &signed_file)?;

        let signed = fs::read(&signed_file).map_err(OpsError::io(&signed_file))?;
        let envelope: TextEnvelope = serde_json::from_slice(&signed).map_err(|e| OpsError::Io {
            path: signed_file.clone(),
            source: e.into(),
        })?;

        match self.relay.submit_tx(&envelope).await {
            Ok(tx_hash) => {
                info!(%tx_hash, fee, deposit = tx.deposit, "transaction submitted");
                Ok(SubmitOutcome::Submitted { tx_hash })
            }
            Err(err) => {
                warn!(error = %err, "transaction submission failed");
                Err(OpsError::Submission(err))
            }
        }
    }

    fn present(&self, summary: &FeeSummary) {
        self.operator
            .notify(&format!("Balance: {} ADA", format_ada(summary.balance)));
        self.operator
            .notify(&format!("Deposit: {} ADA", format_ada(summary.deposit)));
        self.operator
            .notify(&format!("Transaction Fee: {} ADA", format_ada(summary.fee)));
        self.operator
            .notify(&format!("Remain Balance: {} ADA", format_ada(summary.remaining)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::{CertificateKind, TxIn};
    use crate::testing::{Answer, FakeLedger, FakeRelay, ScriptedOperator, FAKE_TX_HASH};

    fn utxo(hash: &str, index: u32, lovelace: u64, assets: &[(&str, u64)]) -> Utxo {
        let mut value = Value::from_lovelace(lovelace);
        for (asset, quantity) in assets {
            value.set(*asset, *quantity);
        }
        Utxo {
            tx_in: TxIn {
                tx_hash: hash.into(),
                index,
            },
            address: "addr_test1owner".into(),
            value,
        }
    }

    fn cert_tx(deposit: u64, keys: usize) -> CertTx {
        CertTx {
            payment_addr: "addr_test1owner".into(),
            deposit,
            certificates: vec![Certificate::new(
                CertificateKind::StakeRegistration,
                "/v/stake.cert",
            )],
            mint: vec![],
            signing_keys: (0..keys).map(|i| PathBuf::from(format!("/v/{i}.skey"))).collect(),
        }
    }

    #[test]
    fn aggregate_is_order_independent() {
        let a = utxo("a", 0, 3_000_000, &[("p.746f6b", 5)]);
        let b = utxo("b", 1, 2_000_000, &[("p.746f6b", 7), ("q.6e6674", 1)]);
        let c = utxo("c", 0, 1, &[]);

        let forward = aggregate_balance(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let backward = aggregate_balance(&[c, b, a]).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward.lovelace(), 5_000_001);
        assert_eq!(forward.get("p.746f6b"), 12);
        assert_eq!(forward.get("q.6e6674"), 1);
    }

    #[test]
    fn aggregate_detects_overflow() {
        let err = aggregate_balance(&[utxo("a", 0, u64::MAX, &[]), utxo("b", 0, 1, &[])])
            .unwrap_err();
        assert!(matches!(err, OpsError::ValueOverflow));
    }

    #[tokio::test]
    async fn output_is_balance_minus_deposit_minus_fee() {
        let relay = FakeRelay::default().with_utxo(vec![
            utxo("a", 0, 400_000_000, &[("p.746f6b", 3)]),
            utxo("b", 2, 105_000_000, &[]),
        ]);
        let ledger = FakeLedger::with_fee(180_000);
        let operator = ScriptedOperator::new([Answer::Confirm(true)]);
        let builder = CertTxBuilder::new(&relay, &ledger, &operator, Network::Testnet(2), 1_000_000);

        let outcome = builder.build_and_submit(cert_tx(2_000_000, 2)).await.unwrap();

        assert_eq!(outcome.tx_hash(), Some(FAKE_TX_HASH));
        let draft = ledger.last_draft().unwrap();
        assert_eq!(draft.fee, 180_000);
        assert_eq!(draft.inputs.len(), 2);
        assert_eq!(draft.outputs.len(), 1);
        assert_eq!(
            draft.outputs[0].value.lovelace(),
            505_000_000 - 2_000_000 - 180_000
        );
        assert_eq!(draft.outputs[0].value.get("p.746f6b"), 3);
        assert_eq!(ledger.fee_witness_counts(), vec![2]);
        assert_eq!(ledger.signed_with().len(), 1);
        assert_eq!(relay.submitted().len(), 1);
    }

    #[tokio::test]
    async fn low_balance_fails_before_signing() {
        let relay = FakeRelay::default().with_utxo(vec![utxo("a", 0, 2, &[])]);
        let ledger = FakeLedger::default();
        let operator = ScriptedOperator::new([]);
        let builder = CertTxBuilder::new(&relay, &ledger, &operator, Network::Mainnet, 1_000_000);

        let err = builder.build_and_submit(cert_tx(0, 1)).await.unwrap_err();

        assert!(matches!(
            err,
            OpsError::InsufficientFunds {
                available: 2,
                required: 1_000_000
            }
        ));
        assert!(ledger.signed_with().is_empty());
        assert!(relay.submitted().is_empty());
    }

    #[tokio::test]
    async fn deposit_plus_fee_above_balance_is_insufficient() {
        let relay = FakeRelay::default().with_utxo(vec![utxo("a", 0, 500_100_000, &[])]);
        let ledger = FakeLedger::with_fee(200_000);
        let operator = ScriptedOperator::new([]);
        let builder = CertTxBuilder::new(&relay, &ledger, &operator, Network::Mainnet, 1_000_000);

        let err = builder
            .build_and_submit(cert_tx(500_000_000, 3))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OpsError::InsufficientFunds {
                available: 500_100_000,
                required: 500_200_000
            }
        ));
        assert!(ledger.signed_with().is_empty());
        assert!(operator.is_exhausted());
    }

    #[tokio::test]
    async fn declining_returns_declined_without_signing() {
        let relay = FakeRelay::default().with_utxo(vec![utxo("a", 0, 10_000_000, &[])]);
        let ledger = FakeLedger::default();
        let operator = ScriptedOperator::new([Answer::Confirm(false)]);
        let builder = CertTxBuilder::new(&relay, &ledger, &operator, Network::Mainnet, 1_000_000);

        let outcome = builder.build_and_submit(cert_tx(0, 2)).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Declined);
        assert!(ledger.signed_with().is_empty());
        assert!(relay.submitted().is_empty());
        let notes = operator.notes();
        assert!(notes.iter().any(|n| n == "Balance: 10 ADA"));
        assert!(notes.iter().any(|n| n.starts_with("Transaction Fee: ")));
    }

    #[tokio::test]
    async fn relay_rejection_is_submission_error() {
        let relay = FakeRelay::default()
            .with_utxo(vec![utxo("a", 0, 10_000_000, &[])])
            .rejecting_submissions();
        let ledger = FakeLedger::default();
        let operator = ScriptedOperator::new([Answer::Confirm(true)]);
        let builder = CertTxBuilder::new(&relay, &ledger, &operator, Network::Mainnet, 1_000_000);

        let err = builder.build_and_submit(cert_tx(0, 2)).await.unwrap_err();

        assert!(matches!(err, OpsError::Submission(_)));
        assert_eq!(ledger.signed_with().len(), 1);
    }

    #[tokio::test]
    async fn mint_quantity_is_added_to_output() {
        let relay = FakeRelay::default()
            .with_utxo(vec![utxo("a", 0, 10_000_000, &[("pol.746f6b", 4)])]);
        let ledger = FakeLedger::with_fee(170_000);
        let operator = ScriptedOperator::new([Answer::Confirm(true)]);
        let builder = CertTxBuilder::new(&relay, &ledger, &operator, Network::Mainnet, 1_000_000);

        let tx = CertTx {
            payment_addr: "addr_test1owner".into(),
            deposit: 0,
            certificates: vec![],
            mint: vec![MintAction {
                policy_id: "pol".into(),
                asset_name_hex: "746f6b".into(),
                quantity: 6,
                script: PathBuf::from("/v/policy.script"),
            }],
            signing_keys: vec![PathBuf::from("/v/payment.skey")],
        };
        builder.build_and_submit(tx).await.unwrap();

        let draft = ledger.last_draft().unwrap();
        assert_eq!(draft.outputs[0].value.get("pol.746f6b"), 10);
        assert_eq!(draft.outputs[0].value.lovelace(), 10_000_000 - 170_000);
        assert_eq!(draft.mint_quantities, vec![("pol.746f6b".to_string(), 6)]);
        assert_eq!(ledger.fee_witness_counts(), vec![1]);
    }
}
