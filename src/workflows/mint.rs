// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Native asset minting under a single-signature policy of the owner wallet.

use std::fs;

use serde::Serialize;
use tracing::info;

use super::OpsContext;
use crate::blockchain::{asset_id, CertTx, MintAction, SubmitOutcome};
use crate::error::OpsError;
use crate::operator::prompt_until;
use crate::storage::Wallet;

/// Longest asset name the ledger accepts, in bytes.
pub const MAX_ASSET_NAME_BYTES: usize = 32;

#[derive(Debug, Serialize)]
struct SigScript<'a> {
    #[serde(rename = "keyHash")]
    key_hash: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Validate an asset name and return it hex encoded.
pub fn parse_asset_name(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err("asset name must not be empty".to_string());
    }
    if raw.len() > MAX_ASSET_NAME_BYTES {
        return Err(format!(
            "asset name must be at most {MAX_ASSET_NAME_BYTES} bytes"
        ));
    }
    Ok(hex::encode(raw.as_bytes()))
}

fn parse_quantity(raw: &str) -> Result<u64, String> {
    match raw.parse::<u64>() {
        Ok(0) | Err(_) => Err("amount must be a positive integer".to_string()),
        Ok(quantity) => Ok(quantity),
    }
}

pub async fn mint_token(ctx: &OpsContext) -> Result<SubmitOutcome, OpsError> {
    let wallet = Wallet::load(&ctx.paths, &ctx.config.priv_owner_wallet)?;

    let key_hash = ctx.ledger.address_key_hash(&wallet.files.payment_vkey)?;
    let script_path = ctx.paths.wallet_file(wallet.name(), "policy.script");
    let script = serde_json::to_string_pretty(&SigScript {
        key_hash: key_hash.trim(),
        kind: "sig",
    })
    .map_err(|e| OpsError::Io {
        path: script_path.clone(),
        source: e.into(),
    })?;
    fs::write(&script_path, script).map_err(OpsError::io(&script_path))?;
    let policy_id = ctx.ledger.policy_id(&script_path)?.trim().to_string();

    let asset_name_hex = prompt_until(ctx.operator.as_ref(), "Asset name", parse_asset_name)
        .map_err(OpsError::Prompt)?;
    ctx.notify(&format!("Policy Id: {policy_id}"));
    ctx.notify(&format!("Asset: {}", asset_id(&policy_id, &asset_name_hex)));
    if !ctx.confirm("Continue?")? {
        return Ok(SubmitOutcome::Declined);
    }

    let quantity = prompt_until(ctx.operator.as_ref(), "Amount to mint:", parse_quantity)
        .map_err(OpsError::Prompt)?;
    info!(%policy_id, asset = %asset_name_hex, quantity, "minting native asset");

    ctx.tx_builder()
        .build_and_submit(CertTx {
            payment_addr: wallet.payment_addr.clone(),
            deposit: 0,
            certificates: Vec::new(),
            mint: vec![MintAction {
                policy_id,
                asset_name_hex,
                quantity,
                script: script_path,
            }],
            signing_keys: vec![wallet.files.payment_skey.clone()],
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{TxIn, Utxo, Value};
    use crate::testing::{funded_utxo, Answer, FakeLedger, FakeRelay, Harness, FAKE_TX_HASH};

    #[test]
    fn asset_names_are_hex_encoded_and_bounded() {
        assert_eq!(parse_asset_name("tok").unwrap(), "746f6b");
        assert!(parse_asset_name("").is_err());
        assert!(parse_asset_name(&"a".repeat(32)).is_ok());
        assert!(parse_asset_name(&"a".repeat(33)).is_err());
    }

    #[test]
    fn quantity_must_be_positive() {
        assert_eq!(parse_quantity("5"), Ok(5));
        assert!(parse_quantity("0").is_err());
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("many").is_err());
    }

    #[tokio::test]
    async fn mints_on_top_of_existing_balance() {
        let mut value = Value::from_lovelace(5_000_000);
        value.set("policy0.746f6b", 10);
        let held = Utxo {
            tx_in: TxIn {
                tx_hash: "cc".repeat(32),
                index: 1,
            },
            address: "addr_test1fakebase".into(),
            value,
        };
        let mut utxo = funded_utxo(3_000_000);
        utxo.push(held);

        let harness = Harness::new(
            FakeRelay::default().with_utxo(utxo),
            FakeLedger::default(),
            [
                Answer::Input("".into()),
                Answer::Input("tok".into()),
                Answer::Confirm(true),
                Answer::Input("0".into()),
                Answer::Input("5".into()),
                Answer::Confirm(true),
            ],
        );
        let wallet = harness.seed_wallet();

        let outcome = mint_token(&harness.ctx).await.unwrap();

        assert_eq!(outcome.tx_hash(), Some(FAKE_TX_HASH));
        let script = fs::read_to_string(harness.ctx.paths.wallet_file("owner", "policy.script"))
            .unwrap();
        let script: serde_json::Value = serde_json::from_str(&script).unwrap();
        assert_eq!(script, serde_json::json!({"keyHash": "keyhash0", "type": "sig"}));

        let draft = harness.ledger.last_draft().unwrap();
        assert_eq!(draft.mint_quantities, vec![("policy0.746f6b".to_string(), 5)]);
        assert_eq!(draft.outputs[0].value.get("policy0.746f6b"), 15);
        assert_eq!(draft.outputs[0].value.lovelace(), 8_000_000 - 170_000);
        assert_eq!(harness.ledger.signed_with(), vec![vec![wallet.payment_skey]]);
        assert!(harness
            .operator
            .notes()
            .contains(&"amount must be a positive integer".to_string()));
    }

    #[tokio::test]
    async fn declining_stops_before_amount_prompt() {
        let harness = Harness::new(
            FakeRelay::default().with_utxo(funded_utxo(3_000_000)),
            FakeLedger::default(),
            [Answer::Input("tok".into()), Answer::Confirm(false)],
        );
        harness.seed_wallet();

        let outcome = mint_token(&harness.ctx).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Declined);
        assert!(!harness.ledger.calls().contains(&"build_raw".to_string()));
        assert!(harness.operator.is_exhausted());
    }
}
