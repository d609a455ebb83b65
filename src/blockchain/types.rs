// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger types shared by the console and the relay.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Asset identifier for the native coin.
pub const LOVELACE: &str = "lovelace";

/// Lovelace per ADA.
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Multi-asset value: asset identifier → quantity.
///
/// Native assets are keyed `<policyId>.<assetNameHex>`; the native coin is
/// keyed [`LOVELACE`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(pub BTreeMap<String, u64>);

impl Value {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lovelace(amount: u64) -> Self {
        let mut value = Self::new();
        value.0.insert(LOVELACE.to_string(), amount);
        value
    }

    pub fn lovelace(&self) -> u64 {
        self.get(LOVELACE)
    }

    pub fn get(&self, asset: &str) -> u64 {
        self.0.get(asset).copied().unwrap_or(0)
    }

    pub fn set(&mut self, asset: impl Into<String>, quantity: u64) {
        self.0.insert(asset.into(), quantity);
    }

    pub fn set_lovelace(&mut self, amount: u64) {
        self.set(LOVELACE, amount);
    }

    /// Add `quantity` of `asset`, returning `None` on overflow.
    pub fn checked_add_asset(&mut self, asset: &str, quantity: u64) -> Option<()> {
        let entry = self.0.entry(asset.to_string()).or_insert(0);
        *entry = entry.checked_add(quantity)?;
        Some(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reference to an unspent output: `<txHash>#<index>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxIn {
    pub tx_hash: String,
    pub index: u32,
}

impl fmt::Display for TxIn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

impl TxIn {
    /// Parse the `<txHash>#<index>` form used by the ledger CLI.
    pub fn parse(raw: &str) -> Option<Self> {
        let (hash, index) = raw.split_once('#')?;
        if hash.is_empty() {
            return None;
        }
        Some(Self {
            tx_hash: hash.to_string(),
            index: index.parse().ok()?,
        })
    }
}

/// One entry of an address's UTXO set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    #[serde(flatten)]
    pub tx_in: TxIn,
    pub address: String,
    pub value: Value,
}

/// Protocol parameters, fetched fresh for every workflow.
///
/// Only the fields the workflows read are typed; everything else is kept so
/// the document can be handed back to the ledger CLI for fee calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolParams {
    pub stake_address_deposit: u64,
    pub stake_pool_deposit: u64,
    pub pool_retire_max_epoch: u64,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

/// Chain tip as reported by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChainTip {
    pub epoch: u64,
    pub slot: u64,
    #[serde(default)]
    pub block: Option<u64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default)]
    pub sync_progress: Option<String>,
}

/// Registration state of a stake address.
///
/// The node returns one entry per registered delegation; an empty list means
/// the stake address is not registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StakeAddressInfo(pub Vec<serde_json::Value>);

impl StakeAddressInfo {
    pub fn is_registered(&self) -> bool {
        !self.0.is_empty()
    }
}

/// What a certificate file certifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateKind {
    StakeRegistration,
    PoolRegistration,
    StakeDelegation,
    PoolDeregistration { epoch: u64 },
}

impl fmt::Display for CertificateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificateKind::StakeRegistration => write!(f, "stake registration"),
            CertificateKind::PoolRegistration => write!(f, "pool registration"),
            CertificateKind::StakeDelegation => write!(f, "stake delegation"),
            CertificateKind::PoolDeregistration { epoch } => {
                write!(f, "pool deregistration (epoch {epoch})")
            }
        }
    }
}

/// A certificate produced by the ledger CLI.
///
/// Deliberately not `Clone`: a certificate is moved into exactly one
/// transaction draft.
#[derive(Debug, PartialEq, Eq)]
pub struct Certificate {
    pub kind: CertificateKind,
    pub path: PathBuf,
}

impl Certificate {
    pub fn new(kind: CertificateKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Native-asset mint entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintAction {
    pub policy_id: String,
    pub asset_name_hex: String,
    pub quantity: u64,
    pub script: PathBuf,
}

impl MintAction {
    /// Asset identifier in [`Value`] form.
    pub fn asset_id(&self) -> String {
        asset_id(&self.policy_id, &self.asset_name_hex)
    }
}

/// Build the `<policyId>.<assetNameHex>` identifier. An empty asset name is
/// identified by the bare policy id.
pub fn asset_id(policy_id: &str, asset_name_hex: &str) -> String {
    if asset_name_hex.is_empty() {
        return policy_id.to_string();
    }
    format!("{policy_id}.{asset_name_hex}")
}

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    pub address: String,
    pub value: Value,
}

/// Unsigned transaction draft.
#[derive(Debug, Default)]
pub struct TxDraft {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub certificates: Vec<Certificate>,
    pub mint: Vec<MintAction>,
    pub fee: u64,
}

/// Ledger CLI text envelope (`{type, description, cborHex}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TextEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "cborHex")]
    pub cbor_hex: String,
}

/// Format lovelace as ADA with up to six decimals, e.g. `12.5`.
pub fn format_ada(lovelace: u64) -> String {
    let whole = lovelace / LOVELACE_PER_ADA;
    let remainder = lovelace % LOVELACE_PER_ADA;
    if remainder == 0 {
        return whole.to_string();
    }
    let decimals = format!("{remainder:06}");
    format!("{whole}.{}", decimals.trim_end_matches('0'))
}

/// Convert whole ADA to lovelace.
pub fn ada_to_lovelace(ada: u64) -> Option<u64> {
    ada.checked_mul(LOVELACE_PER_ADA)
}
