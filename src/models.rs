// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Relay Wire Models
//!
//! Request and response bodies of the Core Relay. The console's
//! [`RelayClient`](crate::blockchain::RelayClient) and the relay handlers share
//! these types, so the two sides cannot drift apart.
//!
//! ## Model Categories
//!
//! - **Queries**: version, epoch, KES period, stake address, UTXO
//! - **Submission**: signed transaction envelope in, transaction hash out
//! - **Key handoff**: operational key payloads, written once on the relay

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::blockchain::types::{StakeAddressInfo, TextEnvelope, Utxo};

// =============================================================================
// Query Models
// =============================================================================

/// Node version reported by the relay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VersionResponse {
    /// `cardano-node` version, e.g. `8.1.2`.
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct EpochResponse {
    pub epoch: u64,
}

/// KES period of the current chain tip.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct KesPeriodResponse {
    #[serde(rename = "startKESPeriod")]
    pub start_kes_period: u64,
}

/// Stake address registration state. Empty when not registered.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StakeAddressResponse {
    #[schema(value_type = Vec<Object>)]
    pub stake_addr: StakeAddressInfo,
}

/// UTXO set of an address.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UtxoResponse {
    /// Entries of the form `{txHash, index, address, value}`.
    #[schema(value_type = Vec<Object>)]
    pub utxo: Vec<Utxo>,
}

// =============================================================================
// Submission Models
// =============================================================================

/// A fully signed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct SubmitTxRequest {
    pub tx: TextEnvelope,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTxResponse {
    pub tx_hash: String,
}

// =============================================================================
// Key Handoff Models
// =============================================================================

/// Operational keys handed from the console to the relay.
///
/// Every field is an opaque file body. Absent fields leave the relay's
/// existing file untouched. Contents are wiped on drop and never printed.
#[derive(Clone, Default, Serialize, Deserialize, ToSchema, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CoreKeysRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_cert: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_counter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_skey: Option<String>,
    /// Pool metadata JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl CoreKeysRequest {
    /// Field bodies paired with the relay file each one is written to.
    pub fn files(&self) -> [(&'static str, Option<&str>); 6] {
        [
            ("kes.skey", self.kes.as_deref()),
            ("vrf.skey", self.vrf.as_deref()),
            ("node.cert", self.node_cert.as_deref()),
            ("node.counter", self.node_counter.as_deref()),
            ("node.skey", self.node_skey.as_deref()),
            ("metadata.json", self.metadata.as_deref()),
        ]
    }
}

impl fmt::Debug for CoreKeysRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<&str> = self
            .files()
            .into_iter()
            .filter_map(|(name, body)| body.map(|_| name))
            .collect();
        f.debug_struct("CoreKeysRequest")
            .field("present", &present)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct CoreKeysResponse {
    pub success: bool,
}
