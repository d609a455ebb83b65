// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain integration.
//!
//! - `cli` drives `cardano-cli`/`cardano-node` (node queries on the relay,
//!   offline key and transaction work on the console)
//! - `client` is the console's HTTP client for the Core Relay
//! - `transactions` builds, funds, signs and submits certificate transactions
//! - `types` holds the ledger types shared by both sides

pub mod cli;
pub mod client;
pub mod transactions;
pub mod types;

pub use cli::{CardanoCli, LedgerCli, LedgerError, NodeCli, NodeConnection, PoolRegistration};
pub use client::{RelayApi, RelayClient, RelayError};
pub use transactions::{CertTx, CertTxBuilder, SubmitOutcome};
pub use types::*;
