// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stake Pool Ops - Operations Console and Core Relay
//!
//! The console runs on the operator's machine. It keeps the owner wallet and
//! pool cold keys in a passphrase-encrypted vault, builds and signs
//! certificate transactions, and never talks to a node directly. The relay
//! runs beside the block-producing node and exposes the handful of chain
//! queries the console needs, transaction submission, and a one-way
//! operational key handoff.
//!
//! ## Modules
//!
//! - `api` - Core Relay HTTP handlers (Axum)
//! - `auth` - Shared-token authentication for the relay
//! - `blockchain` - Ledger CLI wrapper, relay client, transaction builder
//! - `storage` - Vault, key-file layout and backups
//! - `workflows` - Console operations and the runner that wraps them

pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod models;
pub mod operator;
pub mod process;
pub mod state;
pub mod storage;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;
