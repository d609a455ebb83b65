// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Key Storage Module
//!
//! Cold keys live in two independently locked domains under the vault root.
//!
//! ## Storage Layout
//!
//! ```text
//! priv/
//!   pool/{pool}/
//!     {pool}.node.{skey,vkey,counter,cert}   # cold key, counter, op cert
//!     {pool}.vrf.{skey,vkey}
//!     {pool}.kes.{skey,vkey}                 # rotated
//!   wallet/{wallet}/
//!     {wallet}.payment.{skey,vkey,addr}
//!     {wallet}.stake.{skey,vkey,addr,cert}
//!   pool.tar.gz.gpg                          # present only while locked
//!   wallet.tar.gz.gpg
//! ```
//!
//! ## Important Notes
//!
//! - A working directory and its archive are never both authoritative
//! - Encryption is delegated to `gpg`; no crypto is implemented here
//! - Replaced key files are backed up with a timestamp suffix, never
//!   overwritten

pub mod backup;
pub mod keys;
pub mod paths;
pub mod vault;

pub use backup::{backup_file, backup_suffix_now, backup_then_remove};
pub use keys::{KeyStoreError, PoolFiles, Wallet, WalletFiles};
pub use paths::{Domain, PrivPaths};
pub use vault::{
    LockOutcome, Passphrase, UnlockOutcome, VaultError, VaultManager, VaultSession, VaultState,
};
