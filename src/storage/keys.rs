// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet and pool key-file model.
//!
//! Both are thin views over files inside an unlocked vault domain. Loading
//! checks that the files exist; nothing here reads key material.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::paths::PrivPaths;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    #[error("wallet `{name}` not found (missing {missing})")]
    WalletNotFound { name: String, missing: PathBuf },

    #[error("pool `{name}` not found (missing {missing})")]
    PoolNotFound { name: String, missing: PathBuf },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Key files of an owner wallet: `wallet/<name>/<name>.{payment,stake}.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletFiles {
    pub name: String,
    pub payment_skey: PathBuf,
    pub payment_vkey: PathBuf,
    pub payment_addr_file: PathBuf,
    pub stake_skey: PathBuf,
    pub stake_vkey: PathBuf,
    pub stake_addr_file: PathBuf,
    pub stake_cert: PathBuf,
}

impl WalletFiles {
    pub fn at(paths: &PrivPaths, name: &str) -> Self {
        let file = |f: &str| paths.wallet_file(name, f);
        Self {
            name: name.to_string(),
            payment_skey: file("payment.skey"),
            payment_vkey: file("payment.vkey"),
            payment_addr_file: file("payment.addr"),
            stake_skey: file("stake.skey"),
            stake_vkey: file("stake.vkey"),
            stake_addr_file: file("stake.addr"),
            stake_cert: file("stake.cert"),
        }
    }

    fn required(&self) -> [&Path; 6] {
        [
            &self.payment_skey,
            &self.payment_vkey,
            &self.payment_addr_file,
            &self.stake_skey,
            &self.stake_vkey,
            &self.stake_addr_file,
        ]
    }
}

/// A loaded wallet: its files plus the addresses read from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub files: WalletFiles,
    pub payment_addr: String,
    pub stake_addr: String,
}

impl Wallet {
    /// Load a wallet, failing with [`KeyStoreError::WalletNotFound`] when any
    /// required file is absent.
    pub fn load(paths: &PrivPaths, name: &str) -> Result<Self, KeyStoreError> {
        let files = WalletFiles::at(paths, name);
        if let Some(missing) = files.required().into_iter().find(|p| !p.is_file()) {
            return Err(KeyStoreError::WalletNotFound {
                name: name.to_string(),
                missing: missing.to_path_buf(),
            });
        }
        let payment_addr = read_trimmed(&files.payment_addr_file)?;
        let stake_addr = read_trimmed(&files.stake_addr_file)?;
        Ok(Self {
            files,
            payment_addr,
            stake_addr,
        })
    }

    pub fn name(&self) -> &str {
        &self.files.name
    }

    /// Existing stake registration certificate, if one was produced before.
    pub fn stake_cert(&self) -> Option<&Path> {
        let cert = self.files.stake_cert.as_path();
        cert.is_file().then_some(cert)
    }
}

/// Key files of a pool: `pool/<name>/<name>.{node,vrf,kes}.*`.
///
/// The cold node key never changes once created; the KES pair and the
/// operational certificate rotate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolFiles {
    pub name: String,
    pub node_skey: PathBuf,
    pub node_vkey: PathBuf,
    pub node_counter: PathBuf,
    pub node_cert: PathBuf,
    pub vrf_skey: PathBuf,
    pub vrf_vkey: PathBuf,
    pub kes_skey: PathBuf,
    pub kes_vkey: PathBuf,
}

impl PoolFiles {
    pub fn at(paths: &PrivPaths, name: &str) -> Self {
        let file = |f: &str| paths.pool_file(name, f);
        Self {
            name: name.to_string(),
            node_skey: file("node.skey"),
            node_vkey: file("node.vkey"),
            node_counter: file("node.counter"),
            node_cert: file("node.cert"),
            vrf_skey: file("vrf.skey"),
            vrf_vkey: file("vrf.vkey"),
            kes_skey: file("kes.skey"),
            kes_vkey: file("kes.vkey"),
        }
    }

    /// Load a pool. The cold verification key, the counter and the VRF pair
    /// identify an existing pool; the cold signing key is checked separately
    /// by the workflows that sign with it.
    pub fn load(paths: &PrivPaths, name: &str) -> Result<Self, KeyStoreError> {
        let files = Self::at(paths, name);
        let required = [
            &files.node_vkey,
            &files.node_counter,
            &files.vrf_skey,
            &files.vrf_vkey,
        ];
        if let Some(missing) = required.into_iter().find(|p| !p.is_file()) {
            return Err(KeyStoreError::PoolNotFound {
                name: name.to_string(),
                missing: missing.to_path_buf(),
            });
        }
        Ok(files)
    }

    pub fn has_cold_signing_key(&self) -> bool {
        self.node_skey.is_file()
    }

    /// The files replaced by a KES rotation.
    pub fn rotating_files(&self) -> [PathBuf; 3] {
        [
            self.kes_skey.clone(),
            self.kes_vkey.clone(),
            self.node_cert.clone(),
        ]
    }

    pub fn has_kes_keys(&self) -> bool {
        self.kes_skey.exists() || self.kes_vkey.exists()
    }
}

fn read_trimmed(path: &Path) -> Result<String, KeyStoreError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| KeyStoreError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Create the directory holding a wallet's or pool's files.
pub fn ensure_dir(dir: &Path) -> Result<(), KeyStoreError> {
    fs::create_dir_all(dir).map_err(|source| KeyStoreError::Io {
        path: dir.to_path_buf(),
        source,
    })
}
