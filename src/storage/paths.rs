// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the vault layout.

use std::fmt;
use std::path::{Path, PathBuf};

/// Default vault root, relative to the working directory.
pub const PRIV_ROOT: &str = "./priv";

/// Suffix of an encrypted domain archive.
pub const ARCHIVE_SUFFIX: &str = ".tar.gz.gpg";

/// The two independently locked key domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    Pool,
    Wallet,
}

impl Domain {
    pub const ALL: [Domain; 2] = [Domain::Pool, Domain::Wallet];

    pub fn dir_name(&self) -> &'static str {
        match self {
            Domain::Pool => "pool",
            Domain::Wallet => "wallet",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// Path utilities for the vault root.
#[derive(Debug, Clone)]
pub struct PrivPaths {
    root: PathBuf,
}

impl Default for PrivPaths {
    fn default() -> Self {
        Self::new(PRIV_ROOT)
    }
}

impl PrivPaths {
    /// Create a new PrivPaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the vault.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Domain Paths ==========

    /// Plaintext working directory of a domain; exists only while unlocked.
    pub fn working_dir(&self, domain: Domain) -> PathBuf {
        self.root.join(domain.dir_name())
    }

    /// Encrypted archive of a domain.
    pub fn archive(&self, domain: Domain) -> PathBuf {
        self.root
            .join(format!("{}{ARCHIVE_SUFFIX}", domain.dir_name()))
    }

    // ========== Wallet Paths ==========

    /// Directory for a specific wallet.
    pub fn wallet_dir(&self, wallet: &str) -> PathBuf {
        self.working_dir(Domain::Wallet).join(wallet)
    }

    /// Path of a wallet file, e.g. `wallet_file("owner", "payment.skey")`
    /// → `wallet/owner/owner.payment.skey`.
    pub fn wallet_file(&self, wallet: &str, file: &str) -> PathBuf {
        self.wallet_dir(wallet).join(format!("{wallet}.{file}"))
    }

    // ========== Pool Paths ==========

    /// Directory for a specific pool.
    pub fn pool_dir(&self, pool: &str) -> PathBuf {
        self.working_dir(Domain::Pool).join(pool)
    }

    /// Path of a pool file, e.g. `pool_file("p", "kes.skey")`
    /// → `pool/p/p.kes.skey`.
    pub fn pool_file(&self, pool: &str, file: &str) -> PathBuf {
        self.pool_dir(pool).join(format!("{pool}.{file}"))
    }
}
