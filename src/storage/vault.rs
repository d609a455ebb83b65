// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Passphrase-encrypted key vault.
//!
//! Each [`Domain`] is either a plaintext working directory (`priv/pool`) or an
//! encrypted archive (`priv/pool.tar.gz.gpg`), never both authoritative at
//! once:
//!
//! - `lock` writes the archive, then removes the working directory.
//! - `unlock` extracts the working directory, then removes the archive.
//!
//! Packing and encryption are delegated to `tar` and `gpg` through the
//! [`CommandRunner`] seam. The passphrase is fed to `gpg` on stdin
//! (`--passphrase-fd 0`), never on the command line.
//!
//! [`VaultSession`] is the scoped form used by the workflow runner: domains
//! unlocked through a session are locked again when it is closed or dropped.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use super::backup::{backup_file, backup_suffix_now};
use super::paths::{Domain, PrivPaths};
use crate::process::{CommandRunner, ProcessError};

/// Passphrases must be strictly longer than this many characters.
pub const PASSPHRASE_MIN_EXCLUSIVE: usize = 3;

/// Validated vault passphrase. Zeroized on drop, redacted in `Debug`.
#[derive(Clone)]
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    /// Validate raw input. Input is never truncated or padded.
    pub fn new(raw: impl Into<String>) -> Result<Self, VaultError> {
        let raw = Zeroizing::new(raw.into());
        if raw.chars().count() <= PASSPHRASE_MIN_EXCLUSIVE {
            return Err(VaultError::PassphraseTooShort);
        }
        Ok(Self(raw))
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// Errors raised by vault operations. None of them carries the passphrase.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("pass phrase must be more than {PASSPHRASE_MIN_EXCLUSIVE} characters")]
    PassphraseTooShort,

    #[error("unable to decrypt the {0} vault: wrong pass phrase or damaged archive")]
    Decryption(Domain),

    #[error("{domain} vault archive did not contain a `{domain}` directory")]
    MalformedArchive { domain: Domain },

    #[error("{domain} vault {action} failed: {source}")]
    Tool {
        domain: Domain,
        action: &'static str,
        #[source]
        source: ProcessError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Observable state of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultState {
    /// Only the encrypted archive exists.
    Locked,
    /// The plaintext working directory exists.
    Unlocked,
    /// Neither exists yet (fresh install).
    Empty,
}

/// Result of [`VaultManager::lock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Locked { backup: Option<PathBuf> },
    NothingToLock,
}

/// Result of [`VaultManager::unlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked,
    AlreadyUnlocked,
    NothingToUnlock,
}

/// Encrypts and decrypts vault domains.
#[derive(Clone)]
pub struct VaultManager {
    paths: PrivPaths,
    runner: Arc<dyn CommandRunner>,
    tar: String,
    gpg: String,
}

impl VaultManager {
    pub fn new(paths: PrivPaths, runner: Arc<dyn CommandRunner>) -> Self {
        Self::with_tools(paths, runner, "tar", "gpg")
    }

    pub fn with_tools(
        paths: PrivPaths,
        runner: Arc<dyn CommandRunner>,
        tar: impl Into<String>,
        gpg: impl Into<String>,
    ) -> Self {
        Self {
            paths,
            runner,
            tar: tar.into(),
            gpg: gpg.into(),
        }
    }

    pub fn paths(&self) -> &PrivPaths {
        &self.paths
    }

    pub fn state(&self, domain: Domain) -> VaultState {
        if self.paths.working_dir(domain).is_dir() {
            VaultState::Unlocked
        } else if self.paths.archive(domain).is_file() {
            VaultState::Locked
        } else {
            VaultState::Empty
        }
    }

    /// Pack and encrypt the working directory of `domain`, then remove it.
    ///
    /// A pre-existing archive is backed up to a timestamped copy first.
    pub fn lock(&self, domain: Domain, passphrase: &Passphrase) -> Result<LockOutcome, VaultError> {
        let working = self.paths.working_dir(domain);
        if !working.is_dir() {
            return Ok(LockOutcome::NothingToLock);
        }

        let archive = self.paths.archive(domain);
        let backup = if archive.exists() {
            let backup = backup_file(&archive, &backup_suffix_now()).map_err(io_at(&archive))?;
            info!(%domain, backup = %backup.display(), "backed up previous vault archive");
            Some(backup)
        } else {
            None
        };

        let root = self.paths.root().to_string_lossy().into_owned();
        let tarball = Zeroizing::new(
            self.runner
                .run(&self.tar, &["czf", "-", "-C", &root, domain.dir_name()], None)
                .map_err(tool(domain, "pack"))?,
        );

        let input = with_passphrase(passphrase, &tarball);
        let encrypted = self
            .runner
            .run(
                &self.gpg,
                &[
                    "--batch",
                    "--yes",
                    "--quiet",
                    "--pinentry-mode",
                    "loopback",
                    "--passphrase-fd",
                    "0",
                    "--symmetric",
                    "--cipher-algo",
                    "AES256",
                    "--output",
                    "-",
                ],
                Some(&input),
            )
            .map_err(tool(domain, "encrypt"))?;

        self.write_archive(&archive, &encrypted)?;
        fs::remove_dir_all(&working).map_err(io_at(&working))?;

        info!(%domain, "vault locked");
        Ok(LockOutcome::Locked { backup })
    }

    /// Decrypt the archive of `domain` into its working directory, then
    /// remove the archive.
    ///
    /// A wrong passphrase fails with [`VaultError::Decryption`] before any
    /// plaintext touches the disk; the archive is left untouched.
    pub fn unlock(
        &self,
        domain: Domain,
        passphrase: &Passphrase,
    ) -> Result<UnlockOutcome, VaultError> {
        let archive = self.paths.archive(domain);
        if !archive.is_file() {
            info!(%domain, "nothing to unlock");
            return Ok(UnlockOutcome::NothingToUnlock);
        }

        let working = self.paths.working_dir(domain);
        if working.is_dir() {
            warn!(%domain, "working directory already present; leaving archive in place");
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        let encrypted = fs::read(&archive).map_err(io_at(&archive))?;
        let input = with_passphrase(passphrase, &encrypted);
        let tarball = Zeroizing::new(
            self.runner
                .run(
                    &self.gpg,
                    &[
                        "--batch",
                        "--quiet",
                        "--pinentry-mode",
                        "loopback",
                        "--passphrase-fd",
                        "0",
                        "--decrypt",
                    ],
                    Some(&input),
                )
                .map_err(|err| match err {
                    ProcessError::Failed { .. } => {
                        // gpg diagnostics are not forwarded; log a marker only.
                        warn!(%domain, "vault decryption rejected");
                        VaultError::Decryption(domain)
                    }
                    other => VaultError::Tool {
                        domain,
                        action: "decrypt",
                        source: other,
                    },
                })?,
        );

        // Extract beside the working directory and only move the domain
        // directory into place once the archive proved to contain it.
        // Anything else the archive held goes away with the staging dir.
        let root = self.paths.root();
        let staging = tempfile::Builder::new()
            .prefix(".unlock-")
            .tempdir_in(root)
            .map_err(io_at(root))?;
        let staging_arg = staging.path().to_string_lossy().into_owned();
        self.runner
            .run(&self.tar, &["xzf", "-", "-C", &staging_arg], Some(&tarball))
            .map_err(tool(domain, "unpack"))?;

        let staged = staging.path().join(domain.dir_name());
        if !staged.is_dir() {
            warn!(%domain, "archive does not contain the domain directory");
            return Err(VaultError::MalformedArchive { domain });
        }
        fs::rename(&staged, &working).map_err(io_at(&working))?;
        drop(staging);

        fs::remove_file(&archive).map_err(io_at(&archive))?;
        info!(%domain, "vault unlocked");
        Ok(UnlockOutcome::Unlocked)
    }

    /// Unlock `domains` and return a guard that locks them again.
    ///
    /// If a later domain fails to unlock, the guard is dropped and the
    /// earlier ones are locked before the error is returned.
    pub fn open_session(
        &self,
        domains: &[Domain],
        passphrase: Passphrase,
    ) -> Result<VaultSession<'_>, VaultError> {
        let session = VaultSession {
            vault: self,
            domains: domains.to_vec(),
            passphrase,
            closed: false,
        };
        for domain in domains {
            self.unlock(*domain, &session.passphrase)?;
        }
        Ok(session)
    }

    fn write_archive(&self, archive: &Path, data: &[u8]) -> Result<(), VaultError> {
        let dir = archive.parent().unwrap_or(self.paths.root());
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_at(dir))?;
        tmp.write_all(data).map_err(io_at(archive))?;
        tmp.flush().map_err(io_at(archive))?;
        tmp.persist(archive)
            .map_err(|e| VaultError::Io {
                path: archive.to_path_buf(),
                source: e.error,
            })?;
        Ok(())
    }
}

/// Scoped unlocked state over one or more domains.
///
/// [`VaultSession::close`] locks every domain and reports errors; dropping an
/// unclosed session does the same and logs failures.
pub struct VaultSession<'a> {
    vault: &'a VaultManager,
    domains: Vec<Domain>,
    passphrase: Passphrase,
    closed: bool,
}

impl VaultSession<'_> {
    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    /// Lock every domain of the session. All domains are attempted; the first
    /// error is returned.
    pub fn close(mut self) -> Result<Vec<(Domain, LockOutcome)>, VaultError> {
        self.closed = true;
        let mut outcomes = Vec::with_capacity(self.domains.len());
        let mut first_err = None;
        for domain in &self.domains {
            match self.vault.lock(*domain, &self.passphrase) {
                Ok(outcome) => outcomes.push((*domain, outcome)),
                Err(err) => {
                    error!(%domain, error = %err, "failed to re-lock vault");
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(outcomes),
        }
    }
}

impl Drop for VaultSession<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        for domain in &self.domains {
            if let Err(err) = self.vault.lock(*domain, &self.passphrase) {
                error!(%domain, error = %err, "failed to re-lock vault on drop");
            }
        }
    }
}

fn with_passphrase(passphrase: &Passphrase, payload: &[u8]) -> Zeroizing<Vec<u8>> {
    let secret = passphrase.expose().as_bytes();
    let mut input = Zeroizing::new(Vec::with_capacity(secret.len() + 1 + payload.len()));
    input.extend_from_slice(secret);
    input.push(b'\n');
    input.extend_from_slice(payload);
    input
}

fn io_at(path: &Path) -> impl Fn(io::Error) -> VaultError + '_ {
    move |source| VaultError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn tool(domain: Domain, action: &'static str) -> impl Fn(ProcessError) -> VaultError {
    move |source| VaultError::Tool {
        domain,
        action,
        source,
    }
}
