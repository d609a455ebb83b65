// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner wallet recovery from a mnemonic.
//!
//! Derivation runs entirely through external tools: `cardano-address` turns
//! the phrase into extended keys (the phrase goes over stdin, never argv),
//! `bech32` decodes them, and `cardano-cli` produces verification keys and
//! addresses. Every file is staged in a private directory under the vault
//! root and moved into the wallet directory only when all of them exist.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::OpsContext;
use crate::blockchain::{LedgerError, TextEnvelope};
use crate::config::{Network, ToolPaths};
use crate::error::OpsError;
use crate::operator::prompt_until;
use crate::process::CommandRunner;
use crate::storage::keys::ensure_dir;
use crate::storage::{backup_suffix_now, backup_then_remove, Wallet, WalletFiles};

const STAKE_PATH: &str = "1852H/1815H/0H/2/0";
const PAYMENT_PATH: &str = "1852H/1815H/0H/0/0";

const STAKE_SKEY_TYPE: &str = "StakeExtendedSigningKeyShelley_ed25519_bip32";
const PAYMENT_SKEY_TYPE: &str = "PaymentExtendedSigningKeyShelley_ed25519_bip32";

/// Testnet magic used when the configured network is mainnet but the
/// operator asks for a testnet wallet.
const FALLBACK_TESTNET_MAGIC: u32 = 2;

const WORD_COUNT_HINT: &str = "Must be 15 or 24 mnemonics separate by single white space";

/// A 15- or 24-word recovery phrase. Wiped on drop, never printed.
pub struct Mnemonic(Zeroizing<String>);

impl Mnemonic {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let words: Vec<&str> = raw.split_whitespace().collect();
        if !matches!(words.len(), 15 | 24) {
            return Err(WORD_COUNT_HINT.to_string());
        }
        if !words
            .iter()
            .all(|w| w.chars().all(|c| c.is_ascii_lowercase()))
        {
            return Err("mnemonic words must be lowercase letters".to_string());
        }
        Ok(Self(Zeroizing::new(words.join(" "))))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mnemonic(<redacted>)")
    }
}

/// Wallet names become file and directory names.
fn parse_wallet_name(raw: &str) -> Result<String, String> {
    let valid = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(raw.to_string())
    } else {
        Err("wallet name may only contain letters, digits, `-` and `_`".to_string())
    }
}

/// Build an extended signing key envelope from decoded key hex.
///
/// The CBOR body is a 128-byte string: the 64-byte extended private key
/// followed by the 32-byte public key and the 32-byte chain code.
pub fn extended_signing_envelope(
    kind: &str,
    description: &str,
    xprv_hex: &str,
    xpub_hex: &str,
) -> Result<TextEnvelope, LedgerError> {
    let is_hex = |s: &str| s.bytes().all(|b| b.is_ascii_hexdigit());
    if xprv_hex.len() < 128 || !is_hex(xprv_hex) {
        return Err(LedgerError::Parse {
            what: "extended private key",
            detail: format!("expected at least 64 bytes of hex, got {} chars", xprv_hex.len()),
        });
    }
    if xpub_hex.len() != 128 || !is_hex(xpub_hex) {
        return Err(LedgerError::Parse {
            what: "extended public key",
            detail: format!("expected 64 bytes of hex, got {} chars", xpub_hex.len()),
        });
    }
    Ok(TextEnvelope {
        kind: kind.to_string(),
        description: description.to_string(),
        cbor_hex: format!("5880{}{}", &xprv_hex[..128], xpub_hex),
    })
}

struct Deriver<'a> {
    runner: &'a dyn CommandRunner,
    tools: &'a ToolPaths,
}

impl Deriver<'_> {
    fn address_tool(&self, args: &[&str], input: &[u8]) -> Result<Zeroizing<String>, OpsError> {
        let out = Zeroizing::new(self.runner.run(&self.tools.cardano_address, args, Some(input))?);
        Ok(Zeroizing::new(String::from_utf8_lossy(&out).trim().to_string()))
    }

    fn decode_bech32(&self, encoded: &str) -> Result<Zeroizing<String>, OpsError> {
        let out = Zeroizing::new(
            self.runner
                .run(&self.tools.bech32, &[], Some(encoded.as_bytes()))?,
        );
        Ok(Zeroizing::new(String::from_utf8_lossy(&out).trim().to_string()))
    }
}

/// Extended keys and the address computed by `cardano-address`.
struct DerivedKeys {
    stake: TextEnvelope,
    payment: TextEnvelope,
    base_address: String,
}

impl Drop for DerivedKeys {
    fn drop(&mut self) {
        self.stake.cbor_hex.zeroize();
        self.payment.cbor_hex.zeroize();
    }
}

fn derive_keys(
    deriver: &Deriver<'_>,
    mnemonic: &Mnemonic,
    network: Network,
) -> Result<DerivedKeys, OpsError> {
    let root = deriver.address_tool(
        &["key", "from-recovery-phrase", "Shelley"],
        mnemonic.as_bytes(),
    )?;
    let stake_xprv = deriver.address_tool(&["key", "child", STAKE_PATH], root.as_bytes())?;
    let payment_xprv = deriver.address_tool(&["key", "child", PAYMENT_PATH], root.as_bytes())?;
    let stake_xpub = deriver.address_tool(
        &["key", "public", "--with-chain-code"],
        stake_xprv.as_bytes(),
    )?;
    let payment_xpub = deriver.address_tool(
        &["key", "public", "--with-chain-code"],
        payment_xprv.as_bytes(),
    )?;

    let enterprise = deriver.address_tool(
        &["address", "payment", "--network-tag", network.address_tag()],
        payment_xpub.as_bytes(),
    )?;
    let base_address = deriver.address_tool(
        &["address", "delegation", stake_xpub.as_str()],
        enterprise.as_bytes(),
    )?;

    let stake = extended_signing_envelope(
        STAKE_SKEY_TYPE,
        "",
        &deriver.decode_bech32(&stake_xprv)?,
        &deriver.decode_bech32(&stake_xpub)?,
    )?;
    let payment = extended_signing_envelope(
        PAYMENT_SKEY_TYPE,
        "Payment Signing Key",
        &deriver.decode_bech32(&payment_xprv)?,
        &deriver.decode_bech32(&payment_xpub)?,
    )?;

    Ok(DerivedKeys {
        stake,
        payment,
        base_address: base_address.to_string(),
    })
}

/// Write a file readable only by the owner.
fn write_private(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf, OpsError> {
    let target = dir.join(name);
    let mut file = NamedTempFile::new_in(dir).map_err(OpsError::io(dir))?;
    file.write_all(contents).map_err(OpsError::io(&target))?;
    file.persist(&target)
        .map_err(|e| OpsError::io(&target)(e.error))?;
    Ok(target)
}

fn write_envelope(dir: &Path, name: &str, envelope: &TextEnvelope) -> Result<PathBuf, OpsError> {
    let json = Zeroizing::new(
        serde_json::to_vec_pretty(envelope).map_err(|e| OpsError::Io {
            path: dir.join(name),
            source: e.into(),
        })?,
    );
    write_private(dir, name, &json)
}

/// Staged wallet files, keyed by their final file suffix.
struct Staged {
    _dir: TempDir,
    files: Vec<(&'static str, PathBuf)>,
}

fn stage_wallet(
    ctx: &OpsContext,
    keys: &DerivedKeys,
    network: Network,
) -> Result<Staged, OpsError> {
    let root = ctx.paths.root();
    fs::create_dir_all(root).map_err(OpsError::io(root))?;
    let dir = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(root)
        .map_err(OpsError::io(root))?;
    let staging = dir.path();

    let stake_skey = write_envelope(staging, "stake.skey", &keys.stake)?;
    let payment_skey = write_envelope(staging, "payment.skey", &keys.payment)?;

    let stake_evkey = staging.join("stake.evkey");
    let stake_vkey = staging.join("stake.vkey");
    ctx.ledger.verification_key(&stake_skey, &stake_evkey)?;
    ctx.ledger.non_extended_key(&stake_evkey, &stake_vkey)?;

    let payment_evkey = staging.join("payment.evkey");
    let payment_vkey = staging.join("payment.vkey");
    ctx.ledger.verification_key(&payment_skey, &payment_evkey)?;
    ctx.ledger.non_extended_key(&payment_evkey, &payment_vkey)?;

    let stake_addr = ctx.ledger.stake_address_build(&stake_vkey, network)?;
    let payment_addr = ctx
        .ledger
        .address_build(&payment_vkey, Some(&stake_vkey), network)?;
    if payment_addr.trim() != keys.base_address {
        warn!("base address from cardano-cli differs from cardano-address");
        ctx.notify(&format!(
            "Warning: cardano-address derived {} but cardano-cli built {}",
            keys.base_address,
            payment_addr.trim()
        ));
    }
    let stake_addr_file = write_private(staging, "stake.addr", stake_addr.trim().as_bytes())?;
    let payment_addr_file =
        write_private(staging, "payment.addr", payment_addr.trim().as_bytes())?;

    Ok(Staged {
        files: vec![
            ("payment.skey", payment_skey),
            ("payment.vkey", payment_vkey),
            ("payment.addr", payment_addr_file),
            ("stake.skey", stake_skey),
            ("stake.vkey", stake_vkey),
            ("stake.addr", stake_addr_file),
        ],
        _dir: dir,
    })
}

/// Move staged files into `wallet/<name>/`, backing up anything they replace.
fn install_wallet(ctx: &OpsContext, name: &str, staged: Staged) -> Result<Wallet, OpsError> {
    ensure_dir(&ctx.paths.wallet_dir(name))?;
    let targets: Vec<(PathBuf, PathBuf)> = staged
        .files
        .iter()
        .map(|(suffix, from)| (from.clone(), ctx.paths.wallet_file(name, suffix)))
        .collect();

    let replaced: Vec<PathBuf> = targets.iter().map(|(_, to)| to.clone()).collect();
    let backups = backup_then_remove(&replaced, &backup_suffix_now())
        .map_err(OpsError::io(ctx.paths.wallet_dir(name)))?;
    for backup in &backups {
        ctx.notify(&format!("Existing file backed up to {}", backup.display()));
    }

    for (from, to) in &targets {
        fs::rename(from, to).map_err(OpsError::io(to))?;
    }
    // Stale stake certificate belongs to the replaced key.
    let cert = WalletFiles::at(&ctx.paths, name).stake_cert;
    if cert.exists() {
        backup_then_remove(&[cert.clone()], &backup_suffix_now()).map_err(OpsError::io(&cert))?;
    }

    Ok(Wallet::load(&ctx.paths, name)?)
}

fn select_network(ctx: &OpsContext) -> Result<Network, OpsError> {
    let choice = ctx
        .operator
        .select("Select network", &["testnet", "mainnet"])
        .map_err(OpsError::Prompt)?;
    Ok(match choice {
        1 => Network::Mainnet,
        _ => match ctx.network() {
            Network::Testnet(magic) => Network::Testnet(magic),
            Network::Mainnet => Network::Testnet(FALLBACK_TESTNET_MAGIC),
        },
    })
}

pub fn extract_wallet_keys(ctx: &OpsContext) -> Result<Wallet, OpsError> {
    ctx.notify("This derives the first payment and stake key of a Shelley wallet.");
    ctx.notify("Run it on an offline machine. The mnemonic is not stored.");

    let network = select_network(ctx)?;
    let mnemonic = loop {
        let raw = ctx.operator.password("Mnemonics:").map_err(OpsError::Prompt)?;
        match Mnemonic::parse(&raw) {
            Ok(mnemonic) => break mnemonic,
            Err(reason) => ctx.notify(&reason),
        }
    };

    let deriver = Deriver {
        runner: ctx.runner.as_ref(),
        tools: &ctx.config.tools,
    };
    let keys = derive_keys(&deriver, &mnemonic, network)?;
    drop(mnemonic);
    ctx.notify(&format!("Derived address: {}", keys.base_address));

    let staged = stage_wallet(ctx, &keys, network)?;
    drop(keys);

    let name = prompt_until(ctx.operator.as_ref(), "Wallet name", parse_wallet_name)
        .map_err(OpsError::Prompt)?;
    let wallet = install_wallet(ctx, &name, staged)?;
    info!(wallet = %name, "wallet keys extracted");
    Ok(wallet)
}
