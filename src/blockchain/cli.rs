// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ledger CLI collaborator.
//!
//! Transaction encoding, fee arithmetic, key generation and signing are all
//! delegated to `cardano-cli`. Two traits split the surface by trust domain:
//!
//! - [`NodeCli`] is what the relay needs: chain queries and submission
//!   against the local node socket.
//! - [`LedgerCli`] is what the console needs: offline key, certificate and
//!   transaction-body operations. It never touches a node.
//!
//! [`CardanoCli`] implements both on top of a [`CommandRunner`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tempfile::NamedTempFile;

use super::types::{ChainTip, StakeAddressInfo, TextEnvelope, TxDraft, TxIn, Utxo, Value, LOVELACE};
use crate::config::{Network, PoolRelay, ToolPaths};
use crate::process::{CommandRunner, ProcessError};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("unexpected {what} output: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("node socket and shelley genesis are not configured")]
    NodeNotConfigured,
}

fn parse_err(what: &'static str, detail: impl ToString) -> LedgerError {
    LedgerError::Parse {
        what,
        detail: detail.to_string(),
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> LedgerError + '_ {
    move |source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Chain-facing operations used by the relay.
pub trait NodeCli: Send + Sync {
    fn node_version(&self) -> Result<String, LedgerError>;
    fn query_tip(&self) -> Result<ChainTip, LedgerError>;
    /// KES period of the current tip (`slot / slotsPerKESPeriod`).
    fn kes_period(&self) -> Result<u64, LedgerError>;
    fn stake_address_info(&self, address: &str) -> Result<StakeAddressInfo, LedgerError>;
    /// Protocol parameters as reported by the node, unmodified.
    fn protocol_params(&self) -> Result<serde_json::Value, LedgerError>;
    fn utxo(&self, address: &str) -> Result<Vec<Utxo>, LedgerError>;
    /// Submit a signed transaction and return its hash.
    fn submit(&self, tx: &TextEnvelope) -> Result<String, LedgerError>;
}

/// Registration parameters handed to `stake-pool registration-certificate`.
#[derive(Debug, Clone)]
pub struct PoolRegistration<'a> {
    pub cold_vkey: &'a Path,
    pub vrf_vkey: &'a Path,
    pub pledge_lovelace: u64,
    pub cost_lovelace: u64,
    pub margin: f64,
    pub reward_stake_vkey: &'a Path,
    pub owner_stake_vkey: &'a Path,
    pub relays: &'a [PoolRelay],
    pub metadata_url: &'a str,
    pub metadata_hash: &'a str,
}

/// Offline ledger operations used by the console.
pub trait LedgerCli: Send + Sync {
    fn local_node_version(&self) -> Result<String, LedgerError>;
    fn local_cli_version(&self) -> Result<String, LedgerError>;

    // Keys and addresses
    fn address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError>;
    fn stake_address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError>;
    fn stake_address_build(&self, stake_vkey: &Path, network: Network)
        -> Result<String, LedgerError>;
    fn address_build(
        &self,
        payment_vkey: &Path,
        stake_vkey: Option<&Path>,
        network: Network,
    ) -> Result<String, LedgerError>;
    fn address_key_hash(&self, payment_vkey: &Path) -> Result<String, LedgerError>;
    fn verification_key(&self, skey: &Path, vkey_out: &Path) -> Result<(), LedgerError>;
    fn non_extended_key(&self, extended_vkey: &Path, vkey_out: &Path)
        -> Result<(), LedgerError>;

    // Pool keys
    fn node_key_gen(&self, cold_vkey: &Path, cold_skey: &Path, counter: &Path)
        -> Result<(), LedgerError>;
    fn node_key_gen_vrf(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError>;
    fn node_key_gen_kes(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError>;
    fn issue_op_cert(
        &self,
        kes_vkey: &Path,
        cold_skey: &Path,
        counter: &Path,
        kes_period: u64,
        out: &Path,
    ) -> Result<(), LedgerError>;
    fn stake_pool_id(&self, cold_vkey: &Path) -> Result<String, LedgerError>;
    fn pool_metadata_hash(&self, metadata: &Path) -> Result<String, LedgerError>;

    // Certificates
    fn stake_registration_cert(&self, stake_vkey: &Path, out: &Path) -> Result<(), LedgerError>;
    fn pool_registration_cert(
        &self,
        registration: &PoolRegistration<'_>,
        network: Network,
        out: &Path,
    ) -> Result<(), LedgerError>;
    fn delegation_cert(&self, stake_vkey: &Path, cold_vkey: &Path, out: &Path)
        -> Result<(), LedgerError>;
    fn deregistration_cert(&self, cold_vkey: &Path, epoch: u64, out: &Path)
        -> Result<(), LedgerError>;

    // Transactions
    fn policy_id(&self, script: &Path) -> Result<String, LedgerError>;
    fn build_raw(&self, draft: &TxDraft, out: &Path) -> Result<(), LedgerError>;
    fn calculate_min_fee(
        &self,
        body: &Path,
        draft: &TxDraft,
        witness_count: usize,
        protocol_params: &Path,
        network: Network,
    ) -> Result<u64, LedgerError>;
    fn sign(
        &self,
        body: &Path,
        signing_keys: &[PathBuf],
        network: Network,
        out: &Path,
    ) -> Result<(), LedgerError>;
}

/// Node connection used by the relay-side queries.
#[derive(Debug, Clone)]
pub struct NodeConnection {
    pub socket_path: PathBuf,
    pub shelley_genesis: PathBuf,
    pub network: Network,
}

/// `cardano-cli` / `cardano-node` driven through a [`CommandRunner`].
#[derive(Clone)]
pub struct CardanoCli {
    runner: Arc<dyn CommandRunner>,
    cli: String,
    node: String,
    connection: Option<NodeConnection>,
}

impl CardanoCli {
    pub fn new(runner: Arc<dyn CommandRunner>, tools: &ToolPaths) -> Self {
        Self {
            runner,
            cli: tools.cardano_cli.clone(),
            node: tools.cardano_node.clone(),
            connection: None,
        }
    }

    /// Attach the node socket; required for [`NodeCli`].
    pub fn with_node(mut self, connection: NodeConnection) -> Self {
        self.connection = Some(connection);
        self
    }

    fn run(&self, args: CliArgs) -> Result<String, LedgerError> {
        let refs = args.as_refs();
        Ok(self.runner.run_text(&self.cli, &refs)?)
    }

    fn connection(&self) -> Result<&NodeConnection, LedgerError> {
        self.connection.as_ref().ok_or(LedgerError::NodeNotConfigured)
    }

    /// Query arguments shared by every node query.
    fn query(&self, sub: &str) -> Result<CliArgs, LedgerError> {
        let connection = self.connection()?;
        Ok(CliArgs::new(["query", sub])
            .network(connection.network)
            .path("--socket-path", &connection.socket_path))
    }
}

impl NodeCli for CardanoCli {
    fn node_version(&self) -> Result<String, LedgerError> {
        parse_version(&self.runner.run_text(&self.node, &["version"])?)
    }

    fn query_tip(&self) -> Result<ChainTip, LedgerError> {
        let raw = self.run(self.query("tip")?)?;
        serde_json::from_str(&raw).map_err(|e| parse_err("tip", e))
    }

    fn kes_period(&self) -> Result<u64, LedgerError> {
        let genesis_path = &self.connection()?.shelley_genesis;
        let raw = fs::read_to_string(genesis_path).map_err(io_err(genesis_path))?;
        let slots_per_period = slots_per_kes_period(&raw)?;
        Ok(self.query_tip()?.slot / slots_per_period)
    }

    fn stake_address_info(&self, address: &str) -> Result<StakeAddressInfo, LedgerError> {
        let raw = self.run(self.query("stake-address-info")?.pair("--address", address))?;
        serde_json::from_str(&raw).map_err(|e| parse_err("stake address info", e))
    }

    fn protocol_params(&self) -> Result<serde_json::Value, LedgerError> {
        let raw = self.run(self.query("protocol-parameters")?)?;
        serde_json::from_str(&raw).map_err(|e| parse_err("protocol parameters", e))
    }

    fn utxo(&self, address: &str) -> Result<Vec<Utxo>, LedgerError> {
        let out = NamedTempFile::new().map_err(io_err(Path::new("utxo query output")))?;
        self.run(
            self.query("utxo")?
                .pair("--address", address)
                .path("--out-file", out.path()),
        )?;
        let raw = fs::read_to_string(out.path()).map_err(io_err(out.path()))?;
        parse_utxo_json(&raw)
    }

    fn submit(&self, tx: &TextEnvelope) -> Result<String, LedgerError> {
        let connection = self.connection()?;
        let mut file = NamedTempFile::new().map_err(io_err(Path::new("signed tx")))?;
        serde_json::to_writer(&mut file, tx).map_err(|e| parse_err("signed tx", e))?;

        self.run(
            CliArgs::new(["transaction", "submit"])
                .path("--tx-file", file.path())
                .network(connection.network)
                .path("--socket-path", &connection.socket_path),
        )?;
        let hash = self.run(CliArgs::new(["transaction", "txid"]).path("--tx-file", file.path()))?;
        Ok(parse_tx_id(&hash))
    }
}

impl LedgerCli for CardanoCli {
    fn local_node_version(&self) -> Result<String, LedgerError> {
        parse_version(&self.runner.run_text(&self.node, &["version"])?)
    }

    fn local_cli_version(&self) -> Result<String, LedgerError> {
        parse_version(&self.run(CliArgs::new(["version"]))?)
    }

    fn address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["address", "key-gen"])
                .path("--verification-key-file", vkey)
                .path("--signing-key-file", skey),
        )
        .map(drop)
    }

    fn stake_address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["stake-address", "key-gen"])
                .path("--verification-key-file", vkey)
                .path("--signing-key-file", skey),
        )
        .map(drop)
    }

    fn stake_address_build(
        &self,
        stake_vkey: &Path,
        network: Network,
    ) -> Result<String, LedgerError> {
        self.run(
            CliArgs::new(["stake-address", "build"])
                .path("--stake-verification-key-file", stake_vkey)
                .network(network),
        )
    }

    fn address_build(
        &self,
        payment_vkey: &Path,
        stake_vkey: Option<&Path>,
        network: Network,
    ) -> Result<String, LedgerError> {
        let mut args = CliArgs::new(["address", "build"])
            .path("--payment-verification-key-file", payment_vkey);
        if let Some(stake_vkey) = stake_vkey {
            args = args.path("--stake-verification-key-file", stake_vkey);
        }
        self.run(args.network(network))
    }

    fn address_key_hash(&self, payment_vkey: &Path) -> Result<String, LedgerError> {
        self.run(
            CliArgs::new(["address", "key-hash"])
                .path("--payment-verification-key-file", payment_vkey),
        )
    }

    fn verification_key(&self, skey: &Path, vkey_out: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["key", "verification-key"])
                .path("--signing-key-file", skey)
                .path("--verification-key-file", vkey_out),
        )
        .map(drop)
    }

    fn non_extended_key(&self, extended_vkey: &Path, vkey_out: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["key", "non-extended-key"])
                .path("--extended-verification-key-file", extended_vkey)
                .path("--verification-key-file", vkey_out),
        )
        .map(drop)
    }

    fn node_key_gen(
        &self,
        cold_vkey: &Path,
        cold_skey: &Path,
        counter: &Path,
    ) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["node", "key-gen"])
                .path("--cold-verification-key-file", cold_vkey)
                .path("--cold-signing-key-file", cold_skey)
                .path("--operational-certificate-issue-counter-file", counter),
        )
        .map(drop)
    }

    fn node_key_gen_vrf(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["node", "key-gen-VRF"])
                .path("--verification-key-file", vkey)
                .path("--signing-key-file", skey),
        )
        .map(drop)
    }

    fn node_key_gen_kes(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["node", "key-gen-KES"])
                .path("--verification-key-file", vkey)
                .path("--signing-key-file", skey),
        )
        .map(drop)
    }

    fn issue_op_cert(
        &self,
        kes_vkey: &Path,
        cold_skey: &Path,
        counter: &Path,
        kes_period: u64,
        out: &Path,
    ) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["node", "issue-op-cert"])
                .path("--kes-verification-key-file", kes_vkey)
                .path("--cold-signing-key-file", cold_skey)
                .path("--operational-certificate-issue-counter", counter)
                .pair("--kes-period", kes_period)
                .path("--out-file", out),
        )
        .map(drop)
    }

    fn stake_pool_id(&self, cold_vkey: &Path) -> Result<String, LedgerError> {
        self.run(
            CliArgs::new(["stake-pool", "id"])
                .path("--cold-verification-key-file", cold_vkey)
                .pair("--output-format", "hex"),
        )
    }

    fn pool_metadata_hash(&self, metadata: &Path) -> Result<String, LedgerError> {
        self.run(CliArgs::new(["stake-pool", "metadata-hash"]).path("--pool-metadata-file", metadata))
    }

    fn stake_registration_cert(&self, stake_vkey: &Path, out: &Path) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["stake-address", "registration-certificate"])
                .path("--stake-verification-key-file", stake_vkey)
                .path("--out-file", out),
        )
        .map(drop)
    }

    fn pool_registration_cert(
        &self,
        registration: &PoolRegistration<'_>,
        network: Network,
        out: &Path,
    ) -> Result<(), LedgerError> {
        let mut args = CliArgs::new(["stake-pool", "registration-certificate"])
            .path("--cold-verification-key-file", registration.cold_vkey)
            .path("--vrf-verification-key-file", registration.vrf_vkey)
            .pair("--pool-pledge", registration.pledge_lovelace)
            .pair("--pool-cost", registration.cost_lovelace)
            .pair("--pool-margin", registration.margin)
            .path(
                "--pool-reward-account-verification-key-file",
                registration.reward_stake_vkey,
            )
            .path(
                "--pool-owner-stake-verification-key-file",
                registration.owner_stake_vkey,
            );
        for relay in registration.relays {
            args = if relay.host.parse::<Ipv4Addr>().is_ok() {
                args.pair("--pool-relay-ipv4", &relay.host)
            } else {
                args.pair("--single-host-pool-relay", &relay.host)
            }
            .pair("--pool-relay-port", relay.port);
        }
        self.run(
            args.pair("--metadata-url", registration.metadata_url)
                .pair("--metadata-hash", registration.metadata_hash)
                .network(network)
                .path("--out-file", out),
        )
        .map(drop)
    }

    fn delegation_cert(
        &self,
        stake_vkey: &Path,
        cold_vkey: &Path,
        out: &Path,
    ) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["stake-address", "delegation-certificate"])
                .path("--stake-verification-key-file", stake_vkey)
                .path("--cold-verification-key-file", cold_vkey)
                .path("--out-file", out),
        )
        .map(drop)
    }

    fn deregistration_cert(
        &self,
        cold_vkey: &Path,
        epoch: u64,
        out: &Path,
    ) -> Result<(), LedgerError> {
        self.run(
            CliArgs::new(["stake-pool", "deregistration-certificate"])
                .path("--cold-verification-key-file", cold_vkey)
                .pair("--epoch", epoch)
                .path("--out-file", out),
        )
        .map(drop)
    }

    fn policy_id(&self, script: &Path) -> Result<String, LedgerError> {
        self.run(CliArgs::new(["transaction", "policyid"]).path("--script-file", script))
    }

    fn build_raw(&self, draft: &TxDraft, out: &Path) -> Result<(), LedgerError> {
        self.run(build_raw_args(draft, out)).map(drop)
    }

    fn calculate_min_fee(
        &self,
        body: &Path,
        draft: &TxDraft,
        witness_count: usize,
        protocol_params: &Path,
        network: Network,
    ) -> Result<u64, LedgerError> {
        let raw = self.run(
            CliArgs::new(["transaction", "calculate-min-fee"])
                .path("--tx-body-file", body)
                .pair("--tx-in-count", draft.inputs.len())
                .pair("--tx-out-count", draft.outputs.len())
                .pair("--witness-count", witness_count)
                .pair("--byron-witness-count", 0)
                .network(network)
                .path("--protocol-params-file", protocol_params),
        )?;
        parse_min_fee(&raw)
    }

    fn sign(
        &self,
        body: &Path,
        signing_keys: &[PathBuf],
        network: Network,
        out: &Path,
    ) -> Result<(), LedgerError> {
        let mut args = CliArgs::new(["transaction", "sign"]).path("--tx-body-file", body);
        for key in signing_keys {
            args = args.path("--signing-key-file", key);
        }
        self.run(args.network(network).path("--out-file", out)).map(drop)
    }
}

/// Owned argument list with small builder helpers.
#[derive(Debug, Default)]
struct CliArgs(Vec<String>);

impl CliArgs {
    fn new<const N: usize>(command: [&str; N]) -> Self {
        Self(command.iter().map(|s| s.to_string()).collect())
    }

    fn pair(mut self, flag: &str, value: impl ToString) -> Self {
        self.0.push(flag.to_string());
        self.0.push(value.to_string());
        self
    }

    fn path(self, flag: &str, path: &Path) -> Self {
        let value = path.to_string_lossy().into_owned();
        self.pair(flag, value)
    }

    fn network(mut self, network: Network) -> Self {
        self.0.extend(network.cli_args());
        self
    }

    fn as_refs(&self) -> Vec<&str> {
        self.0.iter().map(String::as_str).collect()
    }
}

fn build_raw_args(draft: &TxDraft, out: &Path) -> CliArgs {
    let mut args = CliArgs::new(["transaction", "build-raw"]);
    for input in &draft.inputs {
        args = args.pair("--tx-in", input);
    }
    for output in &draft.outputs {
        args = args.pair("--tx-out", format_tx_out(&output.address, &output.value));
    }
    args = args.pair("--fee", draft.fee);
    for cert in &draft.certificates {
        args = args.path("--certificate-file", &cert.path);
    }
    if !draft.mint.is_empty() {
        let mint = draft
            .mint
            .iter()
            .map(|m| format!("{} {}", m.quantity, m.asset_id()))
            .collect::<Vec<_>>()
            .join("+");
        args = args.pair("--mint", mint);
        let mut scripts: Vec<&Path> = draft.mint.iter().map(|m| m.script.as_path()).collect();
        scripts.dedup();
        for script in scripts {
            args = args.path("--minting-script-file", script);
        }
    }
    args.path("--out-file", out)
}

/// `addr+lovelace[+qty asset]...`; zero quantities are dropped.
pub fn format_tx_out(address: &str, value: &Value) -> String {
    let mut out = format!("{address}+{}", value.lovelace());
    for (asset, quantity) in value.iter() {
        if asset != LOVELACE && *quantity > 0 {
            out.push_str(&format!("+{quantity} {asset}"));
        }
    }
    out
}

/// Extract the version from `cardano-node version` / `cardano-cli version`
/// output, e.g. `cardano-node 8.1.2 - linux-x86_64 - ghc-8.10`.
pub fn parse_version(output: &str) -> Result<String, LedgerError> {
    output
        .lines()
        .filter_map(|line| {
            let mut words = line.split_whitespace();
            let tool = words.next()?;
            tool.contains("cardano").then(|| words.next()).flatten()
        })
        .next()
        .map(str::to_string)
        .ok_or_else(|| parse_err("version", output))
}

/// Parse `calculate-min-fee` output: `171661 Lovelace` or a bare number.
pub fn parse_min_fee(output: &str) -> Result<u64, LedgerError> {
    output
        .split_whitespace()
        .next()
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| parse_err("min fee", output))
}

/// `transaction txid` prints either the bare hash or `{"txhash": ...}`.
fn parse_tx_id(output: &str) -> String {
    #[derive(Deserialize)]
    struct TxId {
        txhash: String,
    }
    serde_json::from_str::<TxId>(output)
        .map(|id| id.txhash)
        .unwrap_or_else(|_| output.trim().to_string())
}

fn slots_per_kes_period(genesis: &str) -> Result<u64, LedgerError> {
    #[derive(Deserialize)]
    struct Genesis {
        #[serde(rename = "slotsPerKESPeriod")]
        slots_per_kes_period: u64,
    }
    let genesis: Genesis =
        serde_json::from_str(genesis).map_err(|e| parse_err("shelley genesis", e))?;
    if genesis.slots_per_kes_period == 0 {
        return Err(parse_err("shelley genesis", "slotsPerKESPeriod is zero"));
    }
    Ok(genesis.slots_per_kes_period)
}

/// Parse `query utxo --out-file` JSON into flat [`Utxo`] entries.
///
/// Native assets are nested `{policyId: {assetNameHex: qty}}` on the wire and
/// flattened to `policyId.assetNameHex` keys.
pub fn parse_utxo_json(raw: &str) -> Result<Vec<Utxo>, LedgerError> {
    #[derive(Deserialize)]
    struct Entry {
        address: String,
        value: BTreeMap<String, serde_json::Value>,
    }

    let entries: BTreeMap<String, Entry> =
        serde_json::from_str(raw).map_err(|e| parse_err("utxo", e))?;

    let mut utxos = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let tx_in = TxIn::parse(&key).ok_or_else(|| parse_err("utxo", format!("bad tx in {key}")))?;
        let mut value = Value::new();
        for (asset, quantity) in entry.value {
            match quantity {
                serde_json::Value::Number(n) => {
                    let n = n
                        .as_u64()
                        .ok_or_else(|| parse_err("utxo", format!("bad quantity for {asset}")))?;
                    value.set(asset, n);
                }
                serde_json::Value::Object(names) => {
                    for (name, n) in names {
                        let n = n
                            .as_u64()
                            .ok_or_else(|| parse_err("utxo", format!("bad quantity for {asset}")))?;
                        value.set(super::types::asset_id(&asset, &name), n);
                    }
                }
                other => return Err(parse_err("utxo", format!("bad value for {asset}: {other}"))),
            }
        }
        utxos.push(Utxo {
            tx_in,
            address: entry.address,
            value,
        });
    }
    Ok(utxos)
}
