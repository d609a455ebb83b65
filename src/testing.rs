// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the process, ledger, relay, node and operator seams.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::TempDir;
use zeroize::Zeroizing;

use crate::blockchain::cli::{LedgerCli, LedgerError, NodeCli, PoolRegistration};
use crate::blockchain::client::{RelayApi, RelayError};
use crate::blockchain::types::{
    CertificateKind, ChainTip, ProtocolParams, StakeAddressInfo, TextEnvelope, TxDraft, TxIn,
    TxOut, Utxo, Value,
};
use crate::config::{sample_config, Network};
use crate::models::CoreKeysRequest;
use crate::operator::Operator;
use crate::process::{CommandRunner, ProcessError};
use crate::storage::{PoolFiles, WalletFiles};
use crate::workflows::OpsContext;

pub(crate) const FAKE_TX_HASH: &str =
    "5f3c1d2b9a8e7f6d5c4b3a291807f6e5d4c3b2a1908f7e6d5c4b3a2918070605";

pub(crate) const FAKE_VERSION: &str = "8.1.2";

// =============================================================================
// Process runner
// =============================================================================

const FAKE_GPG_MAGIC: &[u8] = b"FAKEGPG1";

type Canned = Result<Vec<u8>, (i32, String)>;

/// [`CommandRunner`] that emulates `tar` and `gpg` in-process and serves
/// canned output for everything else.
///
/// - fake `tar czf - -C <root> <dir>` serialises the tree as JSON with hex
///   file contents; `tar xzf - -C <root>` restores it.
/// - fake `gpg --symmetric` prefixes a magic and the SHA-256 of the
///   passphrase, then XORs the payload with that digest. `--decrypt` with a
///   different passphrase fails like real gpg (status 2).
#[derive(Default)]
pub(crate) struct FakeRunner {
    calls: Mutex<Vec<(String, Vec<String>)>>,
    canned: Mutex<HashMap<String, VecDeque<Canned>>>,
}

impl FakeRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue stdout for the next call of `program`.
    pub(crate) fn respond(&self, program: &str, stdout: impl Into<Vec<u8>>) {
        self.canned
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(Ok(stdout.into()));
    }

    /// Queue a failure for the next call of `program`.
    pub(crate) fn fail(&self, program: &str, status: i32, stderr: &str) {
        self.canned
            .lock()
            .unwrap()
            .entry(program.to_string())
            .or_default()
            .push_back(Err((status, stderr.to_string())));
    }

    pub(crate) fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn canned(&self, program: &str) -> Option<Canned> {
        self.canned
            .lock()
            .unwrap()
            .get_mut(program)
            .and_then(VecDeque::pop_front)
    }
}

impl CommandRunner for FakeRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, ProcessError> {
        self.calls.lock().unwrap().push((
            program.to_string(),
            args.iter().map(|a| a.to_string()).collect(),
        ));

        if let Some(canned) = self.canned(program) {
            return canned.map_err(|(status, stderr)| failed(program, status, &stderr));
        }

        match program {
            "tar" => fake_tar(args, input.unwrap_or_default()),
            "gpg" => fake_gpg(args, input.unwrap_or_default()),
            _ => Ok(Vec::new()),
        }
    }
}

fn failed(program: &str, status: i32, stderr: &str) -> ProcessError {
    ProcessError::Failed {
        program: program.to_string(),
        status,
        stderr: stderr.to_string(),
    }
}

#[derive(Serialize, Deserialize)]
struct FakeTarball {
    dirs: Vec<String>,
    files: BTreeMap<String, String>,
}

fn fake_tar(args: &[&str], input: &[u8]) -> Result<Vec<u8>, ProcessError> {
    match args {
        ["czf", "-", "-C", root, dir] => {
            let root = Path::new(root);
            let mut tarball = FakeTarball {
                dirs: Vec::new(),
                files: BTreeMap::new(),
            };
            let mut stack = vec![root.join(dir)];
            while let Some(current) = stack.pop() {
                let rel = relative(root, &current);
                tarball.dirs.push(rel);
                let entries = fs::read_dir(&current).map_err(|e| tar_io(e))?;
                for entry in entries {
                    let path = entry.map_err(tar_io)?.path();
                    if path.is_dir() {
                        stack.push(path);
                    } else {
                        let bytes = fs::read(&path).map_err(tar_io)?;
                        tarball.files.insert(relative(root, &path), hex::encode(bytes));
                    }
                }
            }
            serde_json::to_vec(&tarball).map_err(|e| failed("tar", 2, &e.to_string()))
        }
        ["xzf", "-", "-C", root] => {
            let tarball: FakeTarball = serde_json::from_slice(input)
                .map_err(|_| failed("tar", 2, "gzip: stdin: not in gzip format"))?;
            let root = Path::new(root);
            for dir in &tarball.dirs {
                fs::create_dir_all(root.join(dir)).map_err(tar_io)?;
            }
            for (rel, contents) in &tarball.files {
                let bytes = hex::decode(contents).map_err(|e| failed("tar", 2, &e.to_string()))?;
                fs::write(root.join(rel), bytes).map_err(tar_io)?;
            }
            Ok(Vec::new())
        }
        other => Err(failed("tar", 64, &format!("unsupported fake tar call {other:?}"))),
    }
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn tar_io(source: io::Error) -> ProcessError {
    ProcessError::Io {
        program: "tar".to_string(),
        source,
    }
}

fn fake_gpg(args: &[&str], input: &[u8]) -> Result<Vec<u8>, ProcessError> {
    let split = input
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| failed("gpg", 2, "no passphrase on fd 0"))?;
    let (passphrase, payload) = (&input[..split], &input[split + 1..]);
    let key: [u8; 32] = Sha256::digest(passphrase).into();

    if args.contains(&"--symmetric") {
        let mut out = FAKE_GPG_MAGIC.to_vec();
        out.extend_from_slice(&key);
        out.extend(xor(payload, &key));
        Ok(out)
    } else if args.contains(&"--decrypt") {
        let header = FAKE_GPG_MAGIC.len() + key.len();
        if payload.len() < header || &payload[..FAKE_GPG_MAGIC.len()] != FAKE_GPG_MAGIC {
            return Err(failed("gpg", 2, "no valid OpenPGP data found"));
        }
        if payload[FAKE_GPG_MAGIC.len()..header] != key {
            return Err(failed("gpg", 2, "decryption failed: Bad session key"));
        }
        Ok(xor(&payload[header..], &key))
    } else {
        Err(failed("gpg", 2, "unsupported fake gpg call"))
    }
}

fn xor(data: &[u8], key: &[u8; 32]) -> Vec<u8> {
    data.iter()
        .enumerate()
        .map(|(i, b)| b ^ key[i % key.len()])
        .collect()
}

// =============================================================================
// Ledger CLI
// =============================================================================

/// Snapshot of a transaction body handed to `build_raw`.
#[derive(Debug, Clone)]
pub(crate) struct DraftRecord {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub fee: u64,
    pub certificate_kinds: Vec<CertificateKind>,
    pub mint_quantities: Vec<(String, u64)>,
}

/// [`LedgerCli`] that writes placeholder files and records what it was asked.
pub(crate) struct FakeLedger {
    fee: u64,
    version: String,
    calls: Mutex<Vec<String>>,
    drafts: Mutex<Vec<DraftRecord>>,
    witness_counts: Mutex<Vec<usize>>,
    signed_with: Mutex<Vec<Vec<PathBuf>>>,
    op_cert_periods: Mutex<Vec<u64>>,
}

impl Default for FakeLedger {
    fn default() -> Self {
        Self::with_fee(170_000)
    }
}

impl FakeLedger {
    pub(crate) fn with_fee(fee: u64) -> Self {
        Self {
            fee,
            version: FAKE_VERSION.to_string(),
            calls: Mutex::default(),
            drafts: Mutex::default(),
            witness_counts: Mutex::default(),
            signed_with: Mutex::default(),
            op_cert_periods: Mutex::default(),
        }
    }

    pub(crate) fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn last_draft(&self) -> Option<DraftRecord> {
        self.drafts.lock().unwrap().last().cloned()
    }

    pub(crate) fn fee_witness_counts(&self) -> Vec<usize> {
        self.witness_counts.lock().unwrap().clone()
    }

    pub(crate) fn signed_with(&self) -> Vec<Vec<PathBuf>> {
        self.signed_with.lock().unwrap().clone()
    }

    pub(crate) fn op_cert_periods(&self) -> Vec<u64> {
        self.op_cert_periods.lock().unwrap().clone()
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), LedgerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| LedgerError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, contents).map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl LedgerCli for FakeLedger {
    fn local_node_version(&self) -> Result<String, LedgerError> {
        self.record("local_node_version");
        Ok(self.version.clone())
    }

    fn local_cli_version(&self) -> Result<String, LedgerError> {
        self.record("local_cli_version");
        Ok(self.version.clone())
    }

    fn address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.record("address_key_gen");
        self.write(vkey, "payment vkey")?;
        self.write(skey, "payment skey")
    }

    fn stake_address_key_gen(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.record("stake_address_key_gen");
        self.write(vkey, "stake vkey")?;
        self.write(skey, "stake skey")
    }

    fn stake_address_build(&self, _: &Path, _: Network) -> Result<String, LedgerError> {
        self.record("stake_address_build");
        Ok("stake_test1fake".to_string())
    }

    fn address_build(
        &self,
        _: &Path,
        stake_vkey: Option<&Path>,
        _: Network,
    ) -> Result<String, LedgerError> {
        self.record("address_build");
        Ok(if stake_vkey.is_some() {
            "addr_test1fakebase".to_string()
        } else {
            "addr_test1fakeenterprise".to_string()
        })
    }

    fn address_key_hash(&self, _: &Path) -> Result<String, LedgerError> {
        self.record("address_key_hash");
        Ok("keyhash0".to_string())
    }

    fn verification_key(&self, _: &Path, vkey_out: &Path) -> Result<(), LedgerError> {
        self.record("verification_key");
        self.write(vkey_out, "extended vkey")
    }

    fn non_extended_key(&self, _: &Path, vkey_out: &Path) -> Result<(), LedgerError> {
        self.record("non_extended_key");
        self.write(vkey_out, "vkey")
    }

    fn node_key_gen(
        &self,
        cold_vkey: &Path,
        cold_skey: &Path,
        counter: &Path,
    ) -> Result<(), LedgerError> {
        self.record("node_key_gen");
        self.write(cold_vkey, "cold vkey")?;
        self.write(cold_skey, "cold skey")?;
        self.write(counter, "counter 0")
    }

    fn node_key_gen_vrf(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.record("node_key_gen_vrf");
        self.write(vkey, "vrf vkey")?;
        self.write(skey, "vrf skey")
    }

    fn node_key_gen_kes(&self, vkey: &Path, skey: &Path) -> Result<(), LedgerError> {
        self.record("node_key_gen_kes");
        self.write(vkey, "new kes vkey")?;
        self.write(skey, "new kes skey")
    }

    fn issue_op_cert(
        &self,
        _: &Path,
        _: &Path,
        _: &Path,
        kes_period: u64,
        out: &Path,
    ) -> Result<(), LedgerError> {
        self.record("issue_op_cert");
        self.op_cert_periods.lock().unwrap().push(kes_period);
        self.write(out, &format!("op cert at period {kes_period}"))
    }

    fn stake_pool_id(&self, _: &Path) -> Result<String, LedgerError> {
        self.record("stake_pool_id");
        Ok("pool0fake".to_string())
    }

    fn pool_metadata_hash(&self, metadata: &Path) -> Result<String, LedgerError> {
        self.record("pool_metadata_hash");
        let contents = fs::read(metadata).map_err(|source| LedgerError::Io {
            path: metadata.to_path_buf(),
            source,
        })?;
        Ok(hex::encode(Sha256::digest(contents)))
    }

    fn stake_registration_cert(&self, _: &Path, out: &Path) -> Result<(), LedgerError> {
        self.record("stake_registration_cert");
        self.write(out, "stake registration cert")
    }

    fn pool_registration_cert(
        &self,
        registration: &PoolRegistration<'_>,
        _: Network,
        out: &Path,
    ) -> Result<(), LedgerError> {
        self.record("pool_registration_cert");
        self.write(
            out,
            &format!(
                "pool registration pledge={} cost={} margin={} hash={}",
                registration.pledge_lovelace,
                registration.cost_lovelace,
                registration.margin,
                registration.metadata_hash
            ),
        )
    }

    fn delegation_cert(&self, _: &Path, _: &Path, out: &Path) -> Result<(), LedgerError> {
        self.record("delegation_cert");
        self.write(out, "delegation cert")
    }

    fn deregistration_cert(&self, _: &Path, epoch: u64, out: &Path) -> Result<(), LedgerError> {
        self.record("deregistration_cert");
        self.write(out, &format!("retire at {epoch}"))
    }

    fn policy_id(&self, _: &Path) -> Result<String, LedgerError> {
        self.record("policy_id");
        Ok("policy0".to_string())
    }

    fn build_raw(&self, draft: &TxDraft, out: &Path) -> Result<(), LedgerError> {
        self.record("build_raw");
        self.drafts.lock().unwrap().push(DraftRecord {
            inputs: draft.inputs.clone(),
            outputs: draft.outputs.clone(),
            fee: draft.fee,
            certificate_kinds: draft.certificates.iter().map(|c| c.kind).collect(),
            mint_quantities: draft
                .mint
                .iter()
                .map(|m| (m.asset_id(), m.quantity))
                .collect(),
        });
        self.write(out, "tx body")
    }

    fn calculate_min_fee(
        &self,
        _: &Path,
        _: &TxDraft,
        witness_count: usize,
        _: &Path,
        _: Network,
    ) -> Result<u64, LedgerError> {
        self.record("calculate_min_fee");
        self.witness_counts.lock().unwrap().push(witness_count);
        Ok(self.fee)
    }

    fn sign(
        &self,
        _: &Path,
        signing_keys: &[PathBuf],
        _: Network,
        out: &Path,
    ) -> Result<(), LedgerError> {
        self.record("sign");
        self.signed_with.lock().unwrap().push(signing_keys.to_vec());
        let envelope = TextEnvelope {
            kind: "Tx BabbageEra".to_string(),
            description: String::new(),
            cbor_hex: "84a400818258200000".to_string(),
        };
        let json = serde_json::to_string(&envelope).map_err(|e| LedgerError::Parse {
            what: "signed tx",
            detail: e.to_string(),
        })?;
        self.write(out, &json)
    }
}

// =============================================================================
// Relay
// =============================================================================

pub(crate) fn sample_params() -> ProtocolParams {
    serde_json::from_value(serde_json::json!({
        "stakeAddressDeposit": 2_000_000u64,
        "stakePoolDeposit": 500_000_000u64,
        "poolRetireMaxEpoch": 18,
        "txFeeFixed": 155_381,
        "txFeePerByte": 44
    }))
    .unwrap()
}

/// In-memory [`RelayApi`].
pub(crate) struct FakeRelay {
    version: String,
    epoch: u64,
    kes_period: u64,
    params: ProtocolParams,
    utxo: Vec<Utxo>,
    stake_info: StakeAddressInfo,
    reject_submissions: bool,
    submitted: Mutex<Vec<TextEnvelope>>,
    core_keys: Mutex<Vec<CoreKeysRequest>>,
}

impl Default for FakeRelay {
    fn default() -> Self {
        Self {
            version: FAKE_VERSION.to_string(),
            epoch: 100,
            kes_period: 412,
            params: sample_params(),
            utxo: Vec::new(),
            stake_info: StakeAddressInfo::default(),
            reject_submissions: false,
            submitted: Mutex::default(),
            core_keys: Mutex::default(),
        }
    }
}

impl FakeRelay {
    pub(crate) fn with_utxo(mut self, utxo: Vec<Utxo>) -> Self {
        self.utxo = utxo;
        self
    }

    pub(crate) fn with_version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    pub(crate) fn with_epoch(mut self, epoch: u64, retire_max: u64) -> Self {
        self.epoch = epoch;
        self.params.pool_retire_max_epoch = retire_max;
        self
    }

    pub(crate) fn with_registered_stake(mut self) -> Self {
        self.stake_info = StakeAddressInfo(vec![serde_json::json!({
            "address": "stake_test1fake",
            "delegation": null,
            "rewardAccountBalance": 0
        })]);
        self
    }

    pub(crate) fn rejecting_submissions(mut self) -> Self {
        self.reject_submissions = true;
        self
    }

    pub(crate) fn kes_period(&self) -> u64 {
        self.kes_period
    }

    pub(crate) fn submitted(&self) -> Vec<TextEnvelope> {
        self.submitted.lock().unwrap().clone()
    }

    pub(crate) fn core_keys(&self) -> Vec<CoreKeysRequest> {
        self.core_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl RelayApi for FakeRelay {
    async fn cardano_version(&self) -> Result<String, RelayError> {
        Ok(self.version.clone())
    }

    async fn current_epoch(&self) -> Result<u64, RelayError> {
        Ok(self.epoch)
    }

    async fn start_kes_period(&self) -> Result<u64, RelayError> {
        Ok(self.kes_period)
    }

    async fn stake_address_info(&self, _: &str) -> Result<StakeAddressInfo, RelayError> {
        Ok(self.stake_info.clone())
    }

    async fn protocol_params(&self) -> Result<ProtocolParams, RelayError> {
        Ok(self.params.clone())
    }

    async fn utxo(&self, _: &str) -> Result<Vec<Utxo>, RelayError> {
        Ok(self.utxo.clone())
    }

    async fn tip(&self) -> Result<ChainTip, RelayError> {
        Ok(ChainTip {
            epoch: self.epoch,
            slot: self.kes_period * 129_600,
            block: None,
            hash: None,
            era: None,
            sync_progress: None,
        })
    }

    async fn submit_tx(&self, tx: &TextEnvelope) -> Result<String, RelayError> {
        if self.reject_submissions {
            return Err(RelayError::Status {
                endpoint: "/submit-tx".to_string(),
                status: 502,
                message: "node request failed".to_string(),
            });
        }
        self.submitted.lock().unwrap().push(tx.clone());
        Ok(FAKE_TX_HASH.to_string())
    }

    async fn send_core_keys(&self, keys: &CoreKeysRequest) -> Result<(), RelayError> {
        self.core_keys.lock().unwrap().push(keys.clone());
        Ok(())
    }
}

// =============================================================================
// Node
// =============================================================================

/// [`NodeCli`] for relay handler tests.
#[derive(Default)]
pub(crate) struct FakeNode {
    pub fail: bool,
    pub utxo: Vec<Utxo>,
    pub submitted: Mutex<Vec<TextEnvelope>>,
}

impl FakeNode {
    fn check(&self) -> Result<(), LedgerError> {
        if self.fail {
            return Err(LedgerError::Process(failed(
                "cardano-cli",
                1,
                "Network.Socket.connect: does not exist (No such file or directory)",
            )));
        }
        Ok(())
    }
}

impl NodeCli for FakeNode {
    fn node_version(&self) -> Result<String, LedgerError> {
        self.check()?;
        Ok(FAKE_VERSION.to_string())
    }

    fn query_tip(&self) -> Result<ChainTip, LedgerError> {
        self.check()?;
        Ok(ChainTip {
            epoch: 100,
            slot: 53_395_200,
            block: Some(9_000_000),
            hash: Some("ab".repeat(32)),
            era: Some("Babbage".to_string()),
            sync_progress: Some("100.00".to_string()),
        })
    }

    fn kes_period(&self) -> Result<u64, LedgerError> {
        self.check()?;
        Ok(412)
    }

    fn stake_address_info(&self, _: &str) -> Result<StakeAddressInfo, LedgerError> {
        self.check()?;
        Ok(StakeAddressInfo::default())
    }

    fn protocol_params(&self) -> Result<serde_json::Value, LedgerError> {
        self.check()?;
        serde_json::to_value(sample_params()).map_err(|e| LedgerError::Parse {
            what: "protocol parameters",
            detail: e.to_string(),
        })
    }

    fn utxo(&self, _: &str) -> Result<Vec<Utxo>, LedgerError> {
        self.check()?;
        Ok(self.utxo.clone())
    }

    fn submit(&self, tx: &TextEnvelope) -> Result<String, LedgerError> {
        self.check()?;
        self.submitted.lock().unwrap().push(tx.clone());
        Ok(FAKE_TX_HASH.to_string())
    }
}

// =============================================================================
// Operator
// =============================================================================

#[derive(Debug, Clone)]
pub(crate) enum Answer {
    Confirm(bool),
    Input(String),
    Password(String),
    Select(usize),
}

/// [`Operator`] that replays a fixed script and records what it was shown.
#[derive(Default)]
pub(crate) struct ScriptedOperator {
    answers: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<String>>,
    notes: Mutex<Vec<String>>,
}

impl ScriptedOperator {
    pub(crate) fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            ..Self::default()
        }
    }

    pub(crate) fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap().clone()
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.answers.lock().unwrap().is_empty()
    }

    fn next(&self, message: &str) -> io::Result<Answer> {
        self.prompts.lock().unwrap().push(message.to_string());
        self.answers.lock().unwrap().pop_front().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("script exhausted at prompt `{message}`"),
            )
        })
    }
}

fn unexpected(message: &str, answer: Answer) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("prompt `{message}` got scripted answer {answer:?}"),
    )
}

impl Operator for ScriptedOperator {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        match self.next(message)? {
            Answer::Confirm(yes) => Ok(yes),
            other => Err(unexpected(message, other)),
        }
    }

    fn input(&self, message: &str) -> io::Result<String> {
        match self.next(message)? {
            Answer::Input(text) => Ok(text),
            other => Err(unexpected(message, other)),
        }
    }

    fn password(&self, message: &str) -> io::Result<Zeroizing<String>> {
        match self.next(message)? {
            Answer::Password(text) => Ok(Zeroizing::new(text)),
            other => Err(unexpected(message, other)),
        }
    }

    fn select(&self, message: &str, choices: &[&str]) -> io::Result<usize> {
        match self.next(message)? {
            Answer::Select(index) if index < choices.len() => Ok(index),
            other => Err(unexpected(message, other)),
        }
    }

    fn notify(&self, message: &str) {
        self.notes.lock().unwrap().push(message.to_string());
    }
}

// =============================================================================
// Workflow harness
// =============================================================================

/// One UTXO at the seeded owner address.
pub(crate) fn funded_utxo(lovelace: u64) -> Vec<Utxo> {
    vec![Utxo {
        tx_in: TxIn {
            tx_hash: "ab".repeat(32),
            index: 0,
        },
        address: "addr_test1fakebase".to_string(),
        value: Value::from_lovelace(lovelace),
    }]
}

/// Every file under `root` with its contents.
pub(crate) fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(&dir) else { continue };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.insert(path.clone(), fs::read(&path).unwrap());
            }
        }
    }
    files
}

/// An [`OpsContext`] over a temporary vault root and fake collaborators.
pub(crate) struct Harness {
    _dir: TempDir,
    pub relay: Arc<FakeRelay>,
    pub ledger: Arc<FakeLedger>,
    pub operator: Arc<ScriptedOperator>,
    pub runner: Arc<FakeRunner>,
    pub ctx: OpsContext,
}

impl Harness {
    pub(crate) fn new(
        relay: FakeRelay,
        ledger: FakeLedger,
        answers: impl IntoIterator<Item = Answer>,
    ) -> Self {
        let dir = TempDir::new().unwrap();
        let relay = Arc::new(relay);
        let ledger = Arc::new(ledger);
        let operator = Arc::new(ScriptedOperator::new(answers));
        let runner = Arc::new(FakeRunner::new());
        let ctx = OpsContext::new(
            sample_config(dir.path()),
            relay.clone(),
            ledger.clone(),
            runner.clone(),
            operator.clone(),
        );
        Self {
            _dir: dir,
            relay,
            ledger,
            operator,
            runner,
            ctx,
        }
    }

    /// Write a complete owner wallet named after the configured wallet.
    pub(crate) fn seed_wallet(&self) -> WalletFiles {
        let files = WalletFiles::at(&self.ctx.paths, &self.ctx.config.priv_owner_wallet);
        fs::create_dir_all(self.ctx.paths.wallet_dir(&files.name)).unwrap();
        for (path, contents) in [
            (&files.payment_skey, "payment skey"),
            (&files.payment_vkey, "payment vkey"),
            (&files.payment_addr_file, "addr_test1fakebase\n"),
            (&files.stake_skey, "stake skey"),
            (&files.stake_vkey, "stake vkey"),
            (&files.stake_addr_file, "stake_test1fake\n"),
        ] {
            fs::write(path, contents).unwrap();
        }
        files
    }

    /// Write the configured pool's cold and VRF keys, and optionally a KES
    /// pair with its operational certificate.
    pub(crate) fn seed_pool(&self, with_kes: bool) -> PoolFiles {
        let files = PoolFiles::at(&self.ctx.paths, &self.ctx.config.priv_pool_name);
        fs::create_dir_all(self.ctx.paths.pool_dir(&files.name)).unwrap();
        let mut seeded = vec![
            (&files.node_skey, "cold skey"),
            (&files.node_vkey, "cold vkey"),
            (&files.node_counter, "counter 3"),
            (&files.vrf_skey, "vrf skey"),
            (&files.vrf_vkey, "vrf vkey"),
        ];
        if with_kes {
            seeded.extend([
                (&files.kes_skey, "old kes skey"),
                (&files.kes_vkey, "old kes vkey"),
                (&files.node_cert, "old op cert"),
            ]);
        }
        for (path, contents) in seeded {
            fs::write(path, contents).unwrap();
        }
        files
    }
}
