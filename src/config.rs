// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Both the Operations Console and the Core Relay are started with the path to
//! a JSON configuration document. A missing or malformed document is fatal:
//! `main` prints a usage line and exits.
//!
//! ## Document fields
//!
//! | Field | Description | Default |
//! |-------|-------------|---------|
//! | `privOwnerWallet` | Name of the pool owner wallet under `priv/wallet` | required |
//! | `privPoolName` | Name of the pool under `priv/pool` | required |
//! | `coreApi` | Base URL of the Core Relay | required |
//! | `coreApiToken` | Shared bearer token between console and relay | none |
//! | `coreSocketPath` | Node socket used by the relay (`~` expanded) | required |
//! | `shelleyGenesis` | Shelley genesis file used by the relay (`~` expanded) | required |
//! | `networkMagic` | `"mainnet"` or a numeric testnet magic | required |
//! | `poolData` | Pledge, cost, margin, relays, metadata URL | required |
//! | `poolMetadata` | Pool metadata document | required |
//! | `privDir` | Vault root | `./priv` |
//! | `coreKeysDir` | Relay directory receiving operational keys | `./priv` |
//! | `relayBind` | Relay bind address | `0.0.0.0:3000` |
//! | `relayTlsCert` / `relayTlsKey` | PEM files enabling TLS on the relay | none |
//! | `requestTimeoutSecs` | Console → relay request timeout | `10` |
//! | `minSpendableLovelace` | Minimum wallet balance for building a tx | `1000000` |
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default `RUST_LOG` filter when none is set.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Usage line printed when configuration cannot be loaded.
pub const USAGE: &str = "Usage: stakepool-ops <relay|console> config.json";

/// Errors raised while loading configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Cardano network selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Mainnet,
    Testnet(u32),
}

impl Network {
    /// Parse the `networkMagic` config value.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let value = raw.trim();
        if value.eq_ignore_ascii_case("mainnet") {
            return Ok(Network::Mainnet);
        }
        value
            .parse::<u32>()
            .map(Network::Testnet)
            .map_err(|_| ConfigError::Invalid {
                field: "networkMagic",
                reason: format!("expected \"mainnet\" or a numeric magic, got {raw:?}"),
            })
    }

    /// Network selector arguments understood by the ledger CLI.
    pub fn cli_args(&self) -> Vec<String> {
        match self {
            Network::Mainnet => vec!["--mainnet".to_string()],
            Network::Testnet(magic) => vec!["--testnet-magic".to_string(), magic.to_string()],
        }
    }

    /// Network tag used by the wallet derivation tool (`1` mainnet, `0` test).
    pub fn address_tag(&self) -> &'static str {
        match self {
            Network::Mainnet => "1",
            Network::Testnet(_) => "0",
        }
    }
}

/// A relay advertised in the pool registration certificate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct PoolRelay {
    pub host: String,
    pub port: u16,
}

/// Registration parameters for the stake pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolData {
    pub pool_pledge_ada: u64,
    pub pool_cost_ada: u64,
    /// Fractional margin, e.g. `0.015`.
    pub pool_margin: f64,
    pub relays: Vec<PoolRelay>,
    pub metadata_url: String,
}

/// Pool metadata document published at `metadataUrl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolMetadata {
    pub name: String,
    pub description: String,
    pub ticker: String,
    pub homepage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<String>,
}

impl PoolMetadata {
    /// Pretty-printed JSON, exactly as hashed and as handed to the relay.
    pub fn to_pretty_json(&self) -> String {
        // Serializing plain strings cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// External tool binaries. Overridable for non-standard installs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolPaths {
    pub cardano_cli: String,
    pub cardano_node: String,
    pub cardano_address: String,
    pub bech32: String,
    pub gpg: String,
    pub tar: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            cardano_cli: "cardano-cli".to_string(),
            cardano_node: "cardano-node".to_string(),
            cardano_address: "cardano-address".to_string(),
            bech32: "bech32".to_string(),
            gpg: "gpg".to_string(),
            tar: "tar".to_string(),
        }
    }
}

fn default_priv_dir() -> PathBuf {
    PathBuf::from("./priv")
}

fn default_relay_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_min_spendable_lovelace() -> u64 {
    1_000_000
}

/// Parsed configuration document shared by the console and the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpsConfig {
    pub priv_owner_wallet: String,
    pub priv_pool_name: String,
    pub core_api: String,
    #[serde(default)]
    pub core_api_token: Option<String>,
    pub core_socket_path: PathBuf,
    pub shelley_genesis: PathBuf,
    pub network_magic: String,
    pub pool_data: PoolData,
    pub pool_metadata: PoolMetadata,
    #[serde(default = "default_priv_dir")]
    pub priv_dir: PathBuf,
    #[serde(default = "default_priv_dir")]
    pub core_keys_dir: PathBuf,
    #[serde(default = "default_relay_bind")]
    pub relay_bind: String,
    #[serde(default)]
    pub relay_tls_cert: Option<PathBuf>,
    #[serde(default)]
    pub relay_tls_key: Option<PathBuf>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_min_spendable_lovelace")]
    pub min_spendable_lovelace: u64,
    #[serde(default)]
    pub tools: ToolPaths,
}

impl OpsConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: OpsConfig = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.normalized()
    }

    /// Expand `~` in path fields and validate cross-field constraints.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        let home = std::env::var("HOME").ok();
        self.core_socket_path = expand_home(&self.core_socket_path, home.as_deref());
        self.shelley_genesis = expand_home(&self.shelley_genesis, home.as_deref());
        self.priv_dir = expand_home(&self.priv_dir, home.as_deref());
        self.core_keys_dir = expand_home(&self.core_keys_dir, home.as_deref());

        if self.priv_owner_wallet.trim().is_empty() {
            return Err(invalid("privOwnerWallet", "must not be empty"));
        }
        if self.priv_pool_name.trim().is_empty() {
            return Err(invalid("privPoolName", "must not be empty"));
        }
        Network::parse(&self.network_magic)?;
        url::Url::parse(&self.core_api)
            .map_err(|e| invalid("coreApi", format!("not a valid URL: {e}")))?;
        self.relay_bind
            .parse::<SocketAddr>()
            .map_err(|e| invalid("relayBind", e.to_string()))?;
        if self.relay_tls_cert.is_some() != self.relay_tls_key.is_some() {
            return Err(invalid(
                "relayTlsCert",
                "relayTlsCert and relayTlsKey must be set together",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(invalid("requestTimeoutSecs", "must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.pool_data.pool_margin) {
            return Err(invalid("poolData.poolMargin", "must be between 0 and 1"));
        }
        if self.core_api_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
            self.core_api_token = None;
        }

        Ok(self)
    }

    pub fn network(&self) -> Network {
        // Validated in `normalized`.
        Network::parse(&self.network_magic).unwrap_or(Network::Mainnet)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn relay_bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.relay_bind
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("relayBind", e.to_string()))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn expand_home(path: &Path, home: Option<&str>) -> PathBuf {
    match (path.to_str(), home) {
        (Some(raw), Some(home)) if raw == "~" => PathBuf::from(home),
        (Some(raw), Some(home)) if raw.starts_with("~/") => Path::new(home).join(&raw[2..]),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
pub(crate) fn sample_config(priv_dir: &Path) -> OpsConfig {
    OpsConfig {
        priv_owner_wallet: "owner".to_string(),
        priv_pool_name: "pool".to_string(),
        core_api: "http://127.0.0.1:3000".to_string(),
        core_api_token: None,
        core_socket_path: PathBuf::from("/tmp/node.socket"),
        shelley_genesis: PathBuf::from("/tmp/shelley-genesis.json"),
        network_magic: "2".to_string(),
        pool_data: PoolData {
            pool_pledge_ada: 1000,
            pool_cost_ada: 340,
            pool_margin: 0.015,
            relays: vec![PoolRelay {
                host: "relay.example.org".to_string(),
                port: 3001,
            }],
            metadata_url: "https://example.org/pool.json".to_string(),
        },
        pool_metadata: PoolMetadata {
            name: "Example Pool".to_string(),
            description: "An example pool".to_string(),
            ticker: "EXMPL".to_string(),
            homepage: "https://example.org".to_string(),
            extended: None,
        },
        priv_dir: priv_dir.to_path_buf(),
        core_keys_dir: priv_dir.to_path_buf(),
        relay_bind: default_relay_bind(),
        relay_tls_cert: None,
        relay_tls_key: None,
        request_timeout_secs: default_request_timeout_secs(),
        min_spendable_lovelace: default_min_spendable_lovelace(),
        tools: ToolPaths::default(),
    }
}
