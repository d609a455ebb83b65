// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use axum_server::{tls_rustls::RustlsConfig, Handle};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use stakepool_ops::api::router;
use stakepool_ops::auth::RelayAuth;
use stakepool_ops::blockchain::{CardanoCli, NodeConnection};
use stakepool_ops::config::{ConfigError, OpsConfig, DEFAULT_LOG_FILTER, LOG_FORMAT_ENV, USAGE};
use stakepool_ops::error::OpsError;
use stakepool_ops::process::SystemRunner;
use stakepool_ops::state::AppState;
use stakepool_ops::workflows::{console_loop, OpsContext};

/// In-flight relay requests get this long to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(author, version, about = "Stake pool operations console and core relay")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the Core Relay next to the block-producing node.
    Relay {
        /// Path to config.json
        config: PathBuf,
    },
    /// Run the interactive operations console.
    Console {
        /// Path to config.json
        config: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unable to load relay TLS certificate: {0}")]
    Tls(#[source] io::Error),

    #[error("relay server failed: {0}")]
    Serve(#[source] io::Error),

    #[error(transparent)]
    Ops(#[from] OpsError),
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Relay { config } => run_relay(config).await,
        Command::Console { config } => run_console(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(StartupError::Config(err)) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run_relay(config_path: PathBuf) -> Result<(), StartupError> {
    let config = OpsConfig::load(&config_path)?;
    let addr = config.relay_bind_addr()?;

    // Already installed is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let runner = Arc::new(SystemRunner::new(config.request_timeout()));
    let node = CardanoCli::new(runner, &config.tools).with_node(NodeConnection {
        socket_path: config.core_socket_path.clone(),
        shelley_genesis: config.shelley_genesis.clone(),
        network: config.network(),
    });

    let auth = RelayAuth::new(config.core_api_token.as_deref());
    if !auth.is_enabled() {
        warn!("coreApiToken is not set; relay endpoints accept unauthenticated requests");
    }
    let state = AppState::new(Arc::new(node), config.core_keys_dir.clone(), auth);
    let app = router(state);

    let shutdown = CancellationToken::new();
    let handle = Handle::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));
    tokio::spawn({
        let handle = handle.clone();
        let shutdown = shutdown.clone();
        async move {
            shutdown.cancelled().await;
            info!("shutting down relay");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    match (&config.relay_tls_cert, &config.relay_tls_key) {
        (Some(cert), Some(key)) => {
            let tls = RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(StartupError::Tls)?;
            info!(%addr, "core relay listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)
        }
        _ => {
            info!(%addr, "core relay listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .map_err(StartupError::Serve)
        }
    }
}

async fn wait_for_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "unable to listen for shutdown signal");
        return;
    }
    shutdown.cancel();
}

async fn run_console(config_path: PathBuf) -> Result<(), StartupError> {
    let config = OpsConfig::load(&config_path)?;
    info!(
        network = ?config.network(),
        relay = %config.core_api,
        "starting operations console"
    );
    let ctx = OpsContext::from_config(config)?;

    match console_loop(&ctx).await {
        Ok(()) => Ok(()),
        Err(OpsError::Prompt(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
            info!("terminal closed");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
