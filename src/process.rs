// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Narrow process-invocation seam for external tools.
//!
//! Everything that shells out (`tar`, `gpg`, `cardano-cli`, `cardano-address`,
//! `bech32`) goes through [`CommandRunner`] so the vault and key workflows can
//! be exercised against a fake runner instead of real binaries.
//!
//! Arguments are logged at `debug`; stdin never is, because it carries
//! passphrases and key material.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tracing::debug;
use zeroize::Zeroizing;

/// Default upper bound for a single external command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors raised while invoking an external program.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("`{program}` exited with status {status}: {stderr}")]
    Failed {
        program: String,
        status: i32,
        stderr: String,
    },

    #[error("`{program}` timed out after {timeout:?}")]
    TimedOut { program: String, timeout: Duration },

    #[error("I/O error while talking to `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl ProcessError {
    /// Name of the program that failed.
    pub fn program(&self) -> &str {
        match self {
            ProcessError::Spawn { program, .. }
            | ProcessError::Failed { program, .. }
            | ProcessError::TimedOut { program, .. }
            | ProcessError::Io { program, .. } => program,
        }
    }
}

/// Runs an external program and returns its stdout.
///
/// A non-zero exit status is an error; stderr is carried in
/// [`ProcessError::Failed`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str], input: Option<&[u8]>)
        -> Result<Vec<u8>, ProcessError>;

    /// Convenience wrapper returning trimmed UTF-8 stdout.
    fn run_text(&self, program: &str, args: &[&str]) -> Result<String, ProcessError> {
        let out = self.run(program, args, None)?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }
}

/// [`CommandRunner`] backed by `tokio::process`.
///
/// The blocking [`CommandRunner::run`] drives the child on the ambient tokio
/// runtime when there is one (via `block_in_place` on a multi-threaded
/// runtime, or directly from a `spawn_blocking` thread), and on a throwaway
/// current-thread runtime otherwise. It must not be called from the thread
/// that drives a current-thread runtime.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(DEFAULT_COMMAND_TIMEOUT)
    }
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Spawn `program`, feed `input` on stdin and collect its output,
    /// killing the child if it outlives the timeout.
    pub async fn run_async(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, ProcessError> {
        debug!(program, ?args, stdin = input.is_some(), "running external command");
        let io_err = |source| ProcessError::Io {
            program: program.to_string(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let stdin = child.stdin.take();
        let payload = input.map(|bytes| Zeroizing::new(bytes.to_vec()));
        let feed = async move {
            if let (Some(mut stdin), Some(payload)) = (stdin, payload) {
                // EPIPE from a child that exits early is ignored; its exit
                // status is what gets reported.
                let _ = stdin.write_all(&payload).await;
                let _ = stdin.shutdown().await;
            }
        };
        let finished = async move {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        // Dropping the timed-out future drops the child, which kills it.
        let output = tokio::time::timeout(self.timeout, finished)
            .await
            .map_err(|_| ProcessError::TimedOut {
                program: program.to_string(),
                timeout: self.timeout,
            })?
            .map_err(io_err)?;

        if !output.status.success() {
            return Err(ProcessError::Failed {
                program: program.to_string(),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
    ) -> Result<Vec<u8>, ProcessError> {
        let task = self.run_async(program, args, input);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
                handle.block_on(task)
            }
            Ok(handle) => tokio::task::block_in_place(|| handle.block_on(task)),
            Err(_) => Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|source| ProcessError::Io {
                    program: program.to_string(),
                    source,
                })?
                .block_on(task),
        }
    }
}
