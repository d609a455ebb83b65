// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::RelayAuth;
use crate::blockchain::NodeCli;

/// Shared state of the Core Relay.
#[derive(Clone)]
pub struct AppState {
    /// Ledger node access.
    pub node: Arc<dyn NodeCli>,
    /// Where received operational keys are written.
    pub keys_dir: PathBuf,
    pub auth: RelayAuth,
}

impl AppState {
    pub fn new(node: Arc<dyn NodeCli>, keys_dir: impl Into<PathBuf>, auth: RelayAuth) -> Self {
        Self {
            node,
            keys_dir: keys_dir.into(),
            auth,
        }
    }
}
