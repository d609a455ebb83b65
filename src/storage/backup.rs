// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Timestamped backups of key files and archives.
//!
//! A backup is a sibling copy named `<file>_<yyyy-MM-dd_HH-mm-ss>`. An
//! existing backup is never overwritten; a numeric suffix is appended instead.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Backup suffix for the given instant.
pub fn backup_suffix(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Backup suffix for the current local time.
pub fn backup_suffix_now() -> String {
    backup_suffix(Local::now())
}

/// Copy `path` to a fresh timestamped sibling and return the backup path.
pub fn backup_file(path: &Path, suffix: &str) -> io::Result<PathBuf> {
    let target = free_backup_path(path, suffix);
    fs::copy(path, &target)?;
    Ok(target)
}

/// Back up every existing file in `paths`, then remove the originals.
///
/// All copies are made before anything is removed.
pub fn backup_then_remove(paths: &[PathBuf], suffix: &str) -> io::Result<Vec<PathBuf>> {
    let existing: Vec<&PathBuf> = paths.iter().filter(|p| p.exists()).collect();

    let mut backups = Vec::with_capacity(existing.len());
    for path in &existing {
        backups.push(backup_file(path, suffix)?);
    }
    for path in existing {
        fs::remove_file(path)?;
    }
    Ok(backups)
}

fn free_backup_path(path: &Path, suffix: &str) -> PathBuf {
    let base = format!("{}_{suffix}", path.display());
    let mut candidate = PathBuf::from(&base);
    let mut n = 1;
    while candidate.exists() {
        candidate = PathBuf::from(format!("{base}_{n}"));
        n += 1;
    }
    candidate
}
