// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator interaction seam.
//!
//! Workflows talk to the human at the console only through [`Operator`], so
//! they can be driven by a script in tests. [`TerminalOperator`] is the real
//! implementation: line-based prompts on stdin/stdout, with hidden input for
//! passphrases and mnemonics.

use std::io::{self, BufRead, Write};

use zeroize::Zeroizing;

use crate::storage::{Passphrase, VaultError};

/// Re-prompt message for a passphrase that is too short.
pub const PASSPHRASE_HINT: &str = "must enter pass phrase more than 3 characters";

pub trait Operator: Send + Sync {
    /// Yes/no question. Defaults to "no".
    fn confirm(&self, message: &str) -> io::Result<bool>;
    fn input(&self, message: &str) -> io::Result<String>;
    /// Hidden input; the returned buffer is wiped on drop.
    fn password(&self, message: &str) -> io::Result<Zeroizing<String>>;
    /// Pick one of `choices`, returning its index.
    fn select(&self, message: &str, choices: &[&str]) -> io::Result<usize>;
    fn notify(&self, message: &str);
}

/// Ask for a vault passphrase until one is long enough.
pub fn prompt_passphrase(operator: &dyn Operator) -> io::Result<Passphrase> {
    loop {
        let raw = operator.password("Enter pass phrase:")?;
        match Passphrase::new(raw.as_str()) {
            Ok(passphrase) => return Ok(passphrase),
            Err(VaultError::PassphraseTooShort) => operator.notify(PASSPHRASE_HINT),
            Err(other) => return Err(io::Error::other(other.to_string())),
        }
    }
}

/// Ask for input until `parse` accepts it; the rejection message is shown
/// before asking again.
pub fn prompt_until<T>(
    operator: &dyn Operator,
    message: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> io::Result<T> {
    loop {
        let raw = operator.input(message)?;
        match parse(raw.trim()) {
            Ok(value) => return Ok(value),
            Err(reason) => operator.notify(&reason),
        }
    }
}

/// [`Operator`] on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl TerminalOperator {
    fn read_line(&self) -> io::Result<String> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn prompt(&self, message: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "? {message} ")?;
        out.flush()
    }
}

impl Operator for TerminalOperator {
    fn confirm(&self, message: &str) -> io::Result<bool> {
        self.prompt(&format!("{message} (y/N)"))?;
        let answer = self.read_line()?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    }

    fn input(&self, message: &str) -> io::Result<String> {
        self.prompt(message)?;
        self.read_line()
    }

    fn password(&self, message: &str) -> io::Result<Zeroizing<String>> {
        rpassword::prompt_password(format!("? {message} ")).map(Zeroizing::new)
    }

    fn select(&self, message: &str, choices: &[&str]) -> io::Result<usize> {
        {
            let mut out = io::stdout().lock();
            writeln!(out, "? {message}")?;
            for (i, choice) in choices.iter().enumerate() {
                writeln!(out, "  {}) {choice}", i + 1)?;
            }
        }
        loop {
            self.prompt("Enter a number:")?;
            let answer = self.read_line()?;
            match answer.trim().parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(n - 1),
                _ => println!("  please enter a number between 1 and {}", choices.len()),
            }
        }
    }

    fn notify(&self, message: &str) {
        println!("{message}");
    }
}
