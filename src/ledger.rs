//! Durable Ledger Module
//!
//! Append-only, JSON-lines backed records that survive process restarts:
//! the issuance ledger (source of the monotonic serial counter), the
//! revocation ledger, and the CRL sequence counter.
//!
//! Every write appends a full line and flushes before returning, so a
//! record acknowledged to the caller is on disk. Files are created on first
//! use; an absent file is an empty ledger, a corrupt line is an error.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::Error;
use crate::model::{PrincipalRole, RevocationRecord};

fn storage_err(context: &str, path: &Path, err: impl std::fmt::Display) -> Error {
    Error::Storage(format!("{} {}: {}", context, path.display(), err))
}

fn append_line<T: Serialize>(file: &mut File, path: &Path, record: &T) -> Result<(), Error> {
    let line = serde_json::to_string(record)
        .map_err(|e| storage_err("Failed to encode record for", path, e))?;
    writeln!(file, "{}", line).map_err(|e| storage_err("Failed to append to", path, e))?;
    file.flush()
        .map_err(|e| storage_err("Failed to flush", path, e))
}

fn load_lines<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, Error> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let contents =
        std::fs::read_to_string(path).map_err(|e| storage_err("Failed to read", path, e))?;
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(|e| storage_err("Corrupt line in", path, e)))
        .collect()
}

fn open_append(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| storage_err("Failed to open", path, e))
}

/// One issuance ledger entry, written after the certificate is signed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuanceRecord {
    pub serial: u64,
    pub role: PrincipalRole,
    pub common_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
}

/// Append-only record of every certificate this CA has signed.
///
/// The highest recorded serial drives serial allocation, so reloading the
/// ledger after a restart resumes the monotonic sequence without reuse.
pub struct IssuanceLedger {
    path: PathBuf,
    records: Vec<IssuanceRecord>,
}

impl IssuanceLedger {
    /// Load the ledger at `path`, treating an absent file as empty
    pub fn load_or_create(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            path: path.to_path_buf(),
            records: load_lines(path)?,
        })
    }

    /// The next free serial: one past the highest ever recorded
    pub fn next_serial(&self) -> u64 {
        self.records
            .iter()
            .map(|r| r.serial)
            .max()
            .map_or(1, |high| high + 1)
    }

    pub fn contains(&self, serial: u64) -> bool {
        self.records.iter().any(|r| r.serial == serial)
    }

    pub fn records(&self) -> &[IssuanceRecord] {
        &self.records
    }

    /// Durably append a record. Only called after the toolkit has signed.
    pub fn append(&mut self, record: IssuanceRecord) -> Result<(), Error> {
        let mut file = open_append(&self.path)?;
        append_line(&mut file, &self.path, &record)?;
        self.records.push(record);
        Ok(())
    }
}

/// Append-only record of revoked serials. Entries are never removed or
/// rewritten; the first revocation of a serial is the one that sticks.
pub struct RevocationLedger {
    path: PathBuf,
    records: Vec<RevocationRecord>,
}

impl RevocationLedger {
    pub fn load_or_create(path: &Path) -> Result<Self, Error> {
        Ok(Self {
            path: path.to_path_buf(),
            records: load_lines(path)?,
        })
    }

    pub fn contains(&self, serial: u64) -> bool {
        self.records.iter().any(|r| r.serial == serial)
    }

    pub fn records(&self) -> &[RevocationRecord] {
        &self.records
    }

    pub fn append(&mut self, record: RevocationRecord) -> Result<(), Error> {
        let mut file = open_append(&self.path)?;
        append_line(&mut file, &self.path, &record)?;
        self.records.push(record);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CrlSequenceState {
    crl_number: u64,
}

/// Durable CRL number counter, strictly increasing across regenerations.
///
/// The number for the list being built is [`CrlSequence::next`]; it is
/// committed with [`CrlSequence::advance`] only after the toolkit has
/// produced the signed list, so a failed build never consumes a number.
pub struct CrlSequence {
    path: PathBuf,
    current: u64,
}

impl CrlSequence {
    pub fn load_or_create(path: &Path) -> Result<Self, Error> {
        let current = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| storage_err("Failed to read", path, e))?;
            let state: CrlSequenceState = serde_json::from_str(&contents)
                .map_err(|e| storage_err("Corrupt counter in", path, e))?;
            state.crl_number
        } else {
            0
        };
        Ok(Self {
            path: path.to_path_buf(),
            current,
        })
    }

    /// Number the next CRL will carry
    pub fn next(&self) -> u64 {
        self.current + 1
    }

    /// Durably commit the number returned by [`Self::next`]
    pub fn advance(&mut self) -> Result<u64, Error> {
        let next = self.current + 1;
        let encoded = serde_json::to_string(&CrlSequenceState { crl_number: next })
            .map_err(|e| storage_err("Failed to encode counter for", &self.path, e))?;
        std::fs::write(&self.path, encoded)
            .map_err(|e| storage_err("Failed to write", &self.path, e))?;
        self.current = next;
        Ok(next)
    }
}
