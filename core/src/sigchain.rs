//! Append-only signatures ledger: `timestamp root signature size`, one
//! entry per line, strictly non-decreasing in both fields.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::hash::{self, Hash};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub root: Hash,
    pub signature: [u8; 64],
    pub size: u64,
}

pub struct SignatureLog {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl SignatureLog {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            parse(&std::fs::read_to_string(&path)?)
        } else {
            Vec::new()
        };
        Ok(Self { path, entries })
    }

    /// Append a new entry. The caller must ensure `entry.size` and
    /// `entry.timestamp` are each `>=` the previous entry's; a violation is
    /// a logic bug upstream, not a recoverable ledger condition, so it fails
    /// loudly rather than silently reordering.
    pub fn append(&mut self, entry: Entry) -> Result<()> {
        if let Some(last) = self.entries.last() {
            if entry.size < last.size || entry.timestamp < last.timestamp {
                return Err(Error::InvalidInput(format!(
                    "signature entry must be non-decreasing in size and timestamp (last size {}, new size {})",
                    last.size, entry.size
                )));
            }
        }
        let line = format!(
            "{} {} {} {}\n",
            entry.timestamp.to_rfc3339(),
            hash::to_hex(&entry.root),
            hex::encode(entry.signature),
            entry.size
        );
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        self.entries.push(entry);
        Ok(())
    }

    /// Earliest entry whose `size` covers `leaf_index`, i.e. `size > leaf_index`.
    /// `None` means the leaf is recorded in the MMR but not yet signed.
    pub fn find_covering(&self, leaf_index: u64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.size > leaf_index)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

fn parse(text: &str) -> Vec<Entry> {
    let mut entries = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(entry) = parse_line(line) {
            entries.push(entry);
        }
    }
    entries
}

fn parse_line(line: &str) -> Option<Entry> {
    let mut fields = line.split_whitespace();
    let timestamp = DateTime::parse_from_rfc3339(fields.next()?).ok()?.with_timezone(&Utc);
    let root = hash::from_hex(fields.next()?)?;
    let sig_hex = fields.next()?;
    let sig_bytes = hex::decode(sig_hex).ok()?;
    let signature: [u8; 64] = sig_bytes.try_into().ok()?;
    let size: u64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Entry {
        timestamp,
        root,
        signature,
        size,
    })
}
