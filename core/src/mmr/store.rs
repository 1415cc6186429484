//! Persistent MMR node store: a flat file of fixed-width `height || hash`
//! records, one per position, record index equal to byte offset / 33.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::hash::Hash;

use super::Node;

const RECORD_LEN: u64 = 33;

pub struct MmrStore {
    file: File,
    size: u64,
}

impl MmrStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        let len = file.seek(SeekFrom::End(0))?;
        if len % RECORD_LEN != 0 {
            return Err(Error::StoreCorrupt(format!(
                "mmr store length {len} is not a multiple of the record size {RECORD_LEN}"
            )));
        }
        Ok(Self {
            file,
            size: len / RECORD_LEN,
        })
    }

    /// Number of nodes currently durable in the store.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn get(&mut self, pos: u64) -> Result<Node> {
        if pos >= self.size {
            return Err(Error::InvalidInput(format!(
                "mmr position {pos} out of range (size {})",
                self.size
            )));
        }
        self.file.seek(SeekFrom::Start(pos * RECORD_LEN))?;
        let mut buf = [0u8; RECORD_LEN as usize];
        self.file.read_exact(&mut buf).map_err(|e| {
            Error::StoreCorrupt(format!("truncated record at position {pos}: {e}"))
        })?;
        let height = buf[0];
        let mut hash: Hash = [0u8; 32];
        hash.copy_from_slice(&buf[1..33]);
        Ok(Node {
            position: pos,
            height,
            hash,
        })
    }

    /// Append is only legal at position `size()`; any other position fails
    /// with `InvalidPosition` rather than silently appending elsewhere.
    pub fn append(&mut self, node: Node) -> Result<()> {
        if node.position != self.size {
            return Err(Error::InvalidPosition {
                expected: self.size,
                actual: node.position,
            });
        }
        self.file.seek(SeekFrom::Start(node.position * RECORD_LEN))?;
        let mut buf = [0u8; RECORD_LEN as usize];
        buf[0] = node.height;
        buf[1..33].copy_from_slice(&node.hash);
        self.file.write_all(&buf)?;
        self.file.sync_data()?;
        self.size += 1;
        Ok(())
    }

    pub fn close(self) {
        drop(self);
    }
}
