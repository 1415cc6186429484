//! Secure event store: tamper-evident, HMAC-chained record of observed file
//! events, their edit regions, and session/meta bookkeeping.
//!
//! Grounded on the ledger-style tamper-evidence used elsewhere in this
//! codebase for the signatures log, generalized from a flat-file JSONL chain
//! to a transactional relational store so that `(tip read, event insert,
//! region insert, tip update)` commits atomically.

use hmac::{Hmac, Mac};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::hash::{self, Hash};

type HmacSha256 = Hmac<Sha256>;

const HMAC_DOMAIN: &[u8] = b"witnessd-hmac-key-v1";
const ZERO_HASH: Hash = [0u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: u64,
    pub timestamp_ns: i64,
    pub file_path: String,
    pub file_size: i64,
    pub size_delta: i32,
    pub content_hash: Hash,
    pub prev_chain_hash: Hash,
    pub chain_hash: Hash,
    pub context_id: Option<u64>,
}

/// Fields a caller supplies when appending; `id`, `prev_chain_hash`, and
/// `chain_hash` are computed by the store.
#[derive(Debug, Clone)]
pub struct EventFields {
    pub timestamp_ns: i64,
    pub file_path: String,
    pub file_size: i64,
    pub size_delta: i32,
    pub content_hash: Hash,
    pub context_id: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct NewEditRegion {
    pub start_pct: f32,
    pub end_pct: f32,
    pub delta_sign: i8,
    pub byte_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRegion {
    pub event_id: u64,
    pub start_pct_bits: u32,
    pub end_pct_bits: u32,
    pub delta_sign: i8,
    pub byte_count: u32,
}

impl EditRegion {
    pub fn start_pct(&self) -> f32 {
        f32::from_bits(self.start_pct_bits)
    }
    pub fn end_pct(&self) -> f32 {
        f32::from_bits(self.end_pct_bits)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityStatus {
    Ok,
    TamperDetected { first_bad_id: u64 },
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub event_count: u64,
    pub file_count: u64,
    pub oldest_ns: Option<i64>,
    pub newest_ns: Option<i64>,
    pub chain_hash_hex: String,
    pub integrity_ok: bool,
}

/// The struct actually hashed for each event's `chain_hash`. Field order is
/// fixed by this declaration, which is all "canonical" needs to mean here:
/// the same logical event always serializes identically.
#[derive(Serialize)]
struct CanonicalEvent<'a> {
    id: u64,
    timestamp_ns: i64,
    file_path: &'a str,
    file_size: i64,
    size_delta: i32,
    content_hash: String,
    prev_chain_hash: String,
    context_id: Option<u64>,
}

pub struct SecureEventStore {
    conn: Connection,
    hmac_key: [u8; 32],
}

impl SecureEventStore {
    pub fn open<P: AsRef<std::path::Path>>(path: P, signing_seed: &[u8]) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY,
                timestamp_ns INTEGER NOT NULL,
                file_path TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                size_delta INTEGER NOT NULL,
                content_hash TEXT NOT NULL,
                prev_chain_hash TEXT NOT NULL,
                chain_hash TEXT NOT NULL,
                context_id INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_events_file_ts ON events(file_path, timestamp_ns);
            CREATE TABLE IF NOT EXISTS edit_regions (
                rowid_seq INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id INTEGER NOT NULL,
                start_pct_bits INTEGER NOT NULL,
                end_pct_bits INTEGER NOT NULL,
                delta_sign INTEGER NOT NULL,
                byte_count INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL,
                started_ns INTEGER NOT NULL,
                ended_ns INTEGER
            );
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )?;

        let hmac_key = derive_hmac_key(signing_seed);
        Ok(Self { conn, hmac_key })
    }

    fn tip(conn: &Connection) -> Result<(Hash, u64)> {
        let chain_tip: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'chain_tip'", [], |r| r.get(0))
            .optional()?;
        let next_id: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = 'next_id'", [], |r| r.get(0))
            .optional()?;
        let prev_chain_hash = match chain_tip {
            Some(hex) => hash::from_hex(&hex)
                .ok_or_else(|| Error::StoreCorrupt("meta.chain_tip is not valid hex".into()))?,
            None => ZERO_HASH,
        };
        let next_id = match next_id {
            Some(s) => s
                .parse()
                .map_err(|_| Error::StoreCorrupt("meta.next_id is not a valid integer".into()))?,
            None => 0,
        };
        Ok((prev_chain_hash, next_id))
    }

    /// Within one transaction: read the tip, compute `chain_hash`, insert the
    /// event and its regions, and advance the tip. Nothing is visible if the
    /// transaction aborts.
    pub fn append(&mut self, fields: EventFields, regions: &[NewEditRegion]) -> Result<u64> {
        let tx = self.conn.transaction()?;
        let (prev_chain_hash, id) = Self::tip(&tx)?;

        let canonical = CanonicalEvent {
            id,
            timestamp_ns: fields.timestamp_ns,
            file_path: &fields.file_path,
            file_size: fields.file_size,
            size_delta: fields.size_delta,
            content_hash: hash::to_hex(&fields.content_hash),
            prev_chain_hash: hash::to_hex(&prev_chain_hash),
            context_id: fields.context_id,
        };
        let encoded = serde_json::to_vec(&canonical)?;
        let mut mac = HmacSha256::new_from_slice(&self.hmac_key)
            .expect("HMAC-SHA256 accepts any key length");
        mac.update(&prev_chain_hash);
        mac.update(&encoded);
        let chain_hash: Hash = mac.finalize().into_bytes().into();

        tx.execute(
            "INSERT INTO events (id, timestamp_ns, file_path, file_size, size_delta, content_hash, prev_chain_hash, chain_hash, context_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                fields.timestamp_ns,
                fields.file_path,
                fields.file_size,
                fields.size_delta,
                hash::to_hex(&fields.content_hash),
                hash::to_hex(&prev_chain_hash),
                hash::to_hex(&chain_hash),
                fields.context_id,
            ],
        )?;
        for region in regions {
            tx.execute(
                "INSERT INTO edit_regions (event_id, start_pct_bits, end_pct_bits, delta_sign, byte_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id,
                    region.start_pct.to_bits(),
                    region.end_pct.to_bits(),
                    region.delta_sign,
                    region.byte_count,
                ],
            )?;
        }
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('chain_tip', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![hash::to_hex(&chain_hash)],
        )?;
        tx.execute(
            "INSERT INTO meta (key, value) VALUES ('next_id', ?1)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![(id + 1).to_string()],
        )?;
        tx.commit()?;
        Ok(id)
    }

    /// Replay the HMAC chain from the first event; a single mismatch is
    /// fatal for the caller's trust decision.
    pub fn integrity_check(&self) -> Result<IntegrityStatus> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp_ns, file_path, file_size, size_delta, content_hash, prev_chain_hash, chain_hash, context_id
             FROM events ORDER BY id ASC",
        )?;
        let mut rows = stmt.query([])?;
        let mut expected_prev = ZERO_HASH;
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let timestamp_ns: i64 = row.get(1)?;
            let file_path: String = row.get(2)?;
            let file_size: i64 = row.get(3)?;
            let size_delta: i32 = row.get(4)?;
            let content_hash_hex: String = row.get(5)?;
            let prev_chain_hash_hex: String = row.get(6)?;
            let chain_hash_hex: String = row.get(7)?;
            let context_id: Option<u64> = row.get(8)?;

            let stored_prev = hash::from_hex(&prev_chain_hash_hex)
                .ok_or_else(|| Error::StoreCorrupt(format!("row {id} has unparseable prev_chain_hash")))?;
            if stored_prev != expected_prev {
                tracing::warn!(id, "chain tamper detected: prev_chain_hash mismatch");
                return Ok(IntegrityStatus::TamperDetected { first_bad_id: id });
            }

            let canonical = CanonicalEvent {
                id,
                timestamp_ns,
                file_path: &file_path,
                file_size,
                size_delta,
                content_hash: content_hash_hex,
                prev_chain_hash: prev_chain_hash_hex,
                context_id,
            };
            let encoded = serde_json::to_vec(&canonical)?;
            let mut mac = HmacSha256::new_from_slice(&self.hmac_key).unwrap();
            mac.update(&stored_prev);
            mac.update(&encoded);
            let recomputed: Hash = mac.finalize().into_bytes().into();

            let stored_chain = hash::from_hex(&chain_hash_hex)
                .ok_or_else(|| Error::StoreCorrupt(format!("row {id} has unparseable chain_hash")))?;
            if !hash::ct_eq(&recomputed, &stored_chain) {
                return Ok(IntegrityStatus::TamperDetected { first_bad_id: id });
            }
            expected_prev = stored_chain;
        }
        Ok(IntegrityStatus::Ok)
    }

    pub fn get_events_by_file(&self, path: &str, from_ns: i64, to_ns: i64) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, timestamp_ns, file_path, file_size, size_delta, content_hash, prev_chain_hash, chain_hash, context_id
             FROM events WHERE file_path = ?1 AND timestamp_ns BETWEEN ?2 AND ?3
             ORDER BY timestamp_ns ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![path, from_ns, to_ns], row_to_event)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    pub fn get_edit_regions(&self, event_id: u64) -> Result<Vec<EditRegion>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, start_pct_bits, end_pct_bits, delta_sign, byte_count
             FROM edit_regions WHERE event_id = ?1 ORDER BY rowid_seq ASC",
        )?;
        let rows = stmt.query_map(params![event_id], |row| {
            Ok(EditRegion {
                event_id: row.get(0)?,
                start_pct_bits: row.get(1)?,
                end_pct_bits: row.get(2)?,
                delta_sign: row.get(3)?,
                byte_count: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(Error::from)
    }

    pub fn stats(&self) -> Result<Stats> {
        let event_count: u64 = self.conn.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
        let file_count: u64 = self
            .conn
            .query_row("SELECT COUNT(DISTINCT file_path) FROM events", [], |r| r.get(0))?;
        let oldest_ns: Option<i64> = self
            .conn
            .query_row("SELECT MIN(timestamp_ns) FROM events", [], |r| r.get(0))?;
        let newest_ns: Option<i64> = self
            .conn
            .query_row("SELECT MAX(timestamp_ns) FROM events", [], |r| r.get(0))?;
        let (tip, _) = Self::tip(&self.conn)?;
        let integrity_ok = matches!(self.integrity_check()?, IntegrityStatus::Ok);
        Ok(Stats {
            event_count,
            file_count,
            oldest_ns,
            newest_ns,
            chain_hash_hex: hash::to_hex(&tip),
            integrity_ok,
        })
    }
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<Event> {
    let content_hash_hex: String = row.get(5)?;
    let prev_chain_hash_hex: String = row.get(6)?;
    let chain_hash_hex: String = row.get(7)?;
    Ok(Event {
        id: row.get(0)?,
        timestamp_ns: row.get(1)?,
        file_path: row.get(2)?,
        file_size: row.get(3)?,
        size_delta: row.get(4)?,
        content_hash: hash::from_hex(&content_hash_hex).unwrap_or([0u8; 32]),
        prev_chain_hash: hash::from_hex(&prev_chain_hash_hex).unwrap_or([0u8; 32]),
        chain_hash: hash::from_hex(&chain_hash_hex).unwrap_or([0u8; 32]),
        context_id: row.get(8)?,
    })
}

fn derive_hmac_key(seed: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(HMAC_DOMAIN);
    hasher.update(seed);
    hasher.finalize().into()
}
