//! `EngineContext`: the single ownership boundary for the MMR store, the
//! secure event store, and the signatures ledger. The event loop owns this
//! uniquely; workers and read-only consumers (verifier, forensic pipeline)
//! receive scoped borrows, never owned clones.

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;

use crate::context::ContextManager;
use crate::error::Result;
use crate::evidence::{self, Packet, VerifyResult};
use crate::mmr::{MmrEngine, MmrStore};
use crate::profile::{self, AuthorshipProfile};
use crate::sigchain::{self, SignatureLog};
use crate::signer::Signer;
use crate::store::{EventFields, NewEditRegion, SecureEventStore};

pub struct EngineContext {
    mmr: Mutex<MmrEngine>,
    events: Mutex<SecureEventStore>,
    signatures: Mutex<SignatureLog>,
    contexts: Mutex<ContextManager>,
    signer: Signer,
}

/// Result of `commit_checkpoint`, matching the IPC contract's response
/// shape. `vdf_elapsed` is accepted and reported but never verified, per
/// the open question this spec resolves in favor of a pass-through field.
#[derive(Debug, Clone)]
pub struct CheckpointResult {
    pub checkpoint_id: u64,
    pub content_hash: [u8; 32],
    pub event_hash: [u8; 32],
    pub vdf_elapsed: Option<Duration>,
}

impl EngineContext {
    pub fn open(data_dir: &Path, signer: Signer, hmac_seed: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let mmr_store = MmrStore::open(mmr_path(data_dir))?;
        let mmr = MmrEngine::open(mmr_store)?;
        let events = SecureEventStore::open(events_path(data_dir), hmac_seed)?;
        let signatures = SignatureLog::open(signatures_path(data_dir))?;
        let contexts = ContextManager::open(events_path(data_dir))?;
        Ok(Self {
            mmr: Mutex::new(mmr),
            events: Mutex::new(events),
            signatures: Mutex::new(signatures),
            contexts: Mutex::new(contexts),
            signer,
        })
    }

    /// Record an observed content change: append the MMR leaf, then the
    /// secure-store event, tagged with the currently active context (if
    /// any). Per file, the caller is responsible for serializing calls in
    /// watcher-observed order.
    pub fn commit_checkpoint(
        &self,
        file_path: &str,
        content: &[u8],
        timestamp_ns: i64,
        prev_file_size: i64,
        regions: &[NewEditRegion],
        vdf_elapsed: Option<Duration>,
    ) -> Result<CheckpointResult> {
        let content_hash = {
            let mut mmr = self.mmr.lock();
            let (_, _, _) = mmr.append_leaf(content)?;
            crate::hash::leaf_hash(content)
        };

        let context_id = self.contexts.lock().active()?.map(|m| m.id);
        let file_size = content.len() as i64;
        let event_id = {
            let mut events = self.events.lock();
            events.append(
                EventFields {
                    timestamp_ns,
                    file_path: file_path.to_string(),
                    file_size,
                    size_delta: (file_size - prev_file_size) as i32,
                    content_hash,
                    context_id,
                },
                regions,
            )?
        };

        let event_hash = crate::hash::leaf_hash(format!("event:{event_id}").as_bytes());
        tracing::debug!(file_path, event_id, "checkpoint committed");
        Ok(CheckpointResult {
            checkpoint_id: event_id,
            content_hash,
            event_hash,
            vdf_elapsed,
        })
    }

    /// Sign the current MMR root and append it to the signatures ledger.
    pub fn sign_checkpoint(&self, timestamp: chrono::DateTime<chrono::Utc>) -> Result<()> {
        let (size, root) = {
            let mut mmr = self.mmr.lock();
            (mmr.size(), mmr.root()?)
        };
        let signature = self.signer.sign_root(&root);
        tracing::debug!(size, root = %hex::encode(root), "signing checkpoint");
        self.signatures.lock().append(sigchain::Entry { timestamp, root, signature, size })
    }

    pub fn export_evidence(&self, file_path: &str, content: &[u8]) -> Result<Packet> {
        let mut mmr = self.mmr.lock();
        let signatures = self.signatures.lock();
        evidence::export(file_path, content, &mut mmr, &signatures, self.signer.public_key())
    }

    pub fn verify_evidence(&self, content: &[u8], public_key: &[u8; 32]) -> Result<VerifyResult> {
        let mut mmr = self.mmr.lock();
        let signatures = self.signatures.lock();
        evidence::verify(content, public_key, &mut mmr, &signatures)
    }

    pub fn build_profile(
        &self,
        file_path: &str,
        from_ns: i64,
        to_ns: i64,
        correlator_input: Option<crate::correlator::Input>,
    ) -> Result<AuthorshipProfile> {
        let events_store = self.events.lock();
        let events = events_store.get_events_by_file(file_path, from_ns, to_ns)?;
        let mut regions = Vec::new();
        let samples: Vec<crate::forensics::EventSample> = events
            .iter()
            .map(|e| crate::forensics::EventSample { timestamp_ns: e.timestamp_ns, size_delta: e.size_delta })
            .collect();
        for event in &events {
            for region in events_store.get_edit_regions(event.id)? {
                regions.push(crate::forensics::RegionSample {
                    start_pct: region.start_pct(),
                    delta_sign: region.delta_sign,
                });
            }
        }
        Ok(profile::build(file_path, &samples, &regions, correlator_input))
    }

    pub fn contexts(&self) -> &Mutex<ContextManager> {
        &self.contexts
    }

    /// `status` IPC summary.
    pub fn status(&self) -> Result<EngineStatus> {
        let stats = self.events.lock().stats()?;
        Ok(EngineStatus {
            event_count: stats.event_count,
            integrity_ok: stats.integrity_ok,
            mmr_size: self.mmr.lock().size(),
            active_context: self.contexts.lock().active()?.is_some(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub event_count: u64,
    pub integrity_ok: bool,
    pub mmr_size: u64,
    pub active_context: bool,
}

fn mmr_path(data_dir: &Path) -> PathBuf {
    data_dir.join("mmr.dat")
}
fn events_path(data_dir: &Path) -> PathBuf {
    data_dir.join("events.db")
}
fn signatures_path(data_dir: &Path) -> PathBuf {
    data_dir.join("signatures.log")
}
