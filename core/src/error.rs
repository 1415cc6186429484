//! The canonical error type for the provenance engine.
//!
//! Storage-layer errors that violate an invariant (`StoreCorrupt`,
//! `IntegrityFailed`) are fatal for the operation that surfaced them and are
//! never swallowed or retried by anything in this crate.

use std::path::PathBuf;

/// The discriminated result type every public operation in this crate returns.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad argument: missing path, malformed flag, out-of-range value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No MMR leaf matches the requested content hash.
    #[error("file not witnessed: {path}")]
    NotWitnessed { path: PathBuf },

    /// The MMR store or event store is unreadable or internally inconsistent.
    #[error("store corrupt: {0}")]
    StoreCorrupt(String),

    /// An MMR append targeted a position other than the store's current size.
    #[error("invalid position: expected {expected}, got {actual}")]
    InvalidPosition { expected: u64, actual: u64 },

    /// A signing or verification key was invalid, encrypted, or unsupported.
    #[error("key error: {0}")]
    KeyError(String),

    /// The HMAC hash chain in the secure event store diverged at a row.
    #[error("integrity failed at row {bad_id}")]
    IntegrityFailed { bad_id: u64 },

    /// An Ed25519 signature failed to verify.
    #[error("signature verification failed")]
    SignatureFailed,

    /// A required external resource (daemon, TPM, oracle) is not available.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An operation conflicts with existing state (e.g. a context already active).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's deadline elapsed before the operation completed.
    #[error("deadline exceeded")]
    Deadline,

    /// Underlying I/O failure, propagated unchanged.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Underlying SQLite failure, propagated unchanged.
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// Underlying JSON (de)serialization failure, propagated unchanged.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable machine-parseable kind for the IPC layer's `{"error": {"kind", "message"}}` shape.
impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::NotWitnessed { .. } => "not_witnessed",
            Error::StoreCorrupt(_) => "store_corrupt",
            Error::InvalidPosition { .. } => "invalid_position",
            Error::KeyError(_) => "key_error",
            Error::IntegrityFailed { .. } => "integrity_failed",
            Error::SignatureFailed => "signature_failed",
            Error::Unavailable(_) => "unavailable",
            Error::Conflict(_) => "conflict",
            Error::Deadline => "deadline",
            Error::Io(_) => "io",
            Error::Sqlite(_) => "store_corrupt",
            Error::Json(_) => "invalid_input",
        }
    }
}
