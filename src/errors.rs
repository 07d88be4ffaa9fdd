//! Error types for trace construction, encoding and persistence
//!
//! Failures of the traced calls themselves are never errors here: they are
//! recorded as the `error` string of the trace node. This module only covers
//! what can go wrong around a finished trace:
//! - Decoding the persisted form
//! - Talking to the backing store
//! - Looking up a trace that was never stored

use alloy::primitives::B256;
use thiserror::Error;

/// Error recorded on a node whose frame executed `REVERT`
pub const EXECUTION_REVERTED: &str = "execution reverted";

/// Top-level error type for reading and writing traces
#[derive(Debug, Error)]
pub enum TraceError {
    /// The stored bytes could not be turned back into a trace set
    #[error("Failed to decode stored trace: {0}")]
    Codec(#[from] CodecError),

    /// The backing store failed
    #[error("Trace store error: {0}")]
    Store(#[from] StoreError),

    /// Nothing (or an empty value) is stored under this transaction hash
    #[error("Trace of transaction {0} not found in trace store")]
    NotFound(B256),
}

/// Storage-form decoding errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed RLP
    #[error("Invalid RLP: {0}")]
    Rlp(alloy_rlp::Error),

    /// Kind tag outside the known set
    #[error("Unknown trace kind tag {0}")]
    UnknownKind(u8),

    /// A field required by the node's kind is absent
    ///
    /// # Fields
    /// * `kind` - Kind label of the offending node
    /// * `field` - Name of the missing field
    #[error("Missing field `{field}` for {kind} trace")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    /// Input continues after the encoded trace set
    #[error("{0} trailing bytes after encoded trace set")]
    TrailingBytes(usize),
}

impl From<alloy_rlp::Error> for CodecError {
    fn from(err: alloy_rlp::Error) -> Self {
        CodecError::Rlp(err)
    }
}

/// Errors reported by a [`TraceStore`](crate::traits::TraceStore) backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend-specific failure
    #[error("Backend failure: {0}")]
    Backend(String),
}
