//! Terminology-level error taxonomy.
//!
//! `Rf2Error` (in [`crate::types`]) covers failures while ingesting RF2
//! source files. `TerminologyError` sits above it and covers failures from
//! actually serving a loaded store: a code that doesn't resolve, an
//! expression or ECL query that doesn't parse, a filter used out of order.

use snomed_types::SctId;
use thiserror::Error;

/// Result alias used throughout the service-facing parts of this crate.
pub type TerminologyResult<T> = Result<T, TerminologyError>;

/// Errors raised by SNOMED CT services, expressions, and filters.
#[derive(Debug, Error)]
pub enum TerminologyError {
    /// A requested concept id does not exist in the store.
    #[error("code not found: {code}")]
    CodeNotFound {
        /// The unresolved concept id.
        code: SctId,
    },

    /// A post-coordinated expression or ECL query failed to parse.
    #[error("invalid expression at offset {offset}: {message}")]
    InvalidExpression {
        /// Byte offset into the source text where parsing failed.
        offset: usize,
        /// A human-readable description of the failure.
        message: String,
    },

    /// A filter operation was requested that this store/provider does not
    /// implement.
    #[error("unsupported filter: {operation}")]
    UnsupportedFilter {
        /// The name of the unsupported filter operation.
        operation: String,
    },

    /// A filter handle was read from before `close` was called on it.
    #[error("filter not closed before use")]
    FilterNotClosed,

    /// The requested terminology version does not match what's loaded.
    #[error("version mismatch: requested {requested}, loaded {loaded}")]
    VersionMismatch {
        /// The version the caller asked for.
        requested: String,
        /// The version actually loaded.
        loaded: String,
    },

    /// Subsumption was requested between two codes the store cannot
    /// compare (e.g. different code systems, or a system with no
    /// hierarchy).
    #[error("subsumption unsupported: {reason}")]
    SubsumptionUnsupported {
        /// Why the comparison could not be made.
        reason: String,
    },

    /// The underlying binary container failed an internal consistency
    /// check (misaligned offset, out-of-range reference, bad cache
    /// version).
    #[error("store corrupt: {detail}")]
    StoreCorrupt {
        /// Detail of the corruption found.
        detail: String,
    },

    /// An operation exceeded its caller-supplied time budget.
    #[error("operation timed out after {elapsed_ms}ms")]
    TimeOut {
        /// Milliseconds elapsed before the timeout fired.
        elapsed_ms: u64,
    },

    /// A caller-supplied cancellation flag was observed set.
    #[error("operation cancelled")]
    OperationCancelled,

    /// A collaborating backend (SQL connection, remote HTTPS call) failed.
    #[error("backend failure: {0}")]
    BackendFailure(String),

    /// Ingestion of the underlying RF2 source failed.
    #[error(transparent)]
    Rf2(#[from] crate::types::Rf2Error),
}
