use thiserror::Error;

/// Error kinds the core distinguishes internally (spec §7).
///
/// Top-level glue code (background loop bodies, `main`) still reports failures
/// through `anyhow::Result`; this enum exists for call sites that need to
/// match on *what kind* of failure happened (retry on `DbDown`, skip-and-log
/// on `Comparator`, etc).
#[derive(Debug, Error)]
pub enum CoreError {
    /// The relational store is unreachable; the surrounding transaction must
    /// be retried from `begin`. The cache is never mutated before commit.
    #[error("database unavailable: {0}")]
    DbDown(String),

    /// A history value failed normalisation (bad type coercion, non-finite
    /// float, oversized string). The value is still written to `history`
    /// with the error attached; the item is marked not-supported.
    #[error("conversion failed for item {itemid}: {reason}")]
    ConversionFailed { itemid: u64, reason: String },

    /// The shared history-value region could not satisfy an allocation.
    /// Recoverable: the caller backs off and retries.
    #[error("allocator exhausted in region {region}")]
    AllocExhausted { region: &'static str },

    /// A configuration-cache lookup for an itemid in flight came back empty.
    #[error("no configuration for item {0}")]
    LookupMiss(u64),

    /// A DSE comparator or diff step failed for a single row; that row is
    /// skipped and CC is left untouched for it.
    #[error("comparator failed for {entity} row {row_id}: {reason}")]
    Comparator {
        entity: &'static str,
        row_id: i64,
        reason: String,
    },

    /// Unrecoverable: shared-memory/region creation failed at boot, or an
    /// id-region overflowed. The process must exit.
    #[error("fatal: {0}")]
    Fatal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
