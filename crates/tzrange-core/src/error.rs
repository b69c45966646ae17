//! Error types for tzrange-core.
//!
//! Every failure mode of the compiler maps onto one of five error
//! categories; the payload is a human-readable message that names the
//! archive member and the offending source line where one exists.
//! Query operations never fail (see [`crate::query`]).

use thiserror::Error;

/// The main error type for tzrange operations.
#[derive(Debug, Error)]
pub enum TzRangeError {
    /// DEFLATE or tar structure violation, or a required archive member
    /// is missing.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    /// A source line does not follow the zic declaration syntax.
    #[error("malformed declaration: {0}")]
    MalformedDeclaration(String),

    /// A declaration names a rule, zone or country that does not exist.
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),

    /// A string does not fit in its bounded slot (zone name, country
    /// name or code, abbreviation).
    #[error("overflow: {0}")]
    Overflow(String),

    /// The day-granular chronological ordering of a rule bundle cannot
    /// be trusted. Diagnosed, and surfaced as a hard error.
    #[error("suspect rule ordering: {0}")]
    SuspectOrdering(String),
}

/// Result type alias for tzrange operations.
pub type Result<T> = std::result::Result<T, TzRangeError>;
