//! Domain-specific errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("offset {offset} is outside the document (length {len})")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("no position at line {line}, column {column}")]
    InvalidPosition { line: usize, column: usize },
}

/// Reasons a header pattern cannot take part in resolution.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("numeric range {{{lo}..{hi}}} has {count} values, more than the limit of {limit}")]
    RangeTooLarge {
        lo: i64,
        hi: i64,
        count: u128,
        limit: usize,
    },
    #[error("pattern expands to more than {limit} plain globs")]
    TooManyExpansions { limit: usize },
    #[error("glob `{glob}` rejected: {source}")]
    Glob {
        glob: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainmentError {
    #[error("containment check visited more than {limit} states")]
    StateLimit { limit: usize },
}
