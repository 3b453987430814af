//! # LetterboxError
//!
//! Failure values returned by the Letterbox layer. A lookup that finds
//! nothing is an `Option::None`, not an error.

use thiserror::Error;

/// The store refused or failed a write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("write rejected by store: {reason}")]
pub struct WriteFailure {
    pub reason: String,
}

impl WriteFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The primary error type for all Letterbox operations.
#[derive(Error, Debug)]
pub enum LetterboxError {
    /// The operation needs a signing identity and none is configured
    #[error("no identity configured for this operation")]
    NoIdentity,

    /// The store rejected a write
    #[error(transparent)]
    WriteFailure(#[from] WriteFailure),

    /// A document path does not fit the template it was read under
    #[error("path {path:?} does not match template {template:?}")]
    MalformedPath { template: String, path: String },

    /// Every candidate draft id in the probe window is taken
    #[error("no free draft slot for {author} after {attempts} attempts")]
    DraftSlotsExhausted { author: String, attempts: u32 },

    /// A read marker holds something other than a timestamp
    #[error("read marker content is not a timestamp: {0:?}")]
    InvalidWatermark(String),
}

/// A specialized Result type for Letterbox logic.
pub type Result<T> = std::result::Result<T, LetterboxError>;
