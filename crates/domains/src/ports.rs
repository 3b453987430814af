//! # Core Traits (Ports)
//!
//! The document store and the clock are external collaborators. Adapters
//! implement these traits; the services only ever see the traits.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::errors::WriteFailure;
use crate::models::{AuthorKeypair, DocInput, DocQuery, Document};

/// Path-addressed, author-signed document store.
///
/// Conflict resolution, sync and signature checks belong to the
/// implementation. Ordering of `query_docs` results is not guaranteed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait Replica: Send + Sync {
    /// Signs and stores a document, returning it as stored.
    async fn set(&self, identity: &AuthorKeypair, input: DocInput)
        -> Result<Document, WriteFailure>;

    /// The newest document at exactly `path`.
    async fn get_latest_doc_at_path(&self, path: &str) -> Option<Document>;

    /// Latest documents whose path starts with the query prefix.
    async fn query_docs(&self, query: &DocQuery) -> Vec<Document>;
}

/// Source of "now" in microseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_micros(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_micros(&self) -> i64 {
        Utc::now().timestamp_micros()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_micros: i64) -> Self {
        Self {
            now: AtomicI64::new(start_micros),
        }
    }

    pub fn set(&self, micros: i64) {
        self.now.store(micros, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: i64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_micros(), 1_000);
        clock.advance(5);
        assert_eq!(clock.now_micros(), 1_005);
        clock.set(42);
        assert_eq!(clock.now_micros(), 42);
    }

    #[test]
    fn test_system_clock_is_microseconds() {
        // Anything after 2001-09-09 has at least 16 digits in microseconds.
        assert!(SystemClock.now_micros() > 1_000_000_000_000_000);
    }
}
