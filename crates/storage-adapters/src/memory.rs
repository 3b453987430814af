//! In-process replica for tests and local development.
//!
//! Keeps the latest document per path. A write always wins over the
//! document it replaces: its timestamp is bumped past the old one when the
//! clock has not moved. Expired documents are dropped from the map on the
//! next write or query that sees them. Signatures are not produced or
//! checked.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    AuthorKeypair, Clock, DocInput, DocQuery, Document, Replica, SystemClock, WriteFailure,
};
use tracing::{trace, warn};

pub struct MemoryReplica {
    docs: DashMap<String, Document>,
    clock: Arc<dyn Clock>,
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            docs: DashMap::new(),
            clock,
        }
    }

    /// Number of stored documents, including expired ones not purged yet.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn is_live(doc: &Document, now: i64) -> bool {
        doc.delete_after.map_or(true, |deadline| deadline > now)
    }

    fn purge_expired(&self, now: i64) {
        let before = self.docs.len();
        self.docs.retain(|_, doc| Self::is_live(doc, now));
        let purged = before.saturating_sub(self.docs.len());
        if purged > 0 {
            trace!(purged, "dropped expired documents");
        }
    }

    fn validate(input: &DocInput, now: i64) -> Result<(), WriteFailure> {
        if !input.path.starts_with('/') {
            return Err(WriteFailure::new(format!(
                "path must start with '/': {:?}",
                input.path
            )));
        }
        if input.format.is_empty() {
            return Err(WriteFailure::new("document format is required"));
        }
        if let Some(deadline) = input.delete_after {
            if deadline <= now {
                return Err(WriteFailure::new("deleteAfter is already in the past"));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Replica for MemoryReplica {
    async fn set(
        &self,
        identity: &AuthorKeypair,
        input: DocInput,
    ) -> Result<Document, WriteFailure> {
        let now = self.clock.now_micros();
        if let Err(err) = Self::validate(&input, now) {
            warn!(path = %input.path, error = %err, "rejecting write");
            return Err(err);
        }
        self.purge_expired(now);

        let build = |timestamp: i64| Document {
            path: input.path.clone(),
            content: input.content.clone(),
            format: input.format.clone(),
            author: identity.address.clone(),
            timestamp,
            delete_after: input.delete_after,
        };

        let doc = match self.docs.entry(input.path.clone()) {
            Entry::Occupied(mut occupied) => {
                let doc = build(now.max(occupied.get().timestamp + 1));
                occupied.insert(doc.clone());
                doc
            }
            Entry::Vacant(vacant) => {
                let doc = build(now);
                vacant.insert(doc.clone());
                doc
            }
        };
        trace!(path = %doc.path, timestamp = doc.timestamp, "stored document");
        Ok(doc)
    }

    async fn get_latest_doc_at_path(&self, path: &str) -> Option<Document> {
        let now = self.clock.now_micros();
        if self
            .docs
            .remove_if(path, |_, doc| !Self::is_live(doc, now))
            .is_some()
        {
            return None;
        }
        self.docs.get(path).map(|doc| doc.value().clone())
    }

    async fn query_docs(&self, query: &DocQuery) -> Vec<Document> {
        let now = self.clock.now_micros();
        self.purge_expired(now);
        let mut docs: Vec<Document> = self
            .docs
            .iter()
            .filter(|entry| entry.key().starts_with(&query.path_starts_with))
            .filter(|entry| {
                query
                    .content_length_gt
                    .map_or(true, |min| entry.value().content.len() > min)
            })
            .filter(|entry| Self::is_live(entry.value(), now))
            .map(|entry| entry.value().clone())
            .collect();
        docs.sort_by(|a, b| a.path.cmp(&b.path));
        docs
    }
}
