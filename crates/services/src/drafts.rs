//! Reply drafts and thread-root drafts.
//!
//! A reply draft has one slot per (thread, author). Thread-root drafts are
//! keyed by author and a draft id; clearing either kind writes empty
//! content over the slot.

use domains::{DocQuery, Document, DraftParts, LetterboxError, Result, ThreadId};
use tracing::{debug, warn};

use crate::Letterbox;

impl Letterbox {
    /// The local identity's draft reply to a thread. `Some("")` once cleared.
    pub async fn get_reply_draft(&self, thread: &ThreadId) -> Result<Option<String>> {
        let identity = self.require_identity()?;
        let doc = self
            .replica
            .get_latest_doc_at_path(&self.paths.reply_draft(thread, &identity.address))
            .await;
        Ok(doc.map(|doc| doc.content))
    }

    pub async fn set_reply_draft(&self, thread: &ThreadId, content: &str) -> Result<Document> {
        let identity = self.require_identity()?;
        self.write(
            identity,
            self.paths.reply_draft(thread, &identity.address),
            content.to_string(),
            None,
            "set reply draft",
        )
        .await
    }

    pub async fn clear_reply_draft(&self, thread: &ThreadId) -> Result<Document> {
        self.set_reply_draft(thread, "").await
    }

    /// Ids of the local identity's non-empty thread-root drafts, oldest
    /// first.
    pub async fn get_thread_root_draft_ids(&self) -> Result<Vec<String>> {
        let identity = self.require_identity()?;
        let query = DocQuery::prefix(self.paths.thread_draft_prefix(&identity.address))
            .with_content_length_gt(0);

        let mut ids: Vec<String> = self
            .replica
            .query_docs(&query)
            .await
            .into_iter()
            .filter(|doc| !doc.content.is_empty())
            .filter_map(|doc| match self.paths.parse_thread_draft(&doc.path) {
                Some((_, id)) => Some(id),
                None => {
                    warn!(path = %doc.path, "skipping malformed draft path");
                    None
                }
            })
            .collect();
        // Numeric ids first in numeric order, then any others lexically.
        ids.sort_by_cached_key(|id| {
            let numeric = id.parse::<i64>().ok();
            (numeric.is_none(), numeric, id.clone())
        });
        Ok(ids)
    }

    pub async fn get_thread_root_draft_content(&self, id: &str) -> Result<Option<String>> {
        let identity = self.require_identity()?;
        let doc = self
            .replica
            .get_latest_doc_at_path(&self.paths.thread_draft(&identity.address, id))
            .await;
        Ok(doc.map(|doc| doc.content))
    }

    /// Saves a thread-root draft and returns its id.
    ///
    /// With an explicit `id` the slot is overwritten. Without one, ids are
    /// tried upward from the current time until a slot with no document is
    /// found. This is a probe, not a reservation: two writers sharing one
    /// identity on the same clock tick can still collide.
    pub async fn set_thread_root_draft(&self, content: &str, id: Option<&str>) -> Result<String> {
        let identity = self.require_identity()?;

        let id = match id {
            Some(id) => id.to_string(),
            None => self.free_draft_id().await?,
        };

        self.write(
            identity,
            self.paths.thread_draft(&identity.address, &id),
            content.to_string(),
            None,
            "set thread draft",
        )
        .await?;
        Ok(id)
    }

    pub async fn clear_thread_root_draft(&self, id: &str) -> Result<Document> {
        let identity = self.require_identity()?;
        self.write(
            identity,
            self.paths.thread_draft(&identity.address, id),
            String::new(),
            None,
            "clear thread draft",
        )
        .await
    }

    /// Title and body of a thread-root draft, or `None` if the draft is
    /// missing, empty, or has no `# ` title line yet.
    pub async fn get_draft_thread_parts(&self, id: &str) -> Result<Option<DraftParts>> {
        let content = self.get_thread_root_draft_content(id).await?;
        Ok(content.as_deref().and_then(DraftParts::parse))
    }

    async fn free_draft_id(&self) -> Result<String> {
        let identity = self.require_identity()?;
        let start = self.clock.now_micros();
        let attempts = self.config.draft_probe_limit;

        for offset in 0..attempts {
            let candidate = start.saturating_add(i64::from(offset)).to_string();
            let path = self.paths.thread_draft(&identity.address, &candidate);
            if self.replica.get_latest_doc_at_path(&path).await.is_none() {
                if offset > 0 {
                    debug!(draft_id = %candidate, collisions = offset, "draft id bumped past taken slots");
                }
                return Ok(candidate);
            }
        }

        Err(LetterboxError::DraftSlotsExhausted {
            author: identity.address.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::letterbox::test_support::*;
    use domains::{LayerConfig, ManualClock, MockReplica};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_probe_skips_taken_slots() {
        let taken = [START.to_string(), (START + 1).to_string()];
        let mut replica = MockReplica::new();
        replica.expect_get_latest_doc_at_path().returning(move |path| {
            taken
                .iter()
                .any(|id| path.ends_with(&format!("/{id}.md")))
                .then(|| doc(path.to_string(), "taken", "@cinn.btestkey"))
        });
        replica
            .expect_set()
            .withf(|_, input| input.path.ends_with(&format!("/{}.md", START + 2)))
            .times(1)
            .returning(|id, input| Ok(stored(id, input)));

        let layer = layer(replica, Some(keypair("cinn")));
        let id = layer.set_thread_root_draft("thoughts", None).await.unwrap();
        assert_eq!(id, (START + 2).to_string());
    }

    #[tokio::test]
    async fn test_probe_is_bounded() {
        let mut replica = MockReplica::new();
        replica
            .expect_get_latest_doc_at_path()
            .times(3)
            .returning(|path| Some(doc(path.to_string(), "taken", "@cinn.btestkey")));
        replica.expect_set().never();

        let config = LayerConfig {
            draft_probe_limit: 3,
            ..LayerConfig::default()
        };
        let layer = Letterbox::with_config(Arc::new(replica), Some(keypair("cinn")), config)
            .with_clock(Arc::new(ManualClock::new(START)));
        let err = layer.set_thread_root_draft("x", None).await.unwrap_err();
        assert!(matches!(
            err,
            LetterboxError::DraftSlotsExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test]
    async fn test_explicit_id_overwrites_without_probing() {
        let mut replica = MockReplica::new();
        replica.expect_get_latest_doc_at_path().never();
        replica
            .expect_set()
            .withf(|_, input| input.path == "/letterbox/drafts/~@cinn.btestkey/77.md")
            .times(1)
            .returning(|id, input| Ok(stored(id, input)));

        let layer = layer(replica, Some(keypair("cinn")));
        let id = layer.set_thread_root_draft("again", Some("77")).await.unwrap();
        assert_eq!(id, "77");
    }

    #[tokio::test]
    async fn test_draft_ids_sorted_and_filtered() {
        let mut replica = MockReplica::new();
        replica
            .expect_query_docs()
            .withf(|q| {
                q.path_starts_with == "/letterbox/drafts/~@cinn.btestkey/"
                    && q.content_length_gt == Some(0)
            })
            .returning(|_| {
                vec![
                    doc("/letterbox/drafts/~@cinn.btestkey/1000.md".into(), "b", "@cinn.btestkey"),
                    doc("/letterbox/drafts/~@cinn.btestkey/999.md".into(), "a", "@cinn.btestkey"),
                    doc("/letterbox/drafts/~@cinn.btestkey/1001.md".into(), "", "@cinn.btestkey"),
                ]
            });

        let layer = layer(replica, Some(keypair("cinn")));
        let ids = layer.get_thread_root_draft_ids().await.unwrap();
        assert_eq!(ids, ["999", "1000"]);
    }

    #[tokio::test]
    async fn test_mixed_draft_ids_have_a_total_order() {
        let ids: Vec<String> = (0..200)
            .map(|n| if n % 3 == 0 { format!("{n}x") } else { n.to_string() })
            .rev()
            .collect();
        let docs: Vec<Document> = ids
            .iter()
            .map(|id| {
                doc(
                    format!("/letterbox/drafts/~@cinn.btestkey/{id}.md"),
                    "draft",
                    "@cinn.btestkey",
                )
            })
            .collect();
        let mut replica = MockReplica::new();
        replica
            .expect_query_docs()
            .returning(move |_| docs.clone());

        let layer = layer(replica, Some(keypair("cinn")));
        let sorted = layer.get_thread_root_draft_ids().await.unwrap();
        assert_eq!(sorted.len(), 200);

        let numeric = sorted.iter().take_while(|id| id.parse::<i64>().is_ok()).count();
        assert_eq!(numeric, 133);
        assert_eq!(&sorted[..3], ["1", "2", "4"]);
        assert_eq!(sorted[numeric - 1], "199");
        assert_eq!(&sorted[numeric..numeric + 3], ["0x", "102x", "105x"]);
    }

    #[tokio::test]
    async fn test_draft_parts_of_missing_draft() {
        let mut replica = MockReplica::new();
        replica.expect_get_latest_doc_at_path().returning(|_| None);

        let layer = layer(replica, Some(keypair("cinn")));
        assert_eq!(layer.get_draft_thread_parts("1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_drafts_require_identity() {
        let layer = layer(MockReplica::new(), None);
        assert!(matches!(
            layer.get_thread_root_draft_ids().await,
            Err(LetterboxError::NoIdentity)
        ));
        assert!(matches!(
            layer.get_reply_draft(&ThreadId::new(1, "@cinn.b")).await,
            Err(LetterboxError::NoIdentity)
        ));
    }
}
