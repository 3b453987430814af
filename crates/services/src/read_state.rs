//! Per-reader read markers.
//!
//! Each (thread, reader) pair has one marker document whose content is the
//! timestamp the reader has read up to. No marker means nothing has been
//! read: every post in the thread counts as unread.

use domains::{Document, LetterboxError, Post, PostKind, Result, Thread, ThreadId};
use tracing::debug;

use crate::Letterbox;

impl Letterbox {
    /// Overwrites the reader's watermark for a thread. Moving it backward
    /// is allowed.
    pub async fn mark_read_up_to(&self, thread: &ThreadId, up_to: i64) -> Result<Document> {
        let identity = self.require_identity()?;
        debug!(thread = %thread, up_to, "marking thread read");
        self.write(
            identity,
            self.paths.read_marker(thread, &identity.address),
            up_to.to_string(),
            None,
            "mark read up to",
        )
        .await
    }

    /// The local identity's watermark for a thread, if it has one.
    pub async fn read_watermark(&self, thread: &ThreadId) -> Result<Option<i64>> {
        let identity = self.require_identity()?;
        let Some(marker) = self
            .replica
            .get_latest_doc_at_path(&self.paths.read_marker(thread, &identity.address))
            .await
        else {
            return Ok(None);
        };
        marker
            .content
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| LetterboxError::InvalidWatermark(marker.content.clone()))
    }

    /// A post is unread when its path timestamp is past the watermark, or
    /// when there is no watermark at all.
    pub async fn is_unread(&self, post: &Post) -> Result<bool> {
        let (thread, ts) = self.locate(post)?;
        let watermark = self.read_watermark(&thread).await?;
        Ok(is_past(ts, watermark))
    }

    /// Whether any post in the thread is unread. Reads the marker once.
    pub async fn thread_has_unread_posts(&self, thread: &Thread) -> Result<bool> {
        let id = self.thread_id(thread)?;
        let watermark = self.read_watermark(&id).await?;
        for post in thread.posts() {
            let (_, ts) = self.locate(post)?;
            if is_past(ts, watermark) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn locate(&self, post: &Post) -> Result<(ThreadId, i64)> {
        self.paths
            .parse_post(&post.doc.path)
            .ok_or_else(|| {
                let template = match self.paths.classify(&post.doc.path) {
                    PostKind::Root => self.paths.thread_root_template(),
                    PostKind::Reply => self.paths.thread_reply_template(),
                };
                LetterboxError::MalformedPath {
                    template: template.as_str().to_string(),
                    path: post.doc.path.clone(),
                }
            })
    }
}

fn is_past(ts: i64, watermark: Option<i64>) -> bool {
    watermark.map_or(true, |read_up_to| ts > read_up_to)
}
