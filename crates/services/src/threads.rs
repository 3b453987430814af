//! Thread and post assembly, creation and editing.

use std::cmp::Ordering;

use domains::{
    DocQuery, Document, DraftParts, LetterboxError, PathTemplate, Post, PostKind, Result, Thread,
    ThreadId,
};
use tracing::{debug, info, warn};

use crate::Letterbox;

fn malformed(template: &PathTemplate, path: &str) -> LetterboxError {
    LetterboxError::MalformedPath {
        template: template.as_str().to_string(),
        path: path.to_string(),
    }
}

impl Letterbox {
    /// Root timestamp recovered from a thread root's path.
    pub fn get_thread_root_timestamp(&self, doc: &Document) -> Result<i64> {
        self.paths
            .parse_thread_root(&doc.path)
            .map(|id| id.root_timestamp)
            .ok_or_else(|| malformed(self.paths.thread_root_template(), &doc.path))
    }

    /// Reply timestamp recovered from a reply's path.
    pub fn get_reply_timestamp(&self, doc: &Document) -> Result<i64> {
        self.paths
            .parse_reply(&doc.path)
            .map(|key| key.reply_timestamp)
            .ok_or_else(|| malformed(self.paths.thread_reply_template(), &doc.path))
    }

    pub fn get_post_timestamp(&self, doc: &Document) -> Result<i64> {
        match self.paths.classify(&doc.path) {
            PostKind::Root => self.get_thread_root_timestamp(doc),
            PostKind::Reply => self.get_reply_timestamp(doc),
        }
    }

    /// The identifier of the thread a root post opens.
    pub fn thread_id(&self, thread: &Thread) -> Result<ThreadId> {
        self.paths
            .parse_thread_root(&thread.root.doc.path)
            .ok_or_else(|| malformed(self.paths.thread_root_template(), &thread.root.doc.path))
    }

    pub fn to_thread_root(&self, doc: Document) -> Result<Post> {
        let ts = self.get_thread_root_timestamp(&doc)?;
        self.to_post_at(doc, ts, PostKind::Root)
    }

    pub fn to_post(&self, doc: Document) -> Result<Post> {
        let ts = self.get_reply_timestamp(&doc)?;
        self.to_post_at(doc, ts, PostKind::Reply)
    }

    fn to_post_at(&self, doc: Document, ts: i64, kind: PostKind) -> Result<Post> {
        let template = match kind {
            PostKind::Root => self.paths.thread_root_template(),
            PostKind::Reply => self.paths.thread_reply_template(),
        };
        let path = doc.path.clone();
        Post::from_path_timestamp(doc, ts).ok_or_else(|| malformed(template, &path))
    }

    /// Opening posts only, newest path first. One scan; replies are not
    /// fetched.
    pub async fn get_thread_roots(&self) -> Result<Vec<Post>> {
        let mut roots: Vec<Post> = self
            .replica
            .query_docs(&DocQuery::prefix(self.paths.thread_root_prefix()))
            .await
            .into_iter()
            .filter_map(|doc| {
                let path = doc.path.clone();
                match self.to_thread_root(doc) {
                    Ok(post) => Some(post),
                    Err(err) => {
                        warn!(path = %path, error = %err, "skipping malformed thread root");
                        None
                    }
                }
            })
            .collect();
        roots.sort_by(|a, b| b.doc.path.cmp(&a.doc.path));
        Ok(roots)
    }

    /// Every thread, most recently active first.
    ///
    /// Threads whose root disappears between the scan and the fetch, or
    /// cannot be resolved, are dropped. Equal activity falls back to the
    /// opening author, then to the root timestamp.
    pub async fn get_threads(&self) -> Result<Vec<Thread>> {
        let roots = self
            .replica
            .query_docs(&DocQuery::prefix(self.paths.thread_root_prefix()))
            .await;

        let mut threads = Vec::with_capacity(roots.len());
        for root in roots {
            let Some(id) = self.paths.parse_thread_root(&root.path) else {
                warn!(path = %root.path, "skipping document that is not a thread root");
                continue;
            };
            match self.get_thread(&id).await {
                Ok(Some(thread)) => threads.push((id, thread)),
                Ok(None) => debug!(thread = %id, "thread root vanished during listing"),
                Err(err) => warn!(thread = %id, error = %err, "skipping unresolvable thread"),
            }
        }

        threads.sort_by(|(a_id, a), (b_id, b)| {
            b.last_activity()
                .cmp(&a.last_activity())
                .then_with(|| a_id.op.cmp(&b_id.op))
                .then_with(|| a_id.root_timestamp.cmp(&b_id.root_timestamp))
        });
        Ok(threads.into_iter().map(|(_, thread)| thread).collect())
    }

    /// The thread with its replies in posting order, or `None` if the root
    /// does not exist.
    pub async fn get_thread(&self, id: &ThreadId) -> Result<Option<Thread>> {
        let Some(root_doc) = self
            .replica
            .get_latest_doc_at_path(&self.paths.thread_root(id))
            .await
        else {
            return Ok(None);
        };
        let root = self.to_thread_root(root_doc)?;

        let reply_docs = self
            .replica
            .query_docs(&DocQuery::prefix(self.paths.reply_prefix(id)))
            .await;
        let mut replies: Vec<Post> = reply_docs
            .into_iter()
            .filter_map(|doc| match self.to_post(doc) {
                Ok(post) => Some(post),
                Err(err) => {
                    warn!(thread = %id, error = %err, "skipping malformed reply");
                    None
                }
            })
            .collect();
        replies.sort_by(by_first_posted);

        Ok(Some(Thread { root, replies }))
    }

    /// Opens a new thread and marks it read for its author.
    ///
    /// A failed read-marker write is logged and does not fail the call: the
    /// root already exists, and an error would invite a duplicate retry.
    pub async fn create_thread(&self, content: &str, delete_after: Option<i64>) -> Result<Thread> {
        let identity = self.require_identity()?;
        let id = ThreadId::new(self.clock.now_micros(), identity.address.clone());

        let doc = self
            .write(
                identity,
                self.paths.thread_root(&id),
                content.to_string(),
                delete_after,
                "create thread root",
            )
            .await?;
        let root = self.to_thread_root(doc)?;

        if let Err(err) = self.mark_read_up_to(&id, id.root_timestamp).await {
            warn!(thread = %id, error = %err, "thread created but not marked read");
        }
        info!(thread = %id, "thread created");

        Ok(Thread {
            root,
            replies: Vec::new(),
        })
    }

    /// Replies to a thread and marks it read up to the new reply for the
    /// replier. As with `create_thread`, only the reply write can fail the
    /// call.
    pub async fn create_reply(
        &self,
        thread: &ThreadId,
        content: &str,
        delete_after: Option<i64>,
    ) -> Result<Post> {
        let identity = self.require_identity()?;
        let reply_ts = self.clock.now_micros();

        let doc = self
            .write(
                identity,
                self.paths.reply(thread, reply_ts, &identity.address),
                content.to_string(),
                delete_after,
                "create reply",
            )
            .await?;
        let post = self.to_post(doc)?;

        if let Err(err) = self.mark_read_up_to(thread, reply_ts).await {
            warn!(thread = %thread, error = %err, "reply created but not marked read");
        }
        info!(thread = %thread, reply_timestamp = reply_ts, "reply created");

        Ok(post)
    }

    /// Overwrites a post in place. The path, and with it the post's
    /// identity and `first_posted`, is unchanged.
    pub async fn edit_post(&self, post: &Post, content: &str) -> Result<Document> {
        let identity = self.require_identity()?;
        self.write(
            identity,
            post.doc.path.clone(),
            content.to_string(),
            post.doc.delete_after,
            "edit post",
        )
        .await
    }

    /// The `# ` heading on the first line of the opening post, if any.
    pub fn get_thread_title(&self, thread: &Thread) -> Option<String> {
        DraftParts::parse(&thread.root.doc.content).map(|parts| parts.title)
    }
}

fn by_first_posted(a: &Post, b: &Post) -> Ordering {
    a.first_posted
        .cmp(&b.first_posted)
        .then_with(|| a.doc.path.cmp(&b.doc.path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::letterbox::test_support::*;
    use domains::{AuthorAddress, MockReplica, WriteFailure};

    #[tokio::test]
    async fn test_create_thread_requires_identity() {
        let layer = layer(MockReplica::new(), None);
        let err = layer.create_thread("hello", None).await.unwrap_err();
        assert!(matches!(err, LetterboxError::NoIdentity));
    }

    #[tokio::test]
    async fn test_create_thread_writes_root_then_marker() {
        let me = keypair("cinn");
        let id = ThreadId::new(START, me.address.clone());
        let paths = domains::LetterboxPaths::new("letterbox");
        let root_path = paths.thread_root(&id);
        let marker_path = paths.read_marker(&id, &me.address);

        let mut replica = MockReplica::new();
        let mut seq = mockall::Sequence::new();
        replica
            .expect_set()
            .withf(move |_, input| input.path == root_path && input.content == "# Hi\n\nthere")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, input| Ok(stored(id, input)));
        replica
            .expect_set()
            .withf(move |_, input| input.path == marker_path && input.content == START.to_string())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, input| Ok(stored(id, input)));

        let layer = layer(replica, Some(me));
        let thread = layer.create_thread("# Hi\n\nthere", None).await.unwrap();
        assert!(thread.replies.is_empty());
        assert_eq!(thread.root.timestamp_micros(), START);
        assert_eq!(layer.get_thread_title(&thread).as_deref(), Some("Hi"));
        assert_eq!(layer.thread_id(&thread).unwrap(), id);
    }

    #[tokio::test]
    async fn test_create_thread_surfaces_write_failure() {
        let mut replica = MockReplica::new();
        replica
            .expect_set()
            .times(1)
            .returning(|_, _| Err(WriteFailure::new("read-only replica")));

        let layer = layer(replica, Some(keypair("cinn")));
        let err = layer.create_thread("hello", None).await.unwrap_err();
        assert!(matches!(err, LetterboxError::WriteFailure(_)));
    }

    #[tokio::test]
    async fn test_marker_failure_still_returns_thread() {
        let paths = domains::LetterboxPaths::new("letterbox");
        let me = keypair("cinn");
        let root_path = paths.thread_root(&ThreadId::new(START, me.address.clone()));

        let mut replica = MockReplica::new();
        let mut seq = mockall::Sequence::new();
        replica
            .expect_set()
            .withf(move |_, input| input.path == root_path)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, input| Ok(stored(id, input)));
        replica
            .expect_set()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(WriteFailure::new("marker rejected")));

        let layer = layer(replica, Some(me));
        let thread = layer.create_thread("hello", None).await.unwrap();
        assert_eq!(thread.root.doc.content, "hello");
    }

    #[tokio::test]
    async fn test_get_thread_missing_root_is_none() {
        let mut replica = MockReplica::new();
        replica.expect_get_latest_doc_at_path().returning(|_| None);
        replica.expect_query_docs().never();

        let layer = layer(replica, None);
        let thread = layer
            .get_thread(&ThreadId::new(1, "@cinn.b"))
            .await
            .unwrap();
        assert!(thread.is_none());
    }

    #[tokio::test]
    async fn test_get_thread_sorts_replies_and_skips_malformed() {
        let paths = domains::LetterboxPaths::new("letterbox");
        let id = ThreadId::new(100, "@cinn.b");
        let root_path = paths.thread_root(&id);
        let root = doc(root_path.clone(), "root", "@cinn.b");
        let replier = AuthorAddress::from("@gwil.b");
        let late = doc(paths.reply(&id, 300, &replier), "late", "@gwil.b");
        let early = doc(paths.reply(&id, 200, &replier), "early", "@gwil.b");
        let junk = doc(format!("{}garbage", paths.reply_prefix(&id)), "junk", "@gwil.b");

        let mut replica = MockReplica::new();
        replica
            .expect_get_latest_doc_at_path()
            .withf(move |path| path == root_path)
            .returning(move |_| Some(root.clone()));
        replica
            .expect_query_docs()
            .withf(move |q| q.path_starts_with == "/letterbox/thread:100--@cinn.b/reply:")
            .returning(move |_| vec![late.clone(), junk.clone(), early.clone()]);

        let layer = layer(replica, None);
        let thread = layer.get_thread(&id).await.unwrap().unwrap();
        let contents: Vec<_> = thread.replies.iter().map(|p| p.doc.content.as_str()).collect();
        assert_eq!(contents, ["early", "late"]);
        assert_eq!(thread.last_item().doc.content, "late");
    }

    #[tokio::test]
    async fn test_get_threads_drops_vanished_roots() {
        let paths = domains::LetterboxPaths::new("letterbox");
        let kept = ThreadId::new(100, "@cinn.b");
        let gone = ThreadId::new(200, "@gwil.b");
        let kept_doc = doc(paths.thread_root(&kept), "kept", "@cinn.b");
        let gone_doc = doc(paths.thread_root(&gone), "gone", "@gwil.b");
        let kept_path = paths.thread_root(&kept);

        let mut replica = MockReplica::new();
        let listed = vec![kept_doc.clone(), gone_doc];
        replica
            .expect_query_docs()
            .withf(|q| q.path_starts_with == "/letterbox/rootthread:")
            .returning(move |_| listed.clone());
        replica
            .expect_get_latest_doc_at_path()
            .returning(move |path| (path == kept_path).then(|| kept_doc.clone()));
        replica
            .expect_query_docs()
            .returning(|_| Vec::new());

        let layer = layer(replica, None);
        let threads = layer.get_threads().await.unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].root.doc.content, "kept");
    }

    #[tokio::test]
    async fn test_edit_post_keeps_path() {
        let paths = domains::LetterboxPaths::new("letterbox");
        let id = ThreadId::new(100, "@cinn.btestkey");
        let path = paths.thread_root(&id);
        let expected = path.clone();

        let mut replica = MockReplica::new();
        replica
            .expect_set()
            .withf(move |_, input| input.path == expected && input.content == "edited")
            .times(1)
            .returning(|id, input| Ok(stored(id, input)));

        let layer = layer(replica, Some(keypair("cinn")));
        let post = layer.to_thread_root(doc(path.clone(), "original", "@cinn.btestkey")).unwrap();
        let edited = layer.edit_post(&post, "edited").await.unwrap();
        assert_eq!(edited.path, path);
        assert_eq!(layer.to_thread_root(edited).unwrap().first_posted, post.first_posted);
    }

    #[test]
    fn test_post_timestamps_from_paths() {
        let paths = domains::LetterboxPaths::new("letterbox");
        let id = ThreadId::new(100, "@cinn.b");
        let root = doc(paths.thread_root(&id), "", "@cinn.b");
        let reply = doc(paths.reply(&id, 250, &AuthorAddress::from("@gwil.b")), "", "@gwil.b");

        let layer = layer(MockReplica::new(), None);
        assert_eq!(layer.get_post_timestamp(&root).unwrap(), 100);
        assert_eq!(layer.get_post_timestamp(&reply).unwrap(), 250);
        assert!(matches!(
            layer.get_reply_timestamp(&root),
            Err(LetterboxError::MalformedPath { .. })
        ));
    }
}
