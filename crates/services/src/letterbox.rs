//! The `Letterbox` handle shared by the thread, read-state and draft modules.

use std::sync::Arc;

use domains::{
    AuthorKeypair, Clock, DocInput, Document, LayerConfig, LetterboxError, LetterboxPaths,
    Replica, Result, SystemClock,
};
use tracing::{debug, error};

/// Forum operations over a path-addressed document store.
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct Letterbox {
    pub(crate) replica: Arc<dyn Replica>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) identity: Option<AuthorKeypair>,
    pub(crate) paths: LetterboxPaths,
    pub(crate) config: LayerConfig,
}

impl Letterbox {
    /// A layer with default namespace and format, reading the system clock.
    pub fn new(replica: Arc<dyn Replica>, identity: Option<AuthorKeypair>) -> Self {
        Self::with_config(replica, identity, LayerConfig::default())
    }

    pub fn with_config(
        replica: Arc<dyn Replica>,
        identity: Option<AuthorKeypair>,
        config: LayerConfig,
    ) -> Self {
        Self {
            replica,
            clock: Arc::new(SystemClock),
            identity,
            paths: LetterboxPaths::new(&config.namespace),
            config,
        }
    }

    /// Replaces the time source used for new post and draft timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn identity(&self) -> Option<&AuthorKeypair> {
        self.identity.as_ref()
    }

    pub fn paths(&self) -> &LetterboxPaths {
        &self.paths
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub(crate) fn require_identity(&self) -> Result<&AuthorKeypair> {
        self.identity.as_ref().ok_or(LetterboxError::NoIdentity)
    }

    /// Writes one document. A store failure is logged here and returned.
    pub(crate) async fn write(
        &self,
        identity: &AuthorKeypair,
        path: String,
        content: String,
        delete_after: Option<i64>,
        action: &'static str,
    ) -> Result<Document> {
        let input = DocInput {
            path,
            content,
            format: self.config.doc_format.clone(),
            delete_after,
        };
        match self.replica.set(identity, input.clone()).await {
            Ok(doc) => {
                debug!(path = %doc.path, author = %doc.author, action, "document written");
                Ok(doc)
            }
            Err(err) => {
                error!(path = %input.path, author = %identity.address, action, error = %err, "write unexpectedly failed");
                Err(err.into())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use domains::{MockReplica, WriteFailure};

    #[tokio::test]
    async fn test_write_forwards_format_and_delete_after() {
        let mut replica = MockReplica::new();
        replica
            .expect_set()
            .withf(|_, input| input.format == "es.4" && input.delete_after == Some(99))
            .times(1)
            .returning(|id, input| Ok(stored(id, input)));

        let me = keypair("cinn");
        let layer = layer(replica, Some(me.clone()));
        let doc = layer
            .write(&me, "/letterbox/x".into(), "hi".into(), Some(99), "test")
            .await
            .unwrap();
        assert_eq!(doc.delete_after, Some(99));
        assert_eq!(doc.author, me.address);
    }

    #[tokio::test]
    async fn test_write_failure_is_surfaced() {
        let mut replica = MockReplica::new();
        replica
            .expect_set()
            .returning(|_, _| Err(WriteFailure::new("disk full")));

        let me = keypair("cinn");
        let layer = layer(replica, Some(me.clone()));
        let err = layer
            .write(&me, "/letterbox/x".into(), "hi".into(), None, "test")
            .await
            .unwrap_err();
        assert!(matches!(err, LetterboxError::WriteFailure(f) if f.reason == "disk full"));
    }

    #[test]
    fn test_require_identity() {
        let layer = layer(MockReplica::new(), None);
        assert!(matches!(
            layer.require_identity(),
            Err(LetterboxError::NoIdentity)
        ));
        assert!(layer.identity().is_none());
    }
}
