//! # Domain Models
//!
//! These structs represent the entities the Letterbox layer reads from and
//! writes to the document store. Timestamps are microseconds since the Unix
//! epoch, the resolution the store uses.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public key identifier of a forum participant (e.g. `@cinn.bxyz...`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorAddress(String);

impl AuthorAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuthorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AuthorAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl From<String> for AuthorAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl AsRef<str> for AuthorAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Signing credential handed to the store on every write.
#[derive(Debug, Clone)]
pub struct AuthorKeypair {
    pub address: AuthorAddress,
    /// Never logged; only the store reads it.
    pub secret: SecretString,
}

impl AuthorKeypair {
    pub fn new(address: impl Into<AuthorAddress>, secret: impl Into<SecretString>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }
}

/// The unit the store persists. Owned by the store; this layer only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub path: String,
    pub content: String,
    pub format: String,
    pub author: AuthorAddress,
    /// Store-level write time; changes on every overwrite.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_after: Option<i64>,
}

/// Input to a store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocInput {
    pub path: String,
    pub content: String,
    pub format: String,
    pub delete_after: Option<i64>,
}

/// Prefix scan over the store's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocQuery {
    pub path_starts_with: String,
    /// Only documents whose content is strictly longer than this
    pub content_length_gt: Option<usize>,
}

impl DocQuery {
    pub fn prefix(path_starts_with: impl Into<String>) -> Self {
        Self {
            path_starts_with: path_starts_with.into(),
            content_length_gt: None,
        }
    }

    pub fn with_content_length_gt(mut self, length: usize) -> Self {
        self.content_length_gt = Some(length);
        self
    }
}

/// Stable identifier of a thread: root creation time plus the opening author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadId {
    pub root_timestamp: i64,
    pub op: AuthorAddress,
}

impl ThreadId {
    pub fn new(root_timestamp: i64, op: impl Into<AuthorAddress>) -> Self {
        Self {
            root_timestamp,
            op: op.into(),
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}--{}", self.root_timestamp, self.op)
    }
}

/// A root or reply document together with the time it was first posted.
///
/// `first_posted` comes from the timestamp embedded in the path, so it is
/// unaffected by edits that move the document's store-level timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub doc: Document,
    pub first_posted: DateTime<Utc>,
}

impl Post {
    /// Returns `None` when the timestamp is outside chrono's range.
    pub fn from_path_timestamp(doc: Document, micros: i64) -> Option<Self> {
        let first_posted = DateTime::from_timestamp_micros(micros)?;
        Some(Self { doc, first_posted })
    }

    pub fn timestamp_micros(&self) -> i64 {
        self.first_posted.timestamp_micros()
    }
}

/// An opening post and its replies, ordered by ascending `first_posted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    pub root: Post,
    pub replies: Vec<Post>,
}

impl Thread {
    /// The last reply, or the root when there are none.
    pub fn last_item(&self) -> &Post {
        self.replies.last().unwrap_or(&self.root)
    }

    /// When the thread last saw a new post.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_item().first_posted
    }

    /// Root first, then replies in order.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        std::iter::once(&self.root).chain(self.replies.iter())
    }
}

/// A Markdown document split into its `# ` heading and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftParts {
    pub title: String,
    pub content: String,
}

impl DraftParts {
    /// Splits `content` when its first line is a `# ` heading.
    ///
    /// One blank line between heading and body is dropped; anything else
    /// after the heading is kept as body.
    pub fn parse(content: &str) -> Option<Self> {
        let (first_line, rest) = match content.split_once('\n') {
            Some((first, rest)) => (first, Some(rest)),
            None => (content, None),
        };
        let title = first_line.strip_prefix("# ")?;
        let body = match rest {
            Some(rest) => match rest.split_once('\n') {
                Some((separator, body)) if separator.trim().is_empty() => body,
                None if rest.trim().is_empty() => "",
                _ => rest,
            },
            None => "",
        };
        Some(Self {
            title: title.to_string(),
            content: body.to_string(),
        })
    }
}
