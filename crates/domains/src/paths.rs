//! # Path codec
//!
//! Every Letterbox entity is addressed by a templated path under the
//! application namespace. The path is the primary key; there is no other
//! index. Templates are kept as ordered literal/variable segments so that
//! [`PathTemplate::extract`] is the exact inverse of [`PathTemplate::render`]
//! for well-formed values.
//!
//! ```text
//! /letterbox/rootthread:{rootTimestamp}~{opPubKey}/root.md
//! /letterbox/thread:{rootTimestamp}--{opPubKey}/reply:{replyTimestamp}~{replierPubKey}.md
//! /letterbox/readthread:{rootTimestamp}--{opPubKey}/~{readerPubKey}/timestamp.txt
//! /letterbox/drafts/thread:{rootTimestamp}--{opPubKey}/~{authorPubKey}.md
//! /letterbox/drafts/~{authorPubKey}/{draftTimestamp}.md
//! ```

use crate::models::{AuthorAddress, ThreadId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A path pattern such as `/app/item:{id}/body.md`.
///
/// Variables must be separated by literals. Values must not contain `/` and
/// must not contain the literal that follows them; no escaping is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(len) = rest[open..].find('}') else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            segments.push(Segment::Variable(rest[open + 1..open + len].to_string()));
            rest = &rest[open + len + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Self {
            source: template.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Variable names in template order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Fills the variables positionally.
    pub fn render(&self, values: &[&str]) -> String {
        debug_assert_eq!(values.len(), self.variables().count(), "{}", self.source);
        self.render_prefix(values)
    }

    /// Renders up to the first variable without a value. Used to build the
    /// `pathStartsWith` argument of prefix scans.
    pub fn render_prefix(&self, values: &[&str]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut values = values.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => out.push_str(literal),
                Segment::Variable(_) => match values.next() {
                    Some(value) => out.push_str(value),
                    None => break,
                },
            }
        }
        out
    }

    /// Recovers variable values positionally, or `None` if `path` does not
    /// follow the template.
    pub fn extract<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        let mut values = Vec::new();
        let mut rest = path;
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(literal) => rest = rest.strip_prefix(literal.as_str())?,
                Segment::Variable(_) => {
                    let end = match self.segments.get(index + 1) {
                        // A closing literal anchors at the end of the path.
                        Some(Segment::Literal(next)) if index + 2 == self.segments.len() => {
                            rest.strip_suffix(next.as_str())?.len()
                        }
                        Some(Segment::Literal(next)) => rest.find(next.as_str())?,
                        Some(Segment::Variable(_)) => return None,
                        None => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    values.push(value);
                    rest = &rest[end..];
                }
            }
        }
        rest.is_empty().then_some(values)
    }
}

/// Whether a post document opens a thread or replies to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKind {
    Root,
    Reply,
}

/// Everything a reply path encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyKey {
    pub thread: ThreadId,
    pub reply_timestamp: i64,
    pub replier: AuthorAddress,
}

/// The five Letterbox templates, bound to one namespace.
#[derive(Debug, Clone)]
pub struct LetterboxPaths {
    thread_root: PathTemplate,
    thread_reply: PathTemplate,
    read_marker: PathTemplate,
    reply_draft: PathTemplate,
    thread_draft: PathTemplate,
}

impl LetterboxPaths {
    pub fn new(namespace: &str) -> Self {
        Self {
            thread_root: PathTemplate::new(&format!(
                "/{namespace}/rootthread:{{rootTimestamp}}~{{opPubKey}}/root.md"
            )),
            thread_reply: PathTemplate::new(&format!(
                "/{namespace}/thread:{{rootTimestamp}}--{{opPubKey}}/reply:{{replyTimestamp}}~{{replierPubKey}}.md"
            )),
            read_marker: PathTemplate::new(&format!(
                "/{namespace}/readthread:{{rootTimestamp}}--{{opPubKey}}/~{{readerPubKey}}/timestamp.txt"
            )),
            reply_draft: PathTemplate::new(&format!(
                "/{namespace}/drafts/thread:{{rootTimestamp}}--{{opPubKey}}/~{{authorPubKey}}.md"
            )),
            thread_draft: PathTemplate::new(&format!(
                "/{namespace}/drafts/~{{authorPubKey}}/{{draftTimestamp}}.md"
            )),
        }
    }

    pub fn thread_root_template(&self) -> &PathTemplate {
        &self.thread_root
    }

    pub fn thread_reply_template(&self) -> &PathTemplate {
        &self.thread_reply
    }

    pub fn thread_draft_template(&self) -> &PathTemplate {
        &self.thread_draft
    }

    pub fn thread_root(&self, id: &ThreadId) -> String {
        let ts = id.root_timestamp.to_string();
        self.thread_root.render(&[&ts, id.op.as_str()])
    }

    /// Prefix shared by every thread root.
    pub fn thread_root_prefix(&self) -> String {
        self.thread_root.render_prefix(&[])
    }

    pub fn reply(&self, id: &ThreadId, reply_timestamp: i64, replier: &AuthorAddress) -> String {
        let ts = id.root_timestamp.to_string();
        let reply_ts = reply_timestamp.to_string();
        self.thread_reply
            .render(&[&ts, id.op.as_str(), &reply_ts, replier.as_str()])
    }

    /// Prefix shared by every reply in one thread.
    pub fn reply_prefix(&self, id: &ThreadId) -> String {
        let ts = id.root_timestamp.to_string();
        self.thread_reply.render_prefix(&[&ts, id.op.as_str()])
    }

    pub fn read_marker(&self, id: &ThreadId, reader: &AuthorAddress) -> String {
        let ts = id.root_timestamp.to_string();
        self.read_marker
            .render(&[&ts, id.op.as_str(), reader.as_str()])
    }

    pub fn reply_draft(&self, id: &ThreadId, author: &AuthorAddress) -> String {
        let ts = id.root_timestamp.to_string();
        self.reply_draft
            .render(&[&ts, id.op.as_str(), author.as_str()])
    }

    pub fn thread_draft(&self, author: &AuthorAddress, draft_id: &str) -> String {
        self.thread_draft.render(&[author.as_str(), draft_id])
    }

    /// Prefix shared by every thread-root draft of one author.
    pub fn thread_draft_prefix(&self, author: &AuthorAddress) -> String {
        self.thread_draft.render_prefix(&[author.as_str()])
    }

    /// A post path is a root iff it starts with the root prefix.
    pub fn classify(&self, path: &str) -> PostKind {
        if path.starts_with(&self.thread_root_prefix()) {
            PostKind::Root
        } else {
            PostKind::Reply
        }
    }

    pub fn parse_thread_root(&self, path: &str) -> Option<ThreadId> {
        let values = self.thread_root.extract(path)?;
        let [ts, op] = values[..] else {
            return None;
        };
        Some(ThreadId::new(parse_timestamp(ts)?, op))
    }

    pub fn parse_reply(&self, path: &str) -> Option<ReplyKey> {
        let values = self.thread_reply.extract(path)?;
        let [ts, op, reply_ts, replier] = values[..] else {
            return None;
        };
        Some(ReplyKey {
            thread: ThreadId::new(parse_timestamp(ts)?, op),
            reply_timestamp: parse_timestamp(reply_ts)?,
            replier: AuthorAddress::from(replier),
        })
    }

    /// Returns the author and draft id of a thread-root draft path.
    pub fn parse_thread_draft(&self, path: &str) -> Option<(AuthorAddress, String)> {
        let values = self.thread_draft.extract(path)?;
        let [author, draft_id] = values[..] else {
            return None;
        };
        Some((AuthorAddress::from(author), draft_id.to_string()))
    }

    /// The thread a post belongs to and the post's own path timestamp.
    pub fn parse_post(&self, path: &str) -> Option<(ThreadId, i64)> {
        match self.classify(path) {
            PostKind::Root => self.parse_thread_root(path).map(|id| {
                let ts = id.root_timestamp;
                (id, ts)
            }),
            PostKind::Reply => self
                .parse_reply(path)
                .map(|key| (key.thread, key.reply_timestamp)),
        }
    }
}

/// Digits only, so that parsing and rendering agree.
fn parse_timestamp(value: &str) -> Option<i64> {
    if value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().ok()
    } else {
        None
    }
}
