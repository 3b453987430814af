//! # services
//!
//! The Letterbox layer: a stateless facade that turns forum operations
//! (threads, replies, read markers, drafts) into path-keyed operations on an
//! injected [`domains::Replica`].
//!
//! The layer keeps no state of its own. Each call issues one or a few store
//! calls in sequence and computes its result from what they return.

pub mod drafts;
pub mod letterbox;
pub mod read_state;
pub mod threads;

pub use letterbox::Letterbox;
