//! # domains
//!
//! Data model, path codec and port definitions for the Letterbox forum layer.
//! Nothing in here performs I/O; the store and the clock are reached through
//! the traits in [`ports`].

pub mod config;
pub mod errors;
pub mod models;
pub mod paths;
pub mod ports;

// Re-exporting for easier access in other crates
pub use config::*;
pub use errors::*;
pub use models::*;
pub use paths::{LetterboxPaths, PathTemplate, PostKind, ReplyKey};
pub use ports::*;
