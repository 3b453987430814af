//! Layer-level knobs. Loading them from files and the environment is the
//! job of the `configs` crate.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "letterbox";
pub const DEFAULT_DOC_FORMAT: &str = "es.4";
pub const DEFAULT_DRAFT_PROBE_LIMIT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Application namespace every path lives under
    pub namespace: String,
    /// Format string forwarded to the store on writes
    pub doc_format: String,
    /// How many consecutive draft ids to try before giving up
    pub draft_probe_limit: u32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            doc_format: DEFAULT_DOC_FORMAT.to_string(),
            draft_probe_limit: DEFAULT_DRAFT_PROBE_LIMIT,
        }
    }
}
