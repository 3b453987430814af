//! Shared fixtures for the integration tests: several participants, each
//! with their own `Letterbox`, over one `MemoryReplica` and one clock.

use std::sync::Arc;

use domains::{AuthorKeypair, Clock, LayerConfig, ManualClock, Replica};
use services::Letterbox;
use storage_adapters::MemoryReplica;

/// 2022-04-15T05:20:00Z in microseconds.
pub const EPOCH: i64 = 1_650_000_000_000_000;

pub fn identity(name: &str) -> AuthorKeypair {
    AuthorKeypair::new(format!("@{name}.b{name}publickey"), format!("{name}-secret"))
}

pub struct Forum {
    pub clock: Arc<ManualClock>,
    pub replica: Arc<MemoryReplica>,
}

impl Default for Forum {
    fn default() -> Self {
        Self::new()
    }
}

impl Forum {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(EPOCH));
        let replica = Arc::new(MemoryReplica::with_clock(clock.clone()));
        Self { clock, replica }
    }

    /// A layer acting as `name`.
    pub fn member(&self, name: &str) -> Letterbox {
        self.layer(Some(identity(name)))
    }

    /// A layer with no identity.
    pub fn visitor(&self) -> Letterbox {
        self.layer(None)
    }

    fn layer(&self, identity: Option<AuthorKeypair>) -> Letterbox {
        let replica: Arc<dyn Replica> = self.replica.clone();
        let clock: Arc<dyn Clock> = self.clock.clone();
        Letterbox::with_config(replica, identity, LayerConfig::default()).with_clock(clock)
    }

    /// Moves time forward by one millisecond.
    pub fn tick(&self) {
        self.clock.advance(1_000);
    }
}
