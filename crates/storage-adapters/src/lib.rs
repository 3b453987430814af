//! # storage-adapters
//!
//! Implementations of the [`domains::Replica`] port.

pub mod memory;

pub use memory::MemoryReplica;
