//! Persistence for compiled programs and key pairs.

pub mod artifacts;

// Re-export key types
pub use artifacts::ArtifactStore;
