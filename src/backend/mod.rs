//! Proving backend abstraction.
//!
//! A `ProvingBackend` compiles circuits, sets up keys, proves and exports
//! verifiers. A `BackendLoader` creates one lazily; the engine adapter owns
//! the resulting handle.

pub mod mock;
pub mod traits;
pub mod zokrates;

// Re-export key types
pub use mock::{MockBackend, MockConfig, MockLoader};
pub use traits::{BackendLoader, ProofOutput, ProvingBackend};
pub use zokrates::{ZokratesBackend, ZokratesConfig, ZokratesLoader};
