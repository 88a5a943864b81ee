//! Engine module: drives the proving backend through the circuit lifecycle.
//!
//! # Architecture
//!
//! - **ProvingEngine** (`adapter`): owns the lazily created backend handle and
//!   wraps compile, setup, prove and verifier export with retries and timing.
//! - **CircuitManager** (`circuit`): persists programs and keys per circuit name
//!   and converges a circuit to the ready state.
//! - **RetryExecutor** (`retry`) and the error log (`errors`): resilience and
//!   failure classification shared by every operation.
//!
//! # Boundaries
//!
//! - The engine never touches the filesystem; artifact I/O belongs to the manager.
//! - The manager never calls the backend directly; it goes through the engine.

pub mod adapter;
pub mod circuit;
pub mod errors;
pub mod retry;

// Re-export key types for convenience
pub use adapter::{CompilationResult, EngineSettings, ProofResult, ProvingEngine, SetupResult};
pub use circuit::{CircuitManager, InitializeOutcome};
pub use errors::{
    ErrorLog, ErrorRecord, ErrorStats, handle_environment_error, handle_memory_error,
    is_retryable, user_friendly_message,
};
pub use retry::{RetryExecutor, RetryPolicy};
