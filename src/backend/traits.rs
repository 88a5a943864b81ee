//! Proving backend trait and output types.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProverResult;
use crate::core::{CompiledProgram, Groth16Proof, KeyPair};

/// Output from a prove operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOutput {
    pub proof: Groth16Proof,
    /// Public inputs followed by the circuit's public outputs
    pub inputs: Vec<String>,
}

/// External proving capability.
///
/// Implementations are treated as correct; every method may fail and the
/// failure is the whole contract beyond the success payload. Callers never
/// issue concurrent requests against one backend.
#[async_trait]
pub trait ProvingBackend: Send + Sync {
    /// Returns the backend name (e.g., "zokrates", "mock").
    fn name(&self) -> &str;

    /// Returns the backend version, if available.
    fn version(&self) -> Option<String>;

    /// Compile circuit source into a program and its ABI.
    async fn compile(&self, source: &str) -> ProverResult<CompiledProgram>;

    /// Derive a proving/verification key pair from a compiled program.
    async fn setup(&self, program: &[u8]) -> ProverResult<KeyPair>;

    /// Compute the witness for `inputs` and prove it.
    async fn generate_proof(
        &self,
        program: &[u8],
        proving_key: &[u8],
        inputs: &[String],
    ) -> ProverResult<ProofOutput>;

    /// Render verifier contract source for a verification key.
    async fn export_verifier(&self, verification_key: &[u8]) -> ProverResult<String>;
}

/// Creates the process-wide backend handle on first use.
#[async_trait]
pub trait BackendLoader: Send + Sync {
    async fn load(&self) -> ProverResult<Arc<dyn ProvingBackend>>;
}
