//! Mock backend for testing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::core::{CompiledProgram, Groth16Proof, KeyPair};
use crate::{ProverError, ProverResult, sha256_hex};

use super::traits::{BackendLoader, ProofOutput, ProvingBackend};

/// Configuration for mock backend responses.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Name to report
    pub name: String,
    /// Version to report
    pub version: Option<String>,
    /// Number of leading compile calls that fail
    pub compile_failures: u32,
    /// Number of leading setup calls that fail
    pub setup_failures: u32,
    /// Number of leading prove calls that fail
    pub prove_failures: u32,
    /// Whether export_verifier should fail
    pub export_fails: bool,
    /// Message carried by injected failures
    pub failure_message: String,
    /// Latency added to every prove call
    pub prove_delay: Duration,
    /// Fixed public output instead of the computed sum
    pub public_output: Option<String>,
}

impl MockConfig {
    /// Create a new mock config with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        MockConfig {
            name: name.into(),
            version: Some("mock-1.0.0".to_string()),
            compile_failures: 0,
            setup_failures: 0,
            prove_failures: 0,
            export_fails: false,
            failure_message: "mock backend failure".to_string(),
            prove_delay: Duration::ZERO,
            public_output: None,
        }
    }

    /// Fail the first `n` compile calls.
    pub fn compile_fails(mut self, n: u32) -> Self {
        self.compile_failures = n;
        self
    }

    /// Fail the first `n` setup calls.
    pub fn setup_fails(mut self, n: u32) -> Self {
        self.setup_failures = n;
        self
    }

    /// Fail the first `n` prove calls.
    pub fn prove_fails(mut self, n: u32) -> Self {
        self.prove_failures = n;
        self
    }

    /// Make export_verifier fail.
    pub fn export_fails(mut self) -> Self {
        self.export_fails = true;
        self
    }

    pub fn with_failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub fn with_prove_delay(mut self, delay: Duration) -> Self {
        self.prove_delay = delay;
        self
    }

    pub fn with_public_output(mut self, output: impl Into<String>) -> Self {
        self.public_output = Some(output.into());
        self
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        Self::new("mock")
    }
}

/// Mock backend for unit testing.
///
/// Returns deterministic fake artifacts without doing any cryptography. The
/// proof's single public output is the sum of the numeric inputs (negative
/// sums clamp to zero), hex-encoded as a 32-byte word the way ZoKrates
/// renders field elements.
pub struct MockBackend {
    config: MockConfig,
    compile_calls: AtomicU32,
    setup_calls: AtomicU32,
    prove_calls: AtomicU32,
    export_calls: AtomicU32,
}

impl MockBackend {
    /// Create a new mock backend with the given configuration.
    pub fn new(config: MockConfig) -> Self {
        MockBackend {
            config,
            compile_calls: AtomicU32::new(0),
            setup_calls: AtomicU32::new(0),
            prove_calls: AtomicU32::new(0),
            export_calls: AtomicU32::new(0),
        }
    }

    /// Create a mock backend with default configuration.
    pub fn default_mock() -> Self {
        Self::new(MockConfig::default())
    }

    pub fn compile_calls(&self) -> u32 {
        self.compile_calls.load(Ordering::SeqCst)
    }

    pub fn setup_calls(&self) -> u32 {
        self.setup_calls.load(Ordering::SeqCst)
    }

    pub fn prove_calls(&self) -> u32 {
        self.prove_calls.load(Ordering::SeqCst)
    }

    pub fn export_calls(&self) -> u32 {
        self.export_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, counter: &AtomicU32, failures: u32) -> ProverResult<()> {
        let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= failures {
            return Err(ProverError::Message(self.config.failure_message.clone()));
        }
        Ok(())
    }
}

fn fake_point(seed: &str, index: usize) -> String {
    format!("0x{}", sha256_hex(format!("{seed}:{index}").as_bytes()))
}

fn parse_mock_input(input: &str) -> ProverResult<i128> {
    input
        .parse::<i128>()
        .or_else(|_| input.parse::<f64>().map(|v| v.trunc() as i128))
        .map_err(|_| {
            ProverError::Message(format!("invalid witness: cannot parse input '{input}'"))
        })
}

fn field_word(value: u128) -> String {
    format!("0x{value:064x}")
}

#[async_trait]
impl ProvingBackend for MockBackend {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn version(&self) -> Option<String> {
        self.config.version.clone()
    }

    async fn compile(&self, source: &str) -> ProverResult<CompiledProgram> {
        self.injected_failure(&self.compile_calls, self.config.compile_failures)?;
        if source.trim().is_empty() {
            return Err(ProverError::Message("syntax error: empty circuit source".into()));
        }
        let abi = serde_json::json!({
            "backend": self.config.name,
            "source_sha256": sha256_hex(source.as_bytes()),
        });
        let mut bytes = b"MOCKPROG".to_vec();
        bytes.extend_from_slice(source.as_bytes());
        Ok(CompiledProgram::new(bytes, abi))
    }

    async fn setup(&self, program: &[u8]) -> ProverResult<KeyPair> {
        self.injected_failure(&self.setup_calls, self.config.setup_failures)?;
        if program.is_empty() {
            return Err(ProverError::Message("cannot set up an empty program".into()));
        }
        let digest = sha256_hex(program);
        Ok(KeyPair {
            proving_key: format!("pk:{digest}").into_bytes(),
            verification_key: format!("vk:{digest}").into_bytes(),
        })
    }

    async fn generate_proof(
        &self,
        program: &[u8],
        proving_key: &[u8],
        inputs: &[String],
    ) -> ProverResult<ProofOutput> {
        self.injected_failure(&self.prove_calls, self.config.prove_failures)?;
        if !self.config.prove_delay.is_zero() {
            tokio::time::sleep(self.config.prove_delay).await;
        }
        if program.is_empty() || proving_key.is_empty() {
            return Err(ProverError::Message("missing program or proving key".into()));
        }

        let mut sum: i128 = 0;
        let mut public = Vec::with_capacity(inputs.len() + 1);
        for input in inputs {
            let v = parse_mock_input(input)?;
            sum = sum.saturating_add(v);
            public.push(field_word(v.max(0) as u128));
        }
        let output = match &self.config.public_output {
            Some(o) => o.clone(),
            None => field_word(sum.max(0) as u128),
        };
        public.push(output);

        let seed = sha256_hex(inputs.join(",").as_bytes());
        let proof = Groth16Proof {
            a: [fake_point(&seed, 0), fake_point(&seed, 1)],
            b: [
                [fake_point(&seed, 2), fake_point(&seed, 3)],
                [fake_point(&seed, 4), fake_point(&seed, 5)],
            ],
            c: [fake_point(&seed, 6), fake_point(&seed, 7)],
        };
        Ok(ProofOutput {
            proof,
            inputs: public,
        })
    }

    async fn export_verifier(&self, verification_key: &[u8]) -> ProverResult<String> {
        self.export_calls.fetch_add(1, Ordering::SeqCst);
        if self.config.export_fails {
            return Err(ProverError::Message(self.config.failure_message.clone()));
        }
        Ok(format!(
            "// SPDX-License-Identifier: LGPL-3.0-only\npragma solidity ^0.8.0;\n\n// vk sha256: {}\ncontract Verifier {{}}\n",
            sha256_hex(verification_key)
        ))
    }
}

/// Loader handing out one shared `MockBackend`.
pub struct MockLoader {
    backend: Arc<MockBackend>,
    load_calls: AtomicU32,
    init_failures: u32,
    init_delay: Duration,
}

impl MockLoader {
    pub fn new(backend: Arc<MockBackend>) -> Self {
        MockLoader {
            backend,
            load_calls: AtomicU32::new(0),
            init_failures: 0,
            init_delay: Duration::ZERO,
        }
    }

    /// Fail the first `n` load attempts.
    pub fn with_init_failures(mut self, n: u32) -> Self {
        self.init_failures = n;
        self
    }

    /// Delay every load, to widen the window for concurrent callers.
    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> Arc<MockBackend> {
        Arc::clone(&self.backend)
    }
}

#[async_trait]
impl BackendLoader for MockLoader {
    async fn load(&self) -> ProverResult<Arc<dyn ProvingBackend>> {
        let call = self.load_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if call <= self.init_failures {
            return Err(ProverError::Message("mock initialization failed".into()));
        }
        let backend: Arc<dyn ProvingBackend> = self.backend.clone();
        Ok(backend)
    }
}
