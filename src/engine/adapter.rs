//! Proving engine adapter.
//!
//! Wraps the external proving backend with lazy single-flight
//! initialization, retries, timing and the weather-specific proof path.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::backend::{BackendLoader, ProofOutput, ProvingBackend};
use crate::core::{
    CompiledProgram, Groth16Proof, KeyPair, OperationKind, ProofArtifact, ProofMetadata,
    ProverConfig,
};
use crate::metrics::{ErrorCategory, PerformanceMetrics, PerformanceMonitor};
use crate::weather::{self, FEATURE_COUNT, WeatherModelInputs};
use crate::{ProverError, ProverResult, unix_millis};

use super::errors::{ErrorLog, ErrorRecord, rewrite_known_failure, user_friendly_message};
use super::retry::{RetryExecutor, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    pub program: Option<CompiledProgram>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub compilation_time_ms: f64,
}

impl CompilationResult {
    pub fn failed(error: impl Into<String>, compilation_time_ms: f64) -> Self {
        CompilationResult {
            program: None,
            success: false,
            error: Some(error.into()),
            compilation_time_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupResult {
    pub keys: Option<KeyPair>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub setup_time_ms: f64,
}

impl SetupResult {
    pub fn failed(error: impl Into<String>, setup_time_ms: f64) -> Self {
        SetupResult {
            keys: None,
            success: false,
            error: Some(error.into()),
            setup_time_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofResult {
    pub proof: Option<Groth16Proof>,
    /// Public inputs and outputs as returned by the backend
    pub inputs: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub proof_generation_time_ms: f64,
}

impl ProofResult {
    pub fn failed(error: impl Into<String>, proof_generation_time_ms: f64) -> Self {
        ProofResult {
            proof: None,
            inputs: Vec::new(),
            success: false,
            error: Some(error.into()),
            proof_generation_time_ms,
        }
    }
}

/// Knobs the engine reads from [`ProverConfig`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub standard_retry: RetryPolicy,
    pub proof_retry: RetryPolicy,
    pub proof_timeout: Duration,
    pub value_min: f64,
    pub value_max: f64,
    pub sample_memory: bool,
}

impl EngineSettings {
    pub fn from_config(config: &ProverConfig) -> Self {
        EngineSettings {
            standard_retry: RetryPolicy::standard(&config.retry),
            proof_retry: RetryPolicy::heavy(&config.retry),
            proof_timeout: config.proof.timeout(),
            value_min: config.weather.value_min,
            value_max: config.weather.value_max,
            sample_memory: config.monitoring.enabled,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&ProverConfig::default())
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Run the backend's prover under `policy`, timing the successful attempt.
async fn prove_attempts(
    retry: &RetryExecutor,
    policy: &RetryPolicy,
    backend: Arc<dyn ProvingBackend>,
    program: &[u8],
    proving_key: &[u8],
    inputs: &[String],
) -> ProverResult<(ProofOutput, f64)> {
    retry
        .run(OperationKind::GenerateProof, policy, || {
            let backend = Arc::clone(&backend);
            async move {
                let attempt = Instant::now();
                let output = backend.generate_proof(program, proving_key, inputs).await?;
                Ok::<_, ProverError>((output, elapsed_ms(attempt)))
            }
        })
        .await
}

/// Shared handle to the proving backend. Clones share the backend, the
/// monitor and the error log.
#[derive(Clone)]
pub struct ProvingEngine {
    loader: Arc<dyn BackendLoader>,
    handle: Arc<OnceCell<Arc<dyn ProvingBackend>>>,
    monitor: Arc<PerformanceMonitor>,
    retry: RetryExecutor,
    settings: Arc<EngineSettings>,
}

impl ProvingEngine {
    pub fn new(loader: Arc<dyn BackendLoader>, config: &ProverConfig) -> Self {
        let log = Arc::new(ErrorLog::new());
        ProvingEngine {
            loader,
            handle: Arc::new(OnceCell::new()),
            monitor: Arc::new(PerformanceMonitor::new(config.monitoring.clone())),
            retry: RetryExecutor::new(log, config.retry.detailed_errors),
            settings: Arc::new(EngineSettings::from_config(config)),
        }
    }

    /// Replace the settings derived from the configuration.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.initialized()
    }

    /// Name and version of the backend, once initialized.
    pub fn backend_info(&self) -> Option<(String, Option<String>)> {
        self.handle
            .get()
            .map(|b| (b.name().to_string(), b.version()))
    }

    /// Initialize the backend if needed and return it.
    ///
    /// Concurrent callers share one in-flight initialization. A failure leaves
    /// the handle unset so the next call tries again.
    pub async fn backend(&self) -> ProverResult<Arc<dyn ProvingBackend>> {
        let backend = self
            .handle
            .get_or_try_init(|| async {
                tracing::info!("initializing proving backend");
                let backend = self.loader.load().await.map_err(|e| {
                    let e = match rewrite_known_failure(e) {
                        e @ (ProverError::Initialization(_)
                        | ProverError::EnvironmentUnsupported(_)
                        | ProverError::MemoryExhausted(_)) => e,
                        other => ProverError::Initialization(other.to_string()),
                    };
                    tracing::error!("proving backend initialization failed: {e}");
                    e
                })?;
                tracing::info!(
                    backend = backend.name(),
                    version = backend.version().as_deref().unwrap_or("unknown"),
                    "proving backend ready"
                );
                Ok::<_, ProverError>(backend)
            })
            .await?;
        Ok(Arc::clone(backend))
    }

    fn report_failure(&self, operation: OperationKind, category: ErrorCategory, e: &ProverError) {
        self.monitor.record_error(category);
        tracing::warn!(
            %operation,
            "{}",
            user_friendly_message(operation, &e.to_string().to_lowercase())
        );
    }

    /// Compile circuit source. Only backend initialization failure is an `Err`.
    pub async fn compile(&self, source: &str) -> ProverResult<CompilationResult> {
        let backend = self.backend().await?;
        let start = Instant::now();
        tracing::info!(source_bytes = source.len(), "compiling circuit");

        let outcome = self
            .retry
            .run(OperationKind::Compile, &self.settings.standard_retry, || {
                let backend = Arc::clone(&backend);
                async move {
                    let attempt = Instant::now();
                    let program = backend.compile(source).await?;
                    Ok::<_, ProverError>((program, elapsed_ms(attempt)))
                }
            })
            .await;

        match outcome {
            Ok((program, time_ms)) => {
                self.monitor.record_compilation(time_ms);
                if self.settings.sample_memory {
                    self.monitor.record_memory_usage();
                }
                tracing::info!(program_bytes = program.bytes.len(), "circuit compiled");
                Ok(CompilationResult {
                    program: Some(program),
                    success: true,
                    error: None,
                    compilation_time_ms: time_ms,
                })
            }
            Err(e) => {
                self.report_failure(OperationKind::Compile, ErrorCategory::Compilation, &e);
                Ok(CompilationResult::failed(e.to_string(), elapsed_ms(start)))
            }
        }
    }

    /// Derive a key pair from a compiled program.
    pub async fn setup_keys(&self, program: &[u8]) -> ProverResult<SetupResult> {
        let backend = self.backend().await?;
        let start = Instant::now();
        tracing::info!(program_bytes = program.len(), "setting up keys");

        let outcome = self
            .retry
            .run(OperationKind::Setup, &self.settings.standard_retry, || {
                let backend = Arc::clone(&backend);
                async move {
                    let attempt = Instant::now();
                    let keys = backend.setup(program).await?;
                    Ok::<_, ProverError>((keys, elapsed_ms(attempt)))
                }
            })
            .await;

        match outcome {
            Ok((keys, time_ms)) => {
                tracing::info!(setup_time_ms = time_ms, "key setup finished");
                Ok(SetupResult {
                    keys: Some(keys),
                    success: true,
                    error: None,
                    setup_time_ms: time_ms,
                })
            }
            Err(e) => {
                self.report_failure(OperationKind::Setup, ErrorCategory::Setup, &e);
                Ok(SetupResult::failed(e.to_string(), elapsed_ms(start)))
            }
        }
    }

    /// Prove `inputs` against a program and proving key.
    pub async fn generate_proof(
        &self,
        program: &[u8],
        proving_key: &[u8],
        inputs: &[String],
    ) -> ProverResult<ProofResult> {
        let backend = self.backend().await?;
        let start = Instant::now();
        tracing::info!(inputs = inputs.len(), "generating proof");

        let outcome = prove_attempts(
            &self.retry,
            &self.settings.proof_retry,
            backend,
            program,
            proving_key,
            inputs,
        )
        .await;
        Ok(self.finish_proof(outcome, start))
    }

    /// Record a finished proof outcome in the monitor and shape it as a result.
    fn finish_proof(&self, outcome: ProverResult<(ProofOutput, f64)>, start: Instant) -> ProofResult {
        match outcome {
            Ok((output, time_ms)) => {
                self.monitor.record_proof_generation(time_ms);
                if self.settings.sample_memory {
                    self.monitor.record_memory_usage();
                }
                ProofResult {
                    proof: Some(output.proof),
                    inputs: output.inputs,
                    success: true,
                    error: None,
                    proof_generation_time_ms: time_ms,
                }
            }
            Err(e) => {
                self.report_failure(OperationKind::GenerateProof, ErrorCategory::ProofGeneration, &e);
                ProofResult::failed(e.to_string(), elapsed_ms(start))
            }
        }
    }

    /// [`generate_proof`](Self::generate_proof) raced against `timeout`.
    ///
    /// The timeout is best effort: the proving task is detached rather than
    /// cancelled, so the backend may keep working after this returns. Its
    /// eventual result is discarded. The task writes its attempt failures
    /// to a private log that is merged only when it wins the race, so an
    /// abandoned proof leaves nothing in the monitor or the error log beyond
    /// the timeout itself.
    pub async fn generate_proof_with_timeout(
        &self,
        program: Vec<u8>,
        proving_key: Vec<u8>,
        inputs: Vec<String>,
        timeout: Duration,
    ) -> ProverResult<ProofResult> {
        let backend = self.backend().await?;
        let start = Instant::now();
        tracing::info!(inputs = inputs.len(), "generating proof");

        let staged = self.retry.staged();
        let policy = self.settings.proof_retry.clone();
        let task = tokio::spawn(async move {
            let outcome =
                prove_attempts(&staged, &policy, backend, &program, &proving_key, &inputs).await;
            (outcome, staged)
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok((outcome, staged))) => {
                self.retry.log().append(staged.log().drain());
                Ok(self.finish_proof(outcome, start))
            }
            Ok(Err(join_err)) => Err(ProverError::ProofGeneration(format!(
                "proving task failed: {join_err}"
            ))),
            Err(_) => {
                let e = ProverError::Timeout {
                    operation: OperationKind::GenerateProof,
                    timeout_ms: timeout.as_millis() as u64,
                };
                tracing::warn!("{e}; abandoning in-flight proof");
                self.report_failure(OperationKind::GenerateProof, ErrorCategory::ProofGeneration, &e);
                Ok(ProofResult::failed(e.to_string(), elapsed_ms(start)))
            }
        }
    }

    /// Render verifier source for a verification key. Not retried.
    pub async fn export_verifier(&self, verification_key: &[u8]) -> ProverResult<String> {
        let backend = self.backend().await?;
        tracing::info!("exporting verifier");
        match backend.export_verifier(verification_key).await {
            Ok(source) => Ok(source),
            Err(e) => {
                let e = rewrite_known_failure(e);
                self.retry.log().record(ErrorRecord::from_error(
                    &e,
                    OperationKind::ExportVerifier,
                    1,
                    self.retry.detailed(),
                ));
                Err(ProverError::VerifierExport(e.to_string()))
            }
        }
    }

    /// Validate, encode and prove one weather feature map.
    ///
    /// Range warnings are logged and do not stop the proof. The recorded
    /// generation time spans validation through decoding.
    pub async fn generate_weather_proof(
        &self,
        inputs: &WeatherModelInputs,
        program: &[u8],
        proving_key: &[u8],
    ) -> ProverResult<ProofArtifact> {
        let start = Instant::now();
        let settings = &self.settings;

        let report = weather::validate(&inputs.features, settings.value_min, settings.value_max);
        if !report.valid {
            tracing::error!(errors = report.errors.len(), "weather inputs rejected");
        }
        for warning in report.into_result()? {
            tracing::warn!("{warning}");
        }

        let encoded = weather::encode(&inputs.features);
        let result = self
            .generate_proof_with_timeout(
                program.to_vec(),
                proving_key.to_vec(),
                encoded,
                settings.proof_timeout,
            )
            .await?;

        let proof = match (result.success, result.proof) {
            (true, Some(proof)) => proof,
            _ => {
                let message = result.error.unwrap_or_else(|| "backend returned no proof".into());
                return Err(rewrite_known_failure(ProverError::ProofGeneration(message)));
            }
        };

        let prediction = weather::decode_prediction(&result.inputs);
        let metadata = ProofMetadata {
            timestamp: unix_millis(),
            feature_count: FEATURE_COUNT,
            prediction,
            proof_generation_time_ms: elapsed_ms(start),
        };
        tracing::info!(
            prediction,
            time_ms = metadata.proof_generation_time_ms,
            "weather proof generated"
        );
        Ok(ProofArtifact {
            proof,
            inputs: result.inputs,
            metadata,
        })
    }

    /// Structural check only: the proof is populated and carries public inputs.
    ///
    /// No cryptographic verification happens here; that is left to the
    /// on-chain verifier produced by [`export_verifier`](Self::export_verifier).
    pub fn verify_weather_proof_structure(&self, artifact: &ProofArtifact) -> bool {
        artifact.proof.is_populated() && !artifact.inputs.is_empty()
    }

    pub fn monitor(&self) -> &Arc<PerformanceMonitor> {
        &self.monitor
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.monitor.metrics()
    }

    pub fn reset_metrics(&self) {
        self.monitor.reset();
    }

    pub fn error_log(&self) -> &Arc<ErrorLog> {
        self.retry.log()
    }
}
