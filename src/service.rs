//! High-level weather model workflows.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::BackendLoader;
use crate::core::{
    CircuitStatus, CompiledProgram, KeyPair, ProofArtifact, ProverConfig, VerifierCalldata,
};
use crate::engine::{CircuitManager, ErrorStats, InitializeOutcome, ProvingEngine};
use crate::metrics::PerformanceMetrics;
use crate::weather::{FEATURE_COUNT, INPUT_WIDTH, RADAR_FEATURES, WeatherModelInputs};
use crate::{ProverError, ProverResult};

/// Static description of the weather model circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    pub feature_count: usize,
    pub input_width: usize,
    pub output_size: usize,
    pub value_min: f64,
    pub value_max: f64,
    pub features: Vec<String>,
}

/// Facade over the circuit manager and proving engine for the weather model.
#[derive(Clone)]
pub struct WeatherModelService {
    config: ProverConfig,
    engine: ProvingEngine,
    circuits: CircuitManager,
}

impl WeatherModelService {
    pub fn new(config: ProverConfig, engine: ProvingEngine) -> Self {
        let circuits = CircuitManager::from_config(engine.clone(), &config);
        WeatherModelService {
            config,
            engine,
            circuits,
        }
    }

    pub fn from_config(config: ProverConfig, loader: Arc<dyn BackendLoader>) -> Self {
        let engine = ProvingEngine::new(loader, &config);
        Self::new(config, engine)
    }

    pub fn config(&self) -> &ProverConfig {
        &self.config
    }

    pub fn engine(&self) -> &ProvingEngine {
        &self.engine
    }

    pub fn circuits(&self) -> &CircuitManager {
        &self.circuits
    }

    fn circuit_name(&self) -> &str {
        &self.config.weather.circuit_name
    }

    /// Compile and set up the weather circuit if it is not ready yet.
    pub async fn initialize(&self) -> InitializeOutcome {
        self.circuits.initialize(self.circuit_name()).await
    }

    pub async fn status(&self) -> CircuitStatus {
        self.circuits.status(self.circuit_name()).await
    }

    async fn load_proving_material(&self) -> ProverResult<(CompiledProgram, Vec<u8>)> {
        self.initialize().await.into_result()?;
        let name = self.circuit_name();
        let program = self.circuits.load_program(name).await?;
        let proving_key = self.circuits.load_proving_key(name).await?;
        Ok((program, proving_key))
    }

    /// Prove one feature map, initializing the circuit first if needed.
    pub async fn generate_proof(&self, inputs: &WeatherModelInputs) -> ProverResult<ProofArtifact> {
        let (program, proving_key) = self.load_proving_material().await?;
        self.engine
            .generate_weather_proof(inputs, &program.bytes, &proving_key)
            .await
    }

    /// Prove each feature map in order, with one result per input.
    ///
    /// The circuit is initialized and its artifacts loaded once; a failure of
    /// one input does not stop the rest.
    pub async fn generate_proofs(
        &self,
        batch: &[WeatherModelInputs],
    ) -> ProverResult<Vec<ProverResult<ProofArtifact>>> {
        let (program, proving_key) = self.load_proving_material().await?;
        let mut results = Vec::with_capacity(batch.len());
        for (i, inputs) in batch.iter().enumerate() {
            tracing::info!(index = i, total = batch.len(), "proving batch item");
            let result = self
                .engine
                .generate_weather_proof(inputs, &program.bytes, &proving_key)
                .await;
            if let Err(e) = &result {
                tracing::warn!(index = i, "batch item failed: {e}");
            }
            results.push(result);
        }
        Ok(results)
    }

    /// Structural check only; see [`ProvingEngine::verify_weather_proof_structure`].
    pub fn verify_proof_structure(&self, artifact: &ProofArtifact) -> bool {
        self.engine.verify_weather_proof_structure(artifact)
    }

    /// Calldata for an on-chain verifier, after format validation.
    pub fn verifier_calldata(&self, artifact: &ProofArtifact) -> ProverResult<VerifierCalldata> {
        let calldata = VerifierCalldata::from_artifact(artifact)?;
        let problems = calldata.validate();
        if !problems.is_empty() {
            return Err(ProverError::Message(format!(
                "invalid verifier calldata: {}",
                problems.join(", ")
            )));
        }
        Ok(calldata)
    }

    /// Export the verifier for the persisted verification key.
    pub async fn export_verifier(&self) -> ProverResult<String> {
        let vk = self
            .circuits
            .load_verification_key(self.circuit_name())
            .await?;
        self.engine.export_verifier(&vk).await
    }

    /// Compile and set up ad-hoc circuit source without persisting anything.
    pub async fn setup_circuit(&self, source: &str) -> ProverResult<(CompiledProgram, KeyPair)> {
        let compiled = self.engine.compile(source).await?;
        let program = match compiled.program {
            Some(p) if compiled.success => p,
            _ => return Err(ProverError::Compilation(compiled.error.unwrap_or_default())),
        };
        let setup = self.engine.setup_keys(&program.bytes).await?;
        match setup.keys {
            Some(keys) if setup.success => Ok((program, keys)),
            _ => Err(ProverError::Setup(setup.error.unwrap_or_default())),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            name: self.config.weather.circuit_name.clone(),
            feature_count: FEATURE_COUNT,
            input_width: INPUT_WIDTH,
            output_size: 1,
            value_min: self.config.weather.value_min,
            value_max: self.config.weather.value_max,
            features: RADAR_FEATURES.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.engine.metrics()
    }

    pub fn reset_metrics(&self) {
        self.engine.reset_metrics();
    }

    pub fn error_stats(&self) -> ErrorStats {
        self.engine.error_log().stats()
    }

    pub fn clear_errors(&self) {
        self.engine.error_log().clear();
    }

    /// Performance report followed by the error report.
    pub fn report(&self) -> String {
        format!(
            "{}\n{}",
            self.engine.monitor().report(),
            self.engine.error_log().report()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, MockLoader};

    fn service() -> WeatherModelService {
        let loader = Arc::new(MockLoader::new(Arc::new(MockBackend::default_mock())));
        WeatherModelService::from_config(ProverConfig::default(), loader)
    }

    #[test]
    fn test_model_info() {
        let info = service().model_info();
        assert_eq!(info.name, "weather-model");
        assert_eq!(info.feature_count, 113);
        assert_eq!(info.input_width, 116);
        assert_eq!(info.features.len(), info.feature_count);
    }

    #[tokio::test]
    async fn test_setup_circuit_without_persistence() {
        let svc = service();
        let (program, keys) = svc
            .setup_circuit("def main(private field a) -> field { return a; }")
            .await
            .unwrap();
        assert!(!program.bytes.is_empty());
        assert!(!keys.verification_key.is_empty());
        assert_eq!(svc.metrics().compilations.count, 1);
    }

    #[test]
    fn test_report_has_both_sections() {
        let report = service().report();
        assert!(report.contains("Performance Report"));
        assert!(report.contains("Error Report"));
    }
}
