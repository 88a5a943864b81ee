//! Integration tests for the weather model service.
//!
//! These tests drive the full lifecycle against the mock backend with
//! artifacts in a temporary directory. No zokrates binary is required.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use weather_zk::ProverError;
use weather_zk::backend::{MockBackend, MockConfig, MockLoader};
use weather_zk::core::{CircuitStatus, OperationKind, ProverConfig};
use weather_zk::service::WeatherModelService;
use weather_zk::weather::{FEATURE_COUNT, INPUT_WIDTH, RADAR_FEATURES, WeatherModelInputs};

const SOURCE: &str = "def main(private field[116] features) -> field { return features[0]; }";

/// Config rooted in `root`, with millisecond retry delays.
fn test_config(root: &Path) -> ProverConfig {
    let mut config = ProverConfig::default();
    config.paths.circuit_dir = root.join("circuits");
    config.paths.compiled_dir = root.join("compiled");
    config.paths.keys_dir = root.join("keys");
    config.retry.delays_ms = vec![1, 1, 1];
    config.retry.proof_delays_ms = vec![1, 1, 1];
    config
}

fn write_source(config: &ProverConfig) {
    std::fs::create_dir_all(&config.paths.circuit_dir).unwrap();
    std::fs::write(
        config
            .paths
            .circuit_dir
            .join(format!("{}.zok", config.weather.circuit_name)),
        SOURCE,
    )
    .unwrap();
}

fn service_with(
    config: ProverConfig,
    mock: MockConfig,
) -> (WeatherModelService, Arc<MockBackend>, Arc<MockLoader>) {
    let backend = Arc::new(MockBackend::new(mock));
    let loader = Arc::new(MockLoader::new(Arc::clone(&backend)));
    let service = WeatherModelService::from_config(config, loader.clone());
    (service, backend, loader)
}

fn sample_inputs(value: f64) -> WeatherModelInputs {
    let features: HashMap<String, f64> = RADAR_FEATURES
        .iter()
        .map(|name| (name.to_string(), value))
        .collect();
    WeatherModelInputs::new(features)
}

#[tokio::test]
async fn test_generate_proof_from_scratch() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);
    let (service, backend, _) = service_with(config, MockConfig::default());

    assert_eq!(service.status().await, CircuitStatus::default());

    let artifact = service.generate_proof(&sample_inputs(2.0)).await.unwrap();

    // the mock echoes every input and appends their sum
    assert_eq!(artifact.inputs.len(), INPUT_WIDTH + 1);
    assert_eq!(artifact.metadata.prediction, 2 * FEATURE_COUNT as i64);
    assert_eq!(artifact.metadata.feature_count, FEATURE_COUNT);
    assert!(artifact.metadata.proof_generation_time_ms >= 0.0);
    assert!(service.verify_proof_structure(&artifact));

    let status = service.status().await;
    assert!(status.ready);
    assert_eq!(backend.compile_calls(), 1);
    assert_eq!(backend.setup_calls(), 1);
    assert_eq!(backend.prove_calls(), 1);

    let calldata = service.verifier_calldata(&artifact).unwrap();
    assert_eq!(calldata.inputs[1], artifact.inputs[INPUT_WIDTH]);
}

#[tokio::test]
async fn test_initialize_twice_does_not_recompile() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);
    let (service, backend, _) = service_with(config, MockConfig::default());

    let first = service.initialize().await;
    assert!(first.success);
    let second = service.initialize().await;
    assert!(second.success);
    assert!(second.status.ready);

    assert_eq!(backend.compile_calls(), 1);
    assert_eq!(backend.setup_calls(), 1);
}

#[tokio::test]
async fn test_partial_readiness_only_runs_setup() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);

    // First service compiles and persists, then the keys are removed.
    let (first, _, _) = service_with(config.clone(), MockConfig::default());
    assert!(first.initialize().await.success);
    let store = first.circuits().store().clone();
    std::fs::remove_file(store.proving_key_path("weather-model")).unwrap();
    std::fs::remove_file(store.verification_key_path("weather-model")).unwrap();

    let (service, backend, _) = service_with(config, MockConfig::default());
    assert_eq!(
        service.status().await,
        CircuitStatus {
            compiled: true,
            keys_setup: false,
            ready: false
        }
    );

    let outcome = service.initialize().await;
    assert!(outcome.success, "{:?}", outcome.error);
    assert!(outcome.status.ready);
    assert_eq!(backend.compile_calls(), 0);
    assert_eq!(backend.setup_calls(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_record_each_attempt() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);
    let (service, backend, _) = service_with(
        config,
        MockConfig::default()
            .compile_fails(u32::MAX)
            .with_failure_message("network unreachable"),
    );

    let outcome = service.initialize().await;
    assert!(!outcome.success);
    let error = outcome.error.unwrap();
    assert!(error.contains("compile"), "{error}");
    assert!(error.contains("3 attempts"), "{error}");
    assert!(error.contains("network unreachable"), "{error}");

    let stats = service.error_stats();
    assert_eq!(stats.by_operation[&OperationKind::Compile], 3);
    assert_eq!(stats.total, 3);
    assert_eq!(backend.compile_calls(), 3);
    assert_eq!(backend.setup_calls(), 0);
    assert_eq!(service.metrics().errors.compilation_errors, 1);
}

#[tokio::test]
async fn test_concurrent_first_use_initializes_once() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let backend = Arc::new(MockBackend::default_mock());
    let loader = Arc::new(
        MockLoader::new(Arc::clone(&backend)).with_init_delay(Duration::from_millis(50)),
    );
    let service = WeatherModelService::from_config(config, loader.clone());

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .setup_circuit(&format!("def main(private field a) -> field {{ return a + {i}; }}"))
                    .await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(loader.load_calls(), 1);
    assert_eq!(backend.compile_calls(), 4);
}

#[tokio::test]
async fn test_proof_timeout_is_reported_as_proof_failure() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.proof.timeout_ms = 30;
    write_source(&config);
    let (service, _, _) = service_with(
        config,
        MockConfig::default().with_prove_delay(Duration::from_millis(500)),
    );

    let err = service.generate_proof(&sample_inputs(1.0)).await.unwrap_err();
    match err {
        ProverError::ProofGeneration(msg) => assert!(msg.contains("timed out after 30ms"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_batch_continues_after_invalid_item() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);
    let (service, backend, _) = service_with(config, MockConfig::default());

    let mut bad = sample_inputs(1.0);
    bad.features.remove("RR2_sum");
    let batch = vec![sample_inputs(1.0), bad, sample_inputs(3.0)];

    let results = service.generate_proofs(&batch).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(matches!(&results[1], Err(ProverError::Validation(e)) if e.len() == 1));
    assert_eq!(
        results[2].as_ref().unwrap().metadata.prediction,
        3 * FEATURE_COUNT as i64
    );
    assert_eq!(backend.prove_calls(), 2);
    assert_eq!(backend.compile_calls(), 1);
}

#[tokio::test]
async fn test_export_verifier_after_init() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);
    let (service, _, _) = service_with(config, MockConfig::default());

    assert!(matches!(
        service.export_verifier().await,
        Err(ProverError::Storage(_))
    ));

    assert!(service.initialize().await.success);
    let verifier = service.export_verifier().await.unwrap();
    assert!(verifier.contains("contract Verifier"));
}

#[tokio::test]
async fn test_report_reflects_activity() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    write_source(&config);
    let (service, _, _) = service_with(config, MockConfig::default());

    service.generate_proof(&sample_inputs(1.0)).await.unwrap();
    let report = service.report();
    assert!(report.contains("Compilations:\n  Count: 1"), "{report}");
    assert!(report.contains("Proof Generations:\n  Count: 1"), "{report}");
    assert!(report.contains("Total Errors: 0"), "{report}");

    service.reset_metrics();
    assert_eq!(service.metrics().compilations.count, 0);
}
