//! Integration tests for the ZoKrates CLI backend.
//!
//! These tests run only when a zokrates binary is available (set
//! `ZOKRATES_PATH` or put `zokrates` on PATH); otherwise they skip.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use weather_zk::backend::{BackendLoader, ZokratesConfig, ZokratesLoader};
use weather_zk::core::ProverConfig;
use weather_zk::engine::ProvingEngine;

const SOURCE: &str = "def main(private field a, field b) -> field { return a + b; }";

/// Check if zokrates is available.
fn zokrates_available() -> Option<PathBuf> {
    let path = std::env::var_os("ZOKRATES_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("zokrates"));
    if Command::new(&path)
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
    {
        Some(path)
    } else {
        None
    }
}

#[tokio::test]
async fn test_zokrates_loader_reports_version() {
    let path = match zokrates_available() {
        Some(p) => p,
        None => {
            eprintln!("Skipping test: zokrates not found in PATH");
            return;
        }
    };

    let backend = ZokratesLoader::new(ZokratesConfig::new(&path))
        .load()
        .await
        .unwrap();
    assert_eq!(backend.name(), "zokrates");
    assert!(backend.version().is_some());
}

#[tokio::test]
async fn test_zokrates_happy_path() {
    let path = match zokrates_available() {
        Some(p) => p,
        None => {
            eprintln!("Skipping test: zokrates not found in PATH");
            return;
        }
    };

    let mut config = ProverConfig::default();
    config.backend.zokrates_path = path;
    let loader = Arc::new(ZokratesLoader::new(ZokratesConfig::from(&config.backend)));
    let engine = ProvingEngine::new(loader, &config);

    let compiled = engine.compile(SOURCE).await.unwrap();
    assert!(compiled.success, "{:?}", compiled.error);
    let program = compiled.program.unwrap();
    assert!(!program.bytes.is_empty());

    let setup = engine.setup_keys(&program.bytes).await.unwrap();
    assert!(setup.success, "{:?}", setup.error);
    let keys = setup.keys.unwrap();

    let inputs = vec!["3".to_string(), "4".to_string()];
    let proof = engine
        .generate_proof(&program.bytes, &keys.proving_key, &inputs)
        .await
        .unwrap();
    assert!(proof.success, "{:?}", proof.error);
    assert!(proof.proof.unwrap().is_populated());
    assert_eq!(proof.inputs.len(), 2);
    assert_eq!(weather_zk::weather::decode_prediction(&proof.inputs), 7);

    let verifier = engine.export_verifier(&keys.verification_key).await.unwrap();
    assert!(verifier.contains("contract Verifier"));
}

#[tokio::test]
async fn test_missing_binary_fails_initialization() {
    let mut config = ProverConfig::default();
    config.backend.zokrates_path = PathBuf::from("/nonexistent/zokrates");
    let loader = Arc::new(ZokratesLoader::new(ZokratesConfig::from(&config.backend)));
    let engine = ProvingEngine::new(loader, &config);

    let err = engine.compile(SOURCE).await.unwrap_err();
    assert_eq!(err.code(), "E_ENV_UNSUPPORTED");
    assert!(!engine.is_initialized());
}
