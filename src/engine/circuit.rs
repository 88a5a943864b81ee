//! Circuit artifact manager.
//!
//! Tracks the compiled program and key pair of each named circuit and
//! converges a circuit to the ready state, doing only the missing steps.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{CircuitStatus, CompiledProgram, ProverConfig};
use crate::storage::ArtifactStore;
use crate::{ProverError, ProverResult};

use super::adapter::{CompilationResult, ProvingEngine, SetupResult};

/// Result of [`CircuitManager::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: CircuitStatus,
}

impl InitializeOutcome {
    fn ok(status: CircuitStatus) -> Self {
        InitializeOutcome {
            success: true,
            error: None,
            status,
        }
    }

    fn failed(error: impl Into<String>, status: CircuitStatus) -> Self {
        InitializeOutcome {
            success: false,
            error: Some(error.into()),
            status,
        }
    }

    pub fn into_result(self) -> ProverResult<CircuitStatus> {
        if self.success {
            Ok(self.status)
        } else {
            Err(ProverError::Message(self.error.unwrap_or_default()))
        }
    }
}

#[derive(Clone)]
pub struct CircuitManager {
    engine: ProvingEngine,
    store: ArtifactStore,
    circuit_dir: PathBuf,
}

impl CircuitManager {
    pub fn new(engine: ProvingEngine, store: ArtifactStore, circuit_dir: impl Into<PathBuf>) -> Self {
        CircuitManager {
            engine,
            store,
            circuit_dir: circuit_dir.into(),
        }
    }

    pub fn from_config(engine: ProvingEngine, config: &ProverConfig) -> Self {
        Self::new(
            engine,
            ArtifactStore::from_paths(&config.paths),
            &config.paths.circuit_dir,
        )
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn circuit_dir(&self) -> &Path {
        &self.circuit_dir
    }

    pub fn source_path(&self, name: &str) -> PathBuf {
        self.circuit_dir.join(format!("{name}.zok"))
    }

    pub async fn load_source(&self, name: &str) -> ProverResult<String> {
        let path = self.source_path(name);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            ProverError::Storage(format!("failed to read circuit source {}: {e}", path.display()))
        })
    }

    /// Compile the named circuit's source and persist the program.
    ///
    /// Every failure, including a missing source file, comes back as an
    /// unsuccessful result.
    pub async fn compile(&self, name: &str) -> CompilationResult {
        let source = match self.load_source(name).await {
            Ok(s) => s,
            Err(e) => return CompilationResult::failed(e.to_string(), 0.0),
        };
        let result = match self.engine.compile(&source).await {
            Ok(r) => r,
            Err(e) => return CompilationResult::failed(e.to_string(), 0.0),
        };
        if let Some(program) = result.program.as_ref().filter(|_| result.success) {
            if let Err(e) = self.store.save_program(name, program).await {
                return CompilationResult::failed(e.to_string(), result.compilation_time_ms);
            }
        }
        result
    }

    /// Derive keys for `program` and persist them under `name`.
    pub async fn setup_keys(&self, name: &str, program: &CompiledProgram) -> SetupResult {
        let result = match self.engine.setup_keys(&program.bytes).await {
            Ok(r) => r,
            Err(e) => return SetupResult::failed(e.to_string(), 0.0),
        };
        if let Some(keys) = result.keys.as_ref().filter(|_| result.success) {
            if let Err(e) = self.store.save_keys(name, keys).await {
                return SetupResult::failed(e.to_string(), result.setup_time_ms);
            }
        }
        result
    }

    pub async fn status(&self, name: &str) -> CircuitStatus {
        self.store.status(name).await
    }

    /// Bring `name` to the ready state.
    ///
    /// A ready circuit is left alone. Otherwise the program is compiled and
    /// persisted if absent, then keys are derived if absent. The first
    /// failing step stops the sequence.
    pub async fn initialize(&self, name: &str) -> InitializeOutcome {
        let status = self.status(name).await;
        if status.ready {
            tracing::info!(circuit = name, "circuit already initialized");
            return InitializeOutcome::ok(status);
        }
        tracing::info!(
            circuit = name,
            compiled = status.compiled,
            keys_setup = status.keys_setup,
            "initializing circuit"
        );

        let mut program = None;
        if !status.compiled {
            let result = self.compile(name).await;
            match result.program {
                Some(p) if result.success => program = Some(p),
                _ => {
                    let error = result.error.unwrap_or_else(|| "compilation failed".into());
                    tracing::error!(circuit = name, "{error}");
                    return InitializeOutcome::failed(error, self.status(name).await);
                }
            }
        }

        if !status.keys_setup {
            let program = match program {
                Some(p) => p,
                None => match self.store.load_program(name).await {
                    Ok(p) => p,
                    Err(e) => return InitializeOutcome::failed(e.to_string(), status),
                },
            };
            let result = self.setup_keys(name, &program).await;
            if !result.success {
                let error = result.error.unwrap_or_else(|| "key setup failed".into());
                tracing::error!(circuit = name, "{error}");
                return InitializeOutcome::failed(error, self.status(name).await);
            }
        }

        let status = self.status(name).await;
        tracing::info!(circuit = name, ready = status.ready, "circuit initialized");
        InitializeOutcome::ok(status)
    }

    pub async fn load_program(&self, name: &str) -> ProverResult<CompiledProgram> {
        self.store.load_program(name).await
    }

    pub async fn load_proving_key(&self, name: &str) -> ProverResult<Vec<u8>> {
        self.store.load_proving_key(name).await
    }

    pub async fn load_verification_key(&self, name: &str) -> ProverResult<Vec<u8>> {
        self.store.load_verification_key(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::backend::{MockBackend, MockConfig, MockLoader};
    use tempfile::TempDir;

    const SOURCE: &str = "def main(private field a, field b) -> field { return a + b; }";

    fn manager(dir: &TempDir, mock: MockConfig) -> (CircuitManager, Arc<MockBackend>) {
        let mut config = ProverConfig::default();
        config.paths.circuit_dir = dir.path().join("circuits");
        config.paths.compiled_dir = dir.path().join("compiled");
        config.paths.keys_dir = dir.path().join("keys");
        config.retry.delays_ms = vec![1];
        config.retry.proof_delays_ms = vec![1];

        let backend = Arc::new(MockBackend::new(mock));
        let loader = Arc::new(MockLoader::new(Arc::clone(&backend)));
        let engine = ProvingEngine::new(loader, &config);
        (CircuitManager::from_config(engine, &config), backend)
    }

    fn write_source(dir: &TempDir, name: &str) {
        let circuits = dir.path().join("circuits");
        std::fs::create_dir_all(&circuits).unwrap();
        std::fs::write(circuits.join(format!("{name}.zok")), SOURCE).unwrap();
    }

    #[tokio::test]
    async fn test_initialize_from_scratch() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "c");
        let (manager, backend) = manager(&dir, MockConfig::default());

        let outcome = manager.initialize("c").await;
        assert!(outcome.success, "{:?}", outcome.error);
        assert!(outcome.status.ready);
        assert_eq!(backend.compile_calls(), 1);
        assert_eq!(backend.setup_calls(), 1);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "c");
        let (manager, backend) = manager(&dir, MockConfig::default());

        assert!(manager.initialize("c").await.success);
        let again = manager.initialize("c").await;
        assert!(again.success);
        assert_eq!(backend.compile_calls(), 1);
        assert_eq!(backend.setup_calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_source_is_unsuccessful_result() {
        let dir = TempDir::new().unwrap();
        let (manager, backend) = manager(&dir, MockConfig::default());

        let outcome = manager.initialize("absent").await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("absent.zok"));
        assert_eq!(outcome.status, CircuitStatus::default());
        assert_eq!(backend.compile_calls(), 0);
    }

    #[tokio::test]
    async fn test_compile_failure_skips_setup() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "c");
        let (manager, backend) = manager(&dir, MockConfig::default().compile_fails(10));

        let outcome = manager.initialize("c").await;
        assert!(!outcome.success);
        assert!(!outcome.status.compiled);
        assert_eq!(backend.setup_calls(), 0);
    }

    #[tokio::test]
    async fn test_setup_failure_keeps_compiled_program() {
        let dir = TempDir::new().unwrap();
        write_source(&dir, "c");
        let (manager, _) = manager(&dir, MockConfig::default().setup_fails(10));

        let outcome = manager.initialize("c").await;
        assert!(!outcome.success);
        assert!(outcome.status.compiled);
        assert!(!outcome.status.keys_setup);
        assert!(outcome.error.unwrap().contains("setup failed after 3 attempts"));
    }
}
