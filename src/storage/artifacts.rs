//! File-backed artifact store keyed by circuit name.
//!
//! Layout:
//! - `<compiled_dir>/<name>.json`: the program bytes as a JSON array of numbers
//! - `<keys_dir>/<name>.key`: raw proving key
//! - `<keys_dir>/<name>.vk`: raw verification key

use std::path::{Path, PathBuf};

use crate::core::{CircuitStatus, CompiledProgram, KeyPair, PathsConfig};
use crate::{ProverError, ProverResult};

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    compiled_dir: PathBuf,
    keys_dir: PathBuf,
}

fn storage_error(action: &str, path: &Path, e: impl std::fmt::Display) -> ProverError {
    ProverError::Storage(format!("failed to {action} {}: {e}", path.display()))
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn ensure_dir(dir: &Path) -> ProverResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| storage_error("create directory", dir, e))
}

impl ArtifactStore {
    pub fn new(compiled_dir: impl Into<PathBuf>, keys_dir: impl Into<PathBuf>) -> Self {
        ArtifactStore {
            compiled_dir: compiled_dir.into(),
            keys_dir: keys_dir.into(),
        }
    }

    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::new(&paths.compiled_dir, &paths.keys_dir)
    }

    pub fn program_path(&self, name: &str) -> PathBuf {
        self.compiled_dir.join(format!("{name}.json"))
    }

    pub fn proving_key_path(&self, name: &str) -> PathBuf {
        self.keys_dir.join(format!("{name}.key"))
    }

    pub fn verification_key_path(&self, name: &str) -> PathBuf {
        self.keys_dir.join(format!("{name}.vk"))
    }

    /// Probe artifact presence. I/O errors count as absent.
    pub async fn status(&self, name: &str) -> CircuitStatus {
        let compiled = exists(&self.program_path(name)).await;
        let keys_setup = exists(&self.proving_key_path(name)).await
            && exists(&self.verification_key_path(name)).await;
        CircuitStatus::from_presence(compiled, keys_setup)
    }

    pub async fn save_program(&self, name: &str, program: &CompiledProgram) -> ProverResult<PathBuf> {
        ensure_dir(&self.compiled_dir).await?;
        let path = self.program_path(name);
        let json = serde_json::to_vec(&program.bytes)
            .map_err(|e| storage_error("serialize", &path, e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| storage_error("write", &path, e))?;
        tracing::info!(circuit = name, path = %path.display(), bytes = program.bytes.len(), "saved compiled program");
        Ok(path)
    }

    /// Load a persisted program. The ABI is not persisted and comes back as `Null`.
    pub async fn load_program(&self, name: &str) -> ProverResult<CompiledProgram> {
        let path = self.program_path(name);
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error("read", &path, e))?;
        let bytes: Vec<u8> =
            serde_json::from_slice(&raw).map_err(|e| storage_error("parse", &path, e))?;
        Ok(CompiledProgram::new(bytes, serde_json::Value::Null))
    }

    pub async fn save_keys(&self, name: &str, keys: &KeyPair) -> ProverResult<()> {
        ensure_dir(&self.keys_dir).await?;
        let pk = self.proving_key_path(name);
        let vk = self.verification_key_path(name);
        tokio::fs::write(&pk, &keys.proving_key)
            .await
            .map_err(|e| storage_error("write", &pk, e))?;
        tokio::fs::write(&vk, &keys.verification_key)
            .await
            .map_err(|e| storage_error("write", &vk, e))?;
        tracing::info!(circuit = name, keys_dir = %self.keys_dir.display(), "saved key pair");
        Ok(())
    }

    pub async fn load_proving_key(&self, name: &str) -> ProverResult<Vec<u8>> {
        let path = self.proving_key_path(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error("read", &path, e))
    }

    pub async fn load_verification_key(&self, name: &str) -> ProverResult<Vec<u8>> {
        let path = self.verification_key_path(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| storage_error("read", &path, e))
    }
}
