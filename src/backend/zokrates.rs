//! ZoKrates CLI backend implementation.
//!
//! Every operation runs in its own temporary work directory; the directory is
//! removed when the operation returns, on success and error paths alike.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::core::env::parse_zokrates_version;
use crate::core::{BackendConfig, CompiledProgram, Groth16Proof, KeyPair};
use crate::{ProverError, ProverResult};

use super::traits::{BackendLoader, ProofOutput, ProvingBackend};

/// Configuration for the ZoKrates backend.
#[derive(Debug, Clone)]
pub struct ZokratesConfig {
    /// Path to the zokrates binary
    pub zokrates_path: PathBuf,
    /// Proving scheme passed to setup/generate-proof (e.g. "g16")
    pub proving_scheme: String,
    /// Extra arguments appended to every command
    pub extra_args: Vec<String>,
}

impl Default for ZokratesConfig {
    fn default() -> Self {
        ZokratesConfig {
            zokrates_path: PathBuf::from("zokrates"),
            proving_scheme: "g16".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl ZokratesConfig {
    /// Create a new config with the given zokrates path.
    pub fn new(zokrates_path: impl Into<PathBuf>) -> Self {
        ZokratesConfig {
            zokrates_path: zokrates_path.into(),
            ..Default::default()
        }
    }

    /// Add extra arguments.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Set the proving scheme.
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.proving_scheme = scheme.into();
        self
    }
}

impl From<&BackendConfig> for ZokratesConfig {
    fn from(cfg: &BackendConfig) -> Self {
        ZokratesConfig {
            zokrates_path: cfg.zokrates_path.clone(),
            proving_scheme: cfg.proving_scheme.clone(),
            extra_args: cfg.extra_args.clone(),
        }
    }
}

/// ZoKrates proving backend.
pub struct ZokratesBackend {
    config: ZokratesConfig,
    version: Option<String>,
}

/// `proof.json` as written by `zokrates generate-proof`.
#[derive(Deserialize)]
struct ProofFile {
    proof: Groth16Proof,
    #[serde(default)]
    inputs: Vec<String>,
}

fn work_dir() -> ProverResult<tempfile::TempDir> {
    tempfile::tempdir().map_err(|e| ProverError::Message(format!("failed to create temp dir: {e}")))
}

async fn write_file(path: &Path, bytes: &[u8]) -> ProverResult<()> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ProverError::Message(format!("failed to write {}: {e}", path.display())))
}

async fn read_file(path: &Path) -> ProverResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ProverError::Message(format!("failed to read {}: {e}", path.display())))
}

impl ZokratesBackend {
    /// Create a new ZoKrates backend with the given configuration.
    pub fn new(config: ZokratesConfig, version: Option<String>) -> Self {
        ZokratesBackend { config, version }
    }

    /// Run one zokrates subcommand in `cwd`, failing on a non-zero exit.
    async fn run(&self, subcommand: &str, args: Vec<OsString>, cwd: &Path) -> ProverResult<Output> {
        let mut cmd = Command::new(&self.config.zokrates_path);
        cmd.arg(subcommand).args(args).current_dir(cwd);
        for arg in &self.config.extra_args {
            cmd.arg(arg);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        tracing::debug!(subcommand, "running zokrates");
        let output = cmd.output().await.map_err(|e| spawn_error(&self.config.zokrates_path, e))?;
        if !output.status.success() {
            return Err(ProverError::Message(format!(
                "zokrates {subcommand} failed: status={} stderr={}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output)
    }
}

fn spawn_error(path: &Path, e: std::io::Error) -> ProverError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ProverError::EnvironmentUnsupported(format!(
            "zokrates binary not found at '{}': not supported in this environment",
            path.display()
        ))
    } else {
        ProverError::Message(format!("failed to spawn zokrates: {e}"))
    }
}

fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

#[async_trait]
impl ProvingBackend for ZokratesBackend {
    fn name(&self) -> &str {
        "zokrates"
    }

    fn version(&self) -> Option<String> {
        self.version.clone()
    }

    async fn compile(&self, source: &str) -> ProverResult<CompiledProgram> {
        let dir = work_dir()?;
        write_file(&dir.path().join("root.zok"), source.as_bytes()).await?;

        self.run(
            "compile",
            os_args(&["-i", "root.zok", "-o", "out", "-s", "abi.json"]),
            dir.path(),
        )
        .await?;

        let bytes = read_file(&dir.path().join("out")).await?;
        let abi = match read_file(&dir.path().join("abi.json")).await {
            Ok(raw) => serde_json::from_slice(&raw)
                .map_err(|e| ProverError::Message(format!("failed to parse abi.json: {e}")))?,
            Err(_) => serde_json::Value::Null,
        };
        Ok(CompiledProgram::new(bytes, abi))
    }

    async fn setup(&self, program: &[u8]) -> ProverResult<KeyPair> {
        let dir = work_dir()?;
        write_file(&dir.path().join("out"), program).await?;

        self.run(
            "setup",
            os_args(&[
                "-i",
                "out",
                "-p",
                "proving.key",
                "-v",
                "verification.key",
                "-s",
                self.config.proving_scheme.as_str(),
            ]),
            dir.path(),
        )
        .await?;

        Ok(KeyPair {
            proving_key: read_file(&dir.path().join("proving.key")).await?,
            verification_key: read_file(&dir.path().join("verification.key")).await?,
        })
    }

    async fn generate_proof(
        &self,
        program: &[u8],
        proving_key: &[u8],
        inputs: &[String],
    ) -> ProverResult<ProofOutput> {
        let dir = work_dir()?;
        write_file(&dir.path().join("out"), program).await?;
        write_file(&dir.path().join("proving.key"), proving_key).await?;

        let mut witness_args = os_args(&["-i", "out", "-o", "witness", "-a"]);
        witness_args.extend(inputs.iter().map(OsString::from));
        self.run("compute-witness", witness_args, dir.path()).await?;

        self.run(
            "generate-proof",
            os_args(&[
                "-i",
                "out",
                "-w",
                "witness",
                "-p",
                "proving.key",
                "-j",
                "proof.json",
                "-s",
                self.config.proving_scheme.as_str(),
            ]),
            dir.path(),
        )
        .await?;

        let raw = read_file(&dir.path().join("proof.json")).await?;
        let parsed: ProofFile = serde_json::from_slice(&raw)
            .map_err(|e| ProverError::Message(format!("failed to parse proof.json: {e}")))?;
        Ok(ProofOutput {
            proof: parsed.proof,
            inputs: parsed.inputs,
        })
    }

    async fn export_verifier(&self, verification_key: &[u8]) -> ProverResult<String> {
        let dir = work_dir()?;
        write_file(&dir.path().join("verification.key"), verification_key).await?;

        self.run(
            "export-verifier",
            os_args(&["-i", "verification.key", "-o", "verifier.sol"]),
            dir.path(),
        )
        .await?;

        let raw = read_file(&dir.path().join("verifier.sol")).await?;
        String::from_utf8(raw)
            .map_err(|e| ProverError::Message(format!("verifier is not valid UTF-8: {e}")))
    }
}

/// Loader that probes the zokrates binary before handing out a backend.
pub struct ZokratesLoader {
    config: ZokratesConfig,
}

impl ZokratesLoader {
    pub fn new(config: ZokratesConfig) -> Self {
        ZokratesLoader { config }
    }
}

#[async_trait]
impl BackendLoader for ZokratesLoader {
    async fn load(&self) -> ProverResult<Arc<dyn ProvingBackend>> {
        let output = Command::new(&self.config.zokrates_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| spawn_error(&self.config.zokrates_path, e))?;
        if !output.status.success() {
            return Err(ProverError::Initialization(format!(
                "zokrates --version failed with status: {}",
                output.status
            )));
        }
        let version = Some(parse_zokrates_version(&String::from_utf8_lossy(&output.stdout)))
            .filter(|v| !v.is_empty());
        tracing::info!(version = ?version, "zokrates backend ready");
        let backend: Arc<dyn ProvingBackend> =
            Arc::new(ZokratesBackend::new(self.config.clone(), version));
        Ok(backend)
    }
}
