pub mod backend;
pub mod core;
pub mod engine;
pub mod metrics;
pub mod service;
pub mod storage;
pub mod weather;

pub mod info_cmd;
pub mod init_cmd;
pub mod prove_cmd;
pub mod verifier_cmd;

use thiserror::Error;

use crate::core::OperationKind;

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("{0}")]
    Message(String),
    #[error("proving backend initialization failed: {0}")]
    Initialization(String),
    #[error("circuit compilation failed: {0}")]
    Compilation(String),
    #[error("key setup failed: {0}")]
    Setup(String),
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),
    #[error("verifier export failed: {0}")]
    VerifierExport(String),
    #[error("invalid weather inputs: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: OperationKind,
        timeout_ms: u64,
    },
    #[error("{operation} failed after {attempts} attempts. Last error: {last_error}")]
    RetriesExhausted {
        operation: OperationKind,
        attempts: u32,
        last_error: String,
    },
    #[error("{0}")]
    EnvironmentUnsupported(String),
    #[error("{0}")]
    MemoryExhausted(String),
    #[error("artifact storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProverError {
    /// Stable short code recorded alongside the message in the error log.
    pub fn code(&self) -> &'static str {
        match self {
            ProverError::Message(_) => "E_GENERIC",
            ProverError::Initialization(_) => "E_INIT",
            ProverError::Compilation(_) => "E_COMPILE",
            ProverError::Setup(_) => "E_SETUP",
            ProverError::ProofGeneration(_) => "E_PROVE",
            ProverError::VerifierExport(_) => "E_EXPORT",
            ProverError::Validation(_) => "E_VALIDATION",
            ProverError::Timeout { .. } => "E_TIMEOUT",
            ProverError::RetriesExhausted { .. } => "E_RETRIES_EXHAUSTED",
            ProverError::EnvironmentUnsupported(_) => "E_ENV_UNSUPPORTED",
            ProverError::MemoryExhausted(_) => "E_MEMORY",
            ProverError::Storage(_) => "E_STORAGE",
            ProverError::Config(_) => "E_CONFIG",
        }
    }
}

pub type ProverResult<T> = Result<T, ProverError>;

/// Milliseconds since the Unix epoch.
pub fn unix_millis() -> u64 {
    (time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as u64
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: serde::Serialize>(path: &std::path::Path, value: &T) -> ProverResult<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| ProverError::Message(e.to_string()))?;
    }
    let json = serde_json::to_vec_pretty(value).map_err(|e| ProverError::Message(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| ProverError::Message(e.to_string()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}
