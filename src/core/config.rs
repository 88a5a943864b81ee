use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ProverError, ProverResult};

/// Top-level configuration, usually read from `weather-zk.toml`.
///
/// Every table falls back to its defaults, so a file only needs the keys it
/// wants to override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProverConfig {
    pub paths: PathsConfig,
    pub proof: ProofConfig,
    pub retry: RetryConfig,
    pub monitoring: MonitoringConfig,
    pub weather: WeatherConfig,
    pub limits: LimitsConfig,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding `<name>.zok` circuit sources
    pub circuit_dir: PathBuf,
    /// Directory for `<name>.json` compiled programs
    pub compiled_dir: PathBuf,
    /// Directory for `<name>.key` / `<name>.vk` key files
    pub keys_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            circuit_dir: PathBuf::from("circuits"),
            compiled_dir: PathBuf::from("compiled"),
            keys_dir: PathBuf::from("keys"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofConfig {
    pub timeout_ms: u64,
}

impl Default for ProofConfig {
    fn default() -> Self {
        ProofConfig {
            timeout_ms: 300_000, // 5 minutes
        }
    }
}

impl ProofConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Backoff schedule for compile and setup
    pub delays_ms: Vec<u64>,
    /// Longer backoff schedule for proof generation
    pub proof_delays_ms: Vec<u64>,
    /// Attach a debug rendering of each failure to its error record
    pub detailed_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            delays_ms: vec![1000, 2000, 5000],
            proof_delays_ms: vec![2000, 5000, 10000],
            detailed_errors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_compilation_time: bool,
    pub log_proof_time: bool,
    pub log_memory: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        MonitoringConfig {
            enabled: true,
            log_compilation_time: true,
            log_proof_time: true,
            log_memory: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub circuit_name: String,
    pub value_min: f64,
    pub value_max: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            circuit_name: "weather-model".to_string(),
            value_min: -1e12,
            value_max: 1e12,
        }
    }
}

/// Resource ceilings. Reported, never enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_memory_mb: u64,
    pub max_execution_time_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_memory_mb: 4096,
            max_execution_time_ms: 600_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Path to the zokrates binary
    pub zokrates_path: PathBuf,
    pub proving_scheme: String,
    /// Extra arguments appended to every zokrates invocation
    pub extra_args: Vec<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            zokrates_path: PathBuf::from("zokrates"),
            proving_scheme: "g16".to_string(),
            extra_args: Vec::new(),
        }
    }
}

pub fn load_config(path: &Path) -> ProverResult<ProverConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| ProverError::Config(format!("{}: {e}", path.display())))?;
    toml::from_str(&s).map_err(|e| ProverError::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ProverConfig::default();
        assert_eq!(cfg.proof.timeout_ms, 300_000);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.delays_ms, vec![1000, 2000, 5000]);
        assert_eq!(cfg.weather.circuit_name, "weather-model");
        assert_eq!(cfg.paths.keys_dir, PathBuf::from("keys"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let cfg: ProverConfig = toml::from_str(
            r#"
[retry]
max_attempts = 5

[paths]
keys_dir = "/var/lib/weather/keys"
"#,
        )
        .unwrap();
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.delays_ms, vec![1000, 2000, 5000]);
        assert_eq!(cfg.paths.keys_dir, PathBuf::from("/var/lib/weather/keys"));
        assert_eq!(cfg.paths.compiled_dir, PathBuf::from("compiled"));
        assert!(cfg.monitoring.enabled);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/weather-zk.toml")).unwrap_err();
        assert!(matches!(err, ProverError::Config(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weather-zk.toml");
        std::fs::write(&path, "[proof]\ntimeout_ms = 1500\n").unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.proof.timeout(), Duration::from_millis(1500));
    }
}
