//! Environment detection for status and info reports.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

/// Host and toolchain information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ram_bytes: Option<u64>,

    pub os: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zokrates_version: Option<String>,
}

impl Default for EnvironmentInfo {
    fn default() -> Self {
        EnvironmentInfo {
            cpu_model: None,
            cpu_cores: None,
            total_ram_bytes: None,
            os: std::env::consts::OS.to_string(),
            hostname: None,
            zokrates_version: None,
        }
    }
}

impl EnvironmentInfo {
    /// Detect host information and the zokrates version at `zokrates_path`.
    pub fn detect(zokrates_path: &Path) -> Self {
        use sysinfo::System;

        let mut sys = System::new_all();
        sys.refresh_all();

        EnvironmentInfo {
            cpu_model: sys.cpus().first().map(|c| c.brand().to_string()),
            cpu_cores: sys.physical_core_count().map(|c| c as u32),
            total_ram_bytes: Some(sys.total_memory()),
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            hostname: System::host_name(),
            zokrates_version: detect_zokrates_version(zokrates_path),
        }
    }
}

/// Run `zokrates --version` and return the trimmed output.
pub fn detect_zokrates_version(path: &Path) -> Option<String> {
    Command::new(path)
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| parse_zokrates_version(&s))
        .filter(|s| !s.is_empty())
}

/// Parse "ZoKrates 0.8.8" style output down to the version string.
pub fn parse_zokrates_version(output: &str) -> String {
    let output = output.trim();
    let lower = output.to_ascii_lowercase();
    match lower.strip_prefix("zokrates ") {
        Some(_) => output["zokrates ".len()..].trim().to_string(),
        None => output.to_string(),
    }
}
