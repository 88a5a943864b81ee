use std::path::PathBuf;

use serde::Serialize;

use crate::core::{CircuitStatus, EnvironmentInfo, LimitsConfig};
use crate::service::{ModelInfo, WeatherModelService};
use crate::weather::{FEATURE_GROUPS, feature_description};
use crate::{ProverError, ProverResult, write_json};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub circuit: String,
    pub status: CircuitStatus,
    pub backend_initialized: bool,
    pub environment: EnvironmentInfo,
    pub limits: LimitsConfig,
}

/// Print the weather model description.
pub fn run_info(
    service: &WeatherModelService,
    features: bool,
    json: Option<PathBuf>,
) -> ProverResult<()> {
    let info: ModelInfo = service.model_info();
    println!(
        "model: name={} features={} input_width={} outputs={} range=[{}, {}]",
        info.name, info.feature_count, info.input_width, info.output_size, info.value_min, info.value_max
    );
    if features {
        for (group, members) in FEATURE_GROUPS {
            println!("{group} ({})", members.len());
            for name in *members {
                let description = feature_description(name).unwrap_or_default();
                println!("  {name:<32} {description}");
            }
        }
    }
    if let Some(path) = json {
        write_json(&path, &info)?;
        eprintln!("Wrote model info to {}", path.display());
    }
    Ok(())
}

/// Print circuit readiness and host information.
pub async fn run_status(service: &WeatherModelService, json: Option<PathBuf>) -> ProverResult<()> {
    let status = service.status().await;
    let zokrates_path = service.config().backend.zokrates_path.clone();
    let environment = tokio::task::spawn_blocking(move || EnvironmentInfo::detect(&zokrates_path))
        .await
        .map_err(|e| ProverError::Message(format!("environment detection failed: {e}")))?;

    let report = StatusReport {
        circuit: service.config().weather.circuit_name.clone(),
        status,
        backend_initialized: service.engine().is_initialized(),
        environment,
        limits: service.config().limits.clone(),
    };

    println!(
        "circuit: {} compiled={} keys_setup={} ready={}",
        report.circuit, status.compiled, status.keys_setup, status.ready
    );
    println!(
        "zokrates: {}",
        report.environment.zokrates_version.as_deref().unwrap_or("not found")
    );
    println!(
        "limits: max_memory={}MB max_execution_time={}ms (advisory)",
        report.limits.max_memory_mb, report.limits.max_execution_time_ms
    );
    if let Some(path) = json {
        write_json(&path, &report)?;
        eprintln!("Wrote status report to {}", path.display());
    }
    Ok(())
}
