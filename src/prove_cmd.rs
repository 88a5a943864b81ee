use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{ProofArtifact, VerifierCalldata};
use crate::service::WeatherModelService;
use crate::weather::{self, ValidationReport, WeatherModelInputs};
use crate::{ProverError, ProverResult, write_json};

/// Contents of an `--inputs` file: one feature map or a list of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InputsFile {
    Single(WeatherModelInputs),
    Batch(Vec<WeatherModelInputs>),
}

impl InputsFile {
    pub fn into_vec(self) -> Vec<WeatherModelInputs> {
        match self {
            InputsFile::Single(one) => vec![one],
            InputsFile::Batch(many) => many,
        }
    }
}

pub fn read_inputs(path: &Path) -> ProverResult<Vec<WeatherModelInputs>> {
    let raw = std::fs::read(path)
        .map_err(|e| ProverError::Message(format!("failed to read {}: {e}", path.display())))?;
    let parsed: InputsFile = serde_json::from_slice(&raw)
        .map_err(|e| ProverError::Message(format!("failed to parse {}: {e}", path.display())))?;
    Ok(parsed.into_vec())
}

/// One entry of the `--json` output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProveEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ProofArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calldata: Option<VerifierCalldata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Prove every feature map in `inputs`.
///
/// Fails when any input fails, after reporting all of them.
pub async fn run(
    service: &WeatherModelService,
    inputs: PathBuf,
    json: Option<PathBuf>,
    calldata: bool,
) -> ProverResult<()> {
    let batch = read_inputs(&inputs)?;
    tracing::info!(count = batch.len(), path = %inputs.display(), "loaded weather inputs");

    let results = service.generate_proofs(&batch).await?;
    let mut entries = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(artifact) => {
                println!(
                    "proof[{index}]: prediction={} public_inputs={} time_ms={:.2} structure_ok={}",
                    artifact.metadata.prediction,
                    artifact.inputs.len(),
                    artifact.metadata.proof_generation_time_ms,
                    service.verify_proof_structure(&artifact)
                );
                let (calldata, error) = if calldata {
                    match service.verifier_calldata(&artifact) {
                        Ok(c) => (Some(c), None),
                        Err(e) => {
                            failures += 1;
                            println!("proof[{index}]: calldata failed: {e}");
                            (None, Some(e.to_string()))
                        }
                    }
                } else {
                    (None, None)
                };
                entries.push(ProveEntry {
                    index,
                    artifact: Some(artifact),
                    calldata,
                    error,
                });
            }
            Err(e) => {
                failures += 1;
                println!("proof[{index}]: failed: {e}");
                entries.push(ProveEntry {
                    index,
                    artifact: None,
                    calldata: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if let Some(path) = json {
        write_json(&path, &entries)?;
        eprintln!("Wrote {} proof result(s) to {}", entries.len(), path.display());
    }
    eprintln!("{}", service.report());

    if failures > 0 {
        return Err(ProverError::Message(format!(
            "{failures} of {} proof(s) failed",
            entries.len()
        )));
    }
    Ok(())
}

/// Validate feature maps without proving.
pub fn validate(service: &WeatherModelService, inputs: PathBuf) -> ProverResult<()> {
    let batch = read_inputs(&inputs)?;
    let weather = &service.config().weather;
    let mut invalid = 0usize;
    for (index, item) in batch.iter().enumerate() {
        let report: ValidationReport =
            weather::validate(&item.features, weather.value_min, weather.value_max);
        println!(
            "inputs[{index}]: valid={} errors={} warnings={}",
            report.valid,
            report.errors.len(),
            report.warnings.len()
        );
        for e in &report.errors {
            println!("  error: {e}");
        }
        for w in &report.warnings {
            println!("  warning: {w}");
        }
        if !report.valid {
            invalid += 1;
        }
    }
    if invalid > 0 {
        return Err(ProverError::Message(format!(
            "{invalid} of {} input set(s) invalid",
            batch.len()
        )));
    }
    Ok(())
}
