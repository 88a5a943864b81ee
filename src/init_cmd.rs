use std::path::PathBuf;

use crate::service::WeatherModelService;
use crate::{ProverError, ProverResult};

/// Compile and set up the weather circuit, doing only the missing steps.
///
/// With `source`, the file is copied into the circuit directory first.
pub async fn run(service: &WeatherModelService, source: Option<PathBuf>) -> ProverResult<()> {
    if let Some(source) = source {
        let dest = service
            .circuits()
            .source_path(&service.config().weather.circuit_name);
        if let Some(dir) = dest.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| ProverError::Storage(format!("{}: {e}", dir.display())))?;
        }
        tokio::fs::copy(&source, &dest)
            .await
            .map_err(|e| ProverError::Storage(format!("{}: {e}", source.display())))?;
        eprintln!("Copied {} to {}", source.display(), dest.display());
    }

    let outcome = service.initialize().await;
    let s = outcome.status;
    println!(
        "init: success={} compiled={} keys_setup={} ready={}",
        outcome.success, s.compiled, s.keys_setup, s.ready
    );
    outcome.into_result().map(|_| ())
}
