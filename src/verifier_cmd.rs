use std::path::PathBuf;

use crate::service::WeatherModelService;
use crate::{ProverError, ProverResult, sha256_hex};

/// Export the verifier contract for the persisted verification key.
pub async fn run(service: &WeatherModelService, output: PathBuf) -> ProverResult<()> {
    let source = service.export_verifier().await?;
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ProverError::Storage(format!("{}: {e}", dir.display())))?;
    }
    tokio::fs::write(&output, source.as_bytes())
        .await
        .map_err(|e| ProverError::Storage(format!("{}: {e}", output.display())))?;
    println!(
        "verifier: path={} bytes={} sha256={}",
        output.display(),
        source.len(),
        sha256_hex(source.as_bytes())
    );
    Ok(())
}
