//! Error records, the bounded error log, and failure classification.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::core::OperationKind;
use crate::{ProverError, unix_millis};

/// Maximum number of records kept in an [`ErrorLog`].
pub const ERROR_LOG_CAPACITY: usize = 100;

/// Number of records returned as `recent` by [`ErrorLog::stats`].
pub const RECENT_ERRORS: usize = 10;

const RETRYABLE_PATTERNS: [&str; 6] = [
    "timeout",
    "network",
    "connection",
    "temporary",
    "rate limit",
    "service unavailable",
];

const ENVIRONMENT_PATTERNS: [&str; 3] = ["not supported", "unsupported", "exec format error"];

const MEMORY_PATTERNS: [&str; 2] = ["memory", "heap"];

/// One failed attempt of a proving operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub context: BTreeMap<String, String>,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub operation: OperationKind,
    pub attempt: u32,
}

impl ErrorRecord {
    pub fn from_error(
        error: &ProverError,
        operation: OperationKind,
        attempt: u32,
        detailed: bool,
    ) -> Self {
        let mut context = BTreeMap::new();
        context.insert("runtime".to_string(), "native".to_string());
        context.insert("os".to_string(), std::env::consts::OS.to_string());
        context.insert("pid".to_string(), std::process::id().to_string());
        ErrorRecord {
            message: error.to_string(),
            code: Some(error.code().to_string()),
            stack: detailed.then(|| format!("{error:?}")),
            context,
            timestamp: unix_millis(),
            operation,
            attempt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total: usize,
    pub by_operation: BTreeMap<OperationKind, usize>,
    /// Most recent records, oldest first
    pub recent: Vec<ErrorRecord>,
}

/// Process-wide ring buffer of error records. Oldest records are evicted first.
#[derive(Debug, Default)]
pub struct ErrorLog {
    records: Mutex<VecDeque<ErrorRecord>>,
}

impl ErrorLog {
    pub fn new() -> Self {
        ErrorLog {
            records: Mutex::new(VecDeque::with_capacity(ERROR_LOG_CAPACITY)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<ErrorRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, record: ErrorRecord) {
        tracing::error!(
            operation = %record.operation,
            attempt = record.attempt,
            code = record.code.as_deref().unwrap_or(""),
            "{}",
            record.message
        );
        let mut records = self.lock();
        if records.len() == ERROR_LOG_CAPACITY {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Move records already logged elsewhere into this log, oldest first.
    pub fn append(&self, incoming: Vec<ErrorRecord>) {
        let mut records = self.lock();
        for record in incoming {
            if records.len() == ERROR_LOG_CAPACITY {
                records.pop_front();
            }
            records.push_back(record);
        }
    }

    /// Remove and return every record.
    pub fn drain(&self) -> Vec<ErrorRecord> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> ErrorStats {
        let records = self.lock();
        let mut by_operation = BTreeMap::new();
        for r in records.iter() {
            *by_operation.entry(r.operation).or_insert(0) += 1;
        }
        let skip = records.len().saturating_sub(RECENT_ERRORS);
        ErrorStats {
            total: records.len(),
            by_operation,
            recent: records.iter().skip(skip).cloned().collect(),
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Render a plain-text summary of the log.
    pub fn report(&self) -> String {
        let stats = self.stats();
        let mut out = String::new();
        let _ = writeln!(out, "Error Report");
        let _ = writeln!(out, "============");
        let _ = writeln!(out);
        let _ = writeln!(out, "Total Errors: {}", stats.total);
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors by Operation:");
        for (operation, count) in &stats.by_operation {
            let _ = writeln!(out, "  {operation}: {count}");
        }
        if !stats.recent.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Recent Errors:");
            for (i, r) in stats.recent.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. [{}] {} (attempt {}, {})",
                    i + 1,
                    r.operation,
                    r.message,
                    r.attempt,
                    format_timestamp(r.timestamp)
                );
            }
        }
        out
    }
}

fn format_timestamp(millis: u64) -> String {
    let nanos = millis as i128 * 1_000_000;
    time::OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|t| t.format(&time::format_description::well_known::Rfc3339).ok())
        .unwrap_or_else(|| millis.to_string())
}

/// Advisory: whether a failure message looks transient.
///
/// The retry executor does not consult this; it retries every failure.
pub fn is_retryable(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_PATTERNS.iter().any(|p| message.contains(p))
}

/// Short user-facing description of a failed operation.
pub fn user_friendly_message(operation: OperationKind, message: &str) -> String {
    let base = match operation {
        OperationKind::Compile => "Failed to compile circuit",
        OperationKind::Setup => "Failed to generate proving and verification keys",
        OperationKind::GenerateProof => "Failed to generate zero-knowledge proof",
        OperationKind::ExportVerifier => "Failed to export verifier contract",
    };
    let clause = if message.contains("timeout") || message.contains("timed out") {
        "The operation took too long to complete."
    } else if message.contains("memory") {
        "Insufficient memory available."
    } else if message.contains("syntax") {
        "There may be a syntax error in the circuit code."
    } else if message.contains("witness") {
        "Invalid witness data provided."
    } else {
        "Please check the logs for detailed error information."
    };
    format!("{base}. {clause}")
}

/// Rewrite an unsupported-environment failure into an actionable message.
pub fn handle_environment_error(error: ProverError) -> ProverError {
    if matches!(error, ProverError::EnvironmentUnsupported(_)) || matches_any(&error, &ENVIRONMENT_PATTERNS) {
        return ProverError::EnvironmentUnsupported(
            "The proving backend is not supported or failed to start in this environment. \
             Install the zokrates CLI or set backend.zokrates_path to a working binary."
                .to_string(),
        );
    }
    error
}

/// Rewrite a memory-exhaustion failure into an actionable message.
pub fn handle_memory_error(error: ProverError) -> ProverError {
    if matches!(error, ProverError::MemoryExhausted(_)) || matches_any(&error, &MEMORY_PATTERNS) {
        return ProverError::MemoryExhausted(
            "Insufficient memory for the proving operation. \
             Try reducing the circuit size or raising limits.max_memory_mb."
                .to_string(),
        );
    }
    error
}

/// Apply both rewrites.
pub fn rewrite_known_failure(error: ProverError) -> ProverError {
    handle_memory_error(handle_environment_error(error))
}

fn matches_any(error: &ProverError, patterns: &[&str]) -> bool {
    let message = error.to_string().to_lowercase();
    patterns.iter().any(|p| message.contains(p))
}
