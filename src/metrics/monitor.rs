//! Running performance statistics for compile and proof generation.

use std::fmt::Write as _;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::MonitoringConfig;

use super::memory::{MemoryStats, current_process_memory, format_mb};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStats {
    pub count: u64,
    pub total_time_ms: f64,
    pub average_time_ms: f64,
    /// `f64::INFINITY` until the first sample
    pub min_time_ms: f64,
    pub max_time_ms: f64,
}

impl Default for OperationStats {
    fn default() -> Self {
        OperationStats {
            count: 0,
            total_time_ms: 0.0,
            average_time_ms: 0.0,
            min_time_ms: f64::INFINITY,
            max_time_ms: 0.0,
        }
    }
}

impl OperationStats {
    pub fn record(&mut self, time_ms: f64) {
        self.count += 1;
        self.total_time_ms += time_ms;
        self.average_time_ms = self.total_time_ms / self.count as f64;
        self.min_time_ms = self.min_time_ms.min(time_ms);
        self.max_time_ms = self.max_time_ms.max(time_ms);
    }

    fn write_report(&self, out: &mut String, title: &str) {
        let min = if self.min_time_ms.is_infinite() {
            "N/A".to_string()
        } else {
            format!("{:.2}ms", self.min_time_ms)
        };
        let _ = writeln!(out, "{title}:");
        let _ = writeln!(out, "  Count: {}", self.count);
        let _ = writeln!(out, "  Total Time: {:.2}ms", self.total_time_ms);
        let _ = writeln!(out, "  Average Time: {:.2}ms", self.average_time_ms);
        let _ = writeln!(out, "  Min Time: {min}");
        let _ = writeln!(out, "  Max Time: {:.2}ms", self.max_time_ms);
    }
}

/// Which counter [`PerformanceMonitor::record_error`] bumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Compilation,
    ProofGeneration,
    Setup,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorCounts {
    pub compilation_errors: u64,
    pub proof_generation_errors: u64,
    pub setup_errors: u64,
}

/// Point-in-time copy of everything the monitor has recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub compilations: OperationStats,
    pub proof_generations: OperationStats,
    pub memory_usage: MemoryStats,
    pub errors: ErrorCounts,
}

/// Process-wide accumulator. Every record operation is O(1).
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    config: MonitoringConfig,
    metrics: Mutex<PerformanceMetrics>,
}

impl PerformanceMonitor {
    pub fn new(config: MonitoringConfig) -> Self {
        PerformanceMonitor {
            config,
            metrics: Mutex::new(PerformanceMetrics::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PerformanceMetrics> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_compilation(&self, time_ms: f64) {
        let (count, avg) = {
            let mut m = self.lock();
            m.compilations.record(time_ms);
            (m.compilations.count, m.compilations.average_time_ms)
        };
        if self.config.enabled && self.config.log_compilation_time {
            tracing::info!("compilation #{count}: {time_ms:.2}ms (avg: {avg:.2}ms)");
        }
    }

    pub fn record_proof_generation(&self, time_ms: f64) {
        let (count, avg) = {
            let mut m = self.lock();
            m.proof_generations.record(time_ms);
            (m.proof_generations.count, m.proof_generations.average_time_ms)
        };
        if self.config.enabled && self.config.log_proof_time {
            tracing::info!("proof generation #{count}: {time_ms:.2}ms (avg: {avg:.2}ms)");
        }
    }

    /// Record an externally measured memory sample.
    pub fn record_memory_sample(&self, bytes: u64) {
        self.lock().memory_usage.record(bytes);
        if self.config.enabled && self.config.log_memory {
            tracing::info!("memory usage: {}", format_mb(bytes));
        }
    }

    /// Sample this process's resident memory. No-op when unavailable.
    pub fn record_memory_usage(&self) {
        if let Some(bytes) = current_process_memory() {
            self.record_memory_sample(bytes);
        }
    }

    pub fn record_error(&self, category: ErrorCategory) {
        let mut m = self.lock();
        match category {
            ErrorCategory::Compilation => m.errors.compilation_errors += 1,
            ErrorCategory::ProofGeneration => m.errors.proof_generation_errors += 1,
            ErrorCategory::Setup => m.errors.setup_errors += 1,
        }
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = PerformanceMetrics::default();
    }

    /// Render a deterministic text summary of the current metrics.
    pub fn report(&self) -> String {
        let m = self.metrics();
        let mut out = String::new();
        let _ = writeln!(out, "Weather ZK Performance Report");
        let _ = writeln!(out, "=============================");
        let _ = writeln!(out);
        m.compilations.write_report(&mut out, "Compilations");
        let _ = writeln!(out);
        m.proof_generations.write_report(&mut out, "Proof Generations");
        let _ = writeln!(out);
        let _ = writeln!(out, "Memory Usage:");
        let _ = writeln!(out, "  Current: {}", format_mb(m.memory_usage.current));
        let _ = writeln!(out, "  Peak: {}", format_mb(m.memory_usage.peak));
        let _ = writeln!(out, "  Samples: {}", m.memory_usage.samples.len());
        let _ = writeln!(out);
        let _ = writeln!(out, "Errors:");
        let _ = writeln!(out, "  Compilation Errors: {}", m.errors.compilation_errors);
        let _ = writeln!(out, "  Proof Generation Errors: {}", m.errors.proof_generation_errors);
        let _ = writeln!(out, "  Setup Errors: {}", m.errors.setup_errors);
        out
    }
}
