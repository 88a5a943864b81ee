//! Timing, memory and error-count telemetry.

pub mod memory;
pub mod monitor;

pub use memory::{MemoryStats, current_process_memory};
pub use monitor::{ErrorCategory, ErrorCounts, OperationStats, PerformanceMetrics, PerformanceMonitor};
