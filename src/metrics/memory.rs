//! Process memory samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Number of samples kept in the rolling buffer.
pub const MEMORY_SAMPLE_CAPACITY: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Most recent sample, in bytes
    pub current: u64,
    /// Largest sample seen since the last reset, in bytes
    pub peak: u64,
    /// Rolling window of recent samples, oldest first
    pub samples: VecDeque<u64>,
}

impl MemoryStats {
    pub fn record(&mut self, bytes: u64) {
        self.current = bytes;
        self.peak = self.peak.max(bytes);
        if self.samples.len() == MEMORY_SAMPLE_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(bytes);
    }
}

/// Resident memory of the current process in bytes.
#[cfg(feature = "mem")]
pub fn current_process_memory() -> Option<u64> {
    use sysinfo::{ProcessRefreshKind, RefreshKind, System};

    let pid = sysinfo::get_current_pid().ok()?;
    let mut sys = System::new_with_specifics(
        RefreshKind::new().with_processes(ProcessRefreshKind::new().with_memory()),
    );
    sys.refresh_process(pid);
    sys.process(pid).map(|p| p.memory())
}

#[cfg(not(feature = "mem"))]
pub fn current_process_memory() -> Option<u64> {
    None
}

pub fn format_mb(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / 1024.0 / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_are_capped() {
        let mut stats = MemoryStats::default();
        for i in 0..(MEMORY_SAMPLE_CAPACITY as u64 + 20) {
            stats.record(i);
        }
        assert_eq!(stats.samples.len(), MEMORY_SAMPLE_CAPACITY);
        assert_eq!(stats.samples.front(), Some(&20));
        assert_eq!(stats.current, MEMORY_SAMPLE_CAPACITY as u64 + 19);
    }

    #[test]
    fn test_peak_survives_lower_samples() {
        let mut stats = MemoryStats::default();
        stats.record(500);
        stats.record(100);
        assert_eq!(stats.peak, 500);
        assert_eq!(stats.current, 100);
    }

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(3 * 1024 * 1024), "3.00MB");
    }

    #[cfg(feature = "mem")]
    #[test]
    fn test_current_process_memory_is_nonzero() {
        let bytes = current_process_memory().unwrap_or(0);
        assert!(bytes > 0);
    }
}
