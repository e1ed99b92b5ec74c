//! System sampling: CPU, memory and network totals for the host.

use parking_lot::Mutex;
use sysinfo::{Networks, System};

/// One reading of host-level gauges
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SystemSample {
    /// Global CPU usage, percent
    pub cpu_usage: f64,
    /// Used memory as a percent of total
    pub memory_usage: f64,
    pub memory_used_bytes: u64,
    pub network_rx_bytes: u64,
    pub network_tx_bytes: u64,
}

/// Source of host samples for the metrics collector
pub trait SystemSampler: Send + Sync {
    fn sample(&self) -> SystemSample;
}

/// Host sampler backed by `sysinfo`
pub struct SysinfoSampler {
    system: Mutex<System>,
    networks: Mutex<Networks>,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SysinfoSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoSampler").finish_non_exhaustive()
    }
}

impl SystemSampler for SysinfoSampler {
    fn sample(&self) -> SystemSample {
        let (cpu_usage, memory_used_bytes, total_memory) = {
            let mut system = self.system.lock();
            system.refresh_cpu_usage();
            system.refresh_memory();
            (
                f64::from(system.global_cpu_usage()),
                system.used_memory(),
                system.total_memory(),
            )
        };

        let (network_rx_bytes, network_tx_bytes) = {
            let mut networks = self.networks.lock();
            networks.refresh();
            networks.values().fold((0, 0), |(rx, tx), data| {
                (rx + data.total_received(), tx + data.total_transmitted())
            })
        };

        let memory_usage = if total_memory == 0 {
            0.0
        } else {
            memory_used_bytes as f64 / total_memory as f64 * 100.0
        };

        SystemSample {
            cpu_usage,
            memory_usage,
            memory_used_bytes,
            network_rx_bytes,
            network_tx_bytes,
        }
    }
}

/// Fixed readings, for hosts where sampling is unwanted
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticSampler(pub SystemSample);

impl SystemSampler for StaticSampler {
    fn sample(&self) -> SystemSample {
        self.0
    }
}
