//! Host resource sampling.
//!
//! CPU load is the 1-minute load average relative to the logical core count;
//! memory utilization is used over total physical memory. Both are
//! percentages rounded to two decimals and resampled on every export tick.

use std::sync::Mutex;

use sysinfo::System;

/// One point-in-time reading of host resource usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

/// Source of host usage readings.
pub trait HostSampler: Send + Sync {
    fn sample(&self) -> HostUsage;
}

/// Samples the real host through `sysinfo`.
pub struct SysinfoSampler {
    system: Mutex<System>,
    cores: usize,
}

impl SysinfoSampler {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
            cores: num_cpus::get(),
        }
    }
}

impl Default for SysinfoSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSampler for SysinfoSampler {
    fn sample(&self) -> HostUsage {
        let load = System::load_average();

        let mut system = match self.system.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("System sampler mutex was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        system.refresh_memory();

        HostUsage {
            cpu_percent: cpu_percent(load.one, self.cores),
            memory_percent: memory_percent(system.used_memory(), system.total_memory()),
        }
    }
}

/// Load average as a percentage of available cores.
pub fn cpu_percent(load_one: f64, cores: usize) -> f64 {
    if cores == 0 {
        return 0.0;
    }
    round2(load_one / cores as f64 * 100.0)
}

/// Used memory as a percentage of total memory.
pub fn memory_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(used as f64 / total as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
