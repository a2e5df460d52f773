use crate::{
    logging,
    system::{MetricType, SystemRuleManager},
    utils::PeriodicTask,
    Error, Result,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;
use sysinfo::{get_current_pid, ProcessExt, ProcessorExt, System, SystemExt};

pub const DEFAULT_SYSTEM_INTERVAL_MS: u64 = 1000;

const NOT_SAMPLED: f64 = -1.0;

/// SystemStatus holds the last sampled system load and CPU usage.
/// Both read as -1 until the first successful sample.
#[derive(Debug)]
pub struct SystemStatus {
    load: AtomicU64,
    cpu_usage: AtomicU64,
}

impl Default for SystemStatus {
    fn default() -> Self {
        SystemStatus {
            load: AtomicU64::new(NOT_SAMPLED.to_bits()),
            cpu_usage: AtomicU64::new(NOT_SAMPLED.to_bits()),
        }
    }
}

impl SystemStatus {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn current_load(&self) -> f64 {
        f64::from_bits(self.load.load(Ordering::Relaxed))
    }

    pub fn set_load(&self, load: f64) {
        self.load.store(load.to_bits(), Ordering::Relaxed)
    }

    /// CPU usage as a fraction in [0.0, 1.0]
    #[inline]
    pub fn current_cpu_usage(&self) -> f64 {
        f64::from_bits(self.cpu_usage.load(Ordering::Relaxed))
    }

    pub fn set_cpu_usage(&self, usage: f64) {
        self.cpu_usage.store(usage.to_bits(), Ordering::Relaxed)
    }
}

/// Where the collector samples system load and CPU usage from.
pub trait SystemMetricSource: Send + Sync {
    /// one minute load average
    fn load_average(&self) -> Result<f64>;
    /// CPU usage as a fraction in [0.0, 1.0]
    fn cpu_usage(&self) -> Result<f64>;
}

/// The default source backed by `sysinfo`.
/// The CPU usage is the larger one of the machine's usage and this process's usage over all cores.
pub struct SysinfoMetricSource {
    system: Mutex<System>,
}

impl Default for SysinfoMetricSource {
    fn default() -> Self {
        SysinfoMetricSource {
            system: Mutex::new(System::new()),
        }
    }
}

impl SysinfoMetricSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SystemMetricSource for SysinfoMetricSource {
    fn load_average(&self) -> Result<f64> {
        let system = self
            .system
            .lock()
            .map_err(|_| Error::msg("system info lock poisoned"))?;
        let load = system.load_average().one;
        if load.is_nan() || load < 0.0 {
            return Err(Error::msg("load average unavailable"));
        }
        Ok(load)
    }

    fn cpu_usage(&self) -> Result<f64> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| Error::msg("system info lock poisoned"))?;
        system.refresh_cpu();
        let machine = system.global_processor_info().cpu_usage() as f64 / 100.0;
        let cores = system.processors().len().max(1) as f64;
        let pid = get_current_pid().map_err(Error::msg)?;
        let process = if system.refresh_process(pid) {
            system
                .process(pid)
                .map(|p| p.cpu_usage() as f64 / 100.0 / cores)
                .unwrap_or(0.0)
        } else {
            0.0
        };
        Ok(machine.max(process).clamp(0.0, 1.0))
    }
}

/// SystemStatusCollector samples the source periodically into the `SystemStatus`.
/// A failed sample keeps the previous value.
#[derive(Debug)]
pub struct SystemStatusCollector {
    task: PeriodicTask,
}

impl SystemStatusCollector {
    pub fn start(
        interval: Duration,
        source: Arc<dyn SystemMetricSource>,
        status: Arc<SystemStatus>,
        rules: Arc<SystemRuleManager>,
    ) -> Result<Self> {
        let task = PeriodicTask::spawn("sentinel-system-status", interval, move || {
            sample(source.as_ref(), &status, &rules)
        })?;
        logging::info!(
            "[SystemStatusCollector] Started, sampling every {}ms",
            interval.as_millis()
        );
        Ok(SystemStatusCollector { task })
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    pub fn stop(&mut self) {
        if self.task.is_running() {
            self.task.stop();
            logging::info!("[SystemStatusCollector] Stopped");
        }
    }
}

fn sample(source: &dyn SystemMetricSource, status: &SystemStatus, rules: &SystemRuleManager) {
    match source.load_average() {
        Ok(load) => status.set_load(load),
        Err(err) => logging::warn!(
            "[SystemStatusCollector] Failed to retrieve current system load, keep the last one: {:?}",
            err
        ),
    }
    match source.cpu_usage() {
        Ok(usage) => status.set_cpu_usage(usage),
        Err(err) => logging::warn!(
            "[SystemStatusCollector] Failed to retrieve current CPU usage, keep the last one: {:?}",
            err
        ),
    }
    if let Some(threshold) = rules.thresholds().threshold(MetricType::Load) {
        let load = status.current_load();
        if load > threshold {
            logging::info!(
                "[SystemStatusCollector] Load exceeds the threshold {}, load: {}, cpu usage: {}",
                threshold,
                load,
                status.current_cpu_usage()
            );
        }
    }
}

#[cfg(test)]
pub(crate) use test::MockMetricSource;
