//! Resource gate run by each worker before it starts a file.
//!
//! The gate polls free memory and CPU usage and lets the worker through
//! once `free >= min_free_mem` and `cpu <= max_cpu`. While blocked it
//! sleeps with exponential backoff (1 s doubling to a 10 s cap) and logs
//! once per stall. Cancellation ends the wait with `Cancelled`.

use std::time::{Duration, Instant};

use log::{debug, info};
use parking_lot::Mutex;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};

use crate::cancel::CancellationToken;
use crate::error::CoreResult;

pub const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Source of memory and CPU readings.
pub trait SystemProbe: Send + Sync {
    /// Available memory in bytes.
    fn free_memory(&self) -> u64;
    /// Global CPU usage in percent.
    fn cpu_percent(&self) -> f64;
}

/// Readings from the running system via `sysinfo`.
///
/// CPU usage is a delta between two refreshes, so the constructor takes a
/// baseline sample and every reading waits until at least
/// `MINIMUM_CPU_UPDATE_INTERVAL` has passed since the previous refresh.
pub struct SysinfoProbe {
    state: Mutex<ProbeState>,
}

struct ProbeState {
    system: System,
    last_cpu_refresh: Instant,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        Self {
            state: Mutex::new(ProbeState {
                system,
                last_cpu_refresh: Instant::now(),
            }),
        }
    }
}

/// Time still to wait before a CPU refresh yields a meaningful delta.
fn cpu_settle_delay(since_refresh: Duration) -> Duration {
    MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(since_refresh)
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemProbe for SysinfoProbe {
    fn free_memory(&self) -> u64 {
        let mut state = self.state.lock();
        state.system.refresh_memory();
        state.system.available_memory()
    }

    fn cpu_percent(&self) -> f64 {
        let mut state = self.state.lock();
        let delay = cpu_settle_delay(state.last_cpu_refresh.elapsed());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        state.system.refresh_cpu_usage();
        state.last_cpu_refresh = Instant::now();
        f64::from(state.system.global_cpu_usage())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ResourceGate {
    pub min_free_mem: u64,
    pub max_cpu: f64,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ResourceGate {
    pub fn new(min_free_mem: u64, max_cpu: f64) -> Self {
        Self {
            min_free_mem,
            max_cpu,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_BACKOFF,
        }
    }

    /// True when neither limit can ever block.
    pub fn is_open(&self) -> bool {
        self.min_free_mem == 0 && self.max_cpu > 100.0
    }

    /// Blocks until resources are available or `cancel` fires.
    pub fn wait(&self, probe: &dyn SystemProbe, cancel: &CancellationToken) -> CoreResult<()> {
        cancel.check()?;
        if self.is_open() {
            return Ok(());
        }

        let mut backoff = self.initial_backoff;
        let mut logged = false;
        loop {
            let free = probe.free_memory();
            let cpu = if self.max_cpu > 100.0 { 0.0 } else { probe.cpu_percent() };
            if free >= self.min_free_mem && cpu <= self.max_cpu {
                if logged {
                    debug!("Resources available again ({} MiB free, {:.0}% CPU)", free >> 20, cpu);
                }
                return Ok(());
            }
            if !logged {
                info!(
                    "Waiting for resources: {} MiB free (need {} MiB), CPU {:.0}% (limit {:.0}%)",
                    free >> 20,
                    self.min_free_mem >> 20,
                    cpu,
                    self.max_cpu
                );
                logged = true;
            }
            cancel.sleep(backoff)?;
            backoff = (backoff * 2).min(self.max_backoff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::FixedSystemProbe;
    use std::sync::Arc;
    use std::thread;

    fn fast_gate(min_free_mem: u64, max_cpu: f64) -> ResourceGate {
        ResourceGate {
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            ..ResourceGate::new(min_free_mem, max_cpu)
        }
    }

    #[test]
    fn default_limits_never_block_or_poll() {
        let probe = FixedSystemProbe::new(0, 100.0);
        let gate = ResourceGate::new(0, 101.0);
        gate.wait(&probe, &CancellationToken::new()).unwrap();
        assert_eq!(probe.polls(), 0);
    }

    #[test]
    fn passes_when_limits_are_met() {
        let probe = FixedSystemProbe::new(8 << 30, 20.0);
        fast_gate(1 << 30, 50.0)
            .wait(&probe, &CancellationToken::new())
            .unwrap();
        assert_eq!(probe.polls(), 1);
    }

    #[test]
    fn cancellation_ends_a_blocked_wait() {
        let probe = Arc::new(FixedSystemProbe::new(1 << 20, 10.0));
        let cancel = CancellationToken::new();
        let gate = fast_gate(1 << 40, 101.0);

        let handle = {
            let probe = Arc::clone(&probe);
            let cancel = cancel.clone();
            thread::spawn(move || gate.wait(probe.as_ref(), &cancel))
        };
        thread::sleep(Duration::from_millis(60));
        cancel.cancel();

        let result = handle.join().unwrap();
        assert!(result.unwrap_err().is_cancelled());
        assert!(probe.polls() >= 2);
    }

    #[test]
    fn cpu_readings_wait_out_the_update_interval() {
        assert_eq!(cpu_settle_delay(Duration::ZERO), MINIMUM_CPU_UPDATE_INTERVAL);
        assert!(cpu_settle_delay(MINIMUM_CPU_UPDATE_INTERVAL).is_zero());
        assert!(cpu_settle_delay(MINIMUM_CPU_UPDATE_INTERVAL * 2).is_zero());

        let probe = SysinfoProbe::new();
        let started = Instant::now();
        let cpu = probe.cpu_percent();
        assert!(started.elapsed() + Duration::from_millis(5) >= MINIMUM_CPU_UPDATE_INTERVAL);
        assert!((0.0..=100.0).contains(&cpu), "{cpu}");
    }
}
