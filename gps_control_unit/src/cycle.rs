//! Tick pacing and realtime process setup.
//!
//! ## RT Setup Sequence
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)`
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to the configured core.
//! 4. `sched_setscheduler(SCHED_FIFO, priority)`.
//!
//! All four are no-ops without the `rt` feature.
//!
//! ## Pacing
//! With `rt`: absolute-time `clock_nanosleep` on `CLOCK_MONOTONIC`.
//! Without: `std::thread::sleep` for the remainder of the period.
//! The runner checks its `running` flag between ticks only.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use gps_common::fault::ControllerFault;

use crate::control_loop::TickOutcome;
use crate::host::PluginAdapter;
use crate::topology::{ActuatorInterface, TopologyProvider};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick statistics, no allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleStats {
    pub tick_count: u64,
    pub last_tick_ns: i64,
    pub min_tick_ns: i64,
    pub max_tick_ns: i64,
    pub sum_tick_ns: i64,
    /// Ticks whose body took longer than the period.
    pub overruns: u64,
    /// Largest wake-up latency seen [ns].
    pub max_latency_ns: i64,
    pub control_steps: u64,
    /// Ticks with at least one sensor fault.
    pub sensor_fault_ticks: u64,
    /// Control steps with an invalid controller output.
    pub controller_fault_steps: u64,
    /// Control steps with clamped output.
    pub saturated_steps: u64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            tick_count: 0,
            last_tick_ns: 0,
            min_tick_ns: i64::MAX,
            max_tick_ns: 0,
            sum_tick_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
            control_steps: 0,
            sensor_fault_ticks: 0,
            controller_fault_steps: 0,
            saturated_steps: 0,
        }
    }

    /// Record tick timing.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        self.min_tick_ns = self.min_tick_ns.min(duration_ns);
        self.max_tick_ns = self.max_tick_ns.max(duration_ns);
        self.sum_tick_ns += duration_ns;
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Record what the tick did.
    #[inline]
    pub fn record_outcome(&mut self, outcome: &TickOutcome) {
        if outcome.control_step {
            self.control_steps += 1;
            if outcome.controller_faults.is_invalid() {
                self.controller_fault_steps += 1;
            }
            if outcome.controller_faults.contains(ControllerFault::SATURATED) {
                self.saturated_steps += 1;
            }
        }
        if !outcome.sensor_faults.is_empty() {
            self.sensor_fault_ticks += 1;
        }
    }

    /// Average tick time [ns], 0 before the first tick.
    #[inline]
    pub fn avg_tick_ns(&self) -> i64 {
        if self.tick_count == 0 {
            0
        } else {
            self.sum_tick_ns / self.tick_count as i64
        }
    }
}

// ─── RT Setup ───────────────────────────────────────────────────────

/// Runner and RT setup errors.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("RT setup error: {0}")]
    RtSetup(String),

    #[error("tick overrun: {actual_ns}ns > {budget_ns}ns budget")]
    Overrun { actual_ns: i64, budget_ns: i64 },
}

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 512 KiB of stack so the tick never page-faults on it.
fn prefault_stack() {
    let mut buf = [0u8; 512 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xA5) };
    }
    core::hint::black_box(&buf);
}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` is a valid sched_param; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Prepare the calling thread for realtime ticks.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Plant ──────────────────────────────────────────────────────────

/// A robot the runner advances by one period after each tick.
///
/// Hardware backends whose clock runs on its own implement this as a no-op.
pub trait Plant {
    fn advance(&mut self, dt: Duration);
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Paces [`PluginAdapter::tick`] at a fixed period.
pub struct CycleRunner {
    period: Duration,
    running: Arc<AtomicBool>,
    max_ticks: Option<u64>,
    /// Abort on the first overrun instead of counting it.
    strict_deadline: bool,
    stats: CycleStats,
}

impl CycleRunner {
    pub fn new(period: Duration, running: Arc<AtomicBool>) -> Self {
        Self {
            period,
            running,
            max_ticks: None,
            strict_deadline: false,
            stats: CycleStats::new(),
        }
    }

    /// Stop on its own after `n` ticks.
    pub fn with_max_ticks(mut self, n: Option<u64>) -> Self {
        self.max_ticks = n;
        self
    }

    pub fn with_strict_deadline(mut self, strict: bool) -> Self {
        self.strict_deadline = strict;
        self
    }

    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.max_ticks.is_none_or(|n| self.stats.tick_count < n)
    }

    fn after_tick(&mut self, outcome: &TickOutcome, duration_ns: i64, latency_ns: i64) -> Result<(), CycleError> {
        self.stats.record(duration_ns, latency_ns);
        self.stats.record_outcome(outcome);
        let budget_ns = self.period.as_nanos() as i64;
        if duration_ns > budget_ns {
            self.stats.overruns += 1;
            if self.strict_deadline {
                return Err(CycleError::Overrun {
                    actual_ns: duration_ns,
                    budget_ns,
                });
            }
            if self.stats.overruns == 1 {
                warn!("first tick overrun: {duration_ns}ns > {budget_ns}ns");
            }
        }
        Ok(())
    }

    /// Run until the `running` flag clears or `max_ticks` is reached.
    pub fn run<R>(&mut self, host: &mut PluginAdapter<R>) -> Result<(), CycleError>
    where
        R: TopologyProvider + ActuatorInterface + Plant,
    {
        info!("Entering tick loop, period {:?}", self.period);

        #[cfg(feature = "rt")]
        let result = self.run_rt_loop(host);

        #[cfg(not(feature = "rt"))]
        let result = self.run_sim_loop(host);

        info!(
            "Tick loop exited: {} ticks, {} control steps, avg {}ns, max {}ns, {} overruns",
            self.stats.tick_count,
            self.stats.control_steps,
            self.stats.avg_tick_ns(),
            self.stats.max_tick_ns,
            self.stats.overruns
        );
        result
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop<R>(&mut self, host: &mut PluginAdapter<R>) -> Result<(), CycleError>
    where
        R: TopologyProvider + ActuatorInterface + Plant,
    {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let period_ns = self.period.as_nanos() as i64;
        let mut next_wake = now()?;

        while self.should_continue() {
            next_wake = timespec_add_ns(next_wake, period_ns);

            let start = now()?;
            let time = host.robot().time();
            let outcome = host.tick(time);
            let end = now()?;

            host.robot_mut().advance(self.period);

            let latency_ns = timespec_diff_ns(&start, &next_wake).abs();
            self.after_tick(&outcome, timespec_diff_ns(&end, &start), latency_ns)?;

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
        }
        Ok(())
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop<R>(&mut self, host: &mut PluginAdapter<R>) -> Result<(), CycleError>
    where
        R: TopologyProvider + ActuatorInterface + Plant,
    {
        use std::time::Instant;

        while self.should_continue() {
            let start = Instant::now();
            let time = host.robot().time();
            let outcome = host.tick(time);
            host.robot_mut().advance(self.period);
            let elapsed = start.elapsed();

            self.after_tick(&outcome, elapsed.as_nanos() as i64, 0)?;

            if let Some(remaining) = self.period.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(())
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let total = ts.tv_nsec() + ns;
    TimeSpec::new(
        ts.tv_sec() + total.div_euclid(1_000_000_000),
        total.rem_euclid(1_000_000_000),
    )
}

#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}
