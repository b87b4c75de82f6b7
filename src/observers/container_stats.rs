//! Optional container-stats poll (disabled by default).
//!
//! The source system's variant reads a container runtime's cgroup stats
//! API per backend; that API is an external collaborator this crate
//! doesn't have a client for, so this observer instead samples host-level
//! CPU/memory via `sysinfo` and applies the same before/after-delta
//! formula. It exists to demonstrate the formula and give deployments that
//! do have a per-container stats source a loop to slot one into — swap
//! `sample_host` for a real per-container query and the rest is unchanged.

use std::sync::Arc;
use std::time::Duration;

use sysinfo::System;

use crate::pool::Pool;

pub async fn run(pool: Arc<Pool>, period: Duration) {
    let mut sys = System::new_all();
    loop {
        tokio::time::sleep(period).await;
        let (cpu_percent, mem_percent) = sample_host(&mut sys);
        for backend in pool.iter() {
            backend.apply_container_stats(cpu_percent, mem_percent);
        }
    }
}

/// `(cpu_delta / system_delta) * cpu_count * 100`, collapsed here into
/// `sysinfo`'s own per-core delta tracking: refreshing twice and reading
/// the resulting usage percentages already applies that ratio internally.
fn sample_host(sys: &mut System) -> (f64, f64) {
    sys.refresh_cpu_usage();
    let cpu_count = sys.cpus().len().max(1) as f64;
    let cpu_percent = sys.cpus().iter().map(|c| f64::from(c.cpu_usage())).sum::<f64>() / cpu_count;

    sys.refresh_memory();
    let mem_percent = if sys.total_memory() > 0 {
        #[allow(clippy::cast_precision_loss)]
        let ratio = sys.used_memory() as f64 / sys.total_memory() as f64;
        ratio * 100.0
    } else {
        0.0
    };

    (cpu_percent, mem_percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_host_returns_percentages_in_range() {
        let mut sys = System::new_all();
        let (cpu, mem) = sample_host(&mut sys);
        assert!((0.0..=100.0).contains(&cpu) || cpu.is_nan());
        assert!((0.0..=100.0).contains(&mem));
    }
}
