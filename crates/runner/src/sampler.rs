//! Background resource sampling of a running process.

use crate::result::ResourceSample;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Kernel clock ticks per second used by `/proc/<pid>/stat` (USER_HZ).
const CLOCK_TICKS_PER_SEC: f64 = 100.0;

/// Polls CPU and memory of one process on a background thread.
///
/// The thread is always stopped and joined, either by [`stop`](Self::stop)
/// or on drop, so a sampler never outlives the run that created it.
pub struct ResourceSampler {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<Vec<ResourceSample>>>,
}

impl ResourceSampler {
    pub fn start(pid: u32, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(format!("sampler-{}", pid))
            .spawn(move || {
                let started = Instant::now();
                let mut samples = Vec::new();
                let mut last = read_cpu_ticks(pid).map(|ticks| (ticks, Instant::now()));

                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        _ => break,
                    }

                    let Some(ticks) = read_cpu_ticks(pid) else {
                        // Process already exited.
                        break;
                    };
                    let now = Instant::now();
                    let cpu_percent = match last {
                        Some((prev_ticks, prev_at)) => {
                            let wall = now.duration_since(prev_at).as_secs_f64();
                            if wall > 0.0 {
                                (ticks.saturating_sub(prev_ticks) as f64 / CLOCK_TICKS_PER_SEC)
                                    / wall
                                    * 100.0
                            } else {
                                0.0
                            }
                        }
                        None => 0.0,
                    };
                    last = Some((ticks, now));

                    samples.push(ResourceSample {
                        elapsed_ms: started.elapsed().as_millis() as u64,
                        cpu_percent,
                        memory_mb: read_rss_mb(pid).unwrap_or(0.0),
                    });
                }
                samples
            });

        match handle {
            Ok(handle) => Self {
                stop_tx: Some(stop_tx),
                handle: Some(handle),
            },
            Err(e) => {
                tracing::warn!(error = %e, pid, "could not start resource sampler");
                Self {
                    stop_tx: None,
                    handle: None,
                }
            }
        }
    }

    /// Stop sampling and collect what was observed.
    pub fn stop(mut self) -> Vec<ResourceSample> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Vec<ResourceSample> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                tracing::warn!("resource sampler thread panicked");
                Vec::new()
            }),
            None => Vec::new(),
        }
    }
}

impl Drop for ResourceSampler {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// utime + stime of a process, in clock ticks.
#[cfg(target_os = "linux")]
fn read_cpu_ticks(pid: u32) -> Option<u64> {
    let stat = std::fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    // The command name may contain spaces; fields resume after the last ')'.
    let rest = &stat[stat.rfind(')')? + 1..];
    let fields: Vec<&str> = rest.split_whitespace().collect();
    // rest starts at field 3 (state); utime and stime are fields 14 and 15.
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

#[cfg(not(target_os = "linux"))]
fn read_cpu_ticks(_pid: u32) -> Option<u64> {
    None
}

#[cfg(target_os = "linux")]
fn read_rss_mb(pid: u32) -> Option<f64> {
    let status = std::fs::read_to_string(format!("/proc/{}/status", pid)).ok()?;
    status
        .lines()
        .find(|line| line.starts_with("VmRSS:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|kb| kb.parse::<f64>().ok())
        .map(|kb| kb / 1024.0)
}

#[cfg(not(target_os = "linux"))]
fn read_rss_mb(_pid: u32) -> Option<f64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn test_samples_own_process() {
        let sampler = ResourceSampler::start(std::process::id(), Duration::from_millis(10));
        thread::sleep(Duration::from_millis(80));
        let samples = sampler.stop();
        assert!(!samples.is_empty());
        assert!(samples.iter().all(|s| s.memory_mb > 0.0));
        assert!(samples.windows(2).all(|w| w[0].elapsed_ms <= w[1].elapsed_ms));
    }

    #[test]
    fn test_stop_on_missing_process_returns_quickly() {
        let sampler = ResourceSampler::start(u32::MAX, Duration::from_millis(5));
        let started = Instant::now();
        thread::sleep(Duration::from_millis(20));
        let samples = sampler.stop();
        assert!(samples.is_empty());
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
