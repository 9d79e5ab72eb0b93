//! Memory-adaptive throttling for crawl batches.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use sysinfo::System;
use tracing::{debug, warn};

/// How often memory is re-checked while paused.
const CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Longest a single fetch waits for memory to free up before going ahead anyway.
const MAX_WAIT: Duration = Duration::from_secs(120);

/// Pauses new fetches while system memory use is above a threshold.
pub struct MemoryThrottle {
    threshold_percent: Option<f64>,
    interval: Duration,
    max_wait: Duration,
    system: Mutex<System>,
}

impl MemoryThrottle {
    /// Throttle when used memory exceeds `threshold_percent` of total memory.
    pub fn new(threshold_percent: f64) -> Self {
        Self {
            threshold_percent: Some(threshold_percent),
            interval: CHECK_INTERVAL,
            max_wait: MAX_WAIT,
            system: Mutex::new(System::new()),
        }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self {
            threshold_percent: None,
            ..Self::new(100.0)
        }
    }

    /// Override the re-check interval and wait cap.
    pub fn with_timing(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.interval = interval;
        self.max_wait = max_wait;
        self
    }

    pub fn threshold_percent(&self) -> Option<f64> {
        self.threshold_percent
    }

    /// Current used-memory percentage, `None` if it cannot be determined.
    pub fn usage_percent(&self) -> Option<f64> {
        let mut system = self.system.lock().ok()?;
        system.refresh_memory();
        let total = system.total_memory();
        if total == 0 {
            return None;
        }
        Some(system.used_memory() as f64 / total as f64 * 100.0)
    }

    /// Wait until memory use drops to the threshold (or the wait cap passes).
    pub async fn wait_for_headroom(&self) {
        let Some(threshold) = self.threshold_percent else {
            return;
        };
        let started = Instant::now();

        loop {
            let usage = match self.usage_percent() {
                Some(usage) if usage > threshold => usage,
                _ => return,
            };
            if started.elapsed() >= self.max_wait {
                warn!(usage, threshold, "memory still above threshold, continuing");
                return;
            }
            debug!(usage, threshold, "memory above threshold, pausing");
            tokio::time::sleep(self.interval).await;
        }
    }
}

impl std::fmt::Debug for MemoryThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryThrottle")
            .field("threshold_percent", &self.threshold_percent)
            .field("interval", &self.interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_throttle_never_waits() {
        let throttle = MemoryThrottle::disabled();
        assert_eq!(throttle.threshold_percent(), None);
        tokio::time::timeout(Duration::from_millis(100), throttle.wait_for_headroom())
            .await
            .expect("no wait");
    }

    #[tokio::test]
    async fn generous_threshold_passes_immediately() {
        let throttle = MemoryThrottle::new(100.0);
        tokio::time::timeout(Duration::from_millis(500), throttle.wait_for_headroom())
            .await
            .expect("no wait");
    }

    #[tokio::test]
    async fn wait_is_capped() {
        let throttle = MemoryThrottle::new(0.0)
            .with_timing(Duration::from_millis(10), Duration::from_millis(30));
        tokio::time::timeout(Duration::from_secs(2), throttle.wait_for_headroom())
            .await
            .expect("wait cap reached");
    }

    #[test]
    fn usage_is_a_percentage() {
        if let Some(usage) = MemoryThrottle::new(70.0).usage_percent() {
            assert!((0.0..=100.0).contains(&usage));
        }
    }
}
