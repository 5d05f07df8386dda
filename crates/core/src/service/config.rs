use std::time::Duration;

/// Worker ceiling used when nothing valid is configured.
pub const DEFAULT_WORKERS: u32 = 5;

/// Artificial per-unit delay of the locked variant.
pub const DEFAULT_LOCK_DELAY: Duration = Duration::from_secs(5);

/// Bound on concurrent background cache refreshes.
pub const DEFAULT_REFRESH_MAX_INFLIGHT: usize = 64;

/// Engine settings for one record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertConfig {
    /// Maximum number of concurrently active units per batch. Always at least 1.
    pub workers: u32,
    /// Sleep inserted in every unit of the locked variant.
    pub lock_delay: Duration,
}

impl Default for UpsertConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            lock_delay: DEFAULT_LOCK_DELAY,
        }
    }
}

impl UpsertConfig {
    pub fn with_workers(mut self, workers: u32) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_lock_delay(mut self, lock_delay: Duration) -> Self {
        self.lock_delay = lock_delay;
        self
    }
}

/// Parses a worker ceiling from a raw setting.
///
/// Missing or non-numeric values give [`DEFAULT_WORKERS`]; zero is raised to 1.
pub fn parse_workers(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .map(|workers| workers.max(1))
        .unwrap_or(DEFAULT_WORKERS)
}
