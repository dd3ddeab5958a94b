use std::path::PathBuf;
use std::time::Duration;

pub const BASE_URL: &str = "http://jewornotjew.com";
pub const DATA_DIR: &str = "data";
pub const DB_PATH: &str = "data/profiles.sqlite";

/// Highest profile id requested; ids are sparse so the range overshoots.
pub const MAX_ID: u32 = 10_000;
/// Number of profiles the site lists. The sweep stops once this many were found.
pub const TARGET_PROFILES: u64 = 3622;
pub const CONCURRENCY: usize = 10;
pub const DISPATCH_INTERVAL_MS: u64 = 10;
pub const TIMEOUT_SECS: u64 = 30;
pub const PROGRESS_TICK_MS: u64 = 250;
pub const LOG_CHANNEL_CAPACITY: usize = 100;

/// Everything a harvest run needs to know up front.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub start_id: u32,
    pub end_id: u32,
    pub target: u64,
    pub concurrency: usize,
    pub dispatch_interval: Duration,
    pub timeout: Duration,
    pub incremental: bool,
    pub show_progress: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            data_dir: PathBuf::from(DATA_DIR),
            start_id: 1,
            end_id: MAX_ID,
            target: TARGET_PROFILES,
            concurrency: CONCURRENCY,
            dispatch_interval: Duration::from_millis(DISPATCH_INTERVAL_MS),
            timeout: Duration::from_secs(TIMEOUT_SECS),
            incremental: false,
            show_progress: true,
        }
    }
}

impl HarvestConfig {
    /// Reject settings that would make the sweep hang or do nothing useful.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.concurrency > 0, "concurrency must be at least 1");
        anyhow::ensure!(
            self.start_id <= self.end_id,
            "start id {} is past end id {}",
            self.start_id,
            self.end_id
        );
        anyhow::ensure!(!self.dispatch_interval.is_zero(), "dispatch interval must be non-zero");
        anyhow::ensure!(!self.base_url.is_empty(), "base url is empty");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(HarvestConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_range_and_zero_workers() {
        let mut c = HarvestConfig::default();
        c.start_id = 10;
        c.end_id = 5;
        assert!(c.validate().is_err());

        let mut c = HarvestConfig::default();
        c.concurrency = 0;
        assert!(c.validate().is_err());
    }
}
