use chrono::{DateTime, Duration, Utc};

use crate::config::ScanConfig;
use crate::models::Item;

/// What a page visit should do with a reconciled item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDecision {
    /// Queue a deep scan and show the loading state meanwhile.
    Enqueue,
    /// Render straight from the cached record.
    RenderCached,
}

#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy {
    rescan_interval: Duration,
}

impl StalenessPolicy {
    pub fn new(rescan_interval: Duration) -> Self {
        Self { rescan_interval }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.rescan_interval())
    }

    /// Never scanned, or last scanned strictly longer ago than the interval.
    pub fn needs_deep_scan(&self, item: &Item, now: DateTime<Utc>) -> bool {
        match item.last_scan_date {
            None => true,
            Some(last_scan) => now - last_scan > self.rescan_interval,
        }
    }

    pub fn decide(&self, item: &Item, now: DateTime<Utc>, already_queued: bool) -> ScanDecision {
        if !already_queued && self.needs_deep_scan(item, now) {
            ScanDecision::Enqueue
        } else {
            ScanDecision::RenderCached
        }
    }
}
