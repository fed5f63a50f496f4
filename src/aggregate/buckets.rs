//! Aggregate bucket records
//!
//! Every bucket is created lazily on first touch with its static fields
//! fixed; afterwards only the counters move, and only upwards.

use crate::probe::Classification;
use serde::{Deserialize, Serialize};

/// Lifetime and rolling-24h candidate counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalCounters {
    pub domains_tracked_lifetime: u64,
    pub domains_tracked_24h: u64,
}

/// Counters shared by the length, TLD-length, and POS-length buckets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedCounters {
    pub tracked_count: u64,
    pub unregistered_found: u64,
    /// Registered but without a website, or parked
    pub unused_found: u64,
}

impl TrackedCounters {
    pub fn record(&mut self, classification: &Classification) {
        self.tracked_count += 1;
        if !classification.registered {
            self.unregistered_found += 1;
        } else if classification.usage_state.is_unused() {
            self.unused_found += 1;
        }
    }
}

/// Progress for one label length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthStat {
    pub length: u32,
    pub total_possible: u64,
    #[serde(flatten)]
    pub counters: TrackedCounters,
}

/// Progress for one label length under one TLD
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TldLengthStat {
    pub tld: String,
    pub length: u32,
    pub total_possible: u64,
    #[serde(flatten)]
    pub counters: TrackedCounters,
}

/// Progress for dictionary words of one part of speech and length
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PosLengthStat {
    pub pos: String,
    pub length: u32,
    pub total_possible: u64,
    #[serde(flatten)]
    pub counters: TrackedCounters,
}

/// Per-TLD totals, with a breakdown for short labels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TldStat {
    pub tld: String,
    pub domains_checked_total: u64,
    pub short_domains_checked_total: u64,
    pub short_unregistered_count: u64,
    pub short_no_website_count: u64,
    pub short_active_site_count: u64,
}

impl TldStat {
    pub fn new(tld: impl Into<String>) -> Self {
        Self {
            tld: tld.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProductState, UsageState};

    #[test]
    fn test_tracked_counters_record() {
        let mut counters = TrackedCounters::default();
        counters.record(&Classification::unregistered());
        counters.record(&Classification::resolver_failure());
        counters.record(&Classification::registered(
            UsageState::ParkedOrPlaceholder,
            ProductState::Unknown,
        ));
        counters.record(&Classification::registered(
            UsageState::ActiveSite,
            ProductState::ActiveProduct,
        ));

        assert_eq!(counters.tracked_count, 4);
        assert_eq!(counters.unregistered_found, 2);
        assert_eq!(counters.unused_found, 1);
    }

    #[test]
    fn test_length_stat_serializes_flat() {
        let stat = LengthStat {
            length: 3,
            total_possible: 17_576,
            counters: TrackedCounters {
                tracked_count: 5,
                unregistered_found: 2,
                unused_found: 1,
            },
        };
        let json = serde_json::to_value(&stat).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "length": 3,
                "total_possible": 17576,
                "tracked_count": 5,
                "unregistered_found": 2,
                "unused_found": 1
            })
        );
    }
}
