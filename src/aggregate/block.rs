//! Per-block accumulator

use super::buckets::{
    GlobalCounters, LengthStat, PosLengthStat, TldLengthStat, TldStat, TrackedCounters,
};
use super::payload::BlockPayload;
use crate::label::space_size;
use crate::probe::{Classification, ProductState, UsageState};
use crate::state::Candidate;
use crate::words::PartOfSpeech;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Block-level tallies that feed the summary line but not the payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockTally {
    pub candidates: u64,
    pub registered: u64,
    pub resolver_errors: u64,
    pub active_sites: u64,
    pub active_products: u64,
    pub by_length: BTreeMap<u32, u64>,
}

/// Mutable accumulator for one block of classifications
///
/// All counters are additive, so feeding the same outcomes in any order
/// produces the same aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAggregate {
    charset_len: usize,
    short_max_length: u32,
    global: GlobalCounters,
    length_stats: BTreeMap<u32, LengthStat>,
    tld_length_stats: BTreeMap<(String, u32), TldLengthStat>,
    tld_stats: BTreeMap<String, TldStat>,
    pos_length_stats: BTreeMap<(PartOfSpeech, u32), PosLengthStat>,
    tally: BlockTally,
}

impl BlockAggregate {
    /// Creates an empty aggregate
    ///
    /// `charset_len` sizes the `total_possible` of new buckets and
    /// `short_max_length` bounds the short-label TLD counters.
    pub fn new(charset_len: usize, short_max_length: u32) -> Self {
        Self {
            charset_len,
            short_max_length,
            global: GlobalCounters::default(),
            length_stats: BTreeMap::new(),
            tld_length_stats: BTreeMap::new(),
            tld_stats: BTreeMap::new(),
            pos_length_stats: BTreeMap::new(),
            tally: BlockTally::default(),
        }
    }

    /// Folds one probed candidate into the aggregate
    pub fn update(
        &mut self,
        candidate: &Candidate,
        classification: &Classification,
        track_length_stats: bool,
        pos: Option<PartOfSpeech>,
    ) {
        let length = candidate.length;

        self.global.domains_tracked_lifetime += 1;
        self.global.domains_tracked_24h += 1;

        if track_length_stats {
            let total_possible = self.total_possible(length);
            self.length_stats
                .entry(length)
                .or_insert_with(|| LengthStat {
                    length,
                    total_possible,
                    counters: TrackedCounters::default(),
                })
                .counters
                .record(classification);

            self.tld_length_stats
                .entry((candidate.tld.clone(), length))
                .or_insert_with(|| TldLengthStat {
                    tld: candidate.tld.clone(),
                    length,
                    total_possible,
                    counters: TrackedCounters::default(),
                })
                .counters
                .record(classification);
        }

        let tld_stat = self
            .tld_stats
            .entry(candidate.tld.clone())
            .or_insert_with(|| TldStat::new(candidate.tld.clone()));
        tld_stat.domains_checked_total += 1;
        if length <= self.short_max_length {
            tld_stat.short_domains_checked_total += 1;
            if !classification.registered {
                tld_stat.short_unregistered_count += 1;
            } else if classification.usage_state.is_unused() {
                tld_stat.short_no_website_count += 1;
            } else if classification.usage_state == UsageState::ActiveSite {
                tld_stat.short_active_site_count += 1;
            }
        }

        if let Some(pos) = pos {
            let total_possible = self.total_possible(length);
            self.pos_length_stats
                .entry((pos, length))
                .or_insert_with(|| PosLengthStat {
                    pos: pos.as_str().to_string(),
                    length,
                    total_possible,
                    counters: TrackedCounters::default(),
                })
                .counters
                .record(classification);
        }

        self.tally.candidates += 1;
        *self.tally.by_length.entry(length).or_insert(0) += 1;
        if classification.registered {
            self.tally.registered += 1;
        }
        if classification.resolver_error {
            self.tally.resolver_errors += 1;
        }
        if classification.usage_state == UsageState::ActiveSite {
            self.tally.active_sites += 1;
        }
        if classification.product_state == ProductState::ActiveProduct {
            self.tally.active_products += 1;
        }
    }

    /// C^length, saturated for word lengths beyond the index range
    fn total_possible(&self, length: u32) -> u64 {
        space_size(self.charset_len, length).unwrap_or(u64::MAX)
    }

    pub fn global(&self) -> GlobalCounters {
        self.global
    }

    pub fn tally(&self) -> &BlockTally {
        &self.tally
    }

    pub fn is_empty(&self) -> bool {
        self.tally.candidates == 0
    }

    pub fn length_stat(&self, length: u32) -> Option<&LengthStat> {
        self.length_stats.get(&length)
    }

    pub fn tld_length_stat(&self, tld: &str, length: u32) -> Option<&TldLengthStat> {
        self.tld_length_stats.get(&(tld.to_string(), length))
    }

    pub fn pos_length_stat(&self, pos: PartOfSpeech, length: u32) -> Option<&PosLengthStat> {
        self.pos_length_stats.get(&(pos, length))
    }

    /// TLD-keyed buckets, sorted by TLD
    pub fn tld_stats(&self) -> impl Iterator<Item = &TldStat> {
        self.tld_stats.values()
    }

    /// Builds the upload payload with every stat list sorted by key
    pub fn to_payload(&self, date: NaiveDate) -> BlockPayload {
        BlockPayload {
            date: date.format("%Y-%m-%d").to_string(),
            global: self.global,
            length_stats: self.length_stats.values().cloned().collect(),
            length_stats_by_tld: self.tld_length_stats.values().cloned().collect(),
            word_pos_stats: self.pos_length_stats.values().cloned().collect(),
        }
    }

    /// Renders the per-length candidate counts, e.g. `L1=12 L2=40`
    pub fn length_breakdown(&self) -> String {
        if self.tally.by_length.is_empty() {
            return "-".to_string();
        }
        self.tally
            .by_length
            .iter()
            .map(|(length, count)| format!("L{}={}", length, count))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::CandidateSource;

    fn short(label: &str, tld: &str) -> Candidate {
        Candidate::new(label, tld, CandidateSource::Short)
    }

    fn word(label: &str, tld: &str) -> Candidate {
        Candidate::new(label, tld, CandidateSource::Word)
    }

    fn parked() -> Classification {
        Classification::registered(UsageState::ParkedOrPlaceholder, ProductState::Unknown)
    }

    fn active() -> Classification {
        Classification::registered(UsageState::ActiveSite, ProductState::ActiveProduct)
    }

    fn sample_outcomes() -> Vec<(Candidate, Classification, bool, Option<PartOfSpeech>)> {
        vec![
            (short("a", "com"), Classification::unregistered(), true, None),
            (short("b", "com"), parked(), true, None),
            (short("ab", "io"), active(), true, None),
            (short("zz", "io"), Classification::resolver_failure(), true, None),
            (
                word("cat", "com"),
                Classification::registered(UsageState::NoWebsite, ProductState::Unknown),
                false,
                Some(PartOfSpeech::Noun),
            ),
            (word("run", "io"), active(), false, Some(PartOfSpeech::Verb)),
            (word("keyboard", "com"), Classification::unregistered(), false, None),
        ]
    }

    #[test]
    fn test_global_counters_always_increment() {
        let mut aggregate = BlockAggregate::new(26, 3);
        for (candidate, classification, track, pos) in sample_outcomes() {
            aggregate.update(&candidate, &classification, track, pos);
        }
        assert_eq!(aggregate.global().domains_tracked_lifetime, 7);
        assert_eq!(aggregate.global().domains_tracked_24h, 7);
        assert_eq!(aggregate.tally().candidates, 7);
    }

    #[test]
    fn test_length_buckets_only_for_tracked_candidates() {
        let mut aggregate = BlockAggregate::new(26, 3);
        for (candidate, classification, track, pos) in sample_outcomes() {
            aggregate.update(&candidate, &classification, track, pos);
        }

        let one = aggregate.length_stat(1).unwrap();
        assert_eq!(one.total_possible, 26);
        assert_eq!(one.counters.tracked_count, 2);
        assert_eq!(one.counters.unregistered_found, 1);
        assert_eq!(one.counters.unused_found, 1);

        let two = aggregate.length_stat(2).unwrap();
        assert_eq!(two.total_possible, 676);
        assert_eq!(two.counters.tracked_count, 2);
        assert_eq!(two.counters.unregistered_found, 1);
        assert_eq!(two.counters.unused_found, 0);

        // Word candidates never touch the length buckets
        assert!(aggregate.length_stat(3).is_none());
        assert!(aggregate.length_stat(8).is_none());

        let io_two = aggregate.tld_length_stat("io", 2).unwrap();
        assert_eq!(io_two.counters, two.counters);
        assert!(aggregate.tld_length_stat("com", 2).is_none());
    }

    #[test]
    fn test_tld_short_counters_respect_short_max_length() {
        let mut aggregate = BlockAggregate::new(26, 3);
        for (candidate, classification, track, pos) in sample_outcomes() {
            aggregate.update(&candidate, &classification, track, pos);
        }

        let tlds: Vec<&TldStat> = aggregate.tld_stats().collect();
        assert_eq!(tlds.len(), 2);

        let com = tlds[0];
        assert_eq!(com.tld, "com");
        assert_eq!(com.domains_checked_total, 4);
        // "keyboard" is longer than the short max length
        assert_eq!(com.short_domains_checked_total, 3);
        assert_eq!(com.short_unregistered_count, 1);
        assert_eq!(com.short_no_website_count, 2);
        assert_eq!(com.short_active_site_count, 0);

        let io = tlds[1];
        assert_eq!(io.domains_checked_total, 3);
        assert_eq!(io.short_unregistered_count, 1);
        assert_eq!(io.short_active_site_count, 2);
    }

    #[test]
    fn test_pos_buckets() {
        let mut aggregate = BlockAggregate::new(26, 3);
        for (candidate, classification, track, pos) in sample_outcomes() {
            aggregate.update(&candidate, &classification, track, pos);
        }

        let noun = aggregate.pos_length_stat(PartOfSpeech::Noun, 3).unwrap();
        assert_eq!(noun.pos, "noun");
        assert_eq!(noun.total_possible, 17_576);
        assert_eq!(noun.counters.tracked_count, 1);
        assert_eq!(noun.counters.unused_found, 1);

        let verb = aggregate.pos_length_stat(PartOfSpeech::Verb, 3).unwrap();
        assert_eq!(verb.counters.tracked_count, 1);
        assert_eq!(verb.counters.unused_found, 0);

        assert!(aggregate.pos_length_stat(PartOfSpeech::Noun, 8).is_none());
    }

    #[test]
    fn test_total_possible_saturates() {
        let mut aggregate = BlockAggregate::new(36, 3);
        let long = word("abcdefghijklmnopqrst", "com");
        aggregate.update(
            &long,
            &Classification::unregistered(),
            false,
            Some(PartOfSpeech::Adj),
        );
        let stat = aggregate.pos_length_stat(PartOfSpeech::Adj, 20).unwrap();
        assert_eq!(stat.total_possible, u64::MAX);
    }

    #[test]
    fn test_order_independence() {
        let outcomes = sample_outcomes();

        let mut forward = BlockAggregate::new(26, 3);
        for (candidate, classification, track, pos) in &outcomes {
            forward.update(candidate, classification, *track, *pos);
        }

        let mut reversed = BlockAggregate::new(26, 3);
        for (candidate, classification, track, pos) in outcomes.iter().rev() {
            reversed.update(candidate, classification, *track, *pos);
        }

        let mut interleaved = BlockAggregate::new(26, 3);
        let (even, odd): (Vec<_>, Vec<_>) =
            outcomes.iter().enumerate().partition(|(i, _)| i % 2 == 0);
        for (_, (candidate, classification, track, pos)) in odd.into_iter().chain(even) {
            interleaved.update(candidate, classification, *track, *pos);
        }

        assert_eq!(forward, reversed);
        assert_eq!(forward, interleaved);
    }

    #[test]
    fn test_tally_and_breakdown() {
        let mut aggregate = BlockAggregate::new(26, 3);
        assert!(aggregate.is_empty());
        assert_eq!(aggregate.length_breakdown(), "-");

        for (candidate, classification, track, pos) in sample_outcomes() {
            aggregate.update(&candidate, &classification, track, pos);
        }

        let tally = aggregate.tally();
        assert_eq!(tally.registered, 4);
        assert_eq!(tally.resolver_errors, 1);
        assert_eq!(tally.active_sites, 2);
        assert_eq!(tally.active_products, 2);
        assert_eq!(aggregate.length_breakdown(), "L1=2 L2=2 L3=2 L8=1");
    }
}
