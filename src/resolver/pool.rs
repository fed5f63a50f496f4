//! Resolver pool
//!
//! Selection scans resolvers in configured order and takes the first one
//! whose minimum delay has elapsed. When every resolver is cooling down the
//! first untried one is used anyway, so a resolver's delay can be undercut
//! under sustained load.

use crate::config::ResolverConfig;
use crate::state::ResolverEntry;
use parking_lot::Mutex;
use std::time::Instant;

/// A resolver handed out for one query attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedResolver {
    /// Position in the pool, used to report the result
    pub index: usize,
    pub name: String,
    pub url: String,
}

/// Ordered set of DoH resolvers shared by all probe workers
///
/// Each entry sits behind its own lock, so concurrent workers serialize only
/// on the resolver they are inspecting.
#[derive(Debug)]
pub struct ResolverPool {
    entries: Vec<Mutex<ResolverEntry>>,
}

impl ResolverPool {
    pub fn new(entries: Vec<ResolverEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(Mutex::new).collect(),
        }
    }

    /// Builds the pool from configured resolvers, preserving their order
    pub fn from_config(resolvers: &[ResolverConfig]) -> Self {
        Self::new(
            resolvers
                .iter()
                .map(|r| ResolverEntry::new(r.name.clone(), r.url.clone(), r.min_delay()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selects a resolver for a query attempt
    pub fn select(&self) -> Option<SelectedResolver> {
        self.select_excluding(&[])
    }

    /// Selects a resolver, skipping those already tried for this candidate
    ///
    /// Returns the first eligible untried resolver, or the first untried one
    /// if none is eligible. Returns `None` once every resolver has been tried.
    /// The selected resolver's `last_used` is set to now.
    pub fn select_excluding(&self, tried: &[usize]) -> Option<SelectedResolver> {
        let now = Instant::now();

        for (index, slot) in self.entries.iter().enumerate() {
            if tried.contains(&index) {
                continue;
            }
            let mut entry = slot.lock();
            if entry.is_eligible(now) {
                entry.mark_used(now);
                return Some(selected(index, &entry));
            }
        }

        let (index, slot) = self
            .entries
            .iter()
            .enumerate()
            .find(|(index, _)| !tried.contains(index))?;
        let mut entry = slot.lock();
        entry.mark_used(now);
        Some(selected(index, &entry))
    }

    /// Records the outcome of a query sent to resolver `index`
    pub fn record_result(&self, index: usize, ok: bool) {
        if let Some(slot) = self.entries.get(index) {
            slot.lock().record_result(ok);
        }
    }

    /// Copies the current state of every resolver
    pub fn snapshot(&self) -> Vec<ResolverEntry> {
        self.entries.iter().map(|slot| slot.lock().clone()).collect()
    }
}

fn selected(index: usize, entry: &ResolverEntry) -> SelectedResolver {
    SelectedResolver {
        index,
        name: entry.name.clone(),
        url: entry.url.clone(),
    }
}
