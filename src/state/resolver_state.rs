use std::time::{Duration, Instant};

/// Pacing and health state for one DNS-over-HTTPS endpoint
///
/// Entries are owned by the resolver pool, which serializes access to each
/// one while a worker selects it.
#[derive(Debug, Clone)]
pub struct ResolverEntry {
    /// Human-readable resolver name (e.g. "cloudflare")
    pub name: String,

    /// DoH JSON query endpoint
    pub url: String,

    /// Minimum time between two queries sent to this resolver
    pub min_delay: Duration,

    /// When this resolver was last selected
    pub last_used: Option<Instant>,

    /// Queries that returned a well-formed answer
    pub successes: u64,

    /// Queries that failed (transport, status, or malformed body)
    pub errors: u64,
}

impl ResolverEntry {
    /// Creates a new entry that has never been used
    pub fn new(name: impl Into<String>, url: impl Into<String>, min_delay: Duration) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            min_delay,
            last_used: None,
            successes: 0,
            errors: 0,
        }
    }

    /// Checks if this resolver may be queried at `now`
    ///
    /// A zero delay means the resolver is always eligible.
    pub fn is_eligible(&self, now: Instant) -> bool {
        if self.min_delay.is_zero() {
            return true;
        }
        match self.last_used {
            Some(last) => now.saturating_duration_since(last) >= self.min_delay,
            None => true,
        }
    }

    /// Records that this resolver was selected at `now`
    pub fn mark_used(&mut self, now: Instant) {
        self.last_used = Some(now);
    }

    /// Records the outcome of a query
    pub fn record_result(&mut self, ok: bool) {
        if ok {
            self.successes += 1;
        } else {
            self.errors += 1;
        }
    }

    /// Total queries recorded against this resolver
    pub fn total_queries(&self) -> u64 {
        self.successes + self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(delay_ms: u64) -> ResolverEntry {
        ResolverEntry::new("test", "https://dns.example/dns-query", Duration::from_millis(delay_ms))
    }

    #[test]
    fn test_new_entry() {
        let entry = entry(100);
        assert_eq!(entry.name, "test");
        assert!(entry.last_used.is_none());
        assert_eq!(entry.successes, 0);
        assert_eq!(entry.errors, 0);
    }

    #[test]
    fn test_eligible_initially() {
        assert!(entry(1000).is_eligible(Instant::now()));
    }

    #[test]
    fn test_not_eligible_too_soon() {
        let mut entry = entry(1000);
        let now = Instant::now();
        entry.mark_used(now);

        assert!(!entry.is_eligible(now));
        assert!(!entry.is_eligible(now + Duration::from_millis(500)));
    }

    #[test]
    fn test_eligible_after_delay() {
        let mut entry = entry(1000);
        let now = Instant::now();
        entry.mark_used(now);

        assert!(entry.is_eligible(now + Duration::from_millis(1000)));
        assert!(entry.is_eligible(now + Duration::from_millis(1100)));
    }

    #[test]
    fn test_zero_delay_always_eligible() {
        let mut entry = entry(0);
        let now = Instant::now();
        entry.mark_used(now);
        assert!(entry.is_eligible(now));
    }

    #[test]
    fn test_record_result() {
        let mut entry = entry(0);
        entry.record_result(true);
        entry.record_result(true);
        entry.record_result(false);
        assert_eq!(entry.successes, 2);
        assert_eq!(entry.errors, 1);
        assert_eq!(entry.total_queries(), 3);
    }
}
