//! Probing candidates
//!
//! This module contains:
//! - Classification types and the landing-page heuristics
//! - The two-stage prober (DoH lookup, then HTTP fetch for registered domains)
//! - The orchestrator that runs the prober over a batch with bounded concurrency

mod classify;
mod orchestrator;
mod prober;

pub use classify::{
    classify_site, Classification, ProductState, UsageState, COMMERCIAL_KEYWORDS,
    PARKING_KEYWORDS, REDIRECT_STATUSES,
};
pub use orchestrator::{Orchestrator, ProbeOutcome};
pub use prober::{
    build_http_client, fetch_site, DnsVerdict, Prober, SiteResponse, MAX_BODY_BYTES,
};
