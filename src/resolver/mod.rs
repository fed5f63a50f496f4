//! DNS-over-HTTPS resolvers
//!
//! This module contains:
//! - The resolver pool, which paces queries per resolver and tracks health
//! - DoH JSON query construction and answer parsing

mod doh;
mod pool;

pub use doh::{build_query_url, query_a, DohAnswer, DohError};
pub use pool::{ResolverPool, SelectedResolver};
