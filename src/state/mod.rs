//! Cursor and pacing state
//!
//! This module holds the mutable state the collector threads through each block.
//!
//! # Components
//!
//! - `Pointer` / `LengthCursor`: per-length progress through the fixed-length label space
//! - `WordCursor`: position in the cyclic dictionary word list
//! - `ResolverEntry`: per-resolver pacing and health counters
//! - `Candidate`: one `label.tld` pair produced by a generator

mod candidate;
mod pointer;
mod resolver_state;
mod word_cursor;

// Re-export main types
pub use candidate::{Candidate, CandidateSource};
pub use pointer::{LengthCursor, Pointer, POINTER_VERSION};
pub use resolver_state::ResolverEntry;
pub use word_cursor::WordCursor;
