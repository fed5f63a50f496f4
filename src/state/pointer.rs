//! Length cursor store
//!
//! The [`Pointer`] records how far the fixed-length enumeration has progressed
//! for every label length in `1..=max_length`. Each [`LengthCursor`] walks its
//! TLD list in order and, for each TLD, the whole index space `[0, C^L)`.
//! Lengths are visited round-robin, one unfinished length per block.

use crate::label::{encode_label, space_size, Charset};
use crate::state::candidate::{Candidate, CandidateSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Format version written by this crate
pub const POINTER_VERSION: u32 = 2;

/// Progress through the label space of a single length
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthCursor {
    /// Position in the TLD list
    pub tld_index: usize,

    /// Next unconsumed index in `[0, C^L)` for the current TLD
    pub index: u64,

    /// Set once every TLD has been walked; never cleared
    pub done: bool,
}

impl LengthCursor {
    /// A cursor for a length that has been fully processed
    pub fn finished() -> Self {
        Self {
            tld_index: 0,
            index: 0,
            done: true,
        }
    }

    /// Advances this cursor, returning up to `want` candidates of `length`
    ///
    /// The cursor is mutated in place. Callers persist it only after the
    /// whole block has been probed and aggregated.
    pub fn advance(
        &mut self,
        length: u32,
        charset: &Charset,
        tlds: &[String],
        want: usize,
    ) -> Vec<Candidate> {
        let mut batch = Vec::new();

        let size = match space_size(charset.len(), length) {
            Some(size) if size > 0 => size,
            _ => {
                self.done = true;
                return batch;
            }
        };

        if self.done || tlds.is_empty() {
            self.done = true;
            return batch;
        }

        while batch.len() < want {
            self.settle(size, tlds.len());
            if self.done {
                break;
            }

            let label = encode_label(self.index, length, charset);
            batch.push(Candidate::new(
                label,
                &tlds[self.tld_index],
                CandidateSource::Short,
            ));
            self.index += 1;
        }

        // Leave the cursor canonical so `done` flips as soon as the space is consumed
        self.settle(size, tlds.len());
        batch
    }

    /// Rolls an exhausted index over to the next TLD and marks completion
    fn settle(&mut self, size: u64, tld_count: usize) {
        if self.done {
            return;
        }
        if self.index >= size {
            self.index = 0;
            self.tld_index += 1;
        }
        if self.tld_index >= tld_count {
            self.done = true;
        }
    }
}

fn legacy_version() -> u32 {
    1
}

fn first_length() -> u32 {
    1
}

/// Persisted cursor state for fixed-length enumeration
///
/// Version 1 files carry a single legacy cursor (`length`, `tld_index`,
/// `index`). They are migrated once into the per-length `lengths` map; after
/// that the legacy fields are inert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    #[serde(default = "legacy_version")]
    pub version: u32,

    pub charset: String,

    pub max_length: u32,

    /// Legacy cursor: TLD position
    #[serde(default)]
    pub tld_index: usize,

    /// Legacy cursor: length being walked
    #[serde(default = "first_length")]
    pub length: u32,

    /// Legacy cursor: index within the legacy length
    #[serde(default)]
    pub index: u64,

    /// Per-length cursors, keyed by label length
    #[serde(default)]
    pub lengths: BTreeMap<u32, LengthCursor>,

    /// Length the next block starts its round-robin search at
    #[serde(default = "first_length")]
    pub next_length: u32,
}

impl Pointer {
    /// Creates a first-run pointer, already migrated to the current version
    pub fn new(charset: &Charset, max_length: u32) -> Self {
        let mut pointer = Self::legacy(charset, max_length);
        pointer.migrate();
        pointer
    }

    /// Creates a version 1 pointer with a single cursor at length 1
    pub fn legacy(charset: &Charset, max_length: u32) -> Self {
        Self {
            version: legacy_version(),
            charset: charset.to_string(),
            max_length,
            tld_index: 0,
            length: 1,
            index: 0,
            lengths: BTreeMap::new(),
            next_length: 1,
        }
    }

    /// Returns true if this pointer still needs [`Pointer::migrate`]
    pub fn needs_migration(&self) -> bool {
        self.version < POINTER_VERSION || self.lengths.is_empty()
    }

    /// Migrates the legacy single cursor into per-length cursors
    ///
    /// Lengths below the legacy length are finished, the legacy length keeps
    /// the legacy position, and longer lengths start from zero. Returns true
    /// if a migration took place.
    pub fn migrate(&mut self) -> bool {
        if !self.needs_migration() {
            return false;
        }

        let mut lengths = BTreeMap::new();
        for length in 1..=self.max_length {
            let cursor = if length < self.length {
                LengthCursor::finished()
            } else if length == self.length {
                LengthCursor {
                    tld_index: self.tld_index,
                    index: self.index,
                    done: false,
                }
            } else {
                LengthCursor::default()
            };
            lengths.insert(length, cursor);
        }

        self.lengths = lengths;
        self.version = POINTER_VERSION;
        true
    }

    /// Extends the pointer to a (possibly larger) configured max length
    ///
    /// New lengths start from zero. A smaller max length keeps the surplus
    /// cursors on record but they are never visited.
    pub fn extend_to(&mut self, max_length: u32) {
        for length in 1..=max_length {
            self.lengths.entry(length).or_default();
        }
        self.max_length = max_length;
        if self.next_length == 0 || self.next_length > max_length {
            self.next_length = 1;
        }
    }

    /// Cursor for a given length
    pub fn cursor(&self, length: u32) -> Option<&LengthCursor> {
        self.lengths.get(&length)
    }

    /// Returns true once every length in `1..=max_length` is done
    pub fn is_exhausted(&self) -> bool {
        (1..=self.max_length).all(|length| self.lengths.get(&length).is_some_and(|c| c.done))
    }

    /// Builds the next fixed-length batch
    ///
    /// Visits one unfinished length per call, starting at `next_length` and
    /// moving the rotation past the visited length so no length starves. An
    /// empty result means every length is exhausted.
    pub fn next_batch(
        &mut self,
        charset: &Charset,
        tlds: &[String],
        want: usize,
    ) -> Vec<Candidate> {
        let max_length = self.max_length;
        if max_length == 0 {
            return Vec::new();
        }
        if self.next_length == 0 || self.next_length > max_length {
            self.next_length = 1;
        }

        for step in 0..max_length {
            let length = (self.next_length - 1 + step) % max_length + 1;
            let cursor = self.lengths.entry(length).or_default();
            if cursor.done {
                continue;
            }

            let batch = cursor.advance(length, charset, tlds, want);
            self.next_length = length % max_length + 1;
            if !batch.is_empty() {
                return batch;
            }
        }

        Vec::new()
    }
}
