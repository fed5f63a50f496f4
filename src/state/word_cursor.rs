//! Word cursor store
//!
//! A single index into the dictionary word list. The word space is cyclic:
//! the index wraps to zero at the end of the list and word mode never
//! reports exhaustion.

use crate::state::candidate::{Candidate, CandidateSource};
use serde::{Deserialize, Serialize};

/// Persisted position in the word list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCursor {
    /// Index of the next word to emit
    pub index: usize,
}

impl WordCursor {
    /// Builds a batch of exactly `want` word candidates
    ///
    /// Each word is expanded over every TLD in list order before the cursor
    /// moves on. The cursor advances as soon as a word is taken, so a batch
    /// that fills up partway through a word's TLDs leaves the rest of that
    /// word for the next lap over the list.
    ///
    /// Returns an empty batch only when the word list or the TLD list is empty.
    pub fn advance(&mut self, words: &[String], tlds: &[String], want: usize) -> Vec<Candidate> {
        let mut batch = Vec::with_capacity(want);
        if words.is_empty() || tlds.is_empty() {
            return batch;
        }

        while batch.len() < want {
            if self.index >= words.len() {
                self.index = 0;
            }
            let word = &words[self.index];
            self.index += 1;
            if self.index >= words.len() {
                self.index = 0;
            }

            for tld in tlds {
                if batch.len() >= want {
                    break;
                }
                batch.push(Candidate::new(word.as_str(), tld, CandidateSource::Word));
            }
        }

        batch
    }
}
