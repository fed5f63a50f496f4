//! Cursor set and batch generation
//!
//! Owns both enumeration cursors and the mode rotation. Only the control
//! loop touches it, and only between blocks.

use crate::label::Charset;
use crate::state::{Candidate, CandidateSource, Pointer, WordCursor};
use crate::storage::CursorStore;
use crate::words::WordSource;
use crate::{CollectorError, Result};

/// Loads the length pointer, migrating and extending it as needed
///
/// A missing file starts a fresh pointer. A pointer written for a different
/// charset cannot be resumed: its indices mean different labels.
///
/// # Arguments
///
/// * `store` - Where the pointer was saved
/// * `charset` - The configured charset
/// * `max_length` - The configured max length; missing lengths get fresh cursors
///
/// # Returns
///
/// * `Ok(Pointer)` - A version 2 pointer covering `1..=max_length`
/// * `Err(CollectorError::CursorMismatch)` - The saved charset differs
pub fn resume_pointer<S>(store: &S, charset: &Charset, max_length: u32) -> Result<Pointer>
where
    S: CursorStore<Pointer>,
{
    let Some(mut pointer) = store.load()? else {
        tracing::info!("No saved pointer, starting at length 1");
        return Ok(Pointer::new(charset, max_length));
    };

    let configured = charset.to_string();
    if pointer.charset != configured {
        return Err(CollectorError::CursorMismatch(format!(
            "saved pointer uses charset '{}' but config has '{}'",
            pointer.charset, configured
        )));
    }

    if pointer.migrate() {
        tracing::info!(
            "Migrated legacy pointer (length {}, tld {}, index {}) to per-length cursors",
            pointer.length,
            pointer.tld_index,
            pointer.index
        );
    }

    if pointer.max_length != max_length {
        tracing::info!(
            "Max length changed from {} to {}",
            pointer.max_length,
            max_length
        );
    }
    pointer.extend_to(max_length);

    Ok(pointer)
}

/// Loads the word cursor, starting at the first word if none is saved
pub fn resume_word_cursor<S>(store: &S) -> Result<WordCursor>
where
    S: CursorStore<WordCursor>,
{
    Ok(store.load()?.unwrap_or_default())
}

/// Both cursors plus the rotation between enabled modes
#[derive(Debug, Clone)]
pub struct CursorSet {
    pub pointer: Pointer,
    pub word_cursor: WordCursor,
    modes: Vec<CandidateSource>,
    next_mode: usize,
}

impl CursorSet {
    pub fn new(pointer: Pointer, word_cursor: WordCursor, modes: Vec<CandidateSource>) -> Self {
        Self {
            pointer,
            word_cursor,
            modes,
            next_mode: 0,
        }
    }

    /// Enabled modes in rotation order
    pub fn modes(&self) -> &[CandidateSource] {
        &self.modes
    }

    /// Removes a mode from the rotation
    pub fn disable(&mut self, mode: CandidateSource) {
        self.modes.retain(|m| *m != mode);
        if self.next_mode >= self.modes.len() {
            self.next_mode = 0;
        }
    }

    /// Generates the next batch of up to `want` candidates
    ///
    /// Modes alternate block by block. A mode that yields nothing is
    /// skipped in favor of the next one; `None` means no enabled mode has
    /// any candidates left.
    pub fn next_batch(
        &mut self,
        charset: &Charset,
        tlds: &[String],
        words: Option<&WordSource>,
        want: usize,
    ) -> Option<(CandidateSource, Vec<Candidate>)> {
        let count = self.modes.len();
        for step in 0..count {
            let slot = (self.next_mode + step) % count;
            let mode = self.modes[slot];

            let batch = match mode {
                CandidateSource::Short => self.pointer.next_batch(charset, tlds, want),
                CandidateSource::Word => match words {
                    Some(source) => {
                        self.word_cursor
                            .advance(source.words.as_slice(), tlds, want)
                    }
                    None => Vec::new(),
                },
            };

            if !batch.is_empty() {
                self.next_mode = (slot + 1) % count;
                return Some((mode, batch));
            }
            tracing::debug!("{} mode has no candidates left", mode);
        }
        None
    }

    /// Persists both cursors
    pub fn save<P, W>(&self, pointer_store: &P, word_store: &W) -> Result<()>
    where
        P: CursorStore<Pointer>,
        W: CursorStore<WordCursor>,
    {
        pointer_store.save(&self.pointer)?;
        word_store.save(&self.word_cursor)?;
        Ok(())
    }
}
