//! Block scheduler
//!
//! Each block draws a batch from one enumeration mode, probes it, aggregates
//! the results, and hands the payload to the backend. The ledger rows and the
//! cursor files are then written together: the cursors are saved inside the
//! ledger transaction, before it commits. A crash mid-block therefore repeats
//! at most one block and never counts one twice.

mod cursors;

pub use cursors::{resume_pointer, resume_word_cursor, CursorSet};

use crate::aggregate::{BlockAggregate, BlockPayload, BlockTally};
use crate::backend::BackendClient;
use crate::config::Config;
use crate::label::Charset;
use crate::probe::{Orchestrator, Prober};
use crate::resolver::ResolverPool;
use crate::state::{Candidate, CandidateSource, Pointer, WordCursor};
use crate::storage::{JsonCursorStore, Ledger, NewBlock, PendingUpload, UploadStatus};
use crate::words::{PartOfSpeech, WordSource};
use crate::{CollectorError, ConfigError, Result};
use chrono::Utc;
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

/// Smallest batch drawn per block
pub const MIN_BATCH_SIZE: usize = 25;

/// Largest batch drawn per block
pub const MAX_BATCH_SIZE: usize = 80;

/// Summary of one processed block
#[derive(Debug, Clone)]
pub struct BlockReport {
    pub block_id: i64,
    pub mode: CandidateSource,
    pub tally: BlockTally,
    pub length_breakdown: String,
    pub upload_status: UploadStatus,
    pub payload: BlockPayload,
}

/// Result of [`Collector::run_block`]
#[derive(Debug, Clone)]
pub enum BlockOutcome {
    Processed(BlockReport),
    /// No enabled mode has candidates left
    Exhausted,
}

/// The collector's control loop and everything it owns
pub struct Collector {
    config: Config,
    config_hash: String,
    charset: Charset,
    cursors: CursorSet,
    words: Option<WordSource>,
    prober: Prober,
    orchestrator: Orchestrator,
    backend: BackendClient,
    pointer_store: JsonCursorStore<Pointer>,
    word_store: JsonCursorStore<WordCursor>,
    ledger: Ledger,
    batch_range: RangeInclusive<usize>,
}

impl Collector {
    /// Builds a collector from a validated config
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `config_hash` - Hash of the config file, recorded with every block
    ///
    /// # Returns
    ///
    /// A collector positioned at the saved cursors (migrated from the legacy
    /// format if needed), or an error if the saved pointer was written for a
    /// different charset, the word list is unusable while word mode is the
    /// only mode, or the ledger cannot be opened.
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self> {
        let charset = config.charset()?;

        let pointer_store = JsonCursorStore::new(&config.storage.pointer_path);
        let word_store = JsonCursorStore::new(&config.storage.word_cursor_path);
        let pointer = resume_pointer(&pointer_store, &charset, config.enumeration.max_length)?;
        let word_cursor = resume_word_cursor(&word_store)?;

        let mut modes = Vec::new();
        if config.schedule.short_mode {
            modes.push(CandidateSource::Short);
        }
        if config.schedule.word_mode {
            modes.push(CandidateSource::Word);
        }
        let mut cursors = CursorSet::new(pointer, word_cursor, modes);

        let words = if config.schedule.word_mode {
            load_word_source(&config)?
        } else {
            None
        };
        if config.schedule.word_mode && words.is_none() {
            cursors.disable(CandidateSource::Word);
        }

        let pool = Arc::new(ResolverPool::from_config(&config.resolvers));
        let prober = Prober::new(config.probe.clone(), pool)?;
        let orchestrator = Orchestrator::from_config(&config.probe);
        let backend = BackendClient::new(&config.backend)?;
        let ledger = Ledger::new(&config.storage.ledger_path)?;

        tracing::info!(
            "Collector ready: modes [{}], {} TLDs, max length {}, {} resolvers, {} workers",
            cursors
                .modes()
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            config.enumeration.tlds.len(),
            config.enumeration.max_length,
            config.resolvers.len(),
            config.probe.workers
        );

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            charset,
            cursors,
            words,
            prober,
            orchestrator,
            backend,
            pointer_store,
            word_store,
            ledger,
            batch_range: MIN_BATCH_SIZE..=MAX_BATCH_SIZE,
        })
    }

    /// Overrides the batch size range
    pub fn with_batch_range(mut self, min: usize, max: usize) -> Self {
        let min = min.max(1);
        self.batch_range = min..=max.max(min);
        self
    }

    pub fn cursors(&self) -> &CursorSet {
        &self.cursors
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn resolver_pool(&self) -> &Arc<ResolverPool> {
        self.prober.pool()
    }

    /// Runs blocks until the space is exhausted or `max_blocks` have been
    /// processed; returns the number of processed blocks
    pub async fn run(&mut self, max_blocks: Option<u64>) -> Result<u64> {
        let pause = Duration::from_millis(self.config.schedule.block_pause_ms);
        let mut processed = 0u64;

        loop {
            if max_blocks.is_some_and(|limit| processed >= limit) {
                tracing::info!("Reached block limit of {}", processed);
                break;
            }

            match self.run_block().await? {
                BlockOutcome::Processed(_) => processed += 1,
                BlockOutcome::Exhausted => {
                    tracing::info!("Configured space exhausted after {} blocks", processed);
                    break;
                }
            }

            if !pause.is_zero() && max_blocks.map_or(true, |limit| processed < limit) {
                tokio::time::sleep(pause).await;
            }
        }

        Ok(processed)
    }

    /// Runs exactly one block
    ///
    /// If the block cannot be committed, the in-memory cursors are rolled
    /// back so that a retry draws the same candidates.
    pub async fn run_block(&mut self) -> Result<BlockOutcome> {
        self.drain_outbox().await?;

        let committed = self.cursors.clone();
        let result = self.process_block().await;
        if result.is_err() {
            self.cursors = committed;
        }
        result
    }

    async fn process_block(&mut self) -> Result<BlockOutcome> {
        let want = self.pick_batch_size();
        let Some((mode, batch)) = self.cursors.next_batch(
            &self.charset,
            &self.config.enumeration.tlds,
            self.words.as_ref(),
            want,
        ) else {
            return Ok(BlockOutcome::Exhausted);
        };

        tracing::debug!(
            "Probing {} {} candidates with {} workers",
            batch.len(),
            mode,
            self.orchestrator.workers()
        );
        let outcomes = self.orchestrator.run(&self.prober, batch).await;

        let mut aggregate =
            BlockAggregate::new(self.charset.len(), self.config.enumeration.max_length);
        for (candidate, classification) in &outcomes {
            let track_length_stats = candidate.source == CandidateSource::Short;
            let pos = self.pos_label(candidate);
            aggregate.update(candidate, classification, track_length_stats, pos);
        }

        let payload = aggregate.to_payload(Utc::now().date_naive());
        let pending_upload = self.upload(&payload).await?;

        let tally = aggregate.tally().clone();
        let block = NewBlock {
            config_hash: self.config_hash.clone(),
            mode,
            candidates: tally.candidates,
            registered: tally.registered,
            resolver_errors: tally.resolver_errors,
            pending_upload,
        };
        let upload_status = block.upload_status();

        let cursors = &self.cursors;
        let (pointer_store, word_store) = (&self.pointer_store, &self.word_store);
        let block_id = self
            .ledger
            .commit_block(&block, aggregate.tld_stats(), || {
                cursors.save(pointer_store, word_store)
            })?;

        let length_breakdown = aggregate.length_breakdown();
        tracing::info!(
            "Block {}: {} mode, {} candidates [{}], {} registered, {} resolver errors, upload {}",
            block_id,
            mode,
            tally.candidates,
            length_breakdown,
            tally.registered,
            tally.resolver_errors,
            upload_status
        );

        Ok(BlockOutcome::Processed(BlockReport {
            block_id,
            mode,
            tally,
            length_breakdown,
            upload_status,
            payload,
        }))
    }

    /// The batch the next block would probe, without moving any cursor
    pub fn preview_next_block(&self) -> Option<(CandidateSource, Vec<Candidate>)> {
        let mut cursors = self.cursors.clone();
        cursors.next_batch(
            &self.charset,
            &self.config.enumeration.tlds,
            self.words.as_ref(),
            *self.batch_range.end(),
        )
    }

    fn pos_label(&self, candidate: &Candidate) -> Option<PartOfSpeech> {
        if candidate.source != CandidateSource::Word {
            return None;
        }
        self.words
            .as_ref()
            .and_then(|source| source.pos.lookup(&candidate.label))
    }

    fn pick_batch_size(&self) -> usize {
        rand::rng().random_range(self.batch_range.clone())
    }

    /// Uploads a payload; on failure returns it for the outbox
    async fn upload(&self, payload: &BlockPayload) -> Result<Option<PendingUpload>> {
        match self.backend.upload_aggregate(payload).await {
            Ok(response) => {
                tracing::debug!("Upload accepted ({}): {}", response.status, response.body);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("Upload failed, queueing payload: {}", e);
                Ok(Some(PendingUpload {
                    payload: payload.to_json()?,
                    error: e.to_string(),
                }))
            }
        }
    }

    /// Re-uploads queued payloads oldest first, stopping at the first failure
    async fn drain_outbox(&mut self) -> Result<usize> {
        let pending = self.ledger.pending_outbox()?;
        if pending.is_empty() {
            return Ok(0);
        }

        let total = pending.len();
        let mut delivered = 0;
        for entry in pending {
            let payload = match BlockPayload::from_json(&entry.payload) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!("Dropping unreadable outbox entry {}: {}", entry.id, e);
                    self.ledger.remove_outbox(entry.id)?;
                    continue;
                }
            };

            match self.backend.upload_aggregate(&payload).await {
                Ok(_) => {
                    self.ledger.remove_outbox(entry.id)?;
                    delivered += 1;
                }
                Err(e) => {
                    self.ledger.record_outbox_failure(entry.id, &e.to_string())?;
                    tracing::warn!(
                        "Outbox upload {} failed (attempt {}): {}",
                        entry.id,
                        entry.attempts + 1,
                        e
                    );
                    break;
                }
            }
        }

        tracing::info!("Delivered {} of {} queued payloads", delivered, total);
        Ok(delivered)
    }
}

/// Loads the word source for word mode
///
/// A failure is fatal when word mode is the only mode. With short mode also
/// enabled the collector logs the failure and carries on without words.
fn load_word_source(config: &Config) -> Result<Option<WordSource>> {
    let Some(words_config) = &config.words else {
        return Err(CollectorError::Config(ConfigError::Validation(
            "word-mode requires a [words] section".to_string(),
        )));
    };

    match WordSource::load(words_config) {
        Ok(source) => Ok(Some(source)),
        Err(e) if config.schedule.short_mode => {
            tracing::error!("Word mode disabled: {}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
