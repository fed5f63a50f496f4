//! Concurrency orchestrator
//!
//! Runs the prober over a whole batch and returns once every candidate has
//! a classification. With `workers == 0` candidates are probed one after
//! another, optionally pausing between them; otherwise at most `workers`
//! probes are in flight. A probe task that panics or is cancelled still
//! yields its candidate, classified as a resolver failure.

use crate::config::ProbeConfig;
use crate::probe::classify::Classification;
use crate::probe::prober::Prober;
use crate::state::Candidate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// A candidate with its probe result
pub type ProbeOutcome = (Candidate, Classification);

/// Drives the prober over a batch with bounded concurrency
#[derive(Debug, Clone)]
pub struct Orchestrator {
    workers: usize,
    request_delay: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator
    ///
    /// `request_delay` only applies in sequential mode (`workers == 0`).
    pub fn new(workers: usize, request_delay: Duration) -> Self {
        Self {
            workers,
            request_delay,
        }
    }

    pub fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.workers, config.min_request_delay())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Probes every candidate in `batch`
    ///
    /// Output order is unspecified when `workers > 0`.
    pub async fn run(&self, prober: &Prober, batch: Vec<Candidate>) -> Vec<ProbeOutcome> {
        if self.workers == 0 {
            self.run_sequential(prober, batch).await
        } else {
            self.run_pooled(prober, batch).await
        }
    }

    async fn run_sequential(&self, prober: &Prober, batch: Vec<Candidate>) -> Vec<ProbeOutcome> {
        let mut results = Vec::with_capacity(batch.len());
        for candidate in batch {
            let classification = prober.probe(&candidate.domain).await;
            results.push((candidate, classification));

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }
        results
    }

    async fn run_pooled(&self, prober: &Prober, batch: Vec<Candidate>) -> Vec<ProbeOutcome> {
        let prober = prober.clone();
        self.run_pooled_with(batch, move |domain| {
            let prober = prober.clone();
            async move { prober.probe(&domain).await }
        })
        .await
    }

    /// Runs `probe` over the batch with at most `workers` calls in flight
    ///
    /// Every candidate comes back exactly once. Each task's candidate stays
    /// next to its handle, so a task that fails to join is recorded as a
    /// resolver failure instead of disappearing from the block.
    async fn run_pooled_with<F, Fut>(&self, batch: Vec<Candidate>, probe: F) -> Vec<ProbeOutcome>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Classification> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = Vec::with_capacity(batch.len());

        for candidate in batch {
            let semaphore = Arc::clone(&semaphore);
            let lookup = probe(candidate.domain.clone());
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                lookup.await
            });
            tasks.push((candidate, handle));
        }

        let total = tasks.len();
        let mut failed = 0;
        let mut results = Vec::with_capacity(total);
        for (candidate, handle) in tasks {
            let classification = match handle.await {
                Ok(classification) => classification,
                Err(e) => {
                    failed += 1;
                    tracing::error!(
                        "Task for {} did not complete ({}), counting it as a resolver failure",
                        candidate.domain,
                        e
                    );
                    Classification::resolver_failure()
                }
            };
            results.push((candidate, classification));
        }

        if failed > 0 {
            tracing::warn!("{} of {} tasks did not complete", failed, total);
        }

        results
    }
}
