use crate::fetcher::StarSource;
use crate::result::{RepoLink, RepoStars};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 3;

/// How lookups are paced against the API's hourly quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Every lookup at once
    Parallel,
    /// Groups of `n`, each awaited before the next starts
    Chunked(usize),
}

impl BatchPolicy {
    fn group_size(&self, total: usize) -> usize {
        match self {
            BatchPolicy::Parallel => total.max(1),
            BatchPolicy::Chunked(size) => (*size).max(1),
        }
    }
}

impl Default for BatchPolicy {
    fn default() -> Self {
        BatchPolicy::Chunked(DEFAULT_BATCH_SIZE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub batch: usize,
    pub batch_len: usize,
    pub resolved: usize,
    pub total: usize,
}

/// Called after each batch resolves
pub type BatchCallback = Arc<dyn Fn(BatchProgress) + Send + Sync>;

pub struct BatchScheduler<S> {
    source: S,
    policy: BatchPolicy,
    batch_callback: Option<BatchCallback>,
}

impl<S: StarSource> BatchScheduler<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            policy: BatchPolicy::default(),
            batch_callback: None,
        }
    }

    pub fn with_policy(mut self, policy: BatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_batch_callback(mut self, callback: BatchCallback) -> Self {
        self.batch_callback = Some(callback);
        self
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve every link, returning results in input order.
    ///
    /// Within a batch all lookups run concurrently and are collected by
    /// position, so completion order never leaks into the output.
    pub async fn fetch_all(&self, links: &[RepoLink]) -> Vec<RepoStars> {
        if links.is_empty() {
            debug!("No links to look up");
            return Vec::new();
        }

        let total = links.len();
        let group_size = self.policy.group_size(total);
        info!(
            "Looking up {} repositories ({:?}, {} per batch)",
            total, self.policy, group_size
        );

        let mut results = Vec::with_capacity(total);

        for (batch, chunk) in links.chunks(group_size).enumerate() {
            debug!("Batch {}: {} lookups", batch, chunk.len());

            let counts = join_all(chunk.iter().map(|link| self.source.fetch_stars(link))).await;

            results.extend(
                chunk
                    .iter()
                    .cloned()
                    .zip(counts)
                    .map(|(link, stars)| RepoStars::new(link, stars)),
            );

            if let Some(ref callback) = self.batch_callback {
                callback(BatchProgress {
                    batch,
                    batch_len: chunk.len(),
                    resolved: results.len(),
                    total,
                });
            }
        }

        let known = results.iter().filter(|r| r.stars.is_known()).count();
        info!("Lookups complete: {}/{} resolved", known, total);
        results
    }
}
