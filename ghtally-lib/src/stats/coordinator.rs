use super::{AggregateOutcome, Aggregation, Cache, CacheStore, Gateway, Progress, RepoListing, RepositoryAggregator, Transport};
use crate::Result;
use chrono::{DateTime, Utc};
use core::sync::atomic::{AtomicU64, Ordering};
use futures_util::future::try_join_all;
use ohno::IntoAppError;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

const LOG_TARGET: &str = "coordinator";

/// How many repositories ended up in each [`AggregateOutcome`], and the history pages fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub cache_hits: u64,
    pub computed: u64,
    pub empty: u64,
    pub inaccessible: u64,
    pub degraded: u64,
    pub requests: u64,
}

/// Line-of-code totals over the whole repository set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocTotals {
    pub total_additions: u64,
    pub total_deletions: u64,
    pub net: i64,
    pub total_attributed_commits: u64,
    pub repo_count: u64,

    /// True when every repository reused its cached entry.
    pub all_cache_hit: bool,
    pub counts: RunCounts,
}

impl LocTotals {
    fn from_aggregations(aggregations: &[Aggregation]) -> Self {
        let mut totals = Self {
            all_cache_hit: true,
            ..Self::default()
        };

        for aggregation in aggregations {
            let aggregate = &aggregation.aggregate;
            totals.total_additions = totals.total_additions.saturating_add(aggregate.additions);
            totals.total_deletions = totals.total_deletions.saturating_add(aggregate.deletions);
            totals.total_attributed_commits = totals.total_attributed_commits.saturating_add(aggregate.my_commits);
            totals.repo_count += 1;
            totals.counts.requests += aggregation.requests;

            let counter = match aggregation.outcome {
                AggregateOutcome::CacheHit => &mut totals.counts.cache_hits,
                AggregateOutcome::Computed => &mut totals.counts.computed,
                AggregateOutcome::Empty => &mut totals.counts.empty,
                AggregateOutcome::Inaccessible => &mut totals.counts.inaccessible,
                AggregateOutcome::Degraded => &mut totals.counts.degraded,
            };
            *counter += 1;
            totals.all_cache_hit &= aggregation.outcome == AggregateOutcome::CacheHit;
        }

        let additions = i64::try_from(totals.total_additions).unwrap_or(i64::MAX);
        let deletions = i64::try_from(totals.total_deletions).unwrap_or(i64::MAX);
        totals.net = additions.saturating_sub(deletions);
        totals
    }
}

/// Runs the [`RepositoryAggregator`] over a repository set and maintains the cache.
///
/// The cache is read once before any work starts and written once after all of it
/// completed. A fatal failure anywhere aborts the run before the write, leaving the
/// previously persisted cache as it was.
pub struct RunCoordinator<'a, T> {
    gateway: &'a Gateway<T>,
    store: &'a CacheStore,
    progress: Arc<dyn Progress>,
    max_concurrent: usize,
    page_size: u32,
    now: DateTime<Utc>,
}

impl<T> core::fmt::Debug for RunCoordinator<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunCoordinator")
            .field("store", &self.store)
            .field("progress", &"<dyn Progress>")
            .field("max_concurrent", &self.max_concurrent)
            .field("page_size", &self.page_size)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl<'a, T: Transport> RunCoordinator<'a, T> {
    pub fn new(
        gateway: &'a Gateway<T>,
        store: &'a CacheStore,
        progress: Arc<dyn Progress>,
        max_concurrent: usize,
        page_size: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            gateway,
            store,
            progress,
            max_concurrent: max_concurrent.max(1),
            page_size,
            now,
        }
    }

    /// Aggregate `repos` for the account whose node id is `attribution_id`, using and
    /// refreshing the cache of `identity`.
    pub async fn run(&self, identity: &str, repos: &[RepoListing], attribution_id: &str, force_refresh: bool) -> Result<LocTotals> {
        let _lock = self.store.lock(identity).await?;
        let previous = self.store.load(identity);

        let mut seen = HashSet::new();
        let repos: Vec<&RepoListing> = repos.iter().filter(|listing| seen.insert(listing.cache_key())).collect();

        let total = repos.len() as u64;
        let completed = Arc::new(AtomicU64::new(0));
        self.progress.set_phase("Aggregating");
        let completed_for_progress = Arc::clone(&completed);
        self.progress.set_determinate(Box::new(move || {
            (total, completed_for_progress.load(Ordering::Relaxed), "repositories".to_string())
        }));

        let aggregator = RepositoryAggregator::new(self.gateway, self.page_size, self.now);
        let semaphore = Semaphore::new(self.max_concurrent);

        let aggregator = &aggregator;
        let semaphore = &semaphore;
        let previous = &previous;
        let completed = &*completed;

        let aggregations = try_join_all(repos.iter().map(|&listing| async move {
            let _permit = semaphore.acquire().await.into_app_err("aggregation semaphore closed")?;
            let aggregation = aggregator
                .aggregate(
                    &listing.repo,
                    attribution_id,
                    previous.get(&listing.cache_key()),
                    listing.commit_total,
                    force_refresh,
                )
                .await
                .into_app_err_with(|| format!("aggregating '{}'", listing.repo))?;
            let _ = completed.fetch_add(1, Ordering::Relaxed);
            Ok::<_, ohno::AppError>(aggregation)
        }))
        .await?;

        let cache: Cache = aggregations.iter().map(|a| a.aggregate.clone()).collect();
        let dropped = previous.iter().filter(|(key, _)| !cache.contains(key)).count();
        if dropped > 0 {
            log::debug!(target: LOG_TARGET, "Dropping {dropped} cached repositories that are no longer listed");
        }

        self.store.save(identity, &cache)?;

        let totals = LocTotals::from_aggregations(&aggregations);
        log::info!(target: LOG_TARGET,
            "Aggregated {} repositories: {} cached, {} computed, {} empty, {} inaccessible, {} degraded, {} history pages",
            totals.repo_count,
            totals.counts.cache_hits,
            totals.counts.computed,
            totals.counts.empty,
            totals.counts.inaccessible,
            totals.counts.degraded,
            totals.counts.requests
        );

        Ok(totals)
    }
}
