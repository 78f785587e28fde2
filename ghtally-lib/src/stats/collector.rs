use super::{
    Affiliation, CacheStore, Gateway, LocTotals, Progress, RunCoordinator, Transport, age_descriptor, fetch_account, list_repositories,
    merge_listings,
};
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;

const LOG_TARGET: &str = " collector";

/// Tuning knobs for a collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorOptions {
    pub max_concurrent_repos: usize,
    pub commit_page_size: u32,
    pub repo_page_size: u32,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            max_concurrent_repos: 8,
            commit_page_size: 100,
            repo_page_size: 60,
        }
    }
}

/// Everything measured for one account in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTotals {
    pub login: String,
    pub loc: LocTotals,

    /// Repositories owned by the account.
    pub repo_count: u64,

    /// Stars across the owned repositories.
    pub star_count: u64,
    pub follower_count: u64,

    /// Repositories the account owns, collaborates on or reaches through an organization.
    pub contributed_repo_count: u64,
    pub account_age: String,
}

impl RunTotals {
    #[must_use]
    pub const fn total_additions(&self) -> u64 {
        self.loc.total_additions
    }

    #[must_use]
    pub const fn total_deletions(&self) -> u64 {
        self.loc.total_deletions
    }

    #[must_use]
    pub const fn net(&self) -> i64 {
        self.loc.net
    }

    #[must_use]
    pub const fn total_attributed_commits(&self) -> u64 {
        self.loc.total_attributed_commits
    }

    #[must_use]
    pub const fn all_cache_hit(&self) -> bool {
        self.loc.all_cache_hit
    }
}

/// Collects the statistics of an account end to end.
pub struct Collector<T> {
    gateway: Gateway<T>,
    store: CacheStore,
    options: CollectorOptions,
    progress: Arc<dyn Progress>,
    now: DateTime<Utc>,
}

impl<T> core::fmt::Debug for Collector<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Collector")
            .field("store", &self.store)
            .field("options", &self.options)
            .field("progress", &"<dyn Progress>")
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Collector<T> {
    pub fn new(gateway: Gateway<T>, store: CacheStore, options: CollectorOptions, progress: impl Progress + 'static, now: DateTime<Utc>) -> Self {
        Self {
            gateway,
            store,
            options,
            progress: Arc::new(progress),
            now,
        }
    }

    #[must_use]
    pub const fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    /// Collect the statistics of `login`.
    ///
    /// The account age is measured from `birthday` when given, else from the account's
    /// creation date, up to `today`.
    pub async fn collect(&self, login: &str, force_refresh: bool, birthday: Option<NaiveDate>, today: NaiveDate) -> Result<RunTotals> {
        let run_start = Instant::now();

        self.progress.set_phase("Identifying");
        let target = login.to_string();
        self.progress.set_indeterminate(Box::new(move || format!("looking up {target}")));
        let account = fetch_account(&self.gateway, login).await?;
        log::debug!(target: LOG_TARGET, "Finished looking up '{login}' in {:.3}s", run_start.elapsed().as_secs_f64());

        self.progress.set_phase("Listing");
        let target = login.to_string();
        self.progress.set_indeterminate(Box::new(move || format!("repositories of {target}")));
        let listing_start = Instant::now();
        let page_size = self.options.repo_page_size;
        let (owned, all) = tokio::try_join!(
            list_repositories(&self.gateway, login, &[Affiliation::Owner], page_size),
            list_repositories(&self.gateway, login, &Affiliation::ALL, page_size),
        )?;

        let repo_count = owned.len() as u64;
        let star_count = owned.iter().map(|l| l.stars).sum();
        let repos = merge_listings(owned, all);
        let contributed_repo_count = repos.len() as u64;
        log::debug!(target: LOG_TARGET,
            "Finished listing {contributed_repo_count} repositories in {:.3}s",
            listing_start.elapsed().as_secs_f64()
        );

        let coordinator = RunCoordinator::new(
            &self.gateway,
            &self.store,
            Arc::clone(&self.progress),
            self.options.max_concurrent_repos,
            self.options.commit_page_size,
            self.now,
        );
        let aggregation_start = Instant::now();
        let loc = coordinator.run(login, &repos, &account.id, force_refresh).await?;
        log::debug!(target: LOG_TARGET, "Finished aggregating history in {:.3}s", aggregation_start.elapsed().as_secs_f64());

        self.progress.done();

        let born = birthday.unwrap_or_else(|| account.created_at.date_naive());
        log::debug!(target: LOG_TARGET,
            "Sent {} requests for '{login}' in {:.3}s",
            self.gateway.requests_sent(),
            run_start.elapsed().as_secs_f64()
        );

        Ok(RunTotals {
            login: account.login,
            loc,
            repo_count,
            star_count,
            follower_count: account.followers,
            contributed_repo_count,
            account_age: age_descriptor(born, today),
        })
    }
}
