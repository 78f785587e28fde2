use super::gateway::queries::{COMMIT_HISTORY_QUERY, HistoryData};
use super::{Gateway, GatewayError, GraphQlRequest, RepoAggregate, RepositoryRef, Transport};
use chrono::{DateTime, Utc};

const LOG_TARGET: &str = "aggregator";

/// How an aggregate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateOutcome {
    /// The cached entry was still valid and reused without any request.
    CacheHit,

    /// The history was paginated in full.
    Computed,

    /// The repository has no default branch.
    Empty,

    /// The history cannot be read with the current credentials; the aggregate is zero.
    Inaccessible,

    /// The history could not be fetched after retrying. The aggregate is the previous
    /// cached entry, or a zero placeholder when there was none.
    Degraded,
}

/// Result of aggregating one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub aggregate: RepoAggregate,
    pub outcome: AggregateOutcome,

    /// History pages requested.
    pub requests: u64,
}

impl Aggregation {
    const fn new(aggregate: RepoAggregate, outcome: AggregateOutcome, requests: u64) -> Self {
        Self { aggregate, outcome, requests }
    }
}

#[derive(Debug, Default)]
struct Tally {
    additions: u64,
    deletions: u64,
    commits: u64,
}

/// Computes the attributed additions, deletions and commit count of a single repository.
#[derive(Debug)]
pub struct RepositoryAggregator<'a, T> {
    gateway: &'a Gateway<T>,
    page_size: u32,
    now: DateTime<Utc>,
}

impl<'a, T: Transport> RepositoryAggregator<'a, T> {
    pub const fn new(gateway: &'a Gateway<T>, page_size: u32, now: DateTime<Utc>) -> Self {
        Self { gateway, page_size, now }
    }

    /// Aggregate `repo` for the account with node id `identity_id`.
    ///
    /// `cached` is reused untouched when its commit count equals `current_commit_total`
    /// and `force_refresh` is off. Otherwise the default-branch history is paginated.
    ///
    /// Inaccessible histories and transient failures that outlast the retry budget are
    /// absorbed here (see [`AggregateOutcome`]); only fatal failures are returned.
    pub async fn aggregate(
        &self,
        repo: &RepositoryRef,
        identity_id: &str,
        cached: Option<&RepoAggregate>,
        current_commit_total: u64,
        force_refresh: bool,
    ) -> Result<Aggregation, GatewayError> {
        if !force_refresh
            && let Some(entry) = cached
            && entry.is_reusable_for(current_commit_total)
        {
            log::debug!(target: LOG_TARGET, "Cache hit for '{repo}' ({current_commit_total} commits)");
            return Ok(Aggregation::new(entry.clone(), AggregateOutcome::CacheHit, 0));
        }

        if current_commit_total == 0 {
            log::debug!(target: LOG_TARGET, "'{repo}' has no commits on a default branch");
            return Ok(Aggregation::new(RepoAggregate::zero(repo, 0, self.now), AggregateOutcome::Empty, 0));
        }

        match cached {
            Some(entry) => log::info!(target: LOG_TARGET,
                "Recomputing '{repo}': {} commits cached, {current_commit_total} now",
                entry.commit_count
            ),
            None => log::info!(target: LOG_TARGET, "Computing '{repo}' ({current_commit_total} commits)"),
        }

        let mut tally = Tally::default();
        let mut cursor: Option<String> = None;
        let mut page = 0_u64;

        loop {
            page += 1;
            let request = history_request(repo, self.page_size, cursor.as_deref(), page);

            let data: HistoryData = match self.gateway.execute(&request).await {
                Ok(data) => data,
                Err(e) if e.kind().is_skippable() => {
                    log::warn!(target: LOG_TARGET, "'{repo}' is not accessible, counting it as zero: {e}");
                    return Ok(Aggregation::new(
                        RepoAggregate::zero(repo, current_commit_total, self.now),
                        AggregateOutcome::Inaccessible,
                        page,
                    ));
                }
                Err(e) if e.kind().is_transient() => {
                    return Ok(self.degraded(repo, cached, current_commit_total, page, &e));
                }
                Err(e) => return Err(e),
            };

            let Some(history) = data.into_history() else {
                log::debug!(target: LOG_TARGET, "'{repo}' has no default branch");
                return Ok(Aggregation::new(RepoAggregate::zero(repo, 0, self.now), AggregateOutcome::Empty, page));
            };

            for commit in history.nodes.iter().flatten() {
                if commit.author_id() == Some(identity_id) {
                    tally.commits += 1;
                    tally.additions = tally.additions.saturating_add(commit.additions.unwrap_or(0));
                    tally.deletions = tally.deletions.saturating_add(commit.deletions.unwrap_or(0));
                }
            }

            log::trace!(target: LOG_TARGET, "'{repo}' page {page}: {} commits attributed so far", tally.commits);

            match history.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        log::debug!(target: LOG_TARGET,
            "'{repo}': {} commits attributed, +{} -{} over {page} page(s)",
            tally.commits,
            tally.additions,
            tally.deletions
        );

        let aggregate = RepoAggregate::computed(repo, current_commit_total, tally.additions, tally.deletions, tally.commits, self.now);
        Ok(Aggregation::new(aggregate, AggregateOutcome::Computed, page))
    }

    fn degraded(&self, repo: &RepositoryRef, cached: Option<&RepoAggregate>, current_commit_total: u64, requests: u64, error: &GatewayError) -> Aggregation {
        let aggregate = if let Some(entry) = cached {
            log::warn!(target: LOG_TARGET, "Unable to fetch history of '{repo}', keeping previous values: {error}");
            entry.clone()
        } else {
            log::warn!(target: LOG_TARGET, "Unable to fetch history of '{repo}', counting it as zero for now: {error}");
            RepoAggregate::placeholder(repo, current_commit_total, self.now)
        };

        Aggregation::new(aggregate, AggregateOutcome::Degraded, requests)
    }
}

fn history_request(repo: &RepositoryRef, page_size: u32, cursor: Option<&str>, page: u64) -> GraphQlRequest {
    GraphQlRequest::new(
        COMMIT_HISTORY_QUERY,
        serde_json::json!({
            "owner": repo.owner(),
            "name": repo.name(),
            "pageSize": page_size,
            "cursor": cursor,
        }),
        format!("history of '{repo}', page {page}"),
    )
}
