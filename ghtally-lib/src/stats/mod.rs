//! Contribution statistics for a single GitHub identity
//!
//! This module computes per-account statistics from the GitHub GraphQL API. The expensive
//! part is walking the commit history of every repository the account can reach, so the
//! results are kept in a per-identity cache and recomputed only for repositories whose
//! default-branch commit total changed since the previous run.
//!
//! # Implementation Model
//!
//! - [`Gateway`] sends GraphQL requests through a [`Transport`], classifies failures and
//!   retries transient ones according to a [`RetryPolicy`].
//! - [`RepositoryAggregator`] decides whether a cached [`RepoAggregate`] is still valid and,
//!   if not, paginates the default-branch history summing the identity's additions and deletions.
//! - [`RunCoordinator`] fans the aggregator out over the repository set with bounded
//!   concurrency, then persists exactly one entry per current repository through the
//!   [`CacheStore`].
//! - [`Collector`] ties it together with the account lookup and repository listings to
//!   produce the [`RunTotals`] handed to the report sinks.

mod account;
mod account_age;
mod aggregator;
mod cache_key;
mod cache_lock;
mod cache_store;
mod collector;
mod coordinator;
#[cfg(test)]
mod fake_hub;
pub mod gateway;
mod listing;
mod progress;
mod repo_aggregate;
mod repo_ref;

pub use account::{Account, fetch_account};
pub use account_age::age_descriptor;
pub use aggregator::{AggregateOutcome, Aggregation, RepositoryAggregator};
pub use cache_key::CacheKey;
pub use cache_lock::CacheLockGuard;
pub use cache_store::{Cache, CacheStore};
pub use collector::{Collector, CollectorOptions, RunTotals};
pub use coordinator::{LocTotals, RunCoordinator, RunCounts};
pub use gateway::{FailureKind, Gateway, GatewayError, GraphQlRequest, HttpTransport, RawResponse, RetryPolicy, Transport};
pub use listing::{Affiliation, RepoListing, list_repositories, merge_listings};
pub use progress::{NoProgress, Progress};
pub use repo_aggregate::RepoAggregate;
pub use repo_ref::RepositoryRef;
