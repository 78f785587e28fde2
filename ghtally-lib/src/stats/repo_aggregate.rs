use super::{CacheKey, RepositoryRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Cached per-repository result of a commit-history walk.
///
/// Entries are never mutated in place: a recomputation produces a new value that replaces
/// the old one in the next run's cache. Every numeric field defaults to zero when missing
/// from the persisted file so older cache files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoAggregate {
    /// Canonical `owner/name` of the repository.
    #[serde(alias = "name_with_owner")]
    pub name: String,

    #[serde(rename = "hash", alias = "repo_hash")]
    pub cache_key: CacheKey,

    /// Default-branch commit total observed when this entry was computed.
    #[serde(default)]
    pub commit_count: u64,

    #[serde(default)]
    pub additions: u64,

    #[serde(default)]
    pub deletions: u64,

    /// Commits attributed to the identity under measurement.
    #[serde(default)]
    pub my_commits: u64,

    /// RFC 3339 when written by this tool; older files may hold epoch seconds.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: DateTime<Utc>,

    /// Placeholder written when the history could not be fetched and no earlier values
    /// existed. Such entries are never reused.
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub partial: bool,
}

/// Accept an RFC 3339 string or (fractional) Unix seconds; anything else reads as the epoch.
fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => DateTime::parse_from_rfc3339(&text).ok().map(|t| t.with_timezone(&Utc)),
        Some(Value::Number(number)) => number.as_f64().and_then(from_epoch_seconds),
        _ => None,
    };
    Ok(parsed.unwrap_or_default())
}

fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    let millis = (seconds * 1000.0).round();
    if !millis.is_finite() || millis.abs() >= 1e15 {
        return None;
    }

    #[expect(clippy::cast_possible_truncation, reason = "magnitude checked above")]
    let millis = millis as i64;
    DateTime::from_timestamp_millis(millis)
}

impl RepoAggregate {
    /// A freshly computed aggregate.
    ///
    /// The recorded commit count is raised to `my_commits` if the history grew between
    /// listing and pagination, which also guarantees a recomputation on the next run.
    #[must_use]
    pub fn computed(repo: &RepositoryRef, commit_count: u64, additions: u64, deletions: u64, my_commits: u64, now: DateTime<Utc>) -> Self {
        Self {
            name: repo.canonical(),
            cache_key: CacheKey::for_repo(repo),
            commit_count: commit_count.max(my_commits),
            additions,
            deletions,
            my_commits,
            updated_at: now,
            partial: false,
        }
    }

    /// An all-zero aggregate (empty or inaccessible repository).
    #[must_use]
    pub fn zero(repo: &RepositoryRef, commit_count: u64, now: DateTime<Utc>) -> Self {
        Self::computed(repo, commit_count, 0, 0, 0, now)
    }

    /// An all-zero aggregate standing in for a history that could not be fetched.
    #[must_use]
    pub fn placeholder(repo: &RepositoryRef, commit_count: u64, now: DateTime<Utc>) -> Self {
        Self {
            partial: true,
            ..Self::zero(repo, commit_count, now)
        }
    }

    /// Whether this entry can be reused for a repository whose current commit total is `current_total`.
    #[must_use]
    pub const fn is_reusable_for(&self, current_total: u64) -> bool {
        !self.partial && self.commit_count == current_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepositoryRef {
        RepositoryRef::parse("alice/repo1").unwrap()
    }

    #[test]
    fn test_computed_fields() {
        let now = Utc::now();
        let agg = RepoAggregate::computed(&repo(), 5, 100, 20, 3, now);
        assert_eq!(agg.name, "alice/repo1");
        assert_eq!(agg.cache_key, CacheKey::for_repo(&repo()));
        assert_eq!(agg.commit_count, 5);
        assert_eq!(agg.additions, 100);
        assert_eq!(agg.deletions, 20);
        assert_eq!(agg.my_commits, 3);
        assert_eq!(agg.updated_at, now);
        assert!(!agg.partial);
    }

    #[test]
    fn test_computed_keeps_attributed_within_total() {
        let agg = RepoAggregate::computed(&repo(), 2, 0, 0, 4, Utc::now());
        assert_eq!(agg.commit_count, 4);
        assert!(agg.my_commits <= agg.commit_count);
    }

    #[test]
    fn test_reusable_only_for_matching_total() {
        let agg = RepoAggregate::computed(&repo(), 10, 1, 1, 1, Utc::now());
        assert!(agg.is_reusable_for(10));
        assert!(!agg.is_reusable_for(11));
    }

    #[test]
    fn test_placeholder_never_reusable() {
        let agg = RepoAggregate::placeholder(&repo(), 10, Utc::now());
        assert!(!agg.is_reusable_for(10));
        assert_eq!(agg.additions, 0);
    }

    #[test]
    fn test_missing_numeric_fields_default_to_zero() {
        let json = r#"{ "name": "alice/repo1", "hash": "abc" }"#;
        let agg: RepoAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.commit_count, 0);
        assert_eq!(agg.additions, 0);
        assert_eq!(agg.deletions, 0);
        assert_eq!(agg.my_commits, 0);
        assert_eq!(agg.updated_at, DateTime::from_timestamp(0, 0).unwrap());
        assert!(!agg.partial);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = r#"{ "name": "alice/repo1", "hash": "abc", "additions": 7, "future_field": [1, 2] }"#;
        let agg: RepoAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.additions, 7);
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let json = r#"{
            "name_with_owner": "alice/repo1",
            "repo_hash": "abc",
            "commit_count": 12,
            "my_commits": 4
        }"#;
        let agg: RepoAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.name, "alice/repo1");
        assert_eq!(agg.cache_key.as_str(), "abc");
        assert_eq!(agg.commit_count, 12);
        assert_eq!(agg.my_commits, 4);
    }

    #[test]
    fn test_updated_at_accepts_epoch_seconds() {
        let json = r#"{ "name": "alice/repo1", "hash": "abc", "updated_at": 1700000000.25 }"#;
        let agg: RepoAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.updated_at, DateTime::from_timestamp_millis(1_700_000_000_250).unwrap());

        let json = r#"{ "name": "alice/repo1", "hash": "abc", "updated_at": 1700000000 }"#;
        let agg: RepoAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.updated_at, DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn test_updated_at_accepts_rfc3339() {
        let json = r#"{ "name": "alice/repo1", "hash": "abc", "updated_at": "2024-05-01T12:00:00+02:00" }"#;
        let agg: RepoAggregate = serde_json::from_str(json).unwrap();
        assert_eq!(agg.updated_at, DateTime::from_timestamp(1_714_557_600, 0).unwrap());
    }

    #[test]
    fn test_unreadable_updated_at_reads_as_epoch() {
        for value in ["null", r#""yesterday""#, "true", "1e300"] {
            let json = format!(r#"{{ "name": "alice/repo1", "hash": "abc", "commit_count": 3, "updated_at": {value} }}"#);
            let agg: RepoAggregate = serde_json::from_str(&json).unwrap();
            assert_eq!(agg.updated_at, DateTime::from_timestamp(0, 0).unwrap(), "{value}");
            assert_eq!(agg.commit_count, 3);
        }
    }

    #[test]
    fn test_partial_flag_omitted_when_false() {
        let agg = RepoAggregate::zero(&repo(), 0, Utc::now());
        let json = serde_json::to_string(&agg).unwrap();
        assert!(!json.contains("partial"));

        let placeholder = RepoAggregate::placeholder(&repo(), 0, Utc::now());
        let json = serde_json::to_string(&placeholder).unwrap();
        assert!(json.contains("\"partial\":true"));
    }

    #[test]
    fn test_large_values_survive_serialization() {
        let big = u64::from(u32::MAX) * 3;
        let agg = RepoAggregate::computed(&repo(), big, big, big, big, Utc::now());
        let json = serde_json::to_string(&agg).unwrap();
        let back: RepoAggregate = serde_json::from_str(&json).unwrap();
        assert_eq!(agg, back);
    }
}
