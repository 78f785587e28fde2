//! GraphQL documents and the shapes of their `data` payloads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Identity lookup for a login.
pub const USER_QUERY: &str = "
query($login: String!) {
    user(login: $login) {
        id
        createdAt
        followers {
            totalCount
        }
    }
}";

/// One page of a user's repositories, filtered by owner affiliation.
pub const REPOSITORIES_QUERY: &str = "
query($login: String!, $affiliations: [RepositoryAffiliation], $pageSize: Int!, $cursor: String) {
    user(login: $login) {
        repositories(first: $pageSize, after: $cursor, ownerAffiliations: $affiliations) {
            totalCount
            nodes {
                nameWithOwner
                stargazers {
                    totalCount
                }
                defaultBranchRef {
                    target {
                        ... on Commit {
                            history {
                                totalCount
                            }
                        }
                    }
                }
            }
            pageInfo {
                endCursor
                hasNextPage
            }
        }
    }
}";

/// One page of a repository's default-branch commit history.
pub const COMMIT_HISTORY_QUERY: &str = "
query($owner: String!, $name: String!, $pageSize: Int!, $cursor: String) {
    repository(owner: $owner, name: $name) {
        defaultBranchRef {
            target {
                ... on Commit {
                    history(first: $pageSize, after: $cursor) {
                        totalCount
                        nodes {
                            additions
                            deletions
                            author {
                                user {
                                    id
                                }
                            }
                        }
                        pageInfo {
                            endCursor
                            hasNextPage
                        }
                    }
                }
            }
        }
    }
}";

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub end_cursor: Option<String>,
    #[serde(default)]
    pub has_next_page: bool,
}

impl PageInfo {
    /// The cursor for the following page, if there is one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page { self.end_cursor.as_deref() } else { None }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub user: Option<UserNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserNode {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub followers: TotalCount,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesData {
    pub user: Option<RepositoriesUser>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesUser {
    pub repositories: RepositoryConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConnection {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub nodes: Vec<Option<RepositoryNode>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub name_with_owner: String,
    #[serde(default)]
    pub stargazers: TotalCount,
    #[serde(default)]
    pub default_branch_ref: Option<BranchRef<CommitTotal>>,
}

impl RepositoryNode {
    /// Commit total of the default branch, zero for an empty repository.
    #[must_use]
    pub fn commit_total(&self) -> u64 {
        self.default_branch_ref
            .as_ref()
            .and_then(|branch| branch.target.as_ref())
            .and_then(|target| target.history)
            .map_or(0, |history| history.total_count)
    }
}

/// `defaultBranchRef { target { ... } }`; the target is only populated when it is a commit.
#[derive(Debug, Deserialize)]
pub struct BranchRef<T> {
    #[serde(default)]
    pub target: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommitTotal {
    #[serde(default)]
    pub history: Option<TotalCount>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryData {
    pub repository: Option<HistoryRepository>,
}

impl HistoryData {
    /// The history page, or `None` when the repository has no default branch.
    #[must_use]
    pub fn into_history(self) -> Option<HistoryConnection> {
        self.repository?.default_branch_ref?.target?.history
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRepository {
    #[serde(default)]
    pub default_branch_ref: Option<BranchRef<HistoryTarget>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryTarget {
    #[serde(default)]
    pub history: Option<HistoryConnection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryConnection {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub nodes: Vec<Option<CommitNode>>,
    #[serde(default)]
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct CommitNode {
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
    #[serde(default)]
    pub author: Option<CommitAuthor>,
}

impl CommitNode {
    /// Account id of the author, `None` when the commit is not linked to an account.
    #[must_use]
    pub fn author_id(&self) -> Option<&str> {
        self.author.as_ref()?.user.as_ref().map(|user| user.id.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub user: Option<AuthorUser>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorUser {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_data() {
        let json = r#"{ "user": { "id": "U_1", "createdAt": "2019-03-04T05:06:07Z", "followers": { "totalCount": 42 } } }"#;
        let data: UserData = serde_json::from_str(json).unwrap();
        let user = data.user.unwrap();
        assert_eq!(user.id, "U_1");
        assert_eq!(user.followers.total_count, 42);
        assert_eq!(user.created_at.to_rfc3339(), "2019-03-04T05:06:07+00:00");
    }

    #[test]
    fn test_missing_user() {
        let data: UserData = serde_json::from_str(r#"{ "user": null }"#).unwrap();
        assert!(data.user.is_none());
    }

    #[test]
    fn test_repository_page() {
        let json = r#"{ "user": { "repositories": {
            "totalCount": 3,
            "nodes": [
                { "nameWithOwner": "alice/repo1", "stargazers": { "totalCount": 7 },
                  "defaultBranchRef": { "target": { "history": { "totalCount": 5 } } } },
                { "nameWithOwner": "alice/empty", "stargazers": { "totalCount": 0 }, "defaultBranchRef": null },
                { "nameWithOwner": "alice/tag-target", "stargazers": { "totalCount": 1 },
                  "defaultBranchRef": { "target": {} } },
                null
            ],
            "pageInfo": { "endCursor": "Y3Vyc29y", "hasNextPage": true }
        } } }"#;

        let data: RepositoriesData = serde_json::from_str(json).unwrap();
        let connection = data.user.unwrap().repositories;
        let nodes: Vec<_> = connection.nodes.iter().flatten().collect();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].commit_total(), 5);
        assert_eq!(nodes[0].stargazers.total_count, 7);
        assert_eq!(nodes[1].commit_total(), 0);
        assert_eq!(nodes[2].commit_total(), 0);
        assert_eq!(connection.page_info.next_cursor(), Some("Y3Vyc29y"));
    }

    #[test]
    fn test_history_page() {
        let json = r#"{ "repository": { "defaultBranchRef": { "target": { "history": {
            "totalCount": 3,
            "nodes": [
                { "additions": 10, "deletions": 2, "author": { "user": { "id": "U_1" } } },
                { "additions": null, "deletions": 1, "author": { "user": null } },
                { "author": null }
            ],
            "pageInfo": { "endCursor": "abc", "hasNextPage": false }
        } } } } }"#;

        let data: HistoryData = serde_json::from_str(json).unwrap();
        let history = data.into_history().unwrap();
        assert_eq!(history.total_count, 3);
        let nodes: Vec<_> = history.nodes.iter().flatten().collect();
        assert_eq!(nodes[0].author_id(), Some("U_1"));
        assert_eq!(nodes[1].author_id(), None);
        assert_eq!(nodes[1].additions, None);
        assert_eq!(nodes[2].author_id(), None);
        assert_eq!(history.page_info.next_cursor(), None);
    }

    #[test]
    fn test_history_without_default_branch() {
        let data: HistoryData = serde_json::from_str(r#"{ "repository": { "defaultBranchRef": null } }"#).unwrap();
        assert!(data.into_history().is_none());
    }

    #[test]
    fn test_page_info_without_cursor() {
        let info = PageInfo {
            end_cursor: None,
            has_next_page: true,
        };
        assert_eq!(info.next_cursor(), None);
    }
}
