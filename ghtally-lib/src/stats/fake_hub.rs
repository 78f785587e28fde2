//! A small in-memory stand-in for the GraphQL endpoint, for unit tests.

use super::gateway::queries::{COMMIT_HISTORY_QUERY, REPOSITORIES_QUERY, USER_QUERY};
use super::gateway::scripted::ScriptedTransport;
use super::gateway::{GraphQlRequest, RawResponse};
use crate::Result;
use ohno::bail;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FakeCommit {
    pub author: Option<&'static str>,
    pub additions: Option<u64>,
    pub deletions: Option<u64>,
}

pub const fn commit(author: &'static str, additions: u64, deletions: u64) -> FakeCommit {
    FakeCommit {
        author: Some(author),
        additions: Some(additions),
        deletions: Some(deletions),
    }
}

pub const fn unlinked(additions: u64, deletions: u64) -> FakeCommit {
    FakeCommit {
        author: None,
        additions: Some(additions),
        deletions: Some(deletions),
    }
}

#[derive(Debug, Clone)]
pub enum FakeRepo {
    History(Vec<FakeCommit>),
    NoBranch,

    /// Listed with the given commit total, but its history cannot be read.
    NotAccessible(u64),

    /// Listed with the given commit total, but history requests fail with an HTTP status.
    Failing(u16, u64),
}

impl FakeRepo {
    fn commit_total(&self) -> u64 {
        match self {
            Self::History(commits) => commits.len() as u64,
            Self::NoBranch => 0,
            Self::NotAccessible(total) | Self::Failing(_, total) => *total,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    repo: FakeRepo,
    owned: bool,
    stars: u64,
}

#[derive(Debug, Clone)]
pub struct FakeHub {
    user_id: &'static str,
    created_at: &'static str,
    followers: u64,
    repos: BTreeMap<String, Entry>,
}

impl FakeHub {
    pub fn new(user_id: &'static str) -> Self {
        Self {
            user_id,
            created_at: "2015-06-01T00:00:00Z",
            followers: 0,
            repos: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn followers(mut self, followers: u64) -> Self {
        self.followers = followers;
        self
    }

    #[must_use]
    pub fn owned(mut self, name: &str, stars: u64, repo: FakeRepo) -> Self {
        let _ = self.repos.insert(name.to_string(), Entry { repo, owned: true, stars });
        self
    }

    #[must_use]
    pub fn contributed(mut self, name: &str, stars: u64, repo: FakeRepo) -> Self {
        let _ = self.repos.insert(name.to_string(), Entry { repo, owned: false, stars });
        self
    }

    pub fn into_transport(self) -> ScriptedTransport {
        let hub = Arc::new(self);
        ScriptedTransport::new(move |request| hub.respond(request))
    }

    pub fn respond(&self, request: &GraphQlRequest) -> Result<RawResponse> {
        let vars = &request.variables;
        if request.query == USER_QUERY {
            return Ok(data(&json!({
                "user": { "id": self.user_id, "createdAt": self.created_at, "followers": { "totalCount": self.followers } }
            })));
        }

        if request.query == REPOSITORIES_QUERY {
            let affiliations: Vec<&str> = vars["affiliations"].as_array().into_iter().flatten().filter_map(Value::as_str).collect();
            let wants_owned = affiliations.contains(&"OWNER");
            let wants_others = affiliations.iter().any(|a| *a != "OWNER");
            let nodes: Vec<Value> = self
                .repos
                .iter()
                .filter(|(_, e)| (e.owned && wants_owned) || (!e.owned && wants_others))
                .map(|(name, e)| {
                    let total = e.repo.commit_total();
                    let branch = if matches!(e.repo, FakeRepo::NoBranch) {
                        Value::Null
                    } else {
                        json!({ "target": { "history": { "totalCount": total } } })
                    };
                    json!({ "nameWithOwner": name, "stargazers": { "totalCount": e.stars }, "defaultBranchRef": branch })
                })
                .collect();
            let (page, page_info) = paginate(&nodes, vars);
            return Ok(data(&json!({ "user": { "repositories": { "totalCount": nodes.len(), "nodes": page, "pageInfo": page_info } } })));
        }

        if request.query == COMMIT_HISTORY_QUERY {
            let name = format!("{}/{}", vars["owner"].as_str().unwrap_or_default(), vars["name"].as_str().unwrap_or_default());
            let Some(entry) = self.repos.get(&name) else {
                bail!("unknown repository {name}");
            };

            return Ok(match &entry.repo {
                FakeRepo::History(commits) => {
                    let nodes: Vec<Value> = commits
                        .iter()
                        .map(|c| {
                            json!({
                                "additions": c.additions,
                                "deletions": c.deletions,
                                "author": { "user": c.author.map(|id| json!({ "id": id })) },
                            })
                        })
                        .collect();
                    let (page, page_info) = paginate(&nodes, vars);
                    data(&json!({ "repository": { "defaultBranchRef": { "target": { "history": {
                        "totalCount": nodes.len(), "nodes": page, "pageInfo": page_info
                    } } } } }))
                }
                FakeRepo::NoBranch => data(&json!({ "repository": { "defaultBranchRef": null } })),
                FakeRepo::NotAccessible(_) => RawResponse::ok(
                    json!({
                        "data": { "repository": null },
                        "errors": [ { "type": "NOT_FOUND", "message": format!("Could not resolve to a Repository with the name '{name}'.") } ],
                    })
                    .to_string(),
                ),
                FakeRepo::Failing(status, _) => RawResponse::with_status(*status, ""),
            });
        }

        bail!("unexpected query for {}", request.label)
    }
}

fn data(value: &Value) -> RawResponse {
    RawResponse::ok(json!({ "data": value }).to_string())
}

/// Slice `items` by the `cursor` (an index) and `pageSize` variables.
fn paginate(items: &[Value], vars: &Value) -> (Vec<Value>, Value) {
    let start: usize = vars["cursor"].as_str().and_then(|c| c.parse().ok()).unwrap_or(0);
    let size = usize::try_from(vars["pageSize"].as_u64().unwrap_or(100)).unwrap_or(100);
    let end = (start + size).min(items.len());
    let has_next = end < items.len();
    let page = items.get(start..end).unwrap_or_default().to_vec();
    (page, json!({ "endCursor": end.to_string(), "hasNextPage": has_next }))
}
