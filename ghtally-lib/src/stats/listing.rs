use super::gateway::queries::{REPOSITORIES_QUERY, RepositoriesData};
use super::{CacheKey, Gateway, GraphQlRequest, RepositoryRef, Transport};
use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::{IntoAppError, bail};
use serde::Serialize;
use std::collections::HashSet;

const LOG_TARGET: &str = "   listing";

/// How a user is related to the owner of a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Affiliation {
    Owner,
    Collaborator,
    OrganizationMember,
}

impl Affiliation {
    /// Every affiliation, i.e. all repositories the user can contribute to.
    pub const ALL: [Self; 3] = [Self::Owner, Self::Collaborator, Self::OrganizationMember];
}

impl Display for Affiliation {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Owner => "OWNER",
            Self::Collaborator => "COLLABORATOR",
            Self::OrganizationMember => "ORGANIZATION_MEMBER",
        };
        f.write_str(s)
    }
}

/// A repository as seen in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoListing {
    pub repo: RepositoryRef,

    /// Default-branch commit total, zero when there is no default branch.
    pub commit_total: u64,
    pub stars: u64,
}

impl RepoListing {
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_repo(&self.repo)
    }
}

/// List every repository of `login` matching any of `affiliations`, following pagination to the end.
pub async fn list_repositories<T: Transport>(
    gateway: &Gateway<T>,
    login: &str,
    affiliations: &[Affiliation],
    page_size: u32,
) -> Result<Vec<RepoListing>> {
    let filter = affiliations.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
    let mut listings = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page = 0_u32;

    loop {
        page += 1;
        let request = GraphQlRequest::new(
            REPOSITORIES_QUERY,
            serde_json::json!({
                "login": login,
                "affiliations": affiliations,
                "pageSize": page_size,
                "cursor": cursor,
            }),
            format!("repositories of '{login}' ({filter}), page {page}"),
        );

        let data: RepositoriesData = gateway.execute(&request).await.into_app_err_with(|| format!("listing repositories of '{login}'"))?;
        let Some(user) = data.user else {
            bail!("user '{login}' not found");
        };

        let connection = user.repositories;
        for node in connection.nodes.into_iter().flatten() {
            let commit_total = node.commit_total();
            listings.push(RepoListing {
                repo: RepositoryRef::parse(&node.name_with_owner)?,
                commit_total,
                stars: node.stargazers.total_count,
            });
        }

        match connection.page_info.next_cursor() {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    log::debug!(target: LOG_TARGET, "Found {} repositories for '{login}' ({filter}) in {page} page(s)", listings.len());
    Ok(listings)
}

/// Union of two listings, de-duplicated by repository identity.
///
/// Affiliation sets overlap (an owned repository is also reachable through the full
/// listing), so the first occurrence of each repository wins.
#[must_use]
pub fn merge_listings(first: Vec<RepoListing>, second: Vec<RepoListing>) -> Vec<RepoListing> {
    let mut seen = HashSet::new();
    first.into_iter().chain(second).filter(|listing| seen.insert(listing.cache_key())).collect()
}
