use crate::Result;
use core::fmt::{Display, Formatter};
use ohno::bail;
use std::sync::Arc;

/// Identity of a repository on the hosting service: `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryRef {
    owner: Arc<str>,
    name: Arc<str>,
}

impl RepositoryRef {
    /// Build a reference from its two parts.
    pub fn new(owner: &str, name: &str) -> Result<Self> {
        if owner.is_empty() || name.is_empty() {
            bail!("invalid repository reference: empty owner or name in '{owner}/{name}'");
        }

        if owner.contains('/') || name.contains('/') {
            bail!("invalid repository reference: '{owner}/{name}' has too many path segments");
        }

        Ok(Self {
            owner: Arc::from(owner),
            name: Arc::from(name),
        })
    }

    /// Parse the `owner/name` form returned by the API as `nameWithOwner`.
    pub fn parse(name_with_owner: &str) -> Result<Self> {
        let Some((owner, name)) = name_with_owner.split_once('/') else {
            bail!("invalid repository reference '{name_with_owner}': expected 'owner/name'");
        };

        Self::new(owner, name)
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical `owner/name` string, which is what gets hashed into a cache key.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl Display for RepositoryRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_with_owner() {
        let repo = RepositoryRef::parse("alice/repo1").unwrap();
        assert_eq!(repo.owner(), "alice");
        assert_eq!(repo.name(), "repo1");
        assert_eq!(repo.canonical(), "alice/repo1");
    }

    #[test]
    fn test_display_matches_canonical() {
        let repo = RepositoryRef::parse("rust-lang/rust").unwrap();
        assert_eq!(repo.to_string(), repo.canonical());
    }

    #[test]
    fn test_parse_missing_slash() {
        let _ = RepositoryRef::parse("alice").unwrap_err();
    }

    #[test]
    fn test_parse_empty_owner() {
        let _ = RepositoryRef::parse("/repo").unwrap_err();
    }

    #[test]
    fn test_parse_empty_name() {
        let _ = RepositoryRef::parse("alice/").unwrap_err();
    }

    #[test]
    fn test_parse_extra_segments() {
        let _ = RepositoryRef::parse("alice/repo/tree").unwrap_err();
    }

    #[test]
    fn test_equality_and_ordering() {
        let a = RepositoryRef::parse("alice/a").unwrap();
        let b = RepositoryRef::parse("alice/b").unwrap();
        assert_eq!(a, a.clone());
        assert!(a < b);
    }
}
