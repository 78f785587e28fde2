use super::RepositoryRef;
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One-way hash of a repository's canonical name, used as the key of the persisted cache
/// so the cache file does not carry repository names in its keys.
///
/// A renamed repository hashes to a different key and is treated as a new entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn for_repo(repo: &RepositoryRef) -> Self {
        Self(sha256_hex(&repo.canonical()))
    }

    /// Key for an identity (login), which names the per-identity cache file.
    #[must_use]
    pub fn for_identity(identity: &str) -> Self {
        Self(sha256_hex(identity))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
