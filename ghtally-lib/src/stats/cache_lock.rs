use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "     cache";

/// Exclusive hold on one identity's cache file for the duration of a run.
///
/// Two concurrent runs for the same identity would otherwise both load the same snapshot
/// and the later save would silently discard the earlier one's work.
#[derive(Debug)]
pub struct CacheLockGuard {
    file: File,
    path: PathBuf,
}

impl Drop for CacheLockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!(target: LOG_TARGET, "Could not unlock cache at '{}': {e:#}", self.path.display());
        }
    }
}

/// Block until the advisory lock at `lock_path` is held.
pub async fn acquire_cache_lock(lock_path: &Path) -> Result<CacheLockGuard> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .into_app_err_with(|| format!("opening cache lock file at '{}'", lock_path.display()))?;

    // May block for as long as another run holds the lock.
    let path = lock_path.to_path_buf();
    let guard = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on '{}'", path.display()))?;
        log::debug!(target: LOG_TARGET, "Acquired cache lock at '{}'", path.display());
        Ok::<_, ohno::AppError>(CacheLockGuard { file, path })
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(guard)
}
