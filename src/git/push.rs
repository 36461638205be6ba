//! Pushing to remotes.
//!
//! Shells out to the system `git` binary, inheriting the user's existing git
//! config, SSH agent, and credential store.

use std::path::Path;
use std::process::Command;

use git2::Repository;
use tracing::info;

use crate::error::CommitError;

/// Remotes to push to: the configured list, or every remote the repository has.
pub fn push_targets(repo: &Repository, configured: &[String]) -> Result<Vec<String>, CommitError> {
    if !configured.is_empty() {
        return Ok(configured.to_vec());
    }

    let remotes = repo.remotes().map_err(CommitError::RemotesUnavailable)?;
    Ok(remotes.iter().flatten().map(str::to_string).collect())
}

/// Push the current branch to each remote in turn, stopping at the first failure.
pub fn push_all(workdir: &Path, remotes: &[String]) -> Result<(), CommitError> {
    for remote in remotes {
        push(workdir, remote)?;
        info!(%remote, "pushed");
    }
    Ok(())
}

/// `git push <remote> HEAD` from `workdir`.
fn push(workdir: &Path, remote: &str) -> Result<(), CommitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(workdir)
        .args(["push", remote, "HEAD"])
        .output()
        .map_err(|source| CommitError::GitSpawn {
            operation: format!("push {}", remote),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CommitError::PushFailed {
            remote: remote.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }

    Ok(())
}
