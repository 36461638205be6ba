//! Commit creation using git2-rs.

use git2::{IndexAddOption, Oid, Repository};
use tracing::debug;

use crate::error::CommitError;

/// Stage all changes and create a commit.
///
/// Uses `index.add_all()` plus `index.update_all()` to stage everything
/// (like `git add -A`), then creates a commit on HEAD with the given message.
/// On an unborn branch the commit has no parent.
pub fn stage_and_commit(repo: &Repository, message: &str) -> Result<Oid, CommitError> {
    let mut index = repo.index().map_err(CommitError::StagingFailed)?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .map_err(CommitError::StagingFailed)?;
    index
        .update_all(["*"].iter(), None)
        .map_err(CommitError::StagingFailed)?;
    index.write().map_err(CommitError::StagingFailed)?;

    let tree_id = index.write_tree().map_err(CommitError::StagingFailed)?;
    let tree = repo.find_tree(tree_id).map_err(CommitError::CommitFailed)?;

    // Signature comes from git config (user.name / user.email)
    let sig = repo.signature().map_err(CommitError::ConfigError)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(CommitError::CommitFailed)?),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
        Err(e) => return Err(CommitError::CommitFailed(e)),
    };
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

    let oid = repo
        .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .map_err(CommitError::CommitFailed)?;

    debug!(%oid, "created commit");
    Ok(oid)
}
