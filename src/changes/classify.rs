//! Enumerate pending changes relative to HEAD.

use std::fmt;

use git2::{IndexAddOption, Repository, Status, StatusEntry, StatusOptions};
use serde::Serialize;
use tracing::debug;

use crate::error::RepoError;

/// How a path's working-directory state differs from HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
    Untracked,
    Other,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Added => "Added",
            ChangeKind::Modified => "Modified",
            ChangeKind::Deleted => "Deleted",
            ChangeKind::Renamed => "Renamed",
            ChangeKind::Untracked => "Untracked",
            ChangeKind::Other => "Other",
        }
    }

    /// Whether records of this kind carry before/after content.
    pub fn is_content_diffed(&self) -> bool {
        matches!(
            self,
            ChangeKind::Added | ChangeKind::Modified | ChangeKind::Deleted
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A changed path and its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPath {
    pub path: String,
    pub kind: ChangeKind,
    /// Source path for renames (None for every other kind).
    pub previous_path: Option<String>,
}

impl ClassifiedPath {
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            previous_path: None,
        }
    }
}

/// Result of classifying the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No staged or unstaged differences from HEAD.
    Clean,
    /// Changed paths, sorted by path.
    Changes(Vec<ClassifiedPath>),
}

/// Stage every pending change, like `git add -A`.
///
/// `add_all` picks up new and modified files, `update_all` drops index
/// entries whose files were deleted. Ignored files stay unstaged.
pub fn stage_all(repo: &Repository) -> Result<(), RepoError> {
    let mut index = repo.index().map_err(RepoError::Staging)?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .map_err(RepoError::Staging)?;
    index
        .update_all(["*"].iter(), None)
        .map_err(RepoError::Staging)?;
    index.write().map_err(RepoError::Staging)?;
    Ok(())
}

/// Stage all pending changes, then classify every changed path.
pub fn classify(repo: &Repository) -> Result<Classification, RepoError> {
    stage_all(repo)?;
    classify_staged(repo)
}

/// Classify changed paths without touching the index.
pub fn classify_staged(repo: &Repository) -> Result<Classification, RepoError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false)
        .exclude_submodules(true)
        .renames_head_to_index(true);

    let statuses = repo.statuses(Some(&mut opts)).map_err(RepoError::Status)?;

    let mut changes = Vec::new();
    for entry in statuses.iter() {
        if let Some(change) = classify_entry(&entry)? {
            changes.push(change);
        }
    }

    // Status order is not something to rely on; prompts must be reproducible.
    changes.sort_by(|a, b| a.path.cmp(&b.path));

    if changes.is_empty() {
        debug!("working tree is clean");
        return Ok(Classification::Clean);
    }

    Ok(Classification::Changes(changes))
}

/// Map a status bitset to exactly one change kind.
///
/// Index state wins over worktree state, and within the index a modification
/// wins over an addition, which wins over a deletion.
pub fn kind_for_status(status: Status) -> ChangeKind {
    if status.is_index_modified() {
        ChangeKind::Modified
    } else if status.is_index_new() {
        ChangeKind::Added
    } else if status.is_index_deleted() {
        ChangeKind::Deleted
    } else if status.is_index_renamed() {
        ChangeKind::Renamed
    } else if status.is_wt_new() {
        ChangeKind::Untracked
    } else {
        ChangeKind::Other
    }
}

fn classify_entry(entry: &StatusEntry<'_>) -> Result<Option<ClassifiedPath>, RepoError> {
    let status = entry.status();
    if status.is_empty() || status.is_ignored() {
        return Ok(None);
    }

    let kind = kind_for_status(status);

    let (path, previous_path) = match (kind, entry.head_to_index()) {
        (ChangeKind::Renamed, Some(delta)) => {
            let old_path = delta.old_file().path_bytes().map(utf8_path).transpose()?;
            let new_path = delta.new_file().path_bytes().map(utf8_path).transpose()?;
            (new_path.or_else(|| old_path.clone()), old_path)
        }
        _ => (Some(utf8_path(entry.path_bytes())?), None),
    };

    let Some(path) = path.filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    debug!(path = %path, %kind, ?status, "classified path");

    Ok(Some(ClassifiedPath {
        path,
        kind,
        previous_path,
    }))
}

/// Paths end up as JSON strings in the request, so they must be valid UTF-8.
fn utf8_path(bytes: &[u8]) -> Result<String, RepoError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| RepoError::NonUtf8Path {
            path: String::from_utf8_lossy(bytes).into_owned(),
        })
}
