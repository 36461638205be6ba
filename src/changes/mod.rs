//! Change extraction and request assembly.
//!
//! Classify every pending path, resolve its before/after content, and wrap
//! the resulting records in a request payload for the generation backend.

pub mod assemble;
pub mod classify;
pub mod content;
pub mod prompt;

use std::path::Path;

use git2::Repository;
use tracing::debug;

use crate::error::{PipelineError, RepoError};

pub use assemble::{ChangeRecord, assemble};
pub use classify::{ChangeKind, Classification, ClassifiedPath, classify, stage_all};
pub use content::{BINARY_SENTINEL, ContentSource, RepoContent, Resolution, Side};
pub use prompt::{INSTRUCTION, RULES, RequestPayload, build_request};

/// Outcome of collecting changes from the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collected {
    /// Nothing differs from HEAD.
    Clean,
    Request(RequestPayload),
}

/// Open the repository containing `path`.
pub fn open_repository(path: &Path) -> Result<Repository, RepoError> {
    Repository::discover(path).map_err(RepoError::OpenRepository)
}

/// Stage everything, classify, resolve content, and build the request.
///
/// Runs to completion or to the first error; a failure on any single path
/// means no payload at all.
pub fn collect_request(repo: &Repository) -> Result<Collected, PipelineError> {
    let source = RepoContent::open(repo)?;

    let classified = match classify(repo)? {
        Classification::Clean => return Ok(Collected::Clean),
        Classification::Changes(changes) => changes,
    };
    debug!("{} changed paths", classified.len());

    let records = assemble(&source, &classified)?;
    Ok(Collected::Request(build_request(records)))
}
