//! Turn classified paths into before/after change records.

use serde::Serialize;

use crate::changes::classify::{ChangeKind, ClassifiedPath};
use crate::changes::content::{ContentSource, Side};
use crate::error::AssembleError;

/// One changed path with its content on both sides.
///
/// `before` is empty when the path is absent from HEAD, `after` is empty when
/// it is absent from the working directory. Renamed, untracked and other
/// kinds are recorded without content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub path: String,
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
    pub before: String,
    pub after: String,
}

/// Build one record per classified path, in input order.
///
/// The first failure aborts the whole assembly; no partial record list is
/// ever returned.
pub fn assemble<S>(
    source: &S,
    classified: &[ClassifiedPath],
) -> Result<Vec<ChangeRecord>, AssembleError>
where
    S: ContentSource + ?Sized,
{
    classified
        .iter()
        .map(|change| assemble_one(source, change))
        .collect()
}

fn assemble_one<S>(source: &S, change: &ClassifiedPath) -> Result<ChangeRecord, AssembleError>
where
    S: ContentSource + ?Sized,
{
    let (before, after) = match change.kind {
        ChangeKind::Modified => (
            require(source, Side::Before, change)?,
            require(source, Side::After, change)?,
        ),
        ChangeKind::Added => (String::new(), require(source, Side::After, change)?),
        ChangeKind::Deleted => (require(source, Side::Before, change)?, String::new()),
        ChangeKind::Renamed | ChangeKind::Untracked | ChangeKind::Other => {
            (String::new(), String::new())
        }
    };

    Ok(ChangeRecord {
        path: change.path.clone(),
        kind: change.kind,
        previous_path: change.previous_path.clone(),
        before,
        after,
    })
}

/// Resolve a side the classification says must exist.
fn require<S>(source: &S, side: Side, change: &ClassifiedPath) -> Result<String, AssembleError>
where
    S: ContentSource + ?Sized,
{
    let resolution = source
        .resolve(side, &change.path)
        .map_err(|source| AssembleError::Resolve {
            path: change.path.clone(),
            side,
            source,
        })?;

    if !resolution.exists() {
        return Err(AssembleError::Inconsistent {
            path: change.path.clone(),
            kind: change.kind,
            side,
        });
    }

    Ok(resolution.into_content())
}
