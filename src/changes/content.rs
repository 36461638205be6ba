//! Before/after content lookup for a single path.
//!
//! The "before" side is read from the HEAD tree, the "after" side from the
//! working directory. Both sides go through the same byte-level binary sniff,
//! so a path never has text on one side and raw bytes on the other.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use git2::{ErrorCode, Repository, Tree};
use serde::Serialize;
use tracing::debug;

use crate::error::{RepoError, ResolveError};

/// Marker substituted for content that is not valid text.
pub const BINARY_SENTINEL: &str = "binary file";

/// Number of leading bytes inspected by the binary sniff.
///
/// Same window git uses for its own "is this binary" check.
pub const SNIFF_LEN: usize = 8000;

/// Which side of a change a piece of content belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The last commit (HEAD tree).
    Before,
    /// The working directory.
    After,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Before => f.write_str("before"),
            Side::After => f.write_str("after"),
        }
    }
}

/// Outcome of resolving one side of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Text(String),
    Binary,
    /// The path does not exist on this side.
    Missing,
}

impl Resolution {
    pub fn exists(&self) -> bool {
        !matches!(self, Resolution::Missing)
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Resolution::Binary)
    }

    /// Content as it appears in a change record.
    pub fn into_content(self) -> String {
        match self {
            Resolution::Text(text) => text,
            Resolution::Binary => BINARY_SENTINEL.to_string(),
            Resolution::Missing => String::new(),
        }
    }
}

/// Anything that can produce before/after content for a path.
///
/// The repository-backed implementation is [`RepoContent`]; tests substitute
/// in-memory sources.
pub trait ContentSource {
    fn resolve(&self, side: Side, path: &str) -> Result<Resolution, ResolveError>;
}

/// Returns true if the sniff window of `bytes` contains a NUL byte.
pub fn looks_binary(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SNIFF_LEN)];
    window.contains(&0)
}

/// Classify raw bytes as text or binary.
///
/// Bytes that pass the NUL sniff but are not valid UTF-8 are still not text,
/// so they map to [`Resolution::Binary`] as well.
pub fn decode(bytes: Vec<u8>) -> Resolution {
    if looks_binary(&bytes) {
        return Resolution::Binary;
    }
    match String::from_utf8(bytes) {
        Ok(text) => Resolution::Text(text),
        Err(_) => Resolution::Binary,
    }
}

/// Sniff the start of a stream, then read the rest only if it looks like text.
///
/// The sniffed prefix is kept and extended, so the reader is consumed exactly
/// once and never rewound.
pub fn sniff_and_read<R: Read>(mut reader: R) -> io::Result<Resolution> {
    let mut buf = Vec::new();
    reader.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut buf)?;
    if looks_binary(&buf) {
        return Ok(Resolution::Binary);
    }
    reader.read_to_end(&mut buf)?;
    Ok(decode(buf))
}

/// Content source backed by a git repository and its working directory.
pub struct RepoContent<'repo> {
    repo: &'repo Repository,
    head: Option<Tree<'repo>>,
    workdir: PathBuf,
}

impl<'repo> RepoContent<'repo> {
    /// Capture the HEAD tree and working directory of `repo`.
    ///
    /// A repository without commits has no HEAD tree; every "before" lookup
    /// then reports [`Resolution::Missing`].
    pub fn open(repo: &'repo Repository) -> Result<Self, RepoError> {
        let workdir = repo
            .workdir()
            .ok_or(RepoError::BareRepository)?
            .to_path_buf();
        let head = resolve_head_tree(repo)?;
        Ok(Self {
            repo,
            head,
            workdir,
        })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn resolve_before(&self, path: &str) -> Result<Resolution, ResolveError> {
        let Some(tree) = &self.head else {
            return Ok(Resolution::Missing);
        };

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(Resolution::Missing),
            Err(source) => {
                return Err(ResolveError::TreeLookup {
                    path: path.to_string(),
                    source,
                });
            }
        };

        let blob = self
            .repo
            .find_blob(entry.id())
            .map_err(|source| ResolveError::NotABlob {
                path: path.to_string(),
                source,
            })?;

        Ok(decode(blob.content().to_vec()))
    }

    fn resolve_after(&self, path: &str) -> Result<Resolution, ResolveError> {
        let full_path = self.workdir.join(path);
        let read_failed = |source| ResolveError::ReadFailed {
            path: full_path.clone(),
            source,
        };

        let metadata = match fs::symlink_metadata(&full_path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Resolution::Missing),
            Err(source) => return Err(read_failed(source)),
        };

        // Git stores a symlink as a blob holding its target, so compare like with like.
        if metadata.file_type().is_symlink() {
            let target = fs::read_link(&full_path).map_err(read_failed)?;
            return Ok(decode(target.into_os_string().into_encoded_bytes()));
        }

        // The handle lives only for this call and is closed on every return path.
        let file = match File::open(&full_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Resolution::Missing),
            Err(source) => return Err(read_failed(source)),
        };

        sniff_and_read(file).map_err(read_failed)
    }
}

impl ContentSource for RepoContent<'_> {
    fn resolve(&self, side: Side, path: &str) -> Result<Resolution, ResolveError> {
        let resolution = match side {
            Side::Before => self.resolve_before(path)?,
            Side::After => self.resolve_after(path)?,
        };
        debug!(
            path,
            %side,
            exists = resolution.exists(),
            binary = resolution.is_binary(),
            "resolved content"
        );
        Ok(resolution)
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found),
/// `Ok(Some(tree))` for repos with a valid HEAD, or `Err(RepoError::HeadTree)`
/// for real errors (corrupt HEAD, permission issues, missing objects).
pub(crate) fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, RepoError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(RepoError::HeadTree(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(RepoError::HeadTree)?;
    Ok(Some(tree))
}
