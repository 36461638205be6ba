//! Error types for committer modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::changes::{ChangeKind, Side};

/// Errors from opening and inspecting the repository itself.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Failed to open repository: {0}")]
    OpenRepository(#[source] git2::Error),

    #[error("Bare repositories have no working directory")]
    BareRepository,

    #[error("Failed to resolve HEAD tree: {0}")]
    HeadTree(#[source] git2::Error),

    #[error("Failed to stage pending changes: {0}")]
    Staging(#[source] git2::Error),

    #[error("Failed to read repository status: {0}")]
    Status(#[source] git2::Error),

    #[error("Path is not valid UTF-8: '{path}'")]
    NonUtf8Path { path: String },
}

/// Errors from reading one side of a path's content.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Failed to look up '{path}' in the HEAD tree: {source}")]
    TreeLookup {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("'{path}' in the HEAD tree is not a file blob: {source}")]
    NotABlob {
        path: String,
        #[source]
        source: git2::Error,
    },

    #[error("Failed to read '{}': {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from turning classified paths into change records.
#[derive(Error, Debug)]
pub enum AssembleError {
    #[error("Failed to resolve {side} content of '{path}': {source}")]
    Resolve {
        path: String,
        side: Side,
        #[source]
        source: ResolveError,
    },

    #[error("'{path}' is classified {kind} but does not exist on the {side} side")]
    Inconsistent {
        path: String,
        kind: ChangeKind,
        side: Side,
    },
}

impl AssembleError {
    /// The repository-relative path the failure belongs to.
    pub fn path(&self) -> &str {
        match self {
            AssembleError::Resolve { path, .. } | AssembleError::Inconsistent { path, .. } => path,
        }
    }
}

/// Errors from the change-extraction pipeline as a whole.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error("Failed to serialize request payload: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Errors from text-generation backends.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{cli} CLI not found on PATH")]
    NotInstalled { cli: &'static str },

    #[error("Failed to spawn {cli} process: {source}")]
    SpawnFailed {
        cli: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{cli} process timed out after {secs} seconds")]
    Timeout { cli: &'static str, secs: u64 },

    #[error("{cli} CLI exited with code {code}: {stderr}")]
    NonZeroExit {
        cli: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("{cli} CLI reported an error: {message}")]
    ExecutionFailed { cli: &'static str, message: String },

    #[error("No Gemini API key configured. Set GEMINI_API_KEY or geminiApiKey in the config file")]
    MissingApiKey,

    #[error("HTTP request to the generation backend failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Generation backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Generation backend returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("Generation backend returned no usable text")]
    EmptyResponse,

    #[error("All retry attempts failed: {0}")]
    RetriesExhausted(#[source] Box<GatewayError>),
}

/// Errors from loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Errors from committing and pushing the generated message.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("Failed to stage changes: {0}")]
    StagingFailed(#[source] git2::Error),

    #[error("Failed to create commit: {0}")]
    CommitFailed(#[source] git2::Error),

    #[error("Git config error (missing user.name or user.email): {0}")]
    ConfigError(#[source] git2::Error),

    #[error("Failed to list remotes: {0}")]
    RemotesUnavailable(#[source] git2::Error),

    #[error("Failed to run git {operation}: {source}")]
    GitSpawn {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git push {remote} failed: {stderr}")]
    PushFailed { remote: String, stderr: String },
}

/// Errors from a full generate run.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
