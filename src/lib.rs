//! committer - A CLI tool that writes commit messages for pending changes.
//!
//! # Overview
//!
//! committer stages everything in the working tree, records each changed
//! path with its content before and after the change, and sends that record
//! set with a fixed instruction and formatting rules to a text-generation
//! backend (Gemini, Claude Code CLI, or Codex CLI).

pub mod changes;
pub mod config;
pub mod error;
pub mod gateway;
pub mod generate;
pub mod git;

// Re-export commonly used types
pub use changes::{ChangeKind, ChangeRecord, Collected, RequestPayload, collect_request};
pub use config::Config;
pub use error::{
    AssembleError, CommitError, ConfigError, GatewayError, GenerateError, PipelineError,
    RepoError, ResolveError,
};
pub use gateway::{Backend, GenerationGateway};
pub use generate::{NO_CHANGES_MESSAGE, Outcome, generate};
