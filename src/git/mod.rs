//! Committing and pushing the generated message.

pub mod commit;
pub mod push;

pub use commit::stage_and_commit;
pub use push::{push_all, push_targets};
