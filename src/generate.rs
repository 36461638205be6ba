//! One end-to-end run: collect changes, then ask the backend for a message.

use git2::Repository;
use tracing::debug;

use crate::changes::{Collected, collect_request};
use crate::error::{GatewayError, GenerateError, PipelineError};
use crate::gateway::GenerationGateway;

/// Result shown when there is nothing to describe.
pub const NO_CHANGES_MESSAGE: &str = "No changes to commit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Clean tree. The backend was not contacted.
    NoChanges,
    /// Free-form text returned by the backend.
    Message(String),
}

impl Outcome {
    /// Text to print for this outcome.
    pub fn text(&self) -> &str {
        match self {
            Outcome::NoChanges => NO_CHANGES_MESSAGE,
            Outcome::Message(message) => message,
        }
    }
}

/// Serialized request for the current changes, or `None` on a clean tree.
pub fn render_prompt(repo: &Repository) -> Result<Option<String>, PipelineError> {
    match collect_request(repo)? {
        Collected::Clean => Ok(None),
        Collected::Request(payload) => payload
            .to_prompt()
            .map(Some)
            .map_err(PipelineError::Serialize),
    }
}

/// Collect the pending changes and generate a message for them.
///
/// `connect` builds the backend. It is only called once there is something
/// to describe, so a clean tree short-circuits to [`Outcome::NoChanges`]
/// without a backend ever being set up or contacted.
pub async fn generate<G, F>(repo: &Repository, connect: F) -> Result<Outcome, GenerateError>
where
    G: GenerationGateway + ?Sized,
    F: FnOnce() -> Result<Box<G>, GatewayError>,
{
    let Some(prompt) = render_prompt(repo)? else {
        return Ok(Outcome::NoChanges);
    };

    let gateway = connect()?;
    debug!(
        backend = %gateway.backend(),
        bytes = prompt.len(),
        "requesting commit message"
    );
    let message = gateway.generate(&prompt).await?;
    Ok(Outcome::Message(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::{INSTRUCTION, RULES};
    use crate::gateway::{Backend, MockGenerationGateway};
    use git2::Signature;
    use std::cell::Cell;

    fn repo_with_commit(files: &[(&str, &str)]) -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        {
            let mut index = repo.index().unwrap();
            index
                .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
                .unwrap();
            index.write().unwrap();
            let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
            let sig = Signature::now("Test", "test@test.com").unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        (dir, repo)
    }

    #[tokio::test]
    async fn test_clean_tree_never_calls_gateway() {
        let (_dir, repo) = repo_with_commit(&[("a.txt", "a\n")]);

        let mut gateway = MockGenerationGateway::new();
        gateway.expect_generate().times(0);
        gateway.expect_backend().return_const(Backend::Gemini);

        let connected = Cell::new(false);
        let outcome = generate(&repo, || {
            connected.set(true);
            Ok(Box::new(gateway))
        })
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::NoChanges);
        assert_eq!(outcome.text(), "No changes to commit");
        assert!(!connected.get());
    }

    #[tokio::test]
    async fn test_clean_tree_ignores_unusable_backend() {
        let (_dir, repo) = repo_with_commit(&[("a.txt", "a\n")]);

        let outcome = generate::<MockGenerationGateway, _>(&repo, || {
            Err(GatewayError::MissingApiKey)
        })
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::NoChanges);
    }

    #[tokio::test]
    async fn test_backend_setup_failure_is_propagated() {
        let (dir, repo) = repo_with_commit(&[("a.txt", "a\n")]);
        std::fs::write(dir.path().join("a.txt"), "b\n").unwrap();

        let err = generate::<MockGenerationGateway, _>(&repo, || {
            Err(GatewayError::MissingApiKey)
        })
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Gateway(GatewayError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_changes_are_sent_as_one_prompt() {
        let (dir, repo) = repo_with_commit(&[("a.txt", "a\n")]);
        std::fs::write(dir.path().join("a.txt"), "b\n").unwrap();

        let mut gateway = MockGenerationGateway::new();
        gateway.expect_backend().return_const(Backend::Gemini);
        gateway
            .expect_generate()
            .times(1)
            .withf(|prompt: &str| {
                prompt.contains(INSTRUCTION)
                    && RULES.iter().all(|rule| prompt.contains(rule))
                    && prompt.contains(r#""path": "a.txt""#)
                    && prompt.contains(r#""before": "a\n""#)
                    && prompt.contains(r#""after": "b\n""#)
            })
            .returning(|_| Ok("fix: change a".to_string()));

        let outcome = generate(&repo, || Ok(Box::new(gateway))).await.unwrap();
        assert_eq!(outcome, Outcome::Message("fix: change a".to_string()));
        assert_eq!(outcome.text(), "fix: change a");
    }

    #[tokio::test]
    async fn test_gateway_failure_is_propagated() {
        let (dir, repo) = repo_with_commit(&[("a.txt", "a\n")]);
        std::fs::write(dir.path().join("new.txt"), "new\n").unwrap();

        let mut gateway = MockGenerationGateway::new();
        gateway.expect_backend().return_const(Backend::Codex);
        gateway
            .expect_generate()
            .returning(|_| Err(GatewayError::NotInstalled { cli: "codex" }));

        let err = generate(&repo, || Ok(Box::new(gateway)))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Gateway(GatewayError::NotInstalled { cli: "codex" })
        ));
    }

    #[test]
    fn test_render_prompt_on_clean_tree_is_none() {
        let (_dir, repo) = repo_with_commit(&[("a.txt", "a\n")]);
        assert!(render_prompt(&repo).unwrap().is_none());
    }
}
