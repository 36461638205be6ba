//! Codex CLI backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;

use super::subprocess::Cli;
use super::{Backend, GenerationGateway, usable_text};

/// Runs `codex exec -` with the prompt on stdin and takes stdout as the response.
#[derive(Debug, Clone)]
pub struct CodexGateway {
    cli: Cli,
}

impl CodexGateway {
    pub fn new(timeout: Duration) -> Self {
        Self {
            cli: Cli::new("codex", timeout),
        }
    }

    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        let mut cli = Cli::new("codex", timeout);
        cli.program = program.into();
        Self { cli }
    }
}

#[async_trait]
impl GenerationGateway for CodexGateway {
    fn backend(&self) -> Backend {
        Backend::Codex
    }

    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        self.cli.check_installed().await?;
        let stdout = self.cli.run(["exec", "-"], prompt).await?;
        usable_text(&stdout)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::gateway::subprocess::fake_cli;

    #[tokio::test]
    async fn test_generate_uses_exec_subcommand() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_cli(
            dir.path(),
            "codex",
            r#"[ "$1" = "exec" ] && [ "$2" = "-" ] || exit 9
echo ""
echo "fix: $(cat)"
echo """#,
        );

        let gateway = CodexGateway::with_program(program, Duration::from_secs(5));
        assert_eq!(gateway.backend(), Backend::Codex);
        assert_eq!(gateway.generate("handle nul bytes").await.unwrap(), "fix: handle nul bytes");
    }

    #[tokio::test]
    async fn test_generate_accepts_prompt_larger_than_argv_limit() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_cli(dir.path(), "codex", "echo \"chore: $(wc -c | tr -d ' ') bytes\"");
        let prompt = "x".repeat(200 * 1024);

        let gateway = CodexGateway::with_program(program, Duration::from_secs(10));
        assert_eq!(
            gateway.generate(&prompt).await.unwrap(),
            format!("chore: {} bytes", 200 * 1024)
        );
    }

    #[tokio::test]
    async fn test_generate_blank_output_is_empty_response() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_cli(dir.path(), "codex", "echo '   '");

        let gateway = CodexGateway::with_program(program, Duration::from_secs(5));
        assert!(matches!(
            gateway.generate("x").await,
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn test_generate_surfaces_non_zero_exit() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_cli(dir.path(), "codex", "echo 'not logged in' >&2; exit 1");

        let gateway = CodexGateway::with_program(program, Duration::from_secs(5));
        match gateway.generate("x").await {
            Err(GatewayError::NonZeroExit { cli, code, stderr }) => {
                assert_eq!(cli, "codex");
                assert_eq!(code, 1);
                assert!(stderr.contains("not logged in"));
            }
            other => panic!("Expected NonZeroExit, got {:?}", other),
        }
    }
}
