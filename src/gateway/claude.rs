//! Claude Code CLI backend.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GatewayError;

use super::subprocess::Cli;
use super::{Backend, GenerationGateway, usable_text};

/// Runs `claude -p --output-format json` with the prompt on stdin.
#[derive(Debug, Clone)]
pub struct ClaudeGateway {
    cli: Cli,
}

impl ClaudeGateway {
    pub fn new(timeout: Duration) -> Self {
        Self {
            cli: Cli::new("claude", timeout),
        }
    }

    /// Use a specific executable instead of `claude` from PATH.
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        let mut cli = Cli::new("claude", timeout);
        cli.program = program.into();
        Self { cli }
    }
}

#[async_trait]
impl GenerationGateway for ClaudeGateway {
    fn backend(&self) -> Backend {
        Backend::Claude
    }

    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        self.cli.check_installed().await?;
        let stdout = self
            .cli
            .run(["-p", "--output-format", "json"], prompt)
            .await?;
        parse_claude_response(&stdout)
    }
}

/// Claude CLI JSON envelope when using --output-format json
#[derive(serde::Deserialize)]
struct ClaudeCliResponse {
    result: String,
    #[serde(default)]
    is_error: bool,
}

/// Unwrap the CLI envelope. Output that is not an envelope is taken as-is.
fn parse_claude_response(response: &str) -> Result<String, GatewayError> {
    let content = match serde_json::from_str::<ClaudeCliResponse>(response) {
        Ok(envelope) if envelope.is_error => {
            return Err(GatewayError::ExecutionFailed {
                cli: "claude",
                message: envelope.result,
            });
        }
        Ok(envelope) => envelope.result,
        Err(_) => response.to_string(),
    };
    usable_text(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let response = r#"{"type":"result","result":"feat: add parser\n\n- handle renames","is_error":false}"#;
        assert_eq!(
            parse_claude_response(response).unwrap(),
            "feat: add parser\n\n- handle renames"
        );
    }

    #[test]
    fn test_parse_envelope_without_is_error() {
        let response = r#"{"result":"  fix: typo  "}"#;
        assert_eq!(parse_claude_response(response).unwrap(), "fix: typo");
    }

    #[test]
    fn test_parse_error_envelope() {
        let response = r#"{"result":"Credit balance too low","is_error":true}"#;
        match parse_claude_response(response) {
            Err(GatewayError::ExecutionFailed { cli, message }) => {
                assert_eq!(cli, "claude");
                assert_eq!(message, "Credit balance too low");
            }
            other => panic!("Expected ExecutionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_raw_text_fallback() {
        assert_eq!(
            parse_claude_response("docs: update readme\n").unwrap(),
            "docs: update readme"
        );
    }

    #[test]
    fn test_parse_empty_result() {
        assert!(matches!(
            parse_claude_response(r#"{"result":"","is_error":false}"#),
            Err(GatewayError::EmptyResponse)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_sends_prompt_on_stdin_with_json_flag() {
        let dir = tempfile::tempdir().unwrap();
        let program = crate::gateway::subprocess::fake_cli(
            dir.path(),
            "claude",
            r#"[ "$1" = "-p" ] && [ "$2" = "--output-format" ] && [ "$3" = "json" ] || exit 9
printf '{"result":"chore: %s","is_error":false}' "$(cat)""#,
        );

        let gateway = ClaudeGateway::with_program(program, Duration::from_secs(5));
        assert_eq!(gateway.generate("tidy").await.unwrap(), "chore: tidy");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_generate_accepts_prompt_larger_than_argv_limit() {
        let dir = tempfile::tempdir().unwrap();
        let program = crate::gateway::subprocess::fake_cli(
            dir.path(),
            "claude",
            r#"printf '{"result":"docs: %s bytes","is_error":false}' "$(wc -c | tr -d ' ')""#,
        );
        let prompt = "x".repeat(200 * 1024);

        let gateway = ClaudeGateway::with_program(program, Duration::from_secs(10));
        assert_eq!(
            gateway.generate(&prompt).await.unwrap(),
            format!("docs: {} bytes", 200 * 1024)
        );
    }

    #[tokio::test]
    async fn test_generate_without_cli_installed() {
        let gateway =
            ClaudeGateway::with_program("nonexistent_claude_12345", Duration::from_secs(1));
        assert!(matches!(
            gateway.generate("x").await,
            Err(GatewayError::NotInstalled { cli: "claude" })
        ));
    }
}
