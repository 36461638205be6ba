//! Exponential backoff retry for generation backends.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::debug;

use crate::error::GatewayError;

use super::{Backend, GenerationGateway};

/// Configuration: 3 total attempts, base 1s, max 30s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called up to `MAX_ATTEMPTS` times. Errors rejected by
/// `is_retryable` are returned as-is without another attempt. Once attempts
/// run out, `wrap_exhausted` converts the last error into the caller's
/// `RetriesExhausted` variant.
pub async fn retry_with_backoff<T, E, Fut, F, R, W>(
    mut attempt: F,
    is_retryable: R,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempts = 0;

    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) if attempts >= MAX_ATTEMPTS => return Err(wrap_exhausted(e)),
            Err(_) => {
                debug!(attempt = attempts, "generation attempt failed, retrying");
                if let Some(wait_duration) = backoff.next_backoff() {
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }
}

impl GatewayError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Missing tools, missing credentials and client-side HTTP errors will
    /// fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::NotInstalled { .. }
            | GatewayError::SpawnFailed { .. }
            | GatewayError::MissingApiKey
            | GatewayError::RetriesExhausted(_) => false,
            GatewayError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            GatewayError::Timeout { .. }
            | GatewayError::NonZeroExit { .. }
            | GatewayError::ExecutionFailed { .. }
            | GatewayError::Http(_)
            | GatewayError::InvalidResponse(_)
            | GatewayError::EmptyResponse => true,
        }
    }
}

/// Gateway decorator applying [`retry_with_backoff`] to every call.
pub struct Retrying {
    inner: Box<dyn GenerationGateway>,
}

impl Retrying {
    pub fn new(inner: Box<dyn GenerationGateway>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl GenerationGateway for Retrying {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        retry_with_backoff(
            || self.inner.generate(prompt),
            GatewayError::is_retryable,
            |e| GatewayError::RetriesExhausted(Box::new(e)),
        )
        .await
    }
}
