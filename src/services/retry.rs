//! Fixed-wait retry for rate-limited service calls

use super::ServiceResult;
use crate::config::AgentConfig;
use std::future::Future;
use std::time::Duration;

/// How often and how long to wait when a service reports a rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    pub wait: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, wait: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            wait,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            config.rate_limit_retries,
            Duration::from_secs(config.rate_limit_wait_secs),
        )
    }
}

/// Runs `op`, retrying after a fixed wait while it fails with a rate limit
///
/// Any other error is returned immediately, as is the rate-limit error of
/// the last attempt.
///
/// # Arguments
///
/// * `policy` - Attempt count and wait
/// * `what` - Short name of the call, for logging
/// * `op` - Produces a fresh future per attempt
pub async fn with_rate_limit_retry<T, F, Fut>(
    policy: RetryPolicy,
    what: &str,
    mut op: F,
) -> ServiceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limit() && attempt < policy.attempts => {
                tracing::warn!(
                    "Rate limit hit during {}. Waiting {:?} (attempt {}/{})",
                    what,
                    policy.wait,
                    attempt,
                    policy.attempts
                );
                tokio::time::sleep(policy.wait).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
