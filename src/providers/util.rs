use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry behavior for transient transport failures, sourced from the provider
/// configuration rather than hard-coded.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure (total runs = 1 + retries).
    pub retries: usize,
    /// Delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            retries: 2,
            delay_ms: 500,
        }
    }
}

/// Runs an async transport operation under a [`RetryPolicy`], returning the
/// first success or the last error once the attempts are exhausted.
pub async fn with_retry<F, Fut, T>(mut operation: F, policy: RetryPolicy) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > policy.retries {
                    return Err(err);
                }
                debug!(
                    "attempt {}/{} failed: {}, retrying",
                    attempt, policy.retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(policy.delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn with_retry_gives_up_after_configured_attempts() {
        let mut runs = 0;
        let result: Result<(), _> = with_retry(
            || {
                runs += 1;
                // connection refused, fails fast
                async { reqwest::get("http://127.0.0.1:1/").await.map(|_| ()) }
            },
            RetryPolicy {
                retries: 2,
                delay_ms: 1,
            },
        )
        .await;

        assert!(result.is_err());
        assert_eq!(runs, 3);
    }
}
