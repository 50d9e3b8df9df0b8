//! Bounded retry for calls that fail transiently.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const MIN_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum RetryError {
    Retryable(Error),
    NonRetryable(Error),
}

impl RetryError {
    /// Classify with [`Error::is_retryable`].
    pub fn from_error(err: Error) -> Self {
        if err.is_retryable() {
            RetryError::Retryable(err)
        } else {
            RetryError::NonRetryable(err)
        }
    }
}

/// Call `f` until it succeeds, fails permanently, or `timeout` elapses.
///
/// On timeout the last retryable error is returned.
pub async fn retry<T, F, Fut>(timeout: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RetryError>>,
{
    let deadline = Instant::now() + timeout;
    let mut backoff = MIN_BACKOFF;
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(RetryError::NonRetryable(err)) => return Err(err),
            Err(RetryError::Retryable(err)) => {
                if Instant::now() + backoff > deadline {
                    log::warn!("giving up after {attempt} attempts ({timeout:?}): {err}");
                    return Err(err);
                }
                log::debug!("[DEBUG] attempt {attempt} failed, retrying in {backoff:?}: {err}");
                sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> Error {
        Error::Api {
            status: 400,
            code: "ReferencedResourceNotProvisioned".into(),
            message: "not yet".into(),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        tokio::time::pause();
        let calls = AtomicU32::new(0);
        let value = retry(Duration::from_secs(300), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 3 {
                    Err(RetryError::Retryable(transient()))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_non_retryable_stops() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(Duration::from_secs(300), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RetryError::NonRetryable(Error::Validation("bad".into()))) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_returns_last_error_on_timeout() {
        tokio::time::pause();
        let start = Instant::now();
        let result: Result<()> = retry(Duration::from_secs(5), || async {
            Err(RetryError::Retryable(transient()))
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.was_bad_request());
        assert!(start.elapsed() <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_from_error_retries_connection_failures() {
        let refused = reqwest::get("http://127.0.0.1:1/").await.unwrap_err();
        assert!(matches!(RetryError::from_error(Error::Http(refused)), RetryError::Retryable(_)));
        assert!(matches!(
            RetryError::from_error(transient()),
            RetryError::NonRetryable(_)
        ));
    }
}
