//! Wait for a remote resource to reach a target state.
//!
//! ```ignore
//! let conf = StateChangeConf::new(&["Updating"], &["Succeeded"])
//!     .min_timeout(Duration::from_secs(60))
//!     .timeout(ctx.remaining());
//! conf.wait_for_state(|| async move { refresh(client, &id).await }).await?;
//! ```

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout_at, Instant};

const DEFAULT_NOT_FOUND_CHECKS: u32 = 20;
const INITIAL_WAIT: Duration = Duration::from_millis(100);
const MAX_WAIT: Duration = Duration::from_secs(10);
const MAX_POLL_INTERVAL: Duration = Duration::from_secs(180);
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

#[derive(Debug, Clone)]
pub struct StateChangeConf {
    pub pending: Vec<String>,
    pub target: Vec<String>,
    pub delay: Duration,
    pub poll_interval: Duration,
    pub min_timeout: Duration,
    pub timeout: Duration,
    /// Absent results tolerated while a target is expected; 0 means 20.
    pub not_found_checks: u32,
    /// Consecutive target observations required; 0 means 1.
    pub continuous_target_occurence: u32,
}

impl StateChangeConf {
    pub fn new(pending: &[&str], target: &[&str]) -> Self {
        StateChangeConf {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
            min_timeout: Duration::ZERO,
            timeout: Duration::ZERO,
            not_found_checks: 0,
            continuous_target_occurence: 0,
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn min_timeout(mut self, min_timeout: Duration) -> Self {
        self.min_timeout = min_timeout;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    pub fn continuous_target_occurence(mut self, occurence: u32) -> Self {
        self.continuous_target_occurence = occurence;
        self
    }

    /// Poll `refresh` until the target state has been seen often enough.
    ///
    /// `refresh` returns `None` when the resource does not exist and
    /// `Some((value, state))` otherwise. Returns the value of the last
    /// target observation, or `None` when the target is "absent".
    pub async fn wait_for_state<T, F, Fut>(&self, mut refresh: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<(T, String)>>>,
    {
        let not_found_checks = match self.not_found_checks {
            0 => DEFAULT_NOT_FOUND_CHECKS,
            n => n,
        };
        let continuous = self.continuous_target_occurence.max(1);
        let deadline = Instant::now()
            .checked_add(self.timeout)
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE);

        let mut last_state = String::new();
        let mut target_occurence: u32 = 0;
        let mut not_found_tick: u32 = 0;
        let mut wait = Duration::ZERO;

        if !self.delay.is_zero() {
            if timeout_at(deadline, sleep(self.delay)).await.is_err() {
                return Err(self.timeout_error(&last_state));
            }
        }

        loop {
            if !wait.is_zero() {
                log::trace!("[TRACE] Waiting {wait:?} before next try");
                if timeout_at(deadline, sleep(wait)).await.is_err() {
                    return Err(self.timeout_error(&last_state));
                }
            }
            if wait.is_zero() {
                wait = INITIAL_WAIT;
            }

            let refreshed = match timeout_at(deadline, refresh()).await {
                Ok(result) => result?,
                Err(_) => return Err(self.timeout_error(&last_state)),
            };

            match refreshed {
                None if self.target.is_empty() => {
                    target_occurence += 1;
                    if target_occurence >= continuous {
                        return Ok(None);
                    }
                    continue;
                }
                None => {
                    not_found_tick += 1;
                    if not_found_tick > not_found_checks {
                        return Err(Error::NotFoundAfterRetries {
                            retries: not_found_tick,
                        });
                    }
                }
                Some((value, state)) => {
                    not_found_tick = 0;
                    last_state = state.clone();
                    let mut found = false;
                    if self.target.contains(&state) {
                        found = true;
                        target_occurence += 1;
                        if target_occurence >= continuous {
                            return Ok(Some(value));
                        }
                    }
                    if self.pending.contains(&state) {
                        found = true;
                        target_occurence = 0;
                    }
                    if !found && !self.pending.is_empty() {
                        return Err(Error::UnexpectedState {
                            state,
                            expected: self.target.join(", "),
                        });
                    }
                }
            }

            if target_occurence == 0 {
                wait *= 2;
            }
            if !self.poll_interval.is_zero() && self.poll_interval < MAX_POLL_INTERVAL {
                wait = self.poll_interval;
            } else if wait < self.min_timeout {
                wait = self.min_timeout;
            } else if wait > MAX_WAIT {
                wait = MAX_WAIT;
            }
        }
    }

    fn timeout_error(&self, last_state: &str) -> Error {
        Error::Timeout {
            last_state: last_state.to_string(),
            expected: self.target.join(", "),
            timeout: self.timeout,
        }
    }
}
