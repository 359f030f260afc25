//! Optional timeout and retry around registry client calls.
//!
//! The registry client's reliability is the host's responsibility, so the
//! default policy waits indefinitely and makes a single attempt. Projects
//! that want more can opt in through the `client` section of the settings.

use anyhow::{Result, anyhow};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Delay between attempts when none is configured.
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientPolicy {
    /// Abandon a single call after this many seconds. `None` waits forever.
    pub timeout_secs: Option<u64>,
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClientPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            max_attempts: 1,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl ClientPolicy {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Run `operation` under this policy.
    ///
    /// Each attempt is awaited to completion (or to the timeout) before the
    /// next one starts, so at most one call is ever in flight.
    pub async fn run<F, Fut, T>(&self, operation_name: &str, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let outcome = match self.timeout() {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("{} timed out after {:?}", operation_name, limit)),
                },
                None => operation().await,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt < attempts {
                        warn!(
                            "{}: attempt {}/{} failed ({:#}), retrying in {}ms...",
                            operation_name, attempt, attempts, e, self.retry_delay_ms
                        );
                        tokio::time::sleep(Duration::from_millis(self.retry_delay_ms)).await;
                    } else {
                        debug!("{}: giving up after {} attempt(s)", operation_name, attempts);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("{}: failed after {} attempts", operation_name, attempts)))
    }
}
