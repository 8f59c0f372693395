//! Retry policy for a single resolve call: exponential backoff, gated on
//! whether the failure is retryable (timeouts and "try again" conditions).
use std::time::Duration;

use crate::resolver::{ResolveIssue, ResolvedHost, ResolverMode};

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub retries: u32,
    pub backoff_ms: u64,
}

/// Outcome of driving one resolve call through the retry policy.
pub struct RetryOutcome {
    pub result: Result<ResolvedHost, ResolveIssue>,
    pub attempts: u32,
    pub retries: u32,
}

/// Resolve `fqdn` under `cfg`, sleeping between retryable failures via
/// `sleep_fn` (injected so tests never actually wait). `attempts` and
/// `retries` on the outcome satisfy `attempts == retries + 1`.
pub fn resolve_with_retries(
    mode: &ResolverMode,
    fqdn: &str,
    cfg: RetryConfig,
    sleep_fn: &dyn Fn(Duration),
) -> RetryOutcome {
    let mut attempts = 0u32;
    let mut retries = 0u32;

    loop {
        attempts += 1;
        let result = mode.resolve(fqdn);

        let issue = match &result {
            Ok(_) => return RetryOutcome { result, attempts, retries },
            Err(issue) => issue.clone(),
        };

        if !issue.retryable || retries >= cfg.retries {
            return RetryOutcome { result, attempts, retries };
        }

        retries += 1;
        if cfg.backoff_ms > 0 {
            let shift = (retries - 1).min(62);
            let backoff = cfg.backoff_ms.saturating_mul(1u64 << shift);
            sleep_fn(Duration::from_millis(backoff));
        }
    }
}

/// The production sleep function; `std::thread::sleep` wrapped so it can be
/// passed by reference alongside test doubles.
pub fn real_sleep(d: Duration) {
    std::thread::sleep(d);
}
