//! Bounded retry with exponential backoff and jitter.
//!
//! Used by the writer around collector deliveries. Retries are synchronous
//! (the writer runs on its own dedicated thread), delay doubles per attempt
//! up to `max_delay_ms`, and a small time-derived jitter is added to avoid
//! synchronized retry storms across processes.

use std::time::{Duration, SystemTime};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: usize,
    /// Initial delay in milliseconds before the first retry.
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds between retries.
    pub max_delay_ms: u64,
    /// Maximum jitter in milliseconds added to each delay.
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1_600,
            jitter_ms: 100,
        }
    }
}

// Generates a random jitter value up to max_jitter
fn generate_jitter(max_jitter: u64) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    nanos as u64 % (max_jitter + 1)
}

/// Retries `operation` according to `policy`, sleeping between attempts.
///
/// Returns the first success, or the last error once `max_retries` is
/// exhausted. With `max_retries == 0` the operation runs exactly once.
pub fn retry_with_backoff<F, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Debug,
{
    let mut attempt = 0;
    let mut delay = policy.initial_delay_ms;

    loop {
        match operation() {
            Ok(result) => return Ok(result),
            Err(err) if attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    name: "Retry.Attempt",
                    operation = operation_name,
                    attempt = attempt,
                    reason = format!("{err:?}"),
                );
                let jitter = generate_jitter(policy.jitter_ms);
                let delay_with_jitter = std::cmp::min(delay + jitter, policy.max_delay_ms);
                std::thread::sleep(Duration::from_millis(delay_with_jitter));
                delay = std::cmp::min(delay * 2, policy.max_delay_ms);
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_retries: usize) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 4,
            jitter_ms: 1,
        }
    }

    #[test]
    fn jitter_stays_within_bound() {
        for _ in 0..100 {
            assert!(generate_jitter(100) <= 100);
        }
    }

    #[test]
    fn succeeds_on_first_attempt() {
        let result = retry_with_backoff(&fast_policy(3), "op", || Ok::<_, ()>("success"));
        assert_eq!(result, Ok("success"));
    }

    #[test]
    fn retries_until_success() {
        let attempts = AtomicUsize::new(0);
        let result = retry_with_backoff(&fast_policy(3), "op", || {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err("transient")
            } else {
                Ok("success")
            }
        });
        assert_eq!(result, Ok("success"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let attempts = AtomicUsize::new(0);
        let result = retry_with_backoff(&fast_policy(3), "op", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("down")
        });
        assert_eq!(result, Err("down"));
        // initial attempt plus three retries
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn zero_retries_runs_once() {
        let attempts = AtomicUsize::new(0);
        let result = retry_with_backoff(&fast_policy(0), "op", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>("down")
        });
        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
