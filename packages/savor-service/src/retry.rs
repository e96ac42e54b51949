use std::{future::Future, time::Duration};

use crate::{Error, Result};

/// Bounded retry with capped exponential backoff and a per-attempt timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub call_timeout: Duration,
}
impl RetryPolicy {
	pub fn from_config(cfg: &savor_config::Retry) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			base_delay: Duration::from_millis(cfg.base_delay_ms),
			max_delay: Duration::from_millis(cfg.max_delay_ms),
			call_timeout: Duration::from_millis(cfg.call_timeout_ms),
		}
	}

	/// Delay before the attempt following `attempt` (1-based).
	pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
		let exp = attempt.max(1).saturating_sub(1).min(16);
		let delay = self.base_delay.saturating_mul(1 << exp);

		delay.min(self.max_delay)
	}

	/// Runs `call` until it succeeds, fails with a non-retryable error, or attempts run out.
	///
	/// Exhaustion is reported as `TransientBackendFailure` carrying the last failure.
	pub async fn run<T, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut last_error = String::new();

		for attempt in 1..=self.max_attempts {
			match tokio::time::timeout(self.call_timeout, call()).await {
				Ok(Ok(value)) => return Ok(value),
				Ok(Err(err)) if !err.is_retryable() => return Err(err),
				Ok(Err(err)) => last_error = err.to_string(),
				Err(_) => {
					last_error = format!("Timed out after {} ms.", self.call_timeout.as_millis())
				},
			}

			if attempt < self.max_attempts {
				let delay = self.backoff_for_attempt(attempt);

				tracing::warn!(
					operation,
					attempt,
					max_attempts = self.max_attempts,
					delay_ms = delay.as_millis() as u64,
					error = %last_error,
					"Backend call failed. Retrying."
				);
				tokio::time::sleep(delay).await;
			}
		}

		tracing::warn!(operation, attempts = self.max_attempts, error = %last_error, "Backend call exhausted retries.");

		Err(Error::TransientBackendFailure {
			message: format!(
				"{operation} failed after {} attempts: {last_error}",
				self.max_attempts
			),
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicU32, Ordering};

	use super::*;

	fn policy(max_attempts: u32) -> RetryPolicy {
		RetryPolicy {
			max_attempts,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(4),
			call_timeout: Duration::from_millis(200),
		}
	}

	#[test]
	fn backoff_doubles_and_caps() {
		let policy = RetryPolicy {
			max_attempts: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(10),
			call_timeout: Duration::from_secs(15),
		};

		assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(1));
		assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(2));
		assert_eq!(policy.backoff_for_attempt(4), Duration::from_secs(8));
		assert_eq!(policy.backoff_for_attempt(5), Duration::from_secs(10));
		assert_eq!(policy.backoff_for_attempt(60), Duration::from_secs(10));
	}

	#[tokio::test]
	async fn succeeds_after_transient_failures() {
		let calls = AtomicU32::new(0);
		let value = policy(3)
			.run("flaky", || {
				let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;

				async move {
					if attempt < 3 {
						Err(Error::Storage { message: "connection reset".to_string() })
					} else {
						Ok(attempt)
					}
				}
			})
			.await
			.expect("Third attempt must succeed.");

		assert_eq!(value, 3);
	}

	#[tokio::test]
	async fn exhaustion_is_a_transient_failure() {
		let calls = AtomicU32::new(0);
		let result: Result<()> = policy(3)
			.run("down", || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(Error::Provider { message: "503".to_string() }) }
			})
			.await;

		assert!(matches!(result, Err(Error::TransientBackendFailure { .. })));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn invalid_requests_are_not_retried() {
		let calls = AtomicU32::new(0);
		let result: Result<()> = policy(3)
			.run("bad", || {
				calls.fetch_add(1, Ordering::SeqCst);

				async { Err(Error::InvalidRequest { message: "empty".to_string() }) }
			})
			.await;

		assert!(matches!(result, Err(Error::InvalidRequest { .. })));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn slow_calls_time_out() {
		let result: Result<()> = policy(2)
			.run("slow", || async {
				tokio::time::sleep(Duration::from_secs(5)).await;

				Ok(())
			})
			.await;

		assert!(matches!(result, Err(Error::TransientBackendFailure { .. })));
	}
}
