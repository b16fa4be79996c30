use time::Duration;

pub const MIN_RETRY_DELAY_SECONDS: i64 = 10;
pub const MAX_RETRY_DELAY_SECONDS: i64 = 300;
pub const RETRY_DELAY_STEP_SECONDS: i64 = 20;

/// Linear backoff keyed on the attempt that just failed.
pub fn retry_delay(attempt_count: i32) -> Duration {
	let seconds = i64::from(attempt_count.max(0))
		.saturating_mul(RETRY_DELAY_STEP_SECONDS)
		.clamp(MIN_RETRY_DELAY_SECONDS, MAX_RETRY_DELAY_SECONDS);

	Duration::seconds(seconds)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn delay_is_clamped_at_both_ends() {
		assert_eq!(retry_delay(0), Duration::seconds(10));
		assert_eq!(retry_delay(1), Duration::seconds(20));
		assert_eq!(retry_delay(3), Duration::seconds(60));
		assert_eq!(retry_delay(50), Duration::seconds(300));
	}
}
