use std::time::Duration;

const BACKOFF_START: Duration = Duration::from_millis(200);
const BACKOFF_CAP: Duration = Duration::from_secs(3);

/// Capped exponential backoff for broker (re)connect loops. Attempts are
/// 0-based; the delay doubles per attempt and saturates at 3 seconds, and the
/// loops using it retry indefinitely rather than crash the process.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.min(16));
    BACKOFF_START.saturating_mul(factor).min(BACKOFF_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(200));
        assert_eq!(backoff_delay(1), Duration::from_millis(400));
        assert_eq!(backoff_delay(2), Duration::from_millis(800));
        assert_eq!(backoff_delay(4), Duration::from_secs(3));
        assert_eq!(backoff_delay(30), Duration::from_secs(3));
        assert_eq!(backoff_delay(u32::MAX), Duration::from_secs(3));
    }
}
