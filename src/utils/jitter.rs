//! Clock-derived jitter for retry backoff

use std::time::{SystemTime, UNIX_EPOCH};

/// Pseudo-random value in `0..=max_ms`, taken from the clock's sub-second nanos
pub fn jitter_ms(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    u64::from(nanos) % (max_ms + 1)
}

/// Up to `percent`% of `base_ms`
pub fn jitter_percent(base_ms: u64, percent: u8) -> u64 {
    jitter_ms(base_ms.saturating_mul(u64::from(percent)) / 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_bounds() {
        assert_eq!(jitter_ms(0), 0);
        assert_eq!(jitter_percent(0, 25), 0);
        assert_eq!(jitter_percent(1000, 0), 0);
        for _ in 0..100 {
            assert!(jitter_ms(50) <= 50);
            assert!(jitter_percent(1000, 25) <= 250);
        }
    }
}
