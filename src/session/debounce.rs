//! Tap Debouncing
//!
//! Rejects taps that land within the debounce window of the previously
//! accepted tap. Lock-free, so it runs before the session gate is taken.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Sentinel for "no tap accepted yet".
const NO_TAP: u64 = u64::MAX;

/// Compare-and-swap debouncer over a monotonic millisecond clock.
#[derive(Debug)]
pub struct TapDebouncer {
    origin: Instant,
    window_ms: u64,
    last_accepted_ms: AtomicU64,
}

impl TapDebouncer {
    /// Debouncer with the given window.
    pub fn new(window: Duration) -> Self {
        Self {
            origin: Instant::now(),
            window_ms: window.as_millis().min(u64::MAX as u128) as u64,
            last_accepted_ms: AtomicU64::new(NO_TAP),
        }
    }

    /// Try to accept a tap now.
    pub fn try_accept(&self) -> bool {
        let now_ms = self.origin.elapsed().as_millis().min((NO_TAP - 1) as u128) as u64;
        self.try_accept_at(now_ms)
    }

    /// Try to accept a tap at `now_ms` on the debouncer's clock.
    ///
    /// The timestamp is swapped in before the tap is processed, so of two
    /// racing taps inside one window exactly one wins.
    pub fn try_accept_at(&self, now_ms: u64) -> bool {
        let mut last = self.last_accepted_ms.load(Ordering::Acquire);
        loop {
            if last != NO_TAP && now_ms.saturating_sub(last) < self.window_ms {
                return false;
            }
            match self.last_accepted_ms.compare_exchange_weak(
                last,
                now_ms,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => last = actual,
            }
        }
    }

    /// Forget the last accepted tap.
    pub fn reset(&self) {
        self.last_accepted_ms.store(NO_TAP, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_window() {
        let debouncer = TapDebouncer::new(Duration::from_millis(200));

        assert!(debouncer.try_accept_at(0));
        assert!(!debouncer.try_accept_at(150));
        assert!(!debouncer.try_accept_at(199));
        assert!(debouncer.try_accept_at(200));
        assert!(!debouncer.try_accept_at(300));
        assert!(debouncer.try_accept_at(401));
    }

    #[test]
    fn test_rejected_taps_do_not_extend_window() {
        let debouncer = TapDebouncer::new(Duration::from_millis(200));

        assert!(debouncer.try_accept_at(1000));
        assert!(!debouncer.try_accept_at(1100));
        assert!(debouncer.try_accept_at(1200));
    }

    #[test]
    fn test_reset() {
        let debouncer = TapDebouncer::new(Duration::from_millis(200));
        assert!(debouncer.try_accept_at(10));
        debouncer.reset();
        assert!(debouncer.try_accept_at(20));
    }

    #[test]
    fn test_concurrent_taps_single_winner() {
        let debouncer = Arc::new(TapDebouncer::new(Duration::from_millis(200)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let debouncer = Arc::clone(&debouncer);
                std::thread::spawn(move || debouncer.try_accept_at(5000))
            })
            .collect();

        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|accepted| *accepted)
            .count();
        assert_eq!(accepted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_driven() {
        let debouncer = TapDebouncer::new(Duration::from_millis(200));

        assert!(debouncer.try_accept());
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(!debouncer.try_accept());
        tokio::time::advance(Duration::from_millis(100)).await;
        assert!(debouncer.try_accept());
    }
}
