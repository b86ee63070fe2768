// wait.rs — Blocking poll and settle helpers with an optional cancellation token.
//
// The host has no "screen changed" event, so every step of the login flow is
// either "poll a condition at a fixed interval" or "sleep a fixed settle delay".
// Neither has a timeout. A CancelToken that nobody cancels keeps that behaviour;
// cancelling it makes the current wait return at its next check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }

    pub fn cancel(&self) { self.0.store(true, Ordering::Release); }

    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Acquire) }
}

/// A wait ended because its token was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Check `ready`, sleeping `interval` between checks, until it returns true.
pub fn poll_until(
    interval: Duration,
    cancel: &CancelToken,
    mut ready: impl FnMut() -> bool,
) -> Result<(), Cancelled> {
    loop {
        if cancel.is_cancelled() { return Err(Cancelled); }
        if ready() { return Ok(()); }
        std::thread::sleep(interval);
    }
}

/// Sleep a fixed delay to let the host finish processing the last call.
pub fn settle(delay: Duration, cancel: &CancelToken) -> Result<(), Cancelled> {
    if cancel.is_cancelled() { return Err(Cancelled); }
    std::thread::sleep(delay);
    if cancel.is_cancelled() { return Err(Cancelled); }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn poll_returns_once_ready() {
        let mut checks = 0;
        let r = poll_until(Duration::from_millis(1), &CancelToken::new(), || {
            checks += 1;
            checks == 3
        });
        assert_eq!(r, Ok(()));
        assert_eq!(checks, 3);
    }

    #[test]
    fn poll_checks_before_sleeping() {
        let start = Instant::now();
        let r = poll_until(Duration::from_secs(5), &CancelToken::new(), || true);
        assert_eq!(r, Ok(()));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn cancel_stops_an_endless_poll() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let r = poll_until(Duration::from_millis(1), &token, || false);
        canceller.join().unwrap();
        assert_eq!(r, Err(Cancelled));
    }

    #[test]
    fn settle_honours_cancellation() {
        let token = CancelToken::new();
        assert_eq!(settle(Duration::from_millis(1), &token), Ok(()));
        token.cancel();
        assert_eq!(settle(Duration::from_millis(1), &token), Err(Cancelled));
    }
}
