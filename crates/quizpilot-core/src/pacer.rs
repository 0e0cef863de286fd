//! Settle delays and cooperative cancellation.
//!
//! Every deliberate wait in the engine goes through [`Pacer::pause`], which is
//! also the only place the emergency stop is observed. An interrupted pause
//! returns [`Interrupted`] and callers unwind with `?` to the shutdown path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep slice, so a stop request is noticed promptly.
const SLICE: Duration = Duration::from_millis(50);

/// The run was stopped by an operator abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("run interrupted by stop signal")]
pub struct Interrupted;

/// Shared emergency-stop flag.
///
/// Clones observe the same flag, so a signal handler or a collaborator can
/// hold one and trip it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the run to stop at the next suspension point.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blocks the control thread for settle delays while watching the stop signal.
#[derive(Debug, Clone, Default)]
pub struct Pacer {
    stop: StopSignal,
}

impl Pacer {
    pub fn new(stop: StopSignal) -> Self {
        Self { stop }
    }

    /// Fails fast if a stop was requested.
    pub fn checkpoint(&self) -> Result<(), Interrupted> {
        if self.stop.is_triggered() {
            Err(Interrupted)
        } else {
            Ok(())
        }
    }

    /// Sleeps for `delay`, checking the stop signal before, during and after.
    pub fn pause(&self, delay: Duration) -> Result<(), Interrupted> {
        self.checkpoint()?;
        let deadline = Instant::now() + delay;
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLICE));
            self.checkpoint()?;
        }
        self.checkpoint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_zero_succeeds() {
        let pacer = Pacer::default();
        assert_eq!(pacer.pause(Duration::ZERO), Ok(()));
    }

    #[test]
    fn test_pause_after_trigger_is_interrupted() {
        let stop = StopSignal::new();
        let pacer = Pacer::new(stop.clone());
        stop.trigger();
        assert_eq!(pacer.pause(Duration::ZERO), Err(Interrupted));
    }

    #[test]
    fn test_trigger_from_other_thread_cuts_pause_short() {
        let stop = StopSignal::new();
        let pacer = Pacer::new(stop.clone());
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stop.trigger();
        });

        let started = Instant::now();
        assert_eq!(pacer.pause(Duration::from_secs(5)), Err(Interrupted));
        assert!(started.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }
}
