use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A shutdown flag whose waits can be interrupted.
///
/// Watch mode sleeps between flush passes; waiting on this instead of
/// `thread::sleep()` lets Ctrl-C end the sleep immediately.
pub struct ShutdownSignal {
    shutdown: AtomicBool,
    condvar: Condvar,
    mutex: Mutex<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            shutdown: AtomicBool::new(false),
            condvar: Condvar::new(),
            mutex: Mutex::new(()),
        }
    }

    /// Set the flag and wake every waiting thread.
    pub fn trigger(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Wait until `duration` passes or the flag is set, whichever comes
    /// first. Returns `true` when the wait ended because of shutdown.
    pub fn wait(&self, duration: Duration) -> bool {
        if self.is_shutdown() {
            return true;
        }
        let guard = match self.mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return true,
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |_| !self.is_shutdown())
        {
            Ok((_, timeout)) => !timeout.timed_out(),
            Err(_) => true,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_starts_clear() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());
    }

    #[test]
    fn test_wait_runs_out_when_untriggered() {
        let signal = ShutdownSignal::new();
        let interrupted = signal.wait(Duration::from_millis(20));
        assert!(!interrupted);
    }

    #[test]
    fn test_trigger_interrupts_waiters() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = signal.clone();

        let handle = thread::spawn(move || {
            let start = Instant::now();
            let interrupted = waiter.wait(Duration::from_secs(10));
            (interrupted, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        signal.trigger();

        let (interrupted, elapsed) = handle.join().unwrap();
        assert!(interrupted);
        assert!(elapsed < Duration::from_secs(1));
    }

    #[test]
    fn test_wait_after_trigger_returns_at_once() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        assert!(signal.wait(Duration::from_secs(10)));
    }
}
