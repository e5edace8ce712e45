//! Fixed-rate pacing with an interruptible sleep.

use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};

/// Owner side of the stop line. Dropping it, or calling [`ShutdownHandle::stop`],
/// wakes every [`Pacer`] created from it.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: Option<Sender<()>>,
    rx: Receiver<()>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (tx, rx) = flume::bounded(1);
        Self { tx: Some(tx), rx }
    }

    pub fn pacer(&self, period: Duration) -> Pacer {
        Pacer::new(period, self.rx.clone())
    }

    pub fn stop(&mut self) {
        self.tx.take();
    }

    pub fn is_stopped(&self) -> bool {
        self.tx.is_none()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Elapsed,
    Stopped,
}

/// Sleeps so that cycles start one period apart, regardless of how long each
/// cycle took. An overrunning cycle is followed immediately by the next.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    next: Instant,
    stop_rx: Receiver<()>,
}

impl Pacer {
    pub fn new(period: Duration, stop_rx: Receiver<()>) -> Self {
        Self { period, next: Instant::now() + period, stop_rx }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next period boundary, or until shutdown.
    pub fn wait(&mut self) -> Tick {
        let now = Instant::now();
        let remaining = self.next.saturating_duration_since(now);
        self.next += self.period;
        if self.next < now {
            // fell more than a period behind; restart the schedule
            self.next = now + self.period;
        }
        self.sleep(remaining)
    }

    /// A plain interruptible sleep.
    pub fn sleep(&self, duration: Duration) -> Tick {
        match self.stop_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => Tick::Elapsed,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Tick::Stopped,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stop_rx.is_disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_one_period() {
        let shutdown = ShutdownHandle::new();
        let mut pacer = shutdown.pacer(Duration::from_millis(20));
        let started = Instant::now();
        assert_eq!(pacer.wait(), Tick::Elapsed);
        assert!(started.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn stop_interrupts_sleep() {
        let mut shutdown = ShutdownHandle::new();
        let mut pacer = shutdown.pacer(Duration::from_secs(30));
        let handle = std::thread::spawn(move || {
            let started = Instant::now();
            (pacer.wait(), started.elapsed())
        });
        std::thread::sleep(Duration::from_millis(10));
        shutdown.stop();
        let (tick, elapsed) = handle.join().unwrap();
        assert_eq!(tick, Tick::Stopped);
        assert!(elapsed < Duration::from_secs(5));
        assert!(shutdown.is_stopped());
    }

    #[test]
    fn overrun_does_not_sleep() {
        let shutdown = ShutdownHandle::new();
        let mut pacer = shutdown.pacer(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        assert_eq!(pacer.wait(), Tick::Elapsed);
        assert!(started.elapsed() < Duration::from_millis(5));
    }
}
