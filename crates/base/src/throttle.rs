use std::time::{Duration, Instant};

/// "Time since last publish" gate.
///
/// `ready` opens at most once per interval. A closed gate means the caller
/// skips the work for this round; nothing is queued.
#[derive(Debug, Clone)]
pub struct RateGate {
    interval: Duration,
    last: Option<Instant>,
}

impl RateGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Gate opening `hz` times per second. A rate of zero never throttles.
    pub fn from_hz(hz: u32) -> Self {
        let interval = if hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / hz
        };
        Self::new(interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Check the gate against the current time.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    /// Check the gate against an explicit instant, marking it used when open.
    pub fn ready_at(&mut self, now: Instant) -> bool {
        let open = match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        };
        if open {
            self.last = Some(now);
        }
        open
    }

    /// Forget the last opening so the next check passes.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
