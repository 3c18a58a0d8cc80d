//! Sliding-window throttle for outbound search commands.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

enum Admission {
    Admitted,
    RetryAfter(Duration),
}

/// Admits at most `max_per_minute` events within any trailing 60-second
/// window. A burst that fills the window cannot repeat until the oldest
/// event of the burst has aged out.
///
/// Callers are strictly sequential, so a blocked [`RateLimiter::wait`]
/// simply sleeps until the oldest event leaves the window and re-checks.
/// State is in-memory only and resets on restart.
pub struct RateLimiter {
    max_per_minute: usize,
    events: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        Self {
            max_per_minute: max_per_minute.max(1),
            events: VecDeque::new(),
        }
    }

    /// Blocks until one more event is admissible, then records it.
    pub fn wait(&mut self) {
        loop {
            match self.try_admit(Instant::now()) {
                Admission::Admitted => return,
                Admission::RetryAfter(delay) => thread::sleep(delay),
            }
        }
    }

    fn try_admit(&mut self, now: Instant) -> Admission {
        while let Some(oldest) = self.events.front() {
            if now.duration_since(*oldest) >= WINDOW {
                self.events.pop_front();
            } else {
                break;
            }
        }
        if self.events.len() < self.max_per_minute {
            self.events.push_back(now);
            return Admission::Admitted;
        }
        let oldest = self
            .events
            .front()
            .expect("window is full, so at least one event is retained");
        Admission::RetryAfter(WINDOW - now.duration_since(*oldest))
    }
}
