use std::time::Duration;

/// A cancellable one-shot deadline measured on the frame clock.
///
/// Arming an armed timer replaces its deadline, so only the most recent
/// request can fire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetTimer {
    deadline: Option<Duration>,
}

impl ResetTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules the timer to fire `after` the clock time `now`.
    pub fn arm(&mut self, now: Duration, after: Duration) {
        self.deadline = Some(now + after);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Returns `true` exactly once when `now` reached the deadline and
    /// disarms the timer.
    pub fn expire(&mut self, now: Duration) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_once_at_deadline() {
        let mut timer = ResetTimer::new();
        timer.arm(ms(100), ms(500));
        assert!(!timer.expire(ms(599)));
        assert!(timer.expire(ms(600)));
        assert!(!timer.expire(ms(700)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn rearm_replaces_deadline() {
        let mut timer = ResetTimer::new();
        timer.arm(ms(0), ms(500));
        timer.arm(ms(300), ms(500));
        assert!(!timer.expire(ms(500)));
        assert!(timer.expire(ms(800)));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut timer = ResetTimer::new();
        timer.arm(ms(0), ms(10));
        timer.cancel();
        assert!(!timer.expire(ms(1_000)));
        assert_eq!(timer.deadline(), None);
    }
}
