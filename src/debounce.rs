use std::time::{Duration, Instant};

/// Holds back a value until no newer value has arrived for `delay`.
///
/// The event loop calls [`Debouncer::poll`] on every tick; each [`push`]
/// restarts the window, so a burst of keystrokes yields a single value.
///
/// [`push`]: Debouncer::push
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Debouncer<T> {
        Debouncer {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    /// Releases the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, deadline)) if *deadline <= now => self.pending.take().map(|(value, _)| value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(800);

    #[test]
    fn test_burst_coalesces_to_last_value() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push("a", start);
        debouncer.push("ab", start + Duration::from_millis(200));
        debouncer.push("abc", start + Duration::from_millis(400));

        assert_eq!(debouncer.poll(start + Duration::from_millis(900)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(1200)),
            Some("abc")
        );
        assert_eq!(debouncer.poll(start + Duration::from_millis(5000)), None);
    }

    #[test]
    fn test_nothing_released_before_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.push(1, start);
        assert_eq!(debouncer.poll(start + Duration::from_millis(799)), None);
        assert_eq!(debouncer.poll(start + DELAY), Some(1));
    }
}
