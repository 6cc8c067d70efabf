//! Deferred time interfaces.
//!
//! Timers live on the current thread's [`Reactor`]: they fire only while the
//! reactor is driven, and always after every job that was ready before them.

pub use std::time::{Duration, Instant};

use crate::runtime::Reactor;
use crate::Deferred;

/// A source of values that become available after a delay.
pub trait TimeService {
    /// Fulfill with `value` once `duration` has elapsed. Never rejects.
    fn after<T: Clone + 'static>(&self, duration: Duration, value: T) -> Deferred<T>;
}

/// The [`TimeService`] backed by the reactor's timers and the monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clock;

impl TimeService for Clock {
    fn after<T: Clone + 'static>(&self, duration: Duration, value: T) -> Deferred<T> {
        Timer::after(duration).then(move |_| Ok(value))
    }
}

/// Fulfill with `value` once `duration` has elapsed.
///
/// ```
/// use deferred::{race, runtime, time};
/// use std::time::Duration;
///
/// let winner = race(vec![
///     time::after(Duration::from_millis(100), "slow").into(),
///     time::after(Duration::from_millis(10), "fast").into(),
/// ]);
/// runtime::run();
/// assert_eq!(winner.value(), Some("fast"));
/// ```
pub fn after<T: Clone + 'static>(duration: Duration, value: T) -> Deferred<T> {
    Clock.after(duration, value)
}

/// Fulfill with `()` once `duration` has elapsed.
pub fn sleep(duration: Duration) -> Deferred<()> {
    after(duration, ())
}

/// Fulfill with `()` once `deadline` has passed.
pub fn sleep_until(deadline: Instant) -> Deferred<()> {
    Timer::at(deadline).then(|_| Ok(()))
}

/// A one-shot timer.
///
/// Each call to [`Timer::after`] or [`Timer::at`] registers one timer and
/// returns the deferred value it fulfills, with the instant it fired at.
#[derive(Debug)]
pub struct Timer;

impl Timer {
    /// Fire once `duration` has elapsed.
    ///
    /// A duration too large to be represented as a deadline never fires.
    pub fn after(duration: Duration) -> Deferred<Instant> {
        match Instant::now().checked_add(duration) {
            Some(deadline) => Self::at(deadline),
            None => {
                tracing::debug!(?duration, "timer deadline out of range, never firing");
                Deferred::pending()
            }
        }
    }

    /// Fire once `deadline` has passed.
    pub fn at(deadline: Instant) -> Deferred<Instant> {
        let fired = Deferred::pending();
        let resolver = fired.clone();
        Reactor::current().schedule_at(deadline, move || resolver.resolve(Instant::now()));
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime;

    #[test]
    fn timer_waits_for_its_deadline() {
        let start = Instant::now();
        let fired = Timer::after(Duration::from_millis(20));
        runtime::run_until_stalled();
        assert!(fired.is_pending());

        runtime::run();
        let at = fired.value().unwrap();
        assert!(at.duration_since(start) >= Duration::from_millis(20));
    }

    #[test]
    fn after_forwards_its_value() {
        let d = Clock.after(Duration::from_millis(1), "later");
        runtime::run();
        assert_eq!(d.value(), Some("later"));
    }

    #[test]
    fn unrepresentable_deadline_never_fires() {
        let d = after(Duration::MAX, 1u8);
        let slept = sleep(Duration::MAX);
        runtime::run();
        assert!(d.is_pending());
        assert!(slept.is_pending());
        assert!(Reactor::current().is_idle());
    }
}
