//!
//! Temporal quantification in a simulation context.
//!
//! A [`Time`] is a signed count of nanoseconds. It is used both for
//! instants on the virtual clock and for spans between them. The
//! sentinel [`Time::NEVER`] marks an activity that is not scheduled
//! and compares greater than every finite value.
//!
//! ```rust
//! # use netsim::time::*;
//! let t = Time::from_secs_micros(1, 500_000);
//! assert_eq!(t, Time::from_millis(1500));
//! assert_eq!(t.as_secs_micros(), (1, 500_000));
//! assert!(t < Time::NEVER);
//! ```

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(feature = "serde")]
mod ser;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const NANOS_PER_MICRO: i64 = 1_000;
const MICROS_PER_SEC: i64 = 1_000_000;

///
/// A nanosecond resolution instant or span of simulation time.
///
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Time(i64);

impl Time {
    /// The epoch of the virtual clock.
    pub const ZERO: Time = Time(0);
    /// The smallest representable instance of a [`Time`].
    pub const MIN: Time = Time(i64::MIN);
    /// Not scheduled. Greater than every finite time.
    pub const NEVER: Time = Time(i64::MAX);

    ///
    /// Creates a time from a raw count of nanoseconds.
    ///
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Creates a time from a count of microseconds.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros.saturating_mul(NANOS_PER_MICRO))
    }

    /// Creates a time from a count of milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    ///
    /// Creates a time from a count of whole seconds.
    ///
    #[must_use]
    pub const fn from_secs(secs: i64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    ///
    /// Creates a time from a `(seconds, microseconds)` pair, the split
    /// used by wall-clock timestamps.
    ///
    #[must_use]
    pub const fn from_secs_micros(secs: i64, micros: i64) -> Self {
        Self(
            secs.saturating_mul(NANOS_PER_SEC)
                .saturating_add(micros.saturating_mul(NANOS_PER_MICRO)),
        )
    }

    /// Creates a time from a floating point number of seconds.
    #[must_use]
    pub fn from_secs_f64(secs: f64) -> Self {
        if secs.is_infinite() && secs.is_sign_positive() {
            return Self::NEVER;
        }
        // `as` saturates on overflow and maps NaN to zero.
        Self((secs * NANOS_PER_SEC as f64).round() as i64)
    }

    /// Creates a time spanning the given duration.
    #[must_use]
    pub fn from_duration(duration: Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }

    ///
    /// Returns the raw count of nanoseconds.
    ///
    #[must_use]
    #[inline]
    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    /// Returns the number of seconds as a floating point number.
    #[must_use]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }

    ///
    /// Splits the time into whole seconds and the remaining microseconds,
    /// truncating sub-microsecond precision.
    ///
    #[must_use]
    pub const fn as_secs_micros(self) -> (i64, i64) {
        let secs = self.0 / NANOS_PER_SEC;
        let micros = (self.0 / NANOS_PER_MICRO) % MICROS_PER_SEC;
        (secs, micros)
    }

    /// Converts a non-negative time into a [`Duration`].
    #[must_use]
    pub fn as_duration(self) -> Option<Duration> {
        u64::try_from(self.0).ok().map(Duration::from_nanos)
    }

    ///
    /// Returns whether this time is the [`Time::NEVER`] sentinel.
    ///
    #[must_use]
    #[inline]
    pub const fn is_never(self) -> bool {
        self.0 == i64::MAX
    }

    ///
    /// Returns the current wall-clock time as an offset from the unix epoch.
    ///
    #[must_use]
    pub fn wall_clock() -> Self {
        Self::from(SystemTime::now())
    }

    ///
    /// Interprets this time as an offset from the unix epoch and converts
    /// it into a wall-clock timestamp.
    ///
    #[must_use]
    pub fn to_system_time(self) -> Option<SystemTime> {
        if self.is_never() {
            return None;
        }
        if self.0 >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_nanos(self.0.unsigned_abs()))
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_nanos(self.0.unsigned_abs()))
        }
    }

    /// Returns the span from `earlier` to `self`, or `None` if `earlier`
    /// lies after `self`.
    #[must_use]
    pub fn checked_duration_since(self, earlier: Time) -> Option<Duration> {
        self.0
            .checked_sub(earlier.0)
            .and_then(|d| u64::try_from(d).ok())
            .map(Duration::from_nanos)
    }
}

// # Wall clock

impl From<SystemTime> for Time {
    fn from(value: SystemTime) -> Self {
        match value.duration_since(UNIX_EPOCH) {
            Ok(d) => Self::from_duration(d),
            Err(e) => Self(-Self::from_duration(e.duration()).0),
        }
    }
}

impl From<Duration> for Time {
    fn from(value: Duration) -> Self {
        Self::from_duration(value)
    }
}

// # Ops

impl Add for Time {
    type Output = Time;

    fn add(self, rhs: Time) -> Time {
        if self.is_never() || rhs.is_never() {
            return Time::NEVER;
        }
        Time(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Time {
    fn add_assign(&mut self, rhs: Time) {
        *self = *self + rhs;
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, rhs: Duration) -> Time {
        self + Time::from_duration(rhs)
    }
}

impl Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Time) -> Time {
        if self.is_never() {
            return Time::NEVER;
        }
        Time(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Time {
    fn sub_assign(&mut self, rhs: Time) {
        *self = *self - rhs;
    }
}

impl Mul<u32> for Time {
    type Output = Time;

    fn mul(self, rhs: u32) -> Time {
        if self.is_never() {
            return Time::NEVER;
        }
        Time(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl Div<u32> for Time {
    type Output = Time;

    /// Integer division, truncating towards zero.
    ///
    /// # Panics
    ///
    /// Panics if `rhs` is zero.
    fn div(self, rhs: u32) -> Time {
        if self.is_never() {
            return Time::NEVER;
        }
        Time(self.0 / i64::from(rhs))
    }
}

// # Fmt

impl Debug for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_never() {
            return write!(f, "never");
        }
        if self.0 < 0 {
            write!(f, "-")?;
        }
        Debug::fmt(&Duration::from_nanos(self.0.unsigned_abs()), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_agree() {
        assert_eq!(Time::from_secs(2), Time::from_nanos(2_000_000_000));
        assert_eq!(Time::from_secs_micros(2, 250), Time::from_nanos(2_000_250_000));
        assert_eq!(Time::from_millis(3), Time::from_micros(3_000));
        assert_eq!(Time::from_secs_f64(0.0008), Time::from_micros(800));
        assert_eq!(
            Time::from_duration(Duration::from_millis(1500)),
            Time::from_millis(1500)
        );
        assert_eq!(Time::from_secs_f64(f64::INFINITY), Time::NEVER);
    }

    #[test]
    fn secs_micros_split_truncates_nanos() {
        let t = Time::from_nanos(3_000_123_456);
        assert_eq!(t.as_secs_micros(), (3, 123));
        assert_eq!(Time::from_secs_micros(3, 123), Time::from_nanos(3_000_123_000));
    }

    #[test]
    fn never_is_absorbing() {
        assert!(Time::NEVER > Time::from_secs(1_000_000));
        assert_eq!(Time::NEVER + Time::from_secs(1), Time::NEVER);
        assert_eq!(Time::from_secs(1) + Time::NEVER, Time::NEVER);
        assert_eq!(Time::NEVER - Time::from_secs(1), Time::NEVER);
        assert_eq!(Time::NEVER / 1000, Time::NEVER);
        assert!(Time::NEVER.is_never());
        assert_eq!(Time::NEVER.to_string(), "never");
    }

    #[test]
    fn ops() {
        let mut t = Time::from_secs(30);
        t -= Time::from_secs(10);
        assert_eq!(t, Time::from_secs(20));
        t += Time::from_millis(500);
        assert_eq!(t, Time::from_millis(20_500));
        assert_eq!(t / 1000, Time::from_micros(20_500));
        assert_eq!(Time::from_millis(2) * 3, Time::from_millis(6));
        assert_eq!(Time::from_secs(1) - Time::from_secs(3), Time::from_secs(-2));
        assert_eq!(Time::from_secs(-2).to_string(), "-2s");
        assert_eq!(Time::from_millis(800).to_string(), "800ms");
    }

    #[test]
    fn wall_clock_round_trip_keeps_nanos() {
        let t = Time::from_nanos(1_700_000_000_123_456_789);
        let sys = t.to_system_time().expect("finite time");
        assert_eq!(Time::from(sys), t);
        assert_eq!(Time::NEVER.to_system_time(), None);
    }

    #[test]
    fn duration_since() {
        let a = Time::from_secs(5);
        let b = Time::from_secs(3);
        assert_eq!(a.checked_duration_since(b), Some(Duration::from_secs(2)));
        assert_eq!(b.checked_duration_since(a), None);
        assert_eq!(Time::from_secs(-1).as_duration(), None);
    }
}
