//!
//! Pacing virtual time to the wall clock.
//!
//! A [`RealTimeManager`] owns a scheduler whose clock follows the
//! wall clock. It can drive a nested virtual scheduler, whose clock
//! then advances by the elapsed wall-clock time divided by a [`Ratio`].
//!

use super::{Builder, Scheduler};
use crate::{
    error::{Error, Result},
    time::Time,
};
use std::{fmt::Debug, time::Duration};
use tracing::trace;

///
/// A source of wall-clock time.
///
/// Implementations other than [`SystemClock`] allow replaying a
/// real-time run deterministically.
///
pub trait Clock {
    /// The current wall-clock time.
    fn now(&self) -> Time;

    /// Blocks the caller for roughly the given duration.
    fn sleep(&self, duration: Duration);
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Time {
        Time::wall_clock()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

///
/// The number of wall-clock seconds that make up one second of
/// nested virtual time. Never zero.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ratio(u32);

impl Ratio {
    /// The ratio a real-time manager starts with.
    pub const DEFAULT: Ratio = Ratio(1000);

    /// Real time. One wall-clock second is one virtual second.
    pub const ONE: Ratio = Ratio(1);

    ///
    /// Creates a new ratio.
    ///
    /// # Errors
    ///
    /// Fails with a range error if `value` is zero.
    ///
    pub fn new(value: u32) -> Result<Self> {
        if value == 0 {
            return Err(Error::range("ratio must be at least 1"));
        }
        Ok(Self(value))
    }

    /// The raw value.
    #[must_use]
    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Ratio {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        let value = u32::try_from(value)
            .map_err(|_| Error::range(format!("ratio {value} out of range")))?;
        Self::new(value)
    }
}

///
/// A scheduler whose clock follows the wall clock.
///
/// While stopped, advancing the clock records the wall-clock epoch
/// and the current time of the nested virtual scheduler. While
/// running, [`RealTimeManager::now_is`] polls the wall clock until it
/// reaches the target, dispatching due activities of both schedulers
/// on every poll.
///
pub struct RealTimeManager<A> {
    scheduler: Scheduler<A>,
    virtual_manager: Option<Scheduler<A>>,

    ratio: Ratio,
    poll_interval: Duration,
    clock: Box<dyn Clock>,

    start_time: Time,
    start_virtual_time: Time,
}

impl<A> RealTimeManager<A> {
    /// Creates a stopped manager using the system clock and the default ratio.
    #[must_use]
    pub fn new() -> Self {
        RealTimeBuilder::new().build()
    }

    /// Returns a builder to configure a new real-time manager.
    pub fn builder() -> RealTimeBuilder<A> {
        RealTimeBuilder::new()
    }

    /// The scheduler paced by the wall clock.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler<A> {
        &self.scheduler
    }

    /// The scheduler paced by the wall clock.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler<A> {
        &mut self.scheduler
    }

    /// The nested virtual scheduler, if one is bound.
    #[must_use]
    pub fn virtual_manager(&self) -> Option<&Scheduler<A>> {
        self.virtual_manager.as_ref()
    }

    /// The nested virtual scheduler, if one is bound.
    pub fn virtual_manager_mut(&mut self) -> Option<&mut Scheduler<A>> {
        self.virtual_manager.as_mut()
    }

    ///
    /// Binds a nested virtual scheduler, returning the previous one.
    /// Its current time becomes the virtual epoch.
    ///
    pub fn virtual_manager_is(&mut self, manager: Option<Scheduler<A>>) -> Option<Scheduler<A>> {
        self.start_virtual_time = manager.as_ref().map_or(Time::ZERO, Scheduler::now);
        std::mem::replace(&mut self.virtual_manager, manager)
    }

    /// The scaling between wall-clock and nested virtual time.
    #[must_use]
    pub fn ratio(&self) -> Ratio {
        self.ratio
    }

    /// Changes the scaling between wall-clock and nested virtual time.
    pub fn ratio_is(&mut self, ratio: Ratio) {
        self.ratio = ratio;
    }

    /// The current time of the wall-clock paced scheduler.
    #[must_use]
    pub fn now(&self) -> Time {
        self.scheduler.now()
    }

    /// The wall-clock time of the last recorded epoch.
    #[must_use]
    pub fn start_time(&self) -> Time {
        self.start_time
    }

    /// Whether advancing the clock paces and dispatches.
    #[must_use]
    pub fn running(&self) -> bool {
        self.scheduler.running()
    }

    /// Starts or stops pacing.
    pub fn running_is(&mut self, running: bool) {
        self.scheduler.running_is(running);
    }

    ///
    /// Records the current wall-clock time as the epoch and starts pacing.
    ///
    pub fn start(&mut self, app: &mut A) {
        self.scheduler.running_is(false);
        let now = self.clock.now();
        self.now_is(now, app);
        self.scheduler.running_is(true);
    }

    ///
    /// Paces for `duration` of wall-clock time from now.
    ///
    pub fn run_for(&mut self, duration: Duration, app: &mut A) {
        let target = self.clock.now() + duration;
        self.now_is(target, app);
    }

    ///
    /// Advances to the wall-clock time `t`.
    ///
    /// A stopped manager records `t` as its epoch. A running manager
    /// returns once the wall clock reaches `t`.
    ///
    pub fn now_is(&mut self, t: Time, app: &mut A) {
        if !self.scheduler.running() {
            self.start_time = t;
            self.start_virtual_time = self
                .virtual_manager
                .as_ref()
                .map_or(Time::ZERO, Scheduler::now);
            self.scheduler.now_is(t, app);
            return;
        }

        loop {
            let current = self.clock.now();
            if current >= t {
                break;
            }

            self.scheduler.now_is(current, app);
            if let Some(vm) = self.virtual_manager.as_mut() {
                let elapsed = current - self.start_time;
                let target = self.start_virtual_time + elapsed / self.ratio.get();
                trace!("pacing '{}' to {target}", vm.name());
                vm.now_is(target, app);
            }

            if !self.poll_interval.is_zero() {
                let remaining = (t - current).as_duration().unwrap_or_default();
                self.clock.sleep(self.poll_interval.min(remaining));
            }
        }
    }
}

impl<A> Default for RealTimeManager<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Debug for RealTimeManager<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealTimeManager")
            .field("scheduler", &self.scheduler)
            .field("virtual_manager", &self.virtual_manager)
            .field("ratio", &self.ratio)
            .field("poll_interval", &self.poll_interval)
            .field("start_time", &self.start_time)
            .field("start_virtual_time", &self.start_virtual_time)
            .finish_non_exhaustive()
    }
}

/// A builder for a [`RealTimeManager`].
#[must_use]
pub struct RealTimeBuilder<A> {
    name: String,
    ratio: Ratio,
    poll_interval: Duration,
    clock: Box<dyn Clock>,
    virtual_manager: Option<Scheduler<A>>,
}

impl<A> RealTimeBuilder<A> {
    /// Creates a builder with the system clock, the default ratio
    /// and a poll interval of one millisecond.
    pub fn new() -> Self {
        Self {
            name: String::from("realtime"),
            ratio: Ratio::DEFAULT,
            poll_interval: Duration::from_millis(1),
            clock: Box::new(SystemClock),
            virtual_manager: None,
        }
    }

    /// Sets the name of the paced scheduler.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the scaling between wall-clock and nested virtual time.
    pub fn ratio(mut self, ratio: Ratio) -> Self {
        self.ratio = ratio;
        self
    }

    ///
    /// Sets the time slept between two polls of the wall clock.
    /// Zero polls without sleeping.
    ///
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Replaces the wall-clock source.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Binds a nested virtual scheduler.
    pub fn virtual_manager(mut self, manager: Scheduler<A>) -> Self {
        self.virtual_manager = Some(manager);
        self
    }

    /// Builds a stopped manager whose epoch is the current wall-clock time.
    pub fn build(self) -> RealTimeManager<A> {
        let now = self.clock.now();
        let start_virtual_time = self
            .virtual_manager
            .as_ref()
            .map_or(Time::ZERO, Scheduler::now);
        RealTimeManager {
            scheduler: Builder::new().name(self.name).start_time(now).build(),
            virtual_manager: self.virtual_manager,
            ratio: self.ratio,
            poll_interval: self.poll_interval,
            clock: self.clock,
            start_time: now,
            start_virtual_time,
        }
    }
}

impl<A> Default for RealTimeBuilder<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Debug for RealTimeBuilder<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealTimeBuilder")
            .field("name", &self.name)
            .field("ratio", &self.ratio)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
