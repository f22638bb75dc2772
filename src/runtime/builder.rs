use super::{RuntimeLimit, Scheduler};
use crate::time::Time;
use std::fmt::Debug;

/// A builder for a [`Scheduler`] instance.
#[must_use]
pub struct Builder {
    pub(super) name: String,
    pub(super) running: bool,
    pub(super) limit: RuntimeLimit,
    pub(super) start_time: Time,
}

impl Builder {
    /// Creates a new builder for a stopped scheduler at [`Time::ZERO`].
    pub fn new() -> Builder {
        Builder {
            name: String::from("scheduler"),
            running: false,
            limit: RuntimeLimit::None,
            start_time: Time::ZERO,
        }
    }

    ///
    /// Sets the name used to identify the scheduler in log output.
    ///
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    ///
    /// Whether the scheduler dispatches activities from the start.
    ///
    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    ///
    /// Changes the initial value of the virtual clock.
    ///
    pub fn start_time(mut self, time: Time) -> Self {
        self.start_time = time;
        self
    }

    ///
    /// Bounds the number of dispatched activities.
    ///
    pub fn max_itr(mut self, max_itr: usize) -> Self {
        self.limit.add(RuntimeLimit::EventCount(max_itr));
        self
    }

    ///
    /// Bounds the virtual time up to which activities are dispatched.
    ///
    pub fn max_time(mut self, max_time: Time) -> Self {
        self.limit.add(RuntimeLimit::SimTime(max_time));
        self
    }

    ///
    /// Adds a custom limit, combined with any limit set before
    /// by a logical OR.
    ///
    pub fn limit(mut self, limit: RuntimeLimit) -> Self {
        self.limit.add(limit);
        self
    }

    ///
    /// Builds a new [`Scheduler`] driving application state of type `A`.
    ///
    /// # Examples
    ///
    /// ```
    /// use netsim::prelude::*;
    ///
    /// let sched = Builder::new()
    ///     .running(true)
    ///     .start_time(Time::from_secs(10))
    ///     .max_itr(1_000)
    ///     .build::<()>();
    /// assert_eq!(sched.now(), Time::from_secs(10));
    /// ```
    pub fn build<A>(self) -> Scheduler<A> {
        Scheduler::from_builder(self)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("name", &self.name)
            .field("running", &self.running)
            .field("limit", &self.limit)
            .field("start_time", &self.start_time)
            .finish()
    }
}
