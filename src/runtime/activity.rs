use super::{RuntimeError, Scheduler};
use crate::time::Time;
use std::{
    collections::VecDeque,
    fmt::{Debug, Display},
};

///
/// A stable handle to an [`Activity`] owned by a [`Scheduler`].
///
/// Handles are never reused, so a handle to a deleted activity
/// simply stops resolving.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivityId(pub(super) u64);

impl Display for ActivityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

///
/// The scheduling state of an [`Activity`].
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Not scheduled. No pending notification, due time is [`Time::NEVER`].
    Free,
    /// Sitting in the waiting queue until its due time is reached.
    Waiting,
    /// Sitting in the ready queue, due for execution this tick.
    Ready,
    /// Currently dispatching its notifiees.
    Executing,
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// The result of a single notification callback.
pub type NotifyResult = Result<(), RuntimeError>;

/// A boxed notification callback.
pub type Notifiee<A> = Box<dyn FnMut(&mut Context<'_, A>) -> NotifyResult>;

///
/// The environment a notification callback is invoked with.
///
/// The fields are disjoint borrows, so a callback can hand the
/// scheduler to a method of the application state.
///
pub struct Context<'a, A> {
    /// The scheduler dispatching the callback.
    pub scheduler: &'a mut Scheduler<A>,
    /// The application state driven by the scheduler.
    pub app: &'a mut A,
    /// The activity whose notification is being delivered.
    pub activity: ActivityId,
}

impl<A> Context<'_, A> {
    /// The current virtual time of the dispatching scheduler.
    #[must_use]
    pub fn now(&self) -> Time {
        self.scheduler.now()
    }
}

impl<A> Debug for Context<'_, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("now", &self.scheduler.now())
            .field("activity", &self.activity)
            .finish_non_exhaustive()
    }
}

///
/// A named, schedulable unit of work.
///
/// Activities are owned by their scheduler. Everything that changes
/// the schedule of an activity goes through the scheduler, so that
/// the queues and the status stay in sync.
///
pub struct Activity<A> {
    pub(super) name: String,
    pub(super) status: Status,
    pub(super) next_time: Time,
    pub(super) last_notifiees: VecDeque<Notifiee<A>>,
    pub(super) timeout_notifiee: Option<Notifiee<A>>,
    // bumped whenever the timeout notifiee is replaced or cleared
    pub(super) notifiee_epoch: u64,
    // true while the last notifiees are drained
    pub(super) draining: bool,
}

impl<A> Activity<A> {
    pub(super) fn new(name: String) -> Self {
        Self {
            name,
            status: Status::Free,
            next_time: Time::NEVER,
            last_notifiees: VecDeque::new(),
            timeout_notifiee: None,
            notifiee_epoch: 0,
            draining: false,
        }
    }

    /// The name of the activity, unique within its scheduler.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current scheduling state.
    #[must_use]
    #[inline]
    pub fn status(&self) -> Status {
        self.status
    }

    /// The due time, or [`Time::NEVER`] if not scheduled.
    #[must_use]
    #[inline]
    pub fn next_time(&self) -> Time {
        self.next_time
    }

    /// The number of queued one-shot notifiees.
    #[must_use]
    pub fn last_notifiees(&self) -> usize {
        self.last_notifiees.len()
    }

    /// Whether a timeout notifiee is installed.
    #[must_use]
    pub fn has_timeout_notifiee(&self) -> bool {
        self.timeout_notifiee.is_some()
    }
}

impl<A> Debug for Activity<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activity")
            .field("name", &self.name)
            .field("status", &self.status)
            .field("next_time", &self.next_time)
            .field("last_notifiees", &self.last_notifiees.len())
            .field("timeout_notifiee", &self.timeout_notifiee.is_some())
            .finish()
    }
}
