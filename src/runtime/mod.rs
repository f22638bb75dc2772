//!
//! Central primitives for driving a discrete event simulation.
//!
//! A [`Scheduler`] owns a set of named [`Activity`] instances. Each
//! activity carries a due time and notification callbacks. Advancing
//! the virtual clock with [`Scheduler::now_is`] dispatches every
//! activity that becomes due, in non-decreasing time order and FIFO
//! order within one instant.
//!
//! The application state `A` is not owned by the scheduler. It is
//! passed to [`Scheduler::now_is`] and handed to each callback through
//! a [`Context`], so callbacks may mutate both the schedule and the
//! application.
//!
//! ```
//! use netsim::prelude::*;
//!
//! let mut sched = Scheduler::<Vec<Time>>::builder().running(true).build();
//! let tick = sched.activity_new("tick").unwrap();
//! sched
//!     .timeout_notifiee_is(tick, |ctx: &mut Context<'_, Vec<Time>>| {
//!         let now = ctx.now();
//!         ctx.app.push(now);
//!         let next = now + Time::from_secs(1);
//!         ctx.scheduler.next_time_is(ctx.activity, next)?;
//!         Ok(())
//!     })
//!     .unwrap();
//! sched.next_time_is(tick, Time::from_secs(1)).unwrap();
//!
//! let mut log = Vec::new();
//! sched.now_is(Time::from_secs(3), &mut log);
//! assert_eq!(log, vec![Time::from_secs(1), Time::from_secs(2), Time::from_secs(3)]);
//! ```

use crate::{
    error::{Error, Result},
    time::Time,
};
use fxhash::FxHashMap;
use std::{
    any::Any,
    collections::VecDeque,
    fmt::Debug,
    panic::{catch_unwind, AssertUnwindSafe},
};
use tracing::{error, trace, trace_span, warn};

mod activity;
pub use self::activity::*;

mod builder;
pub use self::builder::*;

mod error;
pub use self::error::*;

mod limit;
pub use self::limit::*;

pub mod realtime;

///
/// A virtual-time manager for a set of activities.
///
/// The scheduler keeps two queues. The waiting queue holds activities
/// with a pending timeout, sorted by due time. The ready queue holds
/// activities due for execution, in FIFO order. An activity is in at
/// most one of them, and its [`Status`] tells which.
///
pub struct Scheduler<A> {
    name: String,
    now: Time,
    running: bool,
    dispatching: bool,
    current: Option<ActivityId>,

    limit: RuntimeLimit,
    itr: usize,

    next_id: u64,
    activities: FxHashMap<ActivityId, Activity<A>>,
    names: FxHashMap<String, ActivityId>,

    // sorted by due time, ties in insertion order
    waiting: Vec<(Time, ActivityId)>,
    ready: VecDeque<ActivityId>,
}

impl<A> Scheduler<A> {
    ///
    /// Creates a stopped scheduler at [`Time::ZERO`] with no limit.
    ///
    #[must_use]
    pub fn new() -> Self {
        Builder::new().build()
    }

    /// Returns a builder to configure a new scheduler.
    pub fn builder() -> Builder {
        Builder::new()
    }

    pub(crate) fn from_builder(builder: Builder) -> Self {
        Self {
            name: builder.name,
            now: builder.start_time,
            running: builder.running,
            dispatching: false,
            current: None,
            limit: builder.limit,
            itr: 0,
            next_id: 0,
            activities: FxHashMap::default(),
            names: FxHashMap::default(),
            waiting: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    /// The name used to identify this scheduler in log output.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    ///
    /// Returns the current virtual time.
    ///
    #[must_use]
    #[inline]
    pub fn now(&self) -> Time {
        self.now
    }

    /// Whether advancing the clock dispatches activities.
    #[must_use]
    #[inline]
    pub fn running(&self) -> bool {
        self.running
    }

    ///
    /// Starts or stops the scheduler. A stopped scheduler only
    /// records the clock when it is advanced.
    ///
    pub fn running_is(&mut self, running: bool) {
        self.running = running;
    }

    /// The number of activities dispatched so far.
    #[must_use]
    pub fn itr(&self) -> usize {
        self.itr
    }

    /// The limit that bounds dispatching.
    #[must_use]
    pub fn limit(&self) -> &RuntimeLimit {
        &self.limit
    }

    /// Replaces the dispatch limit.
    pub fn limit_is(&mut self, limit: RuntimeLimit) {
        self.limit = limit;
    }

    /// The number of activities owned by this scheduler.
    #[must_use]
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// Whether this scheduler owns no activities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// The number of activities currently due for execution.
    #[must_use]
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    ///
    /// Returns the waiting queue in dispatch order.
    ///
    pub fn waiting_queue(&self) -> impl Iterator<Item = (ActivityId, Time)> + '_ {
        self.waiting.iter().map(|&(t, id)| (id, t))
    }

    ///
    /// Returns the due time of the first waiting activity,
    /// or [`Time::NEVER`] if none is waiting.
    ///
    #[must_use]
    pub fn next_timeout(&self) -> Time {
        self.waiting.first().map_or(Time::NEVER, |&(t, _)| t)
    }

    // # Activity management

    ///
    /// Creates a new, free activity.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::NameInUse`](crate::error::ErrorKind::NameInUse)
    /// if an activity with the same name exists.
    ///
    pub fn activity_new(&mut self, name: impl Into<String>) -> Result<ActivityId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(Error::name_in_use(&name));
        }

        let id = ActivityId(self.next_id);
        self.next_id += 1;

        trace!(activity = %name, "created activity {id}");
        self.names.insert(name.clone(), id);
        self.activities.insert(id, Activity::new(name));
        Ok(id)
    }

    /// Looks up an activity by name.
    #[must_use]
    pub fn activity(&self, name: &str) -> Option<ActivityId> {
        self.names.get(name).copied()
    }

    /// Returns the activity behind a handle.
    #[must_use]
    pub fn get(&self, id: ActivityId) -> Option<&Activity<A>> {
        self.activities.get(&id)
    }

    /// Returns the status of an activity.
    #[must_use]
    pub fn status(&self, id: ActivityId) -> Option<Status> {
        self.activities.get(&id).map(Activity::status)
    }

    /// Returns the due time of an activity.
    #[must_use]
    pub fn next_time(&self, id: ActivityId) -> Option<Time> {
        self.activities.get(&id).map(Activity::next_time)
    }

    /// Iterates over all owned activities.
    pub fn activities(&self) -> impl Iterator<Item = (ActivityId, &Activity<A>)> {
        self.activities.iter().map(|(id, act)| (*id, act))
    }

    ///
    /// Deletes an activity by name.
    ///
    /// # Errors
    ///
    /// Fails if no such activity exists, or with
    /// [`ErrorKind::Permission`](crate::error::ErrorKind::Permission)
    /// if the activity is currently executing.
    ///
    pub fn activity_del(&mut self, name: &str) -> Result<()> {
        let id = self
            .activity(name)
            .ok_or_else(|| Error::not_found(format!("no activity named '{name}'")))?;
        self.activity_remove(id)
    }

    ///
    /// Deletes an activity by handle, removing it from its queue first.
    ///
    /// # Errors
    ///
    /// See [`Scheduler::activity_del`].
    ///
    pub fn activity_remove(&mut self, id: ActivityId) -> Result<()> {
        let act = self.activities.get(&id).ok_or_else(|| unknown(id))?;
        if act.status == Status::Executing || self.current == Some(id) {
            return Err(Error::permission(format!(
                "cannot delete executing activity '{}'",
                act.name
            )));
        }

        let status = act.status;
        match status {
            Status::Waiting => self.waiting_remove(id),
            Status::Ready => self.ready.retain(|x| *x != id),
            Status::Free | Status::Executing => {}
        }

        if let Some(act) = self.activities.remove(&id) {
            trace!(activity = %act.name, "deleted activity {id}");
            self.names.remove(&act.name);
        }
        Ok(())
    }

    // # Scheduling

    ///
    /// Sets the due time of an activity.
    ///
    /// An activity that is ready only because it was due leaves the
    /// ready queue. One with pending last notifiees keeps its place and
    /// is requeued for the new time after it was dispatched. Any other
    /// activity is (re)inserted into the waiting queue, or freed if
    /// the time is [`Time::NEVER`].
    ///
    /// # Errors
    ///
    /// Fails if the activity does not exist.
    ///
    pub fn next_time_is(&mut self, id: ActivityId, t: Time) -> Result<()> {
        let act = self.activities.get_mut(&id).ok_or_else(|| unknown(id))?;
        if act.next_time == t {
            return Ok(());
        }
        act.next_time = t;

        match (act.status, t.is_never()) {
            (Status::Ready, _) if !act.last_notifiees.is_empty() => {}
            (Status::Ready, true) => {
                act.status = Status::Free;
                self.ready.retain(|x| *x != id);
            }
            (Status::Ready, false) => {
                act.status = Status::Waiting;
                self.ready.retain(|x| *x != id);
                self.waiting_insert(id, t);
            }
            (Status::Executing | Status::Free, true) => {}
            (Status::Waiting, true) => {
                act.status = Status::Free;
                self.waiting_remove(id);
            }
            (Status::Waiting, false) => {
                self.waiting_remove(id);
                self.waiting_insert(id, t);
            }
            (Status::Free | Status::Executing, false) => {
                act.status = Status::Waiting;
                self.waiting_insert(id, t);
            }
        }
        Ok(())
    }

    ///
    /// Appends a one-shot callback that fires on the next drain pass,
    /// regardless of the due time.
    ///
    /// While the last notifiees are pending, the timeout notifiee
    /// does not fire. A pending timeout is kept and fires afterwards.
    ///
    /// # Errors
    ///
    /// Fails if the activity does not exist.
    ///
    pub fn last_notifiee_is<F>(&mut self, id: ActivityId, notifiee: F) -> Result<()>
    where
        F: FnMut(&mut Context<'_, A>) -> NotifyResult + 'static,
    {
        let act = self.activities.get_mut(&id).ok_or_else(|| unknown(id))?;
        act.last_notifiees.push_back(Box::new(notifiee));

        // picked up by the running drain, or allready queued
        if act.draining || act.status == Status::Ready {
            return Ok(());
        }

        let was_waiting = act.status == Status::Waiting;
        act.status = Status::Ready;
        if was_waiting {
            self.waiting_remove(id);
        }
        self.ready.push_back(id);
        Ok(())
    }

    ///
    /// Installs or replaces the callback fired when the due time is reached.
    ///
    /// The notifiee stays installed across dispatches, so an activity
    /// only needs to update its due time to fire again.
    ///
    /// # Errors
    ///
    /// Fails if the activity does not exist.
    ///
    pub fn timeout_notifiee_is<F>(&mut self, id: ActivityId, notifiee: F) -> Result<()>
    where
        F: FnMut(&mut Context<'_, A>) -> NotifyResult + 'static,
    {
        let act = self.activities.get_mut(&id).ok_or_else(|| unknown(id))?;
        act.timeout_notifiee = Some(Box::new(notifiee));
        act.notifiee_epoch += 1;
        Ok(())
    }

    ///
    /// Removes the timeout notifiee of an activity.
    ///
    /// # Errors
    ///
    /// Fails if the activity does not exist.
    ///
    pub fn timeout_notifiee_clear(&mut self, id: ActivityId) -> Result<()> {
        let act = self.activities.get_mut(&id).ok_or_else(|| unknown(id))?;
        act.timeout_notifiee = None;
        act.notifiee_epoch += 1;
        Ok(())
    }

    // # Clock

    ///
    /// Advances the virtual clock to `t`.
    ///
    /// A stopped scheduler only records the new time. A running one
    /// dispatches every activity due at or before `t`, including
    /// activities scheduled by callbacks for a time at or before `t`,
    /// and leaves the clock at `t`.
    ///
    /// A running scheduler never moves backwards. Advancing from
    /// inside a callback of the same scheduler is ignored.
    ///
    pub fn now_is(&mut self, t: Time, app: &mut A) {
        if !self.running {
            self.now = t;
            return;
        }
        if self.dispatching {
            warn!("ignoring nested clock advance to {t} on '{}'", self.name);
            return;
        }

        let target = if t < self.now {
            warn!(
                "cannot move clock of '{}' backwards from {} to {t}",
                self.name, self.now
            );
            self.now
        } else {
            t
        };

        self.dispatching = true;
        loop {
            self.reschedule();

            if self.ready.is_empty() {
                if self.now >= target {
                    break;
                }

                let next = self.next_timeout();
                if next > target {
                    if !target.is_never() {
                        self.now = target;
                    }
                    break;
                }

                if self.limit.applies(self.itr + 1, next) {
                    warn!("runtime limit {} reached at {}", self.limit, self.now);
                    break;
                }
                self.now = next;
            }

            if !self.run_ready_queue(app) {
                warn!(
                    "runtime limit {} reached at {}, {} activities remain ready",
                    self.limit,
                    self.now,
                    self.ready.len()
                );
                break;
            }
        }
        self.dispatching = false;
    }

    // Moves every waiting activity due at or before now into the ready queue.
    fn reschedule(&mut self) {
        let now = self.now;
        let split = self.waiting.partition_point(|&(t, _)| t <= now);
        for (_, id) in self.waiting.drain(..split) {
            if let Some(act) = self.activities.get_mut(&id) {
                act.status = Status::Ready;
                self.ready.push_back(id);
            }
        }
    }

    // Drains the ready queue. Returns false if the limit stopped the drain.
    fn run_ready_queue(&mut self, app: &mut A) -> bool {
        while let Some(&id) = self.ready.front() {
            if self.limit.applies(self.itr + 1, self.now) {
                return false;
            }
            self.ready.pop_front();
            self.itr += 1;

            self.execute(id, app);
            self.requeue(id);
        }
        true
    }

    fn execute(&mut self, id: ActivityId, app: &mut A) {
        let Some(act) = self.activities.get_mut(&id) else {
            return;
        };
        act.status = Status::Executing;

        let span = trace_span!("activity", activity = %act.name, t = %self.now);
        let _guard = span.enter();
        self.current = Some(id);

        if act.last_notifiees.is_empty() {
            act.next_time = Time::NEVER;
            let epoch = act.notifiee_epoch;
            match act.timeout_notifiee.take() {
                Some(mut notifiee) => {
                    trace!("timeout");
                    self.invoke(id, &mut notifiee, app);

                    // keep the notifiee unless the callback replaced or cleared it
                    if let Some(act) = self.activities.get_mut(&id) {
                        if act.notifiee_epoch == epoch && act.timeout_notifiee.is_none() {
                            act.timeout_notifiee = Some(notifiee);
                        }
                    }
                }
                None => trace!("timeout without notifiee"),
            }
        } else {
            act.draining = true;
            while let Some(mut notifiee) = self
                .activities
                .get_mut(&id)
                .and_then(|act| act.last_notifiees.pop_front())
            {
                trace!("last notifiee");
                self.invoke(id, &mut notifiee, app);
            }
            if let Some(act) = self.activities.get_mut(&id) {
                act.draining = false;
            }
        }

        self.current = None;
    }

    fn invoke(&mut self, id: ActivityId, notifiee: &mut Notifiee<A>, app: &mut A) {
        let mut ctx = Context {
            scheduler: self,
            app,
            activity: id,
        };
        match catch_unwind(AssertUnwindSafe(|| notifiee(&mut ctx))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("notifiee of activity {id} failed: {e}"),
            Err(payload) => error!(
                "notifiee of activity {id} panicked: {}",
                panic_message(payload.as_ref())
            ),
        }
    }

    // Applies the post-dispatch rule to an activity that left `execute`.
    fn requeue(&mut self, id: ActivityId) {
        let Some(act) = self.activities.get_mut(&id) else {
            return;
        };
        if act.status != Status::Executing {
            return;
        }

        if act.next_time.is_never() {
            act.status = Status::Free;
        } else {
            // a due time at or before now fires again on the next drain pass
            act.status = Status::Waiting;
            let t = act.next_time;
            self.waiting_insert(id, t);
        }
    }

    fn waiting_insert(&mut self, id: ActivityId, t: Time) {
        let pos = self.waiting.partition_point(|&(due, _)| due <= t);
        self.waiting.insert(pos, (t, id));
    }

    fn waiting_remove(&mut self, id: ActivityId) {
        if let Some(pos) = self.waiting.iter().position(|&(_, x)| x == id) {
            self.waiting.remove(pos);
        }
    }
}

impl<A> Default for Scheduler<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Debug for Scheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("name", &self.name)
            .field("now", &self.now)
            .field("running", &self.running)
            .field("limit", &self.limit)
            .field("itr", &self.itr)
            .field("activities", &self.activities.len())
            .field("waiting", &self.waiting.len())
            .field("ready", &self.ready.len())
            .finish()
    }
}

fn unknown(id: ActivityId) -> Error {
    Error::not_found(format!("no activity with handle {id}"))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}
