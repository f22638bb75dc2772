use crate::time::Time;
use std::{fmt::Display, mem};

///
/// A composed limit that stops a scheduler from dispatching further
/// activities.
///
/// A scheduler whose limit applies leaves the remaining work queued,
/// so raising the limit and advancing the clock again resumes it.
///
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuntimeLimit {
    /// No bound. Dispatching only stops at the requested target time.
    #[default]
    None,

    /// A bound on the number of dispatched activities.
    /// The bound-th dispatch is still executed.
    EventCount(usize),

    /// A bound on the virtual time. Activities due after the given
    /// time are not dispatched.
    SimTime(Time),

    /// Applies only if both limits apply.
    CombinedAnd(Box<RuntimeLimit>, Box<RuntimeLimit>),

    /// Applies if either limit applies.
    CombinedOr(Box<RuntimeLimit>, Box<RuntimeLimit>),
}

impl RuntimeLimit {
    pub(crate) fn applies(&self, itr_count: usize, time: Time) -> bool {
        match self {
            Self::None => false,

            Self::EventCount(e) => itr_count > *e,
            Self::SimTime(t) => time > *t,

            Self::CombinedAnd(lhs, rhs) => {
                lhs.applies(itr_count, time) && rhs.applies(itr_count, time)
            }
            Self::CombinedOr(lhs, rhs) => {
                lhs.applies(itr_count, time) || rhs.applies(itr_count, time)
            }
        }
    }

    pub(crate) fn add(&mut self, limit: RuntimeLimit) {
        if matches!(self, Self::None) {
            *self = limit;
        } else {
            let other = mem::take(self);
            *self = Self::CombinedOr(Box::new(other), Box::new(limit));
        }
    }
}

impl Display for RuntimeLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),

            Self::EventCount(e) => write!(f, "MaxEventCount({e})"),
            Self::SimTime(t) => write!(f, "MaxSimTime({t})"),

            Self::CombinedAnd(lhs, rhs) => write!(f, "{lhs} and {rhs}"),
            Self::CombinedOr(lhs, rhs) => write!(f, "{lhs} or {rhs}"),
        }
    }
}
