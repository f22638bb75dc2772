//!
//! A simulation context binding a scheduler to a network.
//!

use crate::{
    net::Network,
    runtime::{Builder, Scheduler},
    time::Time,
};

///
/// A network together with the scheduler that drives it.
///
/// Both parts are public fields, so network mutators can be handed
/// the scheduler as a disjoint borrow.
///
/// ```
/// use netsim::prelude::*;
///
/// let mut sim = Simulation::new();
/// let a = sim.network.host_new(&mut sim.scheduler, "a").unwrap();
/// sim.now_is(Time::from_secs(1));
///
/// assert_eq!(sim.now(), Time::from_secs(1));
/// assert_eq!(sim.network.host_stats(a).unwrap().packets_received, 0);
/// ```
///
#[derive(Debug)]
pub struct Simulation {
    /// The scheduler owning all activities of the network.
    pub scheduler: Scheduler<Network>,
    /// The simulated network.
    pub network: Network,
}

impl Simulation {
    /// Creates an empty simulation with a running scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::from_builder(Builder::new().name("simulation").running(true))
    }

    /// Creates an empty simulation with a custom scheduler.
    #[must_use]
    pub fn from_builder(builder: Builder) -> Self {
        Self {
            scheduler: builder.build(),
            network: Network::new(),
        }
    }

    /// The current virtual time.
    #[must_use]
    pub fn now(&self) -> Time {
        self.scheduler.now()
    }

    /// Starts or stops dispatching.
    pub fn running_is(&mut self, running: bool) {
        self.scheduler.running_is(running);
    }

    ///
    /// Advances the virtual clock to `t`, dispatching all activities
    /// of the network that become due.
    ///
    pub fn now_is(&mut self, t: Time) {
        self.scheduler.now_is(t, &mut self.network);
    }

    /// Advances the virtual clock by `duration`.
    pub fn run_for(&mut self, duration: Time) {
        let t = self.now() + duration;
        self.now_is(t);
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}
