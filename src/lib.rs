//!
//! A discrete event network simulator.
//!
//! The crate couples two parts. The [`runtime`] is a virtual-time
//! event engine: a [`Scheduler`](crate::runtime::Scheduler) owns named
//! activities with due times and callbacks, and dispatches them in
//! time order when its clock is advanced. A
//! [`RealTimeManager`](crate::runtime::realtime::RealTimeManager) paces
//! such a scheduler to the wall clock.
//!
//! The [`net`] module models packet-switched networks on top of it.
//! Nodes own interfaces, interfaces are paired into links, and every
//! timed behavior (transmission delay, packet generation) is an
//! activity on the scheduler. Routes are shortest paths by hop count,
//! recomputed whenever the topology changes.
//!
//! # Simulating a link
//!
//! ```
//! use netsim::prelude::*;
//!
//! let mut sim = Simulation::new();
//! let (sched, net) = (&mut sim.scheduler, &mut sim.network);
//!
//! let a = net.host_new(sched, "a").unwrap();
//! let b = net.host_new(sched, "b").unwrap();
//! let ia = net.ethernet_interface_new(sched, "a.eth0").unwrap();
//! let ib = net.ethernet_interface_new(sched, "b.eth0").unwrap();
//! net.interface_is(a, 0, Some(ia)).unwrap();
//! net.interface_is(b, 0, Some(ib)).unwrap();
//! net.other_side_is(ia, Some(ib)).unwrap();
//!
//! // 100 byte packets at 1 Mbps, one every 800us
//! net.packet_size_is(sched, a, PacketSize::new(100)).unwrap();
//! net.transmit_rate_is(sched, a, TransmitRate::new(1)).unwrap();
//! net.destination_is(sched, a, Some(b)).unwrap();
//!
//! sim.now_is(Time::from_millis(2));
//!
//! let stats = sim.network.host_stats(b).unwrap();
//! assert_eq!(stats.packets_received, 2);
//! assert!((stats.average_latency - 80e-6).abs() < 1e-12);
//! ```
//!
//! Logging goes through [`tracing`](::tracing). The [`tracing`](crate::tracing)
//! module provides a subscriber that prints the dispatching activity
//! and its virtual time with every event.
//!

mod macros;

pub mod error;
pub mod net;
pub mod prelude;
pub mod runtime;
pub mod sim;
pub mod time;
pub mod tracing;
