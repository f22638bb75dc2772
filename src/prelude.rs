//!
//! Convenience re-export of common members.
//!

//
// # Core exports
//

pub use crate::error::Error;
pub use crate::error::ErrorKind;

pub use crate::time::Time;

pub use crate::runtime::ActivityId;
pub use crate::runtime::Builder;
pub use crate::runtime::Context;
pub use crate::runtime::NotifyResult;
pub use crate::runtime::RuntimeError;
pub use crate::runtime::RuntimeLimit;
pub use crate::runtime::Scheduler;
pub use crate::runtime::Status;

pub use crate::runtime::realtime::Clock;
pub use crate::runtime::realtime::Ratio;
pub use crate::runtime::realtime::RealTimeManager;
pub use crate::runtime::realtime::SystemClock;

//
// # Network model
//

pub use crate::net::Age;
pub use crate::net::DataRate;
pub use crate::net::Host;
pub use crate::net::HostStats;
pub use crate::net::InterfaceId;
pub use crate::net::InterfaceKind;
pub use crate::net::InterfaceStats;
pub use crate::net::Network;
pub use crate::net::NodeId;
pub use crate::net::NodeKind;
pub use crate::net::Packet;
pub use crate::net::PacketSize;
pub use crate::net::QueueSize;
pub use crate::net::TransmitRate;

pub use crate::sim::Simulation;
