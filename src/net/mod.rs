//!
//! The network model: nodes linked by point-to-point interfaces.
//!
//! A [`Network`] is an arena owning every [`Node`] and [`Interface`].
//! Objects refer to each other by [`NodeId`] and [`InterfaceId`]
//! handles, never by reference. Names are unique across nodes and
//! interfaces.
//!
//! All timed behavior runs on activities of a
//! [`Scheduler<Network>`](crate::runtime::Scheduler), which is why the
//! mutators that touch the schedule take it as an explicit argument.
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
//! assert_eq!(net.route(a, b), Some(ia));
//! assert_eq!(net.direct_neighbors(b), vec![a]);
//! ```

use fxhash::FxHashMap;
use std::fmt::Debug;

mod host;
pub use self::host::*;

mod interface;
pub use self::interface::*;

mod node;
pub use self::node::*;

mod packet;
pub use self::packet::*;

mod routing;

// An entry of the shared namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Object {
    Node(NodeId),
    Interface(InterfaceId),
}

///
/// The arena owning all nodes and interfaces of a simulated network.
///
#[derive(Default)]
pub struct Network {
    nodes: FxHashMap<NodeId, Node>,
    interfaces: FxHashMap<InterfaceId, Interface>,
    names: FxHashMap<String, Object>,

    next_node: u32,
    next_interface: u32,
}

impl Network {
    /// Creates an empty network.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The handles of all nodes, in creation order.
    #[must_use]
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = self.nodes.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// The handles of all interfaces, in creation order.
    #[must_use]
    pub fn interface_ids(&self) -> Vec<InterfaceId> {
        let mut ids = self.interfaces.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    /// The number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The number of interfaces.
    #[must_use]
    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }
}

impl Debug for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Network")
            .field("nodes", &self.nodes.len())
            .field("interfaces", &self.interfaces.len())
            .finish()
    }
}
