use super::{Host, InterfaceId, InterfaceKind, Network, Object, Packet};
use crate::{
    error::{Error, Result},
    macros::create_handle,
    runtime::{Scheduler, Status},
};
use fxhash::FxHashMap;
use std::fmt::Display;
use tracing::{debug, trace};

create_handle! {
    /// A handle to a [`Node`] of a [`Network`].
    pub NodeId(u32) = "node";
}

///
/// The role of a node, with the per-role state.
///
#[derive(Debug)]
pub enum NodeKind {
    /// A switch with Ethernet ports only.
    EthernetSwitch,
    /// A switch with ATM ports only.
    AtmSwitch,
    /// A router accepting interfaces of any kind.
    Router,
    /// An end system generating and consuming traffic.
    Host(Host),
}

impl NodeKind {
    /// Whether an interface of the given kind may be installed.
    #[must_use]
    pub fn accepts(&self, kind: InterfaceKind) -> bool {
        match self {
            Self::EthernetSwitch => kind == InterfaceKind::Ethernet,
            Self::AtmSwitch => kind == InterfaceKind::Atm,
            Self::Router | Self::Host(_) => true,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EthernetSwitch => write!(f, "Ethernet switch"),
            Self::AtmSwitch => write!(f, "ATM switch"),
            Self::Router => write!(f, "IP router"),
            Self::Host(_) => write!(f, "IP host"),
        }
    }
}

///
/// A network node owning a slot indexed list of interfaces and a
/// routing table.
///
#[derive(Debug)]
pub struct Node {
    pub(super) name: String,
    pub(super) kind: NodeKind,
    pub(super) interfaces: Vec<InterfaceId>,
    pub(super) routes: FxHashMap<NodeId, usize>,
}

impl Node {
    pub(super) fn new(name: String, kind: NodeKind) -> Self {
        Self {
            name,
            kind,
            interfaces: Vec::new(),
            routes: FxHashMap::default(),
        }
    }

    /// The unique name of the node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The role of the node.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The host state, if this node is a host.
    #[must_use]
    pub fn host(&self) -> Option<&Host> {
        match &self.kind {
            NodeKind::Host(host) => Some(host),
            _ => None,
        }
    }

    /// The installed interfaces, indexed by slot.
    #[must_use]
    pub fn interfaces(&self) -> &[InterfaceId] {
        &self.interfaces
    }

    /// The interface installed at `slot`.
    #[must_use]
    pub fn interface(&self, slot: usize) -> Option<InterfaceId> {
        self.interfaces.get(slot).copied()
    }

    /// The outgoing slot towards `destination`.
    #[must_use]
    pub fn route_slot(&self, destination: NodeId) -> Option<usize> {
        self.routes.get(&destination).copied()
    }

    /// The number of reachable destinations.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Network {
    ///
    /// Creates a switch that only accepts Ethernet interfaces.
    ///
    /// # Errors
    ///
    /// Fails if the name is in use.
    ///
    pub fn ethernet_switch_new(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.node_insert(name.into(), NodeKind::EthernetSwitch)
    }

    ///
    /// Creates a switch that only accepts ATM interfaces.
    ///
    /// # Errors
    ///
    /// Fails if the name is in use.
    ///
    pub fn atm_switch_new(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.node_insert(name.into(), NodeKind::AtmSwitch)
    }

    ///
    /// Creates a router.
    ///
    /// # Errors
    ///
    /// Fails if the name is in use.
    ///
    pub fn router_new(&mut self, name: impl Into<String>) -> Result<NodeId> {
        self.node_insert(name.into(), NodeKind::Router)
    }

    pub(super) fn node_insert(&mut self, name: String, kind: NodeKind) -> Result<NodeId> {
        if self.names.contains_key(&name) {
            return Err(Error::name_in_use(&name));
        }
        let id = NodeId::next(&mut self.next_node)?;
        trace!("created {kind} '{name}' as {id}");
        self.names.insert(name.clone(), Object::Node(id));
        self.nodes.insert(id, Node::new(name, kind));
        Ok(id)
    }

    /// Returns the node behind a handle.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Looks up a node by name.
    #[must_use]
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        match self.names.get(name) {
            Some(Object::Node(id)) => Some(*id),
            _ => None,
        }
    }

    pub(super) fn node_ref(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("no node with handle {id}")))
    }

    pub(super) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("no node with handle {id}")))
    }

    ///
    /// Installs, replaces or removes the interface at `slot` of a node.
    ///
    /// With `Some(iface)`, `slot == len` appends and `slot < len`
    /// replaces, detaching the previous interface. With `None`, the slot
    /// is removed and later slots move down by one. Routes of all nodes
    /// are recomputed afterwards.
    ///
    /// # Errors
    ///
    /// Fails with a range error if `slot` lies beyond the end of the
    /// list, and with a permission error if the node does not accept the
    /// kind of the interface or the interface is installed elsewhere.
    ///
    pub fn interface_is(
        &mut self,
        node_id: NodeId,
        slot: usize,
        iface_id: Option<InterfaceId>,
    ) -> Result<()> {
        let node = self.node_ref(node_id)?;
        let len = node.interfaces.len();
        if slot > len {
            return Err(Error::range(format!(
                "slot {slot} out of range, '{}' has {len} interfaces",
                node.name
            )));
        }

        let Some(iface_id) = iface_id else {
            if slot < len {
                let old = self.node_mut(node_id)?.interfaces.remove(slot);
                if let Some(old) = self.interfaces.get_mut(&old) {
                    old.node = None;
                }
                trace!("removed slot {slot} of {node_id}");
                self.route_update();
            }
            return Ok(());
        };

        let iface = self.interface_ref(iface_id)?;
        if !node.kind.accepts(iface.kind) {
            return Err(Error::permission(format!(
                "{} '{}' does not accept {} interface '{}'",
                node.kind, node.name, iface.kind, iface.name
            )));
        }
        if let Some(owner) = iface.node {
            if owner == node_id && node.interfaces.get(slot) == Some(&iface_id) {
                return Ok(());
            }
            return Err(Error::permission(format!(
                "interface '{}' is allready installed on {owner}",
                iface.name
            )));
        }

        let node = self.node_mut(node_id)?;
        let old = if slot == len {
            node.interfaces.push(iface_id);
            None
        } else {
            Some(std::mem::replace(&mut node.interfaces[slot], iface_id))
        };

        if let Some(old) = old.and_then(|old| self.interfaces.get_mut(&old)) {
            old.node = None;
        }
        self.interface_mut(iface_id)?.node = Some(node_id);
        trace!("installed {iface_id} at slot {slot} of {node_id}");

        self.route_update();
        Ok(())
    }

    ///
    /// Returns the nodes on the far side of every linked interface,
    /// in slot order.
    ///
    #[must_use]
    pub fn direct_neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(&node) else {
            return Vec::new();
        };
        node.interfaces
            .iter()
            .filter_map(|id| self.interfaces.get(id)?.other_side)
            .filter_map(|peer| self.interfaces.get(&peer)?.node)
            .collect()
    }

    ///
    /// Returns the interface a node forwards packets for `destination` to.
    ///
    #[must_use]
    pub fn route(&self, node: NodeId, destination: NodeId) -> Option<InterfaceId> {
        let node = self.nodes.get(&node)?;
        node.interface(node.route_slot(destination)?)
    }

    ///
    /// Hands a packet to a node.
    ///
    /// Packets for the node itself are consumed. Others are forwarded
    /// to the interface found by a routing table lookup, or dropped if
    /// there is no route. Hosts additionally originate their own packets
    /// and account for received traffic.
    ///
    /// # Errors
    ///
    /// Fails if the node does not exist.
    ///
    pub fn last_packet_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        node_id: NodeId,
        packet: Packet,
    ) -> Result<()> {
        let node = self.node_ref(node_id)?;
        if let NodeKind::Host(_) = node.kind {
            return self.host_packet_is(sched, node_id, packet);
        }

        if packet.destination() == node_id {
            trace!("'{}' consumed packet from {}", node.name, packet.source());
            return Ok(());
        }
        self.forward(sched, node_id, packet)
    }

    pub(super) fn forward(
        &mut self,
        sched: &mut Scheduler<Network>,
        node_id: NodeId,
        packet: Packet,
    ) -> Result<()> {
        match self.route(node_id, packet.destination()) {
            Some(iface) => self.last_output_packet_is(sched, iface, packet),
            None => {
                debug!("{node_id} has no route to {}, dropped packet", packet.destination());
                Ok(())
            }
        }
    }

    ///
    /// Deletes a node. Its interfaces stay alive but are detached,
    /// hosts sending to it stop generating traffic and routes of all
    /// nodes are recomputed.
    ///
    /// # Errors
    ///
    /// Fails with a permission error if the node is a host whose packet
    /// generator is executing.
    ///
    pub fn node_del(&mut self, sched: &mut Scheduler<Network>, node_id: NodeId) -> Result<()> {
        let node = self.node_ref(node_id)?;
        if let Some(host) = node.host() {
            if sched.status(host.activity) == Some(Status::Executing) {
                return Err(Error::permission(format!(
                    "cannot delete '{}' while its packet generator is executing",
                    node.name
                )));
            }
            if sched.get(host.activity).is_some() {
                sched.activity_remove(host.activity)?;
            }
        }

        let Some(node) = self.nodes.remove(&node_id) else {
            return Ok(());
        };
        for iface in &node.interfaces {
            if let Some(iface) = self.interfaces.get_mut(iface) {
                iface.node = None;
            }
        }
        self.names.remove(&node.name);
        trace!("deleted {} '{}'", node.kind, node.name);

        let senders: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, n)| n.host().is_some_and(|h| h.destination == Some(node_id)))
            .map(|(id, _)| *id)
            .collect();
        for sender in senders {
            self.destination_is(sched, sender, None)?;
        }

        self.route_update();
        Ok(())
    }
}
