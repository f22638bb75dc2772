use super::{Age, Network, NodeId, Object, Packet, PacketSize};
use crate::{
    error::{Error, Result},
    macros::create_handle,
    runtime::{ActivityId, Context, Scheduler},
    time::Time,
};
use std::{collections::VecDeque, fmt::Display};
use tracing::{debug, trace};

create_handle! {
    /// A handle to an [`Interface`] of a [`Network`].
    pub InterfaceId(u32) = "iface";
}

///
/// The link technology of an interface.
///
/// The kind fixes the legal data rates and which interfaces
/// may be paired with each other.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterfaceKind {
    /// 10, 100 or 1000 Mbps. Both ends of a link must run at the same
    /// rate and the rate cannot change while the link is up.
    Ethernet,
    /// 25 or 155 Mbps.
    Atm,
}

impl InterfaceKind {
    /// The data rates an interface of this kind may be configured with.
    #[must_use]
    pub fn legal_rates(self) -> &'static [u32] {
        match self {
            Self::Ethernet => &[10, 100, 1000],
            Self::Atm => &[25, 155],
        }
    }

    /// The data rate of a new interface of this kind.
    #[must_use]
    pub fn default_rate(self) -> DataRate {
        match self {
            Self::Ethernet => DataRate(10),
            Self::Atm => DataRate(155),
        }
    }

    fn check_rate(self, rate: DataRate) -> Result<()> {
        if self.legal_rates().contains(&rate.0) {
            Ok(())
        } else {
            Err(Error::range(format!(
                "{rate} is not a legal {self} data rate, expected one of {:?} Mbps",
                self.legal_rates()
            )))
        }
    }
}

impl Display for InterfaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ethernet => write!(f, "Ethernet"),
            Self::Atm => write!(f, "ATM"),
        }
    }
}

///
/// A link bandwidth in Mbit/s.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataRate(u32);

impl DataRate {
    /// Creates a data rate of `mbps` Mbit/s.
    #[must_use]
    pub const fn new(mbps: u32) -> Self {
        Self(mbps)
    }

    /// The rate in Mbit/s.
    #[must_use]
    #[inline]
    pub const fn mbps(self) -> u32 {
        self.0
    }

    ///
    /// The time it takes to put a packet of the given size on the wire,
    /// or [`Time::NEVER`] at a zero rate.
    ///
    #[must_use]
    pub fn transmit_time(self, size: PacketSize) -> Time {
        if self.0 == 0 {
            return Time::NEVER;
        }
        // bits / (mbps * 10^6) seconds
        let nanos = u128::from(size.bits()) * 1_000 / u128::from(self.0);
        Time::from_nanos(i64::try_from(nanos).unwrap_or(i64::MAX))
    }
}

impl Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Mbps", self.0)
    }
}

impl TryFrom<i64> for DataRate {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| Error::range(format!("data rate {value} out of range")))
    }
}

///
/// The capacity of the transmit queue of an interface, in packets.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueueSize(u32);

impl QueueSize {
    /// The capacity of a new interface.
    pub const DEFAULT: QueueSize = QueueSize(10);

    /// Creates a capacity of `packets` packets.
    #[must_use]
    pub const fn new(packets: u32) -> Self {
        Self(packets)
    }

    /// The capacity in packets.
    #[must_use]
    #[inline]
    pub const fn packets(self) -> u32 {
        self.0
    }
}

impl Default for QueueSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for QueueSize {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| Error::range(format!("queue size {value} out of range")))
    }
}

///
/// A link endpoint.
///
/// An interface is owned by at most one node and paired with at most
/// one other interface. Packets handed to it for output wait in a
/// bounded FIFO queue and are delivered to the paired interface once
/// their transmission time has passed.
///
#[derive(Debug)]
pub struct Interface {
    pub(super) name: String,
    pub(super) kind: InterfaceKind,
    pub(super) data_rate: DataRate,
    pub(super) node: Option<NodeId>,
    pub(super) other_side: Option<InterfaceId>,

    pub(super) queue: VecDeque<Packet>,
    pub(super) queue_size: QueueSize,
    pub(super) filters: u32,

    pub(super) packets_received: u64,
    pub(super) packets_dropped: u64,

    pub(super) activity: ActivityId,
}

impl Interface {
    /// The unique name of the interface.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The link technology.
    #[must_use]
    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    /// The configured bandwidth.
    #[must_use]
    pub fn data_rate(&self) -> DataRate {
        self.data_rate
    }

    /// The owning node, if installed.
    #[must_use]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// The paired interface, if linked.
    #[must_use]
    pub fn other_side(&self) -> Option<InterfaceId> {
        self.other_side
    }

    /// The capacity of the transmit queue.
    #[must_use]
    pub fn queue_size(&self) -> QueueSize {
        self.queue_size
    }

    /// The number of packets waiting for transmission.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// The number of configured filters.
    #[must_use]
    pub fn filters(&self) -> u32 {
        self.filters
    }

    /// Packets that arrived at this interface.
    #[must_use]
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// Packets dropped on output or input.
    #[must_use]
    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped
    }

    /// The activity that completes transmissions.
    #[must_use]
    pub fn activity(&self) -> ActivityId {
        self.activity
    }

    /// A snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> InterfaceStats {
        InterfaceStats {
            packets_received: self.packets_received,
            packets_dropped: self.packets_dropped,
            queue_len: self.queue.len(),
        }
    }
}

///
/// A snapshot of the counters of an [`Interface`].
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceStats {
    /// Packets that arrived at the interface.
    pub packets_received: u64,
    /// Packets dropped on output or input.
    pub packets_dropped: u64,
    /// Packets waiting for transmission.
    pub queue_len: usize,
}

impl Network {
    ///
    /// Creates a new, unpaired interface that is not installed on any node.
    ///
    /// The interface owns an activity named `"<name> transmit packet"`.
    ///
    /// # Errors
    ///
    /// Fails with a name-in-use error if the interface name or the
    /// activity name is taken. Nothing is registered in that case.
    ///
    pub fn interface_new(
        &mut self,
        sched: &mut Scheduler<Network>,
        name: impl Into<String>,
        kind: InterfaceKind,
    ) -> Result<InterfaceId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(Error::name_in_use(&name));
        }

        let id = InterfaceId::next(&mut self.next_interface)?;
        let activity = sched.activity_new(format!("{name} transmit packet"))?;
        sched.timeout_notifiee_is(activity, move |ctx: &mut Context<'_, Network>| {
            ctx.app.transmit_complete(ctx.scheduler, id)?;
            Ok(())
        })?;

        trace!("created {kind} interface '{name}' as {id}");
        self.names.insert(name.clone(), Object::Interface(id));
        self.interfaces.insert(
            id,
            Interface {
                name,
                kind,
                data_rate: kind.default_rate(),
                node: None,
                other_side: None,
                queue: VecDeque::new(),
                queue_size: QueueSize::DEFAULT,
                filters: 0,
                packets_received: 0,
                packets_dropped: 0,
                activity,
            },
        );
        Ok(id)
    }

    /// Creates a new Ethernet interface. See [`Network::interface_new`].
    ///
    /// # Errors
    ///
    /// See [`Network::interface_new`].
    pub fn ethernet_interface_new(
        &mut self,
        sched: &mut Scheduler<Network>,
        name: impl Into<String>,
    ) -> Result<InterfaceId> {
        self.interface_new(sched, name, InterfaceKind::Ethernet)
    }

    /// Creates a new ATM interface. See [`Network::interface_new`].
    ///
    /// # Errors
    ///
    /// See [`Network::interface_new`].
    pub fn atm_interface_new(
        &mut self,
        sched: &mut Scheduler<Network>,
        name: impl Into<String>,
    ) -> Result<InterfaceId> {
        self.interface_new(sched, name, InterfaceKind::Atm)
    }

    /// Returns the interface behind a handle.
    #[must_use]
    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.get(&id)
    }

    /// A snapshot of the counters of an interface.
    #[must_use]
    pub fn interface_stats(&self, id: InterfaceId) -> Option<InterfaceStats> {
        self.interfaces.get(&id).map(Interface::stats)
    }

    /// Looks up an interface by name.
    #[must_use]
    pub fn interface_by_name(&self, name: &str) -> Option<InterfaceId> {
        match self.names.get(name) {
            Some(Object::Interface(id)) => Some(*id),
            _ => None,
        }
    }

    pub(super) fn interface_ref(&self, id: InterfaceId) -> Result<&Interface> {
        self.interfaces
            .get(&id)
            .ok_or_else(|| Error::not_found(format!("no interface with handle {id}")))
    }

    pub(super) fn interface_mut(&mut self, id: InterfaceId) -> Result<&mut Interface> {
        self.interfaces
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("no interface with handle {id}")))
    }

    // # Configuration

    ///
    /// Changes the bandwidth of an interface.
    ///
    /// # Errors
    ///
    /// Fails with a range error if the rate is not legal for the kind of
    /// the interface, and with a permission error when changing the rate
    /// of a paired Ethernet interface.
    ///
    pub fn data_rate_is(&mut self, id: InterfaceId, rate: DataRate) -> Result<()> {
        let iface = self.interface_ref(id)?;
        if iface.data_rate == rate {
            return Ok(());
        }
        iface.kind.check_rate(rate)?;
        if iface.kind == InterfaceKind::Ethernet && iface.other_side.is_some() {
            return Err(Error::permission(format!(
                "cannot change data rate of '{}' while linked",
                iface.name
            )));
        }

        self.interface_mut(id)?.data_rate = rate;
        Ok(())
    }

    ///
    /// Changes the capacity of the transmit queue. Packets allready
    /// queued beyond the new capacity are still transmitted.
    ///
    /// # Errors
    ///
    /// Fails if the interface does not exist.
    ///
    pub fn queue_size_is(&mut self, id: InterfaceId, size: QueueSize) -> Result<()> {
        self.interface_mut(id)?.queue_size = size;
        Ok(())
    }

    ///
    /// Sets the number of filters of an interface.
    ///
    /// # Errors
    ///
    /// Fails if the interface does not exist.
    ///
    pub fn filters_is(&mut self, id: InterfaceId, filters: u32) -> Result<()> {
        self.interface_mut(id)?.filters = filters;
        Ok(())
    }

    ///
    /// Pairs two interfaces, or unpairs `id` if `other` is `None`.
    ///
    /// Pairing is symmetric. Previous partners of both interfaces are
    /// unpaired first. Routes of all nodes are recomputed afterwards.
    ///
    /// # Errors
    ///
    /// Fails with a permission error when pairing an interface with
    /// itself, with an interface of another kind, or two Ethernet
    /// interfaces of different rates.
    ///
    pub fn other_side_is(&mut self, id: InterfaceId, other: Option<InterfaceId>) -> Result<()> {
        let iface = self.interface_ref(id)?;
        let Some(other) = other else {
            if let Some(peer) = iface.other_side {
                self.unlink(id);
                trace!("unlinked {id} and {peer}");
                self.route_update();
            }
            return Ok(());
        };

        if iface.other_side == Some(other) {
            return Ok(());
        }
        if other == id {
            return Err(Error::permission(format!(
                "cannot link interface '{}' to itself",
                iface.name
            )));
        }

        let peer = self.interface_ref(other)?;
        if peer.kind != iface.kind {
            return Err(Error::permission(format!(
                "cannot link {} interface '{}' to {} interface '{}'",
                iface.kind, iface.name, peer.kind, peer.name
            )));
        }
        if iface.kind == InterfaceKind::Ethernet && peer.data_rate != iface.data_rate {
            return Err(Error::permission(format!(
                "cannot link '{}' at {} to '{}' at {}",
                iface.name, iface.data_rate, peer.name, peer.data_rate
            )));
        }

        self.unlink(id);
        self.unlink(other);
        self.interface_mut(id)?.other_side = Some(other);
        self.interface_mut(other)?.other_side = Some(id);
        trace!("linked {id} and {other}");

        self.route_update();
        Ok(())
    }

    // Clears the pairing of `id` on both ends.
    pub(super) fn unlink(&mut self, id: InterfaceId) {
        let Some(peer) = self.interfaces.get_mut(&id).and_then(|i| i.other_side.take()) else {
            return;
        };
        if let Some(peer) = self.interfaces.get_mut(&peer) {
            peer.other_side = None;
        }
    }

    // # Packet flow

    ///
    /// Hands a packet to an interface for transmission.
    ///
    /// A full queue drops the packet and counts the drop. Otherwise the
    /// packet is queued and, if the transmitter is idle, its completion
    /// is scheduled.
    ///
    /// # Errors
    ///
    /// Fails if the interface does not exist.
    ///
    pub fn last_output_packet_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: InterfaceId,
        packet: Packet,
    ) -> Result<()> {
        let iface = self.interface_mut(id)?;
        if iface.queue.len() >= iface.queue_size.0 as usize {
            iface.packets_dropped += 1;
            debug!(
                "'{}' queue full ({}), dropped packet to {}",
                iface.name,
                iface.queue_size.0,
                packet.destination()
            );
            return Ok(());
        }

        iface.queue.push_back(packet);
        self.transmit_schedule(sched, id)
    }

    // Schedules completion of the head of the queue unless a completion is pending.
    fn transmit_schedule(&mut self, sched: &mut Scheduler<Network>, id: InterfaceId) -> Result<()> {
        let iface = self.interface_ref(id)?;
        let Some(head) = iface.queue.front() else {
            return Ok(());
        };
        // only an idle transmitter is armed, re-arming on every enqueue
        // would push the pending completion out
        if sched.next_time(iface.activity) != Some(Time::NEVER) {
            return Ok(());
        }

        let t = sched.now() + iface.data_rate.transmit_time(head.size());
        sched.next_time_is(iface.activity, t)
    }

    // Runs when the head of the queue has been put on the wire.
    pub(super) fn transmit_complete(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: InterfaceId,
    ) -> Result<()> {
        let iface = self.interface_mut(id)?;
        let Some(packet) = iface.queue.pop_front() else {
            return Ok(());
        };

        let peer = iface.other_side;
        match peer {
            Some(peer) => self.last_input_packet_is(sched, peer, packet)?,
            None => {
                iface.packets_dropped += 1;
                debug!("'{}' is not linked, dropped packet", iface.name);
            }
        }

        self.transmit_schedule(sched, id)
    }

    ///
    /// Delivers a packet arriving over the link at an interface.
    ///
    /// Packets at the minimum age, packets arriving at an interface
    /// without a node and packets the node has no route for are
    /// dropped and counted.
    ///
    /// # Errors
    ///
    /// Fails if the interface does not exist.
    ///
    pub fn last_input_packet_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: InterfaceId,
        mut packet: Packet,
    ) -> Result<()> {
        let iface = self.interface_mut(id)?;
        iface.packets_received += 1;

        if packet.age() <= Age::MIN {
            iface.packets_dropped += 1;
            debug!("'{}' dropped expired packet", iface.name);
            return Ok(());
        }
        packet.age_dec();

        let Some(node) = iface.node else {
            iface.packets_dropped += 1;
            debug!("'{}' is not installed, dropped packet", iface.name);
            return Ok(());
        };

        let destination = packet.destination();
        if destination != node && self.route(node, destination).is_none() {
            let iface = self.interface_mut(id)?;
            iface.packets_dropped += 1;
            debug!("'{}' has no route to {destination}, dropped packet", iface.name);
            return Ok(());
        }

        self.last_packet_is(sched, node, packet)
    }

    ///
    /// Deletes an interface, unpairing it and removing it from its node.
    ///
    /// # Errors
    ///
    /// Fails with a permission error if its transmit activity is executing.
    ///
    pub fn interface_del(&mut self, sched: &mut Scheduler<Network>, id: InterfaceId) -> Result<()> {
        let activity = self.interface_ref(id)?.activity;
        if sched.get(activity).is_some() {
            sched.activity_remove(activity)?;
        }

        self.unlink(id);
        if let Some(iface) = self.interfaces.remove(&id) {
            if let Some(node) = iface.node.and_then(|n| self.nodes.get_mut(&n)) {
                node.interfaces.retain(|i| *i != id);
            }
            self.names.remove(&iface.name);
            trace!("deleted interface '{}' with {} queued packets", iface.name, iface.queue.len());
        }

        self.route_update();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn transmit_time_of_ethernet_frame() {
        let rate = DataRate::new(10);
        assert_eq!(
            rate.transmit_time(PacketSize::new(1000)),
            Time::from_micros(800)
        );
        assert_eq!(
            DataRate::new(155).transmit_time(PacketSize::new(53)),
            Time::from_nanos(2735)
        );
        assert_eq!(DataRate::new(0).transmit_time(PacketSize::new(1)), Time::NEVER);
    }

    #[test]
    fn rates_depend_on_kind() {
        assert_eq!(InterfaceKind::Ethernet.default_rate(), DataRate::new(10));
        assert_eq!(InterfaceKind::Atm.default_rate(), DataRate::new(155));
        assert!(InterfaceKind::Ethernet.check_rate(DataRate::new(1000)).is_ok());
        assert_eq!(
            InterfaceKind::Atm
                .check_rate(DataRate::new(100))
                .unwrap_err()
                .kind(),
            ErrorKind::Range
        );
        assert_eq!(QueueSize::try_from(-1).unwrap_err().kind(), ErrorKind::Range);
    }
}
