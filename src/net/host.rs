use super::{Network, NodeId, NodeKind, Packet, PacketSize};
use crate::{
    error::{Error, Result},
    runtime::{ActivityId, Context, Scheduler},
    time::Time,
};
use std::fmt::Display;
use tracing::{debug, trace};

///
/// The rate at which a host generates traffic, in Mbit/s.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransmitRate(u32);

impl TransmitRate {
    /// No traffic.
    pub const ZERO: TransmitRate = TransmitRate(0);

    /// Creates a rate of `mbps` Mbit/s.
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
    /// The time between two packets of the given size, or `None`
    /// if no traffic would be generated.
    ///
    #[must_use]
    pub fn interval(self, size: PacketSize) -> Option<Time> {
        if self.0 == 0 || size.bytes() == 0 {
            return None;
        }
        let nanos = u128::from(size.bits()) * 1_000 / u128::from(self.0);
        Some(Time::from_nanos(i64::try_from(nanos).unwrap_or(i64::MAX)))
    }
}

impl TryFrom<i64> for TransmitRate {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| Error::range(format!("transmit rate {value} out of range")))
    }
}

impl Display for TransmitRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}Mbps", self.0)
    }
}

///
/// The state of an IP host: a traffic source towards one destination
/// and a sink accounting for the latency of received packets.
///
#[derive(Debug)]
pub struct Host {
    pub(super) activity: ActivityId,
    pub(super) transmit_rate: TransmitRate,
    pub(super) packet_size: PacketSize,
    pub(super) destination: Option<NodeId>,

    pub(super) packets_sent: u64,
    pub(super) packets_received: u64,
    pub(super) total_latency: Time,
}

impl Host {
    /// The activity generating packets.
    #[must_use]
    pub fn activity(&self) -> ActivityId {
        self.activity
    }

    /// The configured transmit rate.
    #[must_use]
    pub fn transmit_rate(&self) -> TransmitRate {
        self.transmit_rate
    }

    /// The size of generated packets.
    #[must_use]
    pub fn packet_size(&self) -> PacketSize {
        self.packet_size
    }

    /// The node generated packets are addressed to.
    #[must_use]
    pub fn destination(&self) -> Option<NodeId> {
        self.destination
    }

    /// Packets generated so far.
    #[must_use]
    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    /// Packets accepted so far.
    #[must_use]
    pub fn packets_received(&self) -> u64 {
        self.packets_received
    }

    /// The summed latency of all accepted packets.
    #[must_use]
    pub fn total_latency(&self) -> Time {
        self.total_latency
    }

    ///
    /// The mean latency of all accepted packets in seconds,
    /// zero if none was accepted.
    ///
    #[must_use]
    pub fn average_latency(&self) -> f64 {
        if self.packets_received == 0 {
            return 0.0;
        }
        self.total_latency.as_nanos() as f64 / self.packets_received as f64 / 1e9
    }

    /// A snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> HostStats {
        HostStats {
            packets_sent: self.packets_sent,
            packets_received: self.packets_received,
            average_latency: self.average_latency(),
        }
    }
}

///
/// A snapshot of the counters of a [`Host`].
///
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HostStats {
    /// Packets generated by the host.
    pub packets_sent: u64,
    /// Packets addressed to and accepted by the host.
    pub packets_received: u64,
    /// The mean latency in seconds.
    pub average_latency: f64,
}

impl Network {
    ///
    /// Creates a host that does not generate traffic yet.
    ///
    /// The host owns an activity named `"<name> packet generator"`.
    ///
    /// # Errors
    ///
    /// Fails with a name-in-use error if the host name or the activity
    /// name is taken. Nothing is registered in that case.
    ///
    pub fn host_new(
        &mut self,
        sched: &mut Scheduler<Network>,
        name: impl Into<String>,
    ) -> Result<NodeId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(Error::name_in_use(&name));
        }

        let activity = sched.activity_new(format!("{name} packet generator"))?;
        let host = Host {
            activity,
            transmit_rate: TransmitRate::ZERO,
            packet_size: PacketSize::ZERO,
            destination: None,
            packets_sent: 0,
            packets_received: 0,
            total_latency: Time::ZERO,
        };
        let id = self.node_insert(name, NodeKind::Host(host))?;

        sched.timeout_notifiee_is(activity, move |ctx: &mut Context<'_, Network>| {
            ctx.app.generate_packet(ctx.scheduler, id)?;
            Ok(())
        })?;
        Ok(id)
    }

    /// Returns the host state of a node, if it is a host.
    #[must_use]
    pub fn host(&self, id: NodeId) -> Option<&Host> {
        self.nodes.get(&id)?.host()
    }

    /// A snapshot of the counters of a host.
    #[must_use]
    pub fn host_stats(&self, id: NodeId) -> Option<HostStats> {
        self.host(id).map(Host::stats)
    }

    fn host_mut(&mut self, id: NodeId) -> Result<&mut Host> {
        let node = self.node_mut(id)?;
        let name = &node.name;
        match &mut node.kind {
            NodeKind::Host(host) => Ok(host),
            other => Err(Error::permission(format!("{other} '{name}' is not a host"))),
        }
    }

    ///
    /// Changes the rate at which a host generates packets.
    ///
    /// # Errors
    ///
    /// Fails with a permission error if the node is not a host.
    ///
    pub fn transmit_rate_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: NodeId,
        rate: TransmitRate,
    ) -> Result<()> {
        let host = self.host_mut(id)?;
        if host.transmit_rate == rate {
            return Ok(());
        }
        host.transmit_rate = rate;
        self.generator_schedule(sched, id)
    }

    ///
    /// Changes the size of the packets a host generates.
    ///
    /// # Errors
    ///
    /// Fails with a permission error if the node is not a host.
    ///
    pub fn packet_size_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: NodeId,
        size: PacketSize,
    ) -> Result<()> {
        let host = self.host_mut(id)?;
        if host.packet_size == size {
            return Ok(());
        }
        host.packet_size = size;
        self.generator_schedule(sched, id)
    }

    ///
    /// Changes the node a host sends its packets to. `None` stops
    /// the traffic.
    ///
    /// # Errors
    ///
    /// Fails with a permission error if the node is not a host, and if
    /// the destination does not exist.
    ///
    pub fn destination_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: NodeId,
        destination: Option<NodeId>,
    ) -> Result<()> {
        if let Some(destination) = destination {
            self.node_ref(destination)?;
        }
        let host = self.host_mut(id)?;
        if host.destination == destination {
            return Ok(());
        }
        host.destination = destination;
        self.generator_schedule(sched, id)
    }

    // Restarts the generator interval from now, or stops it.
    fn generator_schedule(&mut self, sched: &mut Scheduler<Network>, id: NodeId) -> Result<()> {
        let host = self.host_mut(id)?;
        let interval = match host.destination {
            Some(_) => host.transmit_rate.interval(host.packet_size),
            None => None,
        };
        let t = interval.map_or(Time::NEVER, |interval| sched.now() + interval);
        sched.next_time_is(host.activity, t)
    }

    // Sends one packet and schedules the next one.
    pub(super) fn generate_packet(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: NodeId,
    ) -> Result<()> {
        let now = sched.now();
        let host = self.host_mut(id)?;
        let Some(destination) = host.destination else {
            return Ok(());
        };
        host.packets_sent += 1;

        let packet = Packet::new(host.packet_size, id, destination).with_timestamp(now);
        trace!("{id} sends {} to {destination}", packet.size());
        self.host_packet_is(sched, id, packet)?;

        self.generator_schedule(sched, id)
    }

    pub(super) fn host_packet_is(
        &mut self,
        sched: &mut Scheduler<Network>,
        id: NodeId,
        packet: Packet,
    ) -> Result<()> {
        if packet.source() == id && packet.destination() != id {
            return self.forward(sched, id, packet);
        }
        if packet.destination() != id {
            debug!("{id} dropped packet addressed to {}", packet.destination());
            return Ok(());
        }

        let latency = sched.now() - packet.timestamp();
        let host = self.host_mut(id)?;
        host.packets_received += 1;
        host.total_latency += latency;
        trace!("{id} received packet from {} after {latency}", packet.source());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_needs_rate_and_size() {
        let rate = TransmitRate::new(1);
        assert_eq!(
            rate.interval(PacketSize::new(100)),
            Some(Time::from_micros(800))
        );
        assert_eq!(rate.interval(PacketSize::ZERO), None);
        assert_eq!(TransmitRate::ZERO.interval(PacketSize::new(100)), None);
    }

    #[test]
    fn average_latency_is_zero_without_packets() {
        let mut sched = Scheduler::<Network>::new();
        let host = Host {
            activity: sched.activity_new("generator").unwrap(),
            transmit_rate: TransmitRate::ZERO,
            packet_size: PacketSize::ZERO,
            destination: None,
            packets_sent: 0,
            packets_received: 0,
            total_latency: Time::ZERO,
        };
        assert_eq!(host.average_latency(), 0.0);
        assert_eq!(host.stats(), HostStats::default());
    }
}
