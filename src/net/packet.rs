use super::NodeId;
use crate::{
    error::{Error, Result},
    time::Time,
};
use std::fmt::Display;

///
/// The size of a packet in bytes.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PacketSize(u32);

impl PacketSize {
    /// A packet without payload.
    pub const ZERO: PacketSize = PacketSize(0);

    /// Creates a new packet size.
    #[must_use]
    pub const fn new(bytes: u32) -> Self {
        Self(bytes)
    }

    /// The size in bytes.
    #[must_use]
    #[inline]
    pub const fn bytes(self) -> u32 {
        self.0
    }

    /// The size in bits.
    #[must_use]
    #[inline]
    pub const fn bits(self) -> u64 {
        self.0 as u64 * 8
    }
}

impl TryFrom<i64> for PacketSize {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| Error::range(format!("packet size {value} out of range")))
    }
}

impl Display for PacketSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

///
/// The remaining hop count of a packet.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Age(u8);

impl Age {
    /// The hop count of a new packet.
    pub const DEFAULT: Age = Age(64);
    /// A packet that arrives at this age is dropped.
    pub const MIN: Age = Age(1);

    /// Creates a new age.
    #[must_use]
    pub const fn new(hops: u8) -> Self {
        Self(hops)
    }

    /// The remaining hops.
    #[must_use]
    #[inline]
    pub const fn hops(self) -> u8 {
        self.0
    }
}

impl Default for Age {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for Age {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| Error::range(format!("age {value} out of range")))
    }
}

///
/// A packet travelling through the network.
///
/// Source and destination are plain handles, a packet does not keep
/// the nodes it names alive.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    size: PacketSize,
    source: NodeId,
    destination: NodeId,
    age: Age,
    timestamp: Time,
}

impl Packet {
    /// Creates a new packet with the default age and a zero timestamp.
    #[must_use]
    pub fn new(size: PacketSize, source: NodeId, destination: NodeId) -> Self {
        Self {
            size,
            source,
            destination,
            age: Age::DEFAULT,
            timestamp: Time::ZERO,
        }
    }

    /// Sets the initial hop count.
    #[must_use]
    pub fn with_age(mut self, age: Age) -> Self {
        self.age = age;
        self
    }

    /// Sets the send timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Time) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The packet size.
    #[must_use]
    pub fn size(&self) -> PacketSize {
        self.size
    }

    /// The originating node.
    #[must_use]
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// The node this packet is addressed to.
    #[must_use]
    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// The remaining hop count.
    #[must_use]
    pub fn age(&self) -> Age {
        self.age
    }

    /// The time the packet was sent.
    #[must_use]
    pub fn timestamp(&self) -> Time {
        self.timestamp
    }

    // Decrements the hop count, never below zero.
    pub(crate) fn age_dec(&mut self) {
        self.age = Age(self.age.0.saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn negative_size_is_a_range_error() {
        assert_eq!(
            PacketSize::try_from(-1).unwrap_err().kind(),
            ErrorKind::Range
        );
        assert_eq!(PacketSize::try_from(1500).unwrap().bits(), 12_000);
        assert_eq!(Age::try_from(300).unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn age_counts_down_to_zero() {
        let (a, b) = (NodeId::from_raw(0), NodeId::from_raw(1));
        let mut packet = Packet::new(PacketSize::new(10), a, b).with_age(Age::new(1));
        assert_eq!(packet.age(), Age::MIN);
        packet.age_dec();
        packet.age_dec();
        assert_eq!(packet.age().hops(), 0);
        assert_eq!(Packet::new(PacketSize::ZERO, a, a).age(), Age::DEFAULT);
    }
}
