use super::{InterfaceId, Network, NodeId};
use fxhash::{FxHashMap, FxHashSet};
use std::{cmp::Ordering, collections::BinaryHeap};
use tracing::trace;

// A candidate route during table construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DNode {
    cost: usize,
    seq: usize,
    node: NodeId,
    slot: usize,
}

impl Ord for DNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on cost, ties in insertion order
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for DNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Network {
    ///
    /// The routing table of a node as `(destination, slot)` pairs,
    /// sorted by destination.
    ///
    #[must_use]
    pub fn routes(&self, node: NodeId) -> Vec<(NodeId, usize)> {
        let Some(node) = self.nodes.get(&node) else {
            return Vec::new();
        };
        let mut routes = node
            .routes
            .iter()
            .map(|(dest, slot)| (*dest, *slot))
            .collect::<Vec<_>>();
        routes.sort_unstable();
        routes
    }

    // Recomputes the routing tables of all nodes.
    pub(super) fn route_update(&mut self) {
        for id in self.node_ids() {
            let routes = self.routes_compute(id);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.routes = routes;
            }
        }
    }

    // Shortest paths by hop count over linked interfaces.
    fn routes_compute(&self, start: NodeId) -> FxHashMap<NodeId, usize> {
        let mut routes = FxHashMap::default();
        let Some(node) = self.nodes.get(&start) else {
            return routes;
        };

        let mut active = BinaryHeap::new();
        let mut seq = 0;
        for (slot, iface) in node.interfaces.iter().enumerate() {
            let Some(peer) = self.peer_node(*iface) else {
                continue;
            };
            if peer == start {
                continue;
            }
            active.push(DNode {
                cost: 1,
                seq,
                node: peer,
                slot,
            });
            seq += 1;
        }

        routes.insert(start, usize::MAX);
        while let Some(cur) = active.pop() {
            if routes.contains_key(&cur.node) {
                continue;
            }
            routes.insert(cur.node, cur.slot);

            for next in self.direct_neighbors(cur.node) {
                if !routes.contains_key(&next) {
                    active.push(DNode {
                        cost: cur.cost + 1,
                        seq,
                        node: next,
                        slot: cur.slot,
                    });
                    seq += 1;
                }
            }
        }
        routes.remove(&start);

        trace!(
            "{start} created routing table with {} destinations",
            routes.len()
        );
        routes
    }

    // The node owning the far side of an interface.
    fn peer_node(&self, iface: InterfaceId) -> Option<NodeId> {
        let peer = self.interfaces.get(&iface)?.other_side?;
        self.interfaces.get(&peer)?.node
    }

    ///
    /// Returns the nodes found exactly `degree` hops away from `node`
    /// by a depth-first walk over linked interfaces.
    ///
    /// Each node is visited at most once, so on cyclic topologies a
    /// node is reported at the depth of the first path that reaches it.
    /// A `degree` of zero yields the node itself.
    ///
    #[must_use]
    pub fn distance_neighbors(&self, node: NodeId, degree: usize) -> Vec<NodeId> {
        let mut result = Vec::new();
        if !self.nodes.contains_key(&node) {
            return result;
        }

        let mut visited = FxHashSet::default();
        let mut stack = vec![(node, degree)];
        while let Some((cur, remaining)) = stack.pop() {
            if !visited.insert(cur) {
                continue;
            }
            if remaining == 0 {
                result.push(cur);
                continue;
            }

            // reversed, so the lowest slot is walked first
            for next in self.direct_neighbors(cur).into_iter().rev() {
                if !visited.contains(&next) {
                    stack.push((next, remaining - 1));
                }
            }
        }
        result
    }
}
