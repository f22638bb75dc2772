use netsim::prelude::*;

fn ethernet(sim: &mut Simulation, node: NodeId, name: &str) -> InterfaceId {
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let iface = net.ethernet_interface_new(sched, name).unwrap();
    let slot = net.node(node).unwrap().interfaces().len();
    net.interface_is(node, slot, Some(iface)).unwrap();
    iface
}

fn link(sim: &mut Simulation, a: NodeId, b: NodeId) -> (InterfaceId, InterfaceId) {
    let name_a = format!("{a}-{b}");
    let name_b = format!("{b}-{a}");
    let ia = ethernet(sim, a, &name_a);
    let ib = ethernet(sim, b, &name_b);
    sim.network.other_side_is(ia, Some(ib)).unwrap();
    (ia, ib)
}

#[test]
fn ethernet_frame_arrives_after_800us() {
    let mut sim = Simulation::new();
    let a = sim.network.host_new(&mut sim.scheduler, "a").unwrap();
    let b = sim.network.host_new(&mut sim.scheduler, "b").unwrap();
    let (ia, ib) = link(&mut sim, a, b);

    let packet = Packet::new(PacketSize::new(1000), a, b);
    sim.network
        .last_output_packet_is(&mut sim.scheduler, ia, packet)
        .unwrap();
    assert_eq!(sim.network.interface(ia).unwrap().queue_len(), 1);

    sim.now_is(Time::from_nanos(799_999));
    assert_eq!(sim.network.host_stats(b).unwrap().packets_received, 0);

    sim.now_is(Time::from_micros(800));
    let stats = sim.network.host_stats(b).unwrap();
    assert_eq!(stats.packets_received, 1);
    assert!((stats.average_latency - 0.0008).abs() < 1e-12);
    assert_eq!(sim.network.interface(ib).unwrap().packets_received(), 1);
    assert_eq!(sim.network.interface(ia).unwrap().queue_len(), 0);

    sim.now_is(Time::from_secs(1));
    assert_eq!(sim.network.host_stats(b).unwrap().packets_received, 1);
}

#[test]
fn queued_frames_are_sent_back_to_back() {
    let mut sim = Simulation::new();
    let a = sim.network.router_new("a").unwrap();
    let b = sim.network.host_new(&mut sim.scheduler, "b").unwrap();
    let (ia, _) = link(&mut sim, a, b);

    for _ in 0..3 {
        let packet = Packet::new(PacketSize::new(1000), a, b);
        sim.network
            .last_output_packet_is(&mut sim.scheduler, ia, packet)
            .unwrap();
    }

    sim.now_is(Time::from_micros(1_600));
    assert_eq!(sim.network.host_stats(b).unwrap().packets_received, 2);
    sim.now_is(Time::from_micros(2_400));
    let stats = sim.network.host_stats(b).unwrap();
    assert_eq!(stats.packets_received, 3);
    // 800us, 1600us and 2400us after a common timestamp
    assert!((stats.average_latency - 0.0016).abs() < 1e-12);
}

#[test]
fn full_queue_drops() {
    let mut sim = Simulation::new();
    let a = sim.network.router_new("a").unwrap();
    let b = sim.network.router_new("b").unwrap();
    let (ia, _) = link(&mut sim, a, b);
    sim.network.queue_size_is(ia, QueueSize::new(4)).unwrap();

    for _ in 0..5 {
        let packet = Packet::new(PacketSize::new(100), a, b);
        sim.network
            .last_output_packet_is(&mut sim.scheduler, ia, packet)
            .unwrap();
    }

    let stats = sim.network.interface_stats(ia).unwrap();
    assert_eq!(stats.queue_len, 4);
    assert_eq!(stats.packets_dropped, 1);
}

#[test]
fn unlinked_interface_drops_on_completion() {
    let mut sim = Simulation::new();
    let a = sim.network.router_new("a").unwrap();
    let b = sim.network.router_new("b").unwrap();
    let ia = ethernet(&mut sim, a, "a.eth0");

    let packet = Packet::new(PacketSize::new(100), a, b);
    sim.network
        .last_output_packet_is(&mut sim.scheduler, ia, packet)
        .unwrap();
    sim.now_is(Time::from_millis(1));

    let stats = sim.network.interface_stats(ia).unwrap();
    assert_eq!(stats.queue_len, 0);
    assert_eq!(stats.packets_dropped, 1);
}

#[test]
fn expired_packets_are_dropped() {
    let mut sim = Simulation::new();
    let a = sim.network.router_new("a").unwrap();
    let b = sim.network.host_new(&mut sim.scheduler, "b").unwrap();
    let (ia, ib) = link(&mut sim, a, b);

    let packet = Packet::new(PacketSize::new(100), a, b).with_age(Age::MIN);
    sim.network
        .last_output_packet_is(&mut sim.scheduler, ia, packet)
        .unwrap();
    sim.now_is(Time::from_millis(1));

    let stats = sim.network.interface_stats(ib).unwrap();
    assert_eq!(stats.packets_received, 1);
    assert_eq!(stats.packets_dropped, 1);
    assert_eq!(sim.network.host_stats(b).unwrap().packets_received, 0);
}

#[test]
fn pairing_is_symmetric() {
    let mut sim = Simulation::new();
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let a = net.ethernet_interface_new(sched, "a").unwrap();
    let b = net.ethernet_interface_new(sched, "b").unwrap();
    let c = net.ethernet_interface_new(sched, "c").unwrap();

    net.other_side_is(a, Some(b)).unwrap();
    assert_eq!(net.interface(a).unwrap().other_side(), Some(b));
    assert_eq!(net.interface(b).unwrap().other_side(), Some(a));

    net.other_side_is(c, Some(a)).unwrap();
    assert_eq!(net.interface(a).unwrap().other_side(), Some(c));
    assert_eq!(net.interface(c).unwrap().other_side(), Some(a));
    assert_eq!(net.interface(b).unwrap().other_side(), None);

    net.other_side_is(a, None).unwrap();
    assert_eq!(net.interface(a).unwrap().other_side(), None);
    assert_eq!(net.interface(c).unwrap().other_side(), None);
}

#[test]
fn pairing_checks_kind_and_rate() {
    let mut sim = Simulation::new();
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let e1 = net.ethernet_interface_new(sched, "e1").unwrap();
    let e2 = net.ethernet_interface_new(sched, "e2").unwrap();
    let atm = net.atm_interface_new(sched, "atm").unwrap();

    let err = net.other_side_is(e1, Some(e1)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    let err = net.other_side_is(e1, Some(atm)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    net.data_rate_is(e2, DataRate::new(100)).unwrap();
    let err = net.other_side_is(e1, Some(e2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(net.interface(e1).unwrap().other_side(), None);

    let err = net.data_rate_is(e1, DataRate::new(55)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);
    assert!(err.to_string().ends_with("(ERANGE)"));

    net.data_rate_is(e1, DataRate::new(100)).unwrap();
    net.other_side_is(e1, Some(e2)).unwrap();
    let err = net.data_rate_is(e1, DataRate::new(10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    assert_eq!(net.interface(e1).unwrap().data_rate(), DataRate::new(100));
}

#[test]
fn atm_rates_may_change_while_linked() {
    let mut sim = Simulation::new();
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let a = net.atm_interface_new(sched, "a").unwrap();
    let b = net.atm_interface_new(sched, "b").unwrap();
    net.other_side_is(a, Some(b)).unwrap();

    net.data_rate_is(a, DataRate::new(25)).unwrap();
    assert_eq!(net.interface(a).unwrap().data_rate(), DataRate::new(25));
    assert_eq!(net.interface(b).unwrap().data_rate(), DataRate::new(155));
}

#[test]
fn interface_slots() {
    let mut sim = Simulation::new();
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let r = net.router_new("r").unwrap();
    let i0 = net.ethernet_interface_new(sched, "i0").unwrap();
    let i1 = net.atm_interface_new(sched, "i1").unwrap();
    let i2 = net.ethernet_interface_new(sched, "i2").unwrap();

    let err = net.interface_is(r, 1, Some(i0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);

    net.interface_is(r, 0, Some(i0)).unwrap();
    net.interface_is(r, 1, Some(i1)).unwrap();
    assert_eq!(net.node(r).unwrap().interfaces(), &[i0, i1]);
    assert_eq!(net.interface(i1).unwrap().node(), Some(r));

    // replace
    net.interface_is(r, 1, Some(i2)).unwrap();
    assert_eq!(net.node(r).unwrap().interfaces(), &[i0, i2]);
    assert_eq!(net.interface(i1).unwrap().node(), None);

    // remove and shift
    net.interface_is(r, 0, None).unwrap();
    assert_eq!(net.node(r).unwrap().interfaces(), &[i2]);
    assert_eq!(net.node(r).unwrap().interface(0), Some(i2));
    assert_eq!(net.interface(i0).unwrap().node(), None);

    let other = net.router_new("other").unwrap();
    let err = net.interface_is(other, 0, Some(i2)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
}

#[test]
fn switches_accept_their_kind_only() {
    let mut sim = Simulation::new();
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let eth_switch = net.ethernet_switch_new("sw-eth").unwrap();
    let atm_switch = net.atm_switch_new("sw-atm").unwrap();
    let eth = net.ethernet_interface_new(sched, "eth").unwrap();
    let atm = net.atm_interface_new(sched, "atm").unwrap();

    let err = net.interface_is(eth_switch, 0, Some(atm)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);
    let err = net.interface_is(atm_switch, 0, Some(eth)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Permission);

    net.interface_is(eth_switch, 0, Some(eth)).unwrap();
    net.interface_is(atm_switch, 0, Some(atm)).unwrap();
    assert!(matches!(
        net.node(atm_switch).unwrap().kind(),
        NodeKind::AtmSwitch
    ));
}

#[test]
fn names_are_unique_across_objects() {
    let mut sim = Simulation::new();
    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    let r = net.router_new("x").unwrap();

    let err = net.ethernet_interface_new(sched, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameInUse);
    let err = net.host_new(sched, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NameInUse);
    assert!(sched.is_empty());

    let i = net.ethernet_interface_new(sched, "y").unwrap();
    assert_eq!(net.node_by_name("x"), Some(r));
    assert_eq!(net.interface_by_name("y"), Some(i));
    assert_eq!(net.node_by_name("y"), None);
    assert_eq!(
        sched.activity("y transmit packet"),
        Some(net.interface(i).unwrap().activity())
    );
}

#[test]
fn deleting_an_interface_unlinks_it() {
    let mut sim = Simulation::new();
    let a = sim.network.router_new("a").unwrap();
    let b = sim.network.router_new("b").unwrap();
    let (ia, ib) = link(&mut sim, a, b);
    assert_eq!(sim.network.route(a, b), Some(ia));

    sim.network.interface_del(&mut sim.scheduler, ia).unwrap();
    assert!(sim.network.interface(ia).is_none());
    assert!(sim.network.node(a).unwrap().interfaces().is_empty());
    assert_eq!(sim.network.interface(ib).unwrap().other_side(), None);
    assert_eq!(sim.network.route(b, a), None);
    assert!(sim.scheduler.activity(&format!("{a}-{b} transmit packet")).is_none());

    let err = sim.network.interface_del(&mut sim.scheduler, ia).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn deleting_a_node_stops_its_senders() {
    let mut sim = Simulation::new();
    let a = sim.network.host_new(&mut sim.scheduler, "a").unwrap();
    let b = sim.network.host_new(&mut sim.scheduler, "b").unwrap();
    let (ia, ib) = link(&mut sim, a, b);

    let (sched, net) = (&mut sim.scheduler, &mut sim.network);
    net.packet_size_is(sched, a, PacketSize::new(100)).unwrap();
    net.transmit_rate_is(sched, a, TransmitRate::new(1)).unwrap();
    net.destination_is(sched, a, Some(b)).unwrap();
    let generator = net.host(a).unwrap().activity();
    assert_eq!(sched.status(generator), Some(Status::Waiting));

    net.node_del(sched, b).unwrap();
    assert!(net.node(b).is_none());
    assert_eq!(net.node_by_name("b"), None);
    assert_eq!(net.host(a).unwrap().destination(), None);
    assert_eq!(sched.status(generator), Some(Status::Free));
    assert!(sched.activity("b packet generator").is_none());

    // interfaces survive, detached
    assert_eq!(net.interface(ib).unwrap().node(), None);
    assert_eq!(net.interface(ia).unwrap().other_side(), Some(ib));
    assert!(net.routes(a).is_empty());
}

#[cfg(feature = "serde")]
#[test]
fn stats_serialize() {
    let mut sim = Simulation::new();
    let i = sim
        .network
        .ethernet_interface_new(&mut sim.scheduler, "i")
        .unwrap();
    let stats = sim.network.interface_stats(i).unwrap();
    let json = serde_json::to_string(&stats).unwrap();
    assert_eq!(
        json,
        r#"{"packets_received":0,"packets_dropped":0,"queue_len":0}"#
    );
}
