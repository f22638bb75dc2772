use netsim::prelude::*;
use serial_test::serial;
use std::{cell::Cell, rc::Rc, time::Duration};

#[derive(Clone)]
struct ManualClock(Rc<Cell<Time>>);

impl ManualClock {
    fn at(t: Time) -> Self {
        Self(Rc::new(Cell::new(t)))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        self.0.get()
    }

    fn sleep(&self, duration: Duration) {
        self.0.set(self.0.get() + duration);
    }
}

fn ticker(sched: &mut Scheduler<Vec<Time>>, name: &str, period: Time) {
    let id = sched.activity_new(name).unwrap();
    sched
        .timeout_notifiee_is(id, move |ctx: &mut Context<'_, Vec<Time>>| {
            let now = ctx.now();
            ctx.app.push(now);
            ctx.scheduler.next_time_is(ctx.activity, now + period)?;
            Ok(())
        })
        .unwrap();
    let first = sched.now() + period;
    sched.next_time_is(id, first).unwrap();
}

#[test]
fn ratio_one_follows_the_wall_clock() {
    let epoch = Time::from_secs(1_000);
    let clock = ManualClock::at(epoch);

    let mut vm = Scheduler::<Vec<Time>>::builder().name("virtual").running(true).build();
    ticker(&mut vm, "tick", Time::from_secs(1));

    let mut rt = RealTimeManager::builder()
        .ratio(Ratio::ONE)
        .clock(clock.clone())
        .poll_interval(Duration::from_millis(10))
        .virtual_manager(vm)
        .build();

    let mut ticks = Vec::new();
    rt.start(&mut ticks);
    rt.run_for(Duration::from_secs(10), &mut ticks);

    let virtual_now = rt.virtual_manager().map_or(Time::ZERO, Scheduler::now);
    assert!(virtual_now <= Time::from_secs(10));
    assert!(virtual_now >= Time::from_secs(10) - Time::from_millis(10));
    assert_eq!(ticks.len(), 9);
    assert_eq!(ticks.last(), Some(&Time::from_secs(9)));
    assert!(clock.now() >= epoch + Time::from_secs(10));
}

#[test]
fn paced_scheduler_fires_at_wall_clock_times() {
    let epoch = Time::from_secs(50);
    let clock = ManualClock::at(epoch);

    let mut rt = RealTimeManager::<Vec<Time>>::builder()
        .clock(clock.clone())
        .poll_interval(Duration::from_millis(250))
        .build();
    ticker(rt.scheduler_mut(), "wall", Time::from_secs(1));

    let mut ticks = Vec::new();
    rt.start(&mut ticks);
    rt.run_for(Duration::from_millis(3_500), &mut ticks);

    assert_eq!(
        ticks,
        vec![
            epoch + Time::from_secs(1),
            epoch + Time::from_secs(2),
            epoch + Time::from_secs(3),
        ]
    );
}

#[test]
fn stopped_manager_does_not_dispatch() {
    let clock = ManualClock::at(Time::ZERO);
    let mut rt = RealTimeManager::<Vec<Time>>::builder()
        .clock(clock.clone())
        .build();
    ticker(rt.scheduler_mut(), "wall", Time::from_secs(1));

    let mut ticks = Vec::new();
    clock.0.set(Time::from_secs(5));
    rt.now_is(Time::from_secs(5), &mut ticks);

    assert!(ticks.is_empty());
    assert!(!rt.running());
    assert_eq!(rt.start_time(), Time::from_secs(5));
}

#[test]
fn drives_a_nested_network() {
    let clock = ManualClock::at(Time::ZERO);

    let mut vm = Scheduler::<Network>::builder()
        .name("network")
        .running(true)
        .build();
    let mut net = Network::new();
    let a = net.host_new(&mut vm, "a").unwrap();
    let b = net.host_new(&mut vm, "b").unwrap();
    let ia = net.ethernet_interface_new(&mut vm, "a.eth0").unwrap();
    let ib = net.ethernet_interface_new(&mut vm, "b.eth0").unwrap();
    net.interface_is(a, 0, Some(ia)).unwrap();
    net.interface_is(b, 0, Some(ib)).unwrap();
    net.other_side_is(ia, Some(ib)).unwrap();
    net.packet_size_is(&mut vm, a, PacketSize::new(125)).unwrap();
    net.transmit_rate_is(&mut vm, a, TransmitRate::new(1)).unwrap();
    net.destination_is(&mut vm, a, Some(b)).unwrap();

    // one packet per millisecond of virtual time, 100us on the wire
    let mut rt = RealTimeManager::builder()
        .ratio(Ratio::new(2).unwrap())
        .clock(clock)
        .poll_interval(Duration::from_millis(1))
        .virtual_manager(vm)
        .build();
    rt.start(&mut net);
    rt.run_for(Duration::from_millis(20), &mut net);

    let virtual_now = rt.virtual_manager().map_or(Time::ZERO, Scheduler::now);
    assert_eq!(virtual_now, Time::from_micros(9_500));

    let stats = net.host_stats(b).unwrap();
    assert_eq!(stats.packets_received, 9);
    assert!((stats.average_latency - 100e-6).abs() < 1e-12);
}

#[test]
#[serial]
fn system_clock_reaches_the_target() {
    let mut rt = RealTimeManager::<()>::builder()
        .ratio(Ratio::ONE)
        .poll_interval(Duration::from_millis(2))
        .virtual_manager(Scheduler::<()>::builder().running(true).build())
        .build();

    rt.start(&mut ());
    let target = Time::wall_clock() + Time::from_millis(20);
    rt.now_is(target, &mut ());

    assert!(Time::wall_clock() >= target);
    let virtual_now = rt.virtual_manager().map_or(Time::ZERO, Scheduler::now);
    assert!(virtual_now <= Time::from_millis(25));
}
