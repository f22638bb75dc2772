use netsim::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Debug, Default)]
struct App {
    log: Vec<(usize, Time)>,
    rearm: usize,
}

fn running() -> Scheduler<App> {
    Scheduler::<App>::builder().name("test").running(true).build()
}

fn record(tag: usize) -> impl FnMut(&mut Context<'_, App>) -> NotifyResult {
    move |ctx| {
        let now = ctx.now();
        ctx.app.log.push((tag, now));
        Ok(())
    }
}

#[test]
fn dispatch_is_time_ordered_and_fifo() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut sched = running();
    let mut app = App::default();

    let mut due = Vec::new();
    for tag in 0..200 {
        let id = sched.activity_new(format!("a{tag}")).unwrap();
        let t = Time::from_millis(rng.gen_range(0..50));
        sched.timeout_notifiee_is(id, record(tag)).unwrap();
        sched.next_time_is(id, t).unwrap();
        due.push(t);
    }

    sched.now_is(Time::from_millis(100), &mut app);

    assert_eq!(app.log.len(), 200);
    for w in app.log.windows(2) {
        let ((a, ta), (b, tb)) = (w[0], w[1]);
        assert!(ta <= tb);
        if ta == tb {
            assert!(a < b, "{a} and {b} due at {ta} out of order");
        }
    }
    for (tag, t) in &app.log {
        assert_eq!(due[*tag], *t);
    }
    assert_eq!(sched.now(), Time::from_millis(100));
}

#[test]
fn nothing_fires_early() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut sched = running();
    let mut app = App::default();

    for tag in 0..50 {
        let id = sched.activity_new(format!("a{tag}")).unwrap();
        sched.timeout_notifiee_is(id, record(tag)).unwrap();
        sched
            .next_time_is(id, Time::from_micros(rng.gen_range(1..1000)))
            .unwrap();
    }

    let mut seen = 0;
    for step in 1..=10 {
        let target = Time::from_micros(step * 100);
        sched.now_is(target, &mut app);
        assert!(app.log[seen..].iter().all(|(_, t)| *t <= target));
        seen = app.log.len();
        assert!(sched.waiting_queue().all(|(_, t)| t > target));
    }
    assert_eq!(app.log.len(), 50);
}

#[test]
fn due_now_fires_again_next_drain_pass() {
    let mut sched = running();
    let mut app = App::default();

    let a = sched.activity_new("a").unwrap();
    let b = sched.activity_new("b").unwrap();
    sched.timeout_notifiee_is(b, record(1)).unwrap();
    sched
        .timeout_notifiee_is(a, move |ctx: &mut Context<'_, App>| {
            let now = ctx.now();
            ctx.app.log.push((0, now));
            ctx.scheduler.next_time_is(b, now)?;
            if ctx.app.rearm == 0 {
                ctx.app.rearm += 1;
                ctx.scheduler.next_time_is(ctx.activity, now)?;
            }
            Ok(())
        })
        .unwrap();
    sched.next_time_is(a, Time::from_secs(1)).unwrap();

    sched.now_is(Time::from_secs(1), &mut app);

    let s1 = Time::from_secs(1);
    assert_eq!(app.log, vec![(0, s1), (1, s1), (0, s1), (1, s1)]);
    assert_eq!(sched.status(a), Some(Status::Free));
    assert_eq!(sched.status(b), Some(Status::Free));
    assert_eq!(sched.itr(), 4);
}

#[test]
fn callbacks_can_reschedule_others() {
    let mut sched = running();
    let mut app = App::default();

    let late = sched.activity_new("late").unwrap();
    sched.timeout_notifiee_is(late, record(1)).unwrap();
    sched.next_time_is(late, Time::from_secs(9)).unwrap();

    let early = sched.activity_new("early").unwrap();
    sched
        .timeout_notifiee_is(early, move |ctx: &mut Context<'_, App>| {
            let now = ctx.now();
            ctx.app.log.push((0, now));
            ctx.scheduler.next_time_is(late, now + Time::from_secs(1))?;
            Ok(())
        })
        .unwrap();
    sched.next_time_is(early, Time::from_secs(2)).unwrap();

    sched.now_is(Time::from_secs(5), &mut app);
    assert_eq!(
        app.log,
        vec![(0, Time::from_secs(2)), (1, Time::from_secs(3))]
    );
}

#[test]
fn nested_clock_advance_is_ignored() {
    let mut sched = running();
    let mut app = App::default();

    let a = sched.activity_new("a").unwrap();
    sched
        .timeout_notifiee_is(a, |ctx: &mut Context<'_, App>| {
            ctx.scheduler.now_is(Time::from_secs(100), ctx.app);
            let now = ctx.now();
            ctx.app.log.push((0, now));
            Ok(())
        })
        .unwrap();
    sched.next_time_is(a, Time::from_secs(1)).unwrap();

    sched.now_is(Time::from_secs(2), &mut app);
    assert_eq!(app.log, vec![(0, Time::from_secs(1))]);
    assert_eq!(sched.now(), Time::from_secs(2));
}

#[test]
fn sim_time_limit_pauses_dispatch() {
    let mut sched = Scheduler::<App>::builder()
        .running(true)
        .max_time(Time::from_secs(5))
        .build();
    let mut app = App::default();

    for (tag, t) in [(0, 3), (1, 7)] {
        let id = sched.activity_new(format!("a{tag}")).unwrap();
        sched.timeout_notifiee_is(id, record(tag)).unwrap();
        sched.next_time_is(id, Time::from_secs(t)).unwrap();
    }

    sched.now_is(Time::from_secs(10), &mut app);
    assert_eq!(app.log, vec![(0, Time::from_secs(3))]);
    assert_eq!(sched.now(), Time::from_secs(3));

    sched.limit_is(RuntimeLimit::None);
    sched.now_is(Time::from_secs(10), &mut app);
    assert_eq!(app.log.last(), Some(&(1, Time::from_secs(7))));
    assert_eq!(sched.now(), Time::from_secs(10));
}

#[test]
fn timeout_notifiee_can_be_replaced_from_inside() {
    let mut sched = running();
    let mut app = App::default();

    let a = sched.activity_new("a").unwrap();
    sched
        .timeout_notifiee_is(a, |ctx: &mut Context<'_, App>| {
            let now = ctx.now();
            ctx.app.log.push((0, now));
            let id = ctx.activity;
            ctx.scheduler.timeout_notifiee_is(id, record(1))?;
            ctx.scheduler.next_time_is(id, now + Time::from_secs(1))?;
            Ok(())
        })
        .unwrap();
    sched.next_time_is(a, Time::from_secs(1)).unwrap();

    sched.now_is(Time::from_secs(3), &mut app);
    assert_eq!(
        app.log,
        vec![(0, Time::from_secs(1)), (1, Time::from_secs(2))]
    );
    assert!(sched.get(a).unwrap().has_timeout_notifiee());
}

// `a` and `b` are due at the same instant, `a` runs first and moves `b`
fn same_instant_pair(
    sched: &mut Scheduler<App>,
    mut change: impl FnMut(&mut Context<'_, App>, ActivityId) -> NotifyResult + 'static,
) {
    let a = sched.activity_new("a").unwrap();
    let b = sched.activity_new("b").unwrap();
    sched
        .timeout_notifiee_is(a, move |ctx: &mut Context<'_, App>| {
            let now = ctx.now();
            ctx.app.log.push((0, now));
            change(ctx, b)
        })
        .unwrap();
    sched.timeout_notifiee_is(b, record(1)).unwrap();
    sched.next_time_is(a, Time::from_secs(1)).unwrap();
    sched.next_time_is(b, Time::from_secs(1)).unwrap();
}

#[test]
fn cancelling_a_ready_activity_stops_it() {
    let mut sched = running();
    let mut app = App::default();
    same_instant_pair(&mut sched, |ctx, b| {
        ctx.scheduler.next_time_is(b, Time::NEVER)?;
        Ok(())
    });

    sched.now_is(Time::from_secs(10), &mut app);
    assert_eq!(app.log, vec![(0, Time::from_secs(1))]);
    let b = sched.activity("b").unwrap();
    assert_eq!(sched.status(b), Some(Status::Free));
    assert_eq!(sched.itr(), 1);
}

#[test]
fn postponing_a_ready_activity_moves_it() {
    let mut sched = running();
    let mut app = App::default();
    same_instant_pair(&mut sched, |ctx, b| {
        ctx.scheduler.next_time_is(b, Time::from_secs(5))?;
        Ok(())
    });

    sched.now_is(Time::from_secs(4), &mut app);
    assert_eq!(app.log, vec![(0, Time::from_secs(1))]);
    let b = sched.activity("b").unwrap();
    assert_eq!(sched.status(b), Some(Status::Waiting));

    sched.now_is(Time::from_secs(10), &mut app);
    assert_eq!(
        app.log,
        vec![(0, Time::from_secs(1)), (1, Time::from_secs(5))]
    );
}

#[test]
fn pending_last_notifiees_keep_a_ready_activity_queued() {
    let mut sched = running();
    let mut app = App::default();
    same_instant_pair(&mut sched, |ctx, b| {
        ctx.scheduler.last_notifiee_is(b, record(9))?;
        ctx.scheduler.next_time_is(b, Time::from_secs(5))?;
        Ok(())
    });

    sched.now_is(Time::from_secs(10), &mut app);
    assert_eq!(
        app.log,
        vec![
            (0, Time::from_secs(1)),
            (9, Time::from_secs(1)),
            (1, Time::from_secs(5)),
        ]
    );
}
