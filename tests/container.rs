//! End-to-end container tests.
//!
//! These drive the typed surface through the full pipeline (registration,
//! graph construction, planning, execution) and pin the observable
//! ordering guarantees: topological execution, group aggregation in
//! registration order, decorator chaining, and stack teardown after every
//! downstream consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use arbor::prelude::*;
use arbor::{IntoProvider, PlanError};
use parking_lot::Mutex;

/// Shared event journal the test doubles write into.
#[derive(Default)]
struct Events {
    entries: Mutex<Vec<String>>,
}

impl Events {
    fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl Provision for Events {}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering guarantees
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn singleton_chain_executes_providers_before_consumers() {
    struct Seed(i64);
    impl Provision for Seed {}
    struct Grown(i64);
    impl Provision for Grown {}

    let events = Arc::new(Events::default());
    Container::new()
        .supply(Arc::clone(&events))
        .provide(|events: Dep<Events>| {
            events.record("seed");
            Seed(2)
        })
        .provide(|events: Dep<Events>, seed: Dep<Seed>| {
            events.record("grow");
            Grown(seed.0 * 3)
        })
        .invoke(|events: Dep<Events>, grown: Dep<Grown>| {
            events.record(format!("consume {}", grown.0));
        })
        .run()
        .unwrap();

    assert_eq!(events.snapshot(), ["seed", "grow", "consume 6"]);
}

#[test]
fn groups_aggregate_in_registration_order() {
    struct Route(&'static str);
    impl Provision for Route {}

    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let sink = Arc::clone(&seen);
    Container::new()
        .supply(Member(Route("/first")))
        .provide(|| Member(Route("/second")))
        .supply(Member(Route("/third")))
        .invoke(move |routes: Group<Route>| {
            sink.lock().extend(routes.iter().map(|route| route.0));
        })
        .run()
        .unwrap();

    assert_eq!(*seen.lock(), vec!["/first", "/second", "/third"]);
}

#[test]
fn a_consumer_may_take_the_same_group_twice_via_distinct_roots() {
    struct Tick;
    impl Provision for Tick {}

    let counts: Arc<Mutex<Vec<usize>>> = Arc::default();
    let first = Arc::clone(&counts);
    let second = Arc::clone(&counts);
    Container::new()
        .supply(Member(Tick))
        .supply(Member(Tick))
        .invoke(move |ticks: Group<Tick>| first.lock().push(ticks.len()))
        .invoke(move |ticks: Group<Tick>| second.lock().push(ticks.len()))
        .run()
        .unwrap();

    assert_eq!(*counts.lock(), vec![2, 2]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn decorators_chain_and_replace_the_consumed_view() {
    struct Meter(i64);
    impl Provision for Meter {}

    let seen: Arc<Mutex<Vec<i64>>> = Arc::default();
    let sink = Arc::clone(&seen);
    Container::new()
        .provide(|| Meter(1))
        .provide(|meter: Dep<Meter>| Meter(meter.0 * 10))
        .provide(|meter: Dep<Meter>| Meter(meter.0 + 5))
        .invoke(move |meter: Dep<Meter>| sink.lock().push(meter.0))
        .run()
        .unwrap();

    assert_eq!(*seen.lock(), vec![15]);
}

#[test]
fn a_decorator_observes_the_value_it_refines() {
    struct Meter(i64);
    impl Provision for Meter {}

    let seen: Arc<Mutex<Vec<i64>>> = Arc::default();
    let decorator_sink = Arc::clone(&seen);
    let consumer_sink = Arc::clone(&seen);
    Container::new()
        .provide(|| Meter(7))
        .provide(move |meter: Dep<Meter>| {
            decorator_sink.lock().push(meter.0);
            Meter(meter.0 + 100)
        })
        .invoke(move |meter: Dep<Meter>| consumer_sink.lock().push(meter.0))
        .run()
        .unwrap();

    assert_eq!(*seen.lock(), vec![7, 107]);
}

#[test]
fn a_group_decorator_refines_the_aggregated_sequence() {
    struct Stage(&'static str);
    impl Provision for Stage {}

    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let sink = Arc::clone(&seen);
    Container::new()
        .supply(Member(Stage("parse")))
        .supply(Member(Stage("lower")))
        .provide(|stages: Group<Stage>| {
            let mut items = stages.into_inner();
            items.reverse();
            Group::new(items)
        })
        .invoke(move |stages: Group<Stage>| {
            sink.lock().extend(stages.iter().map(|stage| stage.0));
        })
        .run()
        .unwrap();

    assert_eq!(*seen.lock(), vec!["lower", "parse"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Planning failures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn a_missing_singleton_fails_planning() {
    struct Absent;
    impl Provision for Absent {}

    let err = Container::new()
        .invoke(|_absent: Dep<Absent>| ())
        .run()
        .unwrap_err();

    match err {
        Error::Plan(plan) => assert!(matches!(
            plan.root_cause(),
            PlanError::MissingDependency { .. }
        )),
        Error::Run(run) => panic!("expected a planning failure, got: {run}"),
    }
}

#[test]
fn duplicate_singleton_providers_are_ambiguous_but_groups_are_not() {
    struct Port(u16);
    impl Provision for Port {}

    let err = Container::new()
        .supply(Port(80))
        .supply(Port(443))
        .invoke(|_port: Dep<Port>| ())
        .run()
        .unwrap_err();
    match err {
        Error::Plan(plan) => assert!(matches!(
            plan.root_cause(),
            PlanError::AmbiguousDependency { count: 2, .. }
        )),
        Error::Run(run) => panic!("expected a planning failure, got: {run}"),
    }

    // The same two provisions are legal as group members.
    let seen: Arc<Mutex<Vec<u16>>> = Arc::default();
    let sink = Arc::clone(&seen);
    Container::new()
        .supply(Member(Port(80)))
        .supply(Member(Port(443)))
        .invoke(move |ports: Group<Port>| {
            sink.lock().extend(ports.iter().map(|port| port.0));
        })
        .run()
        .unwrap();
    assert_eq!(*seen.lock(), vec![80, 443]);
}

#[test]
fn cyclic_singleton_dependencies_fail_planning() {
    struct Yin;
    impl Provision for Yin {}
    struct Yang;
    impl Provision for Yang {}

    let err = Container::new()
        .provide(|_yang: Dep<Yang>| Yin)
        .provide(|_yin: Dep<Yin>| Yang)
        .invoke(|_yin: Dep<Yin>| ())
        .run()
        .unwrap_err();

    match err {
        Error::Plan(plan) => assert!(matches!(
            plan.root_cause(),
            PlanError::CyclicDependency { .. }
        )),
        Error::Run(run) => panic!("expected a planning failure, got: {run}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Execution failures
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn consumer_failures_carry_the_node_label() {
    struct Token;
    impl Provision for Token {}

    let err = Container::new()
        .supply(Token)
        .invoke(|_token: Dep<Token>| -> Result<(), ActionError> { Err("kaboom".into()) })
        .run()
        .unwrap_err();

    let rendered = err.to_string();
    assert!(rendered.contains("Invoke("), "got: {rendered}");
    assert!(rendered.contains("kaboom"), "got: {rendered}");
}

#[test]
fn provider_failures_stop_the_run_before_consumers() {
    struct Token;
    impl Provision for Token {}

    let reached: Arc<Mutex<bool>> = Arc::default();
    let sink = Arc::clone(&reached);
    let err = Container::new()
        .provide(|| -> Result<Token, ActionError> { Err("no token today".into()) })
        .invoke(move |_token: Dep<Token>| *sink.lock() = true)
        .run()
        .unwrap_err();

    assert!(err.to_string().contains("no token today"));
    assert!(!*reached.lock());
}

// ─────────────────────────────────────────────────────────────────────────────
// Modules and populate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn modules_install_their_registrations_in_order() {
    struct Route(&'static str);
    impl Provision for Route {}

    struct RouteModule(&'static str);
    impl Module for RouteModule {
        fn install(self, container: Container) -> Container {
            container.supply(Member(Route(self.0)))
        }
    }

    let seen: Arc<Mutex<Vec<&'static str>>> = Arc::default();
    let sink = Arc::clone(&seen);
    Container::new()
        .install((RouteModule("/a"), RouteModule("/b"), RouteModule("/c")))
        .invoke(move |routes: Group<Route>| {
            sink.lock().extend(routes.iter().map(|route| route.0));
        })
        .run()
        .unwrap();

    assert_eq!(*seen.lock(), vec!["/a", "/b", "/c"]);
}

#[test]
fn populate_writes_through_the_handle() {
    struct Token(u8);
    impl Provision for Token {}

    let token: Handle<Dep<Token>> = Handle::new();
    let all: Handle<Group<Token>> = Handle::new();
    Container::new()
        .supply(Token(42))
        .supply(Member(Token(1)))
        .populate(&token)
        .populate(&all)
        .run()
        .unwrap();

    assert_eq!(token.take().map(|token| token.0), Some(42));
    assert_eq!(all.take().map(|tokens| tokens.len()), Some(1));
}

// ─────────────────────────────────────────────────────────────────────────────
// The full scenario: stack, decorator, group and an unreached provider
// ─────────────────────────────────────────────────────────────────────────────

trait FireProbe: Send + Sync {
    fn fire(&self, events: &Events);
}

impl Provision for Box<dyn FireProbe> {}

/// Gauge shared between the stack that creates it and the decorator that
/// calibrates it.
#[derive(Default)]
struct Gauge {
    level: AtomicI64,
}

impl Provision for Gauge {}

struct Level(i64);
impl Provision for Level {}

struct Relay;
impl Provision for Relay {}

struct Cache;
impl Provision for Cache {}

struct AlphaProbe;
impl FireProbe for AlphaProbe {
    fn fire(&self, events: &Events) {
        events.record("invoke a");
    }
}

struct GaugeProbe(Arc<Gauge>);
impl FireProbe for GaugeProbe {
    fn fire(&self, events: &Events) {
        events.record(format!("invoke b {}", self.0.level.load(Ordering::Relaxed)));
    }
}

struct RelayProbe;
impl FireProbe for RelayProbe {
    fn fire(&self, events: &Events) {
        events.record("invoke d");
    }
}

/// Supplies the journal and level, and fires every probe in group order.
struct ProbeRunModule {
    events: Arc<Events>,
    level: i64,
}

impl Module for ProbeRunModule {
    fn install(self, container: Container) -> Container {
        container
            .supply(self.events)
            .supply(Level(self.level))
            .invoke(|probes: Group<Box<dyn FireProbe>>, events: Dep<Events>| {
                for probe in probes.iter() {
                    probe.fire(&events);
                }
            })
    }
}

fn provide_alpha(events: Dep<Events>, _relay: Dep<Relay>) -> Member<Box<dyn FireProbe>> {
    events.record("provide a");
    Member(Box::new(AlphaProbe) as Box<dyn FireProbe>)
}

fn stack_gauge(
    next: Next<'_, (Arc<Gauge>, Member<Box<dyn FireProbe>>)>,
    events: Dep<Events>,
) -> Result<(), ActionError> {
    events.record("stack b");
    let gauge = Arc::new(Gauge::default());
    let probe = Member(Box::new(GaugeProbe(Arc::clone(&gauge))) as Box<dyn FireProbe>);
    let result = next.invoke((gauge, probe));
    events.record("defer b");
    result
}

fn provide_cache(events: Dep<Events>) -> Cache {
    events.record("provide c");
    Cache
}

fn calibrate_gauge(
    events: Dep<Events>,
    gauge: Dep<Gauge>,
    level: Dep<Level>,
) -> (Arc<Gauge>, Relay, Member<Box<dyn FireProbe>>) {
    events.record("provide d");
    gauge.level.store(level.0, Ordering::Relaxed);
    (
        gauge.into_arc(),
        Relay,
        Member(Box::new(RelayProbe) as Box<dyn FireProbe>),
    )
}

#[test]
fn stack_decorator_and_group_run_in_dependency_order() {
    let events = Arc::new(Events::default());

    Container::new()
        .provide(provide_alpha)
        .stack(stack_gauge)
        .provide(provide_cache)
        .provide(calibrate_gauge)
        .install(ProbeRunModule {
            events: Arc::clone(&events),
            level: 123456,
        })
        .run()
        .unwrap();

    // The cache provider is never reached and must not run.
    assert_eq!(
        events.snapshot(),
        [
            "stack b",
            "provide d",
            "provide a",
            "invoke a",
            "invoke b 123456",
            "invoke d",
            "defer b",
        ]
    );
}

#[test]
fn decorate_inference_shows_up_in_the_built_node() {
    let node = IntoProvider::into_node(|gauge: Dep<Gauge>, _level: Dep<Level>| {
        (
            gauge.into_arc(),
            Member(Box::new(RelayProbe) as Box<dyn FireProbe>),
        )
    });

    assert!(node.input()[0].decorate);
    assert!(!node.input()[1].decorate);
    assert!(node.output()[0].decorate);
    assert!(!node.output()[1].decorate);
}
