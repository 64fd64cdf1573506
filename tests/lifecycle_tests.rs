//! Tests for the container lifecycle state machine
//!
//! # Test Coverage
//!
//! - Operation windows: registration, start/stop, service and destroy
//! - Initializer and listener ordering, declared vs programmatic listeners
//! - Tainted mode while programmatic listeners fire
//! - First-writer-wins registration
//! - Handler init failures: temporary, permanent, teardown errors kept as suppressed
//! - Shutdown order: handlers, filters, programmatic listeners (reverse), declared (reverse)
//! - `initialize()` rejected when called again from the startup code it runs

mod common;

use std::sync::Arc;

use brrtcontainer::container::Container;
use brrtcontainer::error::ContainerError;
use brrtcontainer::exchange::{Request, Response};
use brrtcontainer::lifecycle::{Operation, Status};
use brrtcontainer::listener::{ContextListener, Listener};
use brrtcontainer::registry::Availability;
use common::{entries, journal, mount, start, ContextRecorder, FnInitializer, Journal, Recorder};

#[test]
fn test_service_outside_servicing_fails_without_side_effects() {
    let log = journal();
    let mut container = Container::new();
    mount(&mut container, "a", Arc::new(Recorder::new("a", &log)), &["/a"]);

    let request = Request::builder().path("/a").build();
    let response = Response::new();
    let err = container.service(&request, &response).unwrap_err();
    assert!(matches!(
        err,
        ContainerError::IllegalState {
            operation: Operation::Service,
            status: Status::Setup
        }
    ));

    container.initialize().unwrap();
    container.start().unwrap();
    container.service(&request, &response).unwrap();
    container.stop().unwrap();
    assert!(container.service(&request, &response).is_err());

    let serviced = entries(&log)
        .iter()
        .filter(|e| e.starts_with("service"))
        .count();
    assert_eq!(serviced, 1);
    assert_eq!(container.status(), Status::Initialized);
}

#[test]
fn test_illegal_calls_leave_status_unchanged() {
    let container = Container::new();
    assert!(container.start().is_err());
    assert!(container.stop().is_err());
    assert_eq!(container.status(), Status::Setup);

    let mut container = start(Container::new());
    assert!(container.initialize().is_err());
    assert!(container.destroy().is_err());
    let err = container.add_handler_class("late", "late").err().unwrap();
    assert!(matches!(err, ContainerError::IllegalState { .. }));
    assert_eq!(container.status(), Status::Servicing);
}

#[test]
fn test_registration_is_first_writer_wins() {
    let log = journal();
    let mut container = Container::new();
    assert!(container
        .add_handler("h", Arc::new(Recorder::new("first", &log)))
        .unwrap()
        .is_some());
    assert!(container
        .add_handler("h", Arc::new(Recorder::new("second", &log)))
        .unwrap()
        .is_none());
    container.add_mapping("h", &["/h"]).unwrap();

    let container = start(container);
    let response = Response::new();
    container
        .service(&Request::builder().path("/h").build(), &response)
        .unwrap();
    assert_eq!(response.body_string(), "first");
}

#[test]
fn test_declared_then_programmatic_listeners_and_reverse_shutdown() {
    let log = journal();
    let mut container = Container::new();
    container
        .add_listener(Arc::new(ContextRecorder::new("d1", &log)))
        .unwrap();
    container
        .add_listener(Arc::new(ContextRecorder::new("d2", &log)))
        .unwrap();
    container.initialize_declared_finish().unwrap();
    assert_eq!(container.status(), Status::InitializedDeclared);
    container
        .add_listener(Arc::new(ContextRecorder::new("p1", &log)))
        .unwrap();
    container
        .add_listener(Arc::new(ContextRecorder::new("p2", &log)))
        .unwrap();
    mount(&mut container, "h", Arc::new(Recorder::new("h", &log)), &["/h"]);

    container.initialize().unwrap();
    assert!(!container.is_tainted());
    container.destroy().unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "initialized d1 tainted=false",
            "initialized d2 tainted=false",
            "initialized p1 tainted=true",
            "initialized p2 tainted=true",
            "init h",
            "destroy h",
            "destroyed p2",
            "destroyed p1",
            "destroyed d2",
            "destroyed d1",
        ]
    );
    assert_eq!(container.status(), Status::Setup);
}

#[test]
fn test_tainted_mode_blocks_registration_from_programmatic_listeners() {
    use brrtcontainer::listener::{ContextListener, Listener};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Probe(Mutex<Vec<String>>);

    impl ContextListener for Probe {
        fn context_initialized(&self, container: &mut Container) -> brrtcontainer::Result<()> {
            let mut seen = self.0.lock();
            for (label, result) in [
                ("add_handler", container.add_handler_class("x", "x").map(|_| ())),
                ("set_init_parameter", container.set_init_parameter("k", "v").map(|_| ())),
                ("inspect", container.handler_registrations().map(|_| ())),
                ("create", container.create_handler("x").map(|_| ())),
            ] {
                let outcome = match result {
                    Err(ContainerError::Tainted { .. }) => "tainted",
                    Err(_) => "other error",
                    Ok(()) => "ok",
                };
                seen.push(format!("{label}: {outcome}"));
            }
            Ok(())
        }
    }

    impl Listener for Probe {
        fn as_context_listener(self: Arc<Self>) -> Option<Arc<dyn ContextListener>> {
            Some(self)
        }
    }

    let probe = Arc::new(Probe::default());
    let mut container = Container::new();
    container.initialize_declared_finish().unwrap();
    container.add_listener(probe.clone()).unwrap();
    container.initialize().unwrap();

    assert_eq!(
        *probe.0.lock(),
        vec![
            "add_handler: tainted",
            "set_init_parameter: tainted",
            "inspect: tainted",
            "create: tainted",
        ]
    );
    assert!(!container.is_tainted());
    assert!(container.handler_registrations().unwrap().is_empty());
}

#[test]
fn test_initializers_run_first_and_may_register() {
    let log = journal();
    let mut container = Container::new();
    let init_log = Arc::clone(&log);
    container
        .add_initializer(Arc::new(FnInitializer(move |c: &mut Container| {
            init_log.lock().push("initializer".to_string());
            c.add_handler("late", Arc::new(Recorder::new("late", &init_log)))?
                .map(|mut reg| reg.add_mapping(&["/late"]))
                .transpose()?;
            c.add_listener(Arc::new(ContextRecorder::new("from-initializer", &init_log)))
        })))
        .unwrap();

    let container = start(container);
    assert_eq!(
        entries(&log),
        vec![
            "initializer",
            "initialized from-initializer tainted=false",
            "init late",
        ]
    );
    let response = Response::new();
    container
        .service(&Request::builder().path("/late").build(), &response)
        .unwrap();
    assert_eq!(response.body_string(), "late");
}

#[test]
fn test_initializer_failure_moves_to_error_after_running_all() {
    let log = journal();
    let mut container = Container::new();
    let first = Arc::clone(&log);
    container
        .add_initializer(Arc::new(FnInitializer(move |_: &mut Container| {
            first.lock().push("first".to_string());
            Err(ContainerError::Handler(anyhow::anyhow!("boom")))
        })))
        .unwrap();
    let second = Arc::clone(&log);
    container
        .add_initializer(Arc::new(FnInitializer(move |_: &mut Container| {
            second.lock().push("second".to_string());
            Ok(())
        })))
        .unwrap();
    mount(&mut container, "h", Arc::new(Recorder::new("h", &log)), &["/h"]);
    container
        .add_listener(Arc::new(ContextRecorder::new("l", &log)))
        .unwrap();

    assert!(container.initialize().is_err());
    assert_eq!(container.status(), Status::Error);
    assert_eq!(entries(&log), vec!["first", "second"]);
    assert!(container.start().is_err());
    assert!(container.initialize().is_err());
}

#[test]
fn test_declared_listener_failure_moves_to_error() {
    let log = journal();
    let mut container = Container::new();
    container
        .add_listener(Arc::new(ContextRecorder::new("bad", &log).failing()))
        .unwrap();
    mount(&mut container, "h", Arc::new(Recorder::new("h", &log)), &["/h"]);
    assert!(container.initialize().is_err());
    assert_eq!(container.status(), Status::Error);
    assert!(!entries(&log).contains(&"init h".to_string()));
}

#[test]
fn test_listener_cannot_add_context_listener() {
    use brrtcontainer::listener::{ContextListener, Listener};
    use parking_lot::Mutex;

    struct Adder(Mutex<Option<String>>);

    impl ContextListener for Adder {
        fn context_initialized(&self, container: &mut Container) -> brrtcontainer::Result<()> {
            let log = common::journal();
            let result = container.add_listener(Arc::new(ContextRecorder::new("nested", &log)));
            *self.0.lock() = result.err().map(|e| e.to_string());
            Ok(())
        }
    }

    impl Listener for Adder {
        fn as_context_listener(self: Arc<Self>) -> Option<Arc<dyn ContextListener>> {
            Some(self)
        }
    }

    let adder = Arc::new(Adder(Mutex::new(None)));
    let mut container = Container::new();
    container.add_listener(adder.clone()).unwrap();
    container.initialize().unwrap();
    let err = adder.0.lock().clone().unwrap();
    assert!(err.contains("invalid argument"), "{err}");
}

#[test]
fn test_permanent_init_failure_removes_handler_and_keeps_teardown_error() {
    let log = journal();
    let mut container = Container::new();
    mount(
        &mut container,
        "broken",
        Arc::new(Recorder::new("broken", &log).failing_init(true).failing_destroy()),
        &["/broken"],
    );
    mount(
        &mut container,
        "sleepy",
        Arc::new(Recorder::new("sleepy", &log).failing_init(false)),
        &["/sleepy"],
    );
    mount(&mut container, "ok", Arc::new(Recorder::new("ok", &log)), &["/ok"]);

    let container = start(container);

    assert!(container.handler_registration("broken").unwrap().is_none());
    assert!(container.mappings("broken").is_empty());
    let sleepy = container.handler_registration("sleepy").unwrap().unwrap();
    assert!(matches!(sleepy.availability(), Availability::Temporary { .. }));
    assert!(sleepy.instance().is_none());

    let failures = container.startup_failures();
    assert_eq!(failures.len(), 2);
    assert!(failures[0].is_permanent_unavailable());
    assert!(failures[0].to_string().starts_with("broken"));
    assert_eq!(failures[0].suppressed().len(), 1);
    assert!(failures[0].suppressed()[0].to_string().contains("destroy failed"));
    assert!(!failures[1].is_permanent_unavailable());

    let response = Response::new();
    let err = container
        .service(&Request::builder().path("/sleepy").build(), &response)
        .unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(
        container.service(&Request::builder().path("/broken").build(), &response),
        Err(ContainerError::NoTarget(_))
    ));
    container
        .service(&Request::builder().path("/ok").build(), &response)
        .unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "init broken",
            "destroy broken",
            "init sleepy",
            "init ok",
            "service ok REQUEST /ok",
        ]
    );
}

#[test]
fn test_class_registrations_are_created_at_initialize() {
    use brrtcontainer::factory::ClassRegistry;

    let log = journal();
    let mut classes = ClassRegistry::new();
    let class_log = Arc::clone(&log);
    classes.register_handler("recorder", move || {
        Ok(Arc::new(Recorder::new("made", &class_log)))
    });
    let listener_log = Arc::clone(&log);
    classes.register_listener("ctx", move || {
        Ok(Arc::new(ContextRecorder::new("ctx", &listener_log)))
    });

    let mut container = Container::new();
    container.set_factory(Arc::new(classes)).unwrap();
    container
        .add_handler_class("made", "recorder")
        .unwrap()
        .unwrap()
        .add_mapping(&["/made"])
        .unwrap();
    container.add_listener_class("ctx").unwrap();
    container.add_listener_class("unknown").unwrap();
    container.add_initializer_class("unknown").unwrap();

    let env = container.handler_registration("made").unwrap().unwrap();
    assert!(env.instance().is_none());
    let _container = start(container);
    assert!(env.instance().is_some());
    assert_eq!(
        entries(&log),
        vec!["initialized ctx tainted=false", "init made"]
    );
}

/// Context listener that calls `initialize()` again and records the outcome.
struct Reinitializer {
    journal: Journal,
}

impl ContextListener for Reinitializer {
    fn context_initialized(&self, container: &mut Container) -> brrtcontainer::Result<()> {
        let outcome = match container.initialize() {
            Ok(()) => "nested ok".to_string(),
            Err(ContainerError::IllegalState { operation, status }) => {
                format!("nested rejected {operation} in {status}")
            }
            Err(err) => format!("nested failed {err}"),
        };
        self.journal.lock().push(outcome);
        Ok(())
    }
}

impl Listener for Reinitializer {
    fn as_context_listener(self: Arc<Self>) -> Option<Arc<dyn ContextListener>> {
        Some(self)
    }
}

#[test]
fn test_initialize_is_not_reentrant_from_listeners() {
    let log = journal();
    let mut container = Container::new();
    container
        .add_listener(Arc::new(Reinitializer {
            journal: Arc::clone(&log),
        }))
        .unwrap();
    mount(&mut container, "h", Arc::new(Recorder::new("h", &log)), &["/h"]);

    container.initialize().unwrap();
    assert_eq!(container.status(), Status::Initialized);
    assert_eq!(
        entries(&log),
        vec!["nested rejected initialize in INITIALIZED_DECLARED", "init h"]
    );

    // The guard is gone once the outer call returns.
    container.destroy().unwrap();
    mount(&mut container, "h", Arc::new(Recorder::new("h", &log)), &["/h"]);
    container.initialize().unwrap();
    assert_eq!(container.status(), Status::Initialized);
}

#[test]
fn test_initialize_is_not_reentrant_from_initializers() {
    let log = journal();
    let mut container = Container::new();
    let init_log = Arc::clone(&log);
    container
        .add_initializer(Arc::new(FnInitializer(move |c: &mut Container| {
            let rejected = matches!(
                c.initialize(),
                Err(ContainerError::IllegalState {
                    operation: Operation::Initialize,
                    status: Status::Setup
                })
            );
            init_log.lock().push(format!("nested rejected={rejected}"));
            Ok(())
        })))
        .unwrap();
    mount(&mut container, "h", Arc::new(Recorder::new("h", &log)), &["/h"]);

    container.initialize().unwrap();
    assert_eq!(entries(&log), vec!["nested rejected=true", "init h"]);
}
