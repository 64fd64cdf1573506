#![allow(dead_code)]

//! Shared recording units for the integration tests.
//!
//! Every unit appends a short line to a shared [`Journal`] so tests can
//! assert ordering across handlers, filters and listeners.

use std::sync::Arc;

use brrtcontainer::container::Container;
use brrtcontainer::dispatcher::{FilterChain, Handler, ServiceContext};
use brrtcontainer::error::{ContainerError, Result};
use brrtcontainer::exchange::{Request, Response};
use brrtcontainer::filter::Filter;
use brrtcontainer::listener::{
    ContainerInitializer, ContextListener, Listener, RequestListener,
};
use brrtcontainer::registry::{FilterEnvironment, HandlerEnvironment};
use parking_lot::Mutex;

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().clone()
}

/// Handler that records init/service/destroy and writes its label.
pub struct Recorder {
    label: String,
    journal: Journal,
    init_failure: Option<bool>,
    fail_destroy: bool,
}

impl Recorder {
    pub fn new(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: Arc::clone(journal),
            init_failure: None,
            fail_destroy: false,
        }
    }

    /// Fail `init` with a temporary or permanent unavailability.
    pub fn failing_init(mut self, permanent: bool) -> Self {
        self.init_failure = Some(permanent);
        self
    }

    pub fn failing_destroy(mut self) -> Self {
        self.fail_destroy = true;
        self
    }
}

impl Handler for Recorder {
    fn init(&self, _env: &HandlerEnvironment) -> Result<()> {
        self.journal.lock().push(format!("init {}", self.label));
        match self.init_failure {
            Some(true) => Err(ContainerError::permanently_unavailable("init refused")),
            Some(false) => Err(ContainerError::unavailable("warming up")),
            None => Ok(()),
        }
    }

    fn service(&self, request: &Request, response: &Response, _ctx: &ServiceContext<'_>) -> Result<()> {
        self.journal.lock().push(format!(
            "service {} {} {}",
            self.label,
            request.dispatcher_type(),
            request.servlet_path()
        ));
        response.write_str(&self.label);
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        self.journal.lock().push(format!("destroy {}", self.label));
        if self.fail_destroy {
            return Err(ContainerError::Handler(anyhow::anyhow!("destroy failed")));
        }
        Ok(())
    }
}

type ServiceFn = dyn Fn(&Request, &Response, &ServiceContext<'_>) -> Result<()> + Send + Sync;

/// Handler backed by a closure.
pub struct FnHandler(Box<ServiceFn>);

impl FnHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Request, &Response, &ServiceContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        Self(Box::new(f))
    }
}

impl Handler for FnHandler {
    fn service(&self, request: &Request, response: &Response, ctx: &ServiceContext<'_>) -> Result<()> {
        (self.0)(request, response, ctx)
    }
}

/// Filter that records each pass and continues the chain.
pub struct OrderFilter {
    label: String,
    journal: Journal,
}

impl OrderFilter {
    pub fn new(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: Arc::clone(journal),
        }
    }
}

impl Filter for OrderFilter {
    fn init(&self, _env: &FilterEnvironment) -> Result<()> {
        self.journal.lock().push(format!("init {}", self.label));
        Ok(())
    }

    fn do_filter(&self, request: &Request, response: &Response, chain: FilterChain<'_>) -> Result<()> {
        self.journal.lock().push(format!(
            "filter {} {}",
            self.label,
            request.dispatcher_type()
        ));
        chain.do_filter(request, response)
    }

    fn destroy(&self) -> Result<()> {
        self.journal.lock().push(format!("destroy {}", self.label));
        Ok(())
    }
}

/// Context listener that records startup and shutdown.
pub struct ContextRecorder {
    label: String,
    journal: Journal,
    fail: bool,
}

impl ContextRecorder {
    pub fn new(label: &str, journal: &Journal) -> Self {
        Self {
            label: label.to_string(),
            journal: Arc::clone(journal),
            fail: false,
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl ContextListener for ContextRecorder {
    fn context_initialized(&self, container: &mut Container) -> Result<()> {
        self.journal.lock().push(format!(
            "initialized {} tainted={}",
            self.label,
            container.is_tainted()
        ));
        if self.fail {
            return Err(ContainerError::Handler(anyhow::anyhow!("listener refused")));
        }
        Ok(())
    }

    fn context_destroyed(&self, _container: &Container) {
        self.journal.lock().push(format!("destroyed {}", self.label));
    }
}

impl Listener for ContextRecorder {
    fn as_context_listener(self: Arc<Self>) -> Option<Arc<dyn ContextListener>> {
        Some(self)
    }
}

/// Request listener that records both notifications.
pub struct RequestRecorder {
    journal: Journal,
}

impl RequestRecorder {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
        }
    }
}

impl RequestListener for RequestRecorder {
    fn request_initialized(&self, request: &Request) {
        self.journal
            .lock()
            .push(format!("request initialized {}", request.servlet_path()));
    }

    fn request_destroyed(&self, request: &Request) {
        self.journal
            .lock()
            .push(format!("request destroyed {}", request.servlet_path()));
    }
}

impl Listener for RequestRecorder {
    fn as_request_listener(self: Arc<Self>) -> Option<Arc<dyn RequestListener>> {
        Some(self)
    }
}

/// Initializer backed by a closure.
pub struct FnInitializer<F>(pub F);

impl<F> ContainerInitializer for FnInitializer<F>
where
    F: Fn(&mut Container) -> Result<()> + Send + Sync,
{
    fn on_startup(&self, container: &mut Container) -> Result<()> {
        (self.0)(container)
    }
}

/// Register `handler` under `name` and map it to `patterns`.
pub fn mount(container: &mut Container, name: &str, handler: Arc<dyn Handler>, patterns: &[&str]) {
    container
        .add_handler(name, handler)
        .unwrap()
        .unwrap()
        .add_mapping(patterns)
        .unwrap();
}

/// Initialize and start a configured container.
pub fn start(mut container: Container) -> Container {
    container.initialize().unwrap();
    container.start().unwrap();
    container
}
