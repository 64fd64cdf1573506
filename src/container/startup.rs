use std::sync::Arc;

use tracing::{debug, info, warn};

use super::core::Container;
use crate::dispatcher::Handler;
use crate::error::{ContainerError, Result};
use crate::filter::Filter;
use crate::lifecycle::{Operation, Status};
use crate::listener::Source;
use crate::registry::{Availability, FilterEnvironment, HandlerEnvironment};

impl Container {
    /// Close the declared phase: `SETUP → INITIALIZED_DECLARED`.
    ///
    /// Context listeners registered afterwards are programmatic.
    pub fn initialize_declared_finish(&mut self) -> Result<()> {
        self.lifecycle
            .get_mut()
            .transition(Operation::DeclaredFinish, Status::InitializedDeclared)
    }

    /// Run initializers and context listeners, then initialize filters and
    /// handlers. Ends in `INITIALIZED`, or in `ERROR` when an initializer or
    /// context listener fails.
    pub fn initialize(&mut self) -> Result<()> {
        self.check(Operation::Initialize)?;
        let _initializing = self.scope.initializing();
        info!(
            context_path = %self.context_path,
            context_name = %self.context_name,
            handlers = self.handlers.len(),
            filters = self.filters.len(),
            initializers = self.initializers.len(),
            "Initializing container"
        );
        self.startup_failures.clear();

        if let Some(err) = self.run_initializers() {
            self.lifecycle.get_mut().set(Status::Error);
            return Err(err);
        }
        if self.status() == Status::Setup {
            self.lifecycle.get_mut().set(Status::InitializedDeclared);
        }
        if let Err(err) = self.fire_context_initialized() {
            self.lifecycle.get_mut().set(Status::Error);
            return Err(err);
        }

        self.initialize_filters();
        self.initialize_handlers();

        self.lifecycle.get_mut().set(Status::Initialized);
        Ok(())
    }

    /// Every initializer runs even after a failure; the first failure is
    /// returned.
    fn run_initializers(&mut self) -> Option<ContainerError> {
        let mut first_failure = None;
        for initializer in self.initializers.clone() {
            let _source = self.scope.enter(Source::Initializer);
            debug!(initializer = %initializer.name(), "Running initializer");
            if let Err(err) = initializer.on_startup(self) {
                warn!(initializer = %initializer.name(), error = %err, "Initializer failed");
                first_failure.get_or_insert(err);
            }
        }
        first_failure
    }

    fn fire_context_initialized(&mut self) -> Result<()> {
        for listener in self.listeners.declared() {
            let _source = self.scope.enter(Source::Listener);
            if let Err(err) = listener.context_initialized(self) {
                warn!(error = %err, "Declared context listener failed");
                return Err(err);
            }
        }

        let _taint = self.scope.taint();
        for listener in self.listeners.programmatic() {
            let _source = self.scope.enter(Source::Listener);
            if let Err(err) = listener.context_initialized(self) {
                warn!(error = %err, "Programmatic context listener failed");
                return Err(err);
            }
        }
        Ok(())
    }

    fn initialize_filters(&mut self) {
        for env in self.filters.values() {
            match self.init_filter(&env) {
                Ok(()) => debug!(filter_name = %env.name(), "Filter initialized"),
                Err(err) => {
                    let err = err.attributed_to(env.name());
                    warn!(filter_name = %env.name(), error = %err, "Unable to initialize filter");
                    env.set_availability(Availability::from_error(&err));
                    self.startup_failures.push(err);
                }
            }
        }
    }

    fn init_filter(&self, env: &FilterEnvironment) -> Result<()> {
        let filter: Arc<dyn Filter> = match (env.instance(), env.class_name()) {
            (Some(filter), _) => filter,
            (None, Some(class_name)) => {
                let filter = self.factory.create_filter(class_name)?;
                env.set_instance(Some(Arc::clone(&filter)));
                filter
            }
            (None, None) => return Err(ContainerError::unavailable("filter has no implementation")),
        };
        filter.init(env)
    }

    fn initialize_handlers(&mut self) {
        let mut removed = Vec::new();
        for env in self.handlers.values() {
            let err = match self.init_handler(&env) {
                Ok(()) => {
                    debug!(handler_name = %env.name(), "Handler initialized");
                    continue;
                }
                Err(err) => err.attributed_to(env.name()),
            };
            warn!(handler_name = %env.name(), error = %err, "Unable to initialize handler");
            env.set_availability(Availability::from_error(&err));

            let err = if err.is_permanent_unavailable() {
                removed.push(env.name().to_string());
                match env.instance().map(|handler| handler.destroy()) {
                    Some(Err(teardown)) => err.with_suppressed(teardown),
                    _ => err,
                }
            } else {
                err
            };
            env.set_instance(None);
            self.startup_failures.push(err);
        }

        for name in removed {
            info!(handler_name = %name, "Removing permanently unavailable handler");
            self.handlers.remove(&name);
            self.resolver.remove_handler(&name);
        }
    }

    fn init_handler(&self, env: &HandlerEnvironment) -> Result<()> {
        let handler: Arc<dyn Handler> = match (env.instance(), env.class_name()) {
            (Some(handler), _) => handler,
            (None, Some(class_name)) => {
                let handler = self.factory.create_handler(class_name)?;
                env.set_instance(Some(Arc::clone(&handler)));
                handler
            }
            (None, None) => {
                return Err(ContainerError::unavailable("handler has no implementation"))
            }
        };
        handler.init(env)
    }

    /// `INITIALIZED → SERVICING`
    pub fn start(&self) -> Result<()> {
        self.lifecycle
            .write()
            .transition(Operation::Start, Status::Servicing)?;
        info!(context_path = %self.context_path, "Container started");
        Ok(())
    }

    /// `SERVICING → INITIALIZED`
    pub fn stop(&self) -> Result<()> {
        self.lifecycle
            .write()
            .transition(Operation::Stop, Status::Initialized)?;
        info!(context_path = %self.context_path, "Container stopped");
        Ok(())
    }

    /// Tear everything down and return to `SETUP`.
    ///
    /// Teardown continues past failing units; the first failure is returned
    /// once the container is back in `SETUP`.
    pub fn destroy(&mut self) -> Result<()> {
        self.check(Operation::Destroy)?;
        info!(context_path = %self.context_path, "Destroying container");
        let mut first_failure: Option<ContainerError> = None;

        for env in self.handlers.values() {
            if let Some(handler) = env.instance() {
                if let Err(err) = handler.destroy() {
                    let err = err.attributed_to(env.name());
                    warn!(handler_name = %env.name(), error = %err, "Handler destroy failed");
                    first_failure.get_or_insert(err);
                }
            }
            env.set_instance(None);
        }
        self.handlers.clear();

        for env in self.filters.values() {
            if let Some(filter) = env.instance() {
                if let Err(err) = filter.destroy() {
                    let err = err.attributed_to(env.name());
                    warn!(filter_name = %env.name(), error = %err, "Filter destroy failed");
                    first_failure.get_or_insert(err);
                }
            }
            env.set_instance(None);
        }
        self.filters.clear();

        for listener in self.listeners.programmatic().iter().rev() {
            listener.context_destroyed(self);
        }
        for listener in self.listeners.declared().iter().rev() {
            listener.context_destroyed(self);
        }
        self.listeners.clear_context();
        self.resolver.reset();
        self.startup_failures.clear();

        self.lifecycle.get_mut().set(Status::Setup);
        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
