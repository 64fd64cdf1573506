use std::sync::Arc;

use tracing::{debug, warn};

use super::core::Container;
use crate::dispatcher::Handler;
use crate::error::{ContainerError, Result};
use crate::exchange::DispatcherType;
use crate::filter::Filter;
use crate::lifecycle::{Operation, Status};
use crate::listener::{ContainerInitializer, Listener};
use crate::registry::{Environment, FilterEnvironment, HandlerEnvironment};
use crate::resolver::{FilterMapping, FilterTarget};

/// Handle returned by a successful `add_handler*` call.
pub struct HandlerRegistration<'a> {
    container: &'a mut Container,
    env: Arc<HandlerEnvironment>,
}

impl HandlerRegistration<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.env.name()
    }

    #[must_use]
    pub fn environment(&self) -> Arc<HandlerEnvironment> {
        Arc::clone(&self.env)
    }

    /// Map URL patterns to this handler; returns the patterns that were
    /// already taken by another handler.
    pub fn add_mapping(&mut self, patterns: &[&str]) -> Result<Vec<String>> {
        let name = self.env.name().to_string();
        self.container.add_mapping(&name, patterns)
    }

    /// Returns `false` when the parameter was already set.
    pub fn set_init_parameter(&self, name: &str, value: &str) -> Result<bool> {
        self.container.check(Operation::SetInitParameter)?;
        Ok(self.env.set_init_parameter(name, value))
    }

    pub fn set_async_supported(&self, supported: bool) -> Result<()> {
        self.container.check(Operation::AddHandler)?;
        self.env.set_async_supported(supported);
        Ok(())
    }
}

/// Handle returned by a successful `add_filter*` call.
pub struct FilterRegistration<'a> {
    container: &'a mut Container,
    env: Arc<FilterEnvironment>,
}

impl FilterRegistration<'_> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.env.name()
    }

    #[must_use]
    pub fn environment(&self) -> Arc<FilterEnvironment> {
        Arc::clone(&self.env)
    }

    /// Run this filter for requests matching any of `patterns`. An empty
    /// `dispatcher_types` means top-level requests only.
    pub fn add_mapping_for_url(
        &mut self,
        patterns: &[&str],
        dispatcher_types: &[DispatcherType],
    ) -> Result<()> {
        for pattern in patterns {
            self.container.add_filter_mapping(FilterMapping {
                filter_name: self.env.name().to_string(),
                target: FilterTarget::UrlPattern((*pattern).to_string()),
                dispatcher_types: dispatcher_types.to_vec(),
            })?;
        }
        Ok(())
    }

    /// Run this filter in front of the named handlers (`"*"` for all).
    pub fn add_mapping_for_handler(
        &mut self,
        handler_names: &[&str],
        dispatcher_types: &[DispatcherType],
    ) -> Result<()> {
        for handler_name in handler_names {
            self.container.add_filter_mapping(FilterMapping {
                filter_name: self.env.name().to_string(),
                target: FilterTarget::HandlerName((*handler_name).to_string()),
                dispatcher_types: dispatcher_types.to_vec(),
            })?;
        }
        Ok(())
    }

    pub fn set_init_parameter(&self, name: &str, value: &str) -> Result<bool> {
        self.container.check(Operation::SetInitParameter)?;
        Ok(self.env.set_init_parameter(name, value))
    }

    pub fn set_async_supported(&self, supported: bool) -> Result<()> {
        self.container.check(Operation::AddFilter)?;
        self.env.set_async_supported(supported);
        Ok(())
    }
}

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ContainerError::InvalidArgument(format!(
            "{kind} name must not be empty"
        )));
    }
    Ok(())
}

impl Container {
    /// Register a handler instance under `name`.
    ///
    /// Returns `Ok(None)` when the name is already taken; the first
    /// registration wins.
    pub fn add_handler(
        &mut self,
        name: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<Option<HandlerRegistration<'_>>> {
        self.check(Operation::AddHandler)?;
        validate_name("handler", name)?;
        Ok(self.insert_handler(name, || Environment::with_instance(name, handler)))
    }

    /// Register a handler to be created by the object factory during
    /// `initialize()`.
    pub fn add_handler_class(
        &mut self,
        name: &str,
        class_name: &str,
    ) -> Result<Option<HandlerRegistration<'_>>> {
        self.check(Operation::AddHandler)?;
        validate_name("handler", name)?;
        Ok(self.insert_handler(name, || Environment::with_class(name, class_name)))
    }

    fn insert_handler(
        &mut self,
        name: &str,
        build: impl FnOnce() -> HandlerEnvironment,
    ) -> Option<HandlerRegistration<'_>> {
        if self.handlers.contains(name) {
            debug!(handler_name = %name, "Handler already registered");
            return None;
        }
        let env = Arc::new(build());
        self.handlers.insert(name, Arc::clone(&env));
        debug!(handler_name = %name, class_name = ?env.class_name(), "Handler registered");
        Some(HandlerRegistration {
            container: self,
            env,
        })
    }

    /// Register a filter instance under `name`; `Ok(None)` when taken.
    pub fn add_filter(
        &mut self,
        name: &str,
        filter: Arc<dyn Filter>,
    ) -> Result<Option<FilterRegistration<'_>>> {
        self.check(Operation::AddFilter)?;
        validate_name("filter", name)?;
        Ok(self.insert_filter(name, || Environment::with_instance(name, filter)))
    }

    pub fn add_filter_class(
        &mut self,
        name: &str,
        class_name: &str,
    ) -> Result<Option<FilterRegistration<'_>>> {
        self.check(Operation::AddFilter)?;
        validate_name("filter", name)?;
        Ok(self.insert_filter(name, || Environment::with_class(name, class_name)))
    }

    fn insert_filter(
        &mut self,
        name: &str,
        build: impl FnOnce() -> FilterEnvironment,
    ) -> Option<FilterRegistration<'_>> {
        if self.filters.contains(name) {
            debug!(filter_name = %name, "Filter already registered");
            return None;
        }
        let env = Arc::new(build());
        self.filters.insert(name, Arc::clone(&env));
        debug!(filter_name = %name, class_name = ?env.class_name(), "Filter registered");
        Some(FilterRegistration {
            container: self,
            env,
        })
    }

    /// Map URL patterns to a registered handler. Returns the patterns that
    /// another handler already owns.
    pub fn add_mapping(&mut self, handler_name: &str, patterns: &[&str]) -> Result<Vec<String>> {
        self.check(Operation::AddMapping)?;
        if patterns.is_empty() {
            return Err(ContainerError::InvalidArgument(
                "at least one URL pattern is required".to_string(),
            ));
        }
        if !self.handlers.contains(handler_name) {
            return Err(ContainerError::InvalidArgument(format!(
                "no handler named '{handler_name}'"
            )));
        }
        let conflicts = self.resolver.add_handler_mapping(handler_name, patterns);
        debug!(
            handler_name = %handler_name,
            patterns = ?patterns,
            conflicts = ?conflicts,
            "Handler mapping added"
        );
        Ok(conflicts)
    }

    pub fn add_filter_mapping(&mut self, mapping: FilterMapping) -> Result<()> {
        self.check(Operation::AddMapping)?;
        if !self.filters.contains(&mapping.filter_name) {
            return Err(ContainerError::InvalidArgument(format!(
                "no filter named '{}'",
                mapping.filter_name
            )));
        }
        debug!(filter_name = %mapping.filter_name, target = ?mapping.target, "Filter mapping added");
        self.resolver.add_filter_mapping(mapping);
        Ok(())
    }

    #[must_use]
    pub fn mappings(&self, handler_name: &str) -> Vec<String> {
        self.resolver.mappings(handler_name)
    }

    /// Register a listener for every category it implements.
    ///
    /// Context listeners added while the status is `SETUP` are declared;
    /// those added in `INITIALIZED_DECLARED` are programmatic.
    pub fn add_listener(&mut self, listener: Arc<dyn Listener>) -> Result<()> {
        self.check(Operation::AddListener)?;
        let programmatic = self.status() == Status::InitializedDeclared;
        let source = self.scope.source();
        self.listeners.register(listener, programmatic, source)
    }

    /// Create a listener through the object factory and register it.
    /// A class the factory cannot create is logged and skipped.
    pub fn add_listener_class(&mut self, class_name: &str) -> Result<()> {
        self.check(Operation::AddListener)?;
        match self.factory.create_listener(class_name) {
            Ok(listener) => self.add_listener(listener),
            Err(err) => {
                warn!(class_name = %class_name, error = %err, "Unable to create listener");
                Ok(())
            }
        }
    }

    pub fn add_listener_type<L>(&mut self) -> Result<()>
    where
        L: Listener + Default + 'static,
    {
        self.add_listener(Arc::new(L::default()))
    }

    pub fn add_initializer(&mut self, initializer: Arc<dyn ContainerInitializer>) -> Result<()> {
        self.check(Operation::AddInitializer)?;
        debug!(initializer = %initializer.name(), "Initializer registered");
        self.initializers.push(initializer);
        Ok(())
    }

    /// Like [`add_listener_class`](Self::add_listener_class), for initializers.
    pub fn add_initializer_class(&mut self, class_name: &str) -> Result<()> {
        self.check(Operation::AddInitializer)?;
        match self.factory.create_initializer(class_name) {
            Ok(initializer) => self.add_initializer(initializer),
            Err(err) => {
                warn!(class_name = %class_name, error = %err, "Unable to create initializer");
                Ok(())
            }
        }
    }

    pub fn create_handler(&self, class_name: &str) -> Result<Arc<dyn Handler>> {
        self.check(Operation::CreateInstance)?;
        self.factory.create_handler(class_name)
    }

    pub fn create_filter(&self, class_name: &str) -> Result<Arc<dyn Filter>> {
        self.check(Operation::CreateInstance)?;
        self.factory.create_filter(class_name)
    }

    pub fn create_listener(&self, class_name: &str) -> Result<Arc<dyn Listener>> {
        self.check(Operation::CreateInstance)?;
        self.factory.create_listener(class_name)
    }

    /// Set a context init parameter. Returns `false` when it already exists.
    pub fn set_init_parameter(&mut self, name: &str, value: &str) -> Result<bool> {
        self.check(Operation::SetInitParameter)?;
        if self.init_parameters.contains_key(name) {
            return Ok(false);
        }
        self.init_parameters
            .insert(name.to_string(), value.to_string());
        Ok(true)
    }

    #[must_use]
    pub fn init_parameter(&self, name: &str) -> Option<String> {
        self.init_parameters.get(name).cloned()
    }

    #[must_use]
    pub fn init_parameter_names(&self) -> Vec<String> {
        self.init_parameters.keys().cloned().collect()
    }

    pub fn handler_registration(&self, name: &str) -> Result<Option<Arc<HandlerEnvironment>>> {
        self.check(Operation::InspectRegistrations)?;
        Ok(self.handlers.get(name))
    }

    pub fn handler_registrations(&self) -> Result<Vec<Arc<HandlerEnvironment>>> {
        self.check(Operation::InspectRegistrations)?;
        Ok(self.handlers.values())
    }

    pub fn filter_registration(&self, name: &str) -> Result<Option<Arc<FilterEnvironment>>> {
        self.check(Operation::InspectRegistrations)?;
        Ok(self.filters.get(name))
    }

    pub fn filter_registrations(&self) -> Result<Vec<Arc<FilterEnvironment>>> {
        self.check(Operation::InspectRegistrations)?;
        Ok(self.filters.values())
    }
}
