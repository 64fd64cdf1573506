use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;
use ulid::Ulid;

use crate::error::{ContainerError, Result};
use crate::factory::{ClassRegistry, ObjectFactory};
use crate::lifecycle::{Lifecycle, Operation, Status};
use crate::link::LinkTable;
use crate::listener::{ContainerInitializer, ListenerRegistry, StartupScope};
use crate::registry::{FilterEnvironment, HandlerEnvironment, Registrations};
use crate::resolver::{InvocationResolver, SimpleMapper};
use crate::runtime_config::ContainerConfig;

/// One application context: registrations, lifecycle and dispatch state.
pub struct Container {
    pub(super) context_path: String,
    pub(super) context_name: String,
    pub(super) request_encoding: Option<String>,
    pub(super) response_encoding: Option<String>,
    pub(super) lifecycle: RwLock<Lifecycle>,
    pub(super) handlers: Registrations<HandlerEnvironment>,
    pub(super) filters: Registrations<FilterEnvironment>,
    pub(super) listeners: ListenerRegistry,
    pub(super) initializers: Vec<Arc<dyn ContainerInitializer>>,
    pub(super) init_parameters: IndexMap<String, String>,
    pub(super) attributes: DashMap<String, Value>,
    pub(super) scope: StartupScope,
    pub(super) links: LinkTable,
    pub(super) resolver: Box<dyn InvocationResolver>,
    pub(super) factory: Arc<dyn ObjectFactory>,
    pub(super) startup_failures: Vec<ContainerError>,
}

impl Default for Container {
    fn default() -> Self {
        Self {
            context_path: String::new(),
            context_name: Ulid::new().to_string(),
            request_encoding: None,
            response_encoding: None,
            lifecycle: RwLock::new(Lifecycle::new()),
            handlers: Registrations::default(),
            filters: Registrations::default(),
            listeners: ListenerRegistry::default(),
            initializers: Vec::new(),
            init_parameters: IndexMap::new(),
            attributes: DashMap::new(),
            scope: StartupScope::default(),
            links: LinkTable::new(),
            resolver: Box::new(SimpleMapper::new()),
            factory: Arc::new(ClassRegistry::new()),
            startup_failures: Vec::new(),
        }
    }
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply runtime settings loaded from the environment or a YAML file.
    #[must_use]
    pub fn with_config(mut self, config: &ContainerConfig) -> Self {
        self.context_path = config.context_path.clone();
        if let Some(name) = &config.context_name {
            self.context_name = name.clone();
        }
        self.request_encoding = config.request_encoding.clone();
        self.response_encoding = config.response_encoding.clone();
        self
    }

    /// Replace the path resolver. Only allowed before initialization.
    pub fn set_resolver(&mut self, resolver: Box<dyn InvocationResolver>) -> Result<()> {
        self.check(Operation::AddMapping)?;
        self.resolver = resolver;
        Ok(())
    }

    /// Replace the object factory used for class-name registrations.
    pub fn set_factory(&mut self, factory: Arc<dyn ObjectFactory>) -> Result<()> {
        self.check(Operation::AddHandler)?;
        self.factory = factory;
        Ok(())
    }

    pub fn set_context_path(&mut self, context_path: &str) -> Result<()> {
        self.check(Operation::SetInitParameter)?;
        self.context_path = context_path.trim_end_matches('/').to_string();
        Ok(())
    }

    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    #[must_use]
    pub fn context_name(&self) -> &str {
        &self.context_name
    }

    #[must_use]
    pub fn request_encoding(&self) -> Option<&str> {
        self.request_encoding.as_deref()
    }

    #[must_use]
    pub fn response_encoding(&self) -> Option<&str> {
        self.response_encoding.as_deref()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.lifecycle.read().status()
    }

    /// True while the programmatic context listeners are firing
    #[must_use]
    pub fn is_tainted(&self) -> bool {
        self.scope.is_tainted()
    }

    #[must_use]
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    #[must_use]
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Init failures recorded by the last `initialize()`, in handler order.
    /// Permanent failures carry the teardown error as suppressed.
    #[must_use]
    pub fn startup_failures(&self) -> &[ContainerError] {
        &self.startup_failures
    }

    /// Tainted check first, then the lifecycle window.
    ///
    /// `initialize()` is never re-entered from the startup code it runs.
    pub(crate) fn check(&self, operation: Operation) -> Result<()> {
        if operation.blocked_when_tainted() && self.scope.is_tainted() {
            return Err(ContainerError::Tainted { operation });
        }
        let lifecycle = self.lifecycle.read();
        if operation == Operation::Initialize && self.scope.is_initializing() {
            return Err(ContainerError::IllegalState {
                operation,
                status: lifecycle.status(),
            });
        }
        lifecycle.verify(operation)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.attributes.get(name).map(|v| v.value().clone())
    }

    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        self.attributes.iter().map(|e| e.key().clone()).collect()
    }

    /// Store a context attribute. `Value::Null` removes it.
    ///
    /// Attribute listeners see the new value on add and the previous value
    /// on replace.
    pub fn set_attribute(&self, name: &str, value: Value) {
        if value.is_null() {
            self.remove_attribute(name);
            return;
        }
        let previous = self.attributes.insert(name.to_string(), value.clone());
        match previous {
            Some(previous) => self.listeners.attribute_replaced(name, &previous),
            None => self.listeners.attribute_added(name, &value),
        }
    }

    /// Remove a context attribute; listeners hear about it only when it
    /// existed.
    pub fn remove_attribute(&self, name: &str) -> Option<Value> {
        let (_, previous) = self.attributes.remove(name)?;
        debug!(attribute = %name, "Context attribute removed");
        self.listeners.attribute_removed(name, &previous);
        Some(previous)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("context_path", &self.context_path)
            .field("context_name", &self.context_name)
            .field("status", &self.status())
            .field("handlers", &self.handlers.names())
            .field("filters", &self.filters.names())
            .field("linked", &self.links.len())
            .finish()
    }
}
