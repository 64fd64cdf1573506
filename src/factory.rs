//! Instantiation of handlers, filters, listeners and initializers that were
//! registered by class name.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::dispatcher::Handler;
use crate::error::{ContainerError, Result};
use crate::filter::Filter;
use crate::listener::{ContainerInitializer, Listener};

/// Creates instances from class names.
///
/// The container calls this lazily: handlers and filters registered by class
/// name are created during `initialize()`, listeners and initializers at
/// registration.
pub trait ObjectFactory: Send + Sync {
    fn create_handler(&self, class_name: &str) -> Result<Arc<dyn Handler>>;

    fn create_filter(&self, class_name: &str) -> Result<Arc<dyn Filter>>;

    fn create_listener(&self, class_name: &str) -> Result<Arc<dyn Listener>>;

    fn create_initializer(&self, class_name: &str) -> Result<Arc<dyn ContainerInitializer>>;
}

type Constructor<T> = Box<dyn Fn() -> Result<Arc<T>> + Send + Sync>;

/// Name → constructor table.
///
/// ```rust,ignore
/// let mut classes = ClassRegistry::new();
/// classes.register_handler("echo", || Ok(Arc::new(EchoHandler::default())));
/// container.set_factory(Arc::new(classes))?;
/// container.add_handler_class("echo", "echo")?;
/// ```
#[derive(Default)]
pub struct ClassRegistry {
    handlers: HashMap<String, Constructor<dyn Handler>>,
    filters: HashMap<String, Constructor<dyn Filter>>,
    listeners: HashMap<String, Constructor<dyn Listener>>,
    initializers: HashMap<String, Constructor<dyn ContainerInitializer>>,
}

impl ClassRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&mut self, class_name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Handler>> + Send + Sync + 'static,
    {
        self.handlers
            .insert(class_name.to_string(), Box::new(constructor));
        self
    }

    pub fn register_filter<F>(&mut self, class_name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Filter>> + Send + Sync + 'static,
    {
        self.filters
            .insert(class_name.to_string(), Box::new(constructor));
        self
    }

    pub fn register_listener<F>(&mut self, class_name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn Listener>> + Send + Sync + 'static,
    {
        self.listeners
            .insert(class_name.to_string(), Box::new(constructor));
        self
    }

    pub fn register_initializer<F>(&mut self, class_name: &str, constructor: F) -> &mut Self
    where
        F: Fn() -> Result<Arc<dyn ContainerInitializer>> + Send + Sync + 'static,
    {
        self.initializers
            .insert(class_name.to_string(), Box::new(constructor));
        self
    }
}

fn construct<T: ?Sized>(
    table: &HashMap<String, Constructor<T>>,
    kind: &str,
    class_name: &str,
) -> Result<Arc<T>> {
    let constructor = table.get(class_name).ok_or_else(|| {
        ContainerError::InvalidArgument(format!("unknown {kind} class '{class_name}'"))
    })?;
    debug!(kind, class_name, "Creating instance");
    constructor()
}

impl ObjectFactory for ClassRegistry {
    fn create_handler(&self, class_name: &str) -> Result<Arc<dyn Handler>> {
        construct(&self.handlers, "handler", class_name)
    }

    fn create_filter(&self, class_name: &str) -> Result<Arc<dyn Filter>> {
        construct(&self.filters, "filter", class_name)
    }

    fn create_listener(&self, class_name: &str) -> Result<Arc<dyn Listener>> {
        construct(&self.listeners, "listener", class_name)
    }

    fn create_initializer(&self, class_name: &str) -> Result<Arc<dyn ContainerInitializer>> {
        construct(&self.initializers, "initializer", class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo::EchoHandler;

    #[test]
    fn test_known_and_unknown_classes() {
        let mut classes = ClassRegistry::new();
        classes.register_handler("echo", || Ok(Arc::new(EchoHandler::default())));
        assert!(classes.create_handler("echo").is_ok());
        let err = classes.create_handler("missing").err().unwrap();
        assert!(err.to_string().contains("unknown handler class 'missing'"));
        assert!(classes.create_filter("echo").is_err());
    }
}
