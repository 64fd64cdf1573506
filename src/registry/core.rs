use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;

use crate::dispatcher::Handler;
use crate::error::ContainerError;
use crate::filter::Filter;

/// Runtime availability of a handler or filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Availability {
    Available,
    /// May recover; dispatch attempts report `Unavailable` meanwhile
    Temporary { message: String },
    /// Removed from service
    Permanent { message: String },
}

impl Availability {
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }

    /// Availability implied by a failed `init` or `service` call. Errors
    /// that do not declare permanence count as temporary.
    #[must_use]
    pub fn from_error(err: &ContainerError) -> Self {
        match err {
            ContainerError::Unavailable {
                permanent: true,
                message,
                ..
            } => Availability::Permanent {
                message: message.clone(),
            },
            ContainerError::Unavailable { message, .. } => Availability::Temporary {
                message: message.clone(),
            },
            other => Availability::Temporary {
                message: other.to_string(),
            },
        }
    }
}

/// Named binding of a handler or filter implementation.
///
/// The instance is either supplied at registration or created from
/// `class_name` through the object factory during initialization.
pub struct Environment<U: ?Sized> {
    name: String,
    class_name: Option<String>,
    instance: RwLock<Option<Arc<U>>>,
    init_parameters: RwLock<IndexMap<String, String>>,
    async_supported: AtomicBool,
    availability: RwLock<Availability>,
}

/// Environment of a registered handler
pub type HandlerEnvironment = Environment<dyn Handler>;

/// Environment of a registered filter
pub type FilterEnvironment = Environment<dyn Filter>;

impl<U: ?Sized> Environment<U> {
    pub(crate) fn with_class(name: &str, class_name: &str) -> Self {
        Self::build(name, Some(class_name.to_string()), None)
    }

    pub(crate) fn with_instance(name: &str, instance: Arc<U>) -> Self {
        Self::build(name, None, Some(instance))
    }

    fn build(name: &str, class_name: Option<String>, instance: Option<Arc<U>>) -> Self {
        Self {
            name: name.to_string(),
            class_name,
            instance: RwLock::new(instance),
            init_parameters: RwLock::new(IndexMap::new()),
            async_supported: AtomicBool::new(false),
            availability: RwLock::new(Availability::Available),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// The bound instance, if created.
    #[must_use]
    pub fn instance(&self) -> Option<Arc<U>> {
        self.instance.read().clone()
    }

    pub(crate) fn set_instance(&self, instance: Option<Arc<U>>) {
        *self.instance.write() = instance;
    }

    /// True once an implementation (class or instance) is bound.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.class_name.is_some() || self.instance.read().is_some()
    }

    #[must_use]
    pub fn init_parameter(&self, name: &str) -> Option<String> {
        self.init_parameters.read().get(name).cloned()
    }

    #[must_use]
    pub fn init_parameter_names(&self) -> Vec<String> {
        self.init_parameters.read().keys().cloned().collect()
    }

    /// Write-once: returns `false` when `name` is already set.
    pub(crate) fn set_init_parameter(&self, name: &str, value: &str) -> bool {
        let mut params = self.init_parameters.write();
        if params.contains_key(name) {
            return false;
        }
        params.insert(name.to_string(), value.to_string());
        true
    }

    #[must_use]
    pub fn is_async_supported(&self) -> bool {
        self.async_supported.load(Ordering::Relaxed)
    }

    pub(crate) fn set_async_supported(&self, supported: bool) {
        self.async_supported.store(supported, Ordering::Relaxed);
    }

    #[must_use]
    pub fn availability(&self) -> Availability {
        self.availability.read().clone()
    }

    pub(crate) fn set_availability(&self, availability: Availability) {
        *self.availability.write() = availability;
    }

    #[must_use]
    pub fn is_permanently_unavailable(&self) -> bool {
        matches!(*self.availability.read(), Availability::Permanent { .. })
    }

    /// The error a dispatch through this unit reports while it is not
    /// available.
    #[must_use]
    pub fn unavailable_error(&self) -> Option<ContainerError> {
        match &*self.availability.read() {
            Availability::Available => None,
            Availability::Temporary { message } => Some(
                ContainerError::unavailable(message.clone()).attributed_to(&self.name),
            ),
            Availability::Permanent { message } => Some(
                ContainerError::permanently_unavailable(message.clone()).attributed_to(&self.name),
            ),
        }
    }
}

impl<U: ?Sized> fmt::Debug for Environment<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("bound", &self.instance.read().is_some())
            .field("availability", &*self.availability.read())
            .finish()
    }
}

/// Insertion-ordered name → environment table
pub struct Registrations<T> {
    entries: IndexMap<String, Arc<T>>,
}

impl<T> Default for Registrations<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<T> Registrations<T> {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in insertion order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Environments in insertion order
    #[must_use]
    pub fn values(&self) -> Vec<Arc<T>> {
        self.entries.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace `name`, keeping its original position when it was
    /// already present.
    pub(crate) fn insert(&mut self, name: &str, env: Arc<T>) {
        self.entries.insert(name.to_string(), env);
    }

    /// Remove `name` while preserving the order of the remaining entries.
    pub(crate) fn remove(&mut self, name: &str) -> Option<Arc<T>> {
        self.entries.shift_remove(name)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::ServiceContext;
    use crate::error::Result;
    use crate::exchange::{Request, Response};

    struct Noop;

    impl Handler for Noop {
        fn service(&self, _: &Request, _: &Response, _: &ServiceContext<'_>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let mut table: Registrations<HandlerEnvironment> = Registrations::default();
        for name in ["c", "a", "b"] {
            table.insert(name, Arc::new(HandlerEnvironment::with_class(name, "noop")));
        }
        assert_eq!(table.names(), vec!["c", "a", "b"]);
        table.remove("a");
        assert_eq!(table.names(), vec!["c", "b"]);
        assert!(!table.contains("a"));
    }

    #[test]
    fn test_init_parameters_are_write_once() {
        let env = HandlerEnvironment::with_instance("noop", Arc::new(Noop));
        assert!(env.is_bound());
        assert!(env.set_init_parameter("k", "1"));
        assert!(!env.set_init_parameter("k", "2"));
        assert_eq!(env.init_parameter("k").as_deref(), Some("1"));
    }

    #[test]
    fn test_unavailable_error_carries_name() {
        let env = HandlerEnvironment::with_class("late", "late-class");
        assert!(env.unavailable_error().is_none());
        env.set_availability(Availability::from_error(&ContainerError::unavailable(
            "warming",
        )));
        let err = env.unavailable_error().unwrap();
        assert!(!err.is_permanent_unavailable());
        assert!(err.to_string().starts_with("late"));
        env.set_availability(Availability::from_error(&ContainerError::Handler(
            anyhow::anyhow!("boom"),
        )));
        assert!(matches!(env.availability(), Availability::Temporary { .. }));
    }
}
