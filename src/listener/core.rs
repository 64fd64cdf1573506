use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::exchange::Request;

/// Receives context startup and shutdown.
pub trait ContextListener: Send + Sync {
    /// Called during `initialize()`. Declared listeners may register further
    /// handlers, filters and mappings; programmatic listeners run in tainted
    /// mode.
    fn context_initialized(&self, container: &mut Container) -> Result<()>;

    fn context_destroyed(&self, _container: &Container) {}
}

/// Receives container attribute changes, synchronously on the mutating thread.
pub trait ContextAttributeListener: Send + Sync {
    fn attribute_added(&self, _name: &str, _value: &Value) {}

    /// `previous` is the value that was replaced.
    fn attribute_replaced(&self, _name: &str, _previous: &Value) {}

    /// `previous` is the value that was removed.
    fn attribute_removed(&self, _name: &str, _previous: &Value) {}
}

/// Receives the start and end of every top-level `service` call.
pub trait RequestListener: Send + Sync {
    fn request_initialized(&self, _request: &Request) {}

    fn request_destroyed(&self, _request: &Request) {}
}

/// Runs before any listener during `initialize()`, with full registration
/// access. The only place a context listener may be added from code that is
/// itself running inside startup.
pub trait ContainerInitializer: Send + Sync {
    fn on_startup(&self, container: &mut Container) -> Result<()>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A listener object and the categories it takes part in.
///
/// Override the capability methods for every category the listener
/// implements; a listener that declares none is rejected at registration.
pub trait Listener: Send + Sync {
    fn as_context_listener(self: Arc<Self>) -> Option<Arc<dyn ContextListener>> {
        None
    }

    fn as_attribute_listener(self: Arc<Self>) -> Option<Arc<dyn ContextAttributeListener>> {
        None
    }

    fn as_request_listener(self: Arc<Self>) -> Option<Arc<dyn RequestListener>> {
        None
    }
}

/// Who is currently running startup code against the container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Initializer,
    Listener,
}

/// Tainted flag, active source and the in-progress `initialize()` marker,
/// shared with the guards that reset them.
#[derive(Debug, Clone, Default)]
pub(crate) struct StartupScope {
    tainted: Arc<AtomicBool>,
    initializing: Arc<AtomicBool>,
    source: Arc<Mutex<Option<Source>>>,
}

impl StartupScope {
    pub fn is_tainted(&self) -> bool {
        self.tainted.load(Ordering::Acquire)
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::Acquire)
    }

    pub fn source(&self) -> Option<Source> {
        *self.source.lock()
    }

    /// Enter tainted mode until the guard drops.
    pub fn taint(&self) -> ScopeGuard {
        self.tainted.store(true, Ordering::Release);
        ScopeGuard {
            scope: self.clone(),
            reset: Reset::Taint,
        }
    }

    /// Mark `source` active until the guard drops.
    pub fn enter(&self, source: Source) -> ScopeGuard {
        *self.source.lock() = Some(source);
        ScopeGuard {
            scope: self.clone(),
            reset: Reset::Source,
        }
    }

    /// Mark an `initialize()` call in progress until the guard drops.
    pub fn initializing(&self) -> ScopeGuard {
        self.initializing.store(true, Ordering::Release);
        ScopeGuard {
            scope: self.clone(),
            reset: Reset::Initializing,
        }
    }
}

enum Reset {
    Source,
    Taint,
    Initializing,
}

pub(crate) struct ScopeGuard {
    scope: StartupScope,
    reset: Reset,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        match self.reset {
            Reset::Initializing => self.scope.initializing.store(false, Ordering::Release),
            Reset::Taint => {
                self.scope.tainted.store(false, Ordering::Release);
                *self.scope.source.lock() = None;
            }
            Reset::Source => *self.scope.source.lock() = None,
        }
    }
}

/// Categorized listener lists
#[derive(Default)]
pub struct ListenerRegistry {
    declared: Vec<Arc<dyn ContextListener>>,
    programmatic: Vec<Arc<dyn ContextListener>>,
    attribute: Vec<Arc<dyn ContextAttributeListener>>,
    request: Vec<Arc<dyn RequestListener>>,
}

impl ListenerRegistry {
    /// File `listener` under every category it declares.
    ///
    /// Context listeners go to the programmatic list when `programmatic` is
    /// set and to the declared list otherwise. Adding a context listener
    /// while a listener is the active source fails.
    pub(crate) fn register(
        &mut self,
        listener: Arc<dyn Listener>,
        programmatic: bool,
        source: Option<Source>,
    ) -> Result<()> {
        let context = Arc::clone(&listener).as_context_listener();
        let attribute = Arc::clone(&listener).as_attribute_listener();
        let request = listener.as_request_listener();

        if context.is_none() && attribute.is_none() && request.is_none() {
            return Err(ContainerError::InvalidArgument(
                "listener implements no supported listener category".to_string(),
            ));
        }
        if context.is_some() && matches!(source, Some(Source::Listener)) {
            return Err(ContainerError::InvalidArgument(
                "context listeners may only be added by an initializer".to_string(),
            ));
        }

        if let Some(context) = context {
            if programmatic {
                self.programmatic.push(context);
            } else {
                self.declared.push(context);
            }
        }
        if let Some(attribute) = attribute {
            self.attribute.push(attribute);
        }
        if let Some(request) = request {
            self.request.push(request);
        }
        debug!(
            declared = self.declared.len(),
            programmatic = self.programmatic.len(),
            attribute = self.attribute.len(),
            request = self.request.len(),
            "Listener registered"
        );
        Ok(())
    }

    #[must_use]
    pub fn declared(&self) -> Vec<Arc<dyn ContextListener>> {
        self.declared.clone()
    }

    #[must_use]
    pub fn programmatic(&self) -> Vec<Arc<dyn ContextListener>> {
        self.programmatic.clone()
    }

    #[must_use]
    pub fn attribute_listener_count(&self) -> usize {
        self.attribute.len()
    }

    #[must_use]
    pub fn request_listener_count(&self) -> usize {
        self.request.len()
    }

    pub(crate) fn attribute_added(&self, name: &str, value: &Value) {
        for listener in &self.attribute {
            listener.attribute_added(name, value);
        }
    }

    pub(crate) fn attribute_replaced(&self, name: &str, previous: &Value) {
        for listener in &self.attribute {
            listener.attribute_replaced(name, previous);
        }
    }

    pub(crate) fn attribute_removed(&self, name: &str, previous: &Value) {
        for listener in &self.attribute {
            listener.attribute_removed(name, previous);
        }
    }

    pub(crate) fn request_initialized(&self, request: &Request) {
        for listener in &self.request {
            listener.request_initialized(request);
        }
    }

    pub(crate) fn request_destroyed(&self, request: &Request) {
        for listener in &self.request {
            listener.request_destroyed(request);
        }
    }

    /// Forget context listeners after shutdown.
    pub(crate) fn clear_context(&mut self) {
        debug!(
            declared = self.declared.len(),
            programmatic = self.programmatic.len(),
            "Clearing context listeners"
        );
        self.declared.clear();
        self.programmatic.clear();
    }
}
