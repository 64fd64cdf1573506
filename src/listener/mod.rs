//! # Listener Module
//!
//! Listener categories and the registry that fires them.
//!
//! | Category            | Trait                        | Fired                                   |
//! |---------------------|------------------------------|-----------------------------------------|
//! | context (declared)  | [`ContextListener`]          | first at startup, last at shutdown      |
//! | context (programmatic) | [`ContextListener`]       | second at startup (tainted), first at shutdown |
//! | context attribute   | [`ContextAttributeListener`] | every attribute add/replace/remove      |
//! | request             | [`RequestListener`]          | start and end of top-level `service`    |
//!
//! A listener object declares its categories through [`Listener`]; the
//! registry files it into one list per category when it is added, so firing
//! never inspects types.
//!
//! Whether a context listener is declared or programmatic depends on when it
//! was added: before `initialize_declared_finish` it is declared, after it
//! is programmatic.

mod core;

pub use self::core::{
    ContainerInitializer, ContextAttributeListener, ContextListener, Listener, ListenerRegistry,
    RequestListener, Source,
};
pub(crate) use self::core::StartupScope;
