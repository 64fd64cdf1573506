//! # Registry Module
//!
//! Insertion-ordered registration tables for handlers and filters.
//!
//! Iteration order is observable: handlers and filters are initialized in
//! the order they were registered, and the order survives removals. An
//! [`Environment`] binds a name to either a class name (resolved through the
//! object factory at initialization) or a ready instance, together with its
//! init parameters, async capability and runtime availability.
//!
//! Tables are only mutated by the container while registration is open, so
//! [`Registrations`] itself is not synchronized. Environments are shared
//! with in-flight dispatches and use interior locks for the fields that can
//! change while servicing.

mod core;

pub use self::core::{
    Availability, Environment, FilterEnvironment, HandlerEnvironment, Registrations,
};
