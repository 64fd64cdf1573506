//! # Container Module
//!
//! The [`Container`] owns everything one application context needs: the
//! handler and filter tables, listeners, initializers, context attributes,
//! the request/response link table and the pluggable resolver and factory.
//!
//! ## Lifecycle
//!
//! ```text
//!   SETUP ──initialize_declared_finish──▶ INITIALIZED_DECLARED
//!     │                                        │
//!     └───────────────initialize───────────────┴──▶ INITIALIZED ◀──stop── SERVICING
//!                         │                          │   └──start──────────▲
//!                         ▼                          └──destroy──▶ SETUP
//!                       ERROR
//! ```
//!
//! Every mutator consults the same [`Operation`](crate::lifecycle::Operation)
//! table before touching state. Calls outside their window fail with
//! [`ContainerError::IllegalState`](crate::error::ContainerError::IllegalState)
//! and leave the status unchanged.
//!
//! ## Startup order
//!
//! `initialize()` runs, in order:
//!
//! 1. initializers, with the container mutable (a failure moves to `ERROR`
//!    after the remaining initializers have run)
//! 2. declared context listeners
//! 3. programmatic context listeners, in tainted mode
//! 4. filters, then handlers, in insertion order
//!
//! A handler whose `init` fails permanently is destroyed and removed from the
//! table; the teardown error is attached to the init failure, which stays
//! available through [`Container::startup_failures`].
//!
//! `destroy()` tears down handlers, then filters, then fires
//! `context_destroyed` on programmatic listeners in reverse order followed by
//! declared listeners in reverse order.
//!
//! ## Threading
//!
//! Registration and the startup/shutdown phases take `&mut self`. Once
//! started, the container is shared (`Arc<Container>`) and `service`, `stop`,
//! attributes and dispatcher lookups work through `&self` from any number of
//! threads.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use brrtcontainer::{container::Container, echo::EchoHandler};
//!
//! let mut container = Container::new();
//! container
//!     .add_handler("echo", Arc::new(EchoHandler::default()))?
//!     .map(|reg| reg.add_mapping(&["/echo/*"]))
//!     .transpose()?;
//! container.initialize()?;
//! container.start()?;
//! ```

mod core;
mod registration;
mod service;
mod startup;

pub use self::core::Container;
pub use registration::{FilterRegistration, HandlerRegistration};
