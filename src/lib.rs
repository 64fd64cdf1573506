//! # brrtcontainer
//!
//! **brrtcontainer** is the runtime core of a handler container: a lifecycle
//! state machine that governs registration and startup, plus a dispatch
//! engine that forwards, includes and asynchronously re-dispatches
//! in-flight requests between handlers while keeping path metadata,
//! response buffers and request wrapper chains consistent.
//!
//! It carries no HTTP server. Something in front of it builds a
//! [`Request`](exchange::Request)/[`Response`](exchange::Response) pair and
//! calls [`Container::service`](container::Container::service); the
//! [`embedded`] facade and the `brrtcontainer` binary do exactly that for
//! tests and local experiments.
//!
//! ## Architecture
//!
//! - **[`lifecycle`]** - status enum and the single operation/status legality table
//! - **[`container`]** - registration, startup/shutdown phases, top-level `service`
//! - **[`registry`]** - per-handler and per-filter environments in insertion order
//! - **[`listener`]** - context, attribute and request listeners; initializers
//! - **[`resolver`]** - path/name to handler-plus-filters resolution ([`SimpleMapper`](resolver::SimpleMapper) by default)
//! - **[`factory`]** - class-name instantiation ([`ClassRegistry`](factory::ClassRegistry) by default)
//! - **[`dispatcher`]** - filter chains, forward/include/async re-dispatch
//! - **[`exchange`]** - requests, wrapper chains, responses and path attributes
//! - **[`link`]** - bidirectional request/response pairing
//! - **[`filter`]** - filter trait plus tracing and metrics filters
//!
//! ### Forward Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Front as Front end
//!     participant Container
//!     participant Links as LinkTable
//!     participant A as Handler A
//!     participant Disp as RequestDispatcher
//!     participant B as Handler B
//!
//!     Front->>Container: service(req /a, resp)
//!     Container->>Links: link(req, resp)
//!     Container->>Container: request_initialized
//!     Container->>A: filter chain → service
//!     A->>Disp: request_dispatcher("/b?x=9").forward
//!     Disp->>Disp: reset response buffer
//!     Disp->>Disp: wrap req (FORWARD, /b, x=9, FORWARD_* = /a)
//!     Disp->>Links: re-point resp at wrapper
//!     Disp->>B: filter chain (FORWARD) → service
//!     B-->>Disp: Ok
//!     Disp->>Links: restore resp → req
//!     Disp->>Disp: flush buffer, release wrapper
//!     Disp-->>A: Ok
//!     A-->>Container: Ok
//!     Container->>Container: request_destroyed
//!     Container->>Links: unlink(resp)
//!     Container-->>Front: Ok
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use brrtcontainer::container::Container;
//! use brrtcontainer::echo::EchoHandler;
//! use brrtcontainer::exchange::{Request, Response};
//!
//! # fn main() -> brrtcontainer::error::Result<()> {
//! let mut container = Container::new();
//! if let Some(mut echo) = container.add_handler("echo", Arc::new(EchoHandler))? {
//!     echo.add_mapping(&["/echo/*"])?;
//! }
//! container.initialize()?;
//! container.start()?;
//!
//! let request = Request::builder().path("/echo/hello?lang=en").build();
//! let response = Response::new();
//! container.service(&request, &response)?;
//! println!("{}", response.body_string());
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Registration and the startup/shutdown phases take `&mut Container`. After
//! `start()` the container is shared behind an `Arc` and serviced from any
//! number of threads; each `service` call works on its own request and
//! response.

pub mod cli;
pub mod container;
pub mod dispatcher;
pub mod echo;
pub mod embedded;
pub mod error;
pub mod exchange;
pub mod factory;
pub mod filter;
mod ids;
pub mod lifecycle;
pub mod link;
pub mod listener;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod runtime_config;

pub use container::Container;
pub use error::{ContainerError, Result};
pub use ids::{RequestId, ResponseId};
pub use lifecycle::{Operation, Status};
