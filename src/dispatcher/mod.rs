//! # Dispatcher Module
//!
//! The dispatch engine: invokes resolved handler chains and implements
//! forward, include and async re-dispatch on top of the resolver.
//!
//! ## Dispatch kinds
//!
//! | Kind    | Dispatcher type | Buffer             | Path attributes                    |
//! |---------|-----------------|--------------------|------------------------------------|
//! | forward | `FORWARD`       | reset, then flush  | `FORWARD_*`, kept across chains    |
//! | include | `INCLUDE`       | untouched          | `INCLUDE_*`, mirror the includer   |
//! | async   | `ASYNC`         | untouched          | `ASYNC_*`, on the dispatch wrapper |
//!
//! Each kind builds a dispatch wrapper around the incoming request (see
//! [`crate::exchange`]), resolves the filter chain for its own dispatcher
//! type and runs it. Forward and include release their wrapper on every
//! exit path. Async leaves its wrapper in the chain because the caller keeps
//! using it.
//!
//! ## Context passing
//!
//! Handlers receive a [`ServiceContext`] instead of reaching for globals. It
//! carries the container and, for top-level `service` calls, the
//! [`CurrentRequest`] holder that forward re-points for its duration.
//!
//! ```rust,ignore
//! impl Handler for Login {
//!     fn service(&self, req: &Request, resp: &Response, ctx: &ServiceContext<'_>) -> Result<()> {
//!         ctx.request_dispatcher("/welcome?first=1")?.forward(req, resp)
//!     }
//! }
//! ```
//!
//! ## Failures
//!
//! Handler and filter errors propagate unchanged apart from the unit name
//! stamped on `Unavailable`. A resolver miss is [`ContainerError::NoTarget`];
//! an async chain the engine cannot rewire is
//! [`ContainerError::AsyncWrapperChain`] and nothing is invoked.
//!
//! [`ContainerError::NoTarget`]: crate::error::ContainerError::NoTarget
//! [`ContainerError::AsyncWrapperChain`]: crate::error::ContainerError::AsyncWrapperChain

mod chain;
mod context;
mod core;
mod request_dispatcher;

pub use self::core::Handler;
pub(crate) use self::core::Invocation;
pub use chain::FilterChain;
pub use context::{CurrentRequest, ServiceContext};
pub use request_dispatcher::{DispatchTarget, RequestDispatcher};
