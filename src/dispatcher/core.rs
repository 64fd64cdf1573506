//! Dispatcher core module - the invocation hot path.
//!
//! Every `service`, forward, include and async dispatch ends in
//! [`Invocation::run`]. Resolution happens once per dispatch in the
//! container; after that nothing here touches the registration tables.
//!
//! # Invocation flow
//!
//! 1. The resolver yields an [`Invocation`]: the handler environment, the
//!    filter environments mapped for the dispatcher type, and the path split.
//! 2. `run` builds a [`FilterChain`] borrowing those environments and the
//!    [`ServiceContext`]. No environment is cloned per request.
//! 3. Each filter link checks availability, then calls `do_filter` with the
//!    remaining chain.
//! 4. [`invoke_handler`] checks the handler's availability window and calls
//!    [`Handler::service`].
//!
//! # Availability
//!
//! A handler that returns `Unavailable` from `service` is marked on its
//! environment. Later dispatches fail fast with the recorded error until the
//! container is destroyed. Permanent unavailability only
//! removes a handler during `initialize()`.
//!
//! # Error attribution
//!
//! An `Unavailable` error leaving a filter or handler without a unit name is
//! stamped with that unit's name. Other errors pass through untouched.

use std::sync::Arc;

use tracing::debug;

use super::chain::FilterChain;
use super::context::ServiceContext;
use crate::error::{ContainerError, Result};
use crate::exchange::{Request, Response};
use crate::registry::{Availability, FilterEnvironment, HandlerEnvironment};

/// A registered unit that produces a response for a matched path.
pub trait Handler: Send + Sync {
    /// Called once during `initialize()`, in registration order.
    ///
    /// Returning [`ContainerError::permanently_unavailable`] removes the
    /// handler from service; any other error marks it temporarily
    /// unavailable.
    fn init(&self, _env: &HandlerEnvironment) -> Result<()> {
        Ok(())
    }

    fn service(&self, request: &Request, response: &Response, ctx: &ServiceContext<'_>)
        -> Result<()>;

    /// Called during `destroy()`, and when `init` reported permanent
    /// unavailability.
    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// A resolved dispatch: the target handler and the filters in front of it.
pub(crate) struct Invocation {
    pub handler: Arc<HandlerEnvironment>,
    pub filters: Vec<Arc<FilterEnvironment>>,
    pub servlet_path: String,
    pub path_info: Option<String>,
}

impl Invocation {
    /// True when the handler and every filter in the chain support async.
    pub fn async_supported(&self) -> bool {
        self.handler.is_async_supported() && self.filters.iter().all(|f| f.is_async_supported())
    }

    pub fn run(&self, request: &Request, response: &Response, ctx: &ServiceContext<'_>) -> Result<()> {
        debug!(
            request_id = %request.id(),
            handler_name = %self.handler.name(),
            dispatcher_type = %request.dispatcher_type(),
            servlet_path = %request.servlet_path(),
            filters = self.filters.len(),
            "Invoking handler chain"
        );
        FilterChain::new(&self.filters, &self.handler, ctx).do_filter(request, response)
    }
}

/// Call the handler at the end of a chain.
///
/// An `Unavailable` error returned by the handler is recorded on its
/// environment, so later dispatches fail fast until it recovers.
pub(crate) fn invoke_handler(
    env: &HandlerEnvironment,
    request: &Request,
    response: &Response,
    ctx: &ServiceContext<'_>,
) -> Result<()> {
    if let Some(err) = env.unavailable_error() {
        debug!(handler_name = %env.name(), error = %err, "Handler unavailable");
        return Err(err);
    }
    let handler = env.instance().ok_or_else(|| {
        ContainerError::unavailable("handler is not initialized").attributed_to(env.name())
    })?;
    handler.service(request, response, ctx).map_err(|err| {
        if err.is_unavailable() {
            env.set_availability(Availability::from_error(&err));
        }
        err.attributed_to(env.name())
    })
}
