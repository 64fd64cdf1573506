//! Filter chain links.
//!
//! A [`FilterChain`] is a borrowed view over the filters still to run and
//! the handler at the end. Each call to `do_filter` peels one filter off the
//! front and hands the remainder to it, so the chain never allocates.

use std::sync::Arc;

use super::context::ServiceContext;
use super::core::invoke_handler;
use crate::error::{ContainerError, Result};
use crate::exchange::{Request, Response};
use crate::registry::{FilterEnvironment, HandlerEnvironment};

/// The rest of a filter chain, ending in the target handler.
///
/// Passed by value to [`Filter::do_filter`](crate::filter::Filter::do_filter);
/// calling [`do_filter`](Self::do_filter) consumes it, so each link runs at
/// most once.
pub struct FilterChain<'a> {
    filters: &'a [Arc<FilterEnvironment>],
    handler: &'a HandlerEnvironment,
    ctx: &'a ServiceContext<'a>,
}

impl<'a> FilterChain<'a> {
    pub(crate) fn new(
        filters: &'a [Arc<FilterEnvironment>],
        handler: &'a HandlerEnvironment,
        ctx: &'a ServiceContext<'a>,
    ) -> Self {
        Self {
            filters,
            handler,
            ctx,
        }
    }

    /// Invoke the next filter, or the handler when no filters remain.
    pub fn do_filter(self, request: &Request, response: &Response) -> Result<()> {
        let Some((env, rest)) = self.filters.split_first() else {
            return invoke_handler(self.handler, request, response, self.ctx);
        };
        if let Some(err) = env.unavailable_error() {
            return Err(err);
        }
        let filter = env.instance().ok_or_else(|| {
            ContainerError::unavailable("filter is not initialized").attributed_to(env.name())
        })?;
        let next = FilterChain {
            filters: rest,
            handler: self.handler,
            ctx: self.ctx,
        };
        filter
            .do_filter(request, response, next)
            .map_err(|err| err.attributed_to(env.name()))
    }

    /// Name of the handler at the end of the chain
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    /// Filters still to run before the handler
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn context(&self) -> &'a ServiceContext<'a> {
        self.ctx
    }
}
