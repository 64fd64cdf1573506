use std::time::Instant;

use tracing::{field, info_span, warn};

use super::Filter;
use crate::dispatcher::FilterChain;
use crate::error::Result;
use crate::exchange::{Request, Response};

/// Filter that wraps the rest of the chain in a `dispatch` span.
///
/// The span carries the request id, method, dispatcher type, servlet path
/// and target handler; `status` and `latency_ms` are recorded when the chain
/// returns. Failures are logged at `warn` inside the span and then returned
/// unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFilter;

impl Filter for TracingFilter {
    fn do_filter(&self, request: &Request, response: &Response, chain: FilterChain<'_>) -> Result<()> {
        let span = info_span!(
            "dispatch",
            request_id = %request.id(),
            method = %request.method(),
            dispatcher_type = %request.dispatcher_type(),
            servlet_path = %request.servlet_path(),
            handler = %chain.handler_name(),
            status = field::Empty,
            latency_ms = field::Empty,
        );
        let _entered = span.enter();
        let start = Instant::now();

        let result = chain.do_filter(request, response);

        span.record("status", response.status());
        span.record("latency_ms", start.elapsed().as_millis() as u64);
        if let Err(err) = &result {
            warn!(error = %err, "Dispatch failed");
        }
        result
    }
}
