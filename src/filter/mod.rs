//! # Filter Module
//!
//! Filters wrap handler invocation for cross-cutting processing.
//!
//! A filter receives the request, the response and the rest of the chain.
//! It may inspect or decorate the request, short-circuit by returning
//! without calling [`FilterChain::do_filter`], or post-process after the
//! chain returns:
//!
//! ```rust,ignore
//! impl Filter for Stamp {
//!     fn do_filter(&self, req: &Request, resp: &Response, chain: FilterChain<'_>) -> Result<()> {
//!         resp.set_header("x-stamp", "1");
//!         chain.do_filter(req, resp)
//!     }
//! }
//! ```
//!
//! Which filters run for a dispatch is decided by the resolver from the
//! filter mappings and the dispatcher type.
//!
//! ## Built-in filters
//!
//! - [`TracingFilter`]: opens a `dispatch` span around the rest of the chain
//!   and records status and latency
//! - [`MetricsFilter`]: lock-free request, failure and latency counters
//!
//! [`FilterChain::do_filter`]: crate::dispatcher::FilterChain::do_filter

mod core;
mod metrics;
mod tracing;

pub use self::core::Filter;
pub use self::metrics::MetricsFilter;
pub use self::tracing::TracingFilter;
