use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::Filter;
use crate::dispatcher::FilterChain;
use crate::error::Result;
use crate::exchange::{Request, Response};

/// Filter that counts dispatches through it.
///
/// Tracks request count, failure count and average latency. All counters
/// are atomics updated with `Ordering::Relaxed`; values are eventually
/// consistent and never block a request.
#[derive(Debug, Default)]
pub struct MetricsFilter {
    request_count: AtomicUsize,
    failure_count: AtomicUsize,
    total_latency_ns: AtomicU64,
}

impl MetricsFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    /// Total number of dispatches that entered the filter
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    #[must_use]
    /// Dispatches whose chain returned an error
    pub fn failure_count(&self) -> usize {
        self.failure_count.load(Ordering::Relaxed)
    }

    #[must_use]
    /// Mean time spent in the rest of the chain; zero before the first request.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }
}

impl Filter for MetricsFilter {
    fn do_filter(&self, request: &Request, response: &Response, chain: FilterChain<'_>) -> Result<()> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let result = chain.do_filter(request, response);
        self.total_latency_ns
            .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        if result.is_err() {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        result
    }
}
