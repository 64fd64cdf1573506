//! Request/response pairing for in-flight exchanges.
//!
//! Keyed by response identity. Each top-level `service` call owns one entry;
//! nested dispatches temporarily re-point the entry at the decorated request
//! and restore the previous pairing when they return.

use dashmap::DashMap;
use tracing::debug;

use crate::exchange::{Request, Response};
use crate::ids::ResponseId;

/// Concurrent response → request table
#[derive(Default)]
pub struct LinkTable {
    entries: DashMap<ResponseId, Request>,
}

impl LinkTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair `request` with `response` and stamp the request with its
    /// counterpart. Returns the request previously paired with `response`.
    pub fn link(&self, request: &Request, response: &Response) -> Option<Request> {
        request.set_linked_response(Some(response.clone()));
        let previous = self.entries.insert(response.id(), request.clone());
        debug!(
            request_id = %request.id(),
            response_id = %response.id(),
            relinked = previous.is_some(),
            "Linked request and response"
        );
        previous
    }

    /// Remove the pairing for `response` in both directions.
    pub fn unlink(&self, response: &Response) -> Option<Request> {
        let removed = self.entries.remove(&response.id()).map(|(_, request)| request);
        if let Some(request) = &removed {
            request.set_linked_response(None);
            debug!(
                request_id = %request.id(),
                response_id = %response.id(),
                "Unlinked request and response"
            );
        }
        removed
    }

    #[must_use]
    pub fn request_for(&self, response: &Response) -> Option<Request> {
        self.entries
            .get(&response.id())
            .map(|entry| entry.value().clone())
    }

    /// The response stamped on `request` (or anything it wraps), provided
    /// the pairing is still live.
    #[must_use]
    pub fn response_for(&self, request: &Request) -> Option<Response> {
        request
            .linked_response()
            .filter(|response| self.entries.contains_key(&response.id()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Link for the lifetime of the returned guard. On drop the previous
    /// pairing is restored, or the entry removed when there was none.
    pub(crate) fn scoped<'a>(&'a self, request: &Request, response: &Response) -> LinkGuard<'a> {
        let previous = self.link(request, response);
        LinkGuard {
            table: self,
            request: request.clone(),
            response: response.clone(),
            previous,
        }
    }
}

pub(crate) struct LinkGuard<'a> {
    table: &'a LinkTable,
    request: Request,
    response: Response,
    previous: Option<Request>,
}

impl Drop for LinkGuard<'_> {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(previous) => {
                self.request.set_linked_response(None);
                self.table.link(&previous, &self.response);
            }
            None => {
                self.table.unlink(&self.response);
            }
        }
    }
}
