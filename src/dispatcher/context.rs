use std::sync::Arc;

use arc_swap::ArcSwap;

use super::request_dispatcher::RequestDispatcher;
use crate::container::Container;
use crate::error::Result;
use crate::exchange::Request;

/// Holder for the request a worker is currently servicing.
///
/// Created once per top-level `service` call. Forward points it at the
/// forwarded request for the duration of the forward and restores the
/// original afterwards.
pub struct CurrentRequest {
    slot: ArcSwap<Request>,
}

impl CurrentRequest {
    #[must_use]
    pub fn new(request: &Request) -> Self {
        Self {
            slot: ArcSwap::from_pointee(request.clone()),
        }
    }

    #[must_use]
    pub fn get(&self) -> Request {
        Request::clone(&self.slot.load())
    }

    /// Point the holder at `request` until the returned guard drops.
    pub(crate) fn replace(&self, request: &Request) -> RestoreCurrent<'_> {
        let previous = self.slot.swap(Arc::new(request.clone()));
        RestoreCurrent {
            holder: self,
            previous: Some(previous),
        }
    }
}

pub(crate) struct RestoreCurrent<'a> {
    holder: &'a CurrentRequest,
    previous: Option<Arc<Request>>,
}

impl Drop for RestoreCurrent<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.holder.slot.store(previous);
        }
    }
}

/// What a handler or filter can reach while servicing.
///
/// Replaces any global "current request" lookup: the container and the
/// current-request holder travel with the call.
#[derive(Clone, Copy)]
pub struct ServiceContext<'a> {
    container: &'a Container,
    current: Option<&'a CurrentRequest>,
}

impl<'a> ServiceContext<'a> {
    pub(crate) fn new(container: &'a Container, current: Option<&'a CurrentRequest>) -> Self {
        Self { container, current }
    }

    #[must_use]
    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// The request the servicing worker currently handles, when this call
    /// belongs to a top-level `service`.
    #[must_use]
    pub fn current_request(&self) -> Option<Request> {
        self.current.map(CurrentRequest::get)
    }

    /// Dispatcher for `path` (may carry a query string) that keeps this
    /// context's current-request holder.
    pub fn request_dispatcher(&self, path: &str) -> Result<RequestDispatcher<'a>> {
        Ok(self
            .container
            .request_dispatcher(path)?
            .with_current(self.current))
    }

    /// Dispatcher for the handler registered as `name`.
    pub fn named_dispatcher(&self, name: &str) -> Result<RequestDispatcher<'a>> {
        Ok(self
            .container
            .named_dispatcher(name)?
            .with_current(self.current))
    }
}
