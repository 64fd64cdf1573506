use tracing::{debug, info};

use super::core::Container;
use crate::dispatcher::{CurrentRequest, DispatchTarget, Invocation, RequestDispatcher, ServiceContext};
use crate::error::{ContainerError, Result};
use crate::exchange::{split_target, DispatcherType, Request, RequestKind, Response};
use crate::lifecycle::Operation;
use crate::resolver::InvocationDescriptor;

impl Container {
    /// Service one top-level exchange.
    ///
    /// Links the pair, notifies request listeners, resolves the servlet
    /// path and runs the filter chain. Request-destroyed listeners fire and
    /// the pair is unlinked on every exit path.
    pub fn service(&self, request: &Request, response: &Response) -> Result<()> {
        self.check(Operation::Service)?;
        if request.kind() != RequestKind::Exchange {
            return Err(ContainerError::InvalidRequest(format!(
                "request {} is a {:?}, not an HTTP exchange",
                request.id(),
                request.kind()
            )));
        }

        let _link = self.links.scoped(request, response);
        self.listeners.request_initialized(request);
        let result = self.dispatch_request(request, response);
        self.listeners.request_destroyed(request);

        match &result {
            Ok(()) => debug!(request_id = %request.id(), status = response.status(), "Request serviced"),
            Err(err) => info!(request_id = %request.id(), error = %err, "Request failed"),
        }
        result
    }

    fn dispatch_request(&self, request: &Request, response: &Response) -> Result<()> {
        let servlet_path = request.servlet_path();
        let path_info = request.path_info();
        let invocation =
            self.resolve_path(DispatcherType::Request, &servlet_path, path_info.as_deref())?;
        request.apply_match(&invocation.servlet_path, invocation.path_info.as_deref());
        request.set_async_supported(invocation.async_supported());

        info!(
            request_id = %request.id(),
            method = %request.method(),
            servlet_path = %invocation.servlet_path,
            handler_name = %invocation.handler.name(),
            "Request dispatched to handler"
        );

        let current = CurrentRequest::new(request);
        let ctx = ServiceContext::new(self, Some(&current));
        invocation.run(request, response, &ctx)
    }

    /// Resolve a dispatch target into a runnable invocation for
    /// `dispatcher_type`.
    pub(crate) fn invocation(
        &self,
        dispatcher_type: DispatcherType,
        target: &DispatchTarget,
    ) -> Result<Invocation> {
        match target {
            DispatchTarget::Path(path) => {
                let (servlet_path, _) = split_target(path);
                self.resolve_path(dispatcher_type, servlet_path, None)
            }
            DispatchTarget::Named(name) => {
                let descriptor = self
                    .resolver
                    .resolve_named(dispatcher_type, name)
                    .ok_or_else(|| ContainerError::NoTarget(name.clone()))?;
                self.materialize(descriptor)
            }
        }
    }

    fn resolve_path(
        &self,
        dispatcher_type: DispatcherType,
        servlet_path: &str,
        path_info: Option<&str>,
    ) -> Result<Invocation> {
        let descriptor = self
            .resolver
            .resolve(dispatcher_type, servlet_path, path_info)
            .ok_or_else(|| {
                ContainerError::NoTarget(format!("{servlet_path}{}", path_info.unwrap_or_default()))
            })?;
        self.materialize(descriptor)
    }

    fn materialize(&self, descriptor: InvocationDescriptor) -> Result<Invocation> {
        let handler = self
            .handlers
            .get(&descriptor.handler_name)
            .ok_or_else(|| ContainerError::NoTarget(descriptor.handler_name.clone()))?;
        let filters = descriptor
            .filter_names
            .iter()
            .filter_map(|name| {
                let env = self.filters.get(name);
                if env.is_none() {
                    debug!(filter_name = %name, "Mapped filter is not registered");
                }
                env
            })
            .collect();
        Ok(Invocation {
            handler,
            filters,
            servlet_path: descriptor.servlet_path,
            path_info: descriptor.path_info,
        })
    }

    /// Dispatcher for a path relative to the context root, optionally with
    /// a query string.
    pub fn request_dispatcher(&self, path: &str) -> Result<RequestDispatcher<'_>> {
        if !path.starts_with('/') {
            return Err(ContainerError::InvalidArgument(format!(
                "dispatch path '{path}' must start with '/'"
            )));
        }
        let target = DispatchTarget::Path(path.to_string());
        self.invocation(DispatcherType::Request, &target)?;
        Ok(RequestDispatcher::new(self, target))
    }

    /// Dispatcher for the handler registered as `name`.
    pub fn named_dispatcher(&self, name: &str) -> Result<RequestDispatcher<'_>> {
        if !self.handlers.contains(name) {
            return Err(ContainerError::NoTarget(name.to_string()));
        }
        Ok(RequestDispatcher::new(
            self,
            DispatchTarget::Named(name.to_string()),
        ))
    }

    /// The request currently paired with `response`.
    #[must_use]
    pub fn request_for(&self, response: &Response) -> Option<Request> {
        self.links.request_for(response)
    }

    /// The response currently paired with `request`.
    #[must_use]
    pub fn response_for(&self, request: &Request) -> Option<Response> {
        self.links.response_for(request)
    }
}
