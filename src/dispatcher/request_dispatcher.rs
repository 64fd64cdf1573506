use std::fmt;

use serde_json::Value;
use tracing::{debug, info};

use super::context::{CurrentRequest, ServiceContext};
use crate::container::Container;
use crate::error::{ContainerError, Result};
use crate::exchange::attributes::{PathAttributeNames, ASYNC, FORWARD, INCLUDE};
use crate::exchange::{parse_query_string, split_target, DispatcherType, Request, RequestKind, Response};

/// What a dispatcher targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    /// A path, optionally with a query string (`/b?x=9`)
    Path(String),
    /// A handler name
    Named(String),
}

impl fmt::Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchTarget::Path(path) => f.write_str(path),
            DispatchTarget::Named(name) => write!(f, "named:{name}"),
        }
    }
}

/// Releases a decorated request on every exit path.
struct Released(Request);

impl Drop for Released {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Where an async dispatch invokes, where it reads the previous path from,
/// and which dispatch wrapper receives the new path.
struct AsyncSplice {
    invoke: Request,
    previous: Request,
    dispatch: Request,
}

/// Performs forward, include and async dispatch to one target.
///
/// Obtained from `Container::request_dispatcher`, `Container::named_dispatcher`
/// or the same methods on [`ServiceContext`].
#[derive(Clone)]
pub struct RequestDispatcher<'a> {
    container: &'a Container,
    target: DispatchTarget,
    current: Option<&'a CurrentRequest>,
}

impl<'a> RequestDispatcher<'a> {
    pub(crate) fn new(container: &'a Container, target: DispatchTarget) -> Self {
        Self {
            container,
            target,
            current: None,
        }
    }

    pub(crate) fn with_current(mut self, current: Option<&'a CurrentRequest>) -> Self {
        self.current = current;
        self
    }

    #[must_use]
    pub fn target(&self) -> &DispatchTarget {
        &self.target
    }

    fn context(&self) -> ServiceContext<'a> {
        ServiceContext::new(self.container, self.current)
    }

    /// Hand the exchange over to the target.
    ///
    /// The response buffer is reset before the target runs and flushed once
    /// after it returns successfully. The target sees a decorated request
    /// with dispatcher type `FORWARD`, the target path and the `FORWARD_*`
    /// attributes of the first forward in a chain. Its
    /// [`Request::previous_request`] is `request`.
    pub fn forward(&self, request: &Request, response: &Response) -> Result<()> {
        let invocation = self.container.invocation(DispatcherType::Forward, &self.target)?;
        response.reset_buffer()?;

        let forwarded = Request::dispatch_wrapper(request, request.is_http());
        let _released = Released(forwarded.clone());
        let forward_values = match &self.target {
            DispatchTarget::Path(_) => forward_attribute_values(request),
            DispatchTarget::Named(_) => Vec::new(),
        };
        let context_path = request.context_path();
        let async_supported = request.is_async_supported();
        let target = self.target.clone();
        forwarded.update_dispatch(|d| {
            d.dispatcher_type = Some(DispatcherType::Forward);
            d.set_previous(request);
            d.context_path = Some(context_path.clone());
            d.async_supported = Some(async_supported);
            match &target {
                DispatchTarget::Path(path) => {
                    for (name, value) in forward_values {
                        if let Some(value) = value {
                            d.attributes.insert(name.to_string(), Value::String(value));
                        }
                    }
                    let (servlet_path, query) = split_target(path);
                    d.servlet_path = Some(servlet_path.to_string());
                    d.path_info = Some(None);
                    d.query_string = Some(query.map(str::to_string));
                    d.request_uri = Some(format!("{context_path}{servlet_path}"));
                    if let Some(query) = query {
                        d.parameters.extend(parse_query_string(query));
                    }
                }
                DispatchTarget::Named(name) => {
                    d.servlet_path = Some(format!("/{name}"));
                }
            }
        })?;

        debug!(
            request_id = %request.id(),
            forwarded_id = %forwarded.id(),
            handler_name = %invocation.handler.name(),
            target = %self.target,
            "Forwarding request"
        );

        {
            let _current = self.current.map(|holder| holder.replace(&forwarded));
            let _link = self.container.links().scoped(&forwarded, response);
            invocation.run(&forwarded, response, &self.context())?;
        }

        response.flush_buffer();
        Ok(())
    }

    /// Run the target and append its output to the response.
    ///
    /// The response buffer is neither reset nor flushed. The target sees a
    /// decorated request with dispatcher type `INCLUDE` whose `INCLUDE_*`
    /// attributes mirror the including request's current path.
    pub fn include(&self, request: &Request, response: &Response) -> Result<()> {
        let invocation = self.container.invocation(DispatcherType::Include, &self.target)?;

        let included = Request::dispatch_wrapper(request, request.is_http());
        let _released = Released(included.clone());
        let include_values = current_path_values(request, &INCLUDE);
        let target = self.target.clone();
        included.update_dispatch(|d| {
            d.dispatcher_type = Some(DispatcherType::Include);
            for (name, value) in include_values {
                if let Some(value) = value {
                    d.attributes.insert(name.to_string(), Value::String(value));
                }
            }
            d.path_info = Some(None);
            d.query_string = Some(None);
            match &target {
                DispatchTarget::Path(path) => {
                    let (servlet_path, query) = split_target(path);
                    d.servlet_path = Some(servlet_path.to_string());
                    if let Some(query) = query {
                        d.parameters.extend(parse_query_string(query));
                    }
                }
                DispatchTarget::Named(name) => {
                    d.servlet_path = Some(format!("/{name}"));
                }
            }
        })?;

        debug!(
            request_id = %request.id(),
            included_id = %included.id(),
            handler_name = %invocation.handler.name(),
            target = %self.target,
            "Including target"
        );

        let _link = self.container.links().scoped(&included, response);
        invocation.run(&included, response, &self.context())
    }

    /// Re-dispatch an async request to the target.
    ///
    /// `wrapper` is the dispatch wrapper an async subsystem built around the
    /// request that started async processing (see
    /// [`Request::async_dispatch_wrapper`]). When that request is an
    /// application wrapper, the engine's wrapper is spliced underneath it so
    /// the application wrapper stays the head of the chain.
    ///
    /// The response buffer is neither reset nor flushed.
    pub fn dispatch_async(&self, wrapper: &Request, response: &Response) -> Result<()> {
        let invocation = self.container.invocation(DispatcherType::Async, &self.target)?;
        let splice = splice_async(wrapper)?;

        let async_values = forward_values_in(&splice.previous, &ASYNC);
        let below = wrapped_or_err(&splice.dispatch)?;
        let previous_query = splice.previous.query_string();
        let context_path = self.container.context_path().to_string();
        let target = self.target.clone();
        splice.dispatch.update_dispatch(|d| {
            d.dispatcher_type = Some(DispatcherType::Async);
            match &target {
                DispatchTarget::Path(path) => {
                    for (name, value) in async_values {
                        if let Some(value) = value {
                            d.attributes.insert(name.to_string(), Value::String(value));
                        }
                    }
                    let (servlet_path, query) = split_target(path);
                    d.servlet_path = Some(servlet_path.to_string());
                    d.path_info = Some(None);
                    match query {
                        Some(query) => {
                            d.query_string = Some(Some(query.to_string()));
                            d.parameters.extend(parse_query_string(query));
                        }
                        None => d.query_string = Some(previous_query.clone()),
                    }
                    d.request_uri = Some(format!("{context_path}{servlet_path}"));
                    d.set_previous(&below);
                }
                DispatchTarget::Named(name) => {
                    d.servlet_path = Some(format!("/{name}"));
                }
            }
        })?;

        info!(
            request_id = %splice.invoke.id(),
            wrapper_id = %splice.dispatch.id(),
            handler_name = %invocation.handler.name(),
            target = %self.target,
            "Async dispatch"
        );

        let _link = self.container.links().scoped(&splice.invoke, response);
        invocation.run(&splice.invoke, response, &self.context())
    }
}

/// Rewire the chain below `wrapper` for async dispatch.
fn splice_async(wrapper: &Request) -> Result<AsyncSplice> {
    let start = wrapper.wrapped().ok_or_else(|| {
        ContainerError::AsyncWrapperChain(format!(
            "request {} is not an async dispatch wrapper",
            wrapper.id()
        ))
    })?;

    match (wrapper.kind(), start.kind()) {
        // Plain exchange or an earlier dispatch: the wrapper is the head.
        (
            RequestKind::HttpDispatchWrapper,
            RequestKind::Exchange | RequestKind::HttpDispatchWrapper | RequestKind::DispatchWrapper,
        ) => Ok(AsyncSplice {
            invoke: wrapper.clone(),
            previous: wrapper.clone(),
            dispatch: wrapper.clone(),
        }),
        // wrapper -> app -> inner  becomes  app -> wrapper -> inner
        (RequestKind::HttpDispatchWrapper, RequestKind::HttpApplicationWrapper) => {
            let inner = wrapped_or_err(&start)?;
            wrapper.set_wrapped(&inner)?;
            start.set_wrapped(wrapper)?;
            debug!(
                application_wrapper = %start.id(),
                dispatch_wrapper = %wrapper.id(),
                "Spliced dispatch wrapper under application wrapper"
            );
            Ok(AsyncSplice {
                invoke: start.clone(),
                previous: start,
                dispatch: wrapper.clone(),
            })
        }
        // wrapper -> app -> inner ... http  becomes  app -> fresh -> inner ... http
        (RequestKind::DispatchWrapper, kind) if kind.is_application_wrapper() => {
            let inner = wrapped_or_err(&start)?;
            let http = inner.find_http().ok_or_else(|| {
                ContainerError::AsyncWrapperChain(format!(
                    "no HTTP request below application wrapper {}",
                    start.id()
                ))
            })?;
            let fresh = Request::dispatch_wrapper(&inner, true);
            start.set_wrapped(&fresh)?;
            debug!(
                application_wrapper = %start.id(),
                dispatch_wrapper = %fresh.id(),
                http_request = %http.id(),
                "Spliced fresh HTTP dispatch wrapper under non-HTTP application wrapper"
            );
            Ok(AsyncSplice {
                invoke: start,
                previous: http,
                dispatch: fresh,
            })
        }
        (wrapper_kind, start_kind) => Err(ContainerError::AsyncWrapperChain(format!(
            "unsupported chain: {wrapper_kind:?} around {start_kind:?}"
        ))),
    }
}

fn wrapped_or_err(request: &Request) -> Result<Request> {
    request.wrapped().ok_or_else(|| {
        ContainerError::AsyncWrapperChain(format!("request {} wraps nothing", request.id()))
    })
}

/// `FORWARD_*` values: the request's own forward attributes when it was
/// already forwarded, its current path fields otherwise.
fn forward_attribute_values(request: &Request) -> Vec<(&'static str, Option<String>)> {
    forward_values_in(request, &FORWARD)
}

fn forward_values_in(
    request: &Request,
    names: &PathAttributeNames,
) -> Vec<(&'static str, Option<String>)> {
    // request_uri and servlet_path are always set by an earlier dispatch;
    // when present the whole set is taken as-is, absent entries included.
    let dispatched_before = request.attribute(names.request_uri).is_some()
        || request.attribute(names.servlet_path).is_some();
    if !dispatched_before {
        return current_path_values(request, names);
    }
    names
        .all()
        .into_iter()
        .map(|name| {
            let value = match request.attribute(name) {
                Some(Value::String(existing)) => Some(existing),
                Some(Value::Null) | None => None,
                Some(other) => Some(other.to_string()),
            };
            (name, value)
        })
        .collect()
}

fn current_path_values(
    request: &Request,
    names: &PathAttributeNames,
) -> Vec<(&'static str, Option<String>)> {
    vec![
        (names.context_path, Some(request.context_path())),
        (names.path_info, request.path_info()),
        (names.query_string, request.query_string()),
        (names.request_uri, Some(request.request_uri())),
        (names.servlet_path, Some(request.servlet_path())),
    ]
}
