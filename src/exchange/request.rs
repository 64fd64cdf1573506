use std::fmt;
use std::sync::{Arc, Weak};

use http::Method;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use super::params::{names_of, parse_query_string, split_target, values_of, HeaderVec, ParamVec};
use super::{DispatcherType, Response};
use crate::error::{ContainerError, Result};
use crate::ids::RequestId;

/// What a node in a request chain is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// The plain request handed to `Container::service`
    Exchange,
    /// Plain request without HTTP semantics; the container never services it
    PlainExchange,
    /// Engine dispatch wrapper with HTTP semantics
    HttpDispatchWrapper,
    /// Engine dispatch wrapper without HTTP semantics
    DispatchWrapper,
    /// Application decorator with HTTP semantics
    HttpApplicationWrapper,
    /// Application decorator without HTTP semantics
    ApplicationWrapper,
}

impl RequestKind {
    #[must_use]
    pub fn is_http(self) -> bool {
        matches!(
            self,
            RequestKind::Exchange
                | RequestKind::HttpDispatchWrapper
                | RequestKind::HttpApplicationWrapper
        )
    }

    #[must_use]
    pub fn is_dispatch_wrapper(self) -> bool {
        matches!(
            self,
            RequestKind::HttpDispatchWrapper | RequestKind::DispatchWrapper
        )
    }

    #[must_use]
    pub fn is_application_wrapper(self) -> bool {
        matches!(
            self,
            RequestKind::HttpApplicationWrapper | RequestKind::ApplicationWrapper
        )
    }
}

/// Hook for application-supplied request wrappers.
///
/// Every method receives the wrapped request and by default delegates to it.
/// Override only what the wrapper changes.
pub trait RequestDecorator: Send + Sync {
    fn servlet_path(&self, inner: &Request) -> String {
        inner.servlet_path()
    }

    fn path_info(&self, inner: &Request) -> Option<String> {
        inner.path_info()
    }

    fn query_string(&self, inner: &Request) -> Option<String> {
        inner.query_string()
    }

    fn request_uri(&self, inner: &Request) -> String {
        inner.request_uri()
    }

    fn header(&self, name: &str, inner: &Request) -> Option<String> {
        inner.header(name)
    }

    fn attribute(&self, name: &str, inner: &Request) -> Option<Value> {
        inner.attribute(name)
    }

    fn parameter_values(&self, name: &str, inner: &Request) -> Vec<String> {
        inner.parameter_values(name)
    }

    fn parameter_names(&self, inner: &Request) -> Vec<String> {
        inner.parameter_names()
    }
}

/// Decorator that changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl RequestDecorator for PassThrough {}

struct ExchangeState {
    http: bool,
    method: Method,
    context_path: String,
    servlet_path: String,
    path_info: Option<String>,
    query_string: Option<String>,
    request_uri: String,
    headers: HeaderVec,
    parameters: ParamVec,
    attributes: IndexMap<String, Value>,
    dispatcher_type: DispatcherType,
    async_supported: bool,
}

/// Overrides carried by an engine dispatch wrapper. `None` inherits from the
/// wrapped request.
#[derive(Default)]
pub(crate) struct DispatchState {
    pub dispatcher_type: Option<DispatcherType>,
    pub context_path: Option<String>,
    pub servlet_path: Option<String>,
    pub path_info: Option<Option<String>>,
    pub query_string: Option<Option<String>>,
    pub request_uri: Option<String>,
    pub attributes: IndexMap<String, Value>,
    pub parameters: ParamVec,
    pub async_supported: Option<bool>,
    previous: Option<Weak<RequestNode>>,
    released: bool,
}

impl DispatchState {
    /// Record the request this dispatch came from.
    pub fn set_previous(&mut self, request: &Request) {
        self.previous = Some(Arc::downgrade(&request.node));
    }
}

enum NodeBody {
    Exchange(RwLock<ExchangeState>),
    Dispatch {
        http: bool,
        wrapped: RwLock<Request>,
        state: RwLock<DispatchState>,
    },
    Application {
        http: bool,
        wrapped: RwLock<Request>,
        decorator: Arc<dyn RequestDecorator>,
    },
}

struct RequestNode {
    id: RequestId,
    body: NodeBody,
    linked_response: RwLock<Option<Response>>,
}

/// Shared handle to one node of a request chain.
///
/// Clones share the node; equality is identity.
#[derive(Clone)]
pub struct Request {
    node: Arc<RequestNode>,
}

impl Request {
    /// Start building a plain exchange.
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    fn from_body(body: NodeBody) -> Self {
        Self {
            node: Arc::new(RequestNode {
                id: RequestId::new(),
                body,
                linked_response: RwLock::new(None),
            }),
        }
    }

    /// Wrap `inner` in an application decorator with HTTP semantics.
    #[must_use]
    pub fn wrap(inner: &Request, decorator: Arc<dyn RequestDecorator>) -> Request {
        Self::from_body(NodeBody::Application {
            http: true,
            wrapped: RwLock::new(inner.clone()),
            decorator,
        })
    }

    /// Wrap `inner` in an application decorator without HTTP semantics.
    #[must_use]
    pub fn wrap_non_http(inner: &Request, decorator: Arc<dyn RequestDecorator>) -> Request {
        Self::from_body(NodeBody::Application {
            http: false,
            wrapped: RwLock::new(inner.clone()),
            decorator,
        })
    }

    pub(crate) fn dispatch_wrapper(inner: &Request, http: bool) -> Request {
        Self::from_body(NodeBody::Dispatch {
            http,
            wrapped: RwLock::new(inner.clone()),
            state: RwLock::new(DispatchState::default()),
        })
    }

    /// The wrapper an async subsystem builds before re-dispatching.
    ///
    /// The wrapper has HTTP semantics exactly when `start` has.
    #[must_use]
    pub fn async_dispatch_wrapper(start: &Request) -> Request {
        Self::dispatch_wrapper(start, start.is_http())
    }

    #[must_use]
    pub fn id(&self) -> RequestId {
        self.node.id
    }

    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match &self.node.body {
            NodeBody::Exchange(state) if state.read().http => RequestKind::Exchange,
            NodeBody::Exchange(_) => RequestKind::PlainExchange,
            NodeBody::Dispatch { http: true, .. } => RequestKind::HttpDispatchWrapper,
            NodeBody::Dispatch { http: false, .. } => RequestKind::DispatchWrapper,
            NodeBody::Application { http: true, .. } => RequestKind::HttpApplicationWrapper,
            NodeBody::Application { http: false, .. } => RequestKind::ApplicationWrapper,
        }
    }

    #[must_use]
    pub fn is_http(&self) -> bool {
        self.kind().is_http()
    }

    /// True when both handles point at the same node.
    #[must_use]
    pub fn same(&self, other: &Request) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// The request this node wraps; `None` for an exchange.
    #[must_use]
    pub fn wrapped(&self) -> Option<Request> {
        match &self.node.body {
            NodeBody::Exchange(_) => None,
            NodeBody::Dispatch { wrapped, .. } | NodeBody::Application { wrapped, .. } => {
                Some(wrapped.read().clone())
            }
        }
    }

    /// Re-point a wrapper at a different inner request.
    ///
    /// Fails for an exchange, and when `inner` already reaches this node.
    pub fn set_wrapped(&self, inner: &Request) -> Result<()> {
        let slot = match &self.node.body {
            NodeBody::Exchange(_) => {
                return Err(ContainerError::InvalidArgument(
                    "an exchange does not wrap another request".to_string(),
                ))
            }
            NodeBody::Dispatch { wrapped, .. } | NodeBody::Application { wrapped, .. } => wrapped,
        };
        if inner.chain().iter().any(|r| r.same(self)) {
            return Err(ContainerError::InvalidArgument(
                "wrapping would create a cycle".to_string(),
            ));
        }
        *slot.write() = inner.clone();
        Ok(())
    }

    /// This node followed by every node it transitively wraps.
    #[must_use]
    pub fn chain(&self) -> Vec<Request> {
        let mut chain = vec![self.clone()];
        let mut current = self.wrapped();
        while let Some(next) = current {
            current = next.wrapped();
            chain.push(next);
        }
        chain
    }

    /// The exchange at the bottom of the chain.
    #[must_use]
    pub fn exchange(&self) -> Request {
        let mut current = self.clone();
        while let Some(next) = current.wrapped() {
            current = next;
        }
        current
    }

    /// First node, starting with this one, that has HTTP semantics.
    #[must_use]
    pub fn find_http(&self) -> Option<Request> {
        self.chain().into_iter().find(Request::is_http)
    }

    fn read<T>(
        &self,
        exchange: impl FnOnce(&ExchangeState) -> T,
        own: impl FnOnce(&DispatchState) -> Option<T>,
        decorated: impl FnOnce(&dyn RequestDecorator, &Request) -> T,
        inherited: fn(&Request) -> T,
    ) -> T {
        match &self.node.body {
            NodeBody::Exchange(state) => exchange(&*state.read()),
            NodeBody::Dispatch { state, wrapped, .. } => {
                if let Some(value) = own(&*state.read()) {
                    return value;
                }
                let inner = wrapped.read().clone();
                inherited(&inner)
            }
            NodeBody::Application {
                decorator, wrapped, ..
            } => {
                let inner = wrapped.read().clone();
                decorated(decorator.as_ref(), &inner)
            }
        }
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.read(
            |s| s.method.clone(),
            |_| None,
            |_, inner| inner.method(),
            Request::method,
        )
    }

    #[must_use]
    pub fn dispatcher_type(&self) -> DispatcherType {
        self.read(
            |s| s.dispatcher_type,
            |d| d.dispatcher_type,
            |_, inner| inner.dispatcher_type(),
            Request::dispatcher_type,
        )
    }

    #[must_use]
    pub fn context_path(&self) -> String {
        self.read(
            |s| s.context_path.clone(),
            |d| d.context_path.clone(),
            |_, inner| inner.context_path(),
            Request::context_path,
        )
    }

    #[must_use]
    pub fn servlet_path(&self) -> String {
        self.read(
            |s| s.servlet_path.clone(),
            |d| d.servlet_path.clone(),
            |dec, inner| dec.servlet_path(inner),
            Request::servlet_path,
        )
    }

    #[must_use]
    pub fn path_info(&self) -> Option<String> {
        self.read(
            |s| s.path_info.clone(),
            |d| d.path_info.clone(),
            |dec, inner| dec.path_info(inner),
            Request::path_info,
        )
    }

    #[must_use]
    pub fn query_string(&self) -> Option<String> {
        self.read(
            |s| s.query_string.clone(),
            |d| d.query_string.clone(),
            |dec, inner| dec.query_string(inner),
            Request::query_string,
        )
    }

    #[must_use]
    pub fn request_uri(&self) -> String {
        self.read(
            |s| s.request_uri.clone(),
            |d| d.request_uri.clone(),
            |dec, inner| dec.request_uri(inner),
            Request::request_uri,
        )
    }

    /// First header value for `name` (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        match &self.node.body {
            NodeBody::Exchange(state) => state
                .read()
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.clone()),
            NodeBody::Dispatch { wrapped, .. } => {
                let inner = wrapped.read().clone();
                inner.header(name)
            }
            NodeBody::Application {
                decorator, wrapped, ..
            } => {
                let inner = wrapped.read().clone();
                decorator.header(name, &inner)
            }
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<Value> {
        match &self.node.body {
            NodeBody::Exchange(state) => state.read().attributes.get(name).cloned(),
            NodeBody::Dispatch { state, wrapped, .. } => {
                if let Some(value) = state.read().attributes.get(name) {
                    return Some(value.clone());
                }
                let inner = wrapped.read().clone();
                inner.attribute(name)
            }
            NodeBody::Application {
                decorator, wrapped, ..
            } => {
                let inner = wrapped.read().clone();
                decorator.attribute(name, &inner)
            }
        }
    }

    /// Attribute names visible through this node, own names first.
    #[must_use]
    pub fn attribute_names(&self) -> Vec<String> {
        match &self.node.body {
            NodeBody::Exchange(state) => state.read().attributes.keys().cloned().collect(),
            NodeBody::Dispatch { state, wrapped, .. } => {
                let mut names: Vec<String> = state.read().attributes.keys().cloned().collect();
                let inner = wrapped.read().clone();
                for name in inner.attribute_names() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                names
            }
            NodeBody::Application { wrapped, .. } => {
                let inner = wrapped.read().clone();
                inner.attribute_names()
            }
        }
    }

    /// Set an attribute; `Value::Null` removes it.
    ///
    /// A dispatch wrapper keeps the value when it already owns the name and
    /// otherwise writes through to the wrapped request.
    pub fn set_attribute(&self, name: &str, value: Value) {
        if value.is_null() {
            self.remove_attribute(name);
            return;
        }
        match &self.node.body {
            NodeBody::Exchange(state) => {
                state.write().attributes.insert(name.to_string(), value);
            }
            NodeBody::Dispatch { state, wrapped, .. } => {
                {
                    let mut state = state.write();
                    if let Some(slot) = state.attributes.get_mut(name) {
                        *slot = value;
                        return;
                    }
                }
                let inner = wrapped.read().clone();
                inner.set_attribute(name, value);
            }
            NodeBody::Application { wrapped, .. } => {
                let inner = wrapped.read().clone();
                inner.set_attribute(name, value);
            }
        }
    }

    pub fn remove_attribute(&self, name: &str) -> Option<Value> {
        match &self.node.body {
            NodeBody::Exchange(state) => state.write().attributes.shift_remove(name),
            NodeBody::Dispatch { state, wrapped, .. } => {
                if let Some(old) = state.write().attributes.shift_remove(name) {
                    return Some(old);
                }
                let inner = wrapped.read().clone();
                inner.remove_attribute(name)
            }
            NodeBody::Application { wrapped, .. } => {
                let inner = wrapped.read().clone();
                inner.remove_attribute(name)
            }
        }
    }

    /// First value of parameter `name`.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<String> {
        self.parameter_values(name).into_iter().next()
    }

    /// Every value of parameter `name`. A dispatch wrapper lists its own
    /// values before the wrapped request's.
    #[must_use]
    pub fn parameter_values(&self, name: &str) -> Vec<String> {
        match &self.node.body {
            NodeBody::Exchange(state) => values_of(&state.read().parameters, name),
            NodeBody::Dispatch { state, wrapped, .. } => {
                let mut values = values_of(&state.read().parameters, name);
                let inner = wrapped.read().clone();
                values.extend(inner.parameter_values(name));
                values
            }
            NodeBody::Application {
                decorator, wrapped, ..
            } => {
                let inner = wrapped.read().clone();
                decorator.parameter_values(name, &inner)
            }
        }
    }

    #[must_use]
    pub fn parameter_names(&self) -> Vec<String> {
        match &self.node.body {
            NodeBody::Exchange(state) => names_of(&state.read().parameters),
            NodeBody::Dispatch { state, wrapped, .. } => {
                let mut names = names_of(&state.read().parameters);
                let inner = wrapped.read().clone();
                for name in inner.parameter_names() {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                names
            }
            NodeBody::Application {
                decorator, wrapped, ..
            } => {
                let inner = wrapped.read().clone();
                decorator.parameter_names(&inner)
            }
        }
    }

    #[must_use]
    pub fn is_async_supported(&self) -> bool {
        self.read(
            |s| s.async_supported,
            |d| d.async_supported,
            |_, inner| inner.is_async_supported(),
            Request::is_async_supported,
        )
    }

    pub fn set_async_supported(&self, supported: bool) {
        match &self.node.body {
            NodeBody::Exchange(state) => state.write().async_supported = supported,
            NodeBody::Dispatch { state, .. } => state.write().async_supported = Some(supported),
            NodeBody::Application { wrapped, .. } => {
                let inner = wrapped.read().clone();
                inner.set_async_supported(supported);
            }
        }
    }

    /// The response this request is paired with, looked up down the chain.
    #[must_use]
    pub fn linked_response(&self) -> Option<Response> {
        if let Some(response) = self.node.linked_response.read().clone() {
            return Some(response);
        }
        self.wrapped().and_then(|inner| inner.linked_response())
    }

    pub(crate) fn set_linked_response(&self, response: Option<Response>) {
        *self.node.linked_response.write() = response;
    }

    /// Record the resolver's path split on a plain exchange.
    pub(crate) fn apply_match(&self, servlet_path: &str, path_info: Option<&str>) {
        if let NodeBody::Exchange(state) = &self.node.body {
            let mut state = state.write();
            state.servlet_path = servlet_path.to_string();
            state.path_info = path_info.map(str::to_string);
        }
    }

    /// Apply `update` to this node's dispatch overrides.
    pub(crate) fn update_dispatch(&self, update: impl FnOnce(&mut DispatchState)) -> Result<()> {
        match &self.node.body {
            NodeBody::Dispatch { state, .. } => {
                update(&mut *state.write());
                Ok(())
            }
            _ => Err(ContainerError::InvalidArgument(format!(
                "request {} is not a dispatch wrapper",
                self.id()
            ))),
        }
    }

    /// Drop the wrapper-owned attributes and parameters. Reads fall through
    /// to the wrapped request afterwards.
    pub(crate) fn release(&self) {
        if let NodeBody::Dispatch { state, .. } = &self.node.body {
            let mut state = state.write();
            state.attributes.clear();
            state.parameters.clear();
            state.previous = None;
            state.released = true;
        }
    }

    /// The request a forward or async dispatch came from.
    ///
    /// Application wrappers, includes and released wrappers report what the
    /// request they wrap reports. `None` for an exchange.
    #[must_use]
    pub fn previous_request(&self) -> Option<Request> {
        match &self.node.body {
            NodeBody::Exchange(_) => None,
            NodeBody::Dispatch { state, wrapped, .. } => {
                let previous = state.read().previous.clone();
                match previous {
                    Some(node) => node.upgrade().map(|node| Request { node }),
                    None => wrapped.read().previous_request(),
                }
            }
            NodeBody::Application { wrapped, .. } => wrapped.read().previous_request(),
        }
    }

    /// True once the engine released this dispatch wrapper.
    #[must_use]
    pub fn is_released(&self) -> bool {
        match &self.node.body {
            NodeBody::Dispatch { state, .. } => state.read().released,
            _ => false,
        }
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Request {}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("dispatcher_type", &self.dispatcher_type())
            .field("servlet_path", &self.servlet_path())
            .finish()
    }
}

/// Builder for a plain exchange
#[derive(Debug, Default)]
pub struct RequestBuilder {
    non_http: bool,
    method: Option<Method>,
    context_path: String,
    servlet_path: String,
    path_info: Option<String>,
    query_string: Option<String>,
    request_uri: Option<String>,
    headers: HeaderVec,
    parameters: ParamVec,
    attributes: IndexMap<String, Value>,
    dispatcher_type: DispatcherType,
    async_supported: bool,
}

impl RequestBuilder {
    /// Build a plain request without HTTP semantics.
    #[must_use]
    pub fn non_http(mut self) -> Self {
        self.non_http = true;
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn context_path(mut self, path: impl Into<String>) -> Self {
        self.context_path = path.into();
        self
    }

    #[must_use]
    pub fn servlet_path(mut self, path: impl Into<String>) -> Self {
        self.servlet_path = path.into();
        self
    }

    #[must_use]
    pub fn path_info(mut self, path_info: impl Into<String>) -> Self {
        self.path_info = Some(path_info.into());
        self
    }

    /// Raw query string; parsed into parameters at build time.
    #[must_use]
    pub fn query_string(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query_string = (!query.is_empty()).then_some(query);
        self
    }

    /// Servlet path with an optional embedded query, e.g. `/echo?a=1`.
    #[must_use]
    pub fn path(mut self, target: &str) -> Self {
        let (path, query) = split_target(target);
        self.servlet_path = path.to_string();
        self.query_string = query.map(str::to_string);
        self
    }

    #[must_use]
    pub fn request_uri(mut self, uri: impl Into<String>) -> Self {
        self.request_uri = Some(uri.into());
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn parameter(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parameters.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn dispatcher_type(mut self, dispatcher_type: DispatcherType) -> Self {
        self.dispatcher_type = dispatcher_type;
        self
    }

    #[must_use]
    pub fn async_supported(mut self, supported: bool) -> Self {
        self.async_supported = supported;
        self
    }

    #[must_use]
    pub fn build(self) -> Request {
        let request_uri = self.request_uri.unwrap_or_else(|| {
            format!(
                "{}{}{}",
                self.context_path,
                self.servlet_path,
                self.path_info.as_deref().unwrap_or("")
            )
        });
        let mut parameters = self
            .query_string
            .as_deref()
            .map(parse_query_string)
            .unwrap_or_default();
        parameters.extend(self.parameters);
        Request::from_body(NodeBody::Exchange(RwLock::new(ExchangeState {
            http: !self.non_http,
            method: self.method.unwrap_or(Method::GET),
            context_path: self.context_path,
            servlet_path: self.servlet_path,
            path_info: self.path_info,
            query_string: self.query_string,
            request_uri,
            headers: self.headers,
            parameters,
            attributes: self.attributes,
            dispatcher_type: self.dispatcher_type,
            async_supported: self.async_supported,
        })))
    }
}
