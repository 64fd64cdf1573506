use serde::{Deserialize, Serialize};

use crate::exchange::DispatcherType;

/// Result of resolving one dispatch.
///
/// Carries names rather than environments; the engine looks them up in the
/// registration tables so a descriptor never outlives a registration change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationDescriptor {
    /// Target handler name
    pub handler_name: String,
    /// Matched servlet path
    pub servlet_path: String,
    /// Remainder of the path after the matched prefix
    pub path_info: Option<String>,
    /// Filters to run before the handler, outermost first
    pub filter_names: Vec<String>,
}

/// What a filter mapping applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterTarget {
    UrlPattern(String),
    HandlerName(String),
}

/// One filter mapping. An empty `dispatcher_types` means `REQUEST` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMapping {
    pub filter_name: String,
    pub target: FilterTarget,
    pub dispatcher_types: Vec<DispatcherType>,
}

impl FilterMapping {
    #[must_use]
    pub fn applies_to(&self, dispatcher_type: DispatcherType) -> bool {
        if self.dispatcher_types.is_empty() {
            dispatcher_type == DispatcherType::Request
        } else {
            self.dispatcher_types.contains(&dispatcher_type)
        }
    }
}

/// Pluggable path → handler mapping.
///
/// The container never matches paths itself. It hands the raw path
/// components to the resolver and turns a miss into
/// [`ContainerError::NoTarget`](crate::error::ContainerError::NoTarget).
pub trait InvocationResolver: Send + Sync {
    /// Resolve a path for the given dispatcher type.
    fn resolve(
        &self,
        dispatcher_type: DispatcherType,
        servlet_path: &str,
        path_info: Option<&str>,
    ) -> Option<InvocationDescriptor>;

    /// Resolve a handler by name (named dispatch).
    fn resolve_named(
        &self,
        dispatcher_type: DispatcherType,
        handler_name: &str,
    ) -> Option<InvocationDescriptor>;

    /// Map `patterns` to `handler_name`. Returns the patterns that were
    /// already mapped to another handler and were therefore not added.
    fn add_handler_mapping(&mut self, handler_name: &str, patterns: &[&str]) -> Vec<String>;

    /// Append a filter mapping; mapping order is chain order.
    fn add_filter_mapping(&mut self, mapping: FilterMapping);

    /// Patterns mapped to `handler_name`, in mapping order.
    fn mappings(&self, handler_name: &str) -> Vec<String>;

    /// Forget handler mappings of a removed handler.
    fn remove_handler(&mut self, _handler_name: &str) {}

    /// Drop every mapping; called when the container is destroyed.
    fn reset(&mut self) {}
}
