//! # Exchange Module
//!
//! Request and response objects as the container sees them once the wire
//! layer has parsed an HTTP exchange.
//!
//! ## Request chains
//!
//! A [`Request`] is a node in a singly linked chain:
//!
//! ```text
//! [application wrapper] ──▶ [dispatch wrapper] ──▶ [exchange]
//! ```
//!
//! - the **exchange** is the plain request handed to `Container::service`
//! - a **dispatch wrapper** is created by the engine for forward, include and
//!   async dispatch; it overrides path fields and carries its own attributes
//!   and parameters
//! - an **application wrapper** is supplied by user code through a
//!   [`RequestDecorator`]
//!
//! Every wrapper holds its wrapped request behind a lock so the engine can
//! splice a dispatch wrapper underneath an application wrapper without
//! changing the identity callers hold.
//!
//! ## Responses
//!
//! [`Response`] is a shared handle over a buffered body. Forward resets the
//! buffer before invoking the target and flushes it afterwards; the
//! reset and flush counts are observable.

pub mod attributes;
mod params;
mod request;
mod response;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use params::{
    names_of, parse_query_string, split_target, values_of, HeaderVec, ParamVec,
    MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
pub use request::{PassThrough, Request, RequestBuilder, RequestDecorator, RequestKind};
pub use response::Response;

/// How a request reached the handler currently servicing it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatcherType {
    #[default]
    Request,
    Forward,
    Include,
    Async,
    Error,
}

impl fmt::Display for DispatcherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DispatcherType::Request => "REQUEST",
            DispatcherType::Forward => "FORWARD",
            DispatcherType::Include => "INCLUDE",
            DispatcherType::Async => "ASYNC",
            DispatcherType::Error => "ERROR",
        };
        f.write_str(s)
    }
}
