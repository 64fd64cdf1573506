//! # Resolver Module
//!
//! The boundary between the container and URL mapping.
//!
//! [`InvocationResolver`] turns `(dispatcher type, servlet path, path info)`
//! into an [`InvocationDescriptor`]: the target handler, the matched path
//! split and the ordered filter chain for that dispatcher type. Descriptors
//! are computed per dispatch and never cached.
//!
//! [`SimpleMapper`] is the resolver a container starts with. Install a
//! different one with `Container::set_resolver` before registering mappings.

mod core;
mod mapper;

pub use self::core::{FilterMapping, FilterTarget, InvocationDescriptor, InvocationResolver};
pub use mapper::SimpleMapper;
