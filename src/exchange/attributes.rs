//! Request attribute names installed by the dispatch engine.

pub const FORWARD_CONTEXT_PATH: &str = "jakarta.servlet.forward.context_path";
pub const FORWARD_PATH_INFO: &str = "jakarta.servlet.forward.path_info";
pub const FORWARD_QUERY_STRING: &str = "jakarta.servlet.forward.query_string";
pub const FORWARD_REQUEST_URI: &str = "jakarta.servlet.forward.request_uri";
pub const FORWARD_SERVLET_PATH: &str = "jakarta.servlet.forward.servlet_path";

pub const INCLUDE_CONTEXT_PATH: &str = "jakarta.servlet.include.context_path";
pub const INCLUDE_PATH_INFO: &str = "jakarta.servlet.include.path_info";
pub const INCLUDE_QUERY_STRING: &str = "jakarta.servlet.include.query_string";
pub const INCLUDE_REQUEST_URI: &str = "jakarta.servlet.include.request_uri";
pub const INCLUDE_SERVLET_PATH: &str = "jakarta.servlet.include.servlet_path";

pub const ASYNC_CONTEXT_PATH: &str = "jakarta.servlet.async.context_path";
pub const ASYNC_PATH_INFO: &str = "jakarta.servlet.async.path_info";
pub const ASYNC_QUERY_STRING: &str = "jakarta.servlet.async.query_string";
pub const ASYNC_REQUEST_URI: &str = "jakarta.servlet.async.request_uri";
pub const ASYNC_SERVLET_PATH: &str = "jakarta.servlet.async.servlet_path";

/// The five path attribute names of one dispatch namespace.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PathAttributeNames {
    pub context_path: &'static str,
    pub path_info: &'static str,
    pub query_string: &'static str,
    pub request_uri: &'static str,
    pub servlet_path: &'static str,
}

impl PathAttributeNames {
    pub(crate) fn all(&self) -> [&'static str; 5] {
        [
            self.context_path,
            self.path_info,
            self.query_string,
            self.request_uri,
            self.servlet_path,
        ]
    }
}

pub(crate) const FORWARD: PathAttributeNames = PathAttributeNames {
    context_path: FORWARD_CONTEXT_PATH,
    path_info: FORWARD_PATH_INFO,
    query_string: FORWARD_QUERY_STRING,
    request_uri: FORWARD_REQUEST_URI,
    servlet_path: FORWARD_SERVLET_PATH,
};

pub(crate) const INCLUDE: PathAttributeNames = PathAttributeNames {
    context_path: INCLUDE_CONTEXT_PATH,
    path_info: INCLUDE_PATH_INFO,
    query_string: INCLUDE_QUERY_STRING,
    request_uri: INCLUDE_REQUEST_URI,
    servlet_path: INCLUDE_SERVLET_PATH,
};

pub(crate) const ASYNC: PathAttributeNames = PathAttributeNames {
    context_path: ASYNC_CONTEXT_PATH,
    path_info: ASYNC_PATH_INFO,
    query_string: ASYNC_QUERY_STRING,
    request_uri: ASYNC_REQUEST_URI,
    servlet_path: ASYNC_SERVLET_PATH,
};
