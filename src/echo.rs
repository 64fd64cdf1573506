use serde_json::{json, Map, Value};

use crate::dispatcher::{Handler, ServiceContext};
use crate::error::Result;
use crate::exchange::attributes::{
    FORWARD_PATH_INFO, FORWARD_QUERY_STRING, FORWARD_REQUEST_URI, FORWARD_SERVLET_PATH,
};
use crate::exchange::{Request, Response};

// Example handler: echoes the path fields and parameters it was dispatched with
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoHandler;

impl EchoHandler {
    /// The JSON document [`Handler::service`] writes for `request`.
    #[must_use]
    pub fn describe(request: &Request) -> Value {
        let mut params = Map::new();
        for name in request.parameter_names() {
            let values = request.parameter_values(&name);
            params.insert(name, json!(values));
        }
        let forward: Map<String, Value> = [
            ("servlet_path", FORWARD_SERVLET_PATH),
            ("path_info", FORWARD_PATH_INFO),
            ("query_string", FORWARD_QUERY_STRING),
            ("request_uri", FORWARD_REQUEST_URI),
        ]
        .into_iter()
        .filter_map(|(key, attr)| request.attribute(attr).map(|v| (key.to_string(), v)))
        .collect();

        json!({
            "method": request.method().as_str(),
            "dispatcher_type": request.dispatcher_type(),
            "context_path": request.context_path(),
            "servlet_path": request.servlet_path(),
            "path_info": request.path_info(),
            "query_string": request.query_string(),
            "request_uri": request.request_uri(),
            "params": params,
            "forward": forward,
        })
    }
}

impl Handler for EchoHandler {
    fn service(&self, request: &Request, response: &Response, _ctx: &ServiceContext<'_>) -> Result<()> {
        response.write_json(&Self::describe(request))
    }
}
