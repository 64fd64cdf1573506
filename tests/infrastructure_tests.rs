//! Tests for the pieces around dispatch
//!
//! # Test Coverage
//!
//! - Link table bookkeeping across top-level service
//! - Request listener notifications, including on failure
//! - Async-supported flag computed from handler and filters
//! - YAML configuration loaded from a file
//! - Embedded facade end to end with the echo handler
//! - Built-in tracing and metrics filters
//! - Concurrent service through a shared container
//!
//! # Key Test Cases
//!
//! - `request destroyed` fires even when the handler fails
//! - An echo forwarded from `/old` reports the original path in `forward`

mod common;

use std::io::Write;
use std::sync::Arc;
use std::thread;

use brrtcontainer::container::Container;
use brrtcontainer::echo::EchoHandler;
use brrtcontainer::embedded::EmbeddedContainer;
use brrtcontainer::error::ContainerError;
use brrtcontainer::exchange::{DispatcherType, Request, Response};
use brrtcontainer::filter::{MetricsFilter, TracingFilter};
use brrtcontainer::runtime_config::ContainerConfig;
use common::{entries, journal, mount, start, FnHandler, Recorder, RequestRecorder};
use serde_json::{json, Value};

#[test]
fn test_links_are_dropped_after_service() {
    let mut container = Container::new();
    let observed = Arc::new(parking_lot::Mutex::new(None));
    let slot = Arc::clone(&observed);
    mount(
        &mut container,
        "h",
        Arc::new(FnHandler::new(move |request, response, ctx| {
            let linked = ctx.container().request_for(response);
            *slot.lock() = Some((
                linked.map(|r| r.same(request)),
                ctx.container().response_for(request).map(|r| r.same(response)),
            ));
            Ok(())
        })),
        &["/h"],
    );
    let container = start(container);

    let request = Request::builder().path("/h").build();
    let response = Response::new();
    container.service(&request, &response).unwrap();

    assert_eq!(*observed.lock(), Some((Some(true), Some(true))));
    assert!(container.links().is_empty());
    assert!(container.request_for(&response).is_none());
    assert!(request.linked_response().is_none());
}

#[test]
fn test_request_listeners_fire_around_failed_service() {
    let log = journal();
    let mut container = Container::new();
    container
        .add_listener(Arc::new(RequestRecorder::new(&log)))
        .unwrap();
    mount(
        &mut container,
        "bad",
        Arc::new(FnHandler::new(|_, _, _| {
            Err(ContainerError::Handler(anyhow::anyhow!("handler failed")))
        })),
        &["/bad"],
    );
    let container = start(container);

    let response = Response::new();
    let err = container
        .service(&Request::builder().path("/bad").build(), &response)
        .unwrap_err();
    assert!(err.to_string().contains("handler failed"));
    assert!(container
        .service(&Request::builder().path("/missing").build(), &response)
        .is_err());

    assert_eq!(
        entries(&log),
        vec![
            "request initialized /bad",
            "request destroyed /bad",
            "request initialized /missing",
            "request destroyed /missing",
        ]
    );
    assert!(container.links().is_empty());
}

#[test]
fn test_async_supported_requires_every_unit() {
    let mut container = Container::new();
    for (name, pattern, supported) in [("yes", "/yes", true), ("no", "/no", false)] {
        let mut reg = container
            .add_handler(
                name,
                Arc::new(FnHandler::new(|request, response, _| {
                    response.write_str(&request.is_async_supported().to_string());
                    Ok(())
                })),
            )
            .unwrap()
            .unwrap();
        reg.add_mapping(&[pattern]).unwrap();
        reg.set_async_supported(supported).unwrap();
    }
    let mut filter = container
        .add_filter("metrics", Arc::new(MetricsFilter::new()))
        .unwrap()
        .unwrap();
    filter.add_mapping_for_url(&["/yes/*"], &[]).unwrap();
    filter.set_async_supported(false).unwrap();
    let container = start(container);

    let body = |path: &str| {
        let response = Response::new();
        container
            .service(&Request::builder().path(path).build(), &response)
            .unwrap();
        response.body_string()
    };
    assert_eq!(body("/no"), "false");
    // The non-async filter sits in front of /yes.
    assert_eq!(body("/yes"), "false");
}

#[test]
fn test_async_supported_when_handler_alone_supports_it() {
    let mut container = Container::new();
    let mut reg = container
        .add_handler(
            "h",
            Arc::new(FnHandler::new(|request, response, _| {
                response.write_str(&request.is_async_supported().to_string());
                Ok(())
            })),
        )
        .unwrap()
        .unwrap();
    reg.add_mapping(&["/h"]).unwrap();
    reg.set_async_supported(true).unwrap();
    let container = start(container);

    let response = Response::new();
    container
        .service(&Request::builder().path("/h").build(), &response)
        .unwrap();
    assert_eq!(response.body_string(), "true");
}

#[test]
fn test_config_loaded_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "context_path: /shop/").unwrap();
    writeln!(file, "context_name: shop").unwrap();
    writeln!(file, "response_encoding: UTF-8").unwrap();

    let config = ContainerConfig::from_yaml_file(file.path()).unwrap();
    assert_eq!(config.context_path, "/shop");
    let container = Container::new().with_config(&config);
    assert_eq!(container.context_path(), "/shop");
    assert_eq!(container.context_name(), "shop");
    assert_eq!(container.response_encoding(), Some("UTF-8"));

    let missing = file.path().with_extension("absent");
    assert!(matches!(
        ContainerConfig::from_yaml_file(&missing),
        Err(ContainerError::Config(_))
    ));
}

#[test]
fn test_embedded_echo_with_forward() {
    let mut container = Container::new().with_config(&ContainerConfig {
        context_path: "/app".to_string(),
        ..ContainerConfig::default()
    });
    mount(&mut container, "echo", Arc::new(EchoHandler), &["/echo/*"]);
    mount(
        &mut container,
        "old",
        Arc::new(FnHandler::new(|request, response, ctx| {
            ctx.request_dispatcher("/echo?lang=en")?.forward(request, response)
        })),
        &["/old"],
    );

    let mut embedded = EmbeddedContainer::new(container);
    embedded.initialize().unwrap().start().unwrap();

    let response = embedded.service_path("/old?q=1", &["x", "2"]).unwrap();
    assert_eq!(response.header("content-type").as_deref(), Some("application/json"));
    let doc: Value = serde_json::from_str(&response.body_string()).unwrap();
    assert_eq!(doc["dispatcher_type"], json!("FORWARD"));
    assert_eq!(doc["servlet_path"], json!("/echo"));
    assert_eq!(doc["query_string"], json!("lang=en"));
    assert_eq!(doc["request_uri"], json!("/app/echo"));
    assert_eq!(doc["params"]["lang"], json!(["en"]));
    assert_eq!(doc["params"]["q"], json!(["1"]));
    assert_eq!(doc["params"]["x"], json!(["2"]));
    assert_eq!(doc["forward"]["servlet_path"], json!("/old"));
    assert_eq!(doc["forward"]["query_string"], json!("q=1"));
    assert_eq!(doc["forward"]["request_uri"], json!("/app/old"));

    embedded.stop().unwrap().destroy().unwrap();
    assert_eq!(
        embedded.container().status(),
        brrtcontainer::lifecycle::Status::Setup
    );
}

#[test]
fn test_builtin_filters_count_and_pass_through() {
    let log = journal();
    let metrics = Arc::new(MetricsFilter::new());
    let mut container = Container::new();
    container
        .add_filter("tracing", Arc::new(TracingFilter))
        .unwrap()
        .unwrap()
        .add_mapping_for_url(&["/*"], &[DispatcherType::Request, DispatcherType::Forward])
        .unwrap();
    container
        .add_filter("metrics", metrics.clone())
        .unwrap()
        .unwrap()
        .add_mapping_for_handler(&["*"], &[])
        .unwrap();
    mount(&mut container, "ok", Arc::new(Recorder::new("ok", &log)), &["/ok"]);
    mount(
        &mut container,
        "bad",
        Arc::new(FnHandler::new(|_, _, _| {
            Err(ContainerError::Handler(anyhow::anyhow!("nope")))
        })),
        &["/bad"],
    );
    let container = start(container);

    let response = Response::new();
    for _ in 0..3 {
        container
            .service(&Request::builder().path("/ok").build(), &response)
            .unwrap();
    }
    assert!(container
        .service(&Request::builder().path("/bad").build(), &Response::new())
        .is_err());

    assert_eq!(metrics.request_count(), 4);
    assert_eq!(metrics.failure_count(), 1);
    assert_eq!(
        entries(&log)
            .iter()
            .filter(|e| e.as_str() == "service ok REQUEST /ok")
            .count(),
        3
    );
}

#[test]
fn test_concurrent_service_through_shared_container() {
    let mut container = Container::new();
    mount(&mut container, "echo", Arc::new(EchoHandler), &["/echo/*"]);
    mount(
        &mut container,
        "hop",
        Arc::new(FnHandler::new(|request, response, ctx| {
            let n = request.parameter("n").unwrap_or_default();
            ctx.request_dispatcher(&format!("/echo/{n}"))?
                .forward(request, response)
        })),
        &["/hop"],
    );
    let container = Arc::new(start(container));

    let workers: Vec<_> = (0..8)
        .map(|n| {
            let container = Arc::clone(&container);
            thread::spawn(move || {
                for i in 0..25 {
                    let request = Request::builder()
                        .path(&format!("/hop?n={n}-{i}"))
                        .build();
                    let response = Response::new();
                    container.service(&request, &response).unwrap();
                    let doc: Value = serde_json::from_str(&response.body_string()).unwrap();
                    assert_eq!(doc["servlet_path"], json!(format!("/echo/{n}-{i}")));
                    assert_eq!(doc["forward"]["servlet_path"], json!("/hop"));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert!(container.links().is_empty());
}
