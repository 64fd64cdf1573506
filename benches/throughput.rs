use std::hint::black_box;
use std::sync::Arc;

use brrtcontainer::container::Container;
use brrtcontainer::dispatcher::{Handler, ServiceContext};
use brrtcontainer::echo::EchoHandler;
use brrtcontainer::exchange::{DispatcherType, Request, Response};
use brrtcontainer::filter::MetricsFilter;
use criterion::{criterion_group, criterion_main, Criterion};

struct Forwarder;

impl Handler for Forwarder {
    fn service(
        &self,
        request: &Request,
        response: &Response,
        ctx: &ServiceContext<'_>,
    ) -> brrtcontainer::Result<()> {
        ctx.request_dispatcher("/echo/target?via=forward")?
            .forward(request, response)
    }
}

fn bench_container() -> Container {
    let mut container = Container::new();
    if let Ok(Some(mut echo)) = container.add_handler("echo", Arc::new(EchoHandler)) {
        let _ = echo.add_mapping(&["/echo/*"]);
    }
    if let Ok(Some(mut forward)) = container.add_handler("forward", Arc::new(Forwarder)) {
        let _ = forward.add_mapping(&["/forward"]);
    }
    if let Ok(Some(mut metrics)) = container.add_filter("metrics", Arc::new(MetricsFilter::new())) {
        let _ = metrics.add_mapping_for_url(
            &["/*"],
            &[DispatcherType::Request, DispatcherType::Forward],
        );
    }
    container.initialize().expect("initialize");
    container.start().expect("start");
    container
}

fn bench_service(c: &mut Criterion) {
    let container = bench_container();
    c.bench_function("service_top_level", |b| {
        b.iter(|| {
            let request = Request::builder().path("/echo/a?x=1&x=2").build();
            let response = Response::new();
            let res = container.service(&request, &response);
            black_box(&res);
            black_box(response.body().len());
        })
    });
}

fn bench_forward(c: &mut Criterion) {
    let container = bench_container();
    c.bench_function("service_with_forward", |b| {
        b.iter(|| {
            let request = Request::builder().path("/forward?q=1").build();
            let response = Response::new();
            let res = container.service(&request, &response);
            black_box(&res);
            black_box(response.body().len());
        })
    });
}

criterion_group!(benches, bench_service, bench_forward);
criterion_main!(benches);
