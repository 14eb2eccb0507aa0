use actionserver::dispatcher::InvocationRequest;
use actionserver::ids::RequestId;
use actionserver::middleware::{Middleware, MetricsMiddleware, TracingMiddleware};
use actionserver::server::ServerContext;
use actionserver::Response;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::fixtures::example_router;

/// Answers `echo` itself instead of invoking the action.
struct Maintenance;

impl Middleware for Maintenance {
    fn before(&self, req: &InvocationRequest) -> Option<Response> {
        (req.action == "echo").then(|| Response::ok("Maintenance", "come back later"))
    }
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<(String, String, u16)>>,
}

impl Middleware for Recorder {
    fn after(&self, req: &InvocationRequest, res: &mut Response, _latency: Duration) {
        self.seen
            .lock()
            .unwrap()
            .push((req.controller.clone(), req.action.clone(), res.status.as_u16()));
    }
}

#[test]
fn before_hook_can_short_circuit() {
    let mut router = example_router();
    router.add_middleware(Arc::new(Maintenance));
    let ctx = ServerContext::new();
    let res = router
        .handle(&ctx, RequestId::new(), "/example/echo?name=x")
        .unwrap();
    assert_eq!(res.message(), "come back later");
    let res = router.handle(&ctx, RequestId::new(), "/example/ping").unwrap();
    assert_eq!(res.message(), "Alive and well!");
}

#[test]
fn after_hooks_see_final_responses_in_order() {
    let recorder = Arc::new(Recorder::default());
    let metrics = Arc::new(MetricsMiddleware::new());
    let mut router = example_router();
    router.add_middleware(Arc::new(TracingMiddleware));
    router.add_middleware(Arc::clone(&recorder) as Arc<dyn Middleware>);
    router.add_middleware(Arc::clone(&metrics) as Arc<dyn Middleware>);

    let ctx = ServerContext::new();
    for target in ["/example/ping", "/example/echo", "/example/explode"] {
        router.handle(&ctx, RequestId::new(), target).unwrap();
    }

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            ("Example".to_string(), "ping".to_string(), 200),
            ("Example".to_string(), "echo".to_string(), 409),
            ("Example".to_string(), "explode".to_string(), 500),
        ]
    );
    let snap = metrics.snapshot();
    assert_eq!(snap.requests, 3);
    assert_eq!(snap.client_errors, 1);
    assert_eq!(snap.server_errors, 1);
}
