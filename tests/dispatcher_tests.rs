//! Invocation pipeline and exception escalation, end to end through the router.

use actionserver::controller::{Controller, ControllerDefinition};
use actionserver::dispatcher::InvocationPipeline;
use actionserver::escalation::{
    Behavior, Escalator, ExceptionPolicy, MailError, MailMessage, MailTransport,
    ESCALATION_SENDER,
};
use actionserver::ids::RequestId;
use actionserver::middleware::RequiredParameters;
use actionserver::params::Parameters;
use actionserver::registry::RegistryBuilder;
use actionserver::router::{Router, BLOCKED_MESSAGE};
use actionserver::server::ServerContext;
use actionserver::Response;
use anyhow::Context;
use http::StatusCode;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
}

impl MailTransport for RecordingTransport {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct FailingTransport;

impl MailTransport for FailingTransport {
    fn send(&self, _: &MailMessage) -> Result<(), MailError> {
        Err(MailError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "mail host down",
        )))
    }
}

struct Orders {
    params: Parameters,
}

impl Controller for Orders {
    fn from_parameters(params: Parameters) -> Self {
        Self { params }
    }
    fn parameters(&self) -> &Parameters {
        &self.params
    }
}

fn orders() -> ControllerDefinition<Orders> {
    ControllerDefinition::<Orders>::new("Orders")
        .action("Create", |c: &mut Orders| {
            let sku = c.parameters().get("sku").unwrap_or_default().to_string();
            Ok(Response::ok("Created", sku))
        })
        .require(RequiredParameters::parse("customer"))
        .require(RequiredParameters::parse("sku, qty, warehouse"))
        .action("Charge", |_| {
            Err(anyhow::anyhow!("card declined")).context("payment step failed")
        })
        .on_error(ExceptionPolicy::email(Behavior::RemainActive, "ops@example.com"))
        .on_error(ExceptionPolicy::log(Behavior::RemainActive))
        .action("Refund", |_| Err(anyhow::anyhow!("ledger locked")))
        .on_error(ExceptionPolicy::email(Behavior::BlockClients, "ops@example.com"))
        .exception_handler(|c: &mut Orders, e| {
            Response::new(
                StatusCode::ACCEPTED,
                "Refund queued",
                format!("{} ({})", e.root_message(), c.parameters().len()),
            )
        })
        .finish()
}

fn router(transport: Arc<dyn MailTransport>) -> Router {
    let mut builder = RegistryBuilder::new();
    builder.register(orders()).unwrap();
    Router::with_pipeline(
        builder.build(),
        InvocationPipeline::new(Escalator::new(transport)),
    )
}

fn call(router: &Router, ctx: &ServerContext, target: &str) -> Response {
    router.handle(ctx, RequestId::new(), target).unwrap()
}

#[test]
fn first_failing_gate_supplies_the_message() {
    let router = router(Arc::new(RecordingTransport::default()));
    let ctx = ServerContext::new();

    let res = call(&router, &ctx, "/orders/create?qty=1");
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(
        res.message(),
        "The following required parameters were missing from the request: customer"
    );

    let res = call(&router, &ctx, "/orders/create?customer=7&qty=1");
    assert_eq!(
        res.message(),
        "The following required parameters were missing from the request: sku,warehouse"
    );
}

#[test]
fn satisfied_gates_invoke_the_action() {
    let router = router(Arc::new(RecordingTransport::default()));
    let res = call(
        &router,
        &ServerContext::new(),
        "/orders/create?customer=7&sku=A1&qty=1&warehouse=w",
    );
    assert_eq!(res, Response::ok("Created", "A1"));
}

#[test]
fn email_policy_mails_and_server_stays_active() {
    let transport = Arc::new(RecordingTransport::default());
    let router = router(Arc::clone(&transport) as Arc<dyn MailTransport>);
    let ctx = ServerContext::new();

    let res = call(&router, &ctx, "/orders/charge");
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.message(), "card declined");
    assert!(!ctx.is_blocking());

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sender, ESCALATION_SENDER);
    assert_eq!(sent[0].recipients, vec!["ops@example.com"]);
    assert_eq!(sent[0].subject, "Server Exception Thrown: payment step failed");
    assert!(sent[0].body.contains("card declined"));
}

#[test]
fn exception_handler_runs_after_escalation() {
    let transport = Arc::new(RecordingTransport::default());
    let router = router(Arc::clone(&transport) as Arc<dyn MailTransport>);
    let ctx = ServerContext::new();

    let res = call(&router, &ctx, "/orders/refund?id=9");
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert_eq!(res.message(), "ledger locked (1)");
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
    assert!(ctx.is_blocking());
}

#[test]
fn blocking_is_monotonic_until_reset() {
    let router = router(Arc::new(RecordingTransport::default()));
    let ctx = ServerContext::new();
    call(&router, &ctx, "/orders/refund");

    for _ in 0..3 {
        let res = call(&router, &ctx, "/orders/ping");
        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.message(), BLOCKED_MESSAGE);
    }
    ctx.reset_block();
    assert_eq!(call(&router, &ctx, "/orders/ping").status, StatusCode::OK);
}

#[test]
fn mail_failure_never_reaches_the_client() {
    let router = router(Arc::new(FailingTransport));
    let ctx = ServerContext::new();
    let res = call(&router, &ctx, "/orders/refund");
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert!(ctx.is_blocking());
}

#[test]
fn block_flag_is_per_context() {
    let router = router(Arc::new(RecordingTransport::default()));
    let failing = ServerContext::new();
    let other = ServerContext::new();
    call(&router, &failing, "/orders/refund");
    assert!(failing.is_blocking());
    assert_eq!(call(&router, &other, "/orders/ping").status, StatusCode::OK);
}
