//! End-to-end dispatch tests.
//!
//! Each test mounts real controllers into a router and drives requests
//! through the full pipeline: tree match, parameter resolution,
//! middleware chain, handler, and finalization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use http::{Method, Request, StatusCode};
use parking_lot::Mutex;
use serde_json::{json, Value};
use trellis::{
    Bind, BoxFuture, Controller, ControllerSpec, Dispatch, Middleware, Next, RequestContext,
    Router, RouterConfig, TrellisError, TrellisResult, ViewRenderer,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn request(method: Method, path: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(path)
        .body(Bytes::new())
        .unwrap()
}

fn json_request(method: Method, path: &str, body: &str) -> Request<Bytes> {
    Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(Bytes::from(body.to_owned()))
        .unwrap()
}

fn responded(outcome: Dispatch) -> http::Response<Bytes> {
    match outcome {
        Dispatch::Responded(response) => response,
        other => panic!("expected a response, got {other:?}"),
    }
}

fn body_json(response: &http::Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).unwrap()
}

/// Appends its label to a shared log, then continues the chain.
struct Record {
    label: &'static str,
    log: &'static Mutex<Vec<&'static str>>,
}

impl Middleware for Record {
    fn name(&self) -> &'static str {
        self.label
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, TrellisResult<()>> {
        Box::pin(async move {
            self.log.lock().push(self.label);
            next.run(ctx).await
        })
    }
}

/// Refuses every request with a 403.
struct Gate {
    log: &'static Mutex<Vec<&'static str>>,
}

impl Middleware for Gate {
    fn name(&self) -> &'static str {
        "gate"
    }

    fn handle<'a>(
        &'a self,
        _ctx: &'a mut RequestContext,
        _next: Next<'a>,
    ) -> BoxFuture<'a, TrellisResult<()>> {
        Box::pin(async move {
            self.log.lock().push("gate");
            Err(TrellisError::forbidden("not on the list"))
        })
    }
}

mod show {
    use super::*;

    pub static CALLS: AtomicUsize = AtomicUsize::new(0);

    pub struct ProjectsController;

    impl Controller for ProjectsController {
        fn name() -> &'static str {
            "ProjectsController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/api/v1/projects");
            spec.handler("show")
                .get("/{id}")
                .bind(0, Bind::route_param("id"))
                .bind(1, Bind::query_param("full"))
                .render_json()
                .call(|invocation| async move {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    let id = invocation.args().text(0)?.to_owned();
                    let full = invocation.args().value(1).clone();
                    Ok(Some(json!({ "Id": id, "Full": full })))
                });
        }
    }
}

#[tokio::test]
async fn matched_route_invokes_the_handler_exactly_once() {
    init_tracing();
    let router = Router::builder()
        .mount::<show::ProjectsController>()
        .build()
        .unwrap();

    let outcome = router
        .dispatch(request(Method::GET, "/api/v1/projects/42?full=true"))
        .await;
    let response = responded(outcome);

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(body_json(&response), json!({ "Id": "42", "Full": "true" }));
    assert_eq!(show::CALLS.load(Ordering::SeqCst), 1);
}

mod update {
    use super::*;

    pub static CALLS: AtomicUsize = AtomicUsize::new(0);

    pub struct TeamsController;

    impl Controller for TeamsController {
        fn name() -> &'static str {
            "UpdateTeamsController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/api/v1/teams");
            spec.handler("update")
                .put("/{id}")
                .patch("/{id}")
                .bind(0, Bind::route_param("id"))
                .bind(1, Bind::body_param("Name"))
                .render_json()
                .call(|invocation| async move {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    let id = invocation.args().text(0)?.to_owned();
                    let name = invocation.args().value(1).clone();
                    Ok(Some(json!({ "Id": id, "Name": name })))
                });
        }
    }
}

#[tokio::test]
async fn one_handler_serves_several_methods() {
    let router = Router::builder()
        .mount::<update::TeamsController>()
        .build()
        .unwrap();

    assert_eq!(
        router.route_for(&Method::PUT, "/api/v1/teams/7"),
        router.route_for(&Method::PATCH, "/api/v1/teams/7"),
    );

    let put = responded(
        router
            .dispatch(json_request(
                Method::PUT,
                "/api/v1/teams/7",
                r#"{"Name":"Alpha"}"#,
            ))
            .await,
    );
    let patch = responded(
        router
            .dispatch(json_request(
                Method::PATCH,
                "/api/v1/teams/7",
                r#"{"Name":"Beta"}"#,
            ))
            .await,
    );

    assert_eq!(body_json(&put), json!({ "Id": "7", "Name": "Alpha" }));
    assert_eq!(body_json(&patch), json!({ "Id": "7", "Name": "Beta" }));
    assert_eq!(update::CALLS.load(Ordering::SeqCst), 2);
}

mod ordering {
    use super::*;

    pub static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    pub struct OrderedController;

    impl Controller for OrderedController {
        fn name() -> &'static str {
            "OrderedController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/ordered");
            spec.use_before(Record {
                label: "class-before-1",
                log: &LOG,
            });
            spec.use_before(Record {
                label: "class-before-2",
                log: &LOG,
            });
            spec.use_after(Record {
                label: "class-after",
                log: &LOG,
            });
            spec.handler("run")
                .get("/")
                .use_before(Record {
                    label: "handler-before",
                    log: &LOG,
                })
                .use_after(Record {
                    label: "handler-after",
                    log: &LOG,
                })
                .call(|invocation| async move {
                    LOG.lock().push("handler");
                    invocation.response().send_status(StatusCode::OK)?;
                    Ok(None)
                });
        }
    }
}

#[tokio::test]
async fn middleware_runs_in_declaration_order_around_the_handler() {
    let router = Router::builder()
        .mount::<ordering::OrderedController>()
        .build()
        .unwrap();

    responded(router.dispatch(request(Method::GET, "/ordered")).await);

    assert_eq!(
        *ordering::LOG.lock(),
        vec![
            "class-before-1",
            "class-before-2",
            "handler-before",
            "handler",
            "handler-after",
            "class-after",
        ]
    );
}

mod gated {
    use super::*;

    pub static CALLS: AtomicUsize = AtomicUsize::new(0);
    pub static LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    pub struct GatedController;

    impl Controller for GatedController {
        fn name() -> &'static str {
            "GatedController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/gated");
            spec.use_before(Gate { log: &LOG });
            spec.use_after(Record {
                label: "class-after",
                log: &LOG,
            });
            spec.handler("run").get("/").call(|_| async {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            });
        }
    }
}

#[tokio::test]
async fn middleware_rejection_forwards_the_error_exactly_once() {
    let router = Router::builder()
        .mount::<gated::GatedController>()
        .build()
        .unwrap();

    let outcome = router.dispatch(request(Method::GET, "/gated")).await;
    let Dispatch::ErrorForwarded(err) = outcome else {
        panic!("expected the rejection to be forwarded");
    };

    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(gated::CALLS.load(Ordering::SeqCst), 0);
    // The gate ran once; the after middleware never did.
    assert_eq!(*gated::LOG.lock(), vec!["gate"]);
}

mod constrained {
    use super::*;

    pub struct FilesController;

    impl Controller for FilesController {
        fn name() -> &'static str {
            "FilesController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/files");
            spec.handler("by_id")
                .get("/{id:[0-9]+}")
                .bind(0, Bind::route_param("id"))
                .render_json()
                .call(|invocation| async move {
                    Ok(Some(json!({ "kind": "id", "value": invocation.args().text(0)? })))
                });
            spec.handler("by_name")
                .get("/{name}")
                .bind(0, Bind::route_param("name"))
                .render_json()
                .call(|invocation| async move {
                    Ok(Some(json!({ "kind": "name", "value": invocation.args().text(0)? })))
                });
        }
    }
}

#[tokio::test]
async fn failed_constraint_falls_through_to_the_next_route() {
    let router = Router::builder()
        .mount::<constrained::FilesController>()
        .build()
        .unwrap();

    let numeric = responded(router.dispatch(request(Method::GET, "/files/42")).await);
    assert_eq!(body_json(&numeric), json!({ "kind": "id", "value": "42" }));

    let named = responded(router.dispatch(request(Method::GET, "/files/readme")).await);
    assert_eq!(
        body_json(&named),
        json!({ "kind": "name", "value": "readme" })
    );
}

mod silent {
    use super::*;

    pub struct SilentController;

    impl Controller for SilentController {
        fn name() -> &'static str {
            "SilentController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/silent");
            spec.handler("noop").get("/").call(|_| async { Ok(None) });
        }
    }
}

#[tokio::test]
async fn silent_completion_becomes_an_empty_204() {
    let router = Router::builder()
        .mount::<silent::SilentController>()
        .build()
        .unwrap();

    let response = responded(router.dispatch(request(Method::GET, "/silent")).await);
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn unrouted_requests_are_classified() {
    let router = Router::builder()
        .mount::<silent::SilentController>()
        .build()
        .unwrap();

    assert!(matches!(
        router.dispatch(request(Method::GET, "/nowhere")).await,
        Dispatch::NotFound
    ));
    assert!(matches!(
        router.dispatch(request(Method::DELETE, "/silent")).await,
        Dispatch::MethodNotAllowed
    ));
}

mod rendered {
    use super::*;

    pub struct PagesController;

    impl Controller for PagesController {
        fn name() -> &'static str {
            "PagesController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.handler("about")
                .get("/about")
                .render("pages/about")
                .call(|_| async { Ok(Some(json!({ "Title": "About" }))) });
        }
    }

    pub struct StubRenderer;

    impl ViewRenderer for StubRenderer {
        fn render(&self, view: &str, data: &Value) -> TrellisResult<String> {
            Ok(format!(
                "<h1>{} ({view})</h1>",
                data["Title"].as_str().unwrap_or_default()
            ))
        }
    }
}

#[tokio::test]
async fn view_finalizer_renders_the_payload_as_html() {
    let router = Router::builder()
        .renderer(Arc::new(rendered::StubRenderer))
        .mount::<rendered::PagesController>()
        .build()
        .unwrap();

    let response = responded(router.dispatch(request(Method::GET, "/about")).await);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=utf-8"
    );
    assert_eq!(&response.body()[..], b"<h1>About (pages/about)</h1>");
}

mod slow {
    use super::*;

    pub struct SlowController;

    impl Controller for SlowController {
        fn name() -> &'static str {
            "SlowController"
        }

        fn configure(spec: &mut ControllerSpec) {
            spec.mount("/slow");
            spec.handler("hang").get("/").call(|_| async {
                tokio::time::sleep(std::time::Duration::from_secs(300)).await;
                Ok(None)
            });
        }
    }
}

#[tokio::test]
async fn handler_deadline_fails_slow_requests() {
    let router = Router::builder()
        .config(RouterConfig {
            handler_deadline_ms: Some(20),
        })
        .mount::<slow::SlowController>()
        .build()
        .unwrap();

    let outcome = router.dispatch(request(Method::GET, "/slow")).await;
    let Dispatch::ErrorForwarded(err) = outcome else {
        panic!("expected a forwarded timeout");
    };
    assert!(matches!(err, TrellisError::Timeout { deadline_ms: 20 }));
    assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
}
