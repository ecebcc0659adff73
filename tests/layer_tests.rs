//! Layer resolution across application, router, controller and handler
//!
//! # Test Coverage
//!
//! - List aspects (tags, guards, middleware) concatenate root-first
//! - Single-valued aspects are decided by the closest owner
//! - Mappings (headers, opt, parameters, dependencies) override per key
//! - The same component under two parents resolves independently

mod common;

use common::echo;
use http::Method;
use serde_json::json;
use strata_router::app::Application;
use strata_router::dispatcher::{HandlerInvocation, RequestScope};
use strata_router::layer::{CacheControl, Layer, ParameterSpec, Provider};
use strata_router::path::ParamType;
use strata_router::registrar::{ControllerSpec, HandlerSpec, RouterSpec};

fn invocation(app: &Application, path: &str) -> HandlerInvocation {
    app.dispatch(Method::GET, path, RequestScope::new()).unwrap()
}

#[test]
fn test_list_aspects_concatenate_root_first() {
    let app = Application::builder()
        .layer(Layer::builder().tag("app").build())
        .route(
            RouterSpec::new("/api")
                .layer(Layer::builder().tag("router").tag("app").build())
                .route(
                    ControllerSpec::new("users", "/users")
                        .layer(Layer::builder().tag("controller").build())
                        .handler(
                            HandlerSpec::get("/", echo)
                                .layer(Layer::builder().tag("handler").build()),
                        ),
                ),
        )
        .build()
        .unwrap();

    let inv = invocation(&app, "/api/users");
    assert_eq!(inv.config.tags, vec!["app", "router", "controller", "handler"]);
    assert_eq!(inv.endpoint.chain().len(), 4);
}

#[test]
fn test_single_aspects_leaf_wins() {
    let app = Application::builder()
        .layer(
            Layer::builder()
                .media_type("application/json")
                .cache_control(CacheControl::max_age(300))
                .response_class("AppResponse")
                .request_max_body_size(1024)
                .build(),
        )
        .route(
            RouterSpec::new("/docs")
                .layer(
                    Layer::builder()
                        .media_type("text/html")
                        .include_in_schema(false)
                        .build(),
                )
                .route(
                    HandlerSpec::get("/", echo).layer(
                        Layer::builder()
                            .cache_control(CacheControl::prevent_storing())
                            .build(),
                    ),
                ),
        )
        .route(HandlerSpec::get("/status", echo))
        .build()
        .unwrap();

    let docs = invocation(&app, "/docs");
    assert_eq!(docs.config.media_type.as_deref(), Some("text/html"));
    assert_eq!(docs.config.cache_control, Some(CacheControl::prevent_storing()));
    assert_eq!(docs.config.response_class.as_deref(), Some("AppResponse"));
    assert_eq!(docs.config.request_max_body_size, Some(1024));
    assert!(!docs.config.include_in_schema);

    let status = invocation(&app, "/status");
    assert_eq!(status.config.media_type.as_deref(), Some("application/json"));
    assert_eq!(status.config.cache_control, Some(CacheControl::max_age(300)));
    assert!(status.config.include_in_schema);
}

#[test]
fn test_mappings_override_per_key() {
    let app = Application::builder()
        .layer(
            Layer::builder()
                .response_header("X-Served-By", "app")
                .response_header("x-region", "eu")
                .opt("audit", json!(false))
                .opt("owner", json!("platform"))
                .dependency("db", Provider::value(json!("primary")))
                .parameter("limit", ParameterSpec::query(ParamType::Int).default_value(json!(10)))
                .build(),
        )
        .route(
            HandlerSpec::get("/reports", echo).layer(
                Layer::builder()
                    .response_header("x-served-by", "reports")
                    .opt("audit", json!(true))
                    .dependency("db", Provider::value(json!("replica")))
                    .parameter("limit", ParameterSpec::query(ParamType::Int).default_value(json!(50)))
                    .build(),
            ),
        )
        .build()
        .unwrap();

    let inv = invocation(&app, "/reports");
    assert_eq!(inv.config.response_header("X-SERVED-BY"), Some("reports"));
    assert_eq!(inv.config.response_header("x-region"), Some("eu"));
    assert_eq!(inv.opt("audit"), Some(&json!(true)));
    assert_eq!(inv.opt("owner"), Some(&json!("platform")));
    assert_eq!(inv.dependency("db"), Some(json!("replica")));
    assert_eq!(inv.parameter("limit").unwrap(), json!(50));

    let res = app.handle(Method::GET, "/reports", RequestScope::new());
    let served_by: Vec<&str> = res.header_values("x-served-by");
    assert_eq!(served_by, vec!["reports"]);
}

#[test]
fn test_same_component_under_two_parents() {
    let shared = HandlerSpec::get("/info", echo);
    let app = Application::builder()
        .route(
            RouterSpec::new("/v1")
                .layer(Layer::builder().tag("v1").build())
                .route(shared.clone()),
        )
        .route(
            RouterSpec::new("/v2")
                .layer(Layer::builder().tag("v2").build())
                .route(shared),
        )
        .build()
        .unwrap();

    assert_eq!(invocation(&app, "/v1/info").config.tags, vec!["v1"]);
    assert_eq!(invocation(&app, "/v2/info").config.tags, vec!["v2"]);
    assert_eq!(app.routes().len(), 2);
}
