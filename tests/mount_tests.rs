//! Mounted applications
//!
//! # Test Coverage
//!
//! - Prefix stripping and `mount_path` recording, including nested mounts
//! - `/app` never captures `/app-extra`
//! - Errors from the mounted application pass through
//! - `ScopeMode::PassThrough` shares request state, `ScopeMode::Copy` isolates it
//! - The configured default scope mode applies to mounts without one
//! - Handlers inside a mount see the same request as when the application is served alone

mod common;

use common::{echo, get, send, tagged};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use strata_router::app::Application;
use strata_router::config::RouterConfig;
use strata_router::dispatcher::{HandlerInvocation, HandlerResponse, RequestScope, ScopeMode};
use strata_router::layer::Layer;
use strata_router::registrar::{HandlerSpec, MountSpec, RouterSpec};

fn writer_app() -> Application {
    Application::builder()
        .route(HandlerSpec::post("/write", |inv: &HandlerInvocation| {
            inv.scope.state_insert("written_by", json!("child"));
            HandlerResponse::ok(json!({ "path": inv.path }))
        }))
        .build()
        .unwrap()
}

#[test]
fn test_mount_strips_prefix() {
    let child = Application::builder()
        .route(HandlerSpec::get("/", tagged("child_root")))
        .route(HandlerSpec::get("/users/{id:int}", echo))
        .build()
        .unwrap();
    let app = Application::builder()
        .route(HandlerSpec::get("/health", tagged("health")))
        .route(MountSpec::new("/app", child))
        .build()
        .unwrap();

    let res = get(&app, "/app/users/5");
    assert_eq!(res.status, 200);
    assert_eq!(res.body["path"], "/users/5");
    assert_eq!(res.body["params"]["id"], 5);
    assert_eq!(res.body["mount_path"], "/app");

    assert_eq!(get(&app, "/app").body["handler"], "child_root");
    assert_eq!(get(&app, "/app/").body["handler"], "child_root");
    assert_eq!(get(&app, "/health").body["handler"], "health");
}

#[test]
fn test_mount_does_not_capture_longer_segment() {
    let app = Application::builder()
        .route(MountSpec::new("/app", Application::builder().route(HandlerSpec::get("/", echo)).build().unwrap()))
        .route(HandlerSpec::get("/app-extra", tagged("extra")))
        .build()
        .unwrap();

    assert_eq!(get(&app, "/app-extra").body["handler"], "extra");
    assert_eq!(get(&app, "/app-extra/more").status, 404);
}

#[test]
fn test_mount_errors_pass_through() {
    let child = Application::builder()
        .route(HandlerSpec::get("/items", echo))
        .build()
        .unwrap();
    let app = Application::builder()
        .route(MountSpec::new("/shop", child))
        .build()
        .unwrap();

    assert_eq!(get(&app, "/shop/missing").status, 404);
    let res = send(&app, Method::DELETE, "/shop/items");
    assert_eq!(res.status, 405);
    assert_eq!(res.get_header("allow"), Some("GET"));
}

#[test]
fn test_nested_mounts_and_router_prefix() {
    let inner = Application::builder()
        .route(HandlerSpec::get("/ping", echo))
        .build()
        .unwrap();
    let middle = Application::builder()
        .route(MountSpec::new("/inner", inner))
        .build()
        .unwrap();
    let app = Application::builder()
        .route(RouterSpec::new("/api").route(MountSpec::new("/middle", middle)))
        .build()
        .unwrap();

    let res = get(&app, "/api/middle/inner/ping");
    assert_eq!(res.status, 200);
    assert_eq!(res.body["path"], "/ping");
    assert_eq!(res.body["mount_path"], "/api/middle/inner");
}

#[test]
fn test_parent_layers_do_not_flow_into_mount() {
    let child = Application::builder()
        .route(HandlerSpec::get("/", echo))
        .build()
        .unwrap();
    let app = Application::builder()
        .layer(Layer::builder().response_header("x-parent", "yes").build())
        .route(MountSpec::new("/child", child))
        .route(HandlerSpec::get("/own", echo))
        .build()
        .unwrap();

    assert_eq!(get(&app, "/own").get_header("x-parent"), Some("yes"));
    assert_eq!(get(&app, "/child").get_header("x-parent"), None);
}

#[test]
fn test_pass_through_scope_shares_state() {
    let app = Application::builder()
        .route(MountSpec::new("/child", writer_app()).scope_mode(ScopeMode::PassThrough))
        .build()
        .unwrap();

    let scope = RequestScope::new();
    let state = Arc::clone(&scope.state);
    let res = app.handle(Method::POST, "/child/write", scope);
    assert_eq!(res.status, 200);
    assert_eq!(res.body["path"], "/write");
    assert_eq!(
        state.read().unwrap().get("written_by"),
        Some(&json!("child"))
    );
}

#[test]
fn test_copy_scope_isolates_state() {
    let app = Application::builder()
        .route(MountSpec::new("/child", writer_app()).scope_mode(ScopeMode::Copy))
        .build()
        .unwrap();

    let scope = RequestScope::new();
    scope.state_insert("seen_by_child", json!(true));
    let state = Arc::clone(&scope.state);

    let inv = app
        .dispatch(Method::POST, "/child/write", scope)
        .unwrap();
    assert_eq!(inv.scope.state_get("seen_by_child"), Some(json!(true)));

    let res = strata_router::dispatcher::Dispatcher::invoke(&inv);
    assert_eq!(res.status, 200);
    assert_eq!(state.read().unwrap().get("written_by"), None);
}

#[test]
fn test_default_scope_mode_from_config() {
    let config = RouterConfig {
        default_mount_scope: ScopeMode::Copy,
        ..RouterConfig::default()
    };
    let app = Application::builder()
        .config(config)
        .route(MountSpec::new("/child", writer_app()))
        .build()
        .unwrap();

    let scope = RequestScope::new();
    let state = Arc::clone(&scope.state);
    assert_eq!(app.handle(Method::POST, "/child/write", scope).status, 200);
    assert!(state.read().unwrap().get("written_by").is_none());
}

#[test]
fn test_mount_method_filter() {
    let app = Application::builder()
        .route(MountSpec::new("/child", writer_app()).methods(&[Method::POST]))
        .build()
        .unwrap();

    assert_eq!(send(&app, Method::POST, "/child/write").status, 200);
    let res = send(&app, Method::GET, "/child/write");
    assert_eq!(res.status, 405);
    assert_eq!(res.get_header("allow"), Some("POST"));
}

#[test]
fn test_shared_application_mounted_twice() {
    let shared = Arc::new(
        Application::builder()
            .route(HandlerSpec::get("/status", echo))
            .build()
            .unwrap(),
    );
    let app = Application::builder()
        .route(MountSpec::shared("/a", Arc::clone(&shared)))
        .route(MountSpec::shared("/b", shared))
        .build()
        .unwrap();

    assert_eq!(get(&app, "/a/status").body["mount_path"], "/a");
    assert_eq!(get(&app, "/b/status").body["mount_path"], "/b");
}

#[test]
fn test_mounted_handler_sees_unmounted_request() {
    let child = Arc::new(
        Application::builder()
            .route(HandlerSpec::get("/whoami", |inv: &HandlerInvocation| {
                HandlerResponse::ok(json!({
                    "path": inv.path,
                    "scope": format!("{:?}", inv.scope),
                }))
            }))
            .build()
            .unwrap(),
    );
    let app = Application::builder()
        .route(MountSpec::shared("/tenant", Arc::clone(&child)))
        .build()
        .unwrap();

    let scope = || RequestScope::new().with_header("x-request-id", "r1");
    let alone = child.handle(Method::GET, "/whoami", scope());
    let mounted = app.handle(Method::GET, "/tenant/whoami", scope());

    assert_eq!(mounted.status, 200);
    assert_eq!(mounted.body, alone.body);
    assert!(!mounted.body["scope"].as_str().unwrap().contains("/tenant"));
}
