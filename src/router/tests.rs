use super::{Endpoint, Lookup, MountPoint, RouteTree, Router};
use crate::app::Application;
use crate::coerce::{ParamConstraints, ParamValue};
use crate::dispatcher::{HandlerInvocation, HandlerResponse};
use crate::error::AmbiguousRouteError;
use crate::layer::{Owner, OwnerKind, OwnershipChain, ResolvedConfig};
use crate::path::PathTemplate;
use http::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn endpoint_with(methods: &[Method], template: PathTemplate) -> Arc<Endpoint> {
    let names: Vec<&str> = methods.iter().map(Method::as_str).collect();
    let label = format!("{} {}", names.join(","), template);
    Arc::new(Endpoint {
        handler: Arc::new(|_: &HandlerInvocation| HandlerResponse::ok(json!(null))),
        methods: methods.to_vec(),
        template,
        chain: OwnershipChain::new(),
        config: Arc::new(ResolvedConfig::default()),
        name: None,
        label: Arc::from(label.as_str()),
        consumed: Vec::new(),
    })
}

fn endpoint(methods: &[Method], path: &str) -> Arc<Endpoint> {
    endpoint_with(methods, PathTemplate::parse(path).unwrap())
}

fn tree(routes: &[(&[Method], &str)]) -> RouteTree {
    let mut tree = RouteTree::new();
    for (methods, path) in routes {
        tree.insert(endpoint(methods, path)).unwrap();
    }
    tree
}

fn matched(lookup: Lookup) -> (String, Vec<(String, ParamValue)>) {
    match lookup {
        Lookup::Matched { endpoint, params } => (
            endpoint.template().to_string(),
            params
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        ),
        other => panic!("expected a match, got {other:?}"),
    }
}

fn mount_point(path: &str, methods: Option<Vec<Method>>) -> Arc<MountPoint> {
    Arc::new(MountPoint {
        path: PathTemplate::parse(path).unwrap(),
        app: Arc::new(Application::builder().build().unwrap()),
        scope_mode: None,
        methods,
        owner: Owner::new(OwnerKind::Mount, path),
    })
}

#[test]
fn test_root_path() {
    let tree = tree(&[(&[Method::GET], "/")]);
    let (path, params) = matched(tree.lookup(&Method::GET, "/"));
    assert_eq!(path, "/");
    assert!(params.is_empty());
}

#[test]
fn test_trailing_and_repeated_slashes_are_ignored() {
    let tree = tree(&[(&[Method::GET], "/users")]);
    for request in ["/users", "/users/", "//users", "users"] {
        assert_eq!(matched(tree.lookup(&Method::GET, request)).0, "/users");
    }
}

#[test]
fn test_static_beats_parameter() {
    let tree = tree(&[
        (&[Method::GET], "/users/me"),
        (&[Method::GET], "/users/{name:str}"),
    ]);
    assert_eq!(matched(tree.lookup(&Method::GET, "/users/me")).0, "/users/me");
    let (path, params) = matched(tree.lookup(&Method::GET, "/users/bob"));
    assert_eq!(path, "/users/{name:str}");
    assert_eq!(params[0].1, ParamValue::from("bob"));
}

#[test]
fn test_typed_parameter_coerces() {
    let tree = tree(&[(&[Method::GET], "/items/{id:int}")]);
    let (_, params) = matched(tree.lookup(&Method::GET, "/items/42"));
    assert_eq!(params, vec![("id".to_string(), ParamValue::Int(42))]);
    assert!(matches!(
        tree.lookup(&Method::GET, "/items/abc"),
        Lookup::NotFound
    ));
}

#[test]
fn test_failed_coercion_falls_back_to_sibling() {
    let tree = tree(&[
        (&[Method::GET], "/items/{id:int}"),
        (&[Method::GET], "/items/{slug:str}"),
    ]);
    let (path, _) = matched(tree.lookup(&Method::GET, "/items/42"));
    assert_eq!(path, "/items/{id:int}");
    let (path, params) = matched(tree.lookup(&Method::GET, "/items/abc"));
    assert_eq!(path, "/items/{slug:str}");
    assert_eq!(params[0].0, "slug");
}

#[test]
fn test_uuid_tried_before_str() {
    let tree = tree(&[
        (&[Method::GET], "/orders/{name:str}"),
        (&[Method::GET], "/orders/{id:uuid}"),
    ]);
    let (path, _) = matched(tree.lookup(
        &Method::GET,
        "/orders/67e55044-10b1-426f-9247-bb680e5fe0c8",
    ));
    assert_eq!(path, "/orders/{id:uuid}");
    assert_eq!(
        matched(tree.lookup(&Method::GET, "/orders/latest")).0,
        "/orders/{name:str}"
    );
}

#[test]
fn test_backtracks_out_of_dead_branch() {
    let tree = tree(&[
        (&[Method::GET], "/a/{x:int}/b"),
        (&[Method::GET], "/a/{y:str}/c"),
    ]);
    let (path, params) = matched(tree.lookup(&Method::GET, "/a/1/c"));
    assert_eq!(path, "/a/{y:str}/c");
    assert_eq!(params, vec![("y".to_string(), ParamValue::from("1"))]);
    assert_eq!(matched(tree.lookup(&Method::GET, "/a/1/b")).0, "/a/{x:int}/b");
}

#[test]
fn test_parameter_names_bound_per_endpoint() {
    let tree = tree(&[
        (&[Method::GET], "/users/{id:int}"),
        (&[Method::GET], "/users/{user_id:int}/posts"),
    ]);
    let (_, params) = matched(tree.lookup(&Method::GET, "/users/3"));
    assert_eq!(params[0].0, "id");
    let (_, params) = matched(tree.lookup(&Method::GET, "/users/3/posts"));
    assert_eq!(params[0].0, "user_id");
}

#[test]
fn test_method_not_allowed_lists_sorted_methods() {
    let tree = tree(&[
        (&[Method::POST], "/users"),
        (&[Method::GET], "/users"),
        (&[Method::GET], "/users/{id:int}"),
    ]);
    match tree.lookup(&Method::PUT, "/users") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::GET, Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
    match tree.lookup(&Method::DELETE, "/users/7") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::GET]),
        other => panic!("expected 405, got {other:?}"),
    }
    assert!(matches!(
        tree.lookup(&Method::GET, "/users/abc"),
        Lookup::NotFound
    ));
}

#[test]
fn test_method_not_allowed_merges_sibling_candidates() {
    let tree = tree(&[
        (&[Method::GET], "/items/{id:int}"),
        (&[Method::POST], "/items/{slug:str}"),
        (&[Method::POST], "/users/me"),
        (&[Method::GET], "/users/{name:str}"),
    ]);
    assert_eq!(matched(tree.lookup(&Method::POST, "/items/5")).0, "/items/{slug:str}");
    match tree.lookup(&Method::DELETE, "/items/5") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::GET, Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
    // Only the str sibling can take a non-numeric segment
    match tree.lookup(&Method::DELETE, "/items/abc") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }

    assert_eq!(matched(tree.lookup(&Method::GET, "/users/me")).0, "/users/{name:str}");
    match tree.lookup(&Method::DELETE, "/users/me") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::GET, Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_method_not_allowed_skips_rejecting_constraints() {
    let mut template = PathTemplate::parse("/pages/{n:int}").unwrap();
    assert!(template.constrain("n", &ParamConstraints::default().ge(1.0)));
    let mut tree = RouteTree::new();
    tree.insert(endpoint_with(&[Method::GET], template)).unwrap();
    tree.insert(endpoint(&[Method::POST], "/pages/{name:str}"))
        .unwrap();

    match tree.lookup(&Method::DELETE, "/pages/0") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
    match tree.lookup(&Method::DELETE, "/pages/2") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::GET, Method::POST]),
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_greedy_path_parameter() {
    let tree = tree(&[
        (&[Method::GET], "/files/readme"),
        (&[Method::GET], "/files/{rest:path}"),
    ]);
    let (path, params) = matched(tree.lookup(&Method::GET, "/files/a/b/c.txt"));
    assert_eq!(path, "/files/{rest:path}");
    assert_eq!(params[0].1, ParamValue::Path("/a/b/c.txt".to_string()));
    assert_eq!(matched(tree.lookup(&Method::GET, "/files/readme")).0, "/files/readme");
    assert!(matches!(tree.lookup(&Method::GET, "/files"), Lookup::NotFound));
}

#[test]
fn test_constraint_violation_backtracks() {
    let mut template = PathTemplate::parse("/pages/{n:int}").unwrap();
    assert!(template.constrain("n", &ParamConstraints::default().ge(1.0)));
    let mut tree = RouteTree::new();
    tree.insert(endpoint_with(&[Method::GET], template)).unwrap();
    tree.insert(endpoint(&[Method::GET], "/pages/{name:str}"))
        .unwrap();

    assert_eq!(matched(tree.lookup(&Method::GET, "/pages/3")).0, "/pages/{n:int}");
    assert_eq!(
        matched(tree.lookup(&Method::GET, "/pages/0")).0,
        "/pages/{name:str}"
    );
}

#[test]
fn test_ambiguous_route_is_rejected() {
    let mut tree = tree(&[(&[Method::GET, Method::POST], "/users/{id:int}")]);
    let err: AmbiguousRouteError = tree
        .insert(endpoint(&[Method::POST], "/users/{user_id:int}"))
        .unwrap_err();
    assert_eq!(err.method, Some(Method::POST));
    assert!(err.to_string().contains("/users/{user_id:int}"));

    // Another method on the same node is fine
    tree.insert(endpoint(&[Method::DELETE], "/users/{user_id:int}"))
        .unwrap();
    assert_eq!(tree.len(), 2);
}

#[test]
fn test_mount_prefix_and_remainder() {
    let mut tree = tree(&[(&[Method::GET], "/health")]);
    tree.insert_mount(mount_point("/app", None)).unwrap();

    match tree.lookup(&Method::GET, "/app/users/7") {
        Lookup::Mount {
            prefix, remainder, ..
        } => {
            assert_eq!(prefix, "/app");
            assert_eq!(remainder, "/users/7");
        }
        other => panic!("expected mount, got {other:?}"),
    }
    match tree.lookup(&Method::POST, "/app") {
        Lookup::Mount { remainder, .. } => assert_eq!(remainder, "/"),
        other => panic!("expected mount, got {other:?}"),
    }
    assert!(matches!(
        tree.lookup(&Method::GET, "/app-extra"),
        Lookup::NotFound
    ));
}

#[test]
fn test_mount_method_filter() {
    let mut tree = RouteTree::new();
    tree.insert_mount(mount_point("/static", Some(vec![Method::HEAD, Method::GET])))
        .unwrap();
    assert!(matches!(
        tree.lookup(&Method::GET, "/static/site.css"),
        Lookup::Mount { .. }
    ));
    match tree.lookup(&Method::POST, "/static/site.css") {
        Lookup::MethodNotAllowed(methods) => assert_eq!(methods, vec![Method::GET, Method::HEAD]),
        other => panic!("expected 405, got {other:?}"),
    }
}

#[test]
fn test_routes_on_mount_path_win_over_mount() {
    let mut tree = tree(&[(&[Method::GET], "/app/status")]);
    tree.insert_mount(mount_point("/app", None)).unwrap();
    assert_eq!(matched(tree.lookup(&Method::GET, "/app/status")).0, "/app/status");
    assert!(matches!(
        tree.lookup(&Method::GET, "/app/other"),
        Lookup::Mount { .. }
    ));
    assert!(tree.insert_mount(mount_point("/app", None)).is_err());
}

#[test]
fn test_router_routes_sorted() {
    let router = Router::new(
        tree(&[
            (&[Method::POST, Method::GET], "/users"),
            (&[Method::GET], "/health"),
        ]),
        Duration::from_millis(1),
    );
    let listing: Vec<(String, String)> = router
        .routes()
        .into_iter()
        .map(|r| (r.method.to_string(), r.path))
        .collect();
    assert_eq!(
        listing,
        vec![
            ("GET".to_string(), "/health".to_string()),
            ("GET".to_string(), "/users".to_string()),
            ("POST".to_string(), "/users".to_string()),
        ]
    );
    assert_eq!(router.tree().len(), 2);
}
