//! Build-time validation and handler names
//!
//! # Test Coverage
//!
//! - Every `BuildError` variant is raised for the declaration that causes it
//! - Path parameter constraints from path-located specs
//! - Handler name index and reverse routing

mod common;

use common::{echo, get, tagged};
use chrono::NaiveDate;
use strata_router::app::Application;
use strata_router::coerce::{ParamConstraints, ParamValue};
use strata_router::error::{BuildError, ReverseError};
use strata_router::layer::{Layer, ParameterSpec, Provider};
use strata_router::registrar::{HandlerSpec, MountSpec, RouterSpec};

fn build_err(builder: strata_router::app::ApplicationBuilder) -> BuildError {
    builder.build().unwrap_err()
}

#[test]
fn test_invalid_path_syntax() {
    let err = build_err(Application::builder().route(HandlerSpec::get("/a/{x:foo}", echo)));
    match err {
        BuildError::PathSyntax(inner) => assert!(inner.to_string().contains("{x:foo}")),
        other => panic!("unexpected {other:?}"),
    }

    let err = build_err(Application::builder().route(HandlerSpec::get("/a/{rest:path}/b", echo)));
    assert!(matches!(err, BuildError::PathSyntax(_)));
}

#[test]
fn test_ambiguous_route() {
    let err = build_err(
        Application::builder()
            .route(HandlerSpec::get("/users/{id:int}", echo))
            .route(RouterSpec::new("/users").route(HandlerSpec::get("/{user_id:int}", echo))),
    );
    assert!(matches!(err, BuildError::AmbiguousRoute(_)));
}

#[test]
fn test_path_parameter_redeclared_across_fragments() {
    let err = build_err(
        Application::builder().route(
            RouterSpec::new("/users/{id:int}").route(HandlerSpec::get("/{id:int}", echo).name("get")),
        ),
    );
    match err {
        BuildError::PathParameterRedeclared { name, first, second } => {
            assert_eq!(name, "id");
            assert!(first.contains("/users/{id:int}"), "{first}");
            assert!(second.contains("get"), "{second}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_path_parameter_redeclared_in_specs() {
    let err = build_err(
        Application::builder().route(
            RouterSpec::new("/users/{id:int}")
                .layer(
                    Layer::builder()
                        .parameter("id", ParameterSpec::path(ParamConstraints::default().ge(1.0)))
                        .build(),
                )
                .route(
                    HandlerSpec::get("/", echo).layer(
                        Layer::builder()
                            .parameter("id", ParameterSpec::path(ParamConstraints::default().le(9.0)))
                            .build(),
                    ),
                ),
        ),
    );
    assert!(matches!(
        err,
        BuildError::PathParameterRedeclared { ref name, .. } if name == "id"
    ));
}

#[test]
fn test_unknown_path_parameter() {
    let err = build_err(
        Application::builder().route(
            HandlerSpec::get("/users/{id:int}", echo).layer(
                Layer::builder()
                    .parameter("user_id", ParameterSpec::path(ParamConstraints::default()))
                    .build(),
            ),
        ),
    );
    assert!(matches!(
        err,
        BuildError::UnknownPathParameter { ref name, .. } if name == "user_id"
    ));
}

#[test]
fn test_unsatisfied_parameter() {
    let err = build_err(
        Application::builder()
            .route(HandlerSpec::get("/users/{id:int}", echo).consumes(["id", "account"])),
    );
    match err {
        BuildError::UnsatisfiedParameter { name, path, .. } => {
            assert_eq!(name, "account");
            assert_eq!(path, "/users/{id:int}");
        }
        other => panic!("unexpected {other:?}"),
    }

    // Names consumed by a dependency the handler uses count too
    let err = build_err(
        Application::builder()
            .layer(
                Layer::builder()
                    .dependency("session", Provider::value(serde_json::json!({})).consumes(["token"]))
                    .build(),
            )
            .route(HandlerSpec::get("/me", echo).consumes(["session"])),
    );
    assert!(matches!(
        err,
        BuildError::UnsatisfiedParameter { ref name, .. } if name == "token"
    ));

    // Reserved names are always available
    Application::builder()
        .route(HandlerSpec::get("/me", echo).consumes(["request", "state", "headers"]))
        .build()
        .unwrap();
}

#[test]
fn test_duplicate_handler_name() {
    let err = build_err(
        Application::builder()
            .route(HandlerSpec::get("/a", echo).name("thing"))
            .route(HandlerSpec::get("/b", tagged("b")).name("thing")),
    );
    match err {
        BuildError::DuplicateHandlerName {
            name,
            existing_path,
            incoming_path,
        } => {
            assert_eq!(name, "thing");
            assert_eq!(existing_path, "/a");
            assert_eq!(incoming_path, "/b");
        }
        other => panic!("unexpected {other:?}"),
    }

    // The same handler under two parents keeps its name
    let shared = HandlerSpec::get("/info", echo).name("info");
    let app = Application::builder()
        .route(RouterSpec::new("/v1").route(shared.clone()))
        .route(RouterSpec::new("/v2").route(shared))
        .build()
        .unwrap();
    assert_eq!(
        app.handler_index("info").unwrap().paths,
        vec!["/v1/info".to_string(), "/v2/info".to_string()]
    );
}

#[test]
fn test_invalid_mounts() {
    let child = || Application::builder().build().unwrap();

    let err = build_err(Application::builder().route(MountSpec::new("/apps/{id:int}", child())));
    assert!(matches!(err, BuildError::InvalidMount { .. }));

    let err = build_err(
        Application::builder()
            .route(RouterSpec::new("/tenants/{tenant:str}").route(MountSpec::new("/app", child()))),
    );
    assert!(matches!(err, BuildError::InvalidMount { .. }));

    let err = build_err(
        Application::builder()
            .route(MountSpec::new("/app", child()))
            .route(MountSpec::new("/app/", child())),
    );
    assert!(matches!(err, BuildError::AmbiguousRoute(_)));
}

#[test]
fn test_path_constraints_backtrack_to_404() {
    let app = Application::builder()
        .route(
            HandlerSpec::get("/pages/{n:int}", echo).layer(
                Layer::builder()
                    .parameter(
                        "n",
                        ParameterSpec::path(ParamConstraints::default().gt(0.0).le(100.0)),
                    )
                    .build(),
            ),
        )
        .route(
            HandlerSpec::get("/tags/{tag:str}", echo).layer(
                Layer::builder()
                    .parameter(
                        "tag",
                        ParameterSpec::path(
                            ParamConstraints::default()
                                .min_length(2)
                                .pattern(regex::Regex::new("^[a-z]+$").unwrap()),
                        ),
                    )
                    .build(),
            ),
        )
        .build()
        .unwrap();

    assert_eq!(get(&app, "/pages/1").status, 200);
    assert_eq!(get(&app, "/pages/0").status, 404);
    assert_eq!(get(&app, "/pages/101").status, 404);
    assert_eq!(get(&app, "/tags/rust").status, 200);
    assert_eq!(get(&app, "/tags/r").status, 404);
    assert_eq!(get(&app, "/tags/Rust").status, 404);
}

#[test]
fn test_handler_index() {
    let app = Application::builder()
        .route(
            HandlerSpec::get("/users/{id:int}", echo)
                .path("/people/{id:int}")
                .name("get_user"),
        )
        .build()
        .unwrap();

    let index = app.handler_index("get_user").unwrap();
    assert_eq!(index.name, "get_user");
    assert_eq!(index.paths, vec!["/people/{id:int}", "/users/{id:int}"]);
    assert!(app.handler_index("missing").is_none());
}

#[test]
fn test_route_reverse() {
    let app = Application::builder()
        .route(
            HandlerSpec::get("/articles", echo)
                .path("/articles/{year:int}")
                .path("/articles/{year:int}/{slug:str}")
                .name("articles"),
        )
        .route(HandlerSpec::get("/archive/{day:date}", echo).name("archive"))
        .build()
        .unwrap();

    assert_eq!(app.route_reverse("articles", &[]).unwrap(), "/articles");
    assert_eq!(
        app.route_reverse("articles", &[("year", 2024.into())]).unwrap(),
        "/articles/2024"
    );
    assert_eq!(
        app.route_reverse("articles", &[("year", 2024.into()), ("slug", "hello".into())])
            .unwrap(),
        "/articles/2024/hello"
    );

    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert_eq!(
        app.route_reverse("archive", &[("day", ParamValue::Date(day))]).unwrap(),
        "/archive/2024-03-01"
    );
    assert_eq!(
        app.route_reverse("archive", &[("day", "2024-03-01".into())]).unwrap(),
        "/archive/2024-03-01"
    );

    assert!(matches!(
        app.route_reverse("articles", &[("year", "2024".into())]),
        Err(ReverseError::NoMatchingPath { .. })
    ));
    // A slug spanning segments or an empty one would not route back to the handler
    for slug in ["2024/hello", ""] {
        assert!(matches!(
            app.route_reverse("articles", &[("year", 2024.into()), ("slug", slug.into())]),
            Err(ReverseError::NoMatchingPath { .. })
        ));
    }
    assert_eq!(
        app.route_reverse("nope", &[]),
        Err(ReverseError::UnknownHandler("nope".to_string()))
    );
}
