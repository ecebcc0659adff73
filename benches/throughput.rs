use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::Method;
use serde_json::json;
use strata_router::app::Application;
use strata_router::dispatcher::{HandlerInvocation, HandlerResponse, RequestScope};
use strata_router::layer::Layer;
use strata_router::registrar::{HandlerSpec, MountSpec, RouterSpec};

fn ok(_: &HandlerInvocation) -> HandlerResponse {
    HandlerResponse::ok(json!({ "ok": true }))
}

fn zoo_app() -> Application {
    let admin = Application::builder()
        .route(HandlerSpec::get("/status", ok))
        .build()
        .expect("admin app");

    Application::builder()
        .layer(Layer::builder().tag("zoo").response_header("x-zoo", "1").build())
        .route(HandlerSpec::get("/", ok))
        .route(
            RouterSpec::new("/zoo")
                .route(HandlerSpec::get("/animals", ok))
                .route(HandlerSpec::post("/animals", ok))
                .route(HandlerSpec::get("/animals/{id:int}", ok))
                .route(HandlerSpec::put("/animals/{id:int}", ok))
                .route(HandlerSpec::delete("/animals/{id:int}", ok))
                .route(HandlerSpec::get("/animals/{id:int}/toys/{toy_id:uuid}", ok))
                .route(HandlerSpec::get("/animals/{name:str}/profile", ok))
                .route(HandlerSpec::get(
                    "/{category:str}/animals/{id:int}/habitats/{habitat_id:int}/sections/{section_id:int}",
                    ok,
                ))
                .route(HandlerSpec::get("/health", ok)),
        )
        .route(HandlerSpec::post(
            "/inventory/{warehouse_id:int}/feeds/{feed_id:int}/items/{item_id:int}/batches/{batch_id:int}",
            ok,
        ))
        .route(HandlerSpec::get("/files/{rest:path}", ok))
        .route(MountSpec::new("/admin", admin))
        .build()
        .expect("zoo app")
}

const PATHS: [(Method, &str); 7] = [
    (Method::GET, "/zoo/animals/123"),
    (Method::GET, "/zoo/animals/123/toys/6f9619ff-8b86-d011-b42d-00cf4fc964ff"),
    (Method::GET, "/zoo/animals/rex/profile"),
    (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
    (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
    (Method::GET, "/files/a/b/c.txt"),
    (Method::GET, "/admin/status"),
];

fn bench_route_match(c: &mut Criterion) {
    let app = zoo_app();
    let router = app.router();
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in PATHS.iter() {
                black_box(router.route(method, path));
            }
        })
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let app = zoo_app();
    c.bench_function("dispatch_and_invoke", |b| {
        b.iter(|| {
            for (method, path) in PATHS.iter() {
                black_box(app.handle(method.clone(), path, RequestScope::new()));
            }
        })
    });
}

criterion_group!(benches, bench_route_match, bench_dispatch);
criterion_main!(benches);
