//! # strata-router
//!
//! **strata-router** is the routing and dispatch core of a layered web framework: a typed radix
//! route tree, a hierarchical configuration merge, and a dispatcher that turns a request path
//! into a handler invocation.
//!
//! ## Overview
//!
//! Applications are declared as a tree of components: routers (a path prefix and a layer),
//! controllers (a named group of handlers), handlers, and mounts of other applications. Every
//! level can carry a [`Layer`](layer::Layer) of configuration: middleware, guards, tags,
//! dependency providers, layered parameters, response headers, cookies, cache-control and
//! opaque options. At startup each handler path is resolved once into an endpoint holding the
//! merged configuration of its whole ownership chain; requests only do a lookup.
//!
//! ## Architecture
//!
//! - **[`path`]** - Path template parsing (`/users/{id:int}`) and path normalisation
//! - **[`coerce`]** - Typed parameter values, coercion of raw segments and value constraints
//! - **[`layer`]** - Layers, ownership chains and the merge into a resolved config
//! - **[`registrar`]** - Component declarations and their registration into a route tree
//! - **[`router`]** - The radix route tree and the logging router around it
//! - **[`dispatcher`]** - Request scope, handler invocation and the response pipeline
//! - **[`middleware`]** - Middleware, guard and request hook traits
//! - **[`app`]** - Application building, reverse routing and live rebuilds
//! - **[`config`]** - Router settings from YAML or the environment
//! - **[`telemetry`]** - `tracing-subscriber` setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Dispatcher
//!     participant Router
//!     participant Mount as Mounted App
//!     participant Pipeline as Guards / Middleware
//!     participant Handler
//!
//!     Transport->>Dispatcher: handle(GET, "/api/users/7", scope)
//!     Dispatcher->>Router: route(GET, "/api/users/7")
//!     Router->>Router: descend static, typed, greedy children
//!
//!     alt Mount prefix reached
//!         Router-->>Dispatcher: Mount { prefix: "/api", remainder: "/users/7" }
//!         Dispatcher->>Mount: dispatch(GET, "/users/7", scope per ScopeMode)
//!     end
//!
//!     alt No terminal node
//!         Router-->>Transport: 404 Not Found
//!     end
//!     alt Path exists, method does not
//!         Router-->>Transport: 405 + Allow
//!     end
//!
//!     Router-->>Dispatcher: Matched { endpoint, params: {id: 7} }
//!     Dispatcher->>Pipeline: guards, before_request, middleware before
//!     Pipeline->>Handler: handle(&invocation)
//!     Handler-->>Pipeline: HandlerResponse
//!     Pipeline->>Pipeline: middleware after, after_request
//!     Pipeline-->>Transport: response + layered headers, cookies, cache-control
//! ```
//!
//! ### Matching Order
//!
//! At every node the tree tries, in order, the static child for the segment, typed parameter
//! children from most to least specific (`uuid` before `int` before `str`), a greedy `path`
//! child, and finally a mount. A segment that does not coerce to a child's type, or breaks one
//! of its constraints, moves on to the next candidate; the search backtracks until a terminal
//! node is found or every branch is exhausted.
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use strata_router::app::Application;
//! use strata_router::dispatcher::{HandlerInvocation, HandlerResponse, RequestScope};
//! use strata_router::registrar::{HandlerSpec, RouterSpec};
//!
//! fn list_users(_: &HandlerInvocation) -> HandlerResponse {
//!     HandlerResponse::ok(json!([]))
//! }
//!
//! fn get_user(inv: &HandlerInvocation) -> HandlerResponse {
//!     let id = inv.path_param("id").and_then(|v| v.as_i64()).unwrap_or_default();
//!     HandlerResponse::ok(json!({ "id": id }))
//! }
//!
//! let app = Application::builder()
//!     .route(
//!         RouterSpec::new("/users")
//!             .route(HandlerSpec::get("/", list_users))
//!             .route(HandlerSpec::get("/{id:int}", get_user).name("get_user")),
//!     )
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(app.handle(Method::GET, "/users/7", RequestScope::new()).body["id"], 7);
//! assert_eq!(app.handle(Method::GET, "/users/abc", RequestScope::new()).status, 404);
//! assert_eq!(app.handle(Method::DELETE, "/users", RequestScope::new()).status, 405);
//! assert_eq!(app.route_reverse("get_user", &[("id", 7.into())]).unwrap(), "/users/7");
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events with structured fields (route matched, slow matches, 404s
//! and 405s, mount forwarding, build errors, live rebuilds). Install a subscriber with
//! [`telemetry::init_logging_with_config`] or any other `tracing` subscriber.

pub mod app;
pub mod coerce;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod layer;
pub mod middleware;
pub mod path;
pub mod registrar;
pub mod router;
pub mod telemetry;

pub use app::{Application, ApplicationBuilder, LiveApplication};
pub use config::RouterConfig;
pub use dispatcher::{Dispatcher, HandlerInvocation, HandlerResponse, RequestScope, ScopeMode};
pub use error::{BuildError, DispatchError};
pub use layer::Layer;
pub use path::{ParamType, PathTemplate};
