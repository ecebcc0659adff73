//! # Dispatcher Module
//!
//! Turns a `(method, path, scope)` triple into a [`HandlerInvocation`] and runs it.
//!
//! ## Request Flow
//!
//! 1. The router matches the path, coercing parameters and backtracking on failures
//! 2. Requests under a mount are forwarded to the mounted application's dispatcher with the
//!    prefix stripped and the scope prepared per [`ScopeMode`]
//! 3. A terminal match becomes a [`HandlerInvocation`] referencing the endpoint's cached
//!    [`ResolvedConfig`](crate::layer::ResolvedConfig)
//! 4. [`Dispatcher::handle`] runs guards, hooks, middleware and the handler, then applies the
//!    layered response headers, cookies and cache-control
//!
//! ## Error Handling
//!
//! - No route: 404
//! - Path without the method: 405 with a sorted `Allow` header
//! - Missing or invalid layered parameters: 400
//! - Handler panics are caught and return 500
//!
//! ## Example
//!
//! ```rust,ignore
//! use http::Method;
//! use strata_router::dispatcher::RequestScope;
//!
//! let resp = app.dispatcher().handle(Method::GET, "/users/7", RequestScope::new());
//! assert_eq!(resp.status, 200);
//! ```

mod core;
mod scope;

pub use core::{
    Dispatcher, Handler, HandlerInvocation, HandlerResponse, HeaderVec, MAX_INLINE_HEADERS,
};
pub use scope::{RequestScope, ScopeMode, ScopeState};
