//! # Middleware Module
//!
//! Interceptors attached to layers: [`Middleware`] wraps the handler call, [`Guard`]s
//! authorize the request first, and `before_request` / `after_request` hooks replace or
//! rewrite the response. Lists of middleware and guards concatenate from the application
//! down to the handler.

mod core;
mod tracing;

pub use core::{AfterRequestHook, BeforeRequestHook, Guard, Middleware};
pub use tracing::TracingMiddleware;
