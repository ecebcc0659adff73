use std::time::Duration;

use tracing::{debug, info, info_span};

use super::Middleware;
use crate::dispatcher::{HandlerInvocation, HandlerResponse};

/// Emits one `request` span per invocation with method, path, handler, status and latency.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, inv: &HandlerInvocation) -> Option<HandlerResponse> {
        debug!(
            method = %inv.method,
            path = %inv.path,
            handler = %inv.handler_name(),
            mount_path = ?inv.mount_path,
            "Request started"
        );
        None
    }

    fn after(&self, inv: &HandlerInvocation, res: &mut HandlerResponse, latency: Duration) {
        let span = info_span!(
            "request",
            method = %inv.method,
            path = %inv.path,
            handler = %inv.handler_name(),
            status = res.status,
            latency_ms = latency.as_millis() as u64,
        );
        span.in_scope(|| info!("Request completed"));
    }
}
