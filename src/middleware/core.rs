use std::sync::Arc;
use std::time::Duration;

use crate::dispatcher::{HandlerInvocation, HandlerResponse};

/// Request/response interceptor attached to a layer.
///
/// `before` runs in chain order (application first). Returning a response from `before`
/// short-circuits the handler; remaining middleware still see the request. `after` runs for
/// every middleware on whatever response was produced.
pub trait Middleware: Send + Sync {
    fn before(&self, _inv: &HandlerInvocation) -> Option<HandlerResponse> {
        None
    }
    fn after(&self, _inv: &HandlerInvocation, _res: &mut HandlerResponse, _latency: Duration) {}
}

/// Authorization check run before any middleware or hook.
///
/// `Err` carries the response sent instead of calling the handler.
pub trait Guard: Send + Sync {
    fn check(&self, inv: &HandlerInvocation) -> Result<(), HandlerResponse>;
}

impl<F> Guard for F
where
    F: Fn(&HandlerInvocation) -> Result<(), HandlerResponse> + Send + Sync,
{
    fn check(&self, inv: &HandlerInvocation) -> Result<(), HandlerResponse> {
        self(inv)
    }
}

/// Runs before the handler; a returned response replaces the handler call
pub type BeforeRequestHook =
    Arc<dyn Fn(&HandlerInvocation) -> Option<HandlerResponse> + Send + Sync>;

/// Runs after the handler and may replace the response
pub type AfterRequestHook =
    Arc<dyn Fn(&HandlerInvocation, HandlerResponse) -> HandlerResponse + Send + Sync>;
