//! Dispatcher core module - request dispatch and the invocation pipeline.

use http::Method;
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::scope::{RequestScope, ScopeMode};
use crate::coerce::{coerce, ParamValue};
use crate::error::{DispatchError, ParameterError};
use crate::layer::{ParameterLocation, ResolvedConfig};
use crate::path::join_paths;
use crate::router::{Endpoint, Lookup, ParamVec, Router};

/// Maximum inline headers/cookies before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header, cookie and query storage.
///
/// Names are `Arc<str>`: they repeat across requests (`content-type`, `set-cookie`) and
/// cloning them is an atomic increment.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// A request handler.
///
/// Any `Fn(&HandlerInvocation) -> HandlerResponse` closure is a handler.
pub trait Handler: Send + Sync {
    fn handle(&self, inv: &HandlerInvocation) -> HandlerResponse;
}

impl<F> Handler for F
where
    F: Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync,
{
    fn handle(&self, inv: &HandlerInvocation) -> HandlerResponse {
        self(inv)
    }
}

/// A matched, layer-resolved call, ready to run.
///
/// Created per request by [`Dispatcher::dispatch`] and dropped after the response is built.
#[derive(Debug, Clone)]
pub struct HandlerInvocation {
    pub method: Method,
    /// Path as seen by the application that owns the endpoint (mount prefixes stripped)
    pub path: String,
    pub endpoint: Arc<Endpoint>,
    /// Coerced path parameters in declaration order
    pub path_params: ParamVec,
    pub config: Arc<ResolvedConfig>,
    pub scope: RequestScope,
    /// Prefix consumed by enclosing mounts, `None` outside any mount
    pub mount_path: Option<String>,
}

impl HandlerInvocation {
    /// Coerced path parameter by name
    #[inline]
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&ParamValue> {
        self.path_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Name used for the handler in logs
    #[must_use]
    pub fn handler_name(&self) -> &str {
        self.endpoint.label()
    }

    /// Value from the layered `opt` map
    #[must_use]
    pub fn opt(&self, key: &str) -> Option<&Value> {
        self.config.opt.get(key)
    }

    /// Read a layered parameter.
    ///
    /// Path parameters come from the match, query/header/cookie parameters from the request
    /// scope, coerced to the declared type. A missing optional parameter yields its default or
    /// `null`.
    ///
    /// # Errors
    ///
    /// [`ParameterError`] when the name is not declared, a required value is missing, or a
    /// value does not coerce or violates its constraints.
    pub fn parameter(&self, name: &str) -> Result<Value, ParameterError> {
        let spec = self
            .config
            .parameters
            .get(name)
            .ok_or_else(|| ParameterError::Undeclared(name.to_string()))?;

        let raw = match spec.location {
            ParameterLocation::Path => {
                return self
                    .path_param(name)
                    .map(ParamValue::to_json)
                    .ok_or_else(|| ParameterError::Missing {
                        name: name.to_string(),
                        location: spec.location,
                    });
            }
            ParameterLocation::Query => self.scope.get_query(spec.key(name)),
            ParameterLocation::Header => self.scope.get_header(spec.key(name)),
            ParameterLocation::Cookie => self.scope.get_cookie(spec.key(name)),
        };

        let Some(raw) = raw else {
            if spec.required {
                return Err(ParameterError::Missing {
                    name: name.to_string(),
                    location: spec.location,
                });
            }
            return Ok(spec.default.clone().unwrap_or(Value::Null));
        };

        let value = coerce(spec.kind, raw).map_err(|err| ParameterError::Invalid {
            name: name.to_string(),
            location: spec.location,
            reason: err.to_string(),
        })?;
        spec.constraints
            .check(&value)
            .map_err(|reason| ParameterError::Invalid {
                name: name.to_string(),
                location: spec.location,
                reason,
            })?;
        Ok(value.to_json())
    }

    /// Evaluate a layered dependency for this request
    #[must_use]
    pub fn dependency(&self, name: &str) -> Option<Value> {
        self.config
            .dependencies
            .get(name)
            .map(|provider| provider.provide(self))
    }

    /// Check every declared non-path parameter, so handlers see a 400 instead of bad input
    fn validate_parameters(&self) -> Result<(), ParameterError> {
        for (name, spec) in &self.config.parameters {
            if spec.location != ParameterLocation::Path {
                self.parameter(name)?;
            }
        }
        Ok(())
    }
}

/// Response produced by the invocation pipeline
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 500, etc.)
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a `content-type` header
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    /// `200` JSON response
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self::json(200, body)
    }

    /// Error response with `{"error": message}`
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// First header by case-insensitive name
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value of a header, e.g. all `set-cookie` lines
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Add a header line without replacing existing ones
    pub fn append_header(&mut self, name: &str, value: String) {
        self.headers.push((Arc::from(name), value));
    }
}

impl From<DispatchError> for HandlerResponse {
    fn from(err: DispatchError) -> Self {
        let mut resp = HandlerResponse::error(err.status_code().as_u16(), &err.to_string());
        if let Some(allow) = err.allow_header() {
            resp.set_header("allow", allow);
        }
        resp
    }
}

impl From<ParameterError> for HandlerResponse {
    fn from(err: ParameterError) -> Self {
        HandlerResponse::error(err.status_code().as_u16(), &err.to_string())
    }
}

/// Routes requests of one application to its endpoints and mounts.
///
/// Cheap to clone; the route tree is shared.
#[derive(Clone)]
pub struct Dispatcher {
    router: Arc<Router>,
    default_scope: ScopeMode,
}

impl Dispatcher {
    #[must_use]
    pub fn new(router: Arc<Router>, default_scope: ScopeMode) -> Self {
        Self {
            router,
            default_scope,
        }
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Resolve a request into an invocation.
    ///
    /// Requests under a mount are forwarded to the mounted application's dispatcher with the
    /// prefix stripped; the consumed prefix is recorded on the returned invocation.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NotFound`] or [`DispatchError::MethodNotAllowed`], including those
    /// returned by a mounted application.
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        scope: RequestScope,
    ) -> Result<HandlerInvocation, DispatchError> {
        match self.router.route(&method, path) {
            Lookup::Matched { endpoint, params } => Ok(HandlerInvocation {
                method,
                path: path.to_string(),
                config: Arc::clone(endpoint.config()),
                endpoint,
                path_params: params,
                scope,
                mount_path: None,
            }),
            Lookup::Mount {
                mount,
                prefix,
                remainder,
            } => {
                let mode = mount.scope_mode().unwrap_or(self.default_scope);
                let child_scope = scope.for_mount(mode);
                let mut inv = mount
                    .app()
                    .dispatcher()
                    .dispatch(method, &remainder, child_scope)?;
                inv.mount_path = Some(match inv.mount_path.take() {
                    Some(inner) => join_paths(&[prefix.as_str(), inner.as_str()]),
                    None => prefix,
                });
                Ok(inv)
            }
            Lookup::MethodNotAllowed(allowed) => Err(DispatchError::MethodNotAllowed(allowed)),
            Lookup::NotFound => Err(DispatchError::NotFound),
        }
    }

    /// Dispatch and run a request, mapping routing errors to 404/405 responses
    #[must_use]
    pub fn handle(&self, method: Method, path: &str, scope: RequestScope) -> HandlerResponse {
        match self.dispatch(method, path, scope) {
            Ok(inv) => Self::invoke(&inv),
            Err(err) => HandlerResponse::from(err),
        }
    }

    /// Run the invocation pipeline.
    ///
    /// Order: body size limit, guards, `before_request`, middleware `before`, parameter
    /// validation, handler, middleware `after`, `after_request`, then layered response headers,
    /// cookies, cache-control and media type for anything the response does not set itself.
    #[must_use]
    pub fn invoke(inv: &HandlerInvocation) -> HandlerResponse {
        let config = &inv.config;
        let handler_name = inv.handler_name();

        if let Some(max) = config.request_max_body_size {
            let len = inv.scope.body_len();
            if len > max {
                warn!(
                    handler_name = %handler_name,
                    body_len = len,
                    max_body_size = max,
                    "Request body too large"
                );
                return HandlerResponse::error(413, "Request body exceeds the maximum size");
            }
        }

        for (idx, guard) in config.guards.iter().enumerate() {
            if let Err(resp) = guard.check(inv) {
                info!(
                    handler_name = %handler_name,
                    guard_idx = idx,
                    status = resp.status,
                    "Guard rejected request"
                );
                return resp;
            }
        }

        let mut early_resp = config.before_request.as_ref().and_then(|hook| hook(inv));

        debug!(
            handler_name = %handler_name,
            middleware_count = config.middleware.len(),
            "Middleware before execution"
        );
        for (idx, mw) in config.middleware.iter().enumerate() {
            if early_resp.is_none() {
                early_resp = mw.before(inv);
                if early_resp.is_some() {
                    debug!(
                        handler_name = %handler_name,
                        middleware_idx = idx,
                        "Middleware returned early response"
                    );
                }
            } else {
                // Later middleware still observe the request
                let _ignored = mw.before(inv);
            }
        }

        let (mut resp, latency) = match early_resp {
            Some(resp) => (resp, Duration::from_millis(0)),
            None => {
                let start = Instant::now();
                let resp = match inv.validate_parameters() {
                    Ok(()) => Self::call_handler(inv),
                    Err(err) => {
                        info!(
                            handler_name = %handler_name,
                            error = %err,
                            "Parameter validation failed"
                        );
                        HandlerResponse::from(err)
                    }
                };
                (resp, start.elapsed())
            }
        };

        for mw in &config.middleware {
            mw.after(inv, &mut resp, latency);
        }

        if let Some(hook) = &config.after_request {
            resp = hook(inv, resp);
        }

        Self::apply_layered_response(config, &mut resp);
        resp
    }

    fn call_handler(inv: &HandlerInvocation) -> HandlerResponse {
        info!(
            handler_name = %inv.handler_name(),
            method = %inv.method,
            path = %inv.path,
            "Request dispatched to handler"
        );

        let start = Instant::now();
        let handler = inv.endpoint.handler();
        match catch_unwind(AssertUnwindSafe(|| handler.handle(inv))) {
            Ok(resp) => {
                info!(
                    handler_name = %inv.handler_name(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    status = resp.status,
                    "Handler response received"
                );
                resp
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(
                    handler_name = %inv.handler_name(),
                    panic = %message,
                    "Handler panicked"
                );
                HandlerResponse::error(500, "Handler failed")
            }
        }
    }

    fn apply_layered_response(config: &ResolvedConfig, resp: &mut HandlerResponse) {
        for (name, value) in &config.response_headers {
            if resp.get_header(name).is_none() {
                resp.append_header(name, value.clone());
            }
        }
        for cookie in config.response_cookies.values() {
            let prefix = format!("{}=", cookie.key);
            let already_set = resp
                .header_values("set-cookie")
                .iter()
                .any(|line| line.starts_with(&prefix));
            if !already_set {
                resp.append_header("set-cookie", cookie.to_header_value());
            }
        }
        if let Some(cache_control) = &config.cache_control {
            if resp.get_header("cache-control").is_none() {
                resp.append_header("cache-control", cache_control.to_header_value());
            }
        }
        if let Some(media_type) = &config.media_type {
            if resp.get_header("content-type").is_none() {
                resp.append_header("content-type", media_type.clone());
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.router.tree().len())
            .field("default_scope", &self.default_scope)
            .finish()
    }
}
