//! Router core module - request routing with logging.

use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::radix::{Lookup, RouteTree};
use crate::coerce::ParamValue;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{post_id}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Coerced path parameters in declaration order.
///
/// Names are `Arc<str>` shared with the endpoint template, so binding a parameter is an
/// atomic increment rather than a string copy.
pub type ParamVec = SmallVec<[(Arc<str>, ParamValue); MAX_INLINE_PARAMS]>;

/// One row of the route listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: Method,
    /// Canonical path, e.g. `/users/{id:int}`
    pub path: String,
    /// Handler name or owner label
    pub handler: String,
}

/// Route tree plus the logging around lookups.
///
/// The tree does the matching; `Router` records what happened: matched routes at `info`,
/// slow matches at `warn` above the configured threshold, 404s and 405s at `warn`.
pub struct Router {
    tree: RouteTree,
    slow_match_threshold: Duration,
}

impl Router {
    /// Wrap a built tree
    #[must_use]
    pub fn new(tree: RouteTree, slow_match_threshold: Duration) -> Self {
        Self {
            tree,
            slow_match_threshold,
        }
    }

    /// Empty router, useful before the first build
    #[must_use]
    pub fn empty() -> Self {
        Self::new(RouteTree::new(), Duration::from_millis(1))
    }

    #[must_use]
    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    /// Match a request.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// match router.route(&Method::GET, "/users/123") {
    ///     Lookup::Matched { endpoint, params } => println!("{} {:?}", endpoint.label(), params),
    ///     other => println!("{other:?}"),
    /// }
    /// ```
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Lookup {
        debug!(method = %method, path = %path, "Route match attempt");

        let match_start = Instant::now();
        let result = self.tree.lookup(method, path);
        let match_duration = match_start.elapsed();

        match &result {
            Lookup::Matched { endpoint, params } => {
                if match_duration > self.slow_match_threshold {
                    warn!(
                        method = %method,
                        path = %path,
                        handler_name = %endpoint.label(),
                        route_pattern = %endpoint.template(),
                        path_params = ?params,
                        duration_us = match_duration.as_micros(),
                        threshold_us = self.slow_match_threshold.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    info!(
                        method = %method,
                        path = %path,
                        handler_name = %endpoint.label(),
                        route_pattern = %endpoint.template(),
                        path_params = ?params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
            }
            Lookup::Mount {
                mount,
                prefix,
                remainder,
            } => {
                debug!(
                    method = %method,
                    path = %path,
                    mount = %mount,
                    prefix = %prefix,
                    remainder = %remainder,
                    "Forwarding to mounted application"
                );
            }
            Lookup::MethodNotAllowed(allowed) => {
                warn!(
                    method = %method,
                    path = %path,
                    allowed = ?allowed,
                    duration_us = match_duration.as_micros(),
                    "Method not allowed"
                );
            }
            Lookup::NotFound => {
                warn!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
            }
        }

        result
    }

    /// `(method, path, handler)` for every endpoint, sorted by path then method
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        let mut routes: Vec<RouteInfo> = self
            .tree
            .endpoints()
            .iter()
            .flat_map(|endpoint| {
                endpoint.methods().iter().map(move |method| RouteInfo {
                    method: method.clone(),
                    path: endpoint.template().to_string(),
                    handler: endpoint.label().to_string(),
                })
            })
            .collect();
        routes.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
                .then_with(|| a.method.as_str().cmp(b.method.as_str()))
        });
        routes
    }

    /// Log the routing table
    pub fn log_routes(&self) {
        let routes = self.routes();
        let routes_summary: Vec<String> = routes
            .iter()
            .take(10)
            .map(|r| format!("{} {} -> {}", r.method, r.path, r.handler))
            .collect();

        info!(
            routes_count = routes.len(),
            mounts_count = self.tree.mounts().len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
        for route in &routes {
            debug!(
                method = %route.method,
                path = %route.path,
                handler_name = %route.handler,
                "Registered route"
            );
        }
    }
}
