//! Typed radix tree for route matching
//!
//! Each node represents one path segment. A node can have:
//!
//! - static children, matched by exact text
//! - parameter children, one per [`ParamType`], tried most specific first
//! - a greedy `path` child that swallows the rest of the request path
//! - a mount point that forwards the rest of the request path to another application
//! - endpoints keyed by HTTP method
//!
//! Parameter children are keyed by type rather than by name, so `/items/{id:int}` and
//! `/items/{slug:str}` share the depth but live on different nodes, while `/users/{id:int}` and
//! `/users/{user_id:int}/posts` share the same node. Names are bound per endpoint once a
//! terminal node is reached.
//!
//! ## Matching order
//!
//! At every depth: static child, then parameter children in specificity order, then the greedy
//! `path` child, then the mount. A raw segment that does not coerce to a child's type rules that
//! child out and matching backtracks to the next candidate. Parameter constraints are checked on
//! the terminal node against the endpoint that owns the requested method; a violation also
//! backtracks.
//!
//! ## Example
//!
//! ```text
//! /users                 GET, POST
//! /users/{id:int}        GET
//! /users/{name:str}      GET
//!
//! GET /users/7     -> /users/{id:int}   (int tried before str)
//! GET /users/bob   -> /users/{name:str}
//! DELETE /users    -> 405, Allow: GET, POST
//! ```
//!
//! A 405 lists the methods of every candidate the path reaches, so with `POST /users/me` next to
//! `GET /users/{name:str}`, `DELETE /users/me` reports `Allow: GET, POST`.

use http::Method;
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::core::{ParamVec, MAX_INLINE_PARAMS};
use super::endpoint::{Endpoint, MountPoint};
use crate::coerce::{coerce, ParamValue};
use crate::error::AmbiguousRouteError;
use crate::path::{split_segments, ParamType, PathSegment, PathTemplate};

type ValueVec = SmallVec<[ParamValue; MAX_INLINE_PARAMS]>;

/// Result of a tree lookup
#[derive(Debug)]
pub enum Lookup {
    /// An endpoint accepts the method; `params` are coerced and named
    Matched {
        endpoint: Arc<Endpoint>,
        params: ParamVec,
    },
    /// The request falls under a mount point
    Mount {
        mount: Arc<MountPoint>,
        /// Consumed prefix, e.g. `/app`
        prefix: String,
        /// Path forwarded to the mounted application, always starting with `/`
        remainder: String,
    },
    /// The path exists but not for this method; methods served by any candidate, sorted
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

enum Found {
    Endpoint(Arc<Endpoint>, ParamVec),
    Mount(Arc<MountPoint>, usize),
}

struct Search<'a> {
    method: &'a Method,
    values: ValueVec,
    /// Methods served by every candidate visited, keyed by name for sorting
    allowed: BTreeMap<String, Method>,
}

impl Search<'_> {
    fn remember<'m>(&mut self, methods: impl Iterator<Item = &'m Method>) {
        for method in methods {
            self.allowed
                .entry(method.as_str().to_string())
                .or_insert_with(|| method.clone());
        }
    }

    /// Bind the collected values to `endpoint`'s parameter names, `None` on a constraint violation
    fn bind(&self, endpoint: &Endpoint) -> Option<ParamVec> {
        let mut params = ParamVec::new();
        for (param, value) in endpoint.template.parameters().zip(self.values.iter()) {
            if param.constraints.check(value).is_err() {
                return None;
            }
            params.push((Arc::clone(&param.name), value.clone()));
        }
        Some(params)
    }
}

#[derive(Default)]
struct RadixNode {
    static_children: HashMap<String, RadixNode>,
    /// Sorted by [`ParamType::specificity`], never contains `path`
    param_children: Vec<(ParamType, RadixNode)>,
    path_child: Option<Box<RadixNode>>,
    mount: Option<Arc<MountPoint>>,
    routes: HashMap<Method, Arc<Endpoint>>,
}

impl RadixNode {
    /// Walk to the node for `template`, creating nodes as needed
    fn descend(&mut self, template: &PathTemplate) -> &mut RadixNode {
        let mut node = self;
        for segment in template.segments() {
            node = match segment {
                PathSegment::Static(text) => node.static_children.entry(text.clone()).or_default(),
                PathSegment::Parameter(param) if param.kind == ParamType::Path => {
                    &mut **node.path_child.get_or_insert_with(Box::default)
                }
                PathSegment::Parameter(param) => node.param_child(param.kind),
            };
        }
        node
    }

    fn param_child(&mut self, kind: ParamType) -> &mut RadixNode {
        let index = match self.param_children.iter().position(|(k, _)| *k == kind) {
            Some(index) => index,
            None => {
                let index = self
                    .param_children
                    .iter()
                    .position(|(k, _)| k.specificity() > kind.specificity())
                    .unwrap_or(self.param_children.len());
                self.param_children
                    .insert(index, (kind, RadixNode::default()));
                index
            }
        };
        &mut self.param_children[index].1
    }

    fn search(&self, segments: &[&str], depth: usize, state: &mut Search<'_>) -> Option<Found> {
        let rest = &segments[depth..];

        if let Some(segment) = rest.first() {
            if let Some(child) = self.static_children.get(*segment) {
                if let Some(found) = child.search(segments, depth + 1, state) {
                    return Some(found);
                }
            }

            for (kind, child) in &self.param_children {
                if let Ok(value) = coerce(*kind, segment) {
                    state.values.push(value);
                    if let Some(found) = child.search(segments, depth + 1, state) {
                        return Some(found);
                    }
                    state.values.pop();
                }
            }

            if let Some(child) = &self.path_child {
                if let Ok(value) = coerce(ParamType::Path, &rest.join("/")) {
                    state.values.push(value);
                    if let Some(found) = child.terminal(state) {
                        return Some(found);
                    }
                    state.values.pop();
                }
            }
        } else if let Some(found) = self.terminal(state) {
            return Some(found);
        }

        if let Some(mount) = &self.mount {
            if mount.accepts(state.method) {
                return Some(Found::Mount(Arc::clone(mount), depth));
            }
            if let Some(methods) = &mount.methods {
                state.remember(methods.iter());
            }
        }

        None
    }

    fn terminal(&self, state: &mut Search<'_>) -> Option<Found> {
        if self.routes.is_empty() {
            return None;
        }

        let Some(endpoint) = self.routes.get(state.method) else {
            // Only methods whose endpoint would accept the bound values count towards a 405
            let served: Vec<&Method> = self
                .routes
                .iter()
                .filter(|(_, endpoint)| state.bind(endpoint).is_some())
                .map(|(method, _)| method)
                .collect();
            state.remember(served.into_iter());
            return None;
        };

        let params = state.bind(endpoint)?;
        Some(Found::Endpoint(Arc::clone(endpoint), params))
    }

    fn collect_endpoints(&self, out: &mut Vec<Arc<Endpoint>>) {
        out.extend(self.routes.values().map(Arc::clone));
        for child in self.static_children.values() {
            child.collect_endpoints(out);
        }
        for (_, child) in &self.param_children {
            child.collect_endpoints(out);
        }
        if let Some(child) = &self.path_child {
            child.collect_endpoints(out);
        }
    }

    fn collect_mounts(&self, out: &mut Vec<Arc<MountPoint>>) {
        out.extend(self.mount.iter().map(Arc::clone));
        for child in self.static_children.values() {
            child.collect_mounts(out);
        }
        for (_, child) in &self.param_children {
            child.collect_mounts(out);
        }
    }
}

/// Route tree of one application.
///
/// Built once and read-only afterwards; lookups take `&self` and need no locking.
#[derive(Default)]
pub struct RouteTree {
    root: RadixNode,
    endpoint_count: usize,
}

impl RouteTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an endpoint under every one of its methods.
    ///
    /// # Errors
    ///
    /// [`AmbiguousRouteError`] when another endpoint already answers one of the methods at the
    /// same node. Nothing is inserted in that case.
    pub fn insert(&mut self, endpoint: Arc<Endpoint>) -> Result<(), AmbiguousRouteError> {
        let node = self.root.descend(&endpoint.template);

        for method in &endpoint.methods {
            if let Some(existing) = node.routes.get(method) {
                return Err(AmbiguousRouteError {
                    method: Some(method.clone()),
                    path: endpoint.template.to_string(),
                    existing: existing.to_string(),
                    incoming: endpoint.to_string(),
                });
            }
        }

        for method in &endpoint.methods {
            node.routes.insert(method.clone(), Arc::clone(&endpoint));
        }
        self.endpoint_count += 1;
        Ok(())
    }

    /// Register a mount point at the node reached by its prefix.
    ///
    /// # Errors
    ///
    /// [`AmbiguousRouteError`] when the node already has a mount.
    pub fn insert_mount(&mut self, mount: Arc<MountPoint>) -> Result<(), AmbiguousRouteError> {
        let node = self.root.descend(&mount.path);
        if let Some(existing) = &node.mount {
            return Err(AmbiguousRouteError {
                method: None,
                path: mount.path.to_string(),
                existing: existing.to_string(),
                incoming: mount.to_string(),
            });
        }
        node.mount = Some(mount);
        Ok(())
    }

    /// Resolve `method` and `path`.
    ///
    /// `path` is split on `/` with empty segments dropped, so `/users/`, `//users` and `/users`
    /// are the same request.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup {
        let segments = split_segments(path);
        let mut state = Search {
            method,
            values: ValueVec::new(),
            allowed: BTreeMap::new(),
        };

        match self.root.search(&segments, 0, &mut state) {
            Some(Found::Endpoint(endpoint, params)) => Lookup::Matched { endpoint, params },
            Some(Found::Mount(mount, depth)) => Lookup::Mount {
                mount,
                prefix: format!("/{}", segments[..depth].join("/")),
                remainder: format!("/{}", segments[depth..].join("/")),
            },
            None if state.allowed.is_empty() => Lookup::NotFound,
            None => Lookup::MethodNotAllowed(state.allowed.into_values().collect()),
        }
    }

    /// Number of inserted endpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoint_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoint_count == 0
    }

    /// Every endpoint in the tree, each once
    #[must_use]
    pub fn endpoints(&self) -> Vec<Arc<Endpoint>> {
        let mut out = Vec::new();
        self.root.collect_endpoints(&mut out);
        let mut seen = std::collections::HashSet::new();
        out.retain(|endpoint| seen.insert(Arc::as_ptr(endpoint)));
        out
    }

    /// Every mount point in the tree
    #[must_use]
    pub fn mounts(&self) -> Vec<Arc<MountPoint>> {
        let mut out = Vec::new();
        self.root.collect_mounts(&mut out);
        out
    }
}
