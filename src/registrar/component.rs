use http::Method;
use std::fmt;
use std::sync::Arc;

use crate::app::Application;
use crate::dispatcher::{Handler, HandlerInvocation, HandlerResponse, ScopeMode};
use crate::layer::Layer;

/// A declared piece of an application tree.
///
/// Components are plain values. Registering the same component under two parents produces
/// two independent sets of endpoints.
#[derive(Clone, Debug)]
pub enum Component {
    Router(RouterSpec),
    Controller(ControllerSpec),
    Handler(HandlerSpec),
    Mount(MountSpec),
}

impl From<RouterSpec> for Component {
    fn from(spec: RouterSpec) -> Self {
        Component::Router(spec)
    }
}

impl From<ControllerSpec> for Component {
    fn from(spec: ControllerSpec) -> Self {
        Component::Controller(spec)
    }
}

impl From<HandlerSpec> for Component {
    fn from(spec: HandlerSpec) -> Self {
        Component::Handler(spec)
    }
}

impl From<MountSpec> for Component {
    fn from(spec: MountSpec) -> Self {
        Component::Mount(spec)
    }
}

/// A path prefix with a layer and nested components.
///
/// ```rust
/// use strata_router::dispatcher::{HandlerInvocation, HandlerResponse};
/// use strata_router::registrar::{HandlerSpec, RouterSpec};
///
/// let users = RouterSpec::new("/users")
///     .route(HandlerSpec::get("/", |_: &HandlerInvocation| HandlerResponse::ok(serde_json::json!([]))))
///     .route(HandlerSpec::get("/{id:int}", |_: &HandlerInvocation| HandlerResponse::ok(serde_json::json!({}))));
/// assert_eq!(users.children().len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct RouterSpec {
    pub(crate) path: String,
    pub(crate) layer: Layer,
    pub(crate) children: Vec<Component>,
}

impl RouterSpec {
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            layer: Layer::empty(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub fn route(mut self, component: impl Into<Component>) -> Self {
        self.children.push(component.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn children(&self) -> &[Component] {
        &self.children
    }
}

/// A named group of handlers sharing a path prefix and a layer.
#[derive(Clone, Debug)]
pub struct ControllerSpec {
    pub(crate) name: String,
    pub(crate) path: String,
    pub(crate) layer: Layer,
    pub(crate) handlers: Vec<HandlerSpec>,
}

impl ControllerSpec {
    #[must_use]
    pub fn new(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            layer: Layer::empty(),
            handlers: Vec::new(),
        }
    }

    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub fn handler(mut self, handler: HandlerSpec) -> Self {
        self.handlers.push(handler);
        self
    }
}

/// A handler registration record: the callable, its methods and paths, and its layer.
///
/// A handler may be declared on several paths; each becomes its own endpoint.
#[derive(Clone)]
pub struct HandlerSpec {
    pub(crate) handler: Arc<dyn Handler>,
    pub(crate) methods: Vec<Method>,
    pub(crate) paths: Vec<String>,
    pub(crate) layer: Layer,
    pub(crate) name: Option<String>,
    pub(crate) consumes: Vec<String>,
}

impl HandlerSpec {
    /// Handler answering `methods` on `path`
    pub fn new<H: Handler + 'static>(methods: &[Method], path: &str, handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            methods: methods.to_vec(),
            paths: vec![path.to_string()],
            layer: Layer::empty(),
            name: None,
            consumes: Vec::new(),
        }
    }

    pub fn get<F>(path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync + 'static,
    {
        Self::new(&[Method::GET], path, handler)
    }

    pub fn post<F>(path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync + 'static,
    {
        Self::new(&[Method::POST], path, handler)
    }

    pub fn put<F>(path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync + 'static,
    {
        Self::new(&[Method::PUT], path, handler)
    }

    pub fn patch<F>(path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync + 'static,
    {
        Self::new(&[Method::PATCH], path, handler)
    }

    pub fn delete<F>(path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> HandlerResponse + Send + Sync + 'static,
    {
        Self::new(&[Method::DELETE], path, handler)
    }

    /// Also answer on `path`
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.paths.push(path.to_string());
        self
    }

    /// Unique name, used by `handler_index` and `route_reverse`
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Names the handler reads from its invocation; each must be provided by its chain
    #[must_use]
    pub fn consumes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.consumes.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    #[must_use]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// `true` when both records share the same handler callable
    pub(crate) fn same_handler(&self, handler: &Arc<dyn Handler>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.handler).cast::<()>(),
            Arc::as_ptr(handler).cast::<()>(),
        )
    }
}

impl fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSpec")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("paths", &self.paths)
            .field("consumes", &self.consumes)
            .finish_non_exhaustive()
    }
}

/// Another application served below a static prefix.
#[derive(Clone, Debug)]
pub struct MountSpec {
    pub(crate) path: String,
    pub(crate) app: Arc<Application>,
    pub(crate) scope_mode: Option<ScopeMode>,
    pub(crate) methods: Option<Vec<Method>>,
}

impl MountSpec {
    #[must_use]
    pub fn new(path: &str, app: Application) -> Self {
        Self::shared(path, Arc::new(app))
    }

    /// Mount an application that is also used elsewhere
    #[must_use]
    pub fn shared(path: &str, app: Arc<Application>) -> Self {
        Self {
            path: path.to_string(),
            app,
            scope_mode: None,
            methods: None,
        }
    }

    /// Override the configured default scope mode for this mount
    #[must_use]
    pub fn scope_mode(mut self, mode: ScopeMode) -> Self {
        self.scope_mode = Some(mode);
        self
    }

    /// Only forward these methods; others get a 405
    #[must_use]
    pub fn methods(mut self, methods: &[Method]) -> Self {
        self.methods = Some(methods.to_vec());
        self
    }
}
