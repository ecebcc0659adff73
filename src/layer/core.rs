use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::aspects::{CacheControl, Cookie, ParameterSpec, Provider};
use crate::dispatcher::{HandlerInvocation, HandlerResponse};
use crate::middleware::{AfterRequestHook, BeforeRequestHook, Guard, Middleware};

/// Configuration carried by one component of the application tree.
///
/// Every aspect is optional. How aspects of nested layers combine is decided by
/// [`OwnershipChain::resolve`](super::OwnershipChain::resolve):
///
/// | aspect | combination |
/// |---|---|
/// | `middleware`, `guards`, `tags` | concatenated, application first |
/// | `dependencies`, `parameters`, `response_headers`, `response_cookies`, `opt` | merged per key, innermost wins |
/// | everything else | innermost value set wins |
///
/// Layers are immutable once built; cloning shares the middleware, guards, hooks and
/// providers through `Arc`.
#[derive(Clone, Default)]
pub struct Layer {
    pub(crate) middleware: Vec<Arc<dyn Middleware>>,
    pub(crate) guards: Vec<Arc<dyn Guard>>,
    pub(crate) tags: Vec<String>,
    pub(crate) dependencies: BTreeMap<String, Provider>,
    pub(crate) parameters: BTreeMap<String, ParameterSpec>,
    pub(crate) response_headers: Vec<(String, String)>,
    pub(crate) response_cookies: BTreeMap<String, Cookie>,
    pub(crate) opt: Map<String, Value>,
    pub(crate) response_class: Option<Arc<str>>,
    pub(crate) media_type: Option<String>,
    pub(crate) cache_control: Option<CacheControl>,
    pub(crate) include_in_schema: Option<bool>,
    pub(crate) request_max_body_size: Option<usize>,
    pub(crate) before_request: Option<BeforeRequestHook>,
    pub(crate) after_request: Option<AfterRequestHook>,
}

impl Layer {
    /// Start building a layer
    #[must_use]
    pub fn builder() -> LayerBuilder {
        LayerBuilder::default()
    }

    /// Layer with no aspects set
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn parameters(&self) -> &BTreeMap<String, ParameterSpec> {
        &self.parameters
    }

    #[must_use]
    pub fn dependencies(&self) -> &BTreeMap<String, Provider> {
        &self.dependencies
    }

    /// `true` when no aspect is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
            && self.guards.is_empty()
            && self.tags.is_empty()
            && self.dependencies.is_empty()
            && self.parameters.is_empty()
            && self.response_headers.is_empty()
            && self.response_cookies.is_empty()
            && self.opt.is_empty()
            && self.response_class.is_none()
            && self.media_type.is_none()
            && self.cache_control.is_none()
            && self.include_in_schema.is_none()
            && self.request_max_body_size.is_none()
            && self.before_request.is_none()
            && self.after_request.is_none()
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("middleware", &self.middleware.len())
            .field("guards", &self.guards.len())
            .field("tags", &self.tags)
            .field("dependencies", &self.dependencies.keys().collect::<Vec<_>>())
            .field("parameters", &self.parameters)
            .field("response_headers", &self.response_headers)
            .field("response_cookies", &self.response_cookies)
            .field("opt", &self.opt)
            .field("response_class", &self.response_class)
            .field("media_type", &self.media_type)
            .field("cache_control", &self.cache_control)
            .field("include_in_schema", &self.include_in_schema)
            .field("request_max_body_size", &self.request_max_body_size)
            .field("before_request", &self.before_request.is_some())
            .field("after_request", &self.after_request.is_some())
            .finish()
    }
}

/// Fluent builder for [`Layer`]
///
/// # Example
///
/// ```rust
/// use strata_router::layer::{CacheControl, Layer};
///
/// let layer = Layer::builder()
///     .tag("users")
///     .response_header("x-service", "users")
///     .cache_control(CacheControl::max_age(60))
///     .build();
/// assert_eq!(layer.tags(), ["users".to_string()]);
/// ```
#[derive(Default)]
pub struct LayerBuilder {
    layer: Layer,
}

impl LayerBuilder {
    #[must_use]
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.layer.middleware.push(middleware);
        self
    }

    #[must_use]
    pub fn guard<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.layer.guards.push(Arc::new(guard));
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.layer.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn dependency(mut self, name: impl Into<String>, provider: Provider) -> Self {
        self.layer.dependencies.insert(name.into(), provider);
        self
    }

    #[must_use]
    pub fn parameter(mut self, name: impl Into<String>, spec: ParameterSpec) -> Self {
        self.layer.parameters.insert(name.into(), spec);
        self
    }

    /// Header added to every response; names compare case-insensitively
    #[must_use]
    pub fn response_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.layer
            .response_headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.layer.response_headers.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn response_cookie(mut self, cookie: Cookie) -> Self {
        self.layer
            .response_cookies
            .insert(cookie.key.clone(), cookie);
        self
    }

    /// Arbitrary key/value metadata handed to handlers, guards and middleware
    #[must_use]
    pub fn opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.layer.opt.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn response_class(mut self, name: &str) -> Self {
        self.layer.response_class = Some(Arc::from(name));
        self
    }

    /// Default `content-type` for responses that do not set one
    #[must_use]
    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.layer.media_type = Some(media_type.into());
        self
    }

    #[must_use]
    pub fn cache_control(mut self, cache_control: CacheControl) -> Self {
        self.layer.cache_control = Some(cache_control);
        self
    }

    #[must_use]
    pub fn include_in_schema(mut self, include: bool) -> Self {
        self.layer.include_in_schema = Some(include);
        self
    }

    /// Largest accepted request body in bytes; larger bodies get a 413
    #[must_use]
    pub fn request_max_body_size(mut self, bytes: usize) -> Self {
        self.layer.request_max_body_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn before_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HandlerInvocation) -> Option<HandlerResponse> + Send + Sync + 'static,
    {
        self.layer.before_request = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn after_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(&HandlerInvocation, HandlerResponse) -> HandlerResponse + Send + Sync + 'static,
    {
        self.layer.after_request = Some(Arc::new(hook));
        self
    }

    #[must_use]
    pub fn build(self) -> Layer {
        self.layer
    }
}
