use http::Method;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use super::reverse::reverse_path;
use crate::coerce::ParamValue;
use crate::config::RouterConfig;
use crate::dispatcher::{Dispatcher, HandlerInvocation, HandlerResponse, RequestScope};
use crate::error::{BuildError, DispatchError, ReverseError};
use crate::layer::{Layer, Owner, OwnerKind, OwnershipChain};
use crate::path::PathTemplate;
use crate::registrar::{Component, HandlerNames, Registrar};
use crate::router::{Endpoint, RouteInfo, Router};

/// Paths registered under a handler name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerIndex {
    pub name: String,
    /// Canonical paths, sorted and unique
    pub paths: Vec<String>,
}

/// A built application: the route tree, its dispatcher and the handler name index.
///
/// Immutable once built. The declared layer and components are kept so the application can
/// be rebuilt with more components (see [`LiveApplication`](super::LiveApplication)).
pub struct Application {
    dispatcher: Dispatcher,
    config: RouterConfig,
    names: HandlerNames,
    layer: Layer,
    components: Vec<Component>,
}

impl Application {
    #[must_use]
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// A builder holding the same layer, components and config
    #[must_use]
    pub fn to_builder(&self) -> ApplicationBuilder {
        ApplicationBuilder {
            layer: self.layer.clone(),
            components: self.components.clone(),
            config: self.config.clone(),
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn router(&self) -> &Arc<Router> {
        self.dispatcher.router()
    }

    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The application-level layer
    #[must_use]
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Resolve a request without running it.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`].
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        scope: RequestScope,
    ) -> Result<HandlerInvocation, DispatchError> {
        self.dispatcher.dispatch(method, path, scope)
    }

    /// Dispatch and run a request
    #[must_use]
    pub fn handle(&self, method: Method, path: &str, scope: RequestScope) -> HandlerResponse {
        self.dispatcher.handle(method, path, scope)
    }

    /// Route listing, sorted by path then method
    #[must_use]
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.router().routes()
    }

    /// Every endpoint registered under `name`, in registration order
    #[must_use]
    pub fn endpoints_named(&self, name: &str) -> &[Arc<Endpoint>] {
        self.names.get(name).map_or(&[][..], Vec::as_slice)
    }

    /// Paths of the handler registered under `name`
    #[must_use]
    pub fn handler_index(&self, name: &str) -> Option<HandlerIndex> {
        let endpoints = self.names.get(name)?;
        let paths: BTreeSet<String> = endpoints
            .iter()
            .map(|endpoint| endpoint.template().to_string())
            .collect();
        Some(HandlerIndex {
            name: name.to_string(),
            paths: paths.into_iter().collect(),
        })
    }

    /// Build a request path for the handler registered under `name`.
    ///
    /// When the handler has several paths, the one with the most parameters that are all
    /// supplied is used, falling back to the path with the fewest parameters.
    ///
    /// ```rust
    /// use strata_router::app::Application;
    /// use strata_router::dispatcher::{HandlerInvocation, HandlerResponse};
    /// use strata_router::registrar::HandlerSpec;
    ///
    /// let app = Application::builder()
    ///     .route(
    ///         HandlerSpec::get("/users/{id:int}", |_: &HandlerInvocation| HandlerResponse::ok(serde_json::json!({})))
    ///             .name("get_user"),
    ///     )
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(app.route_reverse("get_user", &[("id", 7.into())]).unwrap(), "/users/7");
    /// ```
    ///
    /// # Errors
    ///
    /// [`ReverseError::UnknownHandler`] for an unregistered name, [`ReverseError::NoMatchingPath`]
    /// when a parameter is missing or its value does not fit the declared type.
    pub fn route_reverse(
        &self,
        name: &str,
        params: &[(&str, ParamValue)],
    ) -> Result<String, ReverseError> {
        let endpoints = self
            .names
            .get(name)
            .filter(|endpoints| !endpoints.is_empty())
            .ok_or_else(|| ReverseError::UnknownHandler(name.to_string()))?;

        let mut candidates: Vec<&PathTemplate> =
            endpoints.iter().map(|endpoint| endpoint.template()).collect();
        candidates.sort_by_key(|template| std::cmp::Reverse(template.parameters().count()));

        let supplied = |template: &&PathTemplate| {
            template
                .parameters()
                .all(|param| params.iter().any(|(key, _)| *key == param.name.as_ref()))
        };
        let selected = match candidates.iter().copied().find(supplied) {
            Some(template) => template,
            None => candidates
                .last()
                .copied()
                .ok_or_else(|| ReverseError::UnknownHandler(name.to_string()))?,
        };

        reverse_path(selected, params).map_err(|reason| ReverseError::NoMatchingPath {
            name: name.to_string(),
            reason,
        })
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.router().tree().len())
            .field("mounts", &self.router().tree().mounts().len())
            .field("names", &self.names.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Declares an application: its own layer, its components and its router settings.
///
/// ```rust
/// use strata_router::app::Application;
/// use strata_router::dispatcher::{HandlerInvocation, HandlerResponse, RequestScope};
/// use strata_router::layer::Layer;
/// use strata_router::registrar::{HandlerSpec, RouterSpec};
///
/// let app = Application::builder()
///     .layer(Layer::builder().response_header("x-app", "demo").build())
///     .route(RouterSpec::new("/users").route(HandlerSpec::get(
///         "/{id:int}",
///         |inv: &HandlerInvocation| {
///             let id = inv.path_param("id").and_then(|v| v.as_i64()).unwrap_or_default();
///             HandlerResponse::ok(serde_json::json!({ "id": id }))
///         },
///     )))
///     .build()
///     .unwrap();
///
/// let res = app.handle(http::Method::GET, "/users/7", RequestScope::new());
/// assert_eq!(res.status, 200);
/// assert_eq!(res.body["id"], 7);
/// assert_eq!(res.get_header("x-app"), Some("demo"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ApplicationBuilder {
    layer: Layer,
    components: Vec<Component>,
    config: RouterConfig,
}

impl ApplicationBuilder {
    #[must_use]
    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    #[must_use]
    pub fn route(mut self, component: impl Into<Component>) -> Self {
        self.components.push(component.into());
        self
    }

    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Register every component and build the route tree.
    ///
    /// # Errors
    ///
    /// The first [`BuildError`] met while registering.
    pub fn build(self) -> Result<Application, BuildError> {
        let root = OwnershipChain::new().child(
            Owner::new(OwnerKind::Application, "app"),
            self.layer.clone(),
            PathTemplate::root(),
        );

        let mut registrar = Registrar::new();
        for component in &self.components {
            registrar.register(component, &root)?;
        }
        let (tree, names) = registrar.finish();

        let router = Router::new(tree, self.config.slow_match_threshold());
        if self.config.log_routes_on_build {
            router.log_routes();
        }
        info!(
            endpoints = router.tree().len(),
            named_handlers = names.len(),
            mount_scope = %self.config.default_mount_scope,
            "Application built"
        );

        Ok(Application {
            dispatcher: Dispatcher::new(Arc::new(router), self.config.default_mount_scope),
            config: self.config,
            names,
            layer: self.layer,
            components: self.components,
        })
    }
}
